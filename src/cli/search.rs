//! `search` command: online discovery, download and extraction.

use std::time::Duration;

use anyhow::{bail, Context};
use console::style;
use indicatif::ProgressBar;
use tokio::sync::mpsc;

use metaharvest::config::{parse_file_types, Settings};
use metaharvest::download::{DownloadEvent, Downloader};
use metaharvest::pipeline::{run_online, RunEvent, RunLimits};
use metaharvest::search::DuckDuckGoSearch;

use super::display::{display_results, write_report};
use super::{bar_style, SearchArgs};

impl SearchArgs {
    /// Overlay command-line flags on the loaded settings.
    fn apply(&self, settings: &mut Settings) -> anyhow::Result<()> {
        if let Some(limit) = self.limit {
            settings.search_limit = limit;
        }
        if let Some(limit) = self.download_limit {
            settings.download_limit = limit;
        }
        if let Some(dir) = &self.output_dir {
            settings.output_dir = dir.clone();
        }
        if let Some(delay) = self.delay {
            settings.search_delay = Duration::try_from_secs_f64(delay)
                .with_context(|| format!("Invalid --delay value: {}", delay))?;
        }
        if self.no_rotate_ua {
            settings.rotate_user_agent = false;
        }
        if let Some(concurrency) = self.concurrency {
            settings.concurrency = concurrency.max(1);
        }
        if let Some(proxy) = &self.proxy {
            settings.proxy = Some(proxy.clone());
        }
        if self.seed.is_some() {
            settings.seed = self.seed;
        }
        if !self.file_types.is_empty() {
            let (valid, invalid) = parse_file_types(self.file_types.iter().map(String::as_str));
            for name in &invalid {
                eprintln!("{} Ignoring unknown file type: {}", style("!").yellow(), name);
            }
            settings.file_types = valid;
        }
        Ok(())
    }
}

pub(super) async fn cmd_search(
    mut settings: Settings,
    args: SearchArgs,
    verbose: bool,
) -> anyhow::Result<()> {
    let domain = args.domain.trim().to_string();
    if domain.is_empty() {
        bail!("A target domain is required (-d example.com)");
    }
    args.apply(&mut settings)?;
    if settings.file_types.is_empty() {
        bail!("No valid file types specified");
    }

    std::fs::create_dir_all(&settings.output_dir).with_context(|| {
        format!("Failed to create output directory {}", settings.output_dir.display())
    })?;

    let types: Vec<&str> = settings.file_types.iter().map(|ft| ft.as_str()).collect();
    println!(
        "{} Harvesting {} from {}",
        style("→").cyan(),
        style(types.join(", ")).bold(),
        style(&domain).bold()
    );
    println!(
        "  Output directory: {}",
        style(settings.output_dir.display()).dim()
    );

    let engine = DuckDuckGoSearch::new(settings.search_config(&domain));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let downloader = Downloader::new(settings.download_config())
        .context("Failed to build download client")?
        .with_events(tx);

    let pb = ProgressBar::new(0);
    pb.set_style(bar_style());

    let pb_events = pb.clone();
    let events = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                DownloadEvent::Started { filename, .. } => pb_events.set_message(filename),
                DownloadEvent::Completed { .. }
                | DownloadEvent::AlreadyPresent { .. }
                | DownloadEvent::Failed { .. } => pb_events.inc(1),
            }
        }
    });

    let limits = RunLimits {
        search_limit: settings.search_limit,
        download_limit: settings.download_limit,
    };
    let pb_run = pb.clone();
    let on_event = move |event: RunEvent<'_>| match event {
        RunEvent::SearchStarted { file_type } => {
            pb_run.set_message(format!("Searching for {} files...", file_type));
        }
        RunEvent::SearchFailed { file_type, error } => {
            pb_run.println(format!(
                "{} {} search failed: {}",
                style("✗").red(),
                file_type,
                error
            ));
        }
        RunEvent::SearchCompleted { file_type, results } => {
            if results == 0 {
                pb_run.println(format!("{} No {} files found", style("!").yellow(), file_type));
            } else {
                pb_run.println(format!(
                    "{} Found {} {} files",
                    style("✓").green(),
                    results,
                    file_type
                ));
            }
        }
        RunEvent::DownloadStarted { total, .. } => {
            pb_run.set_length(total as u64);
            pb_run.set_position(0);
        }
        RunEvent::DownloadsCompleted {
            file_type,
            succeeded,
            total,
        } => {
            pb_run.println(format!(
                "{} Downloaded {}/{} {} files",
                style("✓").green(),
                succeeded,
                total,
                file_type
            ));
        }
        RunEvent::FileProcessed { path, result } => {
            if verbose {
                let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
                match result.error() {
                    None => pb_run.println(format!("  {} {}", style("✓").green(), name)),
                    Some(err) => pb_run.println(format!("  {} {}: {}", style("✗").red(), name, err)),
                }
            }
        }
    };

    let results = run_online(
        &domain,
        &settings.file_types,
        &engine,
        &downloader,
        limits,
        &on_event,
    )
    .await;

    drop(downloader);
    let _ = events.await;
    pb.finish_and_clear();

    display_results(&results);
    write_report(&results, args.output_file.as_deref(), args.json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use metaharvest::models::FileType;

    use crate::cli::{Cli, Commands};

    fn search_args(argv: &[&str]) -> SearchArgs {
        let mut full = vec!["metaharvest", "search"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Commands::Search(args) => args,
            _ => panic!("expected search"),
        }
    }

    #[test]
    fn test_flags_override_settings() {
        let args = search_args(&[
            "-d",
            "example.com",
            "-t",
            "xlsx,exe,pdf",
            "-l",
            "5",
            "--delay",
            "0.25",
            "--concurrency",
            "0",
            "--no-rotate-ua",
            "--seed",
            "7",
        ]);
        let mut settings = Settings::default();
        args.apply(&mut settings).unwrap();

        assert_eq!(settings.file_types, vec![FileType::Xlsx, FileType::Pdf]);
        assert_eq!(settings.search_limit, 5);
        assert_eq!(settings.search_delay, Duration::from_millis(250));
        assert_eq!(settings.concurrency, 1);
        assert!(!settings.rotate_user_agent);
        assert_eq!(settings.seed, Some(7));
    }

    #[test]
    fn test_unknown_file_types_leave_nothing() {
        let args = search_args(&["-d", "example.com", "-t", "exe,bat"]);
        let mut settings = Settings::default();
        args.apply(&mut settings).unwrap();
        assert!(settings.file_types.is_empty());
    }

    #[test]
    fn test_negative_delay_is_rejected() {
        let args = search_args(&["-d", "example.com", "--delay=-1"]);
        let mut settings = Settings::default();
        assert!(args.apply(&mut settings).is_err());
    }

    #[test]
    fn test_defaults_survive_without_flags() {
        let args = search_args(&["-d", "example.com"]);
        let mut settings = Settings::default();
        args.apply(&mut settings).unwrap();
        assert_eq!(settings.file_types, FileType::DEFAULT_SEARCH.to_vec());
        assert!(settings.rotate_user_agent);
    }
}
