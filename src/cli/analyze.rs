//! `analyze` command: extract metadata from a local directory.

use anyhow::{bail, Context};
use console::style;
use indicatif::ProgressBar;

use metaharvest::processing::{supported_files, ResultProcessor};

use super::display::{display_results, write_report};
use super::{bar_style, AnalyzeArgs};

pub(super) fn cmd_analyze(args: AnalyzeArgs, verbose: bool) -> anyhow::Result<()> {
    let dir = &args.directory;
    if !dir.is_dir() {
        bail!("Directory not found: {}", dir.display());
    }

    let files = supported_files(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?;
    if files.is_empty() {
        println!(
            "{} No supported documents in {}",
            style("!").yellow(),
            dir.display()
        );
    }

    let domain = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "local".to_string());
    let mut processor = ResultProcessor::new(domain);

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(bar_style());
    for path in &files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        pb.set_message(name.clone());
        let result = processor.process_file(path, None);
        if verbose {
            match result.error() {
                None => pb.println(format!("  {} {}", style("✓").green(), name)),
                Some(err) => pb.println(format!("  {} {}: {}", style("✗").red(), name, err)),
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    let results = processor.into_results();
    display_results(&results);
    write_report(&results, args.output_file.as_deref(), args.json)
}
