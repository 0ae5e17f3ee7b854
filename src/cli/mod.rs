//! Command-line interface.

mod analyze;
mod display;
mod search;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use indicatif::ProgressStyle;

use metaharvest::config::load_settings;

#[derive(Parser)]
#[command(name = "metaharvest")]
#[command(about = "Discover documents published by a domain and harvest their metadata")]
#[command(version)]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Search a domain for documents, download them and extract metadata
    Search(SearchArgs),

    /// Extract metadata from documents already on disk
    Analyze(AnalyzeArgs),
}

#[derive(Args)]
struct SearchArgs {
    /// Target domain (e.g. example.com)
    #[arg(short, long)]
    domain: String,

    /// Comma-separated file types to search for (default: pdf,doc,docx,xls,xlsx,ppt,pptx)
    #[arg(short = 't', long = "filetypes", value_delimiter = ',')]
    file_types: Vec<String>,

    /// Maximum search results per file type
    #[arg(short = 'l', long)]
    limit: Option<usize>,

    /// Maximum downloads per file type
    #[arg(short = 'n', long)]
    download_limit: Option<usize>,

    /// Directory downloaded files are written to
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Write a report (.json for JSON, anything else for HTML)
    #[arg(short = 'f', long)]
    output_file: Option<PathBuf>,

    /// Force JSON output
    #[arg(long)]
    json: bool,

    /// Base delay between searches in seconds
    #[arg(long)]
    delay: Option<f64>,

    /// Always send the same user agent
    #[arg(long)]
    no_rotate_ua: bool,

    /// Maximum concurrent downloads
    #[arg(long)]
    concurrency: Option<usize>,

    /// Proxy for search and download traffic (e.g. socks5h://127.0.0.1:9050)
    #[arg(long)]
    proxy: Option<String>,

    /// Seed for search jitter and header rotation
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Directory containing documents
    directory: PathBuf,

    /// Write a report (.json for JSON, anything else for HTML)
    #[arg(short = 'f', long)]
    output_file: Option<PathBuf>,

    /// Force JSON output
    #[arg(long)]
    json: bool,
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let (settings, _config) = load_settings(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Search(args) => search::cmd_search(settings, args, cli.verbose).await,
        Commands::Analyze(args) => analyze::cmd_analyze(args, cli.verbose),
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_flags_parse() {
        let cli = Cli::try_parse_from([
            "metaharvest",
            "-v",
            "search",
            "-d",
            "example.com",
            "-t",
            "pdf,docx",
            "-n",
            "10",
            "--no-rotate-ua",
            "--delay",
            "0.5",
        ])
        .unwrap();

        assert!(cli.verbose);
        let Commands::Search(args) = cli.command else {
            panic!("expected search");
        };
        assert_eq!(args.domain, "example.com");
        assert_eq!(args.file_types, vec!["pdf", "docx"]);
        assert_eq!(args.download_limit, Some(10));
        assert_eq!(args.limit, None);
        assert!(args.no_rotate_ua);
        assert_eq!(args.delay, Some(0.5));
    }

    #[test]
    fn test_search_requires_domain() {
        assert!(Cli::try_parse_from(["metaharvest", "search", "-t", "pdf"]).is_err());
    }

    #[test]
    fn test_analyze_takes_directory_and_global_config() {
        let cli = Cli::try_parse_from([
            "metaharvest",
            "analyze",
            "./docs",
            "--json",
            "-c",
            "metaharvest.toml",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("metaharvest.toml")));
        let Commands::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(args.directory, PathBuf::from("./docs"));
        assert!(args.json);
        assert!(args.output_file.is_none());
    }
}
