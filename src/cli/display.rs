//! Terminal summary and report writing.

use std::path::Path;

use console::{style, Color};

use metaharvest::export::{export_to_file, ExportFormat, JsonExporter};
use metaharvest::models::ScanResults;

/// Entries shown per indicator category before truncating.
const DISPLAY_LIMIT: usize = 20;

pub(super) fn display_results(results: &ScanResults) {
    let stats = results.stats();

    println!();
    println!("{}", style(format!("Results for {}", results.domain)).bold());
    println!("  Documents analyzed:  {}", stats.total_documents);
    println!("  Failed:              {}", stats.failed_extractions);
    println!("  Unique users:        {}", stats.unique_users);
    println!("  Unique software:     {}", stats.unique_software);
    println!("  Unique emails:       {}", stats.unique_emails);
    println!("  Unique paths:        {}", stats.unique_paths);

    print_section("Users", &results.unique_users(), Color::Cyan);
    print_section("Software", &results.unique_software(), Color::Magenta);
    print_section("Emails", &results.unique_emails(), Color::Green);
    print_section("Paths", &results.unique_paths(), Color::Yellow);
}

fn print_section(title: &str, items: &[String], color: Color) {
    if items.is_empty() {
        return;
    }
    println!();
    println!("{}", style(format!("{} ({})", title, items.len())).fg(color).bold());
    for line in section_lines(items, DISPLAY_LIMIT) {
        println!("  {}", line);
    }
}

/// The first `limit` items, plus a trailing "... and N more" when truncated.
fn section_lines(items: &[String], limit: usize) -> Vec<String> {
    let mut lines: Vec<String> = items.iter().take(limit).cloned().collect();
    if items.len() > limit {
        lines.push(format!("... and {} more", items.len() - limit));
    }
    lines
}

/// Write the report to `output_file`, or print JSON to stdout when only
/// `--json` was given.
pub(super) fn write_report(
    results: &ScanResults,
    output_file: Option<&Path>,
    force_json: bool,
) -> anyhow::Result<()> {
    match output_file {
        Some(path) => {
            let format = if force_json {
                ExportFormat::Json
            } else {
                ExportFormat::from_path(path)
            };
            export_to_file(results, path, format)?;
            println!();
            println!("{} Report saved to {}", style("✓").green(), path.display());
        }
        None if force_json => {
            println!("{}", JsonExporter.export_string(results)?);
        }
        None => {}
    }
    Ok(())
}
