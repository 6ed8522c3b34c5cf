use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use loghound_core::models::Report;
use loghound_core::narrative;

#[derive(Args)]
pub struct ExportArgs {
    /// Path to the case directory (output of `analyze`)
    pub case_dir: PathBuf,

    /// Re-render the Markdown report
    #[arg(long, default_value_t = false)]
    pub markdown: bool,

    /// Print the executive summary to the console
    #[arg(long, default_value_t = false)]
    pub summary: bool,

    /// Output file path (defaults to <case_dir>/report.md)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn run(args: ExportArgs) -> Result<()> {
    let report_path = args.case_dir.join("report.json");
    let raw = std::fs::read_to_string(&report_path)
        .with_context(|| format!("cannot read {}", report_path.display()))?;
    let report: Report = serde_json::from_str(&raw)
        .with_context(|| format!("invalid report in {}", report_path.display()))?;

    if args.summary || !args.markdown {
        let summary = report
            .executive_summary
            .clone()
            .unwrap_or_else(|| narrative::generate_executive_summary(&report));
        println!(
            "  {} ({} incident(s))",
            console::style("executive summary").cyan().bold(),
            report.incidents.len(),
        );
        println!("\n{}\n", summary);
    }

    if args.markdown {
        let out_path = args
            .output
            .unwrap_or_else(|| args.case_dir.join("report.md"));
        std::fs::write(&out_path, narrative::render_markdown(&report))
            .with_context(|| format!("failed to write {}", out_path.display()))?;
        println!(
            "  {} {}",
            console::style("markdown ->").green().bold(),
            out_path.display(),
        );
    }

    Ok(())
}
