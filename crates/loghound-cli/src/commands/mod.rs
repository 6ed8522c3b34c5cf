pub mod analyze;
pub mod export;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "loghound",
    about = "Firewall log behavioral anomaly detection engine",
    long_about = "LogHound - behavioral anomaly detection for firewall logs:\n\
                  repeated-attempt bursts, multi-port scanning, and statistical\n\
                  traffic spikes, risk-scored and mapped to MITRE ATT&CK.",
    version,
    propagate_version = true,
    styles = get_styles(),
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a firewall log: parse, detect, score, write report
    Analyze(analyze::AnalyzeArgs),

    /// Re-render a saved case as Markdown or print its summary
    Export(export::ExportArgs),
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Analyze(args) => analyze::run(args),
        Commands::Export(args) => export::run(args),
    }
}

fn get_styles() -> clap::builder::Styles {
    clap::builder::Styles::styled()
        .header(
            clap::builder::styling::AnsiColor::BrightCyan
                .on_default()
                .bold(),
        )
        .usage(
            clap::builder::styling::AnsiColor::BrightCyan
                .on_default()
                .bold(),
        )
        .literal(
            clap::builder::styling::AnsiColor::BrightGreen
                .on_default()
                .bold(),
        )
        .placeholder(
            clap::builder::styling::AnsiColor::BrightWhite
                .on_default()
                .dimmed(),
        )
}
