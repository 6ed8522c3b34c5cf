use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;

use loghound_core::detect;
use loghound_core::ingest::LogIngestor;
use loghound_core::models::*;
use loghound_core::narrative;

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Path to the firewall log file (UFW/iptables syslog format)
    pub log: PathBuf,

    /// Output directory for case files (report.json, report.md)
    #[arg(short, long, default_value = "case")]
    pub out: PathBuf,

    /// Minimum repeated attempts for burst detection
    #[arg(short, long, default_value_t = 5)]
    pub threshold: usize,

    /// Time window in seconds for burst and scan detection
    #[arg(short, long, default_value_t = 60)]
    pub window: u64,
}

pub fn run(args: AnalyzeArgs) -> Result<()> {
    let started = Instant::now();

    // 1. Ingest log
    println!(
        "  {} {}",
        console::style("[1/4] ingesting").cyan().bold(),
        args.log.display(),
    );

    let ingestor = LogIngestor::from_file(&args.log)
        .with_context(|| format!("failed to ingest {}", args.log.display()))?;

    println!(
        "        {} lines ({} firewall events, {} unmatched), sha256:{}",
        console::style(ingestor.total_lines).green().bold(),
        ingestor.matched_events,
        ingestor.unmatched_lines,
        &ingestor.file_sha256[..16],
    );

    if ingestor.events.is_empty() {
        println!(
            "  {} no lines found in this file",
            console::style("warning:").yellow().bold(),
        );
        return Ok(());
    }

    // 2. Detection
    println!(
        "  {}",
        console::style("[2/4] running detection").cyan().bold(),
    );

    let config = DetectorConfig {
        burst_threshold: args.threshold,
        window_seconds: args.window,
        ..DetectorConfig::default()
    };
    let incidents = detect::run_detection(&ingestor.events, &config);

    if incidents.is_empty() {
        println!("        no suspicious activity detected");
    } else {
        println!(
            "        {} {} incident(s)",
            console::style("SUSPICIOUS ACTIVITY:").red().bold(),
            console::style(incidents.len()).red().bold(),
        );
        for (i, incident) in incidents.iter().enumerate() {
            let sev_style = match incident.severity {
                Severity::High => console::style(incident.severity.label()).red().bold(),
                Severity::Medium => console::style(incident.severity.label()).yellow(),
                Severity::Low => console::style(incident.severity.label()).cyan(),
            };
            println!(
                "          [{}] {} {} from {} (score: {}, conf: {:.0}%)",
                i + 1,
                sev_style,
                incident.detection_type.label(),
                incident.source,
                incident.risk_score,
                incident.confidence * 100.0,
            );
        }
    }

    // 3. Build report
    println!(
        "  {}",
        console::style("[3/4] building report").cyan().bold(),
    );

    let statistics = compute_statistics(&ingestor.events, incidents.len());
    let mut report = Report {
        metadata: ReportMetadata {
            loghound_version: loghound_core::VERSION.to_string(),
            generated_at: chrono::Utc::now(),
            log_filename: ingestor.filename,
            log_sha256: ingestor.file_sha256,
            log_size_bytes: ingestor.file_size,
            total_lines: ingestor.total_lines,
            matched_events: ingestor.matched_events,
            unmatched_lines: ingestor.unmatched_lines,
            first_event: ingestor.first_timestamp,
            last_event: ingestor.last_timestamp,
        },
        executive_summary: None,
        incidents,
        statistics,
    };
    report.executive_summary = Some(narrative::generate_executive_summary(&report));

    // 4. Write report
    println!(
        "  {}",
        console::style("[4/4] writing report").cyan().bold(),
    );

    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("cannot create output dir {}", args.out.display()))?;

    let elapsed = started.elapsed();
    report.statistics.analysis_duration_ms = elapsed.as_millis() as u64;

    let json_path = args.out.join("report.json");
    let report_json =
        serde_json::to_string_pretty(&report).context("failed to serialize report")?;
    std::fs::write(&json_path, &report_json)
        .with_context(|| format!("failed to write {}", json_path.display()))?;

    let md_path = args.out.join("report.md");
    std::fs::write(&md_path, narrative::render_markdown(&report))
        .with_context(|| format!("failed to write {}", md_path.display()))?;

    println!();
    println!(
        "  {} {}",
        console::style("report ->").green().bold(),
        json_path.display(),
    );
    println!(
        "  {} {}",
        console::style("report ->").green().bold(),
        md_path.display(),
    );
    println!(
        "  {} {:.1}ms",
        console::style("completed in").white().bold(),
        elapsed.as_secs_f64() * 1000.0,
    );

    Ok(())
}

fn compute_statistics(events: &[LogEvent], total_incidents: usize) -> AnalysisStatistics {
    let mut sources: HashMap<String, u64> = HashMap::new();
    let mut ports: HashMap<String, u64> = HashMap::new();
    let mut protocols: HashMap<String, u64> = HashMap::new();

    for event in events {
        if let Some(src) = &event.source {
            *sources.entry(src.clone()).or_insert(0) += 1;
        }
        if let Some(dpt) = &event.dest_port {
            *ports.entry(dpt.clone()).or_insert(0) += 1;
        }
        if let Some(proto) = &event.protocol {
            *protocols.entry(proto.clone()).or_insert(0) += 1;
        }
    }

    let mut top_sources: Vec<_> = sources.into_iter().collect();
    top_sources.sort_by(|a, b| b.1.cmp(&a.1));
    top_sources.truncate(20);

    let mut top_ports: Vec<_> = ports.into_iter().collect();
    top_ports.sort_by(|a, b| b.1.cmp(&a.1));
    top_ports.truncate(20);

    AnalysisStatistics {
        protocol_breakdown: protocols,
        top_sources,
        top_ports,
        total_incidents: total_incidents as u64,
        analysis_duration_ms: 0,
    }
}
