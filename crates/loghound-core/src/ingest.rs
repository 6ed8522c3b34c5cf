use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::models::LogEvent;

static TIMESTAMP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\w+\s+\d+\s+\d+:\d+:\d+)").unwrap());

static FIELDS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"SRC=(?P<src>\S+) DST=(?P<dst>\S+).*?PROTO=(?P<proto>\S+) SPT=(?P<spt>\S+) DPT=(?P<dpt>\S+)")
        .unwrap()
});

/// Parse one UFW/iptables syslog line. Lines without the firewall field
/// block degrade to an event carrying only the raw text and any leading
/// timestamp; they are never an error.
pub fn parse_log_line(line: &str, year: i32) -> LogEvent {
    let timestamp = TIMESTAMP_RE
        .captures(line)
        .and_then(|caps| parse_syslog_timestamp(caps.get(1).unwrap().as_str(), year));

    match FIELDS_RE.captures(line) {
        Some(caps) => LogEvent {
            timestamp,
            source: Some(caps["src"].to_string()),
            destination: Some(caps["dst"].to_string()),
            protocol: Some(caps["proto"].to_string()),
            source_port: Some(caps["spt"].to_string()),
            dest_port: Some(caps["dpt"].to_string()),
            raw: line.trim_end().to_string(),
        },
        None => LogEvent::unmatched(line.trim(), timestamp),
    }
}

fn parse_syslog_timestamp(text: &str, year: i32) -> Option<DateTime<Utc>> {
    // Syslog pads single-digit days with a second space ("Mar  5"), which
    // the fixed format string will not accept.
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    NaiveDateTime::parse_from_str(&format!("{year} {normalized}"), "%Y %b %d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

// ---------------------------------------------------------------------------
// LogIngestor: file-level ingest with provenance for the report
// ---------------------------------------------------------------------------

pub struct LogIngestor {
    pub filename: String,
    pub file_sha256: String,
    pub file_size: u64,
    pub total_lines: u64,
    pub matched_events: u64,
    pub unmatched_lines: u64,
    pub first_timestamp: Option<DateTime<Utc>>,
    pub last_timestamp: Option<DateTime<Utc>>,
    pub events: Vec<LogEvent>,
}

impl LogIngestor {
    pub fn from_file(path: &Path) -> Result<Self> {
        let filename = path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let file_size = std::fs::metadata(path)
            .with_context(|| format!("cannot stat {}", path.display()))?
            .len();

        let file_sha256 = compute_file_sha256(path)?;

        let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
        let reader = BufReader::new(file);

        // UFW lines carry no year; assume the current one.
        let year = Utc::now().year();

        let mut events = Vec::new();
        let mut total_lines = 0u64;
        let mut matched_events = 0u64;
        let mut unmatched_lines = 0u64;
        let mut first_timestamp: Option<DateTime<Utc>> = None;
        let mut last_timestamp: Option<DateTime<Utc>> = None;

        for line in reader.lines() {
            let line = line.with_context(|| format!("cannot read {}", path.display()))?;
            total_lines += 1;

            let event = parse_log_line(&line, year);
            if event.source.is_some() {
                matched_events += 1;
            } else {
                unmatched_lines += 1;
            }

            if let Some(ts) = event.timestamp {
                if first_timestamp.map_or(true, |first| ts < first) {
                    first_timestamp = Some(ts);
                }
                if last_timestamp.map_or(true, |last| ts > last) {
                    last_timestamp = Some(ts);
                }
            }

            events.push(event);
        }

        tracing::info!(
            file = %filename,
            lines = total_lines,
            matched = matched_events,
            sha256 = %file_sha256,
            "ingested firewall log"
        );

        Ok(Self {
            filename,
            file_sha256,
            file_size,
            total_lines,
            matched_events,
            unmatched_lines,
            first_timestamp,
            last_timestamp,
            events,
        })
    }
}

fn compute_file_sha256(path: &Path) -> Result<String> {
    let mut file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)
        .with_context(|| format!("cannot read {}", path.display()))?;
    Ok(format!("{:x}", hasher.finalize()))
}
