use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Log events: the normalized output of the ingest layer
// ---------------------------------------------------------------------------

/// One firewall log line after parsing. Lines that never matched the field
/// pattern still become events, carrying only `raw` and (possibly) a
/// timestamp; the detectors skip anything missing the fields they group by.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    pub timestamp: Option<DateTime<Utc>>,
    pub source: Option<String>,
    pub destination: Option<String>,
    pub protocol: Option<String>,
    pub source_port: Option<String>,
    pub dest_port: Option<String>,
    pub raw: String,
}

impl LogEvent {
    pub fn unmatched(raw: impl Into<String>, timestamp: Option<DateTime<Utc>>) -> Self {
        Self {
            timestamp,
            source: None,
            destination: None,
            protocol: None,
            source_port: None,
            dest_port: None,
            raw: raw.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Incident targets
// ---------------------------------------------------------------------------

/// Destination address or port on an incident. Scan and spike detections
/// aggregate over many targets, which must not be confused with a real
/// address; rendering shows `Aggregate` as "Multiple".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Specific(String),
    Aggregate,
}

impl Target {
    pub fn specific(value: impl Into<String>) -> Self {
        Self::Specific(value.into())
    }

    pub fn as_specific(&self) -> Option<&str> {
        match self {
            Self::Specific(value) => Some(value),
            Self::Aggregate => None,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Specific(value) => f.write_str(value),
            Self::Aggregate => f.write_str("Multiple"),
        }
    }
}

// ---------------------------------------------------------------------------
// Detection results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DetectionType {
    BurstActivity,
    MultiPortScan,
    StatisticalSpike,
}

impl DetectionType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::BurstActivity => "Time-Window Burst Activity",
            Self::MultiPortScan => "Multi-Port Scanning",
            Self::StatisticalSpike => "Statistical Activity Spike",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

/// What a detector knows before enrichment: the pattern it saw and where.
#[derive(Debug, Clone)]
pub struct IncidentDraft {
    pub detection_type: DetectionType,
    pub source: String,
    pub destination: Target,
    pub dest_port: Target,
    pub count: usize,
    pub window_seconds: Option<u64>,
    pub z_score: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: u32,
    pub severity: Severity,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub id: String,
    pub detection_type: DetectionType,
    pub source: String,
    pub destination: Target,
    pub dest_port: Target,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z_score: Option<f64>,
    pub risk_score: u32,
    pub severity: Severity,
    pub confidence: f64,
    pub mitre_technique: String,
    pub detected_at: DateTime<Utc>,
}

impl Incident {
    /// The only way to build an incident: a draft plus its enrichment.
    /// Detectors cannot hand out incidents that skipped scoring or
    /// technique mapping.
    pub fn from_draft(
        draft: IncidentDraft,
        risk: RiskAssessment,
        technique: impl Into<String>,
    ) -> Self {
        Self {
            id: format!("I-{}", Uuid::new_v4().as_simple()),
            detection_type: draft.detection_type,
            source: draft.source,
            destination: draft.destination,
            dest_port: draft.dest_port,
            count: draft.count,
            window_seconds: draft.window_seconds,
            z_score: draft.z_score,
            risk_score: risk.score,
            severity: risk.severity,
            confidence: risk.confidence,
            mitre_technique: technique.into(),
            detected_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Detector configuration
// ---------------------------------------------------------------------------

/// Tuning knobs for the detection pass. `burst_threshold` and
/// `window_seconds` are operator-facing; the remaining floors ship with the
/// values the detectors were calibrated against and are not exposed on the
/// CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Minimum repeated attempts for a burst incident.
    pub burst_threshold: usize,
    /// Trailing time window for the burst and scan detectors.
    pub window_seconds: u64,
    /// Distinct destination ports required for a scan incident.
    pub scan_port_floor: usize,
    /// Minimum z-score for a statistical spike.
    pub spike_z_floor: f64,
    /// Minimum absolute event count for a statistical spike.
    pub spike_min_count: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            burst_threshold: 5,
            window_seconds: 60,
            scan_port_floor: 3,
            spike_z_floor: 1.5,
            spike_min_count: 8,
        }
    }
}

// ---------------------------------------------------------------------------
// The Report: top-level container, primary API contract
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub loghound_version: String,
    pub generated_at: DateTime<Utc>,
    pub log_filename: String,
    pub log_sha256: String,
    pub log_size_bytes: u64,
    pub total_lines: u64,
    pub matched_events: u64,
    pub unmatched_lines: u64,
    pub first_event: Option<DateTime<Utc>>,
    pub last_event: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub executive_summary: Option<String>,
    pub incidents: Vec<Incident>,
    pub statistics: AnalysisStatistics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisStatistics {
    pub protocol_breakdown: HashMap<String, u64>,
    pub top_sources: Vec<(String, u64)>,
    pub top_ports: Vec<(String, u64)>,
    pub total_incidents: u64,
    pub analysis_duration_ms: u64,
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
