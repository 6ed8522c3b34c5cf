use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};

use crate::mitre;
use crate::models::*;
use crate::score;

/// Run all three detectors over the same event set and return the enriched
/// incidents concatenated in detector order: bursts, scans, spikes. The
/// detectors are independent; traffic flagged by more than one of them
/// yields one incident per detector, never a merged record.
pub fn run_detection(events: &[LogEvent], config: &DetectorConfig) -> Vec<Incident> {
    let mut drafts = Vec::new();
    drafts.extend(detect_bursts(events, config));
    drafts.extend(detect_port_scans(events, config));
    drafts.extend(detect_volume_spikes(events, config));

    let incidents: Vec<Incident> = drafts
        .into_iter()
        .map(|draft| {
            let risk = score::assess(&draft);
            let technique = mitre::technique_for(&draft);
            Incident::from_draft(draft, risk, technique)
        })
        .collect();

    tracing::info!(count = incidents.len(), "detection complete");
    incidents
}

/// Repeated attempts against one (source, destination, port) triple inside a
/// trailing time window. Only the earliest qualifying window per triple is
/// reported.
fn detect_bursts(events: &[LogEvent], config: &DetectorConfig) -> Vec<IncidentDraft> {
    let mut groups: BTreeMap<(&str, &str, &str), Vec<DateTime<Utc>>> = BTreeMap::new();
    for event in events {
        if let (Some(src), Some(dst), Some(dpt), Some(ts)) = (
            event.source.as_deref(),
            event.destination.as_deref(),
            event.dest_port.as_deref(),
            event.timestamp,
        ) {
            groups.entry((src, dst, dpt)).or_default().push(ts);
        }
    }

    let window = Duration::seconds(config.window_seconds as i64);
    let mut drafts = Vec::new();

    for ((src, dst, dpt), mut stamps) in groups {
        stamps.sort_unstable();

        // Sorted timestamps make the in-window set anchored at `start` a
        // contiguous prefix, and `end` never moves backward across anchors.
        let mut end = 0usize;
        for start in 0..stamps.len() {
            while end < stamps.len() && stamps[end] - stamps[start] <= window {
                end += 1;
            }
            if end - start >= config.burst_threshold {
                drafts.push(IncidentDraft {
                    detection_type: DetectionType::BurstActivity,
                    source: src.to_string(),
                    destination: Target::specific(dst),
                    dest_port: Target::specific(dpt),
                    count: end - start,
                    window_seconds: Some(config.window_seconds),
                    z_score: None,
                });
                break;
            }
        }
    }

    drafts
}

/// One source probing several distinct destination ports inside a trailing
/// time window. Destination and port aggregate over the probed set.
fn detect_port_scans(events: &[LogEvent], config: &DetectorConfig) -> Vec<IncidentDraft> {
    let mut groups: BTreeMap<&str, Vec<(DateTime<Utc>, &str)>> = BTreeMap::new();
    for event in events {
        if let (Some(src), Some(dpt), Some(ts)) = (
            event.source.as_deref(),
            event.dest_port.as_deref(),
            event.timestamp,
        ) {
            groups.entry(src).or_default().push((ts, dpt));
        }
    }

    let window = Duration::seconds(config.window_seconds as i64);
    let mut drafts = Vec::new();

    for (src, mut probes) in groups {
        probes.sort_unstable_by_key(|(ts, _)| *ts);

        // Multiset of ports currently inside the window [start, end).
        let mut in_window: HashMap<&str, usize> = HashMap::new();
        let mut end = 0usize;
        for start in 0..probes.len() {
            while end < probes.len() && probes[end].0 - probes[start].0 <= window {
                *in_window.entry(probes[end].1).or_insert(0) += 1;
                end += 1;
            }
            if in_window.len() >= config.scan_port_floor {
                drafts.push(IncidentDraft {
                    detection_type: DetectionType::MultiPortScan,
                    source: src.to_string(),
                    destination: Target::Aggregate,
                    dest_port: Target::Aggregate,
                    count: in_window.len(),
                    window_seconds: Some(config.window_seconds),
                    z_score: None,
                });
                break;
            }
            // Drop the anchor before sliding forward.
            if let Some(n) = in_window.get_mut(probes[start].1) {
                *n -= 1;
                if *n == 0 {
                    in_window.remove(probes[start].1);
                }
            }
        }
    }

    drafts
}

/// Sources whose total event volume is an outlier against the population of
/// all sources. Not time-windowed; a high z-score alone is not enough, the
/// absolute count floor must also be met.
fn detect_volume_spikes(events: &[LogEvent], config: &DetectorConfig) -> Vec<IncidentDraft> {
    let mut source_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for event in events {
        if let Some(src) = event.source.as_deref() {
            if !src.is_empty() {
                *source_counts.entry(src).or_insert(0) += 1;
            }
        }
    }

    if source_counts.is_empty() {
        return Vec::new();
    }

    let n = source_counts.len() as f64;
    let mean = source_counts.values().map(|c| *c as f64).sum::<f64>() / n;
    let variance = source_counts
        .values()
        .map(|c| (*c as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    let std_dev = variance.sqrt();

    let mut drafts = Vec::new();
    for (src, count) in source_counts {
        let z_score = if std_dev == 0.0 {
            // A flat population has no outliers to measure against; only
            // sources already past the absolute floor are worth reporting.
            if count >= config.spike_min_count {
                3.0
            } else {
                continue;
            }
        } else {
            (count as f64 - mean) / std_dev
        };

        if z_score >= config.spike_z_floor && count >= config.spike_min_count {
            drafts.push(IncidentDraft {
                detection_type: DetectionType::StatisticalSpike,
                source: src.to_string(),
                destination: Target::Aggregate,
                dest_port: Target::Aggregate,
                count,
                window_seconds: None,
                z_score: Some(round2(z_score)),
            });
        }
    }

    drafts
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 17, 0, 0).unwrap()
    }

    fn event(src: &str, dst: &str, dpt: &str, offset_secs: i64) -> LogEvent {
        LogEvent {
            timestamp: Some(base_time() + Duration::seconds(offset_secs)),
            source: Some(src.to_string()),
            destination: Some(dst.to_string()),
            protocol: Some("TCP".to_string()),
            source_port: Some("51234".to_string()),
            dest_port: Some(dpt.to_string()),
            raw: String::new(),
        }
    }

    #[test]
    fn test_burst_at_threshold_ssh() {
        // Five attempts on 10.0.0.1:22 within ten seconds, threshold five.
        let events: Vec<LogEvent> = (0..5)
            .map(|i| event("1.2.3.4", "10.0.0.1", "22", i * 2))
            .collect();

        let incidents = run_detection(&events, &DetectorConfig::default());

        assert_eq!(incidents.len(), 1);
        let incident = &incidents[0];
        assert_eq!(incident.detection_type, DetectionType::BurstActivity);
        assert_eq!(incident.source, "1.2.3.4");
        assert_eq!(incident.destination, Target::specific("10.0.0.1"));
        assert_eq!(incident.dest_port, Target::specific("22"));
        assert_eq!(incident.count, 5);
        assert_eq!(incident.window_seconds, Some(60));
        assert_eq!(incident.risk_score, 5);
        assert_eq!(incident.severity, Severity::Medium);
        assert_eq!(incident.confidence, 0.8);
        assert_eq!(incident.mitre_technique, "T1110 - Brute Force");
    }

    #[test]
    fn test_burst_below_threshold_is_silent() {
        let events: Vec<LogEvent> = (0..4)
            .map(|i| event("1.2.3.4", "10.0.0.1", "22", i * 2))
            .collect();

        let incidents = run_detection(&events, &DetectorConfig::default());
        assert!(incidents.is_empty());
    }

    #[test]
    fn test_burst_earliest_window_only() {
        // Ten hits one second apart with threshold three: every start index
        // qualifies, but only the earliest window may be reported.
        let events: Vec<LogEvent> = (0..10)
            .map(|i| event("1.2.3.4", "10.0.0.1", "80", i))
            .collect();

        let config = DetectorConfig {
            burst_threshold: 3,
            ..DetectorConfig::default()
        };
        let drafts = detect_bursts(&events, &config);

        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].count, 10);
    }

    #[test]
    fn test_burst_window_boundary() {
        // Events at 0s, 60s, and 120s: exactly-at-window is inside, one past
        // is not. Threshold two fires on the [0s, 60s] pair.
        let events = vec![
            event("1.2.3.4", "10.0.0.1", "443", 0),
            event("1.2.3.4", "10.0.0.1", "443", 60),
            event("1.2.3.4", "10.0.0.1", "443", 121),
        ];

        let config = DetectorConfig {
            burst_threshold: 2,
            ..DetectorConfig::default()
        };
        let drafts = detect_bursts(&events, &config);

        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].count, 2);
    }

    #[test]
    fn test_burst_groups_by_triple() {
        // Same source, two destinations: neither triple reaches the threshold
        // on its own.
        let mut events: Vec<LogEvent> = (0..3)
            .map(|i| event("1.2.3.4", "10.0.0.1", "22", i))
            .collect();
        events.extend((0..3).map(|i| event("1.2.3.4", "10.0.0.2", "22", i)));

        let drafts = detect_bursts(&events, &DetectorConfig::default());
        assert!(drafts.is_empty());
    }

    #[test]
    fn test_scan_two_ports_is_silent() {
        let events = vec![
            event("5.5.5.5", "10.0.0.1", "80", 0),
            event("5.5.5.5", "10.0.0.1", "443", 5),
        ];

        let drafts = detect_port_scans(&events, &DetectorConfig::default());
        assert!(drafts.is_empty());
    }

    #[test]
    fn test_scan_three_ports_in_window() {
        let events = vec![
            event("5.5.5.5", "10.0.0.1", "80", 0),
            event("5.5.5.5", "10.0.0.1", "443", 10),
            event("5.5.5.5", "10.0.0.1", "8080", 20),
        ];

        let incidents = run_detection(&events, &DetectorConfig::default());

        assert_eq!(incidents.len(), 1);
        let incident = &incidents[0];
        assert_eq!(incident.detection_type, DetectionType::MultiPortScan);
        assert_eq!(incident.source, "5.5.5.5");
        assert_eq!(incident.destination, Target::Aggregate);
        assert_eq!(incident.dest_port, Target::Aggregate);
        assert_eq!(incident.count, 3);
        assert_eq!(incident.risk_score, 3);
        assert_eq!(incident.severity, Severity::Low);
        assert_eq!(incident.confidence, 0.64);
        assert_eq!(incident.mitre_technique, "T1595 - Active Scanning");
    }

    #[test]
    fn test_scan_window_excludes_late_port() {
        // Third distinct port arrives two minutes after the first two; no
        // anchor ever sees three ports at once.
        let events = vec![
            event("5.5.5.5", "10.0.0.1", "80", 0),
            event("5.5.5.5", "10.0.0.1", "443", 10),
            event("5.5.5.5", "10.0.0.1", "8080", 120),
        ];

        let drafts = detect_port_scans(&events, &DetectorConfig::default());
        assert!(drafts.is_empty());
    }

    #[test]
    fn test_scan_repeat_ports_count_distinct() {
        // Six probes but only two distinct ports.
        let events = vec![
            event("5.5.5.5", "10.0.0.1", "80", 0),
            event("5.5.5.5", "10.0.0.1", "443", 1),
            event("5.5.5.5", "10.0.0.1", "80", 2),
            event("5.5.5.5", "10.0.0.1", "443", 3),
            event("5.5.5.5", "10.0.0.1", "80", 4),
            event("5.5.5.5", "10.0.0.1", "443", 5),
        ];

        let drafts = detect_port_scans(&events, &DetectorConfig::default());
        assert!(drafts.is_empty());
    }

    #[test]
    fn test_spike_population_outlier() {
        // Per-source counts {A:50, B:5, C:5, D:4}: mean 16, population std
        // dev ~19.63, so only A clears z >= 1.5 with count >= 8.
        let mut events = Vec::new();
        for (src, count) in [("A", 50), ("B", 5), ("C", 5), ("D", 4)] {
            for i in 0..count {
                events.push(event(src, "10.0.0.1", "80", i));
            }
        }

        let drafts = detect_volume_spikes(&events, &DetectorConfig::default());

        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].source, "A");
        assert_eq!(drafts[0].count, 50);
        assert_eq!(drafts[0].z_score, Some(1.73));
        assert_eq!(drafts[0].window_seconds, None);
    }

    #[test]
    fn test_spike_needs_high_z_even_with_volume() {
        // Three equally busy sources plus one quiet one: the busy counts sit
        // well under z 1.5 despite clearing the absolute floor.
        let mut events = Vec::new();
        for (src, count) in [("A", 20), ("B", 20), ("C", 20), ("D", 2)] {
            for i in 0..count {
                events.push(event(src, "10.0.0.1", "80", i));
            }
        }

        let drafts = detect_volume_spikes(&events, &DetectorConfig::default());
        assert!(drafts.is_empty());
    }

    #[test]
    fn test_spike_needs_volume_even_with_high_z() {
        // Counts {6,1,1,1,1}: z for the six is exactly 2.0 but the count
        // floor of eight is not met.
        let mut events = Vec::new();
        for (src, count) in [("A", 6), ("B", 1), ("C", 1), ("D", 1), ("E", 1)] {
            for i in 0..count {
                events.push(event(src, "10.0.0.1", "80", i));
            }
        }

        let drafts = detect_volume_spikes(&events, &DetectorConfig::default());
        assert!(drafts.is_empty());
    }

    #[test]
    fn test_spike_zero_variance_fallback() {
        // All sources equally busy: no measurable outliers, but counts past
        // the absolute floor still report with the fallback z of 3.
        let mut events = Vec::new();
        for src in ["A", "B", "C"] {
            for i in 0..8 {
                events.push(event(src, "10.0.0.1", "80", i));
            }
        }

        let drafts = detect_volume_spikes(&events, &DetectorConfig::default());
        assert_eq!(drafts.len(), 3);
        assert!(drafts.iter().all(|d| d.z_score == Some(3.0)));
        assert!(drafts.iter().all(|d| d.count == 8));
    }

    #[test]
    fn test_spike_zero_variance_below_floor_is_silent() {
        let mut events = Vec::new();
        for src in ["A", "B"] {
            for i in 0..5 {
                events.push(event(src, "10.0.0.1", "80", i));
            }
        }

        let drafts = detect_volume_spikes(&events, &DetectorConfig::default());
        assert!(drafts.is_empty());
    }

    #[test]
    fn test_incomplete_events_are_invisible() {
        // Missing destination: the burst detector skips it, the scan
        // detector still sees the port probe.
        let mut probe = event("1.2.3.4", "10.0.0.1", "22", 0);
        probe.destination = None;
        // Missing timestamp: invisible to both windowed detectors.
        let mut stale = event("1.2.3.4", "10.0.0.1", "22", 0);
        stale.timestamp = None;

        let events = vec![probe, stale, LogEvent::unmatched("noise", None)];
        let config = DetectorConfig {
            burst_threshold: 1,
            scan_port_floor: 1,
            ..DetectorConfig::default()
        };

        assert!(detect_bursts(&events, &config).is_empty());
        assert_eq!(detect_port_scans(&events, &config).len(), 1);
    }

    #[test]
    fn test_empty_input() {
        let incidents = run_detection(&[], &DetectorConfig::default());
        assert!(incidents.is_empty());
    }

    #[test]
    fn test_orchestrator_order_and_no_dedup() {
        // One source bursting hard enough to also be a statistical outlier,
        // a second source scanning ports, and filler sources to anchor the
        // population. The bursting source appears twice, unmerged.
        let mut events = Vec::new();
        for i in 0..50 {
            events.push(event("9.9.9.9", "10.0.0.1", "22", i));
        }
        events.push(event("8.8.8.8", "10.0.0.2", "80", 0));
        events.push(event("8.8.8.8", "10.0.0.2", "443", 1));
        events.push(event("8.8.8.8", "10.0.0.2", "8080", 2));
        for src in ["7.7.7.7", "6.6.6.6", "3.3.3.3"] {
            for i in 0..3 {
                events.push(event(src, "10.0.0.3", "53", i));
            }
        }

        let incidents = run_detection(&events, &DetectorConfig::default());

        let types: Vec<DetectionType> =
            incidents.iter().map(|i| i.detection_type).collect();
        assert_eq!(
            types,
            vec![
                DetectionType::BurstActivity,
                DetectionType::MultiPortScan,
                DetectionType::StatisticalSpike,
            ]
        );
        assert_eq!(incidents[0].source, "9.9.9.9");
        assert_eq!(incidents[1].source, "8.8.8.8");
        assert_eq!(incidents[2].source, "9.9.9.9");
        assert!(incidents
            .iter()
            .all(|i| !i.mitre_technique.is_empty() && i.confidence >= 0.4));
    }
}
