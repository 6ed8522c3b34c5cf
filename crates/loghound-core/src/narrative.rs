use crate::models::*;

pub fn generate_executive_summary(report: &Report) -> String {
    let mut parts: Vec<String> = Vec::new();

    let m = &report.metadata;
    let span_secs = m
        .first_event
        .zip(m.last_event)
        .map(|(first, last)| last.signed_duration_since(first).num_seconds())
        .unwrap_or(0);
    parts.push(format!(
        "This log ({}) contains {} lines, {} of which parsed into firewall events spanning {} seconds.",
        m.log_filename, m.total_lines, m.matched_events, span_secs,
    ));

    if !report.statistics.top_sources.is_empty() {
        let top: Vec<String> = report
            .statistics
            .top_sources
            .iter()
            .take(3)
            .map(|(src, count)| format!("{} ({})", src, count))
            .collect();
        parts.push(format!("Most active sources: {}.", top.join(", ")));
    }

    if report.incidents.is_empty() {
        parts.push("No suspicious activity was detected.".to_string());
        return parts.join(" ");
    }

    let high = report
        .incidents
        .iter()
        .filter(|i| i.severity == Severity::High)
        .count();
    let medium = report
        .incidents
        .iter()
        .filter(|i| i.severity == Severity::Medium)
        .count();
    let low = report
        .incidents
        .iter()
        .filter(|i| i.severity == Severity::Low)
        .count();

    let mut sev_parts = Vec::new();
    if high > 0 {
        sev_parts.push(format!("{} high", high));
    }
    if medium > 0 {
        sev_parts.push(format!("{} medium", medium));
    }
    if low > 0 {
        sev_parts.push(format!("{} low", low));
    }
    parts.push(format!(
        "Detection produced {} incident(s): {}.",
        report.incidents.len(),
        sev_parts.join(", "),
    ));

    let scans = report
        .incidents
        .iter()
        .filter(|i| i.detection_type == DetectionType::MultiPortScan)
        .count();
    if scans > 0 {
        parts.push(format!(
            "RECONNAISSANCE INDICATORS: {} source(s) probed multiple destination ports inside the detection window.",
            scans,
        ));
    }

    let spikes: Vec<&Incident> = report
        .incidents
        .iter()
        .filter(|i| i.detection_type == DetectionType::StatisticalSpike)
        .collect();
    if !spikes.is_empty() {
        let sources: Vec<&str> = spikes.iter().map(|i| i.source.as_str()).collect();
        parts.push(format!(
            "VOLUME ANOMALIES: traffic from {} is a statistical outlier against the source population, consistent with denial-of-service activity.",
            sources.join(", "),
        ));
    }

    if let Some(worst) = report.incidents.iter().max_by(|a, b| {
        a.severity.cmp(&b.severity).then(a.risk_score.cmp(&b.risk_score))
    }) {
        parts.push(format!(
            "Highest-risk incident: {} from {} ({}, risk score {}).",
            worst.detection_type.label(),
            worst.source,
            worst.mitre_technique,
            worst.risk_score,
        ));
    }

    parts.join(" ")
}

/// Render the operator-facing Markdown report.
pub fn render_markdown(report: &Report) -> String {
    let mut out = String::new();
    out.push_str("# Firewall Behavioral Anomaly Detection Report\n\n");

    if report.incidents.is_empty() {
        out.push_str("No suspicious activity detected.\n");
        return out;
    }

    if let Some(summary) = &report.executive_summary {
        out.push_str(summary);
        out.push_str("\n\n---\n\n");
    }

    for (i, incident) in report.incidents.iter().enumerate() {
        out.push_str(&format!("## Incident {}\n\n", i + 1));
        out.push_str(&format!(
            "**Detection Type:** {}  \n",
            incident.detection_type.label()
        ));
        out.push_str(&format!("**Source IP:** {}  \n", incident.source));
        out.push_str(&format!("**Target:** {}  \n", incident.destination));
        out.push_str(&format!("**Port(s):** {}  \n\n", incident.dest_port));

        out.push_str(&format!("**Severity:** {}  \n", incident.severity.label()));
        out.push_str(&format!("**Risk Score:** {}  \n", incident.risk_score));
        out.push_str(&format!("**Confidence:** {}  \n", incident.confidence));
        if let Some(z) = incident.z_score {
            out.push_str(&format!("**Z-Score:** {}  \n", z));
        }
        out.push_str(&format!(
            "**MITRE Technique:** {}  \n\n",
            incident.mitre_technique
        ));

        out.push_str("---\n\n");
    }

    out
}
