use crate::models::{round2, DetectionType, IncidentDraft, RiskAssessment, Severity};

/// Ports whose abuse carries outsized impact: SSH, RDP, SMB, FTP, Telnet.
pub const PRIVILEGED_PORTS: &[&str] = &["22", "3389", "445", "21", "23"];

/// Additive rule table over a draft incident. Every rule that applies
/// contributes; the theoretical ceiling is 10 and confidence caps at 0.9.
pub fn assess(draft: &IncidentDraft) -> RiskAssessment {
    let mut score = 0u32;

    if draft.count >= 5 {
        score += 3;
    }
    if draft
        .dest_port
        .as_specific()
        .is_some_and(|port| PRIVILEGED_PORTS.contains(&port))
    {
        score += 2;
    }
    if draft.detection_type == DetectionType::MultiPortScan {
        score += 3;
    }
    if draft.detection_type == DetectionType::StatisticalSpike {
        score += 2;
    }
    if draft.count >= 10 {
        score += 2;
    }

    let severity = if score >= 6 {
        Severity::High
    } else if score >= 4 {
        Severity::Medium
    } else {
        Severity::Low
    };

    let confidence = round2((0.4 + score as f64 * 0.08).min(0.9));

    RiskAssessment {
        score,
        severity,
        confidence,
    }
}
