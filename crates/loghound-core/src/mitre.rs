use crate::models::{DetectionType, IncidentDraft};

/// Map a draft incident to a MITRE ATT&CK technique label. Detection type
/// decides first; burst incidents then branch on the targeted port.
pub fn technique_for(draft: &IncidentDraft) -> &'static str {
    match draft.detection_type {
        DetectionType::MultiPortScan => "T1595 - Active Scanning",
        DetectionType::StatisticalSpike => "T1498 - Network Denial of Service (Potential)",
        DetectionType::BurstActivity => match draft.dest_port.as_specific() {
            Some("22") => "T1110 - Brute Force",
            Some("3389") => "T1110 - Brute Force (RDP)",
            Some("445") => "T1021 - Remote Services",
            _ => "T1595 - Active Scanning",
        },
    }
}
