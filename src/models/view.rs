//! Presentation helpers
//!
//! Pure text derivations shared by any panel renderer. No state, no I/O.

use super::{Decision, DetectionRecord};
use chrono::{DateTime, Local};

/// Verdict badge text for a frame
pub fn verdict_label(ok: bool) -> &'static str {
    if ok {
        "OK"
    } else {
        "NOK DETECTED"
    }
}

/// Overlay caption, e.g. `scratch: 85%`
pub fn overlay_label(detection: &DetectionRecord) -> String {
    format!(
        "{}: {}%",
        detection.class_name,
        (detection.confidence.clamp(0.0, 1.0) * 100.0).round() as u32
    )
}

/// PLC badge text
pub fn online_label(online: bool) -> &'static str {
    if online {
        "ONLINE"
    } else {
        "OFFLINE"
    }
}

/// Result badge text
pub fn decision_label(decision: Option<Decision>) -> Option<&'static str> {
    decision.map(|d| match d {
        Decision::Ok => "OK",
        Decision::Nok => "NOK",
    })
}

/// Conveyor status text
pub fn conveyor_label(running: bool) -> &'static str {
    if running {
        "RUNNING"
    } else {
        "STOPPED"
    }
}

/// `HH:MM:SS` uptime
pub fn format_uptime(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let secs = total_secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

/// Render a backend timestamp for the history strip
///
/// RFC 3339 values become local `HH:MM:SS`; anything else is shown verbatim.
pub fn format_timestamp(ts: &str) -> String {
    match DateTime::parse_from_rfc3339(ts) {
        Ok(dt) => dt.with_timezone(&Local).format("%H:%M:%S").to_string(),
        Err(_) => ts.to_string(),
    }
}
