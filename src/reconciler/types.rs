//! Render snapshot types

use crate::models::view;
use crate::models::{BBox, ConnectionState, Decision, DetectionRecord, HistoryItem};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Where the request/valid/decision indicators currently come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    /// Latest FrameEvent on the current connection
    Live,
    /// Pulse simulator (no live PLC value since mount)
    Simulated,
    /// Link lost and no live value since: forced off, decision held
    Offline,
}

/// PLC status bar values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlcIndicators {
    pub online: bool,
    pub heartbeat: bool,
    pub request: bool,
    pub valid: bool,
    pub last_decision: Option<Decision>,
    pub conveyor_running: bool,
    pub source: SignalSource,
}

/// One detection box on the camera panel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overlay {
    /// e.g. `scratch: 85%`
    pub label: String,
    pub class_name: String,
    pub confidence: f32,
    /// Source-frame percentages; scaling is up to the renderer
    pub bbox: BBox,
}

impl From<&DetectionRecord> for Overlay {
    fn from(detection: &DetectionRecord) -> Self {
        Self {
            label: view::overlay_label(detection),
            class_name: detection.class_name.clone(),
            confidence: detection.confidence,
            bbox: detection.bbox,
        }
    }
}

/// Camera panel values from the latest FrameEvent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameView {
    pub fps: f32,
    pub ok: bool,
    /// `OK` or `NOK DETECTED`
    pub verdict: &'static str,
    pub overlays: Vec<Overlay>,
    /// The frame belongs to a connection that has since been lost
    pub stale: bool,
}

/// Immutable render snapshot handed to the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelSnapshot {
    /// Increases by one per reconciliation
    pub revision: u64,
    pub connection: ConnectionState,
    pub plc: PlcIndicators,
    pub frame: Option<FrameView>,
    pub history: Arc<Vec<HistoryItem>>,
    pub history_error: Option<String>,
    pub last_stream_error: Option<String>,
    pub uptime_secs: u64,
    pub updated_at: DateTime<Utc>,
}

impl PanelSnapshot {
    /// Formatted uptime for the footer
    pub fn uptime(&self) -> String {
        view::format_uptime(self.uptime_secs)
    }
}
