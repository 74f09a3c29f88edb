//! Shared data models
//!
//! Wire types pushed or served by the inspection backend, plus the
//! client-side records derived from them.

pub mod view;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Bounding box in percentage coordinates of the source frame
///
/// Encoded on the wire as `[x, y, width, height]`, each in 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }
}

impl From<[f32; 4]> for BBox {
    fn from([x, y, width, height]: [f32; 4]) -> Self {
        Self { x, y, width, height }
    }
}

impl From<BBox> for [f32; 4] {
    fn from(b: BBox) -> Self {
        [b.x, b.y, b.width, b.height]
    }
}

/// One detected region in a frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub class_name: String,
    /// 0.0 - 1.0
    pub confidence: f32,
    pub bbox: BBox,
}

/// Inspection decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Ok,
    Nok,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Ok => write!(f, "OK"),
            Decision::Nok => write!(f, "NOK"),
        }
    }
}

/// Externally observed controller state
///
/// Also the body of `GET /api/plc/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlcSnapshot {
    pub online: bool,
    pub request: bool,
    pub valid: bool,
    #[serde(default)]
    pub last_decision: Option<Decision>,
}

/// One inspection cycle result pushed over `/ws/events`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameEvent {
    pub fps: f32,
    pub ok: bool,
    #[serde(default)]
    pub detections: Vec<DetectionRecord>,
    pub plc: PlcSnapshot,
}

impl FrameEvent {
    /// Decode a single stream message
    pub fn from_json(text: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// NOK severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::High => write!(f, "high"),
            Severity::Medium => write!(f, "medium"),
            Severity::Low => write!(f, "low"),
        }
    }
}

/// Entry of `GET /api/nok/list`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NokItem {
    /// Opaque file identifier
    pub name: String,
    pub ts: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
}

/// NOK history strip entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub name: String,
    pub timestamp: String,
    pub severity: Severity,
}

impl HistoryItem {
    /// Build from a backend record, falling back to `default_severity`
    pub fn from_nok(item: NokItem, default_severity: Severity) -> Self {
        Self {
            timestamp: view::format_timestamp(&item.ts),
            severity: item.severity.unwrap_or(default_severity),
            name: item.name,
        }
    }
}

/// Event stream connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Disconnected => write!(f, "disconnected"),
        }
    }
}

/// Conveyor command body
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConveyorCommand {
    pub on: bool,
}
