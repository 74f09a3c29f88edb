//! Inspection Panel Core
//!
//! Real-time state synchronization for the vision inspection operator panel
//!
//! ## Architecture (6 Components)
//!
//! 1. BackendClient - REST adapter (NOK list, PLC status, conveyor command)
//! 2. EventStreamClient - WebSocket FrameEvent subscription with fixed-delay reconnect
//! 3. HistoryCache - NOK history strip, polled on a fixed interval
//! 4. PulseSimulator - Synthetic heartbeat / request / valid timing
//! 5. StateReconciler - Field-level merge into immutable render snapshots
//! 6. Dashboard - Lifecycle owner wiring the above on mount
//!
//! ## Design Principles
//!
//! - Snapshots are replaced, never mutated
//! - Every timer is owned by a handle and cancelled on drop
//! - Transport failures are recovered locally and surfaced as values

pub mod backend_client;
pub mod dashboard;
pub mod error;
pub mod event_stream;
pub mod history_cache;
pub mod models;
pub mod pulse_simulator;
pub mod reconciler;
pub mod state;

pub use dashboard::Dashboard;
pub use error::{Error, Result};
pub use state::AppConfig;
