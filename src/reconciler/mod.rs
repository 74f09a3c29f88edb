//! StateReconciler - Render Snapshot Composition
//!
//! ## Responsibilities
//!
//! - Merge event stream, history cache and pulse simulator output
//! - Field-level precedence between live and client-local values
//! - Conveyor command gating (state changes only after backend success)
//! - Publish one immutable `PanelSnapshot` per upstream emission
//!
//! ## Precedence
//!
//! | field                          | source                                           |
//! |--------------------------------|--------------------------------------------------|
//! | fps, ok, detections            | latest FrameEvent                                |
//! | online, request, valid         | live PLC, simulator before any live event, off otherwise |
//! | last_decision                  | live PLC, simulator before any live event, held otherwise |
//! | heartbeat                      | simulator, always                                |
//! | conveyor_running               | local, after a successful command                |

mod types;

pub use types::{FrameView, Overlay, PanelSnapshot, PlcIndicators, SignalSource};

use crate::backend_client::PanelBackend;
use crate::error::{Error, Result};
use crate::event_stream::ConnectionTracker;
use crate::models::{view, ConnectionState, Decision, FrameEvent, HistoryItem, PlcSnapshot};
use crate::pulse_simulator::SimulatedSignals;
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::time::Instant;

/// Latest value of every upstream source
struct Sources {
    frame: Option<FrameEvent>,
    /// PLC values received on the current connection
    live_plc: Option<PlcSnapshot>,
    /// Decision of the last live event, held while no live value is current
    held_decision: Option<Decision>,
    /// At least one live event has arrived since mount
    live_seen: bool,
    simulated: SimulatedSignals,
    conveyor_running: bool,
    history: Arc<Vec<HistoryItem>>,
    history_error: Option<String>,
    last_stream_error: Option<String>,
    revision: u64,
}

impl Default for Sources {
    fn default() -> Self {
        Self {
            frame: None,
            live_plc: None,
            held_decision: None,
            live_seen: false,
            simulated: SimulatedSignals::default(),
            conveyor_running: false,
            history: Arc::new(Vec::new()),
            history_error: None,
            last_stream_error: None,
            revision: 0,
        }
    }
}

/// StateReconciler instance
pub struct StateReconciler {
    tracker: Arc<ConnectionTracker>,
    sources: Mutex<Sources>,
    tx: watch::Sender<Arc<PanelSnapshot>>,
    started_at: Instant,
}

impl StateReconciler {
    /// Create new reconciler reading connection state from `tracker`
    pub fn new(tracker: Arc<ConnectionTracker>) -> Self {
        let started_at = Instant::now();
        let sources = Sources::default();
        let initial = compose(&sources, tracker.current(), 0);
        let (tx, _rx) = watch::channel(Arc::new(initial));

        Self {
            tracker,
            sources: Mutex::new(sources),
            tx,
            started_at,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Sources> {
        self.sources.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Observe snapshots; the receiver always holds the newest one
    pub fn subscribe(&self) -> watch::Receiver<Arc<PanelSnapshot>> {
        self.tx.subscribe()
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<PanelSnapshot> {
        self.tx.borrow().clone()
    }

    /// New FrameEvent from the stream; supersedes the previous one
    pub fn apply_frame(&self, event: FrameEvent) {
        let mut sources = self.lock();
        sources.live_plc = Some(event.plc);
        sources.held_decision = event.plc.last_decision;
        sources.live_seen = true;
        sources.frame = Some(event);
        sources.last_stream_error = None;
        self.publish(&mut sources);
    }

    /// Stream lost; live PLC values stop counting until the next event
    pub fn apply_stream_error(&self, error: &Error) {
        let mut sources = self.lock();
        sources.live_plc = None;
        sources.last_stream_error = Some(error.to_string());
        self.publish(&mut sources);
    }

    /// Simulator transition
    pub fn apply_signals(&self, signals: SimulatedSignals) {
        let mut sources = self.lock();
        sources.simulated = signals;
        self.publish(&mut sources);
    }

    /// History refresh outcome; failures keep the previous list
    pub fn apply_history(&self, result: &Result<Arc<Vec<HistoryItem>>>) {
        let mut sources = self.lock();
        match result {
            Ok(items) => {
                sources.history = Arc::clone(items);
                sources.history_error = None;
            }
            Err(e) => sources.history_error = Some(e.to_string()),
        }
        self.publish(&mut sources);
    }

    /// Re-evaluate after a connection state change
    pub fn reconcile(&self) {
        let mut sources = self.lock();
        self.publish(&mut sources);
    }

    /// Ask the backend to run/stop the conveyor
    ///
    /// `conveyor_running` only changes once the backend accepted the command.
    pub async fn set_conveyor_state<B: PanelBackend>(&self, backend: &B, on: bool) -> Result<()> {
        if let Err(e) = backend.set_conveyor_state(on).await {
            tracing::warn!(on = on, error = %e, code = e.code(), "Conveyor command failed, state unchanged");
            return Err(e);
        }

        let mut sources = self.lock();
        sources.conveyor_running = on;
        self.publish(&mut sources);
        Ok(())
    }

    /// Local conveyor state
    pub fn conveyor_running(&self) -> bool {
        self.lock().conveyor_running
    }

    fn publish(&self, sources: &mut Sources) {
        sources.revision += 1;
        let connection = self.tracker.current();
        let snapshot = compose(sources, connection, self.started_at.elapsed().as_secs());

        tracing::trace!(
            revision = snapshot.revision,
            connection = %connection,
            source = ?snapshot.plc.source,
            "Snapshot published"
        );
        self.tx.send_replace(Arc::new(snapshot));
    }
}

/// Build a snapshot from the latest source values
fn compose(sources: &Sources, connection: ConnectionState, uptime_secs: u64) -> PanelSnapshot {
    let sim = &sources.simulated;

    let offline = (false, false, false, sources.held_decision, SignalSource::Offline);

    // Once live data has been seen, a reconnect in progress still counts as lost
    let (online, request, valid, last_decision, source) = match (connection, sources.live_plc) {
        (ConnectionState::Disconnected, _) => offline,
        (_, Some(plc)) => (
            plc.online,
            plc.request,
            plc.valid,
            plc.last_decision,
            SignalSource::Live,
        ),
        (_, None) if sources.live_seen => offline,
        (_, None) => (
            false,
            sim.request,
            sim.valid,
            sim.last_decision,
            SignalSource::Simulated,
        ),
    };

    let frame = sources.frame.as_ref().map(|event| FrameView {
        fps: event.fps,
        ok: event.ok,
        verdict: view::verdict_label(event.ok),
        overlays: event.detections.iter().map(Overlay::from).collect(),
        stale: source != SignalSource::Live,
    });

    PanelSnapshot {
        revision: sources.revision,
        connection,
        plc: PlcIndicators {
            online,
            heartbeat: sim.heartbeat,
            request,
            valid,
            last_decision,
            conveyor_running: sources.conveyor_running,
            source,
        },
        frame,
        history: Arc::clone(&sources.history),
        history_error: sources.history_error.clone(),
        last_stream_error: sources.last_stream_error.clone(),
        uptime_secs,
        updated_at: Utc::now(),
    }
}
