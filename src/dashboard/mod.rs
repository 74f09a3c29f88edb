//! Dashboard - Panel Lifecycle Owner
//!
//! ## Responsibilities
//!
//! - Wire tracker, reconciler, simulator, history polling and event stream on mount
//! - Own every timer and the stream connection through RAII handles
//! - Operator commands (conveyor, single analysis, manual history refresh)
//! - Resource locators for the presentation layer
//!
//! Dropping the Dashboard tears everything down; `unmount` does the same
//! explicitly.

use crate::backend_client::PanelBackend;
use crate::error::Result;
use crate::event_stream::{ConnectionTracker, EventStreamClient, StreamHandle};
use crate::history_cache::{HistoryCache, PollHandle};
use crate::models::HistoryItem;
use crate::pulse_simulator::{PulseSimulator, PulseTiming, SimulatedSignals};
use crate::reconciler::{PanelSnapshot, StateReconciler};
use crate::state::AppConfig;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Mounted operator panel
pub struct Dashboard<B: PanelBackend> {
    config: AppConfig,
    backend: Arc<B>,
    tracker: Arc<ConnectionTracker>,
    reconciler: Arc<StateReconciler>,
    history: Arc<HistoryCache<B>>,
    simulator: PulseSimulator,
    stream: Option<StreamHandle>,
    poll: Option<PollHandle>,
    connection_watch: Option<JoinHandle<()>>,
}

impl<B: PanelBackend> Dashboard<B> {
    /// Start all sources and return the mounted panel
    pub fn mount(config: AppConfig, backend: Arc<B>) -> Self {
        Self::mount_with(config, backend, |timing, on_change| {
            PulseSimulator::start(timing, on_change)
        })
    }

    /// Mount with a seeded simulator (reproducible decisions)
    pub fn mount_seeded(config: AppConfig, backend: Arc<B>, seed: u64) -> Self {
        Self::mount_with(config, backend, move |timing, on_change| {
            PulseSimulator::start_seeded(timing, seed, on_change)
        })
    }

    fn mount_with<S>(config: AppConfig, backend: Arc<B>, start_simulator: S) -> Self
    where
        S: FnOnce(PulseTiming, Box<dyn Fn(SimulatedSignals) + Send + Sync>) -> PulseSimulator,
    {
        let tracker = Arc::new(ConnectionTracker::new());
        let reconciler = Arc::new(StateReconciler::new(Arc::clone(&tracker)));

        let simulator = {
            let reconciler = Arc::clone(&reconciler);
            start_simulator(
                config.pulse.clone(),
                Box::new(move |signals| reconciler.apply_signals(signals)),
            )
        };

        let history = Arc::new(HistoryCache::new(
            Arc::clone(&backend),
            config.history.default_severity,
        ));
        let poll = {
            let reconciler = Arc::clone(&reconciler);
            history.start_polling(
                config.history.limit,
                config.history.poll_interval,
                move |result| reconciler.apply_history(&result),
            )
        };

        let client = EventStreamClient::new(
            config.events_url(),
            config.reconnect_delay,
            Arc::clone(&tracker),
        );
        let stream = {
            let on_event = Arc::clone(&reconciler);
            let on_error = Arc::clone(&reconciler);
            client.connect(
                move |event| on_event.apply_frame(event),
                move |error| on_error.apply_stream_error(&error),
            )
        };

        let connection_watch = {
            let reconciler = Arc::clone(&reconciler);
            let mut rx = tracker.subscribe();
            tokio::spawn(async move {
                while rx.changed().await.is_ok() {
                    reconciler.reconcile();
                }
            })
        };

        tracing::info!(
            api_base_url = %config.api_base_url,
            events_url = %client.url(),
            history_limit = config.history.limit,
            "Dashboard mounted"
        );

        Self {
            config,
            backend,
            tracker,
            reconciler,
            history,
            simulator,
            stream: Some(stream),
            poll: Some(poll),
            connection_watch: Some(connection_watch),
        }
    }

    /// Observe render snapshots
    pub fn subscribe(&self) -> watch::Receiver<Arc<PanelSnapshot>> {
        self.reconciler.subscribe()
    }

    /// Current render snapshot
    pub fn snapshot(&self) -> Arc<PanelSnapshot> {
        self.reconciler.snapshot()
    }

    /// Connection tracker shared with the stream client
    pub fn tracker(&self) -> &Arc<ConnectionTracker> {
        &self.tracker
    }

    /// Run or stop the conveyor
    pub async fn set_conveyor_state(&self, on: bool) -> Result<()> {
        self.reconciler
            .set_conveyor_state(self.backend.as_ref(), on)
            .await
    }

    /// Flip the conveyor; returns the new state on success
    pub async fn toggle_conveyor(&self) -> Result<bool> {
        let target = !self.reconciler.conveyor_running();
        self.set_conveyor_state(target).await?;
        Ok(target)
    }

    /// Start one simulated inspection cycle; `false` while one is running
    pub fn trigger_single_analysis(&self) -> bool {
        self.simulator.trigger_single_analysis()
    }

    /// Fetch the NOK history now, outside the polling schedule
    pub async fn refresh_history(&self) -> Result<Arc<Vec<HistoryItem>>> {
        let result = self.history.refresh(self.config.history.limit).await;
        self.reconciler.apply_history(&result);
        result
    }

    /// Live MJPEG feed locator
    pub fn camera_stream_url(&self) -> String {
        self.backend.camera_stream_url()
    }

    /// NOK image locator
    pub fn nok_image_url(&self, name: &str) -> String {
        self.history.image_url(name)
    }

    /// Footer timing summary
    pub fn timing_summary(&self) -> String {
        self.simulator.timing().summary()
    }

    /// Tear down timers and the stream connection
    pub fn unmount(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let mounted = self.stream.is_some();

        if let Some(stream) = self.stream.take() {
            stream.close();
        }
        if let Some(poll) = self.poll.take() {
            poll.cancel();
        }
        if let Some(watch) = self.connection_watch.take() {
            watch.abort();
        }
        self.simulator.stop();

        if mounted {
            tracing::info!("Dashboard unmounted");
        }
    }
}

impl<B: PanelBackend> Drop for Dashboard<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::history_cache::tests::StubBackend;
    use crate::models::{ConnectionState, Decision, FrameEvent, PlcSnapshot};
    use crate::reconciler::SignalSource;
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tokio::time::sleep;

    fn offline_config() -> AppConfig {
        AppConfig {
            // Rejected before any socket is opened
            ws_base_url: "not a url".to_string(),
            ..AppConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_mount_loads_history_and_reports_offline() {
        let backend = Arc::new(StubBackend::with_items(8));
        let dashboard = Dashboard::mount_seeded(offline_config(), backend.clone(), 7);

        sleep(Duration::from_millis(10)).await;

        let snap = dashboard.snapshot();
        assert_eq!(snap.history.len(), 8);
        assert_eq!(snap.connection, ConnectionState::Disconnected);
        assert_eq!(snap.plc.source, SignalSource::Offline);
        assert!(!snap.plc.online);
        assert!(snap.last_stream_error.is_some());
        assert_eq!(backend.list_calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_decision_held_across_reconnect_attempts() {
        let backend = Arc::new(StubBackend::with_items(0));
        let dashboard = Dashboard::mount_seeded(offline_config(), backend, 7);
        sleep(Duration::from_millis(10)).await;

        // One live event, then the link drops
        dashboard.tracker().set(ConnectionState::Connected);
        dashboard.reconciler.apply_frame(FrameEvent {
            fps: 30.0,
            ok: false,
            detections: vec![],
            plc: PlcSnapshot {
                online: true,
                request: false,
                valid: true,
                last_decision: Some(Decision::Nok),
            },
        });
        dashboard.tracker().set(ConnectionState::Disconnected);
        dashboard
            .reconciler
            .apply_stream_error(&Error::StreamClosed("1006".to_string()));

        let assert_held = |dashboard: &Dashboard<StubBackend>| {
            let snap = dashboard.snapshot();
            assert_eq!(snap.plc.source, SignalSource::Offline);
            assert!(!snap.plc.online);
            assert!(!snap.plc.request);
            assert!(!snap.plc.valid);
            assert_eq!(snap.plc.last_decision, Some(Decision::Nok));
        };

        for _ in 0..120 {
            dashboard.trigger_single_analysis();
            sleep(Duration::from_millis(100)).await;
            assert_held(&dashboard);
        }

        // A slow connect attempt: simulated cycles run while Connecting
        dashboard.tracker().set(ConnectionState::Connecting);
        for _ in 0..5 {
            dashboard.trigger_single_analysis();
            sleep(Duration::from_millis(100)).await;
            assert_held(&dashboard);
        }

        let attempts = dashboard.stream.as_ref().map(|s| s.attempts()).unwrap_or(0);
        assert!(attempts >= 3, "attempts = {attempts}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_keeps_toggling_while_offline() {
        let backend = Arc::new(StubBackend::with_items(0));
        let dashboard = Dashboard::mount_seeded(offline_config(), backend, 7);

        sleep(Duration::from_millis(10)).await;
        assert!(dashboard.snapshot().plc.heartbeat);

        sleep(Duration::from_millis(300)).await;
        assert!(!dashboard.snapshot().plc.heartbeat);

        sleep(Duration::from_millis(300)).await;
        assert!(dashboard.snapshot().plc.heartbeat);
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_conveyor() {
        let backend = Arc::new(StubBackend::with_items(0));
        let dashboard = Dashboard::mount_seeded(offline_config(), backend.clone(), 7);

        assert!(dashboard.toggle_conveyor().await.unwrap());
        assert!(dashboard.snapshot().plc.conveyor_running);

        backend.accept_commands.store(false, Ordering::Relaxed);
        let err = dashboard.toggle_conveyor().await.unwrap_err();
        assert!(matches!(err, Error::CommandRejected(_)));
        assert!(dashboard.snapshot().plc.conveyor_running);
        assert_eq!(*backend.commands.lock().unwrap(), vec![true, false]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_analysis_not_reentrant() {
        let backend = Arc::new(StubBackend::with_items(0));
        let dashboard = Dashboard::mount_seeded(offline_config(), backend, 7);

        assert!(dashboard.trigger_single_analysis());
        assert!(!dashboard.trigger_single_analysis());

        sleep(Duration::from_millis(200)).await;
        assert!(dashboard.trigger_single_analysis());
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_refresh_failure_keeps_history() {
        let backend = Arc::new(StubBackend::with_items(4));
        let dashboard = Dashboard::mount_seeded(offline_config(), backend.clone(), 7);
        sleep(Duration::from_millis(10)).await;

        backend.fail_list.store(true, Ordering::Relaxed);
        assert!(dashboard.refresh_history().await.is_err());

        let snap = dashboard.snapshot();
        assert_eq!(snap.history.len(), 4);
        assert!(snap.history_error.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmount_stops_polling() {
        let backend = Arc::new(StubBackend::with_items(2));
        let dashboard = Dashboard::mount_seeded(offline_config(), backend.clone(), 7);
        sleep(Duration::from_millis(10)).await;
        assert_eq!(backend.list_calls.load(Ordering::Relaxed), 1);

        dashboard.unmount();
        sleep(Duration::from_secs(120)).await;
        assert_eq!(backend.list_calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resource_locators() {
        let backend = Arc::new(StubBackend::with_items(0));
        let dashboard = Dashboard::mount_seeded(offline_config(), backend, 7);

        assert_eq!(dashboard.camera_stream_url(), "http://stub/api/stream.mjpg");
        assert_eq!(
            dashboard.nok_image_url("detected_001.jpg"),
            "http://stub/api/nok/detected_001.jpg"
        );
        assert_eq!(
            dashboard.timing_summary(),
            "Heartbeat: 0.30s | Valid Pulse: 60ms | Lookback: 120ms"
        );
    }
}
