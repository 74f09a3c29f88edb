//! Inspection Panel - headless operator panel runner
//!
//! Mounts the panel core against a live backend and logs every render snapshot.

use inspection_panel::{
    backend_client::BackendClient,
    models::view,
    reconciler::PanelSnapshot,
    state::AppConfig,
    Dashboard,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Log one snapshot in panel terms
fn render(snapshot: &PanelSnapshot) {
    let plc = &snapshot.plc;
    let (fps, verdict, overlays) = match &snapshot.frame {
        Some(frame) => (
            frame.fps,
            frame.verdict,
            frame
                .overlays
                .iter()
                .map(|o| o.label.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        ),
        None => (0.0, "-", String::new()),
    };

    tracing::debug!(
        revision = snapshot.revision,
        connection = %snapshot.connection,
        online = view::online_label(plc.online),
        heartbeat = plc.heartbeat,
        request = plc.request,
        valid = plc.valid,
        decision = view::decision_label(plc.last_decision).unwrap_or("-"),
        conveyor = view::conveyor_label(plc.conveyor_running),
        source = ?plc.source,
        fps = fps,
        verdict = verdict,
        overlays = %overlays,
        history = snapshot.history.len(),
        uptime = %snapshot.uptime(),
        "Panel"
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inspection_panel=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Inspection Panel v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::from_env()?;
    tracing::info!(
        api_base_url = %config.api_base_url,
        ws_base_url = %config.ws_base_url,
        history_limit = config.history.limit,
        history_poll_secs = config.history.poll_interval.as_secs(),
        reconnect_delay_ms = config.reconnect_delay.as_millis() as u64,
        "Configuration loaded"
    );

    let backend = Arc::new(BackendClient::new(&config.api_base_url, config.http_timeout)?);

    // Startup probe only; the panel runs regardless
    match backend.plc_status().await {
        Ok(status) => tracing::info!(
            online = status.online,
            last_decision = ?status.last_decision,
            "PLC status probe succeeded"
        ),
        Err(e) => tracing::warn!(error = %e, code = e.code(), "PLC status probe failed"),
    }

    let dashboard = Dashboard::mount(config, backend);
    tracing::info!(
        camera_stream = %dashboard.camera_stream_url(),
        timing = %dashboard.timing_summary(),
        "Panel running, press Ctrl+C to stop"
    );

    let mut snapshots = dashboard.subscribe();
    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                render(&snapshot);
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received");
                break;
            }
        }
    }

    dashboard.unmount();
    Ok(())
}
