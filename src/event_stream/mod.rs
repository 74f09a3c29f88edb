//! EventStreamClient - Backend Event Stream Subscription
//!
//! ## Responsibilities
//!
//! - Persistent WebSocket connection to `{ws_base}/ws/events`
//! - FrameEvent decoding (malformed messages are dropped, connection kept)
//! - Fixed-delay reconnection, retried indefinitely
//! - Connection state publication through `ConnectionTracker`
//!
//! The channel is push-only: nothing is ever sent to the backend.

mod tracker;

pub use tracker::{ConnectionEvent, ConnectionTracker};

use crate::error::Error;
use crate::models::{ConnectionState, FrameEvent};
use futures::StreamExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// EventStreamClient instance
pub struct EventStreamClient {
    url: String,
    reconnect_delay: Duration,
    tracker: Arc<ConnectionTracker>,
}

impl EventStreamClient {
    /// Create new client for a full `ws://.../ws/events` URL
    pub fn new(url: impl Into<String>, reconnect_delay: Duration, tracker: Arc<ConnectionTracker>) -> Self {
        Self {
            url: url.into(),
            reconnect_delay,
            tracker,
        }
    }

    /// Endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Open the stream
    ///
    /// `on_event` receives every decoded FrameEvent in transport order.
    /// `on_error` is called once per connection loss, after the tracker has
    /// been moved to `Disconnected` and before the reconnection delay starts.
    pub fn connect<F, E>(&self, on_event: F, on_error: E) -> StreamHandle
    where
        F: Fn(FrameEvent) + Send + Sync + 'static,
        E: Fn(Error) + Send + Sync + 'static,
    {
        let url = self.url.clone();
        let delay = self.reconnect_delay;
        let tracker = Arc::clone(&self.tracker);
        let attempts = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&attempts);

        let task = tokio::spawn(async move {
            loop {
                let attempt = counter.fetch_add(1, Ordering::Relaxed) + 1;
                let connection_id = Uuid::new_v4();
                tracker.set(ConnectionState::Connecting);
                tracing::info!(
                    connection_id = %connection_id,
                    url = %url,
                    attempt = attempt,
                    "Connecting to event stream"
                );

                let error = match connect_async(url.as_str()).await {
                    Ok((ws, _response)) => {
                        tracker.set(ConnectionState::Connected);
                        pump(ws, &on_event, connection_id).await
                    }
                    Err(e) => Error::WebSocket(e),
                };

                tracker.set(ConnectionState::Disconnected);
                tracing::warn!(
                    connection_id = %connection_id,
                    error = %error,
                    retry_in_ms = delay.as_millis() as u64,
                    "Event stream unavailable, reconnect scheduled"
                );
                on_error(error);

                tokio::time::sleep(delay).await;
            }
        });

        StreamHandle {
            task: Some(task),
            attempts,
        }
    }
}

/// Read messages until the connection ends; returns why it ended
async fn pump<F>(mut ws: WsStream, on_event: &F, connection_id: Uuid) -> Error
where
    F: Fn(FrameEvent),
{
    while let Some(message) = ws.next().await {
        match message {
            Ok(Message::Text(text)) => match FrameEvent::from_json(&text) {
                Ok(event) => {
                    tracing::trace!(
                        connection_id = %connection_id,
                        fps = event.fps,
                        ok = event.ok,
                        detections = event.detections.len(),
                        "Frame event received"
                    );
                    on_event(event);
                }
                Err(e) => {
                    tracing::warn!(
                        connection_id = %connection_id,
                        error = %e,
                        "Discarding malformed event"
                    );
                }
            },
            Ok(Message::Close(frame)) => {
                let reason = frame
                    .map(|f| format!("{} {}", u16::from(f.code), f.reason))
                    .unwrap_or_else(|| "no close frame".to_string());
                return Error::StreamClosed(reason);
            }
            // Ping/pong are answered by tungstenite; binary frames are not part of the protocol
            Ok(_) => {}
            Err(e) => return Error::WebSocket(e),
        }
    }

    Error::StreamClosed("connection ended".to_string())
}

/// Open stream handle - dropping it closes the socket and cancels any
/// pending reconnection timer
pub struct StreamHandle {
    task: Option<JoinHandle<()>>,
    attempts: Arc<AtomicU64>,
}

impl StreamHandle {
    /// Connection attempts made so far (first connect included)
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Release the connection
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::info!("Event stream closed");
        }
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
