//! Connection Tracker
//!
//! Holds the event stream's connection state. One instance per panel, shared
//! by the stream client (writer) and the reconciler (reader).

use crate::models::ConnectionState;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

/// Connection state transition worth reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Connected -> Disconnected
    Lost,
    /// Back to Connected after a loss
    Recovered,
}

/// Owned holder of the event stream `ConnectionState`
pub struct ConnectionTracker {
    tx: watch::Sender<ConnectionState>,
    /// Set on loss, cleared by the next successful connect
    lost: AtomicBool,
}

impl ConnectionTracker {
    /// Create new tracker in `Connecting`
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ConnectionState::Connecting);
        Self {
            tx,
            lost: AtomicBool::new(false),
        }
    }

    /// Current state
    pub fn current(&self) -> ConnectionState {
        *self.tx.borrow()
    }

    /// Observe state changes
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.tx.subscribe()
    }

    /// Update state and return the transition event if any
    pub fn set(&self, state: ConnectionState) -> Option<ConnectionEvent> {
        let mut prev = state;
        self.tx.send_if_modified(|current| {
            prev = *current;
            if *current == state {
                return false;
            }
            *current = state;
            true
        });

        match (prev, state) {
            (ConnectionState::Connected, ConnectionState::Disconnected) => {
                self.lost.store(true, Ordering::Relaxed);
                tracing::warn!("Event stream connection lost");
                Some(ConnectionEvent::Lost)
            }
            (from, ConnectionState::Connected) if from != ConnectionState::Connected => {
                let recovered = self.lost.swap(false, Ordering::Relaxed);
                tracing::info!(from = %from, recovered = recovered, "Event stream connected");
                recovered.then_some(ConnectionEvent::Recovered)
            }
            _ => None,
        }
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}
