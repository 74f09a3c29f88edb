//! PulseSimulator - Synthetic PLC Signal Timing
//!
//! ## Responsibilities
//!
//! - Heartbeat toggle every 300 ms for the simulator's lifetime
//! - Request/Valid inspection cycle (120 ms lookback, 60 ms valid pulse)
//! - Periodic random trigger (every 2 s, 20 %) and manual single analysis
//!
//! Used as a fallback while no live PLC feed is available. All timers are
//! tasks owned by the simulator and aborted when it is stopped or dropped.

use crate::models::Decision;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};

/// Simulated signal timing
#[derive(Debug, Clone)]
pub struct PulseTiming {
    /// Heartbeat toggle period
    pub heartbeat_period: Duration,
    /// Periodic trigger check period
    pub trigger_period: Duration,
    /// Chance that a periodic check starts a cycle (0.0 - 1.0)
    pub trigger_probability: f64,
    /// Delay between request and valid/decision
    pub lookback: Duration,
    /// Duration of the valid pulse
    pub valid_pulse: Duration,
    /// Chance of a NOK decision for periodic cycles
    pub periodic_nok_probability: f64,
    /// Chance of a NOK decision for manual single analysis
    pub manual_nok_probability: f64,
}

impl Default for PulseTiming {
    fn default() -> Self {
        Self {
            heartbeat_period: Duration::from_millis(300),
            trigger_period: Duration::from_millis(2000),
            trigger_probability: 0.2,
            lookback: Duration::from_millis(120),
            valid_pulse: Duration::from_millis(60),
            periodic_nok_probability: 0.3,
            manual_nok_probability: 0.5,
        }
    }
}

impl PulseTiming {
    /// Full request -> idle cycle length
    pub fn cycle_duration(&self) -> Duration {
        self.lookback + self.valid_pulse
    }

    /// Footer summary, e.g. `Heartbeat: 0.30s | Valid Pulse: 60ms | Lookback: 120ms`
    pub fn summary(&self) -> String {
        format!(
            "Heartbeat: {:.2}s | Valid Pulse: {}ms | Lookback: {}ms",
            self.heartbeat_period.as_secs_f64(),
            self.valid_pulse.as_millis(),
            self.lookback.as_millis()
        )
    }
}

/// Request/Valid state machine phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    /// request=true, waiting for the lookback delay
    Requesting,
    /// valid=true, decision published
    Valid,
}

/// What started a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    Periodic,
    Manual,
}

/// Simulator output, emitted on every transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedSignals {
    pub heartbeat: bool,
    pub request: bool,
    pub valid: bool,
    pub last_decision: Option<Decision>,
    pub phase: CyclePhase,
}

impl Default for SimulatedSignals {
    fn default() -> Self {
        Self {
            heartbeat: true,
            request: false,
            valid: false,
            last_decision: None,
            phase: CyclePhase::Idle,
        }
    }
}

type SignalCallback = Box<dyn Fn(SimulatedSignals) + Send + Sync>;

struct SimState {
    signals: SimulatedSignals,
    rng: StdRng,
    cycle: Option<JoinHandle<()>>,
}

struct Inner {
    timing: PulseTiming,
    state: Mutex<SimState>,
    on_change: SignalCallback,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Emits while the state lock is held so listeners observe transitions in order
    fn emit(&self, state: &SimState) {
        (self.on_change)(state.signals);
    }

    fn toggle_heartbeat(&self) {
        let mut state = self.lock();
        state.signals.heartbeat = !state.signals.heartbeat;
        tracing::trace!(heartbeat = state.signals.heartbeat, "Heartbeat toggled");
        self.emit(&state);
    }

    fn trigger(self: &Arc<Self>, source: TriggerSource) -> bool {
        let mut state = self.lock();
        if state.signals.phase != CyclePhase::Idle {
            tracing::debug!(source = ?source, phase = ?state.signals.phase, "Trigger ignored, cycle in flight");
            return false;
        }

        state.signals.phase = CyclePhase::Requesting;
        state.signals.request = true;
        tracing::debug!(source = ?source, "Simulated inspection cycle started");
        self.emit(&state);

        let inner = Arc::clone(self);
        state.cycle = Some(tokio::spawn(async move {
            sleep(inner.timing.lookback).await;
            {
                let mut state = inner.lock();
                let nok_probability = match source {
                    TriggerSource::Periodic => inner.timing.periodic_nok_probability,
                    TriggerSource::Manual => inner.timing.manual_nok_probability,
                };
                let decision = if state.rng.gen_bool(nok_probability.clamp(0.0, 1.0)) {
                    Decision::Nok
                } else {
                    Decision::Ok
                };
                state.signals.request = false;
                state.signals.valid = true;
                state.signals.last_decision = Some(decision);
                state.signals.phase = CyclePhase::Valid;
                inner.emit(&state);
            }

            sleep(inner.timing.valid_pulse).await;
            {
                let mut state = inner.lock();
                state.signals.valid = false;
                state.signals.phase = CyclePhase::Idle;
                state.cycle = None;
                inner.emit(&state);
            }
        }));

        true
    }
}

/// Synthetic heartbeat / request / valid generator
///
/// The callback runs on timer tasks and must not call back into the simulator.
pub struct PulseSimulator {
    inner: Arc<Inner>,
    timers: Vec<JoinHandle<()>>,
}

impl PulseSimulator {
    /// Start the heartbeat and periodic trigger timers
    pub fn start<F>(timing: PulseTiming, on_change: F) -> Self
    where
        F: Fn(SimulatedSignals) + Send + Sync + 'static,
    {
        Self::start_with_rng(timing, StdRng::from_entropy(), on_change)
    }

    /// Start with a seeded RNG (deterministic decisions)
    pub fn start_seeded<F>(timing: PulseTiming, seed: u64, on_change: F) -> Self
    where
        F: Fn(SimulatedSignals) + Send + Sync + 'static,
    {
        Self::start_with_rng(timing, StdRng::seed_from_u64(seed), on_change)
    }

    fn start_with_rng<F>(timing: PulseTiming, rng: StdRng, on_change: F) -> Self
    where
        F: Fn(SimulatedSignals) + Send + Sync + 'static,
    {
        let inner = Arc::new(Inner {
            timing,
            state: Mutex::new(SimState {
                signals: SimulatedSignals::default(),
                rng,
                cycle: None,
            }),
            on_change: Box::new(on_change),
        });

        let heartbeat = {
            let inner = Arc::clone(&inner);
            let period = inner.timing.heartbeat_period;
            tokio::spawn(async move {
                let mut ticker = interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    inner.toggle_heartbeat();
                }
            })
        };

        let trigger = {
            let inner = Arc::clone(&inner);
            let period = inner.timing.trigger_period;
            let probability = inner.timing.trigger_probability.clamp(0.0, 1.0);
            tokio::spawn(async move {
                let mut ticker = interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    let fire = inner.lock().rng.gen_bool(probability);
                    if fire {
                        inner.trigger(TriggerSource::Periodic);
                    }
                }
            })
        };

        tracing::info!(
            heartbeat_ms = inner.timing.heartbeat_period.as_millis() as u64,
            lookback_ms = inner.timing.lookback.as_millis() as u64,
            pulse_ms = inner.timing.valid_pulse.as_millis() as u64,
            "Pulse simulator started"
        );

        Self {
            inner,
            timers: vec![heartbeat, trigger],
        }
    }

    /// Start a cycle now; `false` if one is already in flight
    pub fn trigger_single_analysis(&self) -> bool {
        self.inner.trigger(TriggerSource::Manual)
    }

    /// Current simulated values
    pub fn signals(&self) -> SimulatedSignals {
        self.inner.lock().signals
    }

    /// Timing in use
    pub fn timing(&self) -> &PulseTiming {
        &self.inner.timing
    }

    /// Cancel all timers, including a cycle in flight
    pub fn stop(&mut self) {
        for timer in self.timers.drain(..) {
            timer.abort();
        }
        if let Some(cycle) = self.inner.lock().cycle.take() {
            cycle.abort();
        }
    }
}

impl Drop for PulseSimulator {
    fn drop(&mut self) {
        self.stop();
        tracing::debug!("Pulse simulator stopped");
    }
}
