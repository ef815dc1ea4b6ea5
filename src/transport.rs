//! Transport adapter contract and a headless, clock-driven implementation.
//!
//! The engine only consumes this contract: imperative controls go in through
//! [`Transport`], lifecycle events come back on a [`TransportEvent`] channel.

use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::error::TransportError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportState {
    Playing,
    Paused,
    Ended,
}

/// Identifies one `load` call. Lifecycle events carry the load they belong to,
/// so a late event from a replaced track can be told apart from a current one.
pub type LoadId = u64;

#[derive(Clone, Debug, PartialEq)]
pub enum TransportEvent {
    Ready { load: LoadId },
    StateChanged { load: LoadId, state: TransportState },
    Error(TransportError),
}

pub type TransportEventSender = mpsc::UnboundedSender<TransportEvent>;
pub type TransportEventReceiver = mpsc::UnboundedReceiver<TransportEvent>;

pub fn event_channel() -> (TransportEventSender, TransportEventReceiver) {
    mpsc::unbounded_channel()
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoadOptions {
    pub autoplay: bool,
    pub start_seconds: f64,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            autoplay: true,
            start_seconds: 0.0,
        }
    }
}

pub trait Transport: Send + Sync {
    fn load(&self, track_id: &str, options: &LoadOptions) -> Result<LoadId, TransportError>;
    fn play(&self) -> Result<(), TransportError>;
    fn pause(&self) -> Result<(), TransportError>;
    fn stop(&self) -> Result<(), TransportError>;
    fn seek(&self, seconds: f64) -> Result<(), TransportError>;
    fn current_time(&self) -> f64;
    fn duration(&self) -> f64;
}

#[derive(Default)]
struct HeadlessState {
    loaded: Option<String>,
    load_id: LoadId,
    position: f64,
    started_at: Option<Instant>,
    // Bumped on every state change so stale end-of-track timers do nothing
    generation: u64,
}

impl HeadlessState {
    fn position_now(&self, duration: f64) -> f64 {
        let elapsed = self
            .started_at
            .map(|start| start.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        (self.position + elapsed).min(duration)
    }
}

/// A transport with no audio output: it keeps a playback clock and reports
/// `ended` once the simulated duration has elapsed.
#[derive(Clone)]
pub struct HeadlessTransport {
    state: Arc<Mutex<HeadlessState>>,
    duration_seconds: f64,
    events: TransportEventSender,
}

impl HeadlessTransport {
    pub fn new(duration_seconds: f64, events: TransportEventSender) -> Self {
        Self {
            state: Arc::new(Mutex::new(HeadlessState::default())),
            duration_seconds: duration_seconds.max(1.0),
            events,
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HeadlessState>, TransportError> {
        self.state
            .lock()
            .map_err(|_| TransportError::Command("transport state poisoned".to_string()))
    }

    fn emit(&self, event: TransportEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("Transport event dropped, no listener");
        }
    }

    fn emit_state(&self, load: LoadId, state: TransportState) {
        self.emit(TransportEvent::StateChanged { load, state });
    }

    fn schedule_end(&self, generation: u64, remaining: f64) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let state = self.state.clone();
        let events = self.events.clone();
        let duration = self.duration_seconds;
        handle.spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs_f64(remaining.max(0.0))).await;
            let Ok(mut guard) = state.lock() else {
                return;
            };
            if guard.generation != generation || guard.started_at.is_none() {
                return;
            }
            guard.position = duration;
            guard.started_at = None;
            guard.generation += 1;
            let load = guard.load_id;
            drop(guard);
            let _ = events.send(TransportEvent::StateChanged {
                load,
                state: TransportState::Ended,
            });
        });
    }

    fn start_clock(&self, guard: &mut HeadlessState) {
        guard.started_at = Some(Instant::now());
        guard.generation += 1;
        self.schedule_end(guard.generation, self.duration_seconds - guard.position);
    }
}

impl Transport for HeadlessTransport {
    fn load(&self, track_id: &str, options: &LoadOptions) -> Result<LoadId, TransportError> {
        if track_id.is_empty() {
            return Err(TransportError::Load {
                track_id: track_id.to_string(),
                reason: "empty track id".to_string(),
            });
        }

        let mut guard = self.lock()?;
        guard.loaded = Some(track_id.to_string());
        guard.position = options.start_seconds.clamp(0.0, self.duration_seconds);
        guard.started_at = None;
        guard.generation += 1;
        guard.load_id += 1;
        let load = guard.load_id;
        drop(guard);

        tracing::debug!(track_id, load, autoplay = options.autoplay, "Headless transport loaded track");
        self.emit(TransportEvent::Ready { load });
        Ok(load)
    }

    fn play(&self) -> Result<(), TransportError> {
        let mut guard = self.lock()?;
        if guard.loaded.is_none() {
            return Err(TransportError::NotReady);
        }
        if guard.started_at.is_none() {
            if guard.position >= self.duration_seconds {
                guard.position = 0.0;
            }
            self.start_clock(&mut guard);
        }
        let load = guard.load_id;
        drop(guard);
        self.emit_state(load, TransportState::Playing);
        Ok(())
    }

    fn pause(&self) -> Result<(), TransportError> {
        let mut guard = self.lock()?;
        if guard.loaded.is_none() {
            return Err(TransportError::NotReady);
        }
        guard.position = guard.position_now(self.duration_seconds);
        guard.started_at = None;
        guard.generation += 1;
        let load = guard.load_id;
        drop(guard);
        self.emit_state(load, TransportState::Paused);
        Ok(())
    }

    fn stop(&self) -> Result<(), TransportError> {
        let mut guard = self.lock()?;
        let generation = guard.generation + 1;
        let load_id = guard.load_id;
        *guard = HeadlessState {
            generation,
            load_id,
            ..HeadlessState::default()
        };
        Ok(())
    }

    fn seek(&self, seconds: f64) -> Result<(), TransportError> {
        let mut guard = self.lock()?;
        if guard.loaded.is_none() {
            return Err(TransportError::NotReady);
        }
        guard.position = seconds.clamp(0.0, self.duration_seconds);
        if guard.started_at.is_some() {
            self.start_clock(&mut guard);
        }
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.lock()
            .map(|guard| guard.position_now(self.duration_seconds))
            .unwrap_or(0.0)
    }

    fn duration(&self) -> f64 {
        match self.lock() {
            Ok(guard) if guard.loaded.is_some() => self.duration_seconds,
            _ => 0.0,
        }
    }
}
