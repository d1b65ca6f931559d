//! Bounded, append-only recorder for interaction events.
//!
//! Stores category + relative timestamp only (privacy invariant); the
//! coordinate-capture variant is an explicit opt-in, never a silent mix.
//! Performs no I/O: the only side effect is internal state mutation.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde::Deserialize;

use verigate_common::constants::{
    DEFAULT_MAX_EVENTS, POINTER_THROTTLE_COORD_MS, POINTER_THROTTLE_MS,
};
use verigate_common::{CapturedEvent, EventCategory, InteractionCounters};

/// Recorder variant selection. Both knobs are explicit configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RecorderConfig {
    /// Store literal cursor coordinates per pointer event
    #[serde(default)]
    pub coordinate_capture: bool,

    /// Event log capacity; further events are dropped silently once full.
    /// `0` removes the bound (coordinate-stream variant).
    #[serde(default = "default_max_events")]
    pub max_events: usize,
}

fn default_max_events() -> usize {
    DEFAULT_MAX_EVENTS
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            coordinate_capture: false,
            max_events: DEFAULT_MAX_EVENTS,
        }
    }
}

impl RecorderConfig {
    /// Timing-only variant: bounded log, no coordinates.
    pub fn bounded() -> Self {
        Self::default()
    }

    /// Coordinate-stream variant: unbounded log with cursor positions.
    pub fn coordinate_stream() -> Self {
        Self {
            coordinate_capture: true,
            max_events: 0,
        }
    }

    /// Capacity as an option; `0` means unbounded.
    pub fn capacity(&self) -> Option<usize> {
        (self.max_events > 0).then_some(self.max_events)
    }

    /// Minimum gap between accepted pointer-move samples, measured from the
    /// last accepted sample.
    pub fn pointer_throttle_ms(&self) -> u64 {
        if self.coordinate_capture {
            POINTER_THROTTLE_COORD_MS
        } else {
            POINTER_THROTTLE_MS
        }
    }
}

/// Append-only interaction log with derived per-category counters.
///
/// Counters are updated in the same append and only there, so they always
/// equal [`InteractionCounters::tally`] over the log.
#[derive(Debug)]
pub struct EventRecorder {
    config: RecorderConfig,
    events: Vec<CapturedEvent>,
    counters: InteractionCounters,
    last_pointer_sample_ms: Option<u64>,
}

impl EventRecorder {
    pub fn new(config: RecorderConfig) -> Self {
        Self {
            config,
            events: Vec::new(),
            counters: InteractionCounters::default(),
            last_pointer_sample_ms: None,
        }
    }

    /// Append one event at the given session-relative time.
    ///
    /// Returns false when the event was dropped (log full, or pointer-move
    /// inside the throttle window). Dropped events touch neither the log
    /// nor the counters.
    pub fn record_at(
        &mut self,
        category: EventCategory,
        at_ms: u64,
        position: Option<(i32, i32)>,
    ) -> bool {
        if category == EventCategory::PointerMove {
            if let Some(last) = self.last_pointer_sample_ms {
                if at_ms.saturating_sub(last) < self.config.pointer_throttle_ms() {
                    return false;
                }
            }
        }

        if let Some(capacity) = self.config.capacity() {
            if self.events.len() >= capacity {
                return false;
            }
        }

        if category == EventCategory::PointerMove {
            self.last_pointer_sample_ms = Some(at_ms);
        }

        self.events.push(CapturedEvent {
            category,
            relative_time_ms: at_ms,
            position: position.filter(|_| self.config.coordinate_capture),
        });
        self.counters.increment(category);
        true
    }

    pub fn events(&self) -> &[CapturedEvent] {
        &self.events
    }

    pub fn counters(&self) -> &InteractionCounters {
        &self.counters
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drop all recorded state. Called on controller reset only.
    pub fn clear(&mut self) {
        self.events.clear();
        self.counters = InteractionCounters::default();
        self.last_pointer_sample_ms = None;
    }
}

/// Page-lifetime recording context.
///
/// Created once at session start and passed by reference to whoever needs
/// it; there is no ambient global. The recorder lock is held only for the
/// duration of a single synchronous append, which is safe under the
/// cooperative scheduling model.
pub struct SessionContext {
    started: Instant,
    recorder: Mutex<EventRecorder>,
}

impl SessionContext {
    pub fn new(config: RecorderConfig) -> Arc<Self> {
        Arc::new(Self {
            started: Instant::now(),
            recorder: Mutex::new(EventRecorder::new(config)),
        })
    }

    /// Milliseconds since session start.
    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// Record an event at the current time.
    pub fn record(&self, category: EventCategory) -> bool {
        self.record_at(category, self.elapsed_ms(), None)
    }

    /// Record an event at an explicit session-relative time. Used by host
    /// adapters that replay scripted interaction timelines.
    pub fn record_at(
        &self,
        category: EventCategory,
        at_ms: u64,
        position: Option<(i32, i32)>,
    ) -> bool {
        self.recorder
            .lock()
            .expect("recorder lock poisoned")
            .record_at(category, at_ms, position)
    }

    /// Copy of the log and counters for payload assembly. Entries stay in
    /// strict chronological order of acceptance.
    pub fn snapshot(&self) -> (Vec<CapturedEvent>, InteractionCounters) {
        let recorder = self.recorder.lock().expect("recorder lock poisoned");
        (recorder.events().to_vec(), recorder.counters().clone())
    }

    pub fn event_count(&self) -> usize {
        self.recorder.lock().expect("recorder lock poisoned").len()
    }

    /// Wipe the log and counters. Controller reset only.
    pub fn reset(&self) {
        self.recorder.lock().expect("recorder lock poisoned").clear();
    }
}
