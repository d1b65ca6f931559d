//! Core types shared across Verigate components.
//!
//! Everything here is wire-visible: field names match the verification
//! service contract, so changing them is a protocol change.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Interaction event categories tracked by the behavioral recorder.
///
/// Only the category and its relative timestamp ever leave the client;
/// coordinates, key values, and input content are never captured unless the
/// coordinate-capture variant is explicitly enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    #[serde(rename = "mousemove")]
    PointerMove,
    #[serde(rename = "click")]
    Click,
    #[serde(rename = "keydown")]
    KeyDown,
    #[serde(rename = "scroll")]
    Scroll,
    #[serde(rename = "focus")]
    Focus,
    #[serde(rename = "blur")]
    Blur,
    #[serde(rename = "input")]
    Input,
    #[serde(rename = "touchstart")]
    TouchStart,
    #[serde(rename = "touchend")]
    TouchEnd,
    #[serde(rename = "touchmove")]
    TouchMove,
    #[serde(rename = "paste")]
    Paste,
}

/// One recorded interaction event. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedEvent {
    /// Event category
    #[serde(rename = "type")]
    pub category: EventCategory,

    /// Milliseconds since session start
    #[serde(rename = "t")]
    pub relative_time_ms: u64,

    /// Cursor position, present only in the coordinate-capture variant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<(i32, i32)>,
}

/// Per-category interaction tallies, derived incrementally from the event
/// log. A pure view: it must always equal `InteractionCounters::tally` over
/// the current log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionCounters {
    pub mouse_moves: u64,
    pub clicks: u64,
    pub keypresses: u64,
    pub scrolls: u64,
    /// touchstart + touchend + touchmove
    pub touches: u64,
    pub inputs: u64,
    pub focuses: u64,
    pub blurs: u64,
    pub pastes: u64,
}

impl InteractionCounters {
    /// Bump the bucket for one recorded event.
    pub fn increment(&mut self, category: EventCategory) {
        match category {
            EventCategory::PointerMove => self.mouse_moves += 1,
            EventCategory::Click => self.clicks += 1,
            EventCategory::KeyDown => self.keypresses += 1,
            EventCategory::Scroll => self.scrolls += 1,
            EventCategory::Input => self.inputs += 1,
            EventCategory::Focus => self.focuses += 1,
            EventCategory::Blur => self.blurs += 1,
            EventCategory::Paste => self.pastes += 1,
            EventCategory::TouchStart | EventCategory::TouchEnd | EventCategory::TouchMove => {
                self.touches += 1
            }
        }
    }

    /// Recompute the tallies from a log slice.
    pub fn tally(events: &[CapturedEvent]) -> Self {
        let mut counters = Self::default();
        for event in events {
            counters.increment(event.category);
        }
        counters
    }

    /// Total events across all buckets.
    pub fn total(&self) -> u64 {
        self.mouse_moves
            + self.clicks
            + self.keypresses
            + self.scrolls
            + self.touches
            + self.inputs
            + self.focuses
            + self.blurs
            + self.pastes
    }
}

/// Browser engine identified by the elimination chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    Gecko,
    Webkit,
    Chromium,
    Unknown,
}

/// Browser brand identified within an engine family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Brand {
    Firefox,
    Safari,
    Brave,
    Opera,
    Edge,
    Chrome,
    /// Bare Chromium build, automation shells included
    Chromium,
    Unknown,
}

/// Engine + brand pair produced by browser detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserIdentity {
    pub engine: Engine,
    pub brand: Brand,
}

impl BrowserIdentity {
    pub const UNKNOWN: BrowserIdentity = BrowserIdentity {
        engine: Engine::Unknown,
        brand: Brand::Unknown,
    };
}

/// Outcome of a single automation-heuristic check.
///
/// `Unknown` means the probe itself failed; that is recorded as-is, never
/// silently collapsed into a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalOutcome {
    Detected,
    Clear,
    Unknown,
}

/// One named automation check and its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationSignal {
    /// Stable check identifier, e.g. `"webdriver_flag"`
    pub check: String,
    pub outcome: SignalOutcome,
}

/// Vendor/renderer strings from a throwaway graphics context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphicsInfo {
    pub vendor: String,
    pub renderer: String,
}

/// Immutable environment snapshot assembled once per verification attempt.
///
/// Flat and serializable; travels inside the verification request body as
/// `clientInfo`. Every field degrades to a placeholder when its probe
/// fails, so a snapshot always exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentFingerprint {
    /// Raw user-agent string, `"unknown"` if unreadable
    pub user_agent: String,
    pub engine: Engine,
    pub brand: Brand,
    /// Explicit automation-driver flag as reported by the environment
    pub webdriver: bool,
    pub touch: bool,
    /// Graphics vendor/renderer, `None` when the API is unavailable
    #[serde(rename = "webgl")]
    pub graphics: Option<GraphicsInfo>,
    /// Persistent key-value storage usable (write/read/delete round trip)
    pub storage_test: bool,
    /// Aggregate of the automation battery; a heuristic signal, not a verdict
    pub automation_framework_detected: bool,
    /// Raw per-check outcomes for the scoring service
    pub automation_signals: Vec<AutomationSignal>,
    /// Permission states by name, richer variant only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<BTreeMap<String, String>>,
}

/// Screen and window geometry reported with each submission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportGeometry {
    pub screen_w: u32,
    pub screen_h: u32,
    pub inner_w: u32,
    pub inner_h: u32,
    pub pixel_ratio: f64,
}

impl Default for ViewportGeometry {
    fn default() -> Self {
        Self {
            screen_w: 0,
            screen_h: 0,
            inner_w: 0,
            inner_h: 0,
            pixel_ratio: 1.0,
        }
    }
}

/// Which widget rendition produced a submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetKind {
    /// Checkbox widget the user interacts with
    #[default]
    Visible,
    /// No chrome; verification rides on form submit
    Invisible,
}

/// Page/behavioral metadata bundled with the event log on submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionMeta {
    pub time_on_page_ms: u64,
    pub screen_w: u32,
    pub screen_h: u32,
    pub pixel_ratio: f64,
    pub inner_w: u32,
    pub inner_h: u32,
    /// Mirror of the environment's automation-driver flag
    pub headless: bool,
    /// Form controls (inputs, text areas, selects) present on the page
    pub inputs_count: usize,
    pub widget_type: WidgetKind,
    pub interaction_stats: InteractionCounters,
    #[serde(rename = "clientInfo")]
    pub client_info: EnvironmentFingerprint,
}

/// Body of `POST /api/v1/verify`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationPayload {
    pub events: Vec<CapturedEvent>,
    pub meta: SubmissionMeta,
    pub token: String,
}

/// Server-issued proof-of-work challenge, consumed exactly once.
///
/// The nonce search is deterministic given these four fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub challenge_id: String,
    /// Server-issued seed material
    #[serde(rename = "data")]
    pub seed_data: String,
    /// Required count of leading zero hex characters
    pub difficulty: u32,
    /// Path of the protected form's action, bound into the digest
    #[serde(default)]
    pub context_path: String,
}

/// A challenge paired with its solved nonce, ready to attach to a form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeSolution {
    pub challenge_id: String,
    pub nonce: u64,
}

/// Diagnostic identifiers from a rejecting verdict.
///
/// Fields the service did not provide render as `"?"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FailureNotice {
    pub sky_id: Option<String>,
    pub score: Option<f64>,
}

impl FailureNotice {
    /// Notice with no diagnostics (network failure, timeout, worker error).
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn sky_id_display(&self) -> String {
        self.sky_id.clone().unwrap_or_else(|| "?".to_string())
    }

    pub fn score_display(&self) -> String {
        self.score
            .map(|s| s.to_string())
            .unwrap_or_else(|| "?".to_string())
    }
}

impl std::fmt::Display for FailureNotice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "sky_id={} score={}",
            self.sky_id_display(),
            self.score_display()
        )
    }
}
