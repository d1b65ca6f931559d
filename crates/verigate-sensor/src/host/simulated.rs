//! Scripted host implementations.
//!
//! `SimulatedHost` answers environment probes from a declarative profile;
//! `InteractionScript` replays an interaction timeline into a session;
//! `SimulatedForm` and `RecordingWidget` capture the side effects the gate
//! and controller drive. The CLI and the test suite share all of these.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use rand::Rng;

use verigate_common::{EventCategory, FailureNotice, GraphicsInfo, SensorError, ViewportGeometry};

use crate::controller::VerifyState;
use crate::host::{EnvironmentHost, FormHost, GraphicsParam, WidgetView};
use crate::recorder::SessionContext;

/// Declarative description of a simulated execution environment.
#[derive(Debug, Clone)]
pub struct EnvironmentProfile {
    pub user_agent: Option<String>,
    pub webdriver: Option<bool>,
    /// Present-and-truthy globals by dotted path
    pub globals: BTreeSet<String>,
    /// toString output of marker objects by dotted path
    pub global_reprs: BTreeMap<String, String>,
    pub window_properties: Vec<String>,
    pub plugin_count: Option<usize>,
    /// Overridden built-in sources; anything absent reports native code
    pub native_sources: BTreeMap<String, String>,
    pub navigation_entries: usize,
    pub document_loaded: bool,
    pub touch_event: bool,
    pub touch_points: u32,
    /// Debug-info extension strings, readable only when the extension is on
    pub graphics_debug: Option<GraphicsInfo>,
    pub graphics_debug_info: bool,
    /// Standard vendor/renderer parameters
    pub graphics_standard: Option<GraphicsInfo>,
    pub storage_enabled: bool,
    /// Permission states by name; unlisted names resolve to `"prompt"`
    pub permissions: BTreeMap<String, String>,
    pub viewport: ViewportGeometry,
    /// Form controls (inputs, text areas, selects) on the page
    pub form_inputs: usize,

    // Fault-injection toggles
    pub fail_global_probes: bool,
    pub fail_plugin_probe: bool,
    pub fail_graphics_probe: bool,
}

impl EnvironmentProfile {
    /// Minimal environment with nothing detectable.
    pub fn bare() -> Self {
        Self {
            user_agent: Some("Mozilla/5.0 (X11; Linux x86_64) Gecko/20100101".to_string()),
            webdriver: Some(false),
            globals: BTreeSet::new(),
            global_reprs: BTreeMap::new(),
            window_properties: vec!["location".to_string(), "document".to_string()],
            plugin_count: Some(3),
            native_sources: BTreeMap::new(),
            navigation_entries: 1,
            document_loaded: true,
            touch_event: false,
            touch_points: 0,
            graphics_debug: None,
            graphics_debug_info: false,
            graphics_standard: None,
            storage_enabled: true,
            permissions: BTreeMap::new(),
            viewport: ViewportGeometry::default(),
            form_inputs: 0,
            fail_global_probes: false,
            fail_plugin_probe: false,
            fail_graphics_probe: false,
        }
    }

    /// An ordinary desktop Chrome install.
    pub fn desktop_chrome() -> Self {
        let mut profile = Self::bare();
        profile.user_agent = Some(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36"
                .to_string(),
        );
        profile.globals =
            ["chrome", "chrome.runtime", "chrome.loadTimes"]
                .map(str::to_string)
                .into();
        profile.plugin_count = Some(5);
        profile.graphics_debug = Some(GraphicsInfo {
            vendor: "Google Inc. (NVIDIA)".to_string(),
            renderer: "ANGLE (NVIDIA, NVIDIA GeForce RTX 3060)".to_string(),
        });
        profile.graphics_debug_info = true;
        profile.graphics_standard = Some(GraphicsInfo {
            vendor: "WebKit".to_string(),
            renderer: "WebKit WebGL".to_string(),
        });
        profile.viewport = ViewportGeometry {
            screen_w: 1920,
            screen_h: 1080,
            inner_w: 1600,
            inner_h: 900,
            pixel_ratio: 1.0,
        };
        profile.form_inputs = 4;
        profile
    }

    /// A headless automation shell with the usual tells.
    pub fn headless_automation() -> Self {
        let mut profile = Self::bare();
        profile.user_agent = Some(
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
             (KHTML, like Gecko) HeadlessChrome/126.0.0.0 Safari/537.36"
                .to_string(),
        );
        profile.webdriver = Some(true);
        profile.globals = ["__pw"].map(str::to_string).into();
        profile.window_properties.push("__pwHarness".to_string());
        profile.plugin_count = Some(0);
        profile.graphics_standard = Some(GraphicsInfo {
            vendor: "Google Inc.".to_string(),
            renderer: "Google SwiftShader".to_string(),
        });
        profile.storage_enabled = false;
        profile.viewport = ViewportGeometry {
            screen_w: 800,
            screen_h: 600,
            inner_w: 800,
            inner_h: 600,
            pixel_ratio: 1.0,
        };
        profile
    }
}

/// Environment host answering from an [`EnvironmentProfile`].
pub struct SimulatedHost {
    profile: EnvironmentProfile,
    storage: Mutex<BTreeMap<String, String>>,
}

impl SimulatedHost {
    pub fn new(profile: EnvironmentProfile) -> Self {
        Self {
            profile,
            storage: Mutex::new(BTreeMap::new()),
        }
    }

    /// Number of keys currently in simulated storage.
    pub fn storage_len(&self) -> usize {
        self.storage.lock().expect("storage lock poisoned").len()
    }
}

impl EnvironmentHost for SimulatedHost {
    fn user_agent(&self) -> Option<String> {
        self.profile.user_agent.clone()
    }

    fn webdriver_flag(&self) -> Option<bool> {
        self.profile.webdriver
    }

    fn has_global(&self, path: &str) -> Result<bool, SensorError> {
        if self.profile.fail_global_probes {
            return Err(SensorError::Probe("global lookup refused".to_string()));
        }
        Ok(self.profile.globals.contains(path))
    }

    fn global_repr(&self, path: &str) -> Result<Option<String>, SensorError> {
        if self.profile.fail_global_probes {
            return Err(SensorError::Probe("global lookup refused".to_string()));
        }
        Ok(self.profile.global_reprs.get(path).cloned())
    }

    fn window_property_names(&self) -> Result<Vec<String>, SensorError> {
        if self.profile.fail_global_probes {
            return Err(SensorError::Probe("property scan refused".to_string()));
        }
        Ok(self.profile.window_properties.clone())
    }

    fn plugin_count(&self) -> Result<Option<usize>, SensorError> {
        if self.profile.fail_plugin_probe {
            return Err(SensorError::Probe("plugin list unreadable".to_string()));
        }
        Ok(self.profile.plugin_count)
    }

    fn native_function_source(&self, name: &str) -> Result<Option<String>, SensorError> {
        Ok(Some(
            self.profile
                .native_sources
                .get(name)
                .cloned()
                .unwrap_or_else(|| format!("function {name}() {{ [native code] }}")),
        ))
    }

    fn navigation_entry_count(&self) -> Result<usize, SensorError> {
        Ok(self.profile.navigation_entries)
    }

    fn document_loaded(&self) -> bool {
        self.profile.document_loaded
    }

    fn has_touch_event(&self) -> bool {
        self.profile.touch_event
    }

    fn max_touch_points(&self) -> Result<u32, SensorError> {
        Ok(self.profile.touch_points)
    }

    fn graphics_parameter(&self, param: GraphicsParam) -> Result<Option<String>, SensorError> {
        if self.profile.fail_graphics_probe {
            return Err(SensorError::Probe("graphics context unavailable".to_string()));
        }
        let value = match param {
            GraphicsParam::DebugVendor | GraphicsParam::DebugRenderer
                if !self.profile.graphics_debug_info =>
            {
                None
            }
            GraphicsParam::DebugVendor => {
                self.profile.graphics_debug.as_ref().map(|g| g.vendor.clone())
            }
            GraphicsParam::DebugRenderer => self
                .profile
                .graphics_debug
                .as_ref()
                .map(|g| g.renderer.clone()),
            GraphicsParam::Vendor => self
                .profile
                .graphics_standard
                .as_ref()
                .map(|g| g.vendor.clone()),
            GraphicsParam::Renderer => self
                .profile
                .graphics_standard
                .as_ref()
                .map(|g| g.renderer.clone()),
        };
        Ok(value)
    }

    fn storage_write(&self, key: &str, value: &str) -> Result<(), SensorError> {
        if !self.profile.storage_enabled {
            return Err(SensorError::Probe("storage restricted".to_string()));
        }
        self.storage
            .lock()
            .expect("storage lock poisoned")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn storage_read(&self, key: &str) -> Result<Option<String>, SensorError> {
        if !self.profile.storage_enabled {
            return Err(SensorError::Probe("storage restricted".to_string()));
        }
        Ok(self
            .storage
            .lock()
            .expect("storage lock poisoned")
            .get(key)
            .cloned())
    }

    fn storage_remove(&self, key: &str) -> Result<(), SensorError> {
        if !self.profile.storage_enabled {
            return Err(SensorError::Probe("storage restricted".to_string()));
        }
        self.storage
            .lock()
            .expect("storage lock poisoned")
            .remove(key);
        Ok(())
    }

    async fn permission_state(&self, name: &str) -> Result<String, SensorError> {
        Ok(self
            .profile
            .permissions
            .get(name)
            .cloned()
            .unwrap_or_else(|| "prompt".to_string()))
    }

    fn viewport(&self) -> ViewportGeometry {
        self.profile.viewport
    }

    fn form_input_count(&self) -> usize {
        self.profile.form_inputs
    }
}

/// A timeline of interaction events, replayed into a session.
pub struct InteractionScript {
    steps: Vec<(u64, EventCategory)>,
}

impl InteractionScript {
    pub fn new(steps: Vec<(u64, EventCategory)>) -> Self {
        Self { steps }
    }

    /// Plausible human browsing: jittered pointer motion, a few key
    /// presses, a scroll, a click on the way out.
    pub fn human_like() -> Self {
        let mut rng = rand::rng();
        let mut steps = Vec::new();
        let mut t: u64 = 300 + rng.random_range(0..400);

        steps.push((t, EventCategory::Focus));
        for _ in 0..25 {
            t += 110 + rng.random_range(0..160);
            steps.push((t, EventCategory::PointerMove));
        }
        for _ in 0..8 {
            t += 140 + rng.random_range(0..320);
            steps.push((t, EventCategory::KeyDown));
            steps.push((t + 30, EventCategory::Input));
        }
        t += 200 + rng.random_range(0..300);
        steps.push((t, EventCategory::Scroll));
        t += 400 + rng.random_range(0..500);
        steps.push((t, EventCategory::Click));

        Self::new(steps)
    }

    /// A script that fills and submits instantly: no motion, paste-heavy.
    pub fn scripted_bot() -> Self {
        Self::new(vec![
            (1, EventCategory::Focus),
            (2, EventCategory::Paste),
            (3, EventCategory::Input),
            (4, EventCategory::Click),
        ])
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Feed every step into the session at its scripted time.
    pub fn replay(&self, session: &SessionContext) {
        for (at_ms, category) in &self.steps {
            session.record_at(*category, *at_ms, None);
        }
    }
}

/// Form double with interior mutability, mirroring a live document node.
pub struct SimulatedForm {
    action_path: String,
    hidden_fields: Mutex<BTreeMap<String, String>>,
    marked: Mutex<bool>,
    submit_requests: Mutex<u32>,
    native_submits: Mutex<u32>,
    submit_enabled: Mutex<bool>,
    errors: Mutex<Vec<String>>,
}

impl SimulatedForm {
    pub fn new(action_path: &str) -> Self {
        Self {
            action_path: action_path.to_string(),
            hidden_fields: Mutex::new(BTreeMap::new()),
            marked: Mutex::new(false),
            submit_requests: Mutex::new(0),
            native_submits: Mutex::new(0),
            submit_enabled: Mutex::new(true),
            errors: Mutex::new(Vec::new()),
        }
    }

    pub fn hidden_field(&self, name: &str) -> Option<String> {
        self.hidden_fields.lock().unwrap().get(name).cloned()
    }

    pub fn submit_requests(&self) -> u32 {
        *self.submit_requests.lock().unwrap()
    }

    pub fn native_submits(&self) -> u32 {
        *self.native_submits.lock().unwrap()
    }

    pub fn submit_enabled(&self) -> bool {
        *self.submit_enabled.lock().unwrap()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

impl FormHost for SimulatedForm {
    fn action_path(&self) -> String {
        self.action_path.clone()
    }

    fn set_hidden_field(&self, name: &str, value: &str) {
        self.hidden_fields
            .lock()
            .unwrap()
            .insert(name.to_string(), value.to_string());
    }

    fn is_marked(&self) -> bool {
        *self.marked.lock().unwrap()
    }

    fn mark(&self) {
        *self.marked.lock().unwrap() = true;
    }

    fn request_submit(&self) {
        *self.submit_requests.lock().unwrap() += 1;
    }

    fn submit_native(&self) {
        *self.native_submits.lock().unwrap() += 1;
    }

    fn set_submit_enabled(&self, enabled: bool) {
        *self.submit_enabled.lock().unwrap() = enabled;
    }

    fn show_error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

/// Widget double that records every affordance change.
#[derive(Default)]
pub struct RecordingWidget {
    states: Mutex<Vec<VerifyState>>,
    submit_enabled: Mutex<bool>,
    failures: Mutex<Vec<FailureNotice>>,
    help_links: Mutex<Vec<String>>,
}

impl RecordingWidget {
    pub fn states(&self) -> Vec<VerifyState> {
        self.states.lock().unwrap().clone()
    }

    pub fn submit_enabled(&self) -> bool {
        *self.submit_enabled.lock().unwrap()
    }

    pub fn failures(&self) -> Vec<FailureNotice> {
        self.failures.lock().unwrap().clone()
    }

    pub fn help_links(&self) -> Vec<String> {
        self.help_links.lock().unwrap().clone()
    }
}

impl WidgetView for RecordingWidget {
    fn render(&self, state: VerifyState) {
        self.states.lock().unwrap().push(state);
    }

    fn set_submit_enabled(&self, enabled: bool) {
        *self.submit_enabled.lock().unwrap() = enabled;
    }

    fn show_failure(&self, notice: &FailureNotice, help_url: &str) {
        self.failures.lock().unwrap().push(notice.clone());
        self.help_links.lock().unwrap().push(help_url.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::RecorderConfig;

    #[test]
    fn human_script_replays_in_order_with_throttling_applied() {
        let session = SessionContext::new(RecorderConfig::bounded());
        let script = InteractionScript::human_like();
        script.replay(&session);

        let (events, counters) = session.snapshot();
        assert!(!events.is_empty());
        assert!(counters.mouse_moves > 0);
        assert!(counters.keypresses > 0);
        assert!(
            events
                .windows(2)
                .all(|w| w[0].relative_time_ms <= w[1].relative_time_ms)
        );
    }

    #[test]
    fn bot_script_has_no_pointer_motion() {
        let session = SessionContext::new(RecorderConfig::bounded());
        InteractionScript::scripted_bot().replay(&session);

        let (_, counters) = session.snapshot();
        assert_eq!(counters.mouse_moves, 0);
        assert_eq!(counters.pastes, 1);
    }
}
