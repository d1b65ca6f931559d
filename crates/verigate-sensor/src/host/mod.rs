//! Host abstraction: every point where the pipeline touches the page.
//!
//! The sensor core never talks to a DOM directly. Environment probing,
//! form manipulation, and widget affordances go through these traits so
//! the same pipeline runs under a real binding, the scripted
//! [`SimulatedHost`], or a test double.

mod simulated;

pub use simulated::{
    EnvironmentProfile, InteractionScript, RecordingWidget, SimulatedForm, SimulatedHost,
};

use verigate_common::{FailureNotice, SensorError, ViewportGeometry};

use crate::controller::VerifyState;

/// Graphics-context parameters readable through the host.
///
/// The `Debug*` pair comes from the debug-info extension and may be
/// unavailable even when a context exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphicsParam {
    DebugVendor,
    DebugRenderer,
    Vendor,
    Renderer,
}

/// Read-only probe surface over the execution environment.
///
/// Implementations must not panic; a probe that cannot answer returns
/// `Err`, which the collector degrades to a placeholder for that field
/// only. `Ok(None)` means "answered: absent".
#[allow(async_fn_in_trait)]
pub trait EnvironmentHost {
    /// Raw user-agent string, if readable.
    fn user_agent(&self) -> Option<String>;

    /// The explicit automation-driver flag (`navigator.webdriver`).
    fn webdriver_flag(&self) -> Option<bool>;

    /// Whether a global exists (and is truthy) at a dotted path,
    /// e.g. `"chrome.runtime"` or `"opr.addons"`.
    fn has_global(&self, path: &str) -> Result<bool, SensorError>;

    /// String representation of the object at a dotted path, used for
    /// marker objects whose `toString` output identifies them.
    fn global_repr(&self, path: &str) -> Result<Option<String>, SensorError>;

    /// Own property names of the top-level global object.
    fn window_property_names(&self) -> Result<Vec<String>, SensorError>;

    /// Number of installed plugins; `None` when the list is unreadable.
    fn plugin_count(&self) -> Result<Option<usize>, SensorError>;

    /// Source text of a built-in function, used to spot patched natives.
    /// `None` when the function is missing entirely.
    fn native_function_source(&self, name: &str) -> Result<Option<String>, SensorError>;

    /// Count of navigation performance entries.
    fn navigation_entry_count(&self) -> Result<usize, SensorError>;

    /// Whether the page has finished loading.
    fn document_loaded(&self) -> bool;

    /// Touch-event support in the global scope.
    fn has_touch_event(&self) -> bool;

    /// Maximum simultaneous touch points.
    fn max_touch_points(&self) -> Result<u32, SensorError>;

    /// Read one graphics parameter from a throwaway context.
    fn graphics_parameter(&self, param: GraphicsParam) -> Result<Option<String>, SensorError>;

    /// Write a key to persistent key-value storage.
    fn storage_write(&self, key: &str, value: &str) -> Result<(), SensorError>;

    /// Read a key back from persistent key-value storage.
    fn storage_read(&self, key: &str) -> Result<Option<String>, SensorError>;

    /// Remove a key from persistent key-value storage.
    fn storage_remove(&self, key: &str) -> Result<(), SensorError>;

    /// Resolved permission state for a name. Never triggers a prompt.
    /// Suspension point: real hosts answer asynchronously.
    async fn permission_state(&self, name: &str) -> Result<String, SensorError>;

    /// Screen/window geometry and pixel ratio.
    fn viewport(&self) -> ViewportGeometry;

    /// Number of form controls (inputs, text areas, selects) on the page.
    fn form_input_count(&self) -> usize;
}

/// Mutation surface over one protected form.
///
/// Methods take `&self`; implementations use interior mutability, matching
/// the shared-document model they wrap.
pub trait FormHost {
    /// Path component of the form's action URL (challenge context).
    fn action_path(&self) -> String;

    /// Create or update a hidden input on the form.
    fn set_hidden_field(&self, name: &str, value: &str);

    /// One-shot re-entrancy marker: true once proof has been attached.
    fn is_marked(&self) -> bool;

    /// Set the one-shot marker before programmatic re-submission.
    fn mark(&self);

    /// Re-submit through the normal submission path (re-enters any
    /// interceptor, which must honor the marker).
    fn request_submit(&self);

    /// Invoke the underlying native submission directly, bypassing
    /// interception. Used by the verdict-gate release path.
    fn submit_native(&self);

    /// Enable or disable the form's submit control.
    fn set_submit_enabled(&self, enabled: bool);

    /// Show a blocking message to the user (gate refusals, solve errors).
    fn show_error(&self, message: &str);
}

/// Affordance projection for the verification widget.
///
/// A pure function of controller state: the controller calls these on
/// every transition and owns no rendering logic itself.
pub trait WidgetView {
    /// Reflect the current state (label, icon, spinner).
    fn render(&self, state: VerifyState);

    /// Gate the submit control. Enabled only in `Verified`.
    fn set_submit_enabled(&self, enabled: bool);

    /// Show the failure modal with service diagnostics and a link to the
    /// help/trust page.
    fn show_failure(&self, notice: &FailureNotice, help_url: &str);
}

/// View that reports affordance changes through tracing. Used by the CLI,
/// where there is no widget chrome to update.
pub struct LogWidget;

impl WidgetView for LogWidget {
    fn render(&self, state: VerifyState) {
        tracing::info!(state = ?state, label = state.label(), "widget state");
    }

    fn set_submit_enabled(&self, enabled: bool) {
        tracing::info!(enabled = enabled, "submit control");
    }

    fn show_failure(&self, notice: &FailureNotice, help_url: &str) {
        tracing::warn!(%notice, help_url, "verification failed");
    }
}
