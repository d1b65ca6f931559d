//! One-shot environment/automation snapshot assembly.
//!
//! `collect` always completes: every probe is fault-isolated, and a probe
//! that fails degrades its own field to a placeholder without aborting the
//! rest of the collection.

mod automation;
mod browser;

pub use automation::{any_detected, run_battery};
pub use browser::detect_browser;

use std::collections::BTreeMap;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use serde::Deserialize;

use verigate_common::constants::{PERMISSION_NAMES, STORAGE_PROBE_PREFIX};
use verigate_common::{EnvironmentFingerprint, GraphicsInfo, SensorError};

use crate::host::{EnvironmentHost, GraphicsParam};

/// Collector options. The permission probe is the richer variant and is
/// off by default.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    pub permission_probe: bool,
}

/// Assembles one [`EnvironmentFingerprint`] per verification attempt.
///
/// Pure apart from the transient, self-cleaning storage sentinel; holds no
/// state between collections.
pub struct FingerprintCollector {
    config: CollectorConfig,
}

impl FingerprintCollector {
    pub fn new(config: CollectorConfig) -> Self {
        Self { config }
    }

    /// Probe the environment and build the snapshot. Never fails as a
    /// whole; the snapshot is immutable once returned.
    pub async fn collect<H: EnvironmentHost>(&self, host: &H) -> EnvironmentFingerprint {
        let user_agent = host
            .user_agent()
            .unwrap_or_else(|| "unknown".to_string());
        let identity = browser::detect_browser(host);
        let webdriver = host.webdriver_flag() == Some(true);
        let touch = touch_probe(host);
        let graphics = graphics_probe(host);
        let storage_test = storage_probe(host);

        let automation_signals = automation::run_battery(host);
        let automation_framework_detected = automation::any_detected(&automation_signals);

        let permissions = if self.config.permission_probe {
            Some(permission_probe(host).await)
        } else {
            None
        };

        EnvironmentFingerprint {
            user_agent,
            engine: identity.engine,
            brand: identity.brand,
            webdriver,
            touch,
            graphics,
            storage_test,
            automation_framework_detected,
            automation_signals,
            permissions,
        }
    }
}

fn touch_probe<H: EnvironmentHost>(host: &H) -> bool {
    if host.has_touch_event() {
        return true;
    }
    match host.max_touch_points() {
        Ok(points) => points > 0,
        Err(e) => {
            tracing::trace!(error = %e, "touch probe failed");
            false
        }
    }
}

/// Debug-info extension first, standard vendor/renderer parameters as the
/// fallback. The whole chain is isolated: a disabled graphics API yields
/// `None`, never an error.
fn graphics_probe<H: EnvironmentHost>(host: &H) -> Option<GraphicsInfo> {
    let read = |param: GraphicsParam| match host.graphics_parameter(param) {
        Ok(value) => value,
        Err(e) => {
            tracing::trace!(param = ?param, error = %e, "graphics parameter read failed");
            None
        }
    };

    if let (Some(vendor), Some(renderer)) =
        (read(GraphicsParam::DebugVendor), read(GraphicsParam::DebugRenderer))
    {
        return Some(GraphicsInfo { vendor, renderer });
    }

    match (read(GraphicsParam::Vendor), read(GraphicsParam::Renderer)) {
        (Some(vendor), Some(renderer)) => Some(GraphicsInfo { vendor, renderer }),
        _ => None,
    }
}

/// Write-then-delete sentinel round trip. Only availability is reported;
/// the sentinel is removed even when the read-back fails.
fn storage_probe<H: EnvironmentHost>(host: &H) -> bool {
    let mut suffix = [0u8; 9];
    rand::rng().fill(&mut suffix);
    let key = format!("{}_{}", STORAGE_PROBE_PREFIX, URL_SAFE_NO_PAD.encode(suffix));

    let observed = (|| -> Result<bool, SensorError> {
        host.storage_write(&key, "1")?;
        Ok(host.storage_read(&key)?.as_deref() == Some("1"))
    })();

    if let Err(e) = host.storage_remove(&key) {
        tracing::trace!(error = %e, "storage sentinel cleanup failed");
    }

    observed.unwrap_or(false)
}

/// Query the fixed permission list; each failure degrades that one name to
/// `"unknown"`. States are read, never requested.
async fn permission_probe<H: EnvironmentHost>(host: &H) -> BTreeMap<String, String> {
    let mut states = BTreeMap::new();
    for name in PERMISSION_NAMES {
        let state = match host.permission_state(name).await {
            Ok(state) => state,
            Err(e) => {
                tracing::trace!(permission = name, error = %e, "permission query failed");
                "unknown".to_string()
            }
        };
        states.insert(name.to_string(), state);
    }
    states
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{EnvironmentProfile, SimulatedHost};
    use verigate_common::{Brand, Engine};

    #[tokio::test]
    async fn clean_desktop_snapshot() {
        let host = SimulatedHost::new(EnvironmentProfile::desktop_chrome());
        let collector = FingerprintCollector::new(CollectorConfig::default());
        let fingerprint = collector.collect(&host).await;

        assert_eq!(fingerprint.engine, Engine::Chromium);
        assert_eq!(fingerprint.brand, Brand::Chrome);
        assert!(!fingerprint.webdriver);
        assert!(fingerprint.storage_test);
        assert!(!fingerprint.automation_framework_detected);
        assert!(fingerprint.graphics.is_some());
        assert!(fingerprint.permissions.is_none());
    }

    #[tokio::test]
    async fn headless_snapshot_flags_automation() {
        let host = SimulatedHost::new(EnvironmentProfile::headless_automation());
        let collector = FingerprintCollector::new(CollectorConfig::default());
        let fingerprint = collector.collect(&host).await;

        assert!(fingerprint.webdriver);
        assert!(fingerprint.automation_framework_detected);
        assert!(!fingerprint.storage_test);
    }

    #[tokio::test]
    async fn one_failing_probe_degrades_one_field_only() {
        let mut profile = EnvironmentProfile::desktop_chrome();
        profile.storage_enabled = false;
        profile.fail_graphics_probe = true;
        let host = SimulatedHost::new(profile);

        let collector = FingerprintCollector::new(CollectorConfig::default());
        let fingerprint = collector.collect(&host).await;

        assert!(!fingerprint.storage_test);
        assert!(fingerprint.graphics.is_none());
        // Unrelated fields survive intact.
        assert_eq!(fingerprint.brand, Brand::Chrome);
        assert!(!fingerprint.automation_framework_detected);
    }

    #[tokio::test]
    async fn graphics_falls_back_to_standard_parameters() {
        let mut profile = EnvironmentProfile::desktop_chrome();
        profile.graphics_debug_info = false;
        let host = SimulatedHost::new(profile);

        let collector = FingerprintCollector::new(CollectorConfig::default());
        let fingerprint = collector.collect(&host).await;

        let graphics = fingerprint.graphics.expect("fallback parameters present");
        assert_eq!(graphics.vendor, "WebKit");
    }

    #[tokio::test]
    async fn storage_sentinel_is_removed() {
        let host = SimulatedHost::new(EnvironmentProfile::desktop_chrome());
        let collector = FingerprintCollector::new(CollectorConfig::default());
        let fingerprint = collector.collect(&host).await;

        assert!(fingerprint.storage_test);
        assert_eq!(host.storage_len(), 0, "sentinel key must not persist");
    }

    #[tokio::test]
    async fn permission_variant_reports_each_state_or_unknown() {
        let mut profile = EnvironmentProfile::desktop_chrome();
        profile
            .permissions
            .insert("notifications".to_string(), "granted".to_string());
        let host = SimulatedHost::new(profile);

        let collector = FingerprintCollector::new(CollectorConfig {
            permission_probe: true,
        });
        let fingerprint = collector.collect(&host).await;

        let permissions = fingerprint.permissions.expect("richer variant enabled");
        assert_eq!(permissions.len(), PERMISSION_NAMES.len());
        assert_eq!(permissions["notifications"], "granted");
        assert_eq!(permissions["camera"], "prompt");
    }

    #[tokio::test]
    async fn snapshot_serializes_flat() {
        let host = SimulatedHost::new(EnvironmentProfile::desktop_chrome());
        let collector = FingerprintCollector::new(CollectorConfig::default());
        let fingerprint = collector.collect(&host).await;

        let json = serde_json::to_value(&fingerprint).unwrap();
        assert!(json.get("userAgent").is_some());
        assert!(json.get("automationFrameworkDetected").is_some());
        assert!(json.get("storageTest").is_some());
    }
}
