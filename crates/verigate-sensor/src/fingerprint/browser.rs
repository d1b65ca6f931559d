//! Engine/brand detection via an ordered elimination chain.
//!
//! Several markers can co-exist (Brave ships chrome.runtime, Opera ships
//! both), so the chain is an explicit priority list and the first match
//! wins. Order here is a behavioral contract, not an optimization.

use verigate_common::{Brand, BrowserIdentity, Engine, SensorError};

use crate::host::EnvironmentHost;

type Marker<H> = fn(&H) -> Result<bool, SensorError>;

/// Walk the engine chain, then (for Chromium) the brand chain.
///
/// A probe that errors is skipped, never fatal: detection degrades to
/// `Unknown` when nothing answers.
pub fn detect_browser<H: EnvironmentHost>(host: &H) -> BrowserIdentity {
    let engine_chain: [(Engine, Brand, Marker<H>); 3] = [
        (Engine::Gecko, Brand::Firefox, gecko_marker::<H>),
        (Engine::Webkit, Brand::Safari, webkit_marker::<H>),
        (Engine::Chromium, Brand::Chromium, chromium_marker::<H>),
    ];

    for (engine, family_brand, marker) in engine_chain {
        match marker(host) {
            Ok(true) => {
                let brand = if engine == Engine::Chromium {
                    chromium_brand(host)
                } else {
                    family_brand
                };
                return BrowserIdentity { engine, brand };
            }
            Ok(false) => {}
            Err(e) => {
                tracing::trace!(engine = ?engine, error = %e, "engine marker probe failed");
            }
        }
    }

    BrowserIdentity::UNKNOWN
}

/// Gecko-only install API global.
fn gecko_marker<H: EnvironmentHost>(host: &H) -> Result<bool, SensorError> {
    host.has_global("InstallTrigger")
}

/// WebKit's push-notification object identifies itself via toString.
fn webkit_marker<H: EnvironmentHost>(host: &H) -> Result<bool, SensorError> {
    Ok(host
        .global_repr("safari.pushNotification")?
        .is_some_and(|repr| repr.contains("SafariRemoteNotification")))
}

/// The Chromium-family marker object.
fn chromium_marker<H: EnvironmentHost>(host: &H) -> Result<bool, SensorError> {
    host.has_global("chrome")
}

/// Brand chain within the Chromium family, highest priority first:
/// privacy extension -> alternate-browser UI -> rendering engine ->
/// mainstream runtime -> bare Chromium.
fn chromium_brand<H: EnvironmentHost>(host: &H) -> Brand {
    let brand_chain: [(Brand, Marker<H>); 4] = [
        (Brand::Brave, brave_marker::<H>),
        (Brand::Opera, opera_marker::<H>),
        (Brand::Edge, edge_marker::<H>),
        (Brand::Chrome, chrome_marker::<H>),
    ];

    for (brand, marker) in brand_chain {
        match marker(host) {
            Ok(true) => return brand,
            Ok(false) => {}
            Err(e) => {
                tracing::trace!(brand = ?brand, error = %e, "brand marker probe failed");
            }
        }
    }

    // Bare Chromium: custom builds and automation shells land here.
    Brand::Chromium
}

fn brave_marker<H: EnvironmentHost>(host: &H) -> Result<bool, SensorError> {
    host.has_global("navigator.brave.isBrave")
}

fn opera_marker<H: EnvironmentHost>(host: &H) -> Result<bool, SensorError> {
    host.has_global("opr.addons")
}

fn edge_marker<H: EnvironmentHost>(host: &H) -> Result<bool, SensorError> {
    host.has_global("StyleMedia")
}

fn chrome_marker<H: EnvironmentHost>(host: &H) -> Result<bool, SensorError> {
    Ok(host.has_global("chrome.loadTimes")? || host.has_global("chrome.runtime")?)
}
