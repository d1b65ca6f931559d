//! Automation-signal battery: independent boolean heuristics.
//!
//! Each check runs in isolation; one failing probe degrades to `Unknown`
//! for that check only. The battery reports raw structured outcomes — the
//! accept/reject judgment belongs to the scoring service.

use verigate_common::{AutomationSignal, SensorError, SignalOutcome};

use crate::host::EnvironmentHost;

/// Globals planted by automation frameworks.
const AUTOMATION_GLOBALS: &[&str] = &[
    "_playwright",
    "__playwright",
    "__pw",
    "__pw_manual",
    "__PW_INSTANCE",
    "__PLAYWRIGHT_EVALUATION__",
];

/// User-agent substrings that identify automated builds.
const UA_MARKERS: &[&str] = &["headless", "puppeteer", "selenium", "phantomjs"];

/// Built-ins whose source text is checked for patching.
const NATIVE_CHECKS: &[&str] = &["fetch", "navigator.permissions.query"];

type Check<H> = fn(&H) -> Result<bool, SensorError>;

/// Run every check and collect tagged outcomes.
pub fn run_battery<H: EnvironmentHost>(host: &H) -> Vec<AutomationSignal> {
    let checks: [(&'static str, Check<H>); 7] = [
        ("webdriver_flag", webdriver_flag::<H>),
        ("automation_globals", automation_globals::<H>),
        ("plugins_empty", plugins_empty::<H>),
        ("patched_builtins", patched_builtins::<H>),
        ("missing_expected_globals", missing_expected_globals::<H>),
        ("no_navigation_timing", no_navigation_timing::<H>),
        ("user_agent_markers", user_agent_markers::<H>),
    ];

    checks
        .into_iter()
        .map(|(name, check)| {
            let outcome = match check(host) {
                Ok(true) => SignalOutcome::Detected,
                Ok(false) => SignalOutcome::Clear,
                Err(e) => {
                    tracing::trace!(check = name, error = %e, "automation check failed");
                    SignalOutcome::Unknown
                }
            };
            AutomationSignal {
                check: name.to_string(),
                outcome,
            }
        })
        .collect()
}

/// Aggregate flag: any single positive check trips it.
pub fn any_detected(signals: &[AutomationSignal]) -> bool {
    signals
        .iter()
        .any(|signal| signal.outcome == SignalOutcome::Detected)
}

fn webdriver_flag<H: EnvironmentHost>(host: &H) -> Result<bool, SensorError> {
    Ok(host.webdriver_flag() == Some(true))
}

/// Framework-planted globals, property-name patterns, and UA mention.
/// An environment that refuses these lookups is itself suspicious, so
/// probe failure counts as detection here (unlike the other checks).
fn automation_globals<H: EnvironmentHost>(host: &H) -> Result<bool, SensorError> {
    Ok(automation_globals_inner(host).unwrap_or(true))
}

fn automation_globals_inner<H: EnvironmentHost>(host: &H) -> Result<bool, SensorError> {
    for name in AUTOMATION_GLOBALS {
        if host.has_global(name)? {
            return Ok(true);
        }
    }

    let suspicious_name = |name: &str| {
        let lowered = name.to_lowercase();
        lowered.contains("playwright") || lowered.contains("__pw")
    };
    if host
        .window_property_names()?
        .iter()
        .any(|name| suspicious_name(name))
    {
        return Ok(true);
    }

    Ok(host
        .user_agent()
        .is_some_and(|ua| ua.to_lowercase().contains("playwright")))
}

fn plugins_empty<H: EnvironmentHost>(host: &H) -> Result<bool, SensorError> {
    Ok(host.plugin_count()? == Some(0))
}

/// A patched built-in no longer reports native source.
fn patched_builtins<H: EnvironmentHost>(host: &H) -> Result<bool, SensorError> {
    for name in NATIVE_CHECKS {
        if let Some(source) = host.native_function_source(name)? {
            if !source.contains("[native code]") {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

/// UA claims an engine whose marker object is absent.
fn missing_expected_globals<H: EnvironmentHost>(host: &H) -> Result<bool, SensorError> {
    let ua = match host.user_agent() {
        Some(ua) => ua.to_lowercase(),
        None => return Ok(false),
    };
    if ua.contains("chrome") && !host.has_global("chrome")? {
        return Ok(true);
    }
    Ok(false)
}

/// A fully loaded page with zero navigation entries is implausible.
fn no_navigation_timing<H: EnvironmentHost>(host: &H) -> Result<bool, SensorError> {
    Ok(host.document_loaded() && host.navigation_entry_count()? == 0)
}

fn user_agent_markers<H: EnvironmentHost>(host: &H) -> Result<bool, SensorError> {
    let ua = match host.user_agent() {
        Some(ua) => ua.to_lowercase(),
        None => return Ok(false),
    };
    Ok(UA_MARKERS.iter().any(|marker| ua.contains(marker)))
}
