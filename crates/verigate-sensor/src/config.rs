//! Configuration management for the sensor.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use verigate_common::constants::{DEFAULT_HELP_URL, DEFAULT_SEARCH_BUDGET, DEFAULT_SERVICE_URL};
use verigate_common::WidgetKind;

use crate::fingerprint::CollectorConfig;
use crate::gate::GateStrategy;
use crate::recorder::RecorderConfig;

/// Sensor configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SensorConfig {
    /// Verification service base URL
    #[serde(default = "default_service_url")]
    pub service_url: String,

    /// Help link shown alongside the widget
    #[serde(default = "default_help_url")]
    pub help_url: String,

    /// Interaction recorder variant
    #[serde(default)]
    pub recorder: RecorderConfig,

    /// Fingerprint collector options
    #[serde(default)]
    pub collector: CollectorConfig,

    /// Proof-of-work search budget (candidate nonces per challenge)
    #[serde(default = "default_search_budget")]
    pub search_budget: u64,

    /// Form enforcement strategy
    #[serde(default)]
    pub gate: GateStrategy,

    /// Widget rendition reported in submissions
    #[serde(default)]
    pub widget: WidgetKind,
}

// Default value functions
fn default_service_url() -> String {
    DEFAULT_SERVICE_URL.to_string()
}
fn default_help_url() -> String {
    DEFAULT_HELP_URL.to_string()
}
fn default_search_budget() -> u64 {
    DEFAULT_SEARCH_BUDGET
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            service_url: default_service_url(),
            help_url: default_help_url(),
            recorder: RecorderConfig::default(),
            collector: CollectorConfig::default(),
            search_budget: default_search_budget(),
            gate: GateStrategy::default(),
            widget: WidgetKind::default(),
        }
    }
}

impl SensorConfig {
    /// Load configuration from file, with a CLI override for the service URL
    pub fn load(config_path: &str, service_url_override: Option<&str>) -> Result<Self> {
        let mut config = if Path::new(config_path).exists() {
            let settings = config::Config::builder()
                .add_source(config::File::with_name(config_path))
                .build()
                .context("Failed to load config file")?;

            settings
                .try_deserialize()
                .context("Failed to parse config")?
        } else {
            tracing::warn!("Config file not found, using defaults");
            Self::default()
        };

        if let Some(url) = service_url_override {
            config.service_url = url.to_string();
        }

        Ok(config)
    }
}
