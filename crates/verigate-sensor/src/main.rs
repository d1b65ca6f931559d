//! # Verigate - verification sensor CLI
//!
//! Drives the full sensor pipeline against a live verification service
//! using a scripted environment: replay an interaction profile, collect a
//! fingerprint, run verification, and gate a form on the outcome.
//!
//! ## Flow
//! ```text
//! InteractionScript → SessionContext ─┐
//! SimulatedHost → Fingerprint ────────┼─> Controller / FormGate → exit code
//! Service (token / pow / verify) ─────┘
//! ```

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use verigate_sensor::config::SensorConfig;
use verigate_sensor::controller::{ControllerConfig, VerificationController, VerifyState};
use verigate_sensor::gate::{FormGate, GateDecision, GateStrategy};
use verigate_sensor::host::{EnvironmentProfile, InteractionScript, LogWidget, SimulatedForm, SimulatedHost};
use verigate_sensor::recorder::SessionContext;
use verigate_sensor::service::HttpVerificationService;

/// Verigate - verification sensor
#[derive(Parser, Debug)]
#[command(name = "verigate")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/verigate.toml")]
    config: String,

    /// Verification service base URL (overrides config)
    #[arg(long, env = "VERIGATE_SERVICE_URL")]
    service_url: Option<String>,

    /// Environment profile to simulate (clean or headless)
    #[arg(long, default_value = "clean")]
    profile: String,

    /// Interaction script to replay (human or bot)
    #[arg(long, default_value = "human")]
    script: String,

    /// Form action path used as the challenge context
    #[arg(long, default_value = "/login")]
    form_action: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, default_value = "false")]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    init_logging(&args.log_level, args.json_logs)?;

    info!("Starting verigate v{}", env!("CARGO_PKG_VERSION"));

    let config = SensorConfig::load(&args.config, args.service_url.as_deref())?;
    info!("Configuration loaded from {}", args.config);

    let host = SimulatedHost::new(match args.profile.as_str() {
        "clean" => EnvironmentProfile::desktop_chrome(),
        "headless" => EnvironmentProfile::headless_automation(),
        other => bail!("unknown profile '{other}' (expected 'clean' or 'headless')"),
    });

    let script = match args.script.as_str() {
        "human" => InteractionScript::human_like(),
        "bot" => InteractionScript::scripted_bot(),
        other => bail!("unknown script '{other}' (expected 'human' or 'bot')"),
    };

    let session = SessionContext::new(config.recorder.clone());
    script.replay(&session);
    info!(
        events = session.event_count(),
        "interaction script replayed"
    );

    let service = HttpVerificationService::new(&config.service_url)
        .context("Failed to build service client")?;

    match config.gate {
        GateStrategy::Verdict => {
            let mut controller = VerificationController::new(
                session,
                service,
                LogWidget,
                ControllerConfig {
                    widget_kind: config.widget,
                    collector: config.collector,
                    help_url: config.help_url.clone(),
                },
            );

            let state = controller.verify(&host).await;
            info!(state = ?state, "verification finished");

            if state != VerifyState::Verified {
                bail!("verification did not reach Verified");
            }
        }
        GateStrategy::Challenge => {
            let form = SimulatedForm::new(&args.form_action);
            let gate = FormGate::new(service, config.search_budget);

            let decision = gate.intercept_with_challenge(&form).await;
            info!(decision = ?decision, "form submission intercepted");

            if decision != GateDecision::Resubmitted {
                bail!("challenge attachment failed");
            }
        }
    }

    info!("verigate run complete");
    Ok(())
}

/// Initialize structured logging with tracing
fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .init();
    }

    Ok(())
}
