//! # Verigate Sensor
//!
//! Client-side bot-detection sensor and verification gate. Collects
//! behavioral and environment evidence, optionally solves a server-issued
//! proof-of-work challenge, submits everything to the verification service,
//! and gates form submission on the outcome.
//!
//! ## Pipeline
//! ```text
//! SessionContext (event log) ─┐
//! FingerprintCollector ───────┼─> VerificationController ─> FormGate
//! ChallengeSolver ────────────┘          │
//!                                        └─> verification service (HTTP)
//! ```
//!
//! The page/browser surface is abstracted behind the [`host`] traits; a
//! scripted [`host::SimulatedHost`] drives the pipeline in tests and in the
//! `verigate` CLI.

pub mod config;
pub mod controller;
pub mod fingerprint;
pub mod gate;
pub mod host;
pub mod pow;
pub mod recorder;
pub mod service;

pub use config::SensorConfig;
pub use controller::{VerificationController, VerifyState};
pub use gate::{FormGate, GateDecision, GateStrategy};
pub use recorder::{EventRecorder, RecorderConfig, SessionContext};
pub use service::{HttpVerificationService, VerificationService};
