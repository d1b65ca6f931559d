//! # Verigate Common
//!
//! Shared types, errors, and constants used across Verigate components.
//!
//! ## Modules
//! - `types` - Core data structures (events, fingerprint, challenge, payload)
//! - `error` - Common error types
//! - `constants` - Shared configuration constants

pub mod constants;
pub mod error;
pub mod types;

pub use error::SensorError;
pub use types::*;
