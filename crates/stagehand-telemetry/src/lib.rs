//! Stagehand Telemetry - logging setup for the Stagehand demo shell.
//!
//! This crate provides:
//! - Configurable logging setup with multiple formats
//! - Stdout, stderr, or rolling file output
//! - Conversion from the `[logging]` config section (feature `config`)
//!
//! # Example
//!
//! ```rust,no_run
//! use stagehand_telemetry::{LogConfig, LogFormat, LogTarget, setup_logging};
//!
//! # fn main() -> Result<(), stagehand_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Json)
//!     .with_target(LogTarget::File("logs".into()));
//!
//! setup_logging(&config)?;
//! tracing::info!("Stagehand started");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging};
