//! Shared configuration and logging setup for Threadline
//!
//! - Process configuration following 12-factor principles
//! - Tracing subscriber initialisation

pub mod config;
pub mod telemetry;

pub use config::{Config, LogFormat};
pub use telemetry::init_tracing;
