//! mathanGO core library
//!
//! Resolves the backend's process configuration from the environment, with
//! best-effort seeding from a local `.env` file.
//!
//! Build a [`ProcessConfig`] once at process entry with
//! [`ProcessConfig::from_env`] and pass it to whatever needs it.

pub mod config;
pub mod env;
pub mod error;

pub use config::{ProcessConfig, SettingReport, Source};

pub use env::{Environment, Origin};

pub use error::ConfigError;
