//! Errors raised by consumer-side validation of resolved settings.

use std::num::ParseIntError;
use thiserror::Error;

/// Validation failure for a resolved [`ProcessConfig`](crate::ProcessConfig).
///
/// Loading never produces these; they come from the opt-in helpers such as
/// [`ProcessConfig::port_number`](crate::ProcessConfig::port_number).
#[derive(Debug, Error)]
#[allow(clippy::module_name_repetitions)]
pub enum ConfigError {
    /// `PORT` is not a valid TCP port number.
    #[error("invalid PORT value {value:?}: {source}")]
    InvalidPort {
        /// The port text as resolved
        value: String,
        /// Underlying parse failure
        #[source]
        source: ParseIntError,
    },

    /// `GEMINI_API_KEY` is unset or empty.
    #[error("GEMINI_API_KEY is not set")]
    MissingApiKey,
}
