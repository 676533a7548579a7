//! Logging initialization for mathango.

use anyhow::Result;
use std::path::Path;
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*};

/// Initialize the tracing subscriber.
///
/// # Log Levels
///
/// By default only WARN and ERROR are emitted. `directives` uses the
/// `RUST_LOG` syntax and is normally the `RUST_LOG` value from the resolved
/// environment, so a `.env` file can raise the level too:
///
/// ```sh
/// RUST_LOG=info mathango
/// RUST_LOG=mathango=debug mathango --sources
/// ```
///
/// Console output goes to stderr so stdout carries only the rendered
/// configuration. When `log_dir` is given, a daily-rotated `mathango.log` is
/// written there as well.
///
/// # Returns
///
/// The file writer guard, which must be held until exit so buffered lines
/// are flushed.
///
/// # Errors
///
/// Returns an error if:
/// - Log directory cannot be created
/// - Subscriber cannot be set as global default
pub fn init_logging(
    directives: Option<&str>,
    log_dir: Option<&Path>,
) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::WARN.into())
        .parse_lossy(directives.unwrap_or_default());

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let (writer, guard) = non_blocking(rolling::daily(dir, "mathango.log"));
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(guard))
        },
        None => (None, None),
    };

    let subscriber = Registry::default()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .event_format(fmt::format().compact()),
        )
        .with(file_layer);

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(guard)
}
