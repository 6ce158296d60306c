//! Process-wide tracing setup
//!
//! Everything goes to one rolling file under `log_dir`, as JSON or as plain
//! text. Text mode also mirrors events to stdout.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::{AppConfig, LogRotation};

/// Dependencies that are noisy at `info` (sqlx logs every statement)
const QUIET_TARGETS: &[&str] = &["sqlx=warn", "hyper=warn"];

impl From<LogRotation> for Rotation {
    fn from(rotation: LogRotation) -> Self {
        match rotation {
            LogRotation::Minutely => Rotation::MINUTELY,
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Daily => Rotation::DAILY,
            LogRotation::Never => Rotation::NEVER,
        }
    }
}

fn default_directives(level: &str) -> String {
    std::iter::once(level)
        .chain(QUIET_TARGETS.iter().copied())
        .collect::<Vec<_>>()
        .join(",")
}

/// `RUST_LOG` wins over the configured level
fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(level)))
}

/// Install the global subscriber. Keep the guard alive until exit or the
/// buffered file output is lost.
pub fn init_logging(config: &AppConfig) -> WorkerGuard {
    let appender = RollingFileAppender::new(
        config.rotation.into(),
        &config.log_dir,
        &config.log_file,
    );
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let (json_file, text_file, stdout) = if config.use_json {
        let json = fmt::layer()
            .json()
            .with_target(true)
            .with_writer(writer)
            .with_ansi(false);
        (Some(json), None, None)
    } else {
        let text = fmt::layer()
            .with_target(false)
            .with_writer(writer)
            .with_ansi(false);
        (None, Some(text), Some(fmt::layer().with_target(false)))
    };

    tracing_subscriber::registry()
        .with(env_filter(&config.log_level))
        .with(json_file)
        .with(text_file)
        .with(stdout)
        .init();

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_quiet_sqlx() {
        let directives = default_directives("debug");
        assert_eq!(directives, "debug,sqlx=warn,hyper=warn");
        assert!(EnvFilter::try_new(&directives).is_ok());
    }

    #[test]
    fn test_rotation_mapping() {
        assert_eq!(Rotation::from(LogRotation::Hourly), Rotation::HOURLY);
        assert_eq!(Rotation::from(LogRotation::Daily), Rotation::DAILY);
        assert_eq!(Rotation::from(LogRotation::Never), Rotation::NEVER);
    }
}
