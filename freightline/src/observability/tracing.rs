//! tracing-subscriber initialisation and per-operation spans.

use std::time::Instant;
use tracing::Span;
use tracing_subscriber::EnvFilter;

use crate::config::{LogConfig, LogFormat};
use crate::errors::{FreightlineError, Result};

/// Installs the global subscriber described by `config`.
///
/// `RUST_LOG`, when set, takes precedence over `config.level`. Fails if a
/// global subscriber is already installed.
pub fn init_tracing(config: &LogConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| {
            FreightlineError::invalid_argument(format!(
                "invalid log level {:?}: {e}",
                config.level
            ))
        })?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let installed = match config.format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| FreightlineError::Internal(format!("install tracing subscriber: {e}")))
}

/// Opens the span wrapping one service operation.
#[must_use]
pub fn operation_span(operation: &'static str, project: &str) -> Span {
    tracing::info_span!("freightline", operation, project = %project)
}

/// Measures one operation and logs its duration when finished.
#[derive(Debug)]
pub struct OperationTimer {
    start: Instant,
    operation: &'static str,
}

impl OperationTimer {
    /// Starts timing.
    #[must_use]
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Logs completion with the given outcome and returns the duration.
    pub fn finish(self, ok: bool) -> f64 {
        let duration_ms = self.elapsed_ms();
        if ok {
            tracing::debug!(operation = self.operation, duration_ms, "operation completed");
        } else {
            tracing::warn!(operation = self.operation, duration_ms, "operation failed");
        }
        duration_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails() {
        let config = LogConfig::default();
        let _ = init_tracing(&config);
        assert!(init_tracing(&config).is_err());
    }

    #[test]
    fn test_operation_timer() {
        let timer = OperationTimer::start("approve_freight");
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(timer.finish(true) >= 5.0);
    }

    #[test]
    fn test_operation_span_enters() {
        let span = operation_span("watch_stages", "proj");
        let _guard = span.enter();
    }
}
