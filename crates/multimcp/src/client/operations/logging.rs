//! Logging level broadcast

use futures::future::join_all;
use multimcp_types::LogLevel;
use tracing::{debug, warn};

use crate::manager::BackendFailure;

impl super::super::core::MultiServerClient {
    /// Ask every live backend to log at `level`.
    ///
    /// The level is normalised first (`notice` becomes `warning`, `alert`
    /// and `emergency` become `critical`). Backends without logging support
    /// are skipped; other failures are logged and returned without stopping
    /// the broadcast.
    pub async fn set_logging_level(&self, level: LogLevel) -> Vec<BackendFailure> {
        let level = level.normalized();
        let live = self.snapshot().live.clone();

        let outcomes = join_all(live.iter().filter(|backend| !backend.is_closed()).map(
            |backend| async move {
                (
                    backend.name(),
                    backend.session().set_logging_level(level).await,
                )
            },
        ))
        .await;

        let mut failures = Vec::new();
        for (name, outcome) in outcomes {
            match outcome {
                Ok(()) => debug!(backend = %name, level = %level, "logging level set"),
                Err(err) if err.is_unsupported() => {
                    debug!(backend = %name, "backend does not support logging");
                }
                Err(err) => {
                    warn!(backend = %name, error = %err, "failed to set logging level");
                    failures.push(BackendFailure::new(name, err.to_string()));
                }
            }
        }
        failures
    }
}
