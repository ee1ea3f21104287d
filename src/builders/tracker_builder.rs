//! Build an admission controller from configuration.

use crate::config::TrackerConfig;
use crate::core::{AdmissionController, ConfigurationError};
use crate::infra::activity_log::{
    log_unfinished, ActivityLogBackend, MappedActivityLog, NoopActivityLog,
};

/// Build the controller described by `cfg`.
///
/// With a log path configured, entries left by a previous process are
/// reported first (when `recover_on_start` is set), then the log is opened
/// and reset. Without one, the disabled log is used.
///
/// # Errors
///
/// Returns [`ConfigurationError`] when validation fails or the log cannot be
/// opened with the configured geometry. Leftovers that cannot be read are
/// logged and do not prevent startup.
pub fn build_tracker(
    cfg: &TrackerConfig,
) -> Result<AdmissionController<ActivityLogBackend>, ConfigurationError> {
    cfg.validate().map_err(ConfigurationError::Invalid)?;

    let log = match &cfg.active_query_log {
        Some(path) => {
            if cfg.recover_on_start {
                if let Err(e) = log_unfinished(path) {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "could not read activity log left by previous run"
                    );
                }
            }
            ActivityLogBackend::from(MappedActivityLog::open_with_record_size(
                path,
                cfg.log_capacity,
                cfg.record_size,
            )?)
        }
        None => {
            tracing::info!("activity log disabled");
            ActivityLogBackend::from(NoopActivityLog)
        }
    };

    tracing::info!(max_concurrent = cfg.max_concurrent, "query tracker ready");
    Ok(AdmissionController::new(cfg.max_concurrent, log))
}
