//! Infrastructure adapters for activity log storage.

pub mod activity_log;

pub use activity_log::{ActivityLogBackend, MappedActivityLog, NoopActivityLog, RecoveryReader};
