//! Activity log backends.
//!
//! [`ActivityLog`] is the seam between the admission controller and the
//! record of in-flight operations. Two concrete variants exist:
//! [`MappedActivityLog`] keeps the table in a memory-mapped file that survives
//! a crash, and [`NoopActivityLog`] records nothing. [`ActivityLogBackend`]
//! picks one of them from configuration at runtime.

pub mod layout;
pub mod mapped;
pub mod noop;
pub mod recovery;

use std::fmt;
use std::sync::Arc;

pub use mapped::MappedActivityLog;
pub use noop::NoopActivityLog;
pub use recovery::{log_unfinished, RecoveredEntry, RecoveryReader};

/// Fixed-capacity table of descriptions of in-flight operations.
///
/// Implementations must not block or allocate in `insert` or `clear`.
pub trait ActivityLog: Send + Sync {
    /// Record `description` in a free slot and return its index, or `None`
    /// if the table is full or the log is disabled. A full log is not an
    /// error; the caller carries on with its real work.
    fn insert(&self, description: &dyn fmt::Display) -> Option<usize>;

    /// Mark `slot` free. Clearing a free or out-of-range slot does nothing.
    fn clear(&self, slot: usize);

    /// Whether entries are actually recorded. Callers skip building a
    /// description when this is `false`.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Number of slots in the table.
    fn capacity(&self) -> usize;
}

impl<L: ActivityLog + ?Sized> ActivityLog for Arc<L> {
    fn insert(&self, description: &dyn fmt::Display) -> Option<usize> {
        (**self).insert(description)
    }

    fn clear(&self, slot: usize) {
        (**self).clear(slot);
    }

    fn is_enabled(&self) -> bool {
        (**self).is_enabled()
    }

    fn capacity(&self) -> usize {
        (**self).capacity()
    }
}

/// Log variant chosen from configuration.
#[derive(Debug)]
pub enum ActivityLogBackend {
    /// File-backed log.
    Mapped(MappedActivityLog),
    /// No log configured.
    Disabled(NoopActivityLog),
}

impl ActivityLogBackend {
    /// The file-backed log, if this backend has one.
    #[must_use]
    pub const fn as_mapped(&self) -> Option<&MappedActivityLog> {
        match self {
            Self::Mapped(log) => Some(log),
            Self::Disabled(_) => None,
        }
    }
}

impl From<MappedActivityLog> for ActivityLogBackend {
    fn from(log: MappedActivityLog) -> Self {
        Self::Mapped(log)
    }
}

impl From<NoopActivityLog> for ActivityLogBackend {
    fn from(log: NoopActivityLog) -> Self {
        Self::Disabled(log)
    }
}

impl ActivityLog for ActivityLogBackend {
    fn insert(&self, description: &dyn fmt::Display) -> Option<usize> {
        match self {
            Self::Mapped(log) => log.insert(description),
            Self::Disabled(log) => log.insert(description),
        }
    }

    fn clear(&self, slot: usize) {
        match self {
            Self::Mapped(log) => log.clear(slot),
            Self::Disabled(log) => log.clear(slot),
        }
    }

    fn is_enabled(&self) -> bool {
        match self {
            Self::Mapped(log) => log.is_enabled(),
            Self::Disabled(log) => log.is_enabled(),
        }
    }

    fn capacity(&self) -> usize {
        match self {
            Self::Mapped(log) => log.capacity(),
            Self::Disabled(log) => log.capacity(),
        }
    }
}
