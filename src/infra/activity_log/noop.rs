//! Disabled activity log.

use std::fmt;

use crate::infra::activity_log::ActivityLog;

/// Activity log that records nothing.
///
/// Selected when no log path is configured. It is zero-sized and every
/// operation returns immediately, so a controller built over it never formats
/// a description or touches memory on behalf of the log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoopActivityLog;

impl ActivityLog for NoopActivityLog {
    #[inline]
    fn insert(&self, _description: &dyn fmt::Display) -> Option<usize> {
        None
    }

    #[inline]
    fn clear(&self, _slot: usize) {}

    #[inline]
    fn is_enabled(&self) -> bool {
        false
    }

    #[inline]
    fn capacity(&self) -> usize {
        0
    }
}
