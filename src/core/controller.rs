//! Admission controller: bounds concurrently executing queries and records
//! each admitted one in the activity log.
//!
//! ```rust,ignore
//! use query_tracker::core::{AdmissionController, RequestContext};
//! use query_tracker::infra::activity_log::MappedActivityLog;
//!
//! let log = MappedActivityLog::open("/var/lib/engine/active-queries.log", 1024)?;
//! let controller = AdmissionController::new(20, log);
//!
//! let ctx = RequestContext::new().with_tenant("team-a");
//! let handle = controller.insert(&ctx, "sum(rate(http_requests_total[5m]))").await?;
//! // ... run the query ...
//! controller.delete(handle);
//! ```

use std::fmt;
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::core::context::RequestContext;
use crate::core::description::describe;
use crate::core::TrackerError;
use crate::infra::activity_log::{ActivityLog, NoopActivityLog};

/// Value of [`AdmissionController::get_max_concurrent`] for an unbounded
/// controller.
pub const UNLIMITED: i64 = -1;

/// Proof of admission returned by [`AdmissionController::insert`].
///
/// Releasing the handle clears its activity entry and then returns its
/// concurrency unit. [`AdmissionController::delete`] is the explicit way to
/// do that; dropping the handle does the same, so a request future cancelled
/// mid-flight leaves neither a stale entry nor a held unit behind. `delete`
/// takes the handle by value, so a second release cannot be expressed.
#[derive(Debug, Default)]
pub struct AdmissionHandle {
    // Field order is drop order: the entry goes before the unit.
    entry: Option<LogEntry>,
    permit: Option<OwnedSemaphorePermit>,
}

impl AdmissionHandle {
    /// Activity log slot recording this operation, if one was recorded.
    #[must_use]
    pub fn slot(&self) -> Option<usize> {
        self.entry.as_ref().map(|entry| entry.slot)
    }

    /// Whether the operation was recorded in the activity log.
    #[must_use]
    pub const fn is_recorded(&self) -> bool {
        self.entry.is_some()
    }

    /// Whether this handle holds a concurrency unit.
    #[must_use]
    pub const fn holds_unit(&self) -> bool {
        self.permit.is_some()
    }
}

/// Occupied activity log slot, cleared when dropped.
struct LogEntry {
    log: Arc<dyn ActivityLog>,
    slot: usize,
}

impl fmt::Debug for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogEntry").field("slot", &self.slot).finish_non_exhaustive()
    }
}

impl Drop for LogEntry {
    fn drop(&mut self) {
        self.log.clear(self.slot);
    }
}

/// Bounds simultaneously admitted operations and ties each admission to one
/// activity log entry.
///
/// Waiting callers are queued fairly (first come, first served), so every
/// caller that keeps waiting is eventually admitted once units free up.
#[derive(Debug)]
pub struct AdmissionController<L = NoopActivityLog> {
    limit: i64,
    units: Option<Arc<Semaphore>>,
    log: Arc<L>,
}

impl<L: ActivityLog + 'static> AdmissionController<L> {
    /// Create a controller admitting at most `limit` operations at once.
    ///
    /// A negative `limit` disables bounding; the controller then only records
    /// operations in `log`. A limit of zero admits nothing until the context
    /// gives up.
    pub fn new(limit: i64, log: L) -> Self {
        if limit < 0 {
            return Self {
                limit: UNLIMITED,
                units: None,
                log: Arc::new(log),
            };
        }
        let permits = usize::try_from(limit)
            .unwrap_or(usize::MAX)
            .min(Semaphore::MAX_PERMITS);
        Self {
            limit,
            units: Some(Arc::new(Semaphore::new(permits))),
            log: Arc::new(log),
        }
    }

    /// Admit one operation described by `summary`.
    ///
    /// When bounded and no unit is free, waits until one is released, the
    /// context is cancelled, or its deadline passes. Nothing is acquired when
    /// an error is returned. Whether or not the activity log has room, an
    /// admitted operation always gets a handle.
    ///
    /// # Errors
    ///
    /// [`TrackerError::AdmissionCanceled`] if `ctx` is cancelled and
    /// [`TrackerError::AdmissionTimedOut`] if its deadline passes before a
    /// unit is acquired.
    pub async fn insert(
        &self,
        ctx: &RequestContext,
        summary: &str,
    ) -> Result<AdmissionHandle, TrackerError> {
        let permit = match &self.units {
            Some(units) => Some(acquire(units, ctx).await?),
            None => None,
        };
        let entry = if self.log.is_enabled() {
            self.log
                .insert(&describe(ctx, ctx, summary))
                .map(|slot| LogEntry {
                    log: Arc::clone(&self.log) as Arc<dyn ActivityLog>,
                    slot,
                })
        } else {
            None
        };
        Ok(AdmissionHandle { entry, permit })
    }

    /// Release an admission: clear its activity entry, then return its unit.
    ///
    /// An empty (default) handle is accepted and does nothing.
    pub fn delete(&self, handle: AdmissionHandle) {
        drop(handle);
    }

    /// Configured bound, or [`UNLIMITED`].
    #[must_use]
    pub const fn get_max_concurrent(&self) -> i64 {
        self.limit
    }

    /// Operations currently holding a unit. Always 0 when unbounded, since
    /// admissions are not counted then.
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.units.as_ref().map_or(0, |units| {
            usize::try_from(self.limit)
                .unwrap_or(usize::MAX)
                .min(Semaphore::MAX_PERMITS)
                .saturating_sub(units.available_permits())
        })
    }

    /// Units free right now, or `None` when unbounded.
    #[must_use]
    pub fn available(&self) -> Option<usize> {
        self.units.as_ref().map(|units| units.available_permits())
    }

    /// The activity log this controller records into.
    pub fn log(&self) -> &L {
        &self.log
    }
}

async fn acquire(
    units: &Arc<Semaphore>,
    ctx: &RequestContext,
) -> Result<OwnedSemaphorePermit, TrackerError> {
    if ctx.is_cancelled() {
        return Err(TrackerError::AdmissionCanceled);
    }
    if ctx.is_expired() {
        return Err(TrackerError::AdmissionTimedOut);
    }
    if let Ok(permit) = Arc::clone(units).try_acquire_owned() {
        return Ok(permit);
    }

    tracing::debug!(
        available = units.available_permits(),
        "no admission unit free, waiting"
    );
    let deadline = async {
        match ctx.deadline() {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    };
    tokio::select! {
        biased;
        () = ctx.token().cancelled() => {
            tracing::debug!("admission canceled while waiting");
            Err(TrackerError::AdmissionCanceled)
        }
        () = deadline => {
            tracing::debug!("admission deadline passed while waiting");
            Err(TrackerError::AdmissionTimedOut)
        }
        permit = Arc::clone(units).acquire_owned() => {
            // The semaphore is never closed; treat closure like cancellation.
            permit.map_err(|_| TrackerError::AdmissionCanceled)
        }
    }
}
