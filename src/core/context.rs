//! Request-scoped context handed to the admission controller.
//!
//! The query engine builds one [`RequestContext`] per request. It carries the
//! cancellation signal and optional deadline observed while waiting for
//! admission, plus the tenant and trace identifiers rendered into the activity
//! description.

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Lookup of the tenant an operation runs on behalf of.
pub trait TenantSource {
    /// Current tenant identifier, if any.
    fn tenant_id(&self) -> Option<&str>;
}

/// Lookup of the distributed trace an operation belongs to.
pub trait TraceSource {
    /// Current trace identifier, if any.
    fn trace_id(&self) -> Option<&str>;
}

impl<T: TenantSource + ?Sized> TenantSource for &T {
    fn tenant_id(&self) -> Option<&str> {
        (**self).tenant_id()
    }
}

impl<T: TraceSource + ?Sized> TraceSource for &T {
    fn trace_id(&self) -> Option<&str> {
        (**self).trace_id()
    }
}

/// Per-request cancellation, deadline and identity.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
    tenant: Option<String>,
    trace_id: Option<String>,
}

impl RequestContext {
    /// Context with no deadline, tenant or trace, never cancelled unless
    /// [`cancel`](Self::cancel) is called.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tie this context to an existing cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Set an absolute deadline.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Set a deadline relative to now.
    #[must_use]
    pub fn with_timeout(self, timeout: std::time::Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Attach the tenant identifier.
    #[must_use]
    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }

    /// Attach the distributed trace identifier.
    #[must_use]
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    /// Cancel the context. Waiters observe it promptly.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the context has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// The cancellation token backing this context.
    #[must_use]
    pub const fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Absolute deadline, if one was set.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether the deadline (if any) has already passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

impl TenantSource for RequestContext {
    fn tenant_id(&self) -> Option<&str> {
        self.tenant.as_deref()
    }
}

impl TraceSource for RequestContext {
    fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_context_defaults() {
        let ctx = RequestContext::new();
        assert!(ctx.tenant_id().is_none());
        assert!(ctx.trace_id().is_none());
        assert!(ctx.deadline().is_none());
        assert!(!ctx.is_cancelled());
        assert!(!ctx.is_expired());
    }

    #[test]
    fn test_context_identity() {
        let ctx = RequestContext::new()
            .with_tenant("team-a")
            .with_trace_id("4bf92f3577b34da6a3ce929d0e0e4736");
        assert_eq!(ctx.tenant_id(), Some("team-a"));
        assert_eq!(ctx.trace_id(), Some("4bf92f3577b34da6a3ce929d0e0e4736"));
    }

    #[test]
    fn test_cancel_shared_with_clones() {
        let ctx = RequestContext::new();
        let clone = ctx.clone();
        ctx.cancel();
        assert!(clone.is_cancelled());
    }

    #[tokio::test]
    async fn test_expired_deadline() {
        let ctx = RequestContext::new().with_timeout(Duration::ZERO);
        assert!(ctx.is_expired());
    }
}
