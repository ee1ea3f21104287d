//! One-line, greppable descriptions of in-flight operations.
//!
//! A description renders, in fixed order and only when present, the trace id
//! and tenant, followed by the operation summary:
//!
//! ```text
//! traceID=4bf92f3577b34da6 tenant=team-a query=sum(rate(http_requests_total[5m]))
//! ```
//!
//! Line breaks and tabs in any field are rendered as `\n`, `\r` and `\t`.
//!
//! [`describe`] returns a borrowed [`Description`] that implements `Display`,
//! so it can be written straight into an activity-log slot without building an
//! intermediate `String`.

use std::fmt::{self, Write as _};

use crate::core::context::{TenantSource, TraceSource};

/// Borrowed description of one operation, rendered lazily.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Description<'a> {
    trace_id: Option<&'a str>,
    tenant: Option<&'a str>,
    summary: &'a str,
}

impl<'a> Description<'a> {
    /// Trace identifier that will be rendered, if any.
    #[must_use]
    pub const fn trace_id(&self) -> Option<&'a str> {
        self.trace_id
    }

    /// Tenant identifier that will be rendered, if any.
    #[must_use]
    pub const fn tenant(&self) -> Option<&'a str> {
        self.tenant
    }

    /// Caller-supplied operation summary.
    #[must_use]
    pub const fn summary(&self) -> &'a str {
        self.summary
    }
}

impl fmt::Display for Description<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(trace_id) = self.trace_id {
            f.write_str("traceID=")?;
            write_escaped(f, trace_id)?;
            f.write_char(' ')?;
        }
        if let Some(tenant) = self.tenant {
            f.write_str("tenant=")?;
            write_escaped(f, tenant)?;
            f.write_char(' ')?;
        }
        f.write_str("query=")?;
        write_escaped(f, self.summary)
    }
}

/// Write `s` with line breaks and tabs replaced by their backslash escapes,
/// keeping the rendered description on one line.
fn write_escaped(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    let mut rest = s;
    while let Some(pos) = rest.find(['\n', '\r', '\t']) {
        f.write_str(&rest[..pos])?;
        f.write_str(match rest.as_bytes()[pos] {
            b'\n' => "\\n",
            b'\r' => "\\r",
            _ => "\\t",
        })?;
        rest = &rest[pos + 1..];
    }
    f.write_str(rest)
}

/// Build the description of an operation from independent tenant and trace
/// lookups. Empty identifiers are treated as absent.
pub fn describe<'a, T, R>(tenant: &'a T, trace: &'a R, summary: &'a str) -> Description<'a>
where
    T: TenantSource + ?Sized,
    R: TraceSource + ?Sized,
{
    Description {
        trace_id: trace.trace_id().filter(|id| !id.is_empty()),
        tenant: tenant.tenant_id().filter(|id| !id.is_empty()),
        summary,
    }
}

/// Render the description of an operation into an owned string.
pub fn format_description<T, R>(tenant: &T, trace: &R, summary: &str) -> String
where
    T: TenantSource + ?Sized,
    R: TraceSource + ?Sized,
{
    describe(tenant, trace, summary).to_string()
}
