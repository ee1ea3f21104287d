//! # Query Tracker
//!
//! Admission control and a crash-survivable activity log for query-serving
//! engines.
//!
//! Heavy queries can exhaust a process's memory. This crate provides two
//! cooperating pieces around every query's lifetime:
//!
//! - **Admission control**: at most a configured number of queries execute at
//!   once; further callers wait fairly until a unit frees, their request is
//!   cancelled, or their deadline passes.
//! - **Activity log**: while admitted, each query is described in a slot of a
//!   fixed-size table kept in a memory-mapped file. When the process dies
//!   (OOM kill, panic, host failure) the file still shows what was running,
//!   and an offline reader lists it.
//!
//! ## Key Features
//!
//! - **Non-blocking hot path**: log insert/clear use per-slot atomics, never a
//!   table-wide lock, and never allocate
//! - **Disabled mode by type**: without a log path the controller is built over
//!   a zero-sized no-op log and does no formatting at all
//! - **Crash survival without shutdown hooks**: writes land in the shared
//!   mapping immediately
//! - **Geometry checks**: reopening a file with a different capacity or record
//!   size is refused rather than reinterpreted
//!
//! ## Example
//!
//! ```rust,ignore
//! use query_tracker::builders::build_tracker;
//! use query_tracker::config::TrackerConfig;
//! use query_tracker::core::RequestContext;
//!
//! let controller = build_tracker(&TrackerConfig::from_env()?)?;
//!
//! let ctx = RequestContext::new()
//!     .with_tenant("team-a")
//!     .with_trace_id(trace_id)
//!     .with_timeout(Duration::from_secs(30));
//! let handle = controller.insert(&ctx, query_text).await?;
//! let result = engine.execute(query_text).await;
//! controller.delete(handle);
//! ```
//!
//! After a crash, list what was running:
//!
//! ```rust,ignore
//! use query_tracker::infra::activity_log::RecoveryReader;
//!
//! for entry in RecoveryReader::open("/var/lib/engine/active-queries.log")?.entries() {
//!     println!("{}\t{}", entry.slot, entry.description);
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Admission control, request context, descriptions and errors.
pub mod core;
/// Configuration models for admission limits and the activity log.
pub mod config;
/// Builders to construct tracker components from configuration.
pub mod builders;
/// Infrastructure adapters: activity log backends and the offline reader.
pub mod infra;
/// Shared utilities.
pub mod util;

pub use crate::core::{AdmissionController, AdmissionHandle, RequestContext, TrackerError};
pub use crate::infra::activity_log::{
    ActivityLog, ActivityLogBackend, MappedActivityLog, NoopActivityLog, RecoveryReader,
};
