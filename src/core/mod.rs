//! Admission control, request context and activity descriptions.

pub mod context;
pub mod controller;
pub mod description;
pub mod error;

pub use context::{RequestContext, TenantSource, TraceSource};
pub use controller::{AdmissionController, AdmissionHandle, UNLIMITED};
pub use description::{describe, format_description, Description};
pub use error::{AppResult, ConfigurationError, RecoveryError, TrackerError};
