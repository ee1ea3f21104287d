//! Configuration models for admission limits and the activity log.

pub mod tracker;

pub use tracker::TrackerConfig;
