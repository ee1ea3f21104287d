//! Builders to construct tracker components from configuration.

pub mod tracker_builder;

pub use tracker_builder::build_tracker;
