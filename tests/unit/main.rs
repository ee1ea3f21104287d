//! Unit tests for individual components

mod builders_test;
mod config_test;
mod description_test;
mod error_test;
mod util_test;
