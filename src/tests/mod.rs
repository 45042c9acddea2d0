//! HTTP-level and cross-module tests.
//!
//! - **api_tests**: the full router driven through `tower::ServiceExt::oneshot`
//! - **config_tests**: configuration layering and validation
//! - **error_tests**: error mapping and the terminal error stage
//! - **response_tests**: envelope serialization

pub mod config_tests;
