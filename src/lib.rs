//! # hello-api
//!
//! A small Axum backend carrying three reusable pieces of HTTP plumbing:
//!
//! - [`response`]: the uniform JSON envelope every endpoint answers with
//! - [`validation`]: schema-driven validation of body, query and path parameters
//! - [`middleware::rate_limit`]: a fixed-window per-client rate limiter
//!
//! They sit in front of thin CRUD handlers ([`routes`]) for users and hello-world
//! messages persisted in SQLite ([`repository`]).

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod repository;
pub mod response;
pub mod routes;
pub mod state;
pub mod validation;

#[cfg(test)]
mod tests;
