//! Library crate for emoji-guess-back, exposing modules for binaries and integration tests.

/// Runtime configuration.
pub mod config;
/// Storage contracts and backends.
pub mod dao;
/// Wire and REST payloads.
pub mod dto;
/// Error types of every layer.
pub mod error;
/// HTTP routes.
pub mod routes;
/// Use cases and live plumbing.
pub mod services;
/// Shared state and room domain.
pub mod state;
