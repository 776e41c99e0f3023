//! The `finrag` service and its companion tools.
//!
//! - [`routes::router`] exposes a shared [`ChatService`] over HTTP.
//! - [`eval`] scores a running service against the curated facts.
//! - [`chat`] is a terminal client that keeps the conversation locally.
//!
//! The binary wires these to real providers; tests wire them to stubs.

pub mod chat;
pub mod config;
pub mod eval;
pub mod routes;
pub mod service;

pub use config::{Cli, Command, ConfigError};
pub use routes::router;
pub use service::{ChatService, ServiceError};
