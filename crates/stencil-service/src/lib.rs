//! # Stencil Service - Templates over HTTP
//!
//! An axum service exposing the `stencil-render` engine: render a template
//! against a JSON context, validate it statically, or fetch a built-in
//! sample. See [`routes`] for the route table.
//!
//! The pieces are layered so each can be tested alone:
//!
//! - [`controller`]: request and response payloads, and the functions that
//!   turn one into the other
//! - [`routes`]: the axum [`Router`](axum::Router) and status code mapping
//! - [`config`]: YAML configuration and command-line overrides
//! - [`logging`]: `tracing` subscriber setup

pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod routes;
pub mod sample;

pub use config::{Cli, ServiceConfig};
pub use error::{Result, ServiceError};
pub use routes::router;
