//! # scenehub-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve a small **JSON API** in front of the scene engine:
//!   - `GET  /api/scenes`: live scenes with their published values
//!   - `POST /api/commands/{command}`: `save`, `enable`, `disable`
//!   - `GET  /api/events/stream`: engine events as Server-Sent Events
//! - Map HTTP requests into engine commands (driving adapter)
//! - Map command outcomes and errors into HTTP responses
//!
//! ## Dependency rule
//! Depends on `scenehub-app` (engine handle, event bus) and `scenehub-domain`
//! (for types used in request/response mapping). Never leaks axum types
//! into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;

#[cfg(test)]
mod testing;
