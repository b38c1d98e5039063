//! # scenehub-app
//!
//! Application layer: the scene engine and its **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `StateStore`: read, write and watch live states
//!   - `SceneRepository`: list, get and update scene objects
//!   - `CategoryService` / `CapabilityDetector`: category selector expansion
//!   - `EventPublisher`: broadcast engine events
//! - Provide the **scene engine**: a single task that loads scenes, routes
//!   state changes, activates branches, runs delays and schedules, keeps each
//!   scene's value consistent and executes commands
//! - Provide **in-process infrastructure** (event bus) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `scenehub-domain` only (plus `tokio` for channels and timers).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod engine;
pub mod event_bus;
pub mod ports;
pub mod settings;
