//! # scenehub-adapter-virtual
//!
//! Virtual/demo backend keeping every state and configuration object in
//! memory, for testing and demonstration purposes.
//!
//! ## Provided ports
//!
//! | Type | Port | Behaviour |
//! |------|------|-----------|
//! | [`MemoryStateStore`] | `StateStore` | Broadcasts writes matching the active subscription |
//! | [`MemoryObjectStore`] | `SceneRepository`, `CategoryService` | Broadcasts the id of every changed object |
//! | [`MemoryDetector`] | `CapabilityDetector` | Known devices, otherwise any existing state |
//!
//! [`Seed`] fills all three from one JSON document. The [`forward_changes`]
//! and [`forward_notifications`] tasks feed their broadcasts to a running
//! engine.
//!
//! ## Dependency rule
//!
//! Depends on `scenehub-app` (port traits) and `scenehub-domain` only.

mod detector;
mod forward;
mod objects;
mod seed;
mod state;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use detector::MemoryDetector;
pub use forward::{forward_changes, forward_notifications};
pub use objects::MemoryObjectStore;
pub use seed::Seed;
pub use state::MemoryStateStore;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
