//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the scene engine and the outside world.
//! They are defined here (in `app`) so that both the engine and the adapter
//! layer can depend on them without creating circular dependencies.

pub mod category;
pub mod event_bus;
pub mod scene_repo;
pub mod state_store;

pub use category::{CapabilityDetector, CategoryService};
pub use event_bus::EventPublisher;
pub use scene_repo::SceneRepository;
pub use state_store::{StateChange, StateSnapshot, StateStore, Subscription};
