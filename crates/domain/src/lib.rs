//! # scenehub-domain
//!
//! Pure domain model for the scenehub scene engine.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, state values
//! - Define **Scenes** (named aggregates imposed onto a set of member states)
//! - Define **Members** (one controllable state governed by a scene)
//! - Define **Triggers** (per-branch conditions and cron schedules)
//! - Define **Category selectors** (room/function/other set expressions)
//! - Normalize raw scene configuration objects into runtime scenes
//! - Contain the pure evaluation rules: trigger conditions, stacked delays,
//!   desired-vs-actual reconciliation and virtual-group aggregation
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod value;

pub mod category;
pub mod command;
pub mod config;
pub mod consistency;
pub mod event;
pub mod member;
pub mod scene;
pub mod trigger;
