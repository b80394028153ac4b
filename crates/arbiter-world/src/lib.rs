//! Actor state and kinematics for the Arbiter game-master engine.
//!
//! This crate owns the mutable per-actor world state that the core's
//! proximity checks depend on: positions advanced by a fixed-timestep
//! integrator from held movement keys, health, and the ephemeral chat
//! overlay. Actors are created lazily, placed deterministically on a
//! golden-angle spawn ring, and never explicitly destroyed.
//!
//! # Modules
//!
//! - [`actor`] -- one actor's mutable state and spawn placement
//! - [`roster`] -- the actor collection: lazy creation, overlays, proximity
//! - [`motion`] -- the accumulator-driven fixed-timestep integrator

pub mod actor;
pub mod motion;
pub mod roster;

pub use actor::{Actor, Overlay};
pub use motion::{Integrator, SIM_STEP_MS, SPEED};
pub use roster::Roster;
