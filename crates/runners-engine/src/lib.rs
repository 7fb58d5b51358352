//! World-facing collaborators of the evolutionary core.
//!
//! The core (`runners-brain` and `runners-training`) treats physics and world
//! content as external. This crate defines the seams it talks through and
//! ships one reference implementation of each:
//!
//! - [`Environment`] / [`Participant`] - world queries and step resolution,
//!   implemented by [`Arena`]
//! - [`Physics`] - embodiment lifecycle and motor commands, implemented by
//!   [`PointMassPhysics`]
//!
//! Agents are referred to only by [`AgentId`].

use serde::{Deserialize, Serialize};

pub use self::{arena::*, environment::*, geometry::*, physics::*};

pub mod arena;
pub mod environment;
pub mod geometry;
pub mod physics;

/// Stable identifier of one agent.
///
/// Ids are handed out by the population and never reused, so tables keyed by
/// id never confuse an agent with one from an earlier generation.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[display("#{_0}")]
pub struct AgentId(pub u64);
