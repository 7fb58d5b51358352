//! Policy side of the resource runners: what an agent senses, how it decides,
//! and how its episode is scored.
//!
//! # Architecture
//!
//! ```text
//! Environment + Kinematics (runners-engine)
//!     ↓ encoded by
//! SensorEncoder (sensor)
//!     ↓ fed into
//! PolicyNetwork (network)
//!     ↓ decoded by
//! Agent / MotorDecoding (agent)
//!     ↓ emits
//! MotorCommand → Physics collaborator
//! ```
//!
//! Agents also implement [`runners_engine::Participant`], so the environment
//! can report pickups, deliveries, thefts and collisions back to them. The
//! counters collected this way become the agent's fitness at the end of an
//! episode (see [`agent`]).
//!
//! All randomness is drawn from a caller-supplied [`rand::Rng`], which makes
//! every network initialization, crossover and mutation reproducible from a
//! seed.

pub mod agent;
pub mod network;
pub mod sensor;
