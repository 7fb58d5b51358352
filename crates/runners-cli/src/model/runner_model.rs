use chrono::{DateTime, Utc};
use runners_brain::network::PolicyNetwork;
use serde::{Deserialize, Serialize};

/// A trained brain as saved by `train` and loaded by `evaluate`.
///
/// The network's weight vectors are checked against its declared shape when
/// the model is deserialized.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunnerModel {
    pub name: String,
    pub trained_at: DateTime<Utc>,
    /// Generation whose best agent this brain belongs to.
    pub generation: u32,
    pub final_fitness: f32,
    pub network: PolicyNetwork,
}
