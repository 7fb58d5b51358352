//! Sensor vector construction.
//!
//! The encoded vector has [`SENSOR_COUNT`] entries in a fixed order:
//!
//! ```text
//! [ray0, ray1, ray2, ray3, vel_x, vel_y, dir_x, dir_y]
//! ```
//!
//! - `ray*` - ray distances at fixed offsets from the heading, divided by the
//!   ray length (so in `[0, 1]`)
//! - `vel_*` - body velocity divided by a fixed scale
//! - `dir_*` - unit vector to the nearest uncollected resource, or zeros when
//!   the agent carries one or none is available

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

use runners_engine::{Environment, Kinematics};
use serde::{Deserialize, Serialize};

pub const RAY_COUNT: usize = 4;
pub const SENSOR_COUNT: usize = RAY_COUNT + 4;

pub type SensorVector = [f32; SENSOR_COUNT];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub ray_length: f32,
    /// Ray directions relative to the heading, in radians.
    pub ray_angles: [f32; RAY_COUNT],
    pub velocity_scale: f32,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            ray_length: 80.0,
            ray_angles: [-FRAC_PI_4, 0.0, FRAC_PI_4, FRAC_PI_2],
            velocity_scale: 10.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SensorEncoder {
    config: SensorConfig,
}

impl SensorEncoder {
    #[must_use]
    pub fn new(config: SensorConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    /// Encodes the sensor vector of one agent.
    ///
    /// Pure with respect to both the agent state and the environment.
    pub fn encode<E>(&self, kinematics: &Kinematics, carrying: bool, env: &E) -> SensorVector
    where
        E: Environment,
    {
        let SensorConfig {
            ray_length,
            ray_angles,
            velocity_scale,
        } = &self.config;
        let mut sensors = [0.0; SENSOR_COUNT];

        for (slot, offset) in sensors.iter_mut().zip(ray_angles) {
            let distance =
                env.ray_cast(kinematics.position, kinematics.heading + offset, *ray_length);
            *slot = distance / ray_length;
        }

        sensors[RAY_COUNT] = kinematics.velocity.x / velocity_scale;
        sensors[RAY_COUNT + 1] = kinematics.velocity.y / velocity_scale;

        let direction = env
            .nearest_uncollected_resource(kinematics.position, carrying)
            .and_then(|target| (target - kinematics.position).normalized())
            .unwrap_or_default();
        sensors[RAY_COUNT + 2] = direction.x;
        sensors[RAY_COUNT + 3] = direction.y;

        sensors
    }
}
