//! Physics collaborator interface and a point-mass reference implementation.
//!
//! Bodies are stored in a table keyed by [`AgentId`]. Nothing in the physics
//! layer points back at an agent, so a whole generation of embodiments can be
//! detached and replaced without leaving dangling references.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{AgentId, Bounds, Vec2};

/// Instantaneous kinematic state of one embodiment.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Kinematics {
    pub position: Vec2,
    pub velocity: Vec2,
    /// Heading in radians.
    pub heading: f32,
}

/// Motor intent emitted by an agent for one step.
///
/// `left` and `right` are the raw wheel outputs of the policy, each in
/// `(-1, 1)`. `jump` carries the raw trigger output when it exceeded the jump
/// threshold. The physics collaborator applies its own force scales.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotorCommand {
    pub left: f32,
    pub right: f32,
    pub jump: Option<f32>,
}

/// Rigid-body side of the simulation, as seen by the evolutionary core.
pub trait Physics {
    /// Queues the forces described by `command` for the next integration.
    ///
    /// Commands for unknown ids are ignored.
    fn apply_motor_command(&mut self, id: AgentId, command: &MotorCommand);

    /// Creates a body for `id` at rest at `start`, replacing any previous one.
    fn attach_embodiment(&mut self, id: AgentId, start: Vec2);

    fn detach_embodiment(&mut self, id: AgentId);

    fn current_kinematics(&self, id: AgentId) -> Option<Kinematics>;
}

/// Tuning of [`PointMassPhysics`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub bounds: Bounds,
    /// Multiplier from wheel output to force.
    pub wheel_force_scale: f32,
    /// Multiplier from jump output to upward force.
    pub jump_force_scale: f32,
    pub mass: f32,
    /// Downward acceleration per frame.
    pub gravity: f32,
    /// Fraction of velocity lost per frame.
    pub air_friction: f32,
    /// Angular velocity per unit of wheel force difference.
    pub turn_rate: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            bounds: Bounds::new(800.0, 500.0),
            wheel_force_scale: 0.01,
            jump_force_scale: 0.003,
            mass: 0.05,
            gravity: 0.02,
            air_friction: 0.05,
            turn_rate: 4.0,
        }
    }
}

#[derive(Debug, Clone)]
struct Body {
    kinematics: Kinematics,
    force: Vec2,
    torque: f32,
}

/// Differential-drive point masses integrated with semi-implicit Euler steps.
///
/// This is a stand-in for a real rigid-body engine: bodies do not collide
/// with each other or with obstacles, they are only kept inside the world
/// bounds.
#[derive(Debug, Clone, Default)]
pub struct PointMassPhysics {
    config: PhysicsConfig,
    bodies: HashMap<AgentId, Body>,
}

impl PointMassPhysics {
    #[must_use]
    pub fn new(config: PhysicsConfig) -> Self {
        Self {
            config,
            bodies: HashMap::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    #[must_use]
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Integrates every body over one frame and clears queued forces.
    pub fn advance(&mut self) {
        let PhysicsConfig {
            bounds,
            mass,
            gravity,
            air_friction,
            turn_rate,
            ..
        } = self.config;
        for body in self.bodies.values_mut() {
            let k = &mut body.kinematics;
            k.velocity += body.force * (1.0 / mass) + Vec2::new(0.0, gravity);
            k.velocity = k.velocity * (1.0 - air_friction);
            k.heading += body.torque * turn_rate;
            k.position += k.velocity;

            let clamped = bounds.clamp(k.position);
            if clamped.x != k.position.x {
                k.velocity.x = 0.0;
            }
            if clamped.y != k.position.y {
                k.velocity.y = 0.0;
            }
            k.position = clamped;

            body.force = Vec2::ZERO;
            body.torque = 0.0;
        }
    }
}

impl Physics for PointMassPhysics {
    fn apply_motor_command(&mut self, id: AgentId, command: &MotorCommand) {
        let Some(body) = self.bodies.get_mut(&id) else {
            return;
        };
        let left = command.left * self.config.wheel_force_scale;
        let right = command.right * self.config.wheel_force_scale;
        let forward = Vec2::from_angle(body.kinematics.heading);
        body.force += forward * (left + right);
        body.torque += right - left;
        if let Some(jump) = command.jump {
            body.force += Vec2::new(0.0, -jump * self.config.jump_force_scale);
        }
    }

    fn attach_embodiment(&mut self, id: AgentId, start: Vec2) {
        self.bodies.insert(
            id,
            Body {
                kinematics: Kinematics {
                    position: start,
                    ..Kinematics::default()
                },
                force: Vec2::ZERO,
                torque: 0.0,
            },
        );
    }

    fn detach_embodiment(&mut self, id: AgentId) {
        self.bodies.remove(&id);
    }

    fn current_kinematics(&self, id: AgentId) -> Option<Kinematics> {
        self.bodies.get(&id).map(|body| body.kinematics)
    }
}
