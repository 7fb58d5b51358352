//! Agents: a brain plus per-episode bookkeeping.
//!
//! An [`Agent`] owns its [`PolicyNetwork`] exclusively and tracks what it did
//! during one episode: resources collected and delivered, frames spent
//! carrying, and collisions. At the end of the episode these counters are
//! folded into a single fitness value, the only signal selection sees:
//!
//! ```text
//! fitness = max(0, delivered_reward × delivered
//!                  − collision_penalty × collisions
//!                  + holding_reward × frames_holding
//!                  − idle_penalty [if |vx| + |vy| < idle_speed_threshold])
//! ```

use runners_engine::{AgentId, MotorCommand, Participant, Vec2};
use serde::{Deserialize, Serialize};

use crate::network::{DimensionMismatch, PolicyNetwork};

/// A delivery counts as successful within this distance of the agent's home.
pub const DELIVERY_SUCCESS_RADIUS: f32 = 40.0;

/// Number of network outputs an agent decodes into a motor command.
pub const MOTOR_OUTPUT_COUNT: usize = 3;

/// Coefficients of the fitness function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitnessShaping {
    pub delivered_reward: f32,
    pub collision_penalty: f32,
    /// Reward per frame spent carrying a resource.
    pub holding_reward: f32,
    pub idle_penalty: f32,
    /// Manhattan speed below which an agent counts as idle.
    pub idle_speed_threshold: f32,
}

impl Default for FitnessShaping {
    fn default() -> Self {
        Self {
            delivered_reward: 100.0,
            collision_penalty: 5.0,
            holding_reward: 0.1,
            idle_penalty: 1.0,
            idle_speed_threshold: 0.1,
        }
    }
}

/// How raw network outputs become a [`MotorCommand`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotorDecoding {
    /// The jump output must exceed this value to fire.
    pub jump_threshold: f32,
}

impl Default for MotorDecoding {
    fn default() -> Self {
        Self {
            jump_threshold: 0.5,
        }
    }
}

impl MotorDecoding {
    /// Interprets `[left, right, jump]` network outputs.
    pub fn decode(&self, outputs: &[f32]) -> Result<MotorCommand, DimensionMismatch> {
        let &[left, right, jump] = outputs else {
            return Err(DimensionMismatch::Output {
                expected: MOTOR_OUTPUT_COUNT,
                actual: outputs.len(),
            });
        };
        Ok(MotorCommand {
            left,
            right,
            jump: (jump > self.jump_threshold).then_some(jump),
        })
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentCounters {
    pub collected: u32,
    pub delivered: u32,
    pub frames_holding: u32,
    pub collisions: u32,
}

/// Read-only view of one agent for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub id: AgentId,
    pub fitness: f32,
    pub collected: u32,
    pub delivered: u32,
    pub collisions: u32,
}

#[derive(Debug, Clone)]
pub struct Agent {
    id: AgentId,
    brain: PolicyNetwork,
    home: Vec2,
    counters: AgentCounters,
    carrying: bool,
    alive: bool,
    fitness: f32,
    last_action: Vec<f32>,
}

impl Agent {
    /// Creates a fresh agent with zeroed counters.
    ///
    /// `home` is both the spawn point and the base deliveries are scored
    /// against.
    #[must_use]
    pub fn new(id: AgentId, home: Vec2, brain: PolicyNetwork) -> Self {
        Self {
            id,
            brain,
            home,
            counters: AgentCounters::default(),
            carrying: false,
            alive: true,
            fitness: 0.0,
            last_action: vec![0.0; MOTOR_OUTPUT_COUNT],
        }
    }

    #[must_use]
    pub fn id(&self) -> AgentId {
        self.id
    }

    #[must_use]
    pub fn brain(&self) -> &PolicyNetwork {
        &self.brain
    }

    #[must_use]
    pub fn home(&self) -> Vec2 {
        self.home
    }

    #[must_use]
    pub fn counters(&self) -> &AgentCounters {
        &self.counters
    }

    #[must_use]
    pub fn is_carrying(&self) -> bool {
        self.carrying
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Fitness from the last [`compute_fitness`](Self::compute_fitness) call.
    #[must_use]
    pub fn fitness(&self) -> f32 {
        self.fitness
    }

    /// Raw network outputs of the most recent [`act`](Self::act).
    ///
    /// All zeros until the agent first acts.
    #[must_use]
    pub fn last_action(&self) -> &[f32] {
        &self.last_action
    }

    #[must_use]
    pub fn summary(&self) -> AgentSummary {
        AgentSummary {
            id: self.id,
            fitness: self.fitness,
            collected: self.counters.collected,
            delivered: self.counters.delivered,
            collisions: self.counters.collisions,
        }
    }

    /// Maps a sensor vector to a motor command without touching any state.
    pub fn decide(
        &self,
        sensors: &[f32],
        decoding: &MotorDecoding,
    ) -> Result<MotorCommand, DimensionMismatch> {
        let outputs = self.brain.infer(sensors)?;
        decoding.decode(&outputs)
    }

    /// Decides like [`decide`](Self::decide) and records the step.
    ///
    /// Remembers the raw outputs and counts the frame as a holding frame when
    /// the agent carries a resource. On error nothing is recorded.
    pub fn act(
        &mut self,
        sensors: &[f32],
        decoding: &MotorDecoding,
    ) -> Result<MotorCommand, DimensionMismatch> {
        let outputs = self.brain.infer(sensors)?;
        let command = decoding.decode(&outputs)?;
        self.last_action = outputs;
        if self.carrying {
            self.counters.frames_holding += 1;
        }
        Ok(command)
    }

    /// Picks up a resource. Does nothing while already carrying one.
    pub fn on_resource_pickup(&mut self) {
        if !self.carrying {
            self.carrying = true;
            self.counters.collected += 1;
        }
    }

    /// Hands in the carried resource.
    ///
    /// Without a resource this returns `false` and changes nothing. Otherwise
    /// the delivery is always counted, and the return value tells whether it
    /// happened within [`DELIVERY_SUCCESS_RADIUS`] of home.
    pub fn on_resource_deliver_attempt(&mut self, distance_to_home: f32) -> bool {
        if !self.carrying {
            return false;
        }
        self.carrying = false;
        self.counters.delivered += 1;
        distance_to_home < DELIVERY_SUCCESS_RADIUS
    }

    /// Loses the carried resource to another agent.
    pub fn on_resource_stolen(&mut self) {
        self.carrying = false;
    }

    pub fn on_collision(&mut self) {
        self.counters.collisions += 1;
    }

    /// Recomputes and stores fitness from the counters.
    ///
    /// `velocity` is the body velocity at evaluation time and only feeds the
    /// idle penalty. The result is never negative.
    pub fn compute_fitness(&mut self, velocity: Vec2, shaping: &FitnessShaping) -> f32 {
        let AgentCounters {
            delivered,
            frames_holding,
            collisions,
            ..
        } = self.counters;
        #[expect(clippy::cast_precision_loss)]
        let mut fitness = shaping.delivered_reward * delivered as f32
            - shaping.collision_penalty * collisions as f32
            + shaping.holding_reward * frames_holding as f32;
        if velocity.manhattan_length() < shaping.idle_speed_threshold {
            fitness -= shaping.idle_penalty;
        }
        self.fitness = fitness.max(0.0);
        self.fitness
    }
}

impl Participant for Agent {
    fn id(&self) -> AgentId {
        self.id
    }

    fn is_alive(&self) -> bool {
        self.alive
    }

    fn is_carrying(&self) -> bool {
        self.carrying
    }

    fn home(&self) -> Vec2 {
        self.home
    }

    fn on_resource_pickup(&mut self) {
        Agent::on_resource_pickup(self);
    }

    fn on_resource_deliver_attempt(&mut self, distance_to_home: f32) -> bool {
        Agent::on_resource_deliver_attempt(self, distance_to_home)
    }

    fn on_resource_stolen(&mut self) {
        Agent::on_resource_stolen(self);
    }

    fn on_collision(&mut self) {
        Agent::on_collision(self);
    }
}
