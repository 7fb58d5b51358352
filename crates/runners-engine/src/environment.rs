//! Environment query and interaction interfaces.
//!
//! The evolutionary core never owns world content. It sees the world only
//! through [`Environment`], which exposes obstacle and resource positions plus
//! the world bounds, and it lets the environment resolve pickups, deliveries
//! and contacts by calling back into agents through [`Participant`].

use crate::{AgentId, Bounds, Physics, Vec2};

/// Default distance between two samples along a sensor ray.
pub const DEFAULT_RAY_STEP: f32 = 5.0;

/// Default distance at which a ray sample counts as touching an obstacle.
pub const DEFAULT_OBSTACLE_PROXIMITY: f32 = 20.0;

/// Callbacks the environment invokes on an agent while resolving a step.
///
/// Implementors are the agents owned by the population. The environment only
/// ever refers to them through this trait, and looks up their bodies in the
/// physics collaborator by [`Participant::id`].
pub trait Participant {
    fn id(&self) -> AgentId;

    fn is_alive(&self) -> bool;

    /// Returns `true` while the agent carries a resource.
    fn is_carrying(&self) -> bool;

    /// Position of the agent's own home base.
    fn home(&self) -> Vec2;

    fn on_resource_pickup(&mut self);

    /// Hands the carried resource in.
    ///
    /// Returns whether the delivery happened close enough to the agent's own
    /// home to count as a success.
    fn on_resource_deliver_attempt(&mut self, distance_to_home: f32) -> bool;

    fn on_resource_stolen(&mut self);

    fn on_collision(&mut self);
}

/// Read access to the world plus step resolution.
///
/// Only [`world_bounds`](Self::world_bounds), [`obstacles`](Self::obstacles),
/// [`uncollected_resources`](Self::uncollected_resources),
/// [`resolve_interactions`](Self::resolve_interactions) and
/// [`reset`](Self::reset) are required; ray casting and the nearest-resource
/// search are derived from them.
pub trait Environment {
    fn world_bounds(&self) -> Bounds;

    /// Positions of every obstacle in the world.
    fn obstacles(&self) -> impl Iterator<Item = Vec2> + '_;

    /// Positions of every resource that can currently be picked up.
    fn uncollected_resources(&self) -> impl Iterator<Item = Vec2> + '_;

    fn ray_step(&self) -> f32 {
        DEFAULT_RAY_STEP
    }

    fn obstacle_proximity(&self) -> f32 {
        DEFAULT_OBSTACLE_PROXIMITY
    }

    /// Marches a ray from `origin` along `angle` and returns the distance to
    /// the first blocked sample.
    ///
    /// A sample is blocked when it leaves the world bounds or comes within
    /// [`obstacle_proximity`](Self::obstacle_proximity) of an obstacle.
    /// Samples are taken every [`ray_step`](Self::ray_step) units. Returns
    /// `max_length` when nothing is hit, or when the step is not positive.
    fn ray_cast(&self, origin: Vec2, angle: f32, max_length: f32) -> f32 {
        let step = self.ray_step();
        if step.is_nan() || step <= 0.0 {
            return max_length;
        }
        let bounds = self.world_bounds();
        let proximity_sq = self.obstacle_proximity().powi(2);
        let direction = Vec2::from_angle(angle);
        #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let steps = (max_length / step) as u32;

        for i in 1..=steps {
            #[expect(clippy::cast_precision_loss)]
            let distance = i as f32 * step;
            let sample = origin + direction * distance;
            if !bounds.contains(sample) {
                return distance;
            }
            if self
                .obstacles()
                .any(|obstacle| obstacle.distance_squared(sample) < proximity_sq)
            {
                return distance;
            }
        }
        max_length
    }

    /// Finds the uncollected resource closest to `origin`.
    ///
    /// Returns `None` when `exclude` is set (the asking agent already holds a
    /// resource) or when no resource is available. Ties keep the first
    /// resource in enumeration order.
    fn nearest_uncollected_resource(&self, origin: Vec2, exclude: bool) -> Option<Vec2> {
        if exclude {
            return None;
        }
        let mut nearest = None;
        let mut min_distance_sq = f32::INFINITY;
        for resource in self.uncollected_resources() {
            let distance_sq = resource.distance_squared(origin);
            if distance_sq < min_distance_sq {
                min_distance_sq = distance_sq;
                nearest = Some(resource);
            }
        }
        nearest
    }

    /// Resolves pickups, deliveries and contacts for one step.
    ///
    /// Participants are visited in slice order, and that order decides who
    /// wins when several agents reach the same resource in one step.
    fn resolve_interactions<P, Y>(&mut self, physics: &Y, participants: &mut [P])
    where
        P: Participant,
        Y: Physics + ?Sized;

    /// Discards the transient objects of the finished episode and creates
    /// fresh ones.
    fn reset(&mut self);
}
