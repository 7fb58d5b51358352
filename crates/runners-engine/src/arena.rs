//! Reference environment: a walled arena with crystals, obstacles and bases.
//!
//! Crystals are the collectable resources. An agent that touches an
//! uncollected crystal picks it up, carries it, and hands it in by touching
//! any base. Collected crystals vanish and are replaced by freshly placed
//! ones after a fixed delay. Two agents that touch both register a
//! collision, and a carrier hit by a clearly faster agent loses its crystal
//! to it.

use rand::{Rng, SeedableRng as _};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Bounds, Environment, Kinematics, Participant, Physics, Vec2};

/// Layout and interaction radii of an [`Arena`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    pub bounds: Bounds,
    pub crystal_count: usize,
    /// Frames a collected crystal stays gone before it is replaced.
    pub respawn_frames: u32,
    pub pickup_radius: f32,
    pub base_radius: f32,
    /// Centre distance below which two agents touch.
    pub contact_distance: f32,
    /// Speed advantage an agent needs to take a crystal from a carrier.
    pub steal_speed_margin: f32,
    pub spawn_attempts: usize,
    /// Minimum distance between a new crystal and any obstacle.
    pub obstacle_clearance: f32,
    /// Minimum distance between a new crystal and any other crystal.
    pub crystal_clearance: f32,
    pub ray_step: f32,
    pub obstacle_proximity: f32,
    pub obstacles: Vec<Vec2>,
    pub bases: Vec<Vec2>,
    /// Seed for crystal placement. Drawn from the OS when absent.
    pub seed: Option<u64>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            bounds: Bounds::new(800.0, 500.0),
            crystal_count: 8,
            respawn_frames: 300,
            pickup_radius: 25.0,
            base_radius: 30.0,
            contact_distance: 35.0,
            steal_speed_margin: 2.0,
            spawn_attempts: 50,
            obstacle_clearance: 50.0,
            crystal_clearance: 40.0,
            ray_step: crate::environment::DEFAULT_RAY_STEP,
            obstacle_proximity: crate::environment::DEFAULT_OBSTACLE_PROXIMITY,
            obstacles: vec![
                // central hill
                Vec2::new(400.0, 400.0),
                // side platforms
                Vec2::new(150.0, 300.0),
                Vec2::new(650.0, 300.0),
                // pendulum
                Vec2::new(400.0, 200.0),
                // seesaw
                Vec2::new(200.0, 430.0),
            ],
            bases: vec![
                Vec2::new(50.0, 450.0),
                Vec2::new(750.0, 450.0),
                Vec2::new(50.0, 50.0),
                Vec2::new(750.0, 50.0),
            ],
            seed: None,
        }
    }
}

/// Error returned by [`ArenaConfig::validate`].
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum ArenaConfigError {
    #[display("arena bounds must be positive, got {width}x{height}")]
    InvalidBounds { width: f32, height: f32 },
    #[display("ray step must be positive, got {step}")]
    NonPositiveRayStep { step: f32 },
    #[display("{field} must be finite and non-negative, got {value}")]
    NegativeDistance { field: &'static str, value: f32 },
    #[display("at least one base is required")]
    NoBases,
}

impl ArenaConfig {
    /// Checks the layout and radii, reporting the first violation.
    pub fn validate(&self) -> Result<(), ArenaConfigError> {
        let Bounds { width, height } = self.bounds;
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(ArenaConfigError::InvalidBounds { width, height });
        }
        if !self.ray_step.is_finite() || self.ray_step <= 0.0 {
            return Err(ArenaConfigError::NonPositiveRayStep {
                step: self.ray_step,
            });
        }
        let distances = [
            ("pickup_radius", self.pickup_radius),
            ("base_radius", self.base_radius),
            ("contact_distance", self.contact_distance),
            ("steal_speed_margin", self.steal_speed_margin),
            ("obstacle_clearance", self.obstacle_clearance),
            ("crystal_clearance", self.crystal_clearance),
            ("obstacle_proximity", self.obstacle_proximity),
        ];
        if let Some(&(field, value)) = distances
            .iter()
            .find(|(_, value)| !value.is_finite() || *value < 0.0)
        {
            return Err(ArenaConfigError::NegativeDistance { field, value });
        }
        if self.bases.is_empty() {
            return Err(ArenaConfigError::NoBases);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Crystal {
    pub position: Vec2,
    pub collected: bool,
    /// Frames elapsed since the crystal was collected.
    pub respawn_timer: u32,
}

impl Crystal {
    fn new(position: Vec2) -> Self {
        Self {
            position,
            collected: false,
            respawn_timer: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Arena {
    config: ArenaConfig,
    rng: Pcg32,
    crystals: Vec<Crystal>,
}

impl Arena {
    #[must_use]
    pub fn new(config: ArenaConfig) -> Self {
        let mut this = Self::with_crystals(config, &[]);
        this.spawn_crystals(this.config.crystal_count);
        this
    }

    /// Builds an arena with a fixed initial crystal list instead of random
    /// placement. Respawns and resets still place crystals randomly.
    #[must_use]
    pub fn with_crystals(config: ArenaConfig, positions: &[Vec2]) -> Self {
        let rng = match config.seed {
            Some(seed) => Pcg32::seed_from_u64(seed),
            None => Pcg32::from_os_rng(),
        };
        Self {
            config,
            rng,
            crystals: positions.iter().copied().map(Crystal::new).collect(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    #[must_use]
    pub fn crystals(&self) -> &[Crystal] {
        &self.crystals
    }

    #[must_use]
    pub fn bases(&self) -> &[Vec2] {
        &self.config.bases
    }

    /// Advances respawn timers by one frame.
    ///
    /// Crystals whose timer reaches the respawn delay are removed and replaced
    /// by newly placed ones.
    pub fn advance(&mut self) {
        let respawn_frames = self.config.respawn_frames;
        for crystal in self.crystals.iter_mut().filter(|c| c.collected) {
            crystal.respawn_timer += 1;
        }
        let before = self.crystals.len();
        self.crystals
            .retain(|c| !c.collected || c.respawn_timer < respawn_frames);
        let expired = before - self.crystals.len();
        self.spawn_crystals(expired);
    }

    fn spawn_crystals(&mut self, count: usize) {
        for _ in 0..count {
            let position = self.find_spawn_position();
            self.crystals.push(Crystal::new(position));
        }
    }

    /// Rejection-samples a crystal position clear of obstacles and crystals.
    ///
    /// Keeps the last candidate when every attempt is rejected.
    fn find_spawn_position(&mut self) -> Vec2 {
        let Bounds { width, height } = self.config.bounds;
        let x_range = 50.0..(width - 50.0).max(50.1);
        let y_range = 50.0..(height - 150.0).max(50.1);
        let obstacle_sq = self.config.obstacle_clearance.powi(2);
        let crystal_sq = self.config.crystal_clearance.powi(2);

        let mut candidate = Vec2::new(width / 2.0, height / 2.0);
        for _ in 0..self.config.spawn_attempts.max(1) {
            candidate = Vec2::new(
                self.rng.random_range(x_range.clone()),
                self.rng.random_range(y_range.clone()),
            );
            let near_obstacle = self
                .config
                .obstacles
                .iter()
                .any(|o| o.distance_squared(candidate) < obstacle_sq);
            let near_crystal = self
                .crystals
                .iter()
                .any(|c| c.position.distance_squared(candidate) < crystal_sq);
            if !near_obstacle && !near_crystal {
                break;
            }
        }
        candidate
    }

    fn try_pickup<P>(&mut self, participant: &mut P, position: Vec2)
    where
        P: Participant,
    {
        if participant.is_carrying() {
            return;
        }
        let radius_sq = self.config.pickup_radius.powi(2);
        if let Some(crystal) = self
            .crystals
            .iter_mut()
            .find(|c| !c.collected && c.position.distance_squared(position) < radius_sq)
        {
            participant.on_resource_pickup();
            crystal.collected = true;
            crystal.respawn_timer = 0;
        }
    }

    fn try_deliver<P>(&self, participant: &mut P, position: Vec2)
    where
        P: Participant,
    {
        if !participant.is_carrying() {
            return;
        }
        let radius_sq = self.config.base_radius.powi(2);
        if self
            .config
            .bases
            .iter()
            .any(|base| base.distance_squared(position) < radius_sq)
        {
            let distance_to_home = position.distance(participant.home());
            let success = participant.on_resource_deliver_attempt(distance_to_home);
            debug!(agent = %participant.id(), success, "crystal handed in");
        }
    }

    fn resolve_contact<P>(&self, a: (&mut P, Kinematics), b: (&mut P, Kinematics))
    where
        P: Participant,
    {
        let (a, ka) = a;
        let (b, kb) = b;
        if ka.position.distance(kb.position) >= self.config.contact_distance {
            return;
        }
        a.on_collision();
        b.on_collision();

        let speed_a = ka.velocity.length();
        let speed_b = kb.velocity.length();
        let margin = self.config.steal_speed_margin;
        if a.is_carrying() && speed_b > speed_a + margin {
            a.on_resource_stolen();
            b.on_resource_pickup();
            debug!(thief = %b.id(), victim = %a.id(), "crystal stolen");
        } else if b.is_carrying() && speed_a > speed_b + margin {
            b.on_resource_stolen();
            a.on_resource_pickup();
            debug!(thief = %a.id(), victim = %b.id(), "crystal stolen");
        }
    }
}

impl Environment for Arena {
    fn world_bounds(&self) -> Bounds {
        self.config.bounds
    }

    fn obstacles(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.config.obstacles.iter().copied()
    }

    fn uncollected_resources(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.crystals
            .iter()
            .filter(|c| !c.collected)
            .map(|c| c.position)
    }

    fn ray_step(&self) -> f32 {
        self.config.ray_step
    }

    fn obstacle_proximity(&self) -> f32 {
        self.config.obstacle_proximity
    }

    fn resolve_interactions<P, Y>(&mut self, physics: &Y, participants: &mut [P])
    where
        P: Participant,
        Y: Physics + ?Sized,
    {
        let states = participants
            .iter()
            .map(|p| {
                p.is_alive()
                    .then(|| physics.current_kinematics(p.id()))
                    .flatten()
            })
            .collect::<Vec<_>>();

        for (participant, state) in participants.iter_mut().zip(&states) {
            let Some(state) = state else {
                continue;
            };
            self.try_pickup(participant, state.position);
            self.try_deliver(participant, state.position);
        }

        for j in 1..participants.len() {
            let (head, tail) = participants.split_at_mut(j);
            let b = &mut tail[0];
            let Some(kb) = states[j] else {
                continue;
            };
            for (i, a) in head.iter_mut().enumerate() {
                let Some(ka) = states[i] else {
                    continue;
                };
                self.resolve_contact((a, ka), (&mut *b, kb));
            }
        }
    }

    fn reset(&mut self) {
        self.crystals.clear();
        self.spawn_crystals(self.config.crystal_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AgentId, MotorCommand};

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(ArenaConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_config_rejects_degenerate_values() {
        let config = ArenaConfig {
            ray_step: 0.0,
            ..ArenaConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ArenaConfigError::NonPositiveRayStep { step: 0.0 })
        );

        let config = ArenaConfig {
            pickup_radius: -1.0,
            ..ArenaConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ArenaConfigError::NegativeDistance {
                field: "pickup_radius",
                value: -1.0
            })
        );

        let config = ArenaConfig {
            bounds: Bounds::new(800.0, 0.0),
            ..ArenaConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ArenaConfigError::InvalidBounds { .. })
        ));

        let config = ArenaConfig {
            bases: vec![],
            ..ArenaConfig::default()
        };
        assert_eq!(config.validate(), Err(ArenaConfigError::NoBases));
    }

    #[derive(Debug, Default)]
    struct Dummy {
        id: u64,
        home: Vec2,
        carrying: bool,
        pickups: u32,
        deliveries: u32,
        stolen: u32,
        collisions: u32,
    }

    impl Participant for Dummy {
        fn id(&self) -> AgentId {
            AgentId(self.id)
        }

        fn is_alive(&self) -> bool {
            true
        }

        fn is_carrying(&self) -> bool {
            self.carrying
        }

        fn home(&self) -> Vec2 {
            self.home
        }

        fn on_resource_pickup(&mut self) {
            if !self.carrying {
                self.carrying = true;
                self.pickups += 1;
            }
        }

        fn on_resource_deliver_attempt(&mut self, distance_to_home: f32) -> bool {
            if !self.carrying {
                return false;
            }
            self.carrying = false;
            self.deliveries += 1;
            distance_to_home < 40.0
        }

        fn on_resource_stolen(&mut self) {
            self.carrying = false;
            self.stolen += 1;
        }

        fn on_collision(&mut self) {
            self.collisions += 1;
        }
    }

    #[derive(Default)]
    struct Fixed(Vec<(AgentId, Kinematics)>);

    impl Physics for Fixed {
        fn apply_motor_command(&mut self, _id: AgentId, _command: &MotorCommand) {}

        fn attach_embodiment(&mut self, id: AgentId, start: Vec2) {
            self.0.push((
                id,
                Kinematics {
                    position: start,
                    ..Kinematics::default()
                },
            ));
        }

        fn detach_embodiment(&mut self, id: AgentId) {
            self.0.retain(|(i, _)| *i != id);
        }

        fn current_kinematics(&self, id: AgentId) -> Option<Kinematics> {
            self.0.iter().find(|(i, _)| *i == id).map(|(_, k)| *k)
        }
    }

    fn seeded() -> ArenaConfig {
        ArenaConfig {
            seed: Some(7),
            ..ArenaConfig::default()
        }
    }

    fn dummy(id: u64) -> Dummy {
        Dummy {
            id,
            ..Dummy::default()
        }
    }

    #[test]
    fn test_new_places_crystals_inside_spawn_region() {
        let arena = Arena::new(seeded());
        assert_eq!(arena.crystals().len(), 8);
        for crystal in arena.crystals() {
            assert!((50.0..750.0).contains(&crystal.position.x));
            assert!((50.0..350.0).contains(&crystal.position.y));
            assert!(!crystal.collected);
        }
    }

    #[test]
    fn test_same_seed_same_layout() {
        let a = Arena::new(seeded());
        let b = Arena::new(seeded());
        assert_eq!(a.crystals(), b.crystals());
    }

    #[test]
    fn test_first_agent_in_order_wins_pickup() {
        let crystal = Vec2::new(300.0, 100.0);
        let mut arena = Arena::with_crystals(seeded(), &[crystal]);
        let mut physics = Fixed::default();
        physics.attach_embodiment(AgentId(1), crystal + Vec2::new(5.0, 0.0));
        physics.attach_embodiment(AgentId(2), crystal - Vec2::new(5.0, 0.0));
        let mut agents = vec![dummy(1), dummy(2)];

        arena.resolve_interactions(&physics, &mut agents);

        assert_eq!(agents[0].pickups, 1);
        assert_eq!(agents[1].pickups, 0);
        assert_eq!(arena.uncollected_resources().count(), 0);
        // 10 units apart: they also touch.
        assert_eq!(agents[0].collisions, 1);
        assert_eq!(agents[1].collisions, 1);
    }

    #[test]
    fn test_delivery_at_any_base_reports_home_distance() {
        let config = seeded();
        let own_home = config.bases[0];
        let foreign_base = config.bases[3];
        let mut arena = Arena::with_crystals(config, &[]);
        let mut physics = Fixed::default();
        physics.attach_embodiment(AgentId(1), own_home);
        physics.attach_embodiment(AgentId(2), foreign_base);
        let mut agents = vec![
            Dummy {
                id: 1,
                home: own_home,
                carrying: true,
                ..Dummy::default()
            },
            Dummy {
                id: 2,
                home: own_home,
                carrying: true,
                ..Dummy::default()
            },
        ];

        arena.resolve_interactions(&physics, &mut agents);

        assert_eq!(agents[0].deliveries, 1);
        assert_eq!(agents[1].deliveries, 1);
        assert!(!agents[0].carrying);
        assert!(!agents[1].carrying);
    }

    #[test]
    fn test_faster_agent_steals_crystal() {
        let mut arena = Arena::with_crystals(seeded(), &[]);
        let mut physics = Fixed::default();
        physics.0.push((
            AgentId(1),
            Kinematics {
                position: Vec2::new(400.0, 100.0),
                velocity: Vec2::new(0.5, 0.0),
                heading: 0.0,
            },
        ));
        physics.0.push((
            AgentId(2),
            Kinematics {
                position: Vec2::new(420.0, 100.0),
                velocity: Vec2::new(-4.0, 0.0),
                heading: 0.0,
            },
        ));
        let mut agents = vec![
            Dummy {
                id: 1,
                carrying: true,
                ..Dummy::default()
            },
            dummy(2),
        ];

        arena.resolve_interactions(&physics, &mut agents);

        assert_eq!(agents[0].stolen, 1);
        assert!(!agents[0].carrying);
        assert!(agents[1].carrying);
        assert_eq!(agents[1].pickups, 1);
    }

    #[test]
    fn test_collected_crystal_respawns_after_delay() {
        let config = ArenaConfig {
            respawn_frames: 3,
            ..seeded()
        };
        let crystal = Vec2::new(300.0, 100.0);
        let mut arena = Arena::with_crystals(config, &[crystal]);
        let mut physics = Fixed::default();
        physics.attach_embodiment(AgentId(1), crystal);
        let mut agents = vec![dummy(1)];
        arena.resolve_interactions(&physics, &mut agents);
        assert_eq!(arena.uncollected_resources().count(), 0);

        arena.advance();
        arena.advance();
        assert_eq!(arena.crystals().len(), 1);
        assert_eq!(arena.uncollected_resources().count(), 0);
        arena.advance();
        assert_eq!(arena.crystals().len(), 1);
        assert_eq!(arena.uncollected_resources().count(), 1);
    }

    #[test]
    fn test_reset_replaces_all_crystals() {
        let crystal = Vec2::new(300.0, 100.0);
        let mut arena = Arena::with_crystals(seeded(), &[crystal]);
        arena.reset();
        assert_eq!(arena.crystals().len(), 8);
        assert!(arena.crystals().iter().all(|c| !c.collected));
    }
}
