//! Synthetic host world
//!
//! A crowd of wandering mobs and a few players. Each step routes every AI
//! update and every neighbour push through the [`Optimizer`], the same way a
//! host plugin's hooks would.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::host::{HostEntity, Optimizer};
use crate::util::vec3::Vec3;

/// Mobs closer than this (squared) push each other
const PUSH_RADIUS_SQ: f32 = 4.0;
/// Velocity retained per AI step
const DAMPING: f32 = 0.8;
/// Speeds below this settle to rest
const REST_SPEED_SQ: f32 = 0.0001;
/// Half-extent of the spawn area
const SPAWN_EXTENT: f32 = 24.0;

/// One simulated entity
#[derive(Debug, Clone)]
pub struct SimEntity {
    pub id: i64,
    pub player: bool,
    pub position: Vec3,
    pub velocity: Vec3,
    /// AI steps that actually ran
    pub ai_runs: u64,
    /// Pushes that reached the entity
    pub pushes_applied: u64,
}

impl HostEntity for SimEntity {
    fn unique_id(&self) -> i64 {
        self.id
    }

    fn is_player(&self) -> bool {
        self.player
    }
}

/// Identity handed to the controller while the entity itself is being mutated
#[derive(Debug, Clone, Copy)]
struct EntityRef {
    id: i64,
    player: bool,
}

impl HostEntity for EntityRef {
    fn unique_id(&self) -> i64 {
        self.id
    }

    fn is_player(&self) -> bool {
        self.player
    }
}

/// What happened during one world step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    pub tick: u64,
    pub ai_runs: u32,
    pub ai_skipped: u32,
    pub pushes: u32,
    pub pushes_dropped: u32,
}

pub struct SimWorld {
    entities: Vec<SimEntity>,
    tick: u64,
    rng: StdRng,
}

impl SimWorld {
    /// World with `mobs` mobs and `players` players scattered around the origin
    pub fn new(mobs: usize, players: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let entities = (0..mobs + players)
            .map(|i| SimEntity {
                id: i as i64 + 1,
                player: i >= mobs,
                position: Vec3::new(
                    rng.gen_range(-SPAWN_EXTENT..SPAWN_EXTENT),
                    0.0,
                    rng.gen_range(-SPAWN_EXTENT..SPAWN_EXTENT),
                ),
                velocity: Vec3::ZERO,
                ai_runs: 0,
                pushes_applied: 0,
            })
            .collect();

        Self {
            entities,
            tick: 1,
            rng,
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn entities(&self) -> &[SimEntity] {
        &self.entities
    }

    /// Run one server tick through `optimizer`
    pub fn step(&mut self, optimizer: &mut Optimizer) -> StepReport {
        let tick = self.tick;
        let mut report = StepReport {
            tick,
            ..Default::default()
        };

        for i in 0..self.entities.len() {
            let handle = EntityRef {
                id: self.entities[i].id,
                player: self.entities[i].player,
            };
            let wander = Vec3::new(
                self.rng.gen_range(-0.2..0.2),
                0.0,
                self.rng.gen_range(-0.2..0.2),
            );
            let entity = &mut self.entities[i];
            let mut ran = false;

            optimizer.on_mob_ai_step(&handle, tick, || {
                entity.velocity = (entity.velocity + wander) * DAMPING;
                if entity.velocity.length_sq() < REST_SPEED_SQ {
                    entity.velocity = Vec3::ZERO;
                }
                entity.position += entity.velocity;
                entity.ai_runs += 1;
                ran = true;
            });

            if ran {
                report.ai_runs += 1;
            } else {
                report.ai_skipped += 1;
            }
        }

        let len = self.entities.len();
        for i in 0..len {
            let j = (i + 1) % len;
            if i == j {
                continue;
            }
            let (owner, other) = (&self.entities[i], &self.entities[j]);
            if owner.position.distance_sq_to(other.position) > PUSH_RADIUS_SQ {
                continue;
            }

            let mut accepted = 0u32;
            optimizer.on_push_actor(owner, other, || accepted += 1);
            optimizer.on_push_vec(owner, owner.velocity, |_| accepted += 1);

            report.pushes += 2;
            report.pushes_dropped += 2 - accepted;
            self.entities[j].pushes_applied += u64::from(accepted);
        }

        optimizer.on_server_tick();
        self.tick += 1;
        report
    }

    /// Run `ticks` steps, returning the per-step reports
    pub fn run(&mut self, optimizer: &mut Optimizer, ticks: u64) -> Vec<StepReport> {
        (0..ticks).map(|_| self.step(optimizer)).collect()
    }
}
