use common::shapes::{Circle, Point, Rectangle};
use rand::rngs::StdRng;
use rand::Rng;
use std::f32::consts::TAU;
use std::sync::Arc;

const START_HEALTH: f32 = 1.0;

#[derive(Clone, Copy, Debug)]
pub struct Enemy {
    pub health: f32,
    pub speed: f32,
}

/// Enemies packed densely: index `i` of `positions` and `enemies` is the same entity.
///
/// Removal swaps the last entity into the hole, so indices are only stable until the
/// next [`Swarm::remove_dead`].
pub struct Swarm {
    positions: Arc<Vec<Point>>,
    enemies: Vec<Enemy>,
    capacity: usize,
    speed: f32,
    speed_variance: f32,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ZapOutcome {
    pub candidates: usize,
    pub hits: usize,
}

impl Swarm {
    pub fn new(capacity: usize, speed: f32, speed_variance: f32) -> Self {
        Self {
            positions: Arc::new(Vec::with_capacity(capacity)),
            enemies: Vec::with_capacity(capacity),
            capacity,
            speed,
            speed_variance,
        }
    }

    pub fn len(&self) -> usize {
        self.enemies.len()
    }

    pub fn is_full(&self) -> bool {
        self.enemies.len() >= self.capacity
    }

    /// Shared snapshot for a rebuild worker. Moving the swarm while a worker still
    /// holds it copies the positions first.
    pub fn positions(&self) -> &Arc<Vec<Point>> {
        &self.positions
    }

    pub fn live(&self) -> std::ops::Range<u32> {
        0..self.enemies.len() as u32
    }

    pub fn spawn(&mut self, position: Point, rng: &mut StdRng) -> bool {
        if self.is_full() {
            return false;
        }
        let spread = self.speed * self.speed_variance;
        let speed = if spread > 0.0 {
            rng.gen_range(self.speed - spread..self.speed + spread)
        } else {
            self.speed
        };
        Arc::make_mut(&mut self.positions).push(position);
        self.enemies.push(Enemy {
            health: START_HEALTH,
            speed,
        });
        true
    }

    /// Spawns `count` enemies evenly around a ring centered on `world`.
    pub fn spawn_ring(&mut self, world: &Rectangle, radius: f32, count: usize, rng: &mut StdRng) {
        for i in 0..count {
            let angle = i as f32 / count as f32 * TAU;
            if !self.spawn(world.point_on_ring(radius, angle), rng) {
                break;
            }
        }
    }

    /// Moves every enemy towards `target`, stopping on it rather than overshooting.
    pub fn step_towards(&mut self, target: Point, dt: f32) {
        let positions = Arc::make_mut(&mut self.positions);
        for (position, enemy) in positions.iter_mut().zip(&self.enemies) {
            let offset = Point::new(target.x - position.x, target.y - position.y);
            let distance = offset.length();
            let step = enemy.speed * dt;
            if distance <= step {
                *position = target;
                continue;
            }
            let direction = offset.normalized();
            position.x += direction.x * step;
            position.y += direction.y * step;
        }
    }

    /// Keeps the candidates strictly inside `zap` and applies `damage` to each.
    /// `candidates` come from the broad phase and are consumed. Dead enemies stay in
    /// place until [`Swarm::remove_dead`], so indices from the same tree remain valid.
    pub fn zap(&mut self, zap: &Circle, damage: f32, candidates: &mut Vec<u32>) -> ZapOutcome {
        let total = candidates.len();
        candidates.retain(|&index| zap.contains_point(self.positions[index as usize]));
        for &index in candidates.iter() {
            self.enemies[index as usize].health -= damage;
        }
        let outcome = ZapOutcome {
            candidates: total,
            hits: candidates.len(),
        };
        candidates.clear();
        outcome
    }

    /// Swap-removes every enemy with no health left. Returns how many were removed.
    pub fn remove_dead(&mut self) -> usize {
        let positions = Arc::make_mut(&mut self.positions);
        let mut killed = 0;
        // Back to front: whatever swap_remove moves in was already checked
        for index in (0..self.enemies.len()).rev() {
            if self.enemies[index].health <= 0.0 {
                self.enemies.swap_remove(index);
                positions.swap_remove(index);
                killed += 1;
            }
        }
        killed
    }

    /// Exact hits for `zap` by scanning every enemy.
    pub fn brute_force_hits(&self, zap: &Circle) -> Vec<u32> {
        self.positions
            .iter()
            .enumerate()
            .filter(|(_, position)| zap.contains_point(**position))
            .map(|(index, _)| index as u32)
            .collect()
    }
}
