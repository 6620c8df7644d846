//! Continuous bubble simulation for the aggregate view.
//!
//! Velocities are in pixels per 60 Hz frame; elapsed time is converted to a
//! frame count so the motion speed does not depend on the display rate.

mod collide;
mod quadrant;

use std::collections::HashMap;

use eframe::egui::{Vec2, vec2};
use rand::Rng;
use rand::rngs::StdRng;
use serde::Deserialize;
use tracing::debug;

use super::ticker::Tick;
use super::tier::deserialize_live_radius;
use super::{
    Bubble, Container, Entity, Placements, RadiusProfile, max_magnitude, placements, radius_for,
};
use collide::{CollisionParams, bounce, collide_members};
pub use quadrant::{Quadrant, SizeBucket, quadrant_index, quadrants};

const REFERENCE_FPS: f32 = 60.0;
const REST_SPEED: f32 = 0.02;

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    #[serde(deserialize_with = "deserialize_live_radius")]
    pub radius: RadiusProfile,
    /// Pull toward the quadrant center, per second per pixel of offset.
    pub drift: f32,
    /// Velocity retained per reference frame.
    pub damping: f32,
    /// Share of the reflected velocity kept after a wall contact.
    pub restitution: f32,
    /// Share of the closing speed exchanged when two circles collide.
    pub collision_transfer: f32,
    pub collision_passes: usize,
    pub max_delta_secs: f32,
    pub max_speed: f32,
    pub padding: f32,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            radius: RadiusProfile::LIVE,
            drift: 0.9,
            damping: 0.95,
            restitution: 0.7,
            collision_transfer: 0.5,
            collision_passes: 3,
            max_delta_secs: 0.1,
            max_speed: 14.0,
            padding: 6.0,
        }
    }
}

pub(super) struct LiveBubble {
    pub(super) bubble: Bubble,
    quadrant: usize,
    placed: bool,
}

pub struct LiveField<R = StdRng> {
    config: LiveConfig,
    container: Container,
    quadrants: Option<[Quadrant; 4]>,
    bubbles: Vec<LiveBubble>,
    index_by_id: HashMap<String, usize>,
    members: [Vec<usize>; 4],
    rng: R,
    moving: bool,
}

impl<R: Rng> LiveField<R> {
    pub fn new(config: LiveConfig, container: Container, rng: R) -> Self {
        let quadrants = quadrants(container, config.padding);
        Self {
            config,
            container,
            quadrants,
            bubbles: Vec::new(),
            index_by_id: HashMap::new(),
            members: std::array::from_fn(|_| Vec::new()),
            rng,
            moving: false,
        }
    }

    pub fn config(&self) -> &LiveConfig {
        &self.config
    }

    #[cfg(test)]
    pub fn container(&self) -> Container {
        self.container
    }

    pub fn quadrants(&self) -> Option<&[Quadrant; 4]> {
        self.quadrants.as_ref()
    }

    pub fn len(&self) -> usize {
        self.bubbles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bubbles.is_empty()
    }

    pub fn is_moving(&self) -> bool {
        self.moving
    }

    /// Circles that have been given a position. Circles synced before the
    /// container was measured stay hidden until the next resize.
    pub fn bubbles(&self) -> impl Iterator<Item = &Bubble> {
        self.bubbles
            .iter()
            .filter(|live| live.placed)
            .map(|live| &live.bubble)
    }

    #[cfg(test)]
    pub fn bubble(&self, id: &str) -> Option<&Bubble> {
        self.index_by_id
            .get(id)
            .and_then(|&index| self.bubbles.get(index))
            .filter(|live| live.placed)
            .map(|live| &live.bubble)
    }

    pub fn placements(&self) -> Placements {
        placements(&self.bubbles().cloned().collect::<Vec<_>>())
    }

    /// Merges a refreshed entity set into the running simulation.
    ///
    /// Known ids keep their position and velocity, new ids enter at a random
    /// spot inside their quadrant and ids missing from `entities` are dropped.
    pub fn sync(&mut self, entities: &[Entity]) {
        let max_in_set = max_magnitude(entities);
        let mut prior = std::mem::take(&mut self.bubbles)
            .into_iter()
            .map(|live| (live.bubble.id.clone(), live))
            .collect::<HashMap<_, _>>();

        let mut entered = 0usize;
        let mut next = Vec::with_capacity(entities.len());
        for entity in entities {
            let radius = radius_for(entity.magnitude, entity.tier, max_in_set, &self.config.radius);
            let quadrant = quadrant_index(entity.side, SizeBucket::for_tier(entity.tier));

            if let Some(mut live) = prior.remove(&entity.id) {
                live.bubble.side = entity.side;
                live.bubble.tier = entity.tier;
                live.bubble.magnitude = entity.magnitude;
                live.bubble.radius = radius;
                live.quadrant = quadrant;
                next.push(live);
                continue;
            }

            let mut live = LiveBubble {
                bubble: Bubble {
                    id: entity.id.clone(),
                    side: entity.side,
                    tier: entity.tier,
                    magnitude: entity.magnitude,
                    radius,
                    position: Vec2::ZERO,
                    velocity: Vec2::ZERO,
                },
                quadrant,
                placed: false,
            };
            self.enter(&mut live);
            entered += 1;
            next.push(live);
        }

        let dropped = prior.len();
        self.bubbles = next;
        self.reindex();
        if entered > 0 || dropped > 0 {
            self.moving = true;
        }

        debug!(
            circles = self.bubbles.len(),
            entered, dropped, "synced live field"
        );
    }

    /// Applies a new container size. Placed circles keep their relative spot
    /// inside their quadrant; circles synced while the container was
    /// unmeasured get their entry position here.
    pub fn resize(&mut self, container: Container) {
        if self.container == container {
            return;
        }

        let previous = self.quadrants;
        self.container = container;
        self.quadrants = quadrants(container, self.config.padding);
        let Some(quadrants) = self.quadrants else {
            return;
        };

        let mut bubbles = std::mem::take(&mut self.bubbles);
        for live in &mut bubbles {
            if live.placed {
                let quadrant = &quadrants[live.quadrant];
                let position = match &previous {
                    Some(previous) => previous[live.quadrant].map_to(quadrant, live.bubble.position),
                    None => live.bubble.position,
                };
                live.bubble.position = quadrant.clamp(position, live.bubble.radius);
            } else {
                self.enter(live);
            }
        }
        self.bubbles = bubbles;
        self.moving = true;
    }

    fn enter(&mut self, live: &mut LiveBubble) {
        let Some(quadrants) = self.quadrants else {
            return;
        };

        let (low, high) = quadrants[live.quadrant].center_range(live.bubble.radius);
        let x = if high.x > low.x {
            self.rng.random_range(low.x..=high.x)
        } else {
            low.x
        };
        let y = if high.y > low.y {
            self.rng.random_range(low.y..=high.y)
        } else {
            low.y
        };
        live.bubble.position = vec2(x, y);
        live.bubble.velocity = Vec2::ZERO;
        live.placed = true;
    }

    fn reindex(&mut self) {
        self.index_by_id.clear();
        for members in &mut self.members {
            members.clear();
        }
        for (index, live) in self.bubbles.iter().enumerate() {
            self.index_by_id.insert(live.bubble.id.clone(), index);
            self.members[live.quadrant].push(index);
        }
    }

    /// Advances the simulation by `delta_secs`. Returns whether any circle
    /// is still moving.
    pub fn step(&mut self, delta_secs: f32) -> bool {
        let Some(quadrants) = self.quadrants else {
            return false;
        };
        if self.is_empty() {
            self.moving = false;
            return false;
        }

        let delta = if delta_secs.is_finite() {
            delta_secs.clamp(0.0, self.config.max_delta_secs.max(0.0))
        } else {
            0.0
        };
        if delta <= 0.0 {
            return self.moving;
        }

        let frames = delta * REFERENCE_FPS;
        let damping = self.config.damping.clamp(0.0, 1.0).powf(frames);
        let restitution = self.config.restitution.clamp(0.0, 1.0);
        let drift = self.config.drift.max(0.0) * delta;
        let max_speed = self.config.max_speed.max(0.0);
        let max_speed_sq = max_speed * max_speed;

        for live in &mut self.bubbles {
            if !live.placed {
                continue;
            }
            let quadrant = &quadrants[live.quadrant];
            let pull = (quadrant.center() - live.bubble.position) * drift;

            let mut velocity = (live.bubble.velocity + pull) * damping;
            let speed_sq = velocity.length_sq();
            if speed_sq > max_speed_sq && speed_sq > 0.0 {
                velocity *= max_speed / speed_sq.sqrt();
            }
            live.bubble.velocity = velocity;
            live.bubble.position += velocity * frames;

            let (low, high) = quadrant.center_range(live.bubble.radius);
            bounce(live, low, high, restitution);
        }

        let params = CollisionParams {
            transfer: self.config.collision_transfer.clamp(0.0, 1.0),
        };
        for _ in 0..self.config.collision_passes.max(1) {
            let mut max_overlap = 0.0_f32;
            for members in &self.members {
                max_overlap = max_overlap.max(collide_members(&mut self.bubbles, members, params));
            }
            if max_overlap <= 1e-3 {
                break;
            }
        }

        let mut moving = false;
        for live in &mut self.bubbles {
            if !live.placed {
                continue;
            }
            let quadrant = &quadrants[live.quadrant];
            live.bubble.position = quadrant.clamp(live.bubble.position, live.bubble.radius);
            if live.bubble.velocity.length_sq() > REST_SPEED * REST_SPEED {
                moving = true;
            }
        }

        self.moving = moving;
        moving
    }
}

impl<R: Rng> Tick for LiveField<R> {
    fn on_tick(&mut self, elapsed_secs: f32) -> bool {
        self.step(elapsed_secs)
    }
}
