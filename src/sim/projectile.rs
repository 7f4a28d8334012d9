//! Projectiles
//!
//! Integration splits acceleration and drag into two half-steps around the
//! position update. Homing projectiles steer in each half-step toward the
//! nearest hostile target within range.

use glam::Vec2;

use super::collision::{Rect, Team};
use super::pool::{Life, Pooled, Updatable};
use crate::consts::{PROJECTILE_SIZE, REFERENCE_FPS};
use crate::error::SimResult;
use crate::vec2;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ProjectileKind {
    #[default]
    Normal,
    /// Turns toward the nearest hostile target within `range` pixels, at most
    /// `turn_rate` radians per second
    Homing { range: f32, turn_rate: f32 },
}

#[derive(Debug, Clone, Default)]
pub struct Projectile {
    /// Center position
    pub position: Vec2,
    pub velocity: Vec2,
    pub acceleration: Vec2,
    /// Fraction of velocity lost per reference frame
    pub drag: f32,
    pub size: Vec2,
    pub team: Team,
    pub damage: f32,
    pub kind: ProjectileKind,
    /// Off-screen projectiles are only culled once they have been visible
    pub was_onscreen_once: bool,
}

/// Spawn arguments for a projectile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectileSpawn {
    pub position: Vec2,
    pub velocity: Vec2,
    pub acceleration: Vec2,
    pub drag: f32,
    pub size: Vec2,
    pub team: Team,
    pub damage: f32,
    pub kind: ProjectileKind,
}

impl ProjectileSpawn {
    pub fn normal(position: Vec2, velocity: Vec2, team: Team) -> Self {
        Self {
            position,
            velocity,
            acceleration: Vec2::ZERO,
            drag: 0.0,
            size: vec2(PROJECTILE_SIZE),
            team,
            damage: 1.0,
            kind: ProjectileKind::Normal,
        }
    }

    pub fn homing(mut self, range: f32, turn_rate: f32) -> Self {
        self.kind = ProjectileKind::Homing { range, turn_rate };
        self
    }

    pub fn with_damage(mut self, damage: f32) -> Self {
        self.damage = damage;
        self
    }

    pub fn with_drag(mut self, drag: f32) -> Self {
        self.drag = drag.clamp(0.0, 1.0);
        self
    }

    pub fn with_acceleration(mut self, acceleration: Vec2) -> Self {
        self.acceleration = acceleration;
        self
    }
}

impl Pooled for Projectile {
    const KIND: &'static str = "projectile";
    type Args = ProjectileSpawn;

    fn reset(&mut self, args: ProjectileSpawn) {
        *self = Self {
            position: args.position,
            velocity: args.velocity,
            acceleration: args.acceleration,
            drag: args.drag,
            size: args.size,
            team: args.team,
            damage: args.damage,
            kind: args.kind,
            was_onscreen_once: false,
        };
    }
}

/// Per-tick snapshot of what projectiles can home in on
#[derive(Debug, Clone, Default)]
pub struct ProjectileCtx {
    pub bounds: Rect,
    /// Centers of live players
    pub allied_targets: Vec<Vec2>,
    /// Centers of live enemies and bosses
    pub enemy_targets: Vec<Vec2>,
}

impl ProjectileCtx {
    /// Positions a projectile of `team` may home in on
    pub fn targets_for(&self, team: Team) -> impl Iterator<Item = Vec2> + '_ {
        let none: &[Vec2] = &[];
        let (allied, enemy) = match team {
            Team::Pacifist => (none, none),
            Team::Ffa => (self.allied_targets.as_slice(), self.enemy_targets.as_slice()),
            Team::Allied => (none, self.enemy_targets.as_slice()),
            Team::Enemy => (self.allied_targets.as_slice(), none),
        };
        allied.iter().chain(enemy).copied()
    }
}

impl Projectile {
    pub fn hitbox(&self) -> Rect {
        Rect::from_center(self.position, self.size)
    }

    /// Nearest target within homing range, if any
    fn homing_target(&self, range: f32, ctx: &ProjectileCtx) -> Option<Vec2> {
        ctx.targets_for(self.team)
            .map(|target| (target, target.distance(self.position)))
            .filter(|&(_, distance)| distance <= range)
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(target, _)| target)
    }

    fn steer(&mut self, dt: f32, ctx: &ProjectileCtx) {
        let ProjectileKind::Homing { range, turn_rate } = self.kind else {
            return;
        };
        if self.velocity == Vec2::ZERO {
            return;
        }
        let Some(target) = self.homing_target(range, ctx) else {
            return;
        };
        let to_rotate = self.velocity.angle_to(target - self.position);
        let max_turn = turn_rate * dt;
        let turn = to_rotate.clamp(-max_turn, max_turn);
        self.velocity = Vec2::from_angle(turn).rotate(self.velocity);
    }
}

impl Updatable<ProjectileCtx> for Projectile {
    fn update(&mut self, life: &mut Life, delta: f32, ctx: &mut ProjectileCtx) -> SimResult<()> {
        let half_drag = (1.0 - self.drag).powf(delta * REFERENCE_FPS * 0.5);
        let half_dt = delta * 0.5;

        self.velocity *= half_drag;
        self.steer(half_dt, ctx);
        self.velocity += self.acceleration * half_dt;
        self.position += self.velocity * delta;
        self.steer(half_dt, ctx);
        self.velocity += self.acceleration * half_dt;
        self.velocity *= half_drag;

        if self.hitbox().overlaps(&ctx.bounds) {
            self.was_onscreen_once = true;
        } else if self.was_onscreen_once {
            life.kill_safe();
        }
        Ok(())
    }
}
