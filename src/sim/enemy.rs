//! Basic enemies: patrol back and forth, die to allied fire

use glam::Vec2;

use super::collision::{Collidable, HitResult, Rect, Team, resolve_projectile_hits};
use super::pool::{Life, Pooled, Updatable};
use super::projectile::Projectile;
use super::script::{CoroutineScript, Script, Step};
use super::tick::TickCtx;
use crate::consts::{ENEMY_HEALTH, ENEMY_SCORE, ENEMY_SIZE, ENEMY_SPEED};
use crate::error::SimResult;
use crate::vec2;

/// Enemy state the patrol script moves around
#[derive(Debug, Clone, Default)]
pub struct EnemyBody {
    /// Center position
    pub position: Vec2,
    pub size: Vec2,
    pub health: f32,
    /// Patrol speed (pixels/s)
    pub speed: f32,
}

impl EnemyBody {
    pub fn hitbox(&self) -> Rect {
        Rect::from_center(self.position, self.size)
    }
}

pub struct PatrolCtx<'a> {
    pub body: &'a mut EnemyBody,
    pub bounds: Rect,
}

/// Horizontal patrol, bouncing off the arena walls
#[derive(Debug, Clone)]
pub struct Patrol {
    direction: f32,
}

impl Patrol {
    pub fn new() -> Self {
        Self { direction: 1.0 }
    }

    pub fn direction(&self) -> f32 {
        self.direction
    }
}

impl Default for Patrol {
    fn default() -> Self {
        Self::new()
    }
}

impl Script for Patrol {
    type Ctx<'a> = PatrolCtx<'a>;
    type Input = f32;
    type Output = ();

    fn resume(&mut self, ctx: &mut PatrolCtx<'_>, input: Option<f32>) -> SimResult<Step<()>> {
        let Some(delta) = input else {
            return Ok(Step::Suspend);
        };
        let body = &mut *ctx.body;
        body.position.x += self.direction * body.speed * delta;
        let half_width = body.size.x * 0.5;
        if body.hitbox().right() > ctx.bounds.right() {
            body.position.x = ctx.bounds.right() - half_width;
            self.direction = -1.0;
        }
        if body.hitbox().left() < ctx.bounds.left() {
            body.position.x = ctx.bounds.left() + half_width;
            self.direction = 1.0;
        }
        Ok(Step::Suspend)
    }
}

#[derive(Debug, Default)]
pub struct Enemy {
    pub body: EnemyBody,
    patrol: Option<CoroutineScript<Patrol>>,
}

impl Pooled for Enemy {
    const KIND: &'static str = "enemy";
    /// Center position
    type Args = Vec2;

    fn reset(&mut self, position: Vec2) {
        *self = Self {
            body: EnemyBody {
                position,
                size: vec2(ENEMY_SIZE),
                health: ENEMY_HEALTH,
                speed: ENEMY_SPEED,
            },
            patrol: Some(CoroutineScript::new(Patrol::new())),
        };
    }
}

impl Enemy {
    pub fn patrol(&self) -> Option<&CoroutineScript<Patrol>> {
        self.patrol.as_ref()
    }
}

impl Collidable for Enemy {
    fn hitbox(&self) -> Rect {
        self.body.hitbox()
    }

    fn team(&self) -> Team {
        Team::Enemy
    }

    fn when_hit(&mut self, projectile: &Projectile) -> HitResult {
        self.body.health -= projectile.damage;
        if self.body.health <= 0.0 {
            HitResult::Killed
        } else {
            HitResult::Damaged
        }
    }
}

impl<'w> Updatable<TickCtx<'w>> for Enemy {
    fn update(&mut self, life: &mut Life, delta: f32, ctx: &mut TickCtx<'w>) -> SimResult<()> {
        if let Some(patrol) = self.patrol.as_mut() {
            let mut patrol_ctx = PatrolCtx {
                body: &mut self.body,
                bounds: ctx.bounds,
            };
            patrol.step(&mut patrol_ctx, Some(delta))?;
        }

        let report = resolve_projectile_hits(self, life, &mut *ctx.projectiles);
        if report.killed {
            *ctx.score += ENEMY_SCORE;
            log::debug!("enemy destroyed at {:?}", self.body.position);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::pool::EntityPool;
    use crate::sim::projectile::ProjectileSpawn;
    use crate::sim::tick::fixture::TickFixture;

    #[test]
    fn test_patrol_bounces_off_walls() {
        let mut fx = TickFixture::new();
        let right = fx.config.arena().right();
        let mut pool = EntityPool::<Enemy>::new(1);
        let enemy = pool.spawn(Vec2::new(right - 40.0, 100.0)).unwrap();

        // First frame only primes the patrol
        fx.step(&mut pool, 0.1).unwrap();
        assert_eq!(pool.get(enemy).unwrap().body.position.x, right - 40.0);
        assert!(pool.get(enemy).unwrap().patrol().unwrap().is_initialized());

        fx.step(&mut pool, 0.1).unwrap();
        let e = pool.get(enemy).unwrap();
        assert_eq!(e.body.hitbox().right(), right);
        assert_eq!(e.patrol().unwrap().body().direction(), -1.0);

        fx.step(&mut pool, 0.1).unwrap();
        assert!(pool.get(enemy).unwrap().body.position.x < right - 24.0);
    }

    #[test]
    fn test_dies_to_allied_fire_and_scores() {
        let mut fx = TickFixture::new();
        let mut pool = EntityPool::<Enemy>::new(2);
        let at = Vec2::new(300.0, 100.0);
        let enemy = pool.spawn(at).unwrap();
        for _ in 0..3 {
            fx.projectiles
                .spawn(ProjectileSpawn::normal(at, Vec2::ZERO, Team::Allied))
                .unwrap();
        }
        let friendly = fx
            .projectiles
            .spawn(ProjectileSpawn::normal(at, Vec2::ZERO, Team::Enemy))
            .unwrap();

        fx.step(&mut pool, 0.0).unwrap();
        assert!(pool.get(enemy).is_none());
        assert_eq!(pool.inactive_len(), 2);
        assert_eq!(fx.score, ENEMY_SCORE);
        assert_eq!(fx.projectiles.live_len(), 1);
        assert!(fx.projectiles.is_alive(friendly));
    }

    #[test]
    fn test_survives_partial_damage() {
        let mut fx = TickFixture::new();
        let mut pool = EntityPool::<Enemy>::new(1);
        let at = Vec2::new(300.0, 100.0);
        let enemy = pool.spawn(at).unwrap();
        fx.projectiles
            .spawn(ProjectileSpawn::normal(at, Vec2::ZERO, Team::Ffa).with_damage(2.0))
            .unwrap();

        fx.step(&mut pool, 0.0).unwrap();
        assert_eq!(pool.get(enemy).unwrap().body.health, ENEMY_HEALTH - 2.0);
        assert_eq!(fx.score, 0);
    }
}
