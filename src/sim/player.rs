//! The player ship
//!
//! Horizontal thrust with friction, a fire-rate cooldown, and a short
//! invulnerability window after every hit (also granted on spawn).

use glam::Vec2;

use super::clock::{TimeSource, VirtualClock};
use super::collision::{Collidable, HitResult, Rect, Team, resolve_projectile_hits};
use super::pool::{EntityPool, Life, Pooled, Updatable};
use super::projectile::{Projectile, ProjectileSpawn};
use super::script::{CoroutineScript, Script, Step};
use super::tick::TickCtx;
use crate::consts::{
    PLAYER_ACCEL, PLAYER_ANIM_CYCLE, PLAYER_ANIM_FRAMES, PLAYER_FRICTION, PLAYER_HEALTH,
    PLAYER_INVULNERABILITY, PLAYER_MAX_SPEED, PLAYER_MIN_SPEED, PLAYER_SIZE, PROJECTILE_SPEED,
    REFERENCE_FPS,
};
use crate::error::SimResult;
use crate::vec2;

#[derive(Debug, Clone, Default)]
pub struct PlayerBody {
    /// Center position
    pub position: Vec2,
    pub velocity: Vec2,
    pub size: Vec2,
    pub health: f32,
    /// Current animation frame
    pub frame: usize,
}

impl PlayerBody {
    pub fn hitbox(&self) -> Rect {
        Rect::from_center(self.position, self.size)
    }
}

/// Spawn arguments for the player
#[derive(Debug, Clone)]
pub struct PlayerSpawn {
    /// Center position
    pub position: Vec2,
    /// Game clock the player's cooldowns run on
    pub time: TimeSource,
    /// Seconds between shots
    pub fire_cooldown: f64,
}

pub struct AnimationCtx<'a> {
    pub frame: &'a mut usize,
    pub time: &'a TimeSource,
}

/// Cycles through the sprite frames, one full cycle every `cycle` seconds
#[derive(Debug)]
pub struct Animation {
    cycle: f64,
    clock: Option<VirtualClock>,
}

impl Animation {
    pub fn new(cycle: f64) -> Self {
        Self { cycle, clock: None }
    }
}

impl Script for Animation {
    type Ctx<'a> = AnimationCtx<'a>;
    type Input = ();
    type Output = ();

    fn resume(&mut self, ctx: &mut AnimationCtx<'_>, _input: Option<()>) -> SimResult<Step<()>> {
        let Some(clock) = &self.clock else {
            self.clock = Some(VirtualClock::unbounded(ctx.time.clone()));
            *ctx.frame = 0;
            return Ok(Step::Suspend);
        };
        let frames = PLAYER_ANIM_FRAMES as f64;
        let index = ((clock.get_time() * frames) / self.cycle).floor() as usize % PLAYER_ANIM_FRAMES;
        *ctx.frame = index;
        Ok(Step::Suspend)
    }
}

#[derive(Debug, Default)]
pub struct Player {
    pub body: PlayerBody,
    animation: Option<CoroutineScript<Animation>>,
    fire_cooldown: Option<VirtualClock>,
    invulnerability: Option<VirtualClock>,
}

impl Pooled for Player {
    const KIND: &'static str = "player";
    type Args = PlayerSpawn;

    fn reset(&mut self, args: PlayerSpawn) {
        *self = Self {
            body: PlayerBody {
                position: args.position,
                velocity: Vec2::ZERO,
                size: vec2(PLAYER_SIZE),
                health: PLAYER_HEALTH,
                frame: 0,
            },
            animation: Some(CoroutineScript::new(Animation::new(PLAYER_ANIM_CYCLE))),
            fire_cooldown: Some(VirtualClock::new(args.fire_cooldown, args.time.clone())),
            invulnerability: Some(VirtualClock::new(PLAYER_INVULNERABILITY, args.time)),
        };
    }
}

impl Player {
    pub fn is_invulnerable(&self) -> bool {
        self.invulnerability.as_ref().is_some_and(|clock| !clock.isover())
    }

    /// Thrust along `axis` (-1 left, 1 right) with friction split into two
    /// half steps around the position update
    fn integrate(&mut self, axis: f32, delta: f32, bounds: Rect) {
        let body = &mut self.body;
        let accel = Vec2::new(axis.clamp(-1.0, 1.0) * PLAYER_ACCEL, 0.0);
        let half_friction = (1.0 - PLAYER_FRICTION).powf(delta * REFERENCE_FPS * 0.5);

        body.velocity *= half_friction;
        body.velocity += accel * 0.5 * delta;
        body.position += body.velocity * delta;
        body.velocity += accel * 0.5 * delta;
        body.velocity *= half_friction;

        let speed = body.velocity.length();
        if speed < PLAYER_MIN_SPEED {
            body.velocity = Vec2::ZERO;
        } else if speed > PLAYER_MAX_SPEED {
            body.velocity = body.velocity.clamp_length_max(PLAYER_MAX_SPEED);
        }

        // Keep on screen; walls also stop horizontal motion into them
        let half = body.size * 0.5;
        if body.position.x + half.x > bounds.right() {
            body.position.x = bounds.right() - half.x;
            body.velocity.x = body.velocity.x.min(0.0);
        }
        if body.position.x - half.x < bounds.left() {
            body.position.x = bounds.left() + half.x;
            body.velocity.x = body.velocity.x.max(0.0);
        }
        body.position.y = body
            .position
            .y
            .clamp(bounds.top() + half.y, bounds.bottom() - half.y);
    }

    fn try_fire(&mut self, projectiles: &mut EntityPool<Projectile>) -> SimResult<bool> {
        let Some(cooldown) = &self.fire_cooldown else {
            return Ok(false);
        };
        if !cooldown.isover() {
            return Ok(false);
        }
        let muzzle = self.body.position - Vec2::new(0.0, self.body.size.y * 0.5);
        projectiles.spawn(ProjectileSpawn::normal(
            muzzle,
            Vec2::new(0.0, -PROJECTILE_SPEED),
            Team::Allied,
        ))?;
        cooldown.restart();
        Ok(true)
    }
}

impl Collidable for Player {
    fn hitbox(&self) -> Rect {
        self.body.hitbox()
    }

    fn team(&self) -> Team {
        Team::Allied
    }

    fn when_hit(&mut self, projectile: &Projectile) -> HitResult {
        if self.is_invulnerable() {
            return HitResult::Absorbed;
        }
        self.body.health -= projectile.damage;
        if let Some(clock) = &self.invulnerability {
            clock.restart();
        }
        if self.body.health <= 0.0 {
            HitResult::Killed
        } else {
            HitResult::Damaged
        }
    }
}

impl<'w> Updatable<TickCtx<'w>> for Player {
    fn update(&mut self, life: &mut Life, delta: f32, ctx: &mut TickCtx<'w>) -> SimResult<()> {
        if let Some(animation) = self.animation.as_mut() {
            let mut animation_ctx = AnimationCtx {
                frame: &mut self.body.frame,
                time: ctx.time,
            };
            animation.step(&mut animation_ctx, Some(()))?;
        }

        self.integrate(ctx.input.move_axis, delta, ctx.bounds);
        if ctx.input.fire {
            self.try_fire(&mut *ctx.projectiles)?;
        }

        let report = resolve_projectile_hits(self, life, &mut *ctx.projectiles);
        if report.damaging > 0 {
            log::info!("player hit, {:.0} health left", self.body.health);
        }
        if report.killed {
            log::info!("player destroyed");
        }
        Ok(())
    }
}
