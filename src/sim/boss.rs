//! Boss: a chain of phase scripts
//!
//! Entry (fly in, invincible) -> Combat (movement + shooting children) ->
//! Death (award score). Each phase hands the next one back as its terminal
//! value and `drive_handoff` installs it on the same boss.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;

use super::clock::{TimeSource, VirtualClock};
use super::collision::{Collidable, HitResult, Rect, Team, resolve_projectile_hits};
use super::pool::{EntityPool, Life, Pooled, Updatable};
use super::projectile::{Projectile, ProjectileSpawn};
use super::script::{CoroutineScript, Drive, Handoff, Script, Step, drive_handoff};
use super::tick::TickCtx;
use crate::consts::{
    BOSS_HEALTH, BOSS_HIT_SCORE, BOSS_SCORE, BOSS_SIZE, BOSS_SPEED, PROJECTILE_SPEED, REFERENCE_FPS,
};
use crate::error::SimResult;
use crate::{lerp, quad_ease_out, smoothstep, vec2};

/// Fly-in duration (seconds)
const ENTRY_TIME: f64 = 2.0;
/// Gap between the arena top and the boss once it has entered
const ENTRY_MARGIN: f32 = 20.0;
/// Time to reach full speed after entering (seconds)
const SPEED_RAMP: f64 = 0.3;
const DODGE_COOLDOWN: f64 = 0.5;
/// Reference frames simulated when predicting a projectile contact
const DODGE_LOOKAHEAD: usize = 100;
/// Projectiles further than this vertically are never dodged
const DODGE_VERTICAL_RANGE: f32 = 200.0;
const MIN_SHOT_COOLDOWN: f64 = 0.25;
const INITIAL_AGGRO: f32 = 90.0;
/// Side shots of a shotgun burst (degrees)
const SHOTGUN_SPREAD: f32 = 20.0;
/// Shotgun side shots home in on players this close
const SHOTGUN_HOMING_RANGE: f32 = 300.0;
/// Radians per second
const SHOTGUN_TURN_RATE: f32 = 1.5;

/// Boss state shared by every phase script
#[derive(Debug, Clone, Default)]
pub struct BossBody {
    /// Center position
    pub position: Vec2,
    pub size: Vec2,
    pub health: f32,
    pub max_health: f32,
    pub invincible: bool,
}

impl BossBody {
    pub fn hitbox(&self) -> Rect {
        Rect::from_center(self.position, self.size)
    }

    /// A downward enemy shot from under the hull, rotated by `angle` degrees
    fn shot(&self, angle: f32) -> ProjectileSpawn {
        let muzzle = self.position + Vec2::new(0.0, self.size.y * 0.5 + 10.0);
        let velocity = Vec2::from_angle(angle.to_radians()).rotate(Vec2::new(0.0, PROJECTILE_SPEED));
        ProjectileSpawn::normal(muzzle, velocity, Team::Enemy)
    }

    /// Fire one straight shot, plus two homing side shots for a shotgun.
    /// Returns the number of projectiles spawned.
    fn fire_burst(&self, projectiles: &mut EntityPool<Projectile>, shotgun: bool) -> SimResult<u32> {
        projectiles.spawn(self.shot(0.0))?;
        if !shotgun {
            return Ok(1);
        }
        for angle in [-SHOTGUN_SPREAD, SHOTGUN_SPREAD] {
            projectiles.spawn(
                self.shot(angle)
                    .homing(SHOTGUN_HOMING_RANGE, SHOTGUN_TURN_RATE),
            )?;
        }
        Ok(3)
    }
}

/// What a boss phase script may touch
pub struct BossCtx<'a> {
    pub body: &'a mut BossBody,
    pub projectiles: &'a mut EntityPool<Projectile>,
    pub rng: &'a mut Pcg32,
    pub time: &'a TimeSource,
    pub bounds: Rect,
    pub player_pos: Option<Vec2>,
    pub score: &'a mut u64,
}

#[derive(Debug)]
pub enum BossPhase {
    Entry(Entry),
    Combat(Combat),
    Death(Death),
}

impl BossPhase {
    pub fn name(&self) -> &'static str {
        match self {
            BossPhase::Entry(_) => "entry",
            BossPhase::Combat(_) => "combat",
            BossPhase::Death(_) => "death",
        }
    }
}

impl Script for BossPhase {
    type Ctx<'a> = BossCtx<'a>;
    type Input = f32;
    type Output = Handoff<BossPhase>;

    fn resume(
        &mut self,
        ctx: &mut BossCtx<'_>,
        input: Option<f32>,
    ) -> SimResult<Step<Handoff<BossPhase>>> {
        match self {
            BossPhase::Entry(entry) => entry.resume(ctx),
            BossPhase::Combat(combat) => combat.resume(ctx, input),
            BossPhase::Death(death) => death.resume(ctx),
        }
    }
}

/// Glide from the spawn point to the top of the arena
#[derive(Debug, Default)]
pub struct Entry {
    start: Vec2,
    target: Vec2,
    clock: Option<VirtualClock>,
}

impl Entry {
    fn resume(&mut self, ctx: &mut BossCtx<'_>) -> SimResult<Step<Handoff<BossPhase>>> {
        let Some(clock) = &self.clock else {
            self.start = ctx.body.position;
            self.target = Vec2::new(
                ctx.bounds.center().x,
                ctx.bounds.top() + ENTRY_MARGIN + ctx.body.size.y * 0.5,
            );
            self.clock = Some(VirtualClock::new(ENTRY_TIME, ctx.time.clone()));
            ctx.body.invincible = true;
            return Ok(Step::Suspend);
        };
        if clock.isover() {
            ctx.body.position = self.target;
            ctx.body.invincible = false;
            return Ok(Step::Complete(Handoff::Chain(BossPhase::Combat(Combat::new()))));
        }
        ctx.body.position = self.start.lerp(self.target, smoothstep(clock.progress()));
        Ok(Step::Suspend)
    }
}

/// Movement and shooting side by side until health runs out
#[derive(Debug)]
pub struct Combat {
    movement: CoroutineScript<Movement>,
    shooting: CoroutineScript<Shooting>,
}

impl Combat {
    fn new() -> Self {
        Self {
            movement: CoroutineScript::new(Movement::default()),
            shooting: CoroutineScript::new(Shooting::default()),
        }
    }

    pub fn movement(&self) -> &Movement {
        self.movement.body()
    }

    pub fn shooting(&self) -> &Shooting {
        self.shooting.body()
    }

    fn resume(
        &mut self,
        ctx: &mut BossCtx<'_>,
        input: Option<f32>,
    ) -> SimResult<Step<Handoff<BossPhase>>> {
        if !self.movement.is_initialized() {
            self.movement.initialize(ctx)?;
            self.shooting.initialize(ctx)?;
            return Ok(Step::Suspend);
        }
        if ctx.body.health <= 0.0 {
            ctx.body.invincible = true;
            return Ok(Step::Complete(Handoff::Chain(BossPhase::Death(Death::default()))));
        }
        self.movement.step(ctx, input)?;
        self.shooting.step(ctx, input)?;
        Ok(Step::Suspend)
    }
}

/// Award the kill once the death beat has played
#[derive(Debug, Default)]
pub struct Death {
    primed: bool,
}

impl Death {
    fn resume(&mut self, ctx: &mut BossCtx<'_>) -> SimResult<Step<Handoff<BossPhase>>> {
        if !self.primed {
            self.primed = true;
            return Ok(Step::Suspend);
        }
        *ctx.score += BOSS_SCORE;
        log::info!("boss destroyed at {:?}", ctx.body.position);
        Ok(Step::Complete(Handoff::Finish))
    }
}

/// Side to side sweep that ramps up to speed and dodges incoming fire
#[derive(Debug)]
pub struct Movement {
    direction: f32,
    ramp: Option<VirtualClock>,
    dodge_cooldown: Option<VirtualClock>,
}

impl Default for Movement {
    fn default() -> Self {
        Self {
            direction: 1.0,
            ramp: None,
            dodge_cooldown: None,
        }
    }
}

impl Movement {
    pub fn direction(&self) -> f32 {
        self.direction
    }
}

/// Step both rectangles forward one reference frame at a time and report
/// whether they meet before either leaves the arena
fn predict_contact(unit: Rect, unit_step: Vec2, projectile: &Projectile, bounds: Rect) -> bool {
    if (unit.center().y - projectile.position.y).abs() > DODGE_VERTICAL_RANGE {
        return false;
    }
    let projectile_step = projectile.velocity / REFERENCE_FPS;
    let mut unit_center = unit.center();
    let mut projectile_center = projectile.position;
    for _ in 0..DODGE_LOOKAHEAD {
        unit_center += unit_step;
        projectile_center += projectile_step;
        let unit_rect = Rect::from_center(unit_center, unit.size());
        if Rect::from_center(projectile_center, projectile.size).overlaps(&unit_rect) {
            return true;
        }
        if !(bounds.contains(unit_center) && bounds.contains(projectile_center)) {
            break;
        }
    }
    false
}

impl Script for Movement {
    type Ctx<'a> = BossCtx<'a>;
    type Input = f32;
    type Output = ();

    fn resume(&mut self, ctx: &mut BossCtx<'_>, input: Option<f32>) -> SimResult<Step<()>> {
        if self.ramp.is_none() {
            self.ramp = Some(VirtualClock::unbounded(ctx.time.clone()));
            self.dodge_cooldown = Some(VirtualClock::new(DODGE_COOLDOWN, ctx.time.clone()));
            return Ok(Step::Suspend);
        }
        let (Some(ramp), Some(dodge_cooldown)) = (&self.ramp, &self.dodge_cooldown) else {
            return Ok(Step::Suspend);
        };
        let delta = input.unwrap_or(0.0);
        let bounds = ctx.bounds;
        let body = &mut *ctx.body;

        let ramp_progress = (ramp.get_time() / SPEED_RAMP) as f32;
        let speed = lerp(0.0, BOSS_SPEED, quad_ease_out(ramp_progress));
        body.position.x += self.direction * speed * delta;
        let half_width = body.size.x * 0.5;
        if body.hitbox().right() > bounds.right() {
            body.position.x = bounds.right() - half_width;
            self.direction = -1.0;
        }
        if body.hitbox().left() < bounds.left() {
            body.position.x = bounds.left() + half_width;
            self.direction = 1.0;
        }

        let hitbox = body.hitbox();
        let margin = (hitbox.left() - bounds.left()).min(bounds.right() - hitbox.right());
        if margin <= 50.0 || !dodge_cooldown.isover() {
            return Ok(Step::Suspend);
        }
        let unit_step = Vec2::new(self.direction * BOSS_SPEED / REFERENCE_FPS, 0.0);
        let threatened = ctx.projectiles.iter_live().any(|(_, p)| {
            p.team.hostile_to(Team::Enemy) && predict_contact(hitbox, unit_step, p, bounds)
        });
        if threatened {
            dodge_cooldown.set_duration(if margin > 200.0 { 0.5 } else { 1.0 }, true);
            let luck = if margin < 100.0 { 5 } else { 8 };
            if ctx.rng.random_range(1..=10) <= luck {
                self.direction = -self.direction;
                log::trace!("boss dodged (margin {margin:.0})");
            }
        }
        Ok(Step::Suspend)
    }
}

/// Builds aggro (faster when the player is lined up underneath) and fires
/// once enough has accumulated
#[derive(Debug)]
pub struct Shooting {
    aggro: f32,
    aggro_required: f32,
    cooldown: Option<VirtualClock>,
    shots_fired: u32,
}

impl Default for Shooting {
    fn default() -> Self {
        Self {
            aggro: 0.0,
            aggro_required: INITIAL_AGGRO,
            cooldown: None,
            shots_fired: 0,
        }
    }
}

impl Shooting {
    pub fn shots_fired(&self) -> u32 {
        self.shots_fired
    }
}

/// Aggro multiplier by horizontal distance to the player
fn proximity_buff(x_offset: f32) -> f32 {
    if x_offset < 16.0 {
        8.0
    } else if x_offset < 50.0 {
        4.0
    } else if x_offset < 100.0 {
        2.0
    } else if x_offset < 150.0 {
        1.0
    } else {
        0.5
    }
}

impl Script for Shooting {
    type Ctx<'a> = BossCtx<'a>;
    type Input = f32;
    type Output = ();

    fn resume(&mut self, ctx: &mut BossCtx<'_>, input: Option<f32>) -> SimResult<Step<()>> {
        let Some(cooldown) = &self.cooldown else {
            self.cooldown = Some(VirtualClock::new(MIN_SHOT_COOLDOWN, ctx.time.clone()));
            return Ok(Step::Suspend);
        };
        let delta = input.unwrap_or(0.0);
        let x_offset = ctx
            .player_pos
            .map_or(f32::INFINITY, |p| (ctx.body.position.x - p.x).abs());
        self.aggro += delta * REFERENCE_FPS * proximity_buff(x_offset);
        if !(cooldown.isover() && self.aggro >= self.aggro_required) {
            return Ok(Step::Suspend);
        }

        let shotgun = ctx.rng.random_range(1..=4) <= 1;
        self.shots_fired += ctx.body.fire_burst(ctx.projectiles, shotgun)?;
        cooldown.restart();
        self.aggro = 0.0;
        self.aggro_required = if shotgun {
            ctx.rng.random_range(60.0..120.0)
        } else {
            ctx.rng.random_range(40.0..80.0)
        };
        Ok(Step::Suspend)
    }
}

#[derive(Debug, Default)]
pub struct Boss {
    pub body: BossBody,
    control: Option<CoroutineScript<BossPhase>>,
}

impl Pooled for Boss {
    const KIND: &'static str = "boss";
    /// Center position (usually just above the arena)
    type Args = Vec2;

    fn reset(&mut self, position: Vec2) {
        *self = Self {
            body: BossBody {
                position,
                size: vec2(BOSS_SIZE),
                health: BOSS_HEALTH,
                max_health: BOSS_HEALTH,
                invincible: false,
            },
            control: Some(CoroutineScript::new(BossPhase::Entry(Entry::default()))),
        };
    }
}

impl Boss {
    /// The phase currently running, `None` once the chain has finished
    pub fn phase(&self) -> Option<&BossPhase> {
        self.control.as_ref().map(CoroutineScript::body)
    }
}

impl Collidable for Boss {
    fn hitbox(&self) -> Rect {
        self.body.hitbox()
    }

    fn team(&self) -> Team {
        Team::Enemy
    }

    fn when_hit(&mut self, projectile: &Projectile) -> HitResult {
        if self.body.invincible {
            return HitResult::Absorbed;
        }
        self.body.health -= projectile.damage;
        log::debug!("boss took {:.2} damage ({:.2} left)", projectile.damage, self.body.health);
        HitResult::Damaged
    }
}

impl<'w> Updatable<TickCtx<'w>> for Boss {
    fn update(&mut self, life: &mut Life, delta: f32, ctx: &mut TickCtx<'w>) -> SimResult<()> {
        let mut phase_ctx = BossCtx {
            body: &mut self.body,
            projectiles: &mut *ctx.projectiles,
            rng: &mut *ctx.rng,
            time: ctx.time,
            bounds: ctx.bounds,
            player_pos: ctx.player_pos,
            score: &mut *ctx.score,
        };
        match drive_handoff(&mut self.control, &mut phase_ctx, Some(delta))? {
            Drive::Running => {}
            Drive::Chained => {
                if let Some(phase) = self.phase() {
                    log::info!("boss phase: {}", phase.name());
                }
            }
            Drive::Finished => {
                life.kill_safe();
                return Ok(());
            }
        }

        let report = resolve_projectile_hits(self, life, &mut *ctx.projectiles);
        *ctx.score += BOSS_HIT_SCORE * report.damaging as u64;
        Ok(())
    }
}
