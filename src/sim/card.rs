//! Upgrade cards
//!
//! A card slides in, waits to be shot by the player, then either drops out of
//! view (picked) or retreats upward (dismissed or timed out). Each transition
//! is its own script, chained with `Handoff`.

use glam::Vec2;

use super::clock::{TimeSource, VirtualClock};
use super::collision::{Collidable, HitResult, Rect, Team, resolve_projectile_hits};
use super::pool::{Life, Pooled, Updatable};
use super::projectile::Projectile;
use super::script::{CoroutineScript, Drive, Handoff, Script, Step, drive_handoff};
use super::tick::TickCtx;
use crate::consts::CARD_SIZE;
use crate::error::SimResult;
use crate::{lerp, quad_ease_in, quad_ease_out, smoothstep, vec2};

/// Cards start with their bottom edge this far above the arena
const OFFSCREEN_MARGIN: f32 = 200.0;
/// A waiting card leaves on its own after this long (seconds)
const WAIT_TIMEOUT: f64 = 10.0;

/// What a card grants when picked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Upgrade {
    #[default]
    FireRate,
    Damage,
    Repair,
}

impl Upgrade {
    /// The standard shop, left to right
    pub const SHOP: [Upgrade; 3] = [Upgrade::FireRate, Upgrade::Damage, Upgrade::Repair];
}

#[derive(Debug, Clone, Default)]
pub struct CardBody {
    /// Center position
    pub position: Vec2,
    pub size: Vec2,
    /// Opacity, 1 = opaque
    pub alpha: f32,
    pub upgrade: Upgrade,
    /// Shot by the player while waiting
    pub picked: bool,
    /// Another card was picked; leave without granting anything
    pub dismissed: bool,
    /// The pick has been collected by the world
    reported: bool,
}

/// Spawn arguments for a card
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardSpawn {
    pub center_x: f32,
    pub upgrade: Upgrade,
}

pub struct CardCtx<'a> {
    pub body: &'a mut CardBody,
    pub bounds: Rect,
    pub time: &'a TimeSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    /// Slide down to just above the arena center
    Enter,
    /// Drop out the bottom while fading
    Picked,
    /// Retreat out the top
    Exit,
}

impl Motion {
    fn duration(self) -> f64 {
        match self {
            Motion::Enter => 2.0,
            Motion::Picked | Motion::Exit => 1.5,
        }
    }

    fn ease(self, t: f32) -> f32 {
        match self {
            Motion::Enter => quad_ease_out(t),
            Motion::Picked => smoothstep(t),
            Motion::Exit => quad_ease_in(t),
        }
    }

    fn target(self, body: &CardBody, bounds: Rect) -> Vec2 {
        let y = match self {
            Motion::Enter => bounds.center().y - 50.0,
            Motion::Picked => bounds.bottom() + 100.0 + body.size.y * 0.5,
            Motion::Exit => bounds.top() - OFFSCREEN_MARGIN - body.size.y * 0.5,
        };
        Vec2::new(body.position.x, y)
    }
}

/// Eased move from wherever the card is to the motion's target
#[derive(Debug)]
pub struct Transition {
    motion: Motion,
    start: Vec2,
    target: Vec2,
    clock: Option<VirtualClock>,
}

impl Transition {
    fn new(motion: Motion) -> Self {
        Self {
            motion,
            start: Vec2::ZERO,
            target: Vec2::ZERO,
            clock: None,
        }
    }

    fn resume(&mut self, ctx: &mut CardCtx<'_>) -> Step<Handoff<CardPhase>> {
        let Some(clock) = &self.clock else {
            self.start = ctx.body.position;
            self.target = self.motion.target(ctx.body, ctx.bounds);
            self.clock = Some(VirtualClock::new(self.motion.duration(), ctx.time.clone()));
            return Step::Suspend;
        };
        if clock.isover() {
            ctx.body.position = self.target;
            return Step::Complete(match self.motion {
                Motion::Enter => Handoff::Chain(CardPhase::Wait(Wait::default())),
                Motion::Picked => {
                    ctx.body.alpha = 0.0;
                    Handoff::Finish
                }
                Motion::Exit => Handoff::Finish,
            });
        }
        let alpha = self.motion.ease(clock.progress());
        ctx.body.position = self.start.lerp(self.target, alpha);
        if self.motion == Motion::Picked {
            ctx.body.alpha = lerp(1.0, 0.0, (alpha * 1.5).min(1.0));
        }
        Step::Suspend
    }
}

/// Hold still until picked, dismissed or timed out
#[derive(Debug, Default)]
pub struct Wait {
    timeout: Option<VirtualClock>,
}

impl Wait {
    fn resume(&mut self, ctx: &mut CardCtx<'_>) -> Step<Handoff<CardPhase>> {
        let Some(timeout) = &self.timeout else {
            self.timeout = Some(VirtualClock::new(WAIT_TIMEOUT, ctx.time.clone()));
            return Step::Suspend;
        };
        if ctx.body.picked {
            return Step::Complete(Handoff::Chain(CardPhase::Picked(Transition::new(
                Motion::Picked,
            ))));
        }
        if ctx.body.dismissed || timeout.isover() {
            return Step::Complete(Handoff::Chain(CardPhase::Exit(Transition::new(
                Motion::Exit,
            ))));
        }
        Step::Suspend
    }
}

#[derive(Debug)]
pub enum CardPhase {
    Enter(Transition),
    Wait(Wait),
    Picked(Transition),
    Exit(Transition),
}

impl Script for CardPhase {
    type Ctx<'a> = CardCtx<'a>;
    type Input = f32;
    type Output = Handoff<CardPhase>;

    fn resume(
        &mut self,
        ctx: &mut CardCtx<'_>,
        _input: Option<f32>,
    ) -> SimResult<Step<Handoff<CardPhase>>> {
        Ok(match self {
            CardPhase::Wait(wait) => wait.resume(ctx),
            CardPhase::Enter(transition)
            | CardPhase::Picked(transition)
            | CardPhase::Exit(transition) => transition.resume(ctx),
        })
    }
}

#[derive(Debug, Default)]
pub struct UpgradeCard {
    pub body: CardBody,
    script: Option<CoroutineScript<CardPhase>>,
}

impl Pooled for UpgradeCard {
    const KIND: &'static str = "card";
    type Args = CardSpawn;

    fn reset(&mut self, args: CardSpawn) {
        let size = vec2(CARD_SIZE);
        *self = Self {
            body: CardBody {
                position: Vec2::new(args.center_x, -OFFSCREEN_MARGIN - size.y * 0.5),
                size,
                alpha: 1.0,
                upgrade: args.upgrade,
                picked: false,
                dismissed: false,
                reported: false,
            },
            script: Some(CoroutineScript::new(CardPhase::Enter(Transition::new(
                Motion::Enter,
            )))),
        };
    }
}

impl UpgradeCard {
    pub fn phase(&self) -> Option<&CardPhase> {
        self.script.as_ref().map(CoroutineScript::body)
    }

    pub fn is_waiting(&self) -> bool {
        matches!(self.phase(), Some(CardPhase::Wait(_)))
    }

    /// The upgrade, the first time it is asked for after a pick
    pub fn take_pick(&mut self) -> Option<Upgrade> {
        if self.body.picked && !self.body.reported {
            self.body.reported = true;
            Some(self.body.upgrade)
        } else {
            None
        }
    }

    /// Send the card away unless it was already picked
    pub fn dismiss(&mut self) -> bool {
        if self.body.picked || self.body.dismissed {
            return false;
        }
        self.body.dismissed = true;
        true
    }
}

impl Collidable for UpgradeCard {
    fn hitbox(&self) -> Rect {
        Rect::from_center(self.body.position, self.body.size)
    }

    fn team(&self) -> Team {
        Team::Pacifist
    }

    /// Only the player's shots pick, and only while waiting
    fn accepts(&self, attacker: Team) -> bool {
        attacker == Team::Allied && self.is_waiting() && !self.body.picked && !self.body.dismissed
    }

    fn when_hit(&mut self, _projectile: &Projectile) -> HitResult {
        if !self.body.picked {
            self.body.picked = true;
            log::info!("card picked: {:?}", self.body.upgrade);
        }
        HitResult::Absorbed
    }
}

impl<'w> Updatable<TickCtx<'w>> for UpgradeCard {
    fn update(&mut self, life: &mut Life, delta: f32, ctx: &mut TickCtx<'w>) -> SimResult<()> {
        let mut card_ctx = CardCtx {
            body: &mut self.body,
            bounds: ctx.bounds,
            time: ctx.time,
        };
        if drive_handoff(&mut self.script, &mut card_ctx, Some(delta))? == Drive::Finished {
            life.kill_safe();
            return Ok(());
        }
        resolve_projectile_hits(self, life, &mut *ctx.projectiles);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::pool::EntityPool;
    use crate::sim::projectile::ProjectileSpawn;
    use crate::sim::tick::fixture::TickFixture;

    fn run_until_waiting(fx: &mut TickFixture, pool: &mut EntityPool<UpgradeCard>) {
        for _ in 0..40 {
            fx.step(pool, 0.1).unwrap();
            if pool.iter_live().all(|(_, c)| c.is_waiting()) {
                return;
            }
        }
        panic!("cards never settled");
    }

    fn spawn(
        pool: &mut EntityPool<UpgradeCard>,
        x: f32,
        upgrade: Upgrade,
    ) -> crate::sim::Handle<UpgradeCard> {
        pool.spawn(CardSpawn {
            center_x: x,
            upgrade,
        })
        .unwrap()
    }

    #[test]
    fn test_enters_to_resting_position() {
        let mut fx = TickFixture::new();
        let arena = fx.config.arena();
        let mut pool = EntityPool::<UpgradeCard>::new(1);
        let card = spawn(&mut pool, 480.0, Upgrade::Damage);
        assert!(pool.get(card).unwrap().hitbox().bottom() < arena.top());

        run_until_waiting(&mut fx, &mut pool);
        let c = pool.get(card).unwrap();
        assert_eq!(c.body.position, Vec2::new(480.0, arena.center().y - 50.0));
    }

    #[test]
    fn test_entering_card_ignores_shots() {
        let mut fx = TickFixture::new();
        let mut pool = EntityPool::<UpgradeCard>::new(1);
        let card = spawn(&mut pool, 480.0, Upgrade::Damage);
        fx.step(&mut pool, 0.1).unwrap();
        let at = pool.get(card).unwrap().body.position;
        fx.projectiles
            .spawn(ProjectileSpawn::normal(at, Vec2::ZERO, Team::Allied))
            .unwrap();
        fx.step(&mut pool, 0.1).unwrap();
        assert!(!pool.get(card).unwrap().body.picked);
        assert_eq!(fx.projectiles.live_len(), 1);
    }

    #[test]
    fn test_pick_then_drop_out() {
        let mut fx = TickFixture::new();
        let mut pool = EntityPool::<UpgradeCard>::new(2);
        let card = spawn(&mut pool, 480.0, Upgrade::Repair);
        run_until_waiting(&mut fx, &mut pool);

        let at = pool.get(card).unwrap().body.position;
        // Enemy shots never pick
        fx.projectiles
            .spawn(ProjectileSpawn::normal(at, Vec2::ZERO, Team::Enemy))
            .unwrap();
        fx.step(&mut pool, 0.1).unwrap();
        assert!(!pool.get(card).unwrap().body.picked);

        fx.projectiles
            .spawn(ProjectileSpawn::normal(at, Vec2::ZERO, Team::Allied))
            .unwrap();
        fx.step(&mut pool, 0.1).unwrap();
        assert!(pool.get(card).unwrap().body.picked);
        assert_eq!(pool.get_mut(card).unwrap().take_pick(), Some(Upgrade::Repair));
        assert_eq!(pool.get_mut(card).unwrap().take_pick(), None);
        assert!(!pool.get_mut(card).unwrap().dismiss());

        // Wait sees the pick and hands over to the drop-out transition
        fx.step(&mut pool, 0.1).unwrap();
        assert!(matches!(pool.get(card).unwrap().phase(), Some(CardPhase::Picked(_))));

        for _ in 0..20 {
            fx.step(&mut pool, 0.1).unwrap();
        }
        assert!(pool.get(card).is_none());
        assert_eq!(pool.inactive_len(), 2);
    }

    #[test]
    fn test_dismissed_card_exits() {
        let mut fx = TickFixture::new();
        let mut pool = EntityPool::<UpgradeCard>::new(1);
        let card = spawn(&mut pool, 480.0, Upgrade::FireRate);
        run_until_waiting(&mut fx, &mut pool);
        assert!(pool.get_mut(card).unwrap().dismiss());

        fx.step(&mut pool, 0.1).unwrap();
        assert!(matches!(pool.get(card).unwrap().phase(), Some(CardPhase::Exit(_))));
        assert_eq!(pool.get_mut(card).unwrap().take_pick(), None);
        for _ in 0..20 {
            fx.step(&mut pool, 0.1).unwrap();
        }
        assert!(pool.is_empty());
    }

    #[test]
    fn test_unpicked_card_times_out() {
        let mut fx = TickFixture::new();
        let mut pool = EntityPool::<UpgradeCard>::new(1);
        spawn(&mut pool, 480.0, Upgrade::FireRate);
        run_until_waiting(&mut fx, &mut pool);
        fx.time.advance(WAIT_TIMEOUT);
        for _ in 0..20 {
            fx.step(&mut pool, 0.1).unwrap();
        }
        assert!(pool.is_empty());
    }
}
