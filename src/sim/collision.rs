//! Collision queries and hit resolution
//!
//! Entities resolve projectile hits from inside their own `update`, after their
//! script has moved them and before the tick flushes zombies. Victims and
//! projectiles are only ever marked for removal here.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::pool::{EntityPool, Handle, Life};
use super::projectile::Projectile;

/// Axis-aligned rectangle in screen space (y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// The visible arena, anchored at the origin
    pub fn screen(width: f32, height: f32) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    pub fn from_center(center: Vec2, size: Vec2) -> Self {
        Self::new(center.x - size.x * 0.5, center.y - size.y * 0.5, size.x, size.y)
    }

    #[inline]
    pub fn left(&self) -> f32 {
        self.x
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    #[inline]
    pub fn top(&self) -> f32 {
        self.y
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w * 0.5, self.y + self.h * 0.5)
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.w, self.h)
    }

    /// Strict overlap: rectangles that only share an edge do not collide
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.left() < other.right()
            && other.left() < self.right()
            && self.top() < other.bottom()
            && other.top() < self.bottom()
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.left()
            && point.x < self.right()
            && point.y >= self.top()
            && point.y < self.bottom()
    }
}

/// Allegiance of a projectile or a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Team {
    /// Hurts nobody
    #[default]
    Pacifist,
    /// Hurts everybody
    Ffa,
    Allied,
    Enemy,
}

impl Team {
    /// Whether a projectile of this team damages a target on `target`'s side
    pub fn hostile_to(self, target: Team) -> bool {
        match self {
            Team::Pacifist => false,
            Team::Ffa => target != Team::Pacifist,
            Team::Allied => target == Team::Enemy,
            Team::Enemy => target == Team::Allied,
        }
    }
}

/// What a hit did to its victim
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitResult {
    /// Projectile consumed without damage (invincible, or a pick)
    Absorbed,
    Damaged,
    /// Victim should be removed
    Killed,
}

/// Something projectiles can hit
pub trait Collidable {
    fn hitbox(&self) -> Rect;

    fn team(&self) -> Team;

    /// Whether a projectile of `attacker` interacts with this victim at all
    fn accepts(&self, attacker: Team) -> bool {
        attacker.hostile_to(self.team())
    }

    fn when_hit(&mut self, projectile: &Projectile) -> HitResult;
}

/// Summary of one `resolve_projectile_hits` pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HitReport {
    /// Projectiles consumed
    pub hits: u32,
    /// Hits that did damage (killing blow included)
    pub damaging: u32,
    /// The victim was marked for removal by this pass
    pub killed: bool,
}

/// Apply every live, overlapping projectile the victim accepts
///
/// Each consumed projectile is defer-killed. Once the victim is a zombie no
/// further hits are applied, so the remaining projectiles fly on.
pub fn resolve_projectile_hits<V: Collidable>(
    victim: &mut V,
    life: &mut Life,
    projectiles: &mut EntityPool<Projectile>,
) -> HitReport {
    let mut report = HitReport::default();
    if life.is_zombie() {
        return report;
    }
    let hitbox = victim.hitbox();
    let candidates: Vec<Handle<Projectile>> = projectiles
        .iter_live()
        .filter(|(_, p)| victim.accepts(p.team) && p.hitbox().overlaps(&hitbox))
        .map(|(handle, _)| handle)
        .collect();

    for handle in candidates {
        if life.is_zombie() {
            break;
        }
        let Some(projectile) = projectiles.get(handle) else {
            continue;
        };
        let result = victim.when_hit(projectile);
        projectiles.kill_instance_safe(handle);
        report.hits += 1;
        match result {
            HitResult::Absorbed => {}
            HitResult::Damaged => report.damaging += 1,
            HitResult::Killed => {
                report.damaging += 1;
                report.killed = life.kill_safe();
            }
        }
    }
    if report.hits > 0 {
        log::debug!(
            "{} hits on {:?} victim ({} damaging, killed: {})",
            report.hits,
            victim.team(),
            report.damaging,
            report.killed
        );
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::projectile::ProjectileSpawn;

    /// Dies after `health` damaging hits
    struct Dummy {
        rect: Rect,
        team: Team,
        health: u32,
        hits_taken: u32,
    }

    impl Collidable for Dummy {
        fn hitbox(&self) -> Rect {
            self.rect
        }

        fn team(&self) -> Team {
            self.team
        }

        fn when_hit(&mut self, _projectile: &Projectile) -> HitResult {
            self.hits_taken += 1;
            self.health = self.health.saturating_sub(1);
            if self.health == 0 {
                HitResult::Killed
            } else {
                HitResult::Damaged
            }
        }
    }

    fn dummy(health: u32) -> Dummy {
        Dummy {
            rect: Rect::from_center(Vec2::new(100.0, 100.0), Vec2::splat(40.0)),
            team: Team::Enemy,
            health,
            hits_taken: 0,
        }
    }

    fn shot(pool: &mut EntityPool<Projectile>, team: Team) -> Handle<Projectile> {
        pool.spawn(ProjectileSpawn::normal(Vec2::new(100.0, 100.0), Vec2::ZERO, team))
            .expect("capacity")
    }

    #[test]
    fn test_rect_overlap_is_strict() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(a.overlaps(&Rect::new(5.0, 5.0, 10.0, 10.0)));
        assert!(!a.overlaps(&Rect::new(10.0, 0.0, 10.0, 10.0)));
        assert!(a.contains(Vec2::new(0.0, 9.9)));
        assert!(!a.contains(Vec2::new(10.0, 5.0)));
        assert_eq!(Rect::from_center(Vec2::new(5.0, 5.0), Vec2::splat(10.0)), a);
    }

    #[test]
    fn test_team_hostility() {
        assert!(Team::Allied.hostile_to(Team::Enemy));
        assert!(Team::Enemy.hostile_to(Team::Allied));
        assert!(!Team::Allied.hostile_to(Team::Allied));
        assert!(Team::Ffa.hostile_to(Team::Allied));
        assert!(Team::Ffa.hostile_to(Team::Enemy));
        assert!(!Team::Pacifist.hostile_to(Team::Enemy));
    }

    #[test]
    fn test_friendly_projectiles_pass_through() {
        let mut pool = EntityPool::new(4);
        let friendly = shot(&mut pool, Team::Enemy);
        let mut victim = dummy(3);
        let mut life = Life::default();
        let report = resolve_projectile_hits(&mut victim, &mut life, &mut pool);
        assert_eq!(report.hits, 0);
        assert!(pool.is_alive(friendly));
    }

    #[test]
    fn test_simultaneous_hits_stop_at_death() {
        let mut pool = EntityPool::new(4);
        let shots: Vec<_> = (0..3).map(|_| shot(&mut pool, Team::Allied)).collect();
        let mut victim = dummy(2);
        let mut life = Life::default();

        let report = resolve_projectile_hits(&mut victim, &mut life, &mut pool);
        assert_eq!(report.hits, 2);
        assert_eq!(report.damaging, 2);
        assert!(report.killed);
        assert!(life.is_zombie());
        assert_eq!(victim.hits_taken, 2);
        assert!(pool.is_zombie(shots[0]));
        assert!(pool.is_zombie(shots[1]));
        assert!(pool.is_alive(shots[2]));

        // A second pass against the zombie is a no-op
        let again = resolve_projectile_hits(&mut victim, &mut life, &mut pool);
        assert_eq!(again, HitReport::default());
        assert_eq!(victim.hits_taken, 2);
    }

    #[test]
    fn test_consumed_projectiles_are_not_reused() {
        let mut pool = EntityPool::new(2);
        shot(&mut pool, Team::Allied);
        let mut first = dummy(5);
        let mut second = dummy(5);
        let mut life_a = Life::default();
        let mut life_b = Life::default();
        assert_eq!(resolve_projectile_hits(&mut first, &mut life_a, &mut pool).hits, 1);
        assert_eq!(resolve_projectile_hits(&mut second, &mut life_b, &mut pool).hits, 0);
        assert_eq!(pool.flush_zombies(), 1);
    }
}
