//! Wave director
//!
//! A free-standing script owned by the world rather than by any entity. Each
//! round runs warm-up, an enemy wave, a boss fight and a card shop, moving on
//! once the pool it is waiting on has emptied.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;

use super::boss::Boss;
use super::card::{CardSpawn, Upgrade, UpgradeCard};
use super::clock::{TimeSource, VirtualClock};
use super::collision::Rect;
use super::enemy::Enemy;
use super::pool::EntityPool;
use super::script::{Script, Step};
use crate::consts::{BOSS_SIZE, ENEMY_SIZE};
use crate::error::SimResult;

const WARM_UP: f64 = 1.5;
/// Seconds between enemies within a wave
const WAVE_SPACING: f64 = 0.4;
/// Wave enemies are spread over this many rows
const WAVE_ROWS: usize = 3;
const ROW_HEIGHT: f32 = 60.0;

pub struct DirectorCtx<'a> {
    pub enemies: &'a mut EntityPool<Enemy>,
    pub bosses: &'a mut EntityPool<Boss>,
    pub cards: &'a mut EntityPool<UpgradeCard>,
    pub time: &'a TimeSource,
    pub bounds: Rect,
    pub wave_size: usize,
    pub rng: &'a mut Pcg32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Beat {
    WarmUp,
    Wave { spawned: usize },
    Boss,
    Shop,
}

#[derive(Debug)]
pub struct Director {
    rounds: u32,
    round: u32,
    beat: Beat,
    clock: Option<VirtualClock>,
}

impl Director {
    pub fn new(rounds: u32) -> Self {
        Self {
            rounds,
            round: 0,
            beat: Beat::WarmUp,
            clock: None,
        }
    }

    pub fn beat(&self) -> Beat {
        self.beat
    }

    /// Rounds completed so far
    pub fn round(&self) -> u32 {
        self.round
    }

    fn enter(&mut self, beat: Beat, ctx: &mut DirectorCtx<'_>) -> SimResult<()> {
        log::info!("director: round {} {:?}", self.round + 1, beat);
        self.beat = beat;
        let duration = match beat {
            Beat::WarmUp => WARM_UP,
            // The first wave enemy comes on the next frame
            Beat::Wave { .. } | Beat::Boss | Beat::Shop => 0.0,
        };
        self.clock = Some(VirtualClock::new(duration, ctx.time.clone()));

        match beat {
            Beat::Boss => {
                let size = BOSS_SIZE[1];
                ctx.bosses.spawn(Vec2::new(
                    ctx.bounds.center().x,
                    ctx.bounds.top() - size * 0.5,
                ))?;
            }
            Beat::Shop => {
                let width = ctx.bounds.w;
                for (i, &upgrade) in Upgrade::SHOP.iter().enumerate() {
                    let slots = (Upgrade::SHOP.len() + 1) as f32;
                    ctx.cards.spawn(CardSpawn {
                        center_x: ctx.bounds.left() + width * (i + 1) as f32 / slots,
                        upgrade,
                    })?;
                }
            }
            Beat::WarmUp | Beat::Wave { .. } => {}
        }
        Ok(())
    }

    fn spawn_enemy(index: usize, ctx: &mut DirectorCtx<'_>) -> SimResult<()> {
        let half = ENEMY_SIZE[0] * 0.5;
        let x = ctx
            .rng
            .random_range(ctx.bounds.left() + half..ctx.bounds.right() - half);
        let y = ctx.bounds.top() + ROW_HEIGHT + (index % WAVE_ROWS) as f32 * ROW_HEIGHT;
        ctx.enemies.spawn(Vec2::new(x, y))?;
        Ok(())
    }
}

impl Script for Director {
    type Ctx<'a> = DirectorCtx<'a>;
    type Input = f32;
    /// Rounds played
    type Output = u32;

    fn resume(&mut self, ctx: &mut DirectorCtx<'_>, _input: Option<f32>) -> SimResult<Step<u32>> {
        let Some(clock) = &self.clock else {
            if self.rounds == 0 {
                return Ok(Step::Complete(0));
            }
            self.enter(Beat::WarmUp, ctx)?;
            return Ok(Step::Suspend);
        };

        match self.beat {
            Beat::WarmUp => {
                if clock.isover() {
                    self.enter(Beat::Wave { spawned: 0 }, ctx)?;
                }
            }
            Beat::Wave { spawned } if spawned < ctx.wave_size => {
                if clock.isover() {
                    clock.set_duration(WAVE_SPACING, true);
                    Self::spawn_enemy(spawned, ctx)?;
                    self.beat = Beat::Wave {
                        spawned: spawned + 1,
                    };
                }
            }
            Beat::Wave { .. } => {
                if ctx.enemies.live_len() == 0 {
                    self.enter(Beat::Boss, ctx)?;
                }
            }
            Beat::Boss => {
                if ctx.bosses.live_len() == 0 {
                    self.enter(Beat::Shop, ctx)?;
                }
            }
            Beat::Shop => {
                if ctx.cards.live_len() == 0 {
                    self.round += 1;
                    if self.round >= self.rounds {
                        log::info!("director: all {} rounds played", self.round);
                        return Ok(Step::Complete(self.round));
                    }
                    self.enter(Beat::WarmUp, ctx)?;
                }
            }
        }
        Ok(Step::Suspend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimError;
    use crate::sim::clock::ManualTime;
    use crate::sim::script::CoroutineScript;
    use rand::SeedableRng;

    struct Fixture {
        time: ManualTime,
        source: TimeSource,
        enemies: EntityPool<Enemy>,
        bosses: EntityPool<Boss>,
        cards: EntityPool<UpgradeCard>,
        rng: Pcg32,
        wave_size: usize,
    }

    impl Fixture {
        fn new(wave_size: usize) -> Self {
            let time = ManualTime::new();
            Self {
                source: time.source(),
                time,
                enemies: EntityPool::new(10),
                bosses: EntityPool::new(1),
                cards: EntityPool::new(3),
                rng: Pcg32::seed_from_u64(1),
                wave_size,
            }
        }

        fn frame(&mut self, script: &mut CoroutineScript<Director>, dt: f64) -> SimResult<Option<u32>> {
            self.time.advance(dt);
            let mut ctx = DirectorCtx {
                enemies: &mut self.enemies,
                bosses: &mut self.bosses,
                cards: &mut self.cards,
                time: &self.source,
                bounds: Rect::screen(960.0, 540.0),
                wave_size: self.wave_size,
                rng: &mut self.rng,
            };
            script.process_frame(&mut ctx, Some(dt as f32))
        }
    }

    #[test]
    fn test_full_round() {
        let mut fx = Fixture::new(4);
        let mut director = CoroutineScript::new(Director::new(1));

        fx.frame(&mut director, 0.0).unwrap();
        assert_eq!(director.body().beat(), Beat::WarmUp);
        fx.frame(&mut director, 1.0).unwrap();
        assert!(fx.enemies.is_empty());
        fx.frame(&mut director, 0.5).unwrap();
        assert_eq!(director.body().beat(), Beat::Wave { spawned: 0 });

        // One enemy per spacing interval, on staggered rows
        for _ in 0..4 {
            fx.frame(&mut director, 0.5).unwrap();
        }
        assert_eq!(fx.enemies.live_len(), 4);
        let rows: Vec<f32> = fx.enemies.iter().map(|(_, e)| e.body.position.y).collect();
        assert_eq!(rows, vec![60.0, 120.0, 180.0, 60.0]);

        // The wave holds until every enemy is gone
        fx.frame(&mut director, 1.0).unwrap();
        assert_eq!(director.body().beat(), Beat::Wave { spawned: 4 });
        fx.enemies.kill_all();
        fx.frame(&mut director, 0.1).unwrap();
        assert_eq!(director.body().beat(), Beat::Boss);
        let (_, boss) = fx.bosses.first_live().unwrap();
        assert_eq!(boss.body.position, Vec2::new(480.0, -40.0));

        fx.bosses.kill_all();
        fx.frame(&mut director, 0.1).unwrap();
        assert_eq!(director.body().beat(), Beat::Shop);
        let xs: Vec<f32> = fx.cards.iter().map(|(_, c)| c.body.position.x).collect();
        assert_eq!(xs, vec![240.0, 480.0, 720.0]);

        assert_eq!(fx.frame(&mut director, 0.1).unwrap(), None);
        fx.cards.kill_all();
        assert_eq!(fx.frame(&mut director, 0.1).unwrap(), Some(1));
        assert!(director.is_over());
    }

    #[test]
    fn test_next_round_restarts_with_warm_up() {
        let mut fx = Fixture::new(1);
        let mut director = CoroutineScript::new(Director::new(2));
        fx.frame(&mut director, 0.0).unwrap();
        fx.frame(&mut director, WARM_UP).unwrap();
        fx.frame(&mut director, 0.1).unwrap();
        fx.enemies.kill_all();
        fx.frame(&mut director, 0.1).unwrap();
        fx.bosses.kill_all();
        fx.frame(&mut director, 0.1).unwrap();
        fx.cards.kill_all();
        assert_eq!(fx.frame(&mut director, 0.1).unwrap(), None);
        assert_eq!(director.body().beat(), Beat::WarmUp);
        assert_eq!(director.body().round(), 1);
    }

    #[test]
    fn test_zero_rounds_completes_on_priming() {
        let mut fx = Fixture::new(1);
        let mut director = CoroutineScript::new(Director::new(0));
        assert_eq!(fx.frame(&mut director, 0.0).unwrap(), Some(0));
    }

    #[test]
    fn test_full_shop_pool_fails_the_frame() {
        let mut fx = Fixture::new(1);
        fx.cards = EntityPool::new(2);
        let mut director = CoroutineScript::new(Director::new(1));
        fx.frame(&mut director, 0.0).unwrap();
        fx.frame(&mut director, WARM_UP).unwrap();
        fx.frame(&mut director, 0.1).unwrap();
        fx.enemies.kill_all();
        fx.frame(&mut director, 0.1).unwrap();
        fx.bosses.kill_all();
        let err = fx.frame(&mut director, 0.1).unwrap_err();
        assert!(matches!(err, SimError::PoolExhausted { kind: "card", .. }));
    }
}
