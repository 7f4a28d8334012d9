//! Fixed timestep simulation tick
//!
//! `World` owns one pool per entity kind, the clocks and the RNG, and fans a
//! single `advance` call out to every pool in a fixed order:
//!
//! ```text
//! backgrounds -> enemies -> bosses -> players -> projectiles -> cards -> director
//! ```
//!
//! Zombies created anywhere in the tick are flushed at the very end.

use std::rc::Rc;

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::background::{Background, TileSpawn};
use super::boss::Boss;
use super::card::{CardSpawn, Upgrade, UpgradeCard};
use super::clock::{TimeSource, VirtualClock};
use super::collision::Rect;
use super::director::{Director, DirectorCtx};
use super::enemy::Enemy;
use super::player::{Player, PlayerSpawn};
use super::pool::{EntityPool, Handle};
use super::projectile::{Projectile, ProjectileCtx, ProjectileSpawn};
use super::script::CoroutineScript;
use crate::config::SimConfig;
use crate::error::SimResult;

/// Autopilot reaches full thrust this many pixels away from its target
const AUTOPILOT_RANGE: f32 = 40.0;

/// Input commands for a single tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickInput {
    /// Horizontal thrust, -1 (left) to 1 (right)
    pub move_axis: f32,
    pub fire: bool,
    /// Pause toggle
    pub pause: bool,
    /// Demo mode - steer under the nearest hostile and keep firing
    pub autopilot: bool,
}

/// What entity updates may touch besides their own pool
pub struct TickCtx<'w> {
    /// Game clock; every gameplay clock reads this
    pub time: &'w TimeSource,
    pub bounds: Rect,
    pub config: &'w SimConfig,
    pub input: &'w TickInput,
    /// Player position at the start of the tick
    pub player_pos: Option<Vec2>,
    pub projectiles: &'w mut EntityPool<Projectile>,
    pub rng: &'w mut Pcg32,
    pub score: &'w mut u64,
}

pub struct World {
    config: SimConfig,
    /// Session time; the game clock is derived from it
    root: Rc<VirtualClock>,
    /// Pausable game clock
    game: Rc<VirtualClock>,
    game_time: TimeSource,

    backgrounds: EntityPool<Background>,
    enemies: EntityPool<Enemy>,
    bosses: EntityPool<Boss>,
    players: EntityPool<Player>,
    projectiles: EntityPool<Projectile>,
    cards: EntityPool<UpgradeCard>,

    rng: Pcg32,
    score: u64,
    ticks: u64,
    director: Option<CoroutineScript<Director>>,
    last_pick: Option<Upgrade>,
}

impl World {
    /// Build every pool at full capacity and start the backdrop
    pub fn new(config: SimConfig, time_source: TimeSource) -> SimResult<Self> {
        config.validate()?;
        let root = Rc::new(VirtualClock::unbounded(time_source));
        let game = Rc::new(VirtualClock::unbounded(root.source()));
        let game_time = game.source();
        let capacities = config.capacities;

        let mut world = Self {
            rng: Pcg32::seed_from_u64(config.seed),
            root,
            game,
            game_time,
            backgrounds: EntityPool::new(capacities.backgrounds),
            enemies: EntityPool::new(capacities.enemies),
            bosses: EntityPool::new(capacities.bosses),
            players: EntityPool::new(capacities.players),
            projectiles: EntityPool::new(capacities.projectiles),
            cards: EntityPool::new(capacities.cards),
            score: 0,
            ticks: 0,
            director: None,
            last_pick: None,
            config,
        };
        world.start_backdrop()?;
        log::info!(
            "world ready: {}x{} arena, seed {:#x}",
            world.config.arena_width,
            world.config.arena_height,
            world.config.seed
        );
        Ok(world)
    }

    fn start_backdrop(&mut self) -> SimResult<()> {
        if self.config.spawn_background {
            let arena = self.config.arena();
            self.spawn_background(TileSpawn {
                center_x: arena.center().x,
                bottom: arena.bottom(),
                size: arena.size(),
            })?;
        }
        Ok(())
    }

    /// Advance the world by one timestep
    pub fn advance(&mut self, delta: f32, input: &TickInput) -> SimResult<()> {
        if input.pause {
            if self.game.is_paused() {
                self.game.unpause();
                log::info!("resumed at {:.2}s", self.game.get_time());
            } else {
                self.game.pause();
                log::info!("paused at {:.2}s", self.game.get_time());
            }
        }
        if self.game.is_paused() {
            return Ok(());
        }

        let input = if input.autopilot {
            self.autopilot(input)
        } else {
            *input
        };
        self.ticks += 1;

        let Self {
            config,
            game_time,
            backgrounds,
            enemies,
            bosses,
            players,
            projectiles,
            cards,
            rng,
            score,
            director,
            last_pick,
            ..
        } = self;
        let (config, game_time) = (&*config, &*game_time);
        let bounds = config.arena();
        let player_pos = players.first_live().map(|(_, p)| p.body.position);

        {
            let mut ctx = TickCtx {
                time: game_time,
                bounds,
                config,
                input: &input,
                player_pos,
                projectiles: &mut *projectiles,
                rng: &mut *rng,
                score: &mut *score,
            };
            backgrounds.update_class(delta, &mut ctx)?;
            enemies.update_class(delta, &mut ctx)?;
            bosses.update_class(delta, &mut ctx)?;
            players.update_class(delta, &mut ctx)?;
        }

        let mut projectile_ctx = ProjectileCtx {
            bounds,
            allied_targets: players.iter_live().map(|(_, p)| p.body.position).collect(),
            enemy_targets: enemies
                .iter_live()
                .map(|(_, e)| e.body.position)
                .chain(bosses.iter_live().map(|(_, b)| b.body.position))
                .collect(),
        };
        projectiles.update_class(delta, &mut projectile_ctx)?;

        {
            let mut ctx = TickCtx {
                time: game_time,
                bounds,
                config,
                input: &input,
                player_pos,
                projectiles: &mut *projectiles,
                rng: &mut *rng,
                score: &mut *score,
            };
            cards.update_class(delta, &mut ctx)?;
        }

        if let Some(director) = director.as_mut() {
            let mut ctx = DirectorCtx {
                enemies: &mut *enemies,
                bosses: &mut *bosses,
                cards: &mut *cards,
                time: game_time,
                bounds,
                wave_size: config.wave_size,
                rng: &mut *rng,
            };
            director.step(&mut ctx, Some(delta))?;
        }

        if let Some(upgrade) = Self::collect_pick(cards) {
            *last_pick = Some(upgrade);
        }

        backgrounds.flush_zombies();
        enemies.flush_zombies();
        bosses.flush_zombies();
        players.flush_zombies();
        projectiles.flush_zombies();
        cards.flush_zombies();
        Ok(())
    }

    /// First card picked this tick; every other card is sent away
    fn collect_pick(cards: &mut EntityPool<UpgradeCard>) -> Option<Upgrade> {
        let handles = cards.active_handles();
        let pick = handles
            .iter()
            .filter_map(|&handle| cards.get_mut(handle).and_then(UpgradeCard::take_pick))
            .reduce(|first, _| first)?;
        log::info!("upgrade chosen: {pick:?}");
        for handle in handles {
            if let Some(card) = cards.get_mut(handle) {
                card.dismiss();
            }
        }
        Some(pick)
    }

    /// Steer under the nearest hostile (or a waiting card) and keep firing
    fn autopilot(&self, input: &TickInput) -> TickInput {
        let Some((_, player)) = self.players.first_live() else {
            return *input;
        };
        let from = player.body.position;
        let target = self
            .enemies
            .iter_live()
            .map(|(_, e)| e.body.position)
            .chain(self.bosses.iter_live().map(|(_, b)| b.body.position))
            .min_by(|a, b| a.distance(from).total_cmp(&b.distance(from)))
            .or_else(|| {
                self.cards
                    .iter_live()
                    .find(|(_, card)| card.is_waiting())
                    .map(|(_, card)| card.body.position)
            });
        let move_axis = target.map_or(0.0, |target| {
            ((target.x - from.x) / AUTOPILOT_RANGE).clamp(-1.0, 1.0)
        });
        TickInput {
            move_axis,
            fire: true,
            ..*input
        }
    }

    // === Spawn factories ===

    pub fn spawn_background(&mut self, tile: TileSpawn) -> SimResult<Handle<Background>> {
        self.backgrounds.spawn(tile)
    }

    pub fn spawn_enemy(&mut self, position: Vec2) -> SimResult<Handle<Enemy>> {
        self.enemies.spawn(position)
    }

    pub fn spawn_boss(&mut self, position: Vec2) -> SimResult<Handle<Boss>> {
        self.bosses.spawn(position)
    }

    /// The player runs on the game clock with the configured fire rate
    pub fn spawn_player(&mut self, position: Vec2) -> SimResult<Handle<Player>> {
        self.players.spawn(PlayerSpawn {
            position,
            time: self.game_time.clone(),
            fire_cooldown: self.config.fire_cooldown(),
        })
    }

    pub fn spawn_projectile(&mut self, spawn: ProjectileSpawn) -> SimResult<Handle<Projectile>> {
        self.projectiles.spawn(spawn)
    }

    pub fn spawn_card(&mut self, spawn: CardSpawn) -> SimResult<Handle<UpgradeCard>> {
        self.cards.spawn(spawn)
    }

    /// Install a fresh director, replacing (and cancelling) any running one
    pub fn start_director(&mut self) {
        log::info!("director started: {} rounds", self.config.rounds);
        self.director = Some(CoroutineScript::new(Director::new(self.config.rounds)));
    }

    /// End the session: every instance goes back to its pool
    pub fn reset(&mut self) -> SimResult<()> {
        self.backgrounds.kill_all();
        self.enemies.kill_all();
        self.bosses.kill_all();
        self.players.kill_all();
        self.projectiles.kill_all();
        self.cards.kill_all();
        self.director = None;
        self.score = 0;
        self.ticks = 0;
        self.last_pick = None;
        self.game.unpause();
        log::info!("world reset");
        self.start_backdrop()
    }

    // === Accessors ===

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    /// Ticks simulated (paused ticks excluded)
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn is_paused(&self) -> bool {
        self.game.is_paused()
    }

    /// Seconds of unpaused game time
    pub fn game_time(&self) -> f64 {
        self.game.get_time()
    }

    /// Seconds since the world was built, pauses included
    pub fn session_time(&self) -> f64 {
        self.root.get_time()
    }

    /// Source for clocks that should stop while the game is paused
    pub fn time_source(&self) -> &TimeSource {
        &self.game_time
    }

    pub fn last_pick(&self) -> Option<Upgrade> {
        self.last_pick
    }

    pub fn director(&self) -> Option<&CoroutineScript<Director>> {
        self.director.as_ref()
    }

    pub fn director_finished(&self) -> bool {
        self.director.as_ref().is_some_and(CoroutineScript::is_over)
    }

    pub fn backgrounds(&self) -> &EntityPool<Background> {
        &self.backgrounds
    }

    pub fn enemies(&self) -> &EntityPool<Enemy> {
        &self.enemies
    }

    pub fn bosses(&self) -> &EntityPool<Boss> {
        &self.bosses
    }

    pub fn players(&self) -> &EntityPool<Player> {
        &self.players
    }

    pub fn projectiles(&self) -> &EntityPool<Projectile> {
        &self.projectiles
    }

    pub fn cards(&self) -> &EntityPool<UpgradeCard> {
        &self.cards
    }
}
