//! Simulation configuration
//!
//! Pool sizes are fixed for the lifetime of a `World`, so they live here
//! rather than being grown on demand.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::{BACKGROUND_SPEED, ENEMY_SIZE};
use crate::error::{SimError, SimResult};
use crate::sim::{Rect, Upgrade};

/// Fixed capacity of every entity pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolCapacities {
    pub backgrounds: usize,
    pub enemies: usize,
    pub bosses: usize,
    pub players: usize,
    pub projectiles: usize,
    pub cards: usize,
}

impl Default for PoolCapacities {
    fn default() -> Self {
        Self {
            backgrounds: 5,
            enemies: 30,
            bosses: 2,
            players: 1,
            projectiles: 250,
            cards: 5,
        }
    }
}

impl PoolCapacities {
    fn named(&self) -> [(&'static str, usize); 6] {
        [
            ("backgrounds", self.backgrounds),
            ("enemies", self.enemies),
            ("bosses", self.bosses),
            ("players", self.players),
            ("projectiles", self.projectiles),
            ("cards", self.cards),
        ]
    }
}

/// World configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Visible arena size in pixels (y grows downward)
    pub arena_width: f32,
    pub arena_height: f32,
    /// Seed for the world RNG
    pub seed: u64,
    pub capacities: PoolCapacities,

    // === Backdrop ===
    /// Scroll speed of background tiles (pixels/s)
    pub background_speed: f32,
    /// Spawn a new tile whenever a gap opens at the top edge
    pub spawn_background: bool,

    // === Player ===
    /// Shots per second
    pub player_fire_rate: f32,

    // === Director ===
    /// Enemies per wave
    pub wave_size: usize,
    /// Rounds (wave, boss, shop) before the director completes
    pub rounds: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            arena_width: 960.0,
            arena_height: 540.0,
            seed: 0x5EED,
            capacities: PoolCapacities::default(),
            background_speed: BACKGROUND_SPEED,
            spawn_background: true,
            player_fire_rate: 3.0,
            wave_size: 6,
            rounds: 1,
        }
    }
}

impl SimConfig {
    /// Parse and validate a JSON config (missing fields take defaults)
    pub fn from_json(json: &str) -> SimResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file
    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded config from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn to_json(&self) -> SimResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject configs the simulation cannot run with
    pub fn validate(&self) -> SimResult<()> {
        for (name, capacity) in self.capacities.named() {
            if capacity == 0 {
                return Err(SimError::InvalidConfig(format!(
                    "{name} capacity must be at least 1"
                )));
            }
        }
        if !(self.arena_width > 0.0 && self.arena_height > 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "arena must be positive, got {}x{}",
                self.arena_width, self.arena_height
            )));
        }
        // Wave enemies spawn fully inside the arena
        if self.arena_width <= ENEMY_SIZE[0] {
            return Err(SimError::InvalidConfig(format!(
                "arena width {} cannot fit an enemy {} wide",
                self.arena_width, ENEMY_SIZE[0]
            )));
        }
        // A scrolling backdrop always has the next tile queued
        if self.spawn_background && self.capacities.backgrounds < 2 {
            return Err(SimError::InvalidConfig(format!(
                "backgrounds capacity {} cannot tile, need at least 2",
                self.capacities.backgrounds
            )));
        }
        if !(self.player_fire_rate > 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "player_fire_rate must be positive, got {}",
                self.player_fire_rate
            )));
        }
        if self.wave_size == 0 {
            return Err(SimError::InvalidConfig("wave_size must be at least 1".into()));
        }
        if self.capacities.cards < Upgrade::SHOP.len() {
            return Err(SimError::InvalidConfig(format!(
                "cards capacity {} cannot hold a shop of {}",
                self.capacities.cards,
                Upgrade::SHOP.len()
            )));
        }
        if self.wave_size > self.capacities.enemies {
            return Err(SimError::InvalidConfig(format!(
                "wave_size {} exceeds enemy capacity {}",
                self.wave_size, self.capacities.enemies
            )));
        }
        Ok(())
    }

    /// The visible arena rectangle
    pub fn arena(&self) -> Rect {
        Rect::screen(self.arena_width, self.arena_height)
    }

    /// Seconds between player shots
    pub fn fire_cooldown(&self) -> f64 {
        1.0 / self.player_fire_rate as f64
    }
}
