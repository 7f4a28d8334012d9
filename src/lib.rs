//! Space Brawl - a vertical shooter built on three engine primitives
//!
//! Core modules:
//! - `sim`: Pooled entities, virtual clocks, frame-stepped scripts and the world tick
//! - `config`: Data-driven pool sizes and tuning
//! - `error`: Crate-wide error type

pub mod config;
pub mod error;
pub mod sim;

pub use config::{PoolCapacities, SimConfig};
pub use error::{SimError, SimResult};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (120 Hz, matches the target frame rate)
    pub const SIM_DT: f32 = 1.0 / 120.0;
    /// Frame rate the per-frame friction/drag factors were tuned at
    pub const REFERENCE_FPS: f32 = 60.0;

    /// Background scroll speed (pixels/s)
    pub const BACKGROUND_SPEED: f32 = 120.0;

    /// Enemy defaults
    pub const ENEMY_SPEED: f32 = 300.0;
    pub const ENEMY_HEALTH: f32 = 3.0;
    pub const ENEMY_SIZE: [f32; 2] = [48.0, 40.0];
    pub const ENEMY_SCORE: u64 = 10;

    /// Boss defaults
    pub const BOSS_HEALTH: f32 = 60.0;
    pub const BOSS_SIZE: [f32; 2] = [96.0, 80.0];
    pub const BOSS_SPEED: f32 = 360.0;
    pub const BOSS_SCORE: u64 = 200;
    /// Score for every damaging hit on a boss
    pub const BOSS_HIT_SCORE: u64 = 1;

    /// Player defaults
    pub const PLAYER_HEALTH: f32 = 5.0;
    pub const PLAYER_SIZE: [f32; 2] = [40.0, 48.0];
    /// Acceleration (pixels/s²)
    pub const PLAYER_ACCEL: f32 = 10_800.0;
    /// Velocity lost per reference frame
    pub const PLAYER_FRICTION: f32 = 0.3;
    pub const PLAYER_MIN_SPEED: f32 = 6.0;
    pub const PLAYER_MAX_SPEED: f32 = 540.0;
    /// Invulnerability window after taking a hit (seconds)
    pub const PLAYER_INVULNERABILITY: f64 = 1.0;
    /// Seconds for one full animation cycle
    pub const PLAYER_ANIM_CYCLE: f64 = 0.25;
    pub const PLAYER_ANIM_FRAMES: usize = 8;

    /// Projectile defaults
    pub const PROJECTILE_SPEED: f32 = 480.0;
    pub const PROJECTILE_SIZE: [f32; 2] = [10.0, 10.0];

    /// Upgrade card size
    pub const CARD_SIZE: [f32; 2] = [280.0, 350.0];
}

/// Linear interpolation between two scalars
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Quadratic ease-out on [0, 1]
#[inline]
pub fn quad_ease_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t) * (1.0 - t)
}

/// Quadratic ease-in on [0, 1]
#[inline]
pub fn quad_ease_in(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t
}

/// Hermite smoothstep on [0, 1]
#[inline]
pub fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Build a vector from a `[w, h]` constant
#[inline]
pub fn vec2(size: [f32; 2]) -> Vec2 {
    Vec2::new(size[0], size[1])
}
