//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Time only comes from the `TimeSource` handed to the world
//! - Seeded RNG only
//! - Stable iteration order (pool activation order)
//! - No rendering or platform dependencies

pub mod background;
pub mod boss;
pub mod card;
pub mod clock;
pub mod collision;
pub mod director;
pub mod enemy;
pub mod player;
pub mod pool;
pub mod projectile;
pub mod script;
pub mod tick;

pub use background::{Background, TileSpawn};
pub use boss::{Boss, BossPhase};
pub use card::{CardSpawn, Upgrade, UpgradeCard};
pub use clock::{ManualTime, TimeSource, UNBOUNDED, VirtualClock};
pub use collision::{Collidable, HitReport, HitResult, Rect, Team, resolve_projectile_hits};
pub use director::{Beat, Director};
pub use enemy::Enemy;
pub use player::{Player, PlayerSpawn};
pub use pool::{EntityPool, Handle, Life, Pooled, Updatable};
pub use projectile::{Projectile, ProjectileKind, ProjectileSpawn};
pub use script::{CoroutineScript, Drive, Handoff, Script, Step, drive_handoff};
pub use tick::{TickCtx, TickInput, World};
