//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by pool slot)
//! - No rendering or platform dependencies

pub mod breach;
pub mod collision;
pub mod difficulty;
pub mod entities;
pub mod events;
pub mod hitbox;
pub mod lifecycle;
pub mod movement;
pub mod pool;
pub mod snapshot;
pub mod state;
pub mod tick;
pub mod waves;

pub use breach::{DefenseState, account_breaches};
pub use collision::resolve_collisions;
pub use difficulty::DifficultyModifiers;
pub use entities::{
    Alien, AlienTier, Bullet, BulletKind, Minion, Player, PlayerStatus, PowerUp, PowerUpKind,
    Shield, Squadron,
};
pub use events::GameEvent;
pub use hitbox::{Rect, is_valid_hit};
pub use lifecycle::Entities;
pub use pool::{Handle, Pool};
pub use snapshot::{Snapshot, SpriteKind, SpriteView};
pub use state::{BannerPhase, GamePhase, GameState, PowerUpToggles, StartConfig};
pub use tick::{PlayerInput, TickInput, step_frame, tick};
pub use waves::WaveScheduler;
