//! Alien Invasion - simulation core for a wave-based shoot-'em-up
//!
//! Core modules:
//! - `sim`: Deterministic simulation (waves, entities, collisions, game state)
//! - `settings`: Base tuning constants and the wave composition table
//! - `error`: Boundary errors (settings parsing, start configuration)
//!
//! Rendering, audio and menus live outside this crate. They read
//! [`sim::Snapshot`]s and drain [`sim::GameEvent`]s, never mutating the
//! simulation directly.

pub mod error;
pub mod settings;
pub mod sim;

pub use error::SimError;
pub use settings::{DifficultyMode, Settings};

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Maximum number of simultaneous players
    pub const MAX_PLAYERS: usize = 4;
    /// Number of alien tiers (1..=7)
    pub const TIER_COUNT: usize = 7;
    /// Number of player levels (0..=11)
    pub const PLAYER_LEVELS: usize = 12;
    /// Shield damage-color ramp length (stage 0 = best)
    pub const SHIELD_STAGES: u8 = 5;

    /// Countdown before the first wave (3-2-1-GO)
    pub const COUNTDOWN_MS: f64 = 4000.0;
    /// Interval between countdown cues
    pub const COUNTDOWN_CUE_MS: f64 = 1000.0;
    /// "Wave N Complete" banner scroll-in duration
    pub const BANNER_SCROLL_IN_MS: f64 = 1200.0;
    /// "Wave N Complete" banner scroll-out duration
    pub const BANNER_SCROLL_OUT_MS: f64 = 1200.0;
    /// Fixed "Warping In" phase before the next wave
    pub const WARPING_IN_MS: f64 = 3000.0;
    /// Cadence between reinforcement fleet rows
    pub const FLEET_ROW_CADENCE_MS: f64 = 800.0;
    /// Fleet rows visible at once when a wave starts
    pub const MAX_VISIBLE_ROWS: u32 = 3;
    /// Extra gap above the top fleet row before the next row may enter
    pub const REINFORCEMENT_MARGIN: f32 = 15.0;
}

/// Convert a fixed timestep in seconds to game-clock milliseconds
#[inline]
pub fn dt_to_ms(dt: f32) -> f64 {
    dt as f64 * 1000.0
}

/// Linear interpolation factor of `now` inside `[start, start + duration]`, clamped to [0, 1]
#[inline]
pub fn progress(now: f64, start: f64, duration: f64) -> f32 {
    if duration <= 0.0 {
        return 1.0;
    }
    ((now - start) / duration).clamp(0.0, 1.0) as f32
}
