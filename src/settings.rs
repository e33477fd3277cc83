//! Settings store
//!
//! Every base numeric constant the simulation reads: field size, per-tier
//! stats, caps and the wave composition table. The difficulty engine treats a
//! `Settings` value as a read-only baseline; nothing in `sim` mutates it.

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::{PLAYER_LEVELS, TIER_COUNT};
use crate::error::SimError;

/// Difficulty modes, picked once in the start menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DifficultyMode {
    Kiddie,
    Easy,
    #[default]
    Normal,
    Hard,
}

impl DifficultyMode {
    pub const ALL: [DifficultyMode; 4] = [
        DifficultyMode::Kiddie,
        DifficultyMode::Easy,
        DifficultyMode::Normal,
        DifficultyMode::Hard,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DifficultyMode::Kiddie => "Kiddie",
            DifficultyMode::Easy => "Easy",
            DifficultyMode::Normal => "Normal",
            DifficultyMode::Hard => "Hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "kiddie" | "kid" => Some(DifficultyMode::Kiddie),
            "easy" => Some(DifficultyMode::Easy),
            "normal" | "medium" => Some(DifficultyMode::Normal),
            "hard" => Some(DifficultyMode::Hard),
            _ => None,
        }
    }

    /// Index into per-mode tables
    pub fn index(&self) -> usize {
        match self {
            DifficultyMode::Kiddie => 0,
            DifficultyMode::Easy => 1,
            DifficultyMode::Normal => 2,
            DifficultyMode::Hard => 3,
        }
    }

    /// Movement speed multiplier
    pub fn speed_factor(&self) -> f32 {
        match self {
            DifficultyMode::Kiddie => 0.6,
            DifficultyMode::Easy => 0.8,
            DifficultyMode::Normal => 1.1,
            DifficultyMode::Hard => 1.25,
        }
    }

    /// Fire interval multiplier (above 1.0 = slower fire)
    pub fn fire_interval_factor(&self) -> f64 {
        match self {
            DifficultyMode::Kiddie => 1.6,
            DifficultyMode::Easy => 1.3,
            DifficultyMode::Normal => 0.9,
            DifficultyMode::Hard => 0.75,
        }
    }

    /// Spawn interval multiplier (above 1.0 = sparser spawns)
    pub fn spawn_interval_factor(&self) -> f64 {
        match self {
            DifficultyMode::Kiddie => 1.5,
            DifficultyMode::Easy => 1.2,
            DifficultyMode::Normal => 0.95,
            DifficultyMode::Hard => 0.85,
        }
    }

    /// Fleet row count multiplier
    pub fn row_factor(&self) -> f32 {
        match self {
            DifficultyMode::Kiddie => 0.6,
            DifficultyMode::Easy => 0.8,
            DifficultyMode::Normal => 1.0,
            DifficultyMode::Hard => 1.2,
        }
    }

    pub fn is_hard(&self) -> bool {
        *self == DifficultyMode::Hard
    }

    /// The easiest mode never spawns tanker minions
    pub fn is_easiest(&self) -> bool {
        *self == DifficultyMode::Kiddie
    }
}

/// A `[min, max]` window in game-clock milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntervalMs {
    pub min: f64,
    pub max: f64,
}

impl IntervalMs {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Never-firing / never-spawning window
    pub const NEVER: IntervalMs = IntervalMs { min: 0.0, max: 0.0 };

    pub fn is_never(&self) -> bool {
        self.max <= 0.0
    }

    /// Scale both ends by `factor`
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            min: self.min * factor,
            max: self.max * factor,
        }
    }
}

/// Base stats for one alien tier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierStats {
    /// Sprite bounding box
    pub size: Vec2,
    /// Base movement speed (pixels/second)
    pub speed: f32,
    /// Base fire interval window
    pub fire_interval: IntervalMs,
    /// Max simultaneous bullets per alien of this tier
    pub bullet_cap: u32,
    /// Base independent-spawn interval window (unused for the fleet tier)
    pub spawn_interval: IntervalMs,
    /// Delay after wave start before the first independent spawn
    pub spawn_offset_ms: f64,
    /// Horizontal safe margin for spawn positions
    pub spawn_margin: f32,
    /// Defense cost when this tier breaches
    pub breach_weight: u32,
    /// Hits survived before destruction (0 = single hit)
    pub max_damage: u8,
    /// Shield stages removed on body contact (big tiers)
    pub shield_contact_damage: u8,
    /// Player damage on body contact
    pub player_contact_damage: i32,
    /// Chance of dropping a power-up on death
    pub powerup_drop_chance: f32,
}

/// Tethered minion stats (tanker escorts)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinionSettings {
    pub size: Vec2,
    pub fire_interval: IntervalMs,
    pub bullet_cap: u32,
    /// Scoring uses the kill formula with this tier
    pub score_tier: u32,
    /// Gap between the minion grid and the tanker hull
    pub gap: f32,
    /// Minion rows per difficulty mode (Kiddie, Easy, Normal, Hard)
    pub rows_per_mode: [u32; 4],
    pub columns: u32,
    /// First wave index on which tankers bring minions
    pub first_wave: u32,
}

/// Projectile settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulletSettings {
    pub player_speed: f32,
    pub alien_speed: f32,
    pub player_size: Vec2,
    pub alien_size: Vec2,
    /// Downward displacement applied by plasma hits
    pub plasma_knockback: f32,
    /// Sideways displacement applied by wing bolt hits
    pub wing_knockback: f32,
}

/// Player ship settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSettings {
    pub size: Vec2,
    pub speed: f32,
    pub max_health: i32,
    pub lives: i32,
    pub fire_cooldown_ms: f64,
    /// Cumulative score needed for each level (index = level)
    pub level_thresholds: [u64; PLAYER_LEVELS],
    /// Max simultaneous bullets per level
    pub bullet_caps: [u32; PLAYER_LEVELS],
    /// Time spent flying to the bottom after losing a life
    pub between_lives_ms: f64,
    /// Invulnerable, horizontal-only window after reaching the bottom
    pub respawning_ms: f64,
    /// Lateral displacement when a diver rams the ship
    pub ram_knockback: f32,
    /// Displacement away from a big alien on contact
    pub bump_knockback: f32,
    /// Damage stages dealt back to a big alien on contact
    pub contact_damage_to_alien: u8,
}

/// Barrier and mobile shield settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShieldSettings {
    pub barrier_count: u32,
    pub barrier_size: Vec2,
    /// Distance of the barrier row above the bottom of the field
    pub barrier_offset: f32,
    /// No-hit time before one stage heals
    pub regen_ms: f64,
    pub respawn: bool,
    pub respawn_ms: f64,
    pub mobile_size: Vec2,
    /// Mobile shield hover height above its player
    pub mobile_offset: f32,
    pub mobile_cooldown_ms: f64,
    pub mobile_cap: u32,
}

/// Power-up settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerUpSettings {
    pub size: Vec2,
    pub drift_speed: f32,
    pub inventory_cap: u32,
    pub inventory_cap_hard: u32,
    pub squadron_cap: u32,
    pub squadron_cap_hard: u32,
    pub squadron_size: Vec2,
    /// Horizontal distance of a wingman from its player
    pub squadron_offset: f32,
    pub squadron_hits: u8,
    pub squadron_damaged_at: u8,
    pub squadron_bullet_cap: u32,
    pub nanite_cap: u32,
    pub nanite_pulses: u32,
    pub nanite_interval_ms: f64,
    pub nanite_heal: i32,
    pub shockwave_max_radius: f32,
    pub shockwave_speed: f32,
}

/// Composition of one wave
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct WaveDescriptor {
    /// Fleet rows of tier-1 aliens
    pub rows_level1: u32,
    /// Independent spawn counts for tiers 2..=7 (index 0 = tier 2)
    pub counts: [u32; TIER_COUNT - 1],
}

impl WaveDescriptor {
    pub const fn new(rows_level1: u32, counts: [u32; TIER_COUNT - 1]) -> Self {
        Self {
            rows_level1,
            counts,
        }
    }

    /// Count for an independent tier (2..=7); tier 1 reports its row count
    pub fn count_for_tier(&self, tier: u8) -> u32 {
        match tier {
            1 => self.rows_level1,
            2..=7 => self.counts[(tier - 2) as usize],
            _ => 0,
        }
    }
}

/// Base game settings (the baseline every scaled value is derived from)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Field ===
    pub field_width: f32,
    pub field_height: f32,

    // === Aliens ===
    /// Per-tier stats (index = tier - 1)
    pub tiers: [TierStats; TIER_COUNT],
    /// Downward creep of the fleet (pixels/second)
    pub fleet_drop_speed: f32,
    /// Fleet entry speed while warping in from above
    pub fleet_warp_speed: f32,
    pub fleet_top_margin: f32,
    pub fleet_row_spacing: f32,
    pub fleet_column_spacing: f32,
    pub fleet_side_margin: f32,
    pub zigzag_amplitude: f32,
    pub zigzag_frequency: f32,
    pub drift_change_ms: f64,
    /// Diver speed factors, one picked at spawn
    pub diver_speed_factors: Vec<f32>,
    /// Horizontal tracking speed of targeting tiers
    pub tracking_speed: f32,
    pub minions: MinionSettings,

    // === Actors ===
    pub bullets: BulletSettings,
    pub player: PlayerSettings,
    pub shields: ShieldSettings,
    pub powerups: PowerUpSettings,
    /// Spawn an escape pod when a player is eliminated
    pub escape_pods: bool,
    pub escape_pod_speed: f32,

    // === Waves ===
    pub waves: Vec<WaveDescriptor>,
}

fn tier(
    size: (f32, f32),
    speed: f32,
    fire: IntervalMs,
    bullet_cap: u32,
    spawn: IntervalMs,
    spawn_offset_ms: f64,
    spawn_margin: f32,
) -> TierStats {
    TierStats {
        size: Vec2::new(size.0, size.1),
        speed,
        fire_interval: fire,
        bullet_cap,
        spawn_interval: spawn,
        spawn_offset_ms,
        spawn_margin,
        breach_weight: 1,
        max_damage: 0,
        shield_contact_damage: 0,
        player_contact_damage: 1,
        powerup_drop_chance: 0.05,
    }
}

/// Default ten-wave table
pub fn default_waves() -> Vec<WaveDescriptor> {
    vec![
        WaveDescriptor::new(5, [0, 0, 0, 0, 0, 0]),
        WaveDescriptor::new(5, [2, 0, 0, 0, 0, 0]),
        WaveDescriptor::new(6, [3, 2, 0, 0, 0, 0]),
        WaveDescriptor::new(6, [3, 2, 2, 0, 0, 0]),
        WaveDescriptor::new(7, [4, 3, 2, 1, 0, 0]),
        WaveDescriptor::new(7, [4, 3, 3, 2, 1, 0]),
        WaveDescriptor::new(8, [5, 4, 3, 2, 1, 1]),
        WaveDescriptor::new(8, [5, 4, 4, 3, 2, 1]),
        WaveDescriptor::new(9, [6, 5, 4, 3, 2, 2]),
        WaveDescriptor::new(10, [6, 5, 5, 4, 3, 2]),
    ]
}

impl Default for Settings {
    fn default() -> Self {
        let mut tiers = [
            tier((50.0, 40.0), 90.0, IntervalMs::new(4000.0, 9000.0), 1, IntervalMs::NEVER, 0.0, 20.0),
            tier((50.0, 40.0), 70.0, IntervalMs::new(2500.0, 5000.0), 1, IntervalMs::new(3000.0, 6000.0), 2000.0, 80.0),
            tier((50.0, 45.0), 80.0, IntervalMs::new(3000.0, 6000.0), 1, IntervalMs::new(4000.0, 8000.0), 4000.0, 40.0),
            tier((45.0, 45.0), 170.0, IntervalMs::NEVER, 0, IntervalMs::new(5000.0, 9000.0), 6000.0, 30.0),
            tier((90.0, 80.0), 40.0, IntervalMs::new(1800.0, 3500.0), 2, IntervalMs::new(9000.0, 15000.0), 8000.0, 40.0),
            tier((120.0, 80.0), 35.0, IntervalMs::new(2200.0, 4000.0), 2, IntervalMs::new(12000.0, 18000.0), 10000.0, 70.0),
            tier((110.0, 100.0), 25.0, IntervalMs::NEVER, 0, IntervalMs::new(15000.0, 22000.0), 12000.0, 90.0),
        ];
        // Big tiers: staged damage, heavier breaches, contact damage
        for (i, (weight, max_damage, shield_dmg, player_dmg)) in
            [(3, 8, 2, 2), (4, 12, 3, 2), (5, 16, 4, 3)].into_iter().enumerate()
        {
            let stats = &mut tiers[4 + i];
            stats.breach_weight = weight;
            stats.max_damage = max_damage;
            stats.shield_contact_damage = shield_dmg;
            stats.player_contact_damage = player_dmg;
            stats.powerup_drop_chance = 0.35;
        }
        tiers[0].powerup_drop_chance = 0.02;
        tiers[3].player_contact_damage = 3;

        Self {
            field_width: 1260.0,
            field_height: 700.0,

            tiers,
            fleet_drop_speed: 8.0,
            fleet_warp_speed: 600.0,
            fleet_top_margin: 60.0,
            fleet_row_spacing: 55.0,
            fleet_column_spacing: 80.0,
            fleet_side_margin: 40.0,
            zigzag_amplitude: 60.0,
            zigzag_frequency: 2.0,
            drift_change_ms: 1200.0,
            diver_speed_factors: vec![0.8, 1.0, 1.2, 1.4],
            tracking_speed: 60.0,
            minions: MinionSettings {
                size: Vec2::new(30.0, 30.0),
                fire_interval: IntervalMs::new(2500.0, 4500.0),
                bullet_cap: 1,
                score_tier: 2,
                gap: 5.0,
                rows_per_mode: [0, 1, 2, 3],
                columns: 2,
                first_wave: 7,
            },

            bullets: BulletSettings {
                player_speed: 600.0,
                alien_speed: 250.0,
                player_size: Vec2::new(4.0, 14.0),
                alien_size: Vec2::new(6.0, 14.0),
                plasma_knockback: 40.0,
                wing_knockback: 50.0,
            },
            player: PlayerSettings {
                size: Vec2::new(60.0, 50.0),
                speed: 300.0,
                max_health: 3,
                lives: 3,
                fire_cooldown_ms: 250.0,
                level_thresholds: [
                    0, 500, 1500, 3000, 5000, 8000, 12000, 17000, 23000, 30000, 40000, 55000,
                ],
                bullet_caps: [2, 2, 3, 3, 3, 4, 4, 5, 5, 6, 6, 7],
                between_lives_ms: 1500.0,
                respawning_ms: 2000.0,
                ram_knockback: 60.0,
                bump_knockback: 70.0,
                contact_damage_to_alien: 5,
            },
            shields: ShieldSettings {
                barrier_count: 3,
                barrier_size: Vec2::new(120.0, 20.0),
                barrier_offset: 160.0,
                regen_ms: 4000.0,
                respawn: true,
                respawn_ms: 10000.0,
                mobile_size: Vec2::new(80.0, 14.0),
                mobile_offset: 30.0,
                mobile_cooldown_ms: 8000.0,
                mobile_cap: 1,
            },
            powerups: PowerUpSettings {
                size: Vec2::new(30.0, 30.0),
                drift_speed: 80.0,
                inventory_cap: 3,
                inventory_cap_hard: 6,
                squadron_cap: 2,
                squadron_cap_hard: 4,
                squadron_size: Vec2::new(30.0, 26.0),
                squadron_offset: 60.0,
                squadron_hits: 3,
                squadron_damaged_at: 2,
                squadron_bullet_cap: 2,
                nanite_cap: 1,
                nanite_pulses: 3,
                nanite_interval_ms: 1500.0,
                nanite_heal: 1,
                shockwave_max_radius: 220.0,
                shockwave_speed: 400.0,
            },
            escape_pods: true,
            escape_pod_speed: 120.0,

            waves: default_waves(),
        }
    }
}

impl Settings {
    /// Stats for a tier (1..=7); out-of-range tiers clamp
    pub fn tier(&self, tier: u8) -> &TierStats {
        let idx = (tier.clamp(1, TIER_COUNT as u8) - 1) as usize;
        &self.tiers[idx]
    }

    /// Pickup inventory cap for a mode
    pub fn inventory_cap(&self, mode: DifficultyMode) -> u32 {
        if mode.is_hard() {
            self.powerups.inventory_cap_hard
        } else {
            self.powerups.inventory_cap
        }
    }

    /// Squadron cap per player for a mode
    pub fn squadron_cap(&self, mode: DifficultyMode) -> u32 {
        if mode.is_hard() {
            self.powerups.squadron_cap_hard
        } else {
            self.powerups.squadron_cap
        }
    }

    /// Wave descriptor for an index, `None` past the end of the table
    pub fn wave(&self, index: u32) -> Option<&WaveDescriptor> {
        self.waves.get(index as usize)
    }

    /// Parse settings from JSON and validate them
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, SimError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read settings from a JSON file
    pub fn load(path: &Path) -> Result<Self, SimError> {
        let json = std::fs::read_to_string(path).map_err(|source| SimError::SettingsIo {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Read settings from a JSON file, falling back to defaults on any error
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(err) => {
                log::warn!("{err}; using default settings");
                Self::default()
            }
        }
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), SimError> {
        fn invalid(name: &'static str, reason: impl Into<String>) -> SimError {
            SimError::InvalidSetting {
                name,
                reason: reason.into(),
            }
        }

        if self.field_width <= 0.0 || self.field_height <= 0.0 {
            return Err(invalid("field", "dimensions must be positive"));
        }
        if self.waves.is_empty() {
            return Err(invalid("waves", "wave table must not be empty"));
        }
        for (i, stats) in self.tiers.iter().enumerate() {
            for window in [stats.fire_interval, stats.spawn_interval] {
                if window.min < 0.0 || window.min > window.max {
                    return Err(invalid(
                        "tiers",
                        format!("tier {} has an interval with min > max", i + 1),
                    ));
                }
            }
            if stats.size.x <= 0.0 || stats.size.y <= 0.0 {
                return Err(invalid("tiers", format!("tier {} has an empty sprite", i + 1)));
            }
            if stats.size.x + 2.0 * stats.spawn_margin > self.field_width {
                return Err(invalid(
                    "tiers",
                    format!("tier {} spawn margin leaves no room to spawn", i + 1),
                ));
            }
        }
        if self.diver_speed_factors.is_empty() {
            return Err(invalid("diver_speed_factors", "must list at least one factor"));
        }
        if !self
            .player
            .level_thresholds
            .windows(2)
            .all(|w| w[0] <= w[1])
        {
            return Err(invalid("player.level_thresholds", "must be ascending"));
        }
        if self.player.max_health <= 0 {
            return Err(invalid("player.max_health", "must be positive"));
        }
        if self.powerups.squadron_damaged_at > self.powerups.squadron_hits {
            return Err(invalid("powerups.squadron_damaged_at", "exceeds squadron_hits"));
        }
        Ok(())
    }
}
