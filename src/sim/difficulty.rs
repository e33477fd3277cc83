//! Difficulty scaling
//!
//! Derives the effective speeds, fire intervals, spawn intervals and fleet
//! row counts for a wave. Two axes compose multiplicatively:
//! - the difficulty mode, fixed for the run
//! - the wave index, re-applied every wave
//!
//! Both are always applied to the [`Settings`] baseline, never to the output
//! of a previous wave, so repeated transitions cannot drift.

use serde::{Deserialize, Serialize};

use super::entities::AlienTier;
use crate::consts::TIER_COUNT;
use crate::settings::{DifficultyMode, IntervalMs, Settings};

/// Speed gain per wave index
pub const WAVE_SPEED_STEP: f32 = 0.06;
/// Speed multiplier ceiling
pub const WAVE_SPEED_CEILING: f32 = 2.0;
/// Spawn interval reduction per wave index
pub const WAVE_SPAWN_STEP: f64 = 0.05;
/// Spawn interval multiplier floor
pub const WAVE_SPAWN_FLOOR: f64 = 0.4;
/// Fire interval reduction per wave index
pub const WAVE_FIRE_STEP: f64 = 0.05;
/// Fire interval multiplier floor
pub const WAVE_FIRE_FLOOR: f64 = 0.4;
/// Spawn interval shortening per extra player
pub const PLAYER_SPAWN_STEP: f64 = 0.2;

/// Wave-index multipliers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveMultipliers {
    pub speed: f32,
    pub spawn_interval: f64,
    pub fire_interval: f64,
}

impl WaveMultipliers {
    pub fn for_wave(wave_index: u32) -> Self {
        let w = wave_index as f32;
        Self {
            speed: (1.0 + WAVE_SPEED_STEP * w).min(WAVE_SPEED_CEILING),
            spawn_interval: (1.0 - WAVE_SPAWN_STEP * w as f64).max(WAVE_SPAWN_FLOOR),
            fire_interval: (1.0 - WAVE_FIRE_STEP * w as f64).max(WAVE_FIRE_FLOOR),
        }
    }
}

/// Effective per-wave values, recomputed from the baseline each wave
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyModifiers {
    pub mode: DifficultyMode,
    pub wave_index: u32,
    pub player_count: usize,
    /// Movement speed per tier (index = tier - 1)
    pub speed: [f32; TIER_COUNT],
    /// Fire interval window per tier
    pub fire_interval: [IntervalMs; TIER_COUNT],
    /// Independent spawn interval window per tier
    pub spawn_interval: [IntervalMs; TIER_COUNT],
    pub minion_fire_interval: IntervalMs,
    /// Scaled fleet creep
    pub fleet_drop_speed: f32,
    /// Combined speed multiplier, for entities without a tier
    pub speed_multiplier: f32,
}

impl DifficultyModifiers {
    /// Scale the baseline for a wave
    pub fn compute(
        settings: &Settings,
        mode: DifficultyMode,
        wave_index: u32,
        player_count: usize,
    ) -> Self {
        let wave = WaveMultipliers::for_wave(wave_index);
        let speed_multiplier = mode.speed_factor() * wave.speed;
        let fire_multiplier = mode.fire_interval_factor() * wave.fire_interval;
        let players = player_count.max(1) as f64;
        let spawn_multiplier = mode.spawn_interval_factor() * wave.spawn_interval
            / (1.0 + PLAYER_SPAWN_STEP * (players - 1.0));

        let speed = std::array::from_fn(|i| settings.tiers[i].speed * speed_multiplier);
        let fire_interval =
            std::array::from_fn(|i| settings.tiers[i].fire_interval.scaled(fire_multiplier));
        let spawn_interval =
            std::array::from_fn(|i| settings.tiers[i].spawn_interval.scaled(spawn_multiplier));

        Self {
            mode,
            wave_index,
            player_count,
            speed,
            fire_interval,
            spawn_interval,
            minion_fire_interval: settings.minions.fire_interval.scaled(fire_multiplier),
            fleet_drop_speed: settings.fleet_drop_speed * speed_multiplier,
            speed_multiplier,
        }
    }

    pub fn speed_for(&self, tier: AlienTier) -> f32 {
        self.speed[tier.level() as usize - 1]
    }

    pub fn fire_interval_for(&self, tier: AlienTier) -> IntervalMs {
        self.fire_interval[tier.level() as usize - 1]
    }

    pub fn spawn_interval_for(&self, tier: AlienTier) -> IntervalMs {
        self.spawn_interval[tier.level() as usize - 1]
    }

    /// Fleet rows for a wave's base row count
    pub fn fleet_rows(&self, base_rows: u32) -> u32 {
        if base_rows == 0 {
            return 0;
        }
        let scaled = (base_rows as f32 * self.mode.row_factor()).round() as u32;
        scaled.max(1) + (self.player_count.max(1) as u32 - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::{GameState, StartConfig};
    use crate::sim::waves::start_wave;
    use proptest::prelude::*;

    #[test]
    fn test_wave_zero_is_mode_only() {
        let settings = Settings::default();
        let mods = DifficultyModifiers::compute(&settings, DifficultyMode::Normal, 0, 1);
        let expected = settings.tiers[1].speed * DifficultyMode::Normal.speed_factor();
        assert!((mods.speed_for(AlienTier::Zigzag) - expected).abs() < 1e-4);
    }

    #[test]
    fn test_wave_multipliers_clamp() {
        let m = WaveMultipliers::for_wave(100);
        assert_eq!(m.speed, WAVE_SPEED_CEILING);
        assert_eq!(m.spawn_interval, WAVE_SPAWN_FLOOR);
        assert_eq!(m.fire_interval, WAVE_FIRE_FLOOR);

        let m = WaveMultipliers::for_wave(5);
        assert!((m.speed - 1.3).abs() < 1e-5);
        assert!((m.spawn_interval - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_easy_modes_are_slower() {
        let settings = Settings::default();
        let kiddie = DifficultyModifiers::compute(&settings, DifficultyMode::Kiddie, 3, 1);
        let easy = DifficultyModifiers::compute(&settings, DifficultyMode::Easy, 3, 1);
        let normal = DifficultyModifiers::compute(&settings, DifficultyMode::Normal, 3, 1);
        let hard = DifficultyModifiers::compute(&settings, DifficultyMode::Hard, 3, 1);

        let tier = AlienTier::Destroyer;
        assert!(kiddie.speed_for(tier) < easy.speed_for(tier));
        assert!(easy.speed_for(tier) < normal.speed_for(tier));
        assert!(normal.speed_for(tier) < hard.speed_for(tier));
        assert!(kiddie.fire_interval_for(tier).min > hard.fire_interval_for(tier).min);
    }

    #[test]
    fn test_more_players_spawn_faster_and_add_rows() {
        let settings = Settings::default();
        let solo = DifficultyModifiers::compute(&settings, DifficultyMode::Normal, 2, 1);
        let duo = DifficultyModifiers::compute(&settings, DifficultyMode::Normal, 2, 2);
        assert!(duo.spawn_interval_for(AlienTier::Zigzag).max < solo.spawn_interval_for(AlienTier::Zigzag).max);
        assert_eq!(solo.fleet_rows(5), 5);
        assert_eq!(duo.fleet_rows(5), 6);
    }

    #[test]
    fn test_fleet_rows_by_mode() {
        let settings = Settings::default();
        let rows = |mode| DifficultyModifiers::compute(&settings, mode, 0, 1).fleet_rows(5);
        assert_eq!(rows(DifficultyMode::Kiddie), 3);
        assert_eq!(rows(DifficultyMode::Easy), 4);
        assert_eq!(rows(DifficultyMode::Normal), 5);
        assert_eq!(rows(DifficultyMode::Hard), 6);
        let none = DifficultyModifiers::compute(&settings, DifficultyMode::Hard, 0, 3);
        assert_eq!(none.fleet_rows(0), 0);
    }

    proptest! {
        #[test]
        fn prop_scaling_never_compounds(
            waves in proptest::collection::vec(0u32..10, 1..20),
            target in 0u32..10,
            mode_index in 0usize..4,
            players in 1usize..=3,
        ) {
            // Visiting any sequence of waves first must not change the result
            let mode = DifficultyMode::ALL[mode_index];
            let mut state = GameState::new(Settings::default(), 11);
            state
                .start(StartConfig {
                    player_count: players,
                    difficulty: mode,
                    ..Default::default()
                })
                .unwrap();
            let baseline = serde_json::to_value(&state.settings).unwrap();

            for w in waves {
                start_wave(&mut state, w);
            }
            start_wave(&mut state, target);

            prop_assert!(!state.phase.is_terminal());
            prop_assert_eq!(
                state.modifiers,
                DifficultyModifiers::compute(&Settings::default(), mode, target, players)
            );
            prop_assert_eq!(serde_json::to_value(&state.settings).unwrap(), baseline);
        }

        #[test]
        fn prop_intervals_stay_above_floor(wave in 0u32..1000) {
            let settings = Settings::default();
            let mods = DifficultyModifiers::compute(&settings, DifficultyMode::Normal, wave, 1);
            for tier in AlienTier::INDEPENDENT {
                let base = settings.tier(tier.level()).spawn_interval;
                let scaled = mods.spawn_interval_for(tier);
                prop_assert!(scaled.min >= base.min * WAVE_SPAWN_FLOOR * 0.95 - 1e-6);
            }
        }
    }
}
