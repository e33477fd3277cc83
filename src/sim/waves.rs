//! Wave scheduling
//!
//! Spawns each wave's tier-1 fleet rows and arms the independent timers for
//! tiers 2-7. Independent spawns keep coming for as long as fleet rows are
//! still waiting to be dispatched; the per-tier `remaining` counters are
//! reported but do not gate anything.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;

use super::difficulty::DifficultyModifiers;
use super::entities::{Alien, AlienTier, Minion, Movement};
use super::events::GameEvent;
use super::pool::Handle;
use super::state::{GamePhase, GameState};
use crate::Settings;
use crate::consts::{FLEET_ROW_CADENCE_MS, MAX_VISIBLE_ROWS, REINFORCEMENT_MARGIN, TIER_COUNT};
use crate::settings::{IntervalMs, WaveDescriptor};

/// Share of the field width a fleet row may span
const FLEET_WIDTH_FRACTION: f32 = 0.7;

/// Spawn bookkeeping for the current wave
#[derive(Debug, Clone, Default)]
pub struct WaveScheduler {
    pub wave_index: u32,
    pub descriptor: WaveDescriptor,
    /// Fleet rows for this wave after difficulty scaling
    pub rows_total: u32,
    /// Fleet rows not yet dispatched
    pub rows_remaining: u32,
    pub rows_spawned: u32,
    /// Tier 2-7 aliens spawned so far this wave
    pub independent_spawned: u32,
    /// Game time of the last fleet row
    pub last_row_spawn: f64,
    /// Next spawn time per tier (index = tier - 1); `None` = never
    pub next_spawn: [Option<f64>; TIER_COUNT],
    /// Descriptor counts per tier, never decremented
    pub remaining: [u32; TIER_COUNT],
}

impl WaveScheduler {
    /// Every fleet row dispatched and the field is clear
    pub fn wave_finished(&self, live_aliens: usize) -> bool {
        self.rows_remaining == 0 && live_aliens == 0
    }

    fn should_spawn(&self, tier: AlienTier, now: f64) -> bool {
        self.descriptor.count_for_tier(tier.level()) > 0
            && self.rows_remaining > 0
            && self.next_spawn[tier.level() as usize - 1].is_some_and(|t| now >= t)
    }
}

/// Draw a delay uniformly from a window
pub fn roll_interval(rng: &mut Pcg32, window: IntervalMs) -> f64 {
    if window.max <= window.min {
        window.min
    } else {
        rng.random_range(window.min..window.max)
    }
}

/// Number of aliens in one fleet row
pub fn fleet_columns(field_width: f32, alien_width: f32, spacing: f32) -> u32 {
    let span = field_width * FLEET_WIDTH_FRACTION - alien_width;
    if span <= 0.0 || spacing <= 0.0 {
        return 1;
    }
    (span / spacing).floor() as u32 + 1
}

/// Begin a wave; running past the end of the table is a victory
pub fn start_wave(state: &mut GameState, wave_index: u32) {
    let Some(descriptor) = state.settings.wave(wave_index).copied() else {
        log::info!("Wave {} is past the table", wave_index + 1);
        state.declare_victory();
        return;
    };

    state.wave_index = wave_index;
    state.modifiers = DifficultyModifiers::compute(
        &state.settings,
        state.difficulty(),
        wave_index,
        state.player_count(),
    );
    state.defense.reset_for_wave(wave_index);

    let now = state.now();
    let rows_total = state.modifiers.fleet_rows(descriptor.rows_level1);
    let mut next_spawn = [None; TIER_COUNT];
    let mut remaining = [0; TIER_COUNT];
    remaining[0] = rows_total;
    for tier in AlienTier::INDEPENDENT {
        let idx = tier.level() as usize - 1;
        let count = descriptor.count_for_tier(tier.level());
        remaining[idx] = count;
        if count > 0 && !state.modifiers.spawn_interval[idx].is_never() {
            next_spawn[idx] = Some(now + state.settings.tiers[idx].spawn_offset_ms);
        }
    }

    state.scheduler = WaveScheduler {
        wave_index,
        descriptor,
        rows_total,
        rows_remaining: rows_total,
        rows_spawned: 0,
        independent_spawned: 0,
        last_row_spawn: now,
        next_spawn,
        remaining,
    };

    // Initial rows warp in from above to their resting rows
    let initial = rows_total.min(MAX_VISIBLE_ROWS);
    let top = state.settings.fleet_top_margin;
    let spacing = state.settings.fleet_row_spacing;
    let lift = top + initial as f32 * spacing;
    for k in 0..initial {
        let rest_y = top + k as f32 * spacing;
        spawn_fleet_row(state, None, rest_y - lift, rest_y);
    }

    state.entities.fleet_direction = 1.0;
    state.phase = GamePhase::Playing;
    state.emit(GameEvent::WaveStart(wave_index));
    log::info!(
        "Wave {} started: {} fleet rows, independent counts {:?}, tolerance {}",
        wave_index + 1,
        rows_total,
        descriptor.counts,
        state.defense.max_breach_tolerance
    );
}

/// Column count and total width of one fleet row
fn fleet_row_extent(settings: &Settings) -> (u32, f32) {
    let size = settings.tier(AlienTier::Fleet.level()).size;
    let spacing = settings.fleet_column_spacing;
    let columns = fleet_columns(settings.field_width, size.x, spacing);
    (columns, (columns - 1) as f32 * spacing + size.x)
}

/// Spawn one fleet row starting at `left`, or centered when `None`
fn spawn_fleet_row(state: &mut GameState, left: Option<f32>, y: f32, rest_y: f32) {
    let size = state.settings.tier(AlienTier::Fleet.level()).size;
    let spacing = state.settings.fleet_column_spacing;
    let (columns, row_width) = fleet_row_extent(&state.settings);
    let max_x0 = (state.settings.field_width - row_width).max(0.0);
    let x0 = left.map_or(max_x0 / 2.0, |x| x.clamp(0.0, max_x0));
    let fire_window = state.modifiers.fire_interval_for(AlienTier::Fleet);
    let now = state.now();

    for c in 0..columns {
        let fire_timer = now + roll_interval(&mut state.rng, fire_window);
        state.entities.spawn(Alien {
            tier: AlienTier::Fleet,
            pos: Vec2::new(x0 + c as f32 * spacing, y),
            size,
            movement: Movement::Fleet,
            entry_target_y: Some(rest_y),
            damage_stage: 0,
            max_damage: 0,
            fire_timer,
            target_player: None,
        });
    }

    let sched = &mut state.scheduler;
    sched.rows_remaining = sched.rows_remaining.saturating_sub(1);
    sched.rows_spawned += 1;
    sched.last_row_spawn = now;
    log::debug!(
        "Fleet row {}/{} spawned ({} columns)",
        sched.rows_spawned,
        sched.rows_total,
        columns
    );
}

/// Per-tick spawning while playing
pub fn update_spawns(state: &mut GameState) {
    spawn_reinforcements(state);

    let now = state.now();
    for tier in AlienTier::INDEPENDENT {
        if !state.scheduler.should_spawn(tier, now) {
            continue;
        }
        let idx = tier.level() as usize - 1;
        spawn_independent(state, tier);
        let delay = roll_interval(&mut state.rng, state.modifiers.spawn_interval[idx]);
        state.scheduler.next_spawn[idx] = Some(now + delay);
        state.scheduler.independent_spawned += 1;
    }
}

fn spawn_reinforcements(state: &mut GameState) {
    let sched = &state.scheduler;
    if sched.rows_remaining == 0 || state.now() - sched.last_row_spawn < FLEET_ROW_CADENCE_MS {
        return;
    }

    let height = state.settings.tier(AlienTier::Fleet.level()).size.y;
    // Top edge and left edge of the current fleet
    let extent = state
        .entities
        .aliens
        .values()
        .filter(|a| a.tier == AlienTier::Fleet)
        .map(|a| (a.pos.y, a.pos.x))
        .reduce(|(top, left), (y, x)| (top.min(y), left.min(x)));

    let (rest_y, left) = match extent {
        Some((top, left)) if top > height + REINFORCEMENT_MARGIN => {
            (top - state.settings.fleet_row_spacing, Some(left))
        }
        Some(_) => return,
        None => (state.settings.fleet_top_margin, None),
    };
    spawn_fleet_row(state, left, -height, rest_y);
}

fn spawn_independent(state: &mut GameState, tier: AlienTier) {
    let stats = state.settings.tier(tier.level()).clone();
    let now = state.now();
    let width = state.settings.field_width;
    let lo = stats.spawn_margin;
    let hi = (width - stats.spawn_margin - stats.size.x).max(lo);
    let x = if hi > lo {
        state.rng.random_range(lo..hi)
    } else {
        lo
    };
    let pos = Vec2::new(x, -stats.size.y);

    let movement = match tier {
        AlienTier::Fleet => Movement::Fleet,
        AlienTier::Zigzag => Movement::Zigzag {
            base_x: x,
            phase: state.rng.random_range(0.0..TAU),
        },
        AlienTier::Drifter => Movement::Drift {
            dir: random_drift(&mut state.rng),
            next_change: now + state.settings.drift_change_ms,
        },
        AlienTier::Diver => {
            let factors = &state.settings.diver_speed_factors;
            let speed_factor = if factors.is_empty() {
                1.0
            } else {
                factors[state.rng.random_range(0..factors.len())]
            };
            Movement::Dive { speed_factor }
        }
        AlienTier::Destroyer | AlienTier::Cruiser | AlienTier::Tanker => Movement::Heavy,
    };

    let target_player = match tier {
        AlienTier::Destroyer | AlienTier::Cruiser => {
            state.entities.nearest_player(pos + stats.size / 2.0)
        }
        _ => None,
    };

    let fire_window = state.modifiers.fire_interval_for(tier);
    let fire_timer = now + roll_interval(&mut state.rng, fire_window);
    let handle = state.entities.spawn(Alien {
        tier,
        pos,
        size: stats.size,
        movement,
        entry_target_y: None,
        damage_stage: 0,
        max_damage: stats.max_damage,
        fire_timer,
        target_player,
    });
    log::debug!("Spawned {} at x={x:.0}", tier.name());

    if tier == AlienTier::Tanker {
        spawn_minions(state, handle);
    }
}

/// Random downward-leaning drift direction
pub fn random_drift(rng: &mut Pcg32) -> Vec2 {
    let angle: f32 = rng.random_range(0.15 * TAU..0.35 * TAU);
    Vec2::new(angle.cos(), angle.sin())
}

/// Tethered escort grid for a freshly spawned tanker
fn spawn_minions(state: &mut GameState, owner: Handle<Alien>) {
    let mode = state.difficulty();
    let ms = &state.settings.minions;
    if state.wave_index < ms.first_wave || mode.is_easiest() {
        return;
    }
    let Some(tanker) = state.entities.get(owner) else {
        return;
    };
    let (owner_pos, owner_w) = (tanker.pos, tanker.size.x);
    let rows = ms.rows_per_mode[mode.index()];
    let size = ms.size;
    let gap = ms.gap;
    let columns = ms.columns;
    let now = state.now();

    let mut deployed = 0;
    for row in 0..rows {
        for col in 0..columns {
            // Even columns flank the left side, odd columns the right
            let x = if col % 2 == 0 {
                -(size.x + gap) - (col / 2) as f32 * (size.x + gap)
            } else {
                owner_w + gap + (col / 2) as f32 * (size.x + gap)
            };
            let offset = Vec2::new(x, row as f32 * (size.y + gap));
            let fire_timer = now + roll_interval(&mut state.rng, state.modifiers.minion_fire_interval);
            state.entities.spawn(Minion {
                owner,
                offset,
                pos: owner_pos + offset,
                size,
                fire_timer,
            });
            deployed += 1;
        }
    }
    if deployed > 0 {
        state.emit(GameEvent::MinionsDeployed(deployed));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{DifficultyMode, Settings};
    use crate::sim::state::StartConfig;

    fn playing(wave: u32, mode: DifficultyMode) -> GameState {
        let mut state = GameState::new(Settings::default(), 42);
        state
            .start(StartConfig {
                starting_wave: wave,
                difficulty: mode,
                ..Default::default()
            })
            .unwrap();
        start_wave(&mut state, wave);
        state
    }

    #[test]
    fn test_fleet_columns() {
        assert_eq!(fleet_columns(1260.0, 50.0, 80.0), 11);
        assert_eq!(fleet_columns(10.0, 50.0, 80.0), 1);
    }

    #[test]
    fn test_first_wave_caps_visible_rows() {
        let state = playing(0, DifficultyMode::Normal);
        let columns = fleet_columns(1260.0, 50.0, 80.0) as usize;

        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.scheduler.rows_total, 5);
        assert_eq!(state.scheduler.rows_spawned, 3);
        assert_eq!(state.scheduler.rows_remaining, 2);
        assert_eq!(state.entities.aliens.len(), 3 * columns);
        assert!(state.entities.aliens.values().all(|a| a.pos.y < 0.0));
        assert!(state.scheduler.next_spawn.iter().all(Option::is_none));
    }

    #[test]
    fn test_start_past_table_is_victory() {
        let mut state = playing(0, DifficultyMode::Normal);
        start_wave(&mut state, 10);
        assert_eq!(state.phase, GamePhase::Victory);
    }

    #[test]
    fn test_wave_start_resets_defense() {
        let mut state = playing(0, DifficultyMode::Normal);
        state.defense.record_breach(2);
        start_wave(&mut state, 4);
        assert_eq!(state.defense.breaches_this_wave, 0);
        assert_eq!(state.defense.max_breach_tolerance, 6);
    }

    #[test]
    fn test_reinforcement_waits_for_room_and_cadence() {
        let mut state = playing(0, DifficultyMode::Normal);

        // Rows still above the threshold block the next row
        state.clock_ms += FLEET_ROW_CADENCE_MS;
        update_spawns(&mut state);
        assert_eq!(state.scheduler.rows_spawned, 3);

        // Settle the fleet low enough; cadence not yet elapsed
        for (_, alien) in state.entities.aliens.iter_mut() {
            alien.pos.y = 200.0;
            alien.entry_target_y = None;
        }
        state.scheduler.last_row_spawn = state.clock_ms;
        update_spawns(&mut state);
        assert_eq!(state.scheduler.rows_spawned, 3);

        state.clock_ms += FLEET_ROW_CADENCE_MS;
        update_spawns(&mut state);
        assert_eq!(state.scheduler.rows_spawned, 4);
        assert_eq!(state.scheduler.rows_remaining, 1);
    }

    #[test]
    fn test_reinforcement_row_lines_up_with_fleet() {
        let mut state = playing(0, DifficultyMode::Normal);
        let centered_left = state
            .entities
            .aliens
            .values()
            .map(|a| a.pos.x)
            .fold(f32::INFINITY, f32::min);

        // Fleet has marched right and settled low
        for (_, alien) in state.entities.aliens.iter_mut() {
            alien.pos.x += 120.0;
            alien.pos.y = 200.0;
            alien.entry_target_y = None;
        }
        let before = state.entities.aliens.handles();
        state.clock_ms += FLEET_ROW_CADENCE_MS;
        update_spawns(&mut state);
        assert_eq!(state.scheduler.rows_spawned, 4);

        let new_row: Vec<f32> = state
            .entities
            .aliens
            .iter()
            .filter(|(h, _)| !before.contains(h))
            .map(|(_, a)| a.pos.x)
            .collect();
        let new_left = new_row.iter().copied().fold(f32::INFINITY, f32::min);
        assert_eq!(new_row.len(), fleet_columns(1260.0, 50.0, 80.0) as usize);
        assert_eq!(new_left, centered_left + 120.0);
    }

    #[test]
    fn test_reinforcement_row_stays_in_field() {
        let mut state = playing(0, DifficultyMode::Normal);
        for (_, alien) in state.entities.aliens.iter_mut() {
            alien.pos.x += 2000.0;
            alien.pos.y = 200.0;
            alien.entry_target_y = None;
        }
        let before = state.entities.aliens.handles();
        state.clock_ms += FLEET_ROW_CADENCE_MS;
        update_spawns(&mut state);

        let (_, row_width) = fleet_row_extent(&state.settings);
        let width = state.settings.field_width;
        let new_row: Vec<_> = state
            .entities
            .aliens
            .iter()
            .filter(|(h, _)| !before.contains(h))
            .map(|(_, a)| a.rect())
            .collect();
        assert!(!new_row.is_empty());
        let left = new_row.iter().map(|r| r.x).fold(f32::INFINITY, f32::min);
        assert_eq!(left, width - row_width);
        assert!(new_row.iter().all(|r| r.x + r.w <= width));
    }

    #[test]
    fn test_independent_spawns_follow_offset() {
        let mut state = playing(1, DifficultyMode::Normal);
        let offset = state.settings.tier(2).spawn_offset_ms;

        update_spawns(&mut state);
        assert_eq!(state.scheduler.independent_spawned, 0);

        state.clock_ms += offset;
        update_spawns(&mut state);
        assert_eq!(state.scheduler.independent_spawned, 1);
        assert_eq!(
            state.entities.count_where::<Alien>(|a| a.tier == AlienTier::Zigzag),
            1
        );
        // Remaining counters are reported, never decremented
        assert_eq!(state.scheduler.remaining[1], 2);
    }

    #[test]
    fn test_independent_spawns_stop_with_fleet_rows() {
        let mut state = playing(1, DifficultyMode::Normal);
        state.scheduler.rows_remaining = 0;
        state.clock_ms += 60_000.0;
        update_spawns(&mut state);
        assert_eq!(state.scheduler.independent_spawned, 0);
    }

    #[test]
    fn test_spawns_repeat_past_descriptor_count() {
        let mut state = playing(1, DifficultyMode::Normal);
        // Keep the fleet from dispatching so gating stays open
        state.scheduler.rows_remaining = 5;
        state.scheduler.last_row_spawn = f64::INFINITY;
        for _ in 0..20 {
            state.clock_ms += 10_000.0;
            update_spawns(&mut state);
        }
        assert!(state.scheduler.independent_spawned > 2);
    }

    #[test]
    fn test_tanker_minions_by_mode() {
        let minions_for = |mode| {
            let mut state = playing(7, mode);
            state.scheduler.rows_remaining = 1;
            spawn_independent(&mut state, AlienTier::Tanker);
            state.entities.minions.len()
        };
        assert_eq!(minions_for(DifficultyMode::Kiddie), 0);
        assert_eq!(minions_for(DifficultyMode::Easy), 2);
        assert_eq!(minions_for(DifficultyMode::Normal), 4);
        assert_eq!(minions_for(DifficultyMode::Hard), 6);
    }

    #[test]
    fn test_no_minions_before_first_wave() {
        let mut state = playing(6, DifficultyMode::Hard);
        spawn_independent(&mut state, AlienTier::Tanker);
        assert!(state.entities.minions.is_empty());
    }

    #[test]
    fn test_minions_flank_tanker() {
        let mut state = playing(7, DifficultyMode::Normal);
        spawn_independent(&mut state, AlienTier::Tanker);
        let tanker = state
            .entities
            .aliens
            .values()
            .find(|a| a.tier == AlienTier::Tanker)
            .map(|a| a.rect())
            .unwrap();
        for minion in state.entities.minions.values() {
            assert!(!minion.rect().intersects(&tanker));
        }
    }

    #[test]
    fn test_targeting_tiers_pick_a_player() {
        let mut state = playing(5, DifficultyMode::Normal);
        spawn_independent(&mut state, AlienTier::Cruiser);
        let cruiser = state
            .entities
            .aliens
            .values()
            .find(|a| a.tier == AlienTier::Cruiser)
            .unwrap();
        assert!(cruiser.target_player.is_some());
    }
}
