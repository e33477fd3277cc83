//! Fixed timestep simulation tick
//!
//! Core game loop that advances the simulation deterministically. One tick
//! runs, in order: input, movement, wave spawning, collisions, breach
//! accounting, then state transitions.

use super::breach::account_breaches;
use super::collision::resolve_collisions;
use super::entities::{Alien, AlienTier, PlayerStatus, PowerUpKind};
use super::events::GameEvent;
use super::movement::{update_auxiliaries, update_movement, update_players, update_projectiles, update_shields};
use super::state::{BannerPhase, GamePhase, GameState};
use super::waves::{start_wave, update_spawns};
use crate::consts::*;
use crate::{dt_to_ms, progress};

/// Controls for one ship during a single tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerInput {
    /// Horizontal axis, -1 (left) to 1 (right)
    pub move_x: f32,
    /// Vertical axis, -1 (up) to 1 (down)
    pub move_y: f32,
    pub fire: bool,
    pub deploy_shield: bool,
    /// Spend one held pickup of this kind
    pub use_powerup: Option<PowerUpKind>,
}

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Pause toggle
    pub pause: bool,
    /// Per-seat controls, indexed by player index
    pub players: Vec<PlayerInput>,
    /// Demo mode - the autopilot flies every ship
    pub autopilot: bool,
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    if input.pause {
        toggle_pause(state);
        if state.is_paused() {
            return;
        }
    }

    // Paused, menu and terminal phases freeze the clock
    if !state.phase.clock_runs() {
        return;
    }
    state.clock_ms += dt_to_ms(dt);
    state.time_ticks += 1;

    let mut input = input.clone();
    if input.autopilot {
        input.players = autopilot_inputs(state);
    }

    match state.phase.clone() {
        GamePhase::Countdown { ends_at, cues } => update_countdown(state, ends_at, cues),
        GamePhase::Playing => update_playing(state, &input, dt),
        GamePhase::BetweenWaves {
            banner,
            started_at,
            cleared_wave,
        } => update_between_waves(state, &input, dt, banner, started_at, cleared_wave),
        _ => {}
    }
}

/// Run as many fixed steps as `frame_dt` covers, carrying the remainder.
///
/// The pause toggle is applied on the first step only. Returns the number of
/// steps taken.
pub fn step_frame(state: &mut GameState, input: &TickInput, frame_dt: f32, accumulator: &mut f32) -> u32 {
    *accumulator += frame_dt;
    let mut steps = 0;
    let mut input = input.clone();
    while *accumulator >= SIM_DT && steps < MAX_SUBSTEPS {
        tick(state, &input, SIM_DT);
        input.pause = false;
        *accumulator -= SIM_DT;
        steps += 1;
    }
    // Drop time we could not simulate instead of spiralling
    if steps == MAX_SUBSTEPS {
        *accumulator = accumulator.min(SIM_DT);
    }
    steps
}

/// Toggle between a pausable phase and `Paused`, restoring it exactly
pub fn toggle_pause(state: &mut GameState) {
    match std::mem::replace(&mut state.phase, GamePhase::StartMenu) {
        GamePhase::Paused { resume } => {
            state.phase = *resume;
            state.emit(GameEvent::Resumed);
            log::info!("Resumed ({})", state.phase.name());
        }
        phase if phase.can_pause() => {
            log::info!("Paused during {}", phase.name());
            state.phase = GamePhase::Paused {
                resume: Box::new(phase),
            };
            state.emit(GameEvent::Paused);
        }
        phase => state.phase = phase,
    }
}

fn update_countdown(state: &mut GameState, ends_at: f64, cues: u32) {
    let now = state.now();
    let started = ends_at - COUNTDOWN_MS;
    // 3, 2, 1, GO on whole-second boundaries
    let due = (((now - started) / COUNTDOWN_CUE_MS).floor() as u32 + 1).min(4);
    let mut emitted = cues;
    while emitted < due {
        state.emit(GameEvent::CountdownCue(3 - emitted));
        emitted += 1;
    }

    if now >= ends_at {
        let starting_wave = state.config.map(|c| c.starting_wave).unwrap_or(0);
        log::info!("Countdown finished");
        start_wave(state, starting_wave);
    } else {
        state.phase = GamePhase::Countdown {
            ends_at,
            cues: emitted,
        };
    }
}

fn update_playing(state: &mut GameState, input: &TickInput, dt: f32) {
    update_movement(state, input, dt);
    update_spawns(state);
    resolve_collisions(state);

    if state.entities.players.is_empty() {
        state.declare_defeat("every ship lost");
        return;
    }
    if account_breaches(state) {
        state.declare_defeat("defense breached");
        return;
    }
    if state
        .scheduler
        .wave_finished(state.entities.live_alien_count())
    {
        complete_wave(state);
    }
}

/// Close out a cleared wave: banner sequence, or victory past the table
fn complete_wave(state: &mut GameState) {
    let cleared = state.wave_index;
    state.emit(GameEvent::WaveComplete(cleared));
    log::info!(
        "Wave {} complete ({} breaches of {})",
        cleared + 1,
        state.defense.breaches_this_wave,
        state.defense.max_breach_tolerance
    );

    if state.settings.wave(cleared + 1).is_none() {
        state.declare_victory();
        return;
    }

    state.entities.clear_bullets();
    state.phase = GamePhase::BetweenWaves {
        banner: BannerPhase::WaveComplete,
        started_at: state.now(),
        cleared_wave: cleared,
    };
}

fn update_between_waves(
    state: &mut GameState,
    input: &TickInput,
    dt: f32,
    banner: BannerPhase,
    started_at: f64,
    cleared_wave: u32,
) {
    // Ships keep flying while the banner plays; nothing hostile is on the field
    update_players(state, input, dt);
    update_auxiliaries(state, dt);
    update_projectiles(state, dt);
    update_shields(state);

    let now = state.now();
    match banner {
        BannerPhase::WaveComplete => {
            if now - started_at >= BANNER_SCROLL_IN_MS + BANNER_SCROLL_OUT_MS {
                state.phase = GamePhase::BetweenWaves {
                    banner: BannerPhase::WarpingIn,
                    started_at: now,
                    cleared_wave,
                };
                state.emit(GameEvent::WarpingIn(cleared_wave + 1));
                log::debug!("Warping in wave {}", cleared_wave + 2);
            }
        }
        BannerPhase::WarpingIn => {
            if now - started_at >= WARPING_IN_MS {
                start_wave(state, cleared_wave + 1);
            }
        }
    }
}

/// Banner animation progress for the renderer
///
/// `WaveComplete` runs 0 to 1 while scrolling in, then 1 to 2 while scrolling
/// out; `WarpingIn` runs 0 to 1 over its fixed hold.
pub fn banner_progress(banner: BannerPhase, started_at: f64, now: f64) -> f32 {
    match banner {
        BannerPhase::WaveComplete => {
            progress(now, started_at, BANNER_SCROLL_IN_MS)
                + progress(now, started_at + BANNER_SCROLL_IN_MS, BANNER_SCROLL_OUT_MS)
        }
        BannerPhase::WarpingIn => progress(now, started_at, WARPING_IN_MS),
    }
}

/// Independent tiers outrank fleet rows at the same height
fn threat(alien: &Alien) -> f32 {
    match alien.tier {
        AlienTier::Fleet => alien.pos.y,
        _ => alien.pos.y + 50.0,
    }
}

/// Demo pilot: chase the lowest alien, keep firing, spend pickups
fn autopilot_inputs(state: &GameState) -> Vec<PlayerInput> {
    let mut inputs = vec![PlayerInput::default(); state.player_count()];
    for player in state.entities.players.values() {
        let Some(slot) = inputs.get_mut(player.index) else {
            continue;
        };
        let x = player.center().x;

        // Lowest threat first; fleet rows are the fallback target
        let target = state
            .entities
            .aliens
            .values()
            .filter(|a| !a.is_entering())
            .max_by(|a, b| threat(a).total_cmp(&threat(b)))
            .map(|a| a.center().x);

        // Oscillate a little so ships don't stack on the same column
        let wobble = ((state.time_ticks as f32 * 0.02) + player.index as f32).sin() * 20.0;
        if let Some(tx) = target {
            let dx = tx + wobble - x;
            slot.move_x = (dx / 40.0).clamp(-1.0, 1.0);
        }
        slot.fire = player.status == PlayerStatus::Alive;
        slot.deploy_shield = player.health < state.settings.player.max_health;
        slot.use_powerup = PowerUpKind::ALL
            .into_iter()
            .find(|k| player.held(*k) > 0 && (*k != PowerUpKind::Nanite || player.health < state.settings.player.max_health));
    }
    inputs
}
