//! Game state and the run-level state machine types
//!
//! Everything the tick mutates lives in [`GameState`]. The phase is an enum
//! carrying its own timers, so there are no loose flags to fall out of sync.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::breach::DefenseState;
use super::difficulty::DifficultyModifiers;
use super::entities::{BarrierSlot, Player, PlayerStatus, PowerUpKind, Shield};
use super::events::GameEvent;
use super::lifecycle::Entities;
use super::waves::WaveScheduler;
use crate::consts::{COUNTDOWN_MS, MAX_PLAYERS};
use crate::error::SimError;
use crate::settings::{DifficultyMode, Settings};

/// Which power-up kinds may drop this run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerUpToggles {
    pub squadron: bool,
    pub nanite: bool,
    pub shockwave: bool,
}

impl Default for PowerUpToggles {
    fn default() -> Self {
        Self::all()
    }
}

impl PowerUpToggles {
    pub fn all() -> Self {
        Self {
            squadron: true,
            nanite: true,
            shockwave: true,
        }
    }

    pub fn none() -> Self {
        Self {
            squadron: false,
            nanite: false,
            shockwave: false,
        }
    }

    pub fn enabled(&self, kind: PowerUpKind) -> bool {
        match kind {
            PowerUpKind::Squadron => self.squadron,
            PowerUpKind::Nanite => self.nanite,
            PowerUpKind::Shockwave => self.shockwave,
        }
    }

    pub fn enabled_kinds(&self) -> Vec<PowerUpKind> {
        PowerUpKind::ALL
            .into_iter()
            .filter(|k| self.enabled(*k))
            .collect()
    }
}

/// Run configuration confirmed in the start menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartConfig {
    /// Wave index to start from (0-based)
    pub starting_wave: u32,
    pub player_count: usize,
    pub difficulty: DifficultyMode,
    pub powerups: PowerUpToggles,
}

impl Default for StartConfig {
    fn default() -> Self {
        Self {
            starting_wave: 0,
            player_count: 1,
            difficulty: DifficultyMode::Normal,
            powerups: PowerUpToggles::all(),
        }
    }
}

impl StartConfig {
    pub fn validate(&self) -> Result<(), SimError> {
        if self.player_count == 0 || self.player_count > MAX_PLAYERS {
            return Err(SimError::InvalidPlayerCount {
                count: self.player_count,
                max: MAX_PLAYERS,
            });
        }
        Ok(())
    }
}

/// Two-part banner shown between waves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BannerPhase {
    /// "Wave N Complete" scrolls in, then out
    WaveComplete,
    /// Fixed "Warping In" hold before the next wave
    WarpingIn,
}

/// Current phase of the run
#[derive(Debug, Clone, PartialEq)]
pub enum GamePhase {
    /// Waiting for a start configuration
    StartMenu,
    /// 3-2-1-GO before the first wave
    Countdown {
        ends_at: f64,
        /// Cues already emitted (3, 2, 1, GO)
        cues: u32,
    },
    /// Active gameplay
    Playing,
    /// Frozen; `resume` is restored exactly on unpause
    Paused { resume: Box<GamePhase> },
    /// Banner sequence after a cleared wave
    BetweenWaves {
        banner: BannerPhase,
        started_at: f64,
        /// Wave that was just cleared
        cleared_wave: u32,
    },
    /// Defense broken or every ship lost
    Defeat,
    /// Ran past the last wave
    Victory,
}

impl GamePhase {
    pub fn name(&self) -> &'static str {
        match self {
            GamePhase::StartMenu => "StartMenu",
            GamePhase::Countdown { .. } => "Countdown",
            GamePhase::Playing => "Playing",
            GamePhase::Paused { .. } => "Paused",
            GamePhase::BetweenWaves { .. } => "BetweenWaves",
            GamePhase::Defeat => "Defeat",
            GamePhase::Victory => "Victory",
        }
    }

    /// Whether the game clock advances in this phase
    pub fn clock_runs(&self) -> bool {
        matches!(
            self,
            GamePhase::Countdown { .. } | GamePhase::Playing | GamePhase::BetweenWaves { .. }
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, GamePhase::Defeat | GamePhase::Victory)
    }

    pub fn can_pause(&self) -> bool {
        matches!(
            self,
            GamePhase::Countdown { .. } | GamePhase::Playing | GamePhase::BetweenWaves { .. }
        )
    }
}

/// Gap between a ship at rest and the bottom of the field
const PLAYER_BOTTOM_GAP: f32 = 10.0;

/// Resting y of a ship (top edge)
pub fn player_home_y(settings: &Settings) -> f32 {
    settings.field_height - settings.player.size.y - PLAYER_BOTTOM_GAP
}

/// Complete simulation state
#[derive(Debug, Clone)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub rng: Pcg32,
    /// Read-only baseline
    pub settings: Settings,
    /// Set once the start menu is left
    pub config: Option<StartConfig>,
    pub phase: GamePhase,
    /// Game clock (ms); frozen while paused
    pub clock_ms: f64,
    /// Simulation tick counter (advances with the clock)
    pub time_ticks: u64,
    /// Current wave index (0-based)
    pub wave_index: u32,
    pub modifiers: DifficultyModifiers,
    pub scheduler: WaveScheduler,
    pub defense: DefenseState,
    pub entities: Entities,
    /// Events since the last `take_events`
    pub events: Vec<GameEvent>,
}

impl GameState {
    /// Create a state sitting in the start menu
    pub fn new(settings: Settings, seed: u64) -> Self {
        let modifiers = DifficultyModifiers::compute(&settings, DifficultyMode::Normal, 0, 1);
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            settings,
            config: None,
            phase: GamePhase::StartMenu,
            clock_ms: 0.0,
            time_ticks: 0,
            wave_index: 0,
            modifiers,
            scheduler: WaveScheduler::default(),
            defense: DefenseState::for_wave(0),
            entities: Entities::new(),
            events: Vec::new(),
        }
    }

    /// Leave the start menu: spawn ships and barriers, begin the countdown
    pub fn start(&mut self, config: StartConfig) -> Result<(), SimError> {
        if self.phase != GamePhase::StartMenu {
            return Err(SimError::NotInStartMenu);
        }
        config.validate()?;

        self.entities = Entities::new();
        self.config = Some(config);
        self.wave_index = config.starting_wave;
        self.modifiers = DifficultyModifiers::compute(
            &self.settings,
            config.difficulty,
            config.starting_wave,
            config.player_count,
        );

        for index in 0..config.player_count {
            let player = self.new_player(index, config.player_count);
            self.entities.spawn(player);
        }
        self.spawn_barriers();

        self.phase = GamePhase::Countdown {
            ends_at: self.clock_ms + COUNTDOWN_MS,
            cues: 0,
        };
        log::info!(
            "Run started: {} player(s), {} mode, wave {}",
            config.player_count,
            config.difficulty.as_str(),
            config.starting_wave + 1
        );
        Ok(())
    }

    fn new_player(&self, index: usize, count: usize) -> Player {
        let ps = &self.settings.player;
        let slot_w = self.settings.field_width / (count as f32 + 1.0);
        let x = slot_w * (index as f32 + 1.0) - ps.size.x / 2.0;
        Player {
            index,
            pos: Vec2::new(x, player_home_y(&self.settings)),
            size: ps.size,
            health: ps.max_health,
            lives: ps.lives,
            score: 0,
            level: 0,
            inventory: [0; 3],
            next_fire: 0.0,
            next_mobile_shield: 0.0,
            status: PlayerStatus::Alive,
        }
    }

    fn spawn_barriers(&mut self) {
        let shields = &self.settings.shields;
        let count = shields.barrier_count;
        let slot_w = self.settings.field_width / (count as f32 + 1.0);
        let y = self.settings.field_height - shields.barrier_offset;
        self.entities.barriers.clear();
        for i in 0..count {
            let x = slot_w * (i as f32 + 1.0) - shields.barrier_size.x / 2.0;
            let pos = Vec2::new(x, y);
            self.entities.barriers.push(BarrierSlot {
                pos,
                respawn_at: None,
            });
            self.entities.spawn(Shield {
                stage_index: 0,
                pos,
                size: shields.barrier_size,
                tracked_player: None,
                slot: Some(i as usize),
                last_hit: self.clock_ms,
                last_regen: self.clock_ms,
            });
        }
    }

    /// Current game-clock time (ms)
    pub fn now(&self) -> f64 {
        self.clock_ms
    }

    pub fn difficulty(&self) -> DifficultyMode {
        self.config.map(|c| c.difficulty).unwrap_or_default()
    }

    pub fn powerup_toggles(&self) -> PowerUpToggles {
        self.config.map(|c| c.powerups).unwrap_or_default()
    }

    pub fn player_count(&self) -> usize {
        self.config.map(|c| c.player_count).unwrap_or(1)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.phase, GamePhase::Paused { .. })
    }

    /// Enter the terminal `Victory` phase
    pub fn declare_victory(&mut self) {
        if self.phase.is_terminal() {
            return;
        }
        self.phase = GamePhase::Victory;
        self.emit(GameEvent::Victory);
        log::info!("Victory! Total score {}", self.total_score());
    }

    /// Enter the terminal `Defeat` phase
    pub fn declare_defeat(&mut self, reason: &str) {
        if self.phase.is_terminal() {
            return;
        }
        self.phase = GamePhase::Defeat;
        self.emit(GameEvent::Defeat);
        log::info!("Defeat on wave {}: {reason}", self.wave_index + 1);
    }

    pub fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Drain events accumulated since the last call
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Total score across every ship still in the run
    pub fn total_score(&self) -> u64 {
        self.entities.players.values().map(|p| p.score).sum()
    }
}
