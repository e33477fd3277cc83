//! Alien Invasion headless runner
//!
//! Plays a seeded run with the autopilot flying every ship, logging phase
//! changes, then prints the final snapshot as JSON.
//!
//! Usage: `alien-invasion [settings.json] [--seed N] [--players N] [--difficulty MODE]`

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use alien_invasion::consts::{MAX_PLAYERS, SIM_DT};
use alien_invasion::sim::{GamePhase, GameState, StartConfig, TickInput, step_frame};
use alien_invasion::{DifficultyMode, Settings};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "alien-invasion")]
#[command(about = "Play a seeded Alien Invasion run on autopilot and print the final snapshot")]
struct Args {
    /// Settings JSON file (defaults are used when omitted)
    settings: Option<PathBuf>,
    /// RNG seed; the wall clock is used when omitted
    #[arg(short, long)]
    seed: Option<u64>,
    /// Number of ships
    #[arg(short, long, default_value_t = 1, value_parser = parse_players)]
    players: usize,
    /// Difficulty: kiddie, easy, normal or hard
    #[arg(short, long, default_value = "normal", value_parser = parse_difficulty)]
    difficulty: DifficultyMode,
}

fn parse_players(s: &str) -> Result<usize, String> {
    let count: usize = s.parse().map_err(|e| format!("'{s}' is not a player count: {e}"))?;
    if (1..=MAX_PLAYERS).contains(&count) {
        Ok(count)
    } else {
        Err(format!("player count must be between 1 and {MAX_PLAYERS}"))
    }
}

fn parse_difficulty(s: &str) -> Result<DifficultyMode, String> {
    DifficultyMode::from_str(s)
        .ok_or_else(|| format!("unknown difficulty '{s}' (expected kiddie, easy, normal or hard)"))
}

/// Host frame length; two fixed steps per frame
const FRAME_DT: f32 = SIM_DT * 2.0;
/// Give up after this much game time (one hour)
const MAX_GAME_MS: f64 = 60.0 * 60.0 * 1000.0;

/// Runner instance holding the simulation and loop bookkeeping
struct Game {
    state: GameState,
    accumulator: f32,
    input: TickInput,
    last_phase: &'static str,
    frames: u64,
}

impl Game {
    fn new(settings: Settings, seed: u64) -> Self {
        let state = GameState::new(settings, seed);
        let last_phase = state.phase.name();
        Self {
            state,
            accumulator: 0.0,
            input: TickInput {
                autopilot: true,
                ..Default::default()
            },
            last_phase,
            frames: 0,
        }
    }

    fn frame(&mut self) {
        step_frame(&mut self.state, &self.input, FRAME_DT, &mut self.accumulator);
        self.frames += 1;

        for event in self.state.take_events() {
            log::trace!("event {:?} ({})", event, event.name());
        }

        let phase = self.state.phase.name();
        if phase != self.last_phase {
            log::info!(
                "[{:>9.0} ms] {} -> {} (wave {}, score {})",
                self.state.clock_ms,
                self.last_phase,
                phase,
                self.state.wave_index + 1,
                self.state.total_score()
            );
            self.last_phase = phase;
        }
    }

    fn run(&mut self) {
        while !self.state.phase.is_terminal() && self.state.clock_ms < MAX_GAME_MS {
            self.frame();
        }
        if !self.state.phase.is_terminal() {
            log::warn!("Stopped after {:.0} ms of game time", self.state.clock_ms);
        }
        log::info!(
            "Run finished in {} frames: {} on wave {}",
            self.frames,
            self.state.phase.name(),
            self.state.wave_index + 1
        );
    }
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn main() -> ExitCode {
    env_logger::init();
    log::info!("Alien Invasion (headless) starting...");

    let args = Args::parse();
    let settings = match &args.settings {
        Some(path) => Settings::load_or_default(path),
        None => Settings::default(),
    };
    let seed = args.seed.unwrap_or_else(clock_seed);

    log::info!(
        "Seed {}, {} player(s), {} mode",
        seed,
        args.players,
        args.difficulty.as_str()
    );

    let mut game = Game::new(settings, seed);
    let config = StartConfig {
        player_count: args.players,
        difficulty: args.difficulty,
        ..Default::default()
    };
    if let Err(e) = game.state.start(config) {
        log::error!("Could not start run: {}", e);
        return ExitCode::FAILURE;
    }

    game.run();

    match serde_json::to_string_pretty(&game.state.snapshot()) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            log::error!("Could not serialize snapshot: {}", e);
            return ExitCode::FAILURE;
        }
    }

    if game.state.phase == GamePhase::Victory {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["alien-invasion"]).unwrap();
        assert!(args.settings.is_none());
        assert!(args.seed.is_none());
        assert_eq!(args.players, 1);
        assert_eq!(args.difficulty, DifficultyMode::Normal);
    }

    #[test]
    fn test_full_command_line() {
        let args = Args::try_parse_from([
            "alien-invasion",
            "s.json",
            "--seed",
            "42",
            "--players",
            "2",
            "--difficulty",
            "hard",
        ])
        .unwrap();
        assert_eq!(args.settings, Some(PathBuf::from("s.json")));
        assert_eq!(args.seed, Some(42));
        assert_eq!(args.players, 2);
        assert_eq!(args.difficulty, DifficultyMode::Hard);
    }

    #[test]
    fn test_bad_values_are_rejected() {
        for bad in [
            vec!["alien-invasion", "--players", "two"],
            vec!["alien-invasion", "--players", "0"],
            vec!["alien-invasion", "--players", "5"],
            vec!["alien-invasion", "--difficulty", "hardd"],
            vec!["alien-invasion", "--seed", "4x2"],
        ] {
            assert!(Args::try_parse_from(bad.clone()).is_err(), "{bad:?} should not parse");
        }
    }
}
