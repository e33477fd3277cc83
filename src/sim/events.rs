//! Discrete simulation events
//!
//! Emitted at the moment something happens; the audio layer maps
//! [`GameEvent::name`] to a sound and never reports back.

use super::entities::{AlienTier, PowerUpKind};

/// Something the host may want to react to (sound, HUD flash, logging)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GameEvent {
    /// Countdown cue: 3, 2, 1, then 0 for "GO"
    CountdownCue(u32),
    WaveStart(u32),
    WaveComplete(u32),
    WarpingIn(u32),
    Paused,
    Resumed,
    Victory,
    Defeat,

    AlienDeath(AlienTier),
    AlienHit(AlienTier),
    AlienBreach { tier: AlienTier, cost: u32 },
    MinionDeath,
    MinionsDeployed(u32),

    PlayerFire(usize),
    AlienFire(AlienTier),
    PlayerHit(usize),
    PlayerLifeLost(usize),
    PlayerRespawned(usize),
    PlayerEliminated(usize),
    PlayerLevelUp { player: usize, level: usize },

    ShieldRecharge,
    ShieldHit,
    ShieldDestroyed,
    ShieldRespawn,
    ShieldDeployed(usize),

    PowerUpDropped(PowerUpKind),
    PowerUpCollected { player: usize, kind: PowerUpKind },
    SquadronLaunched(usize),
    SquadronHit,
    SquadronDestroyed,
    NaniteHeal(usize),
    ShockwaveFired(usize),
    EscapePodLaunched(usize),
}

impl GameEvent {
    /// Audio event key
    pub fn name(&self) -> &'static str {
        match self {
            GameEvent::CountdownCue(0) => "countdown_go",
            GameEvent::CountdownCue(_) => "countdown_tick",
            GameEvent::WaveStart(_) => "wave_start",
            GameEvent::WaveComplete(_) => "wave_complete",
            GameEvent::WarpingIn(_) => "warping_in",
            GameEvent::Paused => "pause",
            GameEvent::Resumed => "resume",
            GameEvent::Victory => "victory",
            GameEvent::Defeat => "defeat",

            GameEvent::AlienDeath(tier) => alien_death_name(*tier),
            GameEvent::AlienHit(_) => "alien_hit",
            GameEvent::AlienBreach { .. } => "alien_breach",
            GameEvent::MinionDeath => "minion_death",
            GameEvent::MinionsDeployed(_) => "minions_deployed",

            GameEvent::PlayerFire(_) => "player_fire",
            GameEvent::AlienFire(_) => "alien_fire",
            GameEvent::PlayerHit(_) => "player_hit",
            GameEvent::PlayerLifeLost(_) => "player_life_lost",
            GameEvent::PlayerRespawned(_) => "player_respawned",
            GameEvent::PlayerEliminated(_) => "player_eliminated",
            GameEvent::PlayerLevelUp { .. } => "player_level_up",

            GameEvent::ShieldRecharge => "shield_recharge",
            GameEvent::ShieldHit => "shield_hit",
            GameEvent::ShieldDestroyed => "shield_destroyed",
            GameEvent::ShieldRespawn => "shield_respawn",
            GameEvent::ShieldDeployed(_) => "shield_deployed",

            GameEvent::PowerUpDropped(_) => "powerup_dropped",
            GameEvent::PowerUpCollected { .. } => "powerup_collected",
            GameEvent::SquadronLaunched(_) => "squadron_launch",
            GameEvent::SquadronHit => "squadron_hit",
            GameEvent::SquadronDestroyed => "squadron_destroyed",
            GameEvent::NaniteHeal(_) => "nanite_heal",
            GameEvent::ShockwaveFired(_) => "shockwave",
            GameEvent::EscapePodLaunched(_) => "escape_pod",
        }
    }
}

fn alien_death_name(tier: AlienTier) -> &'static str {
    match tier {
        AlienTier::Fleet => "alien_fleet_death",
        AlienTier::Zigzag => "alien_zigzag_death",
        AlienTier::Drifter => "alien_drifter_death",
        AlienTier::Diver => "alien_diver_death",
        AlienTier::Destroyer => "alien_destroyer_death",
        AlienTier::Cruiser => "alien_cruiser_death",
        AlienTier::Tanker => "alien_tanker_death",
    }
}
