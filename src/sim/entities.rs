//! Entity records
//!
//! Plain data for every moving actor. Behaviour lives in the systems
//! (`movement`, `waves`, `collision`, `breach`); the only methods here are
//! small accessors that keep the records' invariants.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::hitbox::Rect;
use super::pool::Handle;
use crate::consts::{PLAYER_LEVELS, SHIELD_STAGES};

/// Alien tiers, ordered by threat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlienTier {
    /// Tier 1: strafing fleet rows
    Fleet = 1,
    /// Tier 2: sine zigzag
    Zigzag = 2,
    /// Tier 3: erratic drift, fires rainbow bolts
    Drifter = 3,
    /// Tier 4: fast diver, rams ships and squadrons
    Diver = 4,
    /// Tier 5: destroyer, plasma cannon
    Destroyer = 5,
    /// Tier 6: cruiser, wing cannons
    Cruiser = 6,
    /// Tier 7: tanker, escorted by minions
    Tanker = 7,
}

impl AlienTier {
    pub const ALL: [AlienTier; 7] = [
        AlienTier::Fleet,
        AlienTier::Zigzag,
        AlienTier::Drifter,
        AlienTier::Diver,
        AlienTier::Destroyer,
        AlienTier::Cruiser,
        AlienTier::Tanker,
    ];

    /// Tiers spawned on their own timers (2..=7)
    pub const INDEPENDENT: [AlienTier; 6] = [
        AlienTier::Zigzag,
        AlienTier::Drifter,
        AlienTier::Diver,
        AlienTier::Destroyer,
        AlienTier::Cruiser,
        AlienTier::Tanker,
    ];

    pub fn from_level(level: u8) -> Option<Self> {
        Self::ALL.get((level as usize).wrapping_sub(1)).copied()
    }

    pub fn level(&self) -> u8 {
        *self as u8
    }

    pub fn name(&self) -> &'static str {
        match self {
            AlienTier::Fleet => "fleet",
            AlienTier::Zigzag => "zigzag",
            AlienTier::Drifter => "drifter",
            AlienTier::Diver => "diver",
            AlienTier::Destroyer => "destroyer",
            AlienTier::Cruiser => "cruiser",
            AlienTier::Tanker => "tanker",
        }
    }

    /// Tiers 5-7 take staged damage; lower tiers die to one hit
    pub fn is_big(&self) -> bool {
        self.level() >= 5
    }

    /// Points for killing an alien of this tier: `tier * (tier / 2) * 20`
    pub fn score(&self) -> u64 {
        kill_score(self.level() as u32)
    }
}

/// Kill score for a tier level, in real arithmetic (`tier² * 10`)
pub fn kill_score(tier: u32) -> u64 {
    let tier = tier as u64;
    tier * tier * 10
}

/// Tier-specific movement state
#[derive(Debug, Clone, PartialEq)]
pub enum Movement {
    /// Strafes with the shared fleet direction and creeps down
    Fleet,
    /// Sine wave around a base column
    Zigzag { base_x: f32, phase: f32 },
    /// Straight drift, re-rolled at `next_change`
    Drift { dir: Vec2, next_change: f64 },
    /// Straight dive at a speed picked from the speed-factor list
    Dive { speed_factor: f32 },
    /// Slow descent, steering toward `target_player` when set
    Heavy,
}

/// An enemy ship
#[derive(Debug, Clone)]
pub struct Alien {
    pub tier: AlienTier,
    /// Top-left corner
    pub pos: Vec2,
    pub size: Vec2,
    pub movement: Movement,
    /// Resting y for a fleet row still warping in from above
    pub entry_target_y: Option<f32>,
    /// Hits taken (tiers 5-7)
    pub damage_stage: u8,
    pub max_damage: u8,
    /// Next time this alien may fire
    pub fire_timer: f64,
    /// Tracked ship (destroyer, cruiser)
    pub target_player: Option<Handle<Player>>,
}

impl Alien {
    pub fn rect(&self) -> Rect {
        Rect::from_pos_size(self.pos, self.size)
    }

    pub fn center(&self) -> Vec2 {
        self.pos + self.size / 2.0
    }

    pub fn is_entering(&self) -> bool {
        self.entry_target_y.is_some()
    }

    /// Register `hits` damage stages; returns true once the alien is destroyed.
    ///
    /// Tiers 1-4 are destroyed by any hit. Tiers 5-7 survive exactly
    /// `max_damage` hits and die when `damage_stage` exceeds it.
    pub fn apply_hits(&mut self, hits: u8) -> bool {
        if !self.tier.is_big() {
            return true;
        }
        debug_assert!(
            self.damage_stage <= self.max_damage,
            "{} still alive past its last damage stage",
            self.tier.name()
        );
        self.damage_stage = self.damage_stage.saturating_add(hits);
        self.damage_stage > self.max_damage
    }

    /// Damage frame for rendering, clamped to the last frame
    pub fn damage_frame(&self) -> u8 {
        self.damage_stage.min(self.max_damage)
    }
}

/// Projectile classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BulletKind {
    /// Fired by ships and squadrons
    Player,
    /// Fleet and zigzag shots
    Standard,
    /// Drifter shots; double shield damage
    Rainbow,
    /// Destroyer shots; heavier, knock ships down
    Plasma,
    /// Cruiser wing shots; heaviest, knock ships sideways
    WingBolt,
    /// Tanker minion shots
    Laser,
}

impl BulletKind {
    pub fn is_alien(&self) -> bool {
        *self != BulletKind::Player
    }

    /// Shield stages removed on impact
    pub fn shield_damage(&self) -> u8 {
        match self {
            BulletKind::Rainbow => 2,
            _ => 1,
        }
    }

    /// Health removed from a ship on impact
    pub fn player_damage(&self) -> i32 {
        match self {
            BulletKind::Plasma => 2,
            BulletKind::WingBolt => 3,
            _ => 1,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BulletKind::Player => "player",
            BulletKind::Standard => "standard",
            BulletKind::Rainbow => "rainbow",
            BulletKind::Plasma => "plasma",
            BulletKind::WingBolt => "wing_bolt",
            BulletKind::Laser => "laser",
        }
    }
}

/// Who fired a bullet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
    Player(Handle<Player>),
    Alien(Handle<Alien>),
    Minion(Handle<Minion>),
}

/// The entity a bullet counts against for per-firer caps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Firer {
    Owner(Owner),
    Squadron(Handle<Squadron>),
}

/// A projectile
#[derive(Debug, Clone)]
pub struct Bullet {
    pub kind: BulletKind,
    pub pos: Vec2,
    pub vel: Vec2,
    pub size: Vec2,
    pub owner: Owner,
    /// Set when a squadron fired on its player's behalf
    pub squadron: Option<Handle<Squadron>>,
}

impl Bullet {
    pub fn rect(&self) -> Rect {
        Rect::from_pos_size(self.pos, self.size)
    }

    pub fn firer(&self) -> Firer {
        match self.squadron {
            Some(sq) => Firer::Squadron(sq),
            None => Firer::Owner(self.owner),
        }
    }

    /// Owning player, if a player (or their squadron) fired this
    pub fn player_owner(&self) -> Option<Handle<Player>> {
        match self.owner {
            Owner::Player(p) => Some(p),
            _ => None,
        }
    }
}

/// Escort tethered to an owner alien (tanker minions)
#[derive(Debug, Clone)]
pub struct Minion {
    pub owner: Handle<Alien>,
    /// Offset from the owner's top-left corner
    pub offset: Vec2,
    pub pos: Vec2,
    pub size: Vec2,
    pub fire_timer: f64,
}

impl Minion {
    pub fn rect(&self) -> Rect {
        Rect::from_pos_size(self.pos, self.size)
    }
}

/// Power-up kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerUpKind {
    Squadron,
    Nanite,
    Shockwave,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 3] = [
        PowerUpKind::Squadron,
        PowerUpKind::Nanite,
        PowerUpKind::Shockwave,
    ];

    pub fn index(&self) -> usize {
        match self {
            PowerUpKind::Squadron => 0,
            PowerUpKind::Nanite => 1,
            PowerUpKind::Shockwave => 2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PowerUpKind::Squadron => "squadron",
            PowerUpKind::Nanite => "nanite",
            PowerUpKind::Shockwave => "shockwave",
        }
    }
}

/// A drifting pickup
#[derive(Debug, Clone)]
pub struct PowerUp {
    pub kind: PowerUpKind,
    pub pos: Vec2,
    pub size: Vec2,
}

impl PowerUp {
    pub fn rect(&self) -> Rect {
        Rect::from_pos_size(self.pos, self.size)
    }
}

/// A shield, either a fixed barrier or a player's mobile shield
#[derive(Debug, Clone)]
pub struct Shield {
    /// Index into the damage-color ramp (0 = best)
    pub stage_index: u8,
    pub pos: Vec2,
    pub size: Vec2,
    /// Player this shield follows (mobile shields only)
    pub tracked_player: Option<Handle<Player>>,
    /// Barrier slot this shield respawns into (barriers only)
    pub slot: Option<usize>,
    /// Last time the shield was damaged
    pub last_hit: f64,
    /// Last time a stage healed
    pub last_regen: f64,
}

impl Shield {
    pub fn rect(&self) -> Rect {
        Rect::from_pos_size(self.pos, self.size)
    }

    pub fn is_mobile(&self) -> bool {
        self.tracked_player.is_some()
    }

    /// Worsen by `stages`; returns true once the ramp is exhausted
    pub fn damage(&mut self, stages: u8, now: f64) -> bool {
        debug_assert!(self.stage_index < SHIELD_STAGES, "shield stage out of range");
        self.stage_index = self.stage_index.saturating_add(stages).min(SHIELD_STAGES - 1);
        self.last_hit = now;
        self.stage_index >= SHIELD_STAGES - 1
    }

    /// Heal one stage; returns false if already at full strength
    pub fn recharge(&mut self) -> bool {
        if self.stage_index == 0 {
            return false;
        }
        self.stage_index -= 1;
        true
    }
}

/// A fixed barrier waiting to respawn
#[derive(Debug, Clone)]
pub struct BarrierSlot {
    pub pos: Vec2,
    pub respawn_at: Option<f64>,
}

/// Wingman that mirrors its player's fire
#[derive(Debug, Clone)]
pub struct Squadron {
    pub owner: Handle<Player>,
    /// Formation slot: sign picks the side (negative = left), magnitude the
    /// distance in wingman offsets
    pub side: f32,
    pub pos: Vec2,
    pub size: Vec2,
    pub hits_taken: u8,
    pub damaged: bool,
}

impl Squadron {
    pub fn rect(&self) -> Rect {
        Rect::from_pos_size(self.pos, self.size)
    }
}

/// Healing swarm attached to a player
#[derive(Debug, Clone)]
pub struct Nanite {
    pub owner: Handle<Player>,
    pub pulses_remaining: u32,
    pub next_pulse: f64,
}

/// Expanding ring that clears alien bullets
#[derive(Debug, Clone)]
pub struct Shockwave {
    pub owner: Handle<Player>,
    pub center: Vec2,
    pub radius: f32,
    /// Aliens already struck by this ring
    pub struck: Vec<Handle<Alien>>,
}

/// Cosmetic pod left behind by an eliminated player
#[derive(Debug, Clone)]
pub struct EscapePod {
    pub player_index: usize,
    pub pos: Vec2,
}

/// Ship lifecycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerStatus {
    Alive,
    /// Flying to the bottom of the field after losing a life
    BetweenLives { until: f64 },
    /// Invulnerable and horizontally controllable only
    Respawning { until: f64 },
}

impl PlayerStatus {
    /// Bullets and aliens pass through ships that are not alive
    pub fn is_vulnerable(&self) -> bool {
        matches!(self, PlayerStatus::Alive)
    }
}

/// A player ship
#[derive(Debug, Clone)]
pub struct Player {
    /// Seat index (0-based, stable across the run)
    pub index: usize,
    pub pos: Vec2,
    pub size: Vec2,
    pub health: i32,
    /// Spare lives; the ship is removed once this drops below zero
    pub lives: i32,
    pub score: u64,
    pub level: usize,
    /// Pickups held, indexed by [`PowerUpKind::index`]
    pub inventory: [u32; 3],
    pub next_fire: f64,
    pub next_mobile_shield: f64,
    pub status: PlayerStatus,
}

impl Player {
    pub fn rect(&self) -> Rect {
        Rect::from_pos_size(self.pos, self.size)
    }

    pub fn center(&self) -> Vec2 {
        self.pos + self.size / 2.0
    }

    pub fn can_fire(&self, now: f64) -> bool {
        self.status == PlayerStatus::Alive && now >= self.next_fire
    }

    pub fn held(&self, kind: PowerUpKind) -> u32 {
        self.inventory[kind.index()]
    }

    /// Add `points` and recompute the level; returns the new level if it rose
    pub fn add_score(&mut self, points: u64, thresholds: &[u64; PLAYER_LEVELS]) -> Option<usize> {
        self.score += points;
        let level = level_for_score(self.score, thresholds);
        if level > self.level {
            self.level = level;
            Some(level)
        } else {
            None
        }
    }
}

/// Highest level whose threshold the score has reached
pub fn level_for_score(score: u64, thresholds: &[u64; PLAYER_LEVELS]) -> usize {
    thresholds
        .iter()
        .rposition(|&t| score >= t)
        .unwrap_or(0)
}
