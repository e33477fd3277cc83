//! Read-only views for the renderer and HUD
//!
//! Built once per frame from [`GameState`]; nothing here points back into the
//! simulation.

use serde::Serialize;

use super::breach::DefenseState;
use super::entities::PlayerStatus;
use super::hitbox::Rect;
use super::state::{BannerPhase, GamePhase, GameState};
use super::tick::banner_progress;
use crate::DifficultyMode;
use crate::consts::SHIELD_STAGES;

/// What a sprite depicts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpriteKind {
    Player,
    Alien,
    Minion,
    Bullet,
    PowerUp,
    Barrier,
    MobileShield,
    Squadron,
    Shockwave,
    EscapePod,
}

/// One drawable entity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpriteView {
    pub kind: SpriteKind,
    /// Sub-type: tier name, bullet kind, pickup kind
    pub variant: &'static str,
    pub rect: Rect,
    /// Animation or damage stage
    pub frame: u8,
    /// Player slot for player-owned sprites
    pub player: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerHud {
    pub index: usize,
    pub score: u64,
    pub level: usize,
    pub health: i32,
    pub lives: i32,
    /// Held pickups (squadron, nanite, shockwave)
    pub inventory: [u32; 3],
    pub status: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BannerView {
    pub text: String,
    pub progress: f32,
}

/// Everything a frame needs to draw
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub phase: &'static str,
    pub clock_ms: f64,
    /// 1-based wave number for display
    pub wave: u32,
    pub difficulty: Option<DifficultyMode>,
    pub defense: DefenseState,
    pub defense_strength: u32,
    pub banner: Option<BannerView>,
    pub players: Vec<PlayerHud>,
    pub total_score: u64,
    pub sprites: Vec<SpriteView>,
}

fn status_name(status: PlayerStatus) -> &'static str {
    match status {
        PlayerStatus::Alive => "alive",
        PlayerStatus::BetweenLives { .. } => "between_lives",
        PlayerStatus::Respawning { .. } => "respawning",
    }
}

fn banner_view(phase: &GamePhase, now: f64) -> Option<BannerView> {
    match phase {
        GamePhase::Countdown { cues, .. } => Some(BannerView {
            text: match cues {
                0 | 1 => "3",
                2 => "2",
                3 => "1",
                _ => "GO",
            }
            .to_string(),
            progress: 0.0,
        }),
        GamePhase::BetweenWaves {
            banner,
            started_at,
            cleared_wave,
        } => Some(BannerView {
            text: match banner {
                BannerPhase::WaveComplete => format!("Wave {} Complete", cleared_wave + 1),
                BannerPhase::WarpingIn => "Warping In".to_string(),
            },
            progress: banner_progress(*banner, *started_at, now),
        }),
        GamePhase::Paused { .. } => Some(BannerView {
            text: "Paused".to_string(),
            progress: 0.0,
        }),
        GamePhase::Defeat => Some(BannerView {
            text: "Defeat".to_string(),
            progress: 1.0,
        }),
        GamePhase::Victory => Some(BannerView {
            text: "Victory".to_string(),
            progress: 1.0,
        }),
        GamePhase::StartMenu | GamePhase::Playing => None,
    }
}

impl GameState {
    /// Capture a renderer-facing view of the current state
    pub fn snapshot(&self) -> Snapshot {
        let entities = &self.entities;
        let mut sprites = Vec::new();

        for shield in entities.shields.values() {
            sprites.push(SpriteView {
                kind: if shield.is_mobile() {
                    SpriteKind::MobileShield
                } else {
                    SpriteKind::Barrier
                },
                variant: "shield",
                rect: shield.rect(),
                frame: shield.stage_index.min(SHIELD_STAGES - 1),
                player: shield
                    .tracked_player
                    .and_then(|h| entities.players.get(h))
                    .map(|p| p.index),
            });
        }

        for alien in entities.aliens.values() {
            sprites.push(SpriteView {
                kind: SpriteKind::Alien,
                variant: alien.tier.name(),
                rect: alien.rect(),
                frame: alien.damage_frame(),
                player: None,
            });
        }

        for minion in entities.minions.values() {
            sprites.push(SpriteView {
                kind: SpriteKind::Minion,
                variant: "minion",
                rect: minion.rect(),
                frame: 0,
                player: None,
            });
        }

        for player in entities.players.values() {
            sprites.push(SpriteView {
                kind: SpriteKind::Player,
                variant: status_name(player.status),
                rect: player.rect(),
                frame: player.level.min(u8::MAX as usize) as u8,
                player: Some(player.index),
            });
        }

        for squadron in entities.squadrons.values() {
            sprites.push(SpriteView {
                kind: SpriteKind::Squadron,
                variant: "squadron",
                rect: squadron.rect(),
                frame: u8::from(squadron.damaged),
                player: entities.players.get(squadron.owner).map(|p| p.index),
            });
        }

        for bullet in entities.bullets.values() {
            sprites.push(SpriteView {
                kind: SpriteKind::Bullet,
                variant: bullet.kind.name(),
                rect: bullet.rect(),
                frame: 0,
                player: bullet
                    .player_owner()
                    .and_then(|h| entities.players.get(h))
                    .map(|p| p.index),
            });
        }

        for powerup in entities.powerups.values() {
            sprites.push(SpriteView {
                kind: SpriteKind::PowerUp,
                variant: powerup.kind.name(),
                rect: powerup.rect(),
                frame: 0,
                player: None,
            });
        }

        for ring in entities.shockwaves.values() {
            sprites.push(SpriteView {
                kind: SpriteKind::Shockwave,
                variant: "shockwave",
                rect: Rect::new(
                    ring.center.x - ring.radius,
                    ring.center.y - ring.radius,
                    ring.radius * 2.0,
                    ring.radius * 2.0,
                ),
                frame: 0,
                player: entities.players.get(ring.owner).map(|p| p.index),
            });
        }

        let pod_size = self.settings.player.size * 0.5;
        for pod in entities.escape_pods.values() {
            sprites.push(SpriteView {
                kind: SpriteKind::EscapePod,
                variant: "escape_pod",
                rect: Rect::from_pos_size(pod.pos, pod_size),
                frame: 0,
                player: Some(pod.player_index),
            });
        }

        let mut players: Vec<PlayerHud> = entities
            .players
            .values()
            .map(|p| PlayerHud {
                index: p.index,
                score: p.score,
                level: p.level,
                health: p.health,
                lives: p.lives,
                inventory: p.inventory,
                status: status_name(p.status),
            })
            .collect();
        players.sort_by_key(|p| p.index);

        Snapshot {
            phase: self.phase.name(),
            clock_ms: self.clock_ms,
            wave: self.wave_index + 1,
            difficulty: self.config.map(|c| c.difficulty),
            defense: self.defense,
            defense_strength: self.defense.current_defense_strength(),
            banner: banner_view(&self.phase, self.now()),
            players,
            total_score: self.total_score(),
            sprites,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use crate::sim::state::StartConfig;

    #[test]
    fn test_menu_snapshot_is_empty() {
        let state = GameState::new(Settings::default(), 3);
        let snap = state.snapshot();
        assert_eq!(snap.phase, "StartMenu");
        assert!(snap.sprites.is_empty());
        assert!(snap.players.is_empty());
        assert!(snap.banner.is_none());
    }

    #[test]
    fn test_started_snapshot_lists_ships_and_barriers() {
        let mut state = GameState::new(Settings::default(), 3);
        state
            .start(StartConfig {
                player_count: 2,
                ..Default::default()
            })
            .unwrap();
        let snap = state.snapshot();

        assert_eq!(snap.phase, "Countdown");
        assert_eq!(snap.players.len(), 2);
        assert_eq!(snap.players[0].index, 0);
        assert_eq!(
            snap.sprites.iter().filter(|s| s.kind == SpriteKind::Player).count(),
            2
        );
        assert_eq!(
            snap.sprites.iter().filter(|s| s.kind == SpriteKind::Barrier).count(),
            state.settings.shields.barrier_count as usize
        );
        assert_eq!(snap.banner.map(|b| b.text), Some("3".to_string()));
    }

    #[test]
    fn test_banner_text_between_waves() {
        let mut state = GameState::new(Settings::default(), 3);
        state.phase = GamePhase::BetweenWaves {
            banner: BannerPhase::WaveComplete,
            started_at: 0.0,
            cleared_wave: 2,
        };
        let banner = state.snapshot().banner.unwrap();
        assert_eq!(banner.text, "Wave 3 Complete");
        assert_eq!(banner.progress, 0.0);
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut state = GameState::new(Settings::default(), 3);
        state.start(StartConfig::default()).unwrap();
        let json = serde_json::to_string(&state.snapshot()).unwrap();
        assert!(json.contains("\"phase\":\"Countdown\""));
        assert!(json.contains("\"kind\":\"barrier\""));
    }
}
