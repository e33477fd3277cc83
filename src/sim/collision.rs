//! Collision resolution pipeline
//!
//! Runs once per playing tick after movement, in a fixed phase order. Later
//! phases see the removals and damage of earlier ones:
//!
//! 1. player bullets vs shields (recharge, friendly pass-through)
//! 2. alien bullets vs shields (damage)
//! 3. big aliens vs shields
//! 4. player bullets vs aliens
//! 5. player bullets vs minions
//! 6. alien bullets vs squadrons
//! 7. divers vs squadrons (mutual destruction)
//! 8. alien bullets vs ships
//! 9. aliens vs ships
//! 10. ships out of health lose a life
//! 11. pickups vs ships
//! 12. shockwaves vs alien bullets and aliens
//!
//! Every alien pairing goes through [`is_valid_hit`], so the cruiser and
//! destroyer exclusion zones apply to bullets, shields, ships and squadrons
//! alike. Shockwave rings are round and ignore them.

use glam::Vec2;
use rand::Rng;

use super::entities::{
    Alien, AlienTier, Bullet, BulletKind, EscapePod, Player, PlayerStatus, PowerUp, Shield,
    kill_score,
};
use super::events::GameEvent;
use super::hitbox::is_valid_hit;
use super::pool::Handle;
use super::state::{GameState, player_home_y};

/// Resolve every collision for this tick
pub fn resolve_collisions(state: &mut GameState) {
    player_bullets_vs_shields(state);
    alien_bullets_vs_shields(state);
    big_aliens_vs_shields(state);
    player_bullets_vs_aliens(state);
    player_bullets_vs_minions(state);
    alien_bullets_vs_squadrons(state);
    divers_vs_squadrons(state);
    alien_bullets_vs_players(state);
    aliens_vs_players(state);
    handle_depleted_players(state);
    collect_powerups(state);
    shockwaves_vs_hostiles(state);
}

fn bullets_where(state: &GameState, filter: impl Fn(&Bullet) -> bool) -> Vec<Handle<Bullet>> {
    state
        .entities
        .bullets
        .iter()
        .filter(|&(_, b)| filter(b))
        .map(|(h, _)| h)
        .collect()
}

// ============================================================================
// Shared outcomes
// ============================================================================

/// Credit `points` to a ship if it is still in the run
fn award(state: &mut GameState, player: Handle<Player>, points: u64) {
    let thresholds = state.settings.player.level_thresholds;
    let Some(p) = state.entities.players.get_mut(player) else {
        return;
    };
    let index = p.index;
    if let Some(level) = p.add_score(points, &thresholds) {
        state.emit(GameEvent::PlayerLevelUp {
            player: index,
            level,
        });
        log::info!("Player {} reached level {}", index + 1, level);
    }
}

/// Remove an alien: death event, pickup roll, optional score
fn kill_alien(state: &mut GameState, handle: Handle<Alien>, scorer: Option<Handle<Player>>) {
    let Some(alien) = state.entities.destroy(handle) else {
        return;
    };
    state.emit(GameEvent::AlienDeath(alien.tier));
    roll_powerup_drop(state, &alien);
    if let Some(player) = scorer {
        award(state, player, alien.tier.score());
    }
}

fn roll_powerup_drop(state: &mut GameState, alien: &Alien) {
    let kinds = state.powerup_toggles().enabled_kinds();
    if kinds.is_empty() {
        return;
    }
    let chance = state.settings.tier(alien.tier.level()).powerup_drop_chance;
    if !state.rng.random_bool(chance.clamp(0.0, 1.0) as f64) {
        return;
    }
    let kind = kinds[state.rng.random_range(0..kinds.len())];
    let size = state.settings.powerups.size;
    state.entities.spawn(PowerUp {
        kind,
        pos: alien.center() - size / 2.0,
        size,
    });
    state.emit(GameEvent::PowerUpDropped(kind));
}

/// Remove a shield; barriers get a respawn timer on their slot
fn destroy_shield(state: &mut GameState, handle: Handle<Shield>) {
    let Some(shield) = state.entities.destroy(handle) else {
        return;
    };
    state.emit(GameEvent::ShieldDestroyed);
    if let Some(slot) = shield.slot
        && state.settings.shields.respawn
    {
        let respawn_at = state.now() + state.settings.shields.respawn_ms;
        if let Some(barrier) = state.entities.barriers.get_mut(slot) {
            barrier.respawn_at = Some(respawn_at);
        }
    }
}

/// Worsen a shield; destroys it at the end of the ramp
fn damage_shield(state: &mut GameState, handle: Handle<Shield>, stages: u8) {
    let now = state.now();
    let Some(shield) = state.entities.shields.get_mut(handle) else {
        return;
    };
    if shield.damage(stages, now) {
        destroy_shield(state, handle);
    } else {
        state.emit(GameEvent::ShieldHit);
    }
}

fn damage_player(state: &mut GameState, handle: Handle<Player>, amount: i32) {
    if let Some(player) = state.entities.players.get_mut(handle) {
        player.health -= amount;
        let index = player.index;
        state.emit(GameEvent::PlayerHit(index));
    }
}

/// Displace a ship, keeping it inside the field
fn knock_player(state: &mut GameState, handle: Handle<Player>, delta: Vec2) {
    let width = state.settings.field_width;
    let home_y = player_home_y(&state.settings);
    if let Some(player) = state.entities.players.get_mut(handle) {
        player.pos += delta;
        player.pos.x = player.pos.x.clamp(0.0, (width - player.size.x).max(0.0));
        player.pos.y = player.pos.y.min(home_y);
    }
}

// ============================================================================
// Phases 1-3: shields
// ============================================================================

/// Player shots recharge shields, except a ship's own mobile shield which
/// lets them through untouched
fn player_bullets_vs_shields(state: &mut GameState) {
    for bh in bullets_where(state, |b| b.kind == BulletKind::Player) {
        let Some(bullet) = state.entities.get(bh) else {
            continue;
        };
        let rect = bullet.rect();
        let owner = bullet.player_owner();
        let hit = state
            .entities
            .shields
            .iter()
            .filter(|(_, s)| !(s.is_mobile() && s.tracked_player == owner))
            .find(|(_, s)| s.rect().intersects(&rect))
            .map(|(h, _)| h);
        let Some(sh) = hit else {
            continue;
        };

        state.entities.destroy(bh);
        let now = state.now();
        if let Some(shield) = state.entities.shields.get_mut(sh)
            && shield.recharge()
        {
            shield.last_regen = now;
            state.emit(GameEvent::ShieldRecharge);
        }
    }
}

fn alien_bullets_vs_shields(state: &mut GameState) {
    for bh in bullets_where(state, |b| b.kind.is_alien()) {
        let Some(bullet) = state.entities.get(bh) else {
            continue;
        };
        let rect = bullet.rect();
        let stages = bullet.kind.shield_damage();
        let hit = state
            .entities
            .shields
            .iter()
            .find(|(_, s)| s.rect().intersects(&rect))
            .map(|(h, _)| h);
        let Some(sh) = hit else {
            continue;
        };
        state.entities.destroy(bh);
        damage_shield(state, sh, stages);
    }
}

/// Big aliens crash into shields and are destroyed
fn big_aliens_vs_shields(state: &mut GameState) {
    let big: Vec<_> = state
        .entities
        .aliens
        .iter()
        .filter(|(_, a)| a.tier.is_big())
        .map(|(h, a)| (h, a.tier))
        .collect();

    for (ah, tier) in big {
        let Some(alien) = state.entities.get(ah) else {
            continue;
        };
        let alien_box = alien.rect();
        let hit = state
            .entities
            .shields
            .iter()
            .find(|(_, s)| is_valid_hit(tier, alien_box, s.rect()))
            .map(|(h, _)| h);
        let Some(sh) = hit else {
            continue;
        };
        let stages = state.settings.tier(tier.level()).shield_contact_damage;
        damage_shield(state, sh, stages);
        kill_alien(state, ah, None);
    }
}

// ============================================================================
// Phases 4-7: player fire and squadrons
// ============================================================================

fn player_bullets_vs_aliens(state: &mut GameState) {
    for bh in bullets_where(state, |b| b.kind == BulletKind::Player) {
        let Some(bullet) = state.entities.get(bh) else {
            continue;
        };
        let rect = bullet.rect();
        let owner = bullet.player_owner();
        let hit = state
            .entities
            .aliens
            .iter()
            .find(|(_, a)| is_valid_hit(a.tier, a.rect(), rect))
            .map(|(h, _)| h);
        let Some(ah) = hit else {
            continue;
        };

        state.entities.destroy(bh);
        let Some(alien) = state.entities.aliens.get_mut(ah) else {
            continue;
        };
        let tier = alien.tier;
        if alien.apply_hits(1) {
            kill_alien(state, ah, owner);
        } else {
            state.emit(GameEvent::AlienHit(tier));
        }
    }
}

fn player_bullets_vs_minions(state: &mut GameState) {
    let points = kill_score(state.settings.minions.score_tier);
    for bh in bullets_where(state, |b| b.kind == BulletKind::Player) {
        let Some(bullet) = state.entities.get(bh) else {
            continue;
        };
        let rect = bullet.rect();
        let owner = bullet.player_owner();
        let hit = state
            .entities
            .minions
            .iter()
            .find(|(_, m)| m.rect().intersects(&rect))
            .map(|(h, _)| h);
        let Some(mh) = hit else {
            continue;
        };

        state.entities.destroy(bh);
        state.entities.destroy(mh);
        state.emit(GameEvent::MinionDeath);
        if let Some(player) = owner {
            award(state, player, points);
        }
    }
}

fn alien_bullets_vs_squadrons(state: &mut GameState) {
    let max_hits = state.settings.powerups.squadron_hits;
    let damaged_at = state.settings.powerups.squadron_damaged_at;
    for bh in bullets_where(state, |b| b.kind.is_alien()) {
        let Some(bullet) = state.entities.get(bh) else {
            continue;
        };
        let rect = bullet.rect();
        let hit = state
            .entities
            .squadrons
            .iter()
            .find(|(_, s)| s.rect().intersects(&rect))
            .map(|(h, _)| h);
        let Some(sq) = hit else {
            continue;
        };

        state.entities.destroy(bh);
        let Some(squadron) = state.entities.squadrons.get_mut(sq) else {
            continue;
        };
        squadron.hits_taken += 1;
        if squadron.hits_taken >= max_hits {
            state.entities.destroy(sq);
            state.emit(GameEvent::SquadronDestroyed);
        } else {
            if squadron.hits_taken >= damaged_at {
                squadron.damaged = true;
            }
            state.emit(GameEvent::SquadronHit);
        }
    }
}

/// Divers and squadrons destroy each other outright
fn divers_vs_squadrons(state: &mut GameState) {
    let divers: Vec<_> = state
        .entities
        .aliens
        .iter()
        .filter(|(_, a)| a.tier == AlienTier::Diver)
        .map(|(h, _)| h)
        .collect();

    for ah in divers {
        let Some(alien) = state.entities.get(ah) else {
            continue;
        };
        let alien_box = alien.rect();
        let hit = state
            .entities
            .squadrons
            .iter()
            .find(|(_, s)| is_valid_hit(AlienTier::Diver, alien_box, s.rect()))
            .map(|(h, _)| h);
        let Some(sq) = hit else {
            continue;
        };
        state.entities.destroy(sq);
        state.emit(GameEvent::SquadronDestroyed);
        kill_alien(state, ah, None);
    }
}

// ============================================================================
// Phases 8-10: ships
// ============================================================================

fn alien_bullets_vs_players(state: &mut GameState) {
    let plasma_knockback = state.settings.bullets.plasma_knockback;
    let wing_knockback = state.settings.bullets.wing_knockback;
    for bh in bullets_where(state, |b| b.kind.is_alien()) {
        let Some(bullet) = state.entities.get(bh) else {
            continue;
        };
        let rect = bullet.rect();
        let kind = bullet.kind;
        let hit = state
            .entities
            .players
            .iter()
            .filter(|(_, p)| p.status.is_vulnerable())
            .find(|(_, p)| p.rect().intersects(&rect))
            .map(|(h, p)| (h, p.center()));
        let Some((ph, center)) = hit else {
            continue;
        };

        state.entities.destroy(bh);
        damage_player(state, ph, kind.player_damage());
        match kind {
            BulletKind::Plasma => knock_player(state, ph, Vec2::new(0.0, plasma_knockback)),
            BulletKind::WingBolt => {
                let side = if center.x >= rect.center().x { 1.0 } else { -1.0 };
                knock_player(state, ph, Vec2::new(side * wing_knockback, 0.0));
            }
            _ => {}
        }
    }
}

/// Body contact between aliens and ships
fn aliens_vs_players(state: &mut GameState) {
    let ram_knockback = state.settings.player.ram_knockback;
    let bump_knockback = state.settings.player.bump_knockback;
    let damage_back = state.settings.player.contact_damage_to_alien;

    for ah in state.entities.aliens.handles() {
        let Some(alien) = state.entities.get(ah) else {
            continue;
        };
        let tier = alien.tier;
        let alien_box = alien.rect();
        let hit = state
            .entities
            .players
            .iter()
            .filter(|(_, p)| p.status.is_vulnerable())
            .find(|(_, p)| is_valid_hit(tier, alien_box, p.rect()))
            .map(|(h, p)| (h, p.center()));
        let Some((ph, center)) = hit else {
            continue;
        };

        let contact_damage = state.settings.tier(tier.level()).player_contact_damage;
        damage_player(state, ph, contact_damage);

        if !tier.is_big() {
            if tier == AlienTier::Diver {
                let side = if center.x >= alien_box.center().x { 1.0 } else { -1.0 };
                knock_player(state, ph, Vec2::new(side * ram_knockback, 0.0));
            }
            kill_alien(state, ah, None);
            continue;
        }

        let away = (center - alien_box.center()).normalize_or(Vec2::Y);
        knock_player(state, ph, away * bump_knockback);
        let destroyed = state
            .entities
            .aliens
            .get_mut(ah)
            .is_some_and(|a| a.apply_hits(damage_back));
        if destroyed {
            kill_alien(state, ah, Some(ph));
        } else {
            state.emit(GameEvent::AlienHit(tier));
        }
    }
}

/// Ships at zero health lose a life, or leave the run when none remain
fn handle_depleted_players(state: &mut GameState) {
    let now = state.now();
    let between_lives_ms = state.settings.player.between_lives_ms;
    let depleted: Vec<_> = state
        .entities
        .players
        .iter()
        .filter(|(_, p)| p.status.is_vulnerable() && p.health <= 0)
        .map(|(h, _)| h)
        .collect();

    for ph in depleted {
        let Some(player) = state.entities.players.get_mut(ph) else {
            continue;
        };
        player.lives -= 1;
        let index = player.index;
        let lives = player.lives;
        if lives >= 0 {
            player.status = PlayerStatus::BetweenLives {
                until: now + between_lives_ms,
            };
        }
        state.emit(GameEvent::PlayerLifeLost(index));
        if lives >= 0 {
            log::debug!("Player {} lost a life ({lives} left)", index + 1);
            continue;
        }

        let Some(player) = state.entities.destroy(ph) else {
            continue;
        };
        state.emit(GameEvent::PlayerEliminated(index));
        log::info!("Player {} eliminated with {} points", index + 1, player.score);
        if state.settings.escape_pods {
            state.entities.spawn(EscapePod {
                player_index: index,
                pos: player.center(),
            });
            state.emit(GameEvent::EscapePodLaunched(index));
        }
    }
}

// ============================================================================
// Phases 11-12: pickups and shockwaves
// ============================================================================

fn collect_powerups(state: &mut GameState) {
    let cap = state.settings.inventory_cap(state.difficulty());
    for uh in state.entities.powerups.handles() {
        let Some(pickup) = state.entities.get(uh) else {
            continue;
        };
        let rect = pickup.rect();
        let kind = pickup.kind;
        let collector = state
            .entities
            .players
            .iter()
            .filter(|(_, p)| !matches!(p.status, PlayerStatus::BetweenLives { .. }))
            .find(|(_, p)| p.held(kind) < cap && p.rect().intersects(&rect))
            .map(|(h, _)| h);
        let Some(ph) = collector else {
            continue;
        };

        state.entities.destroy(uh);
        if let Some(player) = state.entities.players.get_mut(ph) {
            player.inventory[kind.index()] += 1;
            let index = player.index;
            state.emit(GameEvent::PowerUpCollected {
                player: index,
                kind,
            });
        }
    }
}

/// Rings erase alien bullets and land one hit on each alien they reach
fn shockwaves_vs_hostiles(state: &mut GameState) {
    for wh in state.entities.shockwaves.handles() {
        let Some(ring) = state.entities.get(wh) else {
            continue;
        };
        let (center, radius, owner) = (ring.center, ring.radius, ring.owner);
        let already = ring.struck.clone();

        state
            .entities
            .destroy_where::<Bullet>(|b| b.kind.is_alien() && b.rect().intersects_circle(center, radius));

        let struck: Vec<_> = state
            .entities
            .aliens
            .iter()
            .filter(|(h, a)| a.rect().intersects_circle(center, radius) && !already.contains(h))
            .map(|(h, _)| h)
            .collect();
        if let Some(ring) = state.entities.shockwaves.get_mut(wh) {
            ring.struck.extend(struck.iter().copied());
        }

        for ah in struck {
            let Some(alien) = state.entities.aliens.get_mut(ah) else {
                continue;
            };
            let tier = alien.tier;
            if alien.apply_hits(1) {
                kill_alien(state, ah, Some(owner));
            } else {
                state.emit(GameEvent::AlienHit(tier));
            }
        }
    }
}
