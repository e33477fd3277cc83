//! Per-tick movement, firing and timers
//!
//! Everything that happens before collisions: ships react to input, auxiliaries
//! follow their owners, aliens move by tier pattern and fire, projectiles fly
//! and leave the field, shields heal and barriers respawn.

use std::f32::consts::TAU;

use glam::Vec2;

use super::entities::{
    AlienTier, Bullet, BulletKind, EscapePod, Movement, Nanite, Owner, Player, PlayerStatus,
    PowerUp, PowerUpKind, Shield, Shockwave, Squadron,
};
use super::events::GameEvent;
use super::hitbox::Rect;
use super::pool::Handle;
use super::state::{GameState, player_home_y};
use super::tick::{PlayerInput, TickInput};
use super::waves::{random_drift, roll_interval};
use crate::consts::PLAYER_LEVELS;
use crate::settings::{BulletSettings, Settings};

/// Highest a ship may climb, as a fraction of the field height
const PLAYER_CEILING_FRACTION: f32 = 0.5;

/// Run every pre-collision system for one tick
pub fn update_movement(state: &mut GameState, input: &TickInput, dt: f32) {
    update_players(state, input, dt);
    update_auxiliaries(state, dt);
    update_aliens(state, dt);
    update_minions(state);
    fire_aliens(state);
    update_projectiles(state, dt);
    update_shields(state);
}

// ============================================================================
// Players
// ============================================================================

/// Apply input and advance life-cycle timers for every ship
pub fn update_players(state: &mut GameState, input: &TickInput, dt: f32) {
    for handle in state.entities.players.handles() {
        let Some(player) = state.entities.get(handle) else {
            continue;
        };
        let controls = input
            .players
            .get(player.index)
            .cloned()
            .unwrap_or_default();

        step_status(state, handle);
        steer_player(state, handle, &controls, dt);
        if controls.fire {
            fire_player(state, handle);
        }
        if controls.deploy_shield {
            deploy_mobile_shield(state, handle);
        }
        if let Some(kind) = controls.use_powerup {
            use_powerup(state, handle, kind);
        }
    }
}

fn step_status(state: &mut GameState, handle: Handle<Player>) {
    let now = state.now();
    let home_y = player_home_y(&state.settings);
    let max_health = state.settings.player.max_health;
    let respawning_ms = state.settings.player.respawning_ms;
    let Some(player) = state.entities.players.get_mut(handle) else {
        return;
    };

    match player.status {
        PlayerStatus::BetweenLives { until } if now >= until => {
            player.pos.y = home_y;
            player.health = max_health;
            player.status = PlayerStatus::Respawning {
                until: now + respawning_ms,
            };
        }
        PlayerStatus::Respawning { until } if now >= until => {
            player.status = PlayerStatus::Alive;
            let index = player.index;
            state.emit(GameEvent::PlayerRespawned(index));
            log::debug!("Player {} back in action", index + 1);
        }
        _ => {}
    }
}

fn steer_player(state: &mut GameState, handle: Handle<Player>, controls: &PlayerInput, dt: f32) {
    let width = state.settings.field_width;
    let home_y = player_home_y(&state.settings);
    let ceiling = state.settings.field_height * PLAYER_CEILING_FRACTION;
    let step = state.settings.player.speed * dt;
    let Some(player) = state.entities.players.get_mut(handle) else {
        return;
    };

    match player.status {
        PlayerStatus::Alive => {
            player.pos.x += controls.move_x.clamp(-1.0, 1.0) * step;
            player.pos.y += controls.move_y.clamp(-1.0, 1.0) * step;
            player.pos.y = player.pos.y.clamp(ceiling, home_y);
        }
        PlayerStatus::Respawning { .. } => {
            player.pos.x += controls.move_x.clamp(-1.0, 1.0) * step;
        }
        PlayerStatus::BetweenLives { .. } => {
            // Auto-fly to the bottom of the field
            player.pos.y = (player.pos.y + step).min(home_y);
        }
    }
    player.pos.x = player.pos.x.clamp(0.0, (width - player.size.x).max(0.0));
}

fn player_shot(settings: &BulletSettings, owner: Handle<Player>, muzzle: Vec2) -> Bullet {
    let size = settings.player_size;
    Bullet {
        kind: BulletKind::Player,
        pos: Vec2::new(muzzle.x - size.x / 2.0, muzzle.y - size.y),
        vel: Vec2::new(0.0, -settings.player_speed),
        size,
        owner: Owner::Player(owner),
        squadron: None,
    }
}

/// Fire the ship's cannon; its squadrons mirror the shot
fn fire_player(state: &mut GameState, handle: Handle<Player>) {
    let now = state.now();
    let Some(player) = state.entities.get(handle) else {
        return;
    };
    if !player.can_fire(now) {
        return;
    }
    let index = player.index;
    let muzzle = Vec2::new(player.center().x, player.pos.y);
    let cap = state.settings.player.bullet_caps[player.level.min(PLAYER_LEVELS - 1)];
    let wing_cap = state.settings.powerups.squadron_bullet_cap;

    let mut fired = state
        .entities
        .try_fire(player_shot(&state.settings.bullets, handle, muzzle), cap)
        .is_some();

    let wings: Vec<(Handle<Squadron>, Vec2)> = state
        .entities
        .squadrons
        .iter()
        .filter(|(_, s)| s.owner == handle)
        .map(|(h, s)| (h, Vec2::new(s.pos.x + s.size.x / 2.0, s.pos.y)))
        .collect();
    for (squadron, muzzle) in wings {
        let mut shot = player_shot(&state.settings.bullets, handle, muzzle);
        shot.squadron = Some(squadron);
        fired |= state.entities.try_fire(shot, wing_cap).is_some();
    }

    if fired {
        let cooldown = state.settings.player.fire_cooldown_ms;
        if let Some(player) = state.entities.get_mut(handle) {
            player.next_fire = now + cooldown;
        }
        state.emit(GameEvent::PlayerFire(index));
    }
}

fn mobile_shield_pos(player: &Player, settings: &Settings) -> Vec2 {
    let size = settings.shields.mobile_size;
    Vec2::new(
        player.center().x - size.x / 2.0,
        player.pos.y - settings.shields.mobile_offset - size.y,
    )
}

fn deploy_mobile_shield(state: &mut GameState, handle: Handle<Player>) {
    let now = state.now();
    let cap = state.settings.shields.mobile_cap as usize;
    let Some(player) = state.entities.get(handle) else {
        return;
    };
    if player.status != PlayerStatus::Alive
        || now < player.next_mobile_shield
        || state.entities.mobile_shield_count(handle) >= cap
    {
        return;
    }
    let index = player.index;
    let pos = mobile_shield_pos(player, &state.settings);

    state.entities.spawn(Shield {
        stage_index: 0,
        pos,
        size: state.settings.shields.mobile_size,
        tracked_player: Some(handle),
        slot: None,
        last_hit: now,
        last_regen: now,
    });
    let cooldown = state.settings.shields.mobile_cooldown_ms;
    if let Some(player) = state.entities.get_mut(handle) {
        player.next_mobile_shield = now + cooldown;
    }
    state.emit(GameEvent::ShieldDeployed(index));
}

/// Spend one held pickup; nothing is spent when the effect is capped
fn use_powerup(state: &mut GameState, handle: Handle<Player>, kind: PowerUpKind) {
    let Some(player) = state.entities.get(handle) else {
        return;
    };
    if player.status != PlayerStatus::Alive || player.held(kind) == 0 {
        return;
    }
    let index = player.index;
    let center = player.center();

    let used = match kind {
        PowerUpKind::Squadron => launch_squadron(state, handle),
        PowerUpKind::Nanite => {
            let ps = &state.settings.powerups;
            if state.entities.nanite_count(handle) < ps.nanite_cap as usize {
                let nanite = Nanite {
                    owner: handle,
                    pulses_remaining: ps.nanite_pulses,
                    next_pulse: state.now() + ps.nanite_interval_ms,
                };
                state.entities.spawn(nanite);
                true
            } else {
                false
            }
        }
        PowerUpKind::Shockwave => {
            state.entities.spawn(Shockwave {
                owner: handle,
                center,
                radius: 0.0,
                struck: Vec::new(),
            });
            state.emit(GameEvent::ShockwaveFired(index));
            true
        }
    };

    if used {
        if let Some(player) = state.entities.get_mut(handle) {
            player.inventory[kind.index()] -= 1;
        }
        log::debug!("Player {} used {}", index + 1, kind.name());
    }
}

fn launch_squadron(state: &mut GameState, handle: Handle<Player>) -> bool {
    let cap = state.settings.squadron_cap(state.difficulty()) as usize;
    if state.entities.squadron_count(handle) >= cap {
        return false;
    }
    let Some(player) = state.entities.get(handle) else {
        return false;
    };
    let index = player.index;
    let owned = || state.entities.squadrons.values().filter(|s| s.owner == handle);
    let left = owned().filter(|s| s.side < 0.0).count();
    let right = owned().filter(|s| s.side > 0.0).count();
    let side = if left <= right {
        -(left as f32 + 1.0)
    } else {
        right as f32 + 1.0
    };
    let size = state.settings.powerups.squadron_size;
    let pos = squadron_pos(player, side, size, state.settings.powerups.squadron_offset);

    state.entities.spawn(Squadron {
        owner: handle,
        side,
        pos,
        size,
        hits_taken: 0,
        damaged: false,
    });
    state.emit(GameEvent::SquadronLaunched(index));
    true
}

fn squadron_pos(player: &Player, side: f32, size: Vec2, offset: f32) -> Vec2 {
    Vec2::new(
        player.center().x + side * offset - size.x / 2.0,
        player.pos.y + player.size.y - size.y,
    )
}

// ============================================================================
// Auxiliaries
// ============================================================================

/// Squadrons and mobile shields follow their ship; nanites pulse; rings grow
pub fn update_auxiliaries(state: &mut GameState, dt: f32) {
    let now = state.now();
    let offset = state.settings.powerups.squadron_offset;

    let players = &state.entities.players;
    for (_, squadron) in state.entities.squadrons.iter_mut() {
        if let Some(player) = players.get(squadron.owner) {
            squadron.pos = squadron_pos(player, squadron.side, squadron.size, offset);
        }
    }
    for (_, shield) in state.entities.shields.iter_mut() {
        if let Some(player) = shield.tracked_player.and_then(|h| players.get(h)) {
            shield.pos = mobile_shield_pos(player, &state.settings);
        }
    }

    // Nanite pulses
    let interval = state.settings.powerups.nanite_interval_ms;
    let mut heals = Vec::new();
    for (_, nanite) in state.entities.nanites.iter_mut() {
        if nanite.pulses_remaining > 0 && now >= nanite.next_pulse {
            nanite.pulses_remaining -= 1;
            nanite.next_pulse += interval;
            heals.push(nanite.owner);
        }
    }
    let heal = state.settings.powerups.nanite_heal;
    let max_health = state.settings.player.max_health;
    for owner in heals {
        if let Some(player) = state.entities.players.get_mut(owner) {
            player.health = (player.health + heal).min(max_health);
            let index = player.index;
            state.emit(GameEvent::NaniteHeal(index));
        }
    }
    state
        .entities
        .destroy_where::<Nanite>(|n| n.pulses_remaining == 0);

    let growth = state.settings.powerups.shockwave_speed * dt;
    let max_radius = state.settings.powerups.shockwave_max_radius;
    for (_, ring) in state.entities.shockwaves.iter_mut() {
        ring.radius += growth;
    }
    state
        .entities
        .destroy_where::<Shockwave>(|s| s.radius >= max_radius);
}

// ============================================================================
// Aliens
// ============================================================================

/// Move every alien by its tier pattern
pub fn update_aliens(state: &mut GameState, dt: f32) {
    let now = state.now();
    let settings = &state.settings;
    let modifiers = &state.modifiers;
    let rng = &mut state.rng;
    let players = &state.entities.players;
    let width = settings.field_width;
    let direction = state.entities.fleet_direction;

    for (_, alien) in state.entities.aliens.iter_mut() {
        if let Some(target_y) = alien.entry_target_y {
            alien.pos.y = (alien.pos.y + settings.fleet_warp_speed * dt).min(target_y);
            if alien.pos.y >= target_y {
                alien.entry_target_y = None;
            }
            continue;
        }

        let speed = modifiers.speed_for(alien.tier);
        let max_x = (width - alien.size.x).max(0.0);
        match &mut alien.movement {
            Movement::Fleet => {
                alien.pos.x += direction * speed * dt;
                alien.pos.y += modifiers.fleet_drop_speed * dt;
            }
            Movement::Zigzag { base_x, phase } => {
                *phase += settings.zigzag_frequency * TAU * dt;
                alien.pos.x = (*base_x + settings.zigzag_amplitude * phase.sin()).clamp(0.0, max_x);
                alien.pos.y += speed * dt;
            }
            Movement::Drift { dir, next_change } => {
                if now >= *next_change {
                    *dir = random_drift(rng);
                    *next_change = now + settings.drift_change_ms;
                }
                alien.pos += *dir * speed * dt;
                if alien.pos.x <= 0.0 || alien.pos.x >= max_x {
                    dir.x = -dir.x;
                    alien.pos.x = alien.pos.x.clamp(0.0, max_x);
                }
            }
            Movement::Dive { speed_factor } => {
                alien.pos.y += speed * *speed_factor * dt;
            }
            Movement::Heavy => {
                alien.pos.y += speed * dt;
                let target = alien.target_player.and_then(|h| players.get(h));
                if let Some(target) = target {
                    let dx = target.center().x - (alien.pos.x + alien.size.x / 2.0);
                    let step = settings.tracking_speed * modifiers.speed_multiplier * dt;
                    alien.pos.x = (alien.pos.x + dx.clamp(-step, step)).clamp(0.0, max_x);
                }
            }
        }
    }

    // Fleet reverses once any settled member reaches a side margin
    let margin = settings.fleet_side_margin;
    let settled = || {
        state
            .entities
            .aliens
            .values()
            .filter(|a| a.tier == AlienTier::Fleet && !a.is_entering())
    };
    let hit_left = settled().any(|a| a.pos.x < margin);
    let hit_right = settled().any(|a| a.rect().right() > width - margin);
    if direction > 0.0 && hit_right {
        state.entities.fleet_direction = -1.0;
    } else if direction < 0.0 && hit_left {
        state.entities.fleet_direction = 1.0;
    }
}

/// Bullet kinds and muzzle points (bottom edge) for one volley
fn alien_volley(tier: AlienTier, rect: Rect) -> Vec<(BulletKind, Vec2)> {
    let bottom_center = Vec2::new(rect.center().x, rect.bottom());
    match tier {
        AlienTier::Fleet | AlienTier::Zigzag => vec![(BulletKind::Standard, bottom_center)],
        AlienTier::Drifter => vec![(BulletKind::Rainbow, bottom_center)],
        AlienTier::Destroyer => vec![(BulletKind::Plasma, bottom_center)],
        AlienTier::Cruiser => {
            let inset = rect.w / 6.0;
            vec![
                (BulletKind::WingBolt, Vec2::new(rect.left() + inset, rect.bottom())),
                (BulletKind::WingBolt, Vec2::new(rect.right() - inset, rect.bottom())),
            ]
        }
        AlienTier::Diver | AlienTier::Tanker => Vec::new(),
    }
}

fn alien_shot(settings: &BulletSettings, kind: BulletKind, owner: Owner, muzzle: Vec2, speed_multiplier: f32) -> Bullet {
    let size = settings.alien_size;
    Bullet {
        kind,
        pos: Vec2::new(muzzle.x - size.x / 2.0, muzzle.y),
        vel: Vec2::new(0.0, settings.alien_speed * speed_multiplier),
        size,
        owner,
        squadron: None,
    }
}

/// Aliens whose fire timer elapsed shoot, within their tier's bullet cap
pub fn fire_aliens(state: &mut GameState) {
    let now = state.now();
    let mut volleys = Vec::new();
    for (handle, alien) in state.entities.aliens.iter_mut() {
        if alien.is_entering() || alien.pos.y < 0.0 || now < alien.fire_timer {
            continue;
        }
        let window = state.modifiers.fire_interval_for(alien.tier);
        if window.is_never() {
            continue;
        }
        alien.fire_timer = now + roll_interval(&mut state.rng, window);
        volleys.push((handle, alien.tier, alien.rect()));
    }

    let speed_multiplier = state.modifiers.speed_multiplier;
    for (handle, tier, rect) in volleys {
        let cap = state.settings.tier(tier.level()).bullet_cap;
        let mut fired = false;
        for (kind, muzzle) in alien_volley(tier, rect) {
            let shot = alien_shot(&state.settings.bullets, kind, Owner::Alien(handle), muzzle, speed_multiplier);
            fired |= state.entities.try_fire(shot, cap).is_some();
        }
        if fired {
            state.emit(GameEvent::AlienFire(tier));
        }
    }
}

/// Minions stay tethered to their owner and fire lasers
pub fn update_minions(state: &mut GameState) {
    let now = state.now();
    let aliens = &state.entities.aliens;
    let mut shots = Vec::new();
    for (handle, minion) in state.entities.minions.iter_mut() {
        let Some(owner) = aliens.get(minion.owner) else {
            continue;
        };
        minion.pos = owner.pos + minion.offset;
        if minion.pos.y >= 0.0 && now >= minion.fire_timer {
            minion.fire_timer = now + roll_interval(&mut state.rng, state.modifiers.minion_fire_interval);
            shots.push((handle, minion.rect()));
        }
    }

    let cap = state.settings.minions.bullet_cap;
    let speed_multiplier = state.modifiers.speed_multiplier;
    for (handle, rect) in shots {
        let muzzle = Vec2::new(rect.center().x, rect.bottom());
        let shot = alien_shot(&state.settings.bullets, BulletKind::Laser, Owner::Minion(handle), muzzle, speed_multiplier);
        if state.entities.try_fire(shot, cap).is_some() {
            state.emit(GameEvent::AlienFire(AlienTier::Tanker));
        }
    }
}

// ============================================================================
// Projectiles, pickups, pods
// ============================================================================

/// Move bullets, pickups and escape pods; drop whatever left the field
pub fn update_projectiles(state: &mut GameState, dt: f32) {
    let field = Rect::new(0.0, 0.0, state.settings.field_width, state.settings.field_height);

    for (_, bullet) in state.entities.bullets.iter_mut() {
        bullet.pos += bullet.vel * dt;
    }
    state
        .entities
        .destroy_where::<Bullet>(|b| !b.rect().intersects(&field));

    let drift = state.settings.powerups.drift_speed * dt;
    for (_, pickup) in state.entities.powerups.iter_mut() {
        pickup.pos.y += drift;
    }
    state
        .entities
        .destroy_where::<PowerUp>(|p| p.pos.y > field.bottom());

    let climb = state.settings.escape_pod_speed * dt;
    for (_, pod) in state.entities.escape_pods.iter_mut() {
        pod.pos.y -= climb;
    }
    state
        .entities
        .destroy_where::<EscapePod>(|p| p.pos.y < -field.h * 0.1);
}

// ============================================================================
// Shields
// ============================================================================

/// Heal idle shields one stage at a time and respawn destroyed barriers
pub fn update_shields(state: &mut GameState) {
    let now = state.now();
    let regen = state.settings.shields.regen_ms;

    let mut recharged = 0;
    for (_, shield) in state.entities.shields.iter_mut() {
        if shield.stage_index > 0 && now - shield.last_hit >= regen && now - shield.last_regen >= regen {
            shield.recharge();
            shield.last_regen = now;
            recharged += 1;
        }
    }
    for _ in 0..recharged {
        state.emit(GameEvent::ShieldRecharge);
    }

    let size = state.settings.shields.barrier_size;
    for slot in 0..state.entities.barriers.len() {
        let barrier = &mut state.entities.barriers[slot];
        if !barrier.respawn_at.is_some_and(|t| now >= t) {
            continue;
        }
        barrier.respawn_at = None;
        let pos = barrier.pos;
        state.entities.spawn(Shield {
            stage_index: 0,
            pos,
            size,
            tracked_player: None,
            slot: Some(slot),
            last_hit: now,
            last_regen: now,
        });
        state.emit(GameEvent::ShieldRespawn);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{DifficultyMode, Settings};
    use crate::sim::entities::Alien;
    use crate::sim::state::{GamePhase, StartConfig};
    use crate::sim::waves::start_wave;

    const DT: f32 = 1.0 / 60.0;

    fn playing(players: usize, mode: DifficultyMode) -> GameState {
        let mut state = GameState::new(Settings::default(), 11);
        state
            .start(StartConfig {
                player_count: players,
                difficulty: mode,
                ..Default::default()
            })
            .unwrap();
        start_wave(&mut state, 0);
        state.entities.aliens.clear();
        assert_eq!(state.phase, GamePhase::Playing);
        state
    }

    fn fire_input() -> TickInput {
        TickInput {
            players: vec![PlayerInput {
                fire: true,
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn first_player(state: &GameState) -> Handle<Player> {
        state.entities.player_by_index(0).unwrap()
    }

    #[test]
    fn test_fire_respects_cooldown_and_cap() {
        let mut state = playing(1, DifficultyMode::Normal);
        let input = fire_input();

        update_players(&mut state, &input, DT);
        assert_eq!(state.entities.bullets.len(), 1);

        // Cooldown blocks an immediate second shot
        update_players(&mut state, &input, DT);
        assert_eq!(state.entities.bullets.len(), 1);

        // Level 0 cap is 2 shots in flight
        for _ in 0..3 {
            state.clock_ms += 300.0;
            update_players(&mut state, &input, DT);
        }
        assert_eq!(state.entities.bullets.len(), 2);
    }

    #[test]
    fn test_respawning_ship_cannot_fire_or_climb() {
        let mut state = playing(1, DifficultyMode::Normal);
        let p = first_player(&state);
        let start_y = state.entities.get(p).unwrap().pos.y;
        state.entities.get_mut(p).unwrap().status = PlayerStatus::Respawning { until: 1e9 };

        let input = TickInput {
            players: vec![PlayerInput {
                fire: true,
                move_x: 1.0,
                move_y: -1.0,
                ..Default::default()
            }],
            ..Default::default()
        };
        let start_x = state.entities.get(p).unwrap().pos.x;
        update_players(&mut state, &input, DT);

        let player = state.entities.get(p).unwrap();
        assert!(state.entities.bullets.is_empty());
        assert_eq!(player.pos.y, start_y);
        assert!(player.pos.x > start_x);
    }

    #[test]
    fn test_between_lives_cycle() {
        let mut state = playing(1, DifficultyMode::Normal);
        let p = first_player(&state);
        {
            let player = state.entities.get_mut(p).unwrap();
            player.health = 0;
            player.status = PlayerStatus::BetweenLives { until: 100.0 };
        }
        state.clock_ms = 100.0;
        update_players(&mut state, &TickInput::default(), DT);
        let player = state.entities.get(p).unwrap();
        assert!(matches!(player.status, PlayerStatus::Respawning { .. }));
        assert_eq!(player.health, state.settings.player.max_health);

        state.clock_ms += state.settings.player.respawning_ms;
        update_players(&mut state, &TickInput::default(), DT);
        assert_eq!(state.entities.get(p).unwrap().status, PlayerStatus::Alive);
        assert!(state.take_events().contains(&GameEvent::PlayerRespawned(0)));
    }

    #[test]
    fn test_squadrons_mirror_fire_and_respect_cap() {
        let mut state = playing(1, DifficultyMode::Normal);
        let p = first_player(&state);
        state.entities.get_mut(p).unwrap().inventory[PowerUpKind::Squadron.index()] = 3;

        let launch = TickInput {
            players: vec![PlayerInput {
                use_powerup: Some(PowerUpKind::Squadron),
                ..Default::default()
            }],
            ..Default::default()
        };
        for _ in 0..3 {
            update_players(&mut state, &launch, DT);
        }
        // Normal mode caps squadrons at 2; the third pickup is kept
        assert_eq!(state.entities.squadron_count(p), 2);
        assert_eq!(state.entities.get(p).unwrap().held(PowerUpKind::Squadron), 1);
        let sides: Vec<f32> = state.entities.squadrons.values().map(|s| s.side).collect();
        assert!(sides.contains(&-1.0) && sides.contains(&1.0));

        update_players(&mut state, &fire_input(), DT);
        assert_eq!(state.entities.bullets.len(), 3);
        assert_eq!(
            state.entities.bullets.count_where(|b| b.squadron.is_some()),
            2
        );
    }

    #[test]
    fn test_hard_mode_allows_four_squadrons() {
        let mut state = playing(1, DifficultyMode::Hard);
        let p = first_player(&state);
        state.entities.get_mut(p).unwrap().inventory[PowerUpKind::Squadron.index()] = 6;
        let launch = TickInput {
            players: vec![PlayerInput {
                use_powerup: Some(PowerUpKind::Squadron),
                ..Default::default()
            }],
            ..Default::default()
        };
        for _ in 0..6 {
            update_players(&mut state, &launch, DT);
        }
        assert_eq!(state.entities.squadron_count(p), 4);
    }

    #[test]
    fn test_mobile_shield_cap_and_tracking() {
        let mut state = playing(1, DifficultyMode::Normal);
        let p = first_player(&state);
        let deploy = TickInput {
            players: vec![PlayerInput {
                deploy_shield: true,
                move_x: 1.0,
                ..Default::default()
            }],
            ..Default::default()
        };
        update_players(&mut state, &deploy, DT);
        state.clock_ms += state.settings.shields.mobile_cooldown_ms;
        update_players(&mut state, &deploy, DT);
        assert_eq!(state.entities.mobile_shield_count(p), 1);

        update_auxiliaries(&mut state, DT);
        let player_x = state.entities.get(p).unwrap().center().x;
        let shield = state
            .entities
            .shields
            .values()
            .find(|s| s.is_mobile())
            .unwrap();
        assert!((shield.rect().center().x - player_x).abs() < 1e-3);
    }

    #[test]
    fn test_nanites_heal_then_expire() {
        let mut state = playing(1, DifficultyMode::Normal);
        let p = first_player(&state);
        {
            let player = state.entities.get_mut(p).unwrap();
            player.health = 1;
            player.inventory[PowerUpKind::Nanite.index()] = 1;
        }
        let use_nanite = TickInput {
            players: vec![PlayerInput {
                use_powerup: Some(PowerUpKind::Nanite),
                ..Default::default()
            }],
            ..Default::default()
        };
        update_players(&mut state, &use_nanite, DT);
        assert_eq!(state.entities.nanite_count(p), 1);

        let interval = state.settings.powerups.nanite_interval_ms;
        for _ in 0..state.settings.powerups.nanite_pulses {
            state.clock_ms += interval;
            update_auxiliaries(&mut state, DT);
        }
        assert_eq!(state.entities.get(p).unwrap().health, state.settings.player.max_health);
        assert_eq!(state.entities.nanite_count(p), 0);
    }

    #[test]
    fn test_fleet_reverses_at_margin() {
        let mut state = playing(1, DifficultyMode::Normal);
        let size = state.settings.tier(1).size;
        state.entities.spawn(Alien {
            tier: AlienTier::Fleet,
            pos: Vec2::new(state.settings.field_width - size.x - 1.0, 100.0),
            size,
            movement: Movement::Fleet,
            entry_target_y: None,
            damage_stage: 0,
            max_damage: 0,
            fire_timer: 1e9,
            target_player: None,
        });
        update_aliens(&mut state, DT);
        assert_eq!(state.entities.fleet_direction, -1.0);
    }

    #[test]
    fn test_entering_rows_settle() {
        let mut state = GameState::new(Settings::default(), 3);
        state.start(StartConfig::default()).unwrap();
        start_wave(&mut state, 0);
        for _ in 0..120 {
            update_aliens(&mut state, DT);
        }
        assert!(state.entities.aliens.values().all(|a| !a.is_entering()));
        let min_y = state
            .entities
            .aliens
            .values()
            .map(|a| a.pos.y)
            .fold(f32::MAX, f32::min);
        assert!(min_y >= state.settings.fleet_top_margin);
    }

    #[test]
    fn test_cruiser_fires_two_wing_bolts() {
        let mut state = playing(1, DifficultyMode::Normal);
        let stats = state.settings.tier(6).clone();
        state.entities.spawn(Alien {
            tier: AlienTier::Cruiser,
            pos: Vec2::new(300.0, 100.0),
            size: stats.size,
            movement: Movement::Heavy,
            entry_target_y: None,
            damage_stage: 0,
            max_damage: stats.max_damage,
            fire_timer: 0.0,
            target_player: None,
        });
        fire_aliens(&mut state);
        assert_eq!(
            state.entities.bullets.count_where(|b| b.kind == BulletKind::WingBolt),
            2
        );
        assert!(state.take_events().contains(&GameEvent::AlienFire(AlienTier::Cruiser)));
    }

    #[test]
    fn test_bullets_leave_field() {
        let mut state = playing(1, DifficultyMode::Normal);
        update_players(&mut state, &fire_input(), DT);
        assert_eq!(state.entities.bullets.len(), 1);
        for _ in 0..120 {
            update_projectiles(&mut state, DT);
        }
        assert!(state.entities.bullets.is_empty());
    }

    #[test]
    fn test_shield_regen_and_barrier_respawn() {
        let mut state = playing(1, DifficultyMode::Normal);
        let regen = state.settings.shields.regen_ms;
        let shield = state.entities.shields.handles()[0];
        state.entities.get_mut(shield).unwrap().damage(2, state.clock_ms);

        state.clock_ms += regen;
        update_shields(&mut state);
        assert_eq!(state.entities.get(shield).unwrap().stage_index, 1);

        // Empty slot refills once its timer elapses
        state.entities.destroy(shield);
        state.entities.barriers[0].respawn_at = Some(state.clock_ms + 10.0);
        update_shields(&mut state);
        assert_eq!(state.entities.shields.len(), 2);
        state.clock_ms += 10.0;
        update_shields(&mut state);
        assert_eq!(state.entities.shields.len(), 3);
        assert!(state.take_events().contains(&GameEvent::ShieldRespawn));
    }
}
