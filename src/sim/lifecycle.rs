//! Entity lifecycle management
//!
//! [`Entities`] exclusively owns every entity pool. Systems receive handles,
//! never references that outlive a phase, and destruction cascades so that
//! dependents (tethered minions, a player's squadrons) disappear together
//! with their owner.

use glam::Vec2;

use super::entities::{
    Alien, BarrierSlot, Bullet, EscapePod, Firer, Minion, Nanite, Player, PowerUp, Shield,
    Shockwave, Squadron,
};
use super::pool::{Handle, Pool};

/// Access to the pool holding a given entity type
pub trait Stored: Sized {
    fn pool(entities: &Entities) -> &Pool<Self>;
    fn pool_mut(entities: &mut Entities) -> &mut Pool<Self>;

    /// Remove dependents of an entity that was just destroyed
    fn cascade(_entities: &mut Entities, _destroyed: Handle<Self>) {}
}

macro_rules! stored {
    ($ty:ty, $field:ident) => {
        impl Stored for $ty {
            fn pool(entities: &Entities) -> &Pool<Self> {
                &entities.$field
            }
            fn pool_mut(entities: &mut Entities) -> &mut Pool<Self> {
                &mut entities.$field
            }
        }
    };
}

stored!(Bullet, bullets);
stored!(Minion, minions);
stored!(PowerUp, powerups);
stored!(Shield, shields);
stored!(Squadron, squadrons);
stored!(Nanite, nanites);
stored!(Shockwave, shockwaves);
stored!(EscapePod, escape_pods);

impl Stored for Alien {
    fn pool(entities: &Entities) -> &Pool<Self> {
        &entities.aliens
    }
    fn pool_mut(entities: &mut Entities) -> &mut Pool<Self> {
        &mut entities.aliens
    }

    /// Tethered minions die with their owner
    fn cascade(entities: &mut Entities, destroyed: Handle<Self>) {
        entities.minions.drain_where(|m| m.owner == destroyed);
    }
}

impl Stored for Player {
    fn pool(entities: &Entities) -> &Pool<Self> {
        &entities.players
    }
    fn pool_mut(entities: &mut Entities) -> &mut Pool<Self> {
        &mut entities.players
    }

    /// Player-owned auxiliaries leave with the ship
    fn cascade(entities: &mut Entities, destroyed: Handle<Self>) {
        entities.squadrons.drain_where(|s| s.owner == destroyed);
        entities.nanites.drain_where(|n| n.owner == destroyed);
        entities.shockwaves.drain_where(|s| s.owner == destroyed);
        entities
            .shields
            .drain_where(|s| s.tracked_player == Some(destroyed));
        for (_, alien) in entities.aliens.iter_mut() {
            if alien.target_player == Some(destroyed) {
                alien.target_player = None;
            }
        }
    }
}

/// All live entities
#[derive(Debug, Clone)]
pub struct Entities {
    pub players: Pool<Player>,
    pub aliens: Pool<Alien>,
    pub bullets: Pool<Bullet>,
    pub minions: Pool<Minion>,
    pub powerups: Pool<PowerUp>,
    pub shields: Pool<Shield>,
    pub squadrons: Pool<Squadron>,
    pub nanites: Pool<Nanite>,
    pub shockwaves: Pool<Shockwave>,
    pub escape_pods: Pool<EscapePod>,
    /// Barrier positions and their respawn timers
    pub barriers: Vec<BarrierSlot>,
    /// Shared strafe direction of the fleet (-1 or 1)
    pub fleet_direction: f32,
}

impl Default for Entities {
    fn default() -> Self {
        Self {
            players: Pool::new(),
            aliens: Pool::new(),
            bullets: Pool::new(),
            minions: Pool::new(),
            powerups: Pool::new(),
            shields: Pool::new(),
            squadrons: Pool::new(),
            nanites: Pool::new(),
            shockwaves: Pool::new(),
            escape_pods: Pool::new(),
            barriers: Vec::new(),
            fleet_direction: 1.0,
        }
    }
}

impl Entities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<T: Stored>(&mut self, value: T) -> Handle<T> {
        T::pool_mut(self).spawn(value)
    }

    pub fn get<T: Stored>(&self, handle: Handle<T>) -> Option<&T> {
        T::pool(self).get(handle)
    }

    pub fn get_mut<T: Stored>(&mut self, handle: Handle<T>) -> Option<&mut T> {
        T::pool_mut(self).get_mut(handle)
    }

    pub fn is_alive<T: Stored>(&self, handle: Handle<T>) -> bool {
        T::pool(self).contains(handle)
    }

    /// Destroy an entity and its dependents. Stale handles are ignored.
    pub fn destroy<T: Stored>(&mut self, handle: Handle<T>) -> Option<T> {
        let value = T::pool_mut(self).destroy(handle)?;
        T::cascade(self, handle);
        Some(value)
    }

    pub fn count_where<T: Stored>(&self, predicate: impl FnMut(&T) -> bool) -> usize {
        T::pool(self).count_where(predicate)
    }

    pub fn handles<T: Stored>(&self) -> Vec<Handle<T>> {
        T::pool(self).handles()
    }

    /// Destroy every entity matching `remove` (with cascades)
    pub fn destroy_where<T: Stored>(&mut self, mut remove: impl FnMut(&T) -> bool) -> Vec<T> {
        let doomed: Vec<Handle<T>> = T::pool(self)
            .iter()
            .filter(|(_, v)| remove(v))
            .map(|(h, _)| h)
            .collect();
        doomed.into_iter().filter_map(|h| self.destroy(h)).collect()
    }

    /// Live bullets counted against a firer
    pub fn bullets_in_flight(&self, firer: Firer) -> usize {
        self.bullets.count_where(|b| b.firer() == firer)
    }

    /// Spawn a bullet unless its firer already has `cap` in flight.
    ///
    /// Requests over the cap are dropped silently.
    pub fn try_fire(&mut self, bullet: Bullet, cap: u32) -> Option<Handle<Bullet>> {
        if self.bullets_in_flight(bullet.firer()) >= cap as usize {
            log::trace!("fire request over cap {cap} dropped for {:?}", bullet.firer());
            return None;
        }
        Some(self.bullets.spawn(bullet))
    }

    pub fn squadron_count(&self, player: Handle<Player>) -> usize {
        self.squadrons.count_where(|s| s.owner == player)
    }

    pub fn nanite_count(&self, player: Handle<Player>) -> usize {
        self.nanites.count_where(|n| n.owner == player)
    }

    pub fn mobile_shield_count(&self, player: Handle<Player>) -> usize {
        self.shields.count_where(|s| s.tracked_player == Some(player))
    }

    pub fn live_alien_count(&self) -> usize {
        self.aliens.len()
    }

    /// Handle of the player in a seat, if that ship is still in the run
    pub fn player_by_index(&self, index: usize) -> Option<Handle<Player>> {
        self.players
            .iter()
            .find(|(_, p)| p.index == index)
            .map(|(h, _)| h)
    }

    /// Live player closest to `point` horizontally
    pub fn nearest_player(&self, point: Vec2) -> Option<Handle<Player>> {
        self.players
            .iter()
            .min_by(|(_, a), (_, b)| {
                let da = (a.center().x - point.x).abs();
                let db = (b.center().x - point.x).abs();
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(h, _)| h)
    }

    /// Remove every projectile (between waves)
    pub fn clear_bullets(&mut self) {
        self.bullets.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entities::{AlienTier, BulletKind, Movement, Owner, PlayerStatus};

    fn player(index: usize) -> Player {
        Player {
            index,
            pos: Vec2::new(100.0 * index as f32, 600.0),
            size: Vec2::new(60.0, 50.0),
            health: 3,
            lives: 3,
            score: 0,
            level: 0,
            inventory: [0; 3],
            next_fire: 0.0,
            next_mobile_shield: 0.0,
            status: PlayerStatus::Alive,
        }
    }

    fn tanker() -> Alien {
        Alien {
            tier: AlienTier::Tanker,
            pos: Vec2::new(300.0, 50.0),
            size: Vec2::new(110.0, 100.0),
            movement: Movement::Heavy,
            entry_target_y: None,
            damage_stage: 0,
            max_damage: 16,
            fire_timer: 0.0,
            target_player: None,
        }
    }

    fn shot(owner: Owner) -> Bullet {
        Bullet {
            kind: BulletKind::Player,
            pos: Vec2::ZERO,
            vel: Vec2::new(0.0, -600.0),
            size: Vec2::new(4.0, 14.0),
            owner,
            squadron: None,
        }
    }

    #[test]
    fn test_bullet_cap() {
        let mut entities = Entities::new();
        let p = entities.spawn(player(0));
        let cap = 3;

        let fired: Vec<_> = (0..cap)
            .filter_map(|_| entities.try_fire(shot(Owner::Player(p)), cap))
            .collect();
        assert_eq!(fired.len(), 3);

        // k + 1th is dropped
        assert!(entities.try_fire(shot(Owner::Player(p)), cap).is_none());
        assert_eq!(entities.bullets.len(), 3);

        // Freeing one slot lets the next shot through
        entities.destroy(fired[0]);
        assert!(entities.try_fire(shot(Owner::Player(p)), cap).is_some());
    }

    #[test]
    fn test_squadron_bullets_have_their_own_cap() {
        let mut entities = Entities::new();
        let p = entities.spawn(player(0));
        let sq = entities.spawn(Squadron {
            owner: p,
            side: 1.0,
            pos: Vec2::ZERO,
            size: Vec2::new(30.0, 26.0),
            hits_taken: 0,
            damaged: false,
        });

        assert!(entities.try_fire(shot(Owner::Player(p)), 1).is_some());
        let mut wing_shot = shot(Owner::Player(p));
        wing_shot.squadron = Some(sq);
        assert!(entities.try_fire(wing_shot.clone(), 1).is_some());
        assert!(entities.try_fire(wing_shot, 1).is_none());
    }

    #[test]
    fn test_destroying_owner_removes_minions() {
        let mut entities = Entities::new();
        let owner = entities.spawn(tanker());
        let other = entities.spawn(tanker());
        for o in [owner, owner, other] {
            entities.spawn(Minion {
                owner: o,
                offset: Vec2::ZERO,
                pos: Vec2::ZERO,
                size: Vec2::new(30.0, 30.0),
                fire_timer: 0.0,
            });
        }

        entities.destroy(owner);
        assert_eq!(entities.minions.len(), 1);
        assert!(entities.minions.values().all(|m| m.owner == other));
        assert!(!entities.is_alive(owner));
    }

    #[test]
    fn test_removing_player_clears_auxiliaries_and_targets() {
        let mut entities = Entities::new();
        let p = entities.spawn(player(0));
        let keep = entities.spawn(player(1));
        entities.spawn(Squadron {
            owner: p,
            side: -1.0,
            pos: Vec2::ZERO,
            size: Vec2::new(30.0, 26.0),
            hits_taken: 0,
            damaged: false,
        });
        entities.spawn(Nanite {
            owner: p,
            pulses_remaining: 3,
            next_pulse: 0.0,
        });
        let mut hunter = tanker();
        hunter.tier = AlienTier::Cruiser;
        hunter.target_player = Some(p);
        let hunter = entities.spawn(hunter);

        let orphan = entities.try_fire(shot(Owner::Player(p)), 5);
        entities.destroy(p);

        assert_eq!(entities.squadron_count(p), 0);
        assert_eq!(entities.nanite_count(p), 0);
        assert_eq!(entities.get(hunter).and_then(|a| a.target_player), None);
        assert_eq!(entities.player_by_index(1), Some(keep));
        // Orphaned bullets stay in flight; their owner just stops resolving
        let orphan = orphan.and_then(|h| entities.get(h)).and_then(|b| b.player_owner());
        assert!(orphan.is_some_and(|owner| entities.get(owner).is_none()));
    }

    #[test]
    fn test_count_where_and_nearest_player() {
        let mut entities = Entities::new();
        let a = entities.spawn(player(0));
        let b = entities.spawn(player(3));
        assert_eq!(entities.count_where::<Player>(|p| p.index > 0), 1);
        assert_eq!(entities.nearest_player(Vec2::new(10.0, 0.0)), Some(a));
        assert_eq!(entities.nearest_player(Vec2::new(320.0, 0.0)), Some(b));
    }
}
