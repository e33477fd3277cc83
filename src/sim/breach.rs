//! Breach accounting
//!
//! Aliens whose top edge passes the bottom of the field are removed and
//! charged against the wave's defense by tier weight. Once the charge exceeds
//! the tolerance, the run is lost on that tick.

use serde::{Deserialize, Serialize};

use super::entities::Alien;
use super::events::GameEvent;
use super::state::GameState;

/// Per-wave defense state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefenseState {
    /// Weighted breaches the wave can absorb (`wave_index + 2`)
    pub max_breach_tolerance: u32,
    /// Weighted breaches so far this wave
    pub breaches_this_wave: u32,
}

impl DefenseState {
    pub fn for_wave(wave_index: u32) -> Self {
        Self {
            max_breach_tolerance: wave_index + 2,
            breaches_this_wave: 0,
        }
    }

    /// Fresh accounting at the start of a wave
    pub fn reset_for_wave(&mut self, wave_index: u32) {
        *self = Self::for_wave(wave_index);
    }

    /// Remaining defense, zero once breached
    pub fn current_defense_strength(&self) -> u32 {
        self.max_breach_tolerance
            .saturating_sub(self.breaches_this_wave)
    }

    /// Charge a breach; returns true if the defense is now broken
    pub fn record_breach(&mut self, weight: u32) -> bool {
        self.breaches_this_wave = self.breaches_this_wave.saturating_add(weight);
        self.is_breached()
    }

    pub fn is_breached(&self) -> bool {
        self.breaches_this_wave > self.max_breach_tolerance
    }
}

fn has_breached(alien: &Alien, field_height: f32) -> bool {
    alien.pos.y > field_height
}

/// Remove aliens past the bottom edge and charge their weights.
///
/// Returns true as soon as the defense breaks; aliens not yet examined stay
/// in play since the run is over.
pub fn account_breaches(state: &mut GameState) -> bool {
    let field_height = state.settings.field_height;
    let breached: Vec<_> = state
        .entities
        .aliens
        .iter()
        .filter(|(_, a)| has_breached(a, field_height))
        .map(|(h, _)| h)
        .collect();

    for handle in breached {
        let Some(alien) = state.entities.destroy(handle) else {
            continue;
        };
        let cost = state.settings.tier(alien.tier.level()).breach_weight;
        state.emit(GameEvent::AlienBreach {
            tier: alien.tier,
            cost,
        });
        let broken = state.defense.record_breach(cost);
        log::debug!(
            "{} breached (cost {cost}): {}/{}",
            alien.tier.name(),
            state.defense.breaches_this_wave,
            state.defense.max_breach_tolerance
        );
        if broken {
            log::info!(
                "Defense broken on wave {}: {} breaches > {}",
                state.wave_index + 1,
                state.defense.breaches_this_wave,
                state.defense.max_breach_tolerance
            );
            return true;
        }
    }
    false
}
