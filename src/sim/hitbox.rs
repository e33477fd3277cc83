//! Rectangles and per-tier hitbox exclusion
//!
//! The tricky part of the collision pipeline: two multi-part enemy sprites
//! have regions of their bounding box that must not register hits even when
//! the boxes overlap. Aliens travel downward, so the lower half of a sprite
//! is its front.
//!
//! - Cruiser (tier 6): the outer left/right thirds of the lower half (the
//!   undersides of the wings) are excluded. The center third and the whole
//!   upper half register.
//! - Destroyer (tier 5): the outer 28% bands of the lower half are excluded.
//!   The upper half and the inner 44% band of the lower half register.
//!
//! A pairing is valid only when the overlap rectangle intersects an allowed
//! region.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::entities::AlienTier;

/// Axis-aligned rectangle in screen space (y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn from_pos_size(pos: Vec2, size: Vec2) -> Self {
        Self::new(pos.x, pos.y, size.x, size.y)
    }

    #[inline]
    pub fn left(&self) -> f32 {
        self.x
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    #[inline]
    pub fn top(&self) -> f32 {
        self.y
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Strict overlap: touching edges do not count
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left() < other.right()
            && other.left() < self.right()
            && self.top() < other.bottom()
            && other.top() < self.bottom()
    }

    /// Overlapping region, if any
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        if !self.intersects(other) {
            return None;
        }
        let x = self.left().max(other.left());
        let y = self.top().max(other.top());
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        Some(Rect::new(x, y, right - x, bottom - y))
    }

    /// Whether a circle overlaps the rectangle
    pub fn intersects_circle(&self, center: Vec2, radius: f32) -> bool {
        let closest = Vec2::new(
            center.x.clamp(self.left(), self.right()),
            center.y.clamp(self.top(), self.bottom()),
        );
        closest.distance_squared(center) <= radius * radius
    }
}

/// Fraction of the width excluded on each side of a cruiser's lower half
pub const CRUISER_WING_FRACTION: f32 = 1.0 / 3.0;
/// Fraction of the width excluded on each side of a destroyer's lower half
pub const DESTROYER_BAND_FRACTION: f32 = 0.28;

/// Regions of an alien's box that register hits
///
/// Returns one region for tiers without exclusions (the whole box) and two
/// for the cruiser and destroyer (upper half + allowed slice of the lower half).
pub fn allowed_regions(tier: AlienTier, bbox: Rect) -> Vec<Rect> {
    let side_fraction = match tier {
        AlienTier::Cruiser => CRUISER_WING_FRACTION,
        AlienTier::Destroyer => DESTROYER_BAND_FRACTION,
        _ => return vec![bbox],
    };

    let half_h = bbox.h / 2.0;
    let upper = Rect::new(bbox.x, bbox.y, bbox.w, half_h);
    let side = bbox.w * side_fraction;
    let lower_center = Rect::new(bbox.x + side, bbox.y + half_h, bbox.w - 2.0 * side, half_h);
    vec![upper, lower_center]
}

/// Whether an overlap between an alien and another box counts as a hit
pub fn is_valid_hit(tier: AlienTier, alien_box: Rect, other: Rect) -> bool {
    let Some(overlap) = alien_box.intersection(&other) else {
        return false;
    };
    allowed_regions(tier, alien_box)
        .iter()
        .any(|region| region.intersects(&overlap))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const CRUISER: Rect = Rect::new(100.0, 100.0, 120.0, 80.0);
    const DESTROYER: Rect = Rect::new(0.0, 0.0, 100.0, 80.0);

    #[test]
    fn test_rect_overlap_is_strict() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let touching = Rect::new(10.0, 0.0, 10.0, 10.0);
        let overlapping = Rect::new(5.0, 5.0, 10.0, 10.0);

        assert!(!a.intersects(&touching));
        assert!(a.intersects(&overlapping));
        assert_eq!(
            a.intersection(&overlapping),
            Some(Rect::new(5.0, 5.0, 5.0, 5.0))
        );
    }

    #[test]
    fn test_cruiser_lower_wings_do_not_register() {
        // Projectile fully inside the lower-left third
        let lower_left = Rect::new(105.0, 150.0, 4.0, 14.0);
        assert!(CRUISER.intersects(&lower_left));
        assert!(!is_valid_hit(AlienTier::Cruiser, CRUISER, lower_left));

        // Lower-right third
        let lower_right = Rect::new(205.0, 150.0, 4.0, 14.0);
        assert!(!is_valid_hit(AlienTier::Cruiser, CRUISER, lower_right));

        // Same rectangle centered horizontally registers
        let centered = Rect::new(158.0, 150.0, 4.0, 14.0);
        assert!(is_valid_hit(AlienTier::Cruiser, CRUISER, centered));
    }

    #[test]
    fn test_cruiser_upper_half_always_registers() {
        let upper_left = Rect::new(102.0, 105.0, 4.0, 14.0);
        assert!(is_valid_hit(AlienTier::Cruiser, CRUISER, upper_left));
    }

    #[test]
    fn test_destroyer_bands() {
        // Outer 28% band of the front half is excluded
        let front_left = Rect::new(5.0, 50.0, 4.0, 14.0);
        assert!(!is_valid_hit(AlienTier::Destroyer, DESTROYER, front_left));
        let front_right = Rect::new(90.0, 50.0, 4.0, 14.0);
        assert!(!is_valid_hit(AlienTier::Destroyer, DESTROYER, front_right));

        // Inner 44% band registers
        let front_center = Rect::new(48.0, 50.0, 4.0, 14.0);
        assert!(is_valid_hit(AlienTier::Destroyer, DESTROYER, front_center));

        // Back half registers at any width
        let back_left = Rect::new(1.0, 5.0, 4.0, 14.0);
        assert!(is_valid_hit(AlienTier::Destroyer, DESTROYER, back_left));
    }

    #[test]
    fn test_other_tiers_use_whole_box() {
        let tanker = Rect::new(0.0, 0.0, 110.0, 100.0);
        let corner = Rect::new(1.0, 90.0, 4.0, 14.0);
        assert!(is_valid_hit(AlienTier::Tanker, tanker, corner));
        assert!(!is_valid_hit(AlienTier::Tanker, tanker, Rect::new(200.0, 0.0, 5.0, 5.0)));
    }

    #[test]
    fn test_circle_overlap() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(r.intersects_circle(Vec2::new(15.0, 5.0), 6.0));
        assert!(!r.intersects_circle(Vec2::new(20.0, 20.0), 5.0));
    }

    proptest! {
        #[test]
        fn prop_cruiser_wing_projectiles_never_register(
            fx in 0.0f32..0.30,
            fy in 0.52f32..0.80,
            right in proptest::bool::ANY,
        ) {
            let w = 4.0;
            let x = if right {
                CRUISER.right() - CRUISER.w * fx - w
            } else {
                CRUISER.left() + CRUISER.w * fx
            };
            let projectile = Rect::new(x, CRUISER.top() + CRUISER.h * fy, w, 10.0);
            prop_assert!(!is_valid_hit(AlienTier::Cruiser, CRUISER, projectile));
        }

        #[test]
        fn prop_valid_hit_implies_overlap(
            x in -50.0f32..250.0,
            y in -50.0f32..250.0,
            w in 1.0f32..40.0,
            h in 1.0f32..40.0,
        ) {
            let other = Rect::new(x, y, w, h);
            for tier in AlienTier::ALL {
                if is_valid_hit(tier, CRUISER, other) {
                    prop_assert!(CRUISER.intersects(&other));
                }
            }
        }
    }
}
