// crates/kryon-layout/src/constraints.rs

use glam::Vec3;

/// Clamps `value` into `[minimum, maximum]`; the minimum wins when they conflict.
pub fn clamp_min_wins(value: f32, minimum: f32, maximum: f32) -> f32 {
    minimum.max(maximum.min(value))
}

/// Per-axis size bounds of an element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeConstraints {
    pub minimum: Vec3,
    pub maximum: Vec3,
}

impl Default for SizeConstraints {
    fn default() -> Self {
        Self {
            minimum: Vec3::ZERO,
            maximum: Vec3::INFINITY,
        }
    }
}

impl SizeConstraints {
    pub fn new(minimum: Vec3, maximum: Vec3) -> Self {
        Self { minimum, maximum }
    }

    pub fn constrain(&self, size: Vec3) -> Vec3 {
        Vec3::new(
            clamp_min_wins(size.x, self.minimum.x, self.maximum.x),
            clamp_min_wins(size.y, self.minimum.y, self.maximum.y),
            clamp_min_wins(size.z, self.minimum.z, self.maximum.z),
        )
    }

    /// Uses `explicit` where set (not NaN), `fallback` elsewhere, then constrains.
    pub fn resolve(&self, explicit: Vec3, fallback: Vec3) -> Vec3 {
        self.constrain(fill_unset(explicit, fallback))
    }
}

/// Replaces NaN components of `size` with the matching component of `fallback`.
pub fn fill_unset(size: Vec3, fallback: Vec3) -> Vec3 {
    Vec3::new(
        if size.x.is_nan() { fallback.x } else { size.x },
        if size.y.is_nan() { fallback.y } else { size.y },
        if size.z.is_nan() { fallback.z } else { size.z },
    )
}

/// Bitwise equality, so NaN inputs compare equal to themselves.
pub fn bits_equal(a: Vec3, b: Vec3) -> bool {
    a.x.to_bits() == b.x.to_bits() && a.y.to_bits() == b.y.to_bits() && a.z.to_bits() == b.z.to_bits()
}
