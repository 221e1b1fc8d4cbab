// crates/kryon-layout/src/thickness.rs

use std::ops::{Index, Neg};

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Space around a volumetric element.
///
/// Indexable as `[left, top, back, right, bottom, front]`, so side `i` and
/// side `i + 3` bound the same axis.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable, Serialize, Deserialize)]
pub struct Thickness {
    pub left: f32,
    pub top: f32,
    pub back: f32,
    pub right: f32,
    pub bottom: f32,
    pub front: f32,
}

impl Thickness {
    pub const fn new(left: f32, top: f32, back: f32, right: f32, bottom: f32, front: f32) -> Self {
        Self { left, top, back, right, bottom, front }
    }

    pub const fn uniform(value: f32) -> Self {
        Self::new(value, value, value, value, value, value)
    }

    pub fn as_array(&self) -> &[f32; 6] {
        bytemuck::cast_ref(self)
    }

    /// Total thickness per axis.
    pub fn size(&self) -> Vec3 {
        Vec3::new(
            self.left + self.right,
            self.top + self.bottom,
            self.back + self.front,
        )
    }

    /// Offset of the content origin: left, top and front sides.
    pub fn leading(&self) -> Vec3 {
        Vec3::new(self.left, self.top, self.front)
    }

    /// `size` with the thickness removed, never negative.
    pub fn shrink(&self, size: Vec3) -> Vec3 {
        (size - self.size()).max(Vec3::ZERO)
    }

    /// `size` with the thickness added, never negative.
    pub fn grow(&self, size: Vec3) -> Vec3 {
        (size + self.size()).max(Vec3::ZERO)
    }
}

impl Index<usize> for Thickness {
    type Output = f32;

    fn index(&self, index: usize) -> &f32 {
        &self.as_array()[index]
    }
}

impl Neg for Thickness {
    type Output = Thickness;

    fn neg(self) -> Thickness {
        Thickness::new(-self.left, -self.top, -self.back, -self.right, -self.bottom, -self.front)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_order() {
        let margin = Thickness::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0);
        assert_eq!(margin.as_array(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(margin[0] + margin[3], margin.size().x);
        assert_eq!(margin[2] + margin[5], margin.size().z);
    }

    #[test]
    fn test_shrink_never_negative() {
        let margin = Thickness::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0);
        assert_eq!(margin.shrink(Vec3::new(100.0, 100.0, 100.0)), Vec3::new(95.0, 93.0, 91.0));
        assert_eq!(margin.shrink(Vec3::new(2.0, 8.0, 4.0)), Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(margin.shrink(Vec3::INFINITY), Vec3::INFINITY);
    }

    #[test]
    fn test_grow_with_negative_margin() {
        let margin = -Thickness::uniform(5.0);
        assert_eq!(margin.grow(Vec3::new(20.0, 8.0, 0.0)), Vec3::new(10.0, 0.0, 0.0));
    }

    #[test]
    fn test_serde_field_names() {
        let margin = Thickness::new(1.0, 0.0, 0.0, 2.0, 0.0, 0.0);
        let json = serde_json::to_string(&margin).unwrap();
        assert_eq!(
            json,
            r#"{"left":1.0,"top":0.0,"back":0.0,"right":2.0,"bottom":0.0,"front":0.0}"#
        );
    }
}
