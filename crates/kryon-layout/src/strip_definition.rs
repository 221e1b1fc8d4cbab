// crates/kryon-layout/src/strip_definition.rs

use serde::{Deserialize, Serialize};

use crate::clamp_min_wins;

/// Below this star weight a strip cannot grow.
const WEIGHT_TOLERANCE: f32 = 1e-6;

/// How the size of a grid strip is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StripType {
    /// Exactly `size_value` units.
    Fixed,
    /// Just large enough for the elements it contains.
    Auto,
    /// A share of the remaining space, weighted by `size_value`.
    #[default]
    Star,
}

/// One column, row or layer of a grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StripDefinition {
    strip_type: StripType,
    size_value: f32,
    minimum_size: f32,
    maximum_size: f32,
    #[serde(skip)]
    pub(crate) actual_size: f32,
}

impl Default for StripDefinition {
    fn default() -> Self {
        Self::new(StripType::Star, 1.0)
    }
}

impl StripDefinition {
    pub fn new(strip_type: StripType, size_value: f32) -> Self {
        let mut strip = Self {
            strip_type,
            size_value: 1.0,
            minimum_size: 0.0,
            maximum_size: f32::INFINITY,
            actual_size: 0.0,
        };
        strip.set_size_value(size_value);
        strip
    }

    pub fn fixed(size: f32) -> Self {
        Self::new(StripType::Fixed, size)
    }

    pub fn auto() -> Self {
        Self::new(StripType::Auto, 1.0)
    }

    pub fn star(weight: f32) -> Self {
        Self::new(StripType::Star, weight)
    }

    pub fn with_minimum(mut self, minimum: f32) -> Self {
        self.set_minimum_size(minimum);
        self
    }

    pub fn with_maximum(mut self, maximum: f32) -> Self {
        self.set_maximum_size(maximum);
        self
    }

    pub fn strip_type(&self) -> StripType {
        self.strip_type
    }

    pub fn size_value(&self) -> f32 {
        self.size_value
    }

    pub fn minimum_size(&self) -> f32 {
        self.minimum_size
    }

    pub fn maximum_size(&self) -> f32 {
        self.maximum_size
    }

    /// Size computed by the last layout pass of the owning grid.
    pub fn actual_size(&self) -> f32 {
        self.actual_size
    }

    pub fn set_strip_type(&mut self, strip_type: StripType) {
        self.strip_type = strip_type;
    }

    /// Fixed size or star weight. NaN is ignored.
    pub fn set_size_value(&mut self, value: f32) {
        if !value.is_nan() {
            self.size_value = value.clamp(0.0, f32::MAX);
        }
    }

    pub fn set_minimum_size(&mut self, value: f32) {
        if !value.is_nan() {
            self.minimum_size = value.clamp(0.0, f32::MAX);
        }
    }

    pub fn set_maximum_size(&mut self, value: f32) {
        if !value.is_nan() {
            self.maximum_size = value.clamp(0.0, f32::INFINITY);
        }
    }

    /// Clamps `size` into the strip bounds; the minimum wins over the maximum.
    pub fn clamp_size(&self, size: f32) -> f32 {
        clamp_min_wins(size, self.minimum_size, self.maximum_size)
    }

    pub(crate) fn has_weight(&self) -> bool {
        self.size_value > WEIGHT_TOLERANCE
    }

    /// Size of the strip for a given 1-star size.
    pub(crate) fn star_share(&self, one_star: f32) -> f32 {
        if self.has_weight() {
            self.size_value * one_star
        } else {
            0.0
        }
    }

    /// Minimum size per unit of weight.
    pub(crate) fn value_relative_minimum(&self) -> f32 {
        if self.has_weight() {
            self.minimum_size / self.size_value
        } else {
            0.0
        }
    }

    /// Maximum size per unit of weight.
    pub(crate) fn value_relative_maximum(&self) -> f32 {
        if self.has_weight() {
            self.maximum_size / self.size_value
        } else {
            0.0
        }
    }
}

pub(crate) fn sum_actual_sizes<'a>(strips: impl IntoIterator<Item = &'a StripDefinition>) -> f32 {
    strips.into_iter().map(|strip| strip.actual_size).sum()
}

pub(crate) fn sum_values<'a>(strips: impl IntoIterator<Item = &'a StripDefinition>) -> f32 {
    strips.into_iter().map(|strip| strip.size_value).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_strip() {
        let strip = StripDefinition::default();
        assert_eq!(strip.strip_type(), StripType::Star);
        assert_eq!(strip.size_value(), 1.0);
        assert_eq!(strip.minimum_size(), 0.0);
        assert_eq!(strip.maximum_size(), f32::INFINITY);
        assert_eq!(strip.actual_size(), 0.0);
    }

    #[test]
    fn test_values_sanitized() {
        let mut strip = StripDefinition::fixed(-3.0).with_minimum(f32::INFINITY).with_maximum(-1.0);
        assert_eq!(strip.size_value(), 0.0);
        assert_eq!(strip.minimum_size(), f32::MAX);
        assert_eq!(strip.maximum_size(), 0.0);

        strip.set_size_value(f32::NAN);
        strip.set_maximum_size(f32::NAN);
        assert_eq!(strip.size_value(), 0.0);
        assert_eq!(strip.maximum_size(), 0.0);
    }

    #[test]
    fn test_clamp_minimum_wins() {
        let strip = StripDefinition::fixed(10.0).with_minimum(20.0).with_maximum(5.0);
        assert_eq!(strip.clamp_size(10.0), 20.0);
        let strip = StripDefinition::auto().with_minimum(1.0).with_maximum(5.0);
        assert_eq!(strip.clamp_size(0.0), 1.0);
        assert_eq!(strip.clamp_size(8.0), 5.0);
        assert_eq!(strip.clamp_size(3.0), 3.0);
    }

    #[test]
    fn test_relative_bounds() {
        let strip = StripDefinition::star(4.0).with_minimum(20.0).with_maximum(60.0);
        assert_eq!(strip.value_relative_minimum(), 5.0);
        assert_eq!(strip.value_relative_maximum(), 15.0);
        assert_eq!(strip.star_share(2.5), 10.0);

        let weightless = StripDefinition::star(0.0).with_minimum(20.0);
        assert_eq!(weightless.value_relative_minimum(), 0.0);
        assert_eq!(weightless.star_share(f32::INFINITY), 0.0);
    }

    #[test]
    fn test_serde_skips_actual_size() {
        let mut strip = StripDefinition::star(2.0).with_maximum(8.0);
        strip.actual_size = 8.0;
        let json = serde_json::to_string(&strip).unwrap();
        let decoded: StripDefinition = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.actual_size(), 0.0);
        assert_eq!(decoded.maximum_size(), 8.0);
    }
}
