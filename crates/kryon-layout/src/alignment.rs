// crates/kryon-layout/src/alignment.rs

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HorizontalAlignment {
    Left,
    Center,
    Right,
    #[default]
    Stretch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VerticalAlignment {
    Top,
    Center,
    Bottom,
    #[default]
    Stretch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DepthAlignment {
    Back,
    #[default]
    Center,
    Front,
    Stretch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Visibility {
    #[default]
    Visible,
    /// Takes its space but is not drawn.
    Hidden,
    /// Takes no space.
    Collapsed,
}

/// Layout axis. Discriminants are the vector component index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Orientation {
    Horizontal = 0,
    #[default]
    Vertical = 1,
    InDepth = 2,
}

impl Orientation {
    pub const ALL: [Orientation; 3] = [
        Orientation::Horizontal,
        Orientation::Vertical,
        Orientation::InDepth,
    ];

    pub fn axis(self) -> usize {
        self as usize
    }

    /// The two axes a stack along `self` maximizes over.
    pub fn cross_axes(self) -> (usize, usize) {
        match self {
            Orientation::Horizontal => (1, 2),
            Orientation::Vertical => (0, 2),
            Orientation::InDepth => (0, 1),
        }
    }
}

/// Where along one axis an element sits inside its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AxisPlacement {
    Start,
    Center,
    End,
}

impl From<HorizontalAlignment> for AxisPlacement {
    fn from(alignment: HorizontalAlignment) -> Self {
        match alignment {
            HorizontalAlignment::Left => AxisPlacement::Start,
            HorizontalAlignment::Center | HorizontalAlignment::Stretch => AxisPlacement::Center,
            HorizontalAlignment::Right => AxisPlacement::End,
        }
    }
}

impl From<VerticalAlignment> for AxisPlacement {
    fn from(alignment: VerticalAlignment) -> Self {
        match alignment {
            VerticalAlignment::Top => AxisPlacement::Start,
            VerticalAlignment::Center | VerticalAlignment::Stretch => AxisPlacement::Center,
            VerticalAlignment::Bottom => AxisPlacement::End,
        }
    }
}

impl From<DepthAlignment> for AxisPlacement {
    fn from(alignment: DepthAlignment) -> Self {
        match alignment {
            DepthAlignment::Front => AxisPlacement::Start,
            DepthAlignment::Center | DepthAlignment::Stretch => AxisPlacement::Center,
            DepthAlignment::Back => AxisPlacement::End,
        }
    }
}

impl AxisPlacement {
    /// Offset added to the leading margin for a slot with `slack` spare space.
    pub(crate) fn offset(self, slack: f32) -> f32 {
        match self {
            AxisPlacement::Start => 0.0,
            AxisPlacement::Center => slack / 2.0,
            AxisPlacement::End => slack,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(HorizontalAlignment::default(), HorizontalAlignment::Stretch);
        assert_eq!(VerticalAlignment::default(), VerticalAlignment::Stretch);
        assert_eq!(DepthAlignment::default(), DepthAlignment::Center);
        assert_eq!(Orientation::default(), Orientation::Vertical);
    }

    #[test]
    fn test_cross_axes() {
        for orientation in Orientation::ALL {
            let (first, second) = orientation.cross_axes();
            assert_ne!(first, orientation.axis());
            assert_ne!(second, orientation.axis());
            assert!(first < second);
        }
    }

    #[test]
    fn test_placement_offsets() {
        assert_eq!(AxisPlacement::from(HorizontalAlignment::Right).offset(10.0), 10.0);
        assert_eq!(AxisPlacement::from(VerticalAlignment::Stretch).offset(10.0), 5.0);
        assert_eq!(AxisPlacement::from(DepthAlignment::Front).offset(10.0), 0.0);
        assert_eq!(AxisPlacement::from(DepthAlignment::Back).offset(10.0), 10.0);
    }
}
