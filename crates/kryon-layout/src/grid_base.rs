// crates/kryon-layout/src/grid_base.rs

use std::ops::Range;
use std::sync::LazyLock;

use kryon_core::{Invalidation, OwnerType, PropertyKey, Result};

use crate::{ElementId, Orientation, UiTree, PANEL};

pub static GRID_BASE: OwnerType = OwnerType::new("GridBase", Some(&PANEL));

fn position_key(name: &'static str) -> PropertyKey<i32> {
    PropertyKey::builder(name, &GRID_BASE)
        .validator(|position: &mut i32| *position = (*position).max(0))
        .invalidates(Invalidation::PARENT_MEASURE)
        .build()
}

fn span_key(name: &'static str) -> PropertyKey<i32> {
    PropertyKey::builder(name, &GRID_BASE)
        .default_value(1)
        .validator(|span: &mut i32| *span = (*span).max(1))
        .invalidates(Invalidation::PARENT_MEASURE)
        .build()
}

pub static COLUMN: LazyLock<PropertyKey<i32>> = LazyLock::new(|| position_key("Column"));
pub static ROW: LazyLock<PropertyKey<i32>> = LazyLock::new(|| position_key("Row"));
pub static LAYER: LazyLock<PropertyKey<i32>> = LazyLock::new(|| position_key("Layer"));
pub static COLUMN_SPAN: LazyLock<PropertyKey<i32>> = LazyLock::new(|| span_key("ColumnSpan"));
pub static ROW_SPAN: LazyLock<PropertyKey<i32>> = LazyLock::new(|| span_key("RowSpan"));
pub static LAYER_SPAN: LazyLock<PropertyKey<i32>> = LazyLock::new(|| span_key("LayerSpan"));

fn position_key_for(orientation: Orientation) -> &'static PropertyKey<i32> {
    match orientation {
        Orientation::Horizontal => &*COLUMN,
        Orientation::Vertical => &*ROW,
        Orientation::InDepth => &*LAYER,
    }
}

fn span_key_for(orientation: Orientation) -> &'static PropertyKey<i32> {
    match orientation {
        Orientation::Horizontal => &*COLUMN_SPAN,
        Orientation::Vertical => &*ROW_SPAN,
        Orientation::InDepth => &*LAYER_SPAN,
    }
}

/// Name of the strips along `orientation`, for diagnostics.
pub(crate) fn strip_name(orientation: Orientation) -> &'static str {
    match orientation {
        Orientation::Horizontal => "column",
        Orientation::Vertical => "row",
        Orientation::InDepth => "layer",
    }
}

/// Cell coordinates of a grid child as declared by its properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct GridPlacement {
    pub position: [usize; 3],
    pub span: [usize; 3],
}

impl GridPlacement {
    /// Whether the declared cells go past `count` strips along `axis`.
    pub fn overflows(&self, axis: usize, count: usize) -> bool {
        self.position[axis] + self.span[axis] > count
    }

    /// Strip indices covered along `axis` once clamped into `count` strips.
    pub fn strips(&self, axis: usize, count: usize) -> Range<usize> {
        let last = count.saturating_sub(1);
        let start = self.position[axis].min(last);
        let end = (start + self.span[axis]).min(count);
        start..end
    }
}

impl UiTree {
    /// Places `child` at strip `position` along `orientation` of its grid.
    pub fn set_grid_position(&mut self, child: ElementId, orientation: Orientation, position: i32) -> Result<()> {
        self.set_property(child, position_key_for(orientation), position)
    }

    /// Number of strips `child` covers along `orientation` of its grid.
    pub fn set_grid_span(&mut self, child: ElementId, orientation: Orientation, span: i32) -> Result<()> {
        self.set_property(child, span_key_for(orientation), span)
    }

    pub(crate) fn grid_placement(&self, child: ElementId) -> Option<GridPlacement> {
        let properties = &self.node(child)?.dependency_properties;
        let mut placement = GridPlacement {
            position: [0; 3],
            span: [1; 3],
        };
        for orientation in Orientation::ALL {
            let axis = orientation.axis();
            placement.position[axis] = properties.peek(position_key_for(orientation)).max(0) as usize;
            placement.span[axis] = properties.peek(span_key_for(orientation)).max(1) as usize;
        }
        Some(placement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ElementKind;

    #[test]
    fn test_keys_validated() {
        let mut tree = UiTree::new();
        let child = tree.add_element(ElementKind::Empty);
        tree.set_grid_position(child, Orientation::Vertical, -4).unwrap();
        tree.set_grid_span(child, Orientation::InDepth, 0).unwrap();
        tree.set_grid_position(child, Orientation::Horizontal, 3).unwrap();

        assert_eq!(tree.get_property(child, &ROW).unwrap(), 0);
        assert_eq!(tree.get_property(child, &LAYER_SPAN).unwrap(), 1);
        assert_eq!(tree.get_property(child, &COLUMN).unwrap(), 3);
        assert_eq!(tree.get_property(child, &COLUMN_SPAN).unwrap(), 1);
    }

    #[test]
    fn test_placement_clamped_into_strips() {
        let placement = GridPlacement {
            position: [2, 5, 0],
            span: [3, 2, 4],
        };
        assert!(placement.overflows(0, 3));
        assert_eq!(placement.strips(0, 3), 2..3);
        assert_eq!(placement.strips(1, 3), 2..3);
        assert_eq!(placement.strips(2, 3), 0..3);
        assert!(!placement.overflows(2, 4));
    }

    #[test]
    fn test_keys_invalidate_grid_parent_only() {
        let mut tree = UiTree::new();
        let grid = tree.add_element(ElementKind::grid());
        let stack = tree.add_element(ElementKind::stack_panel());
        let in_grid = tree.add_element(ElementKind::Empty);
        let in_stack = tree.add_element(ElementKind::Empty);
        tree.add_child(grid, in_grid).unwrap();
        tree.add_child(stack, in_stack).unwrap();
        tree.update_layout(grid, glam::Vec3::ONE).unwrap();
        tree.update_layout(stack, glam::Vec3::ONE).unwrap();

        tree.set_grid_position(in_grid, Orientation::Horizontal, 1).unwrap();
        tree.set_grid_position(in_stack, Orientation::Horizontal, 1).unwrap();
        assert!(!tree[grid].is_measure_valid());
        assert!(tree[stack].is_measure_valid());
    }
}
