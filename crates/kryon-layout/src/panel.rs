// crates/kryon-layout/src/panel.rs

use std::mem;
use std::sync::LazyLock;

use glam::{Mat4, Vec2, Vec3};
use kryon_core::{Invalidation, KryonError, OwnerType, PropertyKey, Result};
use tracing::{debug, warn};

use crate::{
    ElementId, ElementKind, GridState, Orientation, StackPanelState, UiTree,
    UniformGridState, UI_ELEMENT,
};

pub static PANEL: OwnerType = OwnerType::new("Panel", Some(&UI_ELEMENT));

/// Draw order of a child among its siblings; higher is drawn later.
pub static Z_INDEX: LazyLock<PropertyKey<i32>> = LazyLock::new(|| {
    PropertyKey::builder("ZIndex", &PANEL)
        .invalidates(Invalidation::PARENT_CHILD_ORDER)
        .build()
});

/// Transform a panel applies to one child, written during arrange.
pub static PANEL_ARRANGE_MATRIX: LazyLock<PropertyKey<Mat4>> = LazyLock::new(|| {
    PropertyKey::builder("PanelArrangeMatrix", &PANEL)
        .default_value(Mat4::IDENTITY)
        .invalidates(Invalidation::OWNER_ARRANGE_CHANGED)
        .build()
});

#[derive(Debug)]
pub enum PanelLayout {
    Stack(StackPanelState),
    Canvas,
    Grid(GridState),
    UniformGrid(UniformGridState),
}

impl PanelLayout {
    pub fn owner_type(&self) -> &'static OwnerType {
        match self {
            PanelLayout::Stack(_) => &crate::STACK_PANEL,
            PanelLayout::Canvas => &crate::CANVAS,
            PanelLayout::Grid(_) => &crate::GRID,
            PanelLayout::UniformGrid(_) => &crate::UNIFORM_GRID,
        }
    }
}

/// Logical children plus the layout strategy of a panel.
#[derive(Debug)]
pub struct PanelState {
    pub(crate) children: Vec<ElementId>,
    pub(crate) layout: PanelLayout,
}

impl PanelState {
    pub fn new(layout: PanelLayout) -> Self {
        Self {
            children: Vec::new(),
            layout,
        }
    }

    pub fn children(&self) -> &[ElementId] {
        &self.children
    }

    pub fn layout(&self) -> &PanelLayout {
        &self.layout
    }
}

/// Anchors of a panel with no layout specific stops: its two borders.
pub(crate) fn border_anchor_distances(render_size: Vec3, direction: Orientation, position: f32) -> Vec2 {
    let max_position = render_size[direction.axis()];
    let valid_position = position.min(max_position).max(0.0);
    Vec2::new(-valid_position, max_position - valid_position)
}

impl UiTree {
    pub(crate) fn panel_mut(&mut self, id: ElementId) -> Result<&mut PanelState> {
        self.element_mut(id)?
            .kind
            .as_panel_mut()
            .ok_or(KryonError::KindMismatch { id, expected: "Panel" })
    }

    pub fn children(&self, panel: ElementId) -> Result<&[ElementId]> {
        self.element(panel)?
            .kind
            .as_panel()
            .map(PanelState::children)
            .ok_or(KryonError::KindMismatch { id: panel, expected: "Panel" })
    }

    pub fn add_child(&mut self, panel: ElementId, child: ElementId) -> Result<()> {
        let index = self.children(panel)?.len();
        self.insert_child(panel, index, child)
    }

    pub fn insert_child(&mut self, panel: ElementId, index: usize, child: ElementId) -> Result<()> {
        let children = self.children(panel)?;
        if index > children.len() {
            return Err(KryonError::InvalidArgument(format!(
                "child index {} out of range for panel {}",
                index, panel
            )));
        }
        if panel == child || children.contains(&child) {
            return Err(KryonError::InvalidOperation(format!(
                "element {} is already a child of panel {}",
                child, panel
            )));
        }
        if let Some(current) = self.element(child)?.parent {
            return Err(KryonError::InvalidOperation(format!(
                "element {} already has logical parent {}",
                child, current
            )));
        }

        self.set_parent(child, Some(panel))?;
        self.set_visual_parent(child, Some(panel))?;

        let state = self.panel_mut(panel)?;
        state.children.insert(index, child);
        if let PanelLayout::Stack(stack) = &mut state.layout {
            stack.on_child_inserted(index);
        }

        self.sort_visual_children(panel);
        self.invalidate_measure(panel);
        debug!("inserted element {} into panel {} at {}", child, panel, index);
        Ok(())
    }

    /// Removes `child` from the logical children of `panel`. `false` if absent.
    pub fn remove_child(&mut self, panel: ElementId, child: ElementId) -> Result<bool> {
        let state = self.panel_mut(panel)?;
        let Some(index) = state.children.iter().position(|id| *id == child) else {
            return Ok(false);
        };
        state.children.remove(index);
        if let PanelLayout::Stack(stack) = &mut state.layout {
            stack.on_child_removed(index);
        }

        self.set_parent(child, None)?;
        if self.element(child)?.visual_parent == Some(panel) {
            self.set_visual_parent(child, None)?;
        }
        self.invalidate_measure(panel);
        Ok(true)
    }

    /// Stable sort of the visual children of `id` by [`Z_INDEX`].
    pub(crate) fn sort_visual_children(&mut self, id: ElementId) {
        let Some(node) = self.node_mut(id) else { return };
        let mut children = mem::take(&mut node.visual_children);
        children.sort_by_key(|child| {
            self.node(*child)
                .map_or(0, |child| child.dependency_properties.peek(&Z_INDEX))
        });
        if let Some(node) = self.node_mut(id) {
            node.visual_children = children;
        }
    }

    /// Distances from `position` to the closest layout stops on each side,
    /// along `direction`, in the local space of `id`.
    pub fn surrounding_anchor_distances(
        &mut self,
        id: ElementId,
        direction: Orientation,
        position: f32,
    ) -> Result<Vec2> {
        let render_size = self.element(id)?.render_size;
        let distances = self.with_kind(id, |tree, kind| match kind {
            ElementKind::Panel(panel) => match &mut panel.layout {
                PanelLayout::Stack(stack) => {
                    tree.stack_anchor_distances(id, &panel.children, stack, direction, position)
                }
                PanelLayout::Grid(grid) => grid.anchor_distances(direction, position),
                PanelLayout::UniformGrid(grid) => {
                    grid.anchor_distances(render_size, direction, position)
                }
                PanelLayout::Canvas => border_anchor_distances(render_size, direction, position),
            },
            _ => border_anchor_distances(render_size, direction, position),
        });
        Ok(distances.unwrap_or(Vec2::ZERO))
    }

    pub(crate) fn measure_panel(
        &mut self,
        id: ElementId,
        panel: &mut PanelState,
        available_size_without_margins: Vec3,
    ) -> Vec3 {
        let PanelState { children, layout } = panel;
        match layout {
            PanelLayout::Stack(stack) => {
                self.measure_stack(id, children, stack, available_size_without_margins)
            }
            PanelLayout::Canvas => self.measure_canvas(children, available_size_without_margins),
            PanelLayout::Grid(grid) => {
                self.measure_grid(id, children, grid, available_size_without_margins)
            }
            PanelLayout::UniformGrid(grid) => {
                self.measure_uniform_grid(children, grid, available_size_without_margins)
            }
        }
    }

    pub(crate) fn arrange_panel(
        &mut self,
        id: ElementId,
        panel: &mut PanelState,
        final_size_without_margins: Vec3,
    ) -> Vec3 {
        let is_collapsed = self.node(id).is_some_and(|node| node.is_collapsed());
        let PanelState { children, layout } = panel;
        match layout {
            PanelLayout::Stack(stack) => {
                self.arrange_stack(id, children, stack, final_size_without_margins)
            }
            PanelLayout::Canvas => {
                self.arrange_canvas(children, final_size_without_margins, is_collapsed)
            }
            PanelLayout::Grid(grid) => {
                self.arrange_grid(id, children, grid, final_size_without_margins, is_collapsed)
            }
            PanelLayout::UniformGrid(grid) => {
                self.arrange_uniform_grid(children, grid, final_size_without_margins, is_collapsed)
            }
        }
    }

    /// Writes the transform `id` receives from its panel.
    pub(crate) fn set_arrange_matrix(&mut self, id: ElementId, matrix: Mat4) {
        if let Err(error) = self.set_property(id, &PANEL_ARRANGE_MATRIX, matrix) {
            warn!("cannot place child {}: {}", id, error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ElementFlags;

    #[test]
    fn test_border_anchors() {
        let size = Vec3::new(100.0, 200.0, 300.0);
        assert_eq!(border_anchor_distances(size, Orientation::Vertical, -1.0), Vec2::new(0.0, 200.0));
        assert_eq!(border_anchor_distances(size, Orientation::Vertical, 100.0), Vec2::new(-100.0, 100.0));
        assert_eq!(border_anchor_distances(size, Orientation::Vertical, 500.0), Vec2::new(-200.0, 0.0));
        assert_eq!(border_anchor_distances(size, Orientation::InDepth, 10.0), Vec2::new(-10.0, 290.0));
    }

    #[test]
    fn test_insert_and_remove_children() {
        let mut tree = UiTree::new();
        let panel = tree.add_element(ElementKind::canvas());
        let first = tree.add_element(ElementKind::Empty);
        let second = tree.add_element(ElementKind::Empty);

        tree.add_child(panel, first).unwrap();
        tree.insert_child(panel, 0, second).unwrap();
        assert_eq!(tree.children(panel).unwrap(), &[second, first]);
        assert_eq!(tree[first].parent(), Some(panel));
        assert_eq!(tree[first].visual_parent(), Some(panel));

        assert!(tree.remove_child(panel, second).unwrap());
        assert!(!tree.remove_child(panel, second).unwrap());
        assert_eq!(tree[second].parent(), None);
        assert_eq!(tree[second].visual_parent(), None);
        assert_eq!(tree[panel].visual_children(), &[first]);
    }

    #[test]
    fn test_child_with_other_parent_rejected() {
        let mut tree = UiTree::new();
        let first = tree.add_element(ElementKind::canvas());
        let second = tree.add_element(ElementKind::canvas());
        let child = tree.add_element(ElementKind::Empty);
        tree.add_child(first, child).unwrap();

        assert!(matches!(tree.add_child(second, child), Err(KryonError::InvalidOperation(_))));
        assert!(matches!(tree.add_child(first, child), Err(KryonError::InvalidOperation(_))));
        assert!(matches!(tree.insert_child(second, 3, child), Err(KryonError::InvalidArgument(_))));
        assert!(matches!(tree.add_child(second, 99), Err(KryonError::ElementNotFound(99))));
        assert!(matches!(
            tree.add_child(child, first),
            Err(KryonError::KindMismatch { .. })
        ));
    }

    #[test]
    fn test_adding_child_invalidates_panel() {
        let mut tree = UiTree::new();
        let panel = tree.add_element(ElementKind::canvas());
        tree.measure(panel, Vec3::ONE).unwrap();
        tree.arrange(panel, Vec3::ONE, false).unwrap();
        assert!(tree[panel].is_arrange_valid());

        let child = tree.add_element(ElementKind::Empty);
        tree.add_child(panel, child).unwrap();
        assert!(tree[panel].flags().contains(ElementFlags::FORCE_MEASURE));
    }

    #[test]
    fn test_arrange_matrix_marks_child_changed() {
        let mut tree = UiTree::new();
        let panel = tree.add_element(ElementKind::canvas());
        let child = tree.add_element(ElementKind::Empty);
        tree.add_child(panel, child).unwrap();
        tree.update_layout(panel, Vec3::splat(10.0)).unwrap();
        assert!(!tree[child].flags().contains(ElementFlags::ARRANGE_CHANGED));

        tree.set_arrange_matrix(child, Mat4::from_translation(Vec3::ONE));
        assert!(tree[child].flags().contains(ElementFlags::ARRANGE_CHANGED));
    }

    #[test]
    fn test_arrange_matrix_for_unknown_child_is_ignored() {
        let mut tree = UiTree::new();
        let panel = tree.add_element(ElementKind::canvas());
        tree.set_arrange_matrix(panel + 10, Mat4::from_translation(Vec3::ONE));
        assert_eq!(tree.len(), 1);
        assert!(matches!(
            tree.get_property(panel + 10, &PANEL_ARRANGE_MATRIX),
            Err(KryonError::ElementNotFound(_))
        ));
        assert_eq!(tree.get_property(panel, &PANEL_ARRANGE_MATRIX).unwrap(), Mat4::IDENTITY);
    }
}
