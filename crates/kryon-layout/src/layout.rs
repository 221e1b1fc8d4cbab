// crates/kryon-layout/src/layout.rs

use std::collections::HashMap;
use std::fmt;

use glam::{Mat4, Vec3};
use kryon_core::{KryonError, Result};
use tracing::{debug, trace};

use crate::{
    bits_equal, fill_unset, AxisPlacement, DepthAlignment, ElementFlags, ElementId, ElementKind,
    HorizontalAlignment, UiTree, VerticalAlignment, PANEL_ARRANGE_MATRIX,
};

/// Result of a full layout pass over one subtree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutResult {
    pub computed_positions: HashMap<ElementId, Vec3>,
    pub computed_sizes: HashMap<ElementId, Vec3>,
    pub world_matrices: HashMap<ElementId, Mat4>,
}

impl LayoutResult {
    pub fn new() -> Self {
        Self::default()
    }
}

impl fmt::Display for LayoutResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.computed_sizes.keys().copied().collect();
        ids.sort_unstable();
        for id in ids {
            let size = self.computed_sizes[&id];
            let position = self.computed_positions.get(&id).copied().unwrap_or_default();
            writeln!(
                f,
                "#{id}: size=({}, {}, {}) center=({}, {}, {})",
                size.x, size.y, size.z, position.x, position.y, position.z
            )?;
        }
        Ok(())
    }
}

impl UiTree {
    /// First layout pass: computes the desired size of `id` and its subtree.
    pub fn measure(&mut self, id: ElementId, available_size_with_margins: Vec3) -> Result<()> {
        self.element(id)?;
        self.measure_element(id, available_size_with_margins);
        Ok(())
    }

    /// Second layout pass: fixes the render size and offsets of `id` and its subtree.
    pub fn arrange(
        &mut self,
        id: ElementId,
        final_size_with_margins: Vec3,
        is_parent_collapsed: bool,
    ) -> Result<()> {
        self.element(id)?;
        self.arrange_element(id, final_size_with_margins, is_parent_collapsed);
        Ok(())
    }

    pub(crate) fn measure_element(&mut self, id: ElementId, available_size_with_margins: Vec3) {
        let Some(node) = self.node_mut(id) else { return };

        if !node.flags.contains(ElementFlags::FORCE_MEASURE)
            && bits_equal(available_size_with_margins, node.previous_measure_size)
        {
            node.flags.insert(ElementFlags::MEASURE_VALID);
            self.validate_children_measure(id);
            return;
        }

        node.flags.remove(ElementFlags::FORCE_MEASURE | ElementFlags::ARRANGE_VALID);
        node.flags.insert(ElementFlags::MEASURE_VALID);
        node.previous_measure_size = available_size_with_margins;

        if node.is_collapsed() {
            node.desired_size = Vec3::ZERO;
            node.desired_size_with_margins = Vec3::ZERO;
            self.run_collapse_hook(id);
            return;
        }

        let explicit_size = node.size;
        let margin = node.margin;
        let constraints = node.constraints();
        let default_size = node.default_size;
        let available_size_without_margins =
            constraints.resolve(explicit_size, margin.shrink(available_size_with_margins));

        let children_desired_size = self.measure_override(id, available_size_without_margins);

        let desired_size = fill_unset(fill_unset(explicit_size, children_desired_size), default_size);
        let desired_size = constraints.constrain(desired_size);
        if let Some(node) = self.node_mut(id) {
            node.desired_size = desired_size;
            node.desired_size_with_margins = margin.grow(desired_size);
        }
    }

    pub(crate) fn arrange_element(
        &mut self,
        id: ElementId,
        final_size_with_margins: Vec3,
        is_parent_collapsed: bool,
    ) {
        let Some(node) = self.node_mut(id) else { return };

        if !node.flags.contains(ElementFlags::FORCE_ARRANGE)
            && bits_equal(final_size_with_margins, node.previous_arrange_size)
            && is_parent_collapsed == node.previous_is_parent_collapsed
        {
            node.flags.insert(ElementFlags::ARRANGE_VALID);
            self.validate_children_arrange(id);
            return;
        }

        node.flags.remove(ElementFlags::FORCE_ARRANGE);
        node.flags.insert(ElementFlags::ARRANGE_VALID | ElementFlags::ARRANGE_CHANGED);
        node.previous_is_parent_collapsed = is_parent_collapsed;
        node.previous_arrange_size = final_size_with_margins;

        if node.is_collapsed() || is_parent_collapsed {
            self.collapse(id);
            return;
        }

        let margin = node.margin;
        let final_size_without_margins = margin.shrink(final_size_with_margins);

        let mut element_size = node.size;
        if element_size.x.is_nan() && node.horizontal_alignment == HorizontalAlignment::Stretch {
            element_size.x = final_size_without_margins.x;
        }
        if element_size.y.is_nan() && node.vertical_alignment == VerticalAlignment::Stretch {
            element_size.y = final_size_without_margins.y;
        }
        if element_size.z.is_nan() && node.depth_alignment == DepthAlignment::Stretch {
            element_size.z = final_size_without_margins.z;
        }
        let element_size = fill_unset(element_size, node.desired_size.min(final_size_without_margins));
        let element_size = node.constraints().constrain(element_size);

        let placements = [
            AxisPlacement::from(node.horizontal_alignment),
            AxisPlacement::from(node.vertical_alignment),
            AxisPlacement::from(node.depth_alignment),
        ];

        let element_size = self.arrange_override(id, element_size);

        let slack = final_size_with_margins - margin.grow(element_size);
        let render_offsets = margin.leading()
            + Vec3::new(
                placements[0].offset(slack.x),
                placements[1].offset(slack.y),
                placements[2].offset(slack.z),
            );

        if let Some(node) = self.node_mut(id) {
            node.render_size = element_size;
            node.render_offsets = render_offsets;
        }
    }

    fn measure_override(&mut self, id: ElementId, available_size_without_margins: Vec3) -> Vec3 {
        self.with_kind(id, |tree, kind| match kind {
            ElementKind::Empty => Vec3::ZERO,
            ElementKind::Leaf(leaf) => leaf.measure_override(available_size_without_margins),
            ElementKind::Content(content) => {
                tree.measure_content(content, available_size_without_margins)
            }
            ElementKind::Panel(panel) => tree.measure_panel(id, panel, available_size_without_margins),
        })
        .unwrap_or(Vec3::ZERO)
    }

    fn arrange_override(&mut self, id: ElementId, final_size_without_margins: Vec3) -> Vec3 {
        let is_collapsed = self.node(id).is_some_and(|node| node.is_collapsed());
        self.with_kind(id, |tree, kind| match kind {
            ElementKind::Empty => final_size_without_margins,
            ElementKind::Leaf(leaf) => leaf.arrange_override(final_size_without_margins),
            ElementKind::Content(content) => {
                tree.arrange_content(content, final_size_without_margins, is_collapsed)
            }
            ElementKind::Panel(panel) => tree.arrange_panel(id, panel, final_size_without_margins),
        })
        .unwrap_or(final_size_without_margins)
    }

    fn run_collapse_hook(&mut self, id: ElementId) {
        if let Some(ElementKind::Leaf(leaf)) = self.node_mut(id).map(|node| &mut node.kind) {
            leaf.collapse_override();
        }
    }

    /// Zeroes the layout of `id` and pushes the collapse down its visual subtree.
    pub(crate) fn collapse(&mut self, id: ElementId) {
        let Some(node) = self.node_mut(id) else { return };
        node.desired_size = Vec3::ZERO;
        node.desired_size_with_margins = Vec3::ZERO;
        node.render_size = Vec3::ZERO;
        node.render_offsets = Vec3::ZERO;
        self.run_collapse_hook(id);

        for child in self.visual_children_of(id) {
            self.invalidate_measure(child);
            self.collapse(child);
        }
    }

    /// Recomputes world matrices of `id` and its visual subtree where needed.
    pub fn update_world_matrix(&mut self, id: ElementId, parent_world_matrix: Mat4, parent_world_changed: bool) {
        let Some(node) = self.node_mut(id) else { return };

        let changed = parent_world_changed
            || node
                .flags
                .intersects(ElementFlags::LOCAL_MATRIX_CHANGED | ElementFlags::ARRANGE_CHANGED);
        if changed {
            let mut local_matrix = node.local_matrix;
            local_matrix.w_axis += (node.render_offsets + node.render_size / 2.0).extend(0.0);
            node.world_matrix = parent_world_matrix * local_matrix;
            node.flags
                .remove(ElementFlags::LOCAL_MATRIX_CHANGED | ElementFlags::ARRANGE_CHANGED);
        }
        let world_matrix = node.world_matrix;
        let is_panel = matches!(node.kind, ElementKind::Panel(_));
        let content = node
            .kind
            .as_content()
            .and_then(|content| Some((content.content?, content.content_arrange_matrix)));

        if is_panel {
            for child in self.visual_children_of(id) {
                let arrange_matrix = self
                    .node(child)
                    .map(|child| child.dependency_properties.peek(&PANEL_ARRANGE_MATRIX))
                    .unwrap_or(Mat4::IDENTITY);
                self.update_world_matrix(child, world_matrix * arrange_matrix, changed);
            }
        } else if let Some((child, content_matrix)) = content {
            self.update_world_matrix(child, world_matrix * content_matrix, changed);
        }
    }

    /// Propagates opacity, enabled state and depth bias down the visual tree.
    pub fn update_element_state(&mut self, id: ElementId, element_bias: i32) {
        let (parent_render_opacity, parent_is_hierarchy_enabled) = self
            .node(id)
            .and_then(|node| node.visual_parent)
            .and_then(|parent| self.node(parent))
            .map_or((1.0, true), |parent| (parent.render_opacity, parent.is_hierarchy_enabled));

        let Some(node) = self.node_mut(id) else { return };
        node.render_opacity = parent_render_opacity * node.opacity;
        node.is_hierarchy_enabled = parent_is_hierarchy_enabled && node.is_enabled;
        node.depth_bias = element_bias;

        let mut current_depth_bias = element_bias + node.draw_layer_number;
        for child in self.visual_children_of(id) {
            self.update_element_state(child, current_depth_bias);
            if let Some(child) = self.node(child) {
                current_depth_bias = child.max_children_depth_bias
                    + if child.clip_to_bounds { child.draw_layer_number } else { 0 };
            }
        }

        if let Some(node) = self.node_mut(id) {
            node.max_children_depth_bias = current_depth_bias;
        }
    }

    /// Runs every pass on `root` and collects the arranged subtree.
    pub fn update_layout(&mut self, root: ElementId, available_size: Vec3) -> Result<LayoutResult> {
        if !self.contains(root) {
            return Err(KryonError::ElementNotFound(root));
        }
        debug!("updating layout of element {} in {:?}", root, available_size);

        self.measure_element(root, available_size);
        self.arrange_element(root, available_size, false);
        self.update_world_matrix(root, Mat4::IDENTITY, false);
        self.update_element_state(root, 0);

        let mut result = LayoutResult::new();
        let mut pending = vec![root];
        while let Some(id) = pending.pop() {
            let Some(node) = self.node(id) else { continue };
            result.computed_sizes.insert(id, node.render_size);
            result
                .computed_positions
                .insert(id, node.world_matrix.w_axis.truncate());
            result.world_matrices.insert(id, node.world_matrix);
            pending.extend(node.visual_children.iter().copied());
        }
        trace!("layout collected {} elements", result.computed_sizes.len());
        Ok(result)
    }
}
