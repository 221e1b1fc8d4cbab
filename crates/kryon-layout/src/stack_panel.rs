// crates/kryon-layout/src/stack_panel.rs

use std::mem;

use glam::{Mat4, Vec2, Vec3};
use kryon_core::{KryonError, OwnerType, Result};
use tracing::warn;

use crate::panel::border_anchor_distances;
use crate::{ElementId, ElementKind, Orientation, PanelLayout, PanelState, UiTree, PANEL};

pub static STACK_PANEL: OwnerType = OwnerType::new("StackPanel", Some(&PANEL));

pub(crate) const ZERO_TOLERANCE: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
enum ScrollRequest {
    /// Scroll to an element index, possibly fractional.
    AbsolutePosition(f32),
    /// Move by whole elements; the sign gives the side.
    RelativeElement(f32),
    /// Move by a distance along the stack axis.
    RelativePosition(f32),
}

/// Scrolling state of a stack panel.
///
/// The scroll position is expressed in elements: `2.5` is halfway through
/// the third child. Requests issued while the arrange is stale are queued
/// and replayed by the next arrange.
#[derive(Debug, Default)]
pub struct StackPanelState {
    orientation: Orientation,
    item_virtualization_enabled: bool,
    scroll_position: f32,
    offset: Vec3,
    extent: Vec3,
    viewport: Vec3,
    visible_children: Vec<ElementId>,
    element_bounds: Vec<f32>,
    index_element_max_scrolling: usize,
    scrolling_requests: Vec<ScrollRequest>,
}

impl StackPanelState {
    pub fn new(orientation: Orientation) -> Self {
        Self {
            orientation,
            ..Self::default()
        }
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn item_virtualization_enabled(&self) -> bool {
        self.item_virtualization_enabled
    }

    pub fn scroll_position(&self) -> f32 {
        self.scroll_position
    }

    /// Translation applied to the children by the current scrolling.
    pub fn offset(&self) -> Vec3 {
        self.offset
    }

    /// Size of the whole content; estimated when items are virtualized.
    pub fn extent(&self) -> Vec3 {
        self.extent
    }

    pub fn viewport(&self) -> Vec3 {
        self.viewport
    }

    /// Children intersecting the viewport after the last scroll update.
    pub fn visible_children(&self) -> &[ElementId] {
        &self.visible_children
    }

    pub fn can_scroll(&self, direction: Orientation) -> bool {
        direction == self.orientation
    }

    pub(crate) fn on_child_inserted(&mut self, index: usize) {
        if (index as f32) < self.scroll_position.floor() {
            self.scroll_position += 1.0;
        }
    }

    pub(crate) fn on_child_removed(&mut self, index: usize) {
        if (index as f32) < self.scroll_position.floor() {
            self.scroll_position -= 1.0;
        }
    }
}

impl ElementKind {
    pub fn stack_panel() -> Self {
        Self::stack_panel_with(Orientation::default())
    }

    pub fn stack_panel_with(orientation: Orientation) -> Self {
        ElementKind::Panel(PanelState::new(PanelLayout::Stack(StackPanelState::new(orientation))))
    }
}

impl UiTree {
    pub fn stack_panel(&self, id: ElementId) -> Result<&StackPanelState> {
        match &self.element(id)?.kind {
            ElementKind::Panel(PanelState {
                layout: PanelLayout::Stack(stack),
                ..
            }) => Ok(stack),
            _ => Err(KryonError::KindMismatch { id, expected: "StackPanel" }),
        }
    }

    fn with_stack<R>(
        &mut self,
        id: ElementId,
        f: impl FnOnce(&mut UiTree, &[ElementId], &mut StackPanelState) -> R,
    ) -> Result<R> {
        self.stack_panel(id)?;
        self.with_kind(id, |tree, kind| match kind {
            ElementKind::Panel(PanelState {
                children,
                layout: PanelLayout::Stack(stack),
            }) => Ok(f(tree, children, stack)),
            _ => Err(KryonError::KindMismatch { id, expected: "StackPanel" }),
        })
        .ok_or(KryonError::ElementNotFound(id))?
    }

    pub fn set_orientation(&mut self, id: ElementId, orientation: Orientation) -> Result<()> {
        let changed = self.with_stack(id, |_, _, stack| {
            let changed = stack.orientation != orientation;
            stack.orientation = orientation;
            changed
        })?;
        if changed {
            self.invalidate_measure(id);
        }
        Ok(())
    }

    /// Toggles virtualization: only the children intersecting the viewport
    /// stay in the visual tree.
    pub fn set_item_virtualization_enabled(&mut self, id: ElementId, enabled: bool) -> Result<()> {
        let changed = self.with_stack(id, |tree, children, stack| {
            if stack.item_virtualization_enabled == enabled {
                return false;
            }
            stack.item_virtualization_enabled = enabled;
            if enabled {
                stack.visible_children.clear();
            } else {
                tree.clear_visual_children(id);
                for child in children {
                    tree.attach_visual_child(id, *child);
                }
                tree.sort_visual_children(id);
            }
            true
        })?;
        if changed {
            self.invalidate_measure(id);
        }
        Ok(())
    }

    pub fn can_scroll(&self, id: ElementId, direction: Orientation) -> Result<bool> {
        Ok(self.stack_panel(id)?.can_scroll(direction))
    }

    /// Scrolls so that element `index` (possibly fractional) starts the viewport.
    pub fn scroll_to_element(&mut self, id: ElementId, index: f32) -> Result<()> {
        self.with_stack(id, |tree, children, stack| {
            tree.stack_scroll_to_element(id, children, stack, index)
        })
    }

    /// Scrolls by `offset` along the stack axis.
    pub fn scroll_of(&mut self, id: ElementId, offset: f32) -> Result<()> {
        self.with_stack(id, |tree, children, stack| tree.stack_scroll_of(id, children, stack, offset))
    }

    /// Scrolls by the component of `offsets` on the stack axis.
    pub fn scroll_by(&mut self, id: ElementId, offsets: Vec3) -> Result<()> {
        let axis = self.stack_panel(id)?.orientation.axis();
        self.scroll_of(id, offsets[axis])
    }

    pub fn scroll_to_next_line(&mut self, id: ElementId, direction: Orientation) -> Result<()> {
        self.with_stack(id, |tree, children, stack| {
            tree.stack_scroll_to_neighbour(id, children, stack, direction, 1.0)
        })
    }

    pub fn scroll_to_previous_line(&mut self, id: ElementId, direction: Orientation) -> Result<()> {
        self.with_stack(id, |tree, children, stack| {
            tree.stack_scroll_to_neighbour(id, children, stack, direction, -1.0)
        })
    }

    pub fn scroll_to_next_page(&mut self, id: ElementId, direction: Orientation) -> Result<()> {
        self.scroll_pages(id, direction, 1.0)
    }

    pub fn scroll_to_previous_page(&mut self, id: ElementId, direction: Orientation) -> Result<()> {
        self.scroll_pages(id, direction, -1.0)
    }

    pub fn scroll_to_beginning(&mut self, id: ElementId, direction: Orientation) -> Result<()> {
        if self.can_scroll(id, direction)? {
            self.scroll_to_element(id, 0.0)?;
        }
        Ok(())
    }

    pub fn scroll_to_end(&mut self, id: ElementId, direction: Orientation) -> Result<()> {
        if self.can_scroll(id, direction)? {
            self.scroll_to_element(id, i32::MAX as f32)?;
        }
        Ok(())
    }

    fn scroll_pages(&mut self, id: ElementId, direction: Orientation, pages: f32) -> Result<()> {
        let stack = self.stack_panel(id)?;
        if !stack.can_scroll(direction) {
            return Ok(());
        }
        let distance = pages * stack.viewport[stack.orientation.axis()];
        self.scroll_of(id, distance)
    }

    /// Position of the scroll bars in `[0, 1]` on the stack axis, zero elsewhere.
    pub fn scroll_bar_positions(&mut self, id: ElementId) -> Result<Vec3> {
        self.with_stack(id, |tree, children, stack| {
            let mut ratio = Vec3::ZERO;
            let axis = stack.orientation.axis();
            if children.is_empty() {
                return ratio;
            }
            let extent_minus_viewport = stack.extent[axis] - stack.viewport[axis];
            if extent_minus_viewport <= ZERO_TOLERANCE {
                return ratio;
            }

            if stack.item_virtualization_enabled {
                let (index, accumulated) = tree.fill_viewport_backward(id, children, stack);
                let last_size = tree.safe_child_size(id, children, stack, index, axis);
                let max_scroll_position =
                    (index as f32 + (accumulated - stack.viewport[axis]) / last_size).max(0.0);
                ratio[axis] = stack.scroll_position / max_scroll_position;
            } else {
                let index = stack.scroll_position.floor() as usize;
                let remainder = stack.scroll_position - index as f32;
                if let (Some(previous), Some(next)) =
                    (stack.element_bounds.get(index), stack.element_bounds.get(index + 1))
                {
                    ratio[axis] = ((previous + remainder * (next - previous)) / extent_minus_viewport).min(1.0);
                }
            }
            ratio
        })
    }

    pub(crate) fn stack_anchor_distances(
        &mut self,
        id: ElementId,
        children: &[ElementId],
        stack: &mut StackPanelState,
        direction: Orientation,
        position: f32,
    ) -> Vec2 {
        if direction != stack.orientation {
            let render_size = self.node(id).map_or(Vec3::ZERO, |node| node.render_size);
            return border_anchor_distances(render_size, direction, position);
        }
        let index = stack.scroll_position.floor();
        let size = self.safe_child_size(id, children, stack, index as usize, direction.axis());
        let start = (stack.scroll_position - index) * size;
        Vec2::new(-start, size - start)
    }

    pub(crate) fn measure_stack(
        &mut self,
        id: ElementId,
        children: &[ElementId],
        stack: &mut StackPanelState,
        available_size_without_margins: Vec3,
    ) -> Vec3 {
        stack.viewport = available_size_without_margins;
        if stack.item_virtualization_enabled {
            let position = stack.scroll_position;
            self.adjust_offsets_and_visual_children(id, children, stack, position);
        }

        let axis = stack.orientation.axis();
        let (cross1, cross2) = stack.orientation.cross_axes();
        let mut child_available_size = available_size_without_margins;
        child_available_size[axis] = f32::INFINITY;

        let measured = if stack.item_virtualization_enabled {
            stack.visible_children.clone()
        } else {
            children.to_vec()
        };

        let mut desired_size = Vec3::ZERO;
        for child in measured {
            self.measure_element(child, child_available_size);
            let Some(node) = self.node(child) else { continue };
            let child_desired = node.desired_size_with_margins;
            desired_size[axis] += child_desired[axis];
            desired_size[cross1] = desired_size[cross1].max(child_desired[cross1]);
            desired_size[cross2] = desired_size[cross2].max(child_desired[cross2]);
        }
        desired_size
    }

    pub(crate) fn arrange_stack(
        &mut self,
        id: ElementId,
        children: &[ElementId],
        stack: &mut StackPanelState,
        final_size_without_margins: Vec3,
    ) -> Vec3 {
        stack.visible_children.clear();
        stack.viewport = final_size_without_margins;
        let axis = stack.orientation.axis();

        if !stack.item_virtualization_enabled {
            self.arrange_stack_children(id, children, stack);

            let bounds = &stack.element_bounds;
            let total = bounds.last().copied().unwrap_or(0.0);
            let mut index = bounds.len().saturating_sub(2);
            while index > 0 && bounds[index] > total - stack.viewport[axis] {
                index -= 1;
            }
            stack.index_element_max_scrolling = index;
        }

        stack.extent = final_size_without_margins;
        stack.extent[axis] = if stack.item_virtualization_enabled {
            self.estimate_extent_length(id, children, stack)
        } else {
            stack.element_bounds.last().copied().unwrap_or(0.0)
        };

        let requests = mem::take(&mut stack.scrolling_requests);
        if requests.is_empty() {
            let position = stack.scroll_position;
            self.adjust_offsets_and_visual_children(id, children, stack, position);
        } else {
            for request in requests {
                match request {
                    ScrollRequest::AbsolutePosition(index) => {
                        self.stack_scroll_to_element(id, children, stack, index)
                    }
                    ScrollRequest::RelativeElement(side) => {
                        let orientation = stack.orientation;
                        self.stack_scroll_to_neighbour(id, children, stack, orientation, side)
                    }
                    ScrollRequest::RelativePosition(offset) => {
                        self.stack_scroll_of(id, children, stack, offset)
                    }
                }
            }
        }
        stack.scrolling_requests.clear();

        final_size_without_margins
    }

    /// Lays the arranged children one after the other and records their bounds.
    fn arrange_stack_children(&mut self, id: ElementId, children: &[ElementId], stack: &mut StackPanelState) {
        let axis = stack.orientation.axis();
        let (cross1, cross2) = stack.orientation.cross_axes();
        let is_collapsed = self.node(id).is_some_and(|node| node.is_collapsed());
        let arranged = if stack.item_virtualization_enabled {
            stack.visible_children.clone()
        } else {
            children.to_vec()
        };

        stack.element_bounds.clear();
        stack.element_bounds.push(0.0);
        let mut start = 0.0;
        for child in arranged {
            let mut origin = -stack.viewport / 2.0;
            origin[axis] += start;
            self.set_arrange_matrix(child, Mat4::from_translation(origin));

            let Some(node) = self.node(child) else { continue };
            let mut child_size = node.desired_size_with_margins;
            child_size[cross1] = stack.viewport[cross1];
            child_size[cross2] = stack.viewport[cross2];
            self.arrange_element(child, child_size, is_collapsed);

            if let Some(node) = self.node(child) {
                if !node.is_collapsed() {
                    start += node.render_size[axis] + node.margin[axis] + node.margin[axis + 3];
                }
            }
            stack.element_bounds.push(start);
        }
    }

    fn stack_scroll_to_element(
        &mut self,
        id: ElementId,
        children: &[ElementId],
        stack: &mut StackPanelState,
        index: f32,
    ) {
        if self.is_arrange_valid(id) {
            self.adjust_offsets_and_visual_children(id, children, stack, index);
        } else {
            self.invalidate_arrange(id);
            stack.scrolling_requests.clear();
            stack.scrolling_requests.push(ScrollRequest::AbsolutePosition(index));
        }
    }

    fn stack_scroll_to_neighbour(
        &mut self,
        id: ElementId,
        children: &[ElementId],
        stack: &mut StackPanelState,
        direction: Orientation,
        side: f32,
    ) {
        if direction != stack.orientation {
            return;
        }
        if self.is_arrange_valid(id) {
            let target = if side > 0.0 {
                (stack.scroll_position + 1.0).floor()
            } else {
                (stack.scroll_position - 1.0).ceil()
            };
            self.adjust_offsets_and_visual_children(id, children, stack, target);
        } else {
            self.invalidate_arrange(id);
            stack.scrolling_requests.push(ScrollRequest::RelativeElement(side));
        }
    }

    fn stack_scroll_of(&mut self, id: ElementId, children: &[ElementId], stack: &mut StackPanelState, offset: f32) {
        let distance = offset.abs();
        if distance < ZERO_TOLERANCE {
            return;
        }
        if !self.is_arrange_valid(id) {
            self.invalidate_arrange(id);
            stack.scrolling_requests.push(ScrollRequest::RelativePosition(offset));
            return;
        }

        let axis = stack.orientation.axis();
        let forward = offset > 0.0;
        let mut index = stack.scroll_position.floor() as usize;
        let current_size = self.safe_child_size(id, children, stack, index, axis);
        let offset_in_child = (stack.scroll_position - index as f32) * current_size;

        let mut accumulated = if forward {
            -offset_in_child
        } else {
            offset_in_child - current_size
        };
        let mut size = current_size;
        while accumulated + size < distance
            && if forward { index + 1 < children.len() } else { index > 0 }
        {
            index = if forward { index + 1 } else { index - 1 };
            accumulated += size;
            size = self.safe_child_size(id, children, stack, index, axis);
        }

        let remainder = distance - accumulated;
        let partial = if forward { remainder } else { size - remainder };
        let position = index as f32 + partial / size;
        self.adjust_offsets_and_visual_children(id, children, stack, position);
    }

    /// Clamps the scroll position, recomputes the offset and the visible
    /// children for `desired_position`.
    fn adjust_offsets_and_visual_children(
        &mut self,
        id: ElementId,
        children: &[ElementId],
        stack: &mut StackPanelState,
        desired_position: f32,
    ) {
        stack.offset = Vec3::ZERO;
        let axis = stack.orientation.axis();

        if stack.item_virtualization_enabled {
            self.update_scroll_position(id, children, stack, desired_position);
            self.update_and_arrange_visible_children(id, children, stack);
        } else if stack.element_bounds.len() < 2 {
            stack.scroll_position = 0.0;
        } else {
            let viewport_size = stack.viewport[axis];
            let bounds = &stack.element_bounds;
            let max_index = stack.index_element_max_scrolling.min(bounds.len() - 2);
            let inferior_bound = bounds[max_index];
            let bound_difference = bounds[max_index + 1] - inferior_bound;

            let mut max_scroll_position = max_index as f32;
            if bound_difference > ZERO_TOLERANCE {
                max_scroll_position += (1.0 - ZERO_TOLERANCE)
                    .min((stack.extent[axis] - viewport_size - inferior_bound) / bound_difference);
            }
            stack.scroll_position = desired_position.min(max_scroll_position).max(0.0);

            let first = stack.scroll_position.floor() as usize;
            stack.offset[axis] = -bounds[first];
            stack.visible_children.clear();
            let last = children.len().min(bounds.len() - 1);
            for i in first..last {
                stack.visible_children.push(children[i]);
                if bounds[i + 1] - bounds[first + 1] > viewport_size {
                    break;
                }
            }
        }

        let index = stack.scroll_position.floor();
        let remainder = stack.scroll_position - index;
        let first_size = self.safe_child_size(id, children, stack, index as usize, axis);
        stack.offset[axis] -= remainder * first_size;
    }

    /// Clamps `new_position` so that the viewport stays filled when possible.
    fn update_scroll_position(
        &mut self,
        id: ElementId,
        children: &[ElementId],
        stack: &mut StackPanelState,
        new_position: f32,
    ) {
        let axis = stack.orientation.axis();
        let viewport_size = stack.viewport[axis];
        let count = children.len();

        let mut valid_position = new_position.min(count as f32 - ZERO_TOLERANCE).max(0.0);
        let first = valid_position.floor() as usize;
        let first_size = self.safe_child_size(id, children, stack, first, axis);
        let start_offset = (valid_position - first as f32) * first_size;

        let mut current_size = -start_offset;
        let mut index = first;
        while index < count && current_size < viewport_size {
            current_size += self.safe_child_size(id, children, stack, index, axis);
            index += 1;
        }

        if current_size < viewport_size {
            current_size += start_offset - first_size;
            let mut backward = Some(first);
            while let Some(index) = backward {
                current_size += self.safe_child_size(id, children, stack, index, axis);
                if current_size >= viewport_size {
                    break;
                }
                backward = index.checked_sub(1);
            }
            valid_position = match backward {
                Some(index) => {
                    let size = self.safe_child_size(id, children, stack, index, axis);
                    index as f32 + (current_size - viewport_size) / size
                }
                None => 0.0,
            };
        }

        stack.scroll_position = valid_position;
    }

    fn update_and_arrange_visible_children(
        &mut self,
        id: ElementId,
        children: &[ElementId],
        stack: &mut StackPanelState,
    ) {
        let axis = stack.orientation.axis();
        let cached = mem::take(&mut stack.visible_children);
        self.clear_visual_children(id);

        let mut index = stack.scroll_position.floor() as usize;
        let first_size = self.safe_child_size(id, children, stack, index, axis);
        let mut current_size = -(stack.scroll_position - index as f32) * first_size;
        while index < children.len() && current_size <= stack.viewport[axis] {
            current_size += self.safe_child_size(id, children, stack, index, axis);
            let child = children[index];
            stack.visible_children.push(child);
            self.attach_visual_child(id, child);
            index += 1;
        }
        self.sort_visual_children(id);

        if !stack.visible_children.is_empty() && (cached.is_empty() || cached != stack.visible_children) {
            self.arrange_stack_children(id, children, stack);
        }
    }

    fn estimate_extent_length(&mut self, id: ElementId, children: &[ElementId], stack: &mut StackPanelState) -> f32 {
        if children.is_empty() {
            return 0.0;
        }
        let (index, accumulated) = self.fill_viewport_backward(id, children, stack);
        accumulated / (children.len() - index) as f32 * children.len() as f32
    }

    /// Walks back from the last child until the viewport is filled.
    /// Returns the first index reached and the accumulated size.
    fn fill_viewport_backward(&mut self, id: ElementId, children: &[ElementId], stack: &mut StackPanelState) -> (usize, f32) {
        let axis = stack.orientation.axis();
        let mut index = children.len();
        let mut accumulated = 0.0;
        while index > 0 && accumulated < stack.viewport[axis] {
            index -= 1;
            accumulated += self.safe_child_size(id, children, stack, index, axis);
        }
        (index, accumulated)
    }

    /// Size with margins of child `index` along `dimension`, laying the
    /// child out first if needed. Zero for collapsed or missing children.
    fn safe_child_size(
        &mut self,
        id: ElementId,
        children: &[ElementId],
        stack: &StackPanelState,
        index: usize,
        dimension: usize,
    ) -> f32 {
        let Some(&child) = children.get(index) else { return 0.0 };
        let Some(node) = self.node(child) else { return 0.0 };
        if node.is_collapsed() {
            return 0.0;
        }

        if !node.is_measure_valid() {
            self.measure_element(child, stack.viewport);
        }
        if let Some(node) = self.node(child).filter(|node| !node.is_arrange_valid()) {
            let mut provided_size = stack.viewport;
            let axis = stack.orientation.axis();
            provided_size[axis] = node.desired_size_with_margins[axis];
            let is_parent_collapsed = self
                .node(id)
                .and_then(|panel| panel.parent)
                .and_then(|parent| self.node(parent))
                .is_some_and(|parent| parent.is_collapsed());
            self.arrange_element(child, provided_size, is_parent_collapsed);
        }

        self.node(child).map_or(0.0, |node| {
            node.render_size[dimension] + node.margin[dimension] + node.margin[dimension + 3]
        })
    }

    fn is_arrange_valid(&self, id: ElementId) -> bool {
        self.node(id).is_some_and(|node| node.is_arrange_valid())
    }

    fn attach_visual_child(&mut self, panel: ElementId, child: ElementId) {
        if let Err(err) = self.set_visual_parent(child, Some(panel)) {
            warn!("cannot show element {} in stack panel {}: {}", child, panel, err);
        }
    }
}
