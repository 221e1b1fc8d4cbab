// crates/kryon-layout/src/grid.rs

use std::ops::Range;

use glam::{Mat4, Vec2, Vec3};
use kryon_core::{KryonError, OwnerType, Result};
use tracing::{debug, warn};

use crate::grid_base::strip_name;
use crate::strip_definition::{sum_actual_sizes, sum_values};
use crate::{
    ElementId, ElementKind, Orientation, PanelLayout, PanelState, StripDefinition, StripType, UiTree,
    GRID_BASE,
};

pub static GRID: OwnerType = OwnerType::new("Grid", Some(&GRID_BASE));

/// Strip membership of the children, rebuilt on every measure.
#[derive(Debug, Default)]
struct StripCache {
    /// Children with the strips they cover on each axis.
    placements: Vec<(ElementId, [Range<usize>; 3])>,
    /// Per axis and strip, the placements covering only non-star strips along that axis.
    no_star_elements: [Vec<Vec<usize>>; 3],
    /// Per axis, the placements covering at least one star strip.
    partial_star_elements: [Vec<usize>; 3],
    /// Placements covering at least one auto strip on any axis.
    auto_defined_elements: Vec<usize>,
    /// Start of every strip plus the end of the last one.
    strip_positions: [Vec<f32>; 3],
}

/// Layout state of a grid: user strip definitions per axis and the caches of
/// the last layout pass.
#[derive(Debug)]
pub struct GridState {
    definitions: [Vec<StripDefinition>; 3],
    default_definitions: [Vec<StripDefinition>; 3],
    cache: StripCache,
}

impl Default for GridState {
    fn default() -> Self {
        Self::new()
    }
}

fn one_star_size(space: f32, weights: f32) -> f32 {
    if weights > 0.0 {
        space / weights
    } else {
        0.0
    }
}

impl GridState {
    pub fn new() -> Self {
        Self {
            definitions: Default::default(),
            default_definitions: std::array::from_fn(|_| vec![StripDefinition::default()]),
            cache: StripCache::default(),
        }
    }

    pub fn column_definitions(&self) -> &[StripDefinition] {
        &self.definitions[0]
    }

    pub fn row_definitions(&self) -> &[StripDefinition] {
        &self.definitions[1]
    }

    pub fn layer_definitions(&self) -> &[StripDefinition] {
        &self.definitions[2]
    }

    pub fn definitions(&self, orientation: Orientation) -> &[StripDefinition] {
        &self.definitions[orientation.axis()]
    }

    /// Strips used for layout along `orientation`. A grid without
    /// definitions on an axis behaves as if it had one default star strip.
    pub fn actual_definitions(&self, orientation: Orientation) -> &[StripDefinition] {
        self.strips(orientation.axis())
    }

    fn strips(&self, axis: usize) -> &[StripDefinition] {
        if self.definitions[axis].is_empty() {
            &self.default_definitions[axis]
        } else {
            &self.definitions[axis]
        }
    }

    fn strips_mut(&mut self, axis: usize) -> &mut [StripDefinition] {
        if self.definitions[axis].is_empty() {
            &mut self.default_definitions[axis]
        } else {
            &mut self.definitions[axis]
        }
    }

    fn strip_counts(&self) -> [usize; 3] {
        std::array::from_fn(|axis| self.strips(axis).len())
    }

    fn star_strips(&self, axis: usize) -> Vec<usize> {
        self.strips(axis)
            .iter()
            .enumerate()
            .filter(|(_, strip)| strip.strip_type() == StripType::Star)
            .map(|(index, _)| index)
            .collect()
    }

    fn span_size(&self, axis: usize, strips: &Range<usize>) -> f32 {
        sum_actual_sizes(&self.strips(axis)[strips.clone()])
    }

    fn span_sizes(&self, strips: &[Range<usize>; 3]) -> Vec3 {
        Vec3::new(
            self.span_size(0, &strips[0]),
            self.span_size(1, &strips[1]),
            self.span_size(2, &strips[2]),
        )
    }

    fn rebuild_measure_cache(&mut self, placements: Vec<(ElementId, [Range<usize>; 3])>) {
        let counts = self.strip_counts();
        let mut cache = StripCache {
            strip_positions: std::mem::take(&mut self.cache.strip_positions),
            ..StripCache::default()
        };
        for axis in 0..3 {
            cache.no_star_elements[axis] = vec![Vec::new(); counts[axis]];
        }

        for (index, (element, ranges)) in placements.into_iter().enumerate() {
            let mut auto_defined = false;
            for axis in 0..3 {
                let strips = &self.strips(axis)[ranges[axis].clone()];
                auto_defined |= strips.iter().any(|strip| strip.strip_type() == StripType::Auto);
                if strips.iter().any(|strip| strip.strip_type() == StripType::Star) {
                    cache.partial_star_elements[axis].push(index);
                } else {
                    for strip in ranges[axis].clone() {
                        cache.no_star_elements[axis][strip].push(index);
                    }
                }
            }
            if auto_defined {
                cache.auto_defined_elements.push(index);
            }
            cache.placements.push((element, ranges));
        }
        self.cache = cache;
    }

    /// Fixed strips start at their value, others at zero, both clamped.
    fn initialize_actual_sizes(&mut self, axis: usize) {
        for strip in self.strips_mut(axis) {
            let size = match strip.strip_type() {
                StripType::Fixed => strip.size_value(),
                _ => 0.0,
            };
            strip.actual_size = strip.clamp_size(size);
        }
    }

    /// Shares `size` minus the space taken by non-star strips between the star
    /// strips. Strips stuck at a bound are taken out and the rest re-shared.
    fn calculate_star_sizes(&mut self, size: Vec3) {
        for axis in 0..3 {
            let mut remaining = self.star_strips(axis);
            let strips = self.strips_mut(axis);

            let taken: f32 = strips
                .iter()
                .filter(|strip| strip.strip_type() != StripType::Star)
                .map(|strip| strip.actual_size)
                .sum();
            let mut space_remaining = (size[axis] - taken).max(0.0);
            let mut weight_sum = sum_values(remaining.iter().map(|&index| &strips[index]));
            let mut one_star = one_star_size(space_remaining, weight_sum);

            while !remaining.is_empty() {
                let mut min_bounded = Vec::new();
                let mut max_bounded = Vec::new();
                for &index in &remaining {
                    let strip = &mut strips[index];
                    strip.actual_size = strip.star_share(one_star);
                    if strip.actual_size < strip.minimum_size() {
                        strip.actual_size = strip.minimum_size();
                        min_bounded.push(index);
                    } else if strip.actual_size > strip.maximum_size() {
                        strip.actual_size = strip.maximum_size();
                        max_bounded.push(index);
                    }
                }

                let resulting = sum_actual_sizes(remaining.iter().map(|&index| &strips[index]));
                let bounded = if resulting < space_remaining { max_bounded } else { min_bounded };
                if bounded.is_empty() {
                    break;
                }

                space_remaining -= sum_actual_sizes(bounded.iter().map(|&index| &strips[index]));
                weight_sum -= sum_values(bounded.iter().map(|&index| &strips[index]));
                one_star = one_star_size(space_remaining.max(0.0), weight_sum);
                remaining.retain(|index| !bounded.contains(index));
            }
        }
    }

    /// Smallest 1-star size letting the star strips of `strips` hold
    /// `desired` once added to their non-star neighbours.
    fn one_star_size_for(&mut self, axis: usize, strips: Range<usize>, desired: f32) -> f32 {
        let definitions = self.strips_mut(axis);

        let mut min_sorted = Vec::new();
        let mut available_space = 0.0;
        for index in strips {
            let strip = &mut definitions[index];
            if strip.strip_type() == StripType::Star {
                strip.actual_size = strip.minimum_size();
                if strip.has_weight() {
                    min_sorted.push(index);
                }
            }
            available_space += strip.actual_size;
        }
        let mut needed_space = (desired - available_space).max(0.0);

        min_sorted.sort_by(|&a, &b| {
            definitions[a]
                .value_relative_minimum()
                .total_cmp(&definitions[b].value_relative_minimum())
        });

        let mut max_sorted: Vec<usize> = Vec::new();
        let mut needed_one_star = 0.0f32;
        for (position, &min_strip) in min_sorted.iter().enumerate() {
            if needed_space <= 0.0 {
                break;
            }

            max_sorted.push(min_strip);
            max_sorted.sort_by(|&a, &b| {
                definitions[a]
                    .value_relative_maximum()
                    .total_cmp(&definitions[b].value_relative_maximum())
            });

            let next_relative_minimum = min_sorted
                .get(position + 1)
                .map_or(f32::INFINITY, |&next| definitions[next].value_relative_minimum());
            let mut step = (needed_space / sum_values(max_sorted.iter().map(|&index| &definitions[index])))
                .min(next_relative_minimum - definitions[min_strip].value_relative_minimum());

            while step > 0.0 && !max_sorted.is_empty() {
                let max_strip = max_sorted[0];
                let bound = &definitions[max_strip];
                let relative_increase = step.min((bound.maximum_size() - bound.actual_size) / bound.size_value());
                let reached_maximum = bound.actual_size + step * bound.size_value() >= bound.maximum_size();
                step -= relative_increase;

                for &index in &max_sorted {
                    let increase = relative_increase * definitions[index].size_value();
                    definitions[index].actual_size += increase;
                    needed_space -= increase;
                }
                needed_one_star =
                    needed_one_star.max(definitions[max_strip].actual_size / definitions[max_strip].size_value());

                if reached_maximum {
                    let absolute_step = step * sum_values(max_sorted.iter().map(|&index| &definitions[index]));
                    max_sorted.remove(0);
                    let weights = sum_values(max_sorted.iter().map(|&index| &definitions[index]));
                    step = one_star_size(absolute_step, weights);
                }
            }
        }
        needed_one_star
    }

    fn rebuild_strip_positions(&mut self) {
        for axis in 0..3 {
            let mut positions = Vec::with_capacity(self.strips(axis).len() + 1);
            let mut start = 0.0;
            for strip in self.strips(axis) {
                positions.push(start);
                start += strip.actual_size;
            }
            positions.push(start);
            self.cache.strip_positions[axis] = positions;
        }
    }

    /// Distances from `position` to the strip borders around it, with the
    /// position clamped into the grid.
    pub(crate) fn anchor_distances(&self, direction: Orientation, position: f32) -> Vec2 {
        let positions = &self.cache.strip_positions[direction.axis()];
        if positions.len() < 2 {
            return Vec2::ZERO;
        }

        let last = positions[positions.len() - 1];
        let position = position.min(last).max(0.0);
        let mut index = 1;
        while index < positions.len() - 1 && positions[index] <= position {
            index += 1;
        }
        Vec2::new(positions[index - 1] - position, positions[index] - position)
    }
}

impl ElementKind {
    pub fn grid() -> Self {
        ElementKind::Panel(PanelState::new(PanelLayout::Grid(GridState::new())))
    }
}

impl UiTree {
    pub fn grid(&self, id: ElementId) -> Result<&GridState> {
        match &self.element(id)?.kind {
            ElementKind::Panel(PanelState {
                layout: PanelLayout::Grid(grid),
                ..
            }) => Ok(grid),
            _ => Err(KryonError::KindMismatch { id, expected: "Grid" }),
        }
    }

    fn grid_mut(&mut self, id: ElementId) -> Result<&mut GridState> {
        match &mut self.element_mut(id)?.kind {
            ElementKind::Panel(PanelState {
                layout: PanelLayout::Grid(grid),
                ..
            }) => Ok(grid),
            _ => Err(KryonError::KindMismatch { id, expected: "Grid" }),
        }
    }

    /// Edits the strip definitions of grid `id` along `orientation`.
    pub fn edit_strips<R>(
        &mut self,
        id: ElementId,
        orientation: Orientation,
        edit: impl FnOnce(&mut Vec<StripDefinition>) -> R,
    ) -> Result<R> {
        let result = edit(&mut self.grid_mut(id)?.definitions[orientation.axis()]);
        self.invalidate_measure(id);
        Ok(result)
    }

    pub fn add_strip(&mut self, id: ElementId, orientation: Orientation, strip: StripDefinition) -> Result<()> {
        self.edit_strips(id, orientation, |strips| strips.push(strip))
    }

    fn placed_children(
        &self,
        grid_id: ElementId,
        children: &[ElementId],
        counts: [usize; 3],
    ) -> Vec<(ElementId, [Range<usize>; 3])> {
        let mut placed = Vec::with_capacity(children.len());
        for &child in children {
            let Some(placement) = self.grid_placement(child) else { continue };
            for orientation in Orientation::ALL {
                let axis = orientation.axis();
                if placement.overflows(axis, counts[axis]) {
                    warn!(
                        "element {} is placed outside the {} definitions of grid {}",
                        child,
                        strip_name(orientation),
                        grid_id
                    );
                }
            }
            placed.push((child, std::array::from_fn(|axis| placement.strips(axis, counts[axis]))));
        }
        placed
    }

    pub(crate) fn measure_grid(
        &mut self,
        id: ElementId,
        children: &[ElementId],
        grid: &mut GridState,
        available_size_without_margins: Vec3,
    ) -> Vec3 {
        let placed = self.placed_children(id, children, grid.strip_counts());
        grid.rebuild_measure_cache(placed);

        // Auto elements first get the space left by the fixed strips and the
        // minimums of the others.
        for axis in 0..3 {
            grid.initialize_actual_sizes(axis);
        }
        let mut auto_available = available_size_without_margins;
        for axis in 0..3 {
            for strip in grid.strips(axis) {
                auto_available[axis] -= match strip.strip_type() {
                    StripType::Fixed => strip.actual_size,
                    _ => strip.minimum_size(),
                };
            }
        }
        for &index in &grid.cache.auto_defined_elements {
            let (child, ranges) = &grid.cache.placements[index];
            let mut child_available = Vec3::ZERO;
            for axis in 0..3 {
                let mut with_minimums = auto_available[axis];
                for strip in &grid.strips(axis)[ranges[axis].clone()] {
                    if strip.strip_type() == StripType::Fixed {
                        with_minimums += strip.actual_size;
                        child_available[axis] += strip.clamp_size(strip.size_value());
                    } else {
                        with_minimums += strip.minimum_size();
                        child_available[axis] = with_minimums.min(child_available[axis] + strip.maximum_size());
                    }
                }
            }
            self.measure_element(*child, child_available);
        }

        // Auto strips grow to hold the elements covering only non-star strips,
        // leaving what later auto strips can absorb to them.
        let counts = grid.strip_counts();
        for axis in 0..3 {
            for index in 0..counts[axis] {
                if grid.strips(axis)[index].strip_type() != StripType::Auto {
                    continue;
                }
                for element in grid.cache.no_star_elements[axis][index].clone() {
                    let (child, ranges) = &grid.cache.placements[element];
                    let strips_range = ranges[axis].clone();
                    let desired = self.node(*child).map_or(0.0, |node| node.desired_size_with_margins[axis]);

                    let strips = grid.strips_mut(axis);
                    let mut space_needed = (desired - sum_actual_sizes(&strips[strips_range.clone()])).max(0.0);
                    if space_needed <= 0.0 {
                        continue;
                    }
                    for strip in &strips[index + 1..strips_range.end] {
                        if strip.strip_type() == StripType::Auto {
                            space_needed = (space_needed - (strip.maximum_size() - strip.actual_size)).max(0.0);
                        }
                        if space_needed <= 0.0 {
                            break;
                        }
                    }
                    let current = &mut strips[index];
                    current.actual_size = current.clamp_size(current.actual_size + space_needed);
                }
            }
        }

        grid.calculate_star_sizes(available_size_without_margins);

        for (child, ranges) in &grid.cache.placements {
            let provided = grid.span_sizes(ranges);
            self.measure_element(*child, provided);
        }

        // The desired size uses the smallest 1-star size fitting every
        // element that covers star strips.
        let mut needed_size = Vec3::ZERO;
        for axis in 0..3 {
            let mut one_star = 0.0f32;
            for element in grid.cache.partial_star_elements[axis].clone() {
                let (child, ranges) = &grid.cache.placements[element];
                let strips_range = ranges[axis].clone();
                let desired = self.node(*child).map_or(0.0, |node| node.desired_size_with_margins[axis]);
                one_star = one_star.max(grid.one_star_size_for(axis, strips_range, desired));
            }

            let star_strips = grid.star_strips(axis);
            let strips = grid.strips_mut(axis);
            for index in star_strips {
                let strip = &mut strips[index];
                strip.actual_size = strip.clamp_size(strip.star_share(one_star));
            }
            needed_size[axis] = sum_actual_sizes(strips.iter());
        }

        debug!("grid {} measured {:?} for {:?}", id, needed_size, available_size_without_margins);
        needed_size
    }

    pub(crate) fn arrange_grid(
        &mut self,
        id: ElementId,
        children: &[ElementId],
        grid: &mut GridState,
        final_size_without_margins: Vec3,
        is_collapsed: bool,
    ) -> Vec3 {
        grid.calculate_star_sizes(final_size_without_margins);
        grid.rebuild_strip_positions();

        let mut grid_size = final_size_without_margins;
        for axis in 0..3 {
            if let Some(&end) = grid.cache.strip_positions[axis].last() {
                grid_size[axis] = grid_size[axis].max(end);
            }
        }

        let counts = grid.strip_counts();
        for (child, ranges) in self.placed_children(id, children, counts) {
            let start = Vec3::new(
                grid.cache.strip_positions[0][ranges[0].start],
                grid.cache.strip_positions[1][ranges[1].start],
                grid.cache.strip_positions[2][ranges[2].start],
            );
            self.set_arrange_matrix(child, Mat4::from_translation(start - grid_size / 2.0));
            self.arrange_element(child, grid.span_sizes(&ranges), is_collapsed);
        }
        grid_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        DepthAlignment, FixedSizeContent, HorizontalAlignment, LeafLayout, VerticalAlignment,
        PANEL_ARRANGE_MATRIX,
    };

    /// Desires exactly the space it is offered.
    #[derive(Debug)]
    struct Reflector;

    impl LeafLayout for Reflector {
        fn measure_override(&mut self, available_size_without_margins: Vec3) -> Vec3 {
            available_size_without_margins
        }
    }

    fn add_strips(tree: &mut UiTree, grid: ElementId, orientation: Orientation, strips: &[StripDefinition]) {
        tree.edit_strips(grid, orientation, |definitions| definitions.extend_from_slice(strips))
            .unwrap();
    }

    fn add_at(tree: &mut UiTree, grid: ElementId, kind: ElementKind, cell: [i32; 3], span: [i32; 3]) -> ElementId {
        let child = tree.add_element(kind);
        for orientation in Orientation::ALL {
            tree.set_grid_position(child, orientation, cell[orientation.axis()]).unwrap();
            tree.set_grid_span(child, orientation, span[orientation.axis()]).unwrap();
        }
        tree.add_child(grid, child).unwrap();
        child
    }

    fn column_child(tree: &mut UiTree, grid: ElementId, column: i32, span: i32, width: f32) -> ElementId {
        let content = ElementKind::leaf(FixedSizeContent(Vec3::new(width, 0.0, 0.0)));
        add_at(tree, grid, content, [column, 0, 0], [span, 1, 1])
    }

    fn actual_columns(tree: &UiTree, grid: ElementId) -> Vec<f32> {
        tree.grid(grid)
            .unwrap()
            .actual_definitions(Orientation::Horizontal)
            .iter()
            .map(StripDefinition::actual_size)
            .collect()
    }

    fn translation(tree: &UiTree, child: ElementId) -> Vec3 {
        tree.get_property(child, &PANEL_ARRANGE_MATRIX)
            .unwrap()
            .w_axis
            .truncate()
    }

    #[test]
    fn test_missing_definitions_act_as_one_star() {
        let mut tree = UiTree::new();
        let grid = tree.add_element(ElementKind::grid());
        let child = add_at(
            &mut tree,
            grid,
            ElementKind::leaf(FixedSizeContent(Vec3::new(100.0, 400.0, 0.0))),
            [2, 1, 0],
            [3, 1, 1],
        );

        tree.measure(grid, Vec3::new(200.0, 200.0, 0.0)).unwrap();
        assert_eq!(tree[grid].desired_size(), Vec3::new(100.0, 400.0, 0.0));

        tree.arrange(grid, Vec3::new(200.0, 200.0, 0.0), false).unwrap();
        assert_eq!(tree[child].render_size(), Vec3::new(200.0, 200.0, 0.0));

        let state = tree.grid(grid).unwrap();
        assert!(state.column_definitions().is_empty());
        assert_eq!(state.actual_definitions(Orientation::Vertical).len(), 1);
    }

    #[test]
    fn test_fixed_strips() {
        let mut tree = UiTree::new();
        let grid = tree.add_element(ElementKind::grid());
        add_strips(&mut tree, grid, Orientation::Horizontal, &[100.0, 200.0, 300.0].map(StripDefinition::fixed));
        add_strips(&mut tree, grid, Orientation::Vertical, &[400.0, 500.0, 600.0].map(StripDefinition::fixed));
        add_strips(&mut tree, grid, Orientation::InDepth, &[700.0, 800.0, 900.0].map(StripDefinition::fixed));

        let first = add_at(&mut tree, grid, ElementKind::leaf(Reflector), [0, 0, 0], [1, 1, 1]);
        let spanning = add_at(&mut tree, grid, ElementKind::leaf(Reflector), [1, 2, 1], [2, 1, 2]);
        let outside = add_at(&mut tree, grid, ElementKind::leaf(Reflector), [5, 0, 0], [1, 1, 1]);
        let first_row = add_at(&mut tree, grid, ElementKind::leaf(Reflector), [0, 0, 0], [3, 1, 1]);

        let expected = Vec3::new(600.0, 1500.0, 2400.0);
        tree.measure(grid, Vec3::ZERO).unwrap();
        assert_eq!(tree[grid].desired_size(), expected);
        tree.measure(grid, Vec3::INFINITY).unwrap();
        assert_eq!(tree[grid].desired_size(), expected);

        assert_eq!(tree[first].desired_size(), Vec3::new(100.0, 400.0, 700.0));
        assert_eq!(tree[spanning].desired_size(), Vec3::new(500.0, 600.0, 1700.0));
        assert_eq!(tree[outside].desired_size(), Vec3::new(300.0, 400.0, 700.0));
        assert_eq!(tree[first_row].desired_size(), Vec3::new(600.0, 400.0, 700.0));

        tree.arrange(grid, expected, false).unwrap();
        assert_eq!(tree[grid].render_size(), expected);
        assert_eq!(tree[spanning].render_size(), Vec3::new(500.0, 600.0, 1700.0));
        assert_eq!(tree[first_row].render_size(), Vec3::new(600.0, 400.0, 700.0));
        assert_eq!(translation(&tree, first), Vec3::new(-300.0, -750.0, -1200.0));
        assert_eq!(translation(&tree, spanning), Vec3::new(-200.0, 150.0, -500.0));
        assert_eq!(translation(&tree, outside), Vec3::new(0.0, -750.0, -1200.0));
    }

    #[test]
    fn test_fixed_strips_larger_than_final_size() {
        let mut tree = UiTree::new();
        let grid = tree.add_element(ElementKind::grid());
        add_strips(&mut tree, grid, Orientation::Horizontal, &[StripDefinition::fixed(100.0)]);

        tree.measure(grid, Vec3::ZERO).unwrap();
        tree.arrange(grid, Vec3::new(40.0, 0.0, 0.0), false).unwrap();
        assert_eq!(tree[grid].render_size().x, 100.0);
    }

    #[test]
    fn test_star_strips_share_space() {
        let mut tree = UiTree::new();
        let grid = tree.add_element(ElementKind::grid());
        add_strips(&mut tree, grid, Orientation::Horizontal, &[10.0, 20.0, 30.0].map(StripDefinition::star));
        column_child(&mut tree, grid, 0, 1, 10.0);
        column_child(&mut tree, grid, 1, 1, 15.0);
        column_child(&mut tree, grid, 2, 1, 20.0);

        tree.measure(grid, Vec3::ZERO).unwrap();
        assert_eq!(tree[grid].desired_size().x, 60.0);
        assert_eq!(actual_columns(&tree, grid), vec![10.0, 20.0, 30.0]);

        tree.arrange(grid, Vec3::new(120.0, 0.0, 0.0), false).unwrap();
        assert_eq!(actual_columns(&tree, grid), vec![20.0, 40.0, 60.0]);
    }

    #[test]
    fn test_star_strips_with_spanning_element() {
        let mut tree = UiTree::new();
        let grid = tree.add_element(ElementKind::grid());
        add_strips(&mut tree, grid, Orientation::Horizontal, &[3.0, 2.0, 1.0].map(StripDefinition::star));
        column_child(&mut tree, grid, 0, 1, 30.0);
        column_child(&mut tree, grid, 0, 3, 120.0);

        tree.measure(grid, Vec3::ZERO).unwrap();
        assert_eq!(tree[grid].desired_size().x, 120.0);
        assert_eq!(actual_columns(&tree, grid), vec![60.0, 40.0, 20.0]);
    }

    #[test]
    fn test_star_minimum_on_single_element() {
        let mut tree = UiTree::new();
        let grid = tree.add_element(ElementKind::grid());
        add_strips(&mut tree, grid, Orientation::Horizontal, &[StripDefinition::star(10.0).with_minimum(20.0)]);
        column_child(&mut tree, grid, 0, 1, 10.0);

        tree.measure(grid, Vec3::ZERO).unwrap();
        assert_eq!(tree[grid].desired_size().x, 20.0);

        tree.arrange(grid, Vec3::new(15.0, 0.0, 0.0), false).unwrap();
        assert_eq!(actual_columns(&tree, grid), vec![20.0]);
        assert_eq!(tree[grid].render_size().x, 20.0);
    }

    #[test]
    fn test_star_minimums_on_two_elements() {
        let mut tree = UiTree::new();
        let grid = tree.add_element(ElementKind::grid());
        add_strips(
            &mut tree,
            grid,
            Orientation::Horizontal,
            &[StripDefinition::star(10.0).with_minimum(20.0), StripDefinition::star(20.0).with_minimum(80.0)],
        );
        add_strips(&mut tree, grid, Orientation::Vertical, &[StripDefinition::auto()]);
        column_child(&mut tree, grid, 0, 1, 25.0);
        column_child(&mut tree, grid, 1, 1, 60.0);

        tree.measure(grid, Vec3::new(50.0, 20.0, 10.0)).unwrap();
        assert_eq!(tree[grid].desired_size_with_margins(), Vec3::new(105.0, 0.0, 0.0));

        tree.arrange(grid, Vec3::splat(110.0), false).unwrap();
        assert_eq!(actual_columns(&tree, grid), vec![30.0, 80.0]);
    }

    #[test]
    fn test_star_minimum_shared_by_spanning_element() {
        let mut tree = UiTree::new();
        let grid = tree.add_element(ElementKind::grid());
        add_strips(
            &mut tree,
            grid,
            Orientation::Horizontal,
            &[StripDefinition::star(1.0).with_minimum(20.0), StripDefinition::star(1.0)],
        );
        let child = column_child(&mut tree, grid, 0, 2, 30.0);

        tree.measure(grid, Vec3::ZERO).unwrap();
        assert_eq!(tree[grid].desired_size().x, 30.0);
        assert_eq!(actual_columns(&tree, grid), vec![20.0, 10.0]);

        tree.remove_child(grid, child).unwrap();
        column_child(&mut tree, grid, 0, 2, 60.0);
        tree.measure(grid, Vec3::ZERO).unwrap();
        assert_eq!(tree[grid].desired_size().x, 60.0);
        assert_eq!(actual_columns(&tree, grid), vec![30.0, 30.0]);
    }

    #[test]
    fn test_star_maximum_on_single_element() {
        let mut tree = UiTree::new();
        let grid = tree.add_element(ElementKind::grid());
        add_strips(&mut tree, grid, Orientation::Horizontal, &[StripDefinition::star(10.0).with_maximum(20.0)]);
        column_child(&mut tree, grid, 0, 1, 30.0);

        tree.measure(grid, Vec3::ZERO).unwrap();
        assert_eq!(tree[grid].desired_size().x, 20.0);

        tree.arrange(grid, Vec3::new(50.0, 0.0, 0.0), false).unwrap();
        assert_eq!(actual_columns(&tree, grid), vec![20.0]);
        assert_eq!(tree[grid].render_size().x, 50.0);
    }

    #[test]
    fn test_star_bounds_resolved_in_arrange() {
        let mut tree = UiTree::new();
        let grid = tree.add_element(ElementKind::grid());
        add_strips(
            &mut tree,
            grid,
            Orientation::Horizontal,
            &[
                StripDefinition::star(10.0).with_minimum(50.0),
                StripDefinition::star(40.0).with_maximum(10.0),
                StripDefinition::star(50.0),
            ],
        );

        tree.measure(grid, Vec3::ZERO).unwrap();
        tree.arrange(grid, Vec3::new(100.0, 0.0, 0.0), false).unwrap();
        assert_eq!(actual_columns(&tree, grid), vec![50.0, 10.0, 40.0]);
    }

    #[test]
    fn test_weightless_star_strip_stays_at_minimum() {
        let mut tree = UiTree::new();
        let grid = tree.add_element(ElementKind::grid());
        add_strips(
            &mut tree,
            grid,
            Orientation::Horizontal,
            &[StripDefinition::star(0.0).with_minimum(5.0), StripDefinition::star(1.0)],
        );
        column_child(&mut tree, grid, 0, 2, 40.0);

        tree.measure(grid, Vec3::ZERO).unwrap();
        assert_eq!(actual_columns(&tree, grid), vec![5.0, 35.0]);
        tree.arrange(grid, Vec3::new(100.0, 0.0, 0.0), false).unwrap();
        assert_eq!(actual_columns(&tree, grid), vec![5.0, 95.0]);
    }

    #[test]
    fn test_auto_strips_fit_elements() {
        let mut tree = UiTree::new();
        let grid = tree.add_element(ElementKind::grid());
        add_strips(&mut tree, grid, Orientation::Horizontal, &[StripDefinition::auto(), StripDefinition::auto(), StripDefinition::auto()]);
        column_child(&mut tree, grid, 0, 1, 10.0);
        column_child(&mut tree, grid, 1, 1, 20.0);
        column_child(&mut tree, grid, 1, 1, 30.0);
        column_child(&mut tree, grid, 2, 1, 40.0);

        tree.measure(grid, Vec3::ZERO).unwrap();
        assert_eq!(tree[grid].desired_size().x, 80.0);
        assert_eq!(actual_columns(&tree, grid), vec![10.0, 30.0, 40.0]);
    }

    #[test]
    fn test_auto_strips_with_spanning_elements() {
        let mut tree = UiTree::new();
        let grid = tree.add_element(ElementKind::grid());
        add_strips(&mut tree, grid, Orientation::Horizontal, &[StripDefinition::auto(), StripDefinition::auto(), StripDefinition::auto()]);
        column_child(&mut tree, grid, 0, 1, 10.0);
        column_child(&mut tree, grid, 1, 1, 20.0);
        column_child(&mut tree, grid, 0, 2, 40.0);
        column_child(&mut tree, grid, 2, 1, 10.0);
        column_child(&mut tree, grid, 1, 2, 30.0);
        column_child(&mut tree, grid, 0, 3, 70.0);

        tree.measure(grid, Vec3::ZERO).unwrap();
        assert_eq!(tree[grid].desired_size().x, 70.0);
        assert_eq!(actual_columns(&tree, grid), vec![10.0, 30.0, 30.0]);
    }

    #[test]
    fn test_auto_strips_with_bounds() {
        let mut tree = UiTree::new();
        let grid = tree.add_element(ElementKind::grid());
        add_strips(
            &mut tree,
            grid,
            Orientation::Horizontal,
            &[
                StripDefinition::auto().with_minimum(20.0),
                StripDefinition::auto(),
                StripDefinition::auto(),
                StripDefinition::auto().with_maximum(20.0),
                StripDefinition::auto(),
                StripDefinition::auto().with_maximum(20.0),
                StripDefinition::auto().with_minimum(20.0).with_maximum(20.0),
            ],
        );
        column_child(&mut tree, grid, 0, 1, 10.0);
        column_child(&mut tree, grid, 0, 2, 40.0);
        column_child(&mut tree, grid, 1, 1, 20.0);
        column_child(&mut tree, grid, 1, 3, 50.0);
        column_child(&mut tree, grid, 2, 2, 40.0);
        column_child(&mut tree, grid, 4, 1, 10.0);
        column_child(&mut tree, grid, 4, 3, 60.0);
        column_child(&mut tree, grid, 5, 1, 30.0);
        column_child(&mut tree, grid, 6, 1, 10.0);
        column_child(&mut tree, grid, 6, 1, 30.0);

        tree.measure(grid, Vec3::ZERO).unwrap();
        assert_eq!(tree[grid].desired_size().x, 140.0);
        assert_eq!(actual_columns(&tree, grid), vec![20.0; 7]);
    }

    #[test]
    fn test_measure_provides_star_sizes() {
        let mut tree = UiTree::new();
        let grid = tree.add_element(ElementKind::grid());
        add_strips(
            &mut tree,
            grid,
            Orientation::Horizontal,
            &[
                StripDefinition::star(10.0).with_minimum(50.0),
                StripDefinition::star(40.0).with_maximum(10.0),
                StripDefinition::star(50.0),
            ],
        );
        let children: Vec<_> = (0..3)
            .map(|column| add_at(&mut tree, grid, ElementKind::leaf(Reflector), [column, 0, 0], [1, 1, 1]))
            .collect();

        tree.measure(grid, Vec3::new(100.0, 0.0, 0.0)).unwrap();
        let widths: Vec<f32> = children.iter().map(|&child| tree[child].desired_size().x).collect();
        assert_eq!(widths, vec![50.0, 10.0, 40.0]);
    }

    #[test]
    fn test_measure_provides_auto_sizes() {
        let mut tree = UiTree::new();
        let grid = tree.add_element(ElementKind::grid());
        add_strips(
            &mut tree,
            grid,
            Orientation::Horizontal,
            &[
                StripDefinition::star(1.0).with_minimum(15.0),
                StripDefinition::auto().with_minimum(10.0),
                StripDefinition::fixed(20.0),
                StripDefinition::auto().with_maximum(10.0),
                StripDefinition::auto(),
            ],
        );
        let children: Vec<_> = (0..5)
            .map(|column| add_at(&mut tree, grid, ElementKind::leaf(Reflector), [column, 0, 0], [1, 1, 1]))
            .collect();

        tree.measure(grid, Vec3::new(100.0, 0.0, 0.0)).unwrap();
        let widths: Vec<f32> = children.iter().map(|&child| tree[child].desired_size().x).collect();
        assert_eq!(widths, vec![15.0, 65.0, 20.0, 10.0, 55.0]);
    }

    #[test]
    fn test_strip_edits_invalidate_measure() {
        let mut tree = UiTree::new();
        let grid = tree.add_element(ElementKind::grid());
        tree.update_layout(grid, Vec3::ONE).unwrap();
        assert!(tree[grid].is_measure_valid());

        tree.add_strip(grid, Orientation::Vertical, StripDefinition::fixed(10.0)).unwrap();
        assert!(!tree[grid].is_measure_valid());
        tree.update_layout(grid, Vec3::ONE).unwrap();

        let removed = tree.edit_strips(grid, Orientation::Vertical, |strips| strips.pop()).unwrap();
        assert_eq!(removed.map(|strip| strip.size_value()), Some(10.0));
        assert!(!tree[grid].is_measure_valid());

        let stack = tree.add_element(ElementKind::stack_panel());
        assert!(matches!(
            tree.add_strip(stack, Orientation::Vertical, StripDefinition::auto()),
            Err(KryonError::KindMismatch { .. })
        ));
    }

    #[test]
    fn test_surrounding_anchors() {
        let mut tree = UiTree::new();
        let grid = tree.add_element(ElementKind::grid());
        tree.set_horizontal_alignment(grid, HorizontalAlignment::Center).unwrap();
        tree.set_vertical_alignment(grid, VerticalAlignment::Center).unwrap();
        tree.set_depth_alignment(grid, DepthAlignment::Center).unwrap();
        add_strips(&mut tree, grid, Orientation::Horizontal, &[StripDefinition::fixed(100.0), StripDefinition::fixed(200.0)]);
        add_strips(&mut tree, grid, Orientation::Vertical, &[StripDefinition::auto(), StripDefinition::auto()]);
        add_strips(&mut tree, grid, Orientation::InDepth, &[StripDefinition::star(1.0), StripDefinition::star(1.0)]);

        let first = tree.add_element(ElementKind::Empty);
        tree.set_size(first, Vec3::new(50.0, 150.0, 250.0)).unwrap();
        tree.add_child(grid, first).unwrap();
        let second = tree.add_element(ElementKind::Empty);
        tree.set_size(second, Vec3::new(100.0, 200.0, 300.0)).unwrap();
        tree.set_grid_position(second, Orientation::Vertical, 1).unwrap();
        tree.add_child(grid, second).unwrap();

        tree.measure(grid, Vec3::splat(1000.0)).unwrap();
        tree.arrange(grid, Vec3::splat(1000.0), false).unwrap();

        let cases = [
            (Orientation::Horizontal, -1.0, Vec2::new(0.0, 100.0)),
            (Orientation::Horizontal, 0.0, Vec2::new(0.0, 100.0)),
            (Orientation::Horizontal, 50.0, Vec2::new(-50.0, 50.0)),
            (Orientation::Horizontal, 100.0, Vec2::new(0.0, 200.0)),
            (Orientation::Horizontal, 110.0, Vec2::new(-10.0, 190.0)),
            (Orientation::Horizontal, 300.0, Vec2::new(-200.0, 0.0)),
            (Orientation::Horizontal, 500.0, Vec2::new(-200.0, 0.0)),
            (Orientation::Vertical, 0.0, Vec2::new(0.0, 150.0)),
            (Orientation::Vertical, 80.0, Vec2::new(-80.0, 70.0)),
            (Orientation::Vertical, 150.0, Vec2::new(0.0, 200.0)),
            (Orientation::Vertical, 500.0, Vec2::new(-200.0, 0.0)),
            (Orientation::InDepth, -1.0, Vec2::new(0.0, 300.0)),
            (Orientation::InDepth, 310.0, Vec2::new(-10.0, 290.0)),
            (Orientation::InDepth, 900.0, Vec2::new(-300.0, 0.0)),
        ];
        for (direction, position, expected) in cases {
            assert_eq!(
                tree.surrounding_anchor_distances(grid, direction, position).unwrap(),
                expected,
                "{:?} at {}",
                direction,
                position
            );
        }
    }
}
