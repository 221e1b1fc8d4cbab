// crates/kryon-layout/src/uniform_grid.rs

use std::ops::Range;

use glam::{Mat4, Vec2, Vec3};
use kryon_core::{KryonError, OwnerType, Result};

use crate::{ElementId, ElementKind, Orientation, PanelLayout, PanelState, UiTree, GRID_BASE};

pub static UNIFORM_GRID: OwnerType = OwnerType::new("UniformGrid", Some(&GRID_BASE));

/// A grid whose cells all have the same size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformGridState {
    columns: u32,
    rows: u32,
    layers: u32,
}

impl Default for UniformGridState {
    fn default() -> Self {
        Self::new(1, 1, 1)
    }
}

impl UniformGridState {
    /// Counts below one are raised to one.
    pub fn new(columns: u32, rows: u32, layers: u32) -> Self {
        Self {
            columns: columns.max(1),
            rows: rows.max(1),
            layers: layers.max(1),
        }
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn layers(&self) -> u32 {
        self.layers
    }

    fn counts(&self) -> [usize; 3] {
        [self.columns as usize, self.rows as usize, self.layers as usize]
    }

    fn cell_counts(&self) -> Vec3 {
        Vec3::new(self.columns as f32, self.rows as f32, self.layers as f32)
    }

    /// Distances from `position` to the cell borders around it.
    pub(crate) fn anchor_distances(&self, render_size: Vec3, direction: Orientation, position: f32) -> Vec2 {
        let axis = direction.axis();
        let count = self.counts()[axis];
        let cell = render_size[axis] / count as f32;
        if cell <= 0.0 || !cell.is_finite() {
            return Vec2::ZERO;
        }

        let position = position.min(render_size[axis]).max(0.0);
        let index = ((position / cell).floor() as usize).min(count - 1);
        Vec2::new(index as f32 * cell - position, (index + 1) as f32 * cell - position)
    }
}

fn span_lengths(strips: &[Range<usize>; 3]) -> Vec3 {
    Vec3::new(strips[0].len() as f32, strips[1].len() as f32, strips[2].len() as f32)
}

fn strip_starts(strips: &[Range<usize>; 3]) -> Vec3 {
    Vec3::new(strips[0].start as f32, strips[1].start as f32, strips[2].start as f32)
}

impl ElementKind {
    pub fn uniform_grid() -> Self {
        Self::uniform_grid_with(1, 1, 1)
    }

    pub fn uniform_grid_with(columns: u32, rows: u32, layers: u32) -> Self {
        ElementKind::Panel(PanelState::new(PanelLayout::UniformGrid(UniformGridState::new(
            columns, rows, layers,
        ))))
    }
}

impl UiTree {
    pub fn uniform_grid(&self, id: ElementId) -> Result<&UniformGridState> {
        match &self.element(id)?.kind {
            ElementKind::Panel(PanelState {
                layout: PanelLayout::UniformGrid(grid),
                ..
            }) => Ok(grid),
            _ => Err(KryonError::KindMismatch { id, expected: "UniformGrid" }),
        }
    }

    fn edit_uniform_grid(&mut self, id: ElementId, edit: impl FnOnce(&mut UniformGridState)) -> Result<()> {
        match &mut self.element_mut(id)?.kind {
            ElementKind::Panel(PanelState {
                layout: PanelLayout::UniformGrid(grid),
                ..
            }) => edit(grid),
            _ => return Err(KryonError::KindMismatch { id, expected: "UniformGrid" }),
        }
        self.invalidate_measure(id);
        Ok(())
    }

    pub fn set_uniform_columns(&mut self, id: ElementId, columns: u32) -> Result<()> {
        self.edit_uniform_grid(id, |grid| grid.columns = columns.max(1))
    }

    pub fn set_uniform_rows(&mut self, id: ElementId, rows: u32) -> Result<()> {
        self.edit_uniform_grid(id, |grid| grid.rows = rows.max(1))
    }

    pub fn set_uniform_layers(&mut self, id: ElementId, layers: u32) -> Result<()> {
        self.edit_uniform_grid(id, |grid| grid.layers = layers.max(1))
    }

    fn uniform_cells(&self, child: ElementId, grid: &UniformGridState) -> Option<[Range<usize>; 3]> {
        let placement = self.grid_placement(child)?;
        let counts = grid.counts();
        Some(std::array::from_fn(|axis| placement.strips(axis, counts[axis])))
    }

    /// The desired size is the largest per-cell need of any child, times the
    /// cell counts.
    pub(crate) fn measure_uniform_grid(
        &mut self,
        children: &[ElementId],
        grid: &mut UniformGridState,
        available_size_without_margins: Vec3,
    ) -> Vec3 {
        let cell_counts = grid.cell_counts();
        let cell_size = available_size_without_margins / cell_counts;

        let mut needed_cell_size = Vec3::ZERO;
        for &child in children {
            let Some(cells) = self.uniform_cells(child, grid) else { continue };
            let spans = span_lengths(&cells);
            self.measure_element(child, spans * cell_size);
            if let Some(node) = self.node(child) {
                needed_cell_size = needed_cell_size.max(node.desired_size_with_margins / spans);
            }
        }
        needed_cell_size * cell_counts
    }

    pub(crate) fn arrange_uniform_grid(
        &mut self,
        children: &[ElementId],
        grid: &mut UniformGridState,
        final_size_without_margins: Vec3,
        is_collapsed: bool,
    ) -> Vec3 {
        let cell_size = final_size_without_margins / grid.cell_counts();
        for &child in children {
            let Some(cells) = self.uniform_cells(child, grid) else { continue };
            let offsets = strip_starts(&cells) * cell_size - final_size_without_margins / 2.0;
            self.set_arrange_matrix(child, Mat4::from_translation(offsets));
            self.arrange_element(child, span_lengths(&cells) * cell_size, is_collapsed);
        }
        final_size_without_margins
    }
}
