// crates/kryon-layout/src/attributes.rs

use glam::{Mat4, Vec3};
use kryon_core::Result;

use crate::{
    DepthAlignment, ElementFlags, ElementId, HorizontalAlignment, Thickness, UiElement, UiTree,
    VerticalAlignment, Visibility,
};

/// Explicit sizes: NaN stays unset, infinity saturates.
fn sanitize_size(value: f32) -> f32 {
    value.clamp(0.0, f32::MAX)
}

fn sanitize_maximum(value: f32) -> f32 {
    value.clamp(0.0, f32::INFINITY)
}

enum Relayout {
    None,
    Measure,
    Arrange,
}

impl UiTree {
    fn edit(&mut self, id: ElementId, relayout: Relayout, f: impl FnOnce(&mut UiElement)) -> Result<()> {
        f(self.element_mut(id)?);
        match relayout {
            Relayout::None => {}
            Relayout::Measure => self.invalidate_measure(id),
            Relayout::Arrange => self.invalidate_arrange(id),
        }
        Ok(())
    }

    fn edit_size_axis(
        &mut self,
        id: ElementId,
        axis: usize,
        value: f32,
        field: fn(&mut UiElement) -> &mut Vec3,
        sanitize: fn(f32) -> f32,
    ) -> Result<()> {
        self.edit(id, Relayout::Measure, |node| field(node)[axis] = sanitize(value))
    }

    /// Minimum, maximum and default sizes ignore NaN components.
    fn edit_bound_axis(
        &mut self,
        id: ElementId,
        axis: usize,
        value: f32,
        field: fn(&mut UiElement) -> &mut Vec3,
        sanitize: fn(f32) -> f32,
    ) -> Result<()> {
        if value.is_nan() {
            self.element(id)?;
            return Ok(());
        }
        self.edit_size_axis(id, axis, value, field, sanitize)
    }

    pub fn set_name(&mut self, id: ElementId, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        self.edit(id, Relayout::None, |node| node.name = Some(name))
    }

    pub fn set_width(&mut self, id: ElementId, width: f32) -> Result<()> {
        self.edit_size_axis(id, 0, width, |node| &mut node.size, sanitize_size)
    }

    pub fn set_height(&mut self, id: ElementId, height: f32) -> Result<()> {
        self.edit_size_axis(id, 1, height, |node| &mut node.size, sanitize_size)
    }

    pub fn set_depth(&mut self, id: ElementId, depth: f32) -> Result<()> {
        self.edit_size_axis(id, 2, depth, |node| &mut node.size, sanitize_size)
    }

    pub fn set_size(&mut self, id: ElementId, size: Vec3) -> Result<()> {
        self.set_width(id, size.x)?;
        self.set_height(id, size.y)?;
        self.set_depth(id, size.z)
    }

    pub fn set_minimum_width(&mut self, id: ElementId, value: f32) -> Result<()> {
        self.edit_bound_axis(id, 0, value, |node| &mut node.minimum_size, sanitize_size)
    }

    pub fn set_minimum_height(&mut self, id: ElementId, value: f32) -> Result<()> {
        self.edit_bound_axis(id, 1, value, |node| &mut node.minimum_size, sanitize_size)
    }

    pub fn set_minimum_depth(&mut self, id: ElementId, value: f32) -> Result<()> {
        self.edit_bound_axis(id, 2, value, |node| &mut node.minimum_size, sanitize_size)
    }

    pub fn set_minimum_size(&mut self, id: ElementId, size: Vec3) -> Result<()> {
        self.set_minimum_width(id, size.x)?;
        self.set_minimum_height(id, size.y)?;
        self.set_minimum_depth(id, size.z)
    }

    pub fn set_maximum_width(&mut self, id: ElementId, value: f32) -> Result<()> {
        self.edit_bound_axis(id, 0, value, |node| &mut node.maximum_size, sanitize_maximum)
    }

    pub fn set_maximum_height(&mut self, id: ElementId, value: f32) -> Result<()> {
        self.edit_bound_axis(id, 1, value, |node| &mut node.maximum_size, sanitize_maximum)
    }

    pub fn set_maximum_depth(&mut self, id: ElementId, value: f32) -> Result<()> {
        self.edit_bound_axis(id, 2, value, |node| &mut node.maximum_size, sanitize_maximum)
    }

    pub fn set_maximum_size(&mut self, id: ElementId, size: Vec3) -> Result<()> {
        self.set_maximum_width(id, size.x)?;
        self.set_maximum_height(id, size.y)?;
        self.set_maximum_depth(id, size.z)
    }

    pub fn set_default_width(&mut self, id: ElementId, value: f32) -> Result<()> {
        self.edit_bound_axis(id, 0, value, |node| &mut node.default_size, sanitize_size)
    }

    pub fn set_default_height(&mut self, id: ElementId, value: f32) -> Result<()> {
        self.edit_bound_axis(id, 1, value, |node| &mut node.default_size, sanitize_size)
    }

    pub fn set_default_depth(&mut self, id: ElementId, value: f32) -> Result<()> {
        self.edit_bound_axis(id, 2, value, |node| &mut node.default_size, sanitize_size)
    }

    pub fn set_default_size(&mut self, id: ElementId, size: Vec3) -> Result<()> {
        self.set_default_width(id, size.x)?;
        self.set_default_height(id, size.y)?;
        self.set_default_depth(id, size.z)
    }

    pub fn set_margin(&mut self, id: ElementId, margin: Thickness) -> Result<()> {
        self.edit(id, Relayout::Measure, |node| node.margin = margin)
    }

    pub fn set_horizontal_alignment(&mut self, id: ElementId, alignment: HorizontalAlignment) -> Result<()> {
        self.edit(id, Relayout::Arrange, |node| node.horizontal_alignment = alignment)
    }

    pub fn set_vertical_alignment(&mut self, id: ElementId, alignment: VerticalAlignment) -> Result<()> {
        self.edit(id, Relayout::Arrange, |node| node.vertical_alignment = alignment)
    }

    pub fn set_depth_alignment(&mut self, id: ElementId, alignment: DepthAlignment) -> Result<()> {
        self.edit(id, Relayout::Arrange, |node| node.depth_alignment = alignment)
    }

    pub fn set_visibility(&mut self, id: ElementId, visibility: Visibility) -> Result<()> {
        if self.element(id)?.visibility == visibility {
            return Ok(());
        }
        self.edit(id, Relayout::Measure, |node| node.visibility = visibility)
    }

    pub fn set_opacity(&mut self, id: ElementId, opacity: f32) -> Result<()> {
        if opacity.is_nan() {
            self.element(id)?;
            return Ok(());
        }
        self.edit(id, Relayout::None, |node| node.opacity = opacity.clamp(0.0, 1.0))
    }

    pub fn set_is_enabled(&mut self, id: ElementId, is_enabled: bool) -> Result<()> {
        self.edit(id, Relayout::None, |node| node.is_enabled = is_enabled)
    }

    pub fn set_clip_to_bounds(&mut self, id: ElementId, clip_to_bounds: bool) -> Result<()> {
        self.edit(id, Relayout::None, |node| node.clip_to_bounds = clip_to_bounds)
    }

    pub fn set_draw_layer_number(&mut self, id: ElementId, layers: i32) -> Result<()> {
        self.edit(id, Relayout::None, |node| node.draw_layer_number = layers)
    }

    pub fn set_local_matrix(&mut self, id: ElementId, local_matrix: Mat4) -> Result<()> {
        self.edit(id, Relayout::None, |node| {
            node.local_matrix = local_matrix;
            node.flags.insert(ElementFlags::LOCAL_MATRIX_CHANGED);
        })
    }
}
