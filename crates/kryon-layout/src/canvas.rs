// crates/kryon-layout/src/canvas.rs

use std::sync::LazyLock;

use glam::{Mat4, Vec3};
use kryon_core::{Invalidation, OwnerType, PropertyKey, Result};

use crate::{ElementId, ElementKind, PanelLayout, PanelState, UiTree, PANEL};

pub static CANVAS: OwnerType = OwnerType::new("Canvas", Some(&PANEL));

/// Child size as a fraction of the canvas size. NaN components are unset.
pub static RELATIVE_SIZE: LazyLock<PropertyKey<Vec3>> = LazyLock::new(|| {
    PropertyKey::builder("RelativeSize", &CANVAS)
        .default_value(Vec3::NAN)
        .invalidates(Invalidation::PARENT_MEASURE)
        .build()
});

/// Pin position as a fraction of the canvas size.
pub static RELATIVE_POSITION: LazyLock<PropertyKey<Vec3>> = LazyLock::new(|| {
    PropertyKey::builder("RelativePosition", &CANVAS)
        .invalidates(Invalidation::PARENT_MEASURE)
        .build()
});

/// Pin position in canvas units.
pub static ABSOLUTE_POSITION: LazyLock<PropertyKey<Vec3>> = LazyLock::new(|| {
    PropertyKey::builder("AbsolutePosition", &CANVAS)
        .invalidates(Invalidation::PARENT_MEASURE)
        .build()
});

pub static USE_ABSOLUTE_POSITION: LazyLock<PropertyKey<bool>> = LazyLock::new(|| {
    PropertyKey::builder("UseAbsolutePosition", &CANVAS)
        .default_value(true)
        .invalidates(Invalidation::PARENT_MEASURE)
        .build()
});

/// Point of the child, in fractions of its size, placed on the pin.
pub static PIN_ORIGIN: LazyLock<PropertyKey<Vec3>> = LazyLock::new(|| {
    PropertyKey::builder("PinOrigin", &CANVAS)
        .validator(|origin: &mut Vec3| *origin = origin.clamp(Vec3::ZERO, Vec3::ONE))
        .invalidates(Invalidation::PARENT_MEASURE)
        .build()
});

impl ElementKind {
    pub fn canvas() -> Self {
        ElementKind::Panel(PanelState::new(PanelLayout::Canvas))
    }
}

struct CanvasPlacement {
    relative_size: Vec3,
    pin_position: Vec3,
    pin_origin: Vec3,
}

impl UiTree {
    pub fn set_canvas_relative_size(&mut self, child: ElementId, size: Vec3) -> Result<()> {
        self.set_property(child, &RELATIVE_SIZE, size)
    }

    /// Pins `child` at a fraction of the canvas size.
    pub fn set_canvas_relative_position(&mut self, child: ElementId, position: Vec3) -> Result<()> {
        self.set_property(child, &RELATIVE_POSITION, position)?;
        self.set_property(child, &USE_ABSOLUTE_POSITION, false)
    }

    /// Pins `child` at a position in canvas units.
    pub fn set_canvas_absolute_position(&mut self, child: ElementId, position: Vec3) -> Result<()> {
        self.set_property(child, &ABSOLUTE_POSITION, position)?;
        self.set_property(child, &USE_ABSOLUTE_POSITION, true)
    }

    pub fn set_canvas_pin_origin(&mut self, child: ElementId, origin: Vec3) -> Result<()> {
        self.set_property(child, &PIN_ORIGIN, origin)
    }

    fn canvas_placement(&self, child: ElementId, canvas_size: Vec3) -> Option<CanvasPlacement> {
        let properties = &self.node(child)?.dependency_properties;
        let relative = properties.peek(&RELATIVE_POSITION);
        let absolute = properties.peek(&ABSOLUTE_POSITION);
        let use_absolute = properties.peek(&USE_ABSOLUTE_POSITION);

        let mut pin_position = absolute;
        for dim in 0..3 {
            if absolute[dim].is_nan() || (!use_absolute && !relative[dim].is_nan()) {
                // 0 * inf would give NaN
                pin_position[dim] = if relative[dim] == 0.0 {
                    0.0
                } else {
                    relative[dim] * canvas_size[dim]
                };
            }
        }

        Some(CanvasPlacement {
            relative_size: properties.peek(&RELATIVE_SIZE),
            pin_position,
            pin_origin: properties.peek(&PIN_ORIGIN),
        })
    }

    /// Space a child may take: its relative size when set, otherwise what is
    /// left between the pin and the canvas border on the origin side.
    fn canvas_child_available_size(placement: &CanvasPlacement, canvas_size: Vec3) -> Vec3 {
        let mut available = Vec3::INFINITY;
        for dim in 0..3 {
            let relative_size = placement.relative_size[dim];
            let pin = placement.pin_position[dim];
            let origin = placement.pin_origin[dim];
            let size = canvas_size[dim];

            if !relative_size.is_nan() {
                available[dim] = if relative_size > 0.0 { relative_size * size } else { 0.0 };
            } else if pin >= 0.0 && pin <= size {
                if origin == 0.0 {
                    available[dim] = size - pin;
                } else if origin == 1.0 {
                    available[dim] = pin;
                } else if size.is_finite() {
                    available[dim] = (pin / origin).min((size - pin) / (1.0 - origin));
                }
            }
        }
        available
    }

    /// Children never contribute to the canvas desired size.
    pub(crate) fn measure_canvas(&mut self, children: &[ElementId], available_size_without_margins: Vec3) -> Vec3 {
        for &child in children {
            let Some(placement) = self.canvas_placement(child, available_size_without_margins) else {
                continue;
            };
            let available = Self::canvas_child_available_size(&placement, available_size_without_margins);
            self.measure_element(child, available);
        }
        Vec3::ZERO
    }

    pub(crate) fn arrange_canvas(
        &mut self,
        children: &[ElementId],
        final_size_without_margins: Vec3,
        is_collapsed: bool,
    ) -> Vec3 {
        for &child in children {
            let Some(placement) = self.canvas_placement(child, final_size_without_margins) else {
                continue;
            };
            let Some(node) = self.node(child) else { continue };

            let mut slot = node.desired_size_with_margins;
            for dim in 0..3 {
                let relative_size = placement.relative_size[dim];
                if !relative_size.is_nan() {
                    slot[dim] = if relative_size > 0.0 {
                        relative_size * final_size_without_margins[dim]
                    } else {
                        0.0
                    };
                }
            }
            self.arrange_element(child, slot, is_collapsed);

            let origin = placement.pin_position - placement.pin_origin * slot - final_size_without_margins / 2.0;
            self.set_arrange_matrix(child, Mat4::from_translation(origin));
        }
        final_size_without_margins
    }
}
