// crates/kryon-layout/src/element.rs

use std::fmt;

use bitflags::bitflags;
use glam::{Mat4, Vec3};
use kryon_core::{Owner, OwnerType, PropertyContainer};

use crate::{
    ContentControlState, DepthAlignment, HorizontalAlignment, PanelState, SizeConstraints,
    Thickness, VerticalAlignment, Visibility,
};

pub type ElementId = u32;

pub static UI_ELEMENT: OwnerType = OwnerType::new("UIElement", None);

bitflags! {
    /// Layout pass bookkeeping of one element.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ElementFlags: u8 {
        /// Next measure runs even with an unchanged available size.
        const FORCE_MEASURE = 1 << 0;
        /// Next arrange runs even with an unchanged final size.
        const FORCE_ARRANGE = 1 << 1;
        const MEASURE_VALID = 1 << 2;
        const ARRANGE_VALID = 1 << 3;
        /// Arrange ran since the world matrix was last computed.
        const ARRANGE_CHANGED = 1 << 4;
        const LOCAL_MATRIX_CHANGED = 1 << 5;
    }
}

/// Measure/arrange hooks of a content element without children.
pub trait LeafLayout: fmt::Debug {
    /// Natural size of the content for the given space.
    fn measure_override(&mut self, _available_size_without_margins: Vec3) -> Vec3 {
        Vec3::ZERO
    }

    /// Size actually used out of the final space.
    fn arrange_override(&mut self, final_size_without_margins: Vec3) -> Vec3 {
        final_size_without_margins
    }

    /// Runs instead of the overrides while the element is collapsed.
    fn collapse_override(&mut self) {}
}

/// Content with a constant natural size, such as an image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedSizeContent(pub Vec3);

impl LeafLayout for FixedSizeContent {
    fn measure_override(&mut self, _available_size_without_margins: Vec3) -> Vec3 {
        self.0
    }
}

/// The layout behaviour of an element.
#[derive(Debug, Default)]
pub enum ElementKind {
    /// Plain element, desired size comes from its own size properties.
    #[default]
    Empty,
    Leaf(Box<dyn LeafLayout>),
    Content(ContentControlState),
    Panel(PanelState),
}

impl ElementKind {
    pub fn leaf<L: LeafLayout + 'static>(leaf: L) -> Self {
        ElementKind::Leaf(Box::new(leaf))
    }

    pub fn owner_type(&self) -> &'static OwnerType {
        match self {
            ElementKind::Empty | ElementKind::Leaf(_) => &UI_ELEMENT,
            ElementKind::Content(_) => &crate::CONTENT_CONTROL,
            ElementKind::Panel(panel) => panel.layout().owner_type(),
        }
    }

    pub fn as_panel(&self) -> Option<&PanelState> {
        match self {
            ElementKind::Panel(panel) => Some(panel),
            _ => None,
        }
    }

    pub(crate) fn as_panel_mut(&mut self) -> Option<&mut PanelState> {
        match self {
            ElementKind::Panel(panel) => Some(panel),
            _ => None,
        }
    }

    pub fn as_content(&self) -> Option<&ContentControlState> {
        match self {
            ElementKind::Content(content) => Some(content),
            _ => None,
        }
    }

    pub(crate) fn as_content_mut(&mut self) -> Option<&mut ContentControlState> {
        match self {
            ElementKind::Content(content) => Some(content),
            _ => None,
        }
    }
}

/// One node of a [`UiTree`](crate::UiTree).
///
/// Fields are only written through the tree so that every change raises
/// the matching invalidation.
#[derive(Debug)]
pub struct UiElement {
    pub(crate) id: ElementId,
    pub(crate) name: Option<String>,
    pub(crate) kind: ElementKind,
    pub(crate) parent: Option<ElementId>,
    pub(crate) visual_parent: Option<ElementId>,
    pub(crate) visual_children: Vec<ElementId>,
    pub(crate) dependency_properties: PropertyContainer,

    pub(crate) size: Vec3,
    pub(crate) minimum_size: Vec3,
    pub(crate) maximum_size: Vec3,
    pub(crate) default_size: Vec3,
    pub(crate) margin: Thickness,
    pub(crate) horizontal_alignment: HorizontalAlignment,
    pub(crate) vertical_alignment: VerticalAlignment,
    pub(crate) depth_alignment: DepthAlignment,
    pub(crate) visibility: Visibility,
    pub(crate) opacity: f32,
    pub(crate) is_enabled: bool,
    pub(crate) clip_to_bounds: bool,
    pub(crate) draw_layer_number: i32,
    pub(crate) local_matrix: Mat4,

    pub(crate) desired_size: Vec3,
    pub(crate) desired_size_with_margins: Vec3,
    pub(crate) render_size: Vec3,
    pub(crate) render_offsets: Vec3,
    pub(crate) world_matrix: Mat4,
    pub(crate) previous_measure_size: Vec3,
    pub(crate) previous_arrange_size: Vec3,
    pub(crate) previous_is_parent_collapsed: bool,
    pub(crate) flags: ElementFlags,

    pub(crate) render_opacity: f32,
    pub(crate) is_hierarchy_enabled: bool,
    pub(crate) depth_bias: i32,
    pub(crate) max_children_depth_bias: i32,
}

impl UiElement {
    pub(crate) fn new(id: ElementId, kind: ElementKind) -> Self {
        let owner = Owner::new(kind.owner_type(), u64::from(id));
        Self {
            id,
            name: None,
            kind,
            parent: None,
            visual_parent: None,
            visual_children: Vec::new(),
            dependency_properties: PropertyContainer::new(owner),
            size: Vec3::NAN,
            minimum_size: Vec3::ZERO,
            maximum_size: Vec3::INFINITY,
            default_size: Vec3::ZERO,
            margin: Thickness::default(),
            horizontal_alignment: HorizontalAlignment::default(),
            vertical_alignment: VerticalAlignment::default(),
            depth_alignment: DepthAlignment::default(),
            visibility: Visibility::Visible,
            opacity: 1.0,
            is_enabled: true,
            clip_to_bounds: false,
            draw_layer_number: 1,
            local_matrix: Mat4::IDENTITY,
            desired_size: Vec3::ZERO,
            desired_size_with_margins: Vec3::ZERO,
            render_size: Vec3::ZERO,
            render_offsets: Vec3::ZERO,
            world_matrix: Mat4::IDENTITY,
            previous_measure_size: Vec3::splat(-1.0),
            previous_arrange_size: Vec3::splat(-1.0),
            previous_is_parent_collapsed: false,
            flags: ElementFlags::FORCE_MEASURE | ElementFlags::FORCE_ARRANGE,
            render_opacity: 1.0,
            is_hierarchy_enabled: true,
            depth_bias: 0,
            max_children_depth_bias: 0,
        }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn kind(&self) -> &ElementKind {
        &self.kind
    }

    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    pub fn visual_parent(&self) -> Option<ElementId> {
        self.visual_parent
    }

    pub fn visual_children(&self) -> &[ElementId] {
        &self.visual_children
    }

    pub fn dependency_properties(&self) -> &PropertyContainer {
        &self.dependency_properties
    }

    /// Explicit size; NaN components are unset.
    pub fn size(&self) -> Vec3 {
        self.size
    }

    pub fn minimum_size(&self) -> Vec3 {
        self.minimum_size
    }

    pub fn maximum_size(&self) -> Vec3 {
        self.maximum_size
    }

    pub fn default_size(&self) -> Vec3 {
        self.default_size
    }

    pub fn constraints(&self) -> SizeConstraints {
        SizeConstraints::new(self.minimum_size, self.maximum_size)
    }

    pub fn margin(&self) -> Thickness {
        self.margin
    }

    pub fn horizontal_alignment(&self) -> HorizontalAlignment {
        self.horizontal_alignment
    }

    pub fn vertical_alignment(&self) -> VerticalAlignment {
        self.vertical_alignment
    }

    pub fn depth_alignment(&self) -> DepthAlignment {
        self.depth_alignment
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn is_collapsed(&self) -> bool {
        self.visibility == Visibility::Collapsed
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn is_enabled(&self) -> bool {
        self.is_enabled
    }

    pub fn clip_to_bounds(&self) -> bool {
        self.clip_to_bounds
    }

    pub fn draw_layer_number(&self) -> i32 {
        self.draw_layer_number
    }

    pub fn local_matrix(&self) -> Mat4 {
        self.local_matrix
    }

    pub fn desired_size(&self) -> Vec3 {
        self.desired_size
    }

    pub fn desired_size_with_margins(&self) -> Vec3 {
        self.desired_size_with_margins
    }

    pub fn render_size(&self) -> Vec3 {
        self.render_size
    }

    pub fn render_offsets(&self) -> Vec3 {
        self.render_offsets
    }

    pub fn world_matrix(&self) -> Mat4 {
        self.world_matrix
    }

    pub fn flags(&self) -> ElementFlags {
        self.flags
    }

    pub fn is_measure_valid(&self) -> bool {
        self.flags.contains(ElementFlags::MEASURE_VALID)
    }

    pub fn is_arrange_valid(&self) -> bool {
        self.flags.contains(ElementFlags::ARRANGE_VALID)
    }

    /// Opacity multiplied down the visual hierarchy.
    pub fn render_opacity(&self) -> f32 {
        self.render_opacity
    }

    pub fn is_hierarchy_enabled(&self) -> bool {
        self.is_hierarchy_enabled
    }

    pub fn depth_bias(&self) -> i32 {
        self.depth_bias
    }

    pub fn max_children_depth_bias(&self) -> i32 {
        self.max_children_depth_bias
    }
}
