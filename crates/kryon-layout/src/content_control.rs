// crates/kryon-layout/src/content_control.rs

use glam::{Mat4, Vec3};
use kryon_core::{KryonError, OwnerType, Result};
use tracing::debug;

use crate::{ElementId, ElementKind, Thickness, UiTree, UI_ELEMENT};

pub static CONTENT_CONTROL: OwnerType = OwnerType::new("ContentControl", Some(&UI_ELEMENT));

/// An element hosting at most one child inside a padding.
#[derive(Debug, Clone, Default)]
pub struct ContentControlState {
    pub(crate) content: Option<ElementId>,
    pub(crate) padding: Thickness,
    pub(crate) content_arrange_matrix: Mat4,
}

impl ContentControlState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(&self) -> Option<ElementId> {
        self.content
    }

    pub fn padding(&self) -> Thickness {
        self.padding
    }

    pub fn content_arrange_matrix(&self) -> Mat4 {
        self.content_arrange_matrix
    }
}

impl ElementKind {
    pub fn content_control() -> Self {
        ElementKind::Content(ContentControlState::new())
    }
}

impl UiTree {
    fn content_state_mut(&mut self, id: ElementId) -> Result<&mut ContentControlState> {
        self.element_mut(id)?
            .kind
            .as_content_mut()
            .ok_or(KryonError::KindMismatch { id, expected: "ContentControl" })
    }

    pub fn content(&self, id: ElementId) -> Result<Option<ElementId>> {
        self.element(id)?
            .kind
            .as_content()
            .map(ContentControlState::content)
            .ok_or(KryonError::KindMismatch { id, expected: "ContentControl" })
    }

    /// Replaces the content of `id`. The new content must not belong to
    /// another element.
    pub fn set_content(&mut self, id: ElementId, content: Option<ElementId>) -> Result<()> {
        let previous = self.content(id)?;
        if previous == content {
            return Ok(());
        }
        if let Some(new) = content {
            if new == id {
                return Err(KryonError::InvalidOperation(format!(
                    "element {} cannot be its own content",
                    id
                )));
            }
            if let Some(parent) = self.element(new)?.parent {
                return Err(KryonError::InvalidOperation(format!(
                    "element {} already has logical parent {}",
                    new, parent
                )));
            }
        }

        if let Some(old) = previous {
            self.set_visual_parent(old, None)?;
            self.set_parent(old, None)?;
        }
        self.content_state_mut(id)?.content = content;
        if let Some(new) = content {
            self.set_parent(new, Some(id))?;
            self.set_visual_parent(new, Some(id))?;
        }

        self.invalidate_measure(id);
        debug!("content of element {} set to {:?}", id, content);
        Ok(())
    }

    pub fn padding(&self, id: ElementId) -> Result<Thickness> {
        self.element(id)?
            .kind
            .as_content()
            .map(ContentControlState::padding)
            .ok_or(KryonError::KindMismatch { id, expected: "ContentControl" })
    }

    pub fn set_padding(&mut self, id: ElementId, padding: Thickness) -> Result<()> {
        self.content_state_mut(id)?.padding = padding;
        self.invalidate_measure(id);
        Ok(())
    }

    pub(crate) fn measure_content(
        &mut self,
        content: &mut ContentControlState,
        available_size_without_margins: Vec3,
    ) -> Vec3 {
        let mut desired = Vec3::ZERO;
        if let Some(child) = content.content {
            self.measure_element(child, content.padding.shrink(available_size_without_margins));
            if let Some(node) = self.node(child) {
                desired = node.desired_size_with_margins;
            }
        }
        content.padding.grow(desired)
    }

    pub(crate) fn arrange_content(
        &mut self,
        content: &mut ContentControlState,
        final_size_without_margins: Vec3,
        is_collapsed: bool,
    ) -> Vec3 {
        if let Some(child) = content.content {
            self.arrange_element(child, content.padding.shrink(final_size_without_margins), is_collapsed);
            let offsets = content.padding.leading() - final_size_without_margins / 2.0;
            content.content_arrange_matrix = Mat4::from_translation(offsets);
        }
        final_size_without_margins
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FixedSizeContent;

    #[test]
    fn test_padding_added_to_desired_size() {
        let mut tree = UiTree::new();
        let control = tree.add_element(ElementKind::content_control());
        let child = tree.add_element(ElementKind::leaf(FixedSizeContent(Vec3::new(10.0, 20.0, 30.0))));
        tree.set_content(control, Some(child)).unwrap();
        tree.set_padding(control, Thickness::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0)).unwrap();

        tree.measure(control, Vec3::splat(100.0)).unwrap();
        assert_eq!(tree[control].desired_size(), Vec3::new(15.0, 27.0, 39.0));

        tree.measure(control, Vec3::splat(4.0)).unwrap();
        assert_eq!(tree[child].desired_size(), Vec3::new(10.0, 20.0, 30.0));
    }

    #[test]
    fn test_empty_control_desires_padding() {
        let mut tree = UiTree::new();
        let control = tree.add_element(ElementKind::content_control());
        tree.set_padding(control, Thickness::uniform(2.0)).unwrap();
        tree.measure(control, Vec3::splat(100.0)).unwrap();
        assert_eq!(tree[control].desired_size(), Vec3::splat(4.0));
    }

    #[test]
    fn test_arrange_places_content_inside_padding() {
        let mut tree = UiTree::new();
        let control = tree.add_element(ElementKind::content_control());
        let child = tree.add_element(ElementKind::Empty);
        tree.set_content(control, Some(child)).unwrap();
        tree.set_padding(control, Thickness::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0)).unwrap();
        tree.set_size(control, Vec3::new(50.0, 60.0, 70.0)).unwrap();

        tree.measure(control, Vec3::splat(100.0)).unwrap();
        tree.arrange(control, Vec3::splat(100.0), false).unwrap();

        assert_eq!(tree[child].render_size(), Vec3::new(45.0, 53.0, 0.0));
        let state = tree[control].kind().as_content().unwrap();
        assert_eq!(
            state.content_arrange_matrix(),
            Mat4::from_translation(Vec3::new(-24.0, -28.0, -29.0))
        );
    }

    #[test]
    fn test_content_owned_elsewhere_rejected() {
        let mut tree = UiTree::new();
        let first = tree.add_element(ElementKind::content_control());
        let second = tree.add_element(ElementKind::content_control());
        let child = tree.add_element(ElementKind::Empty);

        tree.set_content(first, Some(child)).unwrap();
        tree.set_content(first, Some(child)).unwrap();
        assert!(matches!(
            tree.set_content(second, Some(child)),
            Err(KryonError::InvalidOperation(_))
        ));
        assert!(matches!(
            tree.set_content(first, Some(first)),
            Err(KryonError::InvalidOperation(_))
        ));
        assert!(matches!(
            tree.set_content(child, None),
            Err(KryonError::KindMismatch { .. })
        ));
    }

    #[test]
    fn test_replacing_content_releases_previous() {
        let mut tree = UiTree::new();
        let control = tree.add_element(ElementKind::content_control());
        let first = tree.add_element(ElementKind::Empty);
        let second = tree.add_element(ElementKind::Empty);

        tree.set_content(control, Some(first)).unwrap();
        tree.set_content(control, Some(second)).unwrap();
        assert_eq!(tree.content(control).unwrap(), Some(second));
        assert_eq!(tree[first].parent(), None);
        assert_eq!(tree[first].visual_parent(), None);
        assert_eq!(tree[control].visual_children(), &[second]);
    }
}
