// crates/kryon-layout/src/tree.rs

use std::collections::HashMap;
use std::mem;
use std::ops::Index;

use kryon_core::{Invalidation, KryonError, PropertyKey, PropertyValue, Result};
use tracing::trace;

use crate::{ElementFlags, ElementId, ElementKind, UiElement};

/// Arena owning every element of a user interface.
///
/// Elements refer to each other by id. The logical parent owns a child for
/// bookkeeping; the visual parent is the one that measures, arranges and
/// draws it. They usually agree, except for virtualized stack panels.
#[derive(Debug, Default)]
pub struct UiTree {
    elements: HashMap<ElementId, UiElement>,
    next_id: ElementId,
}

impl UiTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_element(&mut self, kind: ElementKind) -> ElementId {
        let id = self.next_id;
        self.next_id += 1;
        self.elements.insert(id, UiElement::new(id, kind));
        trace!("added element {}", id);
        id
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.contains_key(&id)
    }

    pub fn element(&self, id: ElementId) -> Result<&UiElement> {
        self.elements.get(&id).ok_or(KryonError::ElementNotFound(id))
    }

    pub(crate) fn node(&self, id: ElementId) -> Option<&UiElement> {
        self.elements.get(&id)
    }

    pub(crate) fn node_mut(&mut self, id: ElementId) -> Option<&mut UiElement> {
        self.elements.get_mut(&id)
    }

    pub(crate) fn element_mut(&mut self, id: ElementId) -> Result<&mut UiElement> {
        self.elements.get_mut(&id).ok_or(KryonError::ElementNotFound(id))
    }

    /// Detaches the kind of `id` while `f` runs, so overrides can walk the
    /// rest of the tree mutably.
    pub(crate) fn with_kind<R>(
        &mut self,
        id: ElementId,
        f: impl FnOnce(&mut UiTree, &mut ElementKind) -> R,
    ) -> Option<R> {
        let mut kind = mem::take(&mut self.node_mut(id)?.kind);
        let result = f(self, &mut kind);
        if let Some(node) = self.node_mut(id) {
            node.kind = kind;
        }
        Some(result)
    }

    pub(crate) fn set_parent(&mut self, child: ElementId, parent: Option<ElementId>) -> Result<()> {
        let node = self.element_mut(child)?;
        if let (Some(new_parent), Some(current)) = (parent, node.parent) {
            if new_parent != current {
                return Err(KryonError::InvalidOperation(format!(
                    "element {} already has logical parent {}",
                    child, current
                )));
            }
        }
        node.parent = parent;
        Ok(())
    }

    pub(crate) fn set_visual_parent(
        &mut self,
        child: ElementId,
        parent: Option<ElementId>,
    ) -> Result<()> {
        let node = self.element_mut(child)?;
        let previous = node.visual_parent;
        if let (Some(new_parent), Some(current)) = (parent, previous) {
            if new_parent != current {
                return Err(KryonError::InvalidOperation(format!(
                    "element {} already has visual parent {}",
                    child, current
                )));
            }
        }
        node.visual_parent = parent;

        if let Some(old) = previous.and_then(|old| self.node_mut(old)) {
            old.visual_children.retain(|id| *id != child);
        }
        if let Some(new) = parent.and_then(|new| self.node_mut(new)) {
            new.visual_children.push(child);
        }
        Ok(())
    }

    /// Detaches every visual child of `id`; logical links are kept.
    pub(crate) fn clear_visual_children(&mut self, id: ElementId) {
        let Some(node) = self.node_mut(id) else { return };
        for child in mem::take(&mut node.visual_children) {
            if let Some(child) = self.node_mut(child) {
                child.visual_parent = None;
            }
        }
    }

    /// Depth first search of `root` and its visual descendants.
    pub fn find_name(&self, root: ElementId, name: &str) -> Option<ElementId> {
        let node = self.node(root)?;
        if node.name() == Some(name) {
            return Some(root);
        }
        node.visual_children
            .iter()
            .find_map(|child| self.find_name(*child, name))
    }

    /// Forces the next measure and arrange of `id` and its visual ancestors.
    pub fn invalidate_measure(&mut self, id: ElementId) {
        self.force_measure(id);
        self.propagate_measure_invalidation_to_children(id);
    }

    /// Forces the next arrange of `id` and its visual ancestors.
    pub fn invalidate_arrange(&mut self, id: ElementId) {
        self.force_arrange(id);
        self.propagate_arrange_invalidation_to_children(id);
    }

    fn force_measure(&mut self, id: ElementId) {
        let forced = ElementFlags::FORCE_MEASURE | ElementFlags::FORCE_ARRANGE;
        let mut current = Some(id);
        while let Some(node) = current.and_then(|id| self.node_mut(id)) {
            if node.flags.contains(forced) {
                return;
            }
            node.flags.insert(forced);
            node.flags.remove(ElementFlags::MEASURE_VALID | ElementFlags::ARRANGE_VALID);
            current = node.visual_parent;
        }
    }

    fn force_arrange(&mut self, id: ElementId) {
        let mut current = Some(id);
        while let Some(node) = current.and_then(|id| self.node_mut(id)) {
            if node.flags.contains(ElementFlags::FORCE_ARRANGE) {
                return;
            }
            node.flags.insert(ElementFlags::FORCE_ARRANGE);
            node.flags.remove(ElementFlags::ARRANGE_VALID);
            current = node.visual_parent;
        }
    }

    fn propagate_measure_invalidation_to_children(&mut self, id: ElementId) {
        let mut pending = self.visual_children_of(id);
        while let Some(child) = pending.pop() {
            let Some(node) = self.node_mut(child) else { continue };
            if node.flags.contains(ElementFlags::MEASURE_VALID) {
                node.flags.remove(ElementFlags::MEASURE_VALID | ElementFlags::ARRANGE_VALID);
                pending.extend(node.visual_children.iter().copied());
            }
        }
    }

    fn propagate_arrange_invalidation_to_children(&mut self, id: ElementId) {
        let mut pending = self.visual_children_of(id);
        while let Some(child) = pending.pop() {
            let Some(node) = self.node_mut(child) else { continue };
            if node.flags.contains(ElementFlags::ARRANGE_VALID) {
                node.flags.remove(ElementFlags::ARRANGE_VALID);
                pending.extend(node.visual_children.iter().copied());
            }
        }
    }

    /// Marks the visual subtree below `id` measured, after a skipped measure.
    pub(crate) fn validate_children_measure(&mut self, id: ElementId) {
        let mut pending = self.visual_children_of(id);
        while let Some(child) = pending.pop() {
            let Some(node) = self.node_mut(child) else { continue };
            if !node.flags.contains(ElementFlags::MEASURE_VALID) {
                node.flags.insert(ElementFlags::MEASURE_VALID);
                pending.extend(node.visual_children.iter().copied());
            }
        }
    }

    pub(crate) fn validate_children_arrange(&mut self, id: ElementId) {
        let mut pending = self.visual_children_of(id);
        while let Some(child) = pending.pop() {
            let Some(node) = self.node_mut(child) else { continue };
            if !node.flags.contains(ElementFlags::ARRANGE_VALID) {
                node.flags.insert(ElementFlags::ARRANGE_VALID);
                pending.extend(node.visual_children.iter().copied());
            }
        }
    }

    pub(crate) fn visual_children_of(&self, id: ElementId) -> Vec<ElementId> {
        self.node(id)
            .map(|node| node.visual_children.clone())
            .unwrap_or_default()
    }

    /// Sets a dependency property of `id` and performs the layout work the
    /// key requests.
    pub fn set_property<T: PropertyValue>(
        &mut self,
        id: ElementId,
        key: &PropertyKey<T>,
        value: T,
    ) -> Result<()> {
        let invalidation = self.element_mut(id)?.dependency_properties.set(key, value);
        self.apply_invalidation(id, key.owner_type(), invalidation);
        Ok(())
    }

    pub fn get_property<T: PropertyValue>(&self, id: ElementId, key: &PropertyKey<T>) -> Result<T> {
        Ok(self.element(id)?.dependency_properties.peek(key))
    }

    /// Removes a stored dependency property. `false` when nothing was stored.
    pub fn remove_property<T: PropertyValue>(
        &mut self,
        id: ElementId,
        key: &PropertyKey<T>,
    ) -> Result<bool> {
        let removal = self.element_mut(id)?.dependency_properties.remove(key);
        self.apply_invalidation(id, key.owner_type(), removal.invalidation);
        Ok(removal.removed)
    }

    pub(crate) fn apply_invalidation(
        &mut self,
        id: ElementId,
        key_owner: &'static kryon_core::OwnerType,
        invalidation: Invalidation,
    ) {
        if invalidation.is_empty() {
            return;
        }
        if invalidation.contains(Invalidation::OWNER_MEASURE) {
            self.invalidate_measure(id);
        }
        if invalidation.contains(Invalidation::OWNER_ARRANGE) {
            self.invalidate_arrange(id);
        }
        if invalidation.contains(Invalidation::OWNER_ARRANGE_CHANGED) {
            if let Some(node) = self.node_mut(id) {
                node.flags.insert(ElementFlags::ARRANGE_CHANGED);
            }
        }

        // Attached properties only matter to a parent of the declaring type.
        let parent = self
            .node(id)
            .and_then(|node| node.parent)
            .filter(|parent| {
                self.node(*parent).is_some_and(|node| {
                    node.dependency_properties.owner().owner_type.is_a(key_owner)
                })
            });
        if let Some(parent) = parent {
            if invalidation.contains(Invalidation::PARENT_MEASURE) {
                self.invalidate_measure(parent);
            }
            if invalidation.contains(Invalidation::PARENT_ARRANGE) {
                self.invalidate_arrange(parent);
            }
        }

        if invalidation.contains(Invalidation::PARENT_CHILD_ORDER) {
            if let Some(visual_parent) = self.node(id).and_then(|node| node.visual_parent) {
                self.sort_visual_children(visual_parent);
            }
        }
    }
}

impl Index<ElementId> for UiTree {
    type Output = UiElement;

    fn index(&self, id: ElementId) -> &UiElement {
        &self.elements[&id]
    }
}
