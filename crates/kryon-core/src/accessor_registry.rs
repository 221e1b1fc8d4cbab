// crates/kryon-core/src/accessor_registry.rs

use std::ptr;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::{AnyPropertyKey, KryonError, OwnerType, PropertyKey, PropertyValue, Result};

/// Side table of computed ("accessor") properties per owner type.
///
/// Append only. Shared between threads behind a single mutex.
#[derive(Default)]
pub struct AccessorRegistry {
    entries: Mutex<Vec<(&'static OwnerType, Vec<Arc<dyn AnyPropertyKey>>)>>,
}

impl AccessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_accessor_property<T: PropertyValue>(
        &self,
        owner_type: &'static OwnerType,
        key: &PropertyKey<T>,
    ) -> Result<()> {
        if !key.has_accessor() {
            return Err(KryonError::InvalidArgument(format!(
                "property '{}' has no accessor metadata",
                key.name()
            )));
        }

        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let erased: Arc<dyn AnyPropertyKey> = Arc::new(key.clone());
        match entries.iter_mut().find(|(registered, _)| ptr::eq(*registered, owner_type)) {
            Some((_, keys)) => keys.push(erased),
            None => entries.push((owner_type, vec![erased])),
        }
        debug!("registered accessor property '{}' on {}", key.name(), owner_type.name);
        Ok(())
    }

    /// Keys registered for `owner_type` and its bases, most derived first.
    pub fn accessors_for(&self, owner_type: &'static OwnerType) -> Vec<Arc<dyn AnyPropertyKey>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let mut keys = Vec::new();
        for ancestor in owner_type.ancestry() {
            if let Some((_, registered)) = entries
                .iter()
                .find(|(registered, _)| ptr::eq(*registered, ancestor))
            {
                keys.extend(registered.iter().cloned());
            }
        }
        keys
    }
}

impl std::fmt::Debug for AccessorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_map()
            .entries(entries.iter().map(|(owner_type, keys)| (owner_type.name, keys.len())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Owner, PropertyContainer};
    use glam::Vec3;
    use std::sync::LazyLock;

    static ENTITY: OwnerType = OwnerType::new("Entity", None);
    static CAMERA: OwnerType = OwnerType::new("Camera", Some(&ENTITY));

    static POSITION: LazyLock<PropertyKey<Vec3>> =
        LazyLock::new(|| PropertyKey::builder("Position", &ENTITY).build());

    static HEIGHT: LazyLock<PropertyKey<f32>> = LazyLock::new(|| {
        PropertyKey::builder("Height", &ENTITY)
            .accessor(
                |container| container.peek(&POSITION).y,
                |container, height| {
                    let mut position = container.get(&POSITION);
                    position.y = height;
                    container.set(&POSITION, position);
                },
            )
            .build()
    });

    static FOCAL: LazyLock<PropertyKey<f32>> = LazyLock::new(|| {
        PropertyKey::builder("Focal", &CAMERA)
            .accessor(|_| 35.0, |_, _| {})
            .build()
    });

    #[test]
    fn test_requires_accessor_metadata() {
        let registry = AccessorRegistry::new();
        assert!(matches!(
            registry.add_accessor_property(&ENTITY, &POSITION),
            Err(KryonError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_accessor_routes_reads_and_writes() {
        let mut container = PropertyContainer::new(Owner::new(&ENTITY, 1));
        container.set(&HEIGHT, 12.0);
        assert_eq!(container.get(&POSITION), Vec3::new(0.0, 12.0, 0.0));
        assert_eq!(container.get(&HEIGHT), 12.0);
        assert!(!container.contains_key(&HEIGHT));
    }

    #[test]
    fn test_entries_walk_type_chain() {
        let registry = AccessorRegistry::new();
        registry.add_accessor_property(&ENTITY, &HEIGHT).unwrap();
        registry.add_accessor_property(&CAMERA, &FOCAL).unwrap();

        let mut container = PropertyContainer::new(Owner::new(&CAMERA, 2));
        container.set(&POSITION, Vec3::new(1.0, 2.0, 3.0));

        let entries = container.entries(&registry);
        let names: Vec<_> = entries.iter().map(|entry| entry.key.name()).collect();
        assert_eq!(names, vec!["Position", "Focal", "Height"]);
        assert_eq!(entries[1].value::<f32>(), Some(&35.0));
        assert_eq!(entries[2].value::<f32>(), Some(&2.0));

        let base_only = PropertyContainer::new(Owner::new(&ENTITY, 3));
        assert_eq!(base_only.entries(&registry).len(), 1);
    }
}
