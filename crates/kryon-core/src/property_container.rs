// crates/kryon-core/src/property_container.rs

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use tracing::trace;

use crate::{
    AccessorRegistry, AnyPropertyKey, Invalidation, KeyId, KryonError, Owner, PropertyKey,
    PropertyValue, Result,
};

struct StoredProperty {
    key: Arc<dyn AnyPropertyKey>,
    value: Box<dyn Any>,
}

/// Change notification delivered to container-level handlers.
pub struct PropertyUpdate<'a> {
    pub key: &'a dyn AnyPropertyKey,
    pub new_value: &'a dyn Any,
    pub old_value: &'a dyn Any,
}

impl PropertyUpdate<'_> {
    pub fn is<T: PropertyValue>(&self, key: &PropertyKey<T>) -> bool {
        self.key.id() == key.id()
    }

    /// `(new, old)` when this update concerns `key`.
    pub fn values<T: PropertyValue>(&self, key: &PropertyKey<T>) -> Option<(&T, &T)> {
        if !self.is(key) {
            return None;
        }
        Some((
            self.new_value.downcast_ref::<T>()?,
            self.old_value.downcast_ref::<T>()?,
        ))
    }
}

/// Outcome of [`PropertyContainer::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Removal {
    pub removed: bool,
    pub invalidation: Invalidation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

type UpdatedHandler = Rc<dyn Fn(&mut PropertyContainer, &PropertyUpdate<'_>)>;

/// One row of [`PropertyContainer::entries`].
pub struct PropertyEntry {
    pub key: Arc<dyn AnyPropertyKey>,
    pub value: Box<dyn Any>,
}

impl PropertyEntry {
    pub fn value<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    pub fn formatted_value(&self) -> String {
        self.key.format_value(self.value.as_ref())
    }
}

impl fmt::Debug for PropertyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.key.name(), self.formatted_value())
    }
}

/// Per-object property store keyed by [`PropertyKey`].
///
/// The backing map is allocated on the first write. The owner is fixed at
/// construction and handed to invalidation callbacks.
pub struct PropertyContainer {
    owner: Owner,
    properties: Option<HashMap<KeyId, StoredProperty>>,
    handlers: Vec<(HandlerId, UpdatedHandler)>,
    next_handler_id: u64,
}

impl PropertyContainer {
    pub fn new(owner: Owner) -> Self {
        Self {
            owner,
            properties: None,
            handlers: Vec::new(),
            next_handler_id: 0,
        }
    }

    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    /// Number of explicitly stored values.
    pub fn len(&self) -> usize {
        self.properties.as_ref().map_or(0, HashMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_key<T: PropertyValue>(&self, key: &PropertyKey<T>) -> bool {
        self.properties
            .as_ref()
            .is_some_and(|properties| properties.contains_key(&key.id()))
    }

    /// Drops stored values without notifying.
    pub fn clear(&mut self) {
        if let Some(properties) = &mut self.properties {
            properties.clear();
        }
    }

    fn stored<T: PropertyValue>(&self, key: &PropertyKey<T>) -> Option<&T> {
        self.properties
            .as_ref()?
            .get(&key.id())?
            .value
            .downcast_ref::<T>()
    }

    fn store<T: PropertyValue>(&mut self, key: &PropertyKey<T>, value: T) {
        self.properties.get_or_insert_with(HashMap::new).insert(
            key.id(),
            StoredProperty {
                key: Arc::new(key.clone()),
                value: Box::new(value),
            },
        );
    }

    fn stored_or_default<T: PropertyValue>(&self, key: &PropertyKey<T>) -> T {
        match self.stored(key) {
            Some(value) => value.clone(),
            None => key.default_value(self),
        }
    }

    /// Reads a value: accessor, stored value, then default metadata.
    ///
    /// A default marked as kept is written into the container on first read.
    pub fn get<T: PropertyValue>(&mut self, key: &PropertyKey<T>) -> T {
        if let Some(accessor) = key.accessor() {
            return (accessor.get)(self);
        }
        if let Some(value) = self.stored(key) {
            return value.clone();
        }

        let value = key.default_value(self);
        if key.keeps_default() {
            self.set(key, value.clone());
        }
        value
    }

    /// Same lookup as [`get`](Self::get) without materializing kept defaults.
    pub fn peek<T: PropertyValue>(&self, key: &PropertyKey<T>) -> T {
        match key.accessor() {
            Some(accessor) => (accessor.get)(self),
            None => self.stored_or_default(key),
        }
    }

    /// Only explicitly stored values.
    pub fn try_get<T: PropertyValue>(&self, key: &PropertyKey<T>) -> Option<T> {
        self.stored(key).cloned()
    }

    /// Like [`get`](Self::get) but fails when the key resolves to `None`.
    pub fn get_safe<U>(&mut self, key: &PropertyKey<Option<U>>) -> Result<U>
    where
        Option<U>: PropertyValue,
    {
        self.get(key).ok_or_else(|| {
            KryonError::InvalidArgument(format!(
                "no value found for property '{}' of {}",
                key.name(),
                key.owner_type().name
            ))
        })
    }

    /// Validates and stores `value`, returning the layout work the key requests.
    ///
    /// Handlers and the key's update callback run only when the value changed.
    /// The invalidation callback always runs and receives the previous value.
    pub fn set<T: PropertyValue>(&mut self, key: &PropertyKey<T>, mut value: T) -> Invalidation {
        key.validate(&mut value);

        if let Some(accessor) = key.accessor() {
            (accessor.set)(self, value);
            return Invalidation::empty();
        }

        let old_value = self.stored_or_default(key);
        self.store(key, value.clone());

        if !key.values_equal(&value, &old_value) {
            trace!("property '{}' changed to {:?}", key.name(), value);
            self.raise_updated(key, &value, &old_value);
            if let Some(callback) = key.update_callback() {
                callback(self, key, &value, &old_value);
            }
        }

        key.invalidate(&self.owner, &old_value)
    }

    /// Like [`set`](Self::set), but the key must not be stored yet.
    pub fn add<T: PropertyValue>(&mut self, key: &PropertyKey<T>, value: T) -> Result<Invalidation> {
        if self.contains_key(key) {
            return Err(KryonError::InvalidOperation(format!(
                "property '{}' is already present",
                key.name()
            )));
        }
        Ok(self.set(key, value))
    }

    /// Removes a stored value. The invalidation callback runs even when nothing was stored.
    pub fn remove<T: PropertyValue>(&mut self, key: &PropertyKey<T>) -> Removal {
        let old_value = self.stored_or_default(key);
        let removed = self
            .properties
            .as_mut()
            .and_then(|properties| properties.remove(&key.id()))
            .is_some();

        if removed {
            let new_value = key.default_value(self);
            if !key.values_equal(&new_value, &old_value) {
                trace!("property '{}' removed", key.name());
                if let Some(callback) = key.update_callback() {
                    callback(self, key, &new_value, &old_value);
                }
                self.raise_updated(key, &new_value, &old_value);
            }
        }

        Removal {
            removed,
            invalidation: key.invalidate(&self.owner, &old_value),
        }
    }

    /// Applies every stored value to `destination` through its `set`.
    pub fn copy_to(&self, destination: &mut PropertyContainer) {
        for entry in self.stored_entries() {
            entry.key.set_boxed(destination, entry.value);
        }
    }

    pub fn on_property_updated<F>(&mut self, handler: F) -> HandlerId
    where
        F: Fn(&mut PropertyContainer, &PropertyUpdate<'_>) + 'static,
    {
        let id = HandlerId(self.next_handler_id);
        self.next_handler_id += 1;
        self.handlers.push((id, Rc::new(handler)));
        id
    }

    pub fn remove_handler(&mut self, id: HandlerId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(handler_id, _)| *handler_id != id);
        self.handlers.len() != before
    }

    fn raise_updated<T: PropertyValue>(&mut self, key: &PropertyKey<T>, new_value: &T, old_value: &T) {
        if self.handlers.is_empty() {
            return;
        }
        // Snapshot so handlers may register, remove, or set re-entrantly.
        let handlers: Vec<UpdatedHandler> =
            self.handlers.iter().map(|(_, handler)| handler.clone()).collect();
        let update = PropertyUpdate {
            key,
            new_value,
            old_value,
        };
        for handler in handlers {
            handler(self, &update);
        }
    }

    fn stored_entries(&self) -> Vec<PropertyEntry> {
        let mut entries: Vec<PropertyEntry> = self
            .properties
            .iter()
            .flat_map(HashMap::values)
            .filter_map(|stored| {
                let value = stored.key.clone_value(stored.value.as_ref())?;
                Some(PropertyEntry {
                    key: stored.key.clone(),
                    value,
                })
            })
            .collect();
        entries.sort_by_key(|entry| entry.key.id());
        entries
    }

    /// Stored values in key creation order, then the accessor properties
    /// registered for the owner type and its bases, most derived first.
    pub fn entries(&self, registry: &AccessorRegistry) -> Vec<PropertyEntry> {
        let mut entries = self.stored_entries();
        for key in registry.accessors_for(self.owner.owner_type) {
            let value = key.read(self);
            entries.push(PropertyEntry { key, value });
        }
        entries
    }
}

impl fmt::Debug for PropertyContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyContainer")
            .field("owner", &self.owner)
            .field("entries", &self.stored_entries())
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
