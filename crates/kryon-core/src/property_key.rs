// crates/kryon-core/src/property_key.rs

use std::any::{type_name, Any};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ptr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::warn;

use crate::{Invalidation, PropertyContainer};

/// Static descriptor of a property-owning type and its base type.
#[derive(Debug)]
pub struct OwnerType {
    pub name: &'static str,
    pub base: Option<&'static OwnerType>,
}

impl OwnerType {
    pub const fn new(name: &'static str, base: Option<&'static OwnerType>) -> Self {
        Self { name, base }
    }

    /// True when `other` is this type or one of its bases.
    pub fn is_a(&self, other: &OwnerType) -> bool {
        let mut current = Some(self);
        while let Some(owner_type) = current {
            if ptr::eq(owner_type, other) {
                return true;
            }
            current = owner_type.base;
        }
        false
    }

    /// This type followed by its bases, most derived first.
    pub fn ancestry(&'static self) -> impl Iterator<Item = &'static OwnerType> {
        std::iter::successors(Some(self), |owner_type| owner_type.base)
    }
}

/// Back-reference from a container to the object embedding it.
#[derive(Debug, Clone, Copy)]
pub struct Owner {
    pub owner_type: &'static OwnerType,
    pub id: u64,
}

impl Owner {
    pub fn new(owner_type: &'static OwnerType, id: u64) -> Self {
        Self { owner_type, id }
    }
}

static NEXT_KEY_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique key identity, increasing in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyId(u64);

impl KeyId {
    fn next() -> Self {
        KeyId(NEXT_KEY_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// Bound satisfied by every type storable in a [`PropertyContainer`].
pub trait PropertyValue: Any + Clone + Default + fmt::Debug + Send + Sync {}

impl<T> PropertyValue for T where T: Any + Clone + Default + fmt::Debug + Send + Sync {}

pub type DefaultValueFn<T> = dyn Fn(&PropertyContainer) -> T + Send + Sync;
pub type ValidateFn<T> = dyn Fn(&mut T) + Send + Sync;
pub type InvalidateFn<T> = dyn Fn(&Owner, &PropertyKey<T>, &T) -> Invalidation + Send + Sync;
pub type UpdateCallbackFn<T> = dyn Fn(&mut PropertyContainer, &PropertyKey<T>, &T, &T) + Send + Sync;
pub type GetterFn<T> = dyn Fn(&PropertyContainer) -> T + Send + Sync;
pub type SetterFn<T> = dyn Fn(&mut PropertyContainer, T) + Send + Sync;

pub enum DefaultValue<T> {
    Static(T),
    Delegate(Box<DefaultValueFn<T>>),
}

pub(crate) struct Accessor<T> {
    pub(crate) get: Box<GetterFn<T>>,
    pub(crate) set: Box<SetterFn<T>>,
}

struct KeyInner<T> {
    id: KeyId,
    name: &'static str,
    owner_type: &'static OwnerType,
    equals: fn(&T, &T) -> bool,
    default_value: Option<DefaultValue<T>>,
    keep_default: bool,
    validator: Option<Box<ValidateFn<T>>>,
    invalidation: Option<Box<InvalidateFn<T>>>,
    on_updated: Option<Box<UpdateCallbackFn<T>>>,
    accessor: Option<Accessor<T>>,
}

/// Typed descriptor of a slot in a [`PropertyContainer`].
///
/// Keys compare by identity: two keys with the same name are still distinct.
/// Cloning shares the descriptor.
pub struct PropertyKey<T> {
    inner: Arc<KeyInner<T>>,
}

fn value_equals<T: PartialEq>(a: &T, b: &T) -> bool {
    a == b
}

fn identity_equals<U: ?Sized>(a: &Option<Arc<U>>, b: &Option<Arc<U>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

impl<T: PropertyValue + PartialEq> PropertyKey<T> {
    /// Starts a key whose change detection uses value equality.
    pub fn builder(name: &'static str, owner_type: &'static OwnerType) -> PropertyKeyBuilder<T> {
        PropertyKeyBuilder::new(name, owner_type, value_equals::<T>)
    }
}

impl<U> PropertyKey<Option<Arc<U>>>
where
    U: ?Sized + fmt::Debug + Send + Sync + 'static,
{
    /// Starts a key over a shared handle; change detection uses pointer identity.
    pub fn shared_builder(
        name: &'static str,
        owner_type: &'static OwnerType,
    ) -> PropertyKeyBuilder<Option<Arc<U>>> {
        PropertyKeyBuilder::new(name, owner_type, identity_equals::<U>)
    }
}

impl<T: PropertyValue> PropertyKey<T> {
    pub fn id(&self) -> KeyId {
        self.inner.id
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    pub fn owner_type(&self) -> &'static OwnerType {
        self.inner.owner_type
    }

    pub fn has_accessor(&self) -> bool {
        self.inner.accessor.is_some()
    }

    pub fn keeps_default(&self) -> bool {
        self.inner.keep_default
    }

    pub fn values_equal(&self, a: &T, b: &T) -> bool {
        (self.inner.equals)(a, b)
    }

    /// Default-value metadata, falling back to `T::default()`.
    pub fn default_value(&self, container: &PropertyContainer) -> T {
        match &self.inner.default_value {
            Some(DefaultValue::Static(value)) => value.clone(),
            Some(DefaultValue::Delegate(provider)) => provider(container),
            None => T::default(),
        }
    }

    pub(crate) fn validate(&self, value: &mut T) {
        if let Some(validator) = &self.inner.validator {
            validator(value);
        }
    }

    pub(crate) fn invalidate(&self, owner: &Owner, old_value: &T) -> Invalidation {
        match &self.inner.invalidation {
            Some(invalidation) => invalidation(owner, self, old_value),
            None => Invalidation::empty(),
        }
    }

    pub(crate) fn update_callback(&self) -> Option<&UpdateCallbackFn<T>> {
        self.inner.on_updated.as_deref()
    }

    pub(crate) fn accessor(&self) -> Option<&Accessor<T>> {
        self.inner.accessor.as_ref()
    }
}

impl<T> Clone for PropertyKey<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> PartialEq for PropertyKey<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl<T> Eq for PropertyKey<T> {}

impl<T> Hash for PropertyKey<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl<T> fmt::Debug for PropertyKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyKey")
            .field("name", &self.inner.name)
            .field("owner", &self.inner.owner_type.name)
            .field("id", &self.inner.id.0)
            .finish()
    }
}

pub struct PropertyKeyBuilder<T> {
    name: &'static str,
    owner_type: &'static OwnerType,
    equals: fn(&T, &T) -> bool,
    default_value: Option<DefaultValue<T>>,
    keep_default: bool,
    validator: Option<Box<ValidateFn<T>>>,
    invalidation: Option<Box<InvalidateFn<T>>>,
    on_updated: Option<Box<UpdateCallbackFn<T>>>,
    accessor: Option<Accessor<T>>,
}

impl<T: PropertyValue> PropertyKeyBuilder<T> {
    fn new(name: &'static str, owner_type: &'static OwnerType, equals: fn(&T, &T) -> bool) -> Self {
        Self {
            name,
            owner_type,
            equals,
            default_value: None,
            keep_default: false,
            validator: None,
            invalidation: None,
            on_updated: None,
            accessor: None,
        }
    }

    pub fn default_value(mut self, value: T) -> Self {
        self.default_value = Some(DefaultValue::Static(value));
        self
    }

    /// Computes the default from the container on each miss.
    pub fn default_value_with<F>(mut self, provider: F) -> Self
    where
        F: Fn(&PropertyContainer) -> T + Send + Sync + 'static,
    {
        self.default_value = Some(DefaultValue::Delegate(Box::new(provider)));
        self
    }

    /// Stores the default into the container the first time it is read.
    pub fn keep_default(mut self, keep: bool) -> Self {
        self.keep_default = keep;
        self
    }

    pub fn validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        self.validator = Some(Box::new(validator));
        self
    }

    pub fn invalidation<F>(mut self, invalidation: F) -> Self
    where
        F: Fn(&Owner, &PropertyKey<T>, &T) -> Invalidation + Send + Sync + 'static,
    {
        self.invalidation = Some(Box::new(invalidation));
        self
    }

    /// Shorthand for an invalidation callback returning fixed flags.
    pub fn invalidates(self, flags: Invalidation) -> Self {
        self.invalidation(move |_, _, _| flags)
    }

    pub fn on_updated<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut PropertyContainer, &PropertyKey<T>, &T, &T) + Send + Sync + 'static,
    {
        self.on_updated = Some(Box::new(callback));
        self
    }

    /// Routes reads and writes through code instead of container storage.
    pub fn accessor<G, S>(mut self, get: G, set: S) -> Self
    where
        G: Fn(&PropertyContainer) -> T + Send + Sync + 'static,
        S: Fn(&mut PropertyContainer, T) + Send + Sync + 'static,
    {
        self.accessor = Some(Accessor {
            get: Box::new(get),
            set: Box::new(set),
        });
        self
    }

    pub fn build(self) -> PropertyKey<T> {
        PropertyKey {
            inner: Arc::new(KeyInner {
                id: KeyId::next(),
                name: self.name,
                owner_type: self.owner_type,
                equals: self.equals,
                default_value: self.default_value,
                keep_default: self.keep_default,
                validator: self.validator,
                invalidation: self.invalidation,
                on_updated: self.on_updated,
                accessor: self.accessor,
            }),
        }
    }
}

/// Type-erased view of a [`PropertyKey`].
pub trait AnyPropertyKey: Send + Sync + fmt::Debug {
    fn id(&self) -> KeyId;
    fn name(&self) -> &'static str;
    fn owner_type(&self) -> &'static OwnerType;
    fn value_type_name(&self) -> &'static str;
    fn has_accessor(&self) -> bool;
    /// Current value as seen by `PropertyContainer::peek`.
    fn read(&self, container: &PropertyContainer) -> Box<dyn Any>;
    fn clone_value(&self, value: &dyn Any) -> Option<Box<dyn Any>>;
    fn set_boxed(&self, container: &mut PropertyContainer, value: Box<dyn Any>) -> Invalidation;
    fn format_value(&self, value: &dyn Any) -> String;
}

impl<T: PropertyValue> AnyPropertyKey for PropertyKey<T> {
    fn id(&self) -> KeyId {
        self.inner.id
    }

    fn name(&self) -> &'static str {
        self.inner.name
    }

    fn owner_type(&self) -> &'static OwnerType {
        self.inner.owner_type
    }

    fn value_type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn has_accessor(&self) -> bool {
        self.inner.accessor.is_some()
    }

    fn read(&self, container: &PropertyContainer) -> Box<dyn Any> {
        Box::new(container.peek(self))
    }

    fn clone_value(&self, value: &dyn Any) -> Option<Box<dyn Any>> {
        value
            .downcast_ref::<T>()
            .map(|value| Box::new(value.clone()) as Box<dyn Any>)
    }

    fn set_boxed(&self, container: &mut PropertyContainer, value: Box<dyn Any>) -> Invalidation {
        match value.downcast::<T>() {
            Ok(value) => container.set(self, *value),
            Err(_) => {
                warn!(
                    "value for property '{}' is not a {}",
                    self.inner.name,
                    type_name::<T>()
                );
                Invalidation::empty()
            }
        }
    }

    fn format_value(&self, value: &dyn Any) -> String {
        match value.downcast_ref::<T>() {
            Some(value) => format!("{value:?}"),
            None => format!("<not a {}>", type_name::<T>()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static BASE: OwnerType = OwnerType::new("Base", None);
    static DERIVED: OwnerType = OwnerType::new("Derived", Some(&BASE));
    static OTHER: OwnerType = OwnerType::new("Other", None);

    #[test]
    fn test_owner_type_chain() {
        assert!(DERIVED.is_a(&BASE));
        assert!(DERIVED.is_a(&DERIVED));
        assert!(!BASE.is_a(&DERIVED));
        assert!(!DERIVED.is_a(&OTHER));

        let names: Vec<_> = DERIVED.ancestry().map(|t| t.name).collect();
        assert_eq!(names, vec!["Derived", "Base"]);
    }

    #[test]
    fn test_keys_compare_by_identity() {
        let a = PropertyKey::<i32>::builder("Value", &BASE).build();
        let b = PropertyKey::<i32>::builder("Value", &BASE).build();
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert!(a.id() < b.id());
    }

    #[test]
    fn test_default_value_sources() {
        let container = PropertyContainer::new(Owner::new(&BASE, 1));
        let plain = PropertyKey::<f32>::builder("Plain", &BASE).build();
        let fixed = PropertyKey::<f32>::builder("Fixed", &BASE).default_value(4.0).build();
        let computed = PropertyKey::<u64>::builder("Computed", &BASE)
            .default_value_with(|container| container.owner().id * 10)
            .build();

        assert_eq!(plain.default_value(&container), 0.0);
        assert_eq!(fixed.default_value(&container), 4.0);
        assert_eq!(computed.default_value(&container), 10);
    }

    #[test]
    fn test_shared_key_uses_identity() {
        let key = PropertyKey::<Option<Arc<String>>>::shared_builder("Label", &BASE).build();
        let first = Some(Arc::new("ok".to_string()));
        let same_text = Some(Arc::new("ok".to_string()));

        assert!(key.values_equal(&first, &first.clone()));
        assert!(!key.values_equal(&first, &same_text));
        assert!(key.values_equal(&None, &None));
    }

    #[test]
    fn test_type_erased_view() {
        let key = PropertyKey::<i32>::builder("Count", &DERIVED).default_value(7).build();
        let erased: &dyn AnyPropertyKey = &key;
        let container = PropertyContainer::new(Owner::new(&DERIVED, 1));

        assert_eq!(erased.name(), "Count");
        assert!(ptr::eq(erased.owner_type(), &DERIVED));
        assert_eq!(erased.value_type_name(), "i32");
        assert_eq!(erased.format_value(erased.read(&container).as_ref()), "7");
        assert_eq!(erased.format_value(&1.5f32), "<not a i32>");
    }
}
