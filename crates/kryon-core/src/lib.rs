// crates/kryon-core/src/lib.rs
pub mod reference;
pub mod invalidation;
pub mod property_key;
pub mod property_container;
pub mod accessor_registry;

pub use reference::*;
pub use invalidation::*;
pub use property_key::*;
pub use property_container::*;
pub use accessor_registry::*;

#[derive(Debug, thiserror::Error)]
pub enum KryonError {
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Element not found: {0}")]
    ElementNotFound(u32),

    #[error("Element {id} is not a {expected}")]
    KindMismatch { id: u32, expected: &'static str },
}

pub type Result<T> = std::result::Result<T, KryonError>;
