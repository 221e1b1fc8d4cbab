// crates/kryon-core/src/reference.rs

use std::fmt;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::trace;

use crate::{KryonError, Result};

type DestroyHook = Box<dyn FnOnce() + Send>;

/// Manual reference counter shared by engine objects.
///
/// The counter starts at 1 (the creator's reference). Reaching zero runs the
/// destroy hook once; after that the object is dead and both `add_reference`
/// and `release` fail.
pub struct ReferenceBase {
    counter: AtomicI32,
    on_destroy: Mutex<Option<DestroyHook>>,
}

impl ReferenceBase {
    pub fn new() -> Self {
        Self {
            counter: AtomicI32::new(1),
            on_destroy: Mutex::new(None),
        }
    }

    pub fn with_destroy<F>(on_destroy: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            counter: AtomicI32::new(1),
            on_destroy: Mutex::new(Some(Box::new(on_destroy))),
        }
    }

    pub fn reference_count(&self) -> i32 {
        self.counter.load(Ordering::Acquire)
    }

    pub fn is_destroyed(&self) -> bool {
        self.reference_count() == 0
    }

    /// Increments the counter and returns the new count.
    pub fn add_reference(&self) -> Result<i32> {
        let mut current = self.counter.load(Ordering::Acquire);
        loop {
            if current <= 0 {
                return Err(KryonError::InvalidOperation(
                    "add_reference called on an object that was already released".to_string(),
                ));
            }
            match self.counter.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(current + 1),
                Err(observed) => current = observed,
            }
        }
    }

    /// Decrements the counter and returns the new count, destroying on zero.
    pub fn release(&self) -> Result<i32> {
        let mut current = self.counter.load(Ordering::Acquire);
        loop {
            if current <= 0 {
                return Err(KryonError::InvalidOperation(
                    "release called more times than add_reference".to_string(),
                ));
            }
            match self.counter.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }

        let remaining = current - 1;
        if remaining == 0 {
            self.destroy();
        }
        Ok(remaining)
    }

    fn destroy(&self) {
        let hook = self
            .on_destroy
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        trace!("reference count reached zero, destroying");
        if let Some(hook) = hook {
            hook();
        }
    }
}

impl Default for ReferenceBase {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ReferenceBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceBase")
            .field("counter", &self.reference_count())
            .finish()
    }
}

/// Objects whose lifetime is driven by a [`ReferenceBase`].
pub trait ReferenceCounted {
    fn reference_base(&self) -> &ReferenceBase;

    fn add_reference(&self) -> Result<i32> {
        self.reference_base().add_reference()
    }

    fn release(&self) -> Result<i32> {
        self.reference_base().release()
    }

    fn reference_count(&self) -> i32 {
        self.reference_base().reference_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    struct Texture {
        base: ReferenceBase,
    }

    impl ReferenceCounted for Texture {
        fn reference_base(&self) -> &ReferenceBase {
            &self.base
        }
    }

    #[test]
    fn test_counter_starts_at_one() {
        let base = ReferenceBase::new();
        assert_eq!(base.reference_count(), 1);
        assert!(!base.is_destroyed());
    }

    #[test]
    fn test_destroy_runs_once_on_zero() {
        let destroyed = Arc::new(AtomicUsize::new(0));
        let hook = destroyed.clone();
        let texture = Texture {
            base: ReferenceBase::with_destroy(move || {
                hook.fetch_add(1, Ordering::SeqCst);
            }),
        };

        assert_eq!(texture.add_reference().unwrap(), 2);
        assert_eq!(texture.release().unwrap(), 1);
        assert_eq!(destroyed.load(Ordering::SeqCst), 0);
        assert_eq!(texture.release().unwrap(), 0);
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
        assert!(texture.reference_base().is_destroyed());
    }

    #[test]
    fn test_release_below_zero_fails() {
        let base = ReferenceBase::new();
        base.release().unwrap();
        assert!(matches!(base.release(), Err(KryonError::InvalidOperation(_))));
        assert_eq!(base.reference_count(), 0);
    }

    #[test]
    fn test_add_reference_after_destroy_fails() {
        let base = ReferenceBase::new();
        base.release().unwrap();
        assert!(matches!(base.add_reference(), Err(KryonError::InvalidOperation(_))));
        assert_eq!(base.reference_count(), 0);
    }

    #[test]
    fn test_concurrent_add_and_release() {
        let destroyed = Arc::new(AtomicUsize::new(0));
        let hook = destroyed.clone();
        let base = Arc::new(ReferenceBase::with_destroy(move || {
            hook.fetch_add(1, Ordering::SeqCst);
        }));

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let base = base.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        base.add_reference().unwrap();
                        base.release().unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(base.reference_count(), 1);
        assert_eq!(destroyed.load(Ordering::SeqCst), 0);
        base.release().unwrap();
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    }
}
