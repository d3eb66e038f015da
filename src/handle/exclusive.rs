use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::capability::{CapabilityKind, InterfaceId, QueryInterface};
use crate::engine::Lifecycle;
use crate::error::EngineError;

/// Objects that must be explicitly released by their single owner.
///
/// Capability proxies drop their engine-side reference in `release`; it must
/// tolerate being called more than once.
pub trait Release {
    fn release(&mut self);
}

struct Slot<T: ?Sized> {
    ptr: Option<Box<T>>,
    /// Lifecycle of the engine the capability was queried from.
    owner: Option<Arc<Lifecycle>>,
}

/// Exclusive owner of zero or one capability object.
///
/// Not `Clone`: ownership moves with the handle or via [`take`] + [`reset`].
/// Every access goes through a per-handle mutex, so concurrent calls on the
/// same handle are serialized. Do not touch the handle again from inside a
/// [`with`] closure; the mutex is not reentrant.
///
/// [`take`]: ExclusiveHandle::take
/// [`reset`]: ExclusiveHandle::reset
/// [`with`]: ExclusiveHandle::with
pub struct ExclusiveHandle<T: ?Sized + Release> {
    slot: Mutex<Slot<T>>,
}

impl<T: ?Sized + Release> ExclusiveHandle<T> {
    /// Adopt `ptr` (which may be `None`).
    pub fn new(ptr: Option<Box<T>>) -> Self {
        Self::with_owner(ptr, None)
    }

    pub fn empty() -> Self {
        Self::new(None)
    }

    fn with_owner(ptr: Option<Box<T>>, owner: Option<Arc<Lifecycle>>) -> Self {
        Self {
            slot: Mutex::new(Slot { ptr, owner }),
        }
    }

    // Teardown paths must never leak a capability, so poisoning is ignored here.
    fn slot(&self) -> MutexGuard<'_, Slot<T>> {
        match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn is_some(&self) -> bool {
        self.slot().ptr.is_some()
    }

    pub fn is_null(&self) -> bool {
        !self.is_some()
    }

    /// Non-null and, if derived from an engine, that engine is still live.
    pub fn is_valid(&self) -> bool {
        let slot = self.slot();
        slot.ptr.is_some() && slot.owner.as_ref().map_or(true, |owner| owner.is_live())
    }

    /// Release the held object (if any), then adopt `ptr`.
    ///
    /// Two owned boxes never alias, so the held object is always distinct
    /// from the incoming one.
    pub fn reset(&self, ptr: Option<Box<T>>) {
        self.replace(ptr, None);
    }

    fn replace(&self, ptr: Option<Box<T>>, owner: Option<Arc<Lifecycle>>) {
        let previous = {
            let mut slot = self.slot();
            slot.owner = owner;
            std::mem::replace(&mut slot.ptr, ptr)
        };
        if let Some(mut previous) = previous {
            previous.release();
        }
    }

    /// Give up ownership without releasing. The caller becomes responsible
    /// for calling [`Release::release`].
    pub fn take(&self) -> Option<Box<T>> {
        let mut slot = self.slot();
        slot.owner = None;
        slot.ptr.take()
    }

    /// Run `f` against the held object.
    ///
    /// # Errors
    /// - `NullHandle` if the handle is empty
    /// - `HandleInvalidated` if the owning engine has started releasing
    /// - `LockPoisoned` if a previous access panicked
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, EngineError> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| EngineError::lock_poisoned("exclusive_handle"))?;

        if let Some(owner) = slot.owner.as_ref() {
            if !owner.is_live() {
                return Err(EngineError::HandleInvalidated);
            }
        }

        match slot.ptr.as_deref_mut() {
            Some(target) => Ok(f(target)),
            None => Err(EngineError::NullHandle),
        }
    }
}

impl<T: ?Sized + CapabilityKind> ExclusiveHandle<T> {
    /// Query `root` for `iid` and adopt the result.
    ///
    /// On failure the handle keeps whatever it held before and `false` is
    /// returned. A capability of a different kind than `T` is released
    /// immediately and counts as failure.
    pub fn query_interface<Q>(&self, root: &Q, iid: InterfaceId) -> bool
    where
        Q: QueryInterface + ?Sized,
    {
        let capability = match root.query_interface(iid) {
            Ok(capability) => capability,
            Err(err) => {
                log::debug!("[ExclusiveHandle] query_interface({:?}) failed: {}", iid, err);
                return false;
            }
        };

        match T::from_capability(capability) {
            Ok(ptr) => {
                self.replace(Some(ptr), root.lifecycle());
                true
            }
            Err(mut other) => {
                log::warn!(
                    "[ExclusiveHandle] {:?} returned a {:?} capability, releasing it",
                    iid,
                    other.interface_id()
                );
                other.release();
                false
            }
        }
    }

    /// Acquire `T`'s own interface from `root`; the handle is empty on failure.
    pub fn acquire<Q>(root: &Q) -> Self
    where
        Q: QueryInterface + ?Sized,
    {
        let handle = Self::empty();
        handle.query_interface(root, T::IID);
        handle
    }

    /// Like [`acquire`](Self::acquire) but reports why the query failed.
    pub fn try_acquire<Q>(root: &Q) -> Result<Self, EngineError>
    where
        Q: QueryInterface + ?Sized,
    {
        let capability = root.query_interface(T::IID)?;
        match T::from_capability(capability) {
            Ok(ptr) => Ok(Self::with_owner(Some(ptr), root.lifecycle())),
            Err(mut other) => {
                other.release();
                Err(EngineError::not_supported(format!(
                    "{:?} answered with a different capability kind",
                    T::IID
                )))
            }
        }
    }
}

impl<T: ?Sized + Release> Default for ExclusiveHandle<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: ?Sized + Release> Drop for ExclusiveHandle<T> {
    fn drop(&mut self) {
        let slot = match self.slot.get_mut() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(mut ptr) = slot.ptr.take() {
            ptr.release();
        }
    }
}

impl<T: ?Sized + Release> fmt::Debug for ExclusiveHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExclusiveHandle")
            .field("null", &self.is_null())
            .field("valid", &self.is_valid())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counted {
        releases: Arc<AtomicUsize>,
        released: bool,
        value: u32,
    }

    impl Counted {
        fn boxed(releases: &Arc<AtomicUsize>, value: u32) -> Box<Self> {
            Box::new(Self {
                releases: Arc::clone(releases),
                released: false,
                value,
            })
        }
    }

    impl Release for Counted {
        fn release(&mut self) {
            if !self.released {
                self.released = true;
                self.releases.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn drop_releases_held_pointer() {
        let releases = Arc::new(AtomicUsize::new(0));
        {
            let _handle = ExclusiveHandle::new(Some(Counted::boxed(&releases, 1)));
        }
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_handle_drop_is_noop() {
        let handle: ExclusiveHandle<Counted> = ExclusiveHandle::empty();
        assert!(handle.is_null());
        drop(handle);
    }

    #[test]
    fn reset_releases_previous_before_adopting() {
        let releases = Arc::new(AtomicUsize::new(0));
        let handle = ExclusiveHandle::new(Some(Counted::boxed(&releases, 1)));

        handle.reset(Some(Counted::boxed(&releases, 2)));
        assert_eq!(releases.load(Ordering::SeqCst), 1);
        assert_eq!(handle.with(|c| c.value).unwrap(), 2);

        handle.reset(None);
        assert_eq!(releases.load(Ordering::SeqCst), 2);
        assert!(handle.is_null());

        drop(handle);
        assert_eq!(releases.load(Ordering::SeqCst), 2, "no double release");
    }

    #[test]
    fn with_on_null_handle_fails() {
        let handle: ExclusiveHandle<Counted> = ExclusiveHandle::empty();
        assert_eq!(handle.with(|c| c.value), Err(EngineError::NullHandle));
    }

    #[test]
    fn take_transfers_ownership_without_release() {
        let releases = Arc::new(AtomicUsize::new(0));
        let handle = ExclusiveHandle::new(Some(Counted::boxed(&releases, 9)));

        let mut taken = handle.take().expect("pointer present");
        drop(handle);
        assert_eq!(releases.load(Ordering::SeqCst), 0);

        taken.release();
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn invalidated_owner_blocks_access() {
        let releases = Arc::new(AtomicUsize::new(0));
        let owner = Arc::new(Lifecycle::new());
        let handle =
            ExclusiveHandle::with_owner(Some(Counted::boxed(&releases, 3)), Some(Arc::clone(&owner)));
        assert!(handle.is_valid());

        owner.begin_release();
        assert!(!handle.is_valid());
        assert_eq!(handle.with(|c| c.value), Err(EngineError::HandleInvalidated));

        drop(handle);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concurrent_access_is_serialized() {
        let releases = Arc::new(AtomicUsize::new(0));
        let handle = Arc::new(ExclusiveHandle::new(Some(Counted::boxed(&releases, 0))));

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let handle = Arc::clone(&handle);
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        handle.with(|c| c.value += 1).unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(handle.with(|c| c.value).unwrap(), 1000);
    }
}
