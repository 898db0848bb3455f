use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

/// A thread-safe, reference-counted resource container with read-write locking.
///
/// `MtResource` is the handle every shared piece of edit state travels in: the
/// world, edit sessions, extents seen through a trait object, and operations
/// that must be both scheduled and observed. It wraps an `Arc<RwLock<T>>`, so
/// cloning the handle shares the value.
///
/// `T` may be unsized, which lets one session be viewed both as a concrete
/// `EditSession` and as a `dyn Extent` without copying it.
///
/// # Examples
///
/// ```
/// use voxel_operations::core::MtResource;
///
/// let counter = MtResource::new(0);
/// let counter_clone = counter.clone();
///
/// *counter_clone.get_mut() += 1;
/// assert_eq!(*counter.get(), 1);
/// ```
///
/// # Performance Considerations
/// - Read operations (`get()`) can occur concurrently
/// - Write operations (`get_mut()`) are exclusive and will block other operations
/// - Guards should not be held across calls that may lock the same resource again
pub struct MtResource<T: ?Sized + Send + Sync> {
    pub resource: Arc<RwLock<T>>,
}

impl<T: Send + Sync + 'static> MtResource<T> {
    /// Creates a new `MtResource` containing the given value.
    ///
    /// # Arguments
    /// * `resource` - The value to be stored in the resource
    pub fn new(resource: T) -> Self {
        Self {
            resource: Arc::new(RwLock::new(resource)),
        }
    }
}

impl<T: ?Sized + Send + Sync> MtResource<T> {
    /// Wraps an existing shared lock.
    ///
    /// This is how a concrete handle is re-viewed as a trait object: the
    /// caller clones the concrete `Arc` and lets it coerce at the call site.
    ///
    /// ```
    /// use std::fmt::Debug;
    /// use voxel_operations::core::MtResource;
    ///
    /// let concrete = MtResource::new(5u32);
    /// let erased =
    ///     MtResource::<dyn Debug + Send + Sync>::from_shared(concrete.resource.clone());
    /// assert_eq!(format!("{:?}", &*erased.get()), "5");
    /// ```
    pub fn from_shared(resource: Arc<RwLock<T>>) -> Self {
        Self { resource }
    }

    /// Returns a read-only guard that allows reading the contained value.
    pub fn get(&self) -> RwLockReadGuard<'_, T> {
        self.resource.read()
    }

    /// Returns a mutable guard that allows modifying the contained value.
    pub fn get_mut(&self) -> RwLockWriteGuard<'_, T> {
        self.resource.write()
    }

    /// Address of the shared allocation.
    ///
    /// Two handles return the same address exactly when they share a value,
    /// whatever view (`T` or a trait object) each of them has.
    pub fn shared_ptr(&self) -> *const () {
        Arc::as_ptr(&self.resource) as *const ()
    }

    /// Returns `true` if both handles point at the same value.
    pub fn ptr_eq<U: ?Sized + Send + Sync>(&self, other: &MtResource<U>) -> bool {
        std::ptr::eq(self.shared_ptr(), other.shared_ptr())
    }
}

impl<T: ?Sized + Send + Sync> Clone for MtResource<T> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
        }
    }
}

impl<T: ?Sized + Send + Sync + std::fmt::Debug> std::fmt::Debug for MtResource<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MtResource")
            .field("resource", &&*self.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Named: Send + Sync {
        fn name(&self) -> String;
    }

    struct Fixed(&'static str);

    impl Named for Fixed {
        fn name(&self) -> String {
            self.0.to_string()
        }
    }

    #[test]
    fn clones_share_the_value() {
        let resource = MtResource::new(vec![1, 2, 3]);
        let clone = resource.clone();
        clone.get_mut().push(4);
        assert_eq!(resource.get().len(), 4);
        assert!(resource.ptr_eq(&clone));
    }

    #[test]
    fn erased_view_keeps_identity() {
        let concrete = MtResource::new(Fixed("stone"));
        let erased = MtResource::<dyn Named>::from_shared(concrete.resource.clone());
        assert_eq!(erased.get().name(), "stone");
        assert!(erased.ptr_eq(&concrete));
        assert!(!erased.ptr_eq(&MtResource::new(Fixed("stone"))));
    }
}
