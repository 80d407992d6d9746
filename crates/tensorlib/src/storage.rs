//! Owned element buffers for tensors.
//!
//! A [`TensorStorage`] holds exactly `len` initialized elements in one allocation
//! obtained from a [`TensorAllocator`]. Buffers are built element by element behind a
//! guard, so a constructor that fails or panics part way drops the elements it already
//! produced and returns the memory before the error leaves the call.

use std::{alloc::Layout, marker::PhantomData, mem::ManuallyDrop, ptr::NonNull};

use crate::{
    allocator::{TensorAllocator, TensorAllocatorError},
    error::TensorError,
};

/// Contiguous, owned and fully initialized buffer of `T`.
///
/// # Thread Safety
///
/// `TensorStorage` is `Send`/`Sync` when both `T` and the allocator are.
pub struct TensorStorage<T, A: TensorAllocator> {
    /// The pointer to the first element, dangling when the layout is zero-sized.
    ptr: NonNull<T>,
    /// The number of initialized elements.
    len: usize,
    /// The layout used for the allocation.
    layout: Layout,
    /// The allocator that owns the memory.
    alloc: A,
    _marker: PhantomData<T>,
}

// Safety:
// the storage uniquely owns its elements, like a Vec<T>.
unsafe impl<T: Send, A: TensorAllocator + Send> Send for TensorStorage<T, A> {}
unsafe impl<T: Sync, A: TensorAllocator + Sync> Sync for TensorStorage<T, A> {}

/// Allocates room for `len` elements; zero-sized layouts never reach the allocator.
fn allocate<T, A: TensorAllocator>(
    len: usize,
    alloc: &A,
) -> Result<(NonNull<T>, Layout), TensorAllocatorError> {
    let layout = Layout::array::<T>(len).map_err(TensorAllocatorError::LayoutError)?;
    if layout.size() == 0 {
        return Ok((NonNull::dangling(), layout));
    }
    let raw = alloc.alloc(layout)?;
    let ptr = NonNull::new(raw as *mut T).ok_or(TensorAllocatorError::NullPointer)?;
    log::trace!("allocated {} bytes for {} elements", layout.size(), len);
    Ok((ptr, layout))
}

fn release<T, A: TensorAllocator>(ptr: NonNull<T>, layout: Layout, alloc: &A) {
    if layout.size() != 0 {
        log::trace!("releasing {} bytes", layout.size());
        alloc.dealloc(ptr.as_ptr() as *mut u8, layout);
    }
}

/// Owns a buffer whose first `initialized` slots hold live values.
///
/// Dropping the guard destroys those values and releases the buffer.
struct PartialBuffer<'a, T, A: TensorAllocator> {
    ptr: NonNull<T>,
    layout: Layout,
    initialized: usize,
    alloc: &'a A,
}

impl<T, A: TensorAllocator> Drop for PartialBuffer<'_, T, A> {
    fn drop(&mut self) {
        unsafe {
            std::ptr::drop_in_place(std::ptr::slice_from_raw_parts_mut(
                self.ptr.as_ptr(),
                self.initialized,
            ));
        }
        release(self.ptr, self.layout, self.alloc);
    }
}

impl<T, A: TensorAllocator> TensorStorage<T, A> {
    /// Creates a storage of `len` elements produced by a fallible generator.
    ///
    /// The generator is called with the linear index of each element, in order. If it
    /// returns an error, every element built so far is dropped, the buffer is released
    /// and the error is returned. The same clean up happens if the generator panics.
    ///
    /// # Errors
    ///
    /// Returns the generator's error, or an allocation error converted into `E`.
    pub fn try_from_fn<E, F>(len: usize, alloc: A, mut f: F) -> Result<Self, E>
    where
        E: From<TensorAllocatorError>,
        F: FnMut(usize) -> Result<T, E>,
    {
        let (ptr, layout) = allocate::<T, A>(len, &alloc)?;
        let mut guard = PartialBuffer {
            ptr,
            layout,
            initialized: 0,
            alloc: &alloc,
        };
        while guard.initialized < len {
            let value = f(guard.initialized)?;
            // SAFETY: the slot is inside the allocation and not yet initialized
            unsafe { ptr.as_ptr().add(guard.initialized).write(value) };
            guard.initialized += 1;
        }
        std::mem::forget(guard);

        Ok(Self {
            ptr,
            len,
            layout,
            alloc,
            _marker: PhantomData,
        })
    }

    /// Creates a storage of `len` elements produced by `f(linear_index)`.
    ///
    /// # Errors
    ///
    /// Returns an error if memory allocation fails.
    pub fn from_fn<F>(len: usize, alloc: A, mut f: F) -> Result<Self, TensorAllocatorError>
    where
        F: FnMut(usize) -> T,
    {
        Self::try_from_fn(len, alloc, |i| Ok::<T, TensorAllocatorError>(f(i)))
    }

    /// Creates a storage of `len` elements pushed in order by `produce`.
    ///
    /// `produce` receives a sink and must push exactly `len` values into it. The buffer
    /// is guarded like in [`Self::try_from_fn`]: a panic inside `produce` drops what was
    /// pushed so far and releases the memory.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::SizeMismatch`] if a different number of values was pushed,
    /// or [`TensorError::StorageError`] if memory allocation fails.
    pub fn from_sink<F>(len: usize, alloc: A, produce: F) -> Result<Self, TensorError>
    where
        F: FnOnce(&mut dyn FnMut(T)),
    {
        let (ptr, layout) = allocate::<T, A>(len, &alloc)?;
        let mut guard = PartialBuffer {
            ptr,
            layout,
            initialized: 0,
            alloc: &alloc,
        };
        let mut pushed = 0;
        produce(&mut |value| {
            pushed += 1;
            if guard.initialized < len {
                // SAFETY: the slot is inside the allocation and not yet initialized
                unsafe { ptr.as_ptr().add(guard.initialized).write(value) };
                guard.initialized += 1;
            }
        });
        if pushed != len {
            return Err(TensorError::size_mismatch(len, pushed));
        }
        std::mem::forget(guard);

        Ok(Self {
            ptr,
            len,
            layout,
            alloc,
            _marker: PhantomData,
        })
    }

    /// Creates a storage by moving the elements of a vector into a buffer of the given allocator.
    ///
    /// # Errors
    ///
    /// Returns an error if memory allocation fails; the vector is dropped in that case.
    pub fn from_vec(mut vec: Vec<T>, alloc: A) -> Result<Self, TensorAllocatorError> {
        let len = vec.len();
        let (ptr, layout) = allocate::<T, A>(len, &alloc)?;

        // SAFETY: ptr is valid for len elements, the regions don't overlap and the vector
        // forgets its elements right after the bitwise move
        unsafe {
            std::ptr::copy_nonoverlapping(vec.as_ptr(), ptr.as_ptr(), len);
            vec.set_len(0);
        }

        Ok(Self {
            ptr,
            len,
            layout,
            alloc,
            _marker: PhantomData,
        })
    }

    /// Clones every element into a new storage using a clone of the same allocator.
    ///
    /// # Errors
    ///
    /// Returns an error if memory allocation fails.
    pub fn try_clone(&self) -> Result<Self, TensorAllocatorError>
    where
        T: Clone,
    {
        let src = self.as_slice();
        Self::from_fn(self.len, self.alloc.clone(), |i| src[i].clone())
    }

    /// Consumes the storage and returns its elements as a vector.
    pub fn into_vec(self) -> Vec<T> {
        let this = ManuallyDrop::new(self);
        let mut vec = Vec::with_capacity(this.len);

        // SAFETY: the vector has room for len elements; ownership of the elements moves to
        // the vector and the storage buffer is released without dropping them
        unsafe {
            std::ptr::copy_nonoverlapping(this.ptr.as_ptr(), vec.as_mut_ptr(), this.len);
            vec.set_len(this.len);
        }
        release(this.ptr, this.layout, &this.alloc);
        // SAFETY: the allocator is read exactly once and `this` is never dropped
        let _alloc = unsafe { std::ptr::read(&this.alloc) };

        vec
    }

    /// Returns the allocator used to allocate the storage.
    #[inline]
    pub fn alloc(&self) -> &A {
        &self.alloc
    }

    /// Returns the number of elements in the storage.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns whether the storage holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the memory layout of the buffer.
    #[inline]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Returns the data pointer.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    /// Returns the mutable data pointer.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// Returns the elements as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: ptr is valid, aligned and holds len initialized elements
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// Returns the elements as a mutable slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: as above, and `&mut self` guarantees exclusive access
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<T, A: TensorAllocator> Drop for TensorStorage<T, A> {
    fn drop(&mut self) {
        unsafe {
            std::ptr::drop_in_place(std::ptr::slice_from_raw_parts_mut(
                self.ptr.as_ptr(),
                self.len,
            ));
        }
        release(self.ptr, self.layout, &self.alloc);
    }
}

impl<T: Clone, A: TensorAllocator> Clone for TensorStorage<T, A> {
    fn clone(&self) -> Self {
        match self.try_clone() {
            Ok(storage) => storage,
            Err(_) => std::alloc::handle_alloc_error(self.layout),
        }
    }
}

impl<T: std::fmt::Debug, A: TensorAllocator> std::fmt::Debug for TensorStorage<T, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TensorStorage")
            .field("len", &self.len)
            .field("layout", &self.layout)
            .field("data", &self.as_slice())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::CpuAllocator;
    use std::cell::Cell;
    use std::rc::Rc;

    struct DropCounter(Rc<Cell<usize>>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn test_tensor_storage_from_fn() -> Result<(), TensorAllocatorError> {
        let storage = TensorStorage::<u32, _>::from_fn(6, CpuAllocator, |i| i as u32 * 2)?;
        assert_eq!(storage.len(), 6);
        assert!(!storage.as_ptr().is_null());
        assert_eq!(storage.as_slice(), &[0, 2, 4, 6, 8, 10]);
        Ok(())
    }

    #[test]
    fn test_tensor_storage_from_vec() -> Result<(), TensorAllocatorError> {
        let storage = TensorStorage::from_vec(vec![String::from("a"), String::from("b")], CpuAllocator)?;
        assert_eq!(storage.len(), 2);
        assert_eq!(storage.into_vec(), vec!["a".to_string(), "b".to_string()]);
        Ok(())
    }

    #[test]
    fn test_tensor_storage_clone_is_deep() -> Result<(), TensorAllocatorError> {
        let mut storage = TensorStorage::from_vec(vec![1u8, 2, 3], CpuAllocator)?;
        let cloned = storage.clone();
        storage.as_mut_slice()[0] = 9;
        assert_eq!(cloned.as_slice(), &[1, 2, 3]);
        assert_ne!(cloned.as_ptr(), storage.as_ptr());
        Ok(())
    }

    #[test]
    fn test_tensor_storage_zero_sized() -> Result<(), TensorAllocatorError> {
        let storage = TensorStorage::<(), _>::from_fn(5, CpuAllocator, |_| ())?;
        assert_eq!(storage.len(), 5);
        assert_eq!(storage.layout().size(), 0);
        Ok(())
    }

    #[test]
    fn test_tensor_storage_error_rolls_back() {
        let drops = Rc::new(Cell::new(0));
        let result = TensorStorage::<DropCounter, _>::try_from_fn(4, CpuAllocator, |i| {
            if i == 3 {
                Err(TensorAllocatorError::NullPointer)
            } else {
                Ok(DropCounter(drops.clone()))
            }
        });
        assert!(result.is_err());
        assert_eq!(drops.get(), 3);
    }

    #[test]
    fn test_tensor_storage_panic_rolls_back() {
        let drops = Rc::new(Cell::new(0));
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            TensorStorage::<DropCounter, _>::from_fn(5, CpuAllocator, |i| {
                if i == 2 {
                    panic!("element construction failed");
                }
                DropCounter(drops.clone())
            })
        }));
        assert!(result.is_err());
        assert_eq!(drops.get(), 2);
    }

    #[test]
    fn test_tensor_storage_drops_every_element() -> Result<(), TensorAllocatorError> {
        let drops = Rc::new(Cell::new(0));
        let storage = TensorStorage::from_fn(7, CpuAllocator, |_| DropCounter(drops.clone()))?;
        drop(storage);
        assert_eq!(drops.get(), 7);
        Ok(())
    }

    #[test]
    fn test_tensor_storage_from_sink() -> Result<(), TensorError> {
        let storage = TensorStorage::<u16, _>::from_sink(4, CpuAllocator, |push| {
            for v in [4, 3, 2, 1] {
                push(v);
            }
        })?;
        assert_eq!(storage.as_slice(), &[4, 3, 2, 1]);
        Ok(())
    }

    #[test]
    fn test_tensor_storage_from_sink_wrong_count() {
        let drops = Rc::new(Cell::new(0));
        let short = TensorStorage::<DropCounter, _>::from_sink(3, CpuAllocator, |push| {
            push(DropCounter(drops.clone()));
            push(DropCounter(drops.clone()));
        });
        assert_eq!(short.err(), Some(TensorError::size_mismatch(3, 2)));
        assert_eq!(drops.get(), 2);

        let long = TensorStorage::<DropCounter, _>::from_sink(1, CpuAllocator, |push| {
            push(DropCounter(drops.clone()));
            push(DropCounter(drops.clone()));
        });
        assert_eq!(long.err(), Some(TensorError::size_mismatch(1, 2)));
        assert_eq!(drops.get(), 4);
    }

    #[test]
    fn test_tensor_storage_from_sink_panic_rolls_back() {
        let drops = Rc::new(Cell::new(0));
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            TensorStorage::<DropCounter, _>::from_sink(4, CpuAllocator, |push| {
                push(DropCounter(drops.clone()));
                panic!("producer failed");
            })
        }));
        assert!(result.is_err());
        assert_eq!(drops.get(), 1);
    }
}
