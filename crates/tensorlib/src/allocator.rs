use std::alloc;
use std::alloc::Layout;

use thiserror::Error;

/// An error type for tensor allocator operations.
#[derive(Debug, Error, PartialEq)]
pub enum TensorAllocatorError {
    /// The requested buffer does not have a valid layout, usually because its byte size overflows.
    #[error("Invalid tensor layout {0}")]
    LayoutError(core::alloc::LayoutError),

    /// The allocator returned a null pointer.
    #[error("Null pointer")]
    NullPointer,
}

impl TensorAllocatorError {
    /// Returns true if the allocation failed because the system ran out of memory.
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, Self::NullPointer)
    }

    /// Returns a user-friendly suggestion for resolving the error.
    pub fn suggestion(&self) -> &str {
        match self {
            Self::LayoutError(_) => "Reduce the tensor extents so the buffer size fits in isize::MAX bytes",
            Self::NullPointer => "Free unused tensors or reduce the tensor extents",
        }
    }
}

/// A trait for allocating and deallocating the element buffer of a tensor.
///
/// Implementors only hand out raw memory; constructing and dropping the elements
/// is done by [`crate::storage::TensorStorage`].
///
/// # Methods
///
/// * `alloc` - Allocates memory with the given layout.
/// * `dealloc` - Deallocates memory previously returned by `alloc` with the same layout.
pub trait TensorAllocator: Clone {
    /// Allocates memory for a tensor with the given layout.
    ///
    /// The layout always has a non-zero size.
    fn alloc(&self, layout: Layout) -> Result<*mut u8, TensorAllocatorError>;

    /// Deallocates memory for a tensor with the given layout.
    fn dealloc(&self, ptr: *mut u8, layout: Layout);
}

/// A tensor allocator that uses the global system allocator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CpuAllocator;

impl TensorAllocator for CpuAllocator {
    /// Allocates memory for a tensor with the given layout.
    ///
    /// # Arguments
    ///
    /// * `layout` - The layout of the buffer.
    ///
    /// # Returns
    ///
    /// A non-null pointer to the allocated memory if successful, otherwise an error.
    fn alloc(&self, layout: Layout) -> Result<*mut u8, TensorAllocatorError> {
        let ptr = unsafe { alloc::alloc(layout) };
        if ptr.is_null() {
            Err(TensorAllocatorError::NullPointer)?
        }
        Ok(ptr)
    }

    /// Deallocates memory for a tensor with the given layout.
    ///
    /// # Safety
    ///
    /// The pointer must come from `alloc` on this allocator with the same layout.
    #[allow(clippy::not_unsafe_ptr_arg_deref)]
    fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        if !ptr.is_null() {
            unsafe { alloc::dealloc(ptr, layout) }
        }
    }
}
