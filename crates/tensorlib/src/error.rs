use thiserror::Error;

use crate::allocator::TensorAllocatorError;

/// Error type for tensor and view operations.
///
/// Every variant is detected before any element is written, so an operation that
/// returns an error leaves its target untouched.
#[derive(Error, Debug, PartialEq)]
pub enum TensorError {
    /// A requested extent is zero, or the element count does not fit in `usize`.
    ///
    /// # Example
    /// ```ignore
    /// // Error: the second dimension has zero elements
    /// let t = Tensor2::<u8>::new([3, 0])?;
    /// ```
    #[error("Invalid shape {0:?}: every extent must be non-zero and the element count must fit in usize")]
    InvalidShape(Vec<usize>),

    /// Sibling lists of a nested literal have different widths at the same depth.
    #[error("Ragged nested literal at depth {depth}: expected {expected} elements, got {actual}")]
    RaggedShape {
        /// Nesting depth (0 is the outermost list)
        depth: usize,
        /// Width observed first at this depth
        expected: usize,
        /// Width of the offending sibling
        actual: usize,
    },

    /// A literal or flat buffer does not match the element count or width of the target.
    ///
    /// # Recommended Actions
    /// - Compare `numel()` (flat data) or `extents()` (nested data) of the target
    /// - Use `resize` first when the target should take a new shape
    #[error("Size mismatch: expected {expected} elements, got {actual}")]
    SizeMismatch {
        /// Element count or width required by the target
        expected: usize,
        /// Element count or width supplied
        actual: usize,
    },

    /// The full shape of a source differs from the shape of the target.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Extents required by the target
        expected: Vec<usize>,
        /// Extents of the source
        actual: Vec<usize>,
    },

    /// Index exceeds the extent of the dimension being indexed.
    #[error("Index {index} out of range for dimension of extent {extent}")]
    OutOfRange {
        /// The invalid index that was attempted
        index: usize,
        /// The extent of the dimension being indexed
        extent: usize,
    },

    /// Underlying storage operation failed.
    ///
    /// See [`TensorAllocatorError`] for details.
    #[error("Storage error: {0}")]
    StorageError(#[from] TensorAllocatorError),
}

impl TensorError {
    /// Creates an InvalidShape error from the offending extents.
    pub fn invalid_shape(extents: &[usize]) -> Self {
        Self::InvalidShape(extents.to_vec())
    }

    /// Creates a SizeMismatch error.
    pub fn size_mismatch(expected: usize, actual: usize) -> Self {
        Self::SizeMismatch { expected, actual }
    }

    /// Creates a ShapeMismatch error from two extent lists.
    pub fn shape_mismatch(expected: &[usize], actual: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }

    /// Creates an OutOfRange error.
    pub fn out_of_range(index: usize, extent: usize) -> Self {
        Self::OutOfRange { index, extent }
    }

    /// Returns true if this error is recoverable by freeing memory.
    pub fn is_out_of_memory(&self) -> bool {
        match self {
            Self::StorageError(e) => e.is_out_of_memory(),
            _ => false,
        }
    }

    /// Returns true if this error indicates a programming or input error.
    pub fn is_programming_error(&self) -> bool {
        !self.is_out_of_memory()
    }

    /// Returns a user-friendly suggestion for resolving the error.
    pub fn suggestion(&self) -> &str {
        match self {
            Self::InvalidShape(_) => "Use extents of at least 1 in every dimension",
            Self::RaggedShape { .. } => {
                "Make every sub-list at the same nesting depth the same length"
            }
            Self::SizeMismatch { .. } => {
                "Match the literal to the target shape, or resize the target first"
            }
            Self::ShapeMismatch { .. } => "Only copy between tensors or views of identical extents",
            Self::OutOfRange { .. } => "Verify indices are within bounds (0 <= index < extent)",
            Self::StorageError(e) => e.suggestion(),
        }
    }
}

/// Returns `Ok(())` when both extent lists are equal, `ShapeMismatch` otherwise.
pub(crate) fn ensure_same_extents(expected: &[usize], actual: &[usize]) -> Result<(), TensorError> {
    if expected != actual {
        return Err(TensorError::shape_mismatch(expected, actual));
    }
    Ok(())
}

/// Returns `Ok(())` when `index < extent`, `OutOfRange` otherwise.
#[inline]
pub(crate) fn ensure_in_range(index: usize, extent: usize) -> Result<(), TensorError> {
    if index >= extent {
        return Err(TensorError::out_of_range(index, extent));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages() {
        let err = TensorError::out_of_range(4, 3);
        assert_eq!(
            err.to_string(),
            "Index 4 out of range for dimension of extent 3"
        );

        let err = TensorError::shape_mismatch(&[2, 2], &[2, 3]);
        assert_eq!(err.to_string(), "Shape mismatch: expected [2, 2], got [2, 3]");
        assert!(err.is_programming_error());
        assert!(!err.is_out_of_memory());
    }

    #[test]
    fn storage_error_from_allocator() {
        let err: TensorError = TensorAllocatorError::NullPointer.into();
        assert!(err.is_out_of_memory());
        assert_eq!(err.suggestion(), TensorAllocatorError::NullPointer.suggestion());
    }

    #[test]
    fn ensure_helpers() {
        assert!(ensure_same_extents(&[1, 2], &[1, 2]).is_ok());
        assert_eq!(
            ensure_same_extents(&[1, 2], &[2, 1]),
            Err(TensorError::shape_mismatch(&[1, 2], &[2, 1]))
        );
        assert!(ensure_in_range(2, 3).is_ok());
        assert_eq!(ensure_in_range(3, 3), Err(TensorError::out_of_range(3, 3)));
    }
}
