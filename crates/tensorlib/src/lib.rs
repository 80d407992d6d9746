#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Overview
//!
//! `tensorlib` replaces nested `Vec<Vec<Vec<T>>>` structures with a single
//! contiguous, row-major heap buffer while keeping what makes nested vectors
//! convenient: initialization from nested literals and chained per-dimension
//! indexing.
//!
//! # Architecture
//!
//! - **Tensor**: the owning rank-`N` array, generic over its element type and allocator
//! - **TensorView / TensorViewMut**: borrowed windows over a contiguous block of a tensor,
//!   produced by slicing along the outermost dimension without copying
//! - **Shape / ShapeRef**: extents plus their suffix products ("sub-volumes"), which make
//!   every slice an O(1) offset computation
//! - **TensorStorage / TensorAllocator**: the single owned buffer and the allocator behind it
//! - **NestedList**: nested `Vec`s, arrays and slices accepted as tensor literals
//!
//! # Quick Start
//!
//! ```rust
//! use tensorlib::{Tensor2, Tensor3};
//!
//! let mut t = Tensor3::<i32>::from_nested(&[[[1, 2], [3, 4]], [[5, 6], [7, 8]]]).unwrap();
//!
//! // chained indexing, one dimension at a time
//! assert_eq!(*t.at(1).at(0).at(1), 6);
//! assert_eq!(t.at(0).numel(), 4);
//!
//! // writes through a view land in the tensor
//! t.at_mut(0).assign_nested(&[[9, 9], [9, 9]]).unwrap();
//! assert_eq!(&t.as_slice()[..4], &[9, 9, 9, 9]);
//!
//! // copies between equally shaped tensors and views are checked
//! let mut m = Tensor2::<i32>::new([2, 2]).unwrap();
//! m.replace(&t.at(1)).unwrap();
//! assert_eq!(m.as_slice(), &[5, 6, 7, 8]);
//! assert!(m.replace(&Tensor2::<i32>::new([4, 1]).unwrap()).is_err());
//! ```
//!
//! # Type Aliases
//!
//! - [`Tensor1`] to [`Tensor5`]: tensors of rank 1 to 5 on the [`CpuAllocator`]
//!   unless another allocator is given

/// Allocator module containing memory management utilities.
///
/// This module provides the [`TensorAllocator`] trait and the default [`CpuAllocator`]
/// backed by the global allocator.
pub mod allocator;

/// Bincode module for binary serialization and deserialization.
///
/// This module provides binary serialization support for tensors when the
/// `bincode` feature is enabled.
#[cfg(feature = "bincode")]
pub mod bincode;

/// Error types for tensor operations.
pub mod error;

/// Nested list literals accepted by [`Tensor::from_nested`] and `assign_nested`.
pub mod nested;

/// Rank-reducing access (`get`, `at`, `outer_iter`, `stack`, ...) for ranks 1 to 8.
pub mod rank;

/// Serde module for JSON/other format serialization and deserialization.
///
/// This module provides serialization support for tensors when the `serde` feature
/// is enabled.
#[cfg(feature = "serde")]
pub mod serde;

/// Shape module with the extent and sub-volume bookkeeping shared by tensors and views.
pub mod shape;

/// Storage module containing the owned element buffer.
///
/// This module provides [`storage::TensorStorage`], which allocates, initializes and
/// releases the contiguous buffer of a tensor.
pub mod storage;

/// Tensor module containing the owning tensor type.
pub mod tensor;

/// View module containing the non-owning tensor views.
///
/// This module provides [`TensorView`] and [`TensorViewMut`], the [`TensorLike`] trait
/// and the [`view::swap`] function.
pub mod view;

pub use crate::allocator::{CpuAllocator, TensorAllocator, TensorAllocatorError};
pub use crate::error::TensorError;
pub use crate::nested::NestedList;
pub use crate::rank::{OuterIter, OuterIterMut};
pub use crate::shape::{Shape, ShapeRef};
pub use crate::tensor::Tensor;
pub use crate::view::{TensorLike, TensorView, TensorViewMut};

/// Type alias for a 1-dimensional tensor.
pub type Tensor1<T, A = CpuAllocator> = Tensor<T, 1, A>;

/// Type alias for a 2-dimensional tensor.
pub type Tensor2<T, A = CpuAllocator> = Tensor<T, 2, A>;

/// Type alias for a 3-dimensional tensor.
pub type Tensor3<T, A = CpuAllocator> = Tensor<T, 3, A>;

/// Type alias for a 4-dimensional tensor.
pub type Tensor4<T, A = CpuAllocator> = Tensor<T, 4, A>;

/// Type alias for a 5-dimensional tensor.
pub type Tensor5<T, A = CpuAllocator> = Tensor<T, 5, A>;
