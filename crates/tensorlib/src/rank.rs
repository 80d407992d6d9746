//! Slicing along the outermost dimension.
//!
//! Taking index `i` of a rank-`N` tensor or view yields a rank-`N - 1` view over
//! `sub_volume(1)` consecutive elements, and at rank 1 the element itself. Stable
//! Rust cannot name `N - 1` for a const generic `N`, so the rank-reducing methods are
//! implemented once per rank pair by a macro, on top of the
//! rank-agnostic helpers below.

use std::{
    iter::FusedIterator,
    ops::{Index, IndexMut},
    slice::{ChunksExact, ChunksExactMut},
};

use crate::{
    allocator::{CpuAllocator, TensorAllocator},
    error::{ensure_in_range, ensure_same_extents, TensorError},
    shape::{Shape, ShapeRef},
    storage::TensorStorage,
    tensor::Tensor,
    view::{source_parts, TensorLike, TensorView, TensorViewMut},
};

#[track_caller]
fn in_range<V>(result: Result<V, TensorError>) -> V {
    match result {
        Ok(value) => value,
        Err(e) => panic!("{e}"),
    }
}

fn sub_block<'a, T>(
    shape: ShapeRef<'a>,
    data: &'a [T],
    index: usize,
) -> Result<(ShapeRef<'a>, &'a [T]), TensorError> {
    ensure_in_range(index, shape.outer_extent())?;
    Ok((shape.inner(), &data[shape.outer_range(index)]))
}

fn sub_block_mut<'a, T>(
    shape: ShapeRef<'a>,
    data: &'a mut [T],
    index: usize,
) -> Result<(ShapeRef<'a>, &'a mut [T]), TensorError> {
    ensure_in_range(index, shape.outer_extent())?;
    Ok((shape.inner(), &mut data[shape.outer_range(index)]))
}

/// # Safety
///
/// `index` must be below `shape.outer_extent()`.
unsafe fn sub_block_unchecked<'a, T>(
    shape: ShapeRef<'a>,
    data: &'a [T],
    index: usize,
) -> (ShapeRef<'a>, &'a [T]) {
    debug_assert!(
        index < shape.outer_extent(),
        "index {index} out of range for dimension of extent {}",
        shape.outer_extent()
    );
    (shape.inner(), data.get_unchecked(shape.outer_range(index)))
}

/// # Safety
///
/// `index` must be below `shape.outer_extent()`.
unsafe fn sub_block_unchecked_mut<'a, T>(
    shape: ShapeRef<'a>,
    data: &'a mut [T],
    index: usize,
) -> (ShapeRef<'a>, &'a mut [T]) {
    debug_assert!(
        index < shape.outer_extent(),
        "index {index} out of range for dimension of extent {}",
        shape.outer_extent()
    );
    (shape.inner(), data.get_unchecked_mut(shape.outer_range(index)))
}

/// Iterator over the rank-`M` sub-blocks along the outermost dimension.
///
/// Returned by `outer_iter` on tensors and views.
#[derive(Clone, Debug)]
pub struct OuterIter<'a, T, const M: usize> {
    inner: ShapeRef<'a>,
    blocks: ChunksExact<'a, T>,
}

impl<'a, T, const M: usize> OuterIter<'a, T, M> {
    fn new(shape: ShapeRef<'a>, data: &'a [T]) -> Self {
        Self {
            inner: shape.inner(),
            blocks: data.chunks_exact(shape.stride(0)),
        }
    }
}

impl<'a, T, const M: usize> Iterator for OuterIter<'a, T, M> {
    type Item = TensorView<'a, T, M>;

    fn next(&mut self) -> Option<Self::Item> {
        let block = self.blocks.next()?;
        Some(TensorView::from_parts(self.inner, block))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.blocks.size_hint()
    }

    fn nth(&mut self, n: usize) -> Option<Self::Item> {
        let block = self.blocks.nth(n)?;
        Some(TensorView::from_parts(self.inner, block))
    }
}

impl<T, const M: usize> DoubleEndedIterator for OuterIter<'_, T, M> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let block = self.blocks.next_back()?;
        Some(TensorView::from_parts(self.inner, block))
    }
}

impl<T, const M: usize> ExactSizeIterator for OuterIter<'_, T, M> {}

impl<T, const M: usize> FusedIterator for OuterIter<'_, T, M> {}

/// Iterator over disjoint mutable rank-`M` sub-blocks along the outermost dimension.
///
/// Returned by `outer_iter_mut`. The yielded views never overlap, so several of them
/// can be held at once.
#[derive(Debug)]
pub struct OuterIterMut<'a, T, const M: usize> {
    inner: ShapeRef<'a>,
    blocks: ChunksExactMut<'a, T>,
}

impl<'a, T, const M: usize> OuterIterMut<'a, T, M> {
    fn new(shape: ShapeRef<'a>, data: &'a mut [T]) -> Self {
        Self {
            inner: shape.inner(),
            blocks: data.chunks_exact_mut(shape.stride(0)),
        }
    }
}

impl<'a, T, const M: usize> Iterator for OuterIterMut<'a, T, M> {
    type Item = TensorViewMut<'a, T, M>;

    fn next(&mut self) -> Option<Self::Item> {
        let block = self.blocks.next()?;
        Some(TensorViewMut::from_parts(self.inner, block))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.blocks.size_hint()
    }

    fn nth(&mut self, n: usize) -> Option<Self::Item> {
        let block = self.blocks.nth(n)?;
        Some(TensorViewMut::from_parts(self.inner, block))
    }
}

impl<T, const M: usize> DoubleEndedIterator for OuterIterMut<'_, T, M> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let block = self.blocks.next_back()?;
        Some(TensorViewMut::from_parts(self.inner, block))
    }
}

impl<T, const M: usize> ExactSizeIterator for OuterIterMut<'_, T, M> {}

impl<T, const M: usize> FusedIterator for OuterIterMut<'_, T, M> {}

/// Copies one rank-`M` part into each block along the outermost dimension.
///
/// Every part is validated before the first write.
fn replace_outer_parts<T, S, const M: usize>(
    shape: ShapeRef<'_>,
    data: &mut [T],
    parts: &[S],
) -> Result<(), TensorError>
where
    T: Clone,
    S: TensorLike<T, M>,
{
    let inner = shape.inner();
    if parts.len() != shape.outer_extent() {
        let mut actual = vec![parts.len()];
        actual.extend_from_slice(inner.extents());
        return Err(TensorError::shape_mismatch(shape.extents(), &actual));
    }
    for part in parts {
        let (part_shape, _) = source_parts::<T, S, M>(part)?;
        ensure_same_extents(inner.extents(), part_shape.extents())?;
    }
    for (block, part) in data.chunks_exact_mut(shape.stride(0)).zip(parts) {
        block.clone_from_slice(part.as_slice());
    }
    Ok(())
}

/// Builds a rank-`N` tensor whose outermost blocks are copies of the rank-`M` parts.
fn stack_parts<T, S, const M: usize, const N: usize>(
    parts: &[S],
) -> Result<Tensor<T, N, CpuAllocator>, TensorError>
where
    T: Clone,
    S: TensorLike<T, M>,
{
    debug_assert_eq!(M + 1, N);
    let first = parts.first().ok_or_else(|| TensorError::invalid_shape(&[0]))?;
    let (inner, _) = source_parts::<T, S, M>(first)?;
    for part in &parts[1..] {
        let (part_shape, _) = source_parts::<T, S, M>(part)?;
        ensure_same_extents(inner.extents(), part_shape.extents())?;
    }

    let mut extents = [0; N];
    extents[0] = parts.len();
    extents[1..].copy_from_slice(inner.extents());
    let shape = Shape::new(extents)?;

    log::debug!(
        "stacking {} parts of extents {:?}",
        parts.len(),
        inner.extents()
    );

    let step = inner.numel();
    let storage = TensorStorage::from_fn(shape.numel(), CpuAllocator, |i| {
        parts[i / step].as_slice()[i % step].clone()
    })?;
    Ok(Tensor::from_parts(shape, storage))
}

/// Implements the rank-reducing methods for each `rank => rank - 1` pair.
macro_rules! impl_rank_reduction {
    ($($n:literal => $m:literal),* $(,)?) => {
        $(
            impl<T, A: TensorAllocator> Tensor<T, $n, A> {
                /// Returns a view of the sub-block `index` along the outermost dimension.
                ///
                /// # Errors
                ///
                /// Returns [`TensorError::OutOfRange`] if `index >= outer_extent()`.
                pub fn get(&self, index: usize) -> Result<TensorView<'_, T, $m>, TensorError> {
                    let view = self.view();
                    let (shape, data) = sub_block(view.shape, view.data, index)?;
                    Ok(TensorView::from_parts(shape, data))
                }

                /// Returns a mutable view of the sub-block `index` along the outermost dimension.
                ///
                /// # Errors
                ///
                /// Returns [`TensorError::OutOfRange`] if `index >= outer_extent()`.
                pub fn get_mut(
                    &mut self,
                    index: usize,
                ) -> Result<TensorViewMut<'_, T, $m>, TensorError> {
                    let view = self.view_mut();
                    let (shape, data) = sub_block_mut(view.shape, view.data, index)?;
                    Ok(TensorViewMut::from_parts(shape, data))
                }

                /// Like [`Self::get`], for chaining.
                ///
                /// # Panics
                ///
                /// Panics with the [`TensorError::OutOfRange`] message if `index >= outer_extent()`.
                #[track_caller]
                pub fn at(&self, index: usize) -> TensorView<'_, T, $m> {
                    in_range(self.get(index))
                }

                /// Like [`Self::get_mut`], for chaining.
                ///
                /// # Panics
                ///
                /// Panics with the [`TensorError::OutOfRange`] message if `index >= outer_extent()`.
                #[track_caller]
                pub fn at_mut(&mut self, index: usize) -> TensorViewMut<'_, T, $m> {
                    in_range(self.get_mut(index))
                }

                /// Returns a view of the sub-block `index` without checking the bounds.
                ///
                /// # Safety
                ///
                /// `index` must be below `outer_extent()`. Only debug builds check it.
                pub unsafe fn get_unchecked(&self, index: usize) -> TensorView<'_, T, $m> {
                    let view = self.view();
                    let (shape, data) = sub_block_unchecked(view.shape, view.data, index);
                    TensorView::from_parts(shape, data)
                }

                /// Returns a mutable view of the sub-block `index` without checking the bounds.
                ///
                /// # Safety
                ///
                /// `index` must be below `outer_extent()`. Only debug builds check it.
                pub unsafe fn get_unchecked_mut(&mut self, index: usize) -> TensorViewMut<'_, T, $m> {
                    let view = self.view_mut();
                    let (shape, data) = sub_block_unchecked_mut(view.shape, view.data, index);
                    TensorViewMut::from_parts(shape, data)
                }

                /// Iterates over the sub-blocks along the outermost dimension.
                pub fn outer_iter(&self) -> OuterIter<'_, T, $m> {
                    let view = self.view();
                    OuterIter::new(view.shape, view.data)
                }

                /// Iterates mutably over the sub-blocks along the outermost dimension.
                ///
                /// The yielded views are disjoint, so several of them can be held at once.
                pub fn outer_iter_mut(&mut self) -> OuterIterMut<'_, T, $m> {
                    let view = self.view_mut();
                    OuterIterMut::new(view.shape, view.data)
                }

                /// Copies one part into each sub-block along the outermost dimension.
                ///
                /// # Errors
                ///
                /// Returns [`TensorError::ShapeMismatch`] unless there are exactly
                /// `outer_extent()` parts, each with the extents of a sub-block. All parts are
                /// checked before anything is written.
                pub fn replace_parts<S>(&mut self, parts: &[S]) -> Result<(), TensorError>
                where
                    T: Clone,
                    S: TensorLike<T, $m>,
                {
                    let view = self.view_mut();
                    replace_outer_parts::<T, S, $m>(view.shape, view.data, parts)
                }
            }

            impl<T> Tensor<T, $n, CpuAllocator> {
                /// Creates a tensor by stacking equally shaped parts along a new outermost dimension.
                ///
                /// # Errors
                ///
                /// Returns [`TensorError::InvalidShape`] if `parts` is empty and
                /// [`TensorError::ShapeMismatch`] if the parts differ in extents.
                pub fn stack<S>(parts: &[S]) -> Result<Self, TensorError>
                where
                    T: Clone,
                    S: TensorLike<T, $m>,
                {
                    stack_parts::<T, S, $m, $n>(parts)
                }
            }

            impl<'a, T> TensorView<'a, T, $n> {
                /// Returns a view of the sub-block `index` along the outermost dimension.
                ///
                /// # Errors
                ///
                /// Returns [`TensorError::OutOfRange`] if `index >= outer_extent()`.
                pub fn get(&self, index: usize) -> Result<TensorView<'a, T, $m>, TensorError> {
                    let (shape, data) = sub_block(self.shape, self.data, index)?;
                    Ok(TensorView::from_parts(shape, data))
                }

                /// Like [`Self::get`], panicking on an out-of-range index.
                #[track_caller]
                pub fn at(&self, index: usize) -> TensorView<'a, T, $m> {
                    in_range(self.get(index))
                }

                /// Returns a view of the sub-block `index` without checking the bounds.
                ///
                /// # Safety
                ///
                /// `index` must be below `outer_extent()`.
                pub unsafe fn get_unchecked(&self, index: usize) -> TensorView<'a, T, $m> {
                    let (shape, data) = sub_block_unchecked(self.shape, self.data, index);
                    TensorView::from_parts(shape, data)
                }

                /// Iterates over the sub-blocks along the outermost dimension.
                pub fn outer_iter(&self) -> OuterIter<'a, T, $m> {
                    OuterIter::new(self.shape, self.data)
                }
            }

            impl<'a, T> TensorViewMut<'a, T, $n> {
                /// Returns a read-only view of the sub-block `index`.
                ///
                /// # Errors
                ///
                /// Returns [`TensorError::OutOfRange`] if `index >= outer_extent()`.
                pub fn get(&self, index: usize) -> Result<TensorView<'_, T, $m>, TensorError> {
                    let (shape, data) = sub_block(self.shape, &*self.data, index)?;
                    Ok(TensorView::from_parts(shape, data))
                }

                /// Returns a mutable view of the sub-block `index`, reborrowing `self`.
                ///
                /// # Errors
                ///
                /// Returns [`TensorError::OutOfRange`] if `index >= outer_extent()`.
                pub fn get_mut(
                    &mut self,
                    index: usize,
                ) -> Result<TensorViewMut<'_, T, $m>, TensorError> {
                    let (shape, data) = sub_block_mut(self.shape, &mut *self.data, index)?;
                    Ok(TensorViewMut::from_parts(shape, data))
                }

                /// Consumes the view and returns the sub-block `index` with the original lifetime.
                ///
                /// # Errors
                ///
                /// Returns [`TensorError::OutOfRange`] if `index >= outer_extent()`.
                pub fn into_get_mut(
                    self,
                    index: usize,
                ) -> Result<TensorViewMut<'a, T, $m>, TensorError> {
                    let (shape, data) = sub_block_mut(self.shape, self.data, index)?;
                    Ok(TensorViewMut::from_parts(shape, data))
                }

                /// Like [`Self::get`], panicking on an out-of-range index.
                #[track_caller]
                pub fn at(&self, index: usize) -> TensorView<'_, T, $m> {
                    in_range(self.get(index))
                }

                /// Like [`Self::get_mut`], panicking on an out-of-range index.
                #[track_caller]
                pub fn at_mut(&mut self, index: usize) -> TensorViewMut<'_, T, $m> {
                    in_range(self.get_mut(index))
                }

                /// Like [`Self::into_get_mut`], panicking on an out-of-range index.
                #[track_caller]
                pub fn into_at_mut(self, index: usize) -> TensorViewMut<'a, T, $m> {
                    in_range(self.into_get_mut(index))
                }

                /// Returns a read-only view of the sub-block `index` without checking the bounds.
                ///
                /// # Safety
                ///
                /// `index` must be below `outer_extent()`.
                pub unsafe fn get_unchecked(&self, index: usize) -> TensorView<'_, T, $m> {
                    let (shape, data) = sub_block_unchecked(self.shape, &*self.data, index);
                    TensorView::from_parts(shape, data)
                }

                /// Returns a mutable view of the sub-block `index` without checking the bounds.
                ///
                /// # Safety
                ///
                /// `index` must be below `outer_extent()`.
                pub unsafe fn get_unchecked_mut(&mut self, index: usize) -> TensorViewMut<'_, T, $m> {
                    let (shape, data) = sub_block_unchecked_mut(self.shape, &mut *self.data, index);
                    TensorViewMut::from_parts(shape, data)
                }

                /// Iterates over the sub-blocks along the outermost dimension.
                pub fn outer_iter(&self) -> OuterIter<'_, T, $m> {
                    OuterIter::new(self.shape, &*self.data)
                }

                /// Iterates mutably over the sub-blocks along the outermost dimension.
                pub fn outer_iter_mut(&mut self) -> OuterIterMut<'_, T, $m> {
                    OuterIterMut::new(self.shape, &mut *self.data)
                }

                /// Consumes the view and iterates over its sub-blocks with the original lifetime.
                pub fn into_outer_iter_mut(self) -> OuterIterMut<'a, T, $m> {
                    OuterIterMut::new(self.shape, self.data)
                }

                /// Copies one part into each sub-block of the view.
                ///
                /// # Errors
                ///
                /// Same as [`Tensor::replace_parts`].
                pub fn replace_parts<S>(&mut self, parts: &[S]) -> Result<(), TensorError>
                where
                    T: Clone,
                    S: TensorLike<T, $m>,
                {
                    replace_outer_parts::<T, S, $m>(self.shape, &mut *self.data, parts)
                }
            }
        )*
    };
}

impl_rank_reduction!(2 => 1, 3 => 2, 4 => 3, 5 => 4, 6 => 5, 7 => 6, 8 => 7);

fn element<T>(data: &[T], index: usize) -> Result<&T, TensorError> {
    ensure_in_range(index, data.len())?;
    Ok(&data[index])
}

fn element_mut<T>(data: &mut [T], index: usize) -> Result<&mut T, TensorError> {
    ensure_in_range(index, data.len())?;
    Ok(&mut data[index])
}

impl<T, A: TensorAllocator> Tensor<T, 1, A> {
    /// Returns the element at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::OutOfRange`] if `index >= numel()`.
    pub fn get(&self, index: usize) -> Result<&T, TensorError> {
        element(self.as_slice(), index)
    }

    /// Returns the element at `index` mutably.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::OutOfRange`] if `index >= numel()`.
    pub fn get_mut(&mut self, index: usize) -> Result<&mut T, TensorError> {
        element_mut(self.as_slice_mut(), index)
    }

    /// Like [`Self::get`], panicking on an out-of-range index.
    #[track_caller]
    pub fn at(&self, index: usize) -> &T {
        in_range(self.get(index))
    }

    /// Like [`Self::get_mut`], panicking on an out-of-range index.
    #[track_caller]
    pub fn at_mut(&mut self, index: usize) -> &mut T {
        in_range(self.get_mut(index))
    }

    /// Returns the element at `index` without checking the bounds.
    ///
    /// # Safety
    ///
    /// `index` must be below `numel()`. Only debug builds check it.
    pub unsafe fn get_unchecked(&self, index: usize) -> &T {
        debug_assert!(index < self.numel());
        self.as_slice().get_unchecked(index)
    }

    /// Returns the element at `index` mutably without checking the bounds.
    ///
    /// # Safety
    ///
    /// `index` must be below `numel()`. Only debug builds check it.
    pub unsafe fn get_unchecked_mut(&mut self, index: usize) -> &mut T {
        debug_assert!(index < self.numel());
        self.as_slice_mut().get_unchecked_mut(index)
    }
}

impl<T, A: TensorAllocator> Index<usize> for Tensor<T, 1, A> {
    type Output = T;

    #[track_caller]
    fn index(&self, index: usize) -> &T {
        self.at(index)
    }
}

impl<T, A: TensorAllocator> IndexMut<usize> for Tensor<T, 1, A> {
    #[track_caller]
    fn index_mut(&mut self, index: usize) -> &mut T {
        self.at_mut(index)
    }
}

impl<'a, T> TensorView<'a, T, 1> {
    /// Returns the element at `index` with the lifetime of the underlying tensor.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::OutOfRange`] if `index >= numel()`.
    pub fn get(&self, index: usize) -> Result<&'a T, TensorError> {
        element(self.data, index)
    }

    /// Like [`Self::get`], panicking on an out-of-range index.
    #[track_caller]
    pub fn at(&self, index: usize) -> &'a T {
        in_range(self.get(index))
    }

    /// Returns the element at `index` without checking the bounds.
    ///
    /// # Safety
    ///
    /// `index` must be below `numel()`.
    pub unsafe fn get_unchecked(&self, index: usize) -> &'a T {
        debug_assert!(index < self.data.len());
        self.data.get_unchecked(index)
    }
}

impl<T> Index<usize> for TensorView<'_, T, 1> {
    type Output = T;

    #[track_caller]
    fn index(&self, index: usize) -> &T {
        self.at(index)
    }
}

impl<'a, T> TensorViewMut<'a, T, 1> {
    /// Returns the element at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::OutOfRange`] if `index >= numel()`.
    pub fn get(&self, index: usize) -> Result<&T, TensorError> {
        element(&*self.data, index)
    }

    /// Returns the element at `index` mutably.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::OutOfRange`] if `index >= numel()`.
    pub fn get_mut(&mut self, index: usize) -> Result<&mut T, TensorError> {
        element_mut(&mut *self.data, index)
    }

    /// Consumes the view and returns the element at `index` with the original lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::OutOfRange`] if `index >= numel()`.
    pub fn into_get_mut(self, index: usize) -> Result<&'a mut T, TensorError> {
        element_mut(self.data, index)
    }

    /// Like [`Self::get`], panicking on an out-of-range index.
    #[track_caller]
    pub fn at(&self, index: usize) -> &T {
        in_range(self.get(index))
    }

    /// Like [`Self::get_mut`], panicking on an out-of-range index.
    #[track_caller]
    pub fn at_mut(&mut self, index: usize) -> &mut T {
        in_range(self.get_mut(index))
    }

    /// Like [`Self::into_get_mut`], panicking on an out-of-range index.
    #[track_caller]
    pub fn into_at_mut(self, index: usize) -> &'a mut T {
        in_range(self.into_get_mut(index))
    }

    /// Returns the element at `index` without checking the bounds.
    ///
    /// # Safety
    ///
    /// `index` must be below `numel()`.
    pub unsafe fn get_unchecked(&self, index: usize) -> &T {
        debug_assert!(index < self.data.len());
        self.data.get_unchecked(index)
    }

    /// Returns the element at `index` mutably without checking the bounds.
    ///
    /// # Safety
    ///
    /// `index` must be below `numel()`.
    pub unsafe fn get_unchecked_mut(&mut self, index: usize) -> &mut T {
        debug_assert!(index < self.data.len());
        self.data.get_unchecked_mut(index)
    }
}

impl<T> Index<usize> for TensorViewMut<'_, T, 1> {
    type Output = T;

    #[track_caller]
    fn index(&self, index: usize) -> &T {
        self.at(index)
    }
}

impl<T> IndexMut<usize> for TensorViewMut<'_, T, 1> {
    #[track_caller]
    fn index_mut(&mut self, index: usize) -> &mut T {
        self.at_mut(index)
    }
}
