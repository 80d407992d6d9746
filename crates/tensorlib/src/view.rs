use std::ops::{Index, IndexMut};

use crate::{
    allocator::CpuAllocator,
    error::{ensure_in_range, ensure_same_extents, TensorError},
    nested::NestedList,
    shape::ShapeRef,
    tensor::Tensor,
};

/// Read access shared by tensors and views of rank `N`.
///
/// Anything implementing this trait can be the source of a validated copy
/// ([`Tensor::replace`], [`TensorViewMut::replace`], `replace_parts`, `stack`) or be
/// materialized with [`Tensor::from_view`].
pub trait TensorLike<T, const N: usize> {
    /// Returns the extents and sub-volumes of the source.
    fn shape_ref(&self) -> ShapeRef<'_>;

    /// Returns the elements of the source in row-major order.
    fn as_slice(&self) -> &[T];
}

impl<T, const N: usize, S> TensorLike<T, N> for &S
where
    S: TensorLike<T, N> + ?Sized,
{
    fn shape_ref(&self) -> ShapeRef<'_> {
        (**self).shape_ref()
    }

    fn as_slice(&self) -> &[T] {
        (**self).as_slice()
    }
}

/// A read-only, non-owning rank-`N` window into a tensor.
///
/// Views are produced by slicing ([`Tensor::get`], [`Tensor::at`], `outer_iter`) or
/// by [`Tensor::view`], and borrow both the element buffer and the shape arrays of
/// their owner. A view can therefore never outlive, or observe a resize of, the
/// tensor it was taken from.
///
/// `TensorView` is `Copy`: passing it around costs two slices.
///
/// # Examples
///
/// ```rust
/// use tensorlib::Tensor3;
///
/// let t = Tensor3::<i32>::from_nested(&[[[1, 2], [3, 4]], [[5, 6], [7, 8]]]).unwrap();
/// let block = t.at(1);
/// assert_eq!(block.extents(), &[2, 2]);
/// assert_eq!(block.as_slice(), &[5, 6, 7, 8]);
/// assert_eq!(*block.at(0).at(1), 6);
/// ```
pub struct TensorView<'a, T, const N: usize> {
    pub(crate) shape: ShapeRef<'a>,
    pub(crate) data: &'a [T],
}

impl<T, const N: usize> Clone for TensorView<'_, T, N> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, const N: usize> Copy for TensorView<'_, T, N> {}

/// A mutable, non-owning rank-`N` window into a tensor.
///
/// Writes through the view land in the owner's buffer. Assigning one view to
/// another only rebinds it (see [`TensorViewMut::rebind`]); element data is
/// written with indexing, [`TensorViewMut::assign_flat`],
/// [`TensorViewMut::assign_nested`], [`TensorViewMut::replace`] or
/// [`TensorViewMut::fill`].
///
/// # Examples
///
/// ```rust
/// use tensorlib::Tensor2;
///
/// let mut t = Tensor2::<i32>::new([2, 3]).unwrap();
/// t.at_mut(1).assign_flat(&[4, 5, 6]).unwrap();
/// assert_eq!(t.as_slice(), &[0, 0, 0, 4, 5, 6]);
/// ```
pub struct TensorViewMut<'a, T, const N: usize> {
    pub(crate) shape: ShapeRef<'a>,
    pub(crate) data: &'a mut [T],
}

/// Validates that a borrowed shape describes a rank-`n` block of `len` elements.
fn check_parts(shape: ShapeRef<'_>, n: usize, len: usize) -> Result<(), TensorError> {
    if shape.rank() != n {
        return Err(TensorError::invalid_shape(shape.extents()));
    }
    if shape.numel() != len {
        return Err(TensorError::size_mismatch(shape.numel(), len));
    }
    Ok(())
}

/// Returns the shape and row-major elements of a copy source after checking that they agree.
pub(crate) fn source_parts<T, S, const N: usize>(
    src: &S,
) -> Result<(ShapeRef<'_>, &[T]), TensorError>
where
    S: TensorLike<T, N> + ?Sized,
{
    let (shape, data) = (src.shape_ref(), src.as_slice());
    check_parts(shape, N, data.len())?;
    Ok((shape, data))
}

#[track_caller]
pub(crate) fn offset_or_panic(shape: ShapeRef<'_>, index: &[usize]) -> usize {
    match shape.offset(index) {
        Ok(offset) => offset,
        Err(e) => panic!("{e}"),
    }
}

/// Writes `[a, b], [c, d]` style nested brackets for a row-major block.
pub(crate) fn fmt_nested<T: std::fmt::Display>(
    f: &mut std::fmt::Formatter<'_>,
    extents: &[usize],
    data: &[T],
) -> std::fmt::Result {
    write!(f, "[")?;
    if extents.len() == 1 {
        for (i, value) in data.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{value}")?;
        }
    } else {
        let step = data.len() / extents[0];
        for (i, chunk) in data.chunks_exact(step).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            fmt_nested(f, &extents[1..], chunk)?;
        }
    }
    write!(f, "]")
}

// Copies a nested literal into a buffer whose extents were already checked.
pub(crate) fn copy_nested<T, L, const N: usize>(dst: &mut [T], literal: &L)
where
    T: Clone,
    L: NestedList<T, N> + ?Sized,
{
    let mut slots = dst.iter_mut();
    literal.for_each_element(&mut |value| {
        if let Some(slot) = slots.next() {
            slot.clone_from(value);
        }
    });
}

pub(crate) fn swap_outer_blocks<T>(
    shape: ShapeRef<'_>,
    data: &mut [T],
    i: usize,
    j: usize,
) -> Result<(), TensorError> {
    ensure_in_range(i, shape.outer_extent())?;
    ensure_in_range(j, shape.outer_extent())?;
    if i == j {
        return Ok(());
    }
    let (lo, hi) = (i.min(j), i.max(j));
    let step = shape.stride(0);
    let (head, tail) = data.split_at_mut(hi * step);
    head[shape.outer_range(lo)].swap_with_slice(&mut tail[..step]);
    Ok(())
}

macro_rules! impl_view_read {
    ($view:ident) => {
        impl<'a, T, const N: usize> $view<'a, T, N> {
            /// Returns the borrowed shape of the view.
            #[inline]
            pub fn shape_ref(&self) -> ShapeRef<'a> {
                self.shape
            }

            /// Returns the extent of dimension `dim`.
            #[inline]
            pub fn extent(&self, dim: usize) -> usize {
                self.shape.extent(dim)
            }

            /// Returns the number of elements spanned by dimension `dim` and the ones after it.
            #[inline]
            pub fn sub_volume(&self, dim: usize) -> usize {
                self.shape.sub_volume(dim)
            }

            /// Returns the extent of every dimension.
            #[inline]
            pub fn extents(&self) -> &'a [usize] {
                self.shape.extents()
            }

            /// Returns the sub-volume of every dimension.
            #[inline]
            pub fn sub_volumes(&self) -> &'a [usize] {
                self.shape.sub_volumes()
            }

            /// Returns the extent of the outermost dimension.
            #[inline]
            pub fn outer_extent(&self) -> usize {
                self.shape.outer_extent()
            }

            /// Returns the number of elements in the view.
            #[inline]
            pub fn numel(&self) -> usize {
                self.data.len()
            }

            /// Returns the number of dimensions.
            #[inline]
            pub const fn rank(&self) -> usize {
                N
            }

            /// Returns the elements of the view in row-major order.
            #[inline]
            pub fn as_slice(&self) -> &[T] {
                &self.data[..]
            }

            /// Returns a pointer to the first element of the view.
            #[inline]
            pub fn as_ptr(&self) -> *const T {
                self.data.as_ptr()
            }

            /// Iterates over the elements of the view in row-major order.
            #[inline]
            pub fn iter(&self) -> std::slice::Iter<'_, T> {
                self.data.iter()
            }

            /// Returns the element at a full multi-index.
            ///
            /// # Errors
            ///
            /// Returns [`TensorError::OutOfRange`] if a coordinate exceeds its extent.
            pub fn element(&self, index: [usize; N]) -> Result<&T, TensorError> {
                let offset = self.shape.offset(&index)?;
                Ok(&self.data[offset])
            }

            /// Whether the view has rank 2.
            pub fn is_matrix(&self) -> bool {
                N == 2
            }

            /// Whether the view has rank 2 and both extents are equal.
            pub fn is_square_matrix(&self) -> bool {
                N == 2 && self.extent(0) == self.extent(1)
            }

            /// Copies the view into a new owning tensor.
            ///
            /// # Errors
            ///
            /// Returns [`TensorError::StorageError`] if the allocation fails.
            pub fn to_tensor(&self) -> Result<Tensor<T, N, CpuAllocator>, TensorError>
            where
                T: Clone,
            {
                Tensor::from_view(self)
            }
        }

        impl<T, const N: usize> TensorLike<T, N> for $view<'_, T, N> {
            fn shape_ref(&self) -> ShapeRef<'_> {
                self.shape
            }

            fn as_slice(&self) -> &[T] {
                &self.data[..]
            }
        }

        impl<T, const N: usize> Index<[usize; N]> for $view<'_, T, N> {
            type Output = T;

            #[track_caller]
            fn index(&self, index: [usize; N]) -> &T {
                &self.data[offset_or_panic(self.shape, &index)]
            }
        }

        impl<T: PartialEq, const N: usize> PartialEq for $view<'_, T, N> {
            fn eq(&self, other: &Self) -> bool {
                self.extents() == other.extents() && self.as_slice() == other.as_slice()
            }
        }

        impl<T: std::fmt::Debug, const N: usize> std::fmt::Debug for $view<'_, T, N> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($view))
                    .field("extents", &self.extents())
                    .field("data", &self.as_slice())
                    .finish()
            }
        }

        impl<T: std::fmt::Display, const N: usize> std::fmt::Display for $view<'_, T, N> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                fmt_nested(f, self.extents(), self.as_slice())
            }
        }
    };
}

impl_view_read!(TensorView);
impl_view_read!(TensorViewMut);

impl<'a, T, const N: usize> TensorView<'a, T, N> {
    /// Creates a view from a borrowed shape and the elements it covers.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::InvalidShape`] if the shape does not have rank `N` and
    /// [`TensorError::SizeMismatch`] if `data` does not hold exactly `numel` elements.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tensorlib::{ShapeRef, TensorView};
    ///
    /// let data = [1, 2, 3, 4, 5, 6];
    /// let shape = ShapeRef::new(&[2, 3], &[6, 3]).unwrap();
    /// let view = TensorView::<i32, 2>::new(shape, &data).unwrap();
    /// assert_eq!(view[[1, 0]], 4);
    /// ```
    pub fn new(shape: ShapeRef<'a>, data: &'a [T]) -> Result<Self, TensorError> {
        check_parts(shape, N, data.len())?;
        Ok(Self { shape, data })
    }

    /// Builds a view from parts that are already known to be consistent.
    #[inline]
    pub(crate) fn from_parts(shape: ShapeRef<'a>, data: &'a [T]) -> Self {
        debug_assert_eq!(shape.rank(), N);
        debug_assert_eq!(shape.numel(), data.len());
        Self { shape, data }
    }

    /// Returns the elements with the lifetime of the underlying tensor.
    #[inline]
    pub fn into_slice(self) -> &'a [T] {
        self.data
    }
}

impl<'a, T, const N: usize> IntoIterator for TensorView<'a, T, N> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

impl<'a, T, const N: usize> From<TensorViewMut<'a, T, N>> for TensorView<'a, T, N> {
    fn from(view: TensorViewMut<'a, T, N>) -> Self {
        Self {
            shape: view.shape,
            data: view.data,
        }
    }
}

impl<'a, T, const N: usize> TensorViewMut<'a, T, N> {
    /// Creates a mutable view from a borrowed shape and the elements it covers.
    ///
    /// # Errors
    ///
    /// Same as [`TensorView::new`].
    pub fn new(shape: ShapeRef<'a>, data: &'a mut [T]) -> Result<Self, TensorError> {
        check_parts(shape, N, data.len())?;
        Ok(Self { shape, data })
    }

    #[inline]
    pub(crate) fn from_parts(shape: ShapeRef<'a>, data: &'a mut [T]) -> Self {
        debug_assert_eq!(shape.rank(), N);
        debug_assert_eq!(shape.numel(), data.len());
        Self { shape, data }
    }

    /// Points this view at another block without touching any element.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tensorlib::Tensor2;
    ///
    /// let mut t = Tensor2::<i32>::from_nested(&[[1, 2], [3, 4]]).unwrap();
    /// let (first, second) = {
    ///     let mut rows = t.outer_iter_mut();
    ///     (rows.next().unwrap(), rows.next().unwrap())
    /// };
    /// let mut row = first;
    /// row.rebind(second);
    /// assert_eq!(row.as_slice(), &[3, 4]);
    /// ```
    #[inline]
    pub fn rebind(&mut self, other: TensorViewMut<'a, T, N>) {
        *self = other;
    }

    /// Reborrows the view for a shorter lifetime, leaving `self` usable afterwards.
    #[inline]
    pub fn reborrow(&mut self) -> TensorViewMut<'_, T, N> {
        TensorViewMut {
            shape: self.shape,
            data: &mut *self.data,
        }
    }

    /// Returns a read-only view of the same block.
    #[inline]
    pub fn as_view(&self) -> TensorView<'_, T, N> {
        TensorView {
            shape: self.shape,
            data: &*self.data,
        }
    }

    /// Returns the elements as a mutable slice.
    #[inline]
    pub fn as_slice_mut(&mut self) -> &mut [T] {
        &mut *self.data
    }

    /// Returns the mutable elements with the lifetime of the underlying tensor.
    #[inline]
    pub fn into_slice_mut(self) -> &'a mut [T] {
        self.data
    }

    /// Returns a mutable pointer to the first element of the view.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.data.as_mut_ptr()
    }

    /// Iterates mutably over the elements of the view in row-major order.
    #[inline]
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.data.iter_mut()
    }

    /// Returns the element at a full multi-index mutably.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::OutOfRange`] if a coordinate exceeds its extent.
    pub fn element_mut(&mut self, index: [usize; N]) -> Result<&mut T, TensorError> {
        let offset = self.shape.offset(&index)?;
        Ok(&mut self.data[offset])
    }

    /// Copies a flat row-major buffer into the view.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::SizeMismatch`] unless `data.len() == numel()`; the view
    /// is not modified in that case.
    pub fn assign_flat(&mut self, data: &[T]) -> Result<(), TensorError>
    where
        T: Clone,
    {
        if data.len() != self.data.len() {
            return Err(TensorError::size_mismatch(self.data.len(), data.len()));
        }
        self.data.clone_from_slice(data);
        Ok(())
    }

    /// Copies a nested literal of the same rank into the view.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::SizeMismatch`] for the first list whose width differs
    /// from the extent at its depth; nothing is written in that case.
    pub fn assign_nested<L>(&mut self, literal: &L) -> Result<(), TensorError>
    where
        T: Clone,
        L: NestedList<T, N> + ?Sized,
    {
        literal.check_extents(self.shape.extents(), 0)?;
        copy_nested::<T, L, N>(self.data, literal);
        Ok(())
    }

    /// Copies the values of another tensor or view of identical extents.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::ShapeMismatch`] if the extents differ; nothing is
    /// written in that case.
    pub fn replace<S>(&mut self, src: &S) -> Result<(), TensorError>
    where
        T: Clone,
        S: TensorLike<T, N> + ?Sized,
    {
        let (shape, data) = source_parts::<T, S, N>(src)?;
        ensure_same_extents(self.shape.extents(), shape.extents())?;
        self.data.clone_from_slice(data);
        Ok(())
    }

    /// Sets every element of the view to `value`.
    pub fn fill(&mut self, value: T)
    where
        T: Clone,
    {
        self.data.fill(value);
    }

    /// Exchanges the values of the sub-blocks `i` and `j` along the outermost dimension.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::OutOfRange`] if either index exceeds `outer_extent()`.
    pub fn swap_outer(&mut self, i: usize, j: usize) -> Result<(), TensorError> {
        swap_outer_blocks(self.shape, self.data, i, j)
    }
}

impl<T, const N: usize> IndexMut<[usize; N]> for TensorViewMut<'_, T, N> {
    #[track_caller]
    fn index_mut(&mut self, index: [usize; N]) -> &mut T {
        &mut self.data[offset_or_panic(self.shape, &index)]
    }
}

/// Exchanges the values referenced by two mutable views of the same extents.
///
/// The views keep pointing at their own blocks; only the elements move.
///
/// # Errors
///
/// Returns [`TensorError::ShapeMismatch`] if the extents differ; neither view is
/// modified in that case.
///
/// # Example
///
/// ```rust
/// use tensorlib::{view::swap, Tensor3};
///
/// let mut t = Tensor3::<i32>::from_nested(&[[[1, 2], [3, 4]], [[5, 6], [7, 8]]]).unwrap();
/// let mut blocks = t.outer_iter_mut();
/// let (mut a, mut b) = (blocks.next().unwrap(), blocks.next().unwrap());
/// swap(&mut a, &mut b).unwrap();
/// assert_eq!(t.as_slice(), &[5, 6, 7, 8, 1, 2, 3, 4]);
/// ```
pub fn swap<T, const N: usize>(
    left: &mut TensorViewMut<'_, T, N>,
    right: &mut TensorViewMut<'_, T, N>,
) -> Result<(), TensorError> {
    ensure_same_extents(left.extents(), right.extents())?;
    left.data.swap_with_slice(right.data);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Shape;

    #[test]
    fn view_from_parts() -> Result<(), TensorError> {
        let shape = Shape::new([2, 3])?;
        let data = [1, 2, 3, 4, 5, 6];
        let view = TensorView::<i32, 2>::new(shape.shape_ref(), &data)?;
        assert_eq!(view.extents(), &[2, 3]);
        assert_eq!(view.sub_volumes(), &[6, 3]);
        assert_eq!(view.numel(), 6);
        assert_eq!(view.outer_extent(), 2);
        assert_eq!(view[[1, 2]], 6);
        assert_eq!(view.element([0, 1])?, &2);
        assert_eq!(view.element([2, 0]), Err(TensorError::out_of_range(2, 2)));
        assert!(view.is_matrix());
        assert!(!view.is_square_matrix());
        Ok(())
    }

    #[test]
    fn view_rejects_inconsistent_parts() -> Result<(), TensorError> {
        let shape = Shape::new([2, 3])?;
        let data = [0u8; 5];
        assert_eq!(
            TensorView::<u8, 2>::new(shape.shape_ref(), &data).err(),
            Some(TensorError::size_mismatch(6, 5))
        );
        let data = [0u8; 6];
        assert_eq!(
            TensorView::<u8, 3>::new(shape.shape_ref(), &data).err(),
            Some(TensorError::invalid_shape(&[2, 3]))
        );
        Ok(())
    }

    #[test]
    fn view_mut_writes_through() -> Result<(), TensorError> {
        let shape = Shape::new([2, 2])?;
        let mut data = [0; 4];
        let mut view = TensorViewMut::<i32, 2>::new(shape.shape_ref(), &mut data)?;
        view[[0, 1]] = 7;
        *view.element_mut([1, 0])? = 9;
        assert_eq!(view.as_view().as_slice(), &[0, 7, 9, 0]);
        view.fill(3);
        assert_eq!(data, [3; 4]);
        Ok(())
    }

    #[test]
    fn assign_flat_checks_length() -> Result<(), TensorError> {
        let shape = Shape::new([4])?;
        let mut data = [1, 2, 3, 4];
        let mut view = TensorViewMut::<i32, 1>::new(shape.shape_ref(), &mut data)?;
        assert_eq!(
            view.assign_flat(&[9, 9, 9]),
            Err(TensorError::size_mismatch(4, 3))
        );
        assert_eq!(view.as_slice(), &[1, 2, 3, 4]);
        view.assign_flat(&[5, 6, 7, 8])?;
        assert_eq!(data, [5, 6, 7, 8]);
        Ok(())
    }

    #[test]
    fn assign_nested_checks_widths() -> Result<(), TensorError> {
        let shape = Shape::new([2, 2])?;
        let mut data = [0; 4];
        let mut view = TensorViewMut::<i32, 2>::new(shape.shape_ref(), &mut data)?;
        assert_eq!(
            view.assign_nested(&vec![vec![1, 2, 3], vec![4, 5, 6]]),
            Err(TensorError::size_mismatch(2, 3))
        );
        assert_eq!(view.as_slice(), &[0; 4]);
        view.assign_nested(&[[1, 2], [3, 4]])?;
        assert_eq!(data, [1, 2, 3, 4]);
        Ok(())
    }

    #[test]
    fn replace_requires_equal_extents() -> Result<(), TensorError> {
        let dst_shape = Shape::new([2, 2])?;
        let src_shape = Shape::new([1, 4])?;
        let mut dst = [0; 4];
        let src = [1, 2, 3, 4];
        let mut view = TensorViewMut::<i32, 2>::new(dst_shape.shape_ref(), &mut dst)?;
        let source = TensorView::<i32, 2>::new(src_shape.shape_ref(), &src)?;
        assert_eq!(
            view.replace(&source),
            Err(TensorError::shape_mismatch(&[2, 2], &[1, 4]))
        );
        assert_eq!(view.as_slice(), &[0; 4]);
        Ok(())
    }

    #[test]
    fn swap_exchanges_values() -> Result<(), TensorError> {
        let shape = Shape::new([3])?;
        let mut a = [1, 2, 3];
        let mut b = [4, 5, 6];
        let mut left = TensorViewMut::<i32, 1>::new(shape.shape_ref(), &mut a)?;
        let mut right = TensorViewMut::<i32, 1>::new(shape.shape_ref(), &mut b)?;
        swap(&mut left, &mut right)?;
        assert_eq!(left.as_slice(), &[4, 5, 6]);
        assert_eq!(right.as_slice(), &[1, 2, 3]);
        Ok(())
    }

    #[test]
    fn swap_rejects_mismatched_views() -> Result<(), TensorError> {
        let long = Shape::new([3])?;
        let short = Shape::new([2])?;
        let mut a = [1, 2, 3];
        let mut b = [4, 5];
        let mut left = TensorViewMut::<i32, 1>::new(long.shape_ref(), &mut a)?;
        let mut right = TensorViewMut::<i32, 1>::new(short.shape_ref(), &mut b)?;
        assert_eq!(
            swap(&mut left, &mut right),
            Err(TensorError::shape_mismatch(&[3], &[2]))
        );
        assert_eq!(a, [1, 2, 3]);
        assert_eq!(b, [4, 5]);
        Ok(())
    }

    #[test]
    fn swap_outer_blocks_in_place() -> Result<(), TensorError> {
        let shape = Shape::new([3, 2])?;
        let mut data = [1, 2, 3, 4, 5, 6];
        let mut view = TensorViewMut::<i32, 2>::new(shape.shape_ref(), &mut data)?;
        view.swap_outer(2, 0)?;
        assert_eq!(view.as_slice(), &[5, 6, 3, 4, 1, 2]);
        view.swap_outer(1, 1)?;
        assert_eq!(view.swap_outer(0, 3), Err(TensorError::out_of_range(3, 3)));
        assert_eq!(data, [5, 6, 3, 4, 1, 2]);
        Ok(())
    }

    #[test]
    fn display_nested_brackets() -> Result<(), TensorError> {
        let shape = Shape::new([2, 1, 2])?;
        let data = [1, 2, 3, 4];
        let view = TensorView::<i32, 3>::new(shape.shape_ref(), &data)?;
        assert_eq!(view.to_string(), "[[[1, 2]], [[3, 4]]]");
        Ok(())
    }

    #[test]
    fn read_only_from_mutable() -> Result<(), TensorError> {
        let shape = Shape::new([2])?;
        let mut data = [1, 2];
        let view_mut = TensorViewMut::<i32, 1>::new(shape.shape_ref(), &mut data)?;
        let view: TensorView<'_, i32, 1> = view_mut.into();
        let copy = view;
        assert_eq!(copy, view);
        assert_eq!(view.into_iter().copied().collect::<Vec<_>>(), vec![1, 2]);
        Ok(())
    }

    /// A copy source whose buffer disagrees with its shape.
    struct Inconsistent<const R: usize> {
        shape: Shape<R>,
        data: Vec<i32>,
    }

    impl<const R: usize, const N: usize> TensorLike<i32, N> for Inconsistent<R> {
        fn shape_ref(&self) -> ShapeRef<'_> {
            self.shape.shape_ref()
        }

        fn as_slice(&self) -> &[i32] {
            &self.data
        }
    }

    #[test]
    fn inconsistent_sources_are_rejected() -> Result<(), TensorError> {
        let short = Inconsistent {
            shape: Shape::new([2, 2])?,
            data: vec![1, 2, 3],
        };
        let mismatch = || TensorError::size_mismatch(4, 3);

        let mut t = Tensor::<i32, 2>::new([2, 2])?;
        assert_eq!(t.replace(&short), Err(mismatch()));
        assert_eq!(t.view_mut().replace(&short), Err(mismatch()));
        assert_eq!(Tensor::<i32, 2>::from_view(&short).err(), Some(mismatch()));
        assert_eq!(Tensor::<i32, 3>::stack(&[&short]).err(), Some(mismatch()));

        let mut cube = Tensor::<i32, 3>::new([1, 2, 2])?;
        assert_eq!(cube.replace_parts(&[&short]), Err(mismatch()));

        let deep = Inconsistent {
            shape: Shape::new([1, 2, 2])?,
            data: vec![5; 4],
        };
        assert_eq!(t.replace(&deep), Err(TensorError::invalid_shape(&[1, 2, 2])));

        assert_eq!(t.as_slice(), &[0; 4]);
        assert_eq!(cube.as_slice(), &[0; 4]);
        Ok(())
    }
}
