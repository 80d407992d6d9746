use crate::error::{ensure_in_range, TensorError};

/// Computes the sub-volumes of a row-major (C-contiguous) layout.
///
/// `sub_volumes[i]` is the number of elements spanned by dimension `i` and every
/// dimension after it, so `sub_volumes[0]` is the total element count and
/// `sub_volumes[N - 1] == extents[N - 1]`. Returns `None` when the product overflows.
///
/// # Examples
///
/// ```rust
/// use tensorlib::shape::get_sub_volumes_from_extents;
///
/// // For a 2x3x4 tensor
/// let sub_volumes = get_sub_volumes_from_extents([2, 3, 4]);
/// assert_eq!(sub_volumes, Some([24, 12, 4])); // 24 = 2*3*4, 12 = 3*4, 4 = 4
/// ```
pub fn get_sub_volumes_from_extents<const N: usize>(extents: [usize; N]) -> Option<[usize; N]> {
    let mut sub_volumes: [usize; N] = [0; N];
    let mut volume: usize = 1;
    for i in (0..N).rev() {
        volume = volume.checked_mul(extents[i])?;
        sub_volumes[i] = volume;
    }
    Some(sub_volumes)
}

/// The extents of a rank-`N` tensor together with their precomputed sub-volumes.
///
/// Keeping the suffix products next to the extents makes "how many elements live
/// below dimension `i`" an O(1) lookup, which is what sub-dimension slicing needs at
/// every rank. The two arrays never diverge: they are only ever built together.
///
/// # Examples
///
/// ```rust
/// use tensorlib::Shape;
///
/// let shape = Shape::new([3, 4, 5]).unwrap();
/// assert_eq!(shape.extents(), &[3, 4, 5]);
/// assert_eq!(shape.sub_volumes(), &[60, 20, 5]);
/// assert_eq!(shape.numel(), 60);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Shape<const N: usize> {
    extents: [usize; N],
    sub_volumes: [usize; N],
}

impl<const N: usize> Shape<N> {
    const NON_ZERO_RANK: () = assert!(N > 0, "tensor rank must be at least 1");

    /// Creates a shape from per-dimension extents.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::InvalidShape`] if an extent is zero or the element count
    /// overflows `usize`.
    pub fn new(extents: [usize; N]) -> Result<Self, TensorError> {
        #[allow(clippy::let_unit_value)]
        let () = Self::NON_ZERO_RANK;

        if extents.contains(&0) {
            return Err(TensorError::invalid_shape(&extents));
        }
        let sub_volumes = get_sub_volumes_from_extents(extents)
            .ok_or_else(|| TensorError::invalid_shape(&extents))?;

        Ok(Self {
            extents,
            sub_volumes,
        })
    }

    /// The canonical single-element shape with every extent equal to 1.
    pub fn ones() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::NON_ZERO_RANK;

        Self {
            extents: [1; N],
            sub_volumes: [1; N],
        }
    }

    /// Returns the extent of every dimension.
    #[inline]
    pub fn extents(&self) -> &[usize; N] {
        &self.extents
    }

    /// Returns the sub-volume of every dimension.
    #[inline]
    pub fn sub_volumes(&self) -> &[usize; N] {
        &self.sub_volumes
    }

    /// Returns the extent of dimension `dim`.
    ///
    /// # Panics
    ///
    /// Panics if `dim >= N`.
    #[inline]
    pub fn extent(&self, dim: usize) -> usize {
        self.extents[dim]
    }

    /// Returns the sub-volume of dimension `dim`.
    ///
    /// # Panics
    ///
    /// Panics if `dim >= N`.
    #[inline]
    pub fn sub_volume(&self, dim: usize) -> usize {
        self.sub_volumes[dim]
    }

    /// Returns the extent of the outermost dimension.
    #[inline]
    pub fn outer_extent(&self) -> usize {
        self.extents[0]
    }

    /// Returns the total number of elements.
    #[inline]
    pub fn numel(&self) -> usize {
        self.sub_volumes[0]
    }

    /// Returns the number of dimensions.
    #[inline]
    pub const fn rank(&self) -> usize {
        N
    }

    /// Borrows the shape as a rank-erased [`ShapeRef`].
    #[inline]
    pub fn shape_ref(&self) -> ShapeRef<'_> {
        ShapeRef {
            extents: &self.extents,
            sub_volumes: &self.sub_volumes,
        }
    }

    /// Converts a row-major linear offset back into a multi-index.
    ///
    /// The reverse of [`ShapeRef::offset`]. The offset is not checked.
    pub fn unravel(&self, offset: usize) -> [usize; N] {
        let view = self.shape_ref();
        let mut index = [0; N];
        let mut rem = offset;
        for (dim, idx) in index.iter_mut().enumerate() {
            let stride = view.stride(dim);
            *idx = rem / stride;
            rem %= stride;
        }
        index
    }
}

impl<const N: usize> Default for Shape<N> {
    fn default() -> Self {
        Self::ones()
    }
}

/// A borrowed suffix of a tensor's extents and sub-volumes.
///
/// Views carry a `ShapeRef` instead of their own arrays: slicing along dimension 0
/// only drops the first entry of both slices, so no shape data is copied either.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShapeRef<'a> {
    extents: &'a [usize],
    sub_volumes: &'a [usize],
}

impl<'a> ShapeRef<'a> {
    /// Creates a shape reference from two borrowed slices.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::InvalidShape`] unless both slices are non-empty, of the
    /// same length, free of zeros, and `sub_volumes` is the suffix product of `extents`.
    pub fn new(extents: &'a [usize], sub_volumes: &'a [usize]) -> Result<Self, TensorError> {
        let consistent = !extents.is_empty()
            && extents.len() == sub_volumes.len()
            && !extents.contains(&0)
            && (0..extents.len()).all(|i| {
                let below = sub_volumes.get(i + 1).copied().unwrap_or(1);
                extents[i].checked_mul(below) == Some(sub_volumes[i])
            });
        if !consistent {
            return Err(TensorError::invalid_shape(extents));
        }
        Ok(Self {
            extents,
            sub_volumes,
        })
    }

    /// Returns the number of dimensions.
    #[inline]
    pub fn rank(&self) -> usize {
        self.extents.len()
    }

    /// Returns the extent of every dimension.
    #[inline]
    pub fn extents(&self) -> &'a [usize] {
        self.extents
    }

    /// Returns the sub-volume of every dimension.
    #[inline]
    pub fn sub_volumes(&self) -> &'a [usize] {
        self.sub_volumes
    }

    /// Returns the extent of dimension `dim`.
    #[inline]
    pub fn extent(&self, dim: usize) -> usize {
        self.extents[dim]
    }

    /// Returns the sub-volume of dimension `dim`.
    #[inline]
    pub fn sub_volume(&self, dim: usize) -> usize {
        self.sub_volumes[dim]
    }

    /// Returns the extent of the outermost dimension.
    #[inline]
    pub fn outer_extent(&self) -> usize {
        self.extents[0]
    }

    /// Returns the total number of elements.
    #[inline]
    pub fn numel(&self) -> usize {
        self.sub_volumes[0]
    }

    /// Returns the number of elements skipped by one step along dimension `dim`.
    #[inline]
    pub fn stride(&self, dim: usize) -> usize {
        self.sub_volumes.get(dim + 1).copied().unwrap_or(1)
    }

    /// Returns the shape without its outermost dimension.
    #[inline]
    pub fn inner(&self) -> ShapeRef<'a> {
        debug_assert!(self.rank() > 1, "a rank-1 shape has no inner dimensions");
        ShapeRef {
            extents: &self.extents[1..],
            sub_volumes: &self.sub_volumes[1..],
        }
    }

    /// Returns the element range covered by `index` along the outermost dimension.
    #[inline]
    pub(crate) fn outer_range(&self, index: usize) -> std::ops::Range<usize> {
        let step = self.stride(0);
        index * step..index * step + step
    }

    /// Computes the row-major linear offset of a multi-index.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::OutOfRange`] for the first coordinate outside its extent,
    /// and [`TensorError::SizeMismatch`] if `index` does not have one entry per dimension.
    pub fn offset(&self, index: &[usize]) -> Result<usize, TensorError> {
        if index.len() != self.rank() {
            return Err(TensorError::size_mismatch(self.rank(), index.len()));
        }
        let mut offset = 0;
        for (dim, (&idx, &extent)) in index.iter().zip(self.extents).enumerate() {
            ensure_in_range(idx, extent)?;
            offset += idx * self.stride(dim);
        }
        Ok(offset)
    }

    /// Computes the row-major linear offset of a multi-index without checking it.
    ///
    /// Bounds are still asserted in debug builds.
    #[inline]
    pub fn offset_unchecked(&self, index: &[usize]) -> usize {
        debug_assert!(self.offset(index).is_ok(), "index {index:?} out of range");
        index
            .iter()
            .enumerate()
            .fold(0, |acc, (dim, &idx)| acc + idx * self.stride(dim))
    }

    /// Copies the borrowed arrays into an owned [`Shape`] of rank `N`.
    pub(crate) fn to_shape<const N: usize>(self) -> Shape<N> {
        debug_assert_eq!(self.rank(), N);
        Shape {
            extents: std::array::from_fn(|i| self.extents[i]),
            sub_volumes: std::array::from_fn(|i| self.sub_volumes[i]),
        }
    }
}
