use std::ops::{Index, IndexMut};

use num_traits::{One, Zero};

use crate::{
    allocator::{CpuAllocator, TensorAllocator},
    error::{ensure_same_extents, TensorError},
    nested::{infer_shape, NestedList},
    shape::{Shape, ShapeRef},
    storage::TensorStorage,
    view::{
        copy_nested, fmt_nested, offset_or_panic, source_parts, swap_outer_blocks, TensorLike,
        TensorView, TensorViewMut,
    },
};

/// A rank-`N` array of `T` stored in one contiguous, row-major heap buffer.
///
/// The tensor owns its elements and its [`Shape`]. Slicing along the outermost
/// dimension ([`Tensor::get`], [`Tensor::at`] and their mutable forms) yields
/// [`TensorView`]s or [`TensorViewMut`]s of rank `N - 1` that borrow the same buffer,
/// down to plain `&T` / `&mut T` at rank 1, so nested-vector style indexing never
/// copies data.
///
/// # Type Parameters
///
/// * `T` - The element type.
/// * `N` - The rank (number of dimensions), at least 1.
/// * `A` - The allocator that owns the buffer, [`CpuAllocator`] by default.
///
/// # Examples
///
/// ```rust
/// use tensorlib::Tensor3;
///
/// let mut t = Tensor3::<i32>::from_nested(&vec![
///     vec![vec![1, 2], vec![3, 4]],
///     vec![vec![5, 6], vec![7, 8]],
/// ])
/// .unwrap();
///
/// assert_eq!(t.extents(), &[2, 2, 2]);
/// assert_eq!(*t.at(0).at(1).at(1), 4);
/// assert_eq!(t[[1, 1, 1]], 8);
///
/// *t.at_mut(1).at_mut(0).at_mut(0) = 50;
/// assert_eq!(t.as_slice(), &[1, 2, 3, 4, 50, 6, 7, 8]);
/// ```
pub struct Tensor<T, const N: usize, A: TensorAllocator = CpuAllocator> {
    shape: Shape<N>,
    storage: TensorStorage<T, A>,
}

impl<T, const N: usize> Tensor<T, N, CpuAllocator> {
    /// Creates a tensor of the given extents with default-constructed elements.
    ///
    /// # Arguments
    ///
    /// * `extents` - The extent of every dimension.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::InvalidShape`] if an extent is zero.
    ///
    /// # Example
    ///
    /// ```
    /// use tensorlib::Tensor2;
    ///
    /// let t = Tensor2::<f32>::new([2, 3]).unwrap();
    /// assert_eq!(t.numel(), 6);
    /// assert!(t.iter().all(|&v| v == 0.0));
    /// ```
    pub fn new(extents: [usize; N]) -> Result<Self, TensorError>
    where
        T: Default,
    {
        Self::new_in(extents, CpuAllocator)
    }

    /// Creates a tensor with every element a clone of `value`.
    ///
    /// # Example
    ///
    /// ```
    /// use tensorlib::Tensor3;
    ///
    /// let t = Tensor3::<u8>::from_shape_val([2, 1, 3], 2).unwrap();
    /// assert_eq!(t.as_slice(), &[2, 2, 2, 2, 2, 2]);
    /// ```
    pub fn from_shape_val(extents: [usize; N], value: T) -> Result<Self, TensorError>
    where
        T: Clone,
    {
        Self::from_shape_val_in(extents, value, CpuAllocator)
    }

    /// Creates a tensor whose elements are generated from their multi-index.
    ///
    /// # Arguments
    ///
    /// * `extents` - The extent of every dimension.
    /// * `f` - Called once per element, in row-major order.
    ///
    /// # Example
    ///
    /// ```
    /// use tensorlib::Tensor2;
    ///
    /// let t = Tensor2::<usize>::from_shape_fn([2, 2], |[i, j]| i * 2 + j).unwrap();
    /// assert_eq!(t.as_slice(), &[0, 1, 2, 3]);
    /// ```
    pub fn from_shape_fn<F>(extents: [usize; N], f: F) -> Result<Self, TensorError>
    where
        F: FnMut([usize; N]) -> T,
    {
        Self::from_shape_fn_in(extents, CpuAllocator, f)
    }

    /// Creates a tensor from flat row-major data.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::SizeMismatch`] if `data.len()` is not the product of the
    /// extents, and [`TensorError::InvalidShape`] if an extent is zero.
    ///
    /// # Example
    ///
    /// ```
    /// use tensorlib::Tensor2;
    ///
    /// let t = Tensor2::<u8>::from_shape_vec([2, 2], vec![1, 2, 3, 4]).unwrap();
    /// assert_eq!(t[[1, 0]], 3);
    /// ```
    pub fn from_shape_vec(extents: [usize; N], data: Vec<T>) -> Result<Self, TensorError> {
        Self::from_shape_vec_in(extents, data, CpuAllocator)
    }

    /// Creates a tensor by cloning flat row-major data.
    ///
    /// # Errors
    ///
    /// Same as [`Tensor::from_shape_vec`].
    pub fn from_shape_slice(extents: [usize; N], data: &[T]) -> Result<Self, TensorError>
    where
        T: Clone,
    {
        let shape = Shape::new(extents)?;
        if data.len() != shape.numel() {
            return Err(TensorError::size_mismatch(shape.numel(), data.len()));
        }
        let storage = TensorStorage::from_fn(data.len(), CpuAllocator, |i| data[i].clone())?;
        Ok(Self::from_parts(shape, storage))
    }

    /// Creates a tensor filled with zeros.
    pub fn zeros(extents: [usize; N]) -> Result<Self, TensorError>
    where
        T: Zero + Clone,
    {
        Self::from_shape_val(extents, T::zero())
    }

    /// Creates a tensor filled with ones.
    pub fn ones(extents: [usize; N]) -> Result<Self, TensorError>
    where
        T: One + Clone,
    {
        Self::from_shape_val(extents, T::one())
    }

    /// Creates a tensor from a nested literal of depth `N`.
    ///
    /// The extents are inferred from the literal and the elements are copied in
    /// row-major order.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::RaggedShape`] if sibling lists differ in length and
    /// [`TensorError::InvalidShape`] if any list is empty.
    ///
    /// # Example
    ///
    /// ```
    /// use tensorlib::Tensor2;
    ///
    /// let t = Tensor2::<i32>::from_nested(&[[1, 2, 3], [4, 5, 6]]).unwrap();
    /// assert_eq!(t.extents(), &[2, 3]);
    /// assert_eq!(t.sub_volumes(), &[6, 3]);
    /// ```
    pub fn from_nested<L>(literal: &L) -> Result<Self, TensorError>
    where
        T: Clone,
        L: NestedList<T, N> + ?Sized,
    {
        Self::from_nested_in(literal, CpuAllocator)
    }

    /// Creates a tensor holding a copy of a view (or of any other [`TensorLike`]).
    pub fn from_view<S>(view: &S) -> Result<Self, TensorError>
    where
        T: Clone,
        S: TensorLike<T, N> + ?Sized,
    {
        Self::from_view_in(view, CpuAllocator)
    }
}

impl<T, const N: usize, A: TensorAllocator> Tensor<T, N, A> {
    pub(crate) fn from_parts(shape: Shape<N>, storage: TensorStorage<T, A>) -> Self {
        debug_assert_eq!(shape.numel(), storage.len());
        Self { shape, storage }
    }

    /// Like [`Tensor::new`], with an explicit allocator.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::InvalidShape`] for a zero extent and
    /// [`TensorError::StorageError`] if the allocation fails.
    pub fn new_in(extents: [usize; N], alloc: A) -> Result<Self, TensorError>
    where
        T: Default,
    {
        let shape = Shape::new(extents)?;
        let storage = TensorStorage::from_fn(shape.numel(), alloc, |_| T::default())?;
        Ok(Self::from_parts(shape, storage))
    }

    /// Like [`Tensor::from_shape_val`], with an explicit allocator.
    pub fn from_shape_val_in(extents: [usize; N], value: T, alloc: A) -> Result<Self, TensorError>
    where
        T: Clone,
    {
        let shape = Shape::new(extents)?;
        let storage = TensorStorage::from_fn(shape.numel(), alloc, |_| value.clone())?;
        Ok(Self::from_parts(shape, storage))
    }

    /// Like [`Tensor::from_shape_fn`], with an explicit allocator.
    pub fn from_shape_fn_in<F>(extents: [usize; N], alloc: A, mut f: F) -> Result<Self, TensorError>
    where
        F: FnMut([usize; N]) -> T,
    {
        let shape = Shape::new(extents)?;
        let storage = TensorStorage::from_fn(shape.numel(), alloc, |i| f(shape.unravel(i)))?;
        Ok(Self::from_parts(shape, storage))
    }

    /// Like [`Tensor::from_shape_vec`], with an explicit allocator.
    pub fn from_shape_vec_in(extents: [usize; N], data: Vec<T>, alloc: A) -> Result<Self, TensorError> {
        let shape = Shape::new(extents)?;
        if data.len() != shape.numel() {
            return Err(TensorError::size_mismatch(shape.numel(), data.len()));
        }
        let storage = TensorStorage::from_vec(data, alloc)?;
        Ok(Self::from_parts(shape, storage))
    }

    /// Like [`Tensor::from_nested`], with an explicit allocator.
    pub fn from_nested_in<L>(literal: &L, alloc: A) -> Result<Self, TensorError>
    where
        T: Clone,
        L: NestedList<T, N> + ?Sized,
    {
        let shape = infer_shape::<T, L, N>(literal)?;
        let storage = TensorStorage::from_sink(shape.numel(), alloc, |push| {
            literal.for_each_element(&mut |value| push(value.clone()))
        })?;
        Ok(Self::from_parts(shape, storage))
    }

    /// Like [`Tensor::from_view`], with an explicit allocator.
    pub fn from_view_in<S>(view: &S, alloc: A) -> Result<Self, TensorError>
    where
        T: Clone,
        S: TensorLike<T, N> + ?Sized,
    {
        let (shape, src) = source_parts::<T, S, N>(view)?;
        let shape = shape.to_shape::<N>();
        let storage = TensorStorage::from_fn(src.len(), alloc, |i| src[i].clone())?;
        Ok(Self::from_parts(shape, storage))
    }

    /// Moves the contents out, leaving the canonical single-element tensor behind.
    ///
    /// Same as `std::mem::take(self)`.
    pub fn take(&mut self) -> Self
    where
        T: Default,
        A: Default,
    {
        std::mem::take(self)
    }

    /// Returns the shape of the tensor.
    #[inline]
    pub fn shape(&self) -> &Shape<N> {
        &self.shape
    }

    /// Returns the extent of dimension `dim`.
    ///
    /// # Panics
    ///
    /// Panics if `dim >= N`.
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
    pub fn extents(&self) -> &[usize; N] {
        self.shape.extents()
    }

    /// Returns the sub-volume of every dimension.
    #[inline]
    pub fn sub_volumes(&self) -> &[usize; N] {
        self.shape.sub_volumes()
    }

    /// Returns the extent of the outermost dimension.
    #[inline]
    pub fn outer_extent(&self) -> usize {
        self.shape.outer_extent()
    }

    /// Returns the number of elements in the tensor.
    #[inline]
    pub fn numel(&self) -> usize {
        self.shape.numel()
    }

    /// Returns the number of dimensions.
    #[inline]
    pub const fn rank(&self) -> usize {
        N
    }

    /// Whether the tensor has rank 2.
    pub fn is_matrix(&self) -> bool {
        N == 2
    }

    /// Whether the tensor has rank 2 and both extents are equal.
    pub fn is_square_matrix(&self) -> bool {
        N == 2 && self.extent(0) == self.extent(1)
    }

    /// Returns the allocator that owns the buffer.
    #[inline]
    pub fn alloc(&self) -> &A {
        self.storage.alloc()
    }

    /// Returns the data of the tensor as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        self.storage.as_slice()
    }

    /// Returns the data of the tensor as a mutable slice.
    #[inline]
    pub fn as_slice_mut(&mut self) -> &mut [T] {
        self.storage.as_mut_slice()
    }

    /// Returns a pointer to the first element.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.storage.as_ptr()
    }

    /// Returns a mutable pointer to the first element.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.storage.as_mut_ptr()
    }

    /// Iterates over the elements in row-major order.
    ///
    /// The iterator is random access: `nth`, `len` and `rev` are O(1).
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.storage.as_slice().iter()
    }

    /// Iterates mutably over the elements in row-major order.
    #[inline]
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.storage.as_mut_slice().iter_mut()
    }

    /// Consumes the tensor and returns its elements in row-major order.
    pub fn into_vec(self) -> Vec<T> {
        self.storage.into_vec()
    }

    /// Borrows the whole tensor as a read-only view.
    #[inline]
    pub fn view(&self) -> TensorView<'_, T, N> {
        TensorView::from_parts(self.shape.shape_ref(), self.storage.as_slice())
    }

    /// Borrows the whole tensor as a mutable view.
    #[inline]
    pub fn view_mut(&mut self) -> TensorViewMut<'_, T, N> {
        TensorViewMut::from_parts(self.shape.shape_ref(), self.storage.as_mut_slice())
    }

    /// Returns the element at a full multi-index.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::OutOfRange`] if a coordinate exceeds its extent.
    pub fn element(&self, index: [usize; N]) -> Result<&T, TensorError> {
        let offset = self.shape.shape_ref().offset(&index)?;
        Ok(&self.storage.as_slice()[offset])
    }

    /// Returns the element at a full multi-index mutably.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::OutOfRange`] if a coordinate exceeds its extent.
    pub fn element_mut(&mut self, index: [usize; N]) -> Result<&mut T, TensorError> {
        let offset = self.shape.shape_ref().offset(&index)?;
        Ok(&mut self.storage.as_mut_slice()[offset])
    }

    /// Copies the values of another tensor or view of identical extents.
    ///
    /// The shape of `self` never changes.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::ShapeMismatch`] if the extents differ; nothing is
    /// written in that case.
    ///
    /// # Example
    ///
    /// ```
    /// use tensorlib::Tensor2;
    ///
    /// let mut t = Tensor2::<i32>::new([2, 2]).unwrap();
    /// let src = Tensor2::<i32>::from_nested(&[[1, 2], [3, 4]]).unwrap();
    /// t.replace(&src).unwrap();
    /// assert_eq!(t, src);
    ///
    /// let wide = Tensor2::<i32>::new([1, 4]).unwrap();
    /// assert!(t.replace(&wide).is_err());
    /// assert_eq!(t, src);
    /// ```
    pub fn replace<S>(&mut self, src: &S) -> Result<(), TensorError>
    where
        T: Clone,
        S: TensorLike<T, N> + ?Sized,
    {
        let (shape, data) = source_parts::<T, S, N>(src)?;
        ensure_same_extents(self.shape.extents(), shape.extents())?;
        self.storage.as_mut_slice().clone_from_slice(data);
        Ok(())
    }

    /// Copies a flat row-major buffer into the tensor.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::SizeMismatch`] unless `data.len() == numel()`.
    pub fn assign_flat(&mut self, data: &[T]) -> Result<(), TensorError>
    where
        T: Clone,
    {
        if data.len() != self.numel() {
            return Err(TensorError::size_mismatch(self.numel(), data.len()));
        }
        self.storage.as_mut_slice().clone_from_slice(data);
        Ok(())
    }

    /// Copies a nested literal whose widths match the current extents.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::SizeMismatch`] for the first list of the wrong width.
    pub fn assign_nested<L>(&mut self, literal: &L) -> Result<(), TensorError>
    where
        T: Clone,
        L: NestedList<T, N> + ?Sized,
    {
        literal.check_extents(self.shape.extents(), 0)?;
        copy_nested::<T, L, N>(self.storage.as_mut_slice(), literal);
        Ok(())
    }

    /// Sets every element to `value`.
    pub fn fill(&mut self, value: T)
    where
        T: Clone,
    {
        self.storage.as_mut_slice().fill(value);
    }

    /// Gives the tensor new extents, discarding all values.
    ///
    /// Every element of the new buffer is default-constructed. The old buffer is only
    /// released once the new one is complete, so on error the tensor is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::InvalidShape`] for a zero extent and
    /// [`TensorError::StorageError`] if the allocation fails.
    ///
    /// # Example
    ///
    /// ```
    /// use tensorlib::Tensor1;
    ///
    /// let mut t = Tensor1::<i32>::from_nested(&[1, 2, 3]).unwrap();
    /// t.resize([10]).unwrap();
    /// assert_eq!(t.as_slice(), &[0; 10]);
    /// ```
    pub fn resize(&mut self, extents: [usize; N]) -> Result<(), TensorError>
    where
        T: Default,
    {
        let shape = Shape::new(extents)?;
        let storage = TensorStorage::from_fn(shape.numel(), self.storage.alloc().clone(), |_| {
            T::default()
        })?;
        log::debug!(
            "resizing tensor from {:?} to {:?}",
            self.shape.extents(),
            shape.extents()
        );
        self.shape = shape;
        self.storage = storage;
        Ok(())
    }

    /// Exchanges the values of the sub-blocks `i` and `j` along the outermost dimension.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::OutOfRange`] if either index exceeds `outer_extent()`.
    ///
    /// # Example
    ///
    /// ```
    /// use tensorlib::Tensor2;
    ///
    /// let mut t = Tensor2::<i32>::from_nested(&[[1, 2], [3, 4]]).unwrap();
    /// t.swap_outer(0, 1).unwrap();
    /// assert_eq!(t.as_slice(), &[3, 4, 1, 2]);
    /// ```
    pub fn swap_outer(&mut self, i: usize, j: usize) -> Result<(), TensorError> {
        swap_outer_blocks(self.shape.shape_ref(), self.storage.as_mut_slice(), i, j)
    }
}

impl<T, const N: usize, A: TensorAllocator> TensorLike<T, N> for Tensor<T, N, A> {
    fn shape_ref(&self) -> ShapeRef<'_> {
        self.shape.shape_ref()
    }

    fn as_slice(&self) -> &[T] {
        self.storage.as_slice()
    }
}

impl<T, const N: usize, A> Default for Tensor<T, N, A>
where
    T: Default,
    A: TensorAllocator + Default,
{
    fn default() -> Self {
        let storage = match TensorStorage::from_fn(1, A::default(), |_| T::default()) {
            Ok(storage) => storage,
            Err(_) => std::alloc::handle_alloc_error(std::alloc::Layout::new::<T>()),
        };
        Self::from_parts(Shape::ones(), storage)
    }
}

impl<T, const N: usize, A> Clone for Tensor<T, N, A>
where
    T: Clone,
    A: TensorAllocator,
{
    fn clone(&self) -> Self {
        Self {
            shape: self.shape,
            storage: self.storage.clone(),
        }
    }
}

impl<T, const N: usize, A, B> PartialEq<Tensor<T, N, B>> for Tensor<T, N, A>
where
    T: PartialEq,
    A: TensorAllocator,
    B: TensorAllocator,
{
    fn eq(&self, other: &Tensor<T, N, B>) -> bool {
        self.shape == other.shape && self.as_slice() == other.as_slice()
    }
}

impl<T: Eq, const N: usize, A: TensorAllocator> Eq for Tensor<T, N, A> {}

impl<T: std::fmt::Debug, const N: usize, A: TensorAllocator> std::fmt::Debug for Tensor<T, N, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tensor")
            .field("extents", self.shape.extents())
            .field("data", &self.as_slice())
            .finish()
    }
}

impl<T: std::fmt::Display, const N: usize, A: TensorAllocator> std::fmt::Display
    for Tensor<T, N, A>
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt_nested(f, self.shape.extents(), self.as_slice())
    }
}

impl<T, const N: usize, A: TensorAllocator> Index<[usize; N]> for Tensor<T, N, A> {
    type Output = T;

    #[track_caller]
    fn index(&self, index: [usize; N]) -> &T {
        &self.storage.as_slice()[offset_or_panic(self.shape.shape_ref(), &index)]
    }
}

impl<T, const N: usize, A: TensorAllocator> IndexMut<[usize; N]> for Tensor<T, N, A> {
    #[track_caller]
    fn index_mut(&mut self, index: [usize; N]) -> &mut T {
        let offset = offset_or_panic(self.shape.shape_ref(), &index);
        &mut self.storage.as_mut_slice()[offset]
    }
}

impl<'a, T, const N: usize, A: TensorAllocator> IntoIterator for &'a Tensor<T, N, A> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T, const N: usize, A: TensorAllocator> IntoIterator for &'a mut Tensor<T, N, A> {
    type Item = &'a mut T;
    type IntoIter = std::slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}
