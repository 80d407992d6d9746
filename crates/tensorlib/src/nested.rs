//! Nested literals (`Vec<Vec<T>>`, `[[T; K]; J]`, ...) as a source of tensor data.
//!
//! A literal of nesting depth `N` implements [`NestedList<T, N>`]. The depth is part of
//! the type, so a literal can only initialize a tensor of the same rank; the widths
//! are only known at runtime and are validated while walking the literal.

use crate::{error::TensorError, shape::Shape};

/// A nested list of depth `N` whose innermost entries are `T`.
///
/// Implemented for `Vec<_>`, arrays and slices at depths 1 to 8, in any combination
/// (e.g. `Vec<[T; 3]>` is a depth-2 literal).
pub trait NestedList<T, const N: usize> {
    /// Number of entries at the outermost level.
    fn width(&self) -> usize;

    /// Records the width of this list at `widths[depth]` and recurses into the children.
    ///
    /// `None` marks a depth that has not been seen yet.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::RaggedShape`] if a sibling already fixed a different width.
    fn infer_extents(&self, widths: &mut [Option<usize>], depth: usize) -> Result<(), TensorError>;

    /// Checks that the width at every depth equals `extents[depth]`.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::SizeMismatch`] for the first list of the wrong width.
    fn check_extents(&self, extents: &[usize], depth: usize) -> Result<(), TensorError>;

    /// Visits every innermost element in row-major order.
    fn for_each_element<'s>(&'s self, f: &mut dyn FnMut(&'s T));
}

/// Infers the shape of a nested literal.
///
/// # Errors
///
/// Returns [`TensorError::RaggedShape`] for uneven siblings and
/// [`TensorError::InvalidShape`] if any list is empty.
///
/// # Example
///
/// ```
/// use tensorlib::nested::infer_shape;
///
/// let shape = infer_shape::<i32, _, 2>(&vec![vec![1, 2, 3], vec![4, 5, 6]]).unwrap();
/// assert_eq!(shape.extents(), &[2, 3]);
/// ```
pub fn infer_shape<T, L, const N: usize>(literal: &L) -> Result<Shape<N>, TensorError>
where
    L: NestedList<T, N> + ?Sized,
{
    let mut widths: [Option<usize>; N] = [None; N];
    literal.infer_extents(&mut widths, 0)?;
    Shape::new(widths.map(|w| w.unwrap_or(0)))
}

fn record_width(
    widths: &mut [Option<usize>],
    depth: usize,
    width: usize,
) -> Result<(), TensorError> {
    match widths[depth] {
        None => {
            widths[depth] = Some(width);
            Ok(())
        }
        Some(expected) if expected != width => Err(TensorError::RaggedShape {
            depth,
            expected,
            actual: width,
        }),
        Some(_) => Ok(()),
    }
}

fn check_width(extents: &[usize], depth: usize, width: usize) -> Result<(), TensorError> {
    if extents[depth] != width {
        return Err(TensorError::size_mismatch(extents[depth], width));
    }
    Ok(())
}

fn leaf_infer<T>(
    items: &[T],
    widths: &mut [Option<usize>],
    depth: usize,
) -> Result<(), TensorError> {
    record_width(widths, depth, items.len())
}

fn leaf_for_each<'s, T>(items: &'s [T], f: &mut dyn FnMut(&'s T)) {
    for item in items {
        f(item);
    }
}

fn branch_infer<T, L, const M: usize>(
    items: &[L],
    widths: &mut [Option<usize>],
    depth: usize,
) -> Result<(), TensorError>
where
    L: NestedList<T, M>,
{
    record_width(widths, depth, items.len())?;
    for item in items {
        item.infer_extents(widths, depth + 1)?;
    }
    Ok(())
}

fn branch_check<T, L, const M: usize>(
    items: &[L],
    extents: &[usize],
    depth: usize,
) -> Result<(), TensorError>
where
    L: NestedList<T, M>,
{
    check_width(extents, depth, items.len())?;
    for item in items {
        item.check_extents(extents, depth + 1)?;
    }
    Ok(())
}

fn branch_for_each<'s, T, L, const M: usize>(items: &'s [L], f: &mut dyn FnMut(&'s T))
where
    L: NestedList<T, M>,
{
    for item in items {
        item.for_each_element(f);
    }
}

macro_rules! impl_nested_leaf {
    ($([$($generics:tt)*] $container:ty),* $(,)?) => {
        $(
            impl<$($generics)*> NestedList<T, 1> for $container {
                fn width(&self) -> usize {
                    self.len()
                }

                fn infer_extents(
                    &self,
                    widths: &mut [Option<usize>],
                    depth: usize,
                ) -> Result<(), TensorError> {
                    leaf_infer(&self[..], widths, depth)
                }

                fn check_extents(&self, extents: &[usize], depth: usize) -> Result<(), TensorError> {
                    check_width(extents, depth, self.len())
                }

                fn for_each_element<'s>(&'s self, f: &mut dyn FnMut(&'s T)) {
                    leaf_for_each(&self[..], f)
                }
            }
        )*
    };
}

impl_nested_leaf!(
    [T] Vec<T>,
    [T, const K: usize] [T; K],
    ['a, T] &'a [T],
);

macro_rules! impl_nested_branch {
    ($($n:literal => $m:literal),* $(,)?) => {
        $(
            impl_nested_branch!(@container $n, $m, [T, L] Vec<L>);
            impl_nested_branch!(@container $n, $m, [T, L, const K: usize] [L; K]);
            impl_nested_branch!(@container $n, $m, ['a, T, L] &'a [L]);
        )*
    };
    (@container $n:literal, $m:literal, [$($generics:tt)*] $container:ty) => {
        impl<$($generics)*> NestedList<T, $n> for $container
        where
            L: NestedList<T, $m>,
        {
            fn width(&self) -> usize {
                self.len()
            }

            fn infer_extents(
                &self,
                widths: &mut [Option<usize>],
                depth: usize,
            ) -> Result<(), TensorError> {
                branch_infer::<T, L, $m>(&self[..], widths, depth)
            }

            fn check_extents(&self, extents: &[usize], depth: usize) -> Result<(), TensorError> {
                branch_check::<T, L, $m>(&self[..], extents, depth)
            }

            fn for_each_element<'s>(&'s self, f: &mut dyn FnMut(&'s T)) {
                branch_for_each::<T, L, $m>(&self[..], f)
            }
        }
    };
}

impl_nested_branch!(2 => 1, 3 => 2, 4 => 3, 5 => 4, 6 => 5, 7 => 6, 8 => 7);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infer_vec_3d() -> Result<(), TensorError> {
        let literal = vec![
            vec![vec![1, 2], vec![3, 4], vec![5, 6]],
            vec![vec![7, 8], vec![9, 10], vec![11, 12]],
        ];
        let shape = infer_shape::<i32, _, 3>(&literal)?;
        assert_eq!(shape.extents(), &[2, 3, 2]);
        assert_eq!(shape.numel(), 12);
        Ok(())
    }

    #[test]
    fn infer_mixed_containers() -> Result<(), TensorError> {
        let literal: Vec<[u8; 3]> = vec![[1, 2, 3], [4, 5, 6]];
        let shape = infer_shape::<u8, _, 2>(&literal)?;
        assert_eq!(shape.extents(), &[2, 3]);

        let rows: &[[u8; 2]] = &[[1, 2]];
        let shape = infer_shape::<u8, _, 2>(&rows)?;
        assert_eq!(shape.extents(), &[1, 2]);
        Ok(())
    }

    #[test]
    fn ragged_literal() {
        let literal = vec![vec![1, 2, 3], vec![4, 5]];
        assert_eq!(
            infer_shape::<i32, _, 2>(&literal),
            Err(TensorError::RaggedShape {
                depth: 1,
                expected: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn ragged_after_empty_sibling() {
        let literal: Vec<Vec<i32>> = vec![vec![], vec![1, 2]];
        assert_eq!(
            infer_shape::<i32, _, 2>(&literal),
            Err(TensorError::RaggedShape {
                depth: 1,
                expected: 0,
                actual: 2
            })
        );
    }

    #[test]
    fn empty_literal_is_invalid() {
        let literal: Vec<Vec<i32>> = vec![];
        assert_eq!(
            infer_shape::<i32, _, 2>(&literal),
            Err(TensorError::InvalidShape(vec![0, 0]))
        );
    }

    #[test]
    fn check_against_extents() {
        let literal = [[1, 2], [3, 4], [5, 6]];
        assert!(NestedList::<i32, 2>::check_extents(&literal, &[3, 2], 0).is_ok());
        assert_eq!(
            NestedList::<i32, 2>::check_extents(&literal, &[3, 3], 0),
            Err(TensorError::size_mismatch(3, 2))
        );
        assert_eq!(
            NestedList::<i32, 2>::check_extents(&literal, &[2, 2], 0),
            Err(TensorError::size_mismatch(2, 3))
        );
    }

    #[test]
    fn visits_in_row_major_order() {
        let literal = vec![vec![vec![1, 2]], vec![vec![3, 4]]];
        let mut seen = Vec::new();
        NestedList::<i32, 3>::for_each_element(&literal, &mut |v| seen.push(*v));
        assert_eq!(seen, vec![1, 2, 3, 4]);
        assert_eq!(NestedList::<i32, 3>::width(&literal), 2);
    }
}
