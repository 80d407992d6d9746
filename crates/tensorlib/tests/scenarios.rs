use tensorlib::{view::swap, Tensor1, Tensor3, TensorError};

#[test]
fn cube_indexing_and_block_swap() -> Result<(), TensorError> {
    let mut t = Tensor3::<i32>::new([2, 2, 2])?;
    t.assign_flat(&[1, 2, 3, 4, 5, 6, 7, 8])?;

    assert_eq!(*t.at(0).at(0).at(0), 1);
    assert_eq!(*t.at(0).at(1).at(1), 4);
    assert_eq!(*t.at(1).at(1).at(1), 8);
    assert_eq!(t.at(0).numel(), 4);

    let mut blocks = t.outer_iter_mut();
    let mut first = blocks.next().expect("two blocks");
    let mut second = blocks.next().expect("two blocks");
    swap(&mut first, &mut second)?;

    assert_eq!(*t.at(0).at(0).at(0), 5);
    assert_eq!(*t.at(1).at(0).at(0), 1);
    Ok(())
}

#[test]
fn resize_default_constructs() -> Result<(), TensorError> {
    let mut t = Tensor1::<i32>::default();
    t.resize([10])?;
    assert_eq!(t.outer_extent(), 10);
    assert_eq!(t.numel(), 10);
    assert!(t.iter().all(|&v| v == 0));
    Ok(())
}

#[test]
fn move_leaves_canonical_state() -> Result<(), TensorError> {
    let mut a = Tensor3::<i32>::from_nested(&[[[1, 2, 3]], [[4, 5, 6]]])?;
    let b = std::mem::take(&mut a);

    assert_eq!(a.extents(), &[1, 1, 1]);
    assert_eq!(a.numel(), 1);
    assert_eq!(b.extents(), &[2, 1, 3]);
    assert_eq!(b.as_slice(), &[1, 2, 3, 4, 5, 6]);
    Ok(())
}

#[test]
fn replace_with_other_shape_keeps_values() -> Result<(), TensorError> {
    let mut target = Tensor3::<i32>::from_nested(&[[[1, 2]], [[3, 4]]])?;
    let source = Tensor3::<i32>::from_nested(&[[[1], [2]], [[3], [4]]])?;

    let err = target.replace(&source);
    assert!(matches!(err, Err(TensorError::ShapeMismatch { .. })));
    assert_eq!(target.as_slice(), &[1, 2, 3, 4]);
    assert_eq!(target.extents(), &[2, 1, 2]);
    Ok(())
}

#[test]
fn flat_literal_of_wrong_size() -> Result<(), TensorError> {
    let mut t = Tensor1::<i32>::new([4])?;
    assert_eq!(
        t.assign_flat(&[1, 2, 3]),
        Err(TensorError::SizeMismatch {
            expected: 4,
            actual: 3
        })
    );
    assert_eq!(
        t.assign_nested(&[1, 2, 3]),
        Err(TensorError::SizeMismatch {
            expected: 4,
            actual: 3
        })
    );
    assert_eq!(t.as_slice(), &[0; 4]);
    Ok(())
}

#[test]
fn views_follow_a_resize() -> Result<(), TensorError> {
    let mut t = Tensor3::<i32>::new([2, 2, 2])?;
    assert_eq!(t.at(1).extents(), &[2, 2]);
    t.resize([4, 1, 1])?;
    assert_eq!(t.at(1).extents(), &[1, 1]);
    assert_eq!(t.at(1).as_ptr(), t.as_slice()[1..].as_ptr());
    Ok(())
}

#[test]
fn whole_tensor_swap() -> Result<(), TensorError> {
    let mut a = Tensor1::<i32>::from_nested(&[1, 2])?;
    let mut b = Tensor1::<i32>::from_nested(&[3, 4, 5])?;
    std::mem::swap(&mut a, &mut b);
    assert_eq!(a.as_slice(), &[3, 4, 5]);
    assert_eq!(b.extents(), &[2]);
    Ok(())
}
