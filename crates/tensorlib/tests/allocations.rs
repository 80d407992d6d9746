use std::{
    alloc::{GlobalAlloc, Layout, System},
    cell::Cell,
};

use tensorlib::{Tensor2, Tensor3, TensorError};

struct CountingAlloc;

thread_local! {
    static ALLOCATIONS: Cell<usize> = const { Cell::new(0) };
}

unsafe impl GlobalAlloc for CountingAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let _ = ALLOCATIONS.try_with(|n| n.set(n.get() + 1));
        System.alloc(layout)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout)
    }
}

#[global_allocator]
static GLOBAL: CountingAlloc = CountingAlloc;

/// Runs `f` and returns how many allocations the current thread made meanwhile.
fn allocations_during<R>(f: impl FnOnce() -> R) -> (usize, R) {
    let before = ALLOCATIONS.with(Cell::get);
    let result = f();
    let after = ALLOCATIONS.with(Cell::get);
    (after - before, result)
}

#[test]
fn one_allocation_per_shape() -> Result<(), TensorError> {
    let (n, t) = allocations_during(|| Tensor2::<i32>::new([2, 3]));
    let mut t = t?;
    assert_eq!(n, 1);

    let (n, nested) = allocations_during(|| Tensor2::<i32>::from_nested(&[[1, 2, 3], [4, 5, 6]]));
    let nested = nested?;
    assert_eq!(n, 1);

    let (n, cube) =
        allocations_during(|| Tensor3::<i32>::from_nested(&[[[1, 2], [3, 4]], [[5, 6], [7, 8]]]));
    let cube = cube?;
    assert_eq!(n, 1);

    let (n, copy) = allocations_during(|| nested.clone());
    assert_eq!(n, 1);
    assert_eq!(copy, nested);

    let (n, resized) = allocations_during(|| t.resize([3, 4]));
    resized?;
    assert_eq!(n, 1);

    let (n, block) = allocations_during(|| Tensor2::<i32>::from_view(&cube.at(1)));
    assert_eq!(block?.as_slice(), &[5, 6, 7, 8]);
    assert_eq!(n, 1);
    Ok(())
}
