use std::alloc::Allocator;
use std::mem::size_of;

use tracing::{instrument, trace};

///
/// The largest element width (in bytes) supported by the transpose functions.
///
pub const MAX_TRANSPOSE_WIDTH: usize = 8;

///
/// Describes how [`transpose_2d()`] rearranged a matrix.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransposeStrategy {
    /// the matrix was square, and entries were swapped in place
    Square,
    /// the entries were copied into a newly allocated buffer of transposed shape
    Rectangular,
    /// the matrix was a single row or column, so only the shape changed
    Relabel
}

fn check_transpose_input(width: usize, dsize: &[usize], len: usize, function: &str) -> (usize, usize) {
    if width > MAX_TRANSPOSE_WIDTH {
        panic!("{}: this function assumes the largest possible type size is {} bytes, but the requested type needs {} bytes", function, MAX_TRANSPOSE_WIDTH, width);
    }
    if dsize.len() != 2 {
        panic!("{}: only 2D inputs are supported, but the input has {} dimensions", function, dsize.len());
    }
    assert!(dsize[0] * dsize[1] == len, "{}: shape {}x{} does not match the {} elements of the input", function, dsize[0], dsize[1], len);
    return (dsize[0], dsize[1]);
}

fn choose_strategy(rows: usize, cols: usize) -> TransposeStrategy {
    if rows == cols {
        TransposeStrategy::Square
    } else if rows <= 1 || cols <= 1 {
        TransposeStrategy::Relabel
    } else {
        TransposeStrategy::Rectangular
    }
}

///
/// Transposes the row-major `dsize[0] x dsize[1]` matrix stored in `values`, and swaps
/// the two entries of `dsize`. Afterwards, the entry at `(j, i)` is the entry that was
/// at `(i, j)` before.
///
/// Square matrices are transposed in place. For all other shapes, a new buffer is
/// allocated and replaces `values`, unless the matrix has only one row or column, in
/// which case the data is already laid out correctly.
///
/// # Panics
///
/// If `dsize` does not have exactly two entries, or the elements are wider than
/// [`MAX_TRANSPOSE_WIDTH`] bytes.
///
/// # Example
/// ```rust
/// # use typed_permute::transpose::*;
/// let mut values = vec![1, 2, 3, 4, 5, 6];
/// let mut dsize = [2, 3];
/// transpose_2d(&mut values, &mut dsize);
/// assert_eq!(vec![1, 4, 2, 5, 3, 6], values);
/// assert_eq!([3, 2], dsize);
/// ```
///
pub fn transpose_2d<T>(values: &mut Vec<T>, dsize: &mut [usize]) -> TransposeStrategy
    where T: Copy
{
    transpose_2d_using_allocator(values, dsize)
}

///
/// Same as [`transpose_2d()`], but for vectors using any allocator. A new buffer
/// is allocated with a clone of the allocator of `values`.
///
#[stability::unstable(feature = "enable")]
#[instrument(skip_all, level = "trace")]
pub fn transpose_2d_using_allocator<T, A>(values: &mut Vec<T, A>, dsize: &mut [usize]) -> TransposeStrategy
    where T: Copy, A: Allocator + Clone
{
    let (rows, cols) = check_transpose_input(size_of::<T>(), dsize, values.len(), "transpose_2d");
    let strategy = choose_strategy(rows, cols);
    trace!(rows = rows, cols = cols, strategy = ?strategy, "transpose");
    match strategy {
        TransposeStrategy::Square => {
            for i in 0..rows {
                for j in (i + 1)..cols {
                    values.swap(i * cols + j, j * cols + i);
                }
            }
        },
        TransposeStrategy::Rectangular => {
            let mut result = Vec::with_capacity_in(values.len(), values.allocator().clone());
            for j in 0..cols {
                for i in 0..rows {
                    result.push(values[i * cols + j]);
                }
            }
            *values = result;
        },
        TransposeStrategy::Relabel => {}
    }
    dsize.swap(0, 1);
    return strategy;
}

///
/// Same as [`transpose_2d()`], but works on raw bytes that are interpreted as
/// elements of `width` bytes each.
///
/// In the square case, entries are exchanged through a single scratch slot of
/// [`MAX_TRANSPOSE_WIDTH`] bytes.
///
#[instrument(skip_all, level = "trace")]
pub fn transpose_2d_bytes(bytes: &mut Vec<u8>, width: usize, dsize: &mut [usize]) -> TransposeStrategy {
    assert!(width > 0, "transpose_2d_bytes: elements must have a positive width");
    assert!(bytes.len() % width == 0, "transpose_2d_bytes: {} bytes are not a multiple of the width {}", bytes.len(), width);
    let (rows, cols) = check_transpose_input(width, dsize, bytes.len() / width, "transpose_2d_bytes");
    let strategy = choose_strategy(rows, cols);
    trace!(rows = rows, cols = cols, width = width, strategy = ?strategy, "transpose");
    match strategy {
        TransposeStrategy::Square => {
            let mut swap = [0u8; MAX_TRANSPOSE_WIDTH];
            let swap = &mut swap[..width];
            for i in 0..rows {
                for j in (i + 1)..cols {
                    let a = (i * cols + j) * width;
                    let b = (j * cols + i) * width;
                    swap.copy_from_slice(&bytes[a..(a + width)]);
                    bytes.copy_within(b..(b + width), a);
                    bytes[b..(b + width)].copy_from_slice(swap);
                }
            }
        },
        TransposeStrategy::Rectangular => {
            let mut result = Vec::with_capacity(bytes.len());
            for j in 0..cols {
                for i in 0..rows {
                    let a = (i * cols + j) * width;
                    result.extend_from_slice(&bytes[a..(a + width)]);
                }
            }
            *bytes = result;
        },
        TransposeStrategy::Relabel => {}
    }
    dsize.swap(0, 1);
    return strategy;
}

#[test]
fn test_transpose_square() {
    let mut values = vec![1, 2, 3, 4];
    let mut dsize = [2, 2];
    assert_eq!(TransposeStrategy::Square, transpose_2d(&mut values, &mut dsize));
    assert_eq!(vec![1, 3, 2, 4], values);
    assert_eq!([2, 2], dsize);

    let mut values = (0..9).collect::<Vec<u64>>();
    let mut dsize = [3, 3];
    transpose_2d(&mut values, &mut dsize);
    assert_eq!(vec![0, 3, 6, 1, 4, 7, 2, 5, 8], values);
}

#[test]
fn test_transpose_rectangular() {
    let mut values = vec![1., 2., 3., 4., 5., 6.];
    let mut dsize = [2, 3];
    assert_eq!(TransposeStrategy::Rectangular, transpose_2d(&mut values, &mut dsize));
    assert_eq!(vec![1., 4., 2., 5., 3., 6.], values);
    assert_eq!([3, 2], dsize);
}

#[test]
fn test_transpose_single_row() {
    let mut values = vec![7i8, 8, 9];
    let mut dsize = [1, 3];
    let ptr = values.as_ptr();
    assert_eq!(TransposeStrategy::Relabel, transpose_2d(&mut values, &mut dsize));
    assert_eq!(vec![7, 8, 9], values);
    assert_eq!([3, 1], dsize);
    assert_eq!(ptr, values.as_ptr());

    assert_eq!(TransposeStrategy::Relabel, transpose_2d(&mut values, &mut dsize));
    assert_eq!([1, 3], dsize);
}

#[test]
fn test_transpose_involution() {
    for (rows, cols) in [(0, 0), (1, 1), (2, 5), (4, 3), (6, 6), (0, 4), (3, 0)] {
        let original = (0..(rows * cols)).map(|x| x as i32).collect::<Vec<_>>();
        let mut values = original.clone();
        let mut dsize = [rows, cols];
        transpose_2d(&mut values, &mut dsize);
        for i in 0..rows {
            for j in 0..cols {
                assert_eq!(original[i * cols + j], values[j * rows + i]);
            }
        }
        transpose_2d(&mut values, &mut dsize);
        assert_eq!(original, values);
        assert_eq!([rows, cols], dsize);
    }
}

#[test]
fn test_transpose_bytes() {
    for (rows, cols) in [(3, 3), (2, 4), (1, 5)] {
        let original = (0..(rows * cols)).map(|x| x as u32 * 0x01010101).collect::<Vec<_>>();
        let mut expected = original.clone();
        let mut expected_dsize = [rows, cols];
        let expected_strategy = transpose_2d(&mut expected, &mut expected_dsize);

        let mut bytes = bytemuck::cast_slice::<u32, u8>(&original).to_vec();
        let mut dsize = [rows, cols];
        assert_eq!(expected_strategy, transpose_2d_bytes(&mut bytes, 4, &mut dsize));
        assert_eq!(bytemuck::cast_slice::<u32, u8>(&expected), &bytes[..]);
        assert_eq!(expected_dsize, dsize);
    }
}

#[test]
#[should_panic(expected = "only 2D inputs are supported")]
fn test_transpose_not_2d() {
    let mut values = vec![0; 8];
    transpose_2d(&mut values, &mut [2, 2, 2]);
}

#[test]
#[should_panic(expected = "needs 16 bytes")]
fn test_transpose_too_wide() {
    let mut values = vec![0u128; 4];
    transpose_2d(&mut values, &mut [2, 2]);
}

#[test]
#[should_panic(expected = "needs 12 bytes")]
fn test_transpose_bytes_too_wide() {
    let mut bytes = vec![0u8; 48];
    transpose_2d_bytes(&mut bytes, 12, &mut [2, 2]);
}
