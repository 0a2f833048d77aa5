use std::alloc::{Allocator, Global};

use tracing::instrument;

///
/// Returns whether the given indices form a bijection of `{0, ..., perm.len() - 1}`.
///
/// Runs in `O(n)` using a bitmap of already seen indices.
///
pub fn is_permutation(perm: &[usize]) -> bool {
    let mut seen = vec![false; perm.len()];
    for &j in perm {
        if j >= perm.len() || seen[j] {
            return false;
        }
        seen[j] = true;
    }
    return true;
}

fn assert_unit_layout(values_len: usize, unit: usize, perm: &[usize], function: &str) {
    assert!(
        values_len == unit * perm.len(),
        "{}: {} values cannot be split into {} units of {} values each",
        function, values_len, perm.len(), unit
    );
}

///
/// Returns whether `i` is the smallest index of its cycle. Follows at most `perm.len()`
/// indices, so that index sequences that are not permutations cannot loop forever.
///
fn starts_cycle(perm: &[usize], i: usize) -> bool {
    let mut k = perm[i];
    let mut steps = 1;
    while k > i && steps < perm.len() {
        k = perm[k];
        steps += 1;
    }
    return k == i;
}

///
/// Moves units of `unit` consecutive values, such that afterwards unit `i` holds what unit
/// `perm[i]` held before.
///
/// This follows Knuth's in-place permutation (TAOCP, vol. 3, sec. 5.2, ex. 10): Every cycle
/// is rotated exactly once, starting from its smallest index. A cycle is recognized as already
/// rotated when following it from `i` leads to a smaller index.
///
fn permute_units<T, A>(values: &mut [T], unit: usize, perm: &[usize], allocator: A)
    where T: Copy, A: Allocator
{
    if unit == 0 {
        return;
    }
    let mut scratch = Vec::with_capacity_in(unit, allocator);
    for i in 0..perm.len() {
        if perm[i] == i || !starts_cycle(perm, i) {
            continue;
        }
        let mut k = i;
        let mut pk = perm[i];
        scratch.clear();
        scratch.extend_from_slice(&values[(i * unit)..((i + 1) * unit)]);
        while pk != i {
            values.copy_within((pk * unit)..((pk + 1) * unit), k * unit);
            k = pk;
            pk = perm[k];
        }
        values[(k * unit)..((k + 1) * unit)].copy_from_slice(&scratch);
    }
}

///
/// Moves units of `unit` consecutive values, such that afterwards unit `perm[i]` holds what
/// unit `i` held before.
///
/// The cycles are found as in [`permute_units()`], but rotated in the opposite direction.
/// The scratch unit carries the value that is about to be placed, and is exchanged with
/// the value at its destination on each step.
///
fn permute_units_inv<T, A>(values: &mut [T], unit: usize, perm: &[usize], allocator: A)
    where T: Copy, A: Allocator
{
    if unit == 0 {
        return;
    }
    let mut carried = Vec::with_capacity_in(unit, allocator);
    for i in 0..perm.len() {
        if perm[i] == i || !starts_cycle(perm, i) {
            continue;
        }
        let mut pk = perm[i];
        carried.clear();
        carried.extend_from_slice(&values[(i * unit)..((i + 1) * unit)]);
        while pk != i {
            values[(pk * unit)..((pk + 1) * unit)].swap_with_slice(&mut carried);
            pk = perm[pk];
        }
        values[(pk * unit)..((pk + 1) * unit)].copy_from_slice(&carried);
    }
}

///
/// Computes `values_new[i] = values[perm[i]]` in place.
///
/// `perm` must be a permutation of `{0, ..., values.len() - 1}`. This is not checked;
/// other index sequences yield unspecified contents, or a panic if an index is out of
/// range. Use [`crate::permutation::Permutation`] to get the indices validated once.
///
/// # Example
/// ```rust
/// # use typed_permute::permute::*;
/// let mut values = [10, 20, 30, 40];
/// apply_permutation(&mut values, &[2, 0, 3, 1]);
/// assert_eq!([30, 10, 40, 20], values);
/// ```
///
pub fn apply_permutation<T>(values: &mut [T], perm: &[usize])
    where T: Copy
{
    apply_permutation_using_allocator(values, perm, Global)
}

///
/// Computes `values_new[i] = values[perm[i]]` in place, allocating the scratch space
/// using the given allocator.
///
#[stability::unstable(feature = "enable")]
#[instrument(skip_all, level = "trace")]
pub fn apply_permutation_using_allocator<T, A>(values: &mut [T], perm: &[usize], allocator: A)
    where T: Copy, A: Allocator
{
    assert_unit_layout(values.len(), 1, perm, "apply_permutation");
    permute_units(values, 1, perm, allocator)
}

///
/// Considers `values` as a sequence of `perm.len()` blocks of `block_len` consecutive
/// values each, and reorders these blocks such that block `i` afterwards holds what block
/// `perm[i]` held before. The order of values within a block does not change.
///
/// For a row-major matrix, this permutes the rows.
///
/// # Example
/// ```rust
/// # use typed_permute::permute::*;
/// let mut values = [1, 2, 3, 4, 5, 6];
/// apply_permutation_blocks(&mut values, 2, &[2, 0, 1]);
/// assert_eq!([5, 6, 1, 2, 3, 4], values);
/// ```
///
pub fn apply_permutation_blocks<T>(values: &mut [T], block_len: usize, perm: &[usize])
    where T: Copy
{
    apply_permutation_blocks_using_allocator(values, block_len, perm, Global)
}

#[stability::unstable(feature = "enable")]
#[instrument(skip_all, level = "trace")]
pub fn apply_permutation_blocks_using_allocator<T, A>(values: &mut [T], block_len: usize, perm: &[usize], allocator: A)
    where T: Copy, A: Allocator
{
    assert_unit_layout(values.len(), block_len, perm, "apply_permutation_blocks");
    permute_units(values, block_len, perm, allocator)
}

///
/// Computes `values_new[perm[i]] = values[i]` in place.
/// This is the inverse operation to [`apply_permutation()`], computed without
/// materializing the inverse permutation.
///
/// # Example
/// ```rust
/// # use typed_permute::permute::*;
/// let mut values = [10, 20, 30, 40];
/// apply_inverse_permutation(&mut values, &[2, 0, 3, 1]);
/// assert_eq!([20, 40, 10, 30], values);
/// ```
///
pub fn apply_inverse_permutation<T>(values: &mut [T], perm: &[usize])
    where T: Copy
{
    apply_inverse_permutation_using_allocator(values, perm, Global)
}

///
/// Computes `values_new[perm[i]] = values[i]` in place, allocating the scratch space
/// using the given allocator.
///
#[stability::unstable(feature = "enable")]
#[instrument(skip_all, level = "trace")]
pub fn apply_inverse_permutation_using_allocator<T, A>(values: &mut [T], perm: &[usize], allocator: A)
    where T: Copy, A: Allocator
{
    assert_unit_layout(values.len(), 1, perm, "apply_inverse_permutation");
    permute_units_inv(values, 1, perm, allocator)
}

///
/// Same as [`apply_permutation()`], but works on raw bytes that are interpreted as
/// a sequence of elements of `width` bytes each. Only the width matters, the
/// type of the elements is irrelevant.
///
#[instrument(skip_all, level = "trace")]
pub fn apply_permutation_bytes(bytes: &mut [u8], width: usize, perm: &[usize]) {
    assert!(width > 0, "apply_permutation_bytes: elements must have a positive width");
    assert_unit_layout(bytes.len(), width, perm, "apply_permutation_bytes");
    permute_units(bytes, width, perm, Global)
}

///
/// Same as [`apply_inverse_permutation()`], but works on raw bytes that are interpreted
/// as a sequence of elements of `width` bytes each.
///
#[instrument(skip_all, level = "trace")]
pub fn apply_inverse_permutation_bytes(bytes: &mut [u8], width: usize, perm: &[usize]) {
    assert!(width > 0, "apply_inverse_permutation_bytes: elements must have a positive width");
    assert_unit_layout(bytes.len(), width, perm, "apply_inverse_permutation_bytes");
    permute_units_inv(bytes, width, perm, Global)
}

#[cfg(test)]
fn random_perm(len: usize, rng: &mut oorandom::Rand64) -> Vec<usize> {
    let mut result = (0..len).collect::<Vec<_>>();
    for i in (1..len).rev() {
        result.swap(i, rng.rand_range(0..(i as u64 + 1)) as usize);
    }
    return result;
}

#[test]
fn test_apply_permutation() {
    let mut values = [10, 20, 30, 40];
    apply_permutation(&mut values, &[2, 0, 3, 1]);
    assert_eq!([30, 10, 40, 20], values);

    let mut values = [0, 1, 2, 3, 4, 5, 6, 7];
    let permutation = [2, 1, 7, 5, 6, 3, 4, 0];
    apply_permutation(&mut values, &permutation);
    assert_eq!(permutation, values);
}

#[test]
fn test_apply_inverse_permutation() {
    let mut values = [10, 20, 30, 40];
    apply_inverse_permutation(&mut values, &[2, 0, 3, 1]);
    assert_eq!([20, 40, 10, 30], values);

    let mut values = [2, 1, 7, 5, 6, 3, 4, 0];
    let permutation = [2, 1, 7, 5, 6, 3, 4, 0];
    apply_inverse_permutation(&mut values, &permutation);
    assert_eq!([0, 1, 2, 3, 4, 5, 6, 7], values);
}

#[test]
fn test_apply_identity() {
    for len in 0..6 {
        let identity = (0..len).collect::<Vec<_>>();
        let mut values = (0..len).map(|i| i as i32 * 7 - 3).collect::<Vec<_>>();
        let expected = values.clone();
        apply_permutation(&mut values, &identity);
        assert_eq!(expected, values);
        apply_inverse_permutation(&mut values, &identity);
        assert_eq!(expected, values);
    }
}

#[test]
fn test_apply_empty_and_single() {
    let mut empty: [f64; 0] = [];
    apply_permutation(&mut empty, &[]);
    apply_inverse_permutation(&mut empty, &[]);
    apply_permutation_blocks(&mut empty, 3, &[]);

    let mut single = [1.5f32];
    apply_permutation(&mut single, &[0]);
    apply_inverse_permutation(&mut single, &[0]);
    assert_eq!([1.5], single);
}

#[test]
fn test_permute_then_inverse_random() {
    let mut rng = oorandom::Rand64::new(1);
    for len in [2, 3, 10, 57, 256] {
        for _ in 0..5 {
            let perm = random_perm(len, &mut rng);
            let original = (0..len).map(|_| rng.rand_u64()).collect::<Vec<_>>();

            let mut values = original.clone();
            apply_permutation(&mut values, &perm);
            for i in 0..len {
                assert_eq!(original[perm[i]], values[i]);
            }
            apply_inverse_permutation(&mut values, &perm);
            assert_eq!(original, values);

            let mut values = original.clone();
            apply_inverse_permutation(&mut values, &perm);
            for i in 0..len {
                assert_eq!(original[i], values[perm[i]]);
            }
            apply_permutation(&mut values, &perm);
            assert_eq!(original, values);
        }
    }
}

#[test]
fn test_apply_permutation_blocks() {
    let mut values = [1, 2, 3, 4, 5, 6];
    apply_permutation_blocks(&mut values, 2, &[2, 0, 1]);
    assert_eq!([5, 6, 1, 2, 3, 4], values);

    let mut values = (0..12).collect::<Vec<i16>>();
    apply_permutation_blocks(&mut values, 3, &[3, 2, 1, 0]);
    assert_eq!(vec![9, 10, 11, 6, 7, 8, 3, 4, 5, 0, 1, 2], values);
}

#[test]
fn test_apply_permutation_blocks_zero_block_len() {
    let mut values: [u8; 0] = [];
    apply_permutation_blocks(&mut values, 0, &[1, 0, 2]);
}

#[test]
#[should_panic]
fn test_apply_permutation_length_mismatch() {
    let mut values = [1, 2, 3];
    apply_permutation(&mut values, &[1, 0]);
}

#[test]
fn test_apply_permutation_bytes() {
    let original = [0x0102u16, 0x0304, 0x0506, 0x0708, 0x090a];
    let perm = [4, 2, 0, 1, 3];

    let mut expected = original;
    apply_permutation(&mut expected, &perm);
    let mut bytes = bytemuck::cast_slice::<u16, u8>(&original).to_vec();
    apply_permutation_bytes(&mut bytes, 2, &perm);
    assert_eq!(bytemuck::cast_slice::<u16, u8>(&expected), &bytes[..]);

    let mut expected = original;
    apply_inverse_permutation(&mut expected, &perm);
    let mut bytes = bytemuck::cast_slice::<u16, u8>(&original).to_vec();
    apply_inverse_permutation_bytes(&mut bytes, 2, &perm);
    assert_eq!(bytemuck::cast_slice::<u16, u8>(&expected), &bytes[..]);
}

#[test]
fn test_apply_non_permutation_terminates() {
    let mut values = [10, 20];
    apply_permutation(&mut values, &[1, 1]);
    assert_eq!([10, 20], values);
    apply_inverse_permutation(&mut values, &[1, 1]);
    assert_eq!([10, 20], values);

    let mut values = [1u8, 2, 3, 4, 5, 6];
    apply_permutation_blocks(&mut values, 2, &[1, 2, 1]);
    apply_inverse_permutation_bytes(&mut values, 2, &[2, 2, 0]);
    apply_permutation(&mut values, &[0, 0, 0, 0, 0, 0]);
}

#[test]
fn test_is_permutation() {
    assert!(is_permutation(&[]));
    assert!(is_permutation(&[0]));
    assert!(is_permutation(&[2, 0, 3, 1]));
    assert!(!is_permutation(&[1, 1, 0]));
    assert!(!is_permutation(&[0, 3, 1]));
}

#[bench]
fn bench_apply_permutation(bencher: &mut test::Bencher) {
    let mut rng = oorandom::Rand64::new(1);
    let len = 1 << 16;
    let perm = random_perm(len, &mut rng);
    let mut values = (0..len).map(|i| i as f64).collect::<Vec<_>>();
    bencher.iter(|| {
        apply_permutation(&mut values, &perm);
        apply_inverse_permutation(&mut values, &perm);
        assert_eq!(0., values[0]);
    });
}
