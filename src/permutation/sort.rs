use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::element::Element;

use super::Permutation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortOrder {
    Increasing,
    Decreasing
}

fn compare<T: Element>(lhs: &T, rhs: &T, order: SortOrder) -> Ordering {
    match (lhs.is_blank(), rhs.is_blank(), order) {
        (false, false, SortOrder::Increasing) => T::sort_cmp(lhs, rhs),
        (false, false, SortOrder::Decreasing) => T::sort_cmp(rhs, lhs),
        (lhs_blank, rhs_blank, _) => lhs_blank.cmp(&rhs_blank)
    }
}

///
/// Computes the permutation that sorts the given values.
///
/// More concretely, returns `perm` such that `values[perm.at(0)], values[perm.at(1)], ...`
/// is sorted in the given order. Applying `perm` to `values` (or to any other sequence
/// of the same length, like the other columns of a table) thus sorts them accordingly.
///
/// The sort is stable, and blank values (i.e. NaN) are placed at the end, for both
/// orders.
///
/// # Example
/// ```rust
/// # use typed_permute::permutation::*;
/// # use typed_permute::permutation::sort::*;
/// let values = [3.5, f64::NAN, -1., 2.];
/// let perm = sort_index(&values, SortOrder::Decreasing);
/// assert_eq!(&[0, 3, 2, 1], perm.as_slice());
/// ```
///
#[instrument(skip_all, level = "trace")]
pub fn sort_index<T: Element>(values: &[T], order: SortOrder) -> Permutation {
    let mut indices = (0..values.len()).collect::<Vec<_>>();
    indices.sort_by(|i, j| compare(&values[*i], &values[*j], order));
    return Permutation::new_unchecked(indices);
}

#[test]
fn test_sort_index_increasing() {
    let values = [30u16, 10, 40, 20];
    let perm = sort_index(&values, SortOrder::Increasing);
    assert_eq!(&[1, 3, 0, 2], perm.as_slice());

    let mut sorted = values;
    perm.apply_to(&mut sorted).unwrap();
    assert_eq!([10, 20, 30, 40], sorted);
}

#[test]
fn test_sort_index_decreasing() {
    let values = [-2i64, 7, 0, 7, 3];
    let perm = sort_index(&values, SortOrder::Decreasing);
    assert_eq!(&[1, 3, 4, 2, 0], perm.as_slice());
}

#[test]
fn test_sort_index_stable() {
    let values = [1i8, 0, 1, 0, 1];
    assert_eq!(&[1, 3, 0, 2, 4], sort_index(&values, SortOrder::Increasing).as_slice());
    assert_eq!(&[0, 2, 4, 1, 3], sort_index(&values, SortOrder::Decreasing).as_slice());
}

#[test]
fn test_sort_index_nan_last() {
    let values = [f32::NAN, 2., f32::NAN, -5., 1.];
    assert_eq!(&[3, 4, 1, 0, 2], sort_index(&values, SortOrder::Increasing).as_slice());
    assert_eq!(&[1, 4, 3, 0, 2], sort_index(&values, SortOrder::Decreasing).as_slice());
}

#[test]
fn test_sort_index_empty() {
    let values: [f64; 0] = [];
    assert!(sort_index(&values, SortOrder::Increasing).is_empty());
}
