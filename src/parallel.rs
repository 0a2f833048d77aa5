///
/// Calls `body` on every item of `data`, together with its index. If the feature
/// `parallel` is enabled, the items are processed concurrently by rayon, otherwise
/// one after another.
///
#[cfg(feature = "parallel")]
pub(crate) fn potential_parallel_for_each<D, T, F>(data: D, body: F)
    where F: Fn(usize, T) + Send + Sync,
        T: Send,
        D: rayon::iter::IntoParallelIterator<Item = T>,
        <D as rayon::iter::IntoParallelIterator>::Iter: rayon::iter::IndexedParallelIterator
{
    use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
    data.into_par_iter().enumerate().for_each(|(i, el)| body(i, el))
}

#[cfg(not(feature = "parallel"))]
pub(crate) fn potential_parallel_for_each<D, T, F>(data: D, body: F)
    where F: Fn(usize, T) + Send + Sync,
        D: IntoIterator<Item = T>
{
    for (i, el) in data.into_iter().enumerate() {
        body(i, el);
    }
}

///
/// Maps every item of `data` using `body`, and collects the results in order. If the
/// feature `parallel` is enabled, the items are processed concurrently by rayon.
///
#[cfg(feature = "parallel")]
pub(crate) fn potential_parallel_map<D, T, U, F>(data: D, body: F) -> Vec<U>
    where F: Fn(T) -> U + Send + Sync,
        T: Send,
        U: Send,
        D: rayon::iter::IntoParallelIterator<Item = T>,
        <D as rayon::iter::IntoParallelIterator>::Iter: rayon::iter::IndexedParallelIterator
{
    use rayon::iter::{IntoParallelIterator, ParallelIterator};
    data.into_par_iter().map(body).collect()
}

#[cfg(not(feature = "parallel"))]
pub(crate) fn potential_parallel_map<D, T, U, F>(data: D, body: F) -> Vec<U>
    where F: Fn(T) -> U + Send + Sync,
        D: IntoIterator<Item = T>
{
    data.into_iter().map(body).collect()
}

#[cfg(test)]
use std::sync::atomic::{AtomicUsize, Ordering};

#[test]
fn test_potential_parallel_for_each() {
    let mut data = vec![vec![1, 2], vec![3], vec![], vec![4, 5, 6]];
    let total = AtomicUsize::new(0);
    potential_parallel_for_each(&mut data, |i, el: &mut Vec<i32>| {
        el.push(i as i32);
        _ = total.fetch_add(el.len(), Ordering::Relaxed);
    });
    assert_eq!(vec![vec![1, 2, 0], vec![3, 1], vec![2], vec![4, 5, 6, 3]], data);
    assert_eq!(10, total.load(Ordering::Relaxed));
}

#[test]
fn test_potential_parallel_map() {
    let data = vec![3, 1, 4, 1, 5];
    assert_eq!(vec![6, 2, 8, 2, 10], potential_parallel_map(&data, |x: &i32| 2 * x));
}
