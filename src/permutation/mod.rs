use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::error::PermutationError;
use crate::permute::*;

///
/// Contains [`sort::sort_index()`], which computes the permutation that sorts
/// a sequence of elements.
///
pub mod sort;

///
/// A bijection of `{0, ..., n - 1}`, describing a reordering of `n` values.
///
/// Applying a permutation `perm` to values `v` gives `v_new[i] = v[perm[i]]`, i.e. the
/// `i`-th entry of the permutation is the position (before the reordering) of the value
/// that ends up at position `i`. Applying the inverse gives `v_new[perm[i]] = v[i]`.
///
/// Contrary to the plain index slices accepted by the functions in [`crate::permute`],
/// a [`Permutation`] is always known to be valid, since this is checked on construction.
///
/// # Example
/// ```rust
/// # use typed_permute::permutation::*;
/// let perm = Permutation::new(vec![2, 0, 3, 1]).unwrap();
/// let mut values = [10, 20, 30, 40];
/// perm.apply_to(&mut values).unwrap();
/// assert_eq!([30, 10, 40, 20], values);
/// perm.apply_inverse_to(&mut values).unwrap();
/// assert_eq!([10, 20, 30, 40], values);
///
/// assert!(Permutation::new(vec![0, 0, 1]).is_err());
/// ```
///
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct Permutation {
    indices: Vec<usize>
}

impl Permutation {

    ///
    /// Creates a new [`Permutation`], checking that `indices` contains every value
    /// of `0..indices.len()` exactly once.
    ///
    pub fn new(indices: Vec<usize>) -> Result<Self, PermutationError> {
        let len = indices.len();
        let mut seen = vec![false; len];
        for (index, &value) in indices.iter().enumerate() {
            if value >= len {
                return Err(PermutationError::IndexOutOfRange { index, value, len });
            }
            if seen[value] {
                return Err(PermutationError::DuplicateIndex { index, value });
            }
            seen[value] = true;
        }
        return Ok(Self { indices });
    }

    ///
    /// Creates a new [`Permutation`] without checking that `indices` is a bijection.
    ///
    /// The check is still performed in debug builds. Passing other index sequences
    /// does not cause undefined behavior, but permuting with the result will either
    /// panic or produce unspecified values.
    ///
    pub fn new_unchecked(indices: Vec<usize>) -> Self {
        debug_assert!(is_permutation(&indices));
        Self { indices }
    }

    pub fn identity(len: usize) -> Self {
        Self { indices: (0..len).collect() }
    }

    ///
    /// Creates a uniformly random permutation of the given length, using the
    /// Fisher-Yates shuffle and the given source of randomness.
    ///
    /// `rng` should return uniformly distributed values. Some of them are rejected, so
    /// it may be called more than `len - 1` times.
    ///
    /// # Example
    /// ```rust
    /// # use typed_permute::permutation::*;
    /// let mut rng = oorandom::Rand64::new(1);
    /// let perm = Permutation::random(10, || rng.rand_u64());
    /// assert_eq!(10, perm.len());
    /// assert!(Permutation::new(perm.into_vec()).is_ok());
    /// ```
    ///
    pub fn random<F>(len: usize, mut rng: F) -> Self
        where F: FnMut() -> u64
    {
        let mut indices = (0..len).collect::<Vec<_>>();
        for i in (1..len).rev() {
            let j = uniform_below(i as u64 + 1, &mut rng) as usize;
            indices.swap(i, j);
        }
        return Self { indices };
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    ///
    /// Returns the position (before applying this permutation) of the value that
    /// is moved to position `i`.
    ///
    pub fn at(&self, i: usize) -> usize {
        self.indices[i]
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.indices
    }

    pub fn into_vec(self) -> Vec<usize> {
        self.indices
    }

    pub fn is_identity(&self) -> bool {
        self.indices.iter().enumerate().all(|(i, j)| i == *j)
    }

    ///
    /// Returns the inverse permutation, i.e. the one whose application undoes
    /// the application of `self`.
    ///
    pub fn inverse(&self) -> Self {
        let mut result = vec![0; self.len()];
        for (i, j) in self.indices.iter().enumerate() {
            result[*j] = i;
        }
        return Self { indices: result };
    }

    ///
    /// Returns the permutation whose application has the same effect as first applying
    /// `self` and then `next`.
    ///
    /// # Example
    /// ```rust
    /// # use typed_permute::permutation::*;
    /// let fst = Permutation::new(vec![1, 2, 0]).unwrap();
    /// let snd = Permutation::new(vec![0, 2, 1]).unwrap();
    /// let mut values = ['a', 'b', 'c'];
    /// fst.apply_to(&mut values).unwrap();
    /// snd.apply_to(&mut values).unwrap();
    /// assert_eq!(['b', 'a', 'c'], values);
    ///
    /// let mut values = ['a', 'b', 'c'];
    /// fst.then(&snd).apply_to(&mut values).unwrap();
    /// assert_eq!(['b', 'a', 'c'], values);
    /// ```
    ///
    pub fn then(&self, next: &Permutation) -> Self {
        assert_eq!(self.len(), next.len(), "cannot compose permutations of different lengths");
        Self { indices: next.indices.iter().map(|j| self.indices[*j]).collect() }
    }

    ///
    /// Computes `values_new[i] = values[self.at(i)]` in place.
    ///
    pub fn apply_to<T: Copy>(&self, values: &mut [T]) -> Result<(), PermutationError> {
        self.check_len(values.len())?;
        apply_permutation(values, &self.indices);
        return Ok(());
    }

    ///
    /// Computes `values_new[self.at(i)] = values[i]` in place.
    ///
    pub fn apply_inverse_to<T: Copy>(&self, values: &mut [T]) -> Result<(), PermutationError> {
        self.check_len(values.len())?;
        apply_inverse_permutation(values, &self.indices);
        return Ok(());
    }

    pub(crate) fn check_len(&self, expected: usize) -> Result<(), PermutationError> {
        if self.len() != expected {
            return Err(PermutationError::LengthMismatch { expected, actual: self.len() });
        }
        return Ok(());
    }

    ///
    /// Returns an object that displays this permutation as a table, one line per
    /// position, showing where the value at that position came from.
    ///
    /// # Example
    /// ```rust
    /// # use typed_permute::permutation::*;
    /// let perm = Permutation::new(vec![1, 0]).unwrap();
    /// assert_eq!("after[ 0     ]    =   before [ 1     ]\nafter[ 1     ]    =   before [ 0     ]\n", format!("{}", perm.check()));
    /// ```
    ///
    pub fn check<'a>(&'a self) -> PermutationCheck<'a> {
        PermutationCheck { permutation: self }
    }
}

impl TryFrom<Vec<usize>> for Permutation {
    type Error = PermutationError;

    fn try_from(value: Vec<usize>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Permutation> for Vec<usize> {

    fn from(value: Permutation) -> Self {
        value.indices
    }
}

impl AsRef<[usize]> for Permutation {

    fn as_ref(&self) -> &[usize] {
        &self.indices
    }
}

///
/// Displays a [`Permutation`] line by line, see [`Permutation::check()`].
///
pub struct PermutationCheck<'a> {
    permutation: &'a Permutation
}

impl<'a> Display for PermutationCheck<'a> {

    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, j) in self.permutation.indices.iter().enumerate() {
            writeln!(f, "after[ {:<5} ]    =   before [ {:<5} ]", i, j)?;
        }
        return Ok(());
    }
}

///
/// Draws a value uniformly from `0..bound`, by rejecting the values of `rng` that lie
/// in the incomplete last block of size `bound`.
///
fn uniform_below<F>(bound: u64, rng: &mut F) -> u64
    where F: FnMut() -> u64
{
    debug_assert!(bound > 0);
    let max_accepted = u64::MAX - (u64::MAX - bound + 1) % bound;
    loop {
        let value = rng();
        if value <= max_accepted {
            return value % bound;
        }
    }
}

#[test]
fn test_new_validates() {
    assert!(Permutation::new(vec![]).is_ok());
    assert!(Permutation::new(vec![0]).is_ok());
    assert!(Permutation::new(vec![2, 0, 3, 1]).is_ok());
    assert_eq!(
        Err(PermutationError::IndexOutOfRange { index: 1, value: 3, len: 3 }),
        Permutation::new(vec![0, 3, 1])
    );
    assert_eq!(
        Err(PermutationError::DuplicateIndex { index: 2, value: 1 }),
        Permutation::new(vec![1, 0, 1])
    );
}

#[test]
fn test_inverse() {
    let perm = Permutation::new(vec![2, 0, 3, 1]).unwrap();
    let inv = perm.inverse();
    assert_eq!(&[1, 3, 0, 2], inv.as_slice());
    assert!(perm.then(&inv).is_identity());
    assert!(inv.then(&perm).is_identity());
    assert_eq!(perm, inv.inverse());

    let mut values = [10, 20, 30, 40];
    inv.apply_to(&mut values).unwrap();
    assert_eq!([20, 40, 10, 30], values);
}

#[test]
fn test_then() {
    let mut rng = oorandom::Rand64::new(3);
    for len in [0, 1, 5, 31] {
        let fst = Permutation::random(len, || rng.rand_u64());
        let snd = Permutation::random(len, || rng.rand_u64());
        let original = (0..len).map(|i| i as i64 * 3 + 1).collect::<Vec<_>>();

        let mut expected = original.clone();
        fst.apply_to(&mut expected).unwrap();
        snd.apply_to(&mut expected).unwrap();

        let mut actual = original.clone();
        fst.then(&snd).apply_to(&mut actual).unwrap();
        assert_eq!(expected, actual);
    }
}

#[test]
fn test_random_rejects_biased_values() {
    let mut values = [u64::MAX, 1, 0].into_iter();
    let perm = Permutation::random(3, || values.next().unwrap());
    assert_eq!(&[2, 0, 1], perm.as_slice());

    let mut values = [u64::MAX, 7].into_iter();
    assert_eq!(2, uniform_below(5, &mut || values.next().unwrap()));
}

#[test]
fn test_random_is_permutation() {
    let mut rng = oorandom::Rand64::new(1);
    for len in [0, 1, 2, 17, 100] {
        let perm = Permutation::random(len, || rng.rand_u64());
        assert!(is_permutation(perm.as_slice()));
    }
}

#[test]
fn test_apply_to_length_mismatch() {
    let perm = Permutation::identity(3);
    let mut values = [1, 2];
    assert_eq!(Err(PermutationError::LengthMismatch { expected: 2, actual: 3 }), perm.apply_to(&mut values));
    assert_eq!(Err(PermutationError::LengthMismatch { expected: 2, actual: 3 }), perm.apply_inverse_to(&mut values));
    assert_eq!([1, 2], values);
}

#[test]
fn test_check_output() {
    let perm = Permutation::new(vec![2, 0, 1]).unwrap();
    let lines = format!("{}", perm.check()).lines().map(|l| l.to_owned()).collect::<Vec<_>>();
    assert_eq!(3, lines.len());
    assert_eq!("after[ 0     ]    =   before [ 2     ]", lines[0]);
    assert_eq!("after[ 2     ]    =   before [ 1     ]", lines[2]);
    assert_eq!("", format!("{}", Permutation::identity(0).check()));
}

#[test]
fn test_serialize_deserialize() {
    let perm = Permutation::new(vec![3, 1, 0, 2]).unwrap();
    let json = serde_json::to_string(&perm).unwrap();
    assert_eq!("[3,1,0,2]", json);
    assert_eq!(perm, serde_json::from_str::<Permutation>(&json).unwrap());
    assert!(serde_json::from_str::<Permutation>("[0,0]").is_err());
    assert!(serde_json::from_str::<Permutation>("[1,2]").is_err());
}

#[test]
fn test_serialize_deserialize_non_human_readable() {
    let perm = Permutation::new(vec![1, 0, 4, 2, 3]).unwrap();
    let serializer = serde_assert::Serializer::builder().is_human_readable(false).build();
    let tokens = perm.serialize(&serializer).unwrap();
    let mut deserializer = serde_assert::Deserializer::builder(tokens).is_human_readable(false).build();
    assert_eq!(perm, Permutation::deserialize(&mut deserializer).unwrap());
}
