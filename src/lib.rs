#![allow(soft_unstable)]
#![feature(test)]
#![feature(allocator_api)]

#![doc = include_str!("../Readme.md")]

extern crate test;

///
/// Contains [`element::ElementType`], the tag of the scalar types supported by
/// [`buffer::TypedBuffer`], and the trait [`element::Element`] implemented by them.
///
pub mod element;

///
/// Contains [`error::PermutationError`], the error type of the checked operations.
///
pub mod error;

///
/// Contains the in-place cycle-following algorithms [`permute::apply_permutation()`],
/// [`permute::apply_permutation_blocks()`] and [`permute::apply_inverse_permutation()`],
/// working on slices of any [`Copy`] type, or on raw bytes of a given element width.
///
pub mod permute;

///
/// Contains [`transpose::transpose_2d()`] for transposing row-major matrices.
///
pub mod transpose;

///
/// Contains [`permutation::Permutation`], a validated permutation, and index sorting.
///
pub mod permutation;

///
/// Contains [`buffer::TypedBuffer`], a shaped buffer whose element type is only known
/// at runtime.
///
pub mod buffer;

///
/// Contains [`table::Table`], a list of [`buffer::TypedBuffer`] columns whose rows are
/// permuted together.
///
pub mod table;

///
/// Contains [`tracing::LogAlgorithmSubscriber`], a simple subscriber for the spans opened
/// by the algorithms of this crate.
///
pub mod tracing;

mod parallel;

#[cfg(feature = "ndarray")]
mod interop;
