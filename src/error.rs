use thiserror::Error;

use crate::element::ElementType;

///
/// Errors returned by the typed layer of this crate, i.e. by [`crate::permutation::Permutation`],
/// [`crate::buffer::TypedBuffer`] and [`crate::table::Table`].
///
/// The slice-level functions in [`crate::permute`] and [`crate::transpose`] do not return
/// errors, they panic if their inputs are inconsistent.
///
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermutationError {

    /// An index of a permutation is not smaller than its length.
    #[error("index {value} at position {index} is out of range for a permutation of length {len}")]
    IndexOutOfRange { index: usize, value: usize, len: usize },

    /// An index occurs more than once in a permutation.
    #[error("index {value} at position {index} occurs more than once")]
    DuplicateIndex { index: usize, value: usize },

    /// A permutation does not have as many entries as the dimension it is applied to.
    #[error("permutation of length {actual} cannot be applied to a dimension of length {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("shape {dsize:?} does not describe {len} elements")]
    ShapeMismatch { dsize: Vec<usize>, len: usize },

    #[error("{len} bytes cannot hold a whole number of {element_type} elements")]
    ByteLengthMismatch { element_type: ElementType, len: usize },

    #[error("column {column} has {actual} rows, but the table has {expected} rows")]
    RowCountMismatch { column: usize, expected: usize, actual: usize },

    #[error("column {column} does not exist, the table has {count} columns")]
    ColumnOutOfRange { column: usize, count: usize },

    #[error("rows {start}..{end} are not a range of rows of a table with {count} rows")]
    RowRangeOutOfRange { start: usize, end: usize, count: usize },

    /// Inverse permutations only work on single elements, not on the rows of vector columns.
    #[error("inverse permutation on vector column {column} is not supported")]
    InverseOnVectorColumn { column: usize },

    #[error("column {column} is a vector column and cannot be sorted")]
    VectorSortColumn { column: usize }
}

#[test]
fn test_error_messages() {
    assert_eq!(
        "index 5 at position 2 is out of range for a permutation of length 4",
        format!("{}", PermutationError::IndexOutOfRange { index: 2, value: 5, len: 4 })
    );
    assert_eq!(
        "12 bytes cannot hold a whole number of float64 elements",
        format!("{}", PermutationError::ByteLengthMismatch { element_type: ElementType::F64, len: 12 })
    );
}
