use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::buffer::TypedBuffer;
use crate::error::PermutationError;
use crate::parallel::{potential_parallel_for_each, potential_parallel_map};
use crate::permutation::Permutation;
use crate::permutation::sort::SortOrder;

///
/// A list of columns that all have the same number of rows.
///
/// A column is a [`TypedBuffer`] whose first dimension indexes the rows. One-dimensional
/// columns hold a single value per row, multi-dimensional ("vector") columns hold
/// a fixed number of values per row.
///
/// All operations on a [`Table`] work on all columns at once, i.e. reordering rows
/// keeps every row consistent across columns. If the feature `parallel` is enabled,
/// the columns are processed concurrently.
///
/// # Example
/// ```rust
/// # use typed_permute::buffer::*;
/// # use typed_permute::table::*;
/// # use typed_permute::permutation::sort::*;
/// let mut table = Table::new(vec![
///     TypedBuffer::from_vec(vec![3.5f64, 1.5, 2.5]),
///     TypedBuffer::from_vec(vec![30u8, 10, 20]),
/// ]).unwrap();
/// table.sort_by_column(0, SortOrder::Increasing).unwrap();
/// assert_eq!(Some(&[1.5, 2.5, 3.5][..]), table.column(0).values::<f64>());
/// assert_eq!(Some(&[10, 20, 30][..]), table.column(1).values::<u8>());
/// ```
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TypedBuffer>", into = "Vec<TypedBuffer>")]
pub struct Table {
    columns: Vec<TypedBuffer>,
    row_count: usize
}

impl Table {

    ///
    /// Creates a new table, failing if not all columns have the same number of rows.
    ///
    pub fn new(columns: Vec<TypedBuffer>) -> Result<Self, PermutationError> {
        let row_count = columns.first().map(|column| column.row_count()).unwrap_or(0);
        for (i, column) in columns.iter().enumerate() {
            if column.row_count() != row_count {
                return Err(PermutationError::RowCountMismatch { column: i, expected: row_count, actual: column.row_count() });
            }
        }
        return Ok(Self { columns, row_count });
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    ///
    /// Returns the `i`-th column.
    ///
    /// # Panics
    ///
    /// If `i >= self.column_count()`.
    ///
    pub fn column(&self, i: usize) -> &TypedBuffer {
        &self.columns[i]
    }

    pub fn columns(&self) -> &[TypedBuffer] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<TypedBuffer> {
        self.columns
    }

    ///
    /// Reorders the rows of all columns using the given permutation, i.e. afterwards the
    /// `i`-th row is the row that was at position `perm.at(i)` before. If `inverse` is set,
    /// the inverse permutation is applied instead, i.e. afterwards row `perm.at(i)` is the
    /// row that was at position `i` before.
    ///
    /// Inverse permutations can only be applied to tables without vector columns. This is
    /// checked before any column is modified, so if an error is returned, the table is
    /// unchanged.
    ///
    #[instrument(skip_all, level = "trace", fields(inverse = inverse))]
    pub fn apply_permutation(&mut self, perm: &Permutation, inverse: bool) -> Result<(), PermutationError> {
        perm.check_len(self.row_count)?;
        if inverse {
            if let Some(column) = self.columns.iter().position(|column| column.ndim() > 1) {
                return Err(PermutationError::InverseOnVectorColumn { column });
            }
        }
        debug!(columns = self.columns.len(), rows = self.row_count, inverse = inverse, "permuting table");
        potential_parallel_for_each(&mut self.columns, |_, column: &mut TypedBuffer| {
            if column.ndim() == 1 {
                column.permute_elements(perm.as_slice(), inverse);
            } else {
                column.permute_rows(perm.as_slice());
            }
        });
        return Ok(());
    }

    ///
    /// Sorts the rows of the table by the values in the given column, and returns the
    /// permutation that was applied. Blank values (NaN) are moved to the end. The sort is
    /// stable.
    ///
    #[instrument(skip_all, level = "trace", fields(column = column))]
    pub fn sort_by_column(&mut self, column: usize, order: SortOrder) -> Result<Permutation, PermutationError> {
        let sort_column = self.columns.get(column).ok_or(PermutationError::ColumnOutOfRange { column, count: self.columns.len() })?;
        if sort_column.ndim() > 1 {
            return Err(PermutationError::VectorSortColumn { column });
        }
        let perm = sort_column.sort_index(order);
        self.apply_permutation(&perm, false)?;
        return Ok(perm);
    }

    ///
    /// Replaces every column by a newly allocated column, consisting of the rows
    /// `perm.at(rows.start), ..., perm.at(rows.end - 1)` (in this order) of the old
    /// column.
    ///
    /// This is useful when `perm` orders the rows by some criterion (e.g. matched rows
    /// first, unmatched rows last), and only a part of the rows should be kept.
    ///
    /// If `rows` is not a range within `0..self.row_count()`, the table is left unchanged
    /// and an error is returned.
    ///
    /// # Example
    /// ```rust
    /// # use typed_permute::buffer::*;
    /// # use typed_permute::table::*;
    /// # use typed_permute::permutation::*;
    /// let mut table = Table::new(vec![TypedBuffer::from_vec(vec![10i32, 20, 30, 40])]).unwrap();
    /// let perm = Permutation::new(vec![3, 1, 0, 2]).unwrap();
    /// table.arrange_rows(&perm, 0..2).unwrap();
    /// assert_eq!(2, table.row_count());
    /// assert_eq!(Some(&[40, 20][..]), table.column(0).values::<i32>());
    /// ```
    ///
    #[instrument(skip_all, level = "trace", fields(start = rows.start, end = rows.end))]
    pub fn arrange_rows(&mut self, perm: &Permutation, rows: Range<usize>) -> Result<(), PermutationError> {
        perm.check_len(self.row_count)?;
        if rows.start > rows.end || rows.end > self.row_count {
            return Err(PermutationError::RowRangeOutOfRange { start: rows.start, end: rows.end, count: self.row_count });
        }
        let selected = &perm.as_slice()[rows.clone()];
        debug!(columns = self.columns.len(), rows = selected.len(), "arranging rows");
        self.columns = potential_parallel_map(&self.columns, |column: &TypedBuffer| column.select_rows(selected));
        self.row_count = selected.len();
        return Ok(());
    }
}

impl TryFrom<Vec<TypedBuffer>> for Table {
    type Error = PermutationError;

    fn try_from(value: Vec<TypedBuffer>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Table> for Vec<TypedBuffer> {

    fn from(value: Table) -> Self {
        value.columns
    }
}

#[cfg(test)]
fn test_table() -> Table {
    Table::new(vec![
        TypedBuffer::from_vec(vec![2.5f32, f32::NAN, -1., 4.]),
        TypedBuffer::from_vec(vec![1u16, 2, 3, 4]),
        TypedBuffer::new(vec![1i64, 10, 2, 20, 3, 30, 4, 40], vec![4, 2]).unwrap()
    ]).unwrap()
}

#[test]
fn test_new_checks_row_count() {
    assert_eq!(
        Err(PermutationError::RowCountMismatch { column: 1, expected: 3, actual: 2 }),
        Table::new(vec![TypedBuffer::from_vec(vec![1u8, 2, 3]), TypedBuffer::new(vec![1u8, 2, 3, 4, 5, 6], vec![2, 3]).unwrap()])
    );
    let empty = Table::new(Vec::new()).unwrap();
    assert_eq!(0, empty.row_count());
    assert_eq!(0, empty.column_count());
}

#[test]
fn test_apply_permutation() {
    let mut table = test_table();
    let perm = Permutation::new(vec![3, 0, 2, 1]).unwrap();
    table.apply_permutation(&perm, false).unwrap();
    assert_eq!(Some(&[4, 1, 3, 2][..]), table.column(1).values::<u16>());
    assert_eq!(Some(&[4, 40, 1, 10, 3, 30, 2, 20][..]), table.column(2).values::<i64>());
    assert_eq!(&[4, 2], table.column(2).dsize());
}

#[test]
fn test_apply_inverse_permutation() {
    let mut table = Table::new(vec![
        TypedBuffer::from_vec(vec![10i32, 20, 30, 40]),
        TypedBuffer::from_vec(vec![1u8, 2, 3, 4])
    ]).unwrap();
    let perm = Permutation::new(vec![2, 0, 3, 1]).unwrap();
    table.apply_permutation(&perm, true).unwrap();
    assert_eq!(Some(&[20, 40, 10, 30][..]), table.column(0).values::<i32>());
    assert_eq!(Some(&[2, 4, 1, 3][..]), table.column(1).values::<u8>());
    table.apply_permutation(&perm, false).unwrap();
    assert_eq!(Some(&[10, 20, 30, 40][..]), table.column(0).values::<i32>());
}

#[test]
fn test_inverse_on_vector_column() {
    let mut table = test_table();
    let expected = table.clone();
    let perm = Permutation::new(vec![3, 0, 2, 1]).unwrap();
    assert_eq!(Err(PermutationError::InverseOnVectorColumn { column: 2 }), table.apply_permutation(&perm, true));
    for (expected, actual) in expected.columns().iter().zip(table.columns().iter()) {
        assert_eq!(expected.as_bytes(), actual.as_bytes());
    }
}

#[test]
fn test_apply_permutation_length_mismatch() {
    let mut table = test_table();
    assert_eq!(
        Err(PermutationError::LengthMismatch { expected: 4, actual: 3 }),
        table.apply_permutation(&Permutation::identity(3), false)
    );
}

#[test]
fn test_sort_by_column() {
    let mut table = test_table();
    let perm = table.sort_by_column(0, SortOrder::Increasing).unwrap();
    assert_eq!(&[2, 0, 3, 1], perm.as_slice());
    assert_eq!(Some(&[3, 1, 4, 2][..]), table.column(1).values::<u16>());
    assert_eq!(Some(&[3, 30, 1, 10, 4, 40, 2, 20][..]), table.column(2).values::<i64>());
    let sorted = table.column(0).values::<f32>().unwrap();
    assert_eq!(&[-1., 2.5, 4.], &sorted[..3]);
    assert!(sorted[3].is_nan());

    let mut table = test_table();
    table.sort_by_column(1, SortOrder::Decreasing).unwrap();
    assert_eq!(Some(&[4, 3, 2, 1][..]), table.column(1).values::<u16>());
}

#[test]
fn test_sort_by_invalid_column() {
    let mut table = test_table();
    assert_eq!(Err(PermutationError::VectorSortColumn { column: 2 }), table.sort_by_column(2, SortOrder::Increasing));
    assert_eq!(Err(PermutationError::ColumnOutOfRange { column: 3, count: 3 }), table.sort_by_column(3, SortOrder::Increasing));
}

#[test]
fn test_arrange_rows() {
    let mut table = test_table();
    let perm = Permutation::new(vec![1, 3, 0, 2]).unwrap();
    table.arrange_rows(&perm, 1..4).unwrap();
    assert_eq!(3, table.row_count());
    assert_eq!(Some(&[4, 1, 3][..]), table.column(1).values::<u16>());
    assert_eq!(Some(&[4, 40, 1, 10, 3, 30][..]), table.column(2).values::<i64>());
    assert_eq!(&[3, 2], table.column(2).dsize());

    assert_eq!(
        Err(PermutationError::RowRangeOutOfRange { start: 2, end: 4, count: 3 }),
        table.arrange_rows(&Permutation::identity(3), 2..4)
    );
    assert_eq!(
        Err(PermutationError::RowRangeOutOfRange { start: 2, end: 1, count: 3 }),
        table.arrange_rows(&Permutation::identity(3), 2..1)
    );
    assert_eq!(3, table.row_count());

    table.arrange_rows(&Permutation::identity(3), 0..0).unwrap();
    assert_eq!(0, table.row_count());
    assert!(table.columns().iter().all(|column| column.is_empty()));
}

#[test]
fn test_serialize_deserialize() {
    let table = Table::new(vec![
        TypedBuffer::from_vec(vec![1u32, 2]),
        TypedBuffer::new(vec![1i8, 2, 3, 4], vec![2, 2]).unwrap()
    ]).unwrap();
    let json = serde_json::to_string(&table).unwrap();
    assert_eq!(table, serde_json::from_str::<Table>(&json).unwrap());

    let inconsistent = "[{\"data\":{\"U32\":[1,2]},\"dsize\":[2]},{\"data\":{\"U32\":[1]},\"dsize\":[1]}]";
    assert!(serde_json::from_str::<Table>(inconsistent).is_err());
}
