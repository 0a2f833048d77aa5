use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::element::{Element, ElementType};
use crate::error::PermutationError;
use crate::permutation::Permutation;
use crate::permutation::sort::{sort_index, SortOrder};
use crate::permute::*;
use crate::transpose::{transpose_2d, TransposeStrategy};

///
/// The values of a [`TypedBuffer`], one variant per supported element type.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BufferData {
    U8(#[serde(with = "serde_bytes")] Vec<u8>),
    I8(Vec<i8>),
    U16(Vec<u16>),
    I16(Vec<i16>),
    U32(Vec<u32>),
    I32(Vec<i32>),
    U64(Vec<u64>),
    I64(Vec<i64>),
    F32(Vec<f32>),
    F64(Vec<f64>)
}

///
/// Evaluates `$body` with `$values` bound to the vector inside the given [`BufferData`],
/// whatever its element type.
///
macro_rules! dispatch_buffer_data {
    ($data:expr; $values:ident => $body:expr) => {
        match $data {
            BufferData::U8($values) => $body,
            BufferData::I8($values) => $body,
            BufferData::U16($values) => $body,
            BufferData::I16($values) => $body,
            BufferData::U32($values) => $body,
            BufferData::I32($values) => $body,
            BufferData::U64($values) => $body,
            BufferData::I64($values) => $body,
            BufferData::F32($values) => $body,
            BufferData::F64($values) => $body
        }
    };
}

///
/// Evaluates `$body` with `$T` being the Rust type corresponding to the given
/// [`ElementType`].
///
macro_rules! dispatch_element_type {
    ($element_type:expr; $T:ident => $body:expr) => {
        match $element_type {
            ElementType::U8 => { type $T = u8; $body },
            ElementType::I8 => { type $T = i8; $body },
            ElementType::U16 => { type $T = u16; $body },
            ElementType::I16 => { type $T = i16; $body },
            ElementType::U32 => { type $T = u32; $body },
            ElementType::I32 => { type $T = i32; $body },
            ElementType::U64 => { type $T = u64; $body },
            ElementType::I64 => { type $T = i64; $body },
            ElementType::F32 => { type $T = f32; $body },
            ElementType::F64 => { type $T = f64; $body }
        }
    };
}

impl BufferData {

    pub fn element_type(&self) -> ElementType {
        match self {
            BufferData::U8(_) => ElementType::U8,
            BufferData::I8(_) => ElementType::I8,
            BufferData::U16(_) => ElementType::U16,
            BufferData::I16(_) => ElementType::I16,
            BufferData::U32(_) => ElementType::U32,
            BufferData::I32(_) => ElementType::I32,
            BufferData::U64(_) => ElementType::U64,
            BufferData::I64(_) => ElementType::I64,
            BufferData::F32(_) => ElementType::F32,
            BufferData::F64(_) => ElementType::F64
        }
    }

    pub fn len(&self) -> usize {
        dispatch_buffer_data!(self; values => values.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn values_from_bytes<T: Element>(bytes: &[u8]) -> Vec<T> {
    let mut result = vec![<T as bytemuck::Zeroable>::zeroed(); bytes.len() / std::mem::size_of::<T>()];
    bytemuck::cast_slice_mut::<T, u8>(&mut result).copy_from_slice(bytes);
    return result;
}

fn check_shape(dsize: &[usize], len: usize) -> Result<(), PermutationError> {
    // zero-length dimensions are skipped, so that every partial product (e.g. the row length) fits
    let nonzero_size = dsize.iter().filter(|d| **d != 0).try_fold(1usize, |acc, d| acc.checked_mul(*d));
    let size = nonzero_size.map(|size| if dsize.contains(&0) { 0 } else { size });
    if dsize.is_empty() || size != Some(len) {
        return Err(PermutationError::ShapeMismatch { dsize: dsize.to_vec(), len });
    }
    return Ok(());
}

///
/// An owned, contiguous array of elements of a single [`ElementType`], together with its
/// shape.
///
/// The shape `dsize` is given in row-major order, i.e. the last dimension varies fastest,
/// and the number of elements is always the product of all entries of `dsize`. The first
/// dimension is the "row" dimension: When used as a table column, a buffer of shape
/// `[n]` stores one value per row, and a buffer of shape `[n, m]` stores a vector of `m`
/// values per row.
///
/// # Example
/// ```rust
/// # use typed_permute::buffer::*;
/// # use typed_permute::permutation::*;
/// let mut buffer = TypedBuffer::new(vec![1i16, 2, 3, 4, 5, 6], vec![3, 2]).unwrap();
/// let perm = Permutation::new(vec![2, 0, 1]).unwrap();
/// buffer.apply_permutation_only_dim0(Some(&perm)).unwrap();
/// assert_eq!(Some(&[5i16, 6, 1, 2, 3, 4][..]), buffer.values::<i16>());
/// ```
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TypedBufferRepr")]
pub struct TypedBuffer {
    data: BufferData,
    dsize: Vec<usize>
}

#[derive(Deserialize)]
struct TypedBufferRepr {
    data: BufferData,
    dsize: Vec<usize>
}

impl TryFrom<TypedBufferRepr> for TypedBuffer {
    type Error = PermutationError;

    fn try_from(value: TypedBufferRepr) -> Result<Self, Self::Error> {
        check_shape(&value.dsize, value.data.len())?;
        return Ok(Self { data: value.data, dsize: value.dsize });
    }
}

impl TypedBuffer {

    ///
    /// Creates a buffer with the given values and shape, failing if the shape does not
    /// describe exactly `values.len()` elements.
    ///
    pub fn new<T: Element>(values: Vec<T>, dsize: Vec<usize>) -> Result<Self, PermutationError> {
        check_shape(&dsize, values.len())?;
        return Ok(Self { data: T::into_buffer_data(values), dsize });
    }

    ///
    /// Creates a one-dimensional buffer.
    ///
    pub fn from_vec<T: Element>(values: Vec<T>) -> Self {
        let dsize = vec![values.len()];
        Self { data: T::into_buffer_data(values), dsize }
    }

    ///
    /// Creates a buffer by reinterpreting the given bytes (in native byte order) as
    /// elements of the given type.
    ///
    /// The bytes do not have to be aligned.
    ///
    /// # Example
    /// ```rust
    /// # use typed_permute::buffer::*;
    /// # use typed_permute::element::*;
    /// let bytes = [1u16, 2, 3].iter().flat_map(|x| x.to_ne_bytes()).collect::<Vec<_>>();
    /// let buffer = TypedBuffer::from_bytes(ElementType::U16, &bytes, vec![3]).unwrap();
    /// assert_eq!(Some(&[1u16, 2, 3][..]), buffer.values::<u16>());
    /// ```
    ///
    pub fn from_bytes(element_type: ElementType, bytes: &[u8], dsize: Vec<usize>) -> Result<Self, PermutationError> {
        if bytes.len() % element_type.width() != 0 {
            return Err(PermutationError::ByteLengthMismatch { element_type, len: bytes.len() });
        }
        dispatch_element_type!(element_type; T => Self::new(values_from_bytes::<T>(bytes), dsize))
    }

    ///
    /// Returns the values of this buffer as bytes, in native byte order.
    ///
    pub fn as_bytes(&self) -> &[u8] {
        dispatch_buffer_data!(&self.data; values => bytemuck::cast_slice(&values[..]))
    }

    pub fn element_type(&self) -> ElementType {
        self.data.element_type()
    }

    pub fn data(&self) -> &BufferData {
        &self.data
    }

    pub fn dsize(&self) -> &[usize] {
        &self.dsize
    }

    pub fn ndim(&self) -> usize {
        self.dsize.len()
    }

    ///
    /// Returns the total number of elements.
    ///
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    ///
    /// Returns the length of the first dimension.
    ///
    pub fn row_count(&self) -> usize {
        self.dsize[0]
    }

    ///
    /// Returns the number of elements per entry of the first dimension.
    ///
    pub fn row_len(&self) -> usize {
        self.dsize[1..].iter().product()
    }

    ///
    /// Returns the values, if they are of type `T`.
    ///
    pub fn values<T: Element>(&self) -> Option<&[T]> {
        T::buffer_values(&self.data)
    }

    ///
    /// Returns the values mutably, if they are of type `T`.
    ///
    pub fn values_mut<T: Element>(&mut self) -> Option<&mut [T]> {
        T::buffer_values_mut(&mut self.data)
    }

    ///
    /// Returns the values and the shape of this buffer.
    ///
    pub fn into_data(self) -> (BufferData, Vec<usize>) {
        (self.data, self.dsize)
    }

    ///
    /// Reorders all elements, such that afterwards the `i`-th element is the one
    /// that was at position `perm.at(i)` before. If no permutation is given, nothing
    /// happens.
    ///
    /// Multi-dimensional buffers are treated as a flat sequence of elements, their shape
    /// does not change.
    ///
    #[instrument(skip_all, level = "trace", fields(element_type = %self.element_type(), len = self.len()))]
    pub fn apply_permutation(&mut self, perm: Option<&Permutation>) -> Result<(), PermutationError> {
        if let Some(perm) = perm {
            perm.check_len(self.len())?;
            self.permute_elements(perm.as_slice(), false);
        }
        return Ok(());
    }

    ///
    /// Reorders the entries of the first dimension, such that afterwards the `i`-th row
    /// is the one that was at position `perm.at(i)` before. The values within a row are
    /// not reordered. If no permutation is given, nothing happens.
    ///
    /// For one-dimensional buffers, this is the same as [`TypedBuffer::apply_permutation()`].
    ///
    #[instrument(skip_all, level = "trace", fields(element_type = %self.element_type(), dsize = ?self.dsize))]
    pub fn apply_permutation_only_dim0(&mut self, perm: Option<&Permutation>) -> Result<(), PermutationError> {
        if let Some(perm) = perm {
            perm.check_len(self.row_count())?;
            self.permute_rows(perm.as_slice());
        }
        return Ok(());
    }

    ///
    /// Reorders all elements, such that afterwards the element at position `perm.at(i)`
    /// is the one that was at position `i` before. If no permutation is given, nothing
    /// happens.
    ///
    #[instrument(skip_all, level = "trace", fields(element_type = %self.element_type(), len = self.len()))]
    pub fn apply_inverse_permutation(&mut self, perm: Option<&Permutation>) -> Result<(), PermutationError> {
        if let Some(perm) = perm {
            perm.check_len(self.len())?;
            self.permute_elements(perm.as_slice(), true);
        }
        return Ok(());
    }

    pub(crate) fn permute_elements(&mut self, perm: &[usize], inverse: bool) {
        if inverse {
            dispatch_buffer_data!(&mut self.data; values => apply_inverse_permutation(values, perm))
        } else {
            dispatch_buffer_data!(&mut self.data; values => apply_permutation(values, perm))
        }
    }

    pub(crate) fn permute_rows(&mut self, perm: &[usize]) {
        let row_len = self.row_len();
        dispatch_buffer_data!(&mut self.data; values => apply_permutation_blocks(values, row_len, perm))
    }

    ///
    /// Transposes a two-dimensional buffer, swapping the entries of its shape.
    ///
    /// # Panics
    ///
    /// If the buffer is not two-dimensional.
    ///
    #[instrument(skip_all, level = "trace", fields(element_type = %self.element_type(), dsize = ?self.dsize))]
    pub fn transpose_2d(&mut self) -> TransposeStrategy {
        dispatch_buffer_data!(&mut self.data; values => transpose_2d(values, &mut self.dsize))
    }

    ///
    /// Returns the permutation that sorts all elements of this buffer, see
    /// [`sort_index()`].
    ///
    pub fn sort_index(&self, order: SortOrder) -> Permutation {
        dispatch_buffer_data!(&self.data; values => sort_index(values, order))
    }

    ///
    /// Creates a new buffer consisting of the given rows of this buffer, in the given order.
    /// Rows may be repeated or left out.
    ///
    /// # Panics
    ///
    /// If one of the indices is not smaller than [`TypedBuffer::row_count()`].
    ///
    pub fn select_rows(&self, rows: &[usize]) -> TypedBuffer {
        let row_len = self.row_len();
        let data = dispatch_buffer_data!(&self.data; values => {
            let mut result = Vec::with_capacity(rows.len() * row_len);
            for row in rows {
                assert!(*row < self.row_count(), "select_rows: row {} does not exist in a buffer with {} rows", row, self.row_count());
                result.extend_from_slice(&values[(row * row_len)..((row + 1) * row_len)]);
            }
            Element::into_buffer_data(result)
        });
        let mut dsize = self.dsize.clone();
        dsize[0] = rows.len();
        return TypedBuffer { data, dsize };
    }
}

impl<T: Element> From<Vec<T>> for TypedBuffer {

    fn from(value: Vec<T>) -> Self {
        Self::from_vec(value)
    }
}

#[test]
fn test_new_checks_shape() {
    assert!(TypedBuffer::new(vec![1u8, 2, 3, 4, 5, 6], vec![2, 3]).is_ok());
    assert!(TypedBuffer::new(Vec::<f32>::new(), vec![0, 3]).is_ok());
    assert_eq!(
        Err(PermutationError::ShapeMismatch { dsize: vec![4, 2], len: 6 }),
        TypedBuffer::new(vec![1u8, 2, 3, 4, 5, 6], vec![4, 2])
    );
    assert!(TypedBuffer::new(vec![1u8], vec![]).is_err());
    assert_eq!(
        Err(PermutationError::ShapeMismatch { dsize: vec![1 << 32, 1 << 32, 0], len: 0 }),
        TypedBuffer::new(Vec::<u8>::new(), vec![1 << 32, 1 << 32, 0])
    );
    assert!(TypedBuffer::new(vec![1u8], vec![usize::MAX, 2, usize::MAX / 2 + 1]).is_err());
    assert!(TypedBuffer::new(Vec::<u8>::new(), vec![0, usize::MAX, 2]).is_err());
}

#[test]
fn test_apply_permutation() {
    let mut buffer = TypedBuffer::from_vec(vec![10i32, 20, 30, 40]);
    let perm = Permutation::new(vec![2, 0, 3, 1]).unwrap();
    buffer.apply_permutation(Some(&perm)).unwrap();
    assert_eq!(Some(&[30, 10, 40, 20][..]), buffer.values::<i32>());

    buffer.apply_inverse_permutation(Some(&perm)).unwrap();
    assert_eq!(Some(&[10, 20, 30, 40][..]), buffer.values::<i32>());

    buffer.apply_inverse_permutation(Some(&perm)).unwrap();
    assert_eq!(Some(&[20, 40, 10, 30][..]), buffer.values::<i32>());
}

#[test]
fn test_no_permutation() {
    let mut buffer = TypedBuffer::from_vec(vec![3.5f64, -1., 2.]);
    let expected = buffer.clone();
    buffer.apply_permutation(None).unwrap();
    buffer.apply_permutation_only_dim0(None).unwrap();
    buffer.apply_inverse_permutation(None).unwrap();
    assert_eq!(expected, buffer);
}

#[test]
fn test_apply_permutation_only_dim0() {
    let mut buffer = TypedBuffer::new(vec![1u32, 2, 3, 4, 5, 6], vec![3, 2]).unwrap();
    let perm = Permutation::new(vec![2, 0, 1]).unwrap();
    buffer.apply_permutation_only_dim0(Some(&perm)).unwrap();
    assert_eq!(Some(&[5, 6, 1, 2, 3, 4][..]), buffer.values::<u32>());
    assert_eq!(&[3, 2], buffer.dsize());

    let mut buffer = TypedBuffer::new((0..24).map(|x| x as f32).collect(), vec![2, 3, 4]).unwrap();
    let perm = Permutation::new(vec![1, 0]).unwrap();
    buffer.apply_permutation_only_dim0(Some(&perm)).unwrap();
    let values = buffer.values::<f32>().unwrap();
    assert_eq!(12., values[0]);
    assert_eq!(23., values[11]);
    assert_eq!(0., values[12]);
}

#[test]
fn test_apply_permutation_only_dim0_one_dimensional() {
    let mut buffer = TypedBuffer::from_vec(vec![10i8, 20, 30, 40]);
    let perm = Permutation::new(vec![2, 0, 3, 1]).unwrap();
    buffer.apply_permutation_only_dim0(Some(&perm)).unwrap();
    assert_eq!(Some(&[30, 10, 40, 20][..]), buffer.values::<i8>());
}

#[test]
fn test_length_mismatch() {
    let mut buffer = TypedBuffer::new(vec![1u32, 2, 3, 4, 5, 6], vec![3, 2]).unwrap();
    let perm = Permutation::identity(6);
    assert!(buffer.apply_permutation(Some(&perm)).is_ok());
    assert_eq!(Err(PermutationError::LengthMismatch { expected: 3, actual: 6 }), buffer.apply_permutation_only_dim0(Some(&perm)));
    assert_eq!(Err(PermutationError::LengthMismatch { expected: 6, actual: 3 }), buffer.apply_inverse_permutation(Some(&Permutation::identity(3))));
}

#[test]
fn test_empty_and_single() {
    for dsize in [vec![0], vec![0, 4], vec![1], vec![1, 1]] {
        let len = dsize.iter().product::<usize>();
        let mut buffer = TypedBuffer::new(vec![7u64; len], dsize.clone()).unwrap();
        let expected = buffer.clone();
        buffer.apply_permutation(Some(&Permutation::identity(len))).unwrap();
        buffer.apply_inverse_permutation(Some(&Permutation::identity(len))).unwrap();
        buffer.apply_permutation_only_dim0(Some(&Permutation::identity(dsize[0]))).unwrap();
        if dsize.len() == 2 {
            buffer.transpose_2d();
            buffer.transpose_2d();
        }
        assert_eq!(expected, buffer);
    }
}

#[test]
fn test_transpose_2d() {
    let mut buffer = TypedBuffer::new(vec![1i64, 2, 3, 4], vec![2, 2]).unwrap();
    assert_eq!(TransposeStrategy::Square, buffer.transpose_2d());
    assert_eq!(Some(&[1, 3, 2, 4][..]), buffer.values::<i64>());

    let mut buffer = TypedBuffer::new(vec![7u16, 8, 9], vec![1, 3]).unwrap();
    assert_eq!(TransposeStrategy::Relabel, buffer.transpose_2d());
    assert_eq!(&[3, 1], buffer.dsize());
    assert_eq!(Some(&[7, 8, 9][..]), buffer.values::<u16>());

    let mut buffer = TypedBuffer::new(vec![1f32, 2., 3., 4., 5., 6.], vec![3, 2]).unwrap();
    assert_eq!(TransposeStrategy::Rectangular, buffer.transpose_2d());
    assert_eq!(&[2, 3], buffer.dsize());
    assert_eq!(Some(&[1., 3., 5., 2., 4., 6.][..]), buffer.values::<f32>());
}

#[test]
#[should_panic(expected = "only 2D inputs are supported")]
fn test_transpose_2d_one_dimensional() {
    let mut buffer = TypedBuffer::from_vec(vec![1u8, 2, 3]);
    buffer.transpose_2d();
}

#[test]
fn test_bytes() {
    let original = vec![1.5f64, -2.25, 1e10];
    let buffer = TypedBuffer::from_vec(original.clone());
    assert_eq!(24, buffer.as_bytes().len());

    let copy = TypedBuffer::from_bytes(ElementType::F64, buffer.as_bytes(), vec![3]).unwrap();
    assert_eq!(buffer, copy);
    assert_eq!(
        Err(PermutationError::ByteLengthMismatch { element_type: ElementType::U32, len: 6 }),
        TypedBuffer::from_bytes(ElementType::U32, &[0; 6], vec![1])
    );
    assert!(TypedBuffer::from_bytes(ElementType::U16, &[0; 6], vec![2]).is_err());
}

#[test]
fn test_bytes_permutation_matches_typed() {
    let mut rng = oorandom::Rand64::new(7);
    for element_type in ElementType::ALL {
        let len = 13;
        let bytes = (0..(len * element_type.width())).map(|_| rng.rand_u64() as u8).collect::<Vec<_>>();
        let perm = Permutation::random(len, || rng.rand_u64());

        let mut buffer = TypedBuffer::from_bytes(element_type, &bytes, vec![len]).unwrap();
        buffer.apply_permutation(Some(&perm)).unwrap();
        let mut raw = bytes.clone();
        apply_permutation_bytes(&mut raw, element_type.width(), perm.as_slice());
        assert_eq!(&raw[..], buffer.as_bytes());

        buffer.apply_inverse_permutation(Some(&perm)).unwrap();
        assert_eq!(&bytes[..], buffer.as_bytes());
    }
}

#[test]
fn test_values_wrong_type() {
    let mut buffer = TypedBuffer::from_vec(vec![1u8, 2]);
    assert!(buffer.values::<i8>().is_none());
    assert!(buffer.values_mut::<u16>().is_none());
    buffer.values_mut::<u8>().unwrap()[0] = 5;
    assert_eq!(Some(&[5, 2][..]), buffer.values::<u8>());
}

#[test]
fn test_into_data() {
    let buffer = TypedBuffer::new(vec![1i32, 2, 3, 4, 5, 6], vec![2, 3]).unwrap();
    let (data, dsize) = buffer.into_data();
    assert_eq!(BufferData::I32(vec![1, 2, 3, 4, 5, 6]), data);
    assert_eq!(vec![2, 3], dsize);
    assert_eq!(ElementType::I32, data.element_type());
    assert_eq!(6, data.len());
}

#[test]
fn test_sort_index() {
    let buffer = TypedBuffer::from_vec(vec![0.5f32, f32::NAN, -3.]);
    assert_eq!(&[2, 0, 1], buffer.sort_index(SortOrder::Increasing).as_slice());
}

#[test]
fn test_select_rows() {
    let buffer = TypedBuffer::new(vec![1i16, 2, 3, 4, 5, 6], vec![3, 2]).unwrap();
    let selected = buffer.select_rows(&[2, 0]);
    assert_eq!(&[2, 2], selected.dsize());
    assert_eq!(Some(&[5, 6, 1, 2][..]), selected.values::<i16>());

    let selected = buffer.select_rows(&[]);
    assert_eq!(&[0, 2], selected.dsize());
    assert!(selected.is_empty());
}

#[test]
fn test_serialize_deserialize() {
    let buffer = TypedBuffer::new(vec![1u8, 2, 3, 4], vec![2, 2]).unwrap();
    let json = serde_json::to_string(&buffer).unwrap();
    assert_eq!(buffer, serde_json::from_str::<TypedBuffer>(&json).unwrap());

    let buffer = TypedBuffer::new(vec![-1.5f64, 0.25], vec![2]).unwrap();
    let json = serde_json::to_string(&buffer).unwrap();
    assert_eq!("{\"data\":{\"F64\":[-1.5,0.25]},\"dsize\":[2]}", json);
    assert_eq!(buffer, serde_json::from_str::<TypedBuffer>(&json).unwrap());

    assert!(serde_json::from_str::<TypedBuffer>("{\"data\":{\"I32\":[1,2,3]},\"dsize\":[2]}").is_err());
    assert!(serde_json::from_str::<TypedBuffer>("{\"data\":{\"U8\":[]},\"dsize\":[4294967296,4294967296,0]}").is_err());
}
