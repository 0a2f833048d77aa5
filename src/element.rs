use std::fmt::{Debug, Display};

use serde::{Deserialize, Serialize};

use crate::buffer::BufferData;

///
/// Tag identifying the scalar type stored in a [`crate::buffer::TypedBuffer`].
///
/// Every supported type has a fixed width of 1, 2, 4 or 8 bytes, and the
/// permutation algorithms only ever look at this width, never at the values.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    U8, I8, U16, I16, U32, I32, U64, I64, F32, F64
}

impl ElementType {

    ///
    /// All supported element types, ordered by width.
    ///
    pub const ALL: [ElementType; 10] = [
        ElementType::U8, ElementType::I8,
        ElementType::U16, ElementType::I16,
        ElementType::U32, ElementType::I32, ElementType::F32,
        ElementType::U64, ElementType::I64, ElementType::F64
    ];

    ///
    /// Returns the number of bytes a single element of this type occupies.
    ///
    pub const fn width(&self) -> usize {
        match self {
            ElementType::U8 | ElementType::I8 => 1,
            ElementType::U16 | ElementType::I16 => 2,
            ElementType::U32 | ElementType::I32 | ElementType::F32 => 4,
            ElementType::U64 | ElementType::I64 | ElementType::F64 => 8
        }
    }

    ///
    /// Returns the name of this type, as used in error messages.
    ///
    pub const fn name(&self) -> &'static str {
        match self {
            ElementType::U8 => "uint8",
            ElementType::I8 => "int8",
            ElementType::U16 => "uint16",
            ElementType::I16 => "int16",
            ElementType::U32 => "uint32",
            ElementType::I32 => "int32",
            ElementType::U64 => "uint64",
            ElementType::I64 => "int64",
            ElementType::F32 => "float32",
            ElementType::F64 => "float64"
        }
    }
}

impl Display for ElementType {

    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

///
/// A scalar that can be stored in a [`crate::buffer::TypedBuffer`].
///
/// Elements are plain old data, so they can be moved around by copying their
/// bytes, and can be reinterpreted from and to raw byte buffers.
///
pub trait Element: bytemuck::Pod + PartialOrd + Debug + Send + Sync + 'static {

    const TYPE: ElementType;

    ///
    /// Compares two elements for sorting. Values that are not comparable to
    /// themselves (i.e. NaNs) compare greater than everything else, so they always
    /// end up at the end of an increasing sort.
    ///
    fn sort_cmp(lhs: &Self, rhs: &Self) -> std::cmp::Ordering {
        match (lhs.partial_cmp(lhs).is_some(), rhs.partial_cmp(rhs).is_some()) {
            (true, true) => lhs.partial_cmp(rhs).unwrap(),
            (true, false) => std::cmp::Ordering::Less,
            (false, true) => std::cmp::Ordering::Greater,
            (false, false) => std::cmp::Ordering::Equal
        }
    }

    ///
    /// Returns whether this element should be placed at the end of a sorted
    /// sequence, independent of the sort direction.
    ///
    fn is_blank(&self) -> bool {
        self.partial_cmp(self).is_none()
    }

    fn into_buffer_data(values: Vec<Self>) -> BufferData;

    fn buffer_values(data: &BufferData) -> Option<&[Self]>;

    fn buffer_values_mut(data: &mut BufferData) -> Option<&mut [Self]>;
}

macro_rules! impl_element {
    ($($ty:ty => $tag:ident),*) => {
        $(
            impl Element for $ty {
                const TYPE: ElementType = ElementType::$tag;

                fn into_buffer_data(values: Vec<Self>) -> BufferData {
                    BufferData::$tag(values)
                }

                fn buffer_values(data: &BufferData) -> Option<&[Self]> {
                    match data {
                        BufferData::$tag(values) => Some(&values[..]),
                        _ => None
                    }
                }

                fn buffer_values_mut(data: &mut BufferData) -> Option<&mut [Self]> {
                    match data {
                        BufferData::$tag(values) => Some(&mut values[..]),
                        _ => None
                    }
                }
            }
        )*
    };
}

impl_element!{
    u8 => U8, i8 => I8,
    u16 => U16, i16 => I16,
    u32 => U32, i32 => I32,
    u64 => U64, i64 => I64,
    f32 => F32, f64 => F64
}

#[test]
fn test_width_matches_size_of() {
    assert_eq!(std::mem::size_of::<u8>(), ElementType::U8.width());
    assert_eq!(std::mem::size_of::<i16>(), ElementType::I16.width());
    assert_eq!(std::mem::size_of::<f32>(), ElementType::F32.width());
    assert_eq!(std::mem::size_of::<u64>(), ElementType::U64.width());
    assert_eq!(std::mem::size_of::<f64>(), <f64 as Element>::TYPE.width());
    for ty in ElementType::ALL {
        assert!([1, 2, 4, 8].contains(&ty.width()));
    }
}

#[test]
fn test_sort_cmp_nan_last() {
    use std::cmp::Ordering;
    assert_eq!(Ordering::Less, f64::sort_cmp(&1., &f64::NAN));
    assert_eq!(Ordering::Greater, f64::sort_cmp(&f64::NAN, &-1.));
    assert_eq!(Ordering::Equal, f32::sort_cmp(&f32::NAN, &f32::NAN));
    assert_eq!(Ordering::Less, i32::sort_cmp(&-3, &2));
    assert!(f32::NAN.is_blank());
    assert!(!7u16.is_blank());
}

#[test]
fn test_element_type_display() {
    assert_eq!("float64", format!("{}", ElementType::F64));
    assert_eq!("int8", format!("{}", ElementType::I8));
    assert_eq!("uint16", ElementType::U16.name());
}
