use ndarray::Array2;

use crate::buffer::TypedBuffer;
use crate::element::Element;

impl TypedBuffer {

    ///
    /// Creates a two-dimensional buffer with the same shape and entries as the given
    /// array. Arrays that are not in row-major layout are copied into row-major layout
    /// first.
    ///
    #[stability::unstable(feature = "enable")]
    pub fn from_array2<T: Element>(array: Array2<T>) -> Self {
        let (rows, cols) = array.dim();
        let array = if array.is_standard_layout() { array } else { array.as_standard_layout().into_owned() };
        return TypedBuffer::new(array.into_raw_vec(), vec![rows, cols]).unwrap();
    }

    ///
    /// Copies a two-dimensional buffer with elements of type `T` into an [`Array2`].
    /// Returns `None` if the buffer is not two-dimensional or has another element type.
    ///
    #[stability::unstable(feature = "enable")]
    pub fn to_array2<T: Element>(&self) -> Option<Array2<T>> {
        if self.ndim() != 2 {
            return None;
        }
        let values = self.values::<T>()?;
        return Array2::from_shape_vec((self.dsize()[0], self.dsize()[1]), values.to_vec()).ok();
    }
}

#[test]
fn test_from_to_array2() {
    let array = ndarray::arr2(&[[1i32, 2, 3], [4, 5, 6]]);
    let mut buffer = TypedBuffer::from_array2(array.clone());
    assert_eq!(&[2, 3], buffer.dsize());
    assert_eq!(Some(array.clone()), buffer.to_array2::<i32>());
    assert_eq!(None, buffer.to_array2::<u32>());

    buffer.transpose_2d();
    assert_eq!(Some(array.t().to_owned()), buffer.to_array2::<i32>());
}

#[test]
fn test_from_array2_column_major() {
    let array = ndarray::arr2(&[[1.5f64, 2.5], [3.5, 4.5], [5.5, 6.5]]).reversed_axes();
    let buffer = TypedBuffer::from_array2(array.clone());
    assert_eq!(&[2, 3], buffer.dsize());
    assert_eq!(Some(&[1.5, 3.5, 5.5, 2.5, 4.5, 6.5][..]), buffer.values::<f64>());
}
