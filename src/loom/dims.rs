use casey::snake;
use derive_more::{Deref, DerefMut};
use itertools::Itertools;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum rank supported by every per-dimension container.
pub const MAX_DIMS: usize = 6;

/// Fixed-capacity per-dimension values with a count of active dimensions.
///
/// Reading an index past the active count is allowed and returns the filler the
/// container was created with (`0` for coordinates and strides, `1` for shapes and steps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Dimensions<T> {
    values: [T; MAX_DIMS],
    len: usize,
}

/// Absolute position, one signed value per dimension.
pub type Coordinates = Dimensions<isize>;

/// Byte distance between two consecutive elements along each dimension.
pub type Strides = Dimensions<usize>;

impl<T: Copy + Default> Default for Dimensions<T> {
    #[inline]
    fn default() -> Self {
        Self::filled(T::default())
    }
}

impl<T: Copy + Default> Dimensions<T> {
    /// Creates an empty container whose inactive slots read as `fill`.
    #[inline]
    pub const fn filled(fill: T) -> Self {
        Self {
            values: [fill; MAX_DIMS],
            len: 0,
        }
    }

    /// Creates a container from the given values.
    ///
    /// # Panics
    /// Panics if more than [`MAX_DIMS`] values are given.
    pub fn from_slice(values: &[T]) -> Self {
        let mut dims = Self::default();
        dims.extend_from(values);
        dims
    }

    fn extend_from(&mut self, values: &[T]) {
        assert!(
            values.len() <= MAX_DIMS,
            "rank {} exceeds the maximum of {MAX_DIMS}",
            values.len()
        );
        for (d, &value) in values.iter().enumerate() {
            self.set(d, value);
        }
    }

    /// Number of active dimensions.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Sets the value of a dimension, growing the active count if needed.
    #[inline]
    pub fn set(&mut self, dim: usize, value: T) {
        assert!(dim < MAX_DIMS, "dimension {dim} out of range");
        self.values[dim] = value;
        self.len = self.len.max(dim + 1);
    }

    /// Value of a dimension, active or not.
    #[inline]
    pub fn get(&self, dim: usize) -> T {
        self.values[dim]
    }

    /// Overrides the number of active dimensions without touching the values.
    #[inline]
    pub fn set_len(&mut self, len: usize) {
        assert!(len <= MAX_DIMS, "rank {len} exceeds the maximum of {MAX_DIMS}");
        self.len = len;
    }

    /// The active values.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.values[..self.len]
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }
}

impl<T> std::ops::Index<usize> for Dimensions<T> {
    type Output = T;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.values[index]
    }
}

impl<T> std::ops::IndexMut<usize> for Dimensions<T> {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.values[index]
    }
}

impl<T: Copy + Default + std::fmt::Display> std::fmt::Display for Dimensions<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.iter().format(", "))
    }
}

impl<T: Copy + Default, const N: usize> From<[T; N]> for Dimensions<T> {
    #[inline]
    fn from(value: [T; N]) -> Self {
        Self::from_slice(&value)
    }
}

macro_rules! impl_dimensions_from {
    (@elem $t:ident) => { T };
    ($($t:ident),+) => {
        impl<T: Copy + Default> From<($(impl_dimensions_from!(@elem $t)),+)> for Dimensions<T> {
            #[inline]
            fn from(($(snake!($t)),+): ($(impl_dimensions_from!(@elem $t)),+)) -> Self {
                Self::from_slice(&[$(snake!($t)),+])
            }
        }
    };
}

impl_dimensions_from!(T0, T1);
impl_dimensions_from!(T0, T1, T2);
impl_dimensions_from!(T0, T1, T2, T3);
impl_dimensions_from!(T0, T1, T2, T3, T4);
impl_dimensions_from!(T0, T1, T2, T3, T4, T5);

/// Number of elements processed per iteration along each dimension. Unset steps are `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deref, DerefMut)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Steps(Dimensions<usize>);

impl Default for Steps {
    #[inline]
    fn default() -> Self {
        Self(Dimensions::filled(1))
    }
}

impl Steps {
    pub fn new(steps: &[usize]) -> Self {
        let mut dims = Dimensions::filled(1);
        dims.extend_from(steps);
        Self(dims)
    }
}

impl<const N: usize> From<[usize; N]> for Steps {
    #[inline]
    fn from(value: [usize; N]) -> Self {
        Self::new(&value)
    }
}

/// Extent of a tensor along each dimension.
///
/// Dimensions past the active count have extent `1`. Trailing extents of `1` are
/// not counted as active, so `[10, 8, 1]` has two dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deref)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TensorShape(Dimensions<usize>);

impl Default for TensorShape {
    #[inline]
    fn default() -> Self {
        Self(Dimensions::filled(1))
    }
}

impl std::fmt::Display for TensorShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl<const N: usize> From<[usize; N]> for TensorShape {
    #[inline]
    fn from(value: [usize; N]) -> Self {
        Self::new(&value)
    }
}

impl TensorShape {
    pub fn new(extents: &[usize]) -> Self {
        let mut shape = Self::default();
        for (d, &extent) in extents.iter().enumerate() {
            shape.0.set(d, extent);
        }
        shape.correct();
        shape
    }

    /// Sets the extent of a dimension and drops trailing extents of `1`.
    #[inline]
    pub fn set(&mut self, dim: usize, extent: usize) {
        self.0.set(dim, extent);
        self.correct();
    }

    fn correct(&mut self) {
        let mut len = self.0.len();
        while len > 1 && self.0[len - 1] == 1 {
            len -= 1;
        }
        self.0.set_len(len);
    }

    #[inline]
    pub fn x(&self) -> usize {
        self.0[0]
    }

    #[inline]
    pub fn y(&self) -> usize {
        self.0[1]
    }

    #[inline]
    pub fn z(&self) -> usize {
        self.0[2]
    }

    /// Number of elements; `0` for a shape with no dimension.
    #[inline]
    pub fn total_size(&self) -> usize {
        match self.len() {
            0 => 0,
            _ => self.iter().product(),
        }
    }

    /// Number of elements in dimensions `dim` and above.
    #[inline]
    pub fn total_size_upper(&self, dim: usize) -> usize {
        (dim..MAX_DIMS).map(|d| self.0[d]).product()
    }

    /// Number of elements in dimensions below `dim`.
    #[inline]
    pub fn total_size_lower(&self, dim: usize) -> usize {
        (0..dim).map(|d| self.0[d]).product()
    }
}

/// Converts a linear index into coordinates of `shape`, innermost dimension first.
pub fn index_to_coords(shape: &TensorShape, index: usize) -> Coordinates {
    assert!(
        index < shape.total_size(),
        "index {index} out of range for shape {shape}"
    );
    let mut coords = Coordinates::default();
    let mut rest = index;
    for d in 0..shape.len() {
        coords.set(d, (rest % shape[d]) as isize);
        rest /= shape[d];
    }
    coords
}

/// Converts coordinates of `shape` into a linear index, innermost dimension first.
pub fn coords_to_index(shape: &TensorShape, coords: &Coordinates) -> usize {
    let mut index = 0;
    let mut stride = 1;
    for d in 0..shape.len() {
        index += coords[d] as usize * stride;
        stride *= shape[d];
    }
    index
}

#[cfg(test)]
mod tests {
    use super::{Coordinates, Steps, TensorShape, coords_to_index, index_to_coords};

    #[test]
    fn test_shape_correction() {
        let shape = TensorShape::from([10, 8, 1, 1]);
        assert_eq!(shape.len(), 2);
        assert_eq!(shape.total_size(), 80);
        assert_eq!(shape[3], 1);

        let mut shape = TensorShape::from([4]);
        shape.set(2, 3);
        assert_eq!(shape.len(), 3);
        assert_eq!(shape.as_slice(), &[4, 1, 3]);
        shape.set(2, 1);
        assert_eq!(shape.len(), 1);

        assert_eq!(TensorShape::from([1]).len(), 1);
        assert_eq!(TensorShape::default().total_size(), 0);
        assert_eq!(TensorShape::from([3, 0, 2]).total_size(), 0);
    }

    #[test]
    fn test_filler() {
        let steps = Steps::from([4]);
        assert_eq!(steps[0], 4);
        assert_eq!(steps[5], 1);

        let coords = Coordinates::from((-1, 2));
        assert_eq!(coords.len(), 2);
        assert_eq!(coords[1], 2);
        assert_eq!(coords[4], 0);
        assert_eq!(format!("{coords}"), "[-1, 2]");
    }

    #[test]
    fn test_index_coords() {
        let shape = TensorShape::from([3, 4, 5]);
        for index in 0..shape.total_size() {
            let coords = index_to_coords(&shape, index);
            assert_eq!(coords_to_index(&shape, &coords), index);
        }
        assert_eq!(index_to_coords(&shape, 13).as_slice(), &[1, 0, 1]);
    }
}
