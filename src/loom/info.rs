use derive_more::{Add, Display};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{
    dims::{Coordinates, MAX_DIMS, Strides, TensorShape},
    num::DataType,
};

/// Number of elements on each side of a rectangle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Add, Display)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[display("(top: {top}, right: {right}, bottom: {bottom}, left: {left})")]
pub struct BorderSize {
    pub top: usize,
    pub right: usize,
    pub bottom: usize,
    pub left: usize,
}

/// Extra addressable space around the logical extent of a tensor.
pub type PaddingSize = BorderSize;

impl BorderSize {
    #[inline]
    pub const fn new(top: usize, right: usize, bottom: usize, left: usize) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    #[inline]
    pub const fn uniform(size: usize) -> Self {
        Self::new(size, size, size, size)
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.top == 0 && self.right == 0 && self.bottom == 0 && self.left == 0
    }

    #[inline]
    pub const fn is_uniform(&self) -> bool {
        self.top == self.right && self.top == self.bottom && self.top == self.left
    }

    /// Side-wise minimum of the two sizes.
    #[inline]
    pub fn limit(self, other: Self) -> Self {
        Self::new(
            self.top.min(other.top),
            self.right.min(other.right),
            self.bottom.min(other.bottom),
            self.left.min(other.left),
        )
    }

    /// Side-wise maximum of the two sizes.
    #[inline]
    pub fn max(self, other: Self) -> Self {
        Self::new(
            self.top.max(other.top),
            self.right.max(other.right),
            self.bottom.max(other.bottom),
            self.left.max(other.left),
        )
    }

    /// Returns `true` if every side is at least as large as that of `other`.
    #[inline]
    pub fn covers(&self, other: &Self) -> bool {
        self.top >= other.top
            && self.right >= other.right
            && self.bottom >= other.bottom
            && self.left >= other.left
    }
}

/// How a kernel treats the part of its footprint that falls outside the valid region.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BorderMode {
    /// Border values are never produced; outputs depending on them are invalid.
    #[default]
    Undefined,
    /// Border values are a constant.
    Constant,
    /// Border values repeat the nearest valid element.
    Replicate,
}

/// The sub-rectangle of a tensor computed from fully defined inputs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[display("{{anchor: {anchor}, shape: {shape}}}")]
pub struct ValidRegion {
    pub anchor: Coordinates,
    pub shape: TensorShape,
}

impl ValidRegion {
    /// A region with the same rank as `shape`, anchored at the origin.
    pub fn from_shape(shape: TensorShape) -> Self {
        let mut anchor = Coordinates::default();
        anchor.set_len(shape.len());
        Self { anchor, shape }
    }

    pub fn new(anchor: Coordinates, shape: TensorShape) -> Self {
        Self { anchor, shape }
    }

    /// First valid coordinate along `dim`.
    #[inline]
    pub fn start(&self, dim: usize) -> isize {
        self.anchor[dim]
    }

    /// One past the last valid coordinate along `dim`.
    #[inline]
    pub fn end(&self, dim: usize) -> isize {
        self.anchor[dim] + self.shape[dim] as isize
    }

    /// Sets the valid range of `dim` to `[start, start + extent)`.
    #[inline]
    pub fn set(&mut self, dim: usize, start: isize, extent: usize) {
        self.anchor.set(dim, start);
        self.shape.set(dim, extent);
    }

    /// Returns `true` if the coordinate lies inside the region.
    pub fn contains(&self, coords: &Coordinates) -> bool {
        (0..MAX_DIMS).all(|d| (self.start(d)..self.end(d)).contains(&coords[d]))
    }
}

/// Intersects valid regions dimension by dimension.
///
/// # Panics
/// Panics if `regions` is empty.
pub fn intersect_valid_regions(regions: &[ValidRegion]) -> ValidRegion {
    let (first, rest) = regions
        .split_first()
        .expect("at least one valid region is required");
    rest.iter().fold(*first, |r0, r1| {
        let rank = r0.shape.len().max(r1.shape.len());
        let mut region = ValidRegion::default();
        for d in 0..rank {
            let start = r0.start(d).max(r1.start(d));
            let end = r0.end(d).min(r1.end(d));
            region.set(d, start, (end - start).max(0) as usize);
        }
        region
    })
}

/// Shape, layout and padding metadata of a tensor.
///
/// Padding and valid region are mutated while kernels are configured; once the
/// tensor is allocated the info becomes non-resizable and padding is frozen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorInfo {
    shape: TensorShape,
    data_type: DataType,
    strides: Strides,
    offset_first_element: usize,
    total_size: usize,
    padding: PaddingSize,
    valid_region: ValidRegion,
    is_resizable: bool,
}

impl TensorInfo {
    pub fn new(shape: impl Into<TensorShape>, data_type: DataType) -> Self {
        let shape = shape.into();
        let mut info = Self {
            shape,
            data_type,
            strides: Strides::default(),
            offset_first_element: 0,
            total_size: 0,
            padding: PaddingSize::default(),
            valid_region: ValidRegion::from_shape(shape),
            is_resizable: true,
        };
        info.update_layout();
        info
    }

    #[inline]
    pub fn tensor_shape(&self) -> TensorShape {
        self.shape
    }

    #[inline]
    pub fn num_dimensions(&self) -> usize {
        self.shape.len()
    }

    #[inline]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    #[inline]
    pub fn element_size(&self) -> usize {
        self.data_type.size()
    }

    #[inline]
    pub fn strides_in_bytes(&self) -> Strides {
        self.strides
    }

    #[inline]
    pub fn offset_first_element_in_bytes(&self) -> usize {
        self.offset_first_element
    }

    /// Size in bytes of the allocation backing the tensor, padding included.
    #[inline]
    pub fn total_size(&self) -> usize {
        self.total_size
    }

    #[inline]
    pub fn padding(&self) -> PaddingSize {
        self.padding
    }

    #[inline]
    pub fn has_padding(&self) -> bool {
        !self.padding.is_empty()
    }

    #[inline]
    pub fn valid_region(&self) -> ValidRegion {
        self.valid_region
    }

    #[inline]
    pub fn set_valid_region(&mut self, region: ValidRegion) {
        self.valid_region = region;
    }

    #[inline]
    pub fn is_resizable(&self) -> bool {
        self.is_resizable
    }

    #[inline]
    pub fn set_is_resizable(&mut self, is_resizable: bool) {
        self.is_resizable = is_resizable;
    }

    /// Replaces the shape, keeping the padding and resetting the valid region.
    pub fn set_tensor_shape(&mut self, shape: impl Into<TensorShape>) {
        assert!(self.is_resizable, "cannot reshape an allocated tensor");
        self.shape = shape.into();
        self.valid_region = ValidRegion::from_shape(self.shape);
        self.update_layout();
    }

    /// Byte offset of an element relative to the start of the allocation.
    pub fn offset_element_in_bytes(&self, coords: &Coordinates) -> isize {
        let offset = self.offset_first_element as isize;
        (0..coords.len()).fold(offset, |offset, d| {
            offset + coords[d] * self.strides[d] as isize
        })
    }

    /// Grows the padding so that every side is at least as large as `padding`.
    /// Returns `true` if any side grew.
    ///
    /// # Panics
    /// Panics if the tensor is no longer resizable.
    pub fn extend_padding(&mut self, padding: PaddingSize) -> bool {
        assert!(self.is_resizable, "cannot extend the padding of an allocated tensor");
        let extended = self.padding.max(padding);
        if extended == self.padding {
            return false;
        }
        log::debug!("padding extended from {} to {}", self.padding, extended);
        self.padding = extended;
        self.update_layout();
        true
    }

    /// Pads the tensor enough for kernels that read up to 32 elements past a row.
    pub fn auto_padding(&mut self) -> bool {
        let (pad_x, extra_pad_x) = match self.num_dimensions() {
            0 => (0, 0),
            _ => (4, 32),
        };
        let pad_y = match self.num_dimensions() {
            0 | 1 => 0,
            _ => 4,
        };
        self.extend_padding(PaddingSize::new(pad_y, pad_x + extra_pad_x, pad_y, pad_x))
    }

    fn update_layout(&mut self) {
        let padding = self.padding;
        let shape = self.shape;

        let stride_x = self.element_size();
        let stride_y = (padding.left + shape[0] + padding.right) * stride_x;
        let stride_z = (padding.top + shape[1] + padding.bottom) * stride_y;

        let mut strides = Strides::from([stride_x, stride_y, stride_z]);
        for d in 3..shape.len() {
            strides.set(d, strides[d - 1] * shape[d - 1]);
        }
        strides.set_len(shape.len().max(1));
        self.strides = strides;

        self.offset_first_element = padding.left * stride_x + padding.top * stride_y;
        self.total_size = match shape.total_size() {
            0 => 0,
            _ if shape.len() <= 2 => stride_z,
            _ => {
                let last = shape.len() - 1;
                shape[last] * self.strides[last]
            }
        };
    }
}
