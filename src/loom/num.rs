use bytemuck::{Pod, Zeroable};
use derive_more::Display;
use half::f16;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DataType {
    F32,
    F16,
    U8,
    U16,
    U32,
    I32,
    PackedU8x4,
}

impl DataType {
    /// Returns number of channels packed in one element of this data type.
    pub const fn count(self) -> usize {
        match self {
            DataType::F32 => 1,
            DataType::F16 => 1,
            DataType::U8 => 1,
            DataType::U16 => 1,
            DataType::U32 => 1,
            DataType::I32 => 1,
            DataType::PackedU8x4 => 4,
        }
    }

    /// Returns the size in bytes of one element of this data type.
    pub const fn size(self) -> usize {
        match self {
            DataType::F32 => 4,
            DataType::F16 => 2,
            DataType::U8 => 1,
            DataType::U16 => 2,
            DataType::U32 => 4,
            DataType::I32 => 4,
            DataType::PackedU8x4 => 4,
        }
    }

    pub const fn is_float(self) -> bool {
        matches!(self, DataType::F32 | DataType::F16)
    }
}

/// Four 8-bit channels sharing one element location, e.g. RGBA.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(C)]
pub struct PackedU8x4(pub [u8; 4]);

unsafe impl Zeroable for PackedU8x4 {}

unsafe impl Pod for PackedU8x4 {}

pub trait Scalar: Sized + Zeroable + Pod + Send + Sync {
    const DATA_TYPE: DataType;
}

impl Scalar for f32 {
    const DATA_TYPE: DataType = DataType::F32;
}

impl Scalar for f16 {
    const DATA_TYPE: DataType = DataType::F16;
}

impl Scalar for u8 {
    const DATA_TYPE: DataType = DataType::U8;
}

impl Scalar for u16 {
    const DATA_TYPE: DataType = DataType::U16;
}

impl Scalar for u32 {
    const DATA_TYPE: DataType = DataType::U32;
}

impl Scalar for i32 {
    const DATA_TYPE: DataType = DataType::I32;
}

impl Scalar for PackedU8x4 {
    const DATA_TYPE: DataType = DataType::PackedU8x4;
}
