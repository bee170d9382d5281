use std::marker::PhantomData;

use bytemuck::Pod;
use derive_more::Display;
use rustc_hash::FxHashMap as HashMap;
use thiserror::Error;

use super::{
    dims::{Coordinates, Steps, TensorShape},
    execute::execute_window_loop,
    info::TensorInfo,
    iterator::Cursor,
    num::{DataType, Scalar},
    window::Window,
};

#[derive(Debug, Error)]
pub enum TensorError {
    #[error("tensor type error: data type {0} mismatches {1}")]
    Type(DataType, DataType),
    #[error("tensor creation error: shape {0}'s size not match data len {1}")]
    Create(TensorShape, usize),
    #[error("tensor shape error: shape {0} mismatches {1}")]
    Shape(TensorShape, TensorShape),
}

/// A tensor whose storage has been allocated.
///
/// Allocation freezes the padding of the info: kernels configured afterwards may
/// only shrink their windows, never grow the padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tensor {
    info: TensorInfo,
    buffer: Box<[u8]>,
}

impl Tensor {
    /// Allocates zeroed storage for the tensor, padding included.
    pub fn allocate(mut info: TensorInfo) -> Self {
        info.set_is_resizable(false);
        let buffer = vec![0u8; info.total_size()].into_boxed_slice();
        Self { info, buffer }
    }

    /// Allocates a tensor and fills its logical elements, innermost dimension first.
    pub fn create<T: Scalar>(info: TensorInfo, contents: &[T]) -> Result<Self, TensorError> {
        if info.data_type() != T::DATA_TYPE {
            return Err(TensorError::Type(info.data_type(), T::DATA_TYPE));
        }
        let shape = info.tensor_shape();
        if shape.total_size() != contents.len() {
            return Err(TensorError::Create(shape, contents.len()));
        }

        let mut tensor = Self::allocate(info);
        let window = Window::from_shape(shape, Steps::default());
        let cursor = Cursor::new(&tensor.info, &window);
        let output = tensor.view_mut();
        let mut contents = contents.iter();
        execute_window_loop(&window, [cursor], |_, [cursor]| {
            if let Some(&value) = contents.next() {
                output.write(cursor.position(), value);
            }
        });
        Ok(tensor)
    }

    #[inline]
    pub fn info(&self) -> &TensorInfo {
        &self.info
    }

    /// Mutable access to the metadata, e.g. to update the valid region of an allocated tensor.
    #[inline]
    pub fn info_mut(&mut self) -> &mut TensorInfo {
        &mut self.info
    }

    /// The raw allocation, padding included.
    #[inline]
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    #[inline]
    pub fn view(&self) -> TensorView<'_> {
        TensorView {
            info: &self.info,
            data: &self.buffer,
        }
    }

    #[inline]
    pub fn view_mut(&mut self) -> TensorViewMut<'_> {
        TensorViewMut {
            info: &self.info,
            ptr: self.buffer.as_mut_ptr(),
            len: self.buffer.len(),
            phantom: PhantomData,
        }
    }

    /// Reads back the logical elements, innermost dimension first.
    pub fn back<T: Scalar>(&self) -> Result<Box<[T]>, TensorError> {
        if self.info.data_type() != T::DATA_TYPE {
            return Err(TensorError::Type(self.info.data_type(), T::DATA_TYPE));
        }
        let shape = self.info.tensor_shape();
        let window = Window::from_shape(shape, Steps::default());
        let cursor = Cursor::new(&self.info, &window);
        let input = self.view();
        let mut output = Vec::with_capacity(shape.total_size());
        execute_window_loop(&window, [cursor], |_, [cursor]| {
            output.push(input.read::<T>(cursor.position()));
        });
        Ok(output.into_boxed_slice())
    }

    /// Reads one element at absolute coordinates, which may lie in the padding.
    #[inline]
    pub fn at<T: Pod>(&self, coords: &Coordinates) -> T {
        self.view().at(coords)
    }
}

/// Read-only view of a tensor used while a kernel runs.
#[derive(Debug, Clone, Copy)]
pub struct TensorView<'a> {
    info: &'a TensorInfo,
    data: &'a [u8],
}

impl<'a> TensorView<'a> {
    #[inline]
    pub fn info(&self) -> &'a TensorInfo {
        self.info
    }

    /// Reads an element at a byte position of the allocation.
    ///
    /// # Panics
    /// Panics if the element does not lie inside the allocation.
    #[inline]
    pub fn read<T: Pod>(&self, position: usize) -> T {
        bytemuck::pod_read_unaligned(&self.data[position..position + size_of::<T>()])
    }

    /// Reads `N` consecutive elements starting at a byte position.
    #[inline]
    pub fn read_array<T: Pod, const N: usize>(&self, position: usize) -> [T; N] {
        std::array::from_fn(|index| self.read(position + index * size_of::<T>()))
    }

    #[inline]
    pub fn at<T: Pod>(&self, coords: &Coordinates) -> T {
        let offset = self.info.offset_element_in_bytes(coords);
        assert!(offset >= 0, "coordinates {coords} lie before the allocation");
        self.read(offset as usize)
    }
}

/// Writable view of a tensor that can be shared by the workers of one scheduled run.
///
/// Workers receive disjoint sub-windows of the output, so concurrent writes never
/// alias. Every access is bounds-checked against the allocation.
#[derive(Debug)]
pub struct TensorViewMut<'a> {
    info: &'a TensorInfo,
    ptr: *mut u8,
    len: usize,
    phantom: PhantomData<&'a mut [u8]>,
}

// SAFETY: the view only hands out values, never references into the buffer, and
// the split contract guarantees that workers write to disjoint elements.
unsafe impl Send for TensorViewMut<'_> {}
unsafe impl Sync for TensorViewMut<'_> {}

impl<'a> TensorViewMut<'a> {
    #[inline]
    pub fn info(&self) -> &'a TensorInfo {
        self.info
    }

    #[inline]
    fn check<T>(&self, position: usize) {
        assert!(
            position + size_of::<T>() <= self.len,
            "access of {} bytes at {position} exceeds the allocation of {} bytes",
            size_of::<T>(),
            self.len
        );
    }

    #[inline]
    pub fn read<T: Pod>(&self, position: usize) -> T {
        self.check::<T>(position);
        // SAFETY: bounds checked above; `T: Pod` accepts any bit pattern.
        unsafe { self.ptr.add(position).cast::<T>().read_unaligned() }
    }

    #[inline]
    pub fn write<T: Pod>(&self, position: usize, value: T) {
        self.check::<T>(position);
        // SAFETY: bounds checked above; disjointness is guaranteed by the split contract.
        unsafe { self.ptr.add(position).cast::<T>().write_unaligned(value) }
    }

    #[inline]
    pub fn write_slice<T: Pod>(&self, position: usize, values: &[T]) {
        for (index, &value) in values.iter().enumerate() {
            self.write(position + index * size_of::<T>(), value);
        }
    }

    #[inline]
    pub fn at<T: Pod>(&self, coords: &Coordinates) -> T {
        let offset = self.info.offset_element_in_bytes(coords);
        assert!(offset >= 0, "coordinates {coords} lie before the allocation");
        self.read(offset as usize)
    }
}

/// Role of a tensor in a kernel invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Slot {
    Src0,
    Src1,
    Src2,
    Dst,
}

/// The tensors a kernel reads and writes during one run, keyed by slot.
#[derive(Debug, Default)]
pub struct TensorPack<'a> {
    src: HashMap<Slot, TensorView<'a>>,
    dst: HashMap<Slot, TensorViewMut<'a>>,
}

impl<'a> TensorPack<'a> {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tensor that is read during the run.
    #[inline]
    pub fn with_src(mut self, slot: Slot, tensor: &'a Tensor) -> Self {
        self.src.insert(slot, tensor.view());
        self
    }

    /// Adds a tensor that is written during the run.
    #[inline]
    pub fn with_dst(mut self, slot: Slot, tensor: &'a mut Tensor) -> Self {
        self.dst.insert(slot, tensor.view_mut());
        self
    }

    /// # Panics
    /// Panics if no tensor is read from `slot`.
    #[inline]
    pub fn src(&self, slot: Slot) -> &TensorView<'a> {
        match self.src.get(&slot) {
            Some(view) => view,
            None => panic!("no source tensor in slot {slot}"),
        }
    }

    /// # Panics
    /// Panics if no tensor is written to `slot`.
    #[inline]
    pub fn dst(&self, slot: Slot) -> &TensorViewMut<'a> {
        match self.dst.get(&slot) {
            Some(view) => view,
            None => panic!("no destination tensor in slot {slot}"),
        }
    }
}
