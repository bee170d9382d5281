use super::{
    dims::{MAX_DIMS, Strides},
    info::TensorInfo,
    window::Window,
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Level {
    /// Byte offset, relative to the first element, where this dimension currently starts.
    start: isize,
    /// Bytes advanced by one step of this dimension.
    stride: isize,
}

/// Walks the byte offsets of a window over one strided tensor.
///
/// A cursor keeps one start offset per dimension. [`Cursor::increment`] is the carry
/// of a nested loop: it advances a dimension and rewinds every lower one to it.
/// Cursors perform no overflow checks; the caller must only increment a
/// dimension once all lower ones are exhausted, which [`execute_window_loop`]
/// takes care of.
///
/// [`execute_window_loop`]: super::execute::execute_window_loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    base: usize,
    levels: [Level; MAX_DIMS],
}

impl Cursor {
    /// Creates a cursor over the tensor described by `info`.
    #[inline]
    pub fn new(info: &TensorInfo, window: &Window) -> Self {
        Self::from_strides(
            info.num_dimensions(),
            &info.strides_in_bytes(),
            info.offset_first_element_in_bytes(),
            window,
        )
    }

    /// Creates a cursor from an explicit layout: `offset` is the byte position of
    /// the first element inside the buffer.
    pub fn from_strides(num_dims: usize, strides: &Strides, offset: usize, window: &Window) -> Self {
        let mut levels = [Level::default(); MAX_DIMS];
        let mut start = 0;
        for (d, level) in levels.iter_mut().enumerate().take(num_dims) {
            let stride = strides[d] as isize;
            level.stride = window[d].step() * stride;
            start += window[d].start() * stride;
        }
        for level in levels.iter_mut() {
            level.start = start;
        }
        Self {
            base: offset,
            levels,
        }
    }

    /// Advances `dim` by one step and rewinds all lower dimensions to its new start.
    #[inline]
    pub fn increment(&mut self, dim: usize) {
        let level = &mut self.levels[dim];
        level.start += level.stride;
        let start = level.start;
        for level in &mut self.levels[..dim] {
            level.start = start;
        }
    }

    /// Rewinds `dim` to the current start of `dim + 1`, leaving higher dimensions untouched.
    #[inline]
    pub fn reset(&mut self, dim: usize) {
        let start = self.levels[dim + 1].start;
        for level in &mut self.levels[..=dim] {
            level.start = start;
        }
    }

    /// Byte offset of the current element from the first element of the tensor.
    #[inline]
    pub fn offset(&self) -> isize {
        self.levels[0].start
    }

    /// Byte position of the current element inside the buffer.
    #[inline]
    pub fn position(&self) -> usize {
        self.position_at(0)
    }

    /// Byte position `delta` bytes away from the current element.
    #[inline]
    pub fn position_at(&self, delta: isize) -> usize {
        let position = self.base as isize + self.offset() + delta;
        debug_assert!(position >= 0, "cursor moved {position} bytes before the buffer");
        position as usize
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;
    use proptest::prelude::*;

    use super::Cursor;
    use crate::loom::{
        dims::{Coordinates, Steps, TensorShape},
        execute::execute_window_loop,
        info::{PaddingSize, TensorInfo},
        num::DataType,
        window::{Dimension, Window},
    };

    #[test]
    fn test_manual_carry() {
        let mut info = TensorInfo::new([3, 2], DataType::F32);
        info.extend_padding(PaddingSize::new(1, 1, 0, 2));
        // stride_y = (2 + 3 + 1) * 4
        let window = Window::from_shape(info.tensor_shape(), Steps::default());
        let mut cursor = Cursor::new(&info, &window);
        assert_eq!(cursor.offset(), 0);
        assert_eq!(cursor.position(), 2 * 4 + 24);

        cursor.increment(0);
        cursor.increment(0);
        assert_eq!(cursor.offset(), 8);
        cursor.increment(1);
        assert_eq!(cursor.offset(), 24);
        cursor.increment(0);
        assert_eq!(cursor.offset(), 28);
        cursor.reset(0);
        assert_eq!(cursor.offset(), 24);
    }

    #[test]
    fn test_broadcast_stays() {
        let info = TensorInfo::new([1, 4], DataType::F32);
        let window = Window::from_shape(TensorShape::from([5, 4]), Steps::default());
        let window = window.broadcast_if_dimension_le_one(&info.tensor_shape());
        let mut cursor = Cursor::new(&info, &window);
        cursor.increment(0);
        cursor.increment(0);
        assert_eq!(cursor.offset(), 0);
        cursor.increment(1);
        assert_eq!(cursor.offset(), 4);
    }

    proptest! {
        #[test]
        fn prop_visits_row_major(
            extents in prop::collection::vec(1usize..5, 1..4),
            pad in 0usize..3,
            step_x in 1usize..3,
            offset in prop::collection::vec(0isize..2, 3),
        ) {
            let mut info = TensorInfo::new(TensorShape::new(&extents), DataType::U16);
            info.extend_padding(PaddingSize::uniform(pad));

            let mut window = Window::from_shape(info.tensor_shape(), Steps::from([step_x]));
            for (d, &offset) in offset.iter().enumerate().take(extents.len()) {
                let dim = window[d];
                let start = (offset * dim.step()).min(dim.end());
                window.set(d, Dimension::new(start, dim.end(), dim.step()));
            }

            let expected = window.coords().collect_vec();
            let mut visited = vec![];
            let cursor = Cursor::new(&info, &window);
            execute_window_loop(&window, [cursor], |coords, [cursor]| {
                let position = info.offset_element_in_bytes(coords);
                assert_eq!(cursor.position() as isize, position);
                visited.push(*coords);
            });
            prop_assert_eq!(&visited, &expected);

            // innermost first: consecutive coordinates differ first in dimension 0
            for (a, b) in visited.iter().tuple_windows() {
                let key = |c: &Coordinates| (0..6).rev().map(|d| c[d]).collect_vec();
                prop_assert!(key(a) < key(b));
            }
        }
    }
}
