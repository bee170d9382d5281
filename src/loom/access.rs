//! Access windows negotiate between the footprint of a kernel operand and the
//! padding of the tensor behind it.
//!
//! While a tensor is resizable, descriptors grow its padding to cover the
//! footprint. Once it is allocated the padding is fixed and the shared window
//! shrinks instead. Each descriptor borrows the metadata of one tensor for the
//! duration of a kernel configuration.

use thiserror::Error;

use super::{
    dims::MAX_DIMS,
    info::{BorderSize, PaddingSize, TensorInfo, ValidRegion},
    window::{Dimension, Window},
};

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("access error: window shrank to {0}; the padding of an allocated tensor is insufficient")]
    InsufficientPadding(Window),
}

/// Moves `required` down by whole steps until it does not exceed `available`.
#[inline]
fn adjust_down(required: isize, available: isize, step: isize) -> isize {
    assert!(step > 0, "cannot adjust by a step of {step}");
    required - step * ((required - available + step - 1) / step)
}

/// Moves `required` up by whole steps until it is not below `available`.
#[inline]
fn adjust_up(required: isize, available: isize, step: isize) -> isize {
    assert!(step > 0, "cannot adjust by a step of {step}");
    required + step * ((available - required + step - 1) / step)
}

#[inline]
fn scaled(value: isize, scale: f32) -> isize {
    (value as f32 * scale) as isize
}

/// Row and plane strides in bytes, falling back to the whole allocation for
/// tensors of lower rank.
fn outer_strides(info: &TensorInfo) -> (isize, isize) {
    let strides = info.strides_in_bytes();
    let total = info.total_size() as isize;
    let rank = info.num_dimensions();
    let stride_y = if rank > 1 { strides[1] as isize } else { total };
    let stride_z = if rank > 2 { strides[2] as isize } else { total };
    (stride_y, stride_z)
}

/// Intersects dimensions `first..` of `region` with the window span.
fn intersect_higher(region: &mut ValidRegion, window: &Window, first: usize, rank: usize) {
    for d in first..rank.min(MAX_DIMS) {
        let start = window[d].start().max(region.start(d));
        let end = window[d].end().min(region.end(d));
        region.set(d, start, (end - start).max(0) as usize);
    }
}

/// The contract every operand descriptor implements.
pub trait AccessWindow {
    /// The valid region of the tensor after a kernel ran over `window`, given the
    /// valid region of its input.
    ///
    /// When `border_undefined` is set, the border of the input is excluded.
    fn compute_valid_region(
        &self,
        window: &Window,
        input: ValidRegion,
        border_undefined: bool,
        border: BorderSize,
    ) -> ValidRegion;

    /// Shrinks `window` if the footprint does not fit the fixed padding of an
    /// allocated tensor. Returns `true` if the window changed.
    fn update_window_if_needed(&self, window: &mut Window) -> bool;

    /// Grows the padding of a resizable tensor to cover the footprint.
    /// Returns `true` if the padding changed.
    fn update_padding_if_needed(&mut self, window: &Window) -> bool;

    /// The described tensor, if any.
    fn info_mut(&mut self) -> Option<&mut TensorInfo>;

    /// Computes the valid region and writes it to the described tensor.
    fn set_valid_region(
        &mut self,
        window: &Window,
        input: ValidRegion,
        border_undefined: bool,
        border: BorderSize,
    ) {
        let region = self.compute_valid_region(window, input, border_undefined, border);
        if let Some(info) = self.info_mut() {
            info.set_valid_region(region);
        }
    }
}

/// Runs every window update, then every padding update.
///
/// The window is shared, so the shrink of any operand narrows it for all. Returns
/// `true` if any operand changed the window.
pub fn update_window_and_padding(
    window: &mut Window,
    patterns: &mut [&mut dyn AccessWindow],
) -> bool {
    let window_changed = patterns
        .iter()
        .fold(false, |changed, pattern| pattern.update_window_if_needed(window) | changed);
    for pattern in patterns.iter_mut() {
        pattern.update_padding_if_needed(window);
    }
    window_changed
}

/// Same as [`update_window_and_padding`], failing if the window became empty.
pub fn reconcile(
    window: &mut Window,
    patterns: &mut [&mut dyn AccessWindow],
) -> Result<bool, AccessError> {
    let was_empty = window.is_empty();
    let original = *window;
    let changed = update_window_and_padding(window, patterns);
    if changed {
        log::warn!("window {original} shrank to {window} to fit fixed padding");
    }
    if window.is_empty() && !was_empty {
        return Err(AccessError::InsufficientPadding(*window));
    }
    Ok(changed)
}

/// A fixed rectangle `[start_x, end_x) × [start_y, end_y)`, independent of the window.
#[derive(Debug)]
pub struct AccessWindowStatic<'a> {
    info: Option<&'a mut TensorInfo>,
    start_x: isize,
    start_y: isize,
    end_x: isize,
    end_y: isize,
}

impl<'a> AccessWindowStatic<'a> {
    pub fn new(
        info: Option<&'a mut TensorInfo>,
        start_x: isize,
        start_y: isize,
        end_x: isize,
        end_y: isize,
    ) -> Self {
        Self {
            info,
            start_x,
            start_y,
            end_x,
            end_y,
        }
    }

    /// The whole logical extent of the tensor.
    pub fn full(info: &'a mut TensorInfo) -> Self {
        let shape = info.tensor_shape();
        Self::new(Some(info), 0, 0, shape[0] as isize, shape[1] as isize)
    }

    fn fits(&self, info: &TensorInfo) -> bool {
        let shape = info.tensor_shape();
        let strides = info.strides_in_bytes();
        let offset_first = info.offset_first_element_in_bytes() as isize;
        let (stride_y, stride_z) = outer_strides(info);
        let elem = strides[0] as isize;
        let (width, height) = (shape[0] as isize, shape[1] as isize);

        if self.start_y < 0 && self.start_y < -(offset_first / stride_y) {
            return false;
        }
        if self.end_y > height && height + (stride_z / stride_y - height) < self.end_y {
            return false;
        }
        if self.start_x < 0 {
            let available = -(offset_first.min(stride_y - width * elem) / elem);
            if self.start_x < available {
                return false;
            }
        }
        if self.end_x > width && width + (stride_y / elem - width) < self.end_x {
            return false;
        }
        true
    }
}

impl AccessWindow for AccessWindowStatic<'_> {
    fn compute_valid_region(
        &self,
        window: &Window,
        input: ValidRegion,
        _border_undefined: bool,
        _border: BorderSize,
    ) -> ValidRegion {
        let Some(info) = self.info.as_deref() else {
            return input;
        };
        let shape = info.tensor_shape();
        let mut region = input;

        let start = self.start_x.max(0);
        let end = self.end_x.min(shape[0] as isize);
        region.set(0, start, (end - start).max(0) as usize);
        if info.num_dimensions() > 1 {
            let start = self.start_y.max(0);
            let end = self.end_y.min(shape[1] as isize);
            region.set(1, start, (end - start).max(0) as usize);
        }
        intersect_higher(&mut region, window, 2, info.num_dimensions());
        region
    }

    fn update_window_if_needed(&self, window: &mut Window) -> bool {
        let Some(info) = self.info.as_deref() else {
            return false;
        };
        if info.is_resizable() || self.fits(info) {
            return false;
        }
        for d in 0..MAX_DIMS {
            window.set(d, Dimension::new(0, 0, 1));
        }
        true
    }

    fn update_padding_if_needed(&mut self, _window: &Window) -> bool {
        let Some(info) = self.info.as_deref_mut() else {
            return false;
        };
        if !info.is_resizable() {
            return false;
        }
        let shape = info.tensor_shape();
        let padding = PaddingSize::new(
            (-self.start_y).max(0) as usize,
            (self.end_x - shape[0] as isize).max(0) as usize,
            (self.end_y - shape[1] as isize).max(0) as usize,
            (-self.start_x).max(0) as usize,
        );
        info.extend_padding(padding)
    }

    fn info_mut(&mut self) -> Option<&mut TensorInfo> {
        self.info.as_deref_mut()
    }
}

/// Offset, scale and extent of a window-relative access.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Footprint {
    x: isize,
    y: isize,
    width: isize,
    height: isize,
    scale_x: f32,
    scale_y: f32,
}

impl Footprint {
    fn min_x(&self, window: &Window) -> isize {
        scaled(window.x().start(), self.scale_x) + self.x
    }

    fn max_x(&self, window: &Window) -> isize {
        let x = window.x();
        scaled(x.end() - x.step(), self.scale_x) + self.x + self.width
    }

    fn min_y(&self, window: &Window) -> isize {
        scaled(window.y().start(), self.scale_y) + self.y
    }

    fn max_y(&self, window: &Window) -> isize {
        let y = window.y();
        scaled(y.end() - y.step(), self.scale_y) + self.y + self.height
    }

    fn needed_padding(&self, window: &Window, info: &TensorInfo) -> PaddingSize {
        let shape = info.tensor_shape();
        PaddingSize::new(
            (-self.min_y(window)).max(0) as usize,
            (self.max_x(window) - shape[0] as isize).max(0) as usize,
            (self.max_y(window) - shape[1] as isize).max(0) as usize,
            (-self.min_x(window)).max(0) as usize,
        )
    }

    /// Moves the start of `dim` forward until the footprint fits `available`
    /// elements in front of the tensor. Returns the padding still used in front.
    fn shrink_front(
        &self,
        window: &mut Window,
        dim: usize,
        available: isize,
        changed: &mut bool,
    ) -> isize {
        let (offset, scale) = self.along(dim);
        let current = window[dim];
        let min = scaled(current.start(), scale) + offset;
        if min >= 0 {
            return 0;
        }
        if min < available {
            let start = adjust_up(min, available, scaled(current.step(), scale).max(1)) - offset;
            let start = ((start as f32 / scale) as isize).min(current.end());
            window.set(dim, Dimension::new(start, current.end(), current.step()));
            *changed = true;
        }
        let start = window[dim].start();
        ((-(start as f32) * scale).floor() as isize - offset).max(0)
    }

    /// Moves the end of `dim` back until the footprint fits `tail` elements of
    /// padding behind the tensor.
    fn shrink_back(
        &self,
        window: &mut Window,
        dim: usize,
        extent: isize,
        tail: isize,
        changed: &mut bool,
    ) {
        let (offset, scale) = self.along(dim);
        let length = match dim {
            0 => self.width,
            _ => self.height,
        };
        let current = window[dim];
        let max = scaled(current.end() - current.step(), scale) + offset + length;
        if max <= extent || extent + tail >= max {
            return;
        }
        // downscaled footprints still move by at least one element
        let step = scaled(current.step(), scale).max(1);
        let end = adjust_down(max, extent + tail, step) + step - offset - length;
        let end = current.start().max((end as f32 / scale) as isize);
        window.set(dim, Dimension::new(current.start(), end, current.step()));
        *changed = true;
    }

    fn along(&self, dim: usize) -> (isize, f32) {
        match dim {
            0 => (self.x, self.scale_x),
            _ => (self.y, self.scale_y),
        }
    }

    /// Valid range along `dim`, given the input range `[start, end)` and the border around it.
    ///
    /// The range follows the written elements: a non-zero offset shifts both ends.
    fn valid_range(
        &self,
        window: &Window,
        dim: usize,
        (start, end): (isize, isize),
        (front, back): (usize, usize),
    ) -> (isize, usize) {
        let (offset, scale) = self.along(dim);
        let length = match dim {
            0 => self.width,
            _ => self.height,
        };
        let current = window[dim];
        let first = scaled(current.start(), scale).max(start + front as isize);
        let last = (end - back as isize).min(scaled(current.end() - current.step(), scale) + length);
        (first + offset, (last - first).max(0) as usize)
    }
}

/// A run of `width` elements along x, starting `x` elements after the window position.
#[derive(Debug)]
pub struct AccessWindowHorizontal<'a> {
    info: Option<&'a mut TensorInfo>,
    footprint: Footprint,
}

impl<'a> AccessWindowHorizontal<'a> {
    pub fn new(info: Option<&'a mut TensorInfo>, x: isize, width: isize) -> Self {
        Self::with_scale(info, x, width, 1.0)
    }

    pub fn with_scale(info: Option<&'a mut TensorInfo>, x: isize, width: isize, scale_x: f32) -> Self {
        assert!(scale_x > 0.0, "access scales must be positive");
        let footprint = Footprint {
            x,
            y: 0,
            width,
            height: 1,
            scale_x,
            scale_y: 1.0,
        };
        Self { info, footprint }
    }
}

impl AccessWindow for AccessWindowHorizontal<'_> {
    fn compute_valid_region(
        &self,
        window: &Window,
        input: ValidRegion,
        border_undefined: bool,
        border: BorderSize,
    ) -> ValidRegion {
        let Some(info) = self.info.as_deref() else {
            return input;
        };
        let border = if border_undefined { border } else { BorderSize::default() };
        let mut region = input;
        let (start, extent) = self.footprint.valid_range(
            window,
            0,
            (input.start(0), input.end(0)),
            (border.left, border.right),
        );
        region.set(0, start, extent);
        intersect_higher(&mut region, window, 1, info.num_dimensions());
        region
    }

    fn update_window_if_needed(&self, window: &mut Window) -> bool {
        let Some(info) = self.info.as_deref() else {
            return false;
        };
        if info.is_resizable() {
            return false;
        }
        let needed = self.footprint.needed_padding(window, info);
        let available = info.padding();
        if needed.left <= available.left && needed.right <= available.right {
            return false;
        }

        let strides = info.strides_in_bytes();
        let elem = strides[0] as isize;
        let offset_first = info.offset_first_element_in_bytes() as isize;
        let (stride_y, _) = outer_strides(info);
        let width = info.tensor_shape()[0] as isize;

        let mut changed = false;
        let front = self
            .footprint
            .shrink_front(window, 0, -(offset_first / elem), &mut changed);
        let tail = stride_y / elem - width - front;
        self.footprint.shrink_back(window, 0, width, tail, &mut changed);

        window.validate();
        changed
    }

    fn update_padding_if_needed(&mut self, window: &Window) -> bool {
        let Some(info) = self.info.as_deref_mut() else {
            return false;
        };
        if !info.is_resizable() {
            return false;
        }
        let needed = self.footprint.needed_padding(window, info);
        info.extend_padding(PaddingSize::new(0, needed.right, 0, needed.left))
    }

    fn info_mut(&mut self) -> Option<&mut TensorInfo> {
        self.info.as_deref_mut()
    }
}

/// A `width × height` block at offset `(x, y)` from the window position scaled by
/// `(scale_x, scale_y)`. Covers strided and halo reads.
#[derive(Debug)]
pub struct AccessWindowRectangle<'a> {
    info: Option<&'a mut TensorInfo>,
    footprint: Footprint,
}

impl<'a> AccessWindowRectangle<'a> {
    pub fn new(info: Option<&'a mut TensorInfo>, x: isize, y: isize, width: isize, height: isize) -> Self {
        Self::with_scale(info, x, y, width, height, 1.0, 1.0)
    }

    pub fn with_scale(
        info: Option<&'a mut TensorInfo>,
        x: isize,
        y: isize,
        width: isize,
        height: isize,
        scale_x: f32,
        scale_y: f32,
    ) -> Self {
        assert!(scale_x > 0.0 && scale_y > 0.0, "access scales must be positive");
        let footprint = Footprint {
            x,
            y,
            width,
            height,
            scale_x,
            scale_y,
        };
        Self { info, footprint }
    }
}

impl AccessWindow for AccessWindowRectangle<'_> {
    fn compute_valid_region(
        &self,
        window: &Window,
        input: ValidRegion,
        border_undefined: bool,
        border: BorderSize,
    ) -> ValidRegion {
        let Some(info) = self.info.as_deref() else {
            return input;
        };
        let border = if border_undefined { border } else { BorderSize::default() };
        let mut region = input;
        let (start, extent) = self.footprint.valid_range(
            window,
            0,
            (input.start(0), input.end(0)),
            (border.left, border.right),
        );
        region.set(0, start, extent);
        if info.num_dimensions() > 1 {
            let (start, extent) = self.footprint.valid_range(
                window,
                1,
                (input.start(1), input.end(1)),
                (border.top, border.bottom),
            );
            region.set(1, start, extent);
        }
        intersect_higher(&mut region, window, 2, info.num_dimensions());
        region
    }

    fn update_window_if_needed(&self, window: &mut Window) -> bool {
        let Some(info) = self.info.as_deref() else {
            return false;
        };
        if info.is_resizable() {
            return false;
        }
        let needed = self.footprint.needed_padding(window, info);
        if info.padding().covers(&needed) {
            return false;
        }

        let shape = info.tensor_shape();
        let strides = info.strides_in_bytes();
        let elem = strides[0] as isize;
        let offset_first = info.offset_first_element_in_bytes() as isize;
        let (stride_y, stride_z) = outer_strides(info);
        let (width, height) = (shape[0] as isize, shape[1] as isize);

        let mut changed = false;

        let front_y = self
            .footprint
            .shrink_front(window, 1, -(offset_first / stride_y), &mut changed);
        let tail_y = stride_z / stride_y - height - front_y;
        self.footprint.shrink_back(window, 1, height, tail_y, &mut changed);

        let row_padding = stride_y - width * elem;
        let available_x = -((offset_first - front_y * stride_y).min(row_padding) / elem);
        let front_x = self.footprint.shrink_front(window, 0, available_x, &mut changed);
        let tail_x = stride_y / elem - width - front_x;
        self.footprint.shrink_back(window, 0, width, tail_x, &mut changed);

        window.validate();
        changed
    }

    fn update_padding_if_needed(&mut self, window: &Window) -> bool {
        let Some(info) = self.info.as_deref_mut() else {
            return false;
        };
        if !info.is_resizable() {
            return false;
        }
        let needed = self.footprint.needed_padding(window, info);
        info.extend_padding(needed)
    }

    fn info_mut(&mut self) -> Option<&mut TensorInfo> {
        self.info.as_deref_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::{
        AccessError, AccessWindow, AccessWindowHorizontal, AccessWindowRectangle,
        AccessWindowStatic, adjust_down, adjust_up, reconcile, update_window_and_padding,
    };
    use crate::loom::{
        dims::{Coordinates, Steps, TensorShape},
        info::{BorderSize, PaddingSize, TensorInfo, ValidRegion},
        num::DataType,
        window::{Dimension, Window, calculate_max_window},
    };

    fn frozen(shape: [usize; 2], padding: PaddingSize) -> TensorInfo {
        let mut info = TensorInfo::new(shape, DataType::F32);
        info.extend_padding(padding);
        info.set_is_resizable(false);
        info
    }

    #[test]
    fn test_adjust() {
        assert_eq!(adjust_down(12, 11, 1), 11);
        assert_eq!(adjust_down(13, 10, 4), 9);
        assert_eq!(adjust_up(-3, -1, 1), -1);
        assert_eq!(adjust_up(-3, 0, 2), 1);
    }

    #[test]
    fn test_horizontal_downscaled_shrinks() {
        // two inputs per output column; the frozen row only holds 4 of the 5 reached
        let mut info = frozen([4, 2], PaddingSize::default());
        let mut window = Window::from_shape(TensorShape::from([8, 2]), Steps::default());
        let access = AccessWindowHorizontal::with_scale(Some(&mut info), 0, 2, 0.5);
        assert!(access.update_window_if_needed(&mut window));
        assert_eq!(window.x(), Dimension::new(0, 6, 1));
    }

    #[test]
    #[should_panic(expected = "access scales must be positive")]
    fn test_horizontal_zero_scale() {
        AccessWindowHorizontal::with_scale(None, 0, 1, 0.0);
    }

    #[test]
    fn test_horizontal_offset_region() {
        let mut info = TensorInfo::new([10], DataType::F32);
        let window = Window::from_shape(TensorShape::from([8]), Steps::from([4]));
        let access = AccessWindowHorizontal::new(Some(&mut info), 1, 4);
        let input = ValidRegion::from_shape(TensorShape::from([10]));
        let region = access.compute_valid_region(&window, input, false, BorderSize::default());
        // writes land on [1, 9)
        assert_eq!((region.start(0), region.end(0)), (1, 9));
    }

    #[test]
    fn test_horizontal_exact_padding() {
        // a 3-wide read at every column of a 10-wide row needs 2 columns behind it
        let mut info = frozen([10, 8], PaddingSize::new(0, 2, 0, 0));
        assert_eq!(info.strides_in_bytes()[1], 48);
        let mut window = Window::from_shape(info.tensor_shape(), Steps::default());
        let original = window;

        let access = AccessWindowHorizontal::new(Some(&mut info), 0, 3);
        assert!(!access.update_window_if_needed(&mut window));
        assert_eq!(window, original);
    }

    #[test]
    fn test_horizontal_shrinks_by_one_step() {
        let mut info = frozen([10, 8], PaddingSize::new(0, 1, 0, 0));
        assert_eq!(info.strides_in_bytes()[1], 44);
        let mut window = Window::from_shape(info.tensor_shape(), Steps::default());

        let access = AccessWindowHorizontal::new(Some(&mut info), 0, 3);
        assert!(access.update_window_if_needed(&mut window));
        assert_eq!(window.x(), Dimension::new(0, 9, 1));
        assert_eq!(window.y(), Dimension::new(0, 8, 1));
    }

    #[test]
    fn test_horizontal_grows_padding() {
        let mut info = TensorInfo::new([10, 8], DataType::F32);
        let window = Window::from_shape(info.tensor_shape(), Steps::default());

        let mut access = AccessWindowHorizontal::new(Some(&mut info), 0, 3);
        assert!(access.update_padding_if_needed(&window));
        assert!(!access.update_padding_if_needed(&window));

        assert_eq!(info.padding(), PaddingSize::new(0, 2, 0, 0));
        assert!(info.padding().right >= 1);
    }

    #[test]
    fn test_horizontal_vector_step() {
        // 4 elements per step over a width of 10: the last step reads columns 8..12
        let mut info = TensorInfo::new([10, 2], DataType::F32);
        let mut window = Window::from_shape(info.tensor_shape(), Steps::from([4]));
        let mut access = AccessWindowHorizontal::new(Some(&mut info), 0, 4);
        assert!(!update_window_and_padding(&mut window, &mut [&mut access]));
        assert_eq!(info.padding().right, 2);

        // once frozen with less padding, the window loses its last step
        let mut info = frozen([10, 2], PaddingSize::new(0, 1, 0, 0));
        let access = AccessWindowHorizontal::new(Some(&mut info), 0, 4);
        assert!(access.update_window_if_needed(&mut window));
        assert_eq!(window.x(), Dimension::new(0, 8, 4));
    }

    #[test]
    fn test_rectangle_halo() {
        let mut input = TensorInfo::new([8, 6], DataType::F32);
        let mut output = TensorInfo::new([8, 6], DataType::F32);
        let border = BorderSize::uniform(1);
        let mut window = calculate_max_window(&output.valid_region(), &Steps::from([4]), true, border);
        assert_eq!(window.x(), Dimension::new(1, 9, 4));

        let input_region = input.valid_region();
        let mut input_access = AccessWindowRectangle::new(Some(&mut input), -1, -1, 6, 3);
        let mut output_access = AccessWindowHorizontal::new(Some(&mut output), 0, 4);
        let changed = reconcile(&mut window, &mut [&mut input_access, &mut output_access]);
        assert!(!changed.unwrap());
        output_access.set_valid_region(&window, input_region, true, border);

        // reads x in [0, 10) and y in [0, 6)
        assert_eq!(input.padding(), PaddingSize::new(0, 2, 0, 0));
        assert_eq!(output.padding(), PaddingSize::new(0, 1, 0, 0));

        let region = output.valid_region();
        assert_eq!(region.anchor.as_slice(), &[1, 1]);
        assert_eq!(region.shape.as_slice(), &[6, 4]);
    }

    #[test]
    fn test_rectangle_front_shrink() {
        // no padding above or left: a halo of one cannot be read at the origin
        let mut info = frozen([8, 6], PaddingSize::default());
        let mut window = Window::from_shape(info.tensor_shape(), Steps::default());
        let access = AccessWindowRectangle::new(Some(&mut info), -1, -1, 3, 3);
        assert!(access.update_window_if_needed(&mut window));
        assert_eq!(window.x(), Dimension::new(1, 6, 1));
        assert_eq!(window.y(), Dimension::new(1, 5, 1));
    }

    #[test]
    fn test_rectangle_scaled() {
        // 2x2 pooling with stride 2 reads [2i, 2i + 2)
        let mut input = TensorInfo::new([9, 4], DataType::F32);
        let window = Window::from_shape(TensorShape::from([5, 2]), Steps::default());
        let mut access = AccessWindowRectangle::with_scale(Some(&mut input), 0, 0, 2, 2, 2.0, 2.0);
        assert!(access.update_padding_if_needed(&window));
        assert_eq!(input.padding(), PaddingSize::new(0, 1, 0, 0));
    }

    #[test]
    fn test_static_collapses_window() {
        let mut info = frozen([4, 4], PaddingSize::default());
        let mut window = Window::from_shape(TensorShape::from([4, 4]), Steps::default());
        let access = AccessWindowStatic::new(Some(&mut info), -1, 0, 4, 4);
        assert!(access.update_window_if_needed(&mut window));
        assert!(window.is_empty());
        assert_eq!(window.x(), Dimension::new(0, 0, 1));

        let mut info = frozen([4, 4], PaddingSize::default());
        let mut window = Window::from_shape(TensorShape::from([4, 4]), Steps::default());
        let mut access = AccessWindowStatic::full(&mut info);
        let result = reconcile(&mut window, &mut [&mut access]);
        assert!(!result.unwrap());
    }

    #[test]
    fn test_reconcile_reports_empty() {
        let mut info = frozen([4, 4], PaddingSize::default());
        let mut window = Window::from_shape(TensorShape::from([4, 4]), Steps::default());
        let mut access = AccessWindowStatic::new(Some(&mut info), 0, 0, 5, 4);
        let err = reconcile(&mut window, &mut [&mut access]).unwrap_err();
        assert!(matches!(err, AccessError::InsufficientPadding(_)));
    }

    #[test]
    fn test_valid_region_no_border() {
        let mut info = TensorInfo::new([10, 8, 3], DataType::F32);
        info.extend_padding(PaddingSize::uniform(4));
        let window = Window::from_shape(info.tensor_shape(), Steps::from([4]));
        let input = info.valid_region();
        let access = AccessWindowRectangle::new(Some(&mut info), 0, 0, 4, 1);
        let region = access.compute_valid_region(&window, input, false, BorderSize::uniform(2));
        assert_eq!(region, ValidRegion::from_shape(TensorShape::from([10, 8, 3])));

        let mut narrow = window;
        narrow.set(2, Dimension::new(1, 2, 1));
        let region = access.compute_valid_region(&narrow, input, false, BorderSize::default());
        assert_eq!(region.start(2), 1);
        assert_eq!(region.shape[2], 1);
    }

    #[test]
    fn test_placeholder() {
        let mut window = Window::from_shape(TensorShape::from([4, 4]), Steps::default());
        let original = window;
        let mut access = AccessWindowHorizontal::new(None, -2, 8);
        let region = ValidRegion::new(Coordinates::from((1, 1)), TensorShape::from([2, 2]));

        assert!(!update_window_and_padding(&mut window, &mut [&mut access]));
        assert_eq!(window, original);
        assert_eq!(access.compute_valid_region(&window, region, false, BorderSize::default()), region);
        access.set_valid_region(&window, region, false, BorderSize::default());
    }
}
