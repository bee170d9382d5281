//! Iteration domains over strided tensors.
//!
//! A [`Window`] holds one half-open `(start, end, step)` range per dimension. Only
//! the first `rank` dimensions of a tensor are meaningful; the others default to
//! `(0, 1, 1)` so that they iterate exactly once.

use derive_more::Display;
use itertools::Itertools;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{
    dims::{MAX_DIMS, Steps, TensorShape},
    info::{BorderSize, ValidRegion},
};

/// A half-open range with a step. A step of `0` marks a broadcast dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[display("({start}, {end}, {step})")]
pub struct Dimension {
    start: isize,
    end: isize,
    step: isize,
}

impl Default for Dimension {
    #[inline]
    fn default() -> Self {
        Self::new(0, 1, 1)
    }
}

impl Dimension {
    #[inline]
    pub const fn new(start: isize, end: isize, step: isize) -> Self {
        Self { start, end, step }
    }

    #[inline]
    pub const fn start(&self) -> isize {
        self.start
    }

    #[inline]
    pub const fn end(&self) -> isize {
        self.end
    }

    #[inline]
    pub const fn step(&self) -> isize {
        self.step
    }

    #[inline]
    pub fn set_end(&mut self, end: isize) {
        self.end = end;
    }

    #[inline]
    pub const fn is_broadcast(&self) -> bool {
        self.step == 0
    }

    /// Number of steps needed to cover the range, counting a partial last step.
    ///
    /// # Panics
    /// Panics on a broadcast dimension.
    #[inline]
    pub fn num_iterations(&self) -> usize {
        assert!(self.step > 0, "dimension {self} has no iterations to count");
        ((self.end - self.start).max(0) as usize).div_ceil(self.step as usize)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Window {
    dims: [Dimension; MAX_DIMS],
}

impl std::fmt::Display for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.dims.iter().format(", "))
    }
}

impl std::ops::Index<usize> for Window {
    type Output = Dimension;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.dims[index]
    }
}

#[inline]
pub(crate) fn ceil_to_multiple(value: usize, multiple: usize) -> usize {
    value.div_ceil(multiple) * multiple
}

impl Window {
    pub const DIM_X: usize = 0;
    pub const DIM_Y: usize = 1;
    pub const DIM_Z: usize = 2;

    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Covers every element of `shape`. Ends are rounded up to a multiple of the step.
    pub fn from_shape(shape: TensorShape, steps: Steps) -> Self {
        let mut window = Self::new();
        for d in 0..shape.len() {
            let end = ceil_to_multiple(shape[d], steps[d]);
            window.set(d, Dimension::new(0, end as isize, steps[d] as isize));
        }
        window
    }

    #[inline]
    pub fn set(&mut self, dim: usize, dimension: Dimension) {
        self.dims[dim] = dimension;
    }

    #[inline]
    pub fn set_dimension_step(&mut self, dim: usize, step: isize) {
        self.dims[dim].step = step;
    }

    #[inline]
    pub fn x(&self) -> Dimension {
        self.dims[Self::DIM_X]
    }

    #[inline]
    pub fn y(&self) -> Dimension {
        self.dims[Self::DIM_Y]
    }

    #[inline]
    pub fn z(&self) -> Dimension {
        self.dims[Self::DIM_Z]
    }

    /// Asserts that no dimension ends before it starts.
    ///
    /// # Panics
    /// A violation is a caller bug, so this panics instead of returning an error.
    pub fn validate(&self) {
        for (d, dim) in self.dims.iter().enumerate() {
            assert!(
                dim.end >= dim.start,
                "invalid window {self}: dimension {d} ends before it starts"
            );
        }
    }

    #[inline]
    pub fn num_iterations(&self, dim: usize) -> usize {
        self.dims[dim].num_iterations()
    }

    #[inline]
    pub fn num_iterations_total(&self) -> usize {
        (0..MAX_DIMS).map(|d| self.num_iterations(d)).product()
    }

    /// Returns `true` if some dimension has an empty range.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dims.iter().any(|dim| dim.end <= dim.start)
    }

    /// Number of iterations along each dimension.
    pub fn shape(&self) -> TensorShape {
        let extents = (0..MAX_DIMS).map(|d| self.num_iterations(d)).collect_vec();
        TensorShape::new(&extents)
    }

    /// Moves the range of `dim` by `value`.
    #[inline]
    pub fn shift(&mut self, dim: usize, value: isize) {
        let d = &mut self.dims[dim];
        *d = Dimension::new(d.start + value, d.end + value, d.step);
    }

    /// Moves either the start or the end of `dim` by `value`.
    #[inline]
    pub fn adjust(&mut self, dim: usize, value: isize, is_at_start: bool) {
        let d = &mut self.dims[dim];
        if is_at_start {
            d.start += value;
        } else {
            d.end += value;
        }
    }

    /// Scales the range of `dim`, keeping its step.
    #[inline]
    pub fn scale(&mut self, dim: usize, scale: f32) {
        let d = &mut self.dims[dim];
        *d = Dimension::new(
            (d.start as f32 * scale) as isize,
            (d.end as f32 * scale) as isize,
            d.step,
        );
    }

    /// Extends dimensions `first..` to cover the extents of `shape`, keeping their starts.
    pub fn use_tensor_dimensions(&mut self, shape: &TensorShape, first: usize) {
        for d in first..shape.len() {
            let end = shape[d].max(1) as isize;
            self.dims[d] = Dimension::new(self.dims[d].start, end, 1);
        }
    }

    /// Returns `true` if every range of `self` lies inside that of `full`, with the
    /// same step and a start aligned to it.
    pub fn is_subwindow_of(&self, full: &Window) -> bool {
        self.dims.iter().zip(full.dims.iter()).all(|(sub, full)| {
            sub.step == full.step
                && sub.start >= full.start
                && sub.end <= full.end
                && (full.step == 0 || (sub.start - full.start) % full.step == 0)
        })
    }

    /// Returns the `id`-th of `total` contiguous parts along `dim`.
    ///
    /// Iterations are split evenly; the first `iterations % total` parts get one
    /// extra. Every start stays aligned to the step of the parent.
    pub fn split_window(&self, dim: usize, id: usize, total: usize) -> Window {
        assert!(id < total, "part {id} out of {total}");
        let Dimension { start, end, step } = self.dims[dim];

        let iterations = self.num_iterations(dim);
        let rem = iterations % total;
        let mut work = iterations / total;
        let mut it_start = work * id;
        if id < rem {
            work += 1;
            it_start += id;
        } else {
            it_start += rem;
        }

        let start = start + it_start as isize * step;
        let end = end.min(start + work as isize * step);

        let mut out = *self;
        out.set(dim, Dimension::new(start, end, step));
        out
    }

    /// Merges dimensions `first..` into `first` when they are traversed contiguously.
    ///
    /// Every dimension above `first` must be a full `(0, end, 1)` range matching
    /// `full`. If any of them iterates more than once, `first` itself must be a full
    /// unit-step range too. Whether the merged dimensions are also contiguous in
    /// memory is up to the caller; tensor layouts are dense from [`Window::DIM_Z`] up.
    pub fn collapse_if_possible(&self, full: &Window, first: usize) -> (Window, bool) {
        let higher = (first + 1..MAX_DIMS).map(|d| (self.dims[d], full.dims[d]));
        let mut is_collapsable = true;
        let mut extent = 1;
        for (sub, full) in higher {
            is_collapsable &= sub.start == 0 && sub.step == 1 && sub == full;
            extent *= sub.end.max(0);
        }

        let head = self.dims[first];
        if extent > 1 {
            is_collapsable &= head.start == 0 && head.step == 1 && head == full.dims[first];
        }
        if !is_collapsable {
            return (*self, false);
        }

        let mut collapsed = *self;
        collapsed.dims[first].set_end(head.end * extent);
        for d in first + 1..MAX_DIMS {
            collapsed.set(d, Dimension::default());
        }
        (collapsed, true)
    }

    /// Same as [`Window::collapse_if_possible`], discarding the flag.
    #[inline]
    pub fn collapse(&self, full: &Window, first: usize) -> Window {
        self.collapse_if_possible(full, first).0
    }

    /// Marks every dimension in which `shape` has extent `1` as a broadcast.
    ///
    /// The result is meant for building cursors over the smaller operand; it is
    /// not a window that can be iterated.
    pub fn broadcast_if_dimension_le_one(&self, shape: &TensorShape) -> Window {
        let mut window = *self;
        for d in 0..MAX_DIMS {
            if shape[d] <= 1 {
                window.set(d, Dimension::new(0, 0, 0));
            }
        }
        window
    }

    /// The first `N`-dimensional slice: dimensions below `N` are kept and every
    /// higher dimension is pinned to its first position.
    pub fn first_slice_window<const N: usize>(&self) -> Window {
        let mut slice = *self;
        for d in N..MAX_DIMS {
            let start = self.dims[d].start;
            slice.set(d, Dimension::new(start, start + 1, 1));
        }
        slice
    }

    /// Advances `slice` to the next `N`-dimensional slice. Returns `false` after the last one.
    pub fn slide_window_slice<const N: usize>(&self, slice: &mut Window) -> bool {
        for d in N..MAX_DIMS {
            let next = slice.dims[d].start + self.dims[d].step.max(1);
            if next < self.dims[d].end {
                slice.set(d, Dimension::new(next, next + 1, 1));
                for lower in N..d {
                    let start = self.dims[lower].start;
                    slice.set(lower, Dimension::new(start, start + 1, 1));
                }
                return true;
            }
        }
        false
    }

    #[inline]
    pub fn first_slice_window_1d(&self) -> Window {
        self.first_slice_window::<1>()
    }

    #[inline]
    pub fn first_slice_window_2d(&self) -> Window {
        self.first_slice_window::<2>()
    }

    #[inline]
    pub fn first_slice_window_3d(&self) -> Window {
        self.first_slice_window::<3>()
    }

    #[inline]
    pub fn slide_window_slice_1d(&self, slice: &mut Window) -> bool {
        self.slide_window_slice::<1>(slice)
    }

    #[inline]
    pub fn slide_window_slice_2d(&self, slice: &mut Window) -> bool {
        self.slide_window_slice::<2>(slice)
    }

    #[inline]
    pub fn slide_window_slice_3d(&self, slice: &mut Window) -> bool {
        self.slide_window_slice::<3>(slice)
    }

    /// Iterates over all `N`-dimensional slices of the window.
    #[inline]
    pub fn slices<const N: usize>(&self) -> Slices<'_, N> {
        let next = (!self.is_empty()).then(|| self.first_slice_window::<N>());
        Slices { window: self, next }
    }
}

/// Asserts that `sub` was derived from `full` by splitting.
///
/// # Panics
/// Panics if `sub` leaves `full`, changes a step or starts off the step grid.
pub fn validate_subwindow(full: &Window, sub: &Window) {
    assert!(
        sub.is_subwindow_of(full),
        "window {sub} is not a sub-window of {full}"
    );
}

/// Iterator created by [`Window::slices`].
#[derive(Debug, Clone)]
pub struct Slices<'a, const N: usize> {
    window: &'a Window,
    next: Option<Window>,
}

impl<const N: usize> Iterator for Slices<'_, N> {
    type Item = Window;

    fn next(&mut self) -> Option<Self::Item> {
        let slice = self.next?;
        let mut following = slice;
        self.next = self
            .window
            .slide_window_slice::<N>(&mut following)
            .then_some(following);
        Some(slice)
    }
}

/// The largest window whose accesses stay inside `valid_region`.
///
/// With `skip_border` the border is excluded from the x and y ranges. The x and y
/// ends are rounded up to a multiple of their steps.
pub fn calculate_max_window(
    valid_region: &ValidRegion,
    steps: &Steps,
    skip_border: bool,
    border: BorderSize,
) -> Window {
    let border = if skip_border { border } else { BorderSize::default() };
    let ValidRegion { anchor, shape } = *valid_region;
    let rank = anchor.len().max(shape.len());

    let mut window = Window::new();

    let extent = (shape[0] as isize - border.left as isize - border.right as isize).max(0);
    let start = anchor[0] + border.left as isize;
    let end = start + ceil_to_multiple(extent as usize, steps[0]) as isize;
    window.set(0, Dimension::new(start, end, steps[0] as isize));

    if rank > 1 {
        let extent = (shape[1] as isize - border.top as isize - border.bottom as isize).max(0);
        let start = anchor[1] + border.top as isize;
        let end = start + ceil_to_multiple(extent as usize, steps[1]) as isize;
        window.set(1, Dimension::new(start, end, steps[1] as isize));
    }
    if rank > 2 {
        let end = anchor[2] + shape[2].max(1) as isize;
        window.set(2, Dimension::new(anchor[2], end, steps[2] as isize));
    }
    for d in 3..rank {
        let end = anchor[d] + shape[d].max(1) as isize;
        window.set(d, Dimension::new(anchor[d], end, 1));
    }
    window
}

/// Maximum window of a horizontal pass.
///
/// With `skip_border` the left and right border is excluded. Without it, the rows
/// of the top and bottom border are included so that a following vertical pass
/// finds them computed.
pub fn calculate_max_window_horizontal(
    valid_region: &ValidRegion,
    steps: &Steps,
    skip_border: bool,
    border: BorderSize,
) -> Window {
    let border = if skip_border {
        BorderSize::new(0, border.right, 0, border.left)
    } else {
        BorderSize::new(border.top, 0, border.bottom, 0)
    };
    let ValidRegion { anchor, shape } = *valid_region;
    let rank = anchor.len().max(shape.len());

    let mut window = Window::new();

    let extent = (shape[0] as isize - border.left as isize - border.right as isize).max(0);
    let start = anchor[0] + border.left as isize;
    let end = start + ceil_to_multiple(extent as usize, steps[0]) as isize;
    window.set(0, Dimension::new(start, end, steps[0] as isize));

    if rank > 1 {
        let start = anchor[1] - border.top as isize;
        let end = anchor[1] + (shape[1] + border.bottom) as isize;
        window.set(1, Dimension::new(start, end, 1));
    }
    for d in 2..rank {
        let end = anchor[d] + shape[d].max(1) as isize;
        window.set(d, Dimension::new(anchor[d], end, 1));
    }
    window
}

/// Maximum window that also covers the border around `valid_region`.
pub fn calculate_max_enlarged_window(
    valid_region: &ValidRegion,
    steps: &Steps,
    border: BorderSize,
) -> Window {
    let ValidRegion { anchor, shape } = *valid_region;
    let rank = anchor.len().max(shape.len());

    let mut window = Window::new();

    let start = anchor[0] - border.left as isize;
    let extent = shape[0] + border.left + border.right;
    let end = start + ceil_to_multiple(extent, steps[0]) as isize;
    window.set(0, Dimension::new(start, end, steps[0] as isize));

    if rank > 1 {
        let start = anchor[1] - border.top as isize;
        let extent = shape[1] + border.top + border.bottom;
        let end = start + ceil_to_multiple(extent, steps[1]) as isize;
        window.set(1, Dimension::new(start, end, steps[1] as isize));
    }
    if rank > 2 {
        let end = anchor[2] + shape[2].max(1) as isize;
        window.set(2, Dimension::new(anchor[2], end, steps[2] as isize));
    }
    for d in 3..rank {
        let end = anchor[d] + shape[d].max(1) as isize;
        window.set(d, Dimension::new(anchor[d], end, 1));
    }
    window
}
