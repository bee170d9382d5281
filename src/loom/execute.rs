use super::{
    dims::{Coordinates, MAX_DIMS},
    iterator::Cursor,
    window::Window,
};

/// Yields every coordinate of a window, innermost dimension first.
///
/// Created by [`Window::coords`]. Each dimension advances by its step, so the
/// innermost dimension yields one coordinate per vector the kernel processes.
#[derive(Debug, Clone)]
pub struct Coords<'a> {
    window: &'a Window,
    next: Option<Coordinates>,
    carry: usize,
}

impl<'a> Coords<'a> {
    /// # Panics
    /// Panics if any dimension has a zero step.
    pub fn new(window: &'a Window) -> Self {
        for d in 0..MAX_DIMS {
            assert!(
                window[d].step() > 0,
                "cannot iterate window {window}: dimension {d} has a zero step"
            );
        }
        let next = (!window.is_empty()).then(|| {
            let starts = (0..MAX_DIMS).map(|d| window[d].start());
            let mut coords = Coordinates::default();
            starts.enumerate().for_each(|(d, start)| coords.set(d, start));
            coords
        });
        Self {
            window,
            next,
            carry: 0,
        }
    }

    /// The dimension that advances from the coordinate last yielded to the next one.
    #[inline]
    pub fn carry(&self) -> usize {
        self.carry
    }
}

impl Iterator for Coords<'_> {
    type Item = Coordinates;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        let mut coords = current;
        for d in 0..MAX_DIMS {
            let dim = self.window[d];
            let value = coords[d] + dim.step();
            if value < dim.end() {
                coords[d] = value;
                self.next = Some(coords);
                self.carry = d;
                break;
            }
            coords[d] = dim.start();
        }
        Some(current)
    }
}

impl Window {
    #[inline]
    pub fn coords(&self) -> Coords<'_> {
        Coords::new(self)
    }
}

/// Runs `f` once per coordinate of `window`, keeping every cursor in step.
///
/// The innermost dimension advances by its step, so `f` is expected to process
/// a whole vector of elements per call when the step is larger than `1`.
///
/// # Panics
/// Panics if the window is invalid or has a zero step.
pub fn execute_window_loop<const N: usize>(
    window: &Window,
    mut cursors: [Cursor; N],
    mut f: impl FnMut(&Coordinates, &[Cursor; N]),
) {
    window.validate();
    let mut coords = window.coords();
    while let Some(id) = coords.next() {
        f(&id, &cursors);
        let carry = coords.carry();
        cursors.iter_mut().for_each(|cursor| cursor.increment(carry));
    }
}
