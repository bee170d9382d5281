use thiserror::Error;

use super::{
    access::AccessError,
    dims::TensorShape,
    info::{BorderSize, PaddingSize},
    num::DataType,
    tensor::{TensorError, TensorPack},
    window::{Window, validate_subwindow},
};

#[derive(Debug, Error)]
pub enum KernelError {
    #[error("kernel type error: data type {0} is not supported")]
    DataType(DataType),
    #[error("kernel type error: data type {0} mismatches {1}")]
    DataTypeMismatch(DataType, DataType),
    #[error("kernel shape error: shape {0} mismatches {1}")]
    Shape(TensorShape, TensorShape),
    #[error("kernel shape error: shape {0} cannot be broadcast to {1}")]
    Broadcast(TensorShape, TensorShape),
    #[error("kernel padding error: padding {0} is smaller than border {1}")]
    Border(PaddingSize, BorderSize),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Tensor(#[from] TensorError),
}

/// Identity of the worker running a part of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThreadInfo {
    pub thread_id: usize,
    pub num_threads: usize,
}

impl Default for ThreadInfo {
    #[inline]
    fn default() -> Self {
        Self {
            thread_id: 0,
            num_threads: 1,
        }
    }
}

/// A configured unit of work over a window.
///
/// Kernels are built fully configured: their window, padding decisions and
/// valid regions are settled before the first run. [`Kernel::run`] may be called
/// concurrently with disjoint sub-windows of [`Kernel::window`].
pub trait Kernel: Send + Sync {
    fn name(&self) -> &'static str;

    /// The maximum window the kernel was configured with.
    fn window(&self) -> &Window;

    /// Whether the window may be split across workers.
    #[inline]
    fn is_parallelisable(&self) -> bool {
        true
    }

    #[inline]
    fn border_size(&self) -> BorderSize {
        BorderSize::default()
    }

    fn run(&self, window: &Window, pack: &TensorPack, info: &ThreadInfo);
}

/// Runs `kernel` over `window` after checking that it is part of the configured window.
///
/// With the `strict` feature the check is always on; otherwise only in debug builds.
#[inline]
pub fn run_checked(kernel: &dyn Kernel, window: &Window, pack: &TensorPack, info: &ThreadInfo) {
    if cfg!(feature = "strict") || cfg!(debug_assertions) {
        validate_subwindow(kernel.window(), window);
    }
    kernel.run(window, pack, info);
}
