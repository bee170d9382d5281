mod add;
mod fill_border;
mod filter;
mod histogram;
mod pool;

pub use add::AddKernel;
pub use fill_border::FillBorderKernel;
pub use filter::Convolution3x3Kernel;
pub use histogram::HistogramKernel;
pub use pool::Pool2x2Kernel;

/// Elements processed per window step by the vectorized kernels.
pub(crate) const LANES: usize = 4;

#[cfg(test)]
macro_rules! assert_approx_eq {
    ($i:expr, $a:expr, $b:expr, $eps:expr) => {
        assert!(
            ($a - $b).abs() < $eps,
            "assertion failed at {}: `(left ~= right)`\n  left: `{}`\n right: `{}`",
            $i,
            $a,
            $b
        );
    };
}

#[cfg(test)]
pub(crate) use assert_approx_eq;
