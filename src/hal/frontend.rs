//! Operators pairing configuration on tensor metadata with scheduled runs on
//! allocated tensors.
//!
//! Configure every operator of a pipeline first: that is when padding grows.
//! Then allocate the tensors from the configured metadata and run.

use super::{
    ExecStrategy,
    cpu::{AddKernel, Convolution3x3Kernel, FillBorderKernel},
};
use crate::loom::{
    info::{BorderMode, TensorInfo},
    kernel::{Kernel, KernelError},
    schedule::{Hints, Scheduler},
    tensor::{Slot, Tensor, TensorPack},
    window::Window,
};

/// Element-wise `output = lhs + rhs`.
#[derive(Debug, Clone)]
pub struct Add {
    kernel: AddKernel,
}

impl Add {
    pub fn configure(
        lhs: &mut TensorInfo,
        rhs: &mut TensorInfo,
        output: &mut TensorInfo,
        strategy: ExecStrategy,
    ) -> Result<Self, KernelError> {
        let kernel = AddKernel::configure(lhs, rhs, output, strategy)?;
        Ok(Self { kernel })
    }

    #[inline]
    pub fn validate(
        lhs: &TensorInfo,
        rhs: &TensorInfo,
        output: &TensorInfo,
        strategy: ExecStrategy,
    ) -> Result<(), KernelError> {
        AddKernel::validate(lhs, rhs, output, strategy)
    }

    pub fn run(&self, scheduler: &dyn Scheduler, lhs: &Tensor, rhs: &Tensor, output: &mut Tensor) {
        let pack = TensorPack::new()
            .with_src(Slot::Src0, lhs)
            .with_src(Slot::Src1, rhs)
            .with_dst(Slot::Dst, output);
        scheduler.schedule(&self.kernel, &Hints::default(), &pack);
    }
}

/// 3x3 convolution that first fills the border of its input.
///
/// With [`BorderMode::Undefined`] nothing is filled and the outermost ring of the
/// output is invalid.
#[derive(Debug, Clone)]
pub struct Convolution3x3 {
    border: FillBorderKernel,
    kernel: Convolution3x3Kernel,
}

impl Convolution3x3 {
    pub fn configure(
        input: &mut TensorInfo,
        output: &mut TensorInfo,
        weights: [f32; 9],
        mode: BorderMode,
        constant: f32,
    ) -> Result<Self, KernelError> {
        let border_undefined = mode == BorderMode::Undefined;
        let kernel = Convolution3x3Kernel::configure(input, output, weights, border_undefined)?;
        let border = FillBorderKernel::configure(input, kernel.border_size(), mode, constant)?;
        log::debug!(
            "convolution 3x3 configured with {mode} border, input padding {}",
            input.padding()
        );
        Ok(Self { border, kernel })
    }

    pub fn validate(input: &TensorInfo, output: &TensorInfo, mode: BorderMode) -> Result<(), KernelError> {
        Self::configure(&mut input.clone(), &mut output.clone(), [0.0; 9], mode, 0.0)?;
        Ok(())
    }

    /// Runs the border fill, then the convolution. The fill writes into the
    /// padding of `input`, hence the exclusive borrow.
    pub fn run(&self, scheduler: &dyn Scheduler, input: &mut Tensor, output: &mut Tensor) {
        {
            let pack = TensorPack::new().with_dst(Slot::Dst, input);
            scheduler.schedule(&self.border, &Hints::new(Window::DIM_Z), &pack);
        }
        let pack = TensorPack::new()
            .with_src(Slot::Src0, &*input)
            .with_dst(Slot::Dst, output);
        scheduler.schedule(&self.kernel, &Hints::default(), &pack);
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use itertools::{Itertools, iproduct};

    use super::{Add, Convolution3x3};
    use crate::{
        hal::{ExecStrategy, cpu::assert_approx_eq},
        loom::{
            info::{BorderMode, PaddingSize, TensorInfo},
            kernel::KernelError,
            num::DataType,
            schedule::{Scheduler, SingleThreadScheduler},
            tensor::Tensor,
        },
    };

    #[test]
    fn test_add_broadcast_rows() -> Result<(), Box<dyn Error>> {
        fastrand::seed(42);
        let (w, h) = (6, 3);
        let x = (0..w * h).map(|_| fastrand::f32()).collect_vec();
        let y = (0..w).map(|_| fastrand::f32()).collect_vec();

        let mut lhs = TensorInfo::new([w, h], DataType::F32);
        let mut rhs = TensorInfo::new([w], DataType::F32);
        let mut output = TensorInfo::new([w, h], DataType::F32);
        Add::validate(&lhs, &rhs, &output, ExecStrategy::Vector)?;
        let add = Add::configure(&mut lhs, &mut rhs, &mut output, ExecStrategy::Vector)?;

        let lhs = Tensor::create(lhs, &x)?;
        let rhs = Tensor::create(rhs, &y)?;
        let mut output = Tensor::allocate(output);
        add.run(&SingleThreadScheduler, &lhs, &rhs, &mut output);

        let output = output.back::<f32>()?;
        for (j, i) in iproduct!(0..h, 0..w) {
            let index = j * w + i;
            assert_approx_eq!(index, output[index], x[index] + y[i], 1.0e-6);
        }
        Ok(())
    }

    /// Convolution with out-of-range reads resolved by `border`.
    fn reference(
        data: &[f32],
        weights: &[f32; 9],
        (w, h): (usize, usize),
        border: impl Fn(isize, isize) -> f32,
    ) -> Vec<f32> {
        iproduct!(0..h as isize, 0..w as isize)
            .map(|(y, x)| {
                iproduct!(-1..=1isize, -1..=1isize)
                    .map(|(dy, dx)| {
                        let (u, v) = (x + dx, y + dy);
                        let weight = weights[((dy + 1) * 3 + dx + 1) as usize];
                        let inside = (0..w as isize).contains(&u) && (0..h as isize).contains(&v);
                        let value = if inside { data[(v * w as isize + u) as usize] } else { border(u, v) };
                        weight * value
                    })
                    .sum::<f32>()
            })
            .collect()
    }

    fn convolution(
        scheduler: &dyn Scheduler,
        (w, h): (usize, usize),
        mode: BorderMode,
    ) -> Result<(), Box<dyn Error>> {
        let data = (0..w * h).map(|_| fastrand::f32()).collect_vec();
        let weights: [f32; 9] = std::array::from_fn(|_| fastrand::f32() - 0.5);
        let constant = 0.25;

        let mut input = TensorInfo::new([w, h], DataType::F32);
        let mut output = TensorInfo::new([w, h], DataType::F32);
        let op = Convolution3x3::configure(&mut input, &mut output, weights, mode, constant)?;
        assert!(input.padding().covers(&PaddingSize::uniform(1)));
        assert_eq!(output.valid_region().shape, input.tensor_shape());

        let mut input = Tensor::create(input, &data)?;
        let mut output = Tensor::allocate(output);
        op.run(scheduler, &mut input, &mut output);

        let r#ref = match mode {
            BorderMode::Replicate => reference(&data, &weights, (w, h), |u, v| {
                let (u, v) = (u.clamp(0, w as isize - 1), v.clamp(0, h as isize - 1));
                data[(v * w as isize + u) as usize]
            }),
            _ => reference(&data, &weights, (w, h), |_, _| constant),
        };
        let output = output.back::<f32>()?;
        for (index, (&x, &y)) in output.iter().zip_eq(r#ref.iter()).enumerate() {
            assert_approx_eq!(index, x, y, 1.0e-5);
        }
        Ok(())
    }

    #[test]
    fn test_convolution_constant_border() -> Result<(), Box<dyn Error>> {
        fastrand::seed(42);
        convolution(&SingleThreadScheduler, (9, 6), BorderMode::Constant)
    }

    #[test]
    fn test_convolution_replicate_border() -> Result<(), Box<dyn Error>> {
        fastrand::seed(42);
        convolution(&SingleThreadScheduler, (7, 5), BorderMode::Replicate)
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn test_convolution_pool() -> Result<(), Box<dyn Error>> {
        use crate::loom::schedule::CpuSchedulerBuilder;

        fastrand::seed(42);
        let scheduler = CpuSchedulerBuilder::new().num_threads(3).build()?;
        convolution(&scheduler, (17, 11), BorderMode::Replicate)?;
        convolution(&scheduler, (12, 8), BorderMode::Constant)
    }

    #[test]
    fn test_convolution_frozen_input() {
        let mut input = TensorInfo::new([8, 8], DataType::F32);
        input.set_is_resizable(false);
        let output = TensorInfo::new([8, 8], DataType::F32);
        let err = Convolution3x3::validate(&input, &output, BorderMode::Constant);
        assert!(matches!(err, Err(KernelError::Access(_))));
    }
}
