use crate::loom::{
    access::{AccessWindowHorizontal, AccessWindowStatic, reconcile},
    dims::{Steps, TensorShape},
    execute::execute_window_loop,
    info::{BorderSize, TensorInfo},
    iterator::Cursor,
    kernel::{Kernel, KernelError, ThreadInfo},
    num::DataType,
    tensor::{Slot, TensorPack},
    window::{Window, calculate_max_window},
};

pub const NUM_BINS: usize = 256;

/// Counts the occurrences of every `u8` value into 256 `u32` bins.
///
/// All workers would write the same bins, so the kernel always runs as one workload.
#[derive(Debug, Clone)]
pub struct HistogramKernel {
    window: Window,
}

impl HistogramKernel {
    pub fn configure(input: &mut TensorInfo, output: &mut TensorInfo) -> Result<Self, KernelError> {
        if input.data_type() != DataType::U8 {
            return Err(KernelError::DataType(input.data_type()));
        }
        if output.data_type() != DataType::U32 {
            return Err(KernelError::DataType(output.data_type()));
        }
        let bins = TensorShape::from([NUM_BINS]);
        if output.tensor_shape() != bins {
            return Err(KernelError::Shape(bins, output.tensor_shape()));
        }

        let mut window = calculate_max_window(
            &input.valid_region(),
            &Steps::default(),
            false,
            BorderSize::default(),
        );
        let mut input_access = AccessWindowHorizontal::new(Some(input), 0, 1);
        let mut output_access = AccessWindowStatic::full(output);
        reconcile(&mut window, &mut [&mut input_access, &mut output_access])?;

        Ok(Self { window })
    }

    pub fn validate(input: &TensorInfo, output: &TensorInfo) -> Result<(), KernelError> {
        Self::configure(&mut input.clone(), &mut output.clone())?;
        Ok(())
    }
}

impl Kernel for HistogramKernel {
    fn name(&self) -> &'static str {
        "histogram"
    }

    fn window(&self) -> &Window {
        &self.window
    }

    fn is_parallelisable(&self) -> bool {
        false
    }

    fn run(&self, window: &Window, pack: &TensorPack, _info: &ThreadInfo) {
        let input = pack.src(Slot::Src0);
        let output = pack.dst(Slot::Dst);

        let mut bins = [0u32; NUM_BINS];
        let cursor = Cursor::new(input.info(), window);
        execute_window_loop(window, [cursor], |_, [src]| {
            let value: u8 = input.read(src.position());
            bins[value as usize] += 1;
        });
        output.write_slice(output.info().offset_first_element_in_bytes(), &bins);
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use itertools::Itertools;

    use super::{HistogramKernel, NUM_BINS};
    use crate::loom::{
        info::TensorInfo,
        kernel::KernelError,
        num::DataType,
        schedule::{Hints, Scheduler, SingleThreadScheduler},
        tensor::{Slot, Tensor, TensorPack},
    };

    fn histogram(scheduler: &dyn Scheduler, w: usize, h: usize) -> Result<(), Box<dyn Error>> {
        let data = (0..w * h).map(|_| fastrand::u8(..16)).collect_vec();

        let mut input = TensorInfo::new([w, h], DataType::U8);
        let mut output = TensorInfo::new([NUM_BINS], DataType::U32);
        let kernel = HistogramKernel::configure(&mut input, &mut output)?;

        let input = Tensor::create(input, &data)?;
        // stale counts are overwritten
        let mut output = Tensor::create(output, &[7u32; NUM_BINS])?;
        {
            let pack = TensorPack::new()
                .with_src(Slot::Src0, &input)
                .with_dst(Slot::Dst, &mut output);
            scheduler.schedule(&kernel, &Hints::default(), &pack);
        }

        let mut r#ref = [0u32; NUM_BINS];
        data.iter().for_each(|&x| r#ref[x as usize] += 1);
        assert_eq!(output.back::<u32>()?.as_ref(), r#ref.as_slice());
        Ok(())
    }

    #[test]
    fn test_histogram() -> Result<(), Box<dyn Error>> {
        fastrand::seed(42);
        histogram(&SingleThreadScheduler, 13, 7)
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn test_histogram_pool() -> Result<(), Box<dyn Error>> {
        use crate::loom::schedule::CpuSchedulerBuilder;

        fastrand::seed(42);
        let scheduler = CpuSchedulerBuilder::new().num_threads(4).build()?;
        histogram(&scheduler, 31, 17)
    }

    #[test]
    fn test_histogram_errors() {
        let mut input = TensorInfo::new([8, 8], DataType::U8);
        let err = HistogramKernel::validate(&input, &TensorInfo::new([128], DataType::U32));
        assert!(matches!(err, Err(KernelError::Shape(_, _))));

        let mut output = TensorInfo::new([NUM_BINS], DataType::I32);
        let err = HistogramKernel::configure(&mut input, &mut output);
        assert!(matches!(err, Err(KernelError::DataType(DataType::I32))));
    }
}
