use crate::loom::{
    access::{AccessWindowHorizontal, AccessWindowRectangle, reconcile},
    dims::{Steps, TensorShape},
    execute::execute_window_loop,
    info::{BorderSize, TensorInfo, ValidRegion},
    iterator::Cursor,
    kernel::{Kernel, KernelError, ThreadInfo},
    num::DataType,
    tensor::{Slot, TensorPack},
    window::{Window, calculate_max_window},
};

const POOL: usize = 2;

/// Max pooling over `2 × 2` blocks with a stride of 2.
///
/// The window runs over the output; the input position is the output position
/// scaled by the stride.
#[derive(Debug, Clone)]
pub struct Pool2x2Kernel {
    window: Window,
}

impl Pool2x2Kernel {
    /// Output shape for an input of `shape`. Trailing odd rows and columns are dropped.
    pub fn output_shape(shape: TensorShape) -> TensorShape {
        let mut output = shape;
        output.set(0, shape[0] / POOL);
        output.set(1, shape[1] / POOL);
        output
    }

    pub fn configure(input: &mut TensorInfo, output: &mut TensorInfo) -> Result<Self, KernelError> {
        for info in [&*input, &*output] {
            if info.data_type() != DataType::F32 {
                return Err(KernelError::DataType(info.data_type()));
            }
        }
        let output_shape = Self::output_shape(input.tensor_shape());
        if output.tensor_shape() != output_shape {
            return Err(KernelError::Shape(output_shape, output.tensor_shape()));
        }

        let region = ValidRegion::from_shape(output_shape);
        let mut window = calculate_max_window(&region, &Steps::default(), false, BorderSize::default());

        let (size, scale) = (POOL as isize, POOL as f32);
        let mut input_access =
            AccessWindowRectangle::with_scale(Some(input), 0, 0, size, size, scale, scale);
        let mut output_access = AccessWindowHorizontal::new(Some(output), 0, 1);
        reconcile(&mut window, &mut [&mut input_access, &mut output_access])?;

        output.set_valid_region(region);
        Ok(Self { window })
    }

    pub fn validate(input: &TensorInfo, output: &TensorInfo) -> Result<(), KernelError> {
        Self::configure(&mut input.clone(), &mut output.clone())?;
        Ok(())
    }
}

impl Kernel for Pool2x2Kernel {
    fn name(&self) -> &'static str {
        "pool_2x2"
    }

    fn window(&self) -> &Window {
        &self.window
    }

    fn run(&self, window: &Window, pack: &TensorPack, _info: &ThreadInfo) {
        let input = pack.src(Slot::Src0);
        let output = pack.dst(Slot::Dst);
        let stride_y = input.info().strides_in_bytes()[1] as isize;

        let mut input_window = *window;
        for d in [Window::DIM_X, Window::DIM_Y] {
            input_window.scale(d, POOL as f32);
            input_window.set_dimension_step(d, window[d].step() * POOL as isize);
        }

        let cursors = [
            Cursor::new(input.info(), &input_window),
            Cursor::new(output.info(), window),
        ];
        execute_window_loop(window, cursors, |_, [src, dst]| {
            let top: [f32; POOL] = input.read_array(src.position());
            let bottom: [f32; POOL] = input.read_array(src.position_at(stride_y));
            let max = top.into_iter().chain(bottom).fold(f32::NEG_INFINITY, f32::max);
            output.write(dst.position(), max);
        });
    }
}
