use wide::f32x4;

use super::LANES;
use crate::loom::{
    access::{AccessWindow, AccessWindowHorizontal, AccessWindowRectangle, reconcile},
    dims::Steps,
    execute::execute_window_loop,
    info::{BorderSize, TensorInfo},
    iterator::Cursor,
    kernel::{Kernel, KernelError, ThreadInfo},
    num::DataType,
    tensor::{Slot, TensorPack},
    window::{Window, calculate_max_window},
};

const BORDER: usize = 1;
const READ: usize = LANES + 2 * BORDER;

/// 3x3 convolution over `f32` planes.
///
/// Reads a `6 × 3` block around every group of four outputs. With an undefined
/// border the outermost ring of the output is left unwritten and excluded from
/// its valid region; otherwise the border of the input must be filled before
/// each run.
#[derive(Debug, Clone)]
pub struct Convolution3x3Kernel {
    window: Window,
    weights: [f32; 9],
}

impl Convolution3x3Kernel {
    pub fn configure(
        input: &mut TensorInfo,
        output: &mut TensorInfo,
        weights: [f32; 9],
        border_undefined: bool,
    ) -> Result<Self, KernelError> {
        for info in [&*input, &*output] {
            if info.data_type() != DataType::F32 {
                return Err(KernelError::DataType(info.data_type()));
            }
        }
        if input.tensor_shape() != output.tensor_shape() {
            return Err(KernelError::Shape(input.tensor_shape(), output.tensor_shape()));
        }

        let border = BorderSize::uniform(BORDER);
        let input_region = input.valid_region();
        let mut window = calculate_max_window(
            &input_region,
            &Steps::from([LANES]),
            border_undefined,
            border,
        );

        let offset = -(BORDER as isize);
        let mut input_access =
            AccessWindowRectangle::new(Some(input), offset, offset, READ as isize, 3);
        let mut output_access = AccessWindowHorizontal::new(Some(output), 0, LANES as isize);
        reconcile(&mut window, &mut [&mut input_access, &mut output_access])?;
        output_access.set_valid_region(&window, input_region, border_undefined, border);

        Ok(Self { window, weights })
    }

    pub fn validate(
        input: &TensorInfo,
        output: &TensorInfo,
        border_undefined: bool,
    ) -> Result<(), KernelError> {
        Self::configure(&mut input.clone(), &mut output.clone(), [0.0; 9], border_undefined)?;
        Ok(())
    }
}

impl Kernel for Convolution3x3Kernel {
    fn name(&self) -> &'static str {
        "convolution_3x3"
    }

    fn window(&self) -> &Window {
        &self.window
    }

    fn border_size(&self) -> BorderSize {
        BorderSize::uniform(BORDER)
    }

    fn run(&self, window: &Window, pack: &TensorPack, _info: &ThreadInfo) {
        let input = pack.src(Slot::Src0);
        let output = pack.dst(Slot::Dst);

        let strides = input.info().strides_in_bytes();
        let (stride_x, stride_y) = (strides[0] as isize, strides[1] as isize);
        let weights = self.weights.map(f32x4::splat);

        let cursors = [
            Cursor::new(input.info(), window),
            Cursor::new(output.info(), window),
        ];
        execute_window_loop(window, cursors, |_, [src, dst]| {
            let mut sum = f32x4::splat(0.0);
            for dy in 0..3 {
                let delta = (dy as isize - 1) * stride_y - stride_x;
                let row: [f32; READ] = input.read_array(src.position_at(delta));
                for dx in 0..3 {
                    let x = f32x4::from([row[dx], row[dx + 1], row[dx + 2], row[dx + 3]]);
                    sum += x * weights[dy * 3 + dx];
                }
            }
            output.write_slice(dst.position(), &sum.to_array());
        });
    }
}
