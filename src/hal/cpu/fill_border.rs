use crate::loom::{
    execute::execute_window_loop,
    info::{BorderMode, BorderSize, TensorInfo},
    iterator::Cursor,
    kernel::{Kernel, KernelError, ThreadInfo},
    num::Scalar,
    tensor::{Slot, TensorPack, TensorViewMut},
    window::Window,
};

/// Writes one border element at `to`, given the nearest valid element at `from`.
type FillFn = fn(&TensorViewMut, usize, usize, &[u8]);

fn fill_constant(tensor: &TensorViewMut, to: usize, _from: usize, constant: &[u8]) {
    tensor.write_slice(to, constant);
}

fn fill_replicate(tensor: &TensorViewMut, to: usize, from: usize, constant: &[u8]) {
    for index in 0..constant.len() {
        tensor.write(to + index, tensor.read::<u8>(from + index));
    }
}

/// Fills the border around the valid region of every plane of a tensor.
///
/// The border lives in the padding, so it must have been grown to at least the
/// border size before the tensor was allocated.
#[derive(Debug, Clone)]
pub struct FillBorderKernel {
    window: Window,
    border: BorderSize,
    constant: Box<[u8]>,
    func: Option<FillFn>,
}

impl FillBorderKernel {
    pub fn configure<T: Scalar>(
        info: &TensorInfo,
        border: BorderSize,
        mode: BorderMode,
        constant: T,
    ) -> Result<Self, KernelError> {
        if info.data_type() != T::DATA_TYPE {
            return Err(KernelError::DataTypeMismatch(T::DATA_TYPE, info.data_type()));
        }
        let func: Option<FillFn> = match mode {
            BorderMode::Undefined => None,
            BorderMode::Constant => Some(fill_constant),
            BorderMode::Replicate => Some(fill_replicate),
        };
        if func.is_some() && !info.padding().covers(&border) {
            return Err(KernelError::Border(info.padding(), border));
        }

        let mut window = Window::new();
        window.use_tensor_dimensions(&info.tensor_shape(), Window::DIM_Z);
        let constant = bytemuck::bytes_of(&constant).into();
        Ok(Self {
            window,
            border,
            constant,
            func,
        })
    }
}

impl Kernel for FillBorderKernel {
    fn name(&self) -> &'static str {
        "fill_border"
    }

    fn window(&self) -> &Window {
        &self.window
    }

    fn border_size(&self) -> BorderSize {
        self.border
    }

    fn run(&self, window: &Window, pack: &TensorPack, _info: &ThreadInfo) {
        let Some(fill) = self.func else {
            return;
        };
        if self.border.is_empty() {
            return;
        }

        let tensor = pack.dst(Slot::Dst);
        let info = tensor.info();
        let region = info.valid_region();
        let strides = info.strides_in_bytes();
        let (stride_x, stride_y) = (strides[0] as isize, strides[1] as isize);

        let BorderSize {
            top,
            right,
            bottom,
            left,
        } = self.border;
        let (x0, x1) = (region.start(0), region.end(0));
        let (y0, y1) = (region.start(1), region.end(1));
        let (left, right) = (left as isize, right as isize);
        let (top, bottom) = (top as isize, bottom as isize);

        let cursor = Cursor::new(info, window);
        execute_window_loop(window, [cursor], |_, [plane]| {
            let at = |x: isize, y: isize| plane.position_at(x * stride_x + y * stride_y);
            for y in y0..y1 {
                for x in x0 - left..x0 {
                    fill(tensor, at(x, y), at(x0, y), &self.constant);
                }
                for x in x1..x1 + right {
                    fill(tensor, at(x, y), at(x1 - 1, y), &self.constant);
                }
            }
            // rows above and below copy whole rows, corners included
            for y in y0 - top..y0 {
                for x in x0 - left..x1 + right {
                    fill(tensor, at(x, y), at(x, y0), &self.constant);
                }
            }
            for y in y1..y1 + bottom {
                for x in x0 - left..x1 + right {
                    fill(tensor, at(x, y), at(x, y1 - 1), &self.constant);
                }
            }
        });
    }
}
