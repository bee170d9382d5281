use std::ops::Add;

use half::f16;
use wide::f32x4;

use super::LANES;
use crate::{
    hal::ExecStrategy,
    loom::{
        access::{AccessWindow, AccessWindowHorizontal, AccessWindowStatic, reconcile},
        dims::{MAX_DIMS, Steps},
        execute::execute_window_loop,
        info::{BorderSize, TensorInfo, ValidRegion, intersect_valid_regions},
        iterator::Cursor,
        kernel::{Kernel, KernelError, ThreadInfo},
        num::{DataType, Scalar},
        tensor::{Slot, TensorPack, TensorView, TensorViewMut},
        window::Window,
    },
};

/// Adds [`LANES`] elements at the given byte positions. An operand broadcast along x
/// repeats its element at every lane.
type AddFn = fn(&TensorView, &TensorView, &TensorViewMut, [usize; 3], [bool; 2]);

fn add_scalar<T: Scalar + Add<Output = T>>(
    lhs: &TensorView,
    rhs: &TensorView,
    output: &TensorViewMut,
    [l, r, o]: [usize; 3],
    [bl, br]: [bool; 2],
) {
    let size = size_of::<T>();
    let stride = |broadcast: bool| if broadcast { 0 } else { size };
    for lane in 0..LANES {
        let x: T = lhs.read(l + lane * stride(bl));
        let y: T = rhs.read(r + lane * stride(br));
        output.write(o + lane * size, x + y);
    }
}

#[inline]
fn load_f32(view: &TensorView, position: usize, broadcast: bool) -> f32x4 {
    if broadcast {
        f32x4::splat(view.read(position))
    } else {
        f32x4::from(view.read_array::<f32, LANES>(position))
    }
}

#[inline]
fn load_f16(view: &TensorView, position: usize, broadcast: bool) -> f32x4 {
    if broadcast {
        f32x4::splat(view.read::<f16>(position).to_f32())
    } else {
        f32x4::from(view.read_array::<f16, LANES>(position).map(f16::to_f32))
    }
}

fn add_vector_f32(
    lhs: &TensorView,
    rhs: &TensorView,
    output: &TensorViewMut,
    [l, r, o]: [usize; 3],
    [bl, br]: [bool; 2],
) {
    let z = load_f32(lhs, l, bl) + load_f32(rhs, r, br);
    output.write_slice(o, &z.to_array());
}

fn add_vector_f16(
    lhs: &TensorView,
    rhs: &TensorView,
    output: &TensorViewMut,
    [l, r, o]: [usize; 3],
    [bl, br]: [bool; 2],
) {
    let z = load_f16(lhs, l, bl) + load_f16(rhs, r, br);
    output.write_slice(o, &z.to_array().map(f16::from_f32));
}

/// Element-wise addition with broadcasting of extent-1 dimensions.
#[derive(Debug, Clone)]
pub struct AddKernel {
    window: Window,
    broadcast: [bool; 2],
    func: AddFn,
}

fn operand_access(info: &mut TensorInfo, broadcast: bool) -> Box<dyn AccessWindow + '_> {
    if broadcast {
        Box::new(AccessWindowStatic::full(info))
    } else {
        Box::new(AccessWindowHorizontal::new(Some(info), 0, LANES as isize))
    }
}

impl AddKernel {
    pub fn configure(
        lhs: &mut TensorInfo,
        rhs: &mut TensorInfo,
        output: &mut TensorInfo,
        strategy: ExecStrategy,
    ) -> Result<Self, KernelError> {
        let data_type = output.data_type();
        for info in [&*lhs, &*rhs] {
            if info.data_type() != data_type {
                return Err(KernelError::DataTypeMismatch(info.data_type(), data_type));
            }
        }
        let func: AddFn = match (data_type, strategy) {
            (DataType::F32, ExecStrategy::Scalar) => add_scalar::<f32>,
            (DataType::F16, ExecStrategy::Scalar) => add_scalar::<f16>,
            (DataType::F32, ExecStrategy::Vector) => add_vector_f32,
            (DataType::F16, ExecStrategy::Vector) => add_vector_f16,
            (data_type, _) => return Err(KernelError::DataType(data_type)),
        };

        let shape = output.tensor_shape();
        let (lhs_shape, rhs_shape) = (lhs.tensor_shape(), rhs.tensor_shape());
        for operand in [lhs_shape, rhs_shape] {
            if !(0..MAX_DIMS).all(|d| operand[d] == shape[d] || operand[d] == 1) {
                return Err(KernelError::Broadcast(operand, shape));
            }
        }
        if (0..MAX_DIMS).any(|d| shape[d] != lhs_shape[d].max(rhs_shape[d])) {
            return Err(KernelError::Shape(shape, lhs_shape));
        }

        let broadcast = [lhs_shape, rhs_shape].map(|operand| operand[0] == 1 && shape[0] > 1);
        let region = if lhs_shape == rhs_shape {
            intersect_valid_regions(&[lhs.valid_region(), rhs.valid_region()])
        } else {
            ValidRegion::from_shape(shape)
        };

        let mut window = Window::from_shape(shape, Steps::from([LANES]));
        let mut lhs_access = operand_access(lhs, broadcast[0]);
        let mut rhs_access = operand_access(rhs, broadcast[1]);
        let mut output_access = AccessWindowHorizontal::new(Some(output), 0, LANES as isize);
        reconcile(
            &mut window,
            &mut [lhs_access.as_mut(), rhs_access.as_mut(), &mut output_access],
        )?;
        output_access.set_valid_region(&window, region, false, BorderSize::default());

        Ok(Self {
            window,
            broadcast,
            func,
        })
    }

    /// Checks whether [`AddKernel::configure`] would succeed, leaving the infos untouched.
    pub fn validate(
        lhs: &TensorInfo,
        rhs: &TensorInfo,
        output: &TensorInfo,
        strategy: ExecStrategy,
    ) -> Result<(), KernelError> {
        Self::configure(&mut lhs.clone(), &mut rhs.clone(), &mut output.clone(), strategy)?;
        Ok(())
    }
}

impl Kernel for AddKernel {
    fn name(&self) -> &'static str {
        "add"
    }

    fn window(&self) -> &Window {
        &self.window
    }

    fn run(&self, window: &Window, pack: &TensorPack, _info: &ThreadInfo) {
        let lhs = pack.src(Slot::Src0);
        let rhs = pack.src(Slot::Src1);
        let output = pack.dst(Slot::Dst);

        let lhs_window = window.broadcast_if_dimension_le_one(&lhs.info().tensor_shape());
        let rhs_window = window.broadcast_if_dimension_le_one(&rhs.info().tensor_shape());
        let cursors = [
            Cursor::new(lhs.info(), &lhs_window),
            Cursor::new(rhs.info(), &rhs_window),
            Cursor::new(output.info(), window),
        ];
        execute_window_loop(window, cursors, |_, [l, r, o]| {
            let positions = [l.position(), r.position(), o.position()];
            (self.func)(lhs, rhs, output, positions, self.broadcast)
        });
    }
}
