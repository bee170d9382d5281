//! The `loom` module is the execution substrate shared by every kernel.
//!
//! ## Key Components
//! 1. **Iteration Domains**:
//!    - [`window::Window`] describes a `(start, end, step)` range per dimension.
//!    - Windows are sliced, collapsed, split for workers and broadcast.
//!
//! 2. **Traversal**:
//!    - [`iterator::Cursor`] maps window positions to byte offsets of a strided tensor.
//!    - [`execute::execute_window_loop`] drives cursors in innermost-first order.
//!
//! 3. **Access Negotiation**:
//!    - [`access`] descriptors reconcile kernel footprints with tensor padding,
//!      growing padding while a tensor is resizable and shrinking the window after.
//!    - Valid regions track which part of an output was computed from defined inputs.
//!
//! 4. **Execution Model**:
//!    - Kernels are configured once, single-threaded, then run on disjoint sub-windows.
//!    - [`schedule`] splits a window along one dimension across a worker pool.

pub mod access;
pub mod dims;
pub mod execute;
pub mod info;
pub mod iterator;
pub mod kernel;
pub mod num;
pub mod platform;
pub mod schedule;
pub mod tensor;
pub mod window;
