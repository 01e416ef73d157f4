//! Tensor shapes, layout tags and borrowed views
//!
//! The engine never owns tensor memory. Callers hand in slices together with
//! a [`TensorShape`] and a [`DataLayout`]; the views here only check that
//! the two agree and translate logical `(y, x, c)` coordinates into offsets.

mod layout;
mod shape;
mod view;

pub use layout::DataLayout;
pub use shape::{KernelShape, TensorShape};
pub use view::{TensorView, TensorViewMut};
