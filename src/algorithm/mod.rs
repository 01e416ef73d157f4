//! Axis-level algorithms shared by every precision.

pub mod decompose;

pub use decompose::{decompose_axis, gcd, max_outputs, SubAxis};
