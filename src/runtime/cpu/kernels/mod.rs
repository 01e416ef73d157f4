//! CPU kernels: kernel staging, requantization and the depthwise loops.

pub mod depthwise;
pub mod requant;
pub mod stager;
