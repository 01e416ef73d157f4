//! Runtime options for the compute entry points.

/// Which inner loop computes the channel-first rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KernelPath {
    /// Use the fixed-width loop when the padded kernel row is 4, 8 or 12
    /// taps wide, the generic loop otherwise.
    #[default]
    Auto,
    /// Always use the arbitrary-width loop.
    Generic,
}

/// Options for [`depthwise_conv2d_with`](crate::ops::depthwise_conv2d_with).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ComputeOptions {
    /// Inner loop selection.
    pub kernel_path: KernelPath,
}

impl ComputeOptions {
    /// Options that force the generic loop.
    pub fn generic() -> Self {
        Self {
            kernel_path: KernelPath::Generic,
        }
    }

    /// Set the inner loop selection.
    pub fn with_kernel_path(mut self, kernel_path: KernelPath) -> Self {
        self.kernel_path = kernel_path;
        self
    }
}
