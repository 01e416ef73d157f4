//! Element traits for mapping Rust storage types to kernel arithmetic

use bytemuck::{Pod, Zeroable};
use std::fmt::Debug;

/// Trait for types that can be stored in a tensor, the kernel staging
/// region, or the circular buffer.
///
/// # Bounds
/// - `Copy + Send + Sync + 'static` - plain values shared across threads
/// - `Pod + Zeroable` - safe reinterpretation of scratch bytes (bytemuck)
/// - `PartialOrd + Debug` - comparisons and test diagnostics
pub trait Element: Copy + Send + Sync + Pod + Zeroable + PartialOrd + Debug + 'static {
    /// Name used in error messages.
    const NAME: &'static str;

    /// Convert to f64 for reference computations and diagnostics.
    fn to_f64(self) -> f64;

    /// Zero value.
    fn zero() -> Self;
}

/// Integer storage types with a saturating conversion from a wide value.
pub trait Fixed: Element {
    /// Smallest representable value, widened.
    const MIN_I64: i64;
    /// Largest representable value, widened.
    const MAX_I64: i64;

    /// Widen to i64.
    fn to_i64(self) -> i64;

    /// Narrow from i64, clamping to the representable range.
    fn saturate_from(v: i64) -> Self;
}

impl Element for f32 {
    const NAME: &'static str = "f32";

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn zero() -> Self {
        0.0
    }
}

macro_rules! impl_fixed {
    ($($t:ty),*) => {
        $(
            impl Element for $t {
                const NAME: &'static str = stringify!($t);

                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }

                #[inline]
                fn zero() -> Self {
                    0
                }
            }

            impl Fixed for $t {
                const MIN_I64: i64 = <$t>::MIN as i64;
                const MAX_I64: i64 = <$t>::MAX as i64;

                #[inline]
                fn to_i64(self) -> i64 {
                    self as i64
                }

                #[inline]
                fn saturate_from(v: i64) -> Self {
                    v.clamp(Self::MIN_I64, Self::MAX_I64) as $t
                }
            }
        )*
    };
}

impl_fixed!(i8, i16, i32, i64, u8);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saturate_from() {
        assert_eq!(i8::saturate_from(200), 127);
        assert_eq!(i8::saturate_from(-200), -128);
        assert_eq!(i16::saturate_from(40_000), i16::MAX);
        assert_eq!(u8::saturate_from(-1), 0);
        assert_eq!(i64::saturate_from(i64::MIN), i64::MIN);
    }

    #[test]
    fn test_widen() {
        assert_eq!((-5i8).to_i64(), -5);
        assert_eq!(255u8.to_i64(), 255);
        assert_eq!(1.5f32.to_f64(), 1.5);
    }
}
