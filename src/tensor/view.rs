//! Borrowed tensor views over caller-owned memory

use super::{DataLayout, TensorShape};
use crate::dtype::Element;
use crate::error::{Error, Result};

/// Immutable view of a 3-D tensor.
#[derive(Copy, Clone, Debug)]
pub struct TensorView<'a, T> {
    data: &'a [T],
    shape: TensorShape,
    layout: DataLayout,
}

impl<'a, T: Element> TensorView<'a, T> {
    /// Wrap `data`, checking that its length matches `shape`.
    pub fn new(data: &'a [T], shape: TensorShape, layout: DataLayout) -> Result<Self> {
        check_len("input", data.len(), &shape)?;
        Ok(Self {
            data,
            shape,
            layout,
        })
    }

    /// Underlying slice.
    #[inline]
    pub fn data(&self) -> &'a [T] {
        self.data
    }

    /// Logical shape.
    #[inline]
    pub fn shape(&self) -> TensorShape {
        self.shape
    }

    /// Memory order.
    #[inline]
    pub fn layout(&self) -> DataLayout {
        self.layout
    }

    /// Element at logical `(y, x, c)`.
    #[inline]
    pub fn get(&self, y: usize, x: usize, c: usize) -> T {
        self.data[self.layout.offset(&self.shape, y, x, c)]
    }

    /// Copy into a freshly allocated buffer with a different memory order.
    pub fn to_layout(&self, layout: DataLayout) -> Vec<T> {
        let s = self.shape;
        let mut out = vec![T::zero(); s.numel()];
        for y in 0..s.height {
            for x in 0..s.width {
                for c in 0..s.channels {
                    out[layout.offset(&s, y, x, c)] = self.get(y, x, c);
                }
            }
        }
        out
    }
}

/// Mutable view of a 3-D tensor.
#[derive(Debug)]
pub struct TensorViewMut<'a, T> {
    data: &'a mut [T],
    shape: TensorShape,
    layout: DataLayout,
}

impl<'a, T: Element> TensorViewMut<'a, T> {
    /// Wrap `data`, checking that its length matches `shape`.
    pub fn new(data: &'a mut [T], shape: TensorShape, layout: DataLayout) -> Result<Self> {
        check_len("output", data.len(), &shape)?;
        Ok(Self {
            data,
            shape,
            layout,
        })
    }

    /// Logical shape.
    #[inline]
    pub fn shape(&self) -> TensorShape {
        self.shape
    }

    /// Memory order.
    #[inline]
    pub fn layout(&self) -> DataLayout {
        self.layout
    }

    /// Underlying slice.
    #[inline]
    pub fn data(&self) -> &[T] {
        self.data
    }

    /// Element at logical `(y, x, c)`.
    #[inline]
    pub fn get(&self, y: usize, x: usize, c: usize) -> T {
        self.data[self.layout.offset(&self.shape, y, x, c)]
    }

    /// Store `value` at logical `(y, x, c)`.
    #[inline]
    pub fn set(&mut self, y: usize, x: usize, c: usize, value: T) {
        let idx = self.layout.offset(&self.shape, y, x, c);
        self.data[idx] = value;
    }
}

fn check_len(arg: &'static str, len: usize, shape: &TensorShape) -> Result<()> {
    let expected = shape
        .checked_numel()
        .ok_or(Error::CapacityOverflow { what: "tensor size" })?;
    if len != expected {
        return Err(Error::ShapeMismatch {
            arg,
            expected,
            got: len,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_len_checked() {
        let data = [0i8; 11];
        let err = TensorView::new(&data, TensorShape::new(2, 3, 2), DataLayout::ChannelLast)
            .unwrap_err();
        assert_eq!(
            err,
            Error::ShapeMismatch {
                arg: "input",
                expected: 12,
                got: 11
            }
        );
    }

    #[test]
    fn test_to_layout_roundtrip() {
        let data: Vec<i16> = (0..24).collect();
        let shape = TensorShape::new(2, 3, 4);
        let nhwc = TensorView::new(&data, shape, DataLayout::ChannelLast).unwrap();
        let nchw_data = nhwc.to_layout(DataLayout::ChannelFirst);
        let nchw = TensorView::new(&nchw_data, shape, DataLayout::ChannelFirst).unwrap();
        for y in 0..2 {
            for x in 0..3 {
                for c in 0..4 {
                    assert_eq!(nhwc.get(y, x, c), nchw.get(y, x, c));
                }
            }
        }
        assert_eq!(nchw.to_layout(DataLayout::ChannelLast), data);
    }

    #[test]
    fn test_view_mut_set() {
        let mut data = [0.0f32; 6];
        let mut v =
            TensorViewMut::new(&mut data, TensorShape::new(1, 2, 3), DataLayout::ChannelFirst)
                .unwrap();
        v.set(0, 1, 2, 5.0);
        assert_eq!(v.get(0, 1, 2), 5.0);
        assert_eq!(data[5], 5.0);
    }
}
