//! Common test utilities
#![allow(dead_code)]

use dwconv::ops::{
    depthwise_conv2d_with, scratch_size, validate_depthwise, ComputeOptions, ConvParams,
    DepthwiseVariant,
};
use dwconv::dtype::Element;
use dwconv::runtime::cpu::ScratchBuffer;
use dwconv::tensor::{DataLayout, TensorShape, TensorView, TensorViewMut};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Deterministic RNG for reproducible fills.
pub fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Uniform floats in `[-1, 1)`.
pub fn random_f32(rng: &mut StdRng, len: usize) -> Vec<f32> {
    (0..len).map(|_| rng.gen_range(-1.0f32..1.0)).collect()
}

/// Uniform i8 over the whole range.
pub fn random_i8(rng: &mut StdRng, len: usize) -> Vec<i8> {
    (0..len).map(|_| rng.gen::<i8>()).collect()
}

/// Uniform i16 in `[-bound, bound]`.
pub fn random_i16(rng: &mut StdRng, len: usize, bound: i16) -> Vec<i16> {
    (0..len).map(|_| rng.gen_range(-bound..=bound)).collect()
}

/// Uniform i32 in `[-bound, bound]`.
pub fn random_i32(rng: &mut StdRng, len: usize, bound: i32) -> Vec<i32> {
    (0..len).map(|_| rng.gen_range(-bound..=bound)).collect()
}

/// Assert two f32 slices are close within tolerance
///
/// Uses the formula: |a - b| <= atol + rtol * |b|
pub fn assert_allclose_f32(a: &[f32], b: &[f32], rtol: f32, atol: f32, msg: &str) {
    assert_eq!(a.len(), b.len(), "{}: length mismatch", msg);
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let diff = (x - y).abs();
        let tol = atol + rtol * y.abs();
        assert!(
            diff <= tol,
            "{}: element {} differs: {} vs {} (diff={}, tol={})",
            msg,
            i,
            x,
            y,
            diff,
            tol
        );
    }
}

/// Reorder a kernel given as `[C*M][kh][kw]` into the order the engine
/// expects for `layout`.
pub fn kernel_for_layout<T: Copy>(
    oc_major: &[T],
    out_channels: usize,
    kh: usize,
    kw: usize,
    layout: DataLayout,
) -> Vec<T> {
    match layout {
        DataLayout::ChannelFirst => oc_major.to_vec(),
        DataLayout::ChannelLast => {
            let mut out = Vec::with_capacity(oc_major.len());
            for ky in 0..kh {
                for kx in 0..kw {
                    for oc in 0..out_channels {
                        out.push(oc_major[(oc * kh + ky) * kw + kx]);
                    }
                }
            }
            out
        }
    }
}

/// Direct depthwise convolution over a materialized padded input.
///
/// `kernel` is `[C*M][kh][kw]` regardless of layout. Taps are accumulated
/// in `(ky, kx)` order. The result is laid out per `out_layout`.
pub fn reference_conv<V: DepthwiseVariant>(
    variant: &V,
    input: &TensorView<'_, V::Input>,
    kernel: &[V::Kernel],
    bias: Option<&[V::Bias]>,
    params: &ConvParams,
    out_layout: DataLayout,
) -> Vec<V::Output> {
    let g = validate_depthwise(input.shape(), params).unwrap();
    let shape = input.shape();
    let (ph, pw) = (
        shape.height + g.pad_top + g.pad_bottom,
        shape.width + g.pad_left + g.pad_right,
    );
    let pad = variant.input_pad();
    let mut padded = vec![pad; ph * pw * shape.channels];
    for c in 0..shape.channels {
        for y in 0..shape.height {
            for x in 0..shape.width {
                padded[(c * ph + y + g.pad_top) * pw + x + g.pad_left] = input.get(y, x, c);
            }
        }
    }

    let (kh, kw, m) = (g.kernel.height, g.kernel.width, g.multiplier);
    let out_shape = g.output;
    let mut out = vec![<V::Output as Element>::zero(); out_shape.numel()];
    for c in 0..shape.channels {
        for mi in 0..m {
            let oc = c * m + mi;
            for oy in 0..out_shape.height {
                for ox in 0..out_shape.width {
                    let mut acc = <V::Acc as dwconv::ops::Accumulator>::zero();
                    for ky in 0..kh {
                        for kx in 0..kw {
                            let y = oy * g.stride_y + ky * g.dilation_y;
                            let x = ox * g.stride_x + kx * g.dilation_x;
                            acc = variant.mac(
                                acc,
                                padded[(c * ph + y) * pw + x],
                                kernel[(oc * kh + ky) * kw + kx],
                            );
                        }
                    }
                    let b = bias.map(|b| b[oc]);
                    out[out_layout.offset(&out_shape, oy, ox, oc)] = variant.finish(acc, b, oc);
                }
            }
        }
    }
    out
}

/// Run the engine with a freshly sized scratch buffer.
///
/// `kernel` is `[C*M][kh][kw]` and is reordered for the input layout.
#[allow(clippy::too_many_arguments)]
pub fn run_engine<V: DepthwiseVariant>(
    variant: &V,
    input: &[V::Input],
    shape: TensorShape,
    in_layout: DataLayout,
    kernel: &[V::Kernel],
    bias: Option<&[V::Bias]>,
    params: &ConvParams,
    out_layout: DataLayout,
    options: &ComputeOptions,
) -> Vec<V::Output> {
    let g = validate_depthwise(shape, params).unwrap();
    let kernel = kernel_for_layout(
        kernel,
        g.out_channels(),
        g.kernel.height,
        g.kernel.width,
        in_layout,
    );
    let bytes = scratch_size(shape, in_layout, params, V::PRECISION).unwrap();
    let mut scratch = ScratchBuffer::new(bytes);
    let mut out = vec![<V::Output as Element>::zero(); g.output.numel()];
    let input = TensorView::new(input, shape, in_layout).unwrap();
    let mut output = TensorViewMut::new(&mut out, g.output, out_layout).unwrap();
    depthwise_conv2d_with(
        variant,
        &mut output,
        &input,
        &kernel,
        bias,
        params,
        scratch.as_bytes_mut(),
        options,
    )
    .unwrap();
    out
}

/// Engine vs reference for one variant and layout pair.
#[allow(clippy::too_many_arguments)]
pub fn check_against_reference<V>(
    variant: &V,
    input: &[V::Input],
    shape: TensorShape,
    in_layout: DataLayout,
    kernel: &[V::Kernel],
    bias: Option<&[V::Bias]>,
    params: &ConvParams,
    out_layout: DataLayout,
) where
    V: DepthwiseVariant,
    V::Output: PartialEq,
{
    let got = run_engine(
        variant,
        input,
        shape,
        in_layout,
        kernel,
        bias,
        params,
        out_layout,
        &ComputeOptions::default(),
    );
    let view = TensorView::new(input, shape, in_layout).unwrap();
    let want = reference_conv(variant, &view, kernel, bias, params, out_layout);
    assert_eq!(
        got, want,
        "{} {} -> {}, {:?}, {:?}",
        V::PRECISION, in_layout, out_layout, shape, params
    );
}
