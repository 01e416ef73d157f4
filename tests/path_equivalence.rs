//! Fixed-width row loops must produce the same bits as the generic loop.

mod common;

use common::{random_f32, random_i32, random_i8, rng, run_engine};
use dwconv::ops::{
    Asym8Variant, ComputeOptions, ConvParams, F32Variant, KernelPath, PaddingMode, QuantParams,
    Sym8Sym16Variant,
};
use dwconv::runtime::cpu::kernels::depthwise::{RowKernel, FIXED_WIDTHS};
use dwconv::tensor::{DataLayout, KernelShape, TensorShape};

const WIDTHS: [usize; 10] = [1, 3, 4, 5, 7, 8, 9, 11, 12, 13];

fn params(kw: usize, sx: usize, dx: usize) -> ConvParams {
    ConvParams::new(KernelShape::new(3, kw), 2)
        .with_stride(sx, 1)
        .with_dilation(dx, 1)
        .with_padding(PaddingMode::Same)
}

#[test]
fn test_row_kernel_selection() {
    for w in FIXED_WIDTHS {
        assert_ne!(RowKernel::select(w, KernelPath::Auto), RowKernel::Generic);
        assert_eq!(RowKernel::select(w, KernelPath::Generic), RowKernel::Generic);
    }
    assert_eq!(RowKernel::select(16, KernelPath::Auto), RowKernel::Generic);
    assert_eq!(RowKernel::select(12, KernelPath::Auto).name(), "fixed12");
}

#[test]
fn test_f32_paths_bit_identical() {
    let mut r = rng(101);
    let shape = TensorShape::new(9, 29, 3);
    for kw in WIDTHS {
        for (sx, dx) in [(1, 1), (2, 1), (1, 2), (3, 2)] {
            let p = params(kw, sx, dx);
            let input = random_f32(&mut r, shape.numel());
            let kernel = random_f32(&mut r, 6 * 3 * kw);
            let bias = random_f32(&mut r, 6);
            for layout in [DataLayout::ChannelFirst, DataLayout::ChannelLast] {
                let run = |options: &ComputeOptions| {
                    run_engine(
                        &F32Variant,
                        &input,
                        shape,
                        layout,
                        &kernel,
                        Some(&bias),
                        &p,
                        layout,
                        options,
                    )
                };
                let fast: Vec<u32> = run(&ComputeOptions::default())
                    .iter()
                    .map(|v| v.to_bits())
                    .collect();
                let slow: Vec<u32> = run(&ComputeOptions::generic())
                    .iter()
                    .map(|v| v.to_bits())
                    .collect();
                assert_eq!(fast, slow, "kw={kw} sx={sx} dx={dx} {layout}");
            }
        }
    }
}

#[test]
fn test_asym8_paths_bit_identical() {
    let mut r = rng(202);
    let shape = TensorShape::new(7, 21, 2);
    let variant = Asym8Variant::from_quant(&QuantParams::Asymmetric {
        input_zero_point: -7,
        kernel_zero_point: 4,
        output_zero_point: 9,
        multiplier: 1_300_000_000,
        shift: -7,
    })
    .unwrap()
    .with_activation(-90, 110)
    .unwrap();
    for kw in WIDTHS {
        let p = params(kw, 2, 1);
        let input = random_i8(&mut r, shape.numel());
        let kernel = random_i8(&mut r, 4 * 3 * kw);
        let bias = random_i32(&mut r, 4, 20_000);
        let fast = run_engine(
            &variant,
            &input,
            shape,
            DataLayout::ChannelFirst,
            &kernel,
            Some(&bias),
            &p,
            DataLayout::ChannelLast,
            &ComputeOptions::default(),
        );
        let slow = run_engine(
            &variant,
            &input,
            shape,
            DataLayout::ChannelFirst,
            &kernel,
            Some(&bias),
            &p,
            DataLayout::ChannelLast,
            &ComputeOptions::default().with_kernel_path(KernelPath::Generic),
        );
        assert_eq!(fast, slow, "kw={kw}");
    }
}

#[test]
fn test_sym16_paths_bit_identical() {
    let mut r = rng(303);
    let shape = TensorShape::new(5, 17, 1);
    let multipliers = [1_700_000_000, 900_000_000];
    let shifts = [-9, -6];
    let variant = Sym8Sym16Variant::from_quant(&QuantParams::Symmetric16 {
        multipliers: &multipliers,
        shifts: &shifts,
    })
    .unwrap();
    for kw in WIDTHS {
        let p = params(kw, 1, 1);
        let input = common::random_i16(&mut r, shape.numel(), i16::MAX);
        let kernel = random_i8(&mut r, 2 * 3 * kw);
        let bias: Vec<i64> = vec![1 << 20, -(1 << 22)];
        let run = |options: &ComputeOptions| {
            run_engine(
                &variant,
                &input,
                shape,
                DataLayout::ChannelFirst,
                &kernel,
                Some(&bias),
                &p,
                DataLayout::ChannelFirst,
                options,
            )
        };
        assert_eq!(
            run(&ComputeOptions::default()),
            run(&ComputeOptions::generic()),
            "kw={kw}"
        );
    }
}
