use std::simd::num::SimdFloat;
use std::simd::{f32x2, f32x4, u32x2, u32x4, StdFloat};

use crate::element::Element;
use crate::kernel::{Kernel, KernelKind, ScalarKernel};
use crate::store::{CentroidStore, LaneView, MoveView};

// Subtracting the float bits from this constant gives a first reciprocal guess.
const RECIPROCAL_MAGIC: u32 = 0x7EF3_11C3;

macro_rules! lane_kernel {
    ($(#[$meta:meta])* $name:ident, $kind:ident, $f:ty, $u:ty, $lanes:expr) => {
        $(#[$meta])*
        pub struct $name {}

        impl $name {
            pub const LANES: usize = $lanes;

            #[inline(always)]
            pub fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
                let mut acc = <$f>::splat(0.0);
                let mut a_chunks = a.chunks_exact($lanes);
                let mut b_chunks = b.chunks_exact($lanes);
                for (x, y) in (&mut a_chunks).zip(&mut b_chunks) {
                    let diff = <$f>::from_slice(x) - <$f>::from_slice(y);
                    acc = diff.mul_add(diff, acc);
                }
                let mut sum = acc.reduce_sum();
                for (&x, &y) in a_chunks.remainder().iter().zip(b_chunks.remainder()) {
                    let diff = x - y;
                    sum = diff.mul_add(diff, sum);
                }
                sum
            }

            /// One Newton-Raphson step towards `1 / x` from the guess `y`.
            #[inline(always)]
            pub fn newton_step(x: $f, y: $f) -> $f {
                y * (-x).mul_add(y, <$f>::splat(2.0))
            }

            /// Roughly 8 correct bits of `1 / x`, for positive normal `x`. Stands in for a
            /// hardware reciprocal estimate such as `vrecpe`: the bit-level guess alone is only
            /// good to about 4 bits, so one Newton-Raphson step is folded in here to reach the
            /// same accuracy.
            #[inline(always)]
            pub fn reciprocal_estimate(x: $f) -> $f {
                let guess = <$f>::from_bits(<$u>::splat(RECIPROCAL_MAGIC) - x.to_bits());
                Self::newton_step(x, guess)
            }

            /// [`Self::reciprocal_estimate`] refined by one Newton-Raphson step, to within a few
            /// parts per million.
            #[inline(always)]
            pub fn reciprocal(x: $f) -> $f {
                Self::newton_step(x, Self::reciprocal_estimate(x))
            }

            #[inline(always)]
            fn add_lanes(sum: &mut [f32], point: &[f32]) {
                let mut sum_chunks = sum.chunks_exact_mut($lanes);
                let mut point_chunks = point.chunks_exact($lanes);
                for (s, p) in (&mut sum_chunks).zip(&mut point_chunks) {
                    (<$f>::from_slice(s) + <$f>::from_slice(p)).copy_to_slice(s);
                }
                for (s, &p) in sum_chunks
                    .into_remainder()
                    .iter_mut()
                    .zip(point_chunks.remainder())
                {
                    *s += p;
                }
            }

            #[inline(always)]
            fn scale_lanes(row: &mut [f32], sum: &[f32], factor: f32) {
                let factor_lanes = <$f>::splat(factor);
                let mut row_chunks = row.chunks_exact_mut($lanes);
                let mut sum_chunks = sum.chunks_exact($lanes);
                for (r, s) in (&mut row_chunks).zip(&mut sum_chunks) {
                    (<$f>::from_slice(s) * factor_lanes).copy_to_slice(r);
                }
                for (r, &s) in row_chunks
                    .into_remainder()
                    .iter_mut()
                    .zip(sum_chunks.remainder())
                {
                    *r = s * factor;
                }
            }

            /// `row += (point - row) * factor` when `toward`, `row += (row - point) * factor`
            /// otherwise.
            #[inline(always)]
            fn shift_lanes(row: &mut [f32], point: &[f32], factor: f32, toward: bool) {
                let factor_lanes = <$f>::splat(factor);
                let mut row_chunks = row.chunks_exact_mut($lanes);
                let mut point_chunks = point.chunks_exact($lanes);
                for (r, p) in (&mut row_chunks).zip(&mut point_chunks) {
                    let current = <$f>::from_slice(r);
                    let target = <$f>::from_slice(p);
                    let diff = if toward {
                        target - current
                    } else {
                        current - target
                    };
                    diff.mul_add(factor_lanes, current).copy_to_slice(r);
                }
                for (r, &p) in row_chunks
                    .into_remainder()
                    .iter_mut()
                    .zip(point_chunks.remainder())
                {
                    let diff = if toward { p - *r } else { *r - p };
                    *r = diff.mul_add(factor, *r);
                }
            }

            fn recompute_lanes(view: LaneView<'_>) -> Vec<usize> {
                let LaneView {
                    cols,
                    points,
                    centroids,
                    assignments,
                    populations,
                } = view;
                let mut sums = vec![0.0f32; populations.len() * cols];
                populations.fill(0);
                for (point, &assignment) in points.chunks_exact(cols).zip(assignments) {
                    let centroid = assignment as usize;
                    populations[centroid] += 1;
                    Self::add_lanes(&mut sums[centroid * cols..(centroid + 1) * cols], point);
                }

                // Reciprocals of the populations, a lane group at a time. Empty centroids get a
                // dummy count and are skipped below.
                let mut reciprocals = vec![0.0f32; populations.len()];
                for (counts, out) in populations
                    .chunks($lanes)
                    .zip(reciprocals.chunks_mut($lanes))
                {
                    let mut lanes = [1.0f32; $lanes];
                    for (lane, &count) in lanes.iter_mut().zip(counts) {
                        if count > 0 {
                            *lane = count as f32;
                        }
                    }
                    let inverse = Self::reciprocal(<$f>::from_array(lanes)).to_array();
                    out.copy_from_slice(&inverse[..out.len()]);
                }

                let mut empty = vec![];
                for (centroid, (row, sum)) in centroids
                    .chunks_exact_mut(cols)
                    .zip(sums.chunks_exact(cols))
                    .enumerate()
                {
                    if populations[centroid] == 0 {
                        empty.push(centroid);
                        continue;
                    }
                    Self::scale_lanes(row, sum, reciprocals[centroid]);
                }
                empty
            }

            fn move_lanes(view: MoveView<'_, f32>) {
                let MoveView {
                    dest,
                    src,
                    point,
                    dest_population,
                    src_population,
                } = view;
                let mut lanes = [1.0f32; $lanes];
                lanes[0] = dest_population.max(1) as f32;
                lanes[1] = src_population.max(1) as f32;
                let inverse = Self::reciprocal(<$f>::from_array(lanes)).to_array();

                if src_population > 0 {
                    Self::shift_lanes(src, point, inverse[1], false);
                }
                Self::shift_lanes(dest, point, inverse[0], true);
            }
        }

        impl<T: Element> Kernel<T> for $name {
            const KIND: KernelKind = KernelKind::$kind;

            #[inline]
            fn distance(a: &[T], b: &[T]) -> f64 {
                match (T::as_lanes(a), T::as_lanes(b)) {
                    (Some(a), Some(b)) => Self::squared_distance(a, b) as f64,
                    _ => <ScalarKernel as Kernel<T>>::distance(a, b),
                }
            }

            fn recompute(store: &mut CentroidStore<T>) -> Vec<usize> {
                match store.lane_view() {
                    Some(view) => Self::recompute_lanes(view),
                    None => <ScalarKernel as Kernel<T>>::recompute(store),
                }
            }

            fn move_point(store: &mut CentroidStore<T>, dest: usize, src: usize, point: usize) {
                match store.lane_move_view(dest, src, point) {
                    Some(view) => Self::move_lanes(view),
                    None => <ScalarKernel as Kernel<T>>::move_point(store, dest, src, point),
                }
            }
        }
    };
}

lane_kernel!(
    /// Kernel on 128-bit lane groups (4 x f32). Rows must sit on 16-byte boundaries.
    Vector128Kernel,
    Vector128,
    f32x4,
    u32x4,
    4
);

lane_kernel!(
    /// Kernel on 64-bit lane groups (2 x f32). Rows must sit on 8-byte boundaries.
    Vector64Kernel,
    Vector64,
    f32x2,
    u32x2,
    2
);
