// Copyright 2025 the Proxima Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Morton (Z-order) keys for points inside a scene box.
//!
//! Each coordinate is normalized against the scene box, quantized to
//! [`bits_per_axis`] bits, and the bits of all axes are interleaved with axis
//! `0` in the lowest position. Sorting items by key groups spatially close
//! items together, which is what the radix-tree build in [`crate::bvh`] relies on.

use crate::types::{Aabb, Point};

/// Number of bits each axis contributes to a `u64` key in `D` dimensions.
#[allow(
    clippy::cast_possible_truncation,
    reason = "At most 32 bits per axis, checked before the cast."
)]
pub const fn bits_per_axis(d: usize) -> u32 {
    let bits = 63 / d;
    if bits > 32 { 32 } else { bits as u32 }
}

/// Morton key of `point` relative to `scene`.
///
/// Points outside the scene are clamped onto its boundary. Axes on which the
/// scene is flat map to cell zero.
pub fn morton_key<const D: usize>(point: &Point<D>, scene: &Aabb<D>) -> u64 {
    let bits = bits_per_axis(D);
    let cells = 1_u64 << bits;
    let mut quantized = [0_u64; D];
    for (d, q) in quantized.iter_mut().enumerate() {
        let span = scene.max[d] - scene.min[d];
        let t = if span > 0.0 {
            ((point[d] - scene.min[d]) / span).clamp(0.0, 1.0)
        } else {
            0.0
        };
        #[allow(
            clippy::cast_possible_truncation,
            reason = "t is clamped to [0, 1]; the min below keeps the cell in range."
        )]
        let cell = (t * cells as f64) as u64;
        *q = cell.min(cells - 1);
    }
    if D == 3 {
        interleave_3(quantized[0])
            | (interleave_3(quantized[1]) << 1)
            | (interleave_3(quantized[2]) << 2)
    } else {
        interleave(&quantized, bits)
    }
}

fn interleave<const D: usize>(quantized: &[u64; D], bits: u32) -> u64 {
    let mut key = 0_u64;
    for bit in 0..bits {
        for (d, q) in quantized.iter().enumerate() {
            key |= ((q >> bit) & 1) << (bit as usize * D + d);
        }
    }
    key
}

/// Spread the low 21 bits of `x` so that two zero bits follow each one.
fn interleave_3(mut x: u64) -> u64 {
    x &= 0x1f_ffff;
    x = (x | x << 32) & 0x001f_0000_0000_ffff;
    x = (x | x << 16) & 0x001f_0000_ff00_00ff;
    x = (x | x << 8) & 0x100f_00f0_0f00_f00f;
    x = (x | x << 4) & 0x10c3_0c30_c30c_30c3;
    x = (x | x << 2) & 0x1249_2492_4924_9249;
    x
}
