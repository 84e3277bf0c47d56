//! Image comparison utilities for backend equivalence checks.

use rayon::prelude::*;

use crate::common::color_format::{ChannelSize, ChannelType};
use crate::image::Image;

/// Computes the maximum per-channel difference between two images.
/// Returns the difference normalized to [0, 1] for integer types,
/// or absolute difference for float types.
///
/// Only compares actual pixel data, ignoring stride padding.
///
/// # Panics
/// Panics if images have different dimensions or formats.
pub fn max_pixel_diff(img1: &Image, img2: &Image) -> f64 {
    assert_eq!(img1.desc().width, img2.desc().width, "width mismatch");
    assert_eq!(img1.desc().height, img2.desc().height, "height mismatch");
    assert_eq!(
        img1.desc().color_format,
        img2.desc().color_format,
        "format mismatch"
    );

    let height = img1.desc().height as usize;
    let format = img1.desc().color_format;
    let row_bytes = img1.desc().row_bytes();
    let stride1 = img1.desc().stride;
    let stride2 = img2.desc().stride;

    (0..height)
        .into_par_iter()
        .map(|y| {
            let row1 = &img1.bytes()[y * stride1..y * stride1 + row_bytes];
            let row2 = &img2.bytes()[y * stride2..y * stride2 + row_bytes];
            row_max_diff(row1, row2, format.channel_size, format.channel_type)
        })
        .reduce(|| 0.0, f64::max)
}

/// Returns true if the two images have identical pixel data,
/// ignoring stride padding.
pub fn pixels_equal(img1: &Image, img2: &Image) -> bool {
    max_pixel_diff(img1, img2) == 0.0
}

fn row_max_diff(row1: &[u8], row2: &[u8], size: ChannelSize, typ: ChannelType) -> f64 {
    match (size, typ) {
        (ChannelSize::_8bit, ChannelType::UInt) => row1
            .iter()
            .zip(row2.iter())
            .map(|(a, b)| (*a as i32 - *b as i32).unsigned_abs() as f64 / u8::MAX as f64)
            .fold(0.0, f64::max),
        (ChannelSize::_32bit, ChannelType::Float) => {
            let v1: &[f32] = bytemuck::cast_slice(row1);
            let v2: &[f32] = bytemuck::cast_slice(row2);
            v1.iter()
                .zip(v2.iter())
                .map(|(a, b)| (a - b).abs() as f64)
                .fold(0.0, f64::max)
        }
        _ => unreachable!("no supported format uses this channel layout"),
    }
}
