use crate::gpu::Gpu;
use crate::image::{Image, ImageDesc};
use crate::prelude::*;

/// Returns a GPU context, or None (with a notice) when no adapter is
/// available so tests can skip instead of failing on headless machines.
pub fn test_gpu() -> Option<Gpu> {
    match Gpu::new() {
        Ok(ctx) => Some(ctx),
        Err(e) => {
            eprintln!("Skipping test - no GPU available: {}", e);
            None
        }
    }
}

/// Creates an RGB_U8 image filled with a single color.
pub fn rgb_frame(width: u32, height: u32, color: [u8; 3]) -> Image {
    let desc = ImageDesc::new(width, height, ColorFormat::RGB_U8);
    let mut img = Image::new_empty(desc).unwrap();
    let stride = desc.stride;
    for y in 0..height as usize {
        let row = &mut img.bytes_mut()[y * stride..y * stride + width as usize * 3];
        for px in row.chunks_exact_mut(3) {
            px.copy_from_slice(&color);
        }
    }
    img
}

/// Paints an axis-aligned rectangle of the given color into an RGB_U8 image.
pub fn paint_rect(img: &mut Image, x0: u32, y0: u32, w: u32, h: u32, color: [u8; 3]) {
    let stride = img.desc().stride;
    let width = img.desc().width;
    let height = img.desc().height;
    for y in y0..(y0 + h).min(height) {
        let row_start = y as usize * stride;
        for x in x0..(x0 + w).min(width) {
            img.bytes_mut()[row_start + x as usize * 3..row_start + x as usize * 3 + 3]
                .copy_from_slice(&color);
        }
    }
}

/// Creates a GRAY_F32 field filled with a single value.
pub fn gray_field(width: u32, height: u32, value: f32) -> Image {
    let desc = ImageDesc::new(width, height, ColorFormat::GRAY_F32);
    let mut img = Image::new_empty(desc).unwrap();
    let values: &mut [f32] = bytemuck::cast_slice_mut(img.bytes_mut());
    values.fill(value);
    img
}

/// Reads one GRAY_F32 value at (x, y).
pub fn gray_at(img: &Image, x: u32, y: u32) -> f32 {
    let stride_elems = img.desc().stride / 4;
    let values: &[f32] = bytemuck::cast_slice(img.bytes());
    values[y as usize * stride_elems + x as usize]
}

/// Writes one GRAY_F32 value at (x, y).
pub fn set_gray(img: &mut Image, x: u32, y: u32, value: f32) {
    let stride_elems = img.desc().stride / 4;
    let values: &mut [f32] = bytemuck::cast_slice_mut(img.bytes_mut());
    values[y as usize * stride_elems + x as usize] = value;
}

/// Reads the RGB triple at (x, y).
pub fn rgb_at(img: &Image, x: u32, y: u32) -> [u8; 3] {
    let stride = img.desc().stride;
    let offset = y as usize * stride + x as usize * 3;
    let px = &img.bytes()[offset..offset + 3];
    [px[0], px[1], px[2]]
}
