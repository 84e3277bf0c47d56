/// Aligns a value to a 4-byte boundary.
pub(crate) fn align_stride(n: usize) -> usize {
    (n + 3) & !3
}

/// Adds stride padding to tightly packed pixel data.
pub(crate) fn add_stride_padding(
    src: &[u8],
    width: usize,
    height: usize,
    stride: usize,
    bpp: u8,
) -> Vec<u8> {
    let row_bytes = width * bpp as usize;

    if row_bytes == stride {
        src.to_vec()
    } else {
        let mut padded = vec![0u8; stride * height];
        for y in 0..height {
            padded[y * stride..y * stride + row_bytes]
                .copy_from_slice(&src[y * row_bytes..y * row_bytes + row_bytes]);
        }
        padded
    }
}

/// Strips stride padding from pixel data, returning tightly packed rows.
pub(crate) fn strip_stride_padding(
    src: &[u8],
    width: usize,
    height: usize,
    stride: usize,
    bpp: u8,
) -> Vec<u8> {
    let row_bytes = width * bpp as usize;

    if row_bytes == stride {
        src.to_vec()
    } else {
        let mut packed = Vec::with_capacity(row_bytes * height);
        for y in 0..height {
            packed.extend_from_slice(&src[y * stride..y * stride + row_bytes]);
        }
        packed
    }
}
