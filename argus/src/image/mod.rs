mod stride;

#[cfg(test)]
mod tests;

use crate::common::{ColorFormat, Error, Result};

pub(crate) use stride::align_stride;
use stride::{add_stride_padding, strip_stride_padding};

#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub struct ImageDesc {
    pub width: u32,
    pub height: u32,
    pub stride: usize,
    pub color_format: ColorFormat,
}

#[derive(Clone, Debug)]
pub struct Image {
    desc: ImageDesc,
    bytes: Vec<u8>,
}

impl Image {
    /// Returns the image descriptor.
    pub fn desc(&self) -> &ImageDesc {
        &self.desc
    }

    /// Returns the image bytes as a slice.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn take_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Returns the image bytes as a mutable slice.
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    pub fn new_empty(desc: ImageDesc) -> Result<Image> {
        desc.color_format.validate()?;

        let bytes = vec![0; desc.size_in_bytes()];

        Ok(Image { desc, bytes })
    }

    pub fn new_with_data(desc: ImageDesc, bytes: Vec<u8>) -> Result<Image> {
        desc.color_format.validate()?;

        if bytes.len() != desc.size_in_bytes() {
            return Err(Error::InvalidColorFormat(format!(
                "bytes length {} does not match expected size {}",
                bytes.len(),
                desc.size_in_bytes()
            )));
        }

        Ok(Image { desc, bytes })
    }

    pub fn bytes_per_pixel(&self) -> u8 {
        self.desc.color_format.byte_count()
    }

    /// Returns an image with tightly packed pixel data (stride equals row bytes).
    pub fn packed(self) -> Image {
        if self.desc.is_packed() {
            return self;
        }

        let bytes = strip_stride_padding(
            &self.bytes,
            self.desc.width as usize,
            self.desc.height as usize,
            self.desc.stride,
            self.desc.color_format.byte_count(),
        );

        Image {
            desc: ImageDesc {
                stride: self.desc.row_bytes(),
                ..self.desc
            },
            bytes,
        }
    }

    /// Returns an image with 4-byte aligned stride padding applied.
    pub fn with_stride(self) -> Image {
        let aligned_stride = align_stride(self.desc.row_bytes());
        if self.desc.stride == aligned_stride {
            return self;
        }

        let bytes = add_stride_padding(
            &self.bytes,
            self.desc.width as usize,
            self.desc.height as usize,
            aligned_stride,
            self.desc.color_format.byte_count(),
        );

        Image {
            desc: ImageDesc {
                stride: aligned_stride,
                ..self.desc
            },
            bytes,
        }
    }
}

impl ImageDesc {
    pub fn new(width: u32, height: u32, color_format: ColorFormat) -> Self {
        let stride = align_stride(width as usize * color_format.byte_count() as usize);

        Self {
            width,
            height,
            stride,
            color_format,
        }
    }

    /// Descriptor with swapped width and height, for transposed
    /// intermediate buffers.
    pub fn transposed(self) -> Self {
        Self::new(self.height, self.width, self.color_format)
    }

    pub fn size_in_bytes(&self) -> usize {
        self.height as usize * self.stride
    }

    /// Returns the number of bytes per row without padding.
    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.color_format.byte_count() as usize
    }

    /// Returns true if stride equals row bytes (no padding).
    pub fn is_packed(&self) -> bool {
        self.stride == self.row_bytes()
    }

    /// Returns true if the stride is 4-byte aligned.
    pub fn is_aligned(&self) -> bool {
        self.stride.is_multiple_of(4)
    }

    /// Returns a new descriptor with 4-byte aligned stride.
    pub fn with_aligned_stride(self) -> Self {
        Self {
            stride: align_stride(self.row_bytes()),
            ..self
        }
    }
}

impl std::fmt::Display for ImageDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{} {}", self.width, self.height, self.color_format)
    }
}
