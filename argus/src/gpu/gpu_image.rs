use std::borrow::Cow;
use std::sync::Arc;

use common::slot::Slot;
use wgpu::util::DeviceExt;

use crate::prelude::*;

/// Wrapper for read-only buffer access.
#[derive(Debug)]
pub struct ReadBuffer<'a>(pub(crate) &'a wgpu::Buffer);

impl ReadBuffer<'_> {
    /// Returns the entire buffer as a binding resource.
    pub fn as_entire_binding(&self) -> wgpu::BindingResource<'_> {
        self.0.as_entire_binding()
    }
}

/// Wrapper for writable buffer access.
#[derive(Debug)]
pub struct WriteBuffer<'a>(pub(crate) &'a wgpu::Buffer);

impl WriteBuffer<'_> {
    /// Returns the entire buffer as a binding resource.
    pub fn as_entire_binding(&self) -> wgpu::BindingResource<'_> {
        self.0.as_entire_binding()
    }

    /// Returns a reference to the underlying buffer for queue operations.
    pub fn buffer(&self) -> &wgpu::Buffer {
        self.0
    }
}

/// Image data stored on the GPU as a storage buffer.
#[derive(Debug)]
pub struct GpuImage {
    pub(crate) buffer: wgpu::Buffer,
    pub(crate) desc: ImageDesc,
}

impl GpuImage {
    /// Creates a new GPU image from CPU image data.
    pub fn from_image(ctx: &Gpu, image: &Image) -> Self {
        let desc = image.desc().with_aligned_stride();
        let bytes: Cow<[u8]> = if image.desc().stride == desc.stride {
            // Already aligned — zero-copy borrow
            Cow::Borrowed(image.bytes())
        } else {
            // Need to re-stride: copy pixel rows with new aligned stride (no full image clone)
            let src = image.bytes();
            let src_stride = image.desc().stride;
            let row_bytes = image.desc().row_bytes();
            let mut buf = vec![0u8; desc.size_in_bytes()];
            for y in 0..desc.height as usize {
                buf[y * desc.stride..y * desc.stride + row_bytes]
                    .copy_from_slice(&src[y * src_stride..y * src_stride + row_bytes]);
            }
            Cow::Owned(buf)
        };

        let buffer = ctx
            .device()
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("gpu_image_buffer"),
                contents: &bytes,
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_SRC
                    | wgpu::BufferUsages::COPY_DST,
            });

        Self { buffer, desc }
    }

    /// Creates an empty GPU image with the given descriptor.
    pub fn new_empty(ctx: &Gpu, desc: ImageDesc) -> Self {
        let desc = desc.with_aligned_stride();
        let size = desc.size_in_bytes() as u64;

        let buffer = ctx.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some("gpu_image_buffer"),
            size,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self { buffer, desc }
    }

    /// Downloads GPU image data to CPU.
    ///
    /// Blocks until the copy has completed. The buffer-map result is
    /// surfaced through a slot so a failed map becomes an error instead
    /// of silently producing stale bytes.
    pub fn to_image(&self, ctx: &Gpu) -> Result<Image> {
        let size = self.desc().size_in_bytes() as u64;

        let staging_buffer = ctx.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some("gpu_image_staging"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = ctx
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("gpu_image_download_encoder"),
            });

        encoder.copy_buffer_to_buffer(&self.buffer, 0, &staging_buffer, 0, size);
        ctx.queue().submit(std::iter::once(encoder.finish()));

        let slot: Arc<Slot<std::result::Result<(), String>>> = Arc::new(Slot::new());
        let buffer_slice = staging_buffer.slice(..);
        buffer_slice.map_async(wgpu::MapMode::Read, {
            let slot = Arc::clone(&slot);
            move |result| slot.send(result.map_err(|e| e.to_string()))
        });

        ctx.wait()?;

        slot.take_owned()
            .ok_or_else(|| Error::Gpu("buffer map callback never fired".to_string()))?
            .map_err(Error::Gpu)?;

        let data = buffer_slice.get_mapped_range();
        let bytes = data.to_vec();
        drop(data);
        staging_buffer.unmap();

        Image::new_with_data(self.desc, bytes)
    }

    /// Creates a copy of this GPU image with a new buffer.
    pub fn clone_buffer(&self, ctx: &Gpu) -> Self {
        let size = self.desc().size_in_bytes() as u64;

        let buffer = ctx.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some("gpu_image_buffer"),
            size,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = ctx
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("gpu_image_clone_encoder"),
            });

        encoder.copy_buffer_to_buffer(&self.buffer, 0, &buffer, 0, size);

        ctx.queue().submit(std::iter::once(encoder.finish()));

        Self {
            buffer,
            desc: *self.desc(),
        }
    }

    /// Returns the image descriptor.
    pub fn desc(&self) -> &ImageDesc {
        &self.desc
    }

    /// Returns a read-only buffer wrapper for binding in shaders.
    pub fn read_buffer(&self) -> ReadBuffer<'_> {
        ReadBuffer(&self.buffer)
    }

    /// Returns a writable buffer wrapper for binding in shaders.
    ///
    /// Note: `&mut self` is intentional to prevent accidental writes to non-mutable buffers.
    pub fn write_buffer(&mut self) -> WriteBuffer<'_> {
        WriteBuffer(&self.buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::test_utils::{rgb_frame, test_gpu};

    #[test]
    fn upload_download_round_trip() {
        let Some(ctx) = test_gpu() else {
            return;
        };

        let mut image = rgb_frame(61, 38, [0, 0, 0]);
        for (i, byte) in image.bytes_mut().iter_mut().enumerate() {
            *byte = (i * 13 % 256) as u8;
        }

        let gpu_image = GpuImage::from_image(&ctx, &image);
        let result = gpu_image.to_image(&ctx).unwrap();

        assert_eq!(result.desc(), image.desc());
        assert_eq!(result.bytes(), image.bytes());
    }

    #[test]
    fn from_image_re_strides_packed_input() {
        let Some(ctx) = test_gpu() else {
            return;
        };

        // 5 * 3 = 15 bytes per row, packed; upload must align to 16
        let image = rgb_frame(5, 4, [9, 8, 7]).packed();
        assert_eq!(image.desc().stride, 15);

        let gpu_image = GpuImage::from_image(&ctx, &image);
        assert_eq!(gpu_image.desc().stride, 16);

        let result = gpu_image.to_image(&ctx).unwrap();
        assert!(crate::common::pixels_equal(
            &result.packed(),
            &image.packed()
        ));
    }

    #[test]
    fn clone_buffer_copies_contents() {
        let Some(ctx) = test_gpu() else {
            return;
        };

        let image = rgb_frame(8, 8, [1, 2, 3]);
        let gpu_image = GpuImage::from_image(&ctx, &image);
        let cloned = gpu_image.clone_buffer(&ctx);

        let result = cloned.to_image(&ctx).unwrap();
        assert_eq!(result.bytes(), image.bytes());
    }
}
