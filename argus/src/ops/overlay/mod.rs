mod cpu;
mod gpu;
mod pipeline;

use crate::common::color_format::ColorFormat;
use crate::common::error::{Error, Result};
use crate::gpu::{Gpu, GpuImage};
use crate::image::Image;
use crate::ops::{Backend, select_backend};
use crate::processing_context::{ImageBuffer, ProcessingContext};

pub use pipeline::GpuOverlayPipeline;

/// Red-channel highlight over masked pixels.
///
/// Wherever the mask is active the red channel becomes
/// `min(255, r + boost * 255)`; green and blue are untouched.
/// This is the only mutation the pipeline performs on the frame.
#[derive(Debug, Clone, Copy)]
pub struct Overlay {
    /// Red boost as a fraction of full scale. 0.5 adds 127.
    pub boost: f32,
}

impl Default for Overlay {
    fn default() -> Self {
        Self { boost: 0.5 }
    }
}

impl Overlay {
    pub fn new(boost: f32) -> Self {
        Self { boost }
    }

    /// Builder method to set the red boost.
    pub fn boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    /// The boost expressed in 8-bit channel units, truncated so the
    /// default 0.5 lands on the historical +127.
    pub(crate) fn boost_value(&self) -> u8 {
        (self.boost * 255.0).clamp(0.0, 255.0) as u8
    }

    fn validate(mask: &ImageBuffer, frame: &ImageBuffer) -> Result<()> {
        if mask.desc().color_format != ColorFormat::GRAY_F32 {
            return Err(Error::UnsupportedFormat(format!(
                "Overlay mask must be Gray f32, got {}",
                mask.desc().color_format
            )));
        }
        if frame.desc().color_format != ColorFormat::RGB_U8 {
            return Err(Error::UnsupportedFormat(format!(
                "Overlay frame must be RGB u8, got {}",
                frame.desc().color_format
            )));
        }
        if mask.desc().width != frame.desc().width || mask.desc().height != frame.desc().height {
            return Err(Error::InvalidFrame(format!(
                "Overlay mask {}x{} does not match frame {}x{}",
                mask.desc().width,
                mask.desc().height,
                frame.desc().width,
                frame.desc().height
            )));
        }
        Ok(())
    }

    /// Applies the highlight on the CPU.
    pub fn apply_cpu(&self, mask: &Image, frame: &mut Image) {
        cpu::apply(self, mask, frame);
    }

    /// Applies the highlight on the GPU.
    pub fn apply_gpu(
        &self,
        ctx: &Gpu,
        pipeline: &GpuOverlayPipeline,
        mask: &GpuImage,
        frame: &mut GpuImage,
    ) -> Result<()> {
        gpu::apply(self, ctx, pipeline, mask, frame)
    }

    /// Applies the operation, choosing CPU or GPU based on data location.
    pub fn execute(
        &self,
        ctx: &mut ProcessingContext,
        mask: &ImageBuffer,
        frame: &mut ImageBuffer,
    ) -> Result<()> {
        let backend = select_backend(ctx, [mask, frame as &ImageBuffer], "Overlay")?;

        match backend {
            Backend::Gpu => self.execute_gpu(ctx, mask, frame),
            Backend::Cpu => self.execute_cpu(ctx, mask, frame),
        }
    }

    /// Applies the operation on the CPU, downloading buffers if needed.
    pub fn execute_cpu(
        &self,
        ctx: &mut ProcessingContext,
        mask: &ImageBuffer,
        frame: &mut ImageBuffer,
    ) -> Result<()> {
        Self::validate(mask, frame)?;

        let mask_cpu = mask.make_cpu(ctx)?;
        let mut frame_cpu = frame.make_cpu_mut(ctx)?;

        self.apply_cpu(&mask_cpu, &mut frame_cpu);

        Ok(())
    }

    /// Applies the operation on the GPU, uploading buffers if needed.
    pub fn execute_gpu(
        &self,
        ctx: &mut ProcessingContext,
        mask: &ImageBuffer,
        frame: &mut ImageBuffer,
    ) -> Result<()> {
        Self::validate(mask, frame)?;

        let mask_gpu = mask.make_gpu(ctx)?;
        let mut frame_gpu = frame.make_gpu_mut(ctx)?;

        let gpu_processing_ctx = ctx.gpu_context().ok_or(Error::NoGpuContext)?;
        let gpu_ctx = gpu_processing_ctx.gpu().clone();
        let pipeline = gpu_processing_ctx.get_or_create(GpuOverlayPipeline::new)?;

        self.apply_gpu(&gpu_ctx, pipeline, &mask_gpu, &mut frame_gpu)
    }
}
