mod cpu;
mod gpu;
mod pipeline;

use crate::common::color_format::ColorFormat;
use crate::common::error::{Error, Result};
use crate::gpu::{Gpu, GpuImage};
use crate::image::Image;
use crate::ops::{Backend, select_backend};
use crate::processing_context::{ImageBuffer, ProcessingContext};

pub use pipeline::GpuHysteresisPipeline;

/// Dual-threshold classification of a score field into a binary mask.
///
/// Scores at or above `high` are motion, scores below `low` are not, and
/// the ambiguous band in between becomes motion only when an 8-connected
/// neighbor scores at or above `high`. Neighbor coordinates are clamped
/// to the frame so the rule applies at edges too. The mask is written to
/// a separate buffer; the score field is never read and written by the
/// same pass.
#[derive(Debug, Clone, Copy)]
pub struct Hysteresis {
    /// Noise-floor cutoff: anything below is no-motion.
    pub low: f32,
    /// Strong-motion cutoff: anything at or above is motion.
    pub high: f32,
}

impl Default for Hysteresis {
    fn default() -> Self {
        Self {
            low: 4.0,
            high: 30.0,
        }
    }
}

impl Hysteresis {
    pub fn new(low: f32, high: f32) -> Self {
        Self { low, high }
    }

    /// Builder method to set the noise-floor cutoff.
    pub fn low(mut self, low: f32) -> Self {
        self.low = low;
        self
    }

    /// Builder method to set the strong-motion cutoff.
    pub fn high(mut self, high: f32) -> Self {
        self.high = high;
        self
    }

    fn validate(score: &ImageBuffer, mask: &ImageBuffer) -> Result<()> {
        for buf in [score, mask] {
            if buf.desc().color_format != ColorFormat::GRAY_F32 {
                return Err(Error::UnsupportedFormat(format!(
                    "Hysteresis buffers must be Gray f32, got {}",
                    buf.desc().color_format
                )));
            }
        }
        if mask.desc().width != score.desc().width || mask.desc().height != score.desc().height {
            return Err(Error::InvalidFrame(format!(
                "Hysteresis mask {}x{} does not match score {}x{}",
                mask.desc().width,
                mask.desc().height,
                score.desc().width,
                score.desc().height
            )));
        }
        Ok(())
    }

    /// Applies thresholding on the CPU.
    pub fn apply_cpu(&self, score: &Image, mask: &mut Image) {
        cpu::apply(self, score, mask);
    }

    /// Applies thresholding on the GPU.
    pub fn apply_gpu(
        &self,
        ctx: &Gpu,
        pipeline: &GpuHysteresisPipeline,
        score: &GpuImage,
        mask: &mut GpuImage,
    ) -> Result<()> {
        gpu::apply(self, ctx, pipeline, score, mask)
    }

    /// Applies the operation, choosing CPU or GPU based on data location.
    pub fn execute(
        &self,
        ctx: &mut ProcessingContext,
        score: &ImageBuffer,
        mask: &mut ImageBuffer,
    ) -> Result<()> {
        let backend = select_backend(ctx, [score, mask as &ImageBuffer], "Hysteresis")?;

        match backend {
            Backend::Gpu => self.execute_gpu(ctx, score, mask),
            Backend::Cpu => self.execute_cpu(ctx, score, mask),
        }
    }

    /// Applies the operation on the CPU, downloading buffers if needed.
    pub fn execute_cpu(
        &self,
        ctx: &mut ProcessingContext,
        score: &ImageBuffer,
        mask: &mut ImageBuffer,
    ) -> Result<()> {
        Self::validate(score, mask)?;

        let score_cpu = score.make_cpu(ctx)?;
        let mut mask_cpu = mask.make_cpu_mut(ctx)?;

        self.apply_cpu(&score_cpu, &mut mask_cpu);

        Ok(())
    }

    /// Applies the operation on the GPU, uploading buffers if needed.
    pub fn execute_gpu(
        &self,
        ctx: &mut ProcessingContext,
        score: &ImageBuffer,
        mask: &mut ImageBuffer,
    ) -> Result<()> {
        Self::validate(score, mask)?;

        let score_gpu = score.make_gpu(ctx)?;
        let mut mask_gpu = mask.make_gpu_mut(ctx)?;

        let gpu_processing_ctx = ctx.gpu_context().ok_or(Error::NoGpuContext)?;
        let gpu_ctx = gpu_processing_ctx.gpu().clone();
        let pipeline = gpu_processing_ctx.get_or_create(GpuHysteresisPipeline::new)?;

        self.apply_gpu(&gpu_ctx, pipeline, &score_gpu, &mut mask_gpu)
    }
}
