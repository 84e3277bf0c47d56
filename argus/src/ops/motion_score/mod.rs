mod cpu;
mod gpu;
mod pipeline;

use crate::common::color_format::ColorFormat;
use crate::common::error::{Error, Result};
use crate::gpu::{Gpu, GpuImage};
use crate::image::Image;
use crate::ops::{Backend, select_backend};
use crate::processing_context::{ImageBuffer, ProcessingContext};

pub use pipeline::GpuMotionScorePipeline;

/// One persistent background-model record per pixel.
///
/// 16-byte layout shared bit-exactly between CPU rows (bytemuck casts)
/// and the GPU storage struct in the shader. `age` counts consecutive
/// frames the pixel has been classified as moving.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BackgroundPixel {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub age: u32,
}

impl BackgroundPixel {
    pub fn from_rgb(px: [u8; 3]) -> Self {
        Self {
            r: px[0] as f32,
            g: px[1] as f32,
            b: px[2] as f32,
            age: 0,
        }
    }

    /// Euclidean RGB distance between this record's color and a pixel.
    pub fn distance_to(&self, px: [u8; 3]) -> f32 {
        let dr = px[0] as f32 - self.r;
        let dg = px[1] as f32 - self.g;
        let db = px[2] as f32 - self.b;
        (dr * dr + dg * dg + db * db).sqrt()
    }
}

/// Background-model update and per-pixel distance scoring.
///
/// For every pixel the Euclidean RGB distance to the modeled background
/// color is written into the score field. Pixels closer than `threshold`
/// reset their age; pixels at or beyond it age by one frame, and once the
/// age passes `staleness_bound` the modeled color snaps to the observed
/// pixel (the region is adopted as new background).
#[derive(Debug, Clone, Copy)]
pub struct MotionScore {
    /// Distance below which a pixel counts as background-consistent,
    /// on the 0–441 scale of RGB Euclidean distance.
    pub threshold: f32,
    /// Consecutive moving frames tolerated before re-learning a pixel.
    pub staleness_bound: u32,
}

impl Default for MotionScore {
    fn default() -> Self {
        Self {
            threshold: 25.0,
            staleness_bound: 100,
        }
    }
}

impl MotionScore {
    pub fn new(threshold: f32, staleness_bound: u32) -> Self {
        Self {
            threshold,
            staleness_bound,
        }
    }

    /// Builder method to set the motion threshold.
    pub fn threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Builder method to set the staleness bound.
    pub fn staleness_bound(mut self, staleness_bound: u32) -> Self {
        self.staleness_bound = staleness_bound;
        self
    }

    fn validate(
        frame: &ImageBuffer,
        background: &ImageBuffer,
        score: &ImageBuffer,
    ) -> Result<()> {
        if frame.desc().color_format != ColorFormat::RGB_U8 {
            return Err(Error::UnsupportedFormat(format!(
                "MotionScore frame must be RGB u8, got {}",
                frame.desc().color_format
            )));
        }
        if background.desc().color_format != ColorFormat::RGBA_F32 {
            return Err(Error::UnsupportedFormat(format!(
                "MotionScore background must be 16-byte records, got {}",
                background.desc().color_format
            )));
        }
        if score.desc().color_format != ColorFormat::GRAY_F32 {
            return Err(Error::UnsupportedFormat(format!(
                "MotionScore score must be Gray f32, got {}",
                score.desc().color_format
            )));
        }
        for buf in [background, score] {
            if buf.desc().width != frame.desc().width || buf.desc().height != frame.desc().height {
                return Err(Error::InvalidFrame(format!(
                    "MotionScore buffer size {}x{} does not match frame {}x{}",
                    buf.desc().width,
                    buf.desc().height,
                    frame.desc().width,
                    frame.desc().height
                )));
            }
        }
        Ok(())
    }

    /// Applies scoring and background update on the CPU.
    ///
    /// # Panics
    /// Panics if buffer dimensions disagree.
    pub fn apply_cpu(&self, frame: &Image, background: &mut Image, score: &mut Image) {
        cpu::apply(self, frame, background, score);
    }

    /// Applies scoring and background update on the GPU.
    pub fn apply_gpu(
        &self,
        ctx: &Gpu,
        pipeline: &GpuMotionScorePipeline,
        frame: &GpuImage,
        background: &mut GpuImage,
        score: &mut GpuImage,
    ) -> Result<()> {
        gpu::apply(self, ctx, pipeline, frame, background, score)
    }

    /// Applies the operation, choosing CPU or GPU based on data location.
    pub fn execute(
        &self,
        ctx: &mut ProcessingContext,
        frame: &ImageBuffer,
        background: &mut ImageBuffer,
        score: &mut ImageBuffer,
    ) -> Result<()> {
        let backend = select_backend(
            ctx,
            [frame, background as &ImageBuffer, score as &ImageBuffer],
            "MotionScore",
        )?;

        match backend {
            Backend::Gpu => self.execute_gpu(ctx, frame, background, score),
            Backend::Cpu => self.execute_cpu(ctx, frame, background, score),
        }
    }

    /// Applies the operation on the CPU, downloading buffers if needed.
    pub fn execute_cpu(
        &self,
        ctx: &mut ProcessingContext,
        frame: &ImageBuffer,
        background: &mut ImageBuffer,
        score: &mut ImageBuffer,
    ) -> Result<()> {
        Self::validate(frame, background, score)?;

        let frame_cpu = frame.make_cpu(ctx)?;
        let mut background_cpu = background.make_cpu_mut(ctx)?;
        let mut score_cpu = score.make_cpu_mut(ctx)?;

        self.apply_cpu(&frame_cpu, &mut background_cpu, &mut score_cpu);

        Ok(())
    }

    /// Applies the operation on the GPU, uploading buffers if needed.
    pub fn execute_gpu(
        &self,
        ctx: &mut ProcessingContext,
        frame: &ImageBuffer,
        background: &mut ImageBuffer,
        score: &mut ImageBuffer,
    ) -> Result<()> {
        Self::validate(frame, background, score)?;

        let frame_gpu = frame.make_gpu(ctx)?;
        let mut background_gpu = background.make_gpu_mut(ctx)?;
        let mut score_gpu = score.make_gpu_mut(ctx)?;

        let gpu_processing_ctx = ctx.gpu_context().ok_or(Error::NoGpuContext)?;
        let gpu_ctx = gpu_processing_ctx.gpu().clone();
        let pipeline = gpu_processing_ctx.get_or_create(GpuMotionScorePipeline::new)?;

        self.apply_gpu(
            &gpu_ctx,
            pipeline,
            &frame_gpu,
            &mut background_gpu,
            &mut score_gpu,
        )
    }
}
