mod cpu;
mod gpu;
mod pipeline;

use serde::{Deserialize, Serialize};

use crate::common::color_format::ColorFormat;
use crate::common::error::{Error, Result};
use crate::gpu::{Gpu, GpuImage};
use crate::image::Image;
use crate::ops::{Backend, select_backend};
use crate::processing_context::{ImageBuffer, ProcessingContext};

pub use pipeline::{GpuMorphologyDiskPipeline, GpuMorphologySeparablePipeline};

/// Which half of a morphological opening to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MorphMode {
    /// Neighborhood minimum.
    Erode,
    /// Neighborhood maximum.
    Dilate,
}

/// Kernel strategy for a morphology step. The two strategies produce
/// documented, deliberately different neighborhoods and are never mixed
/// within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MorphStrategy {
    /// One 2D pass over a disk kernel (`dx² + dy² ≤ radius²`).
    #[default]
    Disk,
    /// Two transposed-write 3-tap sweeps, composing to a 3×3 box.
    /// Trades kernel shape for coalesced row-major memory access;
    /// ignores `radius`.
    Separable,
}

/// One erosion or dilation step over a score field.
#[derive(Debug, Clone, Copy)]
pub struct Morphology {
    pub mode: MorphMode,
    pub strategy: MorphStrategy,
    /// Disk radius in pixels. Pixels within `radius` of an edge pass
    /// through unprocessed.
    pub radius: u32,
}

impl Morphology {
    pub fn erode(radius: u32) -> Self {
        Self {
            mode: MorphMode::Erode,
            strategy: MorphStrategy::Disk,
            radius,
        }
    }

    pub fn dilate(radius: u32) -> Self {
        Self {
            mode: MorphMode::Dilate,
            strategy: MorphStrategy::Disk,
            radius,
        }
    }

    /// Builder method to set the kernel strategy.
    pub fn strategy(mut self, strategy: MorphStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    fn validate(&self, input: &ImageBuffer, scratch: &ImageBuffer, output: &ImageBuffer) -> Result<()> {
        for buf in [input, scratch, output] {
            if buf.desc().color_format != ColorFormat::GRAY_F32 {
                return Err(Error::UnsupportedFormat(format!(
                    "Morphology buffers must be Gray f32, got {}",
                    buf.desc().color_format
                )));
            }
        }
        if output.desc().width != input.desc().width
            || output.desc().height != input.desc().height
        {
            return Err(Error::InvalidFrame(format!(
                "Morphology output {}x{} does not match input {}x{}",
                output.desc().width,
                output.desc().height,
                input.desc().width,
                input.desc().height
            )));
        }
        if self.strategy == MorphStrategy::Separable
            && (scratch.desc().width != input.desc().height
                || scratch.desc().height != input.desc().width)
        {
            return Err(Error::InvalidFrame(format!(
                "Morphology scratch {}x{} must be the transpose of input {}x{}",
                scratch.desc().width,
                scratch.desc().height,
                input.desc().width,
                input.desc().height
            )));
        }
        if self.strategy == MorphStrategy::Disk && self.radius == 0 {
            return Err(Error::InvalidFrame(
                "Morphology disk radius must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Applies one disk-kernel min/max pass on the CPU.
    pub fn apply_cpu_disk(&self, input: &Image, output: &mut Image) {
        cpu::apply_disk(self.mode, self.radius, input, output);
    }

    /// Applies one transposed-write 3-tap sweep on the CPU. Two sweeps
    /// (input → scratch → output) make up one separable step.
    pub fn apply_cpu_separable_pass(&self, input: &Image, output: &mut Image) {
        cpu::apply_separable_pass(self.mode, input, output);
    }

    /// Applies one disk-kernel min/max pass on the GPU.
    pub fn apply_gpu_disk(
        &self,
        ctx: &Gpu,
        pipeline: &GpuMorphologyDiskPipeline,
        input: &GpuImage,
        output: &mut GpuImage,
    ) -> Result<()> {
        gpu::apply_disk(self, ctx, pipeline, input, output)
    }

    /// Applies one transposed-write 3-tap sweep on the GPU.
    pub fn apply_gpu_separable_pass(
        &self,
        ctx: &Gpu,
        pipeline: &GpuMorphologySeparablePipeline,
        input: &GpuImage,
        output: &mut GpuImage,
    ) -> Result<()> {
        gpu::apply_separable_pass(self, ctx, pipeline, input, output)
    }

    /// Applies the step, choosing CPU or GPU based on data location.
    ///
    /// `scratch` must have transposed dimensions and is only touched by
    /// the separable strategy.
    pub fn execute(
        &self,
        ctx: &mut ProcessingContext,
        input: &ImageBuffer,
        scratch: &mut ImageBuffer,
        output: &mut ImageBuffer,
    ) -> Result<()> {
        let backend = select_backend(
            ctx,
            [input, scratch as &ImageBuffer, output as &ImageBuffer],
            "Morphology",
        )?;

        match backend {
            Backend::Gpu => self.execute_gpu(ctx, input, scratch, output),
            Backend::Cpu => self.execute_cpu(ctx, input, scratch, output),
        }
    }

    /// Applies the step on the CPU, downloading buffers if needed.
    pub fn execute_cpu(
        &self,
        ctx: &mut ProcessingContext,
        input: &ImageBuffer,
        scratch: &mut ImageBuffer,
        output: &mut ImageBuffer,
    ) -> Result<()> {
        self.validate(input, scratch, output)?;

        match self.strategy {
            MorphStrategy::Disk => {
                let input_cpu = input.make_cpu(ctx)?;
                let mut output_cpu = output.make_cpu_mut(ctx)?;
                self.apply_cpu_disk(&input_cpu, &mut output_cpu);
            }
            MorphStrategy::Separable => {
                {
                    let input_cpu = input.make_cpu(ctx)?;
                    let mut scratch_cpu = scratch.make_cpu_mut(ctx)?;
                    self.apply_cpu_separable_pass(&input_cpu, &mut scratch_cpu);
                }
                let scratch_cpu = scratch.make_cpu(ctx)?;
                let mut output_cpu = output.make_cpu_mut(ctx)?;
                self.apply_cpu_separable_pass(&scratch_cpu, &mut output_cpu);
            }
        }

        Ok(())
    }

    /// Applies the step on the GPU, uploading buffers if needed.
    pub fn execute_gpu(
        &self,
        ctx: &mut ProcessingContext,
        input: &ImageBuffer,
        scratch: &mut ImageBuffer,
        output: &mut ImageBuffer,
    ) -> Result<()> {
        self.validate(input, scratch, output)?;

        match self.strategy {
            MorphStrategy::Disk => {
                let input_gpu = input.make_gpu(ctx)?;
                let mut output_gpu = output.make_gpu_mut(ctx)?;

                let gpu_processing_ctx = ctx.gpu_context().ok_or(Error::NoGpuContext)?;
                let gpu_ctx = gpu_processing_ctx.gpu().clone();
                let pipeline =
                    gpu_processing_ctx.get_or_create(GpuMorphologyDiskPipeline::new)?;

                self.apply_gpu_disk(&gpu_ctx, pipeline, &input_gpu, &mut output_gpu)?;
            }
            MorphStrategy::Separable => {
                {
                    let input_gpu = input.make_gpu(ctx)?;
                    let mut scratch_gpu = scratch.make_gpu_mut(ctx)?;

                    let gpu_processing_ctx = ctx.gpu_context().ok_or(Error::NoGpuContext)?;
                    let gpu_ctx = gpu_processing_ctx.gpu().clone();
                    let pipeline =
                        gpu_processing_ctx.get_or_create(GpuMorphologySeparablePipeline::new)?;

                    self.apply_gpu_separable_pass(
                        &gpu_ctx,
                        pipeline,
                        &input_gpu,
                        &mut scratch_gpu,
                    )?;
                }
                let scratch_gpu = scratch.make_gpu(ctx)?;
                let mut output_gpu = output.make_gpu_mut(ctx)?;

                let gpu_processing_ctx = ctx.gpu_context().ok_or(Error::NoGpuContext)?;
                let gpu_ctx = gpu_processing_ctx.gpu().clone();
                let pipeline =
                    gpu_processing_ctx.get_or_create(GpuMorphologySeparablePipeline::new)?;

                self.apply_gpu_separable_pass(&gpu_ctx, pipeline, &scratch_gpu, &mut output_gpu)?;
            }
        }

        Ok(())
    }
}
