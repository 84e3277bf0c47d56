#[cfg(test)]
mod tests;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::common::color_format::ColorFormat;
use crate::common::error::{Error, Result};
use crate::image::{Image, ImageDesc};
use crate::ops::{BackgroundPixel, Hysteresis, MorphStrategy, Morphology, MotionScore, Overlay};
use crate::processing_context::{ImageBuffer, ProcessingContext};

/// Layout of a host-owned frame buffer.
///
/// `stride` is the row pitch in bytes and may exceed `width * 3` when the
/// host pads its rows. `bytes_per_pixel` must be 3 (packed RGB).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    pub width: u32,
    pub height: u32,
    pub stride: usize,
    pub bytes_per_pixel: u8,
}

impl FrameLayout {
    /// A layout with no row padding.
    pub fn packed(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            stride: width as usize * 3,
            bytes_per_pixel: 3,
        }
    }
}

/// Tuning parameters for the motion filter.
///
/// `Default` carries the tuned constants; hosts can also deserialize this
/// from their own configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterParams {
    /// RGB distance below which a pixel counts as background-consistent.
    pub motion_threshold: f32,
    /// Consecutive moving frames tolerated before re-learning a pixel.
    pub staleness_bound: u32,
    /// Hysteresis noise floor. Scores below it are never motion.
    pub low_threshold: f32,
    /// Hysteresis strong-motion cutoff.
    pub high_threshold: f32,
    /// Red boost of the overlay, as a fraction of full scale.
    pub overlay_boost: f32,
    /// Disk radius for morphology. `None` adapts to resolution as
    /// `max(3, min(width, height) / 100)`.
    pub morphology_radius: Option<u32>,
    pub morphology_strategy: MorphStrategy,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            motion_threshold: 25.0,
            staleness_bound: 100,
            low_threshold: 4.0,
            high_threshold: 30.0,
            overlay_boost: 0.5,
            morphology_radius: None,
            morphology_strategy: MorphStrategy::Disk,
        }
    }
}

impl FilterParams {
    /// Builder method to set the motion threshold.
    pub fn motion_threshold(mut self, threshold: f32) -> Self {
        self.motion_threshold = threshold;
        self
    }

    /// Builder method to set the staleness bound.
    pub fn staleness_bound(mut self, bound: u32) -> Self {
        self.staleness_bound = bound;
        self
    }

    /// Builder method to set the hysteresis thresholds.
    pub fn thresholds(mut self, low: f32, high: f32) -> Self {
        self.low_threshold = low;
        self.high_threshold = high;
        self
    }

    /// Builder method to set the overlay boost.
    pub fn overlay_boost(mut self, boost: f32) -> Self {
        self.overlay_boost = boost;
        self
    }

    /// Builder method to fix the morphology radius.
    pub fn morphology_radius(mut self, radius: u32) -> Self {
        self.morphology_radius = Some(radius);
        self
    }

    /// Builder method to set the morphology strategy.
    pub fn morphology_strategy(mut self, strategy: MorphStrategy) -> Self {
        self.morphology_strategy = strategy;
        self
    }

    /// Disk radius for the given resolution.
    pub fn radius_for(&self, width: u32, height: u32) -> u32 {
        self.morphology_radius
            .unwrap_or_else(|| (width.min(height) / 100).max(3))
    }
}

/// Observable lifecycle of the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterStage {
    /// No frame seen yet, no buffers allocated.
    #[default]
    Uninitialized,
    /// Resolution known; the last frame was consumed for seeding only.
    Seeded,
    /// Background model live; the full pipeline runs every frame.
    Steady,
}

/// Per-resolution stores owned by the driver. Invalidated wholesale on a
/// resolution change.
#[derive(Debug)]
struct FrameStores {
    width: u32,
    height: u32,
    background: ImageBuffer,
    score: ImageBuffer,
    aux: ImageBuffer,
    scratch: ImageBuffer,
    mask: ImageBuffer,
}

impl FrameStores {
    fn matches(&self, layout: &FrameLayout) -> bool {
        self.width == layout.width && self.height == layout.height
    }
}

/// Frame-by-frame motion detector.
///
/// The host hands in a raw RGB buffer per frame; the filter mutates it in
/// place, boosting the red channel of pixels classified as moving. The
/// first frame at any resolution only seeds the background model and
/// passes through unmodified.
#[derive(Debug, Default)]
pub struct MotionFilter {
    params: FilterParams,
    ctx: Option<ProcessingContext>,
    stores: Option<FrameStores>,
    stage: FilterStage,
}

impl MotionFilter {
    pub fn new(params: FilterParams) -> Self {
        Self {
            params,
            ctx: None,
            stores: None,
            stage: FilterStage::Uninitialized,
        }
    }

    /// Builds a filter on an already-acquired context, e.g. to pin the
    /// sequential backend with `ProcessingContext::cpu_only`.
    pub fn with_context(params: FilterParams, ctx: ProcessingContext) -> Self {
        Self {
            params,
            ctx: Some(ctx),
            stores: None,
            stage: FilterStage::Uninitialized,
        }
    }

    pub fn params(&self) -> &FilterParams {
        &self.params
    }

    pub fn stage(&self) -> FilterStage {
        self.stage
    }

    /// Acquires the processing context. Idempotent; `process_frame` calls
    /// this on first use, so hosts may omit it.
    pub fn initialize(&mut self) {
        if self.ctx.is_none() {
            self.ctx = Some(ProcessingContext::new());
        }
    }

    /// Releases all persistent buffers and the processing context. The
    /// next `process_frame` behaves as from a cold start.
    pub fn shutdown(&mut self) {
        self.stores = None;
        self.ctx = None;
        self.stage = FilterStage::Uninitialized;
    }

    /// Runs one frame through the pipeline, mutating `bytes` in place.
    ///
    /// Rejects malformed layouts before any state is touched, so a bad
    /// frame never corrupts the background model.
    pub fn process_frame(&mut self, bytes: &mut [u8], layout: FrameLayout) -> Result<()> {
        Self::validate_layout(bytes, &layout)?;
        self.initialize();

        if !matches!(&self.stores, Some(s) if s.matches(&layout)) {
            if let Some(s) = &self.stores {
                tracing::info!(
                    "resolution changed {}x{} -> {}x{}, reseeding",
                    s.width,
                    s.height,
                    layout.width,
                    layout.height
                );
            }
            self.stores = Some(Self::seed(bytes, &layout)?);
            self.stage = FilterStage::Seeded;
            tracing::debug!(
                "seeded background model at {}x{}",
                layout.width,
                layout.height
            );
            return Ok(());
        }

        if let (Some(ctx), Some(stores)) = (self.ctx.as_mut(), self.stores.as_mut()) {
            Self::run_stages(&self.params, ctx, stores, bytes, &layout)?;
            self.stage = FilterStage::Steady;
        }
        Ok(())
    }

    fn validate_layout(bytes: &[u8], layout: &FrameLayout) -> Result<()> {
        if layout.bytes_per_pixel != 3 {
            return Err(Error::InvalidFrame(format!(
                "expected 3 bytes per pixel, got {}",
                layout.bytes_per_pixel
            )));
        }
        if layout.width == 0 || layout.height == 0 {
            return Err(Error::InvalidFrame(format!(
                "zero-sized frame {}x{}",
                layout.width, layout.height
            )));
        }
        let row_bytes = layout.width as usize * 3;
        if layout.stride < row_bytes {
            return Err(Error::InvalidFrame(format!(
                "stride {} is smaller than the row payload {}",
                layout.stride, row_bytes
            )));
        }
        let required = (layout.height as usize - 1) * layout.stride + row_bytes;
        if bytes.len() < required {
            return Err(Error::InvalidFrame(format!(
                "buffer holds {} bytes but the layout requires {}",
                bytes.len(),
                required
            )));
        }
        Ok(())
    }

    /// Allocates all per-resolution stores and seeds the background model
    /// from the observed frame, age zero everywhere.
    fn seed(bytes: &[u8], layout: &FrameLayout) -> Result<FrameStores> {
        let width = layout.width;
        let height = layout.height;

        let bg_desc = ImageDesc::new(width, height, ColorFormat::RGBA_F32);
        let mut bg = Image::new_empty(bg_desc)?;
        let bg_stride = bg.desc().stride;
        let record_bytes = width as usize * 16;
        let host_stride = layout.stride;

        bg.bytes_mut()
            .par_chunks_exact_mut(bg_stride)
            .enumerate()
            .for_each(|(y, row)| {
                let records: &mut [BackgroundPixel] =
                    bytemuck::cast_slice_mut(&mut row[..record_bytes]);
                let src = &bytes[y * host_stride..];
                for (x, record) in records.iter_mut().enumerate() {
                    *record =
                        BackgroundPixel::from_rgb([src[x * 3], src[x * 3 + 1], src[x * 3 + 2]]);
                }
            });

        let gray = ImageDesc::new(width, height, ColorFormat::GRAY_F32);
        let gray_t = ImageDesc::new(height, width, ColorFormat::GRAY_F32);

        Ok(FrameStores {
            width,
            height,
            background: ImageBuffer::from_cpu(bg),
            score: ImageBuffer::new_empty(gray),
            aux: ImageBuffer::new_empty(gray),
            scratch: ImageBuffer::new_empty(gray_t),
            mask: ImageBuffer::new_empty(gray),
        })
    }

    /// Steady-state frame: ingest, score, open, threshold, overlay, egress.
    /// Every stage runs on the backend the context selected at creation.
    fn run_stages(
        params: &FilterParams,
        ctx: &mut ProcessingContext,
        stores: &mut FrameStores,
        bytes: &mut [u8],
        layout: &FrameLayout,
    ) -> Result<()> {
        let mut frame = ImageBuffer::from_cpu(Self::ingest(bytes, layout)?);

        let radius = params.radius_for(layout.width, layout.height);
        let score_op = MotionScore::new(params.motion_threshold, params.staleness_bound);
        let erode = Morphology::erode(radius).strategy(params.morphology_strategy);
        let dilate = Morphology::dilate(radius).strategy(params.morphology_strategy);
        let hysteresis = Hysteresis::new(params.low_threshold, params.high_threshold);
        let overlay = Overlay::new(params.overlay_boost);

        if ctx.has_gpu() {
            score_op.execute_gpu(ctx, &frame, &mut stores.background, &mut stores.score)?;
            erode.execute_gpu(ctx, &stores.score, &mut stores.scratch, &mut stores.aux)?;
            dilate.execute_gpu(ctx, &stores.aux, &mut stores.scratch, &mut stores.score)?;
            hysteresis.execute_gpu(ctx, &stores.score, &mut stores.mask)?;
            overlay.execute_gpu(ctx, &stores.mask, &mut frame)?;
        } else {
            score_op.execute_cpu(ctx, &frame, &mut stores.background, &mut stores.score)?;
            erode.execute_cpu(ctx, &stores.score, &mut stores.scratch, &mut stores.aux)?;
            dilate.execute_cpu(ctx, &stores.aux, &mut stores.scratch, &mut stores.score)?;
            hysteresis.execute_cpu(ctx, &stores.score, &mut stores.mask)?;
            overlay.execute_cpu(ctx, &stores.mask, &mut frame)?;
        }

        let frame_cpu = frame.make_cpu(ctx)?;
        Self::egress(&frame_cpu, bytes, layout);
        Ok(())
    }

    /// Copies host rows into an internally-strided frame image.
    fn ingest(bytes: &[u8], layout: &FrameLayout) -> Result<Image> {
        let desc = ImageDesc::new(layout.width, layout.height, ColorFormat::RGB_U8);
        let mut img = Image::new_empty(desc)?;
        let row_bytes = layout.width as usize * 3;
        let stride = img.desc().stride;
        let host_stride = layout.stride;

        img.bytes_mut()
            .chunks_exact_mut(stride)
            .enumerate()
            .for_each(|(y, row)| {
                row[..row_bytes]
                    .copy_from_slice(&bytes[y * host_stride..y * host_stride + row_bytes]);
            });
        Ok(img)
    }

    /// Copies the mutated frame back into the host buffer's layout.
    fn egress(img: &Image, bytes: &mut [u8], layout: &FrameLayout) {
        let row_bytes = layout.width as usize * 3;
        let stride = img.desc().stride;
        let host_stride = layout.stride;

        img.bytes()
            .chunks_exact(stride)
            .enumerate()
            .for_each(|(y, row)| {
                bytes[y * host_stride..y * host_stride + row_bytes]
                    .copy_from_slice(&row[..row_bytes]);
            });
    }
}
