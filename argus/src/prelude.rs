// Color formats
pub use crate::common::{ALL_FORMATS, ChannelCount, ChannelSize, ChannelType, ColorFormat};

// Error handling
pub use crate::common::{Error, Result};

// Image types
pub use crate::image::{Image, ImageDesc};

// Context and smart buffers
pub use crate::processing_context::{
    GpuContext, GpuPipeline, ImageBuffer, ProcessingContext, Storage,
};

// Operations
pub use crate::ops::{
    Backend, BackgroundPixel, GpuHysteresisPipeline, GpuMorphologyDiskPipeline,
    GpuMorphologySeparablePipeline, GpuMotionScorePipeline, GpuOverlayPipeline, Hysteresis,
    MorphMode, MorphStrategy, Morphology, MotionScore, Overlay, select_backend,
};

// Pipeline driver
pub use crate::filter::{FilterParams, FilterStage, FrameLayout, MotionFilter};

// GPU
pub use crate::gpu::{Gpu, GpuImage, ReadBuffer, WriteBuffer};

// Diff helpers for backend comparisons
pub use crate::common::{max_pixel_diff, pixels_equal};
