mod backend_selection;
mod hysteresis;
mod morphology;
mod motion_score;
mod overlay;

pub use backend_selection::{Backend, select_backend};
pub use hysteresis::{GpuHysteresisPipeline, Hysteresis};
pub use morphology::{
    GpuMorphologyDiskPipeline, GpuMorphologySeparablePipeline, MorphMode, MorphStrategy,
    Morphology,
};
pub use motion_score::{BackgroundPixel, GpuMotionScorePipeline, MotionScore};
pub use overlay::{GpuOverlayPipeline, Overlay};
