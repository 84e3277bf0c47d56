use crate::common::error::Result;
use crate::processing_context::{ImageBuffer, ProcessingContext};

/// Result of backend selection for an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Cpu,
    Gpu,
}

/// Selects the backend (CPU or GPU) for an operation.
///
/// Prefers the GPU when any participating buffer is already resident there,
/// so a chain of operations stays on the device once data has been uploaded.
/// Per-slot color-format validation is each operation's responsibility since
/// the pipeline intentionally mixes formats across slots (RGB frame, f32
/// score field, 16-byte background records).
pub fn select_backend<'a>(
    ctx: &ProcessingContext,
    buffers: impl IntoIterator<Item = &'a ImageBuffer>,
    op_name: &str,
) -> Result<Backend> {
    let buffers: Vec<&ImageBuffer> = buffers.into_iter().collect();

    debug_assert!(!buffers.is_empty(), "{}: buffers must not be empty", op_name);

    let any_on_gpu = buffers.iter().any(|b| b.is_gpu());
    if any_on_gpu {
        debug_assert!(
            ctx.has_gpu(),
            "{}: data is on GPU but context has no GPU",
            op_name
        );
    }

    if any_on_gpu && ctx.has_gpu() {
        Ok(Backend::Gpu)
    } else {
        Ok(Backend::Cpu)
    }
}
