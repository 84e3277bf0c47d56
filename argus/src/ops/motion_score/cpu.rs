use rayon::prelude::*;

use super::{BackgroundPixel, MotionScore};
use crate::image::Image;

/// Applies background-model update and distance scoring on the CPU.
///
/// Rows are independent: each row mutates only its own slice of the
/// background and score fields while the frame is read-only.
pub(super) fn apply(params: &MotionScore, frame: &Image, background: &mut Image, score: &mut Image) {
    assert_eq!(frame.desc().width, background.desc().width, "width mismatch");
    assert_eq!(
        frame.desc().height,
        background.desc().height,
        "height mismatch"
    );
    assert_eq!(frame.desc().width, score.desc().width, "width mismatch");
    assert_eq!(frame.desc().height, score.desc().height, "height mismatch");

    let width = frame.desc().width as usize;
    let frame_stride = frame.desc().stride;
    let bg_stride = background.desc().stride;
    let score_stride = score.desc().stride;

    let threshold = params.threshold;
    let staleness_bound = params.staleness_bound;
    let frame_bytes = frame.bytes();

    background
        .bytes_mut()
        .par_chunks_exact_mut(bg_stride)
        .zip(score.bytes_mut().par_chunks_exact_mut(score_stride))
        .enumerate()
        .for_each(|(y, (bg_row, score_row))| {
            let states: &mut [BackgroundPixel] =
                bytemuck::cast_slice_mut(&mut bg_row[..width * 16]);
            let scores: &mut [f32] = bytemuck::cast_slice_mut(&mut score_row[..width * 4]);
            let row = &frame_bytes[y * frame_stride..y * frame_stride + width * 3];

            for x in 0..width {
                let px = [row[x * 3], row[x * 3 + 1], row[x * 3 + 2]];
                let state = &mut states[x];

                let distance = state.distance_to(px);
                // The observed distance is written on both branches so the
                // field stays continuous for morphology.
                scores[x] = distance;

                if distance < threshold {
                    state.age = 0;
                } else {
                    state.age += 1;
                    if state.age > staleness_bound {
                        *state = BackgroundPixel::from_rgb(px);
                    }
                }
            }
        });
}
