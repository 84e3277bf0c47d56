use rayon::prelude::*;

use super::Hysteresis;
use crate::image::Image;

/// Applies dual-threshold classification on the CPU.
///
/// Reads only the score field and writes only the mask, so every row is
/// independent and neighbor lookups always see the prior stage's output.
pub(super) fn apply(params: &Hysteresis, score: &Image, mask: &mut Image) {
    assert_eq!(score.desc().width, mask.desc().width, "width mismatch");
    assert_eq!(score.desc().height, mask.desc().height, "height mismatch");

    let width = score.desc().width as usize;
    let height = score.desc().height as usize;
    let score_stride = score.desc().stride / 4;
    let mask_stride = mask.desc().stride;

    let low = params.low;
    let high = params.high;
    let score_f: &[f32] = bytemuck::cast_slice(score.bytes());

    mask.bytes_mut()
        .par_chunks_exact_mut(mask_stride)
        .enumerate()
        .for_each(|(y, mask_row)| {
            let mask_f: &mut [f32] = bytemuck::cast_slice_mut(&mut mask_row[..width * 4]);

            for (x, out) in mask_f.iter_mut().enumerate() {
                let value = score_f[y * score_stride + x];

                if value >= high {
                    *out = 1.0;
                    continue;
                }
                if value < low {
                    *out = 0.0;
                    continue;
                }

                // Ambiguous band: rescued by any strong 8-connected
                // neighbor, with coordinates clamped to the frame.
                let y0 = y.saturating_sub(1);
                let y1 = (y + 1).min(height - 1);
                let x0 = x.saturating_sub(1);
                let x1 = (x + 1).min(width - 1);

                let mut strong_neighbor = false;
                'scan: for ny in y0..=y1 {
                    for nx in x0..=x1 {
                        if score_f[ny * score_stride + nx] >= high {
                            strong_neighbor = true;
                            break 'scan;
                        }
                    }
                }

                *out = if strong_neighbor { 1.0 } else { 0.0 };
            }
        });
}
