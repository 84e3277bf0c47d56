use rayon::prelude::*;

use super::Overlay;
use crate::image::Image;

/// Applies the red-channel boost on the CPU.
///
/// Masks are mostly empty in steady scenes, so the SIMD paths test four
/// mask lanes at a time and skip fully-inactive groups.
pub(super) fn apply(params: &Overlay, mask: &Image, frame: &mut Image) {
    assert_eq!(mask.desc().width, frame.desc().width, "width mismatch");
    assert_eq!(mask.desc().height, frame.desc().height, "height mismatch");

    let boost = params.boost_value();
    if boost == 0 {
        return;
    }

    #[cfg(target_arch = "x86_64")]
    if is_x86_feature_detected!("sse4.1") {
        // SAFETY: SSE4.1 support verified above
        for_each_row(mask, frame, |mask_row, row| unsafe {
            boost_row_sse41(mask_row, row, boost)
        });
        return;
    }

    #[cfg(target_arch = "aarch64")]
    {
        // SAFETY: NEON is always available on aarch64
        for_each_row(mask, frame, |mask_row, row| unsafe {
            boost_row_neon(mask_row, row, boost)
        });
        return;
    }

    #[allow(unreachable_code)]
    for_each_row(mask, frame, |mask_row, row| {
        boost_row_scalar(mask_row, row, boost)
    });
}

fn for_each_row<F>(mask: &Image, frame: &mut Image, f: F)
where
    F: Fn(&[f32], &mut [u8]) + Sync,
{
    let width = frame.desc().width as usize;
    let mask_stride = mask.desc().stride / 4;
    let frame_stride = frame.desc().stride;
    let mask_f: &[f32] = bytemuck::cast_slice(mask.bytes());

    frame
        .bytes_mut()
        .par_chunks_exact_mut(frame_stride)
        .enumerate()
        .for_each(|(y, row)| {
            f(
                &mask_f[y * mask_stride..y * mask_stride + width],
                &mut row[..width * 3],
            );
        });
}

fn boost_row_scalar(mask: &[f32], row: &mut [u8], boost: u8) {
    for (x, m) in mask.iter().enumerate() {
        if *m > 0.0 {
            let r = &mut row[x * 3];
            *r = r.saturating_add(boost);
        }
    }
}

// =============================================================================
// SSE4.1 implementation
// =============================================================================

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse4.1")]
unsafe fn boost_row_sse41(mask: &[f32], row: &mut [u8], boost: u8) {
    use std::arch::x86_64::*;

    let simd_width = mask.len() / 4;
    let zero = _mm_setzero_ps();

    for i in 0..simd_width {
        let m = _mm_loadu_ps(mask.as_ptr().add(i * 4));
        let active = _mm_movemask_ps(_mm_cmpgt_ps(m, zero));
        if active == 0 {
            continue;
        }
        for lane in 0..4 {
            if active & (1 << lane) != 0 {
                let r = row.get_unchecked_mut((i * 4 + lane) * 3);
                *r = r.saturating_add(boost);
            }
        }
    }

    // Scalar remainder
    for x in simd_width * 4..mask.len() {
        if *mask.get_unchecked(x) > 0.0 {
            let r = row.get_unchecked_mut(x * 3);
            *r = r.saturating_add(boost);
        }
    }
}

// =============================================================================
// NEON implementation
// =============================================================================

#[cfg(target_arch = "aarch64")]
unsafe fn boost_row_neon(mask: &[f32], row: &mut [u8], boost: u8) {
    use std::arch::aarch64::*;

    let simd_width = mask.len() / 4;
    let zero = vdupq_n_f32(0.0);

    for i in 0..simd_width {
        let m = vld1q_f32(mask.as_ptr().add(i * 4));
        let active = vcgtq_f32(m, zero);
        if vmaxvq_u32(active) == 0 {
            continue;
        }
        let mut lanes = [0u32; 4];
        vst1q_u32(lanes.as_mut_ptr(), active);
        for (lane, hit) in lanes.iter().enumerate() {
            if *hit != 0 {
                let r = row.get_unchecked_mut((i * 4 + lane) * 3);
                *r = r.saturating_add(boost);
            }
        }
    }

    // Scalar remainder
    for x in simd_width * 4..mask.len() {
        if *mask.get_unchecked(x) > 0.0 {
            let r = row.get_unchecked_mut(x * 3);
            *r = r.saturating_add(boost);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::test_utils::{gray_field, rgb_at, rgb_frame, set_gray};
    use crate::prelude::*;

    #[test]
    fn boosts_only_masked_pixels() {
        let mut mask = gray_field(9, 5, 0.0);
        set_gray(&mut mask, 2, 1, 1.0);
        set_gray(&mut mask, 8, 4, 1.0);

        let mut frame = rgb_frame(9, 5, [10, 20, 30]);
        Overlay::default().apply_cpu(&mask, &mut frame);

        assert_eq!(rgb_at(&frame, 2, 1), [137, 20, 30]);
        assert_eq!(rgb_at(&frame, 8, 4), [137, 20, 30]);
        assert_eq!(rgb_at(&frame, 0, 0), [10, 20, 30]);
        assert_eq!(rgb_at(&frame, 3, 1), [10, 20, 30]);
    }

    #[test]
    fn red_channel_saturates() {
        let mut mask = gray_field(4, 4, 1.0);
        set_gray(&mut mask, 0, 0, 1.0);

        let mut frame = rgb_frame(4, 4, [200, 0, 255]);
        Overlay::default().apply_cpu(&mask, &mut frame);

        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(rgb_at(&frame, x, y), [255, 0, 255]);
            }
        }
    }

    #[test]
    fn empty_mask_leaves_frame_untouched() {
        let mask = gray_field(16, 9, 0.0);
        let mut frame = rgb_frame(16, 9, [1, 2, 3]);
        let original = frame.clone();

        Overlay::default().apply_cpu(&mask, &mut frame);
        assert_eq!(frame.bytes(), original.bytes());
    }

    #[test]
    fn zero_boost_is_a_noop() {
        let mask = gray_field(7, 3, 1.0);
        let mut frame = rgb_frame(7, 3, [90, 91, 92]);
        let original = frame.clone();

        Overlay::new(0.0).apply_cpu(&mask, &mut frame);
        assert_eq!(frame.bytes(), original.bytes());
    }

    #[test]
    fn row_widths_off_simd_alignment() {
        // 9 pixels per row exercises the scalar tail after two SIMD groups
        let mut mask = gray_field(9, 2, 0.0);
        for x in 0..9 {
            set_gray(&mut mask, x, 1, 1.0);
        }

        let mut frame = rgb_frame(9, 2, [100, 50, 25]);
        Overlay::default().apply_cpu(&mask, &mut frame);

        for x in 0..9 {
            assert_eq!(rgb_at(&frame, x, 0), [100, 50, 25]);
            assert_eq!(rgb_at(&frame, x, 1), [227, 50, 25]);
        }
    }
}
