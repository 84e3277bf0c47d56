use rayon::prelude::*;

use super::MorphMode;
use crate::image::Image;

#[inline]
fn reduce(mode: MorphMode, acc: f32, v: f32) -> f32 {
    match mode {
        MorphMode::Erode => acc.min(v),
        MorphMode::Dilate => acc.max(v),
    }
}

/// One disk-kernel min/max pass. Pixels within `radius` of an edge pass
/// through unprocessed.
pub(super) fn apply_disk(mode: MorphMode, radius: u32, input: &Image, output: &mut Image) {
    assert_eq!(input.desc().width, output.desc().width, "width mismatch");
    assert_eq!(input.desc().height, output.desc().height, "height mismatch");

    let width = input.desc().width as usize;
    let height = input.desc().height as usize;
    let in_stride = input.desc().stride / 4;
    let out_stride = output.desc().stride;
    let r = radius as usize;
    let r2 = (radius * radius) as i64;

    let in_f: &[f32] = bytemuck::cast_slice(input.bytes());

    output
        .bytes_mut()
        .par_chunks_exact_mut(out_stride)
        .enumerate()
        .for_each(|(y, out_row)| {
            let out_f: &mut [f32] = bytemuck::cast_slice_mut(&mut out_row[..width * 4]);
            out_f.copy_from_slice(&in_f[y * in_stride..y * in_stride + width]);

            if y < r || y + r >= height {
                return;
            }
            if width < 2 * r + 1 {
                return;
            }

            for x in r..width - r {
                let mut acc = in_f[y * in_stride + x];
                for dy in -(r as i64)..=(r as i64) {
                    for dx in -(r as i64)..=(r as i64) {
                        if dx * dx + dy * dy <= r2 {
                            let ny = (y as i64 + dy) as usize;
                            let nx = (x as i64 + dx) as usize;
                            acc = reduce(mode, acc, in_f[ny * in_stride + nx]);
                        }
                    }
                }
                out_f[x] = acc;
            }
        });
}

/// One transposed-write 3-tap sweep: a horizontal min/max over the input
/// lands at transposed coordinates in the output, so applying the same
/// sweep twice yields a horizontal-then-vertical pass in the original
/// orientation. Edge columns pass through.
pub(super) fn apply_separable_pass(mode: MorphMode, input: &Image, output: &mut Image) {
    assert_eq!(input.desc().width, output.desc().height, "transpose mismatch");
    assert_eq!(input.desc().height, output.desc().width, "transpose mismatch");

    let in_width = input.desc().width as usize;
    let in_stride = input.desc().stride / 4;
    let out_width = output.desc().width as usize;
    let out_stride = output.desc().stride;

    let in_f: &[f32] = bytemuck::cast_slice(input.bytes());

    // Output row oy collects the sweep results for input column index oy.
    output
        .bytes_mut()
        .par_chunks_exact_mut(out_stride)
        .enumerate()
        .for_each(|(oy, out_row)| {
            let out_f: &mut [f32] = bytemuck::cast_slice_mut(&mut out_row[..out_width * 4]);
            let x = oy;

            if x == 0 || x + 1 >= in_width {
                for (ox, out) in out_f.iter_mut().enumerate() {
                    *out = in_f[ox * in_stride + x];
                }
                return;
            }

            for (ox, out) in out_f.iter_mut().enumerate() {
                let row = &in_f[ox * in_stride..];
                let mut acc = row[x - 1];
                acc = reduce(mode, acc, row[x]);
                acc = reduce(mode, acc, row[x + 1]);
                *out = acc;
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::test_utils::{gray_at, gray_field, set_gray};
    use crate::prelude::*;

    #[test]
    fn disk_erosion_removes_isolated_spike() {
        let mut input = gray_field(16, 16, 0.0);
        set_gray(&mut input, 8, 8, 100.0);

        let mut output = gray_field(16, 16, -1.0);
        Morphology::erode(3).apply_cpu_disk(&input, &mut output);

        // The lone spike has no support in its neighborhood
        assert_eq!(gray_at(&output, 8, 8), 0.0);
    }

    #[test]
    fn disk_dilation_grows_a_plateau() {
        let mut input = gray_field(16, 16, 0.0);
        set_gray(&mut input, 8, 8, 100.0);

        let mut output = gray_field(16, 16, -1.0);
        Morphology::dilate(3).apply_cpu_disk(&input, &mut output);

        assert_eq!(gray_at(&output, 8, 8), 100.0);
        assert_eq!(gray_at(&output, 8, 5), 100.0); // on the disk, dy = -3
        assert_eq!(gray_at(&output, 5, 8), 100.0);
        assert_eq!(gray_at(&output, 5, 5), 0.0); // corner outside the disk
    }

    #[test]
    fn disk_border_passes_through() {
        let mut input = gray_field(16, 16, 7.0);
        set_gray(&mut input, 0, 0, 50.0);
        set_gray(&mut input, 1, 2, 60.0);

        let mut output = gray_field(16, 16, 0.0);
        Morphology::erode(3).apply_cpu_disk(&input, &mut output);

        // Within radius of the edge the input value survives untouched
        assert_eq!(gray_at(&output, 0, 0), 50.0);
        assert_eq!(gray_at(&output, 1, 2), 60.0);
        assert_eq!(gray_at(&output, 15, 15), 7.0);
    }

    #[test]
    fn disk_erosion_keeps_uniform_field() {
        let input = gray_field(12, 10, 3.5);
        let mut output = gray_field(12, 10, 0.0);
        Morphology::erode(3).apply_cpu_disk(&input, &mut output);

        for y in 0..10 {
            for x in 0..12 {
                assert_eq!(gray_at(&output, x, y), 3.5);
            }
        }
    }

    #[test]
    fn separable_pass_writes_transposed() {
        let mut input = gray_field(6, 4, 0.0);
        set_gray(&mut input, 3, 1, 9.0);

        let mut output = gray_field(4, 6, 0.0);
        Morphology::dilate(1)
            .strategy(MorphStrategy::Separable)
            .apply_cpu_separable_pass(&input, &mut output);

        // The 3-tap max spreads horizontally, then lands transposed:
        // input (x, y) -> output (y, x)
        assert_eq!(gray_at(&output, 1, 2), 9.0);
        assert_eq!(gray_at(&output, 1, 3), 9.0);
        assert_eq!(gray_at(&output, 1, 4), 9.0);
        assert_eq!(gray_at(&output, 1, 1), 0.0);
        assert_eq!(gray_at(&output, 2, 3), 0.0);
    }

    #[test]
    fn two_separable_passes_compose_to_box() {
        let mut input = gray_field(8, 8, 0.0);
        set_gray(&mut input, 4, 4, 10.0);

        let mut scratch = gray_field(8, 8, 0.0);
        let mut output = gray_field(8, 8, 0.0);
        let op = Morphology::dilate(1).strategy(MorphStrategy::Separable);
        op.apply_cpu_separable_pass(&input, &mut scratch);
        op.apply_cpu_separable_pass(&scratch, &mut output);

        // A single spike dilates into a full 3x3 box
        for y in 3..=5 {
            for x in 3..=5 {
                assert_eq!(gray_at(&output, x, y), 10.0, "at ({}, {})", x, y);
            }
        }
        assert_eq!(gray_at(&output, 2, 4), 0.0);
        assert_eq!(gray_at(&output, 4, 6), 0.0);
    }

    #[test]
    fn separable_edge_columns_pass_through() {
        let mut input = gray_field(5, 3, 1.0);
        set_gray(&mut input, 0, 2, 8.0);

        let mut output = gray_field(3, 5, 0.0);
        Morphology::erode(1)
            .strategy(MorphStrategy::Separable)
            .apply_cpu_separable_pass(&input, &mut output);

        // Column 0 of the input passes through to row 0 of the output
        assert_eq!(gray_at(&output, 2, 0), 8.0);
        assert_eq!(gray_at(&output, 0, 0), 1.0);
    }
}
