use wgpu::util::DeviceExt;

use super::MotionScore;
use super::pipeline::GpuMotionScorePipeline;
use crate::common::error::Result;
use crate::gpu::{Gpu, GpuImage};

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Params {
    threshold: f32,
    staleness_bound: u32,
    width: u32,
    height: u32,
    frame_stride: u32, // bytes
    bg_stride: u32,    // records
    score_stride: u32, // f32 elements
    _padding: u32,
}

/// Dispatches the background-update + scoring kernel, one thread per pixel.
pub(super) fn apply(
    params: &MotionScore,
    ctx: &Gpu,
    pipeline: &GpuMotionScorePipeline,
    frame: &GpuImage,
    background: &mut GpuImage,
    score: &mut GpuImage,
) -> Result<()> {
    let device = ctx.device();
    let queue = ctx.queue();

    let width = frame.desc().width;
    let height = frame.desc().height;

    assert_eq!(background.desc().width, width, "width mismatch");
    assert_eq!(background.desc().height, height, "height mismatch");
    assert_eq!(score.desc().width, width, "width mismatch");
    assert_eq!(score.desc().height, height, "height mismatch");

    let uniform_params = Params {
        threshold: params.threshold,
        staleness_bound: params.staleness_bound,
        width,
        height,
        frame_stride: frame.desc().stride as u32,
        bg_stride: (background.desc().stride / 16) as u32,
        score_stride: (score.desc().stride / 4) as u32,
        _padding: 0,
    };

    let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("motion_score_params_buffer"),
        contents: bytemuck::cast_slice(&[uniform_params]),
        usage: wgpu::BufferUsages::UNIFORM,
    });

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("motion_score_bind_group"),
        layout: &pipeline.bind_group_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: params_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: frame.read_buffer().as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: background.write_buffer().as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: score.write_buffer().as_entire_binding(),
            },
        ],
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("motion_score_encoder"),
    });

    {
        let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("motion_score_pass"),
            timestamp_writes: None,
        });
        compute_pass.set_pipeline(&pipeline.compute_pipeline);
        compute_pass.set_bind_group(0, &bind_group, &[]);

        let work_items = width * height;
        compute_pass.dispatch_workgroups(work_items.div_ceil(256), 1, 1);
    }

    queue.submit(std::iter::once(encoder.finish()));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::image_diff::max_pixel_diff;
    use crate::common::test_utils::{paint_rect, rgb_frame, test_gpu};
    use crate::image::{Image, ImageDesc};
    use crate::ops::BackgroundPixel;
    use crate::prelude::*;

    fn seeded_background(frame: &Image) -> Image {
        let desc = ImageDesc::new(frame.desc().width, frame.desc().height, ColorFormat::RGBA_F32);
        let mut bg = Image::new_empty(desc).unwrap();
        let stride = desc.stride;
        let width = desc.width as usize;
        for y in 0..desc.height as usize {
            let states: &mut [BackgroundPixel] =
                bytemuck::cast_slice_mut(&mut bg.bytes_mut()[y * stride..y * stride + width * 16]);
            for (x, state) in states.iter_mut().enumerate() {
                let offset = y * frame.desc().stride + x * 3;
                let px = &frame.bytes()[offset..offset + 3];
                *state = BackgroundPixel::from_rgb([px[0], px[1], px[2]]);
            }
        }
        bg
    }

    #[test]
    fn gpu_matches_cpu() {
        let Some(ctx) = test_gpu() else {
            return;
        };

        let seed = rgb_frame(33, 21, [40, 80, 120]);
        let mut frame = rgb_frame(33, 21, [40, 80, 120]);
        paint_rect(&mut frame, 5, 5, 9, 7, [250, 10, 10]);

        let op = MotionScore::default().staleness_bound(3);

        // CPU reference
        let mut bg_cpu = seeded_background(&seed);
        let mut score_cpu =
            Image::new_empty(ImageDesc::new(33, 21, ColorFormat::GRAY_F32)).unwrap();
        for _ in 0..5 {
            op.apply_cpu(&frame, &mut bg_cpu, &mut score_cpu);
        }

        // GPU run over the same sequence
        let pipeline = GpuMotionScorePipeline::new(&ctx).unwrap();
        let frame_gpu = GpuImage::from_image(&ctx, &frame);
        let mut bg_gpu = GpuImage::from_image(&ctx, &seeded_background(&seed));
        let mut score_gpu = GpuImage::new_empty(&ctx, *score_cpu.desc());
        for _ in 0..5 {
            op.apply_gpu(&ctx, &pipeline, &frame_gpu, &mut bg_gpu, &mut score_gpu)
                .unwrap();
        }

        let score_out = score_gpu.to_image(&ctx).unwrap();
        let bg_out = bg_gpu.to_image(&ctx).unwrap();

        assert!(max_pixel_diff(&score_cpu, &score_out) < 1e-3);
        assert!(max_pixel_diff(&bg_cpu, &bg_out) < 1e-3);
    }
}
