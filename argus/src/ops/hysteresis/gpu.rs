use wgpu::util::DeviceExt;

use super::Hysteresis;
use super::pipeline::GpuHysteresisPipeline;
use crate::common::error::Result;
use crate::gpu::{Gpu, GpuImage};

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Params {
    low: f32,
    high: f32,
    width: u32,
    height: u32,
    score_stride: u32, // f32 elements
    mask_stride: u32,  // f32 elements
    _padding: [u32; 2],
}

/// Dispatches the dual-threshold kernel, one thread per pixel.
pub(super) fn apply(
    params: &Hysteresis,
    ctx: &Gpu,
    pipeline: &GpuHysteresisPipeline,
    score: &GpuImage,
    mask: &mut GpuImage,
) -> Result<()> {
    let device = ctx.device();
    let queue = ctx.queue();

    assert_eq!(score.desc().width, mask.desc().width, "width mismatch");
    assert_eq!(score.desc().height, mask.desc().height, "height mismatch");

    let width = score.desc().width;
    let height = score.desc().height;

    let uniform_params = Params {
        low: params.low,
        high: params.high,
        width,
        height,
        score_stride: (score.desc().stride / 4) as u32,
        mask_stride: (mask.desc().stride / 4) as u32,
        _padding: [0; 2],
    };

    let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("hysteresis_params_buffer"),
        contents: bytemuck::cast_slice(&[uniform_params]),
        usage: wgpu::BufferUsages::UNIFORM,
    });

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("hysteresis_bind_group"),
        layout: &pipeline.bind_group_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: params_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: score.read_buffer().as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: mask.write_buffer().as_entire_binding(),
            },
        ],
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("hysteresis_encoder"),
    });

    {
        let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("hysteresis_pass"),
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
