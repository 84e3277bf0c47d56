use wgpu::util::DeviceExt;

use super::Overlay;
use super::pipeline::GpuOverlayPipeline;
use crate::common::error::Result;
use crate::gpu::{Gpu, GpuImage};

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Params {
    boost: u32, // 8-bit channel units
    width: u32,
    height: u32,
    frame_stride: u32, // bytes
    mask_stride: u32,  // f32 elements
    _padding: [u32; 3],
}

/// Dispatches the overlay kernel, one thread per 32-bit frame word.
pub(super) fn apply(
    params: &Overlay,
    ctx: &Gpu,
    pipeline: &GpuOverlayPipeline,
    mask: &GpuImage,
    frame: &mut GpuImage,
) -> Result<()> {
    let device = ctx.device();
    let queue = ctx.queue();

    assert_eq!(mask.desc().width, frame.desc().width, "width mismatch");
    assert_eq!(mask.desc().height, frame.desc().height, "height mismatch");

    let boost = params.boost_value();
    if boost == 0 {
        return Ok(());
    }

    let width = frame.desc().width;
    let height = frame.desc().height;
    let frame_stride = frame.desc().stride as u32;

    let uniform_params = Params {
        boost: boost as u32,
        width,
        height,
        frame_stride,
        mask_stride: (mask.desc().stride / 4) as u32,
        _padding: [0; 3],
    };

    let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("overlay_params_buffer"),
        contents: bytemuck::cast_slice(&[uniform_params]),
        usage: wgpu::BufferUsages::UNIFORM,
    });

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("overlay_bind_group"),
        layout: &pipeline.bind_group_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: params_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: mask.read_buffer().as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: frame.write_buffer().as_entire_binding(),
            },
        ],
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("overlay_encoder"),
    });

    {
        let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("overlay_pass"),
            timestamp_writes: None,
        });
        compute_pass.set_pipeline(&pipeline.compute_pipeline);
        compute_pass.set_bind_group(0, &bind_group, &[]);

        // One thread per frame word, so byte rewrites never race.
        let work_items = height * frame_stride / 4;
        compute_pass.dispatch_workgroups(work_items.div_ceil(256), 1, 1);
    }

    queue.submit(std::iter::once(encoder.finish()));

    Ok(())
}
