use wgpu::util::DeviceExt;

use super::pipeline::{GpuMorphologyDiskPipeline, GpuMorphologySeparablePipeline};
use super::{MorphMode, Morphology};
use crate::common::error::Result;
use crate::gpu::{Gpu, GpuImage};

const MODE_ERODE: u32 = 0;
const MODE_DILATE: u32 = 1;

fn mode_value(mode: MorphMode) -> u32 {
    match mode {
        MorphMode::Erode => MODE_ERODE,
        MorphMode::Dilate => MODE_DILATE,
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct DiskParams {
    width: u32,
    height: u32,
    in_stride: u32,  // f32 elements
    out_stride: u32, // f32 elements
    radius: u32,
    mode: u32,
    _padding: [u32; 2],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct SeparableParams {
    in_width: u32,
    in_height: u32,
    in_stride: u32,  // f32 elements
    out_stride: u32, // f32 elements
    mode: u32,
    _padding: [u32; 3],
}

fn dispatch(
    ctx: &Gpu,
    compute_pipeline: &wgpu::ComputePipeline,
    bind_group_layout: &wgpu::BindGroupLayout,
    label: &str,
    params_bytes: &[u8],
    input: &GpuImage,
    output: &mut GpuImage,
    work_items: u32,
) {
    let device = ctx.device();

    let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: params_bytes,
        usage: wgpu::BufferUsages::UNIFORM,
    });

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout: bind_group_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: params_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: input.read_buffer().as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: output.write_buffer().as_entire_binding(),
            },
        ],
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some(label),
    });

    {
        let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(label),
            timestamp_writes: None,
        });
        compute_pass.set_pipeline(compute_pipeline);
        compute_pass.set_bind_group(0, &bind_group, &[]);
        compute_pass.dispatch_workgroups(work_items.div_ceil(256), 1, 1);
    }

    ctx.queue().submit(std::iter::once(encoder.finish()));
}

/// One disk-kernel pass, one thread per pixel.
pub(super) fn apply_disk(
    params: &Morphology,
    ctx: &Gpu,
    pipeline: &GpuMorphologyDiskPipeline,
    input: &GpuImage,
    output: &mut GpuImage,
) -> Result<()> {
    assert_eq!(input.desc().width, output.desc().width, "width mismatch");
    assert_eq!(input.desc().height, output.desc().height, "height mismatch");

    let width = input.desc().width;
    let height = input.desc().height;

    let uniform_params = DiskParams {
        width,
        height,
        in_stride: (input.desc().stride / 4) as u32,
        out_stride: (output.desc().stride / 4) as u32,
        radius: params.radius,
        mode: mode_value(params.mode),
        _padding: [0; 2],
    };

    dispatch(
        ctx,
        &pipeline.compute_pipeline,
        &pipeline.bind_group_layout,
        "morphology_disk",
        bytemuck::cast_slice(&[uniform_params]),
        input,
        output,
        width * height,
    );

    Ok(())
}

/// One transposed-write 3-tap sweep, one thread per output pixel.
pub(super) fn apply_separable_pass(
    params: &Morphology,
    ctx: &Gpu,
    pipeline: &GpuMorphologySeparablePipeline,
    input: &GpuImage,
    output: &mut GpuImage,
) -> Result<()> {
    assert_eq!(input.desc().width, output.desc().height, "transpose mismatch");
    assert_eq!(input.desc().height, output.desc().width, "transpose mismatch");

    let in_width = input.desc().width;
    let in_height = input.desc().height;

    let uniform_params = SeparableParams {
        in_width,
        in_height,
        in_stride: (input.desc().stride / 4) as u32,
        out_stride: (output.desc().stride / 4) as u32,
        mode: mode_value(params.mode),
        _padding: [0; 3],
    };

    dispatch(
        ctx,
        &pipeline.compute_pipeline,
        &pipeline.bind_group_layout,
        "morphology_separable",
        bytemuck::cast_slice(&[uniform_params]),
        input,
        output,
        in_width * in_height,
    );

    Ok(())
}
