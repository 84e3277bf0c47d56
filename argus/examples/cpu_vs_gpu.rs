//! Runs the same synthetic sequence through the sequential and the
//! data-parallel backend and compares the output frames byte for byte.

use argus::prelude::*;
use common::log_setup::setup_logging;

const WIDTH: u32 = 320;
const HEIGHT: u32 = 240;
const FRAMES: u32 = 12;

fn make_frame(layout: &FrameLayout, i: u32) -> Vec<u8> {
    let mut bytes = vec![0u8; layout.height as usize * layout.stride];
    for px in bytes.chunks_exact_mut(3) {
        px.copy_from_slice(&[18, 18, 18]);
    }
    // A block slides horizontally after the seed frame.
    if i > 0 {
        let x0 = 20 + i * 16;
        for y in 60..140u32 {
            for x in x0..(x0 + 40).min(layout.width) {
                let off = y as usize * layout.stride + x as usize * 3;
                bytes[off..off + 3].copy_from_slice(&[230, 40, 40]);
            }
        }
    }
    bytes
}

fn main() {
    setup_logging("info");

    let gpu_ctx = ProcessingContext::new();
    if !gpu_ctx.has_gpu() {
        println!("No GPU available, exiting");
        return;
    }

    for strategy in [MorphStrategy::Disk, MorphStrategy::Separable] {
        let params = FilterParams::default().morphology_strategy(strategy);
        let mut cpu = MotionFilter::with_context(params, ProcessingContext::cpu_only());
        let mut gpu = MotionFilter::with_context(params, ProcessingContext::new());

        let layout = FrameLayout::packed(WIDTH, HEIGHT);
        let mut mismatches = 0usize;

        for i in 0..FRAMES {
            let mut cpu_frame = make_frame(&layout, i);
            let mut gpu_frame = cpu_frame.clone();

            cpu.process_frame(&mut cpu_frame, layout).unwrap();
            gpu.process_frame(&mut gpu_frame, layout).unwrap();

            let diff = cpu_frame
                .iter()
                .zip(gpu_frame.iter())
                .filter(|(a, b)| a != b)
                .count();
            if diff > 0 {
                mismatches += 1;
            }
            println!("{:?} frame {:2}: {} differing bytes", strategy, i, diff);
        }

        if mismatches == 0 {
            println!("{:?}: CPU and GPU outputs are identical", strategy);
        } else {
            println!("{:?}: {} frames differed", strategy, mismatches);
        }
    }
}
