//! Runs a synthetic moving-square sequence through the motion filter and
//! prints per-frame motion statistics.

use argus::prelude::*;
use common::log_setup::setup_logging;

const WIDTH: u32 = 160;
const HEIGHT: u32 = 120;
const FRAMES: u32 = 24;
const SQUARE: u32 = 18;

fn background_frame(layout: &FrameLayout) -> Vec<u8> {
    let mut bytes = vec![0u8; layout.height as usize * layout.stride];
    for px in bytes.chunks_exact_mut(3) {
        px.copy_from_slice(&[24, 28, 32]);
    }
    bytes
}

fn paint_square(bytes: &mut [u8], layout: &FrameLayout, x0: u32, y0: u32) {
    for y in y0..(y0 + SQUARE).min(layout.height) {
        for x in x0..(x0 + SQUARE).min(layout.width) {
            let off = y as usize * layout.stride + x as usize * 3;
            bytes[off..off + 3].copy_from_slice(&[210, 200, 60]);
        }
    }
}

fn boosted_pixels(before: &[u8], after: &[u8]) -> usize {
    before
        .chunks_exact(3)
        .zip(after.chunks_exact(3))
        .filter(|(b, a)| a[0] != b[0])
        .count()
}

fn main() {
    setup_logging("info");

    let mut filter = MotionFilter::new(FilterParams::default());
    let layout = FrameLayout::packed(WIDTH, HEIGHT);

    println!(
        "Moving-square demo: {}x{}, {} frames, {}px square",
        WIDTH, HEIGHT, FRAMES, SQUARE
    );

    for i in 0..FRAMES {
        let mut frame = background_frame(&layout);
        // The square crosses the frame on a diagonal.
        let x = 8 + i * (WIDTH - SQUARE - 16) / FRAMES;
        let y = 8 + i * (HEIGHT - SQUARE - 16) / FRAMES;
        paint_square(&mut frame, &layout, x, y);

        let before = frame.clone();
        filter.process_frame(&mut frame, layout).unwrap();

        let moving = boosted_pixels(&before, &frame);
        println!(
            "frame {:2}  square at ({:3},{:3})  stage {:?}  boosted pixels: {}",
            i,
            x,
            y,
            filter.stage(),
            moving
        );
    }

    filter.shutdown();
    println!("Done.");
}
