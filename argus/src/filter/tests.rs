use super::{FilterParams, FilterStage, FrameLayout, MotionFilter};
use crate::ops::MorphStrategy;
use crate::processing_context::ProcessingContext;

fn cpu_filter(params: FilterParams) -> MotionFilter {
    MotionFilter::with_context(params, ProcessingContext::cpu_only())
}

fn solid_frame(layout: &FrameLayout, color: [u8; 3]) -> Vec<u8> {
    let mut bytes = vec![0u8; layout.height as usize * layout.stride];
    for y in 0..layout.height as usize {
        let row = &mut bytes[y * layout.stride..y * layout.stride + layout.width as usize * 3];
        for px in row.chunks_exact_mut(3) {
            px.copy_from_slice(&color);
        }
    }
    bytes
}

fn paint(bytes: &mut [u8], layout: &FrameLayout, x0: u32, y0: u32, w: u32, h: u32, color: [u8; 3]) {
    for y in y0..(y0 + h).min(layout.height) {
        for x in x0..(x0 + w).min(layout.width) {
            let off = y as usize * layout.stride + x as usize * 3;
            bytes[off..off + 3].copy_from_slice(&color);
        }
    }
}

fn px(bytes: &[u8], layout: &FrameLayout, x: u32, y: u32) -> [u8; 3] {
    let off = y as usize * layout.stride + x as usize * 3;
    [bytes[off], bytes[off + 1], bytes[off + 2]]
}

#[test]
fn first_frame_seeds_and_passes_through() {
    let layout = FrameLayout::packed(64, 64);
    let mut filter = cpu_filter(FilterParams::default());
    assert_eq!(filter.stage(), FilterStage::Uninitialized);

    let mut frame = solid_frame(&layout, [40, 80, 120]);
    let original = frame.clone();

    filter.process_frame(&mut frame, layout).unwrap();

    assert_eq!(filter.stage(), FilterStage::Seeded);
    assert_eq!(frame, original);
}

#[test]
fn static_scene_stays_unmodified() {
    let layout = FrameLayout::packed(64, 64);
    let mut filter = cpu_filter(FilterParams::default());

    let mut frame = solid_frame(&layout, [0, 0, 0]);
    filter.process_frame(&mut frame, layout).unwrap();

    let mut second = solid_frame(&layout, [0, 0, 0]);
    let original = second.clone();
    filter.process_frame(&mut second, layout).unwrap();

    assert_eq!(filter.stage(), FilterStage::Steady);
    assert_eq!(second, original);
}

#[test]
fn moving_square_gets_red_boost() {
    let layout = FrameLayout::packed(64, 64);
    let mut filter = cpu_filter(FilterParams::default());

    let mut seed = solid_frame(&layout, [0, 0, 0]);
    filter.process_frame(&mut seed, layout).unwrap();

    let mut frame = solid_frame(&layout, [0, 0, 0]);
    paint(&mut frame, &layout, 27, 27, 10, 10, [200, 16, 16]);
    filter.process_frame(&mut frame, layout).unwrap();

    // The square's interior survives the opening and gets the +127 boost;
    // the static background far from it stays black.
    assert_eq!(px(&frame, &layout, 32, 32), [255, 16, 16]);
    assert_eq!(px(&frame, &layout, 5, 5), [0, 0, 0]);
    assert_eq!(px(&frame, &layout, 60, 60), [0, 0, 0]);
}

#[test]
fn separable_strategy_detects_the_square_too() {
    let layout = FrameLayout::packed(64, 64);
    let params = FilterParams::default().morphology_strategy(MorphStrategy::Separable);
    let mut filter = cpu_filter(params);

    let mut seed = solid_frame(&layout, [0, 0, 0]);
    filter.process_frame(&mut seed, layout).unwrap();

    let mut frame = solid_frame(&layout, [0, 0, 0]);
    paint(&mut frame, &layout, 27, 27, 10, 10, [200, 16, 16]);
    filter.process_frame(&mut frame, layout).unwrap();

    assert_eq!(px(&frame, &layout, 32, 32), [255, 16, 16]);
    assert_eq!(px(&frame, &layout, 5, 5), [0, 0, 0]);
}

#[test]
fn padded_stride_rows_are_respected() {
    let layout = FrameLayout {
        width: 32,
        height: 16,
        stride: 32 * 3 + 5,
        bytes_per_pixel: 3,
    };

    let mut filter = cpu_filter(FilterParams::default());

    let mut seed = solid_frame(&layout, [0, 0, 0]);
    // Sentinel bytes in the row padding must come back untouched.
    for y in 0..layout.height as usize {
        for pad in &mut seed[y * layout.stride + 32 * 3..(y + 1) * layout.stride] {
            *pad = 0xab;
        }
    }
    filter.process_frame(&mut seed, layout).unwrap();

    let mut frame = seed.clone();
    paint(&mut frame, &layout, 10, 4, 12, 8, [180, 0, 0]);
    filter.process_frame(&mut frame, layout).unwrap();

    assert_eq!(px(&frame, &layout, 16, 8), [255, 0, 0]);
    for y in 0..layout.height as usize {
        for pad in &frame[y * layout.stride + 32 * 3..(y + 1) * layout.stride] {
            assert_eq!(*pad, 0xab);
        }
    }
}

#[test]
fn resolution_change_reseeds() {
    let big = FrameLayout::packed(64, 64);
    let small = FrameLayout::packed(32, 32);
    let mut filter = cpu_filter(FilterParams::default());

    let mut frame = solid_frame(&big, [0, 0, 0]);
    filter.process_frame(&mut frame, big).unwrap();
    let mut frame = solid_frame(&big, [0, 0, 0]);
    filter.process_frame(&mut frame, big).unwrap();
    assert_eq!(filter.stage(), FilterStage::Steady);

    // A different resolution discards the model and passes through again,
    // even though the new frame is nothing like the old background.
    let mut frame = solid_frame(&small, [250, 250, 250]);
    let original = frame.clone();
    filter.process_frame(&mut frame, small).unwrap();

    assert_eq!(filter.stage(), FilterStage::Seeded);
    assert_eq!(frame, original);
}

#[test]
fn shutdown_returns_to_cold_start() {
    let layout = FrameLayout::packed(32, 32);
    let mut filter = cpu_filter(FilterParams::default());

    let mut frame = solid_frame(&layout, [0, 0, 0]);
    filter.process_frame(&mut frame, layout).unwrap();
    let mut frame = solid_frame(&layout, [0, 0, 0]);
    filter.process_frame(&mut frame, layout).unwrap();
    assert_eq!(filter.stage(), FilterStage::Steady);

    filter.shutdown();
    assert_eq!(filter.stage(), FilterStage::Uninitialized);

    let mut frame = solid_frame(&layout, [130, 10, 10]);
    let original = frame.clone();
    filter.process_frame(&mut frame, layout).unwrap();
    assert_eq!(filter.stage(), FilterStage::Seeded);
    assert_eq!(frame, original);
}

#[test]
fn stale_region_is_relearned() {
    let layout = FrameLayout::packed(16, 16);
    let params = FilterParams::default().staleness_bound(3);
    let mut filter = cpu_filter(params);

    let mut seed = solid_frame(&layout, [0, 0, 0]);
    filter.process_frame(&mut seed, layout).unwrap();

    // The scene changes permanently. For bound + 1 frames it reads as
    // motion; on the frame after the snap the new color is background.
    for _ in 0..4 {
        let mut frame = solid_frame(&layout, [200, 0, 0]);
        filter.process_frame(&mut frame, layout).unwrap();
        assert_eq!(px(&frame, &layout, 8, 8), [255, 0, 0]);
    }

    let mut frame = solid_frame(&layout, [200, 0, 0]);
    filter.process_frame(&mut frame, layout).unwrap();
    assert_eq!(px(&frame, &layout, 8, 8), [200, 0, 0]);
}

#[test]
fn subthreshold_noise_never_flags_motion() {
    use rand::Rng;

    let layout = FrameLayout::packed(32, 32);
    let mut filter = cpu_filter(FilterParams::default());

    let mut seed = solid_frame(&layout, [100, 100, 100]);
    filter.process_frame(&mut seed, layout).unwrap();

    // Sensor-style jitter of at most 2 per channel keeps every distance
    // under the noise floor, so no frame may come back altered.
    let mut rng = rand::rng();
    for _ in 0..3 {
        let mut frame = solid_frame(&layout, [100, 100, 100]);
        for c in frame.iter_mut() {
            *c = 100 + rng.random_range(0..3u8);
        }
        let original = frame.clone();
        filter.process_frame(&mut frame, layout).unwrap();
        assert_eq!(frame, original);
    }
}

#[test]
fn rejects_bad_layouts() {
    let mut filter = cpu_filter(FilterParams::default());
    let layout = FrameLayout::packed(16, 16);
    let mut frame = solid_frame(&layout, [0, 0, 0]);

    let four_bpp = FrameLayout {
        bytes_per_pixel: 4,
        ..layout
    };
    assert!(filter.process_frame(&mut frame, four_bpp).is_err());

    let zero_width = FrameLayout {
        width: 0,
        ..layout
    };
    assert!(filter.process_frame(&mut frame, zero_width).is_err());

    let narrow_stride = FrameLayout {
        stride: 16 * 3 - 1,
        ..layout
    };
    assert!(filter.process_frame(&mut frame, narrow_stride).is_err());

    let mut short_buffer = vec![0u8; 10];
    assert!(filter.process_frame(&mut short_buffer, layout).is_err());

    // Rejected frames never touch filter state.
    assert_eq!(filter.stage(), FilterStage::Uninitialized);
}

#[test]
fn params_serde_round_trip() {
    let params = FilterParams::default()
        .motion_threshold(30.0)
        .staleness_bound(50)
        .thresholds(5.0, 40.0)
        .overlay_boost(0.25)
        .morphology_radius(4)
        .morphology_strategy(MorphStrategy::Separable);

    let json = serde_json::to_string(&params).unwrap();
    let restored: FilterParams = serde_json::from_str(&json).unwrap();

    assert_eq!(restored.motion_threshold, 30.0);
    assert_eq!(restored.staleness_bound, 50);
    assert_eq!(restored.low_threshold, 5.0);
    assert_eq!(restored.high_threshold, 40.0);
    assert_eq!(restored.overlay_boost, 0.25);
    assert_eq!(restored.morphology_radius, Some(4));
    assert_eq!(restored.morphology_strategy, MorphStrategy::Separable);
}

#[test]
fn params_default_from_empty_json() {
    let restored: FilterParams = serde_json::from_str("{}").unwrap();
    assert_eq!(restored.motion_threshold, 25.0);
    assert_eq!(restored.staleness_bound, 100);
    assert_eq!(restored.morphology_radius, None);
}

#[test]
fn adaptive_radius_follows_resolution() {
    let params = FilterParams::default();
    assert_eq!(params.radius_for(64, 64), 3);
    assert_eq!(params.radius_for(1920, 1080), 10);
    assert_eq!(params.radius_for(640, 480), 4);

    let fixed = FilterParams::default().morphology_radius(7);
    assert_eq!(fixed.radius_for(1920, 1080), 7);
}

#[test]
fn cpu_and_gpu_backends_produce_identical_frames() {
    let gpu_ctx = ProcessingContext::new();
    if !gpu_ctx.has_gpu() {
        eprintln!("Skipping test - no GPU available");
        return;
    }

    for strategy in [MorphStrategy::Disk, MorphStrategy::Separable] {
        let params = FilterParams::default().morphology_strategy(strategy);
        let mut cpu = cpu_filter(params);
        let mut gpu = MotionFilter::with_context(params, ProcessingContext::new());

        let layout = FrameLayout::packed(48, 40);

        // Seed, a static frame, then a moving blob. Colors sit far from
        // every threshold so float rounding cannot flip a classification.
        let mut sequence = vec![
            solid_frame(&layout, [10, 10, 10]),
            solid_frame(&layout, [10, 10, 10]),
        ];
        let mut moving = solid_frame(&layout, [10, 10, 10]);
        paint(&mut moving, &layout, 14, 12, 12, 12, [210, 30, 30]);
        sequence.push(moving);

        for frame in &sequence {
            let mut cpu_frame = frame.clone();
            let mut gpu_frame = frame.clone();
            cpu.process_frame(&mut cpu_frame, layout).unwrap();
            gpu.process_frame(&mut gpu_frame, layout).unwrap();
            assert_eq!(cpu_frame, gpu_frame);
        }
    }
}
