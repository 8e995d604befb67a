//! Renders through a real device and inspects the canvas. Every test skips
//! itself when the machine has no usable adapter.

use bars_viz::{AudioBars, AudioHost, Error, Renderer, Snapshot};

fn gpu_bars(width: u32, height: u32) -> Option<AudioBars> {
    match AudioBars::new() {
        Ok(mut bars) => {
            bars.on_container_resize(width, height);
            Some(bars)
        }
        Err(Error::Shader(diagnostic)) => panic!("shader failed to validate: {diagnostic}"),
        Err(e) => {
            eprintln!("skipping GPU test: {e}");
            None
        }
    }
}

/// Eight gapless bars, 25 pixels wide on a 200x100 canvas.
fn configure_wide_bars(bars: &mut AudioBars) {
    bars.set_quantity(8);
    bars.set_gap(0);
    bars.set_border_radius(0);
    bars.set_bars_color("#ff0000");
    bars.set_peak_dots_color("#00ff00");
}

fn is_transparent(snapshot: &Snapshot) -> bool {
    snapshot.pixels.iter().all(|&byte| byte == 0)
}

#[test]
fn test_saturated_bars_fill_the_canvas() {
    let Some(mut bars) = gpu_bars(200, 100) else {
        return;
    };
    configure_wide_bars(&mut bars);
    bars.set_show_peak_dots(false);

    for _ in 0..30 {
        bars.on_audio_tick(&[1.0; 16]);
    }
    assert_eq!(bars.tick_stats().bars, 8);

    let snapshot = bars.snapshot().unwrap();
    assert_eq!((snapshot.width, snapshot.height), (200, 100));
    assert_eq!(snapshot.pixels.len(), 200 * 100 * 4);
    for x in [12, 37, 112, 187] {
        assert_eq!(snapshot.pixel(x, 50), Some([255, 0, 0, 255]), "x = {x}");
    }
}

#[test]
fn test_silence_leaves_a_cleared_canvas() {
    let Some(mut bars) = gpu_bars(200, 100) else {
        return;
    };
    configure_wide_bars(&mut bars);

    for _ in 0..10 {
        bars.on_audio_tick(&[1.0; 16]);
    }
    assert!(!is_transparent(&bars.snapshot().unwrap()));

    bars.set_show_peak_dots(false);
    for _ in 0..20 {
        bars.on_audio_tick(&[0.0; 16]);
    }
    assert_eq!(bars.tick_stats().bars, 0);
    assert!(is_transparent(&bars.snapshot().unwrap()));
}

#[test]
fn test_peak_dot_floats_above_its_bar() {
    let Some(mut bars) = gpu_bars(200, 100) else {
        return;
    };
    configure_wide_bars(&mut bars);
    bars.set_peak_dots_size(4);
    bars.set_peak_dots_gap(2);
    bars.set_peak_dots_opacity(100);

    // One tick: level and peak at 0.4 of a 94 pixel maximum, so the bar
    // spans y 62.4..100 and the dot y 56.4..60.4.
    bars.on_audio_tick(&[1.0; 16]);
    assert_eq!(bars.tick_stats().dots, 8);

    let snapshot = bars.snapshot().unwrap();
    let bar = snapshot.pixel(12, 90).unwrap();
    assert_eq!(&bar[..3], &[255, 0, 0]);

    let dot = snapshot.pixel(12, 58).unwrap();
    assert_eq!(dot[0], 0);
    assert!(dot[1] > 200, "dot pixel {dot:?}");

    assert_eq!(snapshot.pixel(12, 61), Some([0, 0, 0, 0]));
    assert_eq!(snapshot.pixel(12, 20), Some([0, 0, 0, 0]));
}

#[test]
fn test_zero_area_has_no_canvas() {
    let Some(mut bars) = gpu_bars(0, 100) else {
        return;
    };
    bars.on_audio_tick(&[1.0; 16]);
    assert!(!bars.tick_stats().drawn);
    assert!(matches!(bars.snapshot(), Err(Error::NoCanvas)));

    bars.on_container_resize(64, 32);
    bars.on_audio_tick(&[1.0; 16]);
    assert!(bars.tick_stats().drawn);
    assert_eq!(bars.renderer().and_then(|r| r.canvas_size()), Some((64, 32)));
}

#[test]
fn test_destroy_twice() {
    let Some(mut bars) = gpu_bars(64, 32) else {
        return;
    };
    bars.on_audio_tick(&[0.5; 80]);
    bars.destroy();
    bars.destroy();

    bars.on_audio_tick(&[0.5; 80]);
    assert!(!bars.tick_stats().drawn);
    assert!(matches!(bars.snapshot(), Err(Error::NoCanvas)));
}

#[test]
fn test_oversized_container_is_clamped_to_the_texture_limit() {
    let Some(mut bars) = gpu_bars(64, 32) else {
        return;
    };
    let limit = bars
        .renderer()
        .map(|r| r.context().device.limits().max_texture_dimension_2d)
        .unwrap();

    bars.on_container_resize(limit + 1, 8);
    bars.on_audio_tick(&[0.5; 80]);
    assert!(bars.tick_stats().drawn);
    assert_eq!(bars.renderer().and_then(|r| r.canvas_size()), Some((limit, 8)));

    let snapshot = bars.snapshot().unwrap();
    assert_eq!((snapshot.width, snapshot.height), (limit, 8));

    bars.on_container_resize(64, 32);
    bars.on_audio_tick(&[0.5; 80]);
    assert_eq!(bars.renderer().and_then(|r| r.canvas_size()), Some((64, 32)));
}
