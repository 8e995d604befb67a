mod signal;

use std::convert::Infallible;
use std::error::Error;
use std::path::PathBuf;
use std::{fs, thread, time::Duration};

use bars_viz::{AudioBars, AudioHost, PaletteEvent, Snapshot};
use clap::Parser;
use embedded_graphics::{pixelcolor::Rgb888, prelude::*};
use embedded_graphics_simulator::{OutputSettingsBuilder, SimulatorDisplay, SimulatorEvent, Window};
use log::info;

use signal::SignalGenerator;

pub const FRAME_DELAY_MS: u64 = 16;
const TICKS_PER_SECOND: f32 = 60.0;

#[derive(Parser)]
#[command(name = "bars-viz-simulator", about = "Audio bars on a synthetic signal", version)]
struct Cli {
    /// Canvas width in pixels
    #[arg(long, default_value_t = 480, value_parser = clap::value_parser!(u32).range(1..))]
    width: u32,
    /// Canvas height in pixels
    #[arg(long, default_value_t = 160, value_parser = clap::value_parser!(u32).range(1..))]
    height: u32,
    /// Window pixel scale
    #[arg(long, default_value_t = 2)]
    scale: u32,
    /// Stop after this many ticks
    #[arg(long)]
    frames: Option<u32>,
    /// Render headless and write the last frame to this PNG
    #[arg(long)]
    png: Option<PathBuf>,
    /// User-properties JSON applied before the first tick
    #[arg(long)]
    properties: Option<PathBuf>,

    #[arg(long)]
    quantity: Option<f64>,
    #[arg(long)]
    gap: Option<f64>,
    #[arg(long)]
    border_radius: Option<f64>,
    #[arg(long)]
    opacity: Option<f64>,
    /// Bar and peak-dot color, as the palette's text color
    #[arg(long)]
    color: Option<String>,
    #[arg(long)]
    peak_dots_color: Option<String>,
    #[arg(long)]
    no_peak_dots: bool,
    #[arg(long)]
    peak_dots_border_radius: Option<f64>,
    #[arg(long)]
    peak_dots_opacity: Option<f64>,
    #[arg(long)]
    peak_dots_hold_frames: Option<f64>,
    /// Per-tick fall, or a percentage when above 1
    #[arg(long)]
    peak_dots_fall_speed: Option<f64>,
    #[arg(long)]
    peak_dots_size: Option<f64>,
    #[arg(long)]
    peak_dots_gap: Option<f64>,
}

impl Cli {
    fn configure(&self, bars: &mut AudioBars) -> Result<(), Box<dyn Error>> {
        if let Some(path) = &self.properties {
            let applied = bars.apply_user_properties(&fs::read_to_string(path)?)?;
            info!("applied {} properties from {}", applied, path.display());
        }
        if let Some(v) = self.quantity {
            bars.set_quantity(v);
        }
        if let Some(v) = self.gap {
            bars.set_gap(v);
        }
        if let Some(v) = self.border_radius {
            bars.set_border_radius(v);
        }
        if let Some(v) = self.opacity {
            bars.set_opacity(v);
        }
        if let Some(color) = &self.color {
            bars.on_palette_change(&PaletteEvent::new(color.as_str()));
        }
        if let Some(color) = &self.peak_dots_color {
            bars.set_peak_dots_color(color);
        }
        if self.no_peak_dots {
            bars.set_show_peak_dots(false);
        }
        if let Some(v) = self.peak_dots_border_radius {
            bars.set_peak_dots_border_radius(v);
        }
        if let Some(v) = self.peak_dots_opacity {
            bars.set_peak_dots_opacity(v);
        }
        if let Some(v) = self.peak_dots_hold_frames {
            bars.set_peak_dots_hold_frames(v);
        }
        if let Some(v) = self.peak_dots_fall_speed {
            bars.set_peak_dots_fall_speed(v);
        }
        if let Some(v) = self.peak_dots_size {
            bars.set_peak_dots_size(v);
        }
        if let Some(v) = self.peak_dots_gap {
            bars.set_peak_dots_gap(v);
        }
        Ok(())
    }
}

/// Copies the canvas onto the display.
///
/// The canvas is cleared to transparent black before every tick, so the
/// stored color is already weighted by its alpha and lands as-is on black.
fn blit(snapshot: &Snapshot, display: &mut SimulatorDisplay<Rgb888>) -> Result<(), Infallible> {
    let width = snapshot.width as usize;
    let pixels = snapshot
        .pixels
        .chunks_exact(4)
        .enumerate()
        .map(|(i, rgba)| {
            let point = Point::new((i % width) as i32, (i / width) as i32);
            Pixel(point, Rgb888::new(rgba[0], rgba[1], rgba[2]))
        });
    display.draw_iter(pixels)
}

fn tick(bars: &mut AudioBars, generator: &mut SignalGenerator, count: u32) -> Result<(), Box<dyn Error>> {
    let frame = generator.next_frame()?;
    bars.on_audio_tick(&frame);
    if count % TICKS_PER_SECOND as u32 == 0 {
        let stats = bars.tick_stats();
        info!("tick {}: {} bars, {} dots", count, stats.bars, stats.dots);
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut bars = AudioBars::new()?;
    cli.configure(&mut bars)?;
    bars.on_container_resize(cli.width, cli.height);

    let mut generator = SignalGenerator::new(TICKS_PER_SECOND);
    let mut display: SimulatorDisplay<Rgb888> = SimulatorDisplay::new(Size::new(cli.width, cli.height));
    let output_settings = OutputSettingsBuilder::new().scale(cli.scale.max(1)).build();

    if let Some(path) = &cli.png {
        let frames = cli.frames.unwrap_or(TICKS_PER_SECOND as u32).max(1);
        for count in 0..frames {
            tick(&mut bars, &mut generator, count)?;
        }
        blit(&bars.snapshot()?, &mut display)?;
        display.to_rgb_output_image(&output_settings).save_png(path)?;
        info!("wrote {}", path.display());
        bars.destroy();
        return Ok(());
    }

    let mut window = Window::new("Audio Bars Simulator", &output_settings);
    let mut count = 0;
    'running: loop {
        tick(&mut bars, &mut generator, count)?;
        blit(&bars.snapshot()?, &mut display)?;
        window.update(&display);

        count += 1;
        if cli.frames.is_some_and(|frames| count >= frames) {
            break;
        }

        thread::sleep(Duration::from_millis(FRAME_DELAY_MS));

        for event in window.events() {
            if let SimulatorEvent::Quit = event {
                break 'running;
            }
        }
    }

    bars.destroy();
    Ok(())
}
