use log::{debug, warn};
use serde_json::{Map, Value};

use bars_dsp::{bucket_into, downmix_into, BarState, PeakSettings, Reduction};
use embedded_graphics::pixelcolor::Rgb888;

use crate::color::{normalized, parse_hex_color, to_hex};
use crate::config::*;
use crate::error::{Error, Result};
use crate::gpu::{GpuContext, GpuResources, Snapshot};
use crate::host::{AudioHost, PaletteEvent};
use crate::renderer::{InstanceArrays, Renderer, Uniforms, MAX_INSTANCES};

/// Instances drawn by the most recent tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickStats {
    pub bars: usize,
    pub dots: usize,
    /// False when the tick had nothing to draw into.
    pub drawn: bool,
}

/// The audio-reactive bars component.
///
/// Owns the per-bar state and its renderer. The host drives it through
/// [`AudioHost`]; configuration arrives through the setters or
/// [`AudioBars::apply_user_properties`].
pub struct AudioBars<R: Renderer = GpuResources> {
    renderer: Option<R>,
    config: BarsConfig,
    state: BarState,
    pending_size: Option<(u32, u32)>,
    mono: Vec<f32>,
    buckets: Vec<f32>,
    bar_instances: InstanceArrays,
    dot_instances: InstanceArrays,
    stats: TickStats,
}

impl AudioBars<GpuResources> {
    /// Acquires a GPU and builds the pipeline. Fails when no adapter is
    /// available or the shader does not validate.
    pub fn new() -> Result<Self> {
        let context = GpuContext::new()?;
        Ok(Self::with_renderer(GpuResources::new(context)?))
    }

    /// Reads the canvas back as RGBA8.
    pub fn snapshot(&self) -> Result<Snapshot> {
        match &self.renderer {
            Some(resources) => resources.snapshot(),
            None => Err(Error::NoCanvas),
        }
    }
}

impl<R: Renderer> AudioBars<R> {
    pub fn with_renderer(renderer: R) -> Self {
        let config = BarsConfig::default();
        Self {
            renderer: Some(renderer),
            state: BarState::new(config.quantity),
            config,
            pending_size: None,
            mono: Vec::new(),
            buckets: Vec::new(),
            bar_instances: InstanceArrays::with_capacity(MAX_INSTANCES),
            dot_instances: InstanceArrays::with_capacity(MAX_INSTANCES),
            stats: TickStats::default(),
        }
    }

    pub fn config(&self) -> &BarsConfig {
        &self.config
    }

    pub fn state(&self) -> &BarState {
        &self.state
    }

    pub fn renderer(&self) -> Option<&R> {
        self.renderer.as_ref()
    }

    pub fn tick_stats(&self) -> TickStats {
        self.stats
    }

    /// Tallest bar in pixels on the current canvas.
    pub fn max_bar_height(&self) -> f32 {
        let height = self
            .renderer
            .as_ref()
            .and_then(Renderer::canvas_size)
            .map(|(_, h)| h)
            .unwrap_or(0);
        self.config.max_bar_height(height as f32)
    }

    fn peak_settings(&self) -> PeakSettings {
        PeakSettings {
            enabled: self.config.show_peak_dots,
            hold_frames: self.config.peak_dots_hold_frames,
            fall_speed: self.config.peak_dots_fall_speed,
        }
    }

    pub fn set_quantity(&mut self, value: impl Into<PropertyValue>) {
        let quantity = coerce_quantity(&value.into());
        if quantity != self.config.quantity {
            debug!("bar quantity {} -> {}", self.config.quantity, quantity);
            self.config.quantity = quantity;
            self.state.resize(quantity);
        }
    }

    pub fn set_gap(&mut self, value: impl Into<PropertyValue>) {
        self.config.gap = coerce_gap(&value.into());
    }

    pub fn set_border_radius(&mut self, value: impl Into<PropertyValue>) {
        self.config.border_radius = coerce_border_radius(&value.into());
    }

    pub fn set_opacity(&mut self, value: impl Into<PropertyValue>) {
        self.config.opacity = coerce_opacity(&value.into());
    }

    pub fn set_show_peak_dots(&mut self, value: impl Into<PropertyValue>) {
        self.config.show_peak_dots = value.into().as_flag();
    }

    pub fn set_peak_dots_border_radius(&mut self, value: impl Into<PropertyValue>) {
        self.config.peak_dots_border_radius = coerce_border_radius(&value.into());
    }

    pub fn set_peak_dots_opacity(&mut self, value: impl Into<PropertyValue>) {
        self.config.peak_dots_opacity = coerce_opacity(&value.into());
    }

    pub fn set_peak_dots_hold_frames(&mut self, value: impl Into<PropertyValue>) {
        self.config.peak_dots_hold_frames = coerce_hold_frames(&value.into());
    }

    pub fn set_peak_dots_fall_speed(&mut self, value: impl Into<PropertyValue>) {
        self.config.peak_dots_fall_speed = coerce_fall_speed(&value.into());
    }

    pub fn set_peak_dots_size(&mut self, value: impl Into<PropertyValue>) {
        self.config.peak_dots_size = coerce_dot_size(&value.into());
    }

    pub fn set_peak_dots_gap(&mut self, value: impl Into<PropertyValue>) {
        self.config.peak_dots_gap = coerce_dot_gap(&value.into());
    }

    pub fn set_bars_color(&mut self, hex: &str) {
        if let Some(color) = parse_color(hex) {
            self.config.bars_color = color;
        }
    }

    pub fn set_peak_dots_color(&mut self, hex: &str) {
        if let Some(color) = parse_color(hex) {
            self.config.peak_dots_color = color;
        }
    }

    /// Routes one host property to its setter. Returns `false` for keys
    /// this component does not own.
    pub fn apply_property(&mut self, key: &str, value: impl Into<PropertyValue>) -> bool {
        let value = value.into();
        match key {
            "audiobarsquantity" => self.set_quantity(value),
            "audiobarsgap" => self.set_gap(value),
            "audiobarsborderradius" => self.set_border_radius(value),
            "audiobarsopacity" => self.set_opacity(value),
            "audiobarsshowpeakdots" => self.set_show_peak_dots(value),
            "audiobarspeakdotsborderradius" => self.set_peak_dots_border_radius(value),
            "audiobarspeakdotsopacity" => self.set_peak_dots_opacity(value),
            "audiobarspeakdotsholdframes" => self.set_peak_dots_hold_frames(value),
            "audiobarspeakdotsfallspeed" => self.set_peak_dots_fall_speed(value),
            "audiobarspeakdotssize" => self.set_peak_dots_size(value),
            "audiobarspeakdotsgap" => self.set_peak_dots_gap(value),
            _ => {
                debug!("ignoring property {key}");
                return false;
            }
        }
        true
    }

    /// Applies the host's user-properties payload,
    /// `{ "<key>": { "value": <any> }, ... }`.
    ///
    /// Unknown keys are skipped; a value of an unexpected shape counts as
    /// absent, so its setter falls back. Returns how many properties were
    /// applied.
    pub fn apply_user_properties(&mut self, json: &str) -> Result<usize> {
        let properties: Map<String, Value> = serde_json::from_str(json)?;
        let mut applied = 0;
        for (key, property) in properties {
            let value = property
                .get("value")
                .cloned()
                .and_then(|raw| serde_json::from_value::<PropertyValue>(raw).ok())
                .unwrap_or_default();
            if self.apply_property(&key, value) {
                applied += 1;
            }
        }
        Ok(applied)
    }

    /// Releases the renderer. Later ticks only advance the bar state.
    pub fn destroy(&mut self) {
        if let Some(mut renderer) = self.renderer.take() {
            renderer.destroy();
        }
    }

    fn render(&mut self) {
        self.stats = TickStats::default();
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        let Some((width, height)) = renderer.canvas_size() else {
            return;
        };

        let uniforms = Uniforms::new(&self.config, width, height);

        self.bar_instances.pack(
            self.state.levels(),
            normalized(self.config.bars_color),
            self.config.opacity as f32 / 100.0,
        );
        renderer.draw_pass(&uniforms, &self.bar_instances, true);
        self.stats.bars = self.bar_instances.len();

        if self.config.show_peak_dots {
            self.dot_instances.pack(
                self.state.peaks(),
                normalized(self.config.peak_dots_color),
                self.config.peak_dots_opacity as f32 / 100.0,
            );
            renderer.draw_pass(&uniforms.for_dots(), &self.dot_instances, false);
            self.stats.dots = self.dot_instances.len();
        }
        self.stats.drawn = true;
    }
}

fn parse_color(hex: &str) -> Option<Rgb888> {
    let color = parse_hex_color(hex);
    if color.is_none() {
        warn!("ignoring invalid color {hex:?}");
    }
    color
}

impl<R: Renderer> AudioHost for AudioBars<R> {
    fn on_audio_tick(&mut self, frame: &[f32]) {
        if let Some((width, height)) = self.pending_size.take() {
            if let Some(renderer) = self.renderer.as_mut() {
                renderer.resize(width, height);
            }
        }

        if self.state.len() != self.config.quantity {
            self.state.resize(self.config.quantity);
        }
        downmix_into(frame, &mut self.mono);
        bucket_into(&self.mono, self.config.quantity, Reduction::Max, &mut self.buckets);
        let settings = self.peak_settings();
        self.state.update(&self.buckets, settings);

        self.render();
    }

    fn on_palette_change(&mut self, event: &PaletteEvent) {
        if let Some(color) = parse_color(&event.text_color) {
            debug!("palette text color {}", to_hex(color));
            self.config.bars_color = color;
            self.config.peak_dots_color = color;
        }
    }

    fn on_container_resize(&mut self, width: u32, height: u32) {
        self.pending_size = Some((width, height));
    }
}
