use bars_dsp::VISIBILITY_THRESHOLD;
use bytemuck::{Pod, Zeroable};

use crate::config::BarsConfig;

/// Upper bound on instances per pass; matches the largest bar quantity.
pub const MAX_INSTANCES: usize = crate::config::limits::MAX_QUANTITY;

/// Uniform block shared by both passes. Layout mirrors `Uniforms` in
/// `shader.wgsl` (48 bytes, 16-byte aligned).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Uniforms {
    pub resolution: [f32; 2],
    pub bars_quantity: f32,
    pub gap: f32,
    pub max_bar_height: f32,
    pub dot_size: f32,
    pub dot_gap: f32,
    pub is_dot: u32,
    pub border_radius: f32,
    pub peak_dot_border_radius: f32,
    pub _pad: [f32; 2],
}

impl Uniforms {
    pub fn new(config: &BarsConfig, width: u32, height: u32) -> Self {
        let height_px = height as f32;
        Self {
            resolution: [width as f32, height_px],
            bars_quantity: config.quantity as f32,
            gap: config.gap,
            max_bar_height: config.max_bar_height(height_px),
            dot_size: config.peak_dots_size,
            dot_gap: config.peak_dots_gap,
            is_dot: 0,
            border_radius: config.border_radius,
            peak_dot_border_radius: config.peak_dots_border_radius,
            _pad: [0.0; 2],
        }
    }

    /// Same block with the pass flag switched to peak dots.
    pub fn for_dots(mut self) -> Self {
        self.is_dot = 1;
        self
    }
}

/// Per-instance attributes, one array per attribute as the vertex buffers
/// expect them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InstanceArrays {
    pub indices: Vec<f32>,
    pub heights: Vec<f32>,
    pub colors: Vec<[f32; 3]>,
    pub opacities: Vec<f32>,
}

impl InstanceArrays {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            indices: Vec::with_capacity(capacity),
            heights: Vec::with_capacity(capacity),
            colors: Vec::with_capacity(capacity),
            opacities: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn clear(&mut self) {
        self.indices.clear();
        self.heights.clear();
        self.colors.clear();
        self.opacities.clear();
    }

    /// Refills the arrays with every visible height, keeping its bar index.
    ///
    /// Heights below the visibility threshold are culled, so a silent frame
    /// packs nothing. At most [`MAX_INSTANCES`] entries are kept.
    pub fn pack(&mut self, heights: &[f32], color: [f32; 3], opacity: f32) {
        self.clear();
        let visible = heights
            .iter()
            .enumerate()
            .filter(|(_, h)| **h >= VISIBILITY_THRESHOLD)
            .take(MAX_INSTANCES);
        for (index, height) in visible {
            self.indices.push(index as f32);
            self.heights.push(*height);
            self.colors.push(color);
            self.opacities.push(opacity);
        }
    }
}

/// Allocating form of [`InstanceArrays::pack`].
pub fn pack_instances(heights: &[f32], color: [f32; 3], opacity: f32) -> InstanceArrays {
    let mut arrays = InstanceArrays::with_capacity(heights.len());
    arrays.pack(heights, color, opacity);
    arrays
}

/// A drawable the bars can be rendered into.
///
/// `AudioBars` only talks to its output through this trait: the GPU
/// implementation lives in [`crate::gpu`], tests substitute a recorder.
pub trait Renderer {
    /// Resizes the drawable. Returns `false` when the size is unchanged.
    fn resize(&mut self, width: u32, height: u32) -> bool;

    /// Current drawable size, `None` while it has no area or after destroy.
    fn canvas_size(&self) -> Option<(u32, u32)>;

    /// Records one instanced pass of six vertices per instance. `clear`
    /// wipes the drawable to transparent first; an empty `instances` still
    /// clears but issues no draw.
    fn draw_pass(&mut self, uniforms: &Uniforms, instances: &InstanceArrays, clear: bool);

    /// Releases every resource. Safe to call more than once.
    fn destroy(&mut self);
}
