//! GPU-instanced audio bars with peak-hold dots.
//!
//! [`AudioBars`] is driven by a host through [`AudioHost`]: loudness frames
//! become smoothed bar levels and falling peak dots, drawn with one
//! instanced pass per layer into an offscreen canvas.

pub mod bar_graph;
pub mod color;
pub mod config;
pub mod error;
pub mod gpu;
pub mod host;
pub mod renderer;

pub use bar_graph::{AudioBars, TickStats};
pub use config::{BarsConfig, PropertyValue};
pub use error::{Error, Result};
pub use gpu::{Canvas, GpuContext, GpuResources, Snapshot};
pub use host::{AudioHost, PaletteEvent};
pub use renderer::{pack_instances, InstanceArrays, Renderer, Uniforms};
