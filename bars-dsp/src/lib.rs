#![no_std]
//! Signal pipeline for the audio bars visualizer.
//!
//! Everything in here is plain numeric work with no rendering concerns:
//! downmixing and bucketing of incoming loudness frames, the per-bar
//! smoothing / peak-hold state machine, and an FFT front-end that turns raw
//! PCM into loudness frames for hosts that only have samples.
extern crate alloc;

pub mod bar_state;
pub mod reduction;
pub mod signal;
pub mod spectrum;

pub use bar_state::{BarState, PeakSettings, VISIBILITY_THRESHOLD};
pub use reduction::Reduction;
pub use signal::{bucket, bucket_into, bucket_with, downmix, downmix_into, range_mean};
