//! FFT front-end for hosts that only have raw PCM.
//!
//! The visualizer itself consumes loudness frames; this module turns 1024
//! signed 16-bit samples of one channel into a 512-bin magnitude spectrum and
//! then into `[0, 1]` loudness bands that can be laid out as one half of an
//! audio frame.

use alloc::vec::Vec;

use microdsp::common::{apply_window_function, real_fft, WindowFunctionType::Hann};
use microfft::Complex32;
#[allow(unused_imports)]
use micromath::F32Ext;

use crate::reduction::Reduction;
use crate::signal::bucket_with;

/// Samples per analysis window.
pub const FFT_SIZE: usize = 1024;
/// Magnitude bins produced per window.
pub const SPECTRUM_BINS: usize = FFT_SIZE / 2;

/// Gain applied to normalized magnitudes before square-root compression.
const LEVEL_GAIN: f32 = 8.0;

/// Normalize a single sample from i16 to f32.
pub fn normalize_sample(sample: i16) -> f32 {
    sample as f32 / i16::MAX as f32
}

/// Normalize a slice of i16 samples to a slice of f32 samples.
pub fn normalize_samples(samples: &[i16], normalized_samples: &mut [f32]) {
    for (out, &sample) in normalized_samples.iter_mut().zip(samples.iter()) {
        *out = normalize_sample(sample);
    }
}

/// Apply a Hann window to a slice of f32 samples.
pub fn apply_hann_window(samples: &mut [f32]) {
    apply_window_function(Hann, samples);
}

/// Compute the FFT of a window of f32 samples in place.
pub fn compute_fft(samples: &mut [f32; FFT_SIZE]) -> &mut [Complex32] {
    real_fft(samples)
}

/// Compute the magnitude of the FFT output.
pub fn compute_magnitude(fft_output: &[Complex32]) -> Result<[f32; SPECTRUM_BINS], &'static str> {
    if fft_output.len() != SPECTRUM_BINS {
        return Err("FFT output must contain exactly 512 complex numbers");
    }
    let mut magnitude = [0.0; SPECTRUM_BINS];
    for (out, component) in magnitude.iter_mut().zip(fft_output.iter()) {
        *out = (component.re * component.re + component.im * component.im).sqrt();
    }
    Ok(magnitude)
}

/// Process a window of i16 samples and return the magnitude spectrum.
pub fn process_frame(samples: &[i16]) -> Result<[f32; SPECTRUM_BINS], &'static str> {
    if samples.len() != FFT_SIZE {
        return Err("Input must contain exactly 1024 samples");
    }

    let mut normalized_samples = [0.0; FFT_SIZE];
    normalize_samples(samples, &mut normalized_samples);
    apply_hann_window(&mut normalized_samples);

    let fft_output = compute_fft(&mut normalized_samples);
    compute_magnitude(fft_output)
}

/// Collapses a magnitude spectrum into `bands` loudness values in `[0, 1]`.
///
/// Each band keeps its loudest bin, normalized by the window length and
/// square-root compressed so quiet passages still register.
pub fn magnitudes_to_levels(magnitudes: &[f32], bands: usize) -> Vec<f32> {
    let fft_norm = 1.0 / FFT_SIZE as f32;
    let mut levels = bucket_with(magnitudes, bands, Reduction::Max);
    for level in levels.iter_mut() {
        *level = (*level * fft_norm * LEVEL_GAIN).max(0.0).sqrt().min(1.0);
    }
    levels
}
