use bars_dsp::spectrum::{magnitudes_to_levels, process_frame, FFT_SIZE};
use std::f32::consts::PI;

pub const SAMPLE_RATE: f32 = 44_100.0;
/// Loudness bands per channel in every frame handed to the bars.
pub const BANDS_PER_CHANNEL: usize = 64;

const CHORD: [f32; 3] = [440.0, 554.37, 659.25];

/// Synthetic stereo music: a pulsing kick, a slowly swelling chord and a
/// ticking hi-hat, advanced one host tick at a time.
pub struct SignalGenerator {
    /// First sample of the next analysis window.
    position: u64,
    samples_per_tick: u64,
}

impl SignalGenerator {
    pub fn new(ticks_per_second: f32) -> Self {
        Self {
            position: 0,
            samples_per_tick: (SAMPLE_RATE / ticks_per_second) as u64,
        }
    }

    fn sample(t: f32, channel: usize) -> f32 {
        let kick = (-(t % 0.5) * 8.0).exp() * (2.0 * PI * 55.0 * t).sin();
        let swell = 0.6 + 0.4 * (2.0 * PI * 0.25 * t + channel as f32).sin();
        let chord = CHORD.iter().map(|f| (2.0 * PI * f * t).sin()).sum::<f32>() / 3.0;
        let hat = (-(t % 0.25) * 40.0).exp() * (2.0 * PI * 6000.0 * t).sin();
        let hat_weight = if channel == 0 { 0.1 } else { 0.2 };

        0.5 * kick + 0.25 * swell * chord + hat_weight * hat
    }

    fn window(&self, channel: usize) -> [i16; FFT_SIZE] {
        let mut window = [0i16; FFT_SIZE];
        for (i, out) in window.iter_mut().enumerate() {
            let t = (self.position + i as u64) as f32 / SAMPLE_RATE;
            *out = (Self::sample(t, channel).clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        }
        window
    }

    /// Loudness frame for the current tick: left bands followed by right
    /// bands. Advances the generator by one tick.
    pub fn next_frame(&mut self) -> Result<Vec<f32>, &'static str> {
        let mut frame = Vec::with_capacity(BANDS_PER_CHANNEL * 2);
        for channel in 0..2 {
            let magnitudes = process_frame(&self.window(channel))?;
            frame.extend(magnitudes_to_levels(&magnitudes, BANDS_PER_CHANNEL));
        }
        self.position += self.samples_per_tick;
        Ok(frame)
    }
}
