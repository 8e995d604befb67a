use alloc::{vec, vec::Vec};

#[cfg(feature = "logging")]
use defmt::debug;

/// Share of the previous level kept on every frame.
const SMOOTHING_RETAIN: f32 = 0.6;
/// Share of the incoming bucket mixed in on every frame.
const SMOOTHING_INPUT: f32 = 0.4;

/// Levels below this are invisible and get culled before drawing.
pub const VISIBILITY_THRESHOLD: f32 = 0.001;

/// Peak-dot physics parameters for one update.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PeakSettings {
    /// When false only the smoothed levels move; peaks and holds are frozen.
    pub enabled: bool,
    /// Frames a fresh peak stays put before it starts to fall.
    pub hold_frames: u8,
    /// Linear fall per frame once the hold has run out.
    pub fall_speed: f32,
}

impl Default for PeakSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            hold_frames: 10,
            fall_speed: 0.008,
        }
    }
}

/// Per-bar smoothing and peak-hold state.
///
/// Every rate in here is expressed per update, not per unit of wall-clock
/// time, so the visual speed follows whatever tick rate the host drives.
#[derive(Clone, Debug, Default)]
pub struct BarState {
    /// One-pole low-passed level of each bar, in `[0, 1]`.
    levels: Vec<f32>,
    /// Peak-dot position of each bar, in `[0, 1]`.
    peaks: Vec<f32>,
    /// Frames left before each peak starts falling.
    holds: Vec<u8>,
}

impl BarState {
    /// Creates state for `quantity` bars, all at rest.
    pub fn new(quantity: usize) -> Self {
        Self {
            levels: vec![0.0; quantity],
            peaks: vec![0.0; quantity],
            holds: vec![0; quantity],
        }
    }

    /// Reallocates all three sequences to `quantity`, discarding history.
    pub fn resize(&mut self, quantity: usize) {
        #[cfg(feature = "logging")]
        debug!("BarState::resize {} -> {}", self.levels.len(), quantity);
        *self = Self::new(quantity);
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn levels(&self) -> &[f32] {
        &self.levels
    }

    pub fn peaks(&self) -> &[f32] {
        &self.peaks
    }

    pub fn holds(&self) -> &[u8] {
        &self.holds
    }

    /// Advances every bar by one frame.
    ///
    /// `buckets` is indexed by bar; missing or non-finite entries count as
    /// silence. Peak physics run strictly as catch, then hold, then fall.
    pub fn update(&mut self, buckets: &[f32], settings: PeakSettings) {
        let bars = self
            .levels
            .iter_mut()
            .zip(self.peaks.iter_mut())
            .zip(self.holds.iter_mut())
            .enumerate();

        for (i, ((level, peak), hold)) in bars {
            let input = buckets
                .get(i)
                .copied()
                .filter(|value| value.is_finite())
                .unwrap_or(0.0);
            *level = (*level * SMOOTHING_RETAIN + input * SMOOTHING_INPUT).clamp(0.0, 1.0);

            if !settings.enabled {
                continue;
            }

            // The hold bound may have shrunk since this counter was armed.
            *hold = (*hold).min(settings.hold_frames);

            if *level > *peak {
                *peak = *level;
                *hold = settings.hold_frames;
            } else if *hold > 0 {
                *hold -= 1;
            } else {
                *peak = (*peak - settings.fall_speed).max(*level).clamp(0.0, 1.0);
            }
        }
    }
}
