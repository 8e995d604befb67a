use serde::Deserialize;

/// Colors the host extracts from the current album art.
///
/// Deserializes from the host's camelCase payload; only `textColor` is
/// consumed by the bars, the rest is carried for other components.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaletteEvent {
    pub text_color: String,
    #[serde(default)]
    pub primary_color: Option<String>,
    #[serde(default)]
    pub secondary_color: Option<String>,
    #[serde(default)]
    pub tertiary_color: Option<String>,
    #[serde(default)]
    pub high_contrast_color: Option<String>,
}

impl PaletteEvent {
    pub fn new(text_color: impl Into<String>) -> Self {
        Self {
            text_color: text_color.into(),
            ..Self::default()
        }
    }
}

/// Notifications a host delivers to an audio-reactive component.
///
/// The host owns the clock: it calls `on_audio_tick` once per audio frame
/// (about 60 times a second) and the others whenever the matching event
/// fires. Implementations must finish each call without blocking.
pub trait AudioHost {
    /// A fresh loudness frame: two equal halves of values in about `[0, 1]`.
    fn on_audio_tick(&mut self, frame: &[f32]);

    /// The album-art palette changed.
    fn on_palette_change(&mut self, event: &PaletteEvent);

    /// The container was measured at a new size, in physical pixels.
    fn on_container_resize(&mut self, width: u32, height: u32);
}
