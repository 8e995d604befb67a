//! Render parameters and the coercion rules of the configuration surface.
//!
//! Host input arrives as strings, numbers or booleans. Every parameter has a
//! valid range and a fallback used when the input is not a number at all;
//! nothing here ever fails.

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use serde::Deserialize;

/// Limits and fallbacks of the numeric parameters.
pub mod limits {
    pub const MIN_QUANTITY: usize = 8;
    pub const MAX_QUANTITY: usize = 512;
    pub const FALLBACK_QUANTITY: usize = 64;

    pub const MAX_GAP: f32 = 20.0;
    pub const FALLBACK_GAP: f32 = 2.0;

    pub const MAX_PERCENT: f32 = 100.0;
    pub const FALLBACK_BORDER_RADIUS: f32 = 20.0;
    pub const FALLBACK_OPACITY: u8 = 100;

    pub const MAX_HOLD_FRAMES: u8 = 60;
    pub const FALLBACK_HOLD_FRAMES: u8 = 10;

    pub const MIN_FALL_SPEED: f32 = 0.0001;
    pub const MAX_FALL_SPEED: f32 = 0.05;
    /// Lower end of the fall speed when it is given as a percentage.
    pub const MIN_PERCENT_FALL_SPEED: f32 = 0.001;
    pub const FALLBACK_FALL_SPEED: f32 = 0.008;

    pub const MIN_DOT_SIZE: f32 = 2.0;
    pub const MAX_DOT_SIZE: f32 = 12.0;
    pub const FALLBACK_DOT_SIZE: f32 = 3.0;

    pub const MAX_DOT_GAP: f32 = 20.0;
    pub const FALLBACK_DOT_GAP: f32 = 2.0;
}

use limits::*;

/// A raw property value as delivered by the host.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Number(f64),
    Text(String),
    #[default]
    Absent,
}

impl PropertyValue {
    /// Numeric reading of the value; `None` when it does not parse.
    pub fn as_number(&self) -> Option<f64> {
        let number = match self {
            PropertyValue::Number(n) => *n,
            PropertyValue::Text(s) => s.trim().parse::<f64>().ok()?,
            PropertyValue::Bool(_) | PropertyValue::Absent => return None,
        };
        if number.is_nan() {
            None
        } else {
            Some(number)
        }
    }

    /// Only a real `true` or the exact text `"true"` count as enabled.
    pub fn as_flag(&self) -> bool {
        match self {
            PropertyValue::Bool(b) => *b,
            PropertyValue::Text(s) => s == "true",
            PropertyValue::Number(_) | PropertyValue::Absent => false,
        }
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Number(value)
    }
}

impl From<f32> for PropertyValue {
    fn from(value: f32) -> Self {
        PropertyValue::Number(value as f64)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        PropertyValue::Number(value as f64)
    }
}

impl From<u32> for PropertyValue {
    fn from(value: u32) -> Self {
        PropertyValue::Number(value as f64)
    }
}

impl From<usize> for PropertyValue {
    fn from(value: usize) -> Self {
        PropertyValue::Number(value as f64)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(value)
    }
}

impl<T: Into<PropertyValue>> From<Option<T>> for PropertyValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(PropertyValue::Absent)
    }
}

fn clamp_f32(value: &PropertyValue, min: f32, max: f32, fallback: f32) -> f32 {
    value
        .as_number()
        .map(|n| n as f32)
        .unwrap_or(fallback)
        .clamp(min, max)
}

/// Integer parameters truncate toward zero before clamping.
fn clamp_int(value: &PropertyValue, min: f64, max: f64, fallback: f64) -> f64 {
    value.as_number().map(f64::trunc).unwrap_or(fallback).clamp(min, max)
}

pub fn coerce_quantity(value: &PropertyValue) -> usize {
    clamp_int(
        value,
        MIN_QUANTITY as f64,
        MAX_QUANTITY as f64,
        FALLBACK_QUANTITY as f64,
    ) as usize
}

pub fn coerce_gap(value: &PropertyValue) -> f32 {
    clamp_f32(value, 0.0, MAX_GAP, FALLBACK_GAP)
}

pub fn coerce_border_radius(value: &PropertyValue) -> f32 {
    clamp_f32(value, 0.0, MAX_PERCENT, FALLBACK_BORDER_RADIUS)
}

pub fn coerce_opacity(value: &PropertyValue) -> u8 {
    clamp_int(value, 0.0, MAX_PERCENT as f64, FALLBACK_OPACITY as f64) as u8
}

pub fn coerce_hold_frames(value: &PropertyValue) -> u8 {
    clamp_int(
        value,
        0.0,
        MAX_HOLD_FRAMES as f64,
        FALLBACK_HOLD_FRAMES as f64,
    ) as u8
}

/// Fall speed accepts two scales: anything above 1 is a percentage mapped
/// onto `0.001..=0.05`, anything else is already a per-frame fall.
pub fn coerce_fall_speed(value: &PropertyValue) -> f32 {
    let speed = value
        .as_number()
        .map(|n| n as f32)
        .unwrap_or(FALLBACK_FALL_SPEED);
    if speed > 1.0 {
        MIN_PERCENT_FALL_SPEED
            + (speed.min(MAX_PERCENT) / MAX_PERCENT) * (MAX_FALL_SPEED - MIN_PERCENT_FALL_SPEED)
    } else {
        speed.clamp(MIN_FALL_SPEED, MAX_FALL_SPEED)
    }
}

pub fn coerce_dot_size(value: &PropertyValue) -> f32 {
    clamp_f32(value, MIN_DOT_SIZE, MAX_DOT_SIZE, FALLBACK_DOT_SIZE)
}

pub fn coerce_dot_gap(value: &PropertyValue) -> f32 {
    clamp_f32(value, 0.0, MAX_DOT_GAP, FALLBACK_DOT_GAP)
}

/// Every parameter consumed by the state machine and the renderer.
#[derive(Clone, Debug, PartialEq)]
pub struct BarsConfig {
    pub quantity: usize,
    pub gap: f32,
    /// Percentage of half the shorter side of a bar.
    pub border_radius: f32,
    /// Percentage, divided by 100 before it reaches the shader.
    pub opacity: u8,
    pub bars_color: Rgb888,

    pub show_peak_dots: bool,
    pub peak_dots_color: Rgb888,
    pub peak_dots_border_radius: f32,
    pub peak_dots_opacity: u8,
    pub peak_dots_hold_frames: u8,
    pub peak_dots_fall_speed: f32,
    pub peak_dots_size: f32,
    pub peak_dots_gap: f32,
}

impl Default for BarsConfig {
    fn default() -> Self {
        Self {
            quantity: 40,
            gap: 4.0,
            border_radius: 60.0,
            opacity: 100,
            bars_color: Rgb888::WHITE,

            show_peak_dots: true,
            peak_dots_color: Rgb888::WHITE,
            peak_dots_border_radius: 80.0,
            peak_dots_opacity: 80,
            peak_dots_hold_frames: 10,
            peak_dots_fall_speed: FALLBACK_FALL_SPEED,
            peak_dots_size: 5.0,
            peak_dots_gap: 4.0,
        }
    }
}

impl BarsConfig {
    /// Tallest a bar may grow on a canvas of `canvas_height` pixels, leaving
    /// room above it for the peak dot when dots are shown.
    pub fn max_bar_height(&self, canvas_height: f32) -> f32 {
        if self.show_peak_dots {
            (canvas_height - self.peak_dots_size - self.peak_dots_gap).max(0.0)
        } else {
            canvas_height
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn quantity_is_clamped_and_truncated() {
        assert_eq!(coerce_quantity(&128.into()), 128);
        assert_eq!(coerce_quantity(&3.into()), MIN_QUANTITY);
        assert_eq!(coerce_quantity(&4096.into()), MAX_QUANTITY);
        assert_eq!(coerce_quantity(&PropertyValue::from(12.9)), 12);
        assert_eq!(coerce_quantity(&"96".into()), 96);
        assert_eq!(coerce_quantity(&" 32 ".into()), 32);
        assert_eq!(coerce_quantity(&"lots".into()), FALLBACK_QUANTITY);
        assert_eq!(coerce_quantity(&PropertyValue::Absent), FALLBACK_QUANTITY);
        assert_eq!(coerce_quantity(&true.into()), FALLBACK_QUANTITY);
    }

    #[test]
    fn fall_speed_dual_scale() {
        assert_abs_diff_eq!(coerce_fall_speed(&50.into()), 0.0255, epsilon = 1e-6);
        assert_abs_diff_eq!(coerce_fall_speed(&100.into()), 0.05, epsilon = 1e-6);
        assert_abs_diff_eq!(coerce_fall_speed(&1000.into()), 0.05, epsilon = 1e-6);
        assert_abs_diff_eq!(coerce_fall_speed(&0.01.into()), 0.01, epsilon = 1e-9);
        assert_abs_diff_eq!(coerce_fall_speed(&(-5).into()), MIN_FALL_SPEED, epsilon = 1e-9);
        assert_abs_diff_eq!(coerce_fall_speed(&1.into()), MAX_FALL_SPEED, epsilon = 1e-9);
        assert_abs_diff_eq!(
            coerce_fall_speed(&"nope".into()),
            FALLBACK_FALL_SPEED,
            epsilon = 1e-9
        );
    }

    #[test]
    fn percentages_and_sizes() {
        assert_eq!(coerce_opacity(&150.into()), 100);
        assert_eq!(coerce_opacity(&"42.8".into()), 42);
        assert_eq!(coerce_opacity(&(-1).into()), 0);
        assert_eq!(coerce_border_radius(&"x".into()), FALLBACK_BORDER_RADIUS);
        assert_eq!(coerce_border_radius(&12.5.into()), 12.5);
        assert_eq!(coerce_gap(&25.into()), MAX_GAP);
        assert_eq!(coerce_gap(&0.into()), 0.0);
        assert_eq!(coerce_hold_frames(&61.into()), MAX_HOLD_FRAMES);
        assert_eq!(coerce_hold_frames(&PropertyValue::Absent), FALLBACK_HOLD_FRAMES);
        assert_eq!(coerce_dot_size(&1.into()), MIN_DOT_SIZE);
        assert_eq!(coerce_dot_size(&"".into()), FALLBACK_DOT_SIZE);
        assert_eq!(coerce_dot_gap(&f64::NAN.into()), FALLBACK_DOT_GAP);
        assert_eq!(coerce_dot_gap(&f64::INFINITY.into()), MAX_DOT_GAP);
    }

    #[test]
    fn flags() {
        assert!(PropertyValue::from(true).as_flag());
        assert!(PropertyValue::from("true").as_flag());
        assert!(!PropertyValue::from("TRUE").as_flag());
        assert!(!PropertyValue::from(1).as_flag());
        assert!(!PropertyValue::Absent.as_flag());
    }

    #[test]
    fn max_bar_height_leaves_room_for_dots() {
        let mut config = BarsConfig::default();
        assert_eq!(config.max_bar_height(100.0), 91.0);
        assert_eq!(config.max_bar_height(6.0), 0.0);
        config.show_peak_dots = false;
        assert_eq!(config.max_bar_height(100.0), 100.0);
    }

    #[test]
    fn property_values_deserialize_untagged() {
        let values: Vec<PropertyValue> =
            serde_json::from_str(r##"[true, 12, "#fff", null]"##).unwrap();
        assert_eq!(
            values,
            vec![
                PropertyValue::Bool(true),
                PropertyValue::Number(12.0),
                PropertyValue::Text("#fff".to_string()),
                PropertyValue::Absent,
            ]
        );
    }
}
