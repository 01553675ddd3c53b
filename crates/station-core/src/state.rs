//! The single mutable device record shared by every request cycle.

use heapless::String;

use crate::{sensor::ClimateReading, text_policy};

/// Maximum characters kept from a user-supplied display message.
pub const MESSAGE_CHARS: usize = 32;
/// Byte capacity for [`MESSAGE_CHARS`] characters of UTF-8.
pub const MESSAGE_BYTES: usize = MESSAGE_CHARS * 4;

pub type MessageText = String<MESSAGE_BYTES>;

/// What the character display shows.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum DisplayMode {
    #[default]
    Custom,
    Distance,
    Temperature,
}

impl DisplayMode {
    /// Human-readable label used on the control page.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Custom => "Custom",
            Self::Distance => "Distance",
            Self::Temperature => "Temperature",
        }
    }
}

/// Device state created once at boot and mutated in place by every request.
///
/// The server loop owns it and hands out `&mut` to one request at a time;
/// parallel request handling would need to put it behind a mutex first.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceState {
    temperature: f32,
    humidity: f32,
    last_distance: Option<f32>,
    sensor_error: bool,
    custom_message: MessageText,
    display_mode: DisplayMode,
}

impl DeviceState {
    /// Fresh state in Custom mode showing `banner`.
    pub fn new(banner: &str) -> Self {
        let mut state = Self {
            temperature: 0.0,
            humidity: 0.0,
            last_distance: None,
            sensor_error: false,
            custom_message: String::new(),
            display_mode: DisplayMode::Custom,
        };
        state.set_custom_message(banner);
        state
    }

    /// Last successful temperature in degrees Celsius.
    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Last successful relative humidity in percent.
    pub fn humidity(&self) -> f32 {
        self.humidity
    }

    pub fn last_distance(&self) -> Option<f32> {
        self.last_distance
    }

    /// `true` exactly when the latest climate read failed; values are then stale.
    pub fn sensor_error(&self) -> bool {
        self.sensor_error
    }

    pub fn custom_message(&self) -> &str {
        &self.custom_message
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.display_mode
    }

    /// Switches mode. The custom message survives for the next switch back.
    pub fn set_display_mode(&mut self, mode: DisplayMode) {
        self.display_mode = mode;
    }

    /// Stores up to [`MESSAGE_CHARS`] characters of `text` and forces Custom mode.
    pub fn set_custom_message(&mut self, text: &str) {
        text_policy::copy_truncated(text, MESSAGE_CHARS, &mut self.custom_message);
        self.display_mode = DisplayMode::Custom;
    }

    /// Empties the message and returns to Custom mode.
    pub fn clear_message(&mut self) {
        self.custom_message.clear();
        self.display_mode = DisplayMode::Custom;
    }

    /// Accepts a successful climate read, rounded to one decimal place.
    pub fn record_climate(&mut self, reading: ClimateReading) {
        self.temperature = round_tenths(reading.temperature_c);
        self.humidity = round_tenths(reading.humidity_pct);
        self.sensor_error = false;
    }

    /// Flags a failed climate read and keeps the previous values.
    pub fn mark_sensor_error(&mut self) {
        self.sensor_error = true;
    }

    pub fn record_distance(&mut self, distance_cm: Option<f32>) {
        self.last_distance = distance_cm;
    }
}

pub(crate) fn round_tenths(value: f32) -> f32 {
    libm::roundf(value * 10.0) / 10.0
}
