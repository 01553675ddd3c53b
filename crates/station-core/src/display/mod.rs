//! Two-row character display state machine.
//!
//! The active [`DisplayMode`] is the only state; it changes solely through
//! explicit commands. Distance and Temperature renders fire a fresh distance
//! measurement and store it as `last_distance`, so rendering is not read-only.

use core::fmt::Write;

use heapless::String;

use crate::{
    state::{DeviceState, DisplayMode},
    text_policy::copy_truncated,
};

/// Byte capacity of one composed row (16 characters of UTF-8 plus headroom).
pub const LINE_BYTES: usize = 64;

pub type DisplayLine = String<LINE_BYTES>;

/// Character display primitives.
pub trait CharDisplay {
    type Error;

    /// Blanks the surface and homes the cursor.
    fn clear(&mut self) -> Result<(), Self::Error>;

    /// Positions the cursor (zero-based).
    fn set_cursor(&mut self, column: u8, row: u8) -> Result<(), Self::Error>;

    fn write_str(&mut self, text: &str) -> Result<(), Self::Error>;
}

/// The two rows produced by one render.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DisplayFrame {
    pub top: DisplayLine,
    pub bottom: DisplayLine,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DisplayStateMachine {
    columns: usize,
}

impl DisplayStateMachine {
    pub const fn new(columns: u8) -> Self {
        Self {
            columns: columns as usize,
        }
    }

    /// Decides what the display shows for the current mode.
    pub fn compose<F>(&self, state: &mut DeviceState, measure_distance: F) -> DisplayFrame
    where
        F: FnOnce() -> Option<f32>,
    {
        let mut frame = DisplayFrame::default();

        match state.display_mode() {
            DisplayMode::Custom => {
                let mut lines = state.custom_message().split('\n');
                if let Some(first) = lines.next() {
                    copy_truncated(first, self.columns, &mut frame.top);
                }
                if let Some(second) = lines.next() {
                    copy_truncated(second, self.columns, &mut frame.bottom);
                }
            }
            DisplayMode::Distance => {
                self.compose_distance(state, measure_distance, &mut frame.top);
            }
            DisplayMode::Temperature => {
                self.compose_distance(state, measure_distance, &mut frame.top);
                let mut scratch = DisplayLine::new();
                let _ = write!(scratch, "Temp:{:.1}C", state.temperature());
                copy_truncated(&scratch, self.columns, &mut frame.bottom);
            }
        }

        frame
    }

    /// Composes the frame and pushes it to `display`, clearing it first.
    pub fn render<D, F>(
        &self,
        state: &mut DeviceState,
        display: &mut D,
        measure_distance: F,
    ) -> Result<DisplayFrame, D::Error>
    where
        D: CharDisplay,
        F: FnOnce() -> Option<f32>,
    {
        let frame = self.compose(state, measure_distance);

        display.clear()?;
        display.write_str(&frame.top)?;
        if !frame.bottom.is_empty() {
            display.set_cursor(0, 1)?;
            display.write_str(&frame.bottom)?;
        }

        Ok(frame)
    }

    fn compose_distance<F>(
        &self,
        state: &mut DeviceState,
        measure_distance: F,
        out: &mut DisplayLine,
    ) where
        F: FnOnce() -> Option<f32>,
    {
        let distance = measure_distance();
        state.record_distance(distance);

        let mut scratch = DisplayLine::new();
        let _ = match distance {
            Some(cm) => write!(scratch, "Distance:{cm:.1}cm"),
            None => scratch.write_str("Distance: Error"),
        };
        copy_truncated(&scratch, self.columns, out);
    }
}
