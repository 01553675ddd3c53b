//! Wire-level protocol helpers for an HD44780 behind a PCF8574 I2C expander.
//!
//! Expander bit layout used by the common "LCD1602 I2C" backpacks:
//! - P0: RS (register select, high for data)
//! - P1: RW (always low, write only)
//! - P2: EN (enable strobe)
//! - P3: backlight
//! - P4..P7: D4..D7

/// Register-select bit.
pub const RS_BIT: u8 = 0x01;
/// Enable strobe bit.
pub const EN_BIT: u8 = 0x04;
/// Backlight bit.
pub const BACKLIGHT_BIT: u8 = 0x08;

pub const CMD_CLEAR: u8 = 0x01;
pub const CMD_HOME: u8 = 0x02;
/// Entry mode: increment cursor, no display shift.
pub const CMD_ENTRY_MODE: u8 = 0x06;
/// Display on, cursor off, blink off.
pub const CMD_DISPLAY_ON: u8 = 0x0C;
/// Function set: 4-bit bus, two lines, 5x8 font.
pub const CMD_FUNCTION_4BIT_2LINE: u8 = 0x28;
pub const CMD_SET_DDRAM: u8 = 0x80;

/// Nibble used three times during the power-on reset handshake.
pub const RESET_NIBBLE: u8 = 0x03;
/// Nibble that switches the controller into 4-bit mode.
pub const FOUR_BIT_NIBBLE: u8 = 0x02;

/// DDRAM start address of each physical row.
pub const ROW_OFFSETS: [u8; 4] = [0x00, 0x40, 0x14, 0x54];

/// Whether a transfer targets the instruction or the data register.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Register {
    Command,
    Data,
}

#[inline]
const fn control_bits(register: Register, backlight: bool) -> u8 {
    let rs = match register {
        Register::Command => 0,
        Register::Data => RS_BIT,
    };
    rs | if backlight { BACKLIGHT_BIT } else { 0 }
}

/// Builds the two expander writes that latch one nibble: EN high, then EN low.
#[inline]
pub fn nibble_frames(nibble: u8, register: Register, backlight: bool) -> [u8; 2] {
    let base = ((nibble & 0x0F) << 4) | control_bits(register, backlight);
    [base | EN_BIT, base]
}

/// Builds the four expander writes for a full byte, high nibble first.
#[inline]
pub fn byte_frames(byte: u8, register: Register, backlight: bool) -> [u8; 4] {
    let high = nibble_frames(byte >> 4, register, backlight);
    let low = nibble_frames(byte & 0x0F, register, backlight);
    [high[0], high[1], low[0], low[1]]
}

/// Builds the set-DDRAM-address command for a cursor position.
///
/// Returns `None` when the position lies outside a `columns` x `rows` panel.
#[inline]
pub fn cursor_command(column: u8, row: u8, columns: u8, rows: u8) -> Option<u8> {
    if column >= columns || row >= rows || row as usize >= ROW_OFFSETS.len() {
        return None;
    }

    Some(CMD_SET_DDRAM | (ROW_OFFSETS[row as usize] + column))
}

/// Maps a character onto the controller's ROM code page.
///
/// Printable ASCII passes through; everything else renders as `?`.
#[inline]
pub fn glyph_code(ch: char) -> u8 {
    if ch.is_ascii() && !ch.is_ascii_control() {
        ch as u8
    } else {
        b'?'
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nibble_frames_strobe_enable() {
        assert_eq!(nibble_frames(0x3, Register::Command, false), [0x34, 0x30]);
        assert_eq!(nibble_frames(0x3, Register::Command, true), [0x3C, 0x38]);
        assert_eq!(nibble_frames(0xA, Register::Data, true), [0xAD, 0xA9]);
    }

    #[test]
    fn byte_frames_send_high_nibble_first() {
        let frames = byte_frames(b'A', Register::Data, true);
        assert_eq!(frames, [0x4D, 0x49, 0x1D, 0x19]);
    }

    #[test]
    fn cursor_command_uses_row_offsets() {
        assert_eq!(cursor_command(0, 0, 16, 2), Some(0x80));
        assert_eq!(cursor_command(0, 1, 16, 2), Some(0xC0));
        assert_eq!(cursor_command(15, 1, 16, 2), Some(0xCF));
    }

    #[test]
    fn cursor_outside_panel_is_rejected() {
        assert_eq!(cursor_command(16, 0, 16, 2), None);
        assert_eq!(cursor_command(0, 2, 16, 2), None);
        assert_eq!(cursor_command(0, 4, 20, 8), None);
    }

    #[test]
    fn non_ascii_renders_as_question_mark() {
        assert_eq!(glyph_code('a'), b'a');
        assert_eq!(glyph_code(' '), b' ');
        assert_eq!(glyph_code('\u{e9}'), b'?');
        assert_eq!(glyph_code('\n'), b'?');
    }
}
