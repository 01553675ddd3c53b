#![cfg_attr(not(test), no_std)]

//! HD44780 character LCD driver primitives for PCF8574 I2C backpacks.

pub mod protocol;

use embedded_hal::{delay::DelayNs, i2c::I2c};

use protocol::Register;

/// Driver configuration.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Config {
    /// 7-bit I2C address of the PCF8574 expander.
    pub address: u8,
    /// Visible characters per row.
    pub columns: u8,
    /// Visible rows.
    pub rows: u8,
    /// Backlight state applied from initialization on.
    pub backlight: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: 0x27,
            columns: 16,
            rows: 2,
            backlight: true,
        }
    }
}

impl Config {
    pub const fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    pub const fn with_geometry(mut self, columns: u8, rows: u8) -> Self {
        self.columns = columns;
        self.rows = rows;
        self
    }
}

/// Driver errors.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Error<I2cErr> {
    /// I2C transfer to the expander failed.
    I2c(I2cErr),
    /// Cursor position is outside the configured geometry.
    InvalidInput,
}

pub type DriverResult<I2cErr> = Result<(), Error<I2cErr>>;

/// HD44780 driven over a PCF8574 in 4-bit mode.
#[derive(Debug)]
pub struct Hd44780<I2C> {
    i2c: I2C,
    config: Config,
    backlight: bool,
}

impl<I2C> Hd44780<I2C>
where
    I2C: I2c,
{
    /// Creates a new driver instance. Call [`Hd44780::initialize`] before use.
    pub fn new(i2c: I2C, config: Config) -> Self {
        Self {
            i2c,
            backlight: config.backlight,
            config,
        }
    }

    /// Releases the owned bus.
    pub fn release(self) -> I2C {
        self.i2c
    }

    /// Runs the power-on reset handshake and switches to 4-bit, two-line mode.
    pub fn initialize<D>(&mut self, delay: &mut D) -> DriverResult<I2C::Error>
    where
        D: DelayNs,
    {
        self.write_expander(0x00)?;
        delay.delay_ms(20);

        self.write_nibble(protocol::RESET_NIBBLE, Register::Command)?;
        delay.delay_ms(5);
        self.write_nibble(protocol::RESET_NIBBLE, Register::Command)?;
        delay.delay_ms(1);
        self.write_nibble(protocol::RESET_NIBBLE, Register::Command)?;
        delay.delay_ms(1);
        self.write_nibble(protocol::FOUR_BIT_NIBBLE, Register::Command)?;
        delay.delay_ms(1);

        self.command(protocol::CMD_FUNCTION_4BIT_2LINE, delay)?;
        self.command(protocol::CMD_DISPLAY_ON, delay)?;
        self.command(protocol::CMD_ENTRY_MODE, delay)?;
        self.clear(delay)
    }

    /// Clears DDRAM and homes the cursor.
    pub fn clear<D>(&mut self, delay: &mut D) -> DriverResult<I2C::Error>
    where
        D: DelayNs,
    {
        self.write_byte(protocol::CMD_CLEAR, Register::Command)?;
        // Clear and home are the two slow instructions (~1.52 ms).
        delay.delay_ms(2);
        Ok(())
    }

    /// Moves the cursor to `column`/`row` (both zero-based).
    pub fn move_to<D>(&mut self, column: u8, row: u8, delay: &mut D) -> DriverResult<I2C::Error>
    where
        D: DelayNs,
    {
        let command =
            protocol::cursor_command(column, row, self.config.columns, self.config.rows)
                .ok_or(Error::InvalidInput)?;
        self.command(command, delay)
    }

    /// Writes characters at the cursor. Non-ASCII characters render as `?`.
    pub fn write_str(&mut self, text: &str) -> DriverResult<I2C::Error> {
        for ch in text.chars() {
            self.write_byte(protocol::glyph_code(ch), Register::Data)?;
        }
        Ok(())
    }

    /// Switches the backlight without touching DDRAM.
    pub fn set_backlight(&mut self, on: bool) -> DriverResult<I2C::Error> {
        self.backlight = on;
        self.write_expander(if on { protocol::BACKLIGHT_BIT } else { 0x00 })
    }

    fn command<D>(&mut self, command: u8, delay: &mut D) -> DriverResult<I2C::Error>
    where
        D: DelayNs,
    {
        self.write_byte(command, Register::Command)?;
        if command == protocol::CMD_CLEAR || command == protocol::CMD_HOME {
            delay.delay_ms(2);
        }
        Ok(())
    }

    fn write_nibble(&mut self, nibble: u8, register: Register) -> DriverResult<I2C::Error> {
        let frames = protocol::nibble_frames(nibble, register, self.backlight);
        self.i2c
            .write(self.config.address, &frames)
            .map_err(Error::I2c)
    }

    fn write_byte(&mut self, byte: u8, register: Register) -> DriverResult<I2C::Error> {
        let frames = protocol::byte_frames(byte, register, self.backlight);
        self.i2c
            .write(self.config.address, &frames)
            .map_err(Error::I2c)
    }

    fn write_expander(&mut self, value: u8) -> DriverResult<I2C::Error> {
        self.i2c
            .write(self.config.address, &[value])
            .map_err(Error::I2c)
    }
}

#[cfg(test)]
mod tests {
    use core::convert::Infallible;

    use embedded_hal::i2c::{ErrorType, Operation};

    use super::*;

    #[derive(Default)]
    struct RecordingBus {
        writes: Vec<(u8, Vec<u8>)>,
    }

    impl ErrorType for RecordingBus {
        type Error = Infallible;
    }

    impl I2c for RecordingBus {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            for op in operations {
                if let Operation::Write(bytes) = op {
                    self.writes.push((address, bytes.to_vec()));
                }
            }
            Ok(())
        }
    }

    struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    #[test]
    fn write_str_emits_one_frame_group_per_char() {
        let mut lcd = Hd44780::new(RecordingBus::default(), Config::default());
        lcd.write_str("Hi").unwrap();

        let bus = lcd.release();
        assert_eq!(bus.writes.len(), 2);
        assert!(bus.writes.iter().all(|(address, _)| *address == 0x27));
        assert_eq!(
            bus.writes[0].1,
            protocol::byte_frames(b'H', Register::Data, true).to_vec()
        );
    }

    #[test]
    fn move_to_second_row_sends_ddram_command() {
        let mut lcd = Hd44780::new(RecordingBus::default(), Config::default());
        lcd.move_to(0, 1, &mut NoDelay).unwrap();

        let bus = lcd.release();
        assert_eq!(
            bus.writes[0].1,
            protocol::byte_frames(0xC0, Register::Command, true).to_vec()
        );
    }

    #[test]
    fn move_to_outside_geometry_fails_without_bus_traffic() {
        let mut lcd = Hd44780::new(RecordingBus::default(), Config::default());
        assert_eq!(lcd.move_to(0, 2, &mut NoDelay), Err(Error::InvalidInput));
        assert!(lcd.release().writes.is_empty());
    }

    #[test]
    fn initialize_ends_with_clear() {
        let mut lcd = Hd44780::new(RecordingBus::default(), Config::default());
        lcd.initialize(&mut NoDelay).unwrap();

        let bus = lcd.release();
        assert_eq!(bus.writes[0].1, vec![0x00]);
        assert_eq!(
            bus.writes.last().map(|(_, bytes)| bytes.clone()),
            Some(protocol::byte_frames(protocol::CMD_CLEAR, Register::Command, true).to_vec())
        );
    }
}
