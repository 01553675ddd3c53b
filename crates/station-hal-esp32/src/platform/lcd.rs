use embedded_hal::{delay::DelayNs, i2c::I2c};
use hd44780_i2c::{Config, Error, Hd44780};
use station_core::display::CharDisplay;

/// Board-level adapter exposing the 1602 LCD as a [`CharDisplay`].
#[derive(Debug)]
pub struct CharLcd<I2C, D> {
    lcd: Hd44780<I2C>,
    delay: D,
}

impl<I2C, D> CharLcd<I2C, D>
where
    I2C: I2c,
    D: DelayNs,
{
    pub fn new(i2c: I2C, delay: D, config: Config) -> Self {
        Self {
            lcd: Hd44780::new(i2c, config),
            delay,
        }
    }

    /// Runs the controller reset sequence and turns the backlight on.
    pub fn initialize(&mut self) -> Result<(), Error<I2C::Error>> {
        self.lcd.initialize(&mut self.delay)?;
        self.lcd.set_backlight(true)
    }
}

impl<I2C, D> CharDisplay for CharLcd<I2C, D>
where
    I2C: I2c,
    D: DelayNs,
{
    type Error = Error<I2C::Error>;

    fn clear(&mut self) -> Result<(), Self::Error> {
        self.lcd.clear(&mut self.delay)
    }

    fn set_cursor(&mut self, column: u8, row: u8) -> Result<(), Self::Error> {
        self.lcd.move_to(column, row, &mut self.delay)
    }

    fn write_str(&mut self, text: &str) -> Result<(), Self::Error> {
        self.lcd.write_str(text)
    }
}
