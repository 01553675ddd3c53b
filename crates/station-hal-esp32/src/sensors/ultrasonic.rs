use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
};
use esp_hal::time::Instant;
use station_core::sensor::RangeSensor;

const TRIGGER_SETTLE_US: u32 = 2;
const TRIGGER_PULSE_US: u32 = 10;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum UltrasonicError<TrigErr, EchoErr> {
    Trig(TrigErr),
    Echo(EchoErr),
}

/// HC-SR04 style pulse-echo ranger.
///
/// Both the wait for the echo to start and the echo itself are bounded by
/// `timeout_us`; exceeding either is reported as no reading.
#[derive(Debug)]
pub struct Ultrasonic<TRIG, ECHO, D> {
    trig: TRIG,
    echo: ECHO,
    delay: D,
    timeout_us: u32,
}

impl<TRIG, ECHO, D> Ultrasonic<TRIG, ECHO, D>
where
    TRIG: OutputPin,
    ECHO: InputPin,
    D: DelayNs,
{
    pub fn new(trig: TRIG, echo: ECHO, delay: D, timeout_us: u32) -> Self {
        Self {
            trig,
            echo,
            delay,
            timeout_us,
        }
    }

    fn wait_for_level(
        &mut self,
        high: bool,
        since: Instant,
    ) -> Result<bool, UltrasonicError<TRIG::Error, ECHO::Error>> {
        while since.elapsed().as_micros() <= u64::from(self.timeout_us) {
            if self.echo.is_high().map_err(UltrasonicError::Echo)? == high {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl<TRIG, ECHO, D> RangeSensor for Ultrasonic<TRIG, ECHO, D>
where
    TRIG: OutputPin,
    ECHO: InputPin,
    D: DelayNs,
{
    type Error = UltrasonicError<TRIG::Error, ECHO::Error>;

    fn echo_time_us(&mut self) -> Result<Option<u32>, Self::Error> {
        self.trig.set_low().map_err(UltrasonicError::Trig)?;
        self.delay.delay_us(TRIGGER_SETTLE_US);
        self.trig.set_high().map_err(UltrasonicError::Trig)?;
        self.delay.delay_us(TRIGGER_PULSE_US);
        self.trig.set_low().map_err(UltrasonicError::Trig)?;

        if !self.wait_for_level(true, Instant::now())? {
            return Ok(None);
        }
        let rise = Instant::now();
        if !self.wait_for_level(false, rise)? {
            return Ok(None);
        }

        let echo_us = rise.elapsed().as_micros();
        Ok(u32::try_from(echo_us).ok())
    }
}
