use embedded_hal::digital::StatefulOutputPin;
use station_core::router::Actuator;

/// Status LED on a push-pull GPIO, active high.
#[derive(Debug)]
pub struct Led<P> {
    pin: P,
}

impl<P> Led<P>
where
    P: StatefulOutputPin,
{
    pub fn new(pin: P) -> Self {
        Self { pin }
    }
}

impl<P> Actuator for Led<P>
where
    P: StatefulOutputPin,
{
    type Error = P::Error;

    fn set_on(&mut self, on: bool) -> Result<(), Self::Error> {
        if on {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        }
    }

    fn is_on(&mut self) -> bool {
        self.pin.is_set_high().unwrap_or(false)
    }
}
