use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
};
use esp_hal::time::Instant;
use log::debug;
use station_core::sensor::{ClimateReading, ClimateSensor};

/// Host start signal; the DHT22 needs at least 1 ms low.
const START_LOW_US: u32 = 1_100;
const RELEASE_US: u32 = 30;
const RESPONSE_TIMEOUT_US: u64 = 200;
const BIT_TIMEOUT_US: u64 = 120;
/// High pulses longer than this encode a `1` (nominal 26-28 us vs 70 us).
const ONE_THRESHOLD_US: u64 = 50;
/// The sensor refuses to sample more often than every two seconds.
const MIN_SAMPLE_INTERVAL_MS: u64 = 2_000;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Dht22Error<PinErr> {
    Pin(PinErr),
    /// The line did not change level in time at the named stage.
    Timeout(&'static str),
    Checksum,
}

/// Single-wire DHT22 (AM2302) driver on an open-drain pin with pull-up.
#[derive(Debug)]
pub struct Dht22<P, D> {
    pin: P,
    delay: D,
    last_sample: Option<(Instant, ClimateReading)>,
}

impl<P, D> Dht22<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    pub fn new(mut pin: P, delay: D) -> Result<Self, Dht22Error<P::Error>> {
        pin.set_high().map_err(Dht22Error::Pin)?;
        Ok(Self {
            pin,
            delay,
            last_sample: None,
        })
    }

    fn read_frame(&mut self) -> Result<[u8; 5], Dht22Error<P::Error>> {
        self.pin.set_low().map_err(Dht22Error::Pin)?;
        self.delay.delay_us(START_LOW_US);
        self.pin.set_high().map_err(Dht22Error::Pin)?;
        self.delay.delay_us(RELEASE_US);

        self.wait_for_level(false, RESPONSE_TIMEOUT_US, "response low")?;
        self.wait_for_level(true, RESPONSE_TIMEOUT_US, "response high")?;
        self.wait_for_level(false, RESPONSE_TIMEOUT_US, "data preamble")?;

        let mut data = [0u8; 5];
        for byte in data.iter_mut() {
            for _ in 0..8 {
                self.wait_for_level(true, BIT_TIMEOUT_US, "bit high")?;
                let start = Instant::now();
                self.wait_for_level(false, BIT_TIMEOUT_US, "bit low")?;
                *byte = (*byte << 1) | u8::from(start.elapsed().as_micros() > ONE_THRESHOLD_US);
            }
        }

        Ok(data)
    }

    fn wait_for_level(
        &mut self,
        high: bool,
        timeout_us: u64,
        stage: &'static str,
    ) -> Result<(), Dht22Error<P::Error>> {
        let start = Instant::now();
        while start.elapsed().as_micros() <= timeout_us {
            if self.pin.is_high().map_err(Dht22Error::Pin)? == high {
                return Ok(());
            }
        }
        Err(Dht22Error::Timeout(stage))
    }
}

impl<P, D> ClimateSensor for Dht22<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    type Error = Dht22Error<P::Error>;

    fn read(&mut self) -> Result<ClimateReading, Self::Error> {
        if let Some((taken_at, reading)) = self.last_sample
            && taken_at.elapsed().as_millis() < MIN_SAMPLE_INTERVAL_MS
        {
            return Ok(reading);
        }

        // Bit timing is in the tens of microseconds; keep interrupts out of it.
        let frame = critical_section::with(|_| self.read_frame()).inspect_err(|err| {
            if let Dht22Error::Timeout(stage) = err {
                debug!("dht22: no edge at {}", stage);
            }
        })?;
        let reading = decode_frame::<P::Error>(frame).inspect_err(|_| {
            debug!("dht22: checksum mismatch on {:02x?}", frame);
        })?;
        self.last_sample = Some((Instant::now(), reading));
        Ok(reading)
    }
}

/// Decodes the 40-bit frame: humidity x10, sign-magnitude temperature x10, checksum.
pub fn decode_frame<E>(data: [u8; 5]) -> Result<ClimateReading, Dht22Error<E>> {
    let checksum = data[..4]
        .iter()
        .fold(0u8, |acc, byte| acc.wrapping_add(*byte));
    if checksum != data[4] {
        return Err(Dht22Error::Checksum);
    }

    let raw_humidity = u16::from_be_bytes([data[0], data[1]]);
    let raw_temperature = u16::from_be_bytes([data[2] & 0x7F, data[3]]);

    let mut temperature_c = raw_temperature as f32 / 10.0;
    if data[2] & 0x80 != 0 {
        temperature_c = -temperature_c;
    }

    Ok(ClimateReading {
        temperature_c,
        humidity_pct: raw_humidity as f32 / 10.0,
    })
}
