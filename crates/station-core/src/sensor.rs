//! Sensor sources and the reader that turns raw samples into validated measurements.

use log::{debug, warn};

use crate::state::{DeviceState, round_tenths};

/// Speed of sound in centimeters per microsecond at room temperature.
pub const SOUND_CM_PER_US: f32 = 0.0343;

/// DHT22 rated temperature range in degrees Celsius.
pub const TEMPERATURE_RANGE_C: (f32, f32) = (-40.0, 80.0);
/// DHT22 rated relative humidity range in percent.
pub const HUMIDITY_RANGE_PCT: (f32, f32) = (0.0, 100.0);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClimateReading {
    pub temperature_c: f32,
    pub humidity_pct: f32,
}

impl ClimateReading {
    /// Rejects NaN and values outside the sensor's rated range.
    pub fn is_plausible(&self) -> bool {
        in_range(self.temperature_c, TEMPERATURE_RANGE_C)
            && in_range(self.humidity_pct, HUMIDITY_RANGE_PCT)
    }

    fn rounded(self) -> Self {
        Self {
            temperature_c: round_tenths(self.temperature_c),
            humidity_pct: round_tenths(self.humidity_pct),
        }
    }
}

fn in_range(value: f32, (min, max): (f32, f32)) -> bool {
    value >= min && value <= max
}

/// Temperature/humidity source.
pub trait ClimateSensor {
    type Error;

    /// Performs one blocking measurement.
    fn read(&mut self) -> Result<ClimateReading, Self::Error>;
}

/// Ultrasonic pulse-echo source.
pub trait RangeSensor {
    type Error;

    /// Fires one pulse and returns the echo duration in microseconds.
    ///
    /// `Ok(None)` means no echo arrived within the timeout window.
    fn echo_time_us(&mut self) -> Result<Option<u32>, Self::Error>;
}

/// Converts a round-trip echo time into a one-way distance.
pub fn echo_to_cm(echo_us: u32) -> f32 {
    echo_us as f32 * SOUND_CM_PER_US / 2.0
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SensorError<E> {
    /// The driver reported a failure (timeout, checksum, bus error).
    Driver(E),
    /// The sample decoded but lies outside the rated range.
    OutOfRange,
}

impl<E> SensorError<E> {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Driver(_) => "driver",
            Self::OutOfRange => "out of range",
        }
    }
}

/// Owns both sensor sources. Every call blocks for the hardware timing.
#[derive(Debug)]
pub struct SensorReader<C, R> {
    climate: C,
    range: R,
}

impl<C, R> SensorReader<C, R>
where
    C: ClimateSensor,
    R: RangeSensor,
{
    pub fn new(climate: C, range: R) -> Self {
        Self { climate, range }
    }

    pub fn range_sensor(&self) -> &R {
        &self.range
    }

    /// Reads temperature/humidity into `state`.
    ///
    /// On failure the previous values stay and `sensor_error` is set.
    pub fn measure(
        &mut self,
        state: &mut DeviceState,
    ) -> Result<ClimateReading, SensorError<C::Error>> {
        let result = match self.climate.read() {
            Ok(reading) if reading.is_plausible() => Ok(reading.rounded()),
            Ok(_) => Err(SensorError::OutOfRange),
            Err(err) => Err(SensorError::Driver(err)),
        };

        match result {
            Ok(reading) => state.record_climate(reading),
            Err(_) => state.mark_sensor_error(),
        }
        result
    }

    /// Fires one ultrasonic cycle. `None` on timeout or driver failure.
    ///
    /// The result is not stored; callers decide whether it becomes `last_distance`.
    pub fn measure_distance(&mut self) -> Option<f32> {
        match self.range.echo_time_us() {
            Ok(Some(echo_us)) => Some(echo_to_cm(echo_us)),
            Ok(None) => {
                debug!("distance: echo timeout");
                None
            }
            Err(_) => {
                warn!("distance: range sensor fault");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedClimate(Result<ClimateReading, ()>);

    impl ClimateSensor for FixedClimate {
        type Error = ();

        fn read(&mut self) -> Result<ClimateReading, Self::Error> {
            self.0
        }
    }

    struct FixedEcho(Result<Option<u32>, ()>);

    impl RangeSensor for FixedEcho {
        type Error = ();

        fn echo_time_us(&mut self) -> Result<Option<u32>, Self::Error> {
            self.0
        }
    }

    fn reading(temperature_c: f32, humidity_pct: f32) -> ClimateReading {
        ClimateReading {
            temperature_c,
            humidity_pct,
        }
    }

    #[test]
    fn echo_time_converts_to_half_round_trip() {
        assert!((echo_to_cm(1_000) - 17.15).abs() < 1e-4);
        assert_eq!(echo_to_cm(0), 0.0);
    }

    #[test]
    fn implausible_reading_counts_as_failure() {
        let mut state = DeviceState::new("");
        let mut reader = SensorReader::new(
            FixedClimate(Ok(reading(120.0, 50.0))),
            FixedEcho(Ok(None)),
        );
        assert_eq!(reader.measure(&mut state), Err(SensorError::OutOfRange));
        assert!(state.sensor_error());
        assert_eq!(state.temperature(), 0.0);
    }

    #[test]
    fn nan_reading_is_rejected() {
        assert!(!reading(f32::NAN, 50.0).is_plausible());
        assert!(!reading(21.0, -0.5).is_plausible());
        assert!(reading(-40.0, 100.0).is_plausible());
    }

    #[test]
    fn successful_read_clears_error_flag() {
        let mut state = DeviceState::new("");
        state.mark_sensor_error();
        let mut reader = SensorReader::new(
            FixedClimate(Ok(reading(21.26, 40.0))),
            FixedEcho(Ok(None)),
        );
        assert_eq!(reader.measure(&mut state), Ok(reading(21.3, 40.0)));
        assert!(!state.sensor_error());
        assert_eq!(state.temperature(), 21.3);
    }

    #[test]
    fn driver_fault_reads_as_no_distance() {
        let mut reader = SensorReader::new(FixedClimate(Err(())), FixedEcho(Err(())));
        assert_eq!(reader.measure_distance(), None);
    }

    #[test]
    fn distance_is_not_cached() {
        let mut state = DeviceState::new("");
        let mut reader = SensorReader::new(FixedClimate(Err(())), FixedEcho(Ok(Some(580))));
        let distance = reader.measure_distance();
        assert!(distance.is_some());
        assert_eq!(state.last_distance(), None);
        let _ = reader.measure(&mut state);
        assert_eq!(state.last_distance(), None);
    }
}
