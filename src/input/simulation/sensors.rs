//! Simulated SI7006-class temperature/humidity sensor.
//!
//! Stands in for the hardware driver on a development host. Values drift
//! slowly so subscribers see changing notifications, and failures can be
//! injected to exercise the skip path.

use crate::sensors::{ChannelId, DriverError, Measurement, SensorDriver};
use log::info;
use parking_lot::Mutex;
use std::sync::Arc;

/// Device names the simulated driver answers to.
pub const SUPPORTED_DEVICES: &[&str] = &["SI7006", "SI7021"];

/// Fetches after which the drift direction flips.
const DRIFT_HALF_PERIOD: u32 = 30;

#[derive(Debug)]
struct SimState {
    temperature: Measurement,
    humidity: Measurement,
    latched: Option<(Measurement, Measurement)>,
    /// Per-fetch change applied to (temperature, humidity), in micro-units
    drift: Option<(i64, i64)>,
    fetches: u32,
    failing_fetches: u32,
    failing_channel: Option<ChannelId>,
}

/// Simulated sensor driver.
///
/// Cloning yields another handle to the same device, so tests and the
/// simulation task can steer a driver owned by the sampler.
#[derive(Debug, Clone)]
pub struct SimulatedSensor {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedSensor {
    /// Create a sensor that reports fixed values until changed.
    pub fn new(temperature: Measurement, humidity: Measurement) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                temperature,
                humidity,
                latched: None,
                drift: None,
                fetches: 0,
                failing_fetches: 0,
                failing_channel: None,
            })),
        }
    }

    /// Bind a simulated device by name, like a driver lookup on target.
    ///
    /// Returns `None` for names no simulated device answers to.
    pub fn bind(name: &str) -> Option<Self> {
        if !SUPPORTED_DEVICES.contains(&name) {
            return None;
        }
        info!("[Sim] Bound simulated sensor '{}'", name);
        Some(
            Self::new(Measurement::new(21, 500_000), Measurement::new(40, 200_000))
                .with_drift(20_000, -50_000),
        )
    }

    /// Enable slow drift of both readings on every fetch.
    pub fn with_drift(self, temperature_micros: i64, humidity_micros: i64) -> Self {
        self.state.lock().drift = Some((temperature_micros, humidity_micros));
        self
    }

    /// Replace the values returned by subsequent fetches.
    pub fn set_reading(&self, temperature: Measurement, humidity: Measurement) {
        let mut state = self.state.lock();
        state.temperature = temperature;
        state.humidity = humidity;
    }

    /// Make the next `count` fetches fail.
    pub fn fail_next_fetches(&self, count: u32) {
        self.state.lock().failing_fetches = count;
    }

    /// Make reads of `channel` fail until cleared with `None`.
    pub fn fail_channel(&self, channel: Option<ChannelId>) {
        self.state.lock().failing_channel = channel;
    }

    /// Number of successful fetches so far.
    pub fn fetch_count(&self) -> u32 {
        self.state.lock().fetches
    }
}

impl SensorDriver for SimulatedSensor {
    fn fetch(&mut self) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        if state.failing_fetches > 0 {
            state.failing_fetches -= 1;
            return Err(DriverError("i2c transfer timed out".into()));
        }

        if let Some((dt, dh)) = state.drift {
            let direction = if (state.fetches / DRIFT_HALF_PERIOD) % 2 == 0 {
                1
            } else {
                -1
            };
            state.temperature =
                Measurement::from_micros(state.temperature.as_micros() + direction * dt);
            state.humidity = Measurement::from_micros(state.humidity.as_micros() + direction * dh);
        }

        state.fetches += 1;
        state.latched = Some((state.temperature, state.humidity));
        Ok(())
    }

    fn read_channel(&mut self, channel: ChannelId) -> Result<Measurement, DriverError> {
        let state = self.state.lock();
        if state.failing_channel == Some(channel) {
            return Err(DriverError(format!("channel {} not ready", channel)));
        }
        let (temperature, humidity) = state
            .latched
            .ok_or_else(|| DriverError("no sample fetched".into()))?;
        Ok(match channel {
            ChannelId::AmbientTemperature => temperature,
            ChannelId::Humidity => humidity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_known_and_unknown_devices() {
        assert!(SimulatedSensor::bind("SI7006").is_some());
        assert!(SimulatedSensor::bind("BME280").is_none());
    }

    #[test]
    fn test_read_before_fetch_fails() {
        let mut sensor = SimulatedSensor::new(Measurement::new(1, 0), Measurement::new(2, 0));
        assert!(sensor.read_channel(ChannelId::Humidity).is_err());
        sensor.fetch().unwrap();
        assert_eq!(
            sensor.read_channel(ChannelId::Humidity).unwrap(),
            Measurement::new(2, 0)
        );
    }

    #[test]
    fn test_drift_changes_readings_between_fetches() {
        let mut sensor = SimulatedSensor::new(Measurement::new(20, 0), Measurement::new(50, 0))
            .with_drift(100_000, -100_000);
        sensor.fetch().unwrap();
        assert_eq!(
            sensor.read_channel(ChannelId::AmbientTemperature).unwrap(),
            Measurement::new(20, 100_000)
        );
        assert_eq!(
            sensor.read_channel(ChannelId::Humidity).unwrap(),
            Measurement::new(49, 900_000)
        );
        assert_eq!(sensor.fetch_count(), 1);
    }

    #[test]
    fn test_failed_fetch_keeps_previous_latch() {
        let mut sensor = SimulatedSensor::new(Measurement::new(20, 0), Measurement::new(50, 0));
        sensor.fetch().unwrap();
        sensor.set_reading(Measurement::new(25, 0), Measurement::new(55, 0));
        sensor.fail_next_fetches(1);
        assert!(sensor.fetch().is_err());
        assert_eq!(
            sensor.read_channel(ChannelId::AmbientTemperature).unwrap(),
            Measurement::new(20, 0)
        );
    }
}
