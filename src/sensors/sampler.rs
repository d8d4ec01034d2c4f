//! Paired temperature/humidity sampling on top of a [`SensorDriver`].

use super::{ChannelId, DriverError, Measurement, SensorDriver};
use crate::error::SensorError;
use log::{debug, info};

/// Pulls matched (temperature, humidity) pairs from a sensor driver.
///
/// Both channels are read from a single `fetch`, so the pair describes the
/// same physical instant as closely as the driver allows. The only state is
/// a cache of the last successful pair.
pub struct SensorSampler<D> {
    driver: D,
    last: Option<(Measurement, Measurement)>,
}

impl<D: SensorDriver> SensorSampler<D> {
    pub fn new(driver: D) -> Self {
        Self { driver, last: None }
    }

    /// Fetch a fresh sample and read both channels from it.
    ///
    /// Any driver failure, or a reading whose fraction is out of range or
    /// of the wrong sign, maps to [`SensorError::Unavailable`] and leaves the
    /// cache untouched.
    pub fn sample(&mut self) -> Result<(Measurement, Measurement), SensorError> {
        let pair = self.read_pair().map_err(|e| SensorError::Unavailable(e.to_string()))?;

        info!("[Sensor] temp: {}; humidity: {}", pair.0, pair.1);
        self.last = Some(pair);
        Ok(pair)
    }

    fn read_pair(&mut self) -> Result<(Measurement, Measurement), DriverError> {
        self.driver.fetch()?;
        let temperature = Self::read_checked(&mut self.driver, ChannelId::AmbientTemperature)?;
        let humidity = Self::read_checked(&mut self.driver, ChannelId::Humidity)?;
        debug!(
            "[Sensor] raw {}={:?} {}={:?}",
            ChannelId::AmbientTemperature,
            temperature,
            ChannelId::Humidity,
            humidity
        );
        Ok((temperature, humidity))
    }

    fn read_checked(driver: &mut D, channel: ChannelId) -> Result<Measurement, DriverError> {
        let value = driver.read_channel(channel)?;
        if !value.is_normalized() {
            return Err(DriverError(format!(
                "{} reading {{{}, {}}} is not normalized",
                channel, value.integer_part, value.fractional_micro
            )));
        }
        Ok(value)
    }

    /// Last successfully sampled pair, if any.
    pub fn last(&self) -> Option<(Measurement, Measurement)> {
        self.last
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }
}
