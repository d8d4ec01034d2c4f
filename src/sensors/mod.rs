//! Sensor access for the environmental service.
//!
//! The hardware driver is an external collaborator reached through the
//! [`SensorDriver`] trait. [`SensorSampler`] sits on top of it and turns one
//! driver fetch into a matched (temperature, humidity) pair.

pub mod measurement;
pub mod sampler;

pub use measurement::Measurement;
pub use sampler::SensorSampler;

use std::fmt;

/// Driver channels read by the sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelId {
    AmbientTemperature,
    Humidity,
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelId::AmbientTemperature => f.write_str("ambient_temp"),
            ChannelId::Humidity => f.write_str("humidity"),
        }
    }
}

/// Error surfaced by a driver. Only its message is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverError(pub String);

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for DriverError {}

/// Contract of a temperature/humidity sensor driver.
///
/// `fetch` latches a new sample in the device; `read_channel` returns a
/// channel of the most recently fetched sample. Both may block briefly on
/// a bus transaction.
pub trait SensorDriver: Send {
    fn fetch(&mut self) -> Result<(), DriverError>;

    fn read_channel(&mut self, channel: ChannelId) -> Result<Measurement, DriverError>;
}

impl<D: SensorDriver + ?Sized> SensorDriver for Box<D> {
    fn fetch(&mut self) -> Result<(), DriverError> {
        (**self).fetch()
    }

    fn read_channel(&mut self, channel: ChannelId) -> Result<Measurement, DriverError> {
        (**self).read_channel(channel)
    }
}
