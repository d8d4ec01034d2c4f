use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
    pub sampling: SamplingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Name carried in the advertising payload
    pub name: String,
    /// Sensor device to bind at startup
    pub sensor_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub period_ms: u64,
    /// Wait between binding the sensor and the first sample
    pub settle_delay_ms: u64,
}

/// Values given on the command line. Set fields win over every other layer.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub name: Option<String>,
    pub sensor_name: Option<String>,
    pub period_ms: Option<u64>,
    pub settle_delay_ms: Option<u64>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: "SmartSensor".to_string(),
            sensor_name: "SI7006".to_string(),
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            period_ms: 2000,
            settle_delay_ms: 500,
        }
    }
}

impl Config {
    /// Load a JSON config file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        let config = serde_json::from_slice(&bytes)?;
        Ok(config)
    }

    /// Build the effective configuration.
    ///
    /// Layers, lowest first: defaults, `file`, variables from `lookup`,
    /// `overrides`. The result is validated.
    pub fn resolve(
        file: Option<&Path>,
        lookup: impl Fn(&str) -> Option<String>,
        overrides: &ConfigOverrides,
    ) -> Result<Self> {
        let mut config = match file {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_env(lookup);
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Override fields from variables resolved by `lookup`.
    ///
    /// Unparseable numbers are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(name) = lookup("DEVICE_NAME") {
            self.device.name = name;
        }
        if let Some(sensor) = lookup("SENSOR_DEVICE") {
            self.device.sensor_name = sensor;
        }
        if let Some(period) = lookup("SAMPLE_PERIOD_MS")
            && let Ok(p) = period.parse()
        {
            self.sampling.period_ms = p;
        }
        if let Some(settle) = lookup("SENSOR_SETTLE_MS")
            && let Ok(s) = settle.parse()
        {
            self.sampling.settle_delay_ms = s;
        }
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(name) = &overrides.name {
            self.device.name = name.clone();
        }
        if let Some(sensor) = &overrides.sensor_name {
            self.device.sensor_name = sensor.clone();
        }
        if let Some(period) = overrides.period_ms {
            self.sampling.period_ms = period;
        }
        if let Some(settle) = overrides.settle_delay_ms {
            self.sampling.settle_delay_ms = settle;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.device.name.is_empty() {
            return Err(BridgeError::InvalidConfig("device name is empty".into()));
        }
        if self.device.sensor_name.is_empty() {
            return Err(BridgeError::InvalidConfig("sensor name is empty".into()));
        }
        if self.sampling.period_ms == 0 {
            return Err(BridgeError::InvalidConfig(
                "sampling period must be non-zero".into(),
            ));
        }
        Ok(())
    }

    pub fn period(&self) -> Duration {
        Duration::from_millis(self.sampling.period_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.sampling.settle_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.device.name, "SmartSensor");
        assert_eq!(config.device.sensor_name, "SI7006");
        assert_eq!(config.period(), Duration::from_secs(2));
        assert_eq!(config.settle_delay(), Duration::from_millis(500));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("DEVICE_NAME", "Greenhouse"),
            ("SAMPLE_PERIOD_MS", "5000"),
            ("SENSOR_SETTLE_MS", "not-a-number"),
        ]);
        let mut config = Config::default();
        config.apply_env(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.device.name, "Greenhouse");
        assert_eq!(config.device.sensor_name, "SI7006");
        assert_eq!(config.sampling.period_ms, 5000);
        assert_eq!(config.sampling.settle_delay_ms, 500);
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"sampling": {{"period_ms": 1000}}}}"#).unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.sampling.period_ms, 1000);
        assert_eq!(config.sampling.settle_delay_ms, 500);
        assert_eq!(config.device.name, "SmartSensor");
    }

    fn config_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    #[test]
    fn test_resolve_env_beats_file() {
        let file = config_file(
            r#"{"device": {"name": "FromFile"}, "sampling": {"period_ms": 1000}}"#,
        );
        let vars: HashMap<&str, &str> = HashMap::from([("DEVICE_NAME", "FromEnv")]);

        let config = Config::resolve(
            Some(file.path()),
            |key| vars.get(key).map(|v| v.to_string()),
            &ConfigOverrides::default(),
        )
        .unwrap();
        assert_eq!(config.device.name, "FromEnv");
        assert_eq!(config.sampling.period_ms, 1000);
    }

    #[test]
    fn test_resolve_cli_beats_env_and_file() {
        let file = config_file(r#"{"device": {"name": "FromFile", "sensor_name": "SI7021"}}"#);
        let vars: HashMap<&str, &str> = HashMap::from([
            ("DEVICE_NAME", "FromEnv"),
            ("SAMPLE_PERIOD_MS", "5000"),
        ]);
        let overrides = ConfigOverrides {
            name: Some("FromCli".into()),
            period_ms: Some(250),
            ..Default::default()
        };

        let config = Config::resolve(
            Some(file.path()),
            |key| vars.get(key).map(|v| v.to_string()),
            &overrides,
        )
        .unwrap();
        assert_eq!(config.device.name, "FromCli");
        assert_eq!(config.sampling.period_ms, 250);
        // Untouched by higher layers
        assert_eq!(config.device.sensor_name, "SI7021");
        assert_eq!(config.sampling.settle_delay_ms, 500);
    }

    #[test]
    fn test_resolve_without_file_uses_defaults() {
        let config = Config::resolve(None, |_| None, &ConfigOverrides::default()).unwrap();
        assert_eq!(config.device.name, "SmartSensor");
        assert_eq!(config.period(), Duration::from_secs(2));
    }

    #[test]
    fn test_resolve_validates_final_result() {
        let overrides = ConfigOverrides {
            period_ms: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            Config::resolve(None, |_| None, &overrides),
            Err(BridgeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_resolve_missing_file_is_io_error() {
        let result = Config::resolve(
            Some(Path::new("/nonexistent/bridge.json")),
            |_| None,
            &ConfigOverrides::default(),
        );
        assert!(matches!(result, Err(BridgeError::IoError(_))));
    }

    #[test]
    fn test_validate_rejects_zero_period() {
        let mut config = Config::default();
        config.sampling.period_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(BridgeError::InvalidConfig(_))
        ));
    }
}
