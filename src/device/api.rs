// Device query/command surface over the controller's HTTP API

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Device API error types
#[derive(Debug, thiserror::Error)]
pub enum DeviceApiError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Unexpected response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for DeviceApiError {
    fn from(e: reqwest::Error) -> Self {
        DeviceApiError::Http(e.to_string())
    }
}

/// Where the controller lives on the network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub protocol: String,
}

impl Default for ApiConfig {
    /// The controller's factory access-point address
    fn default() -> Self {
        Self {
            host: "192.168.4.1".to_string(),
            port: 8000,
            protocol: "http".to_string(),
        }
    }
}

impl ApiConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            protocol: "http".to_string(),
        }
    }

    pub fn base_url(&self) -> String {
        format!("{}://{}:{}/api/v1", self.protocol, self.host, self.port)
    }
}

/// Read/write access to a controller.
///
/// Every read is best-effort and independent: one failing endpoint must not
/// block the others. `mode` is numeric on the wire but handled as a string
/// throughout the engine.
pub trait DeviceApi: Send + Sync {
    fn channel_count(&self) -> Result<u16, DeviceApiError>;
    fn device_name(&self) -> Result<String, DeviceApiError>;
    fn serial_number(&self) -> Result<String, DeviceApiError>;
    fn mode(&self) -> Result<String, DeviceApiError>;
    fn delay(&self) -> Result<u32, DeviceApiError>;

    fn set_mode(&self, value: &str) -> Result<(), DeviceApiError>;
    fn set_delay(&self, value: u32) -> Result<(), DeviceApiError>;
    fn set_device_name(&self, name: &str) -> Result<(), DeviceApiError>;

    /// Reachability probe, returning the round-trip time
    fn ping(&self) -> Result<Duration, DeviceApiError>;
}

/// Blocking HTTP implementation of [`DeviceApi`]
pub struct HttpDeviceApi {
    config: ApiConfig,
    client: reqwest::blocking::Client,
}

impl HttpDeviceApi {
    pub fn new(config: ApiConfig) -> Result<Self, DeviceApiError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn get_text(&self, path: &str) -> Result<String, DeviceApiError> {
        let url = format!("{}{}", self.config.base_url(), path);
        let response = self.client.get(&url).send()?;
        if !response.status().is_success() {
            return Err(DeviceApiError::Http(format!(
                "{} returned {}",
                path,
                response.status()
            )));
        }
        Ok(response.text()?)
    }

    fn get_number<T: std::str::FromStr>(&self, path: &str) -> Result<T, DeviceApiError> {
        let raw = self.get_text(path)?;
        raw.trim()
            .parse()
            .map_err(|_| DeviceApiError::Parse(format!("{}: not a number: {:?}", path, raw)))
    }
}

impl DeviceApi for HttpDeviceApi {
    fn channel_count(&self) -> Result<u16, DeviceApiError> {
        self.get_number("/data/get/device/ch")
    }

    fn device_name(&self) -> Result<String, DeviceApiError> {
        Ok(self.get_text("/data/get/device/name")?.trim().to_string())
    }

    fn serial_number(&self) -> Result<String, DeviceApiError> {
        Ok(self.get_text("/data/get/device/serial")?.trim().to_string())
    }

    fn mode(&self) -> Result<String, DeviceApiError> {
        // Stringified, but required to be numeric on the wire
        let value: i64 = self.get_number("/data/get/mode")?;
        Ok(value.to_string())
    }

    fn delay(&self) -> Result<u32, DeviceApiError> {
        self.get_number("/data/get/delay")
    }

    fn set_mode(&self, value: &str) -> Result<(), DeviceApiError> {
        self.get_text(&format!("/data/set/mode?value={}", value))
            .map(|_| ())
    }

    fn set_delay(&self, value: u32) -> Result<(), DeviceApiError> {
        self.get_text(&format!("/data/set/delay?value={}", value))
            .map(|_| ())
    }

    fn set_device_name(&self, name: &str) -> Result<(), DeviceApiError> {
        self.get_text(&format!("/data/set/device/name?value={}", name))
            .map(|_| ())
    }

    fn ping(&self) -> Result<Duration, DeviceApiError> {
        let start = Instant::now();
        self.channel_count()?;
        Ok(start.elapsed())
    }
}
