//! Composite entities backed by more than one remote value.
//!
//! - spotlight light: `white_light_enable` + `white_light_level` (percent)
//!   shown as `{state, brightness}` with brightness on the 0–255 scale
//! - storage sensors: the `sdcard_status` JSON document fanned out into
//!   total, free, status and used percent

use lumibridge_devices::attrs;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BridgeError, BridgeResult};

/// Spotlight level percent (0–100) to brightness (0–255), nearest integer.
pub fn percent_to_brightness(percent: f64) -> u8 {
    (percent.clamp(0.0, 100.0) / 100.0 * 255.0).round() as u8
}

/// Brightness (0–255) to spotlight level percent (0–100), nearest integer.
pub fn brightness_to_percent(brightness: f64) -> u8 {
    (brightness.clamp(0.0, 255.0) / 255.0 * 100.0).round() as u8
}

/// Controller-facing spotlight state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LightState {
    pub state: &'static str,
    pub brightness: u8,
}

impl LightState {
    /// Combine the raw enable and level values. Both must be present and the
    /// level must be a finite number; otherwise there is no state to show.
    pub fn from_raw(enable: Option<&str>, level: Option<&str>) -> Option<Self> {
        let enable = enable?;
        let percent = level?
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|p| p.is_finite())?;
        Some(Self {
            state: if enable == "1" { "ON" } else { "OFF" },
            brightness: percent_to_brightness(percent),
        })
    }

    pub fn to_payload(&self) -> String {
        format!(r#"{{"state":"{}","brightness":{}}}"#, self.state, self.brightness)
    }
}

/// Spotlight command payload, e.g. `{"state":"ON","brightness":128}`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LightCommand {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub brightness: Option<f64>,
}

impl LightCommand {
    pub fn parse(payload: &str) -> BridgeResult<Self> {
        let command: LightCommand = serde_json::from_str(payload)
            .map_err(|e| BridgeError::Payload(format!("light command: {}", e)))?;
        if let Some(b) = command.brightness {
            if !b.is_finite() {
                return Err(BridgeError::Payload("light brightness is not finite".to_string()));
            }
        }
        Ok(command)
    }
}

/// Parsed `sdcard_status` document.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageStatus {
    pub total: f64,
    pub free: f64,
    pub status: String,
}

impl StorageStatus {
    /// Parse the raw attribute value: either a JSON string holding the
    /// document or the document itself. Sizes may be numbers or numeric
    /// strings.
    pub fn parse(raw: &Value) -> BridgeResult<Self> {
        let document = match raw {
            Value::String(s) => serde_json::from_str::<Value>(s)
                .map_err(|e| BridgeError::Payload(format!("sdcard_status: {}", e)))?,
            Value::Object(_) => raw.clone(),
            other => {
                return Err(BridgeError::Payload(format!(
                    "sdcard_status: expected a JSON document, got {}",
                    other
                )))
            }
        };

        let object = document.as_object().ok_or_else(|| {
            BridgeError::Payload("sdcard_status: document is not an object".to_string())
        })?;

        let number = |key: &str| -> BridgeResult<f64> {
            let value = object
                .get(key)
                .ok_or_else(|| BridgeError::Payload(format!("sdcard_status: missing {}", key)))?;
            let parsed = match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            parsed
                .filter(|n| n.is_finite())
                .ok_or_else(|| BridgeError::Payload(format!("sdcard_status: {} is not a number", key)))
        };

        let total = number("totalsize")?;
        let free = number("freesize")?;
        let status = match object.get("sdstatus") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => {
                return Err(BridgeError::Payload("sdcard_status: missing sdstatus".to_string()))
            }
            Some(other) => other.to_string(),
        };

        Ok(Self { total, free, status })
    }

    /// Used space in percent, clamped to `0..=100`. A zero total reports 0.
    pub fn used_percent(&self) -> u8 {
        if self.total <= 0.0 {
            return 0;
        }
        (100.0 * (self.total - self.free) / self.total)
            .round()
            .clamp(0.0, 100.0) as u8
    }

    /// State payloads keyed by sensor object id, in publish order.
    pub fn sensor_states(&self) -> [(&'static str, String); 4] {
        [
            (attrs::SDCARD_TOTAL, format_size(self.total)),
            (attrs::SDCARD_FREE, format_size(self.free)),
            (attrs::SDCARD_STATUS, self.status.clone()),
            (attrs::SDCARD_PERCENT, self.used_percent().to_string()),
        ]
    }
}

fn format_size(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        (value as i64).to_string()
    } else {
        value.to_string()
    }
}
