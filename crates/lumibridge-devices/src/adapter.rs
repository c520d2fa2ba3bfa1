//! Device adapter interface.
//!
//! The sync engine talks to the remote camera API only through
//! [`DeviceAdapter`], so the HTTP client can be replaced by an in-memory fake
//! in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::attrs;
use crate::identity::DeviceRecord;

/// Result type for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Error type for device adapter operations.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Adapter configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// The API answered with a non-zero result code
    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },

    /// Device not found
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Operation timeout
    #[error("Operation timeout after {0}ms")]
    Timeout(u64),

    /// Other error
    #[error("Adapter error: {0}")]
    Other(#[from] anyhow::Error),
}

/// One attribute value returned by a remote query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeSample {
    pub attr: String,
    #[serde(default)]
    pub value: Value,
    /// Milliseconds since epoch as reported by the remote side
    #[serde(rename = "timeStamp", default)]
    pub time_stamp: Option<i64>,
}

impl AttributeSample {
    pub fn new(attr: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            attr: attr.into(),
            value: value.into(),
            time_stamp: Some(chrono::Utc::now().timestamp_millis()),
        }
    }

    /// Value as text: strings verbatim, numbers in decimal, booleans as `1`/`0`,
    /// `null` as empty, documents as compact JSON.
    pub fn raw_text(&self) -> String {
        match &self.value {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            Value::Number(n) => n.to_string(),
            other => other.to_string(),
        }
    }
}

/// Optional features found by probing a device once at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CapabilitySet {
    /// Dimmable white spotlight
    pub spotlight: bool,
}

/// Fixed probe set for [`DeviceAdapter::probe_capabilities`].
pub const PROBE_ATTRS: [&str; 2] = attrs::LIGHT_KEYS;

/// Read/write access to remote device attributes.
#[async_trait]
pub trait DeviceAdapter: Send + Sync {
    /// Every device visible to the account.
    async fn list_devices(&self) -> AdapterResult<Vec<DeviceRecord>>;

    /// Batched read of `attrs` for one device. Attributes the device does not
    /// have are simply absent from the result.
    async fn query_attributes(
        &self,
        attrs: &[&str],
        device_id: &str,
    ) -> AdapterResult<Vec<AttributeSample>>;

    /// Write a single attribute.
    async fn write_attribute(&self, attr: &str, value: Value, device_id: &str)
        -> AdapterResult<()>;

    /// Probe optional features with a read-only query. Never fails: errors
    /// count as "unsupported".
    async fn probe_capabilities(&self, device_id: &str) -> CapabilitySet {
        match self.query_attributes(&PROBE_ATTRS, device_id).await {
            Ok(samples) => {
                let spotlight = samples
                    .iter()
                    .any(|s| s.attr == attrs::WHITE_LIGHT_ENABLE);
                debug!(device = %device_id, spotlight, "Capability probe finished");
                CapabilitySet { spotlight }
            }
            Err(e) => {
                warn!(device = %device_id, "Could not probe capabilities: {}", e);
                CapabilitySet::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct ProbeOnly {
        answer: AdapterResult<Vec<AttributeSample>>,
    }

    #[async_trait]
    impl DeviceAdapter for ProbeOnly {
        async fn list_devices(&self) -> AdapterResult<Vec<DeviceRecord>> {
            Ok(Vec::new())
        }

        async fn query_attributes(
            &self,
            attrs: &[&str],
            _device_id: &str,
        ) -> AdapterResult<Vec<AttributeSample>> {
            assert_eq!(attrs, PROBE_ATTRS);
            match &self.answer {
                Ok(samples) => Ok(samples.clone()),
                Err(e) => Err(AdapterError::Communication(e.to_string())),
            }
        }

        async fn write_attribute(&self, _: &str, _: Value, _: &str) -> AdapterResult<()> {
            panic!("probing must not write");
        }
    }

    #[test]
    fn test_raw_text() {
        assert_eq!(AttributeSample::new("a", "1").raw_text(), "1");
        assert_eq!(AttributeSample::new("a", 42).raw_text(), "42");
        assert_eq!(AttributeSample::new("a", true).raw_text(), "1");
        assert_eq!(AttributeSample::new("a", Value::Null).raw_text(), "");
        assert_eq!(
            AttributeSample::new("a", json!({"totalsize": 10})).raw_text(),
            r#"{"totalsize":10}"#
        );
    }

    #[test]
    fn test_sample_deserialize() {
        let sample: AttributeSample =
            serde_json::from_str(r#"{"attr":"pir_enable","value":"1","timeStamp":1700000000000}"#)
                .unwrap();
        assert_eq!(sample.attr, "pir_enable");
        assert_eq!(sample.time_stamp, Some(1_700_000_000_000));

        let sample: AttributeSample = serde_json::from_str(r#"{"attr":"wifi_level"}"#).unwrap();
        assert_eq!(sample.value, Value::Null);
    }

    #[tokio::test]
    async fn test_probe_supported() {
        let adapter = ProbeOnly {
            answer: Ok(vec![
                AttributeSample::new(attrs::WHITE_LIGHT_ENABLE, "0"),
                AttributeSample::new(attrs::WHITE_LIGHT_LEVEL, "40"),
            ]),
        };
        assert!(adapter.probe_capabilities("lumi1.cam").await.spotlight);
    }

    #[tokio::test]
    async fn test_probe_absent() {
        let adapter = ProbeOnly {
            answer: Ok(vec![AttributeSample::new(attrs::WHITE_LIGHT_LEVEL, "40")]),
        };
        assert!(!adapter.probe_capabilities("lumi1.cam").await.spotlight);
    }

    #[tokio::test]
    async fn test_probe_error_is_unsupported() {
        let adapter = ProbeOnly {
            answer: Err(AdapterError::Timeout(10_000)),
        };
        assert_eq!(
            adapter.probe_capabilities("lumi1.cam").await,
            CapabilitySet::default()
        );
    }
}
