//! In-memory adapter and broker fakes shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use lumibridge_devices::{
    AdapterError, AdapterResult, AttributeSample, CapabilitySet, DeviceAdapter, DeviceIdentity,
    DeviceRecord,
};
use lumibridge_sync::{BridgeError, BridgeResult, BridgedDevice, BrokerPublisher};
use serde_json::Value;

pub const DID: &str = "lumi1.54ef44457bb9";
pub const SLUG: &str = "lumi1_54ef44457bb9";

/// Camera API fake with one attribute table per device id.
#[derive(Default)]
pub struct FakeAdapter {
    pub records: Vec<DeviceRecord>,
    pub values: Mutex<HashMap<String, HashMap<String, Value>>>,
    pub queries: Mutex<Vec<Vec<String>>>,
    pub writes: Mutex<Vec<(String, Value)>>,
    pub fail_queries: bool,
}

impl FakeAdapter {
    pub fn with_values(values: &[(&str, Value)]) -> Self {
        let table = values
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        let adapter = Self::default();
        adapter
            .values
            .lock()
            .unwrap()
            .insert(DID.to_string(), table);
        adapter
    }

    pub fn queries(&self) -> Vec<Vec<String>> {
        self.queries.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<(String, Value)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeviceAdapter for FakeAdapter {
    async fn list_devices(&self) -> AdapterResult<Vec<DeviceRecord>> {
        Ok(self.records.clone())
    }

    async fn query_attributes(
        &self,
        attrs: &[&str],
        device_id: &str,
    ) -> AdapterResult<Vec<AttributeSample>> {
        self.queries
            .lock()
            .unwrap()
            .push(attrs.iter().map(|a| a.to_string()).collect());
        if self.fail_queries {
            return Err(AdapterError::Timeout(10_000));
        }

        let values = self.values.lock().unwrap();
        let table = values
            .get(device_id)
            .ok_or_else(|| AdapterError::DeviceNotFound(device_id.to_string()))?;
        Ok(attrs
            .iter()
            .filter_map(|a| table.get(*a).map(|v| AttributeSample::new(*a, v.clone())))
            .collect())
    }

    async fn write_attribute(
        &self,
        attr: &str,
        value: Value,
        device_id: &str,
    ) -> AdapterResult<()> {
        self.writes
            .lock()
            .unwrap()
            .push((attr.to_string(), value.clone()));

        // the remote side reports written values back as strings
        let stored = match &value {
            Value::String(s) => Value::String(s.clone()),
            other => Value::String(other.to_string()),
        };
        self.values
            .lock()
            .unwrap()
            .entry(device_id.to_string())
            .or_default()
            .insert(attr.to_string(), stored);
        Ok(())
    }
}

/// Broker fake recording every publish and subscription.
#[derive(Default)]
pub struct RecordingPublisher {
    pub published: Mutex<Vec<(String, String, bool)>>,
    pub subscriptions: Mutex<Vec<String>>,
    /// Publishes to this topic fail after being recorded.
    pub fail_topic: Option<String>,
}

impl RecordingPublisher {
    pub fn published(&self) -> Vec<(String, String, bool)> {
        self.published.lock().unwrap().clone()
    }

    pub fn payloads_for(&self, topic: &str) -> Vec<String> {
        self.published()
            .into_iter()
            .filter(|(t, _, _)| t == topic)
            .map(|(_, p, _)| p)
            .collect()
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.subscriptions.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.published.lock().unwrap().clear();
        self.subscriptions.lock().unwrap().clear();
    }
}

#[async_trait]
impl BrokerPublisher for RecordingPublisher {
    async fn publish(&self, topic: &str, payload: String, retain: bool) -> BridgeResult<()> {
        self.published
            .lock()
            .unwrap()
            .push((topic.to_string(), payload, retain));
        if self.fail_topic.as_deref() == Some(topic) {
            return Err(BridgeError::Broker(format!("{} rejected", topic)));
        }
        Ok(())
    }

    async fn subscribe(&self, filter: &str) -> BridgeResult<()> {
        self.subscriptions.lock().unwrap().push(filter.to_string());
        Ok(())
    }
}

pub fn camera_record() -> DeviceRecord {
    DeviceRecord {
        did: DID.to_string(),
        device_name: "Front Door".to_string(),
        model: "lumi.camera.agl011".to_string(),
        original_name: "Camera Hub G5 Pro".to_string(),
        ..Default::default()
    }
}

pub fn bridged(spotlight: bool) -> BridgedDevice {
    BridgedDevice {
        identity: DeviceIdentity::from_record(&camera_record()),
        capabilities: CapabilitySet { spotlight },
    }
}

pub fn state_topic(domain: &str, attr: &str) -> String {
    format!("homeassistant/{}/{}/{}/state", domain, SLUG, attr)
}

pub fn command_topic(domain: &str, attr: &str) -> String {
    format!("homeassistant/{}/{}/{}/set", domain, SLUG, attr)
}
