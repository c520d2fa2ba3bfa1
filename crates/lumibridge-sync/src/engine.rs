//! Sync engine.
//!
//! Owns the bridged device list and everything that moves values between the
//! camera API and the broker:
//!
//! - poll ticks: batched query per device, every sample routed through
//!   [`SyncEngine::publish_attribute`]
//! - composite entities: spotlight light and storage sensors
//! - command dispatch: `.../set` message to remote write, then a confirming
//!   re-poll of the written key

use std::sync::Arc;

use futures::future::join_all;
use lumibridge_devices::{
    attrs, catalog, lookup, normalize, select_cameras, AttributeSample, CapabilitySet,
    DeviceAdapter, DeviceIdentity, EntityDomain,
};
use serde_json::Value;
use tracing::{debug, info, trace, warn};

use crate::broker::BrokerPublisher;
use crate::command::Command;
use crate::composite::{LightState, StorageStatus};
use crate::discovery::DiscoveryPublisher;
use crate::error::{BridgeError, BridgeResult};
use crate::topic::Topics;

/// A camera selected for bridging together with its probed capabilities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgedDevice {
    pub identity: DeviceIdentity,
    pub capabilities: CapabilitySet,
}

/// List the account's devices, keep the cameras and probe each one.
///
/// Fails when the listing fails or nothing matches; both are fatal at
/// startup.
pub async fn discover_devices<A: DeviceAdapter + ?Sized>(
    adapter: &A,
    model_prefix: &str,
    subject_id: Option<&str>,
) -> BridgeResult<Vec<BridgedDevice>> {
    let records = adapter.list_devices().await?;
    let total = records.len();
    let cameras = select_cameras(records, model_prefix, subject_id);

    if cameras.is_empty() {
        let reason = match subject_id {
            Some(id) => format!("device {} is not a {}* model in {} listed", id, model_prefix, total),
            None => format!("no {}* model among {} listed devices", model_prefix, total),
        };
        return Err(BridgeError::NoDevices(reason));
    }

    let mut devices: Vec<BridgedDevice> = Vec::with_capacity(cameras.len());
    for record in &cameras {
        let identity = DeviceIdentity::from_record(record);
        if let Some(existing) = devices.iter().find(|d| d.identity.slug == identity.slug) {
            warn!(
                category = "discovery",
                device = %identity.id,
                other = %existing.identity.id,
                slug = %identity.slug,
                "Topic slug already used by another camera, skipping"
            );
            continue;
        }
        let capabilities = adapter.probe_capabilities(&identity.id).await;
        info!(
            category = "discovery",
            device = %identity.slug,
            name = %identity.name,
            model = %identity.model,
            spotlight = capabilities.spotlight,
            "Camera selected"
        );
        devices.push(BridgedDevice {
            identity,
            capabilities,
        });
    }
    Ok(devices)
}

/// Attribute synchronization and command bridging for a set of cameras.
pub struct SyncEngine<A: DeviceAdapter, P: BrokerPublisher> {
    adapter: Arc<A>,
    publisher: Arc<P>,
    discovery: DiscoveryPublisher<P>,
    topics: Topics,
    devices: Vec<BridgedDevice>,
    poll_attrs: Vec<&'static str>,
}

impl<A: DeviceAdapter, P: BrokerPublisher> SyncEngine<A, P> {
    pub fn new(
        adapter: Arc<A>,
        publisher: Arc<P>,
        devices: Vec<BridgedDevice>,
        discovery_prefix: impl Into<String>,
    ) -> Self {
        let topics = Topics::new(discovery_prefix);
        Self {
            discovery: DiscoveryPublisher::new(publisher.clone(), topics.clone()),
            adapter,
            publisher,
            topics,
            devices,
            poll_attrs: catalog::poll_attrs(),
        }
    }

    fn device_by_slug(&self, slug: &str) -> Option<&BridgedDevice> {
        self.devices.iter().find(|d| d.identity.slug == slug)
    }

    /// Replay discovery and command subscriptions for every device. Returns
    /// how many devices were announced without error.
    pub async fn announce_all(&self) -> usize {
        let mut ok = 0;
        for device in &self.devices {
            match self
                .discovery
                .announce(&device.identity, device.capabilities)
                .await
            {
                Ok(count) => {
                    ok += 1;
                    info!(
                        category = "discovery",
                        device = %device.identity.slug,
                        entities = count,
                        "Discovery announced"
                    );
                }
                Err(e) => {
                    warn!(
                        category = "discovery",
                        device = %device.identity.slug,
                        "Discovery failed: {}", e
                    );
                }
            }
        }
        ok
    }

    /// One poll cycle over all devices, concurrently.
    pub async fn poll_tick(&self) {
        let results = join_all(self.devices.iter().map(|d| self.poll_device(d))).await;
        for (device, result) in self.devices.iter().zip(results) {
            if let Err(e) = result {
                warn!(category = "poll", device = %device.identity.slug, "Poll failed: {}", e);
            }
        }
    }

    /// Query every bridged attribute of one device and publish the results.
    pub async fn poll_device(&self, device: &BridgedDevice) -> BridgeResult<()> {
        let samples = self
            .adapter
            .query_attributes(&self.poll_attrs, &device.identity.id)
            .await?;
        trace!(category = "poll", device = %device.identity.slug, samples = samples.len(), "Polled");

        let mut light_refreshed = false;
        for sample in &samples {
            let result = if attrs::LIGHT_KEYS.contains(&sample.attr.as_str()) {
                if light_refreshed {
                    continue;
                }
                light_refreshed = true;
                self.refresh_light(device).await
            } else {
                self.publish_attribute(device, sample).await
            };

            if let Err(e) = result {
                warn!(
                    category = "poll",
                    device = %device.identity.slug,
                    attr = %sample.attr,
                    "Publish failed: {}", e
                );
            }
        }
        Ok(())
    }

    /// Route one sample to its state topic(s).
    pub async fn publish_attribute(
        &self,
        device: &BridgedDevice,
        sample: &AttributeSample,
    ) -> BridgeResult<()> {
        let attr = sample.attr.as_str();

        if attrs::LIGHT_KEYS.contains(&attr) {
            return self.refresh_light(device).await;
        }

        if attr == attrs::SDCARD_STATUS {
            return self.publish_storage(device, &sample.value).await;
        }

        let entity = match lookup(attr) {
            Some(entity) => entity,
            None => return Ok(()),
        };
        let value = normalize(entity.domain, attr, &sample.raw_text());
        let topic = self
            .topics
            .state(entity.domain.as_str(), &device.identity.slug, attr);
        self.publisher.publish(&topic, value, true).await
    }

    /// Re-read both spotlight keys and publish the combined light state. An
    /// incomplete answer publishes nothing and leaves the last state in place.
    pub async fn refresh_light(&self, device: &BridgedDevice) -> BridgeResult<()> {
        if !device.capabilities.spotlight {
            return Ok(());
        }

        let samples = self
            .adapter
            .query_attributes(&attrs::LIGHT_KEYS, &device.identity.id)
            .await?;
        let raw = |key: &str| {
            samples
                .iter()
                .find(|s| s.attr == key && !s.value.is_null())
                .map(AttributeSample::raw_text)
        };
        let enable = raw(attrs::WHITE_LIGHT_ENABLE);
        let level = raw(attrs::WHITE_LIGHT_LEVEL);
        let state = match LightState::from_raw(enable.as_deref(), level.as_deref()) {
            Some(state) => state,
            None => {
                debug!(
                    category = "poll",
                    device = %device.identity.slug,
                    enable = ?enable,
                    level = ?level,
                    "Incomplete spotlight state, keeping last"
                );
                return Ok(());
            }
        };

        let topic = self.topics.state(
            EntityDomain::Light.as_str(),
            &device.identity.slug,
            attrs::SPOTLIGHT,
        );
        self.publisher.publish(&topic, state.to_payload(), true).await
    }

    /// Fan the storage document out into its four sensors. A malformed
    /// document publishes nothing.
    pub async fn publish_storage(&self, device: &BridgedDevice, raw: &Value) -> BridgeResult<()> {
        let status = match StorageStatus::parse(raw) {
            Ok(status) => status,
            Err(e) => {
                warn!(
                    category = "poll",
                    device = %device.identity.slug,
                    "Dropping storage status: {}", e
                );
                return Ok(());
            }
        };

        for (attr, value) in status.sensor_states() {
            let topic = self
                .topics
                .state(EntityDomain::Sensor.as_str(), &device.identity.slug, attr);
            self.publisher.publish(&topic, value, true).await?;
        }
        Ok(())
    }

    /// Handle one inbound broker message. Failures are logged and never
    /// affect other commands.
    pub async fn handle_message(&self, topic: &str, payload: &[u8]) {
        let parsed = match self.topics.parse_command(topic) {
            Some(parsed) => parsed,
            None => {
                debug!(category = "command", topic = %topic, "Ignoring non-command topic");
                return;
            }
        };

        let device = match self.device_by_slug(parsed.slug) {
            Some(device) => device,
            None => {
                warn!(category = "command", topic = %topic, "{}", BridgeError::UnknownDevice(parsed.slug.to_string()));
                return;
            }
        };

        let payload = String::from_utf8_lossy(payload);
        debug!(
            category = "command",
            device = %device.identity.slug,
            attr = %parsed.attr,
            payload = %payload,
            "Command received"
        );

        let command = match Command::parse(parsed.domain, parsed.attr, &payload) {
            Ok(Some(command)) => command,
            Ok(None) => {
                debug!(category = "command", topic = %topic, "No command handler for topic");
                return;
            }
            Err(e) => {
                warn!(category = "command", topic = %topic, "Rejected command: {}", e);
                return;
            }
        };

        if let Err(e) = self.execute(device, &command).await {
            warn!(
                category = "command",
                device = %device.identity.slug,
                attr = %parsed.attr,
                "Command failed: {}", e
            );
        }
    }

    /// Apply the command's writes in order, then confirm by re-polling.
    pub async fn execute(&self, device: &BridgedDevice, command: &Command) -> BridgeResult<()> {
        if matches!(command, Command::Light { .. }) && !device.capabilities.spotlight {
            debug!(category = "command", device = %device.identity.slug, "Device has no spotlight");
            return Ok(());
        }

        let writes = command.writes();
        if writes.is_empty() {
            return Ok(());
        }

        for (attr, value) in writes {
            self.adapter
                .write_attribute(attr, value, &device.identity.id)
                .await?;
        }

        let confirm = command.confirm_attr();
        let samples = self
            .adapter
            .query_attributes(&[confirm], &device.identity.id)
            .await?;
        for sample in &samples {
            self.publish_attribute(device, sample).await?;
        }
        Ok(())
    }
}
