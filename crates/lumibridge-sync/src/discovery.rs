//! Home Assistant MQTT discovery announcements.
//!
//! Every bridged entity gets one retained JSON document on its `config`
//! topic. Payloads are plain structs so field order, and therefore the bytes
//! on the wire, is the same on every replay.

use std::sync::Arc;

use lumibridge_devices::{
    attrs, catalog, CapabilitySet, DeviceIdentity, EntityDescriptor, EntityDomain, ENTITIES,
};
use serde::Serialize;
use tracing::debug;

use crate::broker::BrokerPublisher;
use crate::error::{BridgeError, BridgeResult};
use crate::topic::Topics;

/// Sensors synthesized from the `sdcard_status` document.
pub static STORAGE_SENSORS: [(&str, &str, Option<&str>); 4] = [
    (attrs::SDCARD_TOTAL, "SD Card Total", Some("MB")),
    (attrs::SDCARD_FREE, "SD Card Free", Some("MB")),
    (attrs::SDCARD_STATUS, "SD Card Status", None),
    (attrs::SDCARD_PERCENT, "SD Card Used", Some("%")),
];

const SPOTLIGHT_NAME: &str = "Spotlight";
const SPOTLIGHT_ICON: &str = "mdi:spotlight-beam";

/// `device` block shared by every entity of one camera.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub identifiers: Vec<String>,
    pub manufacturer: String,
    pub model: String,
    pub name: String,
}

impl From<&DeviceIdentity> for DeviceInfo {
    fn from(identity: &DeviceIdentity) -> Self {
        Self {
            identifiers: vec![identity.id.clone()],
            manufacturer: identity.manufacturer.clone(),
            model: identity.model.clone(),
            name: identity.name.clone(),
        }
    }
}

/// Discovery document for one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveryPayload {
    pub name: String,
    pub unique_id: String,
    pub state_topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brightness: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_of_measurement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub device: DeviceInfo,
}

impl DiscoveryPayload {
    fn base(
        topics: &Topics,
        identity: &DeviceIdentity,
        domain: EntityDomain,
        attr: &str,
        name: &str,
    ) -> Self {
        Self {
            name: format!("{} {}", identity.name, name),
            unique_id: format!("{}_{}", identity.slug, attr),
            state_topic: topics.state(domain.as_str(), &identity.slug, attr),
            command_topic: None,
            schema: None,
            brightness: None,
            unit_of_measurement: None,
            icon: None,
            device: DeviceInfo::from(identity),
        }
    }

    /// Plain catalog entity.
    pub fn entity(topics: &Topics, identity: &DeviceIdentity, entity: &EntityDescriptor) -> Self {
        let mut payload = Self::base(topics, identity, entity.domain, entity.attr, entity.name);
        if entity.writable {
            payload.command_topic =
                Some(topics.command(entity.domain.as_str(), &identity.slug, entity.attr));
        }
        payload.unit_of_measurement = entity.unit.map(str::to_string);
        payload.icon = entity.icon.map(str::to_string);
        payload
    }

    /// Dimmable spotlight using the JSON light schema.
    pub fn spotlight(topics: &Topics, identity: &DeviceIdentity) -> Self {
        let domain = EntityDomain::Light;
        let mut payload = Self::base(topics, identity, domain, attrs::SPOTLIGHT, SPOTLIGHT_NAME);
        payload.command_topic = Some(topics.command(domain.as_str(), &identity.slug, attrs::SPOTLIGHT));
        payload.schema = Some("json");
        payload.brightness = Some(true);
        payload.icon = Some(SPOTLIGHT_ICON.to_string());
        payload
    }

    /// One of the [`STORAGE_SENSORS`].
    pub fn storage(
        topics: &Topics,
        identity: &DeviceIdentity,
        attr: &str,
        name: &str,
        unit: Option<&str>,
    ) -> Self {
        let mut payload = Self::base(topics, identity, EntityDomain::Sensor, attr, name);
        payload.unit_of_measurement = unit.map(str::to_string);
        payload.icon = Some("mdi:sd".to_string());
        payload
    }

    pub fn to_json(&self) -> BridgeResult<String> {
        serde_json::to_string(self)
            .map_err(|e| BridgeError::Payload(format!("discovery payload: {}", e)))
    }
}

/// Publishes discovery documents and command subscriptions.
pub struct DiscoveryPublisher<P: BrokerPublisher> {
    publisher: Arc<P>,
    topics: Topics,
}

impl<P: BrokerPublisher> DiscoveryPublisher<P> {
    pub fn new(publisher: Arc<P>, topics: Topics) -> Self {
        Self { publisher, topics }
    }

    async fn announce_payload(
        &self,
        domain: EntityDomain,
        slug: &str,
        attr: &str,
        payload: &DiscoveryPayload,
    ) -> BridgeResult<()> {
        let topic = self.topics.config(domain.as_str(), slug, attr);
        self.publisher.publish(&topic, payload.to_json()?, true).await
    }

    /// Announce one plain catalog entity.
    pub async fn publish_discovery(
        &self,
        identity: &DeviceIdentity,
        entity: &EntityDescriptor,
    ) -> BridgeResult<()> {
        let payload = DiscoveryPayload::entity(&self.topics, identity, entity);
        self.announce_payload(entity.domain, &identity.slug, entity.attr, &payload)
            .await
    }

    /// Announce the spotlight, or clear a stale announcement when the device
    /// does not have one.
    pub async fn publish_light_discovery(
        &self,
        identity: &DeviceIdentity,
        supported: bool,
    ) -> BridgeResult<()> {
        if supported {
            let payload = DiscoveryPayload::spotlight(&self.topics, identity);
            self.announce_payload(EntityDomain::Light, &identity.slug, attrs::SPOTLIGHT, &payload)
                .await
        } else {
            let topic = self
                .topics
                .config(EntityDomain::Light.as_str(), &identity.slug, attrs::SPOTLIGHT);
            self.publisher.publish(&topic, String::new(), true).await
        }
    }

    /// Announce the four storage sensors.
    pub async fn publish_storage_discovery(&self, identity: &DeviceIdentity) -> BridgeResult<()> {
        for (attr, name, unit) in STORAGE_SENSORS.iter() {
            let payload = DiscoveryPayload::storage(&self.topics, identity, attr, name, *unit);
            self.announce_payload(EntityDomain::Sensor, &identity.slug, attr, &payload)
                .await?;
        }
        Ok(())
    }

    /// Subscribe to every command topic of the device.
    pub async fn subscribe(&self, identity: &DeviceIdentity) -> BridgeResult<()> {
        self.publisher
            .subscribe(&self.topics.command_filter(&identity.slug))
            .await
    }

    /// Full announcement for one device followed by its command subscription.
    /// Returns the number of entities announced.
    pub async fn announce(
        &self,
        identity: &DeviceIdentity,
        capabilities: CapabilitySet,
    ) -> BridgeResult<usize> {
        let mut announced = 0;
        for entity in ENTITIES.iter().filter(|e| !catalog::is_composite_key(e.attr)) {
            self.publish_discovery(identity, entity).await?;
            announced += 1;
        }

        self.publish_light_discovery(identity, capabilities.spotlight)
            .await?;
        if capabilities.spotlight {
            announced += 1;
        }

        self.publish_storage_discovery(identity).await?;
        announced += STORAGE_SENSORS.len();

        self.subscribe(identity).await?;
        debug!(device = %identity.slug, announced, "Discovery published");
        Ok(announced)
    }
}
