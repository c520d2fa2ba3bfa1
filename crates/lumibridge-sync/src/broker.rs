//! Broker access.
//!
//! [`BrokerPublisher`] is the only surface the engine needs from the broker.
//! [`MqttPublisher`] implements it over a `rumqttc` client; the matching
//! [`rumqttc::EventLoop`] is driven by [`crate::runtime::run`].

use std::time::Duration;

use async_trait::async_trait;
use lumibridge_core::BridgeConfig;
use rumqttc::{AsyncClient, EventLoop, MqttOptions, QoS, Transport};
use tracing::trace;
use uuid::Uuid;

use crate::error::{BridgeError, BridgeResult};

/// Capacity of the request channel between client and event loop.
const REQUEST_CHANNEL_CAPACITY: usize = 64;
const KEEP_ALIVE: Duration = Duration::from_secs(60);

/// Outbound broker operations.
#[async_trait]
pub trait BrokerPublisher: Send + Sync {
    async fn publish(&self, topic: &str, payload: String, retain: bool) -> BridgeResult<()>;

    async fn subscribe(&self, filter: &str) -> BridgeResult<()>;
}

/// `rumqttc` backed publisher.
#[derive(Clone)]
pub struct MqttPublisher {
    client: AsyncClient,
}

impl MqttPublisher {
    pub fn new(client: AsyncClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BrokerPublisher for MqttPublisher {
    async fn publish(&self, topic: &str, payload: String, retain: bool) -> BridgeResult<()> {
        trace!(topic = %topic, retain, "Publishing");
        self.client
            .publish(topic, QoS::AtLeastOnce, retain, payload)
            .await
            .map_err(|e| BridgeError::Broker(format!("publish to {} failed: {}", topic, e)))
    }

    async fn subscribe(&self, filter: &str) -> BridgeResult<()> {
        self.client
            .subscribe(filter, QoS::AtLeastOnce)
            .await
            .map_err(|e| BridgeError::Broker(format!("subscribe to {} failed: {}", filter, e)))
    }
}

/// Build MQTT options from the bridge configuration.
pub fn mqtt_options(config: &BridgeConfig) -> MqttOptions {
    let client_id = format!("lumibridge-{}", Uuid::new_v4());
    let mut options = MqttOptions::new(client_id, config.broker.host.clone(), config.broker.port);
    options.set_keep_alive(KEEP_ALIVE);
    options.set_clean_session(true);

    if let Some((user, pass)) = config.mqtt_credentials() {
        options.set_credentials(user, pass);
    }

    if config.broker.tls {
        options.set_transport(Transport::tls_with_default_config());
    }

    options
}

/// Create the publisher and its event loop. No I/O happens until the event
/// loop is polled.
pub fn connect(config: &BridgeConfig) -> (MqttPublisher, EventLoop) {
    let (client, eventloop) = AsyncClient::new(mqtt_options(config), REQUEST_CHANNEL_CAPACITY);
    (MqttPublisher::new(client), eventloop)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(extra: &[(&str, &str)]) -> BridgeConfig {
        let mut env: HashMap<String, String> = [
            ("APPID", "444c476ef7135e53"),
            ("TOKEN", "0123456789abcdef0123"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        for (k, v) in extra {
            env.insert(k.to_string(), v.to_string());
        }
        BridgeConfig::from_sources(None, &env).unwrap()
    }

    #[test]
    fn test_mqtt_options() {
        let options = mqtt_options(&config(&[
            ("MQTT_URL", "mqtt://broker.lan:1884"),
            ("MQTT_USER", "bridge"),
            ("MQTT_PASS", "secret"),
        ]));

        assert_eq!(options.broker_address(), ("broker.lan".to_string(), 1884));
        assert!(options.client_id().starts_with("lumibridge-"));
        assert_eq!(options.keep_alive(), KEEP_ALIVE);
        assert!(options.clean_session());
        assert_eq!(
            options.credentials(),
            Some(("bridge".to_string(), "secret".to_string()))
        );
    }

    #[test]
    fn test_anonymous_broker() {
        let options = mqtt_options(&config(&[]));
        assert!(options.credentials().is_none());
    }

    #[test]
    fn test_client_ids_unique() {
        let config = config(&[]);
        assert_ne!(
            mqtt_options(&config).client_id(),
            mqtt_options(&config).client_id()
        );
    }
}
