//! Attribute synchronization and command bridging.
//!
//! ## Architecture
//!
//! - **Topics**: `<prefix>/<domain>/<slug>/<attr>/{config,state,set}` layout
//! - **DiscoveryPublisher**: retained Home Assistant announcements per device
//! - **SyncEngine**: poll ticks, composite entities and command dispatch
//! - **runtime**: drives the broker event loop and the poll timer
//!
//! The engine only sees the broker through [`BrokerPublisher`] and the camera
//! API through [`lumibridge_devices::DeviceAdapter`].

pub mod broker;
pub mod command;
pub mod composite;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod runtime;
pub mod topic;

pub use broker::{connect, mqtt_options, BrokerPublisher, MqttPublisher};
pub use command::Command;
pub use composite::{brightness_to_percent, percent_to_brightness, LightState, StorageStatus};
pub use discovery::{DeviceInfo, DiscoveryPayload, DiscoveryPublisher};
pub use engine::{discover_devices, BridgedDevice, SyncEngine};
pub use error::{BridgeError, BridgeResult};
pub use runtime::{run, LinkState};
pub use topic::{CommandTopic, Topics};
