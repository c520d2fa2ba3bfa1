//! Camera device access for lumibridge.
//!
//! ## Architecture
//!
//! - **Catalog**: static mapping from a remote attribute to a controller entity
//! - **Normalizer**: raw attribute value to controller display value
//! - **DeviceIdentity**: broker-facing identity and topic slug of a camera
//! - **DeviceAdapter**: read/write access to remote attributes (Aqara open API)

pub mod adapter;
pub mod adapters;
pub mod catalog;
pub mod identity;
pub mod normalize;

pub use adapter::{
    AdapterError, AdapterResult, AttributeSample, CapabilitySet, DeviceAdapter, PROBE_ATTRS,
};
pub use adapters::aqara::{AqaraClient, AqaraClientConfig};
pub use catalog::{attrs, lookup, EntityDescriptor, EntityDomain, ENTITIES};
pub use identity::{select_cameras, topic_slug, DeviceIdentity, DeviceRecord};
pub use normalize::{normalize, UNAVAILABLE};
