//! Remote device records and their broker-facing identity.

use serde::{Deserialize, Deserializer, Serialize};

/// Manufacturer label announced for every bridged camera.
pub const MANUFACTURER: &str = "Aqara";

/// Device record from the Aqara position/device listing.
///
/// Only the fields the bridge reads are kept; the listing carries many more
/// and may send `null` for any of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceRecord {
    /// Stable device id (`did`)
    #[serde(rename = "did", deserialize_with = "null_as_default")]
    pub did: String,
    /// User-assigned display name
    #[serde(deserialize_with = "null_as_default")]
    pub device_name: String,
    /// Model identifier, e.g. `lumi.camera.agl011`
    #[serde(deserialize_with = "null_as_default")]
    pub model: String,
    /// Marketing model name, e.g. `Camera Hub G5 Pro`
    #[serde(deserialize_with = "null_as_default")]
    pub original_name: String,
    pub firmware_version: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Broker-facing identity of one bridged device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceIdentity {
    /// Remote device id, used for API calls and as the discovery identifier
    pub id: String,
    pub manufacturer: String,
    pub model: String,
    pub name: String,
    /// Topic-safe namespace for every topic of this device
    pub slug: String,
}

impl DeviceIdentity {
    pub fn from_record(record: &DeviceRecord) -> Self {
        let model = if record.original_name.is_empty() {
            record.model.clone()
        } else {
            record.original_name.clone()
        };
        let name = if record.device_name.is_empty() {
            model.clone()
        } else {
            record.device_name.clone()
        };

        Self {
            id: record.did.clone(),
            manufacturer: MANUFACTURER.to_string(),
            model,
            name,
            slug: topic_slug(&record.did),
        }
    }
}

/// Deterministic, topic-safe slug for a device id.
///
/// Characters outside `[A-Za-z0-9_-]` (including `.`, `/`, `+`, `#`) become `_`.
pub fn topic_slug(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Keep camera records, optionally narrowed to a single device id.
pub fn select_cameras(
    records: Vec<DeviceRecord>,
    model_prefix: &str,
    subject_id: Option<&str>,
) -> Vec<DeviceRecord> {
    records
        .into_iter()
        .filter(|r| !r.did.is_empty() && r.model.starts_with(model_prefix))
        .filter(|r| subject_id.map_or(true, |id| r.did == id))
        .collect()
}
