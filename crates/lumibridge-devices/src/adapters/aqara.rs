//! Aqara open API adapter.
//!
//! Talks to the Aqara cloud RPC endpoints over HTTPS:
//!
//! - `POST /app/v1.0/lumi/res/query` batched attribute read
//! - `POST /app/v1.0/lumi/res/write` single attribute write
//! - `GET /app/v1.0/lumi/app/position/device/query` device listing
//!
//! Every response is wrapped in `{code, message, result}`; a non-zero `code`
//! is reported as [`AdapterError::Api`].

use std::time::Duration;

use async_trait::async_trait;
use lumibridge_core::BridgeConfig;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, trace};
use url::Url;

use crate::adapter::{AdapterError, AdapterResult, AttributeSample, DeviceAdapter};
use crate::identity::DeviceRecord;

const QUERY_PATH: &str = "/app/v1.0/lumi/res/query";
const WRITE_PATH: &str = "/app/v1.0/lumi/res/write";
const DEVICES_PATH: &str = "/app/v1.0/lumi/app/position/device/query";

/// Connection settings for [`AqaraClient`].
#[derive(Debug, Clone)]
pub struct AqaraClientConfig {
    pub base_url: Url,
    pub app_id: String,
    pub token: String,
    pub timeout: Duration,
}

impl AqaraClientConfig {
    pub fn from_bridge_config(config: &BridgeConfig) -> Self {
        Self {
            base_url: config.api_url.clone(),
            app_id: config.app_id.clone(),
            token: config.token.clone(),
            timeout: config.request_timeout,
        }
    }
}

/// Response envelope shared by every endpoint.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default = "Option::default")]
    result: Option<T>,
}

impl<T> Envelope<T> {
    fn into_result(self) -> AdapterResult<Option<T>> {
        if self.code != 0 {
            return Err(AdapterError::Api {
                code: self.code,
                message: self.message.unwrap_or_default(),
            });
        }
        Ok(self.result)
    }
}

#[derive(Debug, Default, Deserialize)]
struct DeviceListing {
    #[serde(default)]
    devices: Vec<DeviceRecord>,
}

/// HTTP client for the Aqara open API.
pub struct AqaraClient {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl AqaraClient {
    /// Create a client; credentials are attached to every request.
    pub fn new(config: AqaraClientConfig) -> AdapterResult<Self> {
        let headers = default_headers(&config.app_id, &config.token)?;
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| AdapterError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url,
            timeout: config.timeout,
        })
    }

    fn endpoint(&self, path: &str) -> AdapterResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| AdapterError::Configuration(format!("Invalid endpoint {}: {}", path, e)))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> AdapterResult<Option<T>> {
        let response = request.send().await.map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::Communication(format!("HTTP error: {}", status)));
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| AdapterError::Communication(format!("JSON parse error: {}", e)))?;
        envelope.into_result()
    }

    fn map_send_error(&self, e: reqwest::Error) -> AdapterError {
        if e.is_timeout() {
            AdapterError::Timeout(self.timeout.as_millis() as u64)
        } else if e.is_connect() {
            AdapterError::Connection(format!("HTTP request failed: {}", e))
        } else {
            AdapterError::Communication(format!("HTTP request failed: {}", e))
        }
    }
}

fn default_headers(app_id: &str, token: &str) -> AdapterResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/json; charset=utf-8"),
    );
    headers.insert(HeaderName::from_static("sys-type"), HeaderValue::from_static("1"));

    let value = |name: &str, v: &str| {
        HeaderValue::from_str(v)
            .map_err(|_| AdapterError::Configuration(format!("{} contains invalid characters", name)))
    };
    headers.insert(HeaderName::from_static("appid"), value("APPID", app_id)?);
    headers.insert(HeaderName::from_static("token"), value("TOKEN", token)?);
    Ok(headers)
}

/// Request body for a batched attribute query.
pub fn query_body(attrs: &[&str], device_id: &str) -> Value {
    json!({ "data": [{ "options": attrs, "subjectId": device_id }] })
}

/// Request body for a single attribute write.
pub fn write_body(attr: &str, value: Value, device_id: &str) -> Value {
    let mut data = serde_json::Map::new();
    data.insert(attr.to_string(), value);
    json!({ "subjectId": device_id, "data": data })
}

#[async_trait]
impl DeviceAdapter for AqaraClient {
    async fn list_devices(&self) -> AdapterResult<Vec<DeviceRecord>> {
        let url = self.endpoint(DEVICES_PATH)?;
        let listing: Option<DeviceListing> = self.send(self.client.get(url)).await?;
        let devices = listing.unwrap_or_default().devices;
        debug!(count = devices.len(), "Fetched device listing");
        Ok(devices)
    }

    async fn query_attributes(
        &self,
        attrs: &[&str],
        device_id: &str,
    ) -> AdapterResult<Vec<AttributeSample>> {
        let url = self.endpoint(QUERY_PATH)?;
        let body = query_body(attrs, device_id);
        let samples: Option<Vec<AttributeSample>> =
            self.send(self.client.post(url).json(&body)).await?;
        let samples = samples.unwrap_or_default();
        trace!(device = %device_id, requested = attrs.len(), returned = samples.len(), "Queried attributes");
        Ok(samples)
    }

    async fn write_attribute(
        &self,
        attr: &str,
        value: Value,
        device_id: &str,
    ) -> AdapterResult<()> {
        let url = self.endpoint(WRITE_PATH)?;
        let body = write_body(attr, value, device_id);
        let _: Option<Value> = self.send(self.client.post(url).json(&body)).await?;
        debug!(device = %device_id, attr = %attr, "Attribute written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AqaraClientConfig {
        AqaraClientConfig {
            base_url: Url::parse("https://aiot-rpc-usa.aqara.com").unwrap(),
            app_id: "444c476ef7135e53".to_string(),
            token: "0123456789abcdef0123".to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    #[test]
    fn test_query_body() {
        let body = query_body(&["pir_enable", "system_volume"], "lumi1.cam");
        assert_eq!(
            body,
            json!({"data": [{"options": ["pir_enable", "system_volume"], "subjectId": "lumi1.cam"}]})
        );
    }

    #[test]
    fn test_write_body() {
        let body = write_body("pir_enable", json!(1), "lumi1.cam");
        assert_eq!(body, json!({"subjectId": "lumi1.cam", "data": {"pir_enable": 1}}));
    }

    #[test]
    fn test_envelope_success() {
        let envelope: Envelope<Vec<AttributeSample>> = serde_json::from_str(
            r#"{"code":0,"message":"Success","result":[{"attr":"work_mode","value":"1","timeStamp":1}]}"#,
        )
        .unwrap();
        let samples = envelope.into_result().unwrap().unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].raw_text(), "1");
    }

    #[test]
    fn test_envelope_api_error() {
        let envelope: Envelope<Vec<AttributeSample>> =
            serde_json::from_str(r#"{"code":108,"message":"Token expired"}"#).unwrap();
        let err = envelope.into_result().unwrap_err();
        assert!(matches!(err, AdapterError::Api { code: 108, .. }));
        assert!(err.to_string().contains("Token expired"));
    }

    #[test]
    fn test_device_listing_envelope() {
        let envelope: Envelope<DeviceListing> = serde_json::from_str(
            r#"{"code":0,"result":{"count":1,"devices":[{"did":"lumi1.cam","model":"lumi.camera.agl011"}]}}"#,
        )
        .unwrap();
        let listing = envelope.into_result().unwrap().unwrap();
        assert_eq!(listing.devices[0].did, "lumi1.cam");
    }

    #[test]
    fn test_endpoint_join() {
        let client = AqaraClient::new(config()).unwrap();
        assert_eq!(
            client.endpoint(QUERY_PATH).unwrap().as_str(),
            "https://aiot-rpc-usa.aqara.com/app/v1.0/lumi/res/query"
        );
    }

    #[test]
    fn test_invalid_token_rejected() {
        let mut config = config();
        config.token = "bad\ntoken-0123456789".to_string();
        assert!(matches!(
            AqaraClient::new(config),
            Err(AdapterError::Configuration(_))
        ));
    }
}
