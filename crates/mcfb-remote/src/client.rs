//! HTTP client for the Data Commons v1 REST API.

use crate::{Direction, KgClient, PropertyLabels, PropertyValue, RemoteError};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Default API root of the public Data Commons instance.
pub const API_ROOT: &str = "https://api.datacommons.org";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct PropertiesPayload {
    #[serde(default)]
    properties: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ValuesPayload {
    /// Absent entirely when the dcid (or label) is unknown remotely.
    values: Option<Vec<PropertyValue>>,
}

/// `reqwest`-backed [`KgClient`] against the v1 REST endpoints.
pub struct DataCommonsClient {
    client: reqwest::Client,
    api_root: String,
}

impl Default for DataCommonsClient {
    fn default() -> Self {
        Self::new()
    }
}

impl DataCommonsClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to create HTTP client");
        DataCommonsClient {
            client,
            api_root: API_ROOT.to_string(),
        }
    }

    /// Points the client at a different API deployment.
    pub fn with_api_root(mut self, api_root: impl Into<String>) -> Self {
        self.api_root = api_root.into();
        self
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, RemoteError> {
        let url = format!("{}{path}", self.api_root);
        let response = self.client.get(&url).send().await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl KgClient for DataCommonsClient {
    async fn property_labels(&self, dcid: &str) -> Result<PropertyLabels, RemoteError> {
        let out_path = format!("/v1/properties/out/{dcid}");
        let in_path = format!("/v1/properties/in/{dcid}");
        let (out_payload, in_payload): (PropertiesPayload, PropertiesPayload) =
            tokio::try_join!(self.get_json(&out_path), self.get_json(&in_path))?;
        Ok(PropertyLabels {
            out_labels: out_payload.properties,
            in_labels: in_payload.properties,
        })
    }

    async fn property_values(
        &self,
        dcid: &str,
        label: &str,
        direction: Direction,
    ) -> Result<Vec<PropertyValue>, RemoteError> {
        let payload: ValuesPayload = self
            .get_json(&format!(
                "/v1/property/values/{}/{dcid}/{label}",
                direction.as_str()
            ))
            .await?;
        payload.values.ok_or_else(|| RemoteError::NoValues {
            dcid: dcid.to_string(),
            label: label.to_string(),
        })
    }

    async fn exists_in_kg(&self, dcid: &str) -> Result<bool, RemoteError> {
        // A known dcid answers with a "values" list (possibly empty); an
        // unknown one answers with an empty object.
        let payload: ValuesPayload = self
            .get_json(&format!("/v1/property/values/out/{dcid}/typeOf"))
            .await?;
        Ok(payload.values.is_some())
    }

    async fn name_of(&self, dcid: &str) -> Result<String, RemoteError> {
        let payload: ValuesPayload = self
            .get_json(&format!("/v1/property/values/out/{dcid}/name"))
            .await?;
        let name = payload
            .values
            .unwrap_or_default()
            .into_iter()
            .find_map(|v| v.value);
        Ok(name.unwrap_or_else(|| dcid.to_string()))
    }
}
