//! Thin HTTP client for the gateway's calls into the storage service (C7).
//! Every method folds connection failures and non-2xx bodies into
//! [`GatewayError`] so handlers never need to reason about `reqwest`
//! directly.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;

use crate::store::entity::Entity;

use super::error::GatewayError;

#[derive(Clone)]
pub struct StorageClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl StorageClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, GatewayError> {
        let response = builder
            .header("X-API-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| GatewayError::BackendUnreachable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::BackendError(format!("{status}: {body}")));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::BackendError(e.to_string()))
    }

    pub async fn get_max_index(&self, zone: i64) -> Result<Option<i64>, GatewayError> {
        #[derive(serde::Deserialize)]
        struct Resp {
            max_index: Option<i64>,
        }
        let url = format!("{}/get_max_index/{zone}", self.base_url);
        let resp: Resp = self.send(self.http.get(url)).await?;
        Ok(resp.max_index)
    }

    /// The full version stack occupying cell `(x, y, zone)`. Empty if the
    /// cell has never been written.
    pub async fn expand_all(&self, x: i64, y: i64, z: i64) -> Result<Vec<Entity>, GatewayError> {
        let url = format!("{}/expandall", self.base_url);
        self.send(self.http.post(url).json(&json!({ "x": x, "y": y, "z": z })))
            .await
    }

    pub async fn set(&self, zone: i64, entity: &Entity) -> Result<SetResponse, GatewayError> {
        let url = format!("{}/set/{zone}", self.base_url);
        self.send(self.http.post(url).json(entity)).await
    }

    pub async fn range_query(
        &self,
        zone: i64,
        bounds: &RangeBounds,
    ) -> Result<Vec<Entity>, GatewayError> {
        let url = format!("{}/range/{zone}", self.base_url);
        self.send(self.http.post(url).json(bounds)).await
    }
}

#[derive(Serialize)]
pub struct RangeBounds {
    pub x_min: i64,
    pub x_max: i64,
    pub y_min: i64,
    pub y_max: i64,
    pub limit: i64,
}

#[derive(serde::Deserialize)]
pub struct SetResponse {
    #[allow(dead_code)]
    pub status: String,
    #[allow(dead_code)]
    pub id: String,
    pub index: i64,
    pub entities: Vec<Entity>,
    #[allow(dead_code)]
    pub is_latest_on_file: bool,
}
