//! Equipment catalogue resource

use crate::api::client::{ApiClient, ApiRequest};
use crate::api::types::{Equipment, EquipmentPayload};
use crate::error::Result;

/// Typed access to `equipment/`.
#[derive(Debug, Clone)]
pub struct EquipmentApi {
    client: ApiClient,
}

impl EquipmentApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> Result<Vec<Equipment>> {
        self.client.send_json(ApiRequest::get("equipment/")).await
    }

    pub async fn create(&self, name: &str) -> Result<Equipment> {
        let payload = EquipmentPayload {
            name: name.to_string(),
        };
        self.client
            .send_json(ApiRequest::post("equipment/").json(&payload)?)
            .await
    }

    pub async fn rename(&self, id: i64, name: &str) -> Result<Equipment> {
        let payload = EquipmentPayload {
            name: name.to_string(),
        };
        self.client
            .send_json(ApiRequest::patch(format!("equipment/{}/", id)).json(&payload)?)
            .await
    }

    /// Deletes an equipment type. The server refuses while a room uses it.
    pub async fn delete(&self, id: i64) -> Result<()> {
        self.client
            .send_empty(ApiRequest::delete(format!("equipment/{}/", id)))
            .await
    }
}
