//! Rooms resource

use crate::api::client::{ApiClient, ApiRequest};
use crate::api::types::{Room, RoomDetail, RoomPayload};
use crate::error::Result;

/// Typed access to `rooms/`.
#[derive(Debug, Clone)]
pub struct RoomsApi {
    client: ApiClient,
}

impl RoomsApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Lists all rooms.
    pub async fn list(&self) -> Result<Vec<Room>> {
        self.client.send_json(ApiRequest::get("rooms/")).await
    }

    /// Fetches one room with its equipment.
    pub async fn get(&self, id: i64) -> Result<RoomDetail> {
        self.client
            .send_json(ApiRequest::get(format!("rooms/{}/", id)))
            .await
    }

    /// Creates a room.
    pub async fn create(&self, payload: &RoomPayload) -> Result<Room> {
        self.client
            .send_json(ApiRequest::post("rooms/").json(payload)?)
            .await
    }

    /// Partially updates a room.
    pub async fn update(&self, id: i64, payload: &RoomPayload) -> Result<Room> {
        self.client
            .send_json(ApiRequest::patch(format!("rooms/{}/", id)).json(payload)?)
            .await
    }

    /// Deletes a room.
    pub async fn delete(&self, id: i64) -> Result<()> {
        self.client
            .send_empty(ApiRequest::delete(format!("rooms/{}/", id)))
            .await
    }
}
