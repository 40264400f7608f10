//! Reservations resource

use crate::api::client::{ApiClient, ApiRequest};
use crate::api::types::{Reservation, ReservationCreate, ReservationFilter};
use crate::error::Result;

/// Typed access to `reservations/`.
#[derive(Debug, Clone)]
pub struct ReservationsApi {
    client: ApiClient,
}

impl ReservationsApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Lists reservations matching `filter`.
    pub async fn list(&self, filter: &ReservationFilter) -> Result<Vec<Reservation>> {
        let request = ApiRequest::get("reservations/").query(filter.query_pairs());
        self.client.send_json(request).await
    }

    pub async fn get(&self, id: i64) -> Result<Reservation> {
        self.client
            .send_json(ApiRequest::get(format!("reservations/{}/", id)))
            .await
    }

    /// Books a room. The reservation starts out `pending`.
    pub async fn create(&self, payload: &ReservationCreate) -> Result<Reservation> {
        self.client
            .send_json(ApiRequest::post("reservations/").json(payload)?)
            .await
    }

    pub async fn confirm(&self, id: i64) -> Result<Reservation> {
        self.client
            .send_json(ApiRequest::post(format!("reservations/{}/confirm/", id)))
            .await
    }

    pub async fn cancel(&self, id: i64) -> Result<Reservation> {
        self.client
            .send_json(ApiRequest::post(format!("reservations/{}/cancel/", id)))
            .await
    }
}
