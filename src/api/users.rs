//! Administrative user management resource

use crate::api::client::{ApiClient, ApiRequest};
use crate::api::types::{AdminUser, AdminUserCreate, AdminUserUpdate, PasswordReset};
use crate::error::Result;

/// Typed access to `admin/users/`. Every call requires the admin role.
#[derive(Debug, Clone)]
pub struct UsersApi {
    client: ApiClient,
}

impl UsersApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Lists users, optionally narrowed by a server-side search.
    pub async fn list(&self, search: Option<&str>) -> Result<Vec<AdminUser>> {
        let mut request = ApiRequest::get("admin/users/");
        if let Some(search) = search.filter(|s| !s.trim().is_empty()) {
            request = request.query([("search", search.trim())]);
        }
        self.client.send_json(request).await
    }

    pub async fn get(&self, id: i64) -> Result<AdminUser> {
        self.client
            .send_json(ApiRequest::get(format!("admin/users/{}/", id)))
            .await
    }

    pub async fn create(&self, payload: &AdminUserCreate) -> Result<AdminUser> {
        self.client
            .send_json(ApiRequest::post("admin/users/").json(payload)?)
            .await
    }

    pub async fn update(&self, id: i64, payload: &AdminUserUpdate) -> Result<AdminUser> {
        self.client
            .send_json(ApiRequest::patch(format!("admin/users/{}/", id)).json(payload)?)
            .await
    }

    /// Deletes a user. The server refuses to delete the caller's own account.
    pub async fn delete(&self, id: i64) -> Result<()> {
        self.client
            .send_empty(ApiRequest::delete(format!("admin/users/{}/", id)))
            .await
    }

    pub async fn reset_password(&self, id: i64, password: &str) -> Result<()> {
        let payload = PasswordReset {
            password: password.to_string(),
        };
        self.client
            .send_empty(
                ApiRequest::post(format!("admin/users/{}/reset-password/", id)).json(&payload)?,
            )
            .await
    }
}
