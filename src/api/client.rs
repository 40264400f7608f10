//! Request pipeline for protected API calls
//!
//! [`ApiClient::send`] wraps every call to a booking resource:
//!
//! 1. the current access credential is attached as a bearer token, if any;
//! 2. the request is dispatched;
//! 3. a `401` triggers one re-authentication and one re-dispatch;
//! 4. a second `401`, or a failed re-authentication, ends the session and
//!    yields [`MeetspaceError::AuthorizationFailure`].
//!
//! Every other failure status is normalized into [`MeetspaceError::Api`]
//! and returned without retry. Authentication endpoints are never retried.

use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::api::endpoint::ApiBase;
use crate::api::normalize;
use crate::auth::credentials::CredentialPersistence;
use crate::auth::gateway::IdentityGateway;
use crate::auth::manager::SessionManager;
use crate::config::ApiConfig;
use crate::error::{MeetspaceError, Result};

/// Builds the shared HTTP client.
///
/// In cookie mode the client keeps a cookie jar so the server-set refresh
/// cookie is replayed on refresh and logout.
pub fn build_http_client(
    config: &ApiConfig,
    persistence: CredentialPersistence,
) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .user_agent(config.user_agent.clone());

    if !persistence.exposes_refresh() {
        builder = builder.cookie_store(true);
    }

    Ok(builder.build().map_err(MeetspaceError::Http)?)
}

/// One logical API call.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
}

impl ApiRequest {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    /// `GET path`
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// `POST path`
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// `PATCH path`
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    /// `DELETE path`
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Appends query string pairs.
    pub fn query<K, V, I>(mut self, pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Sets a JSON body.
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Path relative to the API base.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }
}

/// Client for protected API calls, sharing the session's HTTP client and
/// credentials.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: ApiBase,
    gateway: IdentityGateway,
}

impl ApiClient {
    /// Creates a client bound to `session`.
    pub fn new(session: &SessionManager) -> Self {
        Self {
            http: session.http().clone(),
            base: session.base().clone(),
            gateway: session.gateway().clone(),
        }
    }

    /// Sends `request` and deserializes a JSON response.
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let response = self.send(request).await?;
        Ok(response
            .json::<T>()
            .await
            .map_err(normalize::from_transport)?)
    }

    /// Sends `request` and discards the response body.
    pub async fn send_empty(&self, request: ApiRequest) -> Result<()> {
        self.send(request).await?;
        Ok(())
    }

    /// Sends `request` through the pipeline and returns the successful
    /// response.
    ///
    /// # Errors
    ///
    /// - [`MeetspaceError::AuthorizationFailure`] if the call stayed
    ///   unauthorized after re-authentication, or re-authentication failed.
    ///   The session has been terminated in both cases.
    /// - [`MeetspaceError::Api`] for every other failure.
    pub async fn send(&self, request: ApiRequest) -> Result<reqwest::Response> {
        let url = self.base.join(&request.path)?;
        let mut credential = self.gateway.access_credential();
        let mut retried = false;

        loop {
            let response = self.dispatch(&url, &request, credential.as_deref()).await?;
            if response.status() != StatusCode::UNAUTHORIZED {
                return Self::check(response).await;
            }

            let failure = normalize::from_response(response).await;
            if self.base.is_auth_endpoint(&url) {
                return Err(failure.into());
            }
            if retried {
                tracing::debug!(path = %request.path, "Still unauthorized after retry");
                self.gateway.expire_session();
                return Err(MeetspaceError::AuthorizationFailure(message_of(failure)).into());
            }

            retried = true;
            credential = Some(self.reauthenticate(credential.as_deref()).await?);
            tracing::debug!(method = %request.method, path = %request.path, "Retrying after re-authentication");
        }
    }

    /// Produces a credential to retry with after a `401` obtained with
    /// `used`.
    async fn reauthenticate(&self, used: Option<&str>) -> Result<String> {
        match (used, self.gateway.access_credential()) {
            (Some(used), Some(current)) if used != current => {
                tracing::debug!("Access credential already replaced; retrying without refresh");
                return Ok(current);
            }
            (Some(_), None) => {
                return Err(MeetspaceError::AuthorizationFailure(
                    "Session ended while the request was in flight".to_string(),
                )
                .into());
            }
            _ => {}
        }

        match self.gateway.refresh().await {
            Ok(access) => Ok(access),
            Err(e) => {
                tracing::debug!("Re-authentication failed: {}", e);
                self.gateway.expire_session();
                let message = match e.downcast_ref::<MeetspaceError>() {
                    Some(MeetspaceError::RefreshRejected(m)) => m.clone(),
                    Some(MeetspaceError::Api { message, .. }) => message.clone(),
                    _ => e.to_string(),
                };
                Err(MeetspaceError::AuthorizationFailure(message).into())
            }
        }
    }

    async fn dispatch(
        &self,
        url: &Url,
        request: &ApiRequest,
        credential: Option<&str>,
    ) -> Result<reqwest::Response> {
        let mut builder = self.http.request(request.method.clone(), url.clone());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(token) = credential {
            builder = builder.bearer_auth(token);
        }

        Ok(builder.send().await.map_err(normalize::from_transport)?)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(normalize::from_response(response).await.into())
        }
    }
}

fn message_of(err: MeetspaceError) -> String {
    match err {
        MeetspaceError::Api { message, .. } => message,
        other => other.to_string(),
    }
}
