//! API base URL handling and well-known endpoint paths

use url::Url;

use crate::error::{MeetspaceError, Result};

/// Login endpoint, relative to the API base.
pub const LOGIN_PATH: &str = "auth/login";
/// Registration endpoint.
pub const REGISTER_PATH: &str = "auth/register";
/// Access credential refresh endpoint.
pub const REFRESH_PATH: &str = "auth/refresh";
/// Logout (refresh credential revocation) endpoint.
pub const LOGOUT_PATH: &str = "auth/logout";
/// "Who am I" endpoint.
pub const IDENTITY_PATH: &str = "me";

/// Prefix shared by every authentication endpoint.
const AUTH_PREFIX: &str = "auth/";

/// Normalized API base URL.
///
/// The stored URL always ends with `/` so that [`Url::join`] appends to the
/// base path instead of replacing its last segment.
///
/// # Examples
///
/// ```
/// use meetspace::api::endpoint::ApiBase;
///
/// let base = ApiBase::parse("http://localhost:8000/api").unwrap();
/// assert_eq!(
///     base.join("rooms/").unwrap().as_str(),
///     "http://localhost:8000/api/rooms/"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiBase {
    url: Url,
}

impl ApiBase {
    /// Parses and normalizes a base URL. Only `http` and `https` are accepted.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut url = Url::parse(raw.trim())
            .map_err(|e| MeetspaceError::Config(format!("Invalid API base URL {}: {}", raw, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(MeetspaceError::Config(format!(
                "API base URL must use http or https, got: {}",
                url.scheme()
            ))
            .into());
        }

        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        url.set_query(None);
        url.set_fragment(None);

        Ok(Self { url })
    }

    /// The normalized base URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Host part of the base URL, used to namespace stored credentials.
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or("localhost")
    }

    /// Resolves `path` against the base. Leading slashes are ignored so that
    /// `"/rooms/"` and `"rooms/"` resolve identically.
    pub fn join(&self, path: &str) -> Result<Url> {
        self.url
            .join(path.trim_start_matches('/'))
            .map_err(|e| MeetspaceError::Config(format!("Invalid API path {}: {}", path, e)).into())
    }

    /// Path of `url` relative to the base, if `url` lives under it.
    pub fn relative<'a>(&self, url: &'a Url) -> Option<&'a str> {
        url.as_str().strip_prefix(self.url.as_str())
    }

    /// Returns `true` if `url` targets an authentication endpoint.
    ///
    /// Calls to these endpoints are never retried after a refresh.
    pub fn is_auth_endpoint(&self, url: &Url) -> bool {
        self.relative(url)
            .is_some_and(|path| path.starts_with(AUTH_PREFIX))
    }
}

impl std::fmt::Display for ApiBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.url.as_str())
    }
}
