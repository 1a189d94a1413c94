//! reqwest-backed implementation of [`SceneApi`]

use crate::api::SceneApi;
use crate::error::RequestError;
use crate::model::{Position, PositionUpdate, ResourceId, Scene, SceneObject};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Static bearer token
///
/// Never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw token
    #[inline]
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token, for building the header
    #[inline]
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Check if the token is empty or whitespace
    #[inline]
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Connection settings for [`HttpSceneApi`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL the endpoint paths are appended to, e.g. `http://localhost:5000/api`
    pub base_url: String,
    /// Bearer token sent with every request
    pub credential: Credential,
    /// Whole-request timeout; `None` keeps the client default (no timeout)
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    /// Create config without a timeout
    #[inline]
    #[must_use]
    pub fn new(base_url: impl Into<String>, credential: Credential) -> Self {
        Self {
            base_url: base_url.into(),
            credential,
            timeout: None,
        }
    }

    /// With request timeout
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Scene API over HTTP
///
/// Every request carries `Authorization: Bearer <token>` and
/// `Content-Type: application/json`.
#[derive(Debug, Clone)]
pub struct HttpSceneApi {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpSceneApi {
    /// Build a client for `config`
    ///
    /// # Errors
    /// - `RequestError::InvalidBaseUrl` if the base URL does not parse or cannot carry a path
    /// - `RequestError::InvalidCredential` if the token is not a valid header value
    /// - `RequestError::Client` if the TLS backend fails to initialise
    pub fn new(config: &ClientConfig) -> Result<Self, RequestError> {
        let base_url = parse_base_url(&config.base_url)?;

        let mut authorization =
            HeaderValue::from_str(&format!("Bearer {}", config.credential.expose()))
                .map_err(|_| RequestError::InvalidCredential)?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, authorization);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(RequestError::Client)?;

        Ok(Self { client, base_url })
    }

    /// Base URL requests are resolved against
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve `segments` below the base URL, percent-encoding each one
    fn endpoint(&self, segments: &[&str]) -> Result<Url, RequestError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| RequestError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: "url cannot be a base".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        prepare: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<T, RequestError> {
        tracing::debug!(%method, %url, "sending request");

        let request = prepare(self.client.request(method.clone(), url.clone()));
        let response = request
            .send()
            .await
            .map_err(|source| RequestError::Transport {
                method: method.clone(),
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(%method, %url, %status, "request rejected");
            return Err(RequestError::status_error(method, url, status, &body));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| RequestError::Transport {
                method,
                url: url.to_string(),
                source,
            })?;

        serde_json::from_slice(&bytes).map_err(|source| RequestError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait::async_trait]
impl SceneApi for HttpSceneApi {
    async fn list_scenes(&self) -> Result<Vec<Scene>, RequestError> {
        let url = self.endpoint(&["scenes"])?;
        self.execute(Method::GET, url, |request| request).await
    }

    async fn list_scene_objects(
        &self,
        scene_id: &ResourceId,
    ) -> Result<Vec<SceneObject>, RequestError> {
        let url = self.endpoint(&["sceneobjects", "scene", scene_id.as_str()])?;
        self.execute(Method::GET, url, |request| request).await
    }

    async fn update_object_position(
        &self,
        object_id: &ResourceId,
        position: Position,
    ) -> Result<SceneObject, RequestError> {
        let url = self.endpoint(&["sceneobjects", object_id.as_str()])?;
        let body = PositionUpdate { position };
        self.execute(Method::PUT, url, |request| request.json(&body))
            .await
    }
}

fn parse_base_url(raw: &str) -> Result<Url, RequestError> {
    let url = Url::parse(raw.trim()).map_err(|e| RequestError::InvalidBaseUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    if url.cannot_be_a_base() {
        return Err(RequestError::InvalidBaseUrl {
            url: raw.to_string(),
            reason: "url cannot be a base".to_string(),
        });
    }

    Ok(url)
}
