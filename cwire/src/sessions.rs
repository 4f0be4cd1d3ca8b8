//! Session listing, history, and mutation endpoints.
//!
//! These are plain request/response calls outside the streaming protocol.
//! Stored history tolerates mixed legacy part shapes, so the serde models
//! here are deliberately permissive.

use std::collections::HashMap;
use std::sync::Arc;

use ccommon::SessionId;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::transport::{WireFuture, error_from_response};
use crate::{NoopWireHooks, RetryPolicy, WireError, WireHooks, execute_with_retry};

const GUEST_TOKENS_HEADER: &str = "X-Guest-Tokens";

/// Hard stop for the page loop even when the backend keeps reporting more.
pub const MAX_SESSION_PAGES: u32 = 20;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub last_updated: Option<f64>,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub public_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct SessionPage {
    #[serde(default)]
    pub sessions: Vec<SessionSummary>,
    #[serde(default)]
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionHistory {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub history: Vec<RawTurn>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub is_owner: bool,
    #[serde(default)]
    pub public_id: Option<String>,
    #[serde(default)]
    pub share_url: Option<String>,
    #[serde(default)]
    pub read_only: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawTurn {
    #[serde(default)]
    pub id: Option<String>,
    pub role: String,
    #[serde(default)]
    pub parts: Vec<RawPart>,
    #[serde(default)]
    pub timestamp: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct RawPart {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub image: Option<RawImageRef>,
    #[serde(default)]
    pub file: Option<RawFileRef>,
}

/// Stored image reference; older sessions stored the bare path.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawImageRef {
    Path(String),
    Object { url_path: String },
}

impl RawImageRef {
    pub fn url_path(&self) -> &str {
        match self {
            Self::Path(path) => path,
            Self::Object { url_path } => url_path,
        }
    }
}

/// Stored file reference; older sessions stored the bare path.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawFileRef {
    Object {
        #[serde(default)]
        url_path: Option<String>,
        #[serde(default)]
        original_name: Option<String>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        mime_type: Option<String>,
        #[serde(default)]
        size: Option<u64>,
    },
    Path(String),
}

impl RawFileRef {
    pub fn url_path(&self) -> Option<&str> {
        match self {
            Self::Path(path) => Some(path),
            Self::Object { url_path, .. } => url_path.as_deref(),
        }
    }

    pub fn original_name(&self) -> Option<&str> {
        match self {
            Self::Path(_) => None,
            Self::Object {
                original_name,
                name,
                ..
            } => original_name.as_deref().or(name.as_deref()),
        }
    }

    pub fn mime_type(&self) -> Option<&str> {
        match self {
            Self::Path(_) => None,
            Self::Object { mime_type, .. } => mime_type.as_deref(),
        }
    }

    pub fn size(&self) -> u64 {
        match self {
            Self::Path(_) => 0,
            Self::Object { size, .. } => size.unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ShareState {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub public_id: Option<String>,
    #[serde(default)]
    pub share_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionListQuery {
    pub ids: Vec<String>,
    pub page: u32,
    pub page_size: u32,
    pub guest_tokens: HashMap<String, String>,
}

pub trait SessionApi: Send + Sync {
    fn list_sessions<'a>(
        &'a self,
        query: SessionListQuery,
    ) -> WireFuture<'a, Result<SessionPage, WireError>>;

    fn fetch_history<'a>(
        &'a self,
        session_id: &'a SessionId,
        guest_token: Option<&'a str>,
    ) -> WireFuture<'a, Result<SessionHistory, WireError>>;

    fn rename_session<'a>(
        &'a self,
        session_id: &'a SessionId,
        title: &'a str,
    ) -> WireFuture<'a, Result<(), WireError>>;

    fn delete_session<'a>(
        &'a self,
        session_id: &'a SessionId,
        guest_token: Option<&'a str>,
    ) -> WireFuture<'a, Result<(), WireError>>;

    fn set_shared<'a>(
        &'a self,
        session_id: &'a SessionId,
        is_public: bool,
    ) -> WireFuture<'a, Result<ShareState, WireError>>;
}

/// Fetch every page until the backend reports no more, bounded by
/// `MAX_SESSION_PAGES`.
pub async fn list_all_sessions(
    api: &dyn SessionApi,
    ids: Vec<String>,
    page_size: u32,
    guest_tokens: HashMap<String, String>,
) -> Result<Vec<SessionSummary>, WireError> {
    let mut merged = Vec::new();
    let mut page = 1;

    while page <= MAX_SESSION_PAGES {
        let query = SessionListQuery {
            ids: ids.clone(),
            page,
            page_size,
            guest_tokens: guest_tokens.clone(),
        };

        let result = api.list_sessions(query).await?;
        merged.extend(result.sessions);
        if !result.has_more {
            break;
        }

        page += 1;
    }

    Ok(merged)
}

#[derive(Clone)]
pub struct HttpSessionApi {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
    hooks: Arc<dyn WireHooks>,
}

impl HttpSessionApi {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            retry: RetryPolicy::none(),
            hooks: Arc::new(NoopWireHooks),
        }
    }

    /// Opt idempotent reads into retries; mutations are never retried here.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn WireHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn get_json<T, Build>(&self, operation: &str, build: Build) -> Result<T, WireError>
    where
        T: DeserializeOwned,
        Build: Fn() -> RequestBuilder,
    {
        execute_with_retry(
            operation,
            &self.retry,
            self.hooks.as_ref(),
            |_| {
                let builder = build();
                async move {
                    let response = builder
                        .send()
                        .await
                        .map_err(|err| WireError::transport(err.to_string()))?;

                    if !response.status().is_success() {
                        return Err(error_from_response(response).await);
                    }

                    response
                        .json::<T>()
                        .await
                        .map_err(|err| WireError::transport(err.to_string()))
                }
            },
            |delay| tokio::time::sleep(delay),
        )
        .await
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<reqwest::Response, WireError> {
        let response = builder
            .send()
            .await
            .map_err(|err| WireError::transport(err.to_string()))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        Ok(response)
    }
}

impl SessionApi for HttpSessionApi {
    fn list_sessions<'a>(
        &'a self,
        query: SessionListQuery,
    ) -> WireFuture<'a, Result<SessionPage, WireError>> {
        Box::pin(async move {
            let tokens_header = if query.guest_tokens.is_empty() {
                None
            } else {
                Some(
                    serde_json::to_string(&query.guest_tokens)
                        .map_err(|err| WireError::invalid_request(err.to_string()))?,
                )
            };

            self.get_json("list_sessions", || {
                let mut builder = self.client.get(self.endpoint("sessions")).query(&[
                    ("page", query.page.to_string()),
                    ("page_size", query.page_size.to_string()),
                ]);

                if !query.ids.is_empty() {
                    builder = builder.query(&[("ids", query.ids.join(","))]);
                }

                if let Some(tokens) = &tokens_header {
                    builder = builder.header(GUEST_TOKENS_HEADER, tokens.clone());
                }

                builder
            })
            .await
        })
    }

    fn fetch_history<'a>(
        &'a self,
        session_id: &'a SessionId,
        guest_token: Option<&'a str>,
    ) -> WireFuture<'a, Result<SessionHistory, WireError>> {
        Box::pin(async move {
            self.get_json("fetch_history", || {
                let mut builder = self
                    .client
                    .get(self.endpoint(&format!("sessions/{session_id}/history")));

                if let Some(token) = guest_token {
                    builder = builder.bearer_auth(token);
                }

                builder
            })
            .await
        })
    }

    fn rename_session<'a>(
        &'a self,
        session_id: &'a SessionId,
        title: &'a str,
    ) -> WireFuture<'a, Result<(), WireError>> {
        Box::pin(async move {
            let builder = self
                .client
                .post(self.endpoint(&format!("sessions/{session_id}/rename")))
                .json(&serde_json::json!({ "title": title }));

            self.execute(builder).await.map(|_| ())
        })
    }

    fn delete_session<'a>(
        &'a self,
        session_id: &'a SessionId,
        guest_token: Option<&'a str>,
    ) -> WireFuture<'a, Result<(), WireError>> {
        Box::pin(async move {
            let mut builder = self
                .client
                .delete(self.endpoint(&format!("sessions/{session_id}")));

            if let Some(token) = guest_token {
                builder = builder.bearer_auth(token);
            }

            self.execute(builder).await.map(|_| ())
        })
    }

    fn set_shared<'a>(
        &'a self,
        session_id: &'a SessionId,
        is_public: bool,
    ) -> WireFuture<'a, Result<ShareState, WireError>> {
        Box::pin(async move {
            let builder = self
                .client
                .post(self.endpoint(&format!("sessions/{session_id}/share")))
                .json(&serde_json::json!({ "is_public": is_public }));

            let response = self.execute(builder).await?;
            response
                .json::<ShareState>()
                .await
                .map_err(|err| WireError::transport(err.to_string()))
        })
    }
}
