//! # HTTP Authority Client
//!
//! Production [`AuthorityClient`] over reqwest. Wraps the authority's REST
//! surface: `POST /auth/token`, `POST /notify/...`, `POST
//! /transfers/search`, `GET /transfers/{id}/archive`.
//!
//! ## Error Handling
//!
//! HTTP failures map to [`ItsError`] with the endpoint, status, and a body
//! excerpt. Timeouts map to [`ItsError::Timeout`] — the caller's records
//! stay in their last durable state and recovery is driven from there.
//!
//! ## Token Caching
//!
//! Tokens are cached until close to expiry; `fetch_token` returns the
//! cached token when it is still fresh and transparently re-authenticates
//! when it is not.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;

use pts_core::EngineConfig;

use crate::client::AuthorityClient;
use crate::error::ItsError;
use crate::retry::RetryPolicy;
use crate::types::{DateRange, Token, TransferId};

/// Authority account credentials.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Account username (GLN-bound in most deployments).
    pub username: String,
    /// Account password.
    pub password: String,
}

/// HTTP implementation of [`AuthorityClient`].
pub struct HttpAuthorityClient {
    client: reqwest::Client,
    base_url: String,
    credentials: Credentials,
    timeout_secs: u64,
    max_items_per_call: usize,
    retry: RetryPolicy,
    token_cache: Mutex<Option<Token>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    token: String,
    expires_in: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    transfer_ids: Vec<String>,
}

impl HttpAuthorityClient {
    /// Build a client from the engine configuration snapshot.
    pub fn new(config: &EngineConfig, credentials: Credentials) -> Result<Self, ItsError> {
        if config.authority_base_url.is_empty() {
            return Err(ItsError::NotConfigured {
                reason: "authority base URL is empty".to_string(),
            });
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ItsError::NotConfigured {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: config.authority_base_url.trim_end_matches('/').to_string(),
            credentials,
            timeout_secs: config.request_timeout_secs,
            max_items_per_call: config.max_items_per_call,
            retry: RetryPolicy::default(),
            token_cache: Mutex::new(None),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    /// Send a request with retry, mapping transport failures and 5xx
    /// responses to their error classes.
    async fn execute(
        &self,
        endpoint: &str,
        build: impl Fn() -> reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ItsError> {
        let resp = self
            .retry
            .send(|| {
                let rb = build();
                async move { rb.send().await }
            })
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ItsError::Timeout {
                        endpoint: endpoint.to_string(),
                        timeout_secs: self.timeout_secs,
                    }
                } else {
                    ItsError::Http {
                        endpoint: endpoint.to_string(),
                        source: e,
                    }
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ItsError::Api {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body: body.chars().take(512).collect(),
            });
        }
        Ok(resp)
    }

    async fn request_token(&self) -> Result<Token, ItsError> {
        let endpoint = "auth/token";
        let body = serde_json::json!({
            "username": self.credentials.username,
            "password": self.credentials.password,
        });
        let resp = self
            .execute(endpoint, || self.client.post(self.url(endpoint)).json(&body))
            .await
            .map_err(|e| match e {
                ItsError::Api { status, body, .. } if status < 500 => ItsError::Auth {
                    reason: format!("HTTP {status}: {body}"),
                },
                other => other,
            })?;

        let parsed: TokenResponse = resp.json().await.map_err(|e| ItsError::Protocol {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Token {
            secret: parsed.token,
            expires_at: Utc::now() + chrono::Duration::seconds(parsed.expires_in),
        })
    }
}

#[async_trait]
impl AuthorityClient for HttpAuthorityClient {
    /// Return the cached token while fresh; re-authenticate when stale.
    async fn fetch_token(&self) -> Result<Token, ItsError> {
        {
            let cache = self.token_cache.lock();
            if let Some(token) = cache.as_ref() {
                if !token.is_stale(Utc::now()) {
                    return Ok(token.clone());
                }
            }
            // Lock released here; the fetch below must not hold it across
            // an await point.
        }
        let fresh = self.request_token().await?;
        *self.token_cache.lock() = Some(fresh.clone());
        Ok(fresh)
    }

    async fn submit(
        &self,
        endpoint: &str,
        payload: &Value,
        token: &Token,
    ) -> Result<Value, ItsError> {
        let resp = self
            .execute(endpoint, || {
                self.client
                    .post(self.url(endpoint))
                    .bearer_auth(&token.secret)
                    .json(payload)
            })
            .await?;
        resp.json().await.map_err(|e| ItsError::Protocol {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })
    }

    async fn search(
        &self,
        range: &DateRange,
        token: &Token,
    ) -> Result<Vec<TransferId>, ItsError> {
        let endpoint = "transfers/search";
        let resp = self
            .execute(endpoint, || {
                self.client
                    .post(self.url(endpoint))
                    .bearer_auth(&token.secret)
                    .json(range)
            })
            .await?;
        let parsed: SearchResponse = resp.json().await.map_err(|e| ItsError::Protocol {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        Ok(parsed.transfer_ids.into_iter().map(TransferId::new).collect())
    }

    async fn fetch_archive(&self, id: &TransferId, token: &Token) -> Result<Vec<u8>, ItsError> {
        let endpoint = format!("transfers/{id}/archive");
        let resp = self
            .execute(&endpoint, || {
                self.client.get(self.url(&endpoint)).bearer_auth(&token.secret)
            })
            .await?;
        let bytes = resp.bytes().await.map_err(|e| ItsError::Protocol {
            endpoint,
            reason: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }

    fn max_items_per_call(&self) -> usize {
        self.max_items_per_call
    }
}
