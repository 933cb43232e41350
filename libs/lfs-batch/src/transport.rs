// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Authenticated HTTP transport
//!
//! The negotiator talks to the coordinator through the [`Transport`] trait.
//! A transport builds requests against an [`Endpoint`], injects the remote's
//! credentials and spends the retry budget carried by each request; callers
//! only see the final outcome.
//!
//! [`HttpTransport`] is the reqwest-backed implementation.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use http::{Method, StatusCode};
use lfs_batch_types::Endpoint;
use secrecy::{ExposeSecret, SecretString};
use tracing::Instrument;
use url::Url;

use crate::config::BatchConfig;
use crate::error::TransportError;

/// Media type of batch API request and response bodies.
pub const MEDIA_TYPE: &str = "application/vnd.git-lfs+json";

/// Default delay before the first retry.
const INITIAL_BACKOFF: Duration = Duration::from_millis(150);

/// Upper bound on the delay between retries.
const MAX_BACKOFF: Duration = Duration::from_secs(2);

/// A request ready to be sent by a [`Transport`].
#[derive(Clone, Debug)]
pub struct TransportRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    /// Retries allowed after the first attempt
    pub max_retries: u32,
    /// Label recorded on the request's log span
    pub log_tag: Option<&'static str>,
}

impl TransportRequest {
    pub fn with_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_log_tag(mut self, tag: &'static str) -> Self {
        self.log_tag = Some(tag);
        self
    }
}

/// Final response after any retries.
#[derive(Clone, Debug)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Build a request for `path` under `endpoint`, JSON-encoding `body`.
    fn new_request(
        &self,
        method: Method,
        endpoint: &Endpoint,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<TransportRequest, TransportError> {
        build_request(method, endpoint, path, body)
    }

    /// Send `request` with `remote`'s credentials, retrying per
    /// `request.max_retries`.
    async fn do_with_auth(
        &self,
        remote: &str,
        request: TransportRequest,
    ) -> Result<TransportResponse, TransportError>;
}

/// Join `path` onto the endpoint URL and attach JSON headers and body.
pub fn build_request(
    method: Method,
    endpoint: &Endpoint,
    path: &str,
    body: Option<serde_json::Value>,
) -> Result<TransportRequest, TransportError> {
    let url = resource_url(&endpoint.url, path)?;

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(MEDIA_TYPE));

    let body = match body {
        Some(value) => {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(MEDIA_TYPE));
            serde_json::to_vec(&value)?
        }
        None => Vec::new(),
    };

    Ok(TransportRequest {
        method,
        url,
        headers,
        body,
        max_retries: 0,
        log_tag: None,
    })
}

fn resource_url(base: &str, path: &str) -> Result<Url, TransportError> {
    let invalid = |reason: String| TransportError::InvalidUrl {
        url: base.to_string(),
        reason,
    };

    if base.is_empty() {
        return Err(invalid("no endpoint configured".to_string()));
    }

    let mut url = Url::parse(base).map_err(|e| invalid(e.to_string()))?;
    if !url.path().ends_with('/') {
        let dir = format!("{}/", url.path());
        url.set_path(&dir);
    }

    url.join(path.trim_start_matches('/'))
        .map_err(|e| invalid(e.to_string()))
}

// ============================================================================
// Credentials
// ============================================================================

/// Credentials attached to every request for a remote.
#[derive(Clone, Debug)]
pub enum Credentials {
    Basic {
        username: String,
        password: SecretString,
    },
    Bearer(SecretString),
}

impl Credentials {
    fn header_value(&self) -> Option<HeaderValue> {
        use base64::Engine;
        use base64::engine::general_purpose::STANDARD;

        let value = match self {
            Credentials::Basic { username, password } => {
                let raw = format!("{}:{}", username, password.expose_secret());
                format!("Basic {}", STANDARD.encode(raw.as_bytes()))
            }
            Credentials::Bearer(token) => format!("Bearer {}", token.expose_secret()),
        };

        let mut header = HeaderValue::from_str(&value).ok()?;
        header.set_sensitive(true);
        Some(header)
    }
}

// ============================================================================
// HttpTransport
// ============================================================================

/// reqwest-backed [`Transport`] with per-remote credentials.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    credentials: BTreeMap<String, Credentials>,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, TransportError> {
        // reqwest is built without a bundled rustls provider. Installing
        // fails harmlessly when one is already in place.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            credentials: BTreeMap::new(),
            initial_backoff: INITIAL_BACKOFF,
            max_backoff: MAX_BACKOFF,
        })
    }

    /// Build a transport with the timeout, user agent and per-remote
    /// credentials from `config`.
    pub fn from_config(config: &BatchConfig) -> Result<Self, TransportError> {
        let mut transport = Self::new(config.timeout(), &config.user_agent)?;
        for (name, remote) in &config.remotes {
            if let Some(credentials) = remote.credentials() {
                transport = transport.with_credentials(name.clone(), credentials);
            }
        }
        Ok(transport)
    }

    pub fn with_credentials(mut self, remote: impl Into<String>, credentials: Credentials) -> Self {
        self.credentials.insert(remote.into(), credentials);
        self
    }

    /// Override the retry delays.
    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    fn authorization(&self, remote: &str) -> Result<Option<HeaderValue>, TransportError> {
        match self.credentials.get(remote) {
            Some(credentials) => credentials
                .header_value()
                .map(Some)
                .ok_or_else(|| TransportError::Credentials(remote.to_string())),
            None => Ok(None),
        }
    }

    async fn send_with_retries(
        &self,
        request: &TransportRequest,
        authorization: Option<HeaderValue>,
    ) -> Result<TransportResponse, TransportError> {
        let mut attempt = 0u32;
        let mut delay = self.initial_backoff;

        loop {
            let mut builder = self
                .client
                .request(request.method.clone(), request.url.clone())
                .headers(request.headers.clone())
                .body(request.body.clone());
            if let Some(value) = &authorization {
                builder = builder.header(AUTHORIZATION, value.clone());
            }

            let retries_left = attempt < request.max_retries;
            match builder.send().await {
                Ok(res) if retries_left && is_retriable_status(res.status()) => {
                    tracing::debug!(
                        attempt,
                        status = res.status().as_u16(),
                        "retrying request"
                    );
                }
                Ok(res) => {
                    let status = res.status().as_u16();
                    let headers = res.headers().clone();
                    let body = res.bytes().await?.to_vec();
                    return Ok(TransportResponse {
                        status,
                        headers,
                        body,
                    });
                }
                Err(e) if retries_left && is_retriable_error(&e) => {
                    tracing::debug!(attempt, error = %e, "retrying request");
                }
                Err(e) => return Err(e.into()),
            }

            attempt += 1;
            let jitter = Duration::from_millis(u64::from(rand::random::<u8>()) % 50);
            tokio::time::sleep(delay + jitter).await;
            delay = std::cmp::min(delay * 2, self.max_backoff);
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn do_with_auth(
        &self,
        remote: &str,
        request: TransportRequest,
    ) -> Result<TransportResponse, TransportError> {
        let authorization = self.authorization(remote)?;
        let span = tracing::debug_span!(
            "http",
            tag = request.log_tag.unwrap_or("request"),
            remote,
            method = %request.method,
            url = %request.url,
        );

        async {
            let res = self.send_with_retries(&request, authorization).await?;
            tracing::debug!(status = res.status, bytes = res.body.len(), "response");
            Ok(res)
        }
        .instrument(span)
        .await
    }
}

fn is_retriable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_retriable_error(e: &reqwest::Error) -> bool {
    e.is_connect() || e.is_timeout()
}
