// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Batch negotiation
//!
//! [`BatchNegotiator::negotiate`] turns a [`BatchRequest`] into a
//! [`BatchResponse`] along one of two paths:
//!
//! - **live**: POST the request to `<endpoint>/objects/batch`, decode the
//!   reply and stamp every action with the time the request was issued;
//! - **standalone**: the endpoint names an out-of-band adapter, so the
//!   response is synthesized locally (see [`crate::standalone`]).
//!
//! A batch with no objects short-circuits to an empty response on both.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use http::Method;
use lfs_batch_types::{BatchRequest, BatchResponse, Endpoint, ErrorBody, Operation, Transfer};
use serde::Deserialize;
use serde_json::Value;

use crate::clock::{Clock, SystemClock};
use crate::endpoint::{EndpointResolver, NegotiationMode};
use crate::error::BatchError;
use crate::request::{AdapterManifest, BatchRequestBuilder, normalize_adapter_names};
use crate::standalone::standalone_batch;
use crate::transport::{Transport, TransportResponse};

/// Batch resource, relative to the endpoint URL.
pub const BATCH_PATH: &str = "objects/batch";

/// Default retry budget handed to the transport.
pub const DEFAULT_MAX_RETRIES: u32 = 8;

const LOG_TAG: &str = "lfs.batch";

/// Negotiator settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NegotiatorConfig {
    /// Retries the transport may spend on each batch request
    pub max_retries: u32,
}

impl Default for NegotiatorConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// Negotiates batches against a coordinator.
///
/// Holds no per-call state; concurrent calls share only the transport.
#[derive(Clone)]
pub struct BatchNegotiator {
    transport: Arc<dyn Transport>,
    resolver: Arc<dyn EndpointResolver>,
    clock: Arc<dyn Clock>,
    config: NegotiatorConfig,
}

impl BatchNegotiator {
    pub fn new(
        transport: Arc<dyn Transport>,
        resolver: Arc<dyn EndpointResolver>,
        config: NegotiatorConfig,
    ) -> Self {
        Self {
            transport,
            resolver,
            clock: Arc::new(SystemClock),
            config,
        }
    }

    /// Replace the clock used to timestamp live requests.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &NegotiatorConfig {
        &self.config
    }

    /// Negotiate `objects` for `operation` on `remote`, advertising the
    /// adapters `manifest` supports in that direction.
    pub async fn batch(
        &self,
        manifest: &AdapterManifest,
        operation: Operation,
        remote: &str,
        objects: Vec<Transfer>,
    ) -> Result<BatchResponse, BatchError> {
        let builder = BatchRequestBuilder::new(operation)
            .objects(objects)
            .adapters(manifest.adapter_names(operation).iter().cloned());
        if builder.is_empty() {
            return Ok(BatchResponse::default());
        }

        self.negotiate(remote, builder.build()).await
    }

    /// Negotiate `request` with `remote`.
    pub async fn negotiate(
        &self,
        remote: &str,
        mut request: BatchRequest,
    ) -> Result<BatchResponse, BatchError> {
        if request.objects.is_empty() {
            return Ok(BatchResponse::default());
        }

        normalize_adapter_names(&mut request.transfer_adapter_names);

        let endpoint = self.resolver.resolve(request.operation, remote);
        match NegotiationMode::for_endpoint(&endpoint) {
            NegotiationMode::Standalone(adapter) => {
                tracing::debug!(
                    remote,
                    adapter,
                    objects = request.objects.len(),
                    "api: standalone batch"
                );
                let adapter = adapter.to_string();
                standalone_batch(&request, &adapter, endpoint)
            }
            NegotiationMode::Live => self.negotiate_live(remote, &request, endpoint).await,
        }
    }

    async fn negotiate_live(
        &self,
        remote: &str,
        request: &BatchRequest,
        endpoint: Endpoint,
    ) -> Result<BatchResponse, BatchError> {
        let requested_at = self.clock.now();

        let body = serde_json::to_value(request).map_err(|e| BatchError::Request(e.into()))?;
        let req = self
            .transport
            .new_request(Method::POST, &endpoint, BATCH_PATH, Some(body))
            .map_err(BatchError::Request)?
            .with_log_tag(LOG_TAG)
            .with_retries(self.config.max_retries);

        tracing::debug!(
            remote,
            operation = %request.operation,
            objects = request.objects.len(),
            "api: batch"
        );

        let res = self.transport.do_with_auth(remote, req).await.map_err(|e| {
            tracing::error!(remote, error = %e, "api error");
            BatchError::Transport(e)
        })?;

        let mut response = match decode_batch_response(&res.body) {
            Ok(response) => response,
            Err(DecodeFailure {
                mut partial,
                source,
            }) => {
                tracing::warn!(
                    remote,
                    status = res.status,
                    error = %source,
                    "undecodable batch response"
                );
                partial.endpoint = endpoint;
                return Err(BatchError::Protocol {
                    source,
                    partial: Box::new(partial),
                });
            }
        };

        if res.status != 200 {
            tracing::warn!(remote, status = res.status, "batch request rejected");
            return Err(status_code_error(&res));
        }

        response.endpoint = endpoint;
        Ok(stamp(response, requested_at))
    }
}

/// A body that failed to decode, with whatever could be salvaged from it.
#[derive(Debug)]
pub struct DecodeFailure {
    pub partial: BatchResponse,
    pub source: serde_json::Error,
}

/// Decode a batch response body.
///
/// On failure the selected adapter and every object that decodes on its own
/// are kept in [`DecodeFailure::partial`].
pub fn decode_batch_response(body: &[u8]) -> Result<BatchResponse, DecodeFailure> {
    serde_json::from_slice(body).map_err(|source| DecodeFailure {
        partial: salvage(body),
        source,
    })
}

fn salvage(body: &[u8]) -> BatchResponse {
    let mut partial = BatchResponse::default();
    let Ok(value) = serde_json::from_slice::<Value>(body) else {
        return partial;
    };

    if let Some(name) = value.get("transfer").and_then(Value::as_str) {
        partial.transfer_adapter_name = name.to_string();
    }
    if let Some(objects) = value.get("objects").and_then(Value::as_array) {
        partial.objects = objects
            .iter()
            .filter_map(|object| Transfer::deserialize(object).ok())
            .collect();
    }

    partial
}

/// Mark every action in `response` as created at `requested_at`.
pub fn stamp(mut response: BatchResponse, requested_at: DateTime<Utc>) -> BatchResponse {
    for action in response.actions_mut() {
        action.mark_created(requested_at);
    }
    response
}

fn status_code_error(res: &TransportResponse) -> BatchError {
    let details: ErrorBody = serde_json::from_slice(&res.body).unwrap_or_default();
    BatchError::StatusCode {
        status: res.status,
        message: details.message,
        request_id: details.request_id,
        documentation_url: details.documentation_url,
    }
}
