// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Error types for lfs-batch

use lfs_batch_types::BatchResponse;
use thiserror::Error;

/// Errors raised by a [`crate::Transport`] while building or sending a
/// request
#[derive(Error, Debug)]
pub enum TransportError {
    /// Endpoint URL is missing or cannot be joined with the resource path
    #[error("invalid endpoint URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Request body could not be serialized
    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),

    /// Remote credentials could not be turned into a header
    #[error("invalid credentials for remote '{0}'")]
    Credentials(String),

    /// The HTTP exchange failed after the retry budget was spent
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Errors returned by [`crate::BatchNegotiator`]
#[derive(Error, Debug)]
pub enum BatchError {
    /// The batch request could not be constructed; nothing was sent
    #[error("batch request: {0}")]
    Request(#[source] TransportError),

    /// The batch request was sent but no response came back
    #[error("batch response: {0}")]
    Transport(#[source] TransportError),

    /// The response body did not decode as a batch response
    ///
    /// `partial` holds whatever could be salvaged from the body.
    #[error("batch response: malformed body: {source}")]
    Protocol {
        #[source]
        source: serde_json::Error,
        partial: Box<BatchResponse>,
    },

    /// The coordinator answered with a status other than 200
    #[error("batch request failed with HTTP {status}{}", format_message(.message))]
    StatusCode {
        status: u16,
        message: String,
        request_id: Option<String>,
        documentation_url: Option<String>,
    },

    /// The endpoint's standalone adapter was not among the requested ones
    #[error("standalone transfer '{0}' not available")]
    UnsupportedAdapter(String),
}

impl BatchError {
    /// The partially decoded response carried by a protocol error.
    pub fn partial_response(&self) -> Option<&BatchResponse> {
        match self {
            BatchError::Protocol { partial, .. } => Some(partial),
            _ => None,
        }
    }

    /// HTTP status of a status-code error.
    pub fn status(&self) -> Option<u16> {
        match self {
            BatchError::StatusCode { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn format_message(message: &str) -> String {
    if message.is_empty() {
        String::new()
    } else {
        format!(": {}", message)
    }
}

/// Errors loading a [`crate::BatchConfig`]
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid value for {name}: '{value}'")]
    InvalidValue { name: String, value: String },
}
