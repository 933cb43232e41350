// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Endpoint resolution
//!
//! Maps an (operation, remote) pair to the [`Endpoint`] a batch is
//! negotiated against, and classifies that endpoint into a
//! [`NegotiationMode`].

use std::collections::BTreeMap;

use lfs_batch_types::{Endpoint, Operation};
use serde::Deserialize;

/// Resolves the endpoint for a batch.
pub trait EndpointResolver: Send + Sync {
    fn resolve(&self, operation: Operation, remote: &str) -> Endpoint;
}

impl<F> EndpointResolver for F
where
    F: Fn(Operation, &str) -> Endpoint + Send + Sync,
{
    fn resolve(&self, operation: Operation, remote: &str) -> Endpoint {
        self(operation, remote)
    }
}

/// How a batch will be negotiated for a resolved endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NegotiationMode<'a> {
    /// POST the batch to the coordinator.
    Live,
    /// Synthesize the response locally for the named adapter.
    Standalone(&'a str),
}

impl<'a> NegotiationMode<'a> {
    pub fn for_endpoint(endpoint: &'a Endpoint) -> Self {
        match endpoint.standalone_adapter() {
            Some(adapter) => NegotiationMode::Standalone(adapter),
            None => NegotiationMode::Live,
        }
    }
}

/// Endpoint settings for one remote.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RemoteEndpoints {
    /// Base URL used for both directions unless overridden
    pub url: String,
    pub upload_url: Option<String>,
    pub download_url: Option<String>,
    /// Adapter that handles all objects for this remote without a
    /// coordinator round-trip
    pub standalone_transfer: Option<String>,
}

impl RemoteEndpoints {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn endpoint(&self, operation: Operation) -> Endpoint {
        let url = match operation {
            Operation::Upload => self.upload_url.as_ref(),
            Operation::Download => self.download_url.as_ref(),
        }
        .unwrap_or(&self.url);

        Endpoint {
            url: url.clone(),
            standalone_transfer: self.standalone_transfer.clone(),
        }
    }
}

/// Resolver backed by a fixed table of remotes.
#[derive(Clone, Debug, Default)]
pub struct StaticEndpointResolver {
    remotes: BTreeMap<String, RemoteEndpoints>,
}

impl StaticEndpointResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_remote(mut self, name: impl Into<String>, endpoints: RemoteEndpoints) -> Self {
        self.remotes.insert(name.into(), endpoints);
        self
    }
}

impl EndpointResolver for StaticEndpointResolver {
    fn resolve(&self, operation: Operation, remote: &str) -> Endpoint {
        match self.remotes.get(remote) {
            Some(endpoints) => endpoints.endpoint(operation),
            None => {
                tracing::debug!(remote, %operation, "no endpoint configured for remote");
                Endpoint::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_override_wins() {
        let resolver = StaticEndpointResolver::new().with_remote(
            "origin",
            RemoteEndpoints {
                url: "https://lfs.example.com/repo".to_string(),
                upload_url: Some("https://upload.example.com/repo".to_string()),
                ..Default::default()
            },
        );

        assert_eq!(
            resolver.resolve(Operation::Upload, "origin").url,
            "https://upload.example.com/repo"
        );
        assert_eq!(
            resolver.resolve(Operation::Download, "origin").url,
            "https://lfs.example.com/repo"
        );
    }

    #[test]
    fn test_unknown_remote_resolves_empty() {
        let resolver = StaticEndpointResolver::new();
        assert_eq!(
            resolver.resolve(Operation::Download, "nope"),
            Endpoint::default()
        );
    }

    #[test]
    fn test_mode_selection() {
        let live = Endpoint::new("https://lfs.example.com");
        assert_eq!(NegotiationMode::for_endpoint(&live), NegotiationMode::Live);

        let standalone = live.clone().with_standalone_transfer("ssh");
        assert_eq!(
            NegotiationMode::for_endpoint(&standalone),
            NegotiationMode::Standalone("ssh")
        );
    }

    #[test]
    fn test_closure_resolver() {
        let resolver = |op: Operation, remote: &str| {
            Endpoint::new(format!("https://{}.example.com/{}", remote, op))
        };
        assert_eq!(
            resolver.resolve(Operation::Upload, "origin").url,
            "https://origin.example.com/upload"
        );
    }
}
