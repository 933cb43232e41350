// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Client configuration
//!
//! Configuration can be loaded from:
//! 1. A JSON file (see [`BatchConfig::load`])
//! 2. Environment variables, applied on top (see [`BatchConfig::apply_env`])
//!
//! ```json
//! {
//!   "max_retries": 4,
//!   "remotes": {
//!     "origin": {
//!       "url": "https://git.example.com/repo.git/info/lfs",
//!       "username": "alice",
//!       "password": "secret"
//!     },
//!     "nas": { "url": "file:///srv/lfs", "standalone_transfer": "lfs-standalone-file" }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

use crate::endpoint::{RemoteEndpoints, StaticEndpointResolver};
use crate::error::ConfigError;
use crate::negotiator::{DEFAULT_MAX_RETRIES, NegotiatorConfig};
use crate::transport::Credentials;

/// Default HTTP timeout (seconds)
const DEFAULT_TIMEOUT_SECS: u64 = 30;

const DEFAULT_USER_AGENT: &str = concat!("lfs-batch/", env!("CARGO_PKG_VERSION"));

const ENV_MAX_RETRIES: &str = "LFS_BATCH_MAX_RETRIES";
const ENV_TIMEOUT_SECS: &str = "LFS_BATCH_TIMEOUT_SECS";

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Retries the transport may spend on each batch request
    pub max_retries: u32,
    /// HTTP timeout in seconds
    pub timeout_secs: u64,
    pub user_agent: String,
    pub remotes: BTreeMap<String, RemoteConfig>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            remotes: BTreeMap::new(),
        }
    }
}

impl BatchConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Defaults overlaid with the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Override settings from environment-style variables.
    ///
    /// `lookup` returns the value of a variable, if set.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_MAX_RETRIES) {
            self.max_retries = parse_var(ENV_MAX_RETRIES, &value)?;
        }
        if let Some(value) = lookup(ENV_TIMEOUT_SECS) {
            self.timeout_secs = parse_var(ENV_TIMEOUT_SECS, &value)?;
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn negotiator_config(&self) -> NegotiatorConfig {
        NegotiatorConfig {
            max_retries: self.max_retries,
        }
    }

    pub fn resolver(&self) -> StaticEndpointResolver {
        self.remotes
            .iter()
            .fold(StaticEndpointResolver::new(), |resolver, (name, remote)| {
                resolver.with_remote(name.clone(), remote.endpoints.clone())
            })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
    })
}

/// Settings for one remote
#[derive(Clone, Default, Deserialize)]
pub struct RemoteConfig {
    #[serde(flatten)]
    pub endpoints: RemoteEndpoints,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

impl RemoteConfig {
    /// Credentials for this remote. A token takes precedence over a
    /// username and password.
    pub fn credentials(&self) -> Option<Credentials> {
        if let Some(token) = &self.token {
            return Some(Credentials::Bearer(SecretString::from(token.clone())));
        }

        let username = self.username.clone()?;
        let password = self.password.clone().unwrap_or_default();
        Some(Credentials::Basic {
            username,
            password: SecretString::from(password),
        })
    }
}

impl fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("RemoteConfig")
            .field("endpoints", &self.endpoints)
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("token", &redact(&self.token))
            .finish()
    }
}
