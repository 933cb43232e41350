// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! lfs-batch - negotiate a large-file transfer batch from the command line

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use lfs_batch::{
    AdapterManifest, BatchConfig, BatchError, BatchNegotiator, HttpTransport, Operation, Transfer,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "lfs-batch",
    version,
    about = "Negotiate how a batch of large objects will be transferred",
    long_about = None
)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, env = "LFS_BATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Remote to negotiate with
    #[arg(short, long, default_value = "origin")]
    remote: String,

    /// Endpoint URL override for the remote
    #[arg(short = 'U', long, env = "LFS_BATCH_URL")]
    url: Option<String>,

    /// Standalone transfer adapter override for the remote
    #[arg(long)]
    standalone_transfer: Option<String>,

    /// Additional transfer adapter to advertise (basic is always included)
    #[arg(short = 't', long = "transfer")]
    transfers: Vec<String>,

    /// Retry budget override
    #[arg(long)]
    max_retries: Option<u32>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Direction of the transfer (upload or download)
    operation: Operation,

    /// Objects to negotiate, as OID:SIZE
    #[arg(required = true, value_parser = parse_object)]
    objects: Vec<Transfer>,
}

impl Cli {
    /// Build the configuration from the config file, environment and
    /// command-line overrides, in that order
    fn load_config(&self) -> Result<BatchConfig> {
        let mut config = match &self.config {
            Some(path) => BatchConfig::load(path)
                .with_context(|| format!("Failed to load config '{}'", path.display()))?,
            None => BatchConfig::default(),
        };
        config
            .apply_env(|name| std::env::var(name).ok())
            .context("Invalid environment override")?;

        if let Some(max_retries) = self.max_retries {
            config.max_retries = max_retries;
        }

        if self.url.is_some() || self.standalone_transfer.is_some() {
            let remote = config.remotes.entry(self.remote.clone()).or_default();
            if let Some(url) = &self.url {
                remote.endpoints.url = url.clone();
            }
            if let Some(adapter) = &self.standalone_transfer {
                remote.endpoints.standalone_transfer = Some(adapter.clone());
            }
        }

        Ok(config)
    }

    fn manifest(&self) -> AdapterManifest {
        self.transfers
            .iter()
            .fold(AdapterManifest::new(), |manifest, name| {
                manifest.with_adapter(name.clone())
            })
    }
}

fn parse_object(spec: &str) -> Result<Transfer, String> {
    let (oid, size) = spec
        .rsplit_once(':')
        .ok_or_else(|| format!("expected OID:SIZE, got '{}'", spec))?;
    if oid.is_empty() {
        return Err(format!("expected OID:SIZE, got '{}'", spec));
    }
    let size = size
        .parse()
        .map_err(|_| format!("invalid size '{}' for object '{}'", size, oid))?;
    Ok(Transfer::new(oid, size))
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("lfs_batch=debug,lfs_batch_cli=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.load_config()?;
    let transport =
        HttpTransport::from_config(&config).context("Failed to create HTTP transport")?;
    let negotiator = BatchNegotiator::new(
        Arc::new(transport),
        Arc::new(config.resolver()),
        config.negotiator_config(),
    );

    tracing::debug!(
        remote = %cli.remote,
        operation = %cli.operation,
        objects = cli.objects.len(),
        "negotiating batch"
    );

    let result = negotiator
        .batch(&cli.manifest(), cli.operation, &cli.remote, cli.objects.clone())
        .await;

    let response = match result {
        Ok(response) => response,
        Err(e) => {
            // Show what the coordinator did send before failing.
            if let BatchError::Protocol { partial, .. } = &e {
                println!("{}", serde_json::to_string_pretty(partial)?);
            }
            return Err(e)
                .with_context(|| format!("Batch negotiation with '{}' failed", cli.remote));
        }
    };

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_object() {
        assert_eq!(parse_object("abc:10").unwrap(), Transfer::new("abc", 10));
        assert!(parse_object("abc").is_err());
        assert!(parse_object(":10").is_err());
        assert!(parse_object("abc:-1").is_err());
    }

    #[test]
    fn test_overrides_create_remote() {
        let cli = Cli::parse_from([
            "lfs-batch",
            "--remote",
            "nas",
            "--url",
            "file:///srv/lfs",
            "--standalone-transfer",
            "lfs-standalone-file",
            "--max-retries",
            "2",
            "-t",
            "lfs-standalone-file",
            "download",
            "abc:10",
        ]);
        let config = cli.load_config().unwrap();

        assert_eq!(config.max_retries, 2);
        let remote = &config.remotes["nas"];
        assert_eq!(remote.endpoints.url, "file:///srv/lfs");
        assert_eq!(
            remote.endpoints.standalone_transfer.as_deref(),
            Some("lfs-standalone-file")
        );
        assert_eq!(
            cli.manifest().adapter_names(Operation::Download),
            ["basic", "lfs-standalone-file"]
        );
    }
}
