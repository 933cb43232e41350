// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Batch negotiation client for large-file transfers
//!
//! Before any object bytes move, a client asks the coordinator how each
//! object should be transferred. This crate performs that exchange:
//!
//! 1. [`BatchRequestBuilder`] assembles a [`BatchRequest`] from a direction,
//!    the candidate objects and the adapters the client supports.
//! 2. [`BatchNegotiator`] resolves the remote's [`Endpoint`] and either
//!    - POSTs the request to `<endpoint>/objects/batch` through a
//!      [`Transport`], or
//!    - synthesizes the response locally when the endpoint names a
//!      standalone adapter.
//! 3. The caller receives a [`BatchResponse`] whose actions (live path
//!    only) are stamped with the time the request was issued, for expiry
//!    tracking.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use lfs_batch::{BatchConfig, BatchNegotiator, BatchRequestBuilder, HttpTransport};
//! use lfs_batch::types::{Operation, Transfer};
//!
//! let config = BatchConfig::from_env()?;
//! let negotiator = BatchNegotiator::new(
//!     Arc::new(HttpTransport::from_config(&config)?),
//!     Arc::new(config.resolver()),
//!     config.negotiator_config(),
//! );
//!
//! let request = BatchRequestBuilder::new(Operation::Download)
//!     .object(Transfer::new("a1b2c3...", 1024))
//!     .adapters(["basic", "ssh"])
//!     .build();
//!
//! let response = negotiator.negotiate("origin", request).await?;
//! for object in &response.objects {
//!     println!("{} via {}", object.oid, response.selected_adapter());
//! }
//! ```

pub mod clock;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod negotiator;
pub mod request;
pub mod standalone;
pub mod transport;

pub use lfs_batch_types as types;
pub use lfs_batch_types::{
    Action, BASIC_ADAPTER, BatchRequest, BatchResponse, Endpoint, ObjectError, Operation,
    Transfer,
};

pub use clock::{Clock, SystemClock};
pub use config::{BatchConfig, RemoteConfig};
pub use endpoint::{EndpointResolver, NegotiationMode, RemoteEndpoints, StaticEndpointResolver};
pub use error::{BatchError, ConfigError, TransportError};
pub use negotiator::{BATCH_PATH, BatchNegotiator, DEFAULT_MAX_RETRIES, NegotiatorConfig};
pub use request::{AdapterManifest, BatchRequestBuilder};
pub use transport::{Credentials, HttpTransport, Transport, TransportRequest, TransportResponse};
