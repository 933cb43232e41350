// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Wire types for the large-file batch negotiation API.
//!
//! A client POSTs a [`BatchRequest`] to `<endpoint>/objects/batch` naming the
//! objects it wants to move and the transfer adapters it understands. The
//! coordinator answers with a [`BatchResponse`] selecting one adapter and,
//! per object, the [`Action`]s needed to move its bytes.
//!
//! [`Endpoint`] is not sent on the wire; it records where a batch was (or
//! would have been) negotiated and whether a standalone adapter takes over.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumString};

/// Name of the adapter every client and coordinator implicitly supports.
pub const BASIC_ADAPTER: &str = "basic";

/// Seconds from the Unix epoch to 0001-01-01T00:00:00Z, the timestamp
/// coordinators send for "no expiry".
const ZERO_TIME_SECS: i64 = -62_135_596_800;

// ============================================================================
// Operation
// ============================================================================

/// Direction of a batch.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Operation {
    Upload,
    Download,
}

impl Operation {
    /// Key under which this operation's action is stored on a [`Transfer`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Upload => "upload",
            Operation::Download => "download",
        }
    }
}

// ============================================================================
// Action
// ============================================================================

/// One executable instruction for moving one object's bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Target URL.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub href: String,

    /// Transport headers to send with the transfer request.
    #[serde(
        rename = "header",
        alias = "headers",
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub header: BTreeMap<String, String>,

    /// Absolute expiry of `href`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// Seconds `href` remains valid, counted from [`Action::created_at`].
    #[serde(default, skip_serializing_if = "is_zero")]
    pub expires_in: i64,

    /// Local issue time of the batch request that produced this action.
    #[serde(skip)]
    created_at: Option<DateTime<Utc>>,
}

impl Action {
    /// When the batch request that produced this action was issued, if the
    /// action came from a live negotiation.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    /// Record the issue time of the batch request that produced this action.
    pub fn mark_created(&mut self, at: DateTime<Utc>) {
        self.created_at = Some(at);
    }

    /// The instant after which `href` is no longer usable.
    ///
    /// A relative `expires_in` wins over `expires_at`. It needs a creation
    /// time to anchor it; without one the absolute time is used.
    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        if self.expires_in != 0 {
            if let Some(created) = self.created_at {
                // Out of range means the link outlives any representable time.
                return Duration::try_seconds(self.expires_in)
                    .and_then(|ttl| created.checked_add_signed(ttl));
            }
        }

        self.expires_at.filter(|at| !is_zero_time(at))
    }

    /// Whether the action expires before `now + window`.
    pub fn is_expired_within(&self, now: DateTime<Utc>, window: Duration) -> bool {
        match self.expiration() {
            Some(expiration) => now
                .checked_add_signed(window)
                .is_none_or(|horizon| expiration < horizon),
            None => false,
        }
    }
}

// ============================================================================
// Transfer
// ============================================================================

/// Error reported by the coordinator for a single object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectError {
    pub code: i32,
    pub message: String,
}

impl fmt::Display for ObjectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// One object under negotiation, identified by its content hash.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    #[serde(default)]
    pub oid: String,
    #[serde(default)]
    pub size: u64,

    #[serde(default, skip_serializing_if = "is_false")]
    pub authenticated: bool,

    /// Actions keyed by operation name. Coordinators may return keys beyond
    /// `upload` and `download` (for example `verify`).
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub actions: BTreeMap<String, Action>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ObjectError>,
}

impl Transfer {
    pub fn new(oid: impl Into<String>, size: u64) -> Self {
        Self {
            oid: oid.into(),
            size,
            ..Default::default()
        }
    }

    /// The action for `operation`, if the coordinator provided one.
    pub fn action(&self, operation: Operation) -> Option<&Action> {
        self.actions.get(operation.as_str())
    }

    pub fn actions_mut(&mut self) -> impl Iterator<Item = &mut Action> {
        self.actions.values_mut()
    }
}

// ============================================================================
// Batch request / response
// ============================================================================

/// Outbound negotiation payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub operation: Operation,

    #[serde(default)]
    pub objects: Vec<Transfer>,

    /// Adapter names the client supports. Empty means "basic only" and is
    /// left off the wire.
    #[serde(rename = "transfers", default, skip_serializing_if = "Vec::is_empty")]
    pub transfer_adapter_names: Vec<String>,
}

impl BatchRequest {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            objects: Vec::new(),
            transfer_adapter_names: Vec::new(),
        }
    }

    pub fn permits_adapter(&self, name: &str) -> bool {
        self.transfer_adapter_names.iter().any(|n| n == name)
    }
}

/// Resolved network target for a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Endpoint {
    /// Base URL; the batch resource lives at `<url>/objects/batch`.
    pub url: String,

    /// Adapter that handles every object out of band, bypassing the
    /// coordinator entirely.
    pub standalone_transfer: Option<String>,
}

impl Endpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            standalone_transfer: None,
        }
    }

    pub fn with_standalone_transfer(mut self, adapter: impl Into<String>) -> Self {
        self.standalone_transfer = Some(adapter.into());
        self
    }

    /// The standalone adapter name, ignoring empty designators.
    pub fn standalone_adapter(&self) -> Option<&str> {
        self.standalone_transfer
            .as_deref()
            .filter(|name| !name.is_empty())
    }
}

/// Negotiation result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub objects: Vec<Transfer>,

    /// Adapter selected by the coordinator.
    #[serde(rename = "transfer", default, skip_serializing_if = "String::is_empty")]
    pub transfer_adapter_name: String,

    #[serde(skip)]
    pub endpoint: Endpoint,
}

impl BatchResponse {
    /// The adapter to dispatch with. Coordinators that omit `transfer` mean
    /// [`BASIC_ADAPTER`].
    pub fn selected_adapter(&self) -> &str {
        if self.transfer_adapter_name.is_empty() {
            BASIC_ADAPTER
        } else {
            &self.transfer_adapter_name
        }
    }

    /// Every action of every object, mutably.
    pub fn actions_mut(&mut self) -> impl Iterator<Item = &mut Action> {
        self.objects
            .iter_mut()
            .flat_map(|object| object.actions.values_mut())
    }
}

/// JSON error body returned with non-200 batch responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub documentation_url: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn is_zero_time(at: &DateTime<Utc>) -> bool {
    at.timestamp() == ZERO_TIME_SECS && at.timestamp_subsec_nanos() == 0
}

fn is_false(b: &bool) -> bool {
    !*b
}

fn is_zero(n: &i64) -> bool {
    *n == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::str::FromStr;

    #[test]
    fn test_operation_names() {
        assert_eq!(Operation::Upload.to_string(), "upload");
        assert_eq!(Operation::from_str("download").unwrap(), Operation::Download);
        assert_eq!(
            serde_json::to_value(Operation::Download).unwrap(),
            json!("download")
        );
        assert!(Operation::from_str("verify").is_err());
    }

    #[test]
    fn test_request_omits_empty_adapter_list() {
        let mut req = BatchRequest::new(Operation::Upload);
        req.objects.push(Transfer::new("abc", 10));

        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            json!({"operation": "upload", "objects": [{"oid": "abc", "size": 10}]})
        );

        req.transfer_adapter_names = vec!["basic".to_string(), "ssh".to_string()];
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["transfers"], json!(["basic", "ssh"]));
    }

    #[test]
    fn test_response_decodes_actions_and_errors() {
        let body = json!({
            "transfer": "basic",
            "objects": [
                {
                    "oid": "abc",
                    "size": 10,
                    "authenticated": true,
                    "actions": {
                        "download": {
                            "href": "https://storage.example.com/abc",
                            "header": {"Authorization": "Bearer x"},
                            "expires_at": "2026-10-17T12:00:00Z",
                            "expires_in": 3600
                        }
                    }
                },
                {
                    "oid": "def",
                    "size": 20,
                    "error": {"code": 404, "message": "Object does not exist"}
                }
            ]
        });

        let res: BatchResponse = serde_json::from_value(body).unwrap();
        assert_eq!(res.selected_adapter(), "basic");
        assert_eq!(res.objects.len(), 2);

        let action = res.objects[0].action(Operation::Download).unwrap();
        assert_eq!(action.href, "https://storage.example.com/abc");
        assert_eq!(action.header.get("Authorization").unwrap(), "Bearer x");
        assert_eq!(action.expires_in, 3600);
        assert_eq!(action.created_at(), None);

        let err = res.objects[1].error.as_ref().unwrap();
        assert_eq!(err.code, 404);
        assert_eq!(err.to_string(), "[404] Object does not exist");
    }

    #[test]
    fn test_response_accepts_headers_alias_and_nulls() {
        let body = json!({
            "objects": [
                {"oid": "abc", "size": 1, "actions": {"upload": {"href": "h", "headers": {"K": "V"}}}},
                {"oid": "def", "size": 2, "actions": null}
            ]
        });
        let res: BatchResponse = serde_json::from_value(body).unwrap();
        assert_eq!(
            res.objects[0].action(Operation::Upload).unwrap().header["K"],
            "V"
        );
        assert!(res.objects[1].actions.is_empty());

        let res: BatchResponse = serde_json::from_value(json!({"objects": null})).unwrap();
        assert!(res.objects.is_empty());
        assert_eq!(res.selected_adapter(), BASIC_ADAPTER);
    }

    #[test]
    fn test_expiration_prefers_expires_in() {
        let created = Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap();
        let mut action = Action {
            expires_at: Some(created + Duration::hours(5)),
            expires_in: 60,
            ..Default::default()
        };

        // Without a creation time the relative expiry has no anchor.
        assert_eq!(action.expiration(), Some(created + Duration::hours(5)));

        action.mark_created(created);
        assert_eq!(action.expiration(), Some(created + Duration::seconds(60)));
        assert!(action.is_expired_within(created, Duration::seconds(61)));
        assert!(!action.is_expired_within(created, Duration::seconds(30)));
    }

    #[test]
    fn test_zero_expires_at_never_expires() {
        let action: Action = serde_json::from_value(json!({
            "href": "h",
            "expires_at": "0001-01-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(action.expiration(), None);
        assert!(!action.is_expired_within(Utc::now(), Duration::days(365)));
    }

    #[test]
    fn test_pre_epoch_expires_at_is_kept() {
        let at = Utc.with_ymd_and_hms(1969, 7, 20, 20, 17, 0).unwrap();
        let action = Action {
            expires_at: Some(at),
            ..Default::default()
        };
        assert_eq!(action.expiration(), Some(at));
        assert!(action.is_expired_within(Utc::now(), Duration::zero()));
    }

    #[test]
    fn test_huge_expires_in_does_not_overflow() {
        let body = json!({
            "objects": [{
                "oid": "abc",
                "size": 1,
                "actions": {"download": {"href": "h", "expires_in": i64::MAX}}
            }]
        });
        let mut res: BatchResponse = serde_json::from_value(body).unwrap();
        let now = Utc::now();
        for action in res.actions_mut() {
            action.mark_created(now);
        }

        let action = res.objects[0].action(Operation::Download).unwrap();
        assert_eq!(action.expiration(), None);
        assert!(!action.is_expired_within(now, Duration::minutes(5)));

        // A window past the end of time puts every real expiry inside it.
        let action = Action {
            expires_at: Some(now),
            ..Default::default()
        };
        assert!(action.is_expired_within(DateTime::<Utc>::MAX_UTC, Duration::seconds(1)));
    }

    #[test]
    fn test_errored_object_without_size_decodes() {
        let body = json!({
            "transfer": "basic",
            "objects": [{
                "oid": "abc",
                "error": {"code": 404, "message": "Object does not exist"}
            }]
        });
        let res: BatchResponse = serde_json::from_value(body).unwrap();
        assert_eq!(res.objects.len(), 1);
        assert_eq!(res.objects[0].oid, "abc");
        assert_eq!(res.objects[0].size, 0);
        assert_eq!(res.objects[0].error.as_ref().unwrap().code, 404);
    }

    #[test]
    fn test_endpoint_ignores_empty_standalone_name() {
        let endpoint = Endpoint::new("https://lfs.example.com").with_standalone_transfer("");
        assert_eq!(endpoint.standalone_adapter(), None);

        let endpoint = endpoint.with_standalone_transfer("ssh");
        assert_eq!(endpoint.standalone_adapter(), Some("ssh"));
    }
}
