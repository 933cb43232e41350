// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Standalone transfer fallback
//!
//! When an endpoint names a standalone adapter, the coordinator is skipped:
//! the adapter already knows how to reach every object, so each object gets
//! a single empty, authenticated action and no expiry stamp.

use std::collections::BTreeMap;

use lfs_batch_types::{Action, BatchRequest, BatchResponse, Endpoint, Transfer};

use crate::error::BatchError;

/// Synthesize the response for `adapter` without a network round-trip.
///
/// The request must list `adapter` among its transfer adapter names. An
/// empty list does not count as permission.
pub fn standalone_batch(
    request: &BatchRequest,
    adapter: &str,
    endpoint: Endpoint,
) -> Result<BatchResponse, BatchError> {
    if !request.permits_adapter(adapter) {
        return Err(BatchError::UnsupportedAdapter(adapter.to_string()));
    }

    let operation = request.operation.as_str();
    let objects = request
        .objects
        .iter()
        .map(|object| Transfer {
            oid: object.oid.clone(),
            size: object.size,
            authenticated: true,
            actions: BTreeMap::from([(operation.to_string(), Action::default())]),
            error: None,
        })
        .collect();

    Ok(BatchResponse {
        objects,
        transfer_adapter_name: adapter.to_string(),
        endpoint,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use lfs_batch_types::Operation;
    use pretty_assertions::assert_eq;

    fn request(adapters: &[&str]) -> BatchRequest {
        let mut req = BatchRequest::new(Operation::Upload);
        req.objects = vec![Transfer::new("abc", 10), Transfer::new("def", 20)];
        req.transfer_adapter_names = adapters.iter().map(|s| s.to_string()).collect();
        req
    }

    #[test]
    fn test_fills_empty_authenticated_actions() {
        let endpoint = Endpoint::new("ssh://host/repo").with_standalone_transfer("ssh");
        let res = standalone_batch(&request(&["basic", "ssh"]), "ssh", endpoint.clone()).unwrap();

        assert_eq!(res.transfer_adapter_name, "ssh");
        assert_eq!(res.endpoint, endpoint);
        assert_eq!(res.objects.len(), 2);
        for (object, oid) in res.objects.iter().zip(["abc", "def"]) {
            assert_eq!(object.oid, oid);
            assert!(object.authenticated);
            assert_eq!(object.actions.len(), 1);

            let action = object.action(Operation::Upload).unwrap();
            assert_eq!(action, &Action::default());
            assert_eq!(action.created_at(), None);
        }
    }

    #[test]
    fn test_drops_coordinator_fields_from_input() {
        let mut req = request(&["ssh"]);
        req.objects[0]
            .actions
            .insert("download".to_string(), Action::default());

        let res = standalone_batch(&req, "ssh", Endpoint::default()).unwrap();
        assert_eq!(res.objects[0].actions.keys().collect::<Vec<_>>(), ["upload"]);
    }

    #[test]
    fn test_rejects_unrequested_adapter() {
        let err = standalone_batch(&request(&["basic"]), "ssh", Endpoint::default()).unwrap_err();
        assert!(matches!(err, BatchError::UnsupportedAdapter(ref name) if name == "ssh"));
        assert_eq!(err.to_string(), "standalone transfer 'ssh' not available");
    }

    #[test]
    fn test_empty_adapter_list_is_not_permission() {
        let err = standalone_batch(&request(&[]), "ssh", Endpoint::default()).unwrap_err();
        assert!(matches!(err, BatchError::UnsupportedAdapter(_)));
    }
}
