// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Batch request assembly

use lfs_batch_types::{BASIC_ADAPTER, BatchRequest, Operation, Transfer};

/// Builds a [`BatchRequest`] from a direction, the candidate objects and the
/// adapter names the client supports.
#[derive(Clone, Debug)]
pub struct BatchRequestBuilder {
    operation: Operation,
    objects: Vec<Transfer>,
    adapters: Vec<String>,
}

impl BatchRequestBuilder {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            objects: Vec::new(),
            adapters: Vec::new(),
        }
    }

    pub fn object(mut self, object: Transfer) -> Self {
        self.objects.push(object);
        self
    }

    pub fn objects(mut self, objects: impl IntoIterator<Item = Transfer>) -> Self {
        self.objects.extend(objects);
        self
    }

    pub fn adapter(mut self, name: impl Into<String>) -> Self {
        self.adapters.push(name.into());
        self
    }

    pub fn adapters<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.adapters.extend(names.into_iter().map(Into::into));
        self
    }

    /// A batch with no objects is never sent.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn build(self) -> BatchRequest {
        BatchRequest {
            operation: self.operation,
            objects: self.objects,
            transfer_adapter_names: self.adapters,
        }
    }
}

/// Drop an adapter list that only names the basic adapter; omitting the list
/// means the same thing on the wire.
pub fn normalize_adapter_names(names: &mut Vec<String>) {
    if names.len() == 1 && names[0] == BASIC_ADAPTER {
        names.clear();
    }
}

/// Adapter names the client supports, per direction.
///
/// The basic adapter is always registered.
#[derive(Clone, Debug)]
pub struct AdapterManifest {
    upload: Vec<String>,
    download: Vec<String>,
}

impl Default for AdapterManifest {
    fn default() -> Self {
        Self {
            upload: vec![BASIC_ADAPTER.to_string()],
            download: vec![BASIC_ADAPTER.to_string()],
        }
    }
}

impl AdapterManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` for `operation`. Registering twice is a no-op.
    pub fn register(&mut self, operation: Operation, name: impl Into<String>) {
        let name = name.into();
        let names = self.names_mut(operation);
        if !names.contains(&name) {
            names.push(name);
        }
    }

    /// Register `name` for both directions.
    pub fn with_adapter(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.register(Operation::Upload, name.clone());
        self.register(Operation::Download, name);
        self
    }

    pub fn adapter_names(&self, operation: Operation) -> &[String] {
        match operation {
            Operation::Upload => &self.upload,
            Operation::Download => &self.download,
        }
    }

    fn names_mut(&mut self, operation: Operation) -> &mut Vec<String> {
        match operation {
            Operation::Upload => &mut self.upload,
            Operation::Download => &mut self.download,
        }
    }
}
