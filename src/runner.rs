// missivectl - CLI and connector for the Missive API
// Copyright (C) 2024 Mathias Uhl <mathiasuhl@gmx.de>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Item loop: runs every input item through extract, map and dispatch, in
//! order, isolating failures when asked to.

use crate::client::ApiClient;
use crate::error::Result;
use crate::handlers::build_request;
use crate::params::{BinarySource, Fields, ParameterSource};
use crate::resource::{Operation, Resource};
use crate::schema::SchemaRegistry;
use serde_json::{Value, json};
use tracing::{debug, trace, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Record failures as `{"error": ...}` rows instead of aborting.
    pub continue_on_fail: bool,
    /// Return request previews without sending anything.
    pub dry_run: bool,
}

/// Run a batch. The output has one entry per input item, in input order,
/// unless an item fails without `continue_on_fail`.
pub fn run_batch(
    client: &ApiClient,
    params: &dyn ParameterSource,
    binaries: &dyn BinarySource,
    resource: Resource,
    operation: Operation,
    options: RunOptions,
) -> Result<Vec<Value>> {
    let count = params.item_count();
    debug!(%resource, %operation, items = count, "running batch");

    let mut output = Vec::with_capacity(count);
    for item in 0..count {
        for name in undeclared_parameters(params, item, resource, operation) {
            warn!(item, parameter = %name, %resource, %operation, "parameter is not used by this operation");
        }

        match run_item(client, params, binaries, item, resource, operation, options.dry_run) {
            Ok(value) => output.push(value),
            Err(err) if options.continue_on_fail => {
                warn!(item, error = %err, "item failed, continuing");
                output.push(json!({ "error": err.to_string() }));
            }
            Err(err) => return Err(err),
        }
    }
    Ok(output)
}

fn run_item(
    client: &ApiClient,
    params: &dyn ParameterSource,
    binaries: &dyn BinarySource,
    item: usize,
    resource: Resource,
    operation: Operation,
    dry_run: bool,
) -> Result<Value> {
    let fields = Fields::new(params, binaries, item);
    let envelope = build_request(resource, operation, &fields)?;
    if let Some(body) = &envelope.body {
        trace!(item, body = %body, "mapped request body");
    }

    if dry_run {
        Ok(client.preview(&envelope))
    } else {
        client.send(&envelope)
    }
}

/// Top-level parameters on an item that the selected operation never reads.
pub fn undeclared_parameters(
    params: &dyn ParameterSource,
    item: usize,
    resource: Resource,
    operation: Operation,
) -> Vec<String> {
    let registry = SchemaRegistry::global();
    params
        .parameter_names(item)
        .into_iter()
        .filter(|name| !registry.is_declared(resource, operation, name))
        .collect()
}
