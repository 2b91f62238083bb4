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

//! Resource handlers
//!
//! Each handler turns one item's fields into a routed [`RequestEnvelope`]:
//! it picks the method and path for the operation and, for writes, maps the
//! fields into the body Missive expects.

mod contact;
mod contact_book;
mod conversation;
mod draft;
mod organization;
mod post;

pub use self::contact::ContactHandler;
pub use self::contact_book::ContactBookHandler;
pub use self::conversation::ConversationHandler;
pub use self::draft::DraftHandler;
pub use self::organization::OrganizationHandler;
pub use self::post::PostHandler;

use crate::client::RequestEnvelope;
use crate::error::{MissiveError, Result};
use crate::mapper::{Body, FieldMapping, apply_mappings};
use crate::params::Fields;
use crate::resource::{Operation, Resource};
use serde_json::Value;

/// Request construction for one resource.
pub trait ResourceHandler: Send + Sync {
    fn resource(&self) -> Resource;

    /// Build the request for `operation`. Callers check support first via
    /// [`build_request`]; handlers still reject operations they don't know.
    fn build(&self, operation: Operation, fields: &Fields<'_>) -> Result<RequestEnvelope>;

    fn unsupported(&self, operation: Operation) -> MissiveError {
        MissiveError::UnsupportedOperation {
            resource: self.resource(),
            operation,
        }
    }
}

pub fn handler_for(resource: Resource) -> &'static dyn ResourceHandler {
    match resource {
        Resource::Draft => &DraftHandler,
        Resource::Post => &PostHandler,
        Resource::Contact => &ContactHandler,
        Resource::ContactBook => &ContactBookHandler,
        Resource::Conversation => &ConversationHandler,
        Resource::Organization => &OrganizationHandler,
    }
}

/// Route and map one item.
pub fn build_request(
    resource: Resource,
    operation: Operation,
    fields: &Fields<'_>,
) -> Result<RequestEnvelope> {
    if !resource.supports(operation) {
        return Err(MissiveError::UnsupportedOperation {
            resource,
            operation,
        });
    }
    handler_for(resource).build(operation, fields)
}

/// Percent-encode an identifier for use as a single path segment.
pub(crate) fn segment(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}

/// Query parameters from a mapping table, skipping anything not provided.
pub(crate) fn query_params(
    fields: &Fields<'_>,
    prefix: &str,
    mappings: &[FieldMapping],
) -> Result<Vec<(String, String)>> {
    let mut body = Body::new();
    apply_mappings(fields, prefix, mappings, &mut body)?;

    let Value::Object(map) = body.into_value() else {
        return Ok(Vec::new());
    };
    Ok(map
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (key, value)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::tests::batch_of;
    use serde_json::json;

    #[test]
    fn every_resource_has_its_own_handler() {
        for resource in Resource::ALL {
            assert_eq!(handler_for(resource).resource(), resource);
        }
    }

    #[test]
    fn rejects_operations_outside_the_resource() {
        let batch = batch_of(json!({}));
        let fields = Fields::new(&batch, &batch, 0);
        let err = build_request(Resource::Organization, Operation::Delete, &fields).unwrap_err();
        assert!(matches!(
            err,
            MissiveError::UnsupportedOperation {
                resource: Resource::Organization,
                operation: Operation::Delete,
            }
        ));
    }

    #[test]
    fn segments_are_encoded() {
        assert_eq!(segment("abc-123"), "abc-123");
        assert_eq!(segment("a/b c"), "a%2Fb%20c");
    }
}
