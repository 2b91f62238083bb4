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

use super::{ResourceHandler, query_params, segment};
use crate::client::RequestEnvelope;
use crate::error::Result;
use crate::mapper::{FieldMapping, number};
use crate::params::Fields;
use crate::resource::{Operation, Resource};

const LIST_QUERY: &[FieldMapping] = &[number("limit", "limit"), number("offset", "offset")];

pub struct ConversationHandler;

impl ResourceHandler for ConversationHandler {
    fn resource(&self) -> Resource {
        Resource::Conversation
    }

    fn build(&self, operation: Operation, fields: &Fields<'_>) -> Result<RequestEnvelope> {
        match operation {
            Operation::Get => {
                let id = fields.required_id("conversationId")?;
                Ok(RequestEnvelope::get(format!("/conversations/{}", segment(&id))))
            }
            Operation::GetAll => Ok(RequestEnvelope::get("/conversations")
                .with_query(query_params(fields, "additionalFields", LIST_QUERY)?)),
            other => Err(self.unsupported(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::tests::batch_of;
    use serde_json::json;

    #[test]
    fn get_by_id() {
        let batch = batch_of(json!({"conversationId": "abc"}));
        let fields = Fields::new(&batch, &batch, 0);
        let envelope = ConversationHandler.build(Operation::Get, &fields).unwrap();
        assert_eq!(envelope.path, "/conversations/abc");
        assert!(envelope.query.is_empty());
    }

    #[test]
    fn list_forwards_only_provided_paging() {
        let batch = batch_of(json!({"additionalFields": {"limit": "5"}}));
        let fields = Fields::new(&batch, &batch, 0);
        let envelope = ConversationHandler.build(Operation::GetAll, &fields).unwrap();
        assert_eq!(envelope.query, vec![("limit".to_string(), "5".to_string())]);

        let batch = batch_of(json!({}));
        let fields = Fields::new(&batch, &batch, 0);
        let envelope = ConversationHandler.build(Operation::GetAll, &fields).unwrap();
        assert!(envelope.query.is_empty());
    }
}
