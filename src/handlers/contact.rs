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

//! Contacts: CRUD plus listing with search and paging.

use super::{ResourceHandler, query_params, segment};
use crate::client::RequestEnvelope;
use crate::error::Result;
use crate::mapper::{Body, FieldMapping, apply_mappings, csv, number, text};
use crate::params::Fields;
use crate::resource::{Operation, Resource};
use serde_json::Value;

const CONTACT_FIELDS: &[FieldMapping] = &[text("name", "name"), csv("emails", "emails")];

const CONTACT_OPTIONS: &[FieldMapping] = &[
    csv("phones", "phones"),
    csv("websites", "websites"),
    text("company", "company"),
    text("birthday", "birthday"),
    text("description", "description"),
];

const LIST_QUERY: &[FieldMapping] = &[
    text("contactBookId", "contact_book_id"),
    text("q", "q"),
    number("limit", "limit"),
    number("offset", "offset"),
];

pub struct ContactHandler;

impl ResourceHandler for ContactHandler {
    fn resource(&self) -> Resource {
        Resource::Contact
    }

    fn build(&self, operation: Operation, fields: &Fields<'_>) -> Result<RequestEnvelope> {
        let envelope = match operation {
            Operation::Create => RequestEnvelope::post("/contacts", "contacts", contact_body(fields)?),
            Operation::Get => RequestEnvelope::get(contact_path(fields)?),
            Operation::GetAll => RequestEnvelope::get("/contacts")
                .with_query(query_params(fields, "additionalFields", LIST_QUERY)?),
            Operation::Update => {
                let path = contact_path(fields)?;
                RequestEnvelope::put(path, "contacts", contact_body(fields)?)
            }
            Operation::Delete => RequestEnvelope::delete(contact_path(fields)?),
            other => return Err(self.unsupported(other)),
        };
        Ok(envelope)
    }
}

fn contact_path(fields: &Fields<'_>) -> Result<String> {
    Ok(format!("/contacts/{}", segment(&fields.required_id("contactId")?)))
}

pub fn contact_body(fields: &Fields<'_>) -> Result<Value> {
    let mut body = Body::new();
    body.put("contact_book_id", fields.required_string("contactBookId")?);
    apply_mappings(fields, "", CONTACT_FIELDS, &mut body)?;
    apply_mappings(fields, "additionalFields", CONTACT_OPTIONS, &mut body)?;
    Ok(body.into_value())
}
