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

//! Field mapping shared by the resource handlers.
//!
//! Input field names are camelCase, Missive wire names are snake_case. Most
//! optional fields follow one of a handful of inclusion rules, so they are
//! described as [`FieldMapping`] tables and applied in order; anything with
//! structure (recipients, attachments, notifications) is built by hand in the
//! handler that owns it.

use crate::error::Result;
use crate::params::Fields;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Map, Number, Value};

/// How a source field is turned into a wire value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Included when the string is non-empty.
    Text,
    /// Comma-separated list, trimmed per element; omitted when empty.
    Csv,
    /// Included whenever set, including an explicit `false`.
    Flag,
    /// Included whenever set, including zero.
    Number,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldMapping {
    pub source: &'static str,
    pub wire: &'static str,
    pub kind: FieldKind,
}

pub const fn text(source: &'static str, wire: &'static str) -> FieldMapping {
    FieldMapping {
        source,
        wire,
        kind: FieldKind::Text,
    }
}

pub const fn csv(source: &'static str, wire: &'static str) -> FieldMapping {
    FieldMapping {
        source,
        wire,
        kind: FieldKind::Csv,
    }
}

pub const fn flag(source: &'static str, wire: &'static str) -> FieldMapping {
    FieldMapping {
        source,
        wire,
        kind: FieldKind::Flag,
    }
}

pub const fn number(source: &'static str, wire: &'static str) -> FieldMapping {
    FieldMapping {
        source,
        wire,
        kind: FieldKind::Number,
    }
}

/// Conversation options accepted by both drafts and posts.
pub const CONVERSATION_OPTIONS: &[FieldMapping] = &[
    csv("references", "references"),
    text("conversation", "conversation"),
    text("conversationSubject", "conversation_subject"),
    text("conversationColor", "conversation_color"),
    text("team", "team"),
    flag("forceTeam", "force_team"),
    text("organization", "organization"),
    csv("addUsers", "add_users"),
    csv("addAssignees", "add_assignees"),
    csv("addSharedLabels", "add_shared_labels"),
    csv("removeSharedLabels", "remove_shared_labels"),
    flag("addToInbox", "add_to_inbox"),
    flag("addToTeamInbox", "add_to_team_inbox"),
];

/// Split a comma-separated field, trimming each element and dropping blanks.
pub fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// JSON object under construction. Keys keep insertion order only as far as
/// `serde_json::Map` does; callers never depend on it.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Body {
    map: Map<String, Value>,
}

impl Body {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.map.insert(key.to_string(), value.into());
        self
    }

    pub fn put_text(&mut self, key: &str, value: Option<String>) -> &mut Self {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            self.put(key, value);
        }
        self
    }

    pub fn put_csv(&mut self, key: &str, raw: Option<String>) -> &mut Self {
        if let Some(raw) = raw {
            let values = split_csv(&raw);
            if !values.is_empty() {
                self.put(key, values);
            }
        }
        self
    }

    pub fn put_flag(&mut self, key: &str, value: Option<bool>) -> &mut Self {
        if let Some(value) = value {
            self.put(key, value);
        }
        self
    }

    pub fn put_number(&mut self, key: &str, value: Option<Number>) -> &mut Self {
        if let Some(value) = value {
            self.put(key, Value::Number(value));
        }
        self
    }

    /// Insert an array only when it has entries.
    pub fn put_list(&mut self, key: &str, values: Vec<Value>) -> &mut Self {
        if !values.is_empty() {
            self.put(key, Value::Array(values));
        }
        self
    }

    pub fn put_object(&mut self, key: &str, body: Body) -> &mut Self {
        if !body.is_empty() {
            self.put(key, body.into_value());
        }
        self
    }

    /// Copy every key of `other` into this body.
    pub fn merge(&mut self, other: Body) -> &mut Self {
        self.map.extend(other.map);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.map)
    }
}

/// Apply a mapping table, reading each source relative to `prefix`
/// (usually `additionalFields`).
pub fn apply_mappings(
    fields: &Fields<'_>,
    prefix: &str,
    mappings: &[FieldMapping],
    body: &mut Body,
) -> Result<()> {
    for mapping in mappings {
        let path = if prefix.is_empty() {
            mapping.source.to_string()
        } else {
            format!("{prefix}.{}", mapping.source)
        };
        match mapping.kind {
            FieldKind::Text => {
                body.put_text(mapping.wire, fields.non_empty(&path)?);
            }
            FieldKind::Csv => {
                body.put_csv(mapping.wire, fields.string(&path)?);
            }
            FieldKind::Flag => {
                body.put_flag(mapping.wire, fields.bool(&path)?);
            }
            FieldKind::Number => {
                body.put_number(mapping.wire, fields.number(&path)?);
            }
        }
    }
    Ok(())
}

/// Resolve a binary property into Missive's inline attachment shape.
///
/// File name precedence: explicit `fileName`, then the payload's own name,
/// then `"unknown"`.
pub fn encode_attachment(
    fields: &Fields<'_>,
    property: &str,
    file_name: Option<String>,
) -> Result<Body> {
    let data = fields.binary(property)?;
    let filename = file_name
        .filter(|n| !n.is_empty())
        .or(data.file_name.filter(|n| !n.is_empty()))
        .unwrap_or_else(|| "unknown".to_string());
    let content_type = data
        .mime_type
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let mut out = Body::new();
    out.put("filename", filename)
        .put("content_type", content_type)
        .put("content", STANDARD.encode(&data.bytes));
    Ok(out)
}

/// File attachments for drafts: `additionalFields.attachments.attachment`
/// rows, each naming a binary property.
pub fn file_attachments(fields: &Fields<'_>, group: &str) -> Result<Vec<Value>> {
    fields
        .rows(group)?
        .iter()
        .map(|row| {
            let property = row.string_or("binaryPropertyName", "data")?;
            encode_attachment(row, &property, row.non_empty("fileName")?).map(Body::into_value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::tests::batch_of;
    use crate::params::{BinaryRef, Fields};
    use serde_json::json;

    #[test]
    fn csv_trims_and_drops_blanks() {
        assert_eq!(split_csv("a, b ,c"), vec!["a", "b", "c"]);
        assert_eq!(split_csv(" x ,, y,"), vec!["x", "y"]);
        assert!(split_csv("").is_empty());
        assert!(split_csv(" , ").is_empty());
    }

    #[test]
    fn mappings_follow_inclusion_rules() {
        let batch = batch_of(json!({
            "additionalFields": {
                "references": "a, b ,c",
                "addUsers": "",
                "conversationSubject": "Quarterly",
                "team": "",
                "forceTeam": false,
            }
        }));
        let fields = Fields::new(&batch, &batch, 0);
        let mut body = Body::new();
        apply_mappings(&fields, "additionalFields", CONVERSATION_OPTIONS, &mut body).unwrap();

        assert_eq!(
            body.into_value(),
            json!({
                "references": ["a", "b", "c"],
                "conversation_subject": "Quarterly",
                "force_team": false,
            })
        );
    }

    #[test]
    fn number_mapping_keeps_zero() {
        let batch = batch_of(json!({"additionalFields": {"offset": 0}}));
        let fields = Fields::new(&batch, &batch, 0);
        let mut body = Body::new();
        apply_mappings(
            &fields,
            "additionalFields",
            &[number("offset", "offset"), number("limit", "limit")],
            &mut body,
        )
        .unwrap();
        assert_eq!(body.into_value(), json!({"offset": 0}));
    }

    #[test]
    fn attachment_defaults_name_and_type() {
        let mut batch = batch_of(json!({}));
        batch.items[0].binary.insert(
            "data".into(),
            BinaryRef {
                data: Some(STANDARD.encode([0u8, 159, 146, 150])),
                ..Default::default()
            },
        );
        let fields = Fields::new(&batch, &batch, 0);
        let encoded = encode_attachment(&fields, "data", None).unwrap().into_value();
        assert_eq!(
            encoded,
            json!({
                "filename": "unknown",
                "content_type": "application/octet-stream",
                "content": "AJ+Slg==",
            })
        );

        let named = encode_attachment(&fields, "data", Some("blob.bin".into()))
            .unwrap()
            .into_value();
        assert_eq!(named["filename"], "blob.bin");
    }

    #[test]
    fn empty_objects_and_lists_are_omitted() {
        let mut body = Body::new();
        body.put_list("to_fields", vec![]);
        body.put_object("from_field", Body::new());
        body.put_text("subject", Some(String::new()));
        assert!(body.is_empty());
    }
}
