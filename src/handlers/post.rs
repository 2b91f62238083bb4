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

//! Posts: messages injected into a conversation, with rich attachments.

use super::ResourceHandler;
use crate::client::RequestEnvelope;
use crate::error::{MissiveError, Result};
use crate::mapper::{
    Body, CONVERSATION_OPTIONS, FieldMapping, apply_mappings, encode_attachment, flag, number,
    text,
};
use crate::params::Fields;
use crate::resource::{Operation, Resource};
use serde_json::Value;

const ADDITIONAL: &str = "additionalFields";
const ATTACHMENTS: &str = "additionalFields.attachments.attachment";

const POST_OPTIONS: &[FieldMapping] = &[
    text("text", "text"),
    text("markdown", "markdown"),
    text("username", "username"),
    text("username_icon", "username_icon"),
    text("conversation_icon", "conversation_icon"),
    flag("close", "close"),
    flag("reopen", "reopen"),
    flag("markAsUnread", "mark_as_unread"),
    flag("suppressNotifications", "suppress_notifications"),
    flag("system", "system"),
];

const ATTACHMENT_METADATA: &[FieldMapping] = &[
    text("color", "color"),
    text("pretext", "pretext"),
    text("author_name", "author_name"),
    text("author_link", "author_link"),
    text("author_icon", "author_icon"),
    text("title", "title"),
    text("title_link", "title_link"),
    text("image_url", "image_url"),
    text("text", "text"),
    text("markdown", "markdown"),
    number("timestamp", "timestamp"),
    text("footer", "footer"),
    text("footer_icon", "footer_icon"),
];

pub struct PostHandler;

impl ResourceHandler for PostHandler {
    fn resource(&self) -> Resource {
        Resource::Post
    }

    fn build(&self, operation: Operation, fields: &Fields<'_>) -> Result<RequestEnvelope> {
        match operation {
            Operation::Create => Ok(RequestEnvelope::post("/posts", "posts", post_body(fields)?)),
            other => Err(self.unsupported(other)),
        }
    }
}

pub fn post_body(fields: &Fields<'_>) -> Result<Value> {
    let html = fields.non_empty("html")?;
    let has_text = fields.non_empty("additionalFields.text")?.is_some();
    let has_markdown = fields.non_empty("additionalFields.markdown")?.is_some();
    let mut attachments = Vec::new();
    for row in &fields.rows(ATTACHMENTS)? {
        let attachment = attachment(row)?;
        if !attachment.is_empty() {
            attachments.push(attachment.into_value());
        }
    }

    if html.is_none() && !has_text && !has_markdown && attachments.is_empty() {
        return Err(MissiveError::EmptyPostContent {
            item: fields.item(),
        });
    }

    let mut body = Body::new();
    body.put_text("html", html);
    apply_mappings(fields, ADDITIONAL, POST_OPTIONS, &mut body)?;

    if let Some(notification) = fields.group("additionalFields.notification.value")? {
        let mut entry = Body::new();
        entry
            .put("title", notification.string_or("title", "")?)
            .put("body", notification.string_or("body", "")?);
        body.put_object("notification", entry);
    }

    apply_mappings(fields, ADDITIONAL, CONVERSATION_OPTIONS, &mut body)?;

    body.put_list("attachments", attachments);

    Ok(body.into_value())
}

// A post attachment may carry a file, card-style metadata, or both.
fn attachment(row: &Fields<'_>) -> Result<Body> {
    let mut out = Body::new();

    if let Some(property) = row.non_empty("binaryPropertyName")? {
        out.merge(encode_attachment(row, &property, row.non_empty("fileName")?)?);
    }

    let mut card_fields = Vec::new();
    for field in row.rows("fields.field")? {
        let mut entry = Body::new();
        entry
            .put("title", field.string_or("title", "")?)
            .put("value", field.string_or("value", "")?)
            .put("short", field.bool_or("short", false)?);
        card_fields.push(entry.into_value());
    }
    out.put_list("fields", card_fields);

    apply_mappings(row, "", ATTACHMENT_METADATA, &mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::tests::batch_of;
    use crate::params::{BinaryRef, Fields};
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde_json::json;

    #[test]
    fn empty_post_is_rejected_before_dispatch() {
        let batch = batch_of(json!({
            "html": "",
            "additionalFields": {"text": "", "markdown": "", "conversation": "c1"}
        }));
        let fields = Fields::new(&batch, &batch, 0);
        assert!(matches!(
            PostHandler.build(Operation::Create, &fields),
            Err(MissiveError::EmptyPostContent { item: 0 })
        ));
    }

    #[test]
    fn attachment_rows_that_map_to_nothing_are_not_content() {
        let batch = batch_of(json!({
            "additionalFields": {"attachments": {"attachment": [{}, {"pretext": ""}]}}
        }));
        let fields = Fields::new(&batch, &batch, 0);
        assert!(matches!(
            post_body(&fields),
            Err(MissiveError::EmptyPostContent { item: 0 })
        ));
    }

    #[test]
    fn any_single_content_field_is_enough() {
        for params in [
            json!({"html": "<b>hi</b>"}),
            json!({"additionalFields": {"text": "hi"}}),
            json!({"additionalFields": {"markdown": "**hi**"}}),
            json!({"additionalFields": {"attachments": {"attachment": [{"title": "Card"}]}}}),
        ] {
            let batch = batch_of(params);
            let fields = Fields::new(&batch, &batch, 0);
            assert!(post_body(&fields).is_ok());
        }
    }

    #[test]
    fn maps_options_notification_and_flags() {
        let batch = batch_of(json!({
            "html": "<p>Deploy finished</p>",
            "additionalFields": {
                "conversation": "conv-1",
                "username": "CI",
                "markAsUnread": true,
                "close": false,
                "addAssignees": "u1, u2",
                "notification": {"value": {"title": "Deploy"}}
            }
        }));
        let fields = Fields::new(&batch, &batch, 0);

        assert_eq!(
            post_body(&fields).unwrap(),
            json!({
                "html": "<p>Deploy finished</p>",
                "username": "CI",
                "close": false,
                "mark_as_unread": true,
                "notification": {"title": "Deploy", "body": ""},
                "conversation": "conv-1",
                "add_assignees": ["u1", "u2"]
            })
        );
    }

    #[test]
    fn rich_attachment_with_file_and_fields() {
        let mut batch = batch_of(json!({
            "additionalFields": {
                "attachments": {"attachment": [{
                    "binaryPropertyName": "data",
                    "fileName": "build.log",
                    "color": "#2266ff",
                    "title": "Build 42",
                    "timestamp": 1700000000,
                    "pretext": "",
                    "fields": {"field": [
                        {"title": "Branch", "value": "main", "short": true},
                        {"title": "Status", "value": "green"}
                    ]}
                }]}
            }
        }));
        batch.items[0].binary.insert(
            "data".into(),
            BinaryRef {
                data: Some(STANDARD.encode("ok")),
                mime_type: Some("text/plain".into()),
                ..Default::default()
            },
        );
        let fields = Fields::new(&batch, &batch, 0);
        let body = post_body(&fields).unwrap();

        assert_eq!(
            body["attachments"],
            json!([{
                "filename": "build.log",
                "content_type": "text/plain",
                "content": STANDARD.encode("ok"),
                "fields": [
                    {"title": "Branch", "value": "main", "short": true},
                    {"title": "Status", "value": "green", "short": false}
                ],
                "color": "#2266ff",
                "title": "Build 42",
                "timestamp": 1700000000
            }])
        );
    }
}
