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

//! Drafts: email, SMS and WhatsApp.

use super::ResourceHandler;
use crate::client::RequestEnvelope;
use crate::error::{MissiveError, Result};
use crate::mapper::{
    Body, CONVERSATION_OPTIONS, FieldMapping, apply_mappings, file_attachments, flag, split_csv,
    text,
};
use crate::params::Fields;
use crate::resource::{Operation, Resource};
use serde_json::{Value, json};

const ADDITIONAL: &str = "additionalFields";
const ATTACHMENTS: &str = "additionalFields.attachments.attachment";

const DRAFT_OPTIONS: &[FieldMapping] = &[
    text("scheduleFor", "schedule_for"),
    flag("autoFollowup", "auto_followup"),
];

pub struct DraftHandler;

impl ResourceHandler for DraftHandler {
    fn resource(&self) -> Resource {
        Resource::Draft
    }

    fn build(&self, operation: Operation, fields: &Fields<'_>) -> Result<RequestEnvelope> {
        let draft = match operation {
            Operation::CreateEmail => email_body(fields)?,
            Operation::CreateMessaging => messaging_body(fields)?,
            other => return Err(self.unsupported(other)),
        };
        Ok(RequestEnvelope::post("/drafts", "drafts", draft))
    }
}

pub fn email_body(fields: &Fields<'_>) -> Result<Value> {
    let mut body = Body::new();
    body.put("subject", fields.required_string("subject")?)
        .put("body", fields.required_string("body")?)
        .put("send", fields.bool_or("send", false)?)
        .put("close", fields.bool_or("close", false)?);

    let mut from = Body::new();
    from.put_text("name", fields.non_empty("fromName")?)
        .put_text("address", fields.non_empty("fromEmail")?);
    body.put_object("from_field", from);

    body.put_list("to_fields", recipients(fields, "to.emails")?)
        .put_list("cc_field", recipients(fields, "cc.emails")?)
        .put_list("bcc_field", recipients(fields, "bcc.emails")?);

    apply_mappings(fields, ADDITIONAL, CONVERSATION_OPTIONS, &mut body)?;
    apply_mappings(fields, ADDITIONAL, DRAFT_OPTIONS, &mut body)?;
    body.put_list("attachments", file_attachments(fields, ATTACHMENTS)?);

    Ok(body.into_value())
}

pub fn messaging_body(fields: &Fields<'_>) -> Result<Value> {
    let message_type = fields.string_or("messageType", "")?;
    let whatsapp = message_type.eq_ignore_ascii_case("whatsapp");

    let mut body = Body::new();
    body.put("body", fields.required_string("body")?)
        .put("send", fields.bool_or("send", false)?)
        .put("close", fields.bool_or("close", false)?);

    // SMS goes out without a type, whether given as "" or "sms".
    let channel = Some(message_type).filter(|t| !t.eq_ignore_ascii_case("sms"));
    let mut from = Body::new();
    from.put("phone_number", fields.required_id("fromPhoneNumber")?)
        .put_text("type", channel);
    body.put_object("from_field", from);

    let numbers = split_csv(&fields.required_string("toPhoneNumbers")?);
    if numbers.is_empty() {
        return Err(MissiveError::missing("toPhoneNumbers", fields.item()));
    }
    body.put_list(
        "to_fields",
        numbers
            .into_iter()
            .map(|number| json!({ "phone_number": number }))
            .collect(),
    );

    apply_mappings(fields, ADDITIONAL, CONVERSATION_OPTIONS, &mut body)?;
    apply_mappings(fields, ADDITIONAL, DRAFT_OPTIONS, &mut body)?;

    if whatsapp {
        body.put_text(
            "external_response_id",
            fields.non_empty("additionalFields.externalResponseId")?,
        );
        if let Some(raw) = fields.non_empty("additionalFields.externalResponseVariables")? {
            body.put(
                "external_response_variables",
                response_variables(&raw, fields.item())?,
            );
        }
    }

    body.put_list("attachments", file_attachments(fields, ATTACHMENTS)?);
    Ok(body.into_value())
}

fn recipients(fields: &Fields<'_>, group: &str) -> Result<Vec<Value>> {
    let mut out = Vec::new();
    for row in fields.rows(group)? {
        let mut entry = Body::new();
        entry
            .put_text("name", row.non_empty("name")?)
            .put_text("address", row.non_empty("address")?);
        if !entry.is_empty() {
            out.push(entry.into_value());
        }
    }
    Ok(out)
}

/// WhatsApp template variables arrive as a JSON string and must decode to an
/// object.
fn response_variables(raw: &str, item: usize) -> Result<Value> {
    let invalid = |reason: String| MissiveError::InvalidJsonField {
        field: "externalResponseVariables".to_string(),
        item,
        reason,
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(_) => Err(invalid("expected a JSON object".to_string())),
        Err(e) => Err(invalid(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::HttpMethod;
    use crate::params::tests::batch_of;
    use crate::params::{BinaryRef, Fields};
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde_json::json;

    #[test]
    fn email_draft_maps_recipients_and_options() {
        let batch = batch_of(json!({
            "subject": "Hello",
            "body": "<p>Hi</p>",
            "send": true,
            "fromName": "Support",
            "fromEmail": "",
            "to": {"emails": [
                {"name": "Ann", "address": "ann@example.com"},
                {"name": "", "address": "bob@example.com"}
            ]},
            "cc": {"emails": []},
            "additionalFields": {
                "references": "<a@x>, <b@x>",
                "conversationSubject": "Re: Hello",
                "forceTeam": false,
                "addSharedLabels": "",
                "scheduleFor": "2024-05-01T10:00:00Z",
                "autoFollowup": true
            }
        }));
        let fields = Fields::new(&batch, &batch, 0);

        assert_eq!(
            email_body(&fields).unwrap(),
            json!({
                "subject": "Hello",
                "body": "<p>Hi</p>",
                "send": true,
                "close": false,
                "from_field": {"name": "Support"},
                "to_fields": [
                    {"name": "Ann", "address": "ann@example.com"},
                    {"address": "bob@example.com"}
                ],
                "references": ["<a@x>", "<b@x>"],
                "conversation_subject": "Re: Hello",
                "force_team": false,
                "schedule_for": "2024-05-01T10:00:00Z",
                "auto_followup": true
            })
        );
    }

    #[test]
    fn email_draft_requires_subject() {
        let batch = batch_of(json!({"body": "x"}));
        let fields = Fields::new(&batch, &batch, 0);
        assert!(matches!(
            email_body(&fields),
            Err(MissiveError::MissingRequiredField { ref field, item: 0 }) if field == "subject"
        ));
    }

    #[test]
    fn envelope_wraps_under_drafts() {
        let batch = batch_of(json!({"subject": "s", "body": "b"}));
        let fields = Fields::new(&batch, &batch, 0);
        let envelope = DraftHandler.build(Operation::CreateEmail, &fields).unwrap();
        assert_eq!(envelope.method, HttpMethod::Post);
        assert_eq!(envelope.path, "/drafts");
        assert_eq!(envelope.body.unwrap()["drafts"]["subject"], "s");
    }

    #[test]
    fn whatsapp_draft_parses_variables() {
        let batch = batch_of(json!({
            "body": "Template",
            "fromPhoneNumber": "+15550000",
            "messageType": "whatsapp",
            "toPhoneNumbers": "+15551111, +15552222",
            "additionalFields": {
                "externalResponseId": "tmpl-1",
                "externalResponseVariables": "{\"1\":\"A\"}"
            }
        }));
        let fields = Fields::new(&batch, &batch, 0);
        let body = messaging_body(&fields).unwrap();

        assert_eq!(body["from_field"], json!({"phone_number": "+15550000", "type": "whatsapp"}));
        assert_eq!(
            body["to_fields"],
            json!([{"phone_number": "+15551111"}, {"phone_number": "+15552222"}])
        );
        assert_eq!(body["external_response_id"], "tmpl-1");
        assert_eq!(body["external_response_variables"], json!({"1": "A"}));
    }

    #[test]
    fn whatsapp_variables_must_be_json_object() {
        for raw in ["{bad json", "[1,2]"] {
            let batch = batch_of(json!({
                "body": "x",
                "fromPhoneNumber": "+1",
                "messageType": "whatsapp",
                "toPhoneNumbers": "+2",
                "additionalFields": {"externalResponseVariables": raw}
            }));
            let fields = Fields::new(&batch, &batch, 0);
            match messaging_body(&fields) {
                Err(MissiveError::InvalidJsonField { field, item, .. }) => {
                    assert_eq!(field, "externalResponseVariables");
                    assert_eq!(item, 0);
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn sms_draft_ignores_whatsapp_fields() {
        let batch = batch_of(json!({
            "body": "Ping",
            "fromPhoneNumber": "+1",
            "messageType": "",
            "toPhoneNumbers": "+2",
            "additionalFields": {
                "externalResponseId": "tmpl-1",
                "externalResponseVariables": "{bad json"
            }
        }));
        let fields = Fields::new(&batch, &batch, 0);
        let body = messaging_body(&fields).unwrap();

        assert_eq!(body["from_field"], json!({"phone_number": "+1"}));
        assert!(body.get("external_response_id").is_none());
        assert!(body.get("external_response_variables").is_none());
    }

    #[test]
    fn sms_message_type_is_not_sent() {
        for message_type in ["sms", "SMS"] {
            let batch = batch_of(json!({
                "body": "Ping",
                "fromPhoneNumber": "+1",
                "messageType": message_type,
                "toPhoneNumbers": "+2"
            }));
            let fields = Fields::new(&batch, &batch, 0);
            let body = messaging_body(&fields).unwrap();
            assert_eq!(body["from_field"], json!({"phone_number": "+1"}));
        }
    }

    #[test]
    fn messaging_requires_recipients() {
        let batch = batch_of(json!({
            "body": "x",
            "fromPhoneNumber": "+1",
            "toPhoneNumbers": " , "
        }));
        let fields = Fields::new(&batch, &batch, 0);
        assert!(matches!(
            messaging_body(&fields),
            Err(MissiveError::MissingRequiredField { .. })
        ));
    }

    #[test]
    fn attachments_are_base64_encoded() {
        let mut batch = batch_of(json!({
            "subject": "s",
            "body": "b",
            "additionalFields": {
                "attachments": {"attachment": [{"binaryPropertyName": "report", "fileName": ""}]}
            }
        }));
        batch.items[0].binary.insert(
            "report".into(),
            BinaryRef {
                data: Some(STANDARD.encode("a,b\n1,2\n")),
                mime_type: Some("text/csv".into()),
                file_name: Some("report.csv".into()),
                ..Default::default()
            },
        );
        let fields = Fields::new(&batch, &batch, 0);
        let body = email_body(&fields).unwrap();

        assert_eq!(
            body["attachments"],
            json!([{
                "filename": "report.csv",
                "content_type": "text/csv",
                "content": STANDARD.encode("a,b\n1,2\n"),
            }])
        );
    }

    #[test]
    fn missing_binary_fails_the_item() {
        let batch = batch_of(json!({
            "subject": "s",
            "body": "b",
            "additionalFields": {"attachments": {"attachment": [{"binaryPropertyName": "nope"}]}}
        }));
        let fields = Fields::new(&batch, &batch, 0);
        assert!(matches!(
            email_body(&fields),
            Err(MissiveError::AttachmentResolution { ref property, .. }) if property == "nope"
        ));
    }

    #[test]
    fn mapping_is_deterministic() {
        let batch = batch_of(json!({
            "subject": "s",
            "body": "b",
            "additionalFields": {"addUsers": "u1,u2", "team": "t", "addToInbox": true}
        }));
        let fields = Fields::new(&batch, &batch, 0);
        let first = serde_json::to_string(&email_body(&fields).unwrap()).unwrap();
        let second = serde_json::to_string(&email_body(&fields).unwrap()).unwrap();
        assert_eq!(first, second);
    }
}
