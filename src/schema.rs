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

//! Declarative input fields for every resource and operation
//!
//! Hosts render these as forms; the CLI prints them with `missivectl schema`.
//! The only behaviour attached to the table is visibility: a top-level field
//! is legal for an item only when its resource and operation match.

use crate::resource::{Operation, Resource};
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldType {
    String,
    Boolean,
    Number,
    Options,
    Color,
    DateTime,
    /// Open bag of optional fields (`additionalFields`).
    Collection,
    /// Named groups of rows, e.g. `to.emails[]`.
    FixedCollection,
}

/// When a top-level field is shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Visibility {
    pub resources: Vec<Resource>,
    pub operations: Vec<Operation>,
}

impl Visibility {
    pub fn matches(&self, resource: Resource, operation: Operation) -> bool {
        self.resources.contains(&resource) && self.operations.contains(&operation)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    pub name: &'static str,
    pub display_name: &'static str,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    pub default: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<&'static str>,
    /// Repeatable rows (fixed collections only).
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub multiple: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FieldSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show: Option<Visibility>,
}

impl FieldSpec {
    fn new(name: &'static str, display_name: &'static str, field_type: FieldType) -> Self {
        let default = match field_type {
            FieldType::Boolean => json!(false),
            FieldType::Collection | FieldType::FixedCollection => json!({}),
            _ => json!(""),
        };
        Self {
            name,
            display_name,
            field_type,
            required: false,
            default,
            description: None,
            options: Vec::new(),
            multiple: false,
            children: Vec::new(),
            show: None,
        }
    }

    fn string(name: &'static str, display_name: &'static str) -> Self {
        Self::new(name, display_name, FieldType::String)
    }

    fn boolean(name: &'static str, display_name: &'static str) -> Self {
        Self::new(name, display_name, FieldType::Boolean)
    }

    fn number(name: &'static str, display_name: &'static str, default: i64) -> Self {
        Self::new(name, display_name, FieldType::Number).default(json!(default))
    }

    fn color(name: &'static str, display_name: &'static str) -> Self {
        Self::new(name, display_name, FieldType::Color)
    }

    fn collection(children: Vec<FieldSpec>) -> Self {
        Self::new("additionalFields", "Additional Fields", FieldType::Collection)
            .children(children)
    }

    /// A fixed collection holding one group of rows.
    fn group(
        name: &'static str,
        display_name: &'static str,
        rows: &'static str,
        multiple: bool,
        children: Vec<FieldSpec>,
    ) -> Self {
        let mut row = Self::new(rows, display_name, FieldType::FixedCollection).children(children);
        row.default = Value::Null;
        let mut spec = Self::new(name, display_name, FieldType::FixedCollection).children(vec![row]);
        spec.multiple = multiple;
        spec
    }

    fn required(mut self) -> Self {
        self.required = true;
        self
    }

    fn default(mut self, default: Value) -> Self {
        self.default = default;
        self
    }

    fn describe(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }

    fn options(mut self, options: &[&'static str]) -> Self {
        self.options = options.to_vec();
        self
    }

    fn children(mut self, children: Vec<FieldSpec>) -> Self {
        self.children = children;
        self
    }

    fn show(mut self, resource: Resource, operations: &[Operation]) -> Self {
        self.show = Some(Visibility {
            resources: vec![resource],
            operations: operations.to_vec(),
        });
        self
    }

    pub fn is_visible(&self, resource: Resource, operation: Operation) -> bool {
        self.show
            .as_ref()
            .is_some_and(|show| show.matches(resource, operation))
    }
}

pub struct SchemaRegistry {
    fields: Vec<FieldSpec>,
}

impl SchemaRegistry {
    /// The process-wide table, built on first use.
    pub fn global() -> &'static SchemaRegistry {
        static REGISTRY: OnceLock<SchemaRegistry> = OnceLock::new();
        REGISTRY.get_or_init(SchemaRegistry::new)
    }

    fn new() -> Self {
        let mut fields = Vec::new();
        fields.extend(email_draft_fields());
        fields.extend(messaging_draft_fields());
        fields.extend(post_fields());
        fields.extend(contact_fields());
        fields.extend(conversation_fields());
        Self { fields }
    }

    pub fn fields_for(&self, resource: Resource, operation: Operation) -> Vec<&FieldSpec> {
        self.fields
            .iter()
            .filter(|field| field.is_visible(resource, operation))
            .collect()
    }

    pub fn is_declared(&self, resource: Resource, operation: Operation, name: &str) -> bool {
        self.fields_for(resource, operation)
            .iter()
            .any(|field| field.name == name)
    }

    /// Field table as JSON, optionally narrowed to one resource and operation.
    pub fn to_json(&self, resource: Option<Resource>, operation: Option<Operation>) -> Value {
        let mut out = Vec::new();
        for r in Resource::ALL {
            if resource.is_some_and(|wanted| wanted != r) {
                continue;
            }
            for &op in r.operations() {
                if operation.is_some_and(|wanted| wanted != op) {
                    continue;
                }
                out.push(json!({
                    "resource": r,
                    "operation": op,
                    "default": op == r.default_operation(),
                    "fields": self.fields_for(r, op),
                }));
            }
        }
        Value::Array(out)
    }
}

fn conversation_options() -> Vec<FieldSpec> {
    vec![
        FieldSpec::string("references", "References")
            .describe("References for threading. Format: reference1,reference2"),
        FieldSpec::string("conversation", "Conversation ID"),
        FieldSpec::string("conversationSubject", "Conversation Subject"),
        FieldSpec::color("conversationColor", "Conversation Color"),
        FieldSpec::string("team", "Team ID"),
        FieldSpec::boolean("forceTeam", "Force Team"),
        FieldSpec::string("organization", "Organization ID"),
        FieldSpec::string("addUsers", "Add Users")
            .describe("User IDs to get access to the conversation. Format: id1,id2"),
        FieldSpec::string("addAssignees", "Add Assignees").describe("Format: id1,id2"),
        FieldSpec::string("addSharedLabels", "Add Shared Labels").describe("Format: id1,id2"),
        FieldSpec::string("removeSharedLabels", "Remove Shared Labels")
            .describe("Format: id1,id2"),
        FieldSpec::boolean("addToInbox", "Add to Inbox"),
        FieldSpec::boolean("addToTeamInbox", "Add to Team Inbox"),
    ]
}

fn draft_options() -> Vec<FieldSpec> {
    vec![
        FieldSpec::new("scheduleFor", "Schedule For", FieldType::DateTime),
        FieldSpec::boolean("autoFollowup", "Auto Follow-up"),
    ]
}

fn file_attachments() -> FieldSpec {
    FieldSpec::group(
        "attachments",
        "Attachments",
        "attachment",
        true,
        vec![
            FieldSpec::string("binaryPropertyName", "Binary Property").default(json!("data")),
            FieldSpec::string("fileName", "File Name").describe("Name of the attachment file"),
        ],
    )
}

fn recipients(name: &'static str, display_name: &'static str) -> FieldSpec {
    FieldSpec::group(
        name,
        display_name,
        "emails",
        true,
        vec![
            FieldSpec::string("name", "Name"),
            FieldSpec::string("address", "Email"),
        ],
    )
}

fn email_draft_fields() -> Vec<FieldSpec> {
    let ops = [Operation::CreateEmail];
    let mut additional = conversation_options();
    additional.extend(draft_options());
    additional.push(file_attachments());

    vec![
        FieldSpec::string("subject", "Subject").required(),
        FieldSpec::string("body", "Body").required(),
        FieldSpec::boolean("send", "Send"),
        FieldSpec::boolean("close", "Close"),
        FieldSpec::string("fromName", "From Name").describe("Name of the sender"),
        FieldSpec::string("fromEmail", "From Email"),
        recipients("to", "To"),
        recipients("cc", "CC"),
        recipients("bcc", "BCC"),
        FieldSpec::collection(additional),
    ]
    .into_iter()
    .map(|field| field.show(Resource::Draft, &ops))
    .collect()
}

fn messaging_draft_fields() -> Vec<FieldSpec> {
    let ops = [Operation::CreateMessaging];
    let mut additional = conversation_options();
    additional.extend(draft_options());
    additional.push(FieldSpec::string("externalResponseId", "External Response ID"));
    additional.push(
        FieldSpec::string("externalResponseVariables", "External Response Variables")
            .describe("JSON object of template variables, WhatsApp only"),
    );
    additional.push(file_attachments());

    vec![
        FieldSpec::string("body", "Body").required(),
        FieldSpec::boolean("send", "Send"),
        FieldSpec::boolean("close", "Close"),
        FieldSpec::string("fromPhoneNumber", "From Phone Number").required(),
        FieldSpec::new("messageType", "Message Type", FieldType::Options)
            .options(&["sms", "whatsapp"]),
        FieldSpec::string("toPhoneNumbers", "To Phone Numbers")
            .required()
            .describe("Phone numbers to send to. Use comma to separate multiple numbers."),
        FieldSpec::collection(additional),
    ]
    .into_iter()
    .map(|field| field.show(Resource::Draft, &ops))
    .collect()
}

fn post_fields() -> Vec<FieldSpec> {
    let mut additional = conversation_options();
    additional.extend([
        FieldSpec::boolean("close", "Close Conversation"),
        FieldSpec::boolean("reopen", "Re-open Conversation"),
        FieldSpec::boolean("markAsUnread", "Mark as Unread"),
        FieldSpec::boolean("suppressNotifications", "Suppress Notifications"),
        FieldSpec::boolean("system", "Send as System Message"),
        FieldSpec::string("username", "Custom Username"),
        FieldSpec::string("username_icon", "Custom Username Icon"),
        FieldSpec::string("conversation_icon", "Custom Conversation Icon"),
        FieldSpec::string("text", "Text (Plain)"),
        FieldSpec::string("markdown", "Markdown"),
        FieldSpec::group(
            "notification",
            "Notification",
            "value",
            false,
            vec![
                FieldSpec::string("title", "Title"),
                FieldSpec::string("body", "Body"),
            ],
        ),
        FieldSpec::group(
            "attachments",
            "Attachments",
            "attachment",
            true,
            vec![
                FieldSpec::string("binaryPropertyName", "Binary Property")
                    .describe("Binary property to attach; leave empty for a card without a file"),
                FieldSpec::string("fileName", "File Name"),
                FieldSpec::group(
                    "fields",
                    "Attachment Fields",
                    "field",
                    true,
                    vec![
                        FieldSpec::string("title", "Title"),
                        FieldSpec::string("value", "Value"),
                        FieldSpec::boolean("short", "Short"),
                    ],
                ),
                FieldSpec::color("color", "Color"),
                FieldSpec::string("pretext", "Pretext"),
                FieldSpec::string("author_name", "Author Name"),
                FieldSpec::string("author_link", "Author Link"),
                FieldSpec::string("author_icon", "Author Icon"),
                FieldSpec::string("title", "Title"),
                FieldSpec::string("title_link", "Title Link"),
                FieldSpec::string("image_url", "Image URL"),
                FieldSpec::string("text", "Text"),
                FieldSpec::string("markdown", "Markdown"),
                FieldSpec::new("timestamp", "Timestamp", FieldType::Number),
                FieldSpec::string("footer", "Footer"),
                FieldSpec::string("footer_icon", "Footer Icon"),
            ],
        ),
    ]);

    let ops = [Operation::Create];
    vec![
        FieldSpec::string("html", "HTML Content")
            .describe("Post content; may be empty when text, markdown or attachments are set"),
        FieldSpec::collection(additional),
    ]
    .into_iter()
    .map(|field| field.show(Resource::Post, &ops))
    .collect()
}

fn contact_fields() -> Vec<FieldSpec> {
    let by_id = [Operation::Get, Operation::Update, Operation::Delete];
    let writes = [Operation::Create, Operation::Update];

    vec![
        FieldSpec::string("contactId", "Contact ID")
            .required()
            .describe("ID of the contact")
            .show(Resource::Contact, &by_id),
        FieldSpec::string("contactBookId", "Contact Book ID")
            .required()
            .describe("ID of the contact book to store the contact in")
            .show(Resource::Contact, &writes),
        FieldSpec::string("name", "Name")
            .describe("Name of the contact")
            .show(Resource::Contact, &writes),
        FieldSpec::string("emails", "Emails")
            .describe("Format: email1,email2")
            .show(Resource::Contact, &writes),
        FieldSpec::collection(vec![
            FieldSpec::string("phones", "Phones")
                .describe("Phone numbers of the contact. Format: phone1,phone2"),
            FieldSpec::string("websites", "Websites").describe("Format: url1,url2"),
            FieldSpec::string("company", "Company"),
            FieldSpec::string("birthday", "Birthday"),
            FieldSpec::string("description", "Description"),
        ])
        .show(Resource::Contact, &writes),
        FieldSpec::collection(vec![
            FieldSpec::string("contactBookId", "Contact Book ID"),
            FieldSpec::string("q", "Search Query"),
            FieldSpec::number("limit", "Limit", 100),
            FieldSpec::number("offset", "Offset", 0),
        ])
        .show(Resource::Contact, &[Operation::GetAll]),
    ]
}

fn conversation_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::string("conversationId", "Conversation ID")
            .required()
            .show(Resource::Conversation, &[Operation::Get]),
        FieldSpec::collection(vec![
            FieldSpec::number("limit", "Limit", 100),
            FieldSpec::number("offset", "Offset", 0),
        ])
        .show(Resource::Conversation, &[Operation::GetAll]),
    ]
}
