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

//! Resource and operation selectors.
//!
//! Wire names match the identifiers a workflow host stores for the
//! `resource` and `operation` parameters (`contactBook`, `getAll`, ...).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Resource {
    Draft,
    Post,
    Contact,
    ContactBook,
    Conversation,
    Organization,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    CreateEmail,
    CreateMessaging,
    Create,
    Get,
    GetAll,
    Update,
    Delete,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown {kind} `{value}`")]
pub struct ParseSelectorError {
    kind: &'static str,
    value: String,
}

impl Resource {
    pub const ALL: [Resource; 6] = [
        Resource::Draft,
        Resource::Post,
        Resource::Contact,
        Resource::ContactBook,
        Resource::Conversation,
        Resource::Organization,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Resource::Draft => "draft",
            Resource::Post => "post",
            Resource::Contact => "contact",
            Resource::ContactBook => "contactBook",
            Resource::Conversation => "conversation",
            Resource::Organization => "organization",
        }
    }

    /// Operations offered for this resource, default first.
    pub fn operations(self) -> &'static [Operation] {
        match self {
            Resource::Draft => &[Operation::CreateEmail, Operation::CreateMessaging],
            Resource::Post => &[Operation::Create],
            Resource::Contact => &[
                Operation::Create,
                Operation::Get,
                Operation::GetAll,
                Operation::Update,
                Operation::Delete,
            ],
            Resource::ContactBook => &[Operation::GetAll],
            Resource::Conversation => &[Operation::GetAll, Operation::Get],
            Resource::Organization => &[Operation::GetAll],
        }
    }

    pub fn supports(self, operation: Operation) -> bool {
        self.operations().contains(&operation)
    }

    pub fn default_operation(self) -> Operation {
        self.operations()[0]
    }
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::CreateEmail => "createEmail",
            Operation::CreateMessaging => "createMessaging",
            Operation::Create => "create",
            Operation::Get => "get",
            Operation::GetAll => "getAll",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resource {
    type Err = ParseSelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resource::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s) || kebab(r.as_str()) == s)
            .ok_or_else(|| ParseSelectorError {
                kind: "resource",
                value: s.to_string(),
            })
    }
}

impl FromStr for Operation {
    type Err = ParseSelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const ALL: [Operation; 7] = [
            Operation::CreateEmail,
            Operation::CreateMessaging,
            Operation::Create,
            Operation::Get,
            Operation::GetAll,
            Operation::Update,
            Operation::Delete,
        ];
        ALL.into_iter()
            .find(|o| o.as_str().eq_ignore_ascii_case(s) || kebab(o.as_str()) == s)
            .ok_or_else(|| ParseSelectorError {
                kind: "operation",
                value: s.to_string(),
            })
    }
}

// "contactBook" -> "contact-book", so CLI users can type either form.
fn kebab(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
