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

use crate::resource::{Operation, Resource};
use thiserror::Error;

/// Failure of a single item in a batch.
///
/// Every variant is local to the item that produced it; the runner decides
/// whether it aborts the batch or becomes an `{error}` row.
#[derive(Debug, Error)]
pub enum MissiveError {
    #[error("missing required field `{field}` (item {item})")]
    MissingRequiredField { field: String, item: usize },

    #[error("field `{field}` must be a {expected} (item {item})")]
    InvalidFieldType {
        field: String,
        item: usize,
        expected: &'static str,
    },

    #[error("invalid JSON in field `{field}` (item {item}): {reason}")]
    InvalidJsonField {
        field: String,
        item: usize,
        reason: String,
    },

    #[error("at least one of HTML, text, markdown, or attachments must be provided (item {item})")]
    EmptyPostContent { item: usize },

    #[error("could not resolve binary property `{property}` (item {item}): {reason}")]
    AttachmentResolution {
        property: String,
        item: usize,
        reason: String,
    },

    #[error("the operation `{operation}` is not supported for resource `{resource}`")]
    UnsupportedOperation {
        resource: Resource,
        operation: Operation,
    },

    #[error("Missive API returned {status}: {body}")]
    RemoteApi { status: u16, body: String },

    #[error("request to Missive failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl MissiveError {
    pub fn missing(field: impl Into<String>, item: usize) -> Self {
        MissiveError::MissingRequiredField {
            field: field.into(),
            item,
        }
    }

    /// Status code for remote failures, if this error came from the API.
    pub fn remote_status(&self) -> Option<u16> {
        match self {
            MissiveError::RemoteApi { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T, E = MissiveError> = std::result::Result<T, E>;
