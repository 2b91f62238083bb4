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

//! Per-item parameter extraction.
//!
//! A workflow host hands us loosely typed values: strings that may be empty,
//! booleans that may be missing, repeatable groups nested one level deep
//! (`to.emails`, `attachments.attachment`). [`Fields`] resolves dotted paths
//! against those values and converts them to the type the mapper asks for,
//! reporting the full path and item index when something is off.

use crate::error::{MissiveError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use std::path::PathBuf;

/// Source of raw parameter values, keyed by item index and top-level name.
pub trait ParameterSource {
    fn item_count(&self) -> usize;

    fn parameter(&self, item: usize, name: &str) -> Option<&Value>;

    /// Top-level parameter names set on an item.
    fn parameter_names(&self, item: usize) -> Vec<String>;
}

/// Source of binary payloads attached to input items.
pub trait BinarySource {
    fn binary(&self, item: usize, property: &str) -> std::result::Result<BinaryData, String>;
}

/// Resolved binary payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryData {
    pub bytes: Vec<u8>,
    pub mime_type: Option<String>,
    pub file_name: Option<String>,
}

/// Reference to a binary payload as it appears in a batch document: either
/// inline base64 `data` or a `path` on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BinaryRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

impl BinaryRef {
    pub fn resolve(&self) -> std::result::Result<BinaryData, String> {
        let bytes = match (&self.data, &self.path) {
            (Some(data), _) => STANDARD
                .decode(data.trim())
                .map_err(|e| format!("invalid base64 data: {e}"))?,
            (None, Some(path)) => std::fs::read(path)
                .map_err(|e| format!("reading {}: {e}", path.display()))?,
            (None, None) => return Err("neither `data` nor `path` is set".into()),
        };

        let file_name = self.file_name.clone().or_else(|| {
            self.path
                .as_ref()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
        });

        Ok(BinaryData {
            bytes,
            mime_type: self.mime_type.clone(),
            file_name,
        })
    }
}

/// One input item: its parameter bag and named binary payloads.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InputItem {
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub binary: HashMap<String, BinaryRef>,
}

impl InputItem {
    pub fn with_parameters(parameters: Value) -> Self {
        let parameters = match parameters {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            parameters,
            binary: HashMap::new(),
        }
    }
}

/// A batch of input items, the in-memory host used by the CLI and tests.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Batch {
    pub items: Vec<InputItem>,
}

impl Batch {
    pub fn new(items: Vec<InputItem>) -> Self {
        Self { items }
    }

    /// Accepts `{"items": [...]}` or a bare array of items.
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        match value {
            Value::Array(_) => Ok(Self {
                items: serde_json::from_value(value)?,
            }),
            other => serde_json::from_value(other),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl ParameterSource for Batch {
    fn item_count(&self) -> usize {
        self.items.len()
    }

    fn parameter(&self, item: usize, name: &str) -> Option<&Value> {
        self.items.get(item)?.parameters.get(name)
    }

    fn parameter_names(&self, item: usize) -> Vec<String> {
        self.items
            .get(item)
            .map(|i| i.parameters.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl BinarySource for Batch {
    fn binary(&self, item: usize, property: &str) -> std::result::Result<BinaryData, String> {
        let input = self
            .items
            .get(item)
            .ok_or_else(|| format!("no input item {item}"))?;
        let reference = input
            .binary
            .get(property)
            .ok_or_else(|| format!("item has no binary property named `{property}`"))?;
        reference.resolve()
    }
}

#[derive(Clone, Copy)]
enum Root<'a> {
    Source(&'a dyn ParameterSource),
    Row(&'a Map<String, Value>),
}

/// Typed view over one item's parameters, or over one row of a repeatable
/// group inside it.
#[derive(Clone)]
pub struct Fields<'a> {
    root: Root<'a>,
    binaries: &'a dyn BinarySource,
    item: usize,
    base: String,
}

impl<'a> Fields<'a> {
    pub fn new(params: &'a dyn ParameterSource, binaries: &'a dyn BinarySource, item: usize) -> Self {
        Self {
            root: Root::Source(params),
            binaries,
            item,
            base: String::new(),
        }
    }

    pub fn item(&self) -> usize {
        self.item
    }

    fn qualified(&self, path: &str) -> String {
        if self.base.is_empty() {
            path.to_string()
        } else {
            format!("{}.{}", self.base, path)
        }
    }

    /// Raw value at a dotted path. JSON `null` counts as absent.
    pub fn value(&self, path: &str) -> Option<&'a Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = match self.root {
            Root::Source(source) => source.parameter(self.item, first)?,
            Root::Row(map) => map.get(first)?,
        };
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        if current.is_null() { None } else { Some(current) }
    }

    /// String value if present (possibly empty).
    pub fn string(&self, path: &str) -> Result<Option<String>> {
        match self.value(path) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(Value::Bool(b)) => Ok(Some(b.to_string())),
            Some(_) => Err(self.type_error(path, "string")),
        }
    }

    /// String value only when present and non-empty.
    pub fn non_empty(&self, path: &str) -> Result<Option<String>> {
        Ok(self.string(path)?.filter(|s| !s.is_empty()))
    }

    pub fn string_or(&self, path: &str, default: &str) -> Result<String> {
        Ok(self.string(path)?.unwrap_or_else(|| default.to_string()))
    }

    pub fn required_string(&self, path: &str) -> Result<String> {
        self.string(path)?
            .ok_or_else(|| MissiveError::missing(self.qualified(path), self.item))
    }

    /// Required and non-blank; used for identifiers placed in URL paths.
    pub fn required_id(&self, path: &str) -> Result<String> {
        let value = self.required_string(path)?;
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(MissiveError::missing(self.qualified(path), self.item));
        }
        Ok(trimmed.to_string())
    }

    pub fn bool(&self, path: &str) -> Result<Option<bool>> {
        match self.value(path) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(Some(true)),
                "false" => Ok(Some(false)),
                "" => Ok(None),
                _ => Err(self.type_error(path, "boolean")),
            },
            Some(_) => Err(self.type_error(path, "boolean")),
        }
    }

    pub fn bool_or(&self, path: &str, default: bool) -> Result<bool> {
        Ok(self.bool(path)?.unwrap_or(default))
    }

    /// Numbers arrive either as JSON numbers or as numeric strings.
    pub fn number(&self, path: &str) -> Result<Option<Number>> {
        match self.value(path) {
            None => Ok(None),
            Some(Value::Number(n)) => Ok(Some(n.clone())),
            Some(Value::String(s)) => {
                let s = s.trim();
                if s.is_empty() {
                    return Ok(None);
                }
                if let Ok(i) = s.parse::<i64>() {
                    return Ok(Some(Number::from(i)));
                }
                s.parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map(Some)
                    .ok_or_else(|| self.type_error(path, "number"))
            }
            Some(_) => Err(self.type_error(path, "number")),
        }
    }

    /// Rows of a repeatable group. A single object counts as one row; an
    /// absent group yields no rows.
    pub fn rows(&self, path: &str) -> Result<Vec<Fields<'a>>> {
        let maps: Vec<&'a Map<String, Value>> = match self.value(path) {
            None => Vec::new(),
            Some(Value::Object(map)) => vec![map],
            Some(Value::Array(values)) => values
                .iter()
                .map(|v| v.as_object().ok_or_else(|| self.type_error(path, "list of objects")))
                .collect::<Result<_>>()?,
            Some(_) => return Err(self.type_error(path, "list of objects")),
        };

        let base = self.qualified(path);
        Ok(maps
            .into_iter()
            .enumerate()
            .map(|(idx, map)| Fields {
                root: Root::Row(map),
                binaries: self.binaries,
                item: self.item,
                base: format!("{base}[{idx}]"),
            })
            .collect())
    }

    /// Single nested group (`notification.value`), if set.
    pub fn group(&self, path: &str) -> Result<Option<Fields<'a>>> {
        match self.value(path) {
            None => Ok(None),
            Some(Value::Object(map)) => Ok(Some(Fields {
                root: Root::Row(map),
                binaries: self.binaries,
                item: self.item,
                base: self.qualified(path),
            })),
            Some(_) => Err(self.type_error(path, "object")),
        }
    }

    pub fn binary(&self, property: &str) -> Result<BinaryData> {
        self.binaries
            .binary(self.item, property)
            .map_err(|reason| MissiveError::AttachmentResolution {
                property: property.to_string(),
                item: self.item,
                reason,
            })
    }

    fn type_error(&self, path: &str, expected: &'static str) -> MissiveError {
        MissiveError::InvalidFieldType {
            field: self.qualified(path),
            item: self.item,
            expected,
        }
    }
}
