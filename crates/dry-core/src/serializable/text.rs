// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The name-keyed text record.
//!
//! Unlike the binary record, entries are matched by attribute name, so
//! attributes can be reordered, added or removed between versions without
//! breaking existing files.

use super::{
    check_record_type, read_value, set_to_registered_default, write_value, LoadMode,
    Serializable,
};
use crate::error::{LoadError, SaveError};
use crate::object::ObjectId;
use crate::registry::{AttributeInfo, AttributeMode};
use crate::string_hash::StringHash;
use crate::variant::Variant;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::rc::Rc;

/// One named attribute value of an [`ObjectRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeRecord {
    /// Attribute name.
    pub name: String,
    /// Stored value. Enum attributes store the value name as a `String`.
    pub value: Variant,
}

/// The text form of one object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    /// Registered type name.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Runtime id at save time, used to resolve references within a batch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    /// Non-default attribute values.
    #[serde(default)]
    pub attributes: Vec<AttributeRecord>,
}

impl ObjectRecord {
    /// Creates an empty record of type `type_name`.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            id: None,
            attributes: Vec::new(),
        }
    }

    /// Hash of the stored type name.
    pub fn type_hash(&self) -> StringHash {
        StringHash::new(&self.type_name)
    }

    /// Looks up a stored value by attribute name.
    pub fn attribute(&self, name: &str) -> Option<&Variant> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| &a.value)
    }

    /// Appends a named value.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Variant>) {
        self.attributes.push(AttributeRecord {
            name: name.into(),
            value: value.into(),
        });
    }
}

/// A human-readable text encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextFormat {
    /// Rusty Object Notation.
    #[default]
    Ron,
    /// JSON.
    Json,
}

impl TextFormat {
    /// Formats `value`, indented when `pretty` is set.
    pub fn encode<T: Serialize>(self, value: &T, pretty: bool) -> Result<String, String> {
        match (self, pretty) {
            (Self::Ron, true) => {
                let pretty_config = ron::ser::PrettyConfig::default().indentor("  ".to_string());
                ron::ser::to_string_pretty(value, pretty_config).map_err(|e| e.to_string())
            }
            (Self::Ron, false) => ron::ser::to_string(value).map_err(|e| e.to_string()),
            (Self::Json, true) => serde_json::to_string_pretty(value).map_err(|e| e.to_string()),
            (Self::Json, false) => serde_json::to_string(value).map_err(|e| e.to_string()),
        }
    }

    /// Parses a value.
    pub fn decode<T: DeserializeOwned>(self, text: &str) -> Result<T, String> {
        match self {
            Self::Ron => ron::de::from_str(text).map_err(|e| e.to_string()),
            Self::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
        }
    }
}

pub(super) fn to_record<S: Serializable + ?Sized>(object: &S) -> Result<ObjectRecord, SaveError> {
    let context = Rc::clone(object.context());
    let save_defaults = object.save_default_attributes();
    let mut record = ObjectRecord::new(object.type_name());
    record.id = Some(object.id());

    for attribute in context.registry().attributes(object.type_hash()) {
        if !attribute.mode.contains(AttributeMode::FILE) {
            continue;
        }
        let value = read_value(object, attribute)?;
        if !save_defaults && value == attribute.default_value {
            continue;
        }
        let value = match value {
            Variant::Int(index) if attribute.enum_names.is_some() => attribute
                .enum_name(index)
                .map_or(Variant::Int(index), Variant::from),
            other => other,
        };
        record.push(attribute.name.clone(), value);
    }
    Ok(record)
}

/// Turns an enum value name back into its index.
fn resolve_enum(attribute: &AttributeInfo, value: &Variant) -> Option<Variant> {
    match (attribute.enum_names, value) {
        (Some(_), Variant::String(name)) => attribute.enum_value(name).map(Variant::Int),
        _ => Some(value.clone()),
    }
}

pub(super) fn load_record<S: Serializable + ?Sized>(
    object: &mut S,
    record: &ObjectRecord,
    mode: LoadMode,
) -> Result<(), LoadError> {
    check_record_type(object, record.type_hash(), mode)?;

    let context = Rc::clone(object.context());
    let type_name = object.type_name();
    let attributes = context.registry().attributes(object.type_hash());
    let mut stored: HashMap<&str, &Variant> = HashMap::with_capacity(record.attributes.len());
    for entry in &record.attributes {
        stored.entry(entry.name.as_str()).or_insert(&entry.value);
    }

    for attribute in attributes {
        let entry = stored.remove(attribute.name.as_str());
        if !attribute.mode.is_binary_persistent() {
            continue;
        }
        let Some(value) = entry else {
            set_to_registered_default(object, attribute);
            continue;
        };
        match resolve_enum(attribute, value) {
            Some(value) => {
                if let Err(error) = write_value(object, attribute, value) {
                    log::warn!("Skipping stored value: {error}");
                }
            }
            None => log::warn!(
                "Unknown value {value} for enum attribute '{}' on '{type_name}'",
                attribute.name
            ),
        }
    }

    let warn = context.config().warn_on_unknown_attributes;
    for name in stored.keys() {
        if warn {
            log::warn!("Ignoring unknown attribute '{name}' in '{type_name}' record");
        } else {
            log::debug!("Ignoring unknown attribute '{name}' in '{type_name}' record");
        }
    }
    Ok(())
}
