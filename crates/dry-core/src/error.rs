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

//! Error types returned by the registry, attribute access and persistence.

use crate::string_hash::StringHash;
use crate::variant::VariantType;
use std::io;
use thiserror::Error;

/// An error raised while populating the [`TypeRegistry`](crate::registry::TypeRegistry).
///
/// These are programmer errors; they are logged at `error` level where they occur.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Two distinct type names hash to the same value.
    #[error("type hash {hash} of '{requested}' collides with registered type '{existing}'")]
    HashCollision {
        /// The colliding hash.
        hash: StringHash,
        /// The name already registered under `hash`.
        existing: String,
        /// The name that was being registered.
        requested: String,
    },
    /// The attribute name is already used on this type.
    #[error("attribute '{attribute}' is already registered on type '{type_name}'")]
    DuplicateAttribute {
        /// The owning type.
        type_name: String,
        /// The duplicated attribute name.
        attribute: String,
    },
    /// The operation targets a type that was never registered.
    #[error("type '{type_name}' is not registered")]
    UnknownType {
        /// The missing type.
        type_name: String,
    },
    /// The operation targets an attribute that does not exist.
    #[error("attribute '{attribute}' not found on type '{type_name}'")]
    UnknownAttribute {
        /// The owning type.
        type_name: String,
        /// The missing attribute name.
        attribute: String,
    },
    /// A default value does not have the attribute's declared type.
    #[error("default value of attribute '{attribute}' is {found}, expected {expected}")]
    DefaultTypeMismatch {
        /// The attribute name.
        attribute: String,
        /// The declared attribute type.
        expected: VariantType,
        /// The type of the supplied default.
        found: VariantType,
    },
}

/// An error raised by reflective attribute access on a live object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttributeError {
    /// The index is past the end of the type's attribute table.
    #[error("attribute index {index} out of range for type '{type_name}' ({count} attributes)")]
    IndexOutOfRange {
        /// The object type.
        type_name: String,
        /// The requested index.
        index: usize,
        /// Number of attributes registered for the type.
        count: usize,
    },
    /// No attribute with this name is registered for the type.
    #[error("unknown attribute '{name}' on type '{type_name}'")]
    UnknownAttribute {
        /// The object type.
        type_name: String,
        /// The requested name.
        name: String,
    },
    /// The supplied value is not of, and cannot be widened to, the attribute type.
    #[error("attribute '{attribute}' expects {expected}, got {found}")]
    TypeMismatch {
        /// The attribute name.
        attribute: String,
        /// The declared attribute type.
        expected: VariantType,
        /// The type of the supplied value.
        found: VariantType,
    },
    /// The attribute's accessor was registered for a different concrete type.
    #[error("accessor of attribute '{attribute}' does not apply to an instance of '{type_name}'")]
    InstanceMismatch {
        /// The object type.
        type_name: String,
        /// The attribute name.
        attribute: String,
    },
}

/// An error raised while writing an object to a stream or text record.
#[derive(Debug, Error)]
pub enum SaveError {
    /// The destination stream failed.
    #[error("i/o error while saving '{type_name}' at byte {offset}: {source}")]
    Io {
        /// The object type being written.
        type_name: String,
        /// Bytes written before the failure.
        offset: u64,
        /// The underlying error.
        source: io::Error,
    },
    /// An attribute value could not be encoded.
    #[error("could not encode attribute '{attribute}' of '{type_name}': {message}")]
    Encode {
        /// The object type being written.
        type_name: String,
        /// The attribute being written.
        attribute: String,
        /// Encoder message.
        message: String,
    },
    /// Reading an attribute value from the live object failed.
    #[error(transparent)]
    Attribute(#[from] AttributeError),
    /// The text record could not be formatted.
    #[error("could not format text record: {0}")]
    Format(String),
}

/// An error raised while reading an object from a stream or text record.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The stream ended in the middle of a record.
    #[error(
        "unexpected end of data in '{type_name}' while reading {} at byte {offset}",
        .attribute.as_deref().unwrap_or("the record header")
    )]
    Truncated {
        /// The object type being read.
        type_name: String,
        /// The attribute being read, or `None` for the record header.
        attribute: Option<String>,
        /// Bytes consumed before the failure.
        offset: u64,
    },
    /// The source stream failed for a reason other than end of data.
    #[error("i/o error while loading '{type_name}' at byte {offset}: {source}")]
    Io {
        /// The object type being read.
        type_name: String,
        /// Bytes consumed before the failure.
        offset: u64,
        /// The underlying error.
        source: io::Error,
    },
    /// The stored record describes a type that cannot be loaded into this instance.
    #[error("record of type '{found}' cannot be loaded into an instance of '{expected}'")]
    TypeMismatch {
        /// The live instance type.
        expected: String,
        /// The stored record type.
        found: String,
    },
    /// The text record could not be parsed.
    #[error("could not parse text record: {0}")]
    Parse(String),
    /// Writing a loaded value into the live object failed.
    #[error(transparent)]
    Attribute(#[from] AttributeError),
}

/// An error raised while loading a [`ContextConfig`](crate::config::ContextConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("could not read configuration: {0}")]
    Io(#[from] io::Error),
    /// The configuration text is malformed.
    #[error("could not parse configuration: {0}")]
    Parse(String),
}
