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


//! In-memory forms of a saved set of objects.
//!
//! A [`SceneDocument`] holds name-keyed text records and is encoded with RON
//! or JSON. A [`BinaryDocument`] holds positional binary records, each tagged
//! with the id the object had when it was saved.

use crate::error::SceneError;
use dry_core::prelude::*;
use serde::{Deserialize, Serialize};

/// A set of text records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    /// One record per saved object, in save order.
    #[serde(default)]
    pub objects: Vec<ObjectRecord>,
}

impl SceneDocument {
    /// Records every non-temporary object.
    pub fn from_objects<'a>(
        objects: impl IntoIterator<Item = &'a dyn Serializable>,
    ) -> Result<Self, SceneError> {
        let mut document = Self::default();
        for object in objects {
            if object.is_temporary() {
                log::trace!("Not saving temporary {} {}", object.type_name(), object.id());
                continue;
            }
            document.objects.push(object.to_record()?);
        }
        Ok(document)
    }
}

/// One binary record and the id its object had at save time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryRecord {
    /// The saved object id, if any.
    pub id: Option<ObjectId>,
    /// The record written by [`SerializableExt::save`].
    pub data: Vec<u8>,
}

impl BinaryRecord {
    /// The type hash leading the record, or `None` if it is too short.
    pub fn type_hash(&self) -> Option<StringHash> {
        let head = self.data.first_chunk::<4>()?;
        Some(StringHash::from_value(u32::from_le_bytes(*head)))
    }
}

/// A set of binary records.
///
/// Layout: `u32` record count, then per record a `u64` saved id (`0` for
/// none), a `u32` length and the record bytes. Integers are little-endian.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BinaryDocument {
    /// One record per saved object, in save order.
    pub objects: Vec<BinaryRecord>,
}

impl BinaryDocument {
    /// Records every non-temporary object.
    pub fn from_objects<'a>(
        objects: impl IntoIterator<Item = &'a dyn Serializable>,
    ) -> Result<Self, SceneError> {
        let mut document = Self::default();
        for object in objects {
            if object.is_temporary() {
                log::trace!("Not saving temporary {} {}", object.type_name(), object.id());
                continue;
            }
            let mut data = Vec::new();
            object.save(&mut data)?;
            document.objects.push(BinaryRecord {
                id: Some(object.id()),
                data,
            });
        }
        Ok(document)
    }

    /// Encodes the document.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SceneError> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&length_u32(self.objects.len())?.to_le_bytes());
        for record in &self.objects {
            bytes.extend_from_slice(&record.id.map_or(0, ObjectId::get).to_le_bytes());
            bytes.extend_from_slice(&length_u32(record.data.len())?.to_le_bytes());
            bytes.extend_from_slice(&record.data);
        }
        Ok(bytes)
    }

    /// Parses an encoded document.
    pub fn from_bytes(mut bytes: &[u8]) -> Result<Self, SceneError> {
        let count = u32::from_le_bytes(take_array(&mut bytes, "record count")?);
        // The count is untrusted; grow as records are actually found.
        let mut objects = Vec::with_capacity((count as usize).min(1024));
        for index in 0..count {
            let id = ObjectId::from_raw(u64::from_le_bytes(take_array(&mut bytes, "record id")?));
            let length = u32::from_le_bytes(take_array(&mut bytes, "record length")?) as usize;
            let Some((data, rest)) = bytes.split_at_checked(length) else {
                return Err(SceneError::Decode(format!(
                    "record {index} announces {length} bytes, {} remain",
                    bytes.len()
                )));
            };
            objects.push(BinaryRecord {
                id,
                data: data.to_vec(),
            });
            bytes = rest;
        }
        if !bytes.is_empty() {
            log::warn!("Ignoring {} trailing bytes after {count} records", bytes.len());
        }
        Ok(Self { objects })
    }
}

fn length_u32(length: usize) -> Result<u32, SceneError> {
    u32::try_from(length).map_err(|_| SceneError::Encode(format!("length {length} exceeds u32")))
}

fn take_array<const N: usize>(bytes: &mut &[u8], what: &str) -> Result<[u8; N], SceneError> {
    let Some((head, rest)) = bytes.split_first_chunk::<N>() else {
        return Err(SceneError::Decode(format!("unexpected end of data reading {what}")));
    };
    *bytes = rest;
    Ok(*head)
}
