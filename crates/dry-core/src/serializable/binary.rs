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

//! The positional binary record.
//!
//! Layout: `u32` type hash, `u32` slot count, then one length-prefixed
//! value per binary-persistent attribute in table order. A zero length
//! marks an attribute left at its default.

use super::codec::{decode_variant, CountingReader, CountingWriter};
use super::{
    check_record_type, read_value, set_to_registered_default, write_value, LoadMode,
    Serializable,
};
use crate::error::{LoadError, SaveError};
use crate::registry::AttributeInfo;
use crate::string_hash::StringHash;
use std::io::{Read, Write};
use std::rc::Rc;

pub(super) fn save<S: Serializable + ?Sized>(object: &S, dest: &mut dyn Write) -> Result<(), SaveError> {
    let context = Rc::clone(object.context());
    let persistent: Vec<&AttributeInfo> = context
        .registry()
        .attributes(object.type_hash())
        .iter()
        .filter(|a| a.mode.is_binary_persistent())
        .collect();

    let mut writer = CountingWriter::new(dest, object.type_name());
    writer.write_u32(object.type_hash().value())?;
    writer.write_u32(persistent.len() as u32)?;

    for attribute in persistent {
        let value = read_value(object, attribute)?;
        if value == attribute.default_value {
            writer.write_default_marker()?;
        } else {
            writer.write_variant(&attribute.name, &value)?;
        }
    }
    Ok(())
}

pub(super) fn load<S: Serializable + ?Sized>(
    object: &mut S,
    source: &mut dyn Read,
    mode: LoadMode,
) -> Result<(), LoadError> {
    let context = Rc::clone(object.context());
    let type_name = object.type_name();
    let persistent: Vec<&AttributeInfo> = context
        .registry()
        .attributes(object.type_hash())
        .iter()
        .filter(|a| a.mode.is_binary_persistent())
        .collect();

    let mut reader = CountingReader::new(source, type_name);
    let stored = StringHash::from_value(reader.read_u32(None)?);
    check_record_type(object, stored, mode)?;
    let slots = reader.read_u32(None)? as usize;

    for slot in 0..slots {
        let attribute = persistent.get(slot).copied();
        let payload = reader.read_payload(attribute.map(|a| a.name.as_str()))?;
        let Some(attribute) = attribute else {
            log::debug!("Skipping trailing slot {slot} of '{type_name}' record");
            continue;
        };
        if payload.is_empty() {
            set_to_registered_default(object, attribute);
            continue;
        }
        match decode_variant(&payload) {
            Ok(value) => {
                if let Err(error) = write_value(object, attribute, value) {
                    log::warn!("Skipping stored value: {error}");
                }
            }
            Err(message) => log::warn!(
                "Skipping undecodable value of attribute '{}' on '{type_name}': {message}",
                attribute.name
            ),
        }
    }

    // Attributes added since the record was written.
    for attribute in persistent.iter().skip(slots) {
        set_to_registered_default(object, attribute);
    }
    Ok(())
}
