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

//! Generic persistence and replication built on the attribute tables.
//!
//! A type becomes serializable by embedding a [`SerializableState`] and
//! implementing [`Serializable`]. Everything else (attribute access, the
//! binary and text encodings, network deltas) is provided by
//! [`SerializableExt`], which only ever talks to the object through the
//! accessors stored in its type's attribute table.

mod binary;
mod codec;
mod network;
mod text;

pub use network::{DirtyBits, NetworkState, MAX_NETWORK_ATTRIBUTES};
pub use text::{AttributeRecord, ObjectRecord, TextFormat};

use crate::error::{AttributeError, LoadError, SaveError};
use crate::event::{TemporaryChanged, E_TEMPORARYCHANGED};
use crate::object::Object;
use crate::registry::{AttributeInfo, AttributeMode};
use crate::string_hash::StringHash;
use crate::variant::{Variant, VariantMap};
use std::io::{Read, Write};
use std::rc::Rc;

/// How strictly a stored record's type must match the live instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadMode {
    /// The record type must be the instance type.
    #[default]
    Exact,
    /// The record type may also be a base or a derived type of the instance
    /// type. Binary slots are matched by position, text entries by name.
    CompatibleBase,
}

/// Per-instance persistence state embedded in every serializable object.
#[derive(Debug, Default)]
pub struct SerializableState {
    temporary: bool,
    record_instance_defaults: bool,
    instance_defaults: Option<VariantMap>,
    network: Option<Box<NetworkState>>,
}

impl SerializableState {
    /// Creates the state of a fresh, non-temporary object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the object is skipped by batch saves.
    pub fn is_temporary(&self) -> bool {
        self.temporary
    }

    /// Instance-level default overrides, keyed by attribute name hash.
    pub fn instance_defaults(&self) -> Option<&VariantMap> {
        self.instance_defaults.as_ref()
    }

    /// The replication state, once allocated.
    pub fn network_state(&self) -> Option<&NetworkState> {
        self.network.as_deref()
    }

    pub(crate) fn network_state_mut(&mut self) -> Option<&mut NetworkState> {
        self.network.as_deref_mut()
    }
}

/// An object whose state is described by its type's attribute table.
pub trait Serializable: Object {
    /// The embedded persistence state.
    fn serializable_state(&self) -> &SerializableState;

    /// The embedded persistence state, mutably.
    fn serializable_state_mut(&mut self) -> &mut SerializableState;

    /// Second load pass, run once every object of a load batch has all of
    /// its attributes set. Resolve references to other objects here.
    fn apply_attributes(&mut self) {}

    /// Write attributes to text records even when they equal their default.
    fn save_default_attributes(&self) -> bool {
        false
    }

    /// Called after every successful attribute write.
    fn mark_network_update(&mut self) {}
}

/// Attribute access, persistence and replication for every [`Serializable`].
pub trait SerializableExt: Serializable {
    /// The attribute table of this object's type.
    fn attributes(&self) -> &[AttributeInfo] {
        self.context().registry().attributes(self.type_hash())
    }

    /// Number of attributes of this object's type.
    fn num_attributes(&self) -> usize {
        self.attributes().len()
    }

    /// Number of replicated attributes of this object's type.
    fn num_network_attributes(&self) -> usize {
        self.context()
            .registry()
            .network_attributes(self.type_hash())
            .len()
    }

    /// Reads the attribute at `index`.
    fn get_attribute(&self, index: usize) -> Result<Variant, AttributeError> {
        let attribute = attribute_at(self, index)?;
        read_value(self, attribute)
    }

    /// Reads the attribute called `name`. Names are case-sensitive.
    fn get_attribute_by_name(&self, name: &str) -> Result<Variant, AttributeError> {
        let index = attribute_index(self, name)?;
        self.get_attribute(index)
    }

    /// Writes the attribute at `index`.
    ///
    /// `value` may be one of the documented widenings of the declared type; enum
    /// attributes also accept the name of a value.
    fn set_attribute(&mut self, index: usize, value: impl Into<Variant>) -> Result<(), AttributeError> {
        // The table lives in the context, so `self` stays free for the write.
        let context = Rc::clone(self.context());
        let attributes = context.registry().attributes(self.type_hash());
        let attribute = attributes
            .get(index)
            .ok_or_else(|| index_out_of_range(self.type_name(), index, attributes.len()))?;
        write_value(self, attribute, value.into()).inspect_err(|e| log::warn!("{e}"))
    }

    /// Writes the attribute called `name`.
    fn set_attribute_by_name(
        &mut self,
        name: &str,
        value: impl Into<Variant>,
    ) -> Result<(), AttributeError> {
        let index = attribute_index(self, name)?;
        self.set_attribute(index, value)
    }

    /// The default of the attribute at `index`: the instance-level default
    /// if one was recorded, the registered default otherwise.
    fn attribute_default(&self, index: usize) -> Result<Variant, AttributeError> {
        let attribute = attribute_at(self, index)?;
        Ok(effective_default(self, attribute))
    }

    /// The default of the attribute called `name`.
    fn attribute_default_by_name(&self, name: &str) -> Result<Variant, AttributeError> {
        let index = attribute_index(self, name)?;
        self.attribute_default(index)
    }

    /// Resets every editable attribute to its default.
    ///
    /// Attributes flagged `NO_EDIT` or `OBJECT_ID` are left alone.
    fn reset_to_default(&mut self) {
        let context = Rc::clone(self.context());
        let attributes = context.registry().attributes(self.type_hash());
        for attribute in attributes {
            if attribute.mode.intersects(AttributeMode::NO_EDIT | AttributeMode::OBJECT_ID) {
                continue;
            }
            set_to_default(self, attribute);
        }
    }

    /// While enabled, every attribute write also records the written value
    /// as this instance's own default.
    fn set_instance_default(&mut self, enable: bool) {
        self.serializable_state_mut().record_instance_defaults = enable;
    }

    /// Forgets every instance-level default.
    fn remove_instance_default(&mut self) {
        let state = self.serializable_state_mut();
        state.instance_defaults = None;
        state.record_instance_defaults = false;
    }

    /// Marks the object as temporary, excluding it from batch saves.
    ///
    /// Sends `TemporaryChanged` from this object when the flag changes.
    fn set_temporary(&mut self, enable: bool) {
        if self.serializable_state().temporary == enable {
            return;
        }
        self.serializable_state_mut().temporary = enable;

        let mut data = VariantMap::new();
        data.insert(TemporaryChanged::P_SERIALIZABLE, Variant::from(self.id()));
        self.base().send_event(E_TEMPORARYCHANGED, &mut data);
    }

    /// Returns `true` if the object is excluded from batch saves.
    fn is_temporary(&self) -> bool {
        self.serializable_state().temporary
    }

    /// Writes the binary record of this object.
    fn save(&self, dest: &mut dyn Write) -> Result<(), SaveError> {
        binary::save(self, dest)
    }

    /// Reads a binary record of exactly this object's type.
    ///
    /// Does not call [`apply_attributes`](Serializable::apply_attributes).
    fn load(&mut self, source: &mut dyn Read) -> Result<(), LoadError> {
        binary::load(self, source, LoadMode::Exact)
    }

    /// Reads a binary record with an explicit type matching policy.
    fn load_with_mode(&mut self, source: &mut dyn Read, mode: LoadMode) -> Result<(), LoadError> {
        binary::load(self, source, mode)
    }

    /// Builds the name-keyed text record of this object.
    fn to_record(&self) -> Result<ObjectRecord, SaveError> {
        text::to_record(self)
    }

    /// Applies a name-keyed text record.
    fn load_record(&mut self, record: &ObjectRecord, mode: LoadMode) -> Result<(), LoadError> {
        text::load_record(self, record, mode)
    }

    /// Formats this object's text record.
    fn save_text(&self, format: TextFormat) -> Result<String, SaveError> {
        let record = self.to_record()?;
        format
            .encode(&record, self.context().config().pretty_text)
            .map_err(SaveError::Format)
    }

    /// Parses and applies a text record of exactly this object's type.
    fn load_text(&mut self, text: &str, format: TextFormat) -> Result<(), LoadError> {
        let record: ObjectRecord = format.decode(text).map_err(LoadError::Parse)?;
        self.load_record(&record, LoadMode::Exact)
    }

    /// Allocates the replication state, snapshotting the current values.
    fn allocate_network_state(&mut self) {
        network::allocate(self);
    }

    /// Compares the replicated attributes with the last snapshot, updates
    /// the snapshot and returns the network indices that changed.
    fn collect_network_changes(&mut self) -> DirtyBits {
        network::collect_changes(self)
    }

    /// Writes a delta holding every replicated attribute that differs from
    /// its registered default.
    fn write_initial_delta_update(&self, dest: &mut dyn Write, timestamp: u8) -> Result<(), SaveError> {
        network::write_initial_delta(self, dest, timestamp)
    }

    /// Writes a delta holding the replicated attributes set in `bits`.
    fn write_delta_update(
        &self,
        dest: &mut dyn Write,
        bits: &DirtyBits,
        timestamp: u8,
    ) -> Result<(), SaveError> {
        network::write_delta(self, dest, bits, timestamp)
    }

    /// Writes every replicated `LATEST_DATA` attribute.
    fn write_latest_data_update(&self, dest: &mut dyn Write, timestamp: u8) -> Result<(), SaveError> {
        network::write_latest_data(self, dest, timestamp)
    }

    /// Reads and applies a delta. Returns `true` if any attribute changed.
    fn read_delta_update(&mut self, source: &mut dyn Read) -> Result<bool, LoadError> {
        network::read_delta(self, source)
    }

    /// Reads and applies a latest-data update. Returns `true` if any attribute changed.
    fn read_latest_data_update(&mut self, source: &mut dyn Read) -> Result<bool, LoadError> {
        network::read_latest_data(self, source)
    }

    /// Routes incoming updates of the replicated attribute `name` to an
    /// `InterceptNetworkUpdate` event instead of applying them.
    fn set_intercept_network_update(&mut self, name: &str, enable: bool) -> Result<(), AttributeError> {
        network::set_intercept(self, name, enable)
    }

    /// Returns `true` if updates of `name` are intercepted.
    fn intercept_network_update(&self, name: &str) -> bool {
        network::is_intercepted(self, name)
    }
}

impl<T: Serializable + ?Sized> SerializableExt for T {}

fn index_out_of_range(type_name: &str, index: usize, count: usize) -> AttributeError {
    let error = AttributeError::IndexOutOfRange {
        type_name: type_name.to_owned(),
        index,
        count,
    };
    log::error!("{error}");
    error
}

fn attribute_at<S: Serializable + ?Sized>(object: &S, index: usize) -> Result<&AttributeInfo, AttributeError> {
    let attributes = object.attributes();
    attributes
        .get(index)
        .ok_or_else(|| index_out_of_range(object.type_name(), index, attributes.len()))
}

fn attribute_index<S: Serializable + ?Sized>(object: &S, name: &str) -> Result<usize, AttributeError> {
    object
        .attributes()
        .iter()
        .position(|a| a.name == name)
        .ok_or_else(|| {
            log::debug!("Type '{}' has no attribute '{name}'", object.type_name());
            AttributeError::UnknownAttribute {
                type_name: object.type_name().to_owned(),
                name: name.to_owned(),
            }
        })
}

/// Brings `value` to the declared type of `attribute`.
fn coerce(attribute: &AttributeInfo, value: Variant) -> Result<Variant, AttributeError> {
    if value.variant_type() == attribute.variant_type {
        return Ok(value);
    }
    if let (Some(_), Variant::String(name)) = (attribute.enum_names, &value) {
        if let Some(index) = attribute.enum_value(name) {
            return Ok(Variant::Int(index));
        }
    }
    value
        .convert_to(attribute.variant_type)
        .ok_or_else(|| AttributeError::TypeMismatch {
            attribute: attribute.name.clone(),
            expected: attribute.variant_type,
            found: value.variant_type(),
        })
}

pub(crate) fn read_value<S: Serializable + ?Sized>(
    object: &S,
    attribute: &AttributeInfo,
) -> Result<Variant, AttributeError> {
    attribute
        .accessor
        .get(object.as_any())
        .ok_or_else(|| AttributeError::InstanceMismatch {
            type_name: object.type_name().to_owned(),
            attribute: attribute.name.clone(),
        })
}

pub(crate) fn write_value<S: Serializable + ?Sized>(
    object: &mut S,
    attribute: &AttributeInfo,
    value: Variant,
) -> Result<(), AttributeError> {
    let value = coerce(attribute, value)?;
    if !attribute.accessor.set(object.as_any_mut(), &value) {
        return Err(AttributeError::InstanceMismatch {
            type_name: object.type_name().to_owned(),
            attribute: attribute.name.clone(),
        });
    }

    let state = object.serializable_state_mut();
    if state.record_instance_defaults {
        state
            .instance_defaults
            .get_or_insert_with(VariantMap::new)
            .insert(attribute.name_hash, value);
    }
    object.mark_network_update();
    Ok(())
}

pub(crate) fn effective_default<S: Serializable + ?Sized>(object: &S, attribute: &AttributeInfo) -> Variant {
    object
        .serializable_state()
        .instance_defaults
        .as_ref()
        .and_then(|defaults| defaults.get(&attribute.name_hash))
        .cloned()
        .unwrap_or_else(|| attribute.default_value.clone())
}

/// Writes the effective default, skipping attributes registered without one.
pub(crate) fn set_to_default<S: Serializable + ?Sized>(object: &mut S, attribute: &AttributeInfo) {
    let default = effective_default(object, attribute);
    write_default(object, attribute, default);
}

/// Writes the registered default, ignoring instance defaults. Saved records
/// elide values against this default only.
pub(crate) fn set_to_registered_default<S: Serializable + ?Sized>(
    object: &mut S,
    attribute: &AttributeInfo,
) {
    write_default(object, attribute, attribute.default_value.clone());
}

fn write_default<S: Serializable + ?Sized>(object: &mut S, attribute: &AttributeInfo, default: Variant) {
    if default.is_none() {
        return;
    }
    if let Err(error) = write_value(object, attribute, default) {
        log::warn!("Could not reset attribute to its default: {error}");
    }
}

pub(crate) fn type_hash_name(registry: &crate::registry::TypeRegistry, hash: StringHash) -> String {
    registry
        .type_name(hash)
        .map_or_else(|| hash.to_string(), str::to_owned)
}

/// Checks that a stored record of type `stored` may be loaded into `object`.
pub(crate) fn check_record_type<S: Serializable + ?Sized>(
    object: &S,
    stored: StringHash,
    mode: LoadMode,
) -> Result<(), LoadError> {
    let own = object.type_hash();
    if stored == own {
        return Ok(());
    }
    let registry = object.context().registry();
    let related = registry.is_type_of(own, stored) || registry.is_type_of(stored, own);
    if mode == LoadMode::CompatibleBase && related {
        return Ok(());
    }
    Err(LoadError::TypeMismatch {
        expected: object.type_name().to_owned(),
        found: type_hash_name(registry, stored),
    })
}
