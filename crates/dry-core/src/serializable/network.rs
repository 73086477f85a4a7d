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

//! Delta replication of `NET` attributes.
//!
//! Replicated attributes are addressed by their network index, their
//! position among the type's `NET` attributes. A delta update is a `u8`
//! timestamp, a little-endian bit mask of `ceil(n / 8)` bytes for `n`
//! network attributes, and one length-prefixed value per set bit. A
//! latest-data update is a timestamp followed by every `LATEST_DATA`
//! attribute in network order.

use super::codec::{decode_variant, CountingReader, CountingWriter};
use super::{read_value, write_value, Serializable, SerializableExt};
use crate::context::Context;
use crate::error::{AttributeError, LoadError, SaveError};
use crate::event::{InterceptNetworkUpdate, E_INTERCEPTNETWORKUPDATE};
use crate::registry::{AttributeInfo, AttributeMode};
use crate::string_hash::StringHash;
use crate::variant::{Variant, VariantMap};
use std::io::{Read, Write};
use std::rc::Rc;

/// Maximum number of replicated attributes per type.
pub const MAX_NETWORK_ATTRIBUTES: usize = 64;

/// A set of network attribute indices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DirtyBits {
    bits: u64,
}

impl DirtyBits {
    /// An empty set.
    pub const fn new() -> Self {
        Self { bits: 0 }
    }

    /// Wraps a raw mask.
    pub const fn from_bits(bits: u64) -> Self {
        Self { bits }
    }

    /// The set holding the first `count` indices.
    pub const fn first(count: usize) -> Self {
        if count >= MAX_NETWORK_ATTRIBUTES {
            Self { bits: u64::MAX }
        } else {
            Self {
                bits: (1u64 << count) - 1,
            }
        }
    }

    /// The raw mask.
    pub const fn bits(&self) -> u64 {
        self.bits
    }

    /// Adds `index`. Indices past [`MAX_NETWORK_ATTRIBUTES`] are ignored.
    pub fn set(&mut self, index: usize) {
        if index < MAX_NETWORK_ATTRIBUTES {
            self.bits |= 1 << index;
        }
    }

    /// Removes `index`.
    pub fn clear(&mut self, index: usize) {
        if index < MAX_NETWORK_ATTRIBUTES {
            self.bits &= !(1 << index);
        }
    }

    /// Removes every index.
    pub fn clear_all(&mut self) {
        self.bits = 0;
    }

    /// Returns `true` if `index` is in the set.
    pub const fn is_set(&self, index: usize) -> bool {
        index < MAX_NETWORK_ATTRIBUTES && self.bits & (1 << index) != 0
    }

    /// Number of indices in the set.
    pub const fn count(&self) -> usize {
        self.bits.count_ones() as usize
    }

    /// Returns `true` if the set is empty.
    pub const fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Iterates over the indices in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..MAX_NETWORK_ATTRIBUTES).filter(|&i| self.is_set(i))
    }
}

/// Replication state of one object, allocated on demand.
#[derive(Debug, Clone, Default)]
pub struct NetworkState {
    current_values: Vec<Variant>,
    previous_values: Vec<Variant>,
    intercept_mask: DirtyBits,
}

impl NetworkState {
    /// Values read by the latest change collection, in network order.
    pub fn current_values(&self) -> &[Variant] {
        &self.current_values
    }

    /// Values of the snapshot before the latest change collection.
    pub fn previous_values(&self) -> &[Variant] {
        &self.previous_values
    }

    /// Network indices whose incoming updates are intercepted.
    pub fn intercept_mask(&self) -> DirtyBits {
        self.intercept_mask
    }
}

/// The replicated attributes of a type as `(attribute index, info)` pairs.
fn network_table(context: &Context, type_hash: StringHash) -> Vec<(usize, &AttributeInfo)> {
    let registry = context.registry();
    let attributes = registry.attributes(type_hash);
    registry
        .network_attributes(type_hash)
        .iter()
        .filter_map(|&index| attributes.get(index).map(|a| (index, a)))
        .collect()
}

fn read_network_values<S: Serializable + ?Sized>(object: &S, table: &[(usize, &AttributeInfo)]) -> Vec<Variant> {
    table
        .iter()
        .map(|(_, attribute)| {
            read_value(object, attribute).unwrap_or_else(|error| {
                log::warn!("{error}");
                Variant::None
            })
        })
        .collect()
}

pub(super) fn allocate<S: Serializable + ?Sized>(object: &mut S) {
    if object.serializable_state().network.is_some() {
        return;
    }
    let context = Rc::clone(object.context());
    let table = network_table(&context, object.type_hash());
    let current_values = read_network_values(object, &table);
    let previous_values = table.iter().map(|(_, a)| a.default_value.clone()).collect();
    object.serializable_state_mut().network = Some(Box::new(NetworkState {
        current_values,
        previous_values,
        intercept_mask: DirtyBits::new(),
    }));
}

pub(super) fn collect_changes<S: Serializable + ?Sized>(object: &mut S) -> DirtyBits {
    allocate(object);
    let context = Rc::clone(object.context());
    let table = network_table(&context, object.type_hash());
    let values = read_network_values(object, &table);

    let mut bits = DirtyBits::new();
    let Some(state) = object.serializable_state_mut().network_state_mut() else {
        return bits;
    };
    for (index, value) in values.iter().enumerate() {
        if state.previous_values.get(index) != Some(value) {
            bits.set(index);
        }
    }
    state.previous_values = values.clone();
    state.current_values = values;
    bits
}

pub(super) fn write_initial_delta<S: Serializable + ?Sized>(
    object: &S,
    dest: &mut dyn Write,
    timestamp: u8,
) -> Result<(), SaveError> {
    let context = Rc::clone(object.context());
    let table = network_table(&context, object.type_hash());
    let mut bits = DirtyBits::new();
    for (index, (_, attribute)) in table.iter().enumerate() {
        if read_value(object, attribute)? != attribute.default_value {
            bits.set(index);
        }
    }
    write_delta(object, dest, &bits, timestamp)
}

pub(super) fn write_delta<S: Serializable + ?Sized>(
    object: &S,
    dest: &mut dyn Write,
    bits: &DirtyBits,
    timestamp: u8,
) -> Result<(), SaveError> {
    let context = Rc::clone(object.context());
    let table = network_table(&context, object.type_hash());
    let mask = bits.bits() & DirtyBits::first(table.len()).bits();

    let mut writer = CountingWriter::new(dest, object.type_name());
    writer.write_u8(timestamp)?;
    writer.write_bytes(&mask.to_le_bytes()[..table.len().div_ceil(8)])?;
    for (index, (_, attribute)) in table.iter().enumerate() {
        if DirtyBits::from_bits(mask).is_set(index) {
            let value = read_value(object, attribute)?;
            writer.write_variant(&attribute.name, &value)?;
        }
    }
    Ok(())
}

pub(super) fn write_latest_data<S: Serializable + ?Sized>(
    object: &S,
    dest: &mut dyn Write,
    timestamp: u8,
) -> Result<(), SaveError> {
    let context = Rc::clone(object.context());
    let table = network_table(&context, object.type_hash());

    let mut writer = CountingWriter::new(dest, object.type_name());
    writer.write_u8(timestamp)?;
    for (_, attribute) in table.iter().filter(|(_, a)| a.mode.contains(AttributeMode::LATEST_DATA)) {
        let value = read_value(object, attribute)?;
        writer.write_variant(&attribute.name, &value)?;
    }
    Ok(())
}

/// Applies one received value, or reports it as an event if intercepted.
fn apply_received<S: Serializable + ?Sized>(
    object: &mut S,
    network_index: usize,
    (attribute_index, attribute): (usize, &AttributeInfo),
    payload: &[u8],
    timestamp: u8,
) -> bool {
    let value = match decode_variant(payload) {
        Ok(value) => value,
        Err(message) => {
            log::warn!(
                "Skipping undecodable network value of '{}' on '{}': {message}",
                attribute.name,
                object.type_name()
            );
            return false;
        }
    };

    let intercepted = object
        .serializable_state()
        .network_state()
        .is_some_and(|state| state.intercept_mask.is_set(network_index));
    if intercepted {
        let mut data = VariantMap::new();
        data.insert(InterceptNetworkUpdate::P_SERIALIZABLE, Variant::from(object.id()));
        data.insert(InterceptNetworkUpdate::P_TIMESTAMP, Variant::Int(i32::from(timestamp)));
        data.insert(
            InterceptNetworkUpdate::P_INDEX,
            Variant::Int(i32::try_from(attribute_index).unwrap_or(i32::MAX)),
        );
        data.insert(InterceptNetworkUpdate::P_NAME, Variant::from(attribute.name.as_str()));
        data.insert(InterceptNetworkUpdate::P_VALUE, value);
        object.base().send_event(E_INTERCEPTNETWORKUPDATE, &mut data);
        return false;
    }

    match write_value(object, attribute, value) {
        Ok(()) => true,
        Err(error) => {
            log::warn!("Skipping network value: {error}");
            false
        }
    }
}

pub(super) fn read_delta<S: Serializable + ?Sized>(object: &mut S, source: &mut dyn Read) -> Result<bool, LoadError> {
    let context = Rc::clone(object.context());
    let table = network_table(&context, object.type_hash());

    let mut reader = CountingReader::new(source, object.type_name());
    let timestamp = reader.read_u8(None)?;
    let mut mask = [0u8; 8];
    reader.read_exact(&mut mask[..table.len().div_ceil(8)], None)?;
    let bits = DirtyBits::from_bits(u64::from_le_bytes(mask));

    let mut changed = false;
    for (network_index, &entry) in table.iter().enumerate() {
        if !bits.is_set(network_index) {
            continue;
        }
        let payload = reader.read_payload(Some(&entry.1.name))?;
        changed |= apply_received(object, network_index, entry, &payload, timestamp);
    }
    Ok(changed)
}

pub(super) fn read_latest_data<S: Serializable + ?Sized>(
    object: &mut S,
    source: &mut dyn Read,
) -> Result<bool, LoadError> {
    let context = Rc::clone(object.context());
    let table = network_table(&context, object.type_hash());

    let mut reader = CountingReader::new(source, object.type_name());
    let timestamp = reader.read_u8(None)?;
    let mut changed = false;
    for (network_index, &entry) in table.iter().enumerate() {
        if !entry.1.mode.contains(AttributeMode::LATEST_DATA) {
            continue;
        }
        let payload = reader.read_payload(Some(&entry.1.name))?;
        changed |= apply_received(object, network_index, entry, &payload, timestamp);
    }
    Ok(changed)
}

fn network_index<S: Serializable + ?Sized>(object: &S, name: &str) -> Option<usize> {
    let registry = object.context().registry();
    let (index, _) = registry.attribute(object.type_hash(), name)?;
    registry
        .network_attributes(object.type_hash())
        .iter()
        .position(|&i| i == index)
}

pub(super) fn set_intercept<S: Serializable + ?Sized>(
    object: &mut S,
    name: &str,
    enable: bool,
) -> Result<(), AttributeError> {
    let index = network_index(object, name).ok_or_else(|| AttributeError::UnknownAttribute {
        type_name: object.type_name().to_owned(),
        name: name.to_owned(),
    })?;
    object.allocate_network_state();
    if let Some(state) = object.serializable_state_mut().network_state_mut() {
        if enable {
            state.intercept_mask.set(index);
        } else {
            state.intercept_mask.clear(index);
        }
    }
    Ok(())
}

pub(super) fn is_intercepted<S: Serializable + ?Sized>(object: &S, name: &str) -> bool {
    let Some(index) = network_index(object, name) else {
        return false;
    };
    object
        .serializable_state()
        .network_state()
        .is_some_and(|state| state.intercept_mask.is_set(index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec3;
    use crate::object::ObjectBase;
    use crate::prelude::*;
    use std::cell::RefCell;

    #[derive(Object)]
    struct Avatar {
        base: ObjectBase,
        state: SerializableState,
        position: Vec3,
        health: i32,
        nickname: String,
    }

    impl Serializable for Avatar {
        fn serializable_state(&self) -> &SerializableState {
            &self.state
        }
        fn serializable_state_mut(&mut self) -> &mut SerializableState {
            &mut self.state
        }
    }

    fn new_avatar(context: &Rc<Context>) -> Avatar {
        Avatar {
            base: ObjectBase::new(context),
            state: SerializableState::default(),
            position: Vec3::ZERO,
            health: 100,
            nickname: String::new(),
        }
    }

    fn context() -> Rc<Context> {
        let mut registry = TypeRegistry::new();
        registry.register_factory::<Avatar, _>(new_avatar).unwrap();
        dry_attribute!(
            registry,
            Avatar,
            "Position",
            position,
            Vec3::ZERO,
            AttributeMode::DEFAULT | AttributeMode::LATEST_DATA
        )
        .unwrap();
        dry_attribute!(registry, Avatar, "Nickname", nickname, String::new(), AttributeMode::FILE)
            .unwrap();
        dry_attribute!(registry, Avatar, "Health", health, 100, AttributeMode::DEFAULT).unwrap();
        Context::new(registry)
    }

    #[test]
    fn test_dirty_bits() {
        let mut bits = DirtyBits::new();
        bits.set(3);
        bits.set(3);
        bits.set(63);
        bits.set(64);
        assert_eq!(bits.count(), 2);
        assert_eq!(bits.iter().collect::<Vec<_>>(), [3, 63]);
        bits.clear(3);
        assert!(!bits.is_set(3));
        assert_eq!(DirtyBits::first(3).bits(), 0b111);
        assert_eq!(DirtyBits::first(64).bits(), u64::MAX);
    }

    #[test]
    fn test_collect_changes_against_snapshot() {
        // --- 1. SETUP ---
        let context = context();
        let mut avatar = new_avatar(&context);
        avatar.allocate_network_state();

        // --- 2. ACTION ---
        avatar.health = 40;
        let first = avatar.collect_network_changes();
        let second = avatar.collect_network_changes();

        // --- 3. ASSERTIONS ---
        // Network order is Position, Health; Nickname is not replicated.
        assert_eq!(first.iter().collect::<Vec<_>>(), [1]);
        assert!(second.is_empty());
        let state = avatar.serializable_state().network_state().unwrap();
        assert_eq!(state.current_values()[1], Variant::Int(40));
    }

    #[test]
    fn test_delta_update_round_trip() {
        let context = context();
        let mut server = new_avatar(&context);
        server.health = 12;
        server.position = Vec3::new(1.0, 2.0, 3.0);

        let mut bytes = Vec::new();
        let mut bits = DirtyBits::new();
        bits.set(1);
        server.write_delta_update(&mut bytes, &bits, 7).unwrap();
        assert_eq!(bytes[0], 7);
        assert_eq!(bytes[1], 0b10);

        let mut client = new_avatar(&context);
        assert!(client.read_delta_update(&mut bytes.as_slice()).unwrap());
        assert_eq!(client.health, 12);
        assert_eq!(client.position, Vec3::ZERO);
    }

    #[test]
    fn test_initial_delta_holds_non_defaults_only() {
        let context = context();
        let mut server = new_avatar(&context);
        server.position = Vec3::new(0.0, 5.0, 0.0);

        let mut bytes = Vec::new();
        server.write_initial_delta_update(&mut bytes, 0).unwrap();
        assert_eq!(bytes[1], 0b01);

        let mut client = new_avatar(&context);
        client.read_delta_update(&mut bytes.as_slice()).unwrap();
        assert_eq!(client.position, Vec3::new(0.0, 5.0, 0.0));
        assert_eq!(client.health, 100);
    }

    #[test]
    fn test_latest_data_update() {
        let context = context();
        let mut server = new_avatar(&context);
        server.position = Vec3::new(4.0, 0.0, 0.0);
        server.health = 1;

        let mut bytes = Vec::new();
        server.write_latest_data_update(&mut bytes, 3).unwrap();

        let mut client = new_avatar(&context);
        assert!(client.read_latest_data_update(&mut bytes.as_slice()).unwrap());
        assert_eq!(client.position, Vec3::new(4.0, 0.0, 0.0));
        assert_eq!(client.health, 100);
    }

    #[test]
    fn test_intercepted_update_becomes_an_event() {
        // --- 1. SETUP ---
        let context = context();
        let mut server = new_avatar(&context);
        server.health = 55;
        let mut bytes = Vec::new();
        let mut bits = DirtyBits::new();
        bits.set(1);
        server.write_delta_update(&mut bytes, &bits, 9).unwrap();

        let mut client = new_avatar(&context);
        client.set_intercept_network_update("Health", true).unwrap();
        assert!(client.intercept_network_update("Health"));
        assert!(!client.intercept_network_update("Position"));

        let seen = Rc::new(RefCell::new(Vec::new()));
        let listener = new_avatar(&context);
        let sink = Rc::clone(&seen);
        listener.base().subscribe_to_sender_event(
            client.id(),
            E_INTERCEPTNETWORKUPDATE,
            move |event| {
                sink.borrow_mut().push((
                    event.param::<i32>(InterceptNetworkUpdate::P_INDEX),
                    event.param::<i32>(InterceptNetworkUpdate::P_VALUE),
                    event.param::<i32>(InterceptNetworkUpdate::P_TIMESTAMP),
                ));
                Ok(())
            },
        );

        // --- 2. ACTION ---
        let changed = client.read_delta_update(&mut bytes.as_slice()).unwrap();

        // --- 3. ASSERTIONS ---
        assert!(!changed);
        assert_eq!(client.health, 100);
        assert_eq!(*seen.borrow(), [(Some(2), Some(55), Some(9))]);
    }

    #[test]
    fn test_intercept_requires_a_network_attribute() {
        let context = context();
        let mut avatar = new_avatar(&context);
        assert!(avatar.set_intercept_network_update("Nickname", true).is_err());
    }
}
