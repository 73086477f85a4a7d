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

//! The process-wide table of reflective types.
//!
//! A [`TypeRegistry`] is filled during a single-threaded registration phase
//! and then moved into a [`Context`], which only hands out shared references
//! to it. Per type it stores the name, logical base, optional factory and an
//! ordered attribute table.
//!
//! ```rust
//! use dry_core::prelude::*;
//!
//! #[derive(Object)]
//! struct Widget {
//!     base: ObjectBase,
//!     state: SerializableState,
//!     size: i32,
//! }
//!
//! impl Serializable for Widget {
//!     fn serializable_state(&self) -> &SerializableState { &self.state }
//!     fn serializable_state_mut(&mut self) -> &mut SerializableState { &mut self.state }
//! }
//!
//! let mut registry = TypeRegistry::new();
//! registry
//!     .register_factory::<Widget, _>(|context| Widget {
//!         base: ObjectBase::new(context),
//!         state: SerializableState::default(),
//!         size: 10,
//!     })
//!     .unwrap();
//! dry_attribute!(registry, Widget, "Size", size, 10, AttributeMode::DEFAULT).unwrap();
//!
//! let context = Context::new(registry);
//! let widget = context.create::<Widget>().unwrap();
//! assert_eq!(widget.get_attribute_by_name("Size").unwrap(), Variant::Int(10));
//! ```

mod attribute;
#[macro_use]
mod macros;

pub use attribute::{AttributeAccessor, AttributeHandle, AttributeInfo, AttributeMode};

use crate::context::Context;
use crate::error::RegistryError;
use crate::object::ObjectType;
use crate::serializable::{Serializable, MAX_NETWORK_ATTRIBUTES};
use crate::string_hash::StringHash;
use crate::variant::Variant;
use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::rc::Rc;

#[doc(hidden)]
pub mod __private {
    pub use inventory;
}

/// Creates a boxed object bound to a context.
pub type ObjectFactory = Box<dyn Fn(&Rc<Context>) -> Box<dyn Serializable>>;

/// Static description of a registered type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    name: String,
    hash: StringHash,
    base: Option<StringHash>,
    category: Option<String>,
}

impl TypeInfo {
    /// The type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Hash of the type name.
    pub fn hash(&self) -> StringHash {
        self.hash
    }

    /// Hash of the logical base type name.
    pub fn base(&self) -> Option<StringHash> {
        self.base
    }

    /// The factory category, used by editors to group creatable types.
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }
}

struct TypeEntry {
    info: TypeInfo,
    factory: Option<ObjectFactory>,
    attributes: Vec<AttributeInfo>,
    network_attributes: Vec<usize>,
}

impl TypeEntry {
    fn refresh_network_attributes(&mut self) {
        self.network_attributes = self
            .attributes
            .iter()
            .enumerate()
            .filter(|(_, a)| a.mode.contains(AttributeMode::NET))
            .map(|(i, _)| i)
            .collect();
        if self.network_attributes.len() > MAX_NETWORK_ATTRIBUTES {
            log::warn!(
                "Type '{}' has {} network attributes; only the first {MAX_NETWORK_ATTRIBUTES} are replicated",
                self.info.name,
                self.network_attributes.len()
            );
            self.network_attributes.truncate(MAX_NETWORK_ATTRIBUTES);
        }
    }
}

/// A registration function collected at link time with [`dry_register!`].
pub struct TypeRegistration {
    register: fn(&mut TypeRegistry) -> Result<(), RegistryError>,
}

impl TypeRegistration {
    /// Wraps a registration function.
    pub const fn new(register: fn(&mut TypeRegistry) -> Result<(), RegistryError>) -> Self {
        Self { register }
    }
}

inventory::collect!(TypeRegistration);

/// Maps type hashes to type descriptions, factories and attribute tables.
#[derive(Default)]
pub struct TypeRegistry {
    types: HashMap<StringHash, TypeEntry>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry and runs every function submitted with [`dry_register!`].
    ///
    /// Submitted functions run in an unspecified order, so they must not
    /// depend on each other.
    pub fn with_submitted_types() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        registry.register_submitted_types()?;
        Ok(registry)
    }

    /// Runs every function submitted with [`dry_register!`].
    pub fn register_submitted_types(&mut self) -> Result<(), RegistryError> {
        for registration in inventory::iter::<TypeRegistration> {
            (registration.register)(self)?;
        }
        Ok(())
    }

    /// Registers `T` without a factory. Registering the same type again is a no-op.
    pub fn register_type<T: ObjectType>(&mut self) -> Result<StringHash, RegistryError> {
        self.register_named(T::TYPE_NAME, T::static_base_type_hash())
    }

    fn register_named(
        &mut self,
        name: &str,
        base: Option<StringHash>,
    ) -> Result<StringHash, RegistryError> {
        let hash = StringHash::new(name);
        match self.types.entry(hash) {
            Entry::Occupied(entry) => {
                let existing = &entry.get().info.name;
                if existing != name {
                    let error = RegistryError::HashCollision {
                        hash,
                        existing: existing.clone(),
                        requested: name.to_owned(),
                    };
                    log::error!("{error}");
                    return Err(error);
                }
            }
            Entry::Vacant(entry) => {
                log::debug!("Registered type '{name}' ({hash})");
                entry.insert(TypeEntry {
                    info: TypeInfo {
                        name: name.to_owned(),
                        hash,
                        base,
                        category: None,
                    },
                    factory: None,
                    attributes: Vec::new(),
                    network_attributes: Vec::new(),
                });
            }
        }
        Ok(hash)
    }

    /// Registers `T` with a factory. A later factory for the same type replaces the earlier one.
    pub fn register_factory<T, F>(&mut self, factory: F) -> Result<(), RegistryError>
    where
        T: ObjectType + Serializable,
        F: Fn(&Rc<Context>) -> T + 'static,
    {
        let hash = self.register_type::<T>()?;
        let entry = self.entry_mut(hash)?;
        if entry.factory.is_some() {
            log::debug!("Replacing factory of type '{}'", entry.info.name);
        }
        entry.factory = Some(Box::new(move |context: &Rc<Context>| -> Box<dyn Serializable> {
            Box::new(factory(context))
        }));
        Ok(())
    }

    /// Registers `T` with a factory and files it under `category`.
    pub fn register_factory_in_category<T, F>(
        &mut self,
        category: &str,
        factory: F,
    ) -> Result<(), RegistryError>
    where
        T: ObjectType + Serializable,
        F: Fn(&Rc<Context>) -> T + 'static,
    {
        self.register_factory::<T, F>(factory)?;
        self.entry_mut(T::static_type_hash())?.info.category = Some(category.to_owned());
        Ok(())
    }

    /// Appends an attribute to `T`'s table, registering `T` if needed.
    ///
    /// Attribute names must be unique within a type, and a non-`None`
    /// default must have the declared type.
    pub fn register_attribute<T: ObjectType>(
        &mut self,
        attribute: AttributeInfo,
    ) -> Result<AttributeHandle<'_>, RegistryError> {
        if !attribute.default_value.is_none()
            && attribute.default_value.variant_type() != attribute.variant_type
        {
            let error = RegistryError::DefaultTypeMismatch {
                attribute: attribute.name.clone(),
                expected: attribute.variant_type,
                found: attribute.default_value.variant_type(),
            };
            log::error!("{error}");
            return Err(error);
        }

        let hash = self.register_type::<T>()?;
        let entry = self.entry_mut(hash)?;
        if entry.attributes.iter().any(|a| a.name == attribute.name) {
            let error = RegistryError::DuplicateAttribute {
                type_name: entry.info.name.clone(),
                attribute: attribute.name,
            };
            log::error!("{error}");
            return Err(error);
        }

        log::trace!(
            "Registered attribute '{}' on '{}'",
            attribute.name,
            entry.info.name
        );
        let index = entry.attributes.len();
        entry.attributes.push(attribute);
        entry.refresh_network_attributes();
        Ok(AttributeHandle::new(&mut entry.attributes[index]))
    }

    /// Appends every attribute of `B` to `D`, reading them through the `B`
    /// embedded in `D`. Names already present on `D` are skipped.
    pub fn copy_base_attributes<B: ObjectType, D: ObjectType>(
        &mut self,
        project: fn(&D) -> &B,
        project_mut: fn(&mut D) -> &mut B,
    ) -> Result<(), RegistryError> {
        let base_attributes = self
            .types
            .get(&B::static_type_hash())
            .map(|e| e.attributes.clone())
            .ok_or_else(|| RegistryError::UnknownType {
                type_name: B::TYPE_NAME.to_owned(),
            })?;

        let hash = self.register_type::<D>()?;
        let entry = self.entry_mut(hash)?;
        for mut attribute in base_attributes {
            if entry.attributes.iter().any(|a| a.name == attribute.name) {
                log::warn!(
                    "Not copying attribute '{}' from '{}': '{}' already defines it",
                    attribute.name,
                    B::TYPE_NAME,
                    D::TYPE_NAME
                );
                continue;
            }
            attribute.accessor =
                attribute::project_accessor::<D, B>(attribute.accessor, project, project_mut);
            entry.attributes.push(attribute);
        }
        entry.refresh_network_attributes();
        Ok(())
    }

    /// Changes the registered default of `T`'s attribute `name`.
    pub fn update_attribute_default_value<T: ObjectType>(
        &mut self,
        name: &str,
        default_value: impl Into<Variant>,
    ) -> Result<(), RegistryError> {
        let default_value = default_value.into();
        let attribute = self.attribute_mut::<T>(name)?;
        if default_value.variant_type() != attribute.variant_type {
            return Err(RegistryError::DefaultTypeMismatch {
                attribute: attribute.name.clone(),
                expected: attribute.variant_type,
                found: default_value.variant_type(),
            });
        }
        attribute.default_value = default_value;
        Ok(())
    }

    /// Removes `T`'s attribute `name`. Later attributes shift down by one index.
    pub fn remove_attribute<T: ObjectType>(&mut self, name: &str) -> Result<(), RegistryError> {
        let entry = self.entry_mut(T::static_type_hash())?;
        let index = entry
            .attributes
            .iter()
            .position(|a| a.name == name)
            .ok_or_else(|| RegistryError::UnknownAttribute {
                type_name: T::TYPE_NAME.to_owned(),
                attribute: name.to_owned(),
            })?;
        entry.attributes.remove(index);
        entry.refresh_network_attributes();
        Ok(())
    }

    fn entry_mut(&mut self, hash: StringHash) -> Result<&mut TypeEntry, RegistryError> {
        self.types
            .get_mut(&hash)
            .ok_or_else(|| RegistryError::UnknownType {
                type_name: hash.to_string(),
            })
    }

    fn attribute_mut<T: ObjectType>(
        &mut self,
        name: &str,
    ) -> Result<&mut AttributeInfo, RegistryError> {
        self.entry_mut(T::static_type_hash())?
            .attributes
            .iter_mut()
            .find(|a| a.name == name)
            .ok_or_else(|| RegistryError::UnknownAttribute {
                type_name: T::TYPE_NAME.to_owned(),
                attribute: name.to_owned(),
            })
    }

    /// Looks up a type description.
    pub fn type_info(&self, hash: StringHash) -> Option<&TypeInfo> {
        self.types.get(&hash).map(|e| &e.info)
    }

    /// Returns the name registered under `hash`.
    pub fn type_name(&self, hash: StringHash) -> Option<&str> {
        self.type_info(hash).map(TypeInfo::name)
    }

    /// Returns `true` if a type is registered under `hash`.
    pub fn contains(&self, hash: StringHash) -> bool {
        self.types.contains_key(&hash)
    }

    /// Returns `true` if the type under `hash` can be created.
    pub fn has_factory(&self, hash: StringHash) -> bool {
        self.types.get(&hash).is_some_and(|e| e.factory.is_some())
    }

    pub(crate) fn factory(&self, hash: StringHash) -> Option<&ObjectFactory> {
        self.types.get(&hash).and_then(|e| e.factory.as_ref())
    }

    /// Returns `true` if `type_hash` is `base_hash` or has it somewhere in its base chain.
    pub fn is_type_of(&self, type_hash: StringHash, base_hash: StringHash) -> bool {
        let mut current = Some(type_hash);
        // Bounded walk: a malformed chain cannot loop forever.
        for _ in 0..=self.types.len() {
            match current {
                Some(hash) if hash == base_hash => return true,
                Some(hash) => current = self.types.get(&hash).and_then(|e| e.info.base),
                None => return false,
            }
        }
        false
    }

    /// The ordered attribute table of a type. Empty for unknown types.
    pub fn attributes(&self, hash: StringHash) -> &[AttributeInfo] {
        self.types
            .get(&hash)
            .map(|e| e.attributes.as_slice())
            .unwrap_or_default()
    }

    /// Indices into [`attributes`](Self::attributes) of the replicated attributes.
    pub fn network_attributes(&self, hash: StringHash) -> &[usize] {
        self.types
            .get(&hash)
            .map(|e| e.network_attributes.as_slice())
            .unwrap_or_default()
    }

    /// Finds an attribute by name.
    pub fn attribute(&self, hash: StringHash, name: &str) -> Option<(usize, &AttributeInfo)> {
        self.attributes(hash)
            .iter()
            .enumerate()
            .find(|(_, a)| a.name == name)
    }

    /// Iterates over all registered types.
    pub fn types(&self) -> impl Iterator<Item = &TypeInfo> {
        self.types.values().map(|e| &e.info)
    }

    /// All factory categories, sorted.
    pub fn categories(&self) -> BTreeSet<&str> {
        self.types().filter_map(TypeInfo::category).collect()
    }

    /// Types filed under `category`, sorted by name.
    pub fn types_in_category(&self, category: &str) -> Vec<&TypeInfo> {
        let mut types: Vec<&TypeInfo> = self
            .types()
            .filter(|t| t.category() == Some(category))
            .collect();
        types.sort_by(|a, b| a.name.cmp(&b.name));
        types
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.types().map(TypeInfo::name).collect();
        names.sort_unstable();
        f.debug_struct("TypeRegistry").field("types", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectBase;
    use crate::serializable::SerializableState;
    use crate::variant::VariantType;
    use crate::Object;

    struct Component {
        enabled: bool,
    }

    impl ObjectType for Component {
        const TYPE_NAME: &'static str = "Component";
    }

    #[derive(Object)]
    #[object(base = Component)]
    struct Light {
        base: ObjectBase,
        state: SerializableState,
        component: Component,
        range: f32,
    }

    impl Serializable for Light {
        fn serializable_state(&self) -> &SerializableState {
            &self.state
        }
        fn serializable_state_mut(&mut self) -> &mut SerializableState {
            &mut self.state
        }
    }

    fn new_light(context: &Rc<Context>) -> Light {
        Light {
            base: ObjectBase::new(context),
            state: SerializableState::default(),
            component: Component { enabled: true },
            range: 5.0,
        }
    }

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry.register_type::<Component>().unwrap();
        dry_attribute!(registry, Component, "Is Enabled", enabled, true, AttributeMode::DEFAULT)
            .unwrap();
        registry
            .register_factory_in_category::<Light, _>("Scene", new_light)
            .unwrap();
        registry
            .copy_base_attributes::<Component, Light>(|l| &l.component, |l| &mut l.component)
            .unwrap();
        dry_attribute!(registry, Light, "Range", range, 5.0f32, AttributeMode::DEFAULT)
            .unwrap()
            .set_metadata("Unit", "m");
        registry
    }

    #[test]
    fn test_type_queries() {
        let registry = registry();
        let light = StringHash::new("Light");
        assert_eq!(registry.type_name(light), Some("Light"));
        assert!(registry.has_factory(light));
        assert!(!registry.has_factory(StringHash::new("Component")));
        assert!(registry.is_type_of(light, StringHash::new("Component")));
        assert!(registry.is_type_of(light, light));
        assert!(!registry.is_type_of(StringHash::new("Component"), light));
        assert_eq!(registry.types_in_category("Scene").len(), 1);
        assert!(registry.categories().contains("Scene"));
    }

    #[test]
    fn test_attribute_table_order_and_copy() {
        let registry = registry();
        let names: Vec<&str> = registry
            .attributes(StringHash::new("Light"))
            .iter()
            .map(|a| a.name.as_str())
            .collect();
        assert_eq!(names, ["Is Enabled", "Range"]);
        assert_eq!(registry.network_attributes(StringHash::new("Light")), [0, 1]);

        let (index, range) = registry
            .attribute(StringHash::new("Light"), "Range")
            .unwrap();
        assert_eq!(index, 1);
        assert_eq!(range.metadata(StringHash::new("Unit")), Some(&Variant::from("m")));
    }

    #[test]
    fn test_copied_accessor_reads_through_projection() {
        let context = Context::new(registry());
        let mut light = new_light(&context);
        let enabled = &context.registry().attributes(light.type_hash())[0];
        assert!(enabled.accessor.set(&mut light, &Variant::Bool(false)));
        assert!(!light.component.enabled);
    }

    #[test]
    fn test_duplicate_attribute_is_rejected() {
        let mut registry = registry();
        let result =
            dry_attribute!(registry, Light, "Range", range, 1.0f32, AttributeMode::DEFAULT);
        assert!(matches!(
            result,
            Err(RegistryError::DuplicateAttribute { .. })
        ));
    }

    #[test]
    fn test_default_type_must_match() {
        let mut registry = registry();
        let bad = AttributeInfo::member::<Light, f32>(
            "Bad",
            |l| &l.range,
            |l| &mut l.range,
            0.0,
            AttributeMode::FILE,
        );
        let bad = AttributeInfo {
            default_value: Variant::Int(1),
            ..bad
        };
        assert!(matches!(
            registry.register_attribute::<Light>(bad),
            Err(RegistryError::DefaultTypeMismatch {
                expected: VariantType::Float,
                ..
            })
        ));
    }

    #[test]
    fn test_update_and_remove_attribute() {
        let mut registry = registry();
        registry
            .update_attribute_default_value::<Light>("Range", 9.0f32)
            .unwrap();
        assert_eq!(
            registry.attributes(StringHash::new("Light"))[1].default_value,
            Variant::Float(9.0)
        );
        assert!(registry
            .update_attribute_default_value::<Light>("Range", "far")
            .is_err());

        registry.remove_attribute::<Light>("Is Enabled").unwrap();
        assert_eq!(registry.attributes(StringHash::new("Light")).len(), 1);
        assert_eq!(registry.network_attributes(StringHash::new("Light")), [0]);
        assert!(matches!(
            registry.remove_attribute::<Light>("Missing"),
            Err(RegistryError::UnknownAttribute { .. })
        ));
    }

    #[test]
    fn test_hash_collision_is_detected() {
        struct First;
        impl ObjectType for First {
            const TYPE_NAME: &'static str = "AANA";
        }
        struct Second;
        impl ObjectType for Second {
            const TYPE_NAME: &'static str = "dzyaq";
        }

        assert_eq!(StringHash::new("AANA"), StringHash::new("dzyaq"));
        let mut registry = TypeRegistry::new();
        registry.register_type::<First>().unwrap();
        assert!(registry.register_type::<First>().is_ok());
        assert!(matches!(
            registry.register_type::<Second>(),
            Err(RegistryError::HashCollision { .. })
        ));
    }

    #[test]
    fn test_unknown_type_has_no_attributes() {
        let registry = TypeRegistry::new();
        assert!(registry.attributes(StringHash::new("Nope")).is_empty());
        assert!(registry.type_info(StringHash::new("Nope")).is_none());
    }
}
