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

//! Attribute descriptors and the accessors that read and write them.

use crate::string_hash::StringHash;
use crate::variant::{Variant, VariantMap, VariantType, VariantValue};
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::ops::{BitAnd, BitOr, BitOrAssign};
use std::sync::Arc;

/// Flags describing where an attribute takes part.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AttributeMode {
    bits: u32,
}

impl AttributeMode {
    /// Editor-only: not saved and not replicated.
    pub const EDIT: Self = Self { bits: 0 };
    /// Saved to and loaded from binary streams and text records.
    pub const FILE: Self = Self { bits: 1 << 0 };
    /// Replicated over the network.
    pub const NET: Self = Self { bits: 1 << 1 };
    /// Saved and replicated.
    pub const DEFAULT: Self = Self {
        bits: Self::FILE.bits | Self::NET.bits,
    };
    /// Replicated with latest-data semantics: only the newest value matters.
    pub const LATEST_DATA: Self = Self { bits: 1 << 2 };
    /// Hidden from editors.
    pub const NO_EDIT: Self = Self { bits: 1 << 3 };
    /// The value is an `ObjectRef` (or a vector of them) remapped after a batch load.
    pub const OBJECT_ID: Self = Self { bits: 1 << 4 };
    /// Written to text records for inspection but never loaded.
    pub const READ_ONLY: Self = Self { bits: 1 << 7 };
    /// `FILE | READ_ONLY`.
    pub const FILE_READ_ONLY: Self = Self {
        bits: Self::FILE.bits | Self::READ_ONLY.bits,
    };

    /// Creates flags from raw bits.
    pub const fn from_bits(bits: u32) -> Self {
        Self { bits }
    }

    /// Returns the raw bits.
    pub const fn bits(&self) -> u32 {
        self.bits
    }

    /// Combines two sets of flags.
    pub const fn union(self, other: Self) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }

    /// Returns `true` if every flag of `other` is set.
    pub const fn contains(&self, other: Self) -> bool {
        self.bits & other.bits == other.bits
    }

    /// Returns `true` if any flag of `other` is set.
    pub const fn intersects(&self, other: Self) -> bool {
        self.bits & other.bits != 0
    }

    /// Saved and loaded by the binary format.
    pub const fn is_binary_persistent(&self) -> bool {
        self.contains(Self::FILE) && !self.contains(Self::READ_ONLY)
    }
}

impl BitOr for AttributeMode {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for AttributeMode {
    fn bitor_assign(&mut self, rhs: Self) {
        self.bits |= rhs.bits;
    }
}

impl BitAnd for AttributeMode {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self {
            bits: self.bits & rhs.bits,
        }
    }
}

impl fmt::Debug for AttributeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(AttributeMode, &str); 7] = [
            (AttributeMode::FILE, "FILE"),
            (AttributeMode::NET, "NET"),
            (AttributeMode::LATEST_DATA, "LATEST_DATA"),
            (AttributeMode::NO_EDIT, "NO_EDIT"),
            (AttributeMode::OBJECT_ID, "OBJECT_ID"),
            (AttributeMode::READ_ONLY, "READ_ONLY"),
            (AttributeMode::EDIT, "EDIT"),
        ];
        let set: Vec<&str> = NAMES
            .iter()
            .filter(|(flag, _)| flag.bits != 0 && self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        if set.is_empty() {
            f.write_str("AttributeMode(EDIT)")
        } else {
            write!(f, "AttributeMode({})", set.join(" | "))
        }
    }
}

/// Reads and writes one attribute on a type-erased instance.
///
/// Both methods receive the concrete object as `dyn Any` and fail if it is
/// not of the type the accessor was built for.
pub trait AttributeAccessor: Send + Sync {
    /// Reads the current value, or `None` if `instance` has the wrong type.
    fn get(&self, instance: &dyn Any) -> Option<Variant>;

    /// Writes `value`. Returns `false` if `instance` or `value` has the wrong type.
    fn set(&self, instance: &mut dyn Any, value: &Variant) -> bool;
}

struct MemberAccessor<T, V> {
    get: fn(&T) -> &V,
    get_mut: fn(&mut T) -> &mut V,
}

impl<T: 'static, V: VariantValue + Clone + 'static> AttributeAccessor for MemberAccessor<T, V> {
    fn get(&self, instance: &dyn Any) -> Option<Variant> {
        let instance = instance.downcast_ref::<T>()?;
        Some((self.get)(instance).clone().into_variant())
    }

    fn set(&self, instance: &mut dyn Any, value: &Variant) -> bool {
        match (instance.downcast_mut::<T>(), V::from_variant(value)) {
            (Some(instance), Some(value)) => {
                *(self.get_mut)(instance) = value;
                true
            }
            _ => false,
        }
    }
}

struct MethodAccessor<T, V> {
    get: fn(&T) -> V,
    set: fn(&mut T, V),
}

impl<T: 'static, V: VariantValue + 'static> AttributeAccessor for MethodAccessor<T, V> {
    fn get(&self, instance: &dyn Any) -> Option<Variant> {
        let instance = instance.downcast_ref::<T>()?;
        Some((self.get)(instance).into_variant())
    }

    fn set(&self, instance: &mut dyn Any, value: &Variant) -> bool {
        match (instance.downcast_mut::<T>(), V::from_variant(value)) {
            (Some(instance), Some(value)) => {
                (self.set)(instance, value);
                true
            }
            _ => false,
        }
    }
}

struct VariantAccessor<T, G, S> {
    get: G,
    set: S,
    _marker: PhantomData<fn(&T)>,
}

impl<T, G, S> AttributeAccessor for VariantAccessor<T, G, S>
where
    T: 'static,
    G: Fn(&T) -> Variant + Send + Sync,
    S: Fn(&mut T, &Variant) -> bool + Send + Sync,
{
    fn get(&self, instance: &dyn Any) -> Option<Variant> {
        instance.downcast_ref::<T>().map(&self.get)
    }

    fn set(&self, instance: &mut dyn Any, value: &Variant) -> bool {
        match instance.downcast_mut::<T>() {
            Some(instance) => (self.set)(instance, value),
            None => false,
        }
    }
}

/// Applies an accessor written for `B` to a `D` that embeds a `B`.
struct ProjectedAccessor<D, B> {
    inner: Arc<dyn AttributeAccessor>,
    project: fn(&D) -> &B,
    project_mut: fn(&mut D) -> &mut B,
}

impl<D: 'static, B: 'static> AttributeAccessor for ProjectedAccessor<D, B> {
    fn get(&self, instance: &dyn Any) -> Option<Variant> {
        let derived = instance.downcast_ref::<D>()?;
        self.inner.get((self.project)(derived))
    }

    fn set(&self, instance: &mut dyn Any, value: &Variant) -> bool {
        match instance.downcast_mut::<D>() {
            Some(derived) => self.inner.set((self.project_mut)(derived), value),
            None => false,
        }
    }
}

pub(crate) fn project_accessor<D: 'static, B: 'static>(
    inner: Arc<dyn AttributeAccessor>,
    project: fn(&D) -> &B,
    project_mut: fn(&mut D) -> &mut B,
) -> Arc<dyn AttributeAccessor> {
    Arc::new(ProjectedAccessor {
        inner,
        project,
        project_mut,
    })
}

/// Describes one reflected property of a type.
#[derive(Clone)]
pub struct AttributeInfo {
    /// Attribute name, unique within its type.
    pub name: String,
    /// Hash of `name`.
    pub name_hash: StringHash,
    /// Declared value type.
    pub variant_type: VariantType,
    /// Reads and writes the value on a live instance.
    pub accessor: Arc<dyn AttributeAccessor>,
    /// Value assumed when nothing was stored.
    pub default_value: Variant,
    /// Persistence and replication flags.
    pub mode: AttributeMode,
    /// For enum attributes, the name of each integer value.
    pub enum_names: Option<&'static [&'static str]>,
    /// Free-form metadata for tools.
    pub metadata: VariantMap,
}

impl AttributeInfo {
    /// Creates an attribute around an arbitrary accessor.
    pub fn new(
        name: impl Into<String>,
        variant_type: VariantType,
        accessor: Arc<dyn AttributeAccessor>,
        default_value: Variant,
        mode: AttributeMode,
    ) -> Self {
        let name = name.into();
        Self {
            name_hash: StringHash::new(&name),
            name,
            variant_type,
            accessor,
            default_value,
            mode,
            enum_names: None,
            metadata: VariantMap::new(),
        }
    }

    /// An attribute backed directly by a struct field.
    pub fn member<T: 'static, V: VariantValue + Clone + 'static>(
        name: impl Into<String>,
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
        default_value: V,
        mode: AttributeMode,
    ) -> Self {
        Self::new(
            name,
            V::TYPE,
            Arc::new(MemberAccessor { get, get_mut }),
            default_value.into_variant(),
            mode,
        )
    }

    /// An attribute backed by a getter and a setter method.
    ///
    /// The setter runs for every write, so it can react to the change.
    pub fn accessor<T: 'static, V: VariantValue + 'static>(
        name: impl Into<String>,
        get: fn(&T) -> V,
        set: fn(&mut T, V),
        default_value: V,
        mode: AttributeMode,
    ) -> Self {
        Self::new(
            name,
            V::TYPE,
            Arc::new(MethodAccessor { get, set }),
            default_value.into_variant(),
            mode,
        )
    }

    /// An integer attribute whose values are named by `names`.
    ///
    /// Text records store the name instead of the number.
    pub fn enumeration<T: 'static>(
        name: impl Into<String>,
        get: fn(&T) -> i32,
        set: fn(&mut T, i32),
        names: &'static [&'static str],
        default_value: i32,
        mode: AttributeMode,
    ) -> Self {
        let mut info = Self::accessor(name, get, set, default_value, mode);
        info.enum_names = Some(names);
        info
    }

    /// An attribute that converts to and from a `Variant` by hand, e.g. a
    /// composite value packed into a `VariantVector`.
    pub fn custom<T, G, S>(
        name: impl Into<String>,
        variant_type: VariantType,
        get: G,
        set: S,
        default_value: Variant,
        mode: AttributeMode,
    ) -> Self
    where
        T: 'static,
        G: Fn(&T) -> Variant + Send + Sync + 'static,
        S: Fn(&mut T, &Variant) -> bool + Send + Sync + 'static,
    {
        Self::new(
            name,
            variant_type,
            Arc::new(VariantAccessor {
                get,
                set,
                _marker: PhantomData,
            }),
            default_value,
            mode,
        )
    }

    /// Adds a metadata entry.
    pub fn with_metadata(mut self, key: &str, value: impl Into<Variant>) -> Self {
        self.metadata.insert(StringHash::new(key), value.into());
        self
    }

    /// Reads a metadata entry.
    pub fn metadata(&self, key: StringHash) -> Option<&Variant> {
        self.metadata.get(&key)
    }

    /// Returns the integer value named `name`, ignoring ASCII case.
    pub fn enum_value(&self, name: &str) -> Option<i32> {
        self.enum_names?
            .iter()
            .position(|n| n.eq_ignore_ascii_case(name))
            .and_then(|i| i32::try_from(i).ok())
    }

    /// Returns the name of the integer value `value`.
    pub fn enum_name(&self, value: i32) -> Option<&'static str> {
        let index = usize::try_from(value).ok()?;
        self.enum_names?.get(index).copied()
    }
}

impl fmt::Debug for AttributeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeInfo")
            .field("name", &self.name)
            .field("variant_type", &self.variant_type)
            .field("default_value", &self.default_value)
            .field("mode", &self.mode)
            .field("enum_names", &self.enum_names)
            .finish_non_exhaustive()
    }
}

/// Handle to a freshly registered attribute, used to attach metadata.
pub struct AttributeHandle<'a> {
    attribute: &'a mut AttributeInfo,
}

impl<'a> AttributeHandle<'a> {
    pub(crate) fn new(attribute: &'a mut AttributeInfo) -> Self {
        Self { attribute }
    }

    /// Sets a metadata entry on the attribute.
    pub fn set_metadata(self, key: &str, value: impl Into<Variant>) -> Self {
        self.attribute
            .metadata
            .insert(StringHash::new(key), value.into());
        self
    }

    /// The registered attribute.
    pub fn info(&self) -> &AttributeInfo {
        self.attribute
    }
}
