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

//! The dynamically-typed [`Variant`] value and its companion types.
//!
//! A `Variant` is the currency of the reflection system: attribute getters
//! produce one, attribute setters consume one, and event payloads are
//! [`VariantMap`]s keyed by parameter hash.

mod value;

pub use value::VariantValue;

use crate::math::{Color, Quaternion, Vec2, Vec3, Vec4};
use crate::object::ObjectId;
use crate::string_hash::StringHash;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A map of event parameters or nested attribute data, keyed by name hash.
pub type VariantMap = HashMap<StringHash, Variant>;

/// The type tag of a [`Variant`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariantType {
    /// No value.
    None,
    /// 32-bit signed integer. Enum attributes are stored as this type.
    Int,
    /// 64-bit signed integer.
    Int64,
    /// Boolean.
    Bool,
    /// 32-bit float.
    Float,
    /// 64-bit float.
    Double,
    /// 2D vector.
    Vector2,
    /// 3D vector.
    Vector3,
    /// 4D vector.
    Vector4,
    /// Rotation quaternion.
    Quaternion,
    /// RGBA color.
    Color,
    /// UTF-8 string.
    String,
    /// Raw byte buffer.
    Buffer,
    /// Typed reference to a named resource.
    ResourceRef,
    /// Typed list of named resources.
    ResourceRefList,
    /// Heterogeneous list of variants.
    VariantVector,
    /// List of strings.
    StringVector,
    /// Nested map of variants.
    VariantMap,
    /// Identifier of another live object, or null.
    ObjectRef,
}

impl VariantType {
    /// All variant types in tag order.
    pub const ALL: [VariantType; 19] = [
        Self::None,
        Self::Int,
        Self::Int64,
        Self::Bool,
        Self::Float,
        Self::Double,
        Self::Vector2,
        Self::Vector3,
        Self::Vector4,
        Self::Quaternion,
        Self::Color,
        Self::String,
        Self::Buffer,
        Self::ResourceRef,
        Self::ResourceRefList,
        Self::VariantVector,
        Self::StringVector,
        Self::VariantMap,
        Self::ObjectRef,
    ];

    /// Returns the canonical name of the type.
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Int => "Int",
            Self::Int64 => "Int64",
            Self::Bool => "Bool",
            Self::Float => "Float",
            Self::Double => "Double",
            Self::Vector2 => "Vector2",
            Self::Vector3 => "Vector3",
            Self::Vector4 => "Vector4",
            Self::Quaternion => "Quaternion",
            Self::Color => "Color",
            Self::String => "String",
            Self::Buffer => "Buffer",
            Self::ResourceRef => "ResourceRef",
            Self::ResourceRefList => "ResourceRefList",
            Self::VariantVector => "VariantVector",
            Self::StringVector => "StringVector",
            Self::VariantMap => "VariantMap",
            Self::ObjectRef => "ObjectRef",
        }
    }

    /// Looks a type up by its canonical name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for VariantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed reference to a resource by name, e.g. a texture or a sound.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    /// Hash of the resource type name.
    pub type_hash: StringHash,
    /// Resource name or path.
    pub name: String,
}

impl ResourceRef {
    /// Creates a new resource reference.
    pub fn new(type_hash: StringHash, name: impl Into<String>) -> Self {
        Self {
            type_hash,
            name: name.into(),
        }
    }
}

/// A typed list of resource names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRefList {
    /// Hash of the resource type name shared by every entry.
    pub type_hash: StringHash,
    /// Resource names or paths.
    pub names: Vec<String>,
}

impl ResourceRefList {
    /// Creates a new resource reference list.
    pub fn new(type_hash: StringHash, names: Vec<String>) -> Self {
        Self { type_hash, names }
    }
}

/// A dynamically-typed value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Variant {
    /// No value.
    #[default]
    None,
    /// 32-bit signed integer.
    Int(i32),
    /// 64-bit signed integer.
    Int64(i64),
    /// Boolean.
    Bool(bool),
    /// 32-bit float.
    Float(f32),
    /// 64-bit float.
    Double(f64),
    /// 2D vector.
    Vector2(Vec2),
    /// 3D vector.
    Vector3(Vec3),
    /// 4D vector.
    Vector4(Vec4),
    /// Rotation quaternion.
    Quaternion(Quaternion),
    /// RGBA color.
    Color(Color),
    /// UTF-8 string.
    String(String),
    /// Raw byte buffer.
    Buffer(Vec<u8>),
    /// Typed reference to a named resource.
    ResourceRef(ResourceRef),
    /// Typed list of named resources.
    ResourceRefList(ResourceRefList),
    /// Heterogeneous list of variants.
    VariantVector(Vec<Variant>),
    /// List of strings.
    StringVector(Vec<String>),
    /// Nested map of variants.
    VariantMap(VariantMap),
    /// Identifier of another live object, or null.
    ObjectRef(Option<ObjectId>),
}

impl Variant {
    /// Returns the type tag of this value.
    pub fn variant_type(&self) -> VariantType {
        match self {
            Self::None => VariantType::None,
            Self::Int(_) => VariantType::Int,
            Self::Int64(_) => VariantType::Int64,
            Self::Bool(_) => VariantType::Bool,
            Self::Float(_) => VariantType::Float,
            Self::Double(_) => VariantType::Double,
            Self::Vector2(_) => VariantType::Vector2,
            Self::Vector3(_) => VariantType::Vector3,
            Self::Vector4(_) => VariantType::Vector4,
            Self::Quaternion(_) => VariantType::Quaternion,
            Self::Color(_) => VariantType::Color,
            Self::String(_) => VariantType::String,
            Self::Buffer(_) => VariantType::Buffer,
            Self::ResourceRef(_) => VariantType::ResourceRef,
            Self::ResourceRefList(_) => VariantType::ResourceRefList,
            Self::VariantVector(_) => VariantType::VariantVector,
            Self::StringVector(_) => VariantType::StringVector,
            Self::VariantMap(_) => VariantType::VariantMap,
            Self::ObjectRef(_) => VariantType::ObjectRef,
        }
    }

    /// Returns `true` if this is `Variant::None`.
    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Extracts a typed value, returning `None` on a type mismatch.
    #[inline]
    pub fn get<T: VariantValue>(&self) -> Option<T> {
        T::from_variant(self)
    }

    /// Extracts a typed value, returning `T::default()` on a type mismatch.
    #[inline]
    pub fn get_or_default<T: VariantValue + Default>(&self) -> T {
        T::from_variant(self).unwrap_or_default()
    }

    /// Borrows the string payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Converts this value to `target`, allowing only the documented widenings
    /// (`Int` to `Int64`, `Float` or `Double`, and `Float` to `Double`).
    /// `Int` to `Float` is inexact for magnitudes above 2^24.
    ///
    /// Returns `None` when no such conversion exists.
    pub fn convert_to(&self, target: VariantType) -> Option<Variant> {
        if self.variant_type() == target {
            return Some(self.clone());
        }
        match (self, target) {
            (Self::Int(v), VariantType::Int64) => Some(Self::Int64(i64::from(*v))),
            (Self::Int(v), VariantType::Float) => Some(Self::Float(*v as f32)),
            (Self::Int(v), VariantType::Double) => Some(Self::Double(f64::from(*v))),
            (Self::Float(v), VariantType::Double) => Some(Self::Double(f64::from(*v))),
            _ => None,
        }
    }

    /// Builds a `Buffer` from a slice of plain-old-data values, e.g. a list
    /// of contact points.
    pub fn from_pod_slice<T: bytemuck::NoUninit>(values: &[T]) -> Self {
        Self::Buffer(bytemuck::cast_slice(values).to_vec())
    }

    /// Reinterprets a `Buffer` as a vector of plain-old-data values.
    ///
    /// Returns `None` if this is not a buffer or its length is not a multiple
    /// of `size_of::<T>()`.
    pub fn to_pod_vec<T: bytemuck::Pod>(&self) -> Option<Vec<T>> {
        let Self::Buffer(bytes) = self else {
            return None;
        };
        let size = std::mem::size_of::<T>();
        if size == 0 || bytes.len() % size != 0 {
            return None;
        }
        // The byte buffer carries no alignment guarantee, so copy instead of casting in place.
        let mut values = vec![<T as bytemuck::Zeroable>::zeroed(); bytes.len() / size];
        bytemuck::cast_slice_mut::<T, u8>(&mut values).copy_from_slice(bytes);
        Some(values)
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Vector2(v) => write!(f, "{} {}", v.x, v.y),
            Self::Vector3(v) => write!(f, "{} {} {}", v.x, v.y, v.z),
            Self::Vector4(v) => write!(f, "{} {} {} {}", v.x, v.y, v.z, v.w),
            Self::Quaternion(q) => write!(f, "{} {} {} {}", q.w, q.x, q.y, q.z),
            Self::Color(c) => write!(f, "{} {} {} {}", c.r, c.g, c.b, c.a),
            Self::String(s) => f.write_str(s),
            Self::Buffer(b) => write!(f, "<{} bytes>", b.len()),
            Self::ResourceRef(r) => write!(f, "{};{}", r.type_hash, r.name),
            Self::ResourceRefList(r) => write!(f, "{};{}", r.type_hash, r.names.join(";")),
            Self::VariantVector(v) => write!(f, "<{} variants>", v.len()),
            Self::StringVector(v) => f.write_str(&v.join(";")),
            Self::VariantMap(m) => write!(f, "<{} entries>", m.len()),
            Self::ObjectRef(Some(id)) => write!(f, "{id}"),
            Self::ObjectRef(None) => f.write_str("null"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_type_tags() {
        assert_eq!(Variant::from(42).variant_type(), VariantType::Int);
        assert_eq!(Variant::from("hi").variant_type(), VariantType::String);
        assert_eq!(Variant::default().variant_type(), VariantType::None);
        assert_eq!(
            Variant::ObjectRef(None).variant_type(),
            VariantType::ObjectRef
        );
    }

    #[test]
    fn test_type_name_lookup_is_case_insensitive() {
        assert_eq!(VariantType::from_name("vector3"), Some(VariantType::Vector3));
        assert_eq!(VariantType::from_name("Matrix3"), None);
        for t in VariantType::ALL {
            assert_eq!(VariantType::from_name(t.name()), Some(t));
        }
    }

    #[test]
    fn test_widening_conversions() {
        assert_eq!(
            Variant::Int(3).convert_to(VariantType::Int64),
            Some(Variant::Int64(3))
        );
        assert_eq!(
            Variant::Int(3).convert_to(VariantType::Float),
            Some(Variant::Float(3.0))
        );
        assert_eq!(
            Variant::Float(0.5).convert_to(VariantType::Double),
            Some(Variant::Double(0.5))
        );
        assert_eq!(Variant::Int64(3).convert_to(VariantType::Int), None);
        assert_eq!(Variant::from("3").convert_to(VariantType::Int), None);
    }

    #[test]
    fn test_int_to_float_rounds_large_values() {
        assert_eq!(
            Variant::Int(16_777_217).convert_to(VariantType::Float),
            Some(Variant::Float(16_777_216.0))
        );
        assert_eq!(
            Variant::Int(16_777_217).convert_to(VariantType::Double),
            Some(Variant::Double(16_777_217.0))
        );
    }

    #[test]
    fn test_pod_buffer_round_trip() {
        let contacts = [Vec3::new(1.0, 2.0, 3.0), Vec3::new(-1.0, 0.5, 8.0)];
        let buffer = Variant::from_pod_slice(&contacts);
        assert_eq!(buffer.variant_type(), VariantType::Buffer);

        let back: Vec<Vec3> = buffer.to_pod_vec().unwrap();
        assert_eq!(back, contacts);
        assert!(Variant::Buffer(vec![0; 5]).to_pod_vec::<Vec3>().is_none());
    }
}
