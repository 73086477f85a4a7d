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

//! Conversions between Rust values and [`Variant`].

use super::{ResourceRef, ResourceRefList, Variant, VariantMap, VariantType};
use crate::math::{Color, Quaternion, Vec2, Vec3, Vec4};
use crate::object::ObjectId;

/// A Rust type that maps onto exactly one [`VariantType`].
///
/// This is what typed attribute accessors use to move values in and out of
/// a `Variant`.
pub trait VariantValue: Sized {
    /// The variant type this Rust type is stored as.
    const TYPE: VariantType;

    /// Extracts a value, returning `None` on a type mismatch.
    fn from_variant(variant: &Variant) -> Option<Self>;

    /// Wraps this value in a `Variant`.
    fn into_variant(self) -> Variant;
}

macro_rules! impl_variant_value {
    ($ty:ty, $tag:ident) => {
        impl VariantValue for $ty {
            const TYPE: VariantType = VariantType::$tag;

            #[inline]
            fn from_variant(variant: &Variant) -> Option<Self> {
                match variant {
                    Variant::$tag(v) => Some(v.clone()),
                    _ => None,
                }
            }

            #[inline]
            fn into_variant(self) -> Variant {
                Variant::$tag(self)
            }
        }

        impl From<$ty> for Variant {
            #[inline]
            fn from(value: $ty) -> Self {
                Variant::$tag(value)
            }
        }
    };
}

impl_variant_value!(i32, Int);
impl_variant_value!(i64, Int64);
impl_variant_value!(bool, Bool);
impl_variant_value!(f32, Float);
impl_variant_value!(f64, Double);
impl_variant_value!(Vec2, Vector2);
impl_variant_value!(Vec3, Vector3);
impl_variant_value!(Vec4, Vector4);
impl_variant_value!(Quaternion, Quaternion);
impl_variant_value!(Color, Color);
impl_variant_value!(String, String);
impl_variant_value!(Vec<u8>, Buffer);
impl_variant_value!(ResourceRef, ResourceRef);
impl_variant_value!(ResourceRefList, ResourceRefList);
impl_variant_value!(Vec<Variant>, VariantVector);
impl_variant_value!(Vec<String>, StringVector);
impl_variant_value!(VariantMap, VariantMap);
impl_variant_value!(Option<ObjectId>, ObjectRef);

impl From<&str> for Variant {
    fn from(value: &str) -> Self {
        Variant::String(value.to_owned())
    }
}

impl From<ObjectId> for Variant {
    fn from(value: ObjectId) -> Self {
        Variant::ObjectRef(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_extraction() {
        let v = Variant::from(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(v.get::<Vec3>(), Some(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(v.get::<i32>(), None);
        assert_eq!(v.get_or_default::<i32>(), 0);
    }

    #[test]
    fn test_declared_types_match_produced_tags() {
        assert_eq!(7i32.into_variant().variant_type(), i32::TYPE);
        assert_eq!(
            String::from("x").into_variant().variant_type(),
            String::TYPE
        );
        assert_eq!(
            None::<ObjectId>.into_variant().variant_type(),
            <Option<ObjectId>>::TYPE
        );
    }
}
