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

//! Shorthands for the common attribute registrations.

/// Registers an attribute backed by a struct field.
///
/// `dry_attribute!(registry, Type, "Name", field, default, mode)`
#[macro_export]
macro_rules! dry_attribute {
    ($registry:expr, $ty:ty, $name:expr, $field:ident, $default:expr, $mode:expr) => {
        $registry.register_attribute::<$ty>($crate::registry::AttributeInfo::member::<$ty, _>(
            $name,
            |object: &$ty| &object.$field,
            |object: &mut $ty| &mut object.$field,
            $default,
            $mode,
        ))
    };
}

/// Registers an attribute backed by a getter and a setter method.
///
/// `dry_accessor_attribute!(registry, Type, "Name", getter, setter, default, mode)`
#[macro_export]
macro_rules! dry_accessor_attribute {
    ($registry:expr, $ty:ty, $name:expr, $get:ident, $set:ident, $default:expr, $mode:expr) => {
        $registry.register_attribute::<$ty>($crate::registry::AttributeInfo::accessor::<$ty, _>(
            $name,
            |object: &$ty| object.$get(),
            |object: &mut $ty, value| object.$set(value),
            $default,
            $mode,
        ))
    };
}

/// Registers an `i32` field as an enum attribute named by `names`.
///
/// `dry_enum_attribute!(registry, Type, "Name", field, NAMES, default, mode)`
#[macro_export]
macro_rules! dry_enum_attribute {
    ($registry:expr, $ty:ty, $name:expr, $field:ident, $names:expr, $default:expr, $mode:expr) => {
        $registry.register_attribute::<$ty>($crate::registry::AttributeInfo::enumeration::<$ty>(
            $name,
            |object: &$ty| object.$field,
            |object: &mut $ty, value| object.$field = value,
            $names,
            $default,
            $mode,
        ))
    };
}

/// Submits a registration function to be run by
/// [`TypeRegistry::with_submitted_types`](crate::registry::TypeRegistry::with_submitted_types).
///
/// `dry_register!(register_my_types);` where
/// `fn register_my_types(registry: &mut TypeRegistry) -> Result<(), RegistryError>`.
#[macro_export]
macro_rules! dry_register {
    ($register:path) => {
        $crate::registry::__private::inventory::submit! {
            $crate::registry::TypeRegistration::new($register)
        }
    };
}
