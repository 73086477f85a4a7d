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

//! # Dry Core
//!
//! The reflective object model of the Dry engine: hashed type identity, a
//! registry of factories and attribute tables, attribute-driven binary,
//! text and network serialization, and a synchronous event bus.

#![warn(missing_docs)]

// Lets `#[derive(Object)]` refer to `::dry_core` from inside this crate.
extern crate self as dry_core;

pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod math;
pub mod object;
pub mod registry;
pub mod serializable;
pub mod string_hash;
pub mod subsystem;
pub mod variant;

pub use context::Context;
pub use dry_macros::Object;
pub use object::{Object, ObjectBase, ObjectId, ObjectType};
pub use string_hash::StringHash;
pub use variant::{Variant, VariantMap, VariantType};

/// The types and macros needed to declare and use reflective objects.
pub mod prelude {
    pub use crate::config::ContextConfig;
    pub use crate::context::Context;
    pub use crate::error::{AttributeError, LoadError, RegistryError, SaveError};
    pub use crate::event::{EventContext, SubscriptionId};
    pub use crate::object::{Object, ObjectBase, ObjectId, ObjectType};
    pub use crate::registry::{AttributeInfo, AttributeMode, TypeRegistry};
    pub use crate::serializable::{
        LoadMode, ObjectRecord, Serializable, SerializableExt, SerializableState, TextFormat,
    };
    pub use crate::string_hash::StringHash;
    pub use crate::variant::{Variant, VariantMap, VariantType};
    pub use crate::{dry_accessor_attribute, dry_attribute, dry_enum_attribute, dry_event, dry_register};
    pub use dry_macros::Object;
}
