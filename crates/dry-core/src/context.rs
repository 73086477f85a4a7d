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

//! The execution environment shared by every object.
//!
//! A [`Context`] owns the frozen [`TypeRegistry`], the [`EventBus`] and the
//! subsystem locator. It is created once the registration phase is over and
//! is shared as an `Rc<Context>`; the registry can no longer be mutated
//! from that point on.

use crate::config::ContextConfig;
use crate::event::EventBus;
use crate::object::{Object, ObjectId, ObjectType};
use crate::registry::TypeRegistry;
use crate::serializable::Serializable;
use crate::string_hash::StringHash;
use crate::subsystem::SubsystemRegistry;
use crate::variant::VariantMap;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// The shared execution environment.
pub struct Context {
    registry: TypeRegistry,
    events: EventBus,
    subsystems: RefCell<SubsystemRegistry>,
    config: ContextConfig,
    next_object_id: Cell<ObjectId>,
}

impl Context {
    /// Creates a context with the default configuration.
    pub fn new(registry: TypeRegistry) -> Rc<Self> {
        Self::with_config(registry, ContextConfig::default())
    }

    /// Creates a context with an explicit configuration.
    pub fn with_config(registry: TypeRegistry, config: ContextConfig) -> Rc<Self> {
        log::debug!(
            "Creating context with {} registered types",
            registry.len()
        );
        Rc::new(Self {
            registry,
            events: EventBus::new(),
            subsystems: RefCell::new(SubsystemRegistry::new()),
            config,
            next_object_id: Cell::new(ObjectId::FIRST),
        })
    }

    /// The type registry.
    #[inline]
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// The event bus.
    #[inline]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// The runtime configuration.
    #[inline]
    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub(crate) fn allocate_object_id(&self) -> ObjectId {
        let id = self.next_object_id.get();
        self.next_object_id.set(id.next());
        id
    }

    /// Creates an object of a registered type through its factory.
    ///
    /// Returns `None`, with a warning, if the type is unknown or has no factory.
    pub fn create_object(self: &Rc<Self>, type_hash: StringHash) -> Option<Box<dyn Serializable>> {
        match self.registry.factory(type_hash) {
            Some(factory) => Some(factory(self)),
            None => {
                match self.registry.type_name(type_hash) {
                    Some(name) => log::warn!("Could not create object of type '{name}': no factory registered"),
                    None => log::warn!("Could not create object of unknown type {type_hash}"),
                }
                None
            }
        }
    }

    /// Creates an object by type name.
    pub fn create_object_by_name(self: &Rc<Self>, type_name: &str) -> Option<Box<dyn Serializable>> {
        self.create_object(StringHash::new(type_name))
    }

    /// Creates an object of type `T` through its registered factory.
    pub fn create<T: ObjectType + Serializable>(self: &Rc<Self>) -> Option<Box<T>> {
        let object = self.create_object(T::static_type_hash())?;
        Object::into_any(object).downcast::<T>().ok()
    }

    /// Sends an event to every matching subscriber.
    ///
    /// `sender` is `None` for events that do not originate from an object.
    pub fn send_event(
        self: &Rc<Self>,
        sender: Option<ObjectId>,
        event_type: StringHash,
        data: &mut VariantMap,
    ) {
        self.events.send(self, sender, event_type, data);
    }

    /// Registers a subsystem, replacing any previous one of the same type.
    pub fn register_subsystem<T: 'static>(&self, subsystem: Rc<T>) {
        if self.subsystems.borrow_mut().insert(subsystem).is_some() {
            log::debug!("Replaced subsystem {}", std::any::type_name::<T>());
        }
    }

    /// Returns the subsystem of type `T`.
    pub fn subsystem<T: 'static>(&self) -> Option<Rc<T>> {
        self.subsystems.borrow().get::<T>()
    }

    /// Removes the subsystem of type `T`.
    pub fn remove_subsystem<T: 'static>(&self) -> Option<Rc<T>> {
        self.subsystems.borrow_mut().remove::<T>()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("types", &self.registry.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
