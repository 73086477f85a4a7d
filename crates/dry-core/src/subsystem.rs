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

//! A type-keyed locator for engine subsystems.
//!
//! The [`SubsystemRegistry`] lets code fetch shared subsystems (a resource
//! cache, a physics world, ...) from the [`Context`](crate::context::Context)
//! without the context knowing about any of them.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::rc::Rc;

/// A subsystem registry keyed by [`TypeId`].
///
/// # Example
///
/// ```rust
/// use dry_core::subsystem::SubsystemRegistry;
/// use std::rc::Rc;
///
/// struct Audio { volume: f32 }
///
/// let mut registry = SubsystemRegistry::new();
/// registry.insert(Rc::new(Audio { volume: 0.5 }));
///
/// let audio = registry.get::<Audio>().unwrap();
/// assert_eq!(audio.volume, 0.5);
/// ```
#[derive(Default)]
pub struct SubsystemRegistry {
    subsystems: HashMap<TypeId, Rc<dyn Any>>,
}

impl SubsystemRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            subsystems: HashMap::new(),
        }
    }

    /// Inserts a subsystem, replacing and returning any previous one of the same type.
    pub fn insert<T: 'static>(&mut self, subsystem: Rc<T>) -> Option<Rc<T>> {
        self.subsystems
            .insert(TypeId::of::<T>(), subsystem)
            .and_then(|previous| previous.downcast::<T>().ok())
    }

    /// Returns a shared handle to the subsystem of type `T`.
    #[must_use]
    pub fn get<T: 'static>(&self) -> Option<Rc<T>> {
        self.subsystems
            .get(&TypeId::of::<T>())
            .and_then(|s| Rc::clone(s).downcast::<T>().ok())
    }

    /// Removes and returns the subsystem of type `T`.
    pub fn remove<T: 'static>(&mut self) -> Option<Rc<T>> {
        self.subsystems
            .remove(&TypeId::of::<T>())
            .and_then(|s| s.downcast::<T>().ok())
    }

    /// Returns `true` if a subsystem of type `T` is registered.
    #[must_use]
    pub fn contains<T: 'static>(&self) -> bool {
        self.subsystems.contains_key(&TypeId::of::<T>())
    }

    /// Returns the number of registered subsystems.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subsystems.len()
    }

    /// Returns `true` if no subsystems are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subsystems.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct FakeCache {
        hits: Cell<u32>,
    }

    struct FakePhysics;

    #[test]
    fn test_insert_and_share() {
        let mut registry = SubsystemRegistry::new();
        registry.insert(Rc::new(FakeCache { hits: Cell::new(0) }));

        let a = registry.get::<FakeCache>().unwrap();
        let b = registry.get::<FakeCache>().unwrap();
        a.hits.set(3);
        assert_eq!(b.hits.get(), 3);
    }

    #[test]
    fn test_missing_returns_none() {
        let registry = SubsystemRegistry::new();
        assert!(registry.get::<FakePhysics>().is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_replace_and_remove() {
        let mut registry = SubsystemRegistry::new();
        assert!(registry.insert(Rc::new(FakePhysics)).is_none());
        assert!(registry.insert(Rc::new(FakePhysics)).is_some());
        assert_eq!(registry.len(), 1);

        assert!(registry.remove::<FakePhysics>().is_some());
        assert!(!registry.contains::<FakePhysics>());
    }
}
