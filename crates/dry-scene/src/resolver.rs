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


//! Rewrites object references after a batch load.

use dry_core::prelude::*;
use std::collections::HashMap;

/// Maps the ids objects had when saved to the ids of their loaded copies.
#[derive(Debug, Default)]
pub struct ObjectResolver {
    ids: HashMap<ObjectId, ObjectId>,
}

impl ObjectResolver {
    /// Creates an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that the object saved as `saved` was loaded as `live`.
    pub fn add_object(&mut self, saved: ObjectId, live: ObjectId) {
        if let Some(previous) = self.ids.insert(saved, live) {
            log::warn!("Saved id {saved} appears twice in the batch; {previous} is no longer reachable");
        }
    }

    /// The live id of the object saved as `saved`.
    pub fn resolve_id(&self, saved: ObjectId) -> Option<ObjectId> {
        self.ids.get(&saved).copied()
    }

    /// Number of recorded objects.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether no object was recorded.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Forgets every recorded object.
    pub fn reset(&mut self) {
        self.ids.clear();
    }

    /// Rewrites the `OBJECT_ID` attributes of `objects`.
    ///
    /// References to objects outside the batch become null.
    pub fn resolve(&self, objects: &mut [Box<dyn Serializable>]) {
        for object in objects {
            let indices: Vec<usize> = object
                .attributes()
                .iter()
                .enumerate()
                .filter(|(_, a)| a.mode.contains(AttributeMode::OBJECT_ID))
                .map(|(index, _)| index)
                .collect();

            for index in indices {
                let value = match object.get_attribute(index) {
                    Ok(value) => value,
                    Err(error) => {
                        log::error!("Could not read object reference: {error}");
                        continue;
                    }
                };
                let resolved = self.remap(&value, &**object);
                if resolved != value {
                    if let Err(error) = object.set_attribute(index, resolved) {
                        log::debug!("Could not write resolved object reference: {error}");
                    }
                }
            }
        }
    }

    fn remap(&self, value: &Variant, owner: &dyn Serializable) -> Variant {
        match value {
            Variant::ObjectRef(Some(saved)) => {
                let live = self.resolve_id(*saved);
                if live.is_none() {
                    log::warn!(
                        "Could not resolve saved id {saved} referenced by {} {}",
                        owner.type_name(),
                        owner.id()
                    );
                }
                Variant::ObjectRef(live)
            }
            Variant::VariantVector(values) => {
                Variant::VariantVector(values.iter().map(|v| self.remap(v, owner)).collect())
            }
            other => other.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[derive(Object)]
    struct Link {
        base: ObjectBase,
        state: SerializableState,
        target: Option<ObjectId>,
        chain: Vec<Variant>,
    }

    impl Serializable for Link {
        fn serializable_state(&self) -> &SerializableState {
            &self.state
        }
        fn serializable_state_mut(&mut self) -> &mut SerializableState {
            &mut self.state
        }
    }

    fn new_link(context: &Rc<Context>) -> Link {
        Link {
            base: ObjectBase::new(context),
            state: SerializableState::default(),
            target: None,
            chain: Vec::new(),
        }
    }

    fn context() -> Rc<Context> {
        let mut registry = TypeRegistry::new();
        registry.register_factory::<Link, _>(new_link).unwrap();
        dry_attribute!(
            registry,
            Link,
            "Target",
            target,
            None::<ObjectId>,
            AttributeMode::FILE | AttributeMode::OBJECT_ID
        )
        .unwrap();
        dry_attribute!(
            registry,
            Link,
            "Chain",
            chain,
            Vec::<Variant>::new(),
            AttributeMode::FILE | AttributeMode::OBJECT_ID
        )
        .unwrap();
        Context::new(registry)
    }

    fn id(raw: u64) -> ObjectId {
        ObjectId::from_raw(raw).unwrap()
    }

    #[test]
    fn test_resolve_rewrites_references() {
        // --- 1. SETUP ---
        let context = context();
        let mut link = new_link(&context);
        link.target = Some(id(100));
        link.chain = vec![
            Variant::ObjectRef(Some(id(100))),
            Variant::ObjectRef(Some(id(999))),
            Variant::Int(5),
        ];
        let mut objects: Vec<Box<dyn Serializable>> = vec![Box::new(link)];

        let mut resolver = ObjectResolver::new();
        resolver.add_object(id(100), id(3));

        // --- 2. ACTION ---
        resolver.resolve(&mut objects);

        // --- 3. ASSERTIONS ---
        let link = objects[0].as_any().downcast_ref::<Link>().unwrap();
        assert_eq!(link.target, Some(id(3)));
        assert_eq!(
            link.chain,
            vec![Variant::ObjectRef(Some(id(3))), Variant::ObjectRef(None), Variant::Int(5)]
        );
    }

    #[test]
    fn test_unresolved_reference_becomes_null() {
        let context = context();
        let mut link = new_link(&context);
        link.target = Some(id(42));
        let mut objects: Vec<Box<dyn Serializable>> = vec![Box::new(link)];

        ObjectResolver::new().resolve(&mut objects);

        let link = objects[0].as_any().downcast_ref::<Link>().unwrap();
        assert_eq!(link.target, None);
    }

    #[test]
    fn test_bookkeeping() {
        let mut resolver = ObjectResolver::new();
        assert!(resolver.is_empty());
        resolver.add_object(id(1), id(10));
        resolver.add_object(id(2), id(20));
        assert_eq!(resolver.len(), 2);
        assert_eq!(resolver.resolve_id(id(2)), Some(id(20)));
        assert_eq!(resolver.resolve_id(id(3)), None);
        resolver.reset();
        assert!(resolver.is_empty());
    }
}
