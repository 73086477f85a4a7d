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


//! Two-phase loading of a set of objects.
//!
//! Phase 1 creates every object through the type registry and loads its
//! attributes. The [`ObjectResolver`] then rewrites `OBJECT_ID` attributes
//! from saved ids to the ids of the new objects, and phase 2 calls
//! [`Serializable::apply_attributes`] on every object, so post-load hooks
//! only ever observe a fully loaded batch.

use crate::document::BinaryRecord;
use crate::error::SceneError;
use crate::resolver::ObjectResolver;
use dry_core::prelude::*;
use std::rc::Rc;

/// What a batch does when one of its records fails to load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BatchErrorPolicy {
    /// Stops the batch and returns the error.
    #[default]
    Abort,
    /// Drops the failing object with a warning and keeps loading.
    SkipObject,
}

/// A multi-object load in progress.
pub struct LoadBatch {
    context: Rc<Context>,
    policy: BatchErrorPolicy,
    resolver: ObjectResolver,
    objects: Vec<Box<dyn Serializable>>,
    records_seen: usize,
}

impl LoadBatch {
    /// Starts an empty batch creating objects in `context`.
    pub fn new(context: &Rc<Context>) -> Self {
        Self {
            context: Rc::clone(context),
            policy: BatchErrorPolicy::default(),
            resolver: ObjectResolver::new(),
            objects: Vec::new(),
            records_seen: 0,
        }
    }

    /// Sets the policy applied to records that fail to load.
    pub fn with_policy(mut self, policy: BatchErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Number of objects loaded so far.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether no object was loaded yet.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Creates and loads the object described by a text record.
    ///
    /// Returns `false` if the record was skipped.
    pub fn add_record(&mut self, record: &ObjectRecord) -> Result<bool, SceneError> {
        self.add_object(record.type_hash(), record.id, |object| {
            object.load_record(record, LoadMode::Exact)
        })
    }

    /// Creates and loads the object described by a binary record.
    ///
    /// Returns `false` if the record was skipped.
    pub fn add_binary(&mut self, record: &BinaryRecord) -> Result<bool, SceneError> {
        let Some(type_hash) = record.type_hash() else {
            let index = self.records_seen;
            self.records_seen += 1;
            let message = format!("record {index} is too short to name its type");
            return match self.policy {
                BatchErrorPolicy::Abort => Err(SceneError::Decode(message)),
                BatchErrorPolicy::SkipObject => {
                    log::warn!("Skipping {message}");
                    Ok(false)
                }
            };
        };
        self.add_object(type_hash, record.id, |object| {
            object.load(&mut record.data.as_slice())
        })
    }

    fn add_object(
        &mut self,
        type_hash: StringHash,
        saved_id: Option<ObjectId>,
        load: impl FnOnce(&mut dyn Serializable) -> Result<(), LoadError>,
    ) -> Result<bool, SceneError> {
        let index = self.records_seen;
        self.records_seen += 1;

        let Some(mut object) = self.context.create_object(type_hash) else {
            log::warn!("Skipping record {index}: type {type_hash} cannot be created");
            return Ok(false);
        };

        if let Err(source) = load(object.as_mut()) {
            let type_name = object.type_name().to_owned();
            return match self.policy {
                BatchErrorPolicy::Abort => Err(SceneError::Load {
                    index,
                    type_name,
                    source,
                }),
                BatchErrorPolicy::SkipObject => {
                    log::warn!("Skipping record {index} of type '{type_name}': {source}");
                    Ok(false)
                }
            };
        }

        if let Some(saved) = saved_id {
            self.resolver.add_object(saved, object.id());
        }
        self.objects.push(object);
        Ok(true)
    }

    /// Resolves object references, applies attributes and hands out the
    /// loaded objects in record order.
    pub fn finish(mut self) -> Vec<Box<dyn Serializable>> {
        self.resolver.resolve(&mut self.objects);
        for object in &mut self.objects {
            object.apply_attributes();
        }
        log::debug!(
            "Loaded {} of {} records",
            self.objects.len(),
            self.records_seen
        );
        self.objects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    thread_local! {
        static APPLIED: RefCell<Vec<(String, Option<ObjectId>)>> = const { RefCell::new(Vec::new()) };
    }

    #[derive(Object)]
    struct Node {
        base: ObjectBase,
        state: SerializableState,
        name: String,
        parent: Option<ObjectId>,
    }

    impl Serializable for Node {
        fn serializable_state(&self) -> &SerializableState {
            &self.state
        }
        fn serializable_state_mut(&mut self) -> &mut SerializableState {
            &mut self.state
        }
        fn apply_attributes(&mut self) {
            APPLIED.with(|a| a.borrow_mut().push((self.name.clone(), self.parent)));
        }
    }

    fn new_node(context: &Rc<Context>) -> Node {
        Node {
            base: ObjectBase::new(context),
            state: SerializableState::default(),
            name: String::new(),
            parent: None,
        }
    }

    fn context() -> Rc<Context> {
        let mut registry = TypeRegistry::new();
        registry.register_factory::<Node, _>(new_node).unwrap();
        dry_attribute!(registry, Node, "Name", name, String::new(), AttributeMode::DEFAULT).unwrap();
        dry_attribute!(
            registry,
            Node,
            "Parent",
            parent,
            None::<ObjectId>,
            AttributeMode::DEFAULT | AttributeMode::OBJECT_ID
        )
        .unwrap();
        Context::new(registry)
    }

    fn node<'a>(objects: &'a [Box<dyn Serializable>], index: usize) -> &'a Node {
        objects[index].as_any().downcast_ref::<Node>().unwrap()
    }

    #[test]
    fn test_text_batch_resolves_references() {
        // --- 1. SETUP ---
        let context = context();
        let saved_root = ObjectId::from_raw(500).unwrap();
        let mut root = ObjectRecord::new("Node");
        root.id = Some(saved_root);
        root.push("Name", "root");
        let mut child = ObjectRecord::new("Node");
        child.id = ObjectId::from_raw(501);
        child.push("Name", "child");
        child.push("Parent", saved_root);

        // --- 2. ACTION ---
        // The child references the root saved after it.
        let mut batch = LoadBatch::new(&context);
        assert!(batch.add_record(&child).unwrap());
        assert!(batch.add_record(&root).unwrap());
        let objects = batch.finish();

        // --- 3. ASSERTIONS ---
        assert_eq!(objects.len(), 2);
        assert_eq!(node(&objects, 0).parent, Some(objects[1].id()));
        assert_eq!(node(&objects, 1).parent, None);
    }

    #[test]
    fn test_apply_attributes_runs_after_every_object_is_loaded() {
        let context = context();
        APPLIED.with(|a| a.borrow_mut().clear());
        let saved = ObjectId::from_raw(9).unwrap();
        let mut first = ObjectRecord::new("Node");
        first.push("Name", "first");
        first.push("Parent", saved);
        let mut second = ObjectRecord::new("Node");
        second.id = Some(saved);
        second.push("Name", "second");

        let mut batch = LoadBatch::new(&context);
        batch.add_record(&first).unwrap();
        batch.add_record(&second).unwrap();
        assert!(APPLIED.with(|a| a.borrow().is_empty()));
        let objects = batch.finish();

        // The hook sees the live id of the parent, not the saved one.
        let applied = APPLIED.with(|a| a.borrow().clone());
        assert_eq!(
            applied,
            vec![
                ("first".to_owned(), Some(objects[1].id())),
                ("second".to_owned(), None)
            ]
        );
    }

    #[test]
    fn test_unknown_types_are_skipped() {
        let context = context();
        let mut batch = LoadBatch::new(&context);

        assert!(!batch.add_record(&ObjectRecord::new("Ghost")).unwrap());
        assert!(batch.add_record(&ObjectRecord::new("Node")).unwrap());
        assert_eq!(batch.finish().len(), 1);
    }

    #[test]
    fn test_error_policy() {
        let context = context();
        let mut bad = ObjectRecord::new("Node");
        bad.push("Name", 12);
        let mut good = ObjectRecord::new("Node");
        good.push("Name", "ok");

        // A type mismatch on one attribute is only a warning in text records,
        // so use a truncated binary record to trigger a load failure.
        let mut data = Vec::new();
        new_node(&context).save(&mut data).unwrap();
        data.truncate(6);
        let broken = BinaryRecord { id: None, data };

        let mut batch = LoadBatch::new(&context);
        assert!(matches!(
            batch.add_binary(&broken),
            Err(SceneError::Load { index: 0, .. })
        ));

        let mut batch = LoadBatch::new(&context).with_policy(BatchErrorPolicy::SkipObject);
        assert!(!batch.add_binary(&broken).unwrap());
        assert!(batch.add_record(&bad).unwrap());
        assert!(batch.add_record(&good).unwrap());
        let objects = batch.finish();
        assert_eq!(objects.len(), 2);
        assert_eq!(node(&objects, 1).name, "ok");
    }

    #[test]
    fn test_short_binary_record() {
        let context = context();
        let short = BinaryRecord {
            id: None,
            data: vec![1, 2],
        };
        assert!(matches!(
            LoadBatch::new(&context).add_binary(&short),
            Err(SceneError::Decode(_))
        ));
        let mut batch = LoadBatch::new(&context).with_policy(BatchErrorPolicy::SkipObject);
        assert!(!batch.add_binary(&short).unwrap());
        assert!(batch.is_empty());
    }
}
