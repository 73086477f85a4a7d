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


//! The entry point for saving and loading whole scenes.
//!
//! The [`SceneSerializer`] holds a registry of [`SceneStrategy`] encodings,
//! picks one from a [`SerializationGoal`] when saving, and dispatches a file
//! to the strategy named by its header when loading.

use crate::batch::{BatchErrorPolicy, LoadBatch};
use crate::error::SceneError;
use crate::format::SceneFile;
use crate::goal::SerializationGoal;
use crate::strategy::{
    BinaryStrategy, SceneStrategy, TextStrategy, BINARY_ENCODING_ID, RON_ENCODING_ID,
};
use dry_core::prelude::*;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::rc::Rc;

/// Saves and loads scene files.
pub struct SceneSerializer {
    /// Every available strategy, keyed by its encoding id.
    strategies: HashMap<&'static str, Box<dyn SceneStrategy>>,
}

impl SceneSerializer {
    /// Creates a serializer with the built-in binary, RON and JSON strategies.
    pub fn new() -> Self {
        let mut serializer = Self {
            strategies: HashMap::new(),
        };
        serializer.register_strategy(Box::new(BinaryStrategy));
        serializer.register_strategy(Box::new(TextStrategy::ron()));
        serializer.register_strategy(Box::new(TextStrategy::json()));
        serializer
    }

    /// Adds a strategy, replacing any strategy with the same encoding id.
    pub fn register_strategy(&mut self, strategy: Box<dyn SceneStrategy>) {
        let id = strategy.encoding_id();
        if self.strategies.insert(id, strategy).is_some() {
            log::debug!("Replaced scene strategy '{id}'");
        }
    }

    /// Whether a strategy is registered under `encoding_id`.
    pub fn has_strategy(&self, encoding_id: &str) -> bool {
        self.strategies.contains_key(encoding_id)
    }

    /// The encoding chosen for a goal.
    pub fn encoding_for_goal(goal: SerializationGoal) -> &'static str {
        match goal {
            SerializationGoal::FastestLoad | SerializationGoal::SmallestFileSize => BINARY_ENCODING_ID,
            SerializationGoal::HumanReadableDebug | SerializationGoal::LongTermStability => {
                RON_ENCODING_ID
            }
        }
    }

    fn strategy(&self, encoding_id: &str) -> Result<&dyn SceneStrategy, SceneError> {
        self.strategies
            .get(encoding_id)
            .map(Box::as_ref)
            .ok_or_else(|| SceneError::StrategyNotFound(encoding_id.to_owned()))
    }

    /// Saves `objects` with the encoding best suited to `goal`.
    pub fn save(
        &self,
        context: &Context,
        objects: &[&dyn Serializable],
        goal: SerializationGoal,
    ) -> Result<SceneFile, SceneError> {
        self.save_with(context, objects, Self::encoding_for_goal(goal))
    }

    /// Saves `objects` with an explicit encoding.
    pub fn save_with(
        &self,
        context: &Context,
        objects: &[&dyn Serializable],
        encoding_id: &str,
    ) -> Result<SceneFile, SceneError> {
        let strategy = self.strategy(encoding_id)?;
        let payload = strategy.encode(context, objects)?;
        log::debug!(
            "Encoded {} objects as {encoding_id} ({} bytes)",
            objects.len(),
            payload.len()
        );
        SceneFile::new(strategy.encoding_id(), payload)
    }

    /// Loads every object of `file` as one batch.
    pub fn load(
        &self,
        context: &Rc<Context>,
        file: &SceneFile,
        policy: BatchErrorPolicy,
    ) -> Result<Vec<Box<dyn Serializable>>, SceneError> {
        let strategy = self.strategy(file.header.encoding()?)?;
        let mut batch = LoadBatch::new(context).with_policy(policy);
        strategy.decode(&file.payload, &mut batch)?;
        Ok(batch.finish())
    }

    /// Saves `objects` to a file at `path`.
    pub fn save_to_path(
        &self,
        path: impl AsRef<Path>,
        context: &Context,
        objects: &[&dyn Serializable],
        goal: SerializationGoal,
    ) -> Result<(), SceneError> {
        let file = self.save(context, objects, goal)?;
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        file.write_to(&mut writer)?;
        writer.flush()?;
        log::info!("Saved scene to {}", path.as_ref().display());
        Ok(())
    }

    /// Loads every object of the file at `path`.
    pub fn load_from_path(
        &self,
        path: impl AsRef<Path>,
        context: &Rc<Context>,
        policy: BatchErrorPolicy,
    ) -> Result<Vec<Box<dyn Serializable>>, SceneError> {
        let mut reader = BufReader::new(File::open(path.as_ref())?);
        let file = SceneFile::read_from(&mut reader)?;
        self.load(context, &file, policy)
    }
}

impl Default for SceneSerializer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goals_map_to_encodings() {
        assert_eq!(
            SceneSerializer::encoding_for_goal(SerializationGoal::FastestLoad),
            BINARY_ENCODING_ID
        );
        assert_eq!(
            SceneSerializer::encoding_for_goal(SerializationGoal::SmallestFileSize),
            BINARY_ENCODING_ID
        );
        assert_eq!(
            SceneSerializer::encoding_for_goal(SerializationGoal::HumanReadableDebug),
            RON_ENCODING_ID
        );
        assert_eq!(
            SceneSerializer::encoding_for_goal(SerializationGoal::LongTermStability),
            RON_ENCODING_ID
        );
    }

    #[test]
    fn test_builtin_strategies_are_registered() {
        let serializer = SceneSerializer::default();
        for id in ["DRY_BINARY_V1", "DRY_RON_V1", "DRY_JSON_V1"] {
            assert!(serializer.has_strategy(id), "{id}");
        }
    }

    #[test]
    fn test_unknown_encoding_is_reported() {
        let context = Context::new(TypeRegistry::new());
        let serializer = SceneSerializer::new();

        assert!(matches!(
            serializer.save_with(&context, &[], "DRY_XML_V1"),
            Err(SceneError::StrategyNotFound(id)) if id == "DRY_XML_V1"
        ));

        let file = SceneFile::new("DRY_XML_V1", Vec::new()).unwrap();
        assert!(matches!(
            serializer.load(&context, &file, BatchErrorPolicy::Abort),
            Err(SceneError::StrategyNotFound(_))
        ));
    }
}
