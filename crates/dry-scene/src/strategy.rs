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


//! Payload encodings for scene files.
//!
//! The [`SceneStrategy`] trait gives the [`SceneSerializer`](crate::serializer::SceneSerializer)
//! a uniform interface over every payload encoding, so it can pick one by
//! goal when saving and by header id when loading.

use crate::batch::LoadBatch;
use crate::document::{BinaryDocument, SceneDocument};
use crate::error::SceneError;
use dry_core::prelude::*;

/// Encoding id of [`BinaryStrategy`].
pub const BINARY_ENCODING_ID: &str = "DRY_BINARY_V1";
/// Encoding id of [`TextStrategy::ron`].
pub const RON_ENCODING_ID: &str = "DRY_RON_V1";
/// Encoding id of [`TextStrategy::json`].
pub const JSON_ENCODING_ID: &str = "DRY_JSON_V1";

/// A way of encoding a set of objects into a scene payload.
pub trait SceneStrategy: Send + Sync {
    /// The unique, versioned identifier written to the [`SceneHeader`](crate::format::SceneHeader).
    fn encoding_id(&self) -> &'static str;

    /// Encodes every non-temporary object of `objects`.
    fn encode(&self, context: &Context, objects: &[&dyn Serializable]) -> Result<Vec<u8>, SceneError>;

    /// Feeds every record of `payload` to `batch`.
    fn decode(&self, payload: &[u8], batch: &mut LoadBatch) -> Result<(), SceneError>;
}

/// Positional binary records. Fast and compact, but tied to the attribute
/// tables that saved them.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryStrategy;

impl SceneStrategy for BinaryStrategy {
    fn encoding_id(&self) -> &'static str {
        BINARY_ENCODING_ID
    }

    fn encode(&self, _context: &Context, objects: &[&dyn Serializable]) -> Result<Vec<u8>, SceneError> {
        BinaryDocument::from_objects(objects.iter().copied())?.to_bytes()
    }

    fn decode(&self, payload: &[u8], batch: &mut LoadBatch) -> Result<(), SceneError> {
        let document = BinaryDocument::from_bytes(payload)?;
        for record in &document.objects {
            batch.add_binary(record)?;
        }
        Ok(())
    }
}

/// Name-keyed text records in RON or JSON.
#[derive(Debug, Clone, Copy)]
pub struct TextStrategy {
    format: TextFormat,
}

impl TextStrategy {
    /// Records encoded as RON.
    pub fn ron() -> Self {
        Self {
            format: TextFormat::Ron,
        }
    }

    /// Records encoded as JSON.
    pub fn json() -> Self {
        Self {
            format: TextFormat::Json,
        }
    }

    /// The text format in use.
    pub fn format(&self) -> TextFormat {
        self.format
    }
}

impl SceneStrategy for TextStrategy {
    fn encoding_id(&self) -> &'static str {
        match self.format {
            TextFormat::Ron => RON_ENCODING_ID,
            TextFormat::Json => JSON_ENCODING_ID,
        }
    }

    fn encode(&self, context: &Context, objects: &[&dyn Serializable]) -> Result<Vec<u8>, SceneError> {
        let document = SceneDocument::from_objects(objects.iter().copied())?;
        let text = self
            .format
            .encode(&document, context.config().pretty_text)
            .map_err(SceneError::Encode)?;
        Ok(text.into_bytes())
    }

    fn decode(&self, payload: &[u8], batch: &mut LoadBatch) -> Result<(), SceneError> {
        let text = std::str::from_utf8(payload).map_err(|e| SceneError::Decode(e.to_string()))?;
        let document: SceneDocument = self.format.decode(text).map_err(SceneError::Decode)?;
        for record in &document.objects {
            batch.add_record(record)?;
        }
        Ok(())
    }
}
