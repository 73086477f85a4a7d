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


//! # Dry Scene
//!
//! Saving and loading sets of objects as one unit: the two-phase
//! [`LoadBatch`] with object reference resolution, the binary and text scene
//! documents, and the scene file container with its pluggable encodings.

#![warn(missing_docs)]

pub mod batch;
pub mod document;
pub mod error;
pub mod format;
pub mod goal;
pub mod resolver;
pub mod serializer;
pub mod strategy;

pub use batch::{BatchErrorPolicy, LoadBatch};
pub use document::{BinaryDocument, BinaryRecord, SceneDocument};
pub use error::SceneError;
pub use format::{SceneFile, SceneHeader, HEADER_MAGIC_BYTES};
pub use goal::SerializationGoal;
pub use resolver::ObjectResolver;
pub use serializer::SceneSerializer;
pub use strategy::{BinaryStrategy, SceneStrategy, TextStrategy};
