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


//! Errors raised while saving or loading scenes.

use dry_core::error::{LoadError, SaveError};
use std::io;
use thiserror::Error;

/// An error raised by the scene container, a strategy or a load batch.
#[derive(Debug, Error)]
pub enum SceneError {
    /// The container header is malformed or unsupported.
    #[error("invalid scene header: {0}")]
    InvalidHeader(String),
    /// No strategy is registered under the encoding id.
    #[error("no scene strategy registered for encoding '{0}'")]
    StrategyNotFound(String),
    /// Reading or writing the container failed.
    #[error("scene i/o error: {0}")]
    Io(#[from] io::Error),
    /// The payload could not be produced.
    #[error("could not encode scene: {0}")]
    Encode(String),
    /// The payload could not be parsed.
    #[error("could not decode scene: {0}")]
    Decode(String),
    /// An object of the scene could not be saved.
    #[error(transparent)]
    Save(#[from] SaveError),
    /// An object of the scene could not be loaded.
    #[error("object {index} of type '{type_name}' failed to load: {source}")]
    Load {
        /// Position of the record in the document.
        index: usize,
        /// Type of the object being loaded.
        type_name: String,
        /// The underlying error.
        #[source]
        source: LoadError,
    },
}
