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


//! The public-facing entry point of the Dry object runtime.
//!
//! Bundles the object model of `dry-core` and the scene loading of
//! `dry-scene` behind one [`prelude`], and provides the startup helpers an
//! application needs: logging and a context with every auto-registered type.

pub mod logging;

use anyhow::{Context as _, Result};
use dry_core::config::ContextConfig;
use dry_core::registry::TypeRegistry;
use dry_core::Context;
use std::path::Path;
use std::rc::Rc;

pub use dry_core;
pub use dry_scene;

/// Everything needed to declare, serialize and load objects.
pub mod prelude {
    pub use dry_core::prelude::*;
    pub use dry_scene::{
        BatchErrorPolicy, LoadBatch, SceneError, SceneFile, SceneSerializer, SerializationGoal,
    };
}

/// Creates a context holding every type submitted with `dry_register!`.
pub fn create_context(config: ContextConfig) -> Result<Rc<Context>> {
    let registry =
        TypeRegistry::with_submitted_types().context("failed to register submitted types")?;
    log::info!("Registered {} object types", registry.len());
    Ok(Context::with_config(registry, config))
}

/// Like [`create_context`], with the configuration read from a RON file.
pub fn create_context_from_file(path: impl AsRef<Path>) -> Result<Rc<Context>> {
    let path = path.as_ref();
    let config = ContextConfig::load(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;
    create_context(config)
}
