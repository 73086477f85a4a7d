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


//! Intent-driven selection of a scene encoding.

/// What a scene save should optimize for.
///
/// Callers state an intent instead of a format; the
/// [`SceneSerializer`](crate::serializer::SceneSerializer) maps it to a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SerializationGoal {
    /// Prioritizes loading time. Produces the positional binary encoding,
    /// which must be loaded by the same attribute tables that saved it.
    FastestLoad,

    /// Prioritizes size on disk or on the wire. Default values are elided
    /// down to a four-byte marker.
    SmallestFileSize,

    /// Prioritizes readability for debugging and version control. The output
    /// is pretty-printed RON that can be inspected and diffed.
    HumanReadableDebug,

    /// Prioritizes forward compatibility. Attributes are keyed by name, so
    /// records survive attributes being added, removed or reordered.
    LongTermStability,
}
