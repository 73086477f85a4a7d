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

//! Small value types that can be stored in a [`Variant`](crate::variant::Variant).
//!
//! These are plain data carriers for attributes and event payloads. They are
//! `#[repr(C)]` and `Pod` so that arrays of them can travel inside a
//! `Variant::Buffer` without a bespoke encoding.

/// A small constant for floating-point comparisons.
pub const EPSILON: f32 = 1e-5;

pub mod color;
pub mod quaternion;
pub mod vector;

pub use self::color::Color;
pub use self::quaternion::Quaternion;
pub use self::vector::{Vec2, Vec3, Vec4};
