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

//! 32-bit string hashes used as type, event and parameter identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 32-bit SDBM hash of a string.
///
/// Two different strings may collide; registries that key on a hash detect
/// collisions at registration time by comparing the stored name. Hashing is
/// `const`, so identifiers can be declared as constants:
///
/// ```rust
/// use dry_core::StringHash;
///
/// const E_UPDATE: StringHash = StringHash::new("Update");
/// assert_eq!(E_UPDATE, StringHash::from("Update"));
/// ```
#[derive(
    Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct StringHash(u32);

impl StringHash {
    /// The hash of the empty string.
    pub const ZERO: Self = Self(0);

    /// Hashes a string.
    #[inline]
    pub const fn new(s: &str) -> Self {
        Self(Self::calculate(s.as_bytes(), 0))
    }

    /// Wraps an already computed hash value.
    #[inline]
    pub const fn from_value(value: u32) -> Self {
        Self(value)
    }

    /// Continues an SDBM hash over `bytes`, starting from `hash`.
    pub const fn calculate(bytes: &[u8], mut hash: u32) -> u32 {
        let mut i = 0;
        while i < bytes.len() {
            hash = (bytes[i] as u32)
                .wrapping_add(hash << 6)
                .wrapping_add(hash << 16)
                .wrapping_sub(hash);
            i += 1;
        }
        hash
    }

    /// Returns the raw hash value.
    #[inline]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Returns `true` for the hash of the empty string.
    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for StringHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}", self.0)
    }
}

impl fmt::Debug for StringHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StringHash({:08X})", self.0)
    }
}

impl From<&str> for StringHash {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<&String> for StringHash {
    fn from(s: &String) -> Self {
        Self::new(s)
    }
}
