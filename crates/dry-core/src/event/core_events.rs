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

//! Events raised by the object model itself.

crate::dry_event!(
    /// Sent by a serializable object when its temporary flag changes.
    pub E_TEMPORARYCHANGED, TemporaryChanged {
        P_SERIALIZABLE: Serializable,
    }
);

crate::dry_event!(
    /// Sent instead of applying an intercepted network attribute update.
    pub E_INTERCEPTNETWORKUPDATE, InterceptNetworkUpdate {
        P_SERIALIZABLE: Serializable,
        P_TIMESTAMP: TimeStamp,
        P_INDEX: Index,
        P_NAME: Name,
        P_VALUE: Value,
    }
);
