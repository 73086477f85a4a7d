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

//! Synchronous publish/subscribe messaging between objects.
//!
//! Events are identified by a [`StringHash`] and carry a [`VariantMap`] of
//! parameters. Delivery is synchronous and single-threaded: `send_event`
//! returns after every matching handler has run, in subscription order.
//!
//! Handlers may freely subscribe, unsubscribe, send nested events or destroy
//! objects while an event is being dispatched:
//! * a subscription removed during dispatch is never invoked afterwards,
//! * a subscription added during dispatch is first invoked by the next send,
//! * a handler already running is not re-entered by a nested send.

mod bus;
mod core_events;

pub use bus::{EventBus, EventHandler, Subscription, SubscriptionId, SubscriptionState};
pub use core_events::*;

use crate::context::Context;
use crate::object::ObjectId;
use crate::string_hash::StringHash;
use crate::variant::{Variant, VariantMap, VariantValue};
use std::rc::Rc;

/// Declares an event type hash and a module holding its parameter hashes.
///
/// ```rust
/// use dry_core::dry_event;
///
/// dry_event!(
///     /// Sent when a door opens.
///     pub E_DOOROPENED, DoorOpened { P_DOOR: Door, P_SPEED: Speed }
/// );
///
/// assert_eq!(E_DOOROPENED, dry_core::StringHash::new("DoorOpened"));
/// assert_eq!(DoorOpened::P_SPEED, dry_core::StringHash::new("Speed"));
/// ```
#[macro_export]
macro_rules! dry_event {
    (
        $(#[$meta:meta])*
        $vis:vis $const_name:ident, $event_name:ident {
            $($param_const:ident : $param_name:ident),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis const $const_name: $crate::string_hash::StringHash =
            $crate::string_hash::StringHash::new(stringify!($event_name));

        #[doc = concat!("Parameters of the `", stringify!($event_name), "` event.")]
        #[allow(non_snake_case)]
        $vis mod $event_name {
            $(
                #[doc = concat!("Parameter `", stringify!($param_name), "`.")]
                pub const $param_const: $crate::string_hash::StringHash =
                    $crate::string_hash::StringHash::new(stringify!($param_name));
            )*
        }
    };
}

/// The view of an event handed to a handler.
pub struct EventContext<'a> {
    context: &'a Rc<Context>,
    event_type: StringHash,
    sender: Option<ObjectId>,
    receiver: ObjectId,
    subscription: SubscriptionId,
    data: &'a mut VariantMap,
}

impl<'a> EventContext<'a> {
    pub(crate) fn new(
        context: &'a Rc<Context>,
        subscription: &Subscription,
        sender: Option<ObjectId>,
        data: &'a mut VariantMap,
    ) -> Self {
        Self {
            context,
            event_type: subscription.event_type(),
            sender,
            receiver: subscription.receiver(),
            subscription: subscription.id(),
            data,
        }
    }

    /// The event being delivered.
    pub fn event_type(&self) -> StringHash {
        self.event_type
    }

    /// The object that sent the event, or `None` for a context-level send.
    pub fn sender(&self) -> Option<ObjectId> {
        self.sender
    }

    /// The subscribed object receiving the event.
    pub fn receiver(&self) -> ObjectId {
        self.receiver
    }

    /// The context the event is dispatched in.
    pub fn context(&self) -> &Rc<Context> {
        self.context
    }

    /// The event parameters.
    pub fn data(&self) -> &VariantMap {
        &*self.data
    }

    /// Mutable event parameters. Changes are visible to later handlers and to the sender.
    pub fn data_mut(&mut self) -> &mut VariantMap {
        &mut *self.data
    }

    /// Reads a typed parameter.
    pub fn param<T: VariantValue>(&self, key: StringHash) -> Option<T> {
        self.data.get(&key).and_then(T::from_variant)
    }

    /// Writes a parameter.
    pub fn set_param(&mut self, key: StringHash, value: impl Into<Variant>) {
        self.data.insert(key, value.into());
    }

    /// Removes the subscription currently being invoked.
    pub fn unsubscribe(&self) {
        self.context
            .events()
            .cancel(self.subscription, self.event_type);
    }

    /// Sends a nested event with the receiver as the sender.
    pub fn send_event(&self, event_type: StringHash, data: &mut VariantMap) {
        self.context.send_event(Some(self.receiver), event_type, data);
    }
}
