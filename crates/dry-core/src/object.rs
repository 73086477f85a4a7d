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

//! The root of the reflective object model.
//!
//! Every reflective type owns an [`ObjectBase`], which ties it to a
//! [`Context`] and gives it an [`ObjectId`] and the event subscription API.
//! The [`Object`] trait exposes that base plus type identity, and is normally
//! implemented with `#[derive(Object)]`.

use crate::context::Context;
use crate::event::{EventContext, SubscriptionId};
use crate::string_hash::StringHash;
use crate::variant::VariantMap;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::num::NonZeroU64;
use std::rc::Rc;

/// A process-unique identifier of a live object.
///
/// Identifiers are handed out by the owning [`Context`] and never reused
/// within it. Event subscriptions and object references use this instead of
/// pointers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ObjectId(NonZeroU64);

impl ObjectId {
    /// The first identifier handed out by a context.
    pub const FIRST: Self = Self(NonZeroU64::MIN);

    /// Wraps a raw identifier. Returns `None` for zero, which means "no object".
    #[inline]
    pub const fn from_raw(raw: u64) -> Option<Self> {
        match NonZeroU64::new(raw) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Returns the identifier following this one.
    #[inline]
    pub(crate) const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Returns the raw identifier.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Static type identity of a reflective type.
///
/// This is implemented by `#[derive(Object)]`, and can also be implemented by
/// hand for abstract base types that only carry attributes.
pub trait ObjectType: 'static {
    /// The registered type name.
    const TYPE_NAME: &'static str;
    /// The logical base type, if any.
    const BASE_TYPE_NAME: Option<&'static str> = None;

    /// Hash of [`TYPE_NAME`](Self::TYPE_NAME).
    #[inline]
    fn static_type_hash() -> StringHash {
        StringHash::new(Self::TYPE_NAME)
    }

    /// Hash of [`BASE_TYPE_NAME`](Self::BASE_TYPE_NAME).
    #[inline]
    fn static_base_type_hash() -> Option<StringHash> {
        Self::BASE_TYPE_NAME.map(StringHash::new)
    }
}

/// Dynamic interface of a live reflective object.
pub trait Object: Any {
    /// Returns the embedded base.
    fn base(&self) -> &ObjectBase;

    /// Returns the registered type name of the concrete type.
    fn type_name(&self) -> &'static str;

    /// Upcasts to `&dyn Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Upcasts to `&mut dyn Any` for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Upcasts a boxed object to `Box<dyn Any>` for downcasting.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    /// Returns the hash of [`type_name`](Object::type_name).
    fn type_hash(&self) -> StringHash {
        StringHash::new(self.type_name())
    }

    /// Returns this object's identifier.
    fn id(&self) -> ObjectId {
        self.base().id()
    }

    /// Returns the owning context.
    fn context(&self) -> &Rc<Context> {
        self.base().context()
    }

    /// Returns `true` if this object's type is `type_hash` or derives from it.
    fn is_instance_of(&self, type_hash: StringHash) -> bool {
        self.context()
            .registry()
            .is_type_of(self.type_hash(), type_hash)
    }
}

/// Per-instance state shared by every reflective object.
///
/// Dropping the base removes every subscription in which the object is the
/// receiver or the sender filter, so handlers never observe a destroyed object.
pub struct ObjectBase {
    id: ObjectId,
    context: Rc<Context>,
}

impl ObjectBase {
    /// Creates a base with a fresh identifier from `context`.
    pub fn new(context: &Rc<Context>) -> Self {
        Self {
            id: context.allocate_object_id(),
            context: Rc::clone(context),
        }
    }

    /// Returns the object identifier.
    #[inline]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Returns the owning context.
    #[inline]
    pub fn context(&self) -> &Rc<Context> {
        &self.context
    }

    /// Subscribes to an event from any sender.
    ///
    /// Subscribing again to the same event replaces the previous handler.
    pub fn subscribe_to_event<F>(&self, event_type: StringHash, handler: F) -> SubscriptionId
    where
        F: FnMut(&mut EventContext<'_>) -> anyhow::Result<()> + 'static,
    {
        self.context
            .events()
            .subscribe(self.id, None, event_type, Box::new(handler))
    }

    /// Subscribes to an event sent by one specific object.
    pub fn subscribe_to_sender_event<F>(
        &self,
        sender: ObjectId,
        event_type: StringHash,
        handler: F,
    ) -> SubscriptionId
    where
        F: FnMut(&mut EventContext<'_>) -> anyhow::Result<()> + 'static,
    {
        self.context
            .events()
            .subscribe(self.id, Some(sender), event_type, Box::new(handler))
    }

    /// Removes the sender-agnostic subscription to `event_type`.
    pub fn unsubscribe_from_event(&self, event_type: StringHash) {
        self.context
            .events()
            .unsubscribe_matching(self.id, event_type, |s| s.sender().is_none());
    }

    /// Removes the subscription to `event_type` from `sender`.
    pub fn unsubscribe_from_sender_event(&self, sender: ObjectId, event_type: StringHash) {
        self.context
            .events()
            .unsubscribe_matching(self.id, event_type, |s| s.sender() == Some(sender));
    }

    /// Removes every subscription filtered on `sender`.
    pub fn unsubscribe_from_sender_events(&self, sender: ObjectId) {
        self.context
            .events()
            .unsubscribe_receiver(self.id, |s| s.sender() == Some(sender));
    }

    /// Removes every subscription of this object.
    pub fn unsubscribe_from_all_events(&self) {
        self.context.events().unsubscribe_receiver(self.id, |_| true);
    }

    /// Removes every subscription of this object except those to `exceptions`.
    pub fn unsubscribe_from_all_events_except(&self, exceptions: &[StringHash]) {
        self.context
            .events()
            .unsubscribe_receiver(self.id, |s| !exceptions.contains(&s.event_type()));
    }

    /// Returns `true` if this object has a sender-agnostic subscription to `event_type`.
    pub fn has_subscribed_to_event(&self, event_type: StringHash) -> bool {
        self.context
            .events()
            .has_subscription(self.id, None, event_type)
    }

    /// Returns `true` if this object is subscribed to `event_type` from `sender`.
    pub fn has_subscribed_to_sender_event(&self, sender: ObjectId, event_type: StringHash) -> bool {
        self.context
            .events()
            .has_subscription(self.id, Some(sender), event_type)
    }

    /// Sends an event with this object as the sender.
    pub fn send_event(&self, event_type: StringHash, data: &mut VariantMap) {
        self.context.send_event(Some(self.id), event_type, data);
    }
}

impl Drop for ObjectBase {
    fn drop(&mut self) {
        self.context.events().remove_object(self.id);
    }
}

impl fmt::Debug for ObjectBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectBase").field("id", &self.id).finish()
    }
}
