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

//! The subscription table and dispatch loop.

use super::EventContext;
use crate::context::Context;
use crate::object::ObjectId;
use crate::string_hash::StringHash;
use crate::variant::VariantMap;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

/// A boxed event handler.
pub type EventHandler = Box<dyn FnMut(&mut EventContext<'_>) -> anyhow::Result<()>>;

/// Identifies one subscription within a [`EventBus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Lifecycle of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// The handler receives matching events.
    Active,
    /// The receiver unsubscribed; removal is pending until dispatch unwinds.
    Unsubscribed,
    /// The receiver or the sender filter was destroyed; removal is pending.
    OwnerDestroyed,
    /// The subscription has been dropped from the table.
    Removed,
}

/// One `(receiver, optional sender, event type)` registration.
pub struct Subscription {
    id: SubscriptionId,
    event_type: StringHash,
    receiver: ObjectId,
    sender: Option<ObjectId>,
    state: Cell<SubscriptionState>,
    handler: RefCell<EventHandler>,
}

impl Subscription {
    /// The subscription identifier.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// The subscribed event type.
    pub fn event_type(&self) -> StringHash {
        self.event_type
    }

    /// The receiving object.
    pub fn receiver(&self) -> ObjectId {
        self.receiver
    }

    /// The sender filter, or `None` to accept any sender.
    pub fn sender(&self) -> Option<ObjectId> {
        self.sender
    }

    /// The current lifecycle state.
    pub fn state(&self) -> SubscriptionState {
        self.state.get()
    }

    #[inline]
    fn is_active(&self) -> bool {
        self.state.get() == SubscriptionState::Active
    }

    #[inline]
    fn accepts(&self, sender: Option<ObjectId>) -> bool {
        self.sender.is_none() || self.sender == sender
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("event_type", &self.event_type)
            .field("receiver", &self.receiver)
            .field("sender", &self.sender)
            .field("state", &self.state.get())
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct BusState {
    /// Per event type, subscriptions in the order they were made.
    subscriptions: HashMap<StringHash, Vec<Rc<Subscription>>>,
    /// Event types in which an object appears as receiver or sender filter.
    involvement: HashMap<ObjectId, HashSet<StringHash>>,
    pending_sweep: bool,
}

/// Restores the dispatch depth when a send unwinds, including by panic.
struct DepthGuard<'a> {
    depth: &'a Cell<usize>,
    previous: usize,
}

impl<'a> DepthGuard<'a> {
    fn enter(depth: &'a Cell<usize>) -> Self {
        let previous = depth.get();
        depth.set(previous + 1);
        Self { depth, previous }
    }
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.depth.set(self.previous);
    }
}

/// The event bus owned by a [`Context`].
///
/// Removing a subscription while any dispatch is in progress only marks it;
/// the table is compacted when the outermost `send` returns. This keeps the
/// indices walked by every active dispatch valid.
#[derive(Default)]
pub struct EventBus {
    state: RefCell<BusState>,
    depth: Cell<usize>,
    next_id: Cell<u64>,
}

impl EventBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` while a handler is running.
    pub fn is_dispatching(&self) -> bool {
        self.depth.get() > 0
    }

    /// Returns the current nesting depth of `send` calls.
    pub fn depth(&self) -> usize {
        self.depth.get()
    }

    /// Number of active subscriptions to `event_type`.
    pub fn subscriber_count(&self, event_type: StringHash) -> usize {
        self.state
            .borrow()
            .subscriptions
            .get(&event_type)
            .map_or(0, |list| list.iter().filter(|s| s.is_active()).count())
    }

    pub(crate) fn subscribe(
        &self,
        receiver: ObjectId,
        sender: Option<ObjectId>,
        event_type: StringHash,
        handler: EventHandler,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        let subscription = Rc::new(Subscription {
            id,
            event_type,
            receiver,
            sender,
            state: Cell::new(SubscriptionState::Active),
            handler: RefCell::new(handler),
        });

        let replaced = {
            let mut guard = self.state.borrow_mut();
            let state = &mut *guard;
            let list = state.subscriptions.entry(event_type).or_default();
            // A re-subscription keeps the receiver's place in the delivery order.
            let replaced = match list
                .iter()
                .position(|s| s.is_active() && s.receiver == receiver && s.sender == sender)
            {
                Some(index) => Some(std::mem::replace(&mut list[index], subscription)),
                None => {
                    list.push(subscription);
                    None
                }
            };

            state.involvement.entry(receiver).or_default().insert(event_type);
            if let Some(sender) = sender {
                state.involvement.entry(sender).or_default().insert(event_type);
            }
            replaced
        };

        // Dropped outside the borrow, as in `sweep`.
        if let Some(old) = replaced {
            old.state.set(SubscriptionState::Removed);
            log::trace!("{receiver} replaced its handler for event {event_type} ({:?})", old.id);
        }

        log::trace!("{receiver} subscribed to event {event_type} ({id:?})");
        self.sweep_if_idle();
        id
    }

    pub(crate) fn unsubscribe_matching(
        &self,
        receiver: ObjectId,
        event_type: StringHash,
        predicate: impl Fn(&Subscription) -> bool,
    ) {
        {
            let mut guard = self.state.borrow_mut();
            let state = &mut *guard;
            if let Some(list) = state.subscriptions.get(&event_type) {
                for s in list
                    .iter()
                    .filter(|s| s.is_active() && s.receiver == receiver && predicate(s))
                {
                    s.state.set(SubscriptionState::Unsubscribed);
                    state.pending_sweep = true;
                }
            }
        }
        self.sweep_if_idle();
    }

    pub(crate) fn unsubscribe_receiver(
        &self,
        receiver: ObjectId,
        predicate: impl Fn(&Subscription) -> bool,
    ) {
        let event_types: Vec<StringHash> = match self.state.borrow().involvement.get(&receiver) {
            Some(types) => types.iter().copied().collect(),
            None => return,
        };
        for event_type in event_types {
            self.unsubscribe_matching(receiver, event_type, &predicate);
        }
    }

    pub(crate) fn cancel(&self, id: SubscriptionId, event_type: StringHash) {
        {
            let mut guard = self.state.borrow_mut();
            let state = &mut *guard;
            if let Some(s) = state
                .subscriptions
                .get(&event_type)
                .and_then(|list| list.iter().find(|s| s.id == id && s.is_active()))
            {
                s.state.set(SubscriptionState::Unsubscribed);
                state.pending_sweep = true;
            }
        }
        self.sweep_if_idle();
    }

    pub(crate) fn has_subscription(
        &self,
        receiver: ObjectId,
        sender: Option<ObjectId>,
        event_type: StringHash,
    ) -> bool {
        self.state
            .borrow()
            .subscriptions
            .get(&event_type)
            .is_some_and(|list| {
                list.iter()
                    .any(|s| s.is_active() && s.receiver == receiver && s.sender == sender)
            })
    }

    /// Detaches a destroyed object from every subscription it takes part in.
    pub(crate) fn remove_object(&self, object: ObjectId) {
        {
            let mut guard = self.state.borrow_mut();
            let state = &mut *guard;
            let Some(event_types) = state.involvement.remove(&object) else {
                return;
            };
            for event_type in event_types {
                let Some(list) = state.subscriptions.get(&event_type) else {
                    continue;
                };
                for s in list.iter().filter(|s| {
                    s.is_active() && (s.receiver == object || s.sender == Some(object))
                }) {
                    s.state.set(SubscriptionState::OwnerDestroyed);
                    state.pending_sweep = true;
                }
            }
        }
        self.sweep_if_idle();
    }

    pub(crate) fn send(
        &self,
        context: &Rc<Context>,
        sender: Option<ObjectId>,
        event_type: StringHash,
        data: &mut VariantMap,
    ) {
        let depth = self.depth.get();
        if depth >= context.config().max_event_depth {
            log::error!(
                "Dropping event {event_type}: nesting depth {depth} reached the configured maximum"
            );
            return;
        }

        // Subscriptions appended while dispatching are not part of this send.
        let count = match self.state.borrow().subscriptions.get(&event_type) {
            Some(list) => list.len(),
            None => return,
        };

        {
            let _guard = DepthGuard::enter(&self.depth);
            for index in 0..count {
                let subscription = {
                    let state = self.state.borrow();
                    match state.subscriptions.get(&event_type).and_then(|l| l.get(index)) {
                        Some(s) => Rc::clone(s),
                        None => break,
                    }
                };
                if subscription.is_active() && subscription.accepts(sender) {
                    Self::invoke(context, &subscription, sender, data);
                }
            }
        }

        if depth == 0 {
            self.sweep();
        }
    }

    fn invoke(
        context: &Rc<Context>,
        subscription: &Subscription,
        sender: Option<ObjectId>,
        data: &mut VariantMap,
    ) {
        let Ok(mut handler) = subscription.handler.try_borrow_mut() else {
            log::warn!(
                "Skipping re-entrant delivery of event {} to {}",
                subscription.event_type,
                subscription.receiver
            );
            return;
        };
        let handler = &mut *handler;
        let mut event = EventContext::new(context, subscription, sender, data);

        let outcome = if context.config().isolate_handler_panics {
            match panic::catch_unwind(AssertUnwindSafe(|| handler(&mut event))) {
                Ok(outcome) => outcome,
                Err(payload) => {
                    log::error!(
                        "Handler for event {} on {} panicked: {}",
                        subscription.event_type,
                        subscription.receiver,
                        panic_message(payload.as_ref())
                    );
                    return;
                }
            }
        } else {
            handler(&mut event)
        };

        if let Err(error) = outcome {
            log::error!(
                "Handler for event {} on {} failed: {error:#}",
                subscription.event_type,
                subscription.receiver
            );
        }
    }

    fn sweep_if_idle(&self) {
        if self.depth.get() == 0 {
            self.sweep();
        }
    }

    fn sweep(&self) {
        let removed = {
            let mut state = self.state.borrow_mut();
            if !state.pending_sweep {
                return;
            }
            state.pending_sweep = false;

            let mut removed = Vec::new();
            state.subscriptions.retain(|_, list| {
                list.retain(|s| {
                    if s.is_active() {
                        true
                    } else {
                        removed.push(Rc::clone(s));
                        false
                    }
                });
                !list.is_empty()
            });
            removed
        };

        // Handlers are dropped outside the borrow: their captures may own
        // objects whose destruction calls back into the bus.
        for s in &removed {
            s.state.set(SubscriptionState::Removed);
        }
        drop(removed);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}
