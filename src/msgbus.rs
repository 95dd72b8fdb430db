use core::fmt;

use crate::bk_assert;
use crate::logging::{debug, warn};
use crate::memory::{MHAlloc, MHRawArray};
use crate::message::{MHMessage, MHMessageId, MHRouter, MHRouterId, MH_ALL_ROUTERS, MH_MESSAGE_BUS, MH_MAX_ROUTER};

//

/// Refused subscription
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MHBusError
{
    /// Every subscriber slot is taken.
    TooManySubscribers,
    /// The router only produces messages.
    NotConsumer
}

impl fmt::Display for MHBusError
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
    {
        let s = match self {
            MHBusError::TooManySubscribers => "too many subscribers",
            MHBusError::NotConsumer => "router is not a consumer"
        };

        f.write_str(s)
    }
}

//

/// Subscriber of a message bus
pub type MHSubscriber<'a, M> = &'a mut (dyn MHRouter<M> + 'a);

/// Message bus.
/// Delivers messages to subscribed routers, kept in router id order; buses subscribed to a bus come last.
pub struct MHMsgBus<'a, M>
where M: MHMessage
{
    subscribers: MHRawArray<'a, Option<MHSubscriber<'a, M>>>,
    size: usize
}

impl<'a, M> MHMsgBus<'a, M>
where M: MHMessage
{
    /// Creates a bus.
    /// * `alloc` - memory block allocator the subscriber slots are taken from.
    /// * `max_subscribers` - capacity.
    pub fn new(alloc: &mut MHAlloc<'a>, max_subscribers: usize) -> MHMsgBus<'a, M>
    {
        MHMsgBus {
            subscribers: alloc.array(max_subscribers, |_| None),
            size: 0
        }
    }

    fn id_at(&self, i: usize) -> MHRouterId
    {
        match self.subscribers.get(i) {
            Some(r) => r.router_id(),
            None => MH_ALL_ROUTERS
        }
    }

    /// Subscribes a router.
    pub fn subscribe(&mut self, router: MHSubscriber<'a, M>) -> Result<(), MHBusError>
    {
        let id = router.router_id();

        if !router.is_consumer() {
            warn!("router {}: {}", id, MHBusError::NotConsumer);
            return Err(MHBusError::NotConsumer);
        }

        if self.size == self.subscribers.len() {
            warn!("router {}: {}", id, MHBusError::TooManySubscribers);
            return Err(MHBusError::TooManySubscribers);
        }

        bk_assert!(id <= MH_MAX_ROUTER || (id == MH_MESSAGE_BUS && router.is_bus()),
                   "router id {} is reserved", id);

        // after every subscriber of the same id
        let mut pos = self.size;
        while pos > 0 && self.id_at(pos - 1) > id {
            self.subscribers.swap(pos - 1, pos);
            pos -= 1;
        }

        self.subscribers.replace(pos, Some(router));
        self.size += 1;

        debug!("router {} subscribed", id);
        Ok(())
    }

    /// Unsubscribes every router of the id.
    /// * `MH_MESSAGE_BUS` unsubscribes every bus, `MH_ALL_ROUTERS` everything.
    pub fn unsubscribe(&mut self, id: MHRouterId)
    {
        if id == MH_ALL_ROUTERS {
            self.clear();
            return;
        }

        let mut kept = 0;

        for i in 0..self.size {
            if self.id_at(i) == id {
                self.subscribers.replace(i, None);
            }
            else {
                self.subscribers.swap(kept, i);
                kept += 1;
            }
        }

        self.size = kept;
    }

    /// Unsubscribes everything.
    pub fn clear(&mut self)
    {
        for i in 0..self.size {
            self.subscribers.replace(i, None);
        }

        self.size = 0;
    }

    /// Number of subscribers.
    pub fn size(&self) -> usize
    {
        self.size
    }

    /// Delivers a message.
    /// * `destination` - router id, or `MH_ALL_ROUTERS` to broadcast.
    /// * Routers get only messages they accept.
    ///   Addressed messages also go on through every subscribed bus.
    pub fn receive_to(&mut self, destination: MHRouterId, msg: &M)
    {
        let msg_id = msg.message_id();

        for i in 0..self.size {
            if let Some(router) = self.subscribers.get_mut(i) {
                if destination == MH_ALL_ROUTERS {
                    if router.accepts(msg_id) {
                        router.receive_to(MH_ALL_ROUTERS, msg);
                    }
                }
                else if router.is_bus() {
                    router.receive_to(destination, msg);
                }
                else if router.router_id() == destination && router.accepts(msg_id) {
                    router.receive(msg);
                }
            }
        }
    }

    /// Broadcasts a message.
    pub fn receive(&mut self, msg: &M)
    {
        self.receive_to(MH_ALL_ROUTERS, msg);
    }

    /// Gets if any subscriber accepts messages of this type.
    pub fn accepts(&self, id: MHMessageId) -> bool
    {
        (0..self.size).any(|i| {
            match self.subscribers.get(i) {
                Some(r) => r.accepts(id),
                None => false
            }
        })
    }
}

impl<'a, M> MHRouter<M> for MHMsgBus<'a, M>
where M: MHMessage
{
    fn router_id(&self) -> MHRouterId
    {
        MH_MESSAGE_BUS
    }

    fn accepts(&self, id: MHMessageId) -> bool
    {
        MHMsgBus::accepts(self, id)
    }

    fn receive(&mut self, msg: &M)
    {
        MHMsgBus::receive(self, msg)
    }

    fn receive_to(&mut self, destination: MHRouterId, msg: &M)
    {
        MHMsgBus::receive_to(self, destination, msg)
    }

    fn is_bus(&self) -> bool
    {
        true
    }
}
