use num_integer::Integer;

use crate::bk_assert;
use crate::memory::MHAlloc;
use crate::message::{MHMessage, MHRouter, MHRouterId, MH_ALL_ROUTERS};
use crate::msgbus::MHSubscriber;
use crate::timerlist::{MHTimerTable, MHTimerId};
use crate::timers::MHTimerError;

//

struct MHTimerMessage<M>
{
    msg: M,
    destination: MHRouterId
}

/// Message timer registry driven by `tick`.
/// A fired timer sends its message to the router given at construction, typically a `MHMsgBus`.
pub struct MHMessageTimers<'a, M, K = u32>
where M: MHMessage
{
    table: MHTimerTable<'a, MHTimerMessage<M>, K>,
    router: MHSubscriber<'a, M>,
    enabled: bool
}

impl<'a, M, K> MHMessageTimers<'a, M, K>
where M: MHMessage, K: Integer + Copy
{
    /// Creates a registry.
    /// * `alloc` - memory block allocator the timer records are taken from.
    /// * `router` - receives the messages of every timer; must be a consumer.
    /// * `max_timers` - capacity; must be less than `MH_NO_TIMER`.
    /// * The registry starts disabled; see `enable`.
    pub fn new(alloc: &mut MHAlloc<'a>, router: MHSubscriber<'a, M>, max_timers: MHTimerId) -> MHMessageTimers<'a, M, K>
    {
        bk_assert!(router.is_consumer(), "router {} does not consume messages", router.router_id());

        MHMessageTimers {
            table: MHTimerTable::new(alloc, max_timers),
            router,
            enabled: false
        }
    }

    /// Registers a timer.
    /// * `msg` - sent each time the timer fires.
    /// * `period` - ticks from start to firing, and between firings if `repeating`.
    /// * `destination` - router id the message is addressed to, or `MH_ALL_ROUTERS`.
    /// * Returns the timer id, or `Err(NoFreeTimer)` at capacity.
    pub fn register(&mut self, msg: M, period: K, repeating: bool, destination: MHRouterId) -> Result<MHTimerId, MHTimerError>
    {
        self.table.register(MHTimerMessage { msg, destination }, period, repeating)
    }

    /// Registers a timer broadcasting its message.
    pub fn register_broadcast(&mut self, msg: M, period: K, repeating: bool) -> Result<MHTimerId, MHTimerError>
    {
        self.register(msg, period, repeating, MH_ALL_ROUTERS)
    }

    /// Unregisters a timer, stopping it first if running.
    pub fn unregister(&mut self, id: MHTimerId) -> Result<(), MHTimerError>
    {
        self.table.unregister(id)
    }

    /// Starts a timer, restarting it if already running.
    /// * `immediate` - fires on the next `tick` instead of after one period.
    pub fn start(&mut self, id: MHTimerId, immediate: bool) -> Result<(), MHTimerError>
    {
        self.table.start(id, immediate)
    }

    /// Stops a running timer.
    pub fn stop(&mut self, id: MHTimerId) -> Result<(), MHTimerError>
    {
        self.table.stop(id)
    }

    /// Changes a timer's period and stops it.
    pub fn set_period(&mut self, id: MHTimerId, period: K) -> Result<(), MHTimerError>
    {
        self.table.set_period(id, period)
    }

    /// Changes a timer between single-shot and repeating, and stops it.
    pub fn set_mode(&mut self, id: MHTimerId, repeating: bool) -> Result<(), MHTimerError>
    {
        self.table.set_mode(id, repeating)
    }

    pub fn is_active(&self, id: MHTimerId) -> bool
    {
        self.table.is_active(id)
    }

    /// Stops and unregisters every timer.
    pub fn clear(&mut self)
    {
        self.table.clear();
    }

    pub fn enable(&mut self, state: bool)
    {
        self.enabled = state;
    }

    pub fn is_running(&self) -> bool
    {
        self.enabled
    }

    pub fn registered(&self) -> u8
    {
        self.table.registered()
    }

    pub fn max_timers(&self) -> u8
    {
        self.table.max_timers()
    }

    /// Ticks until the next timer fires, `None` if nothing is running.
    pub fn time_to_next(&self) -> Option<K>
    {
        self.table.time_to_next()
    }

    /// The router messages are sent to, for delivering other messages through it.
    pub fn router_mut(&mut self) -> &mut (dyn MHRouter<M> + 'a)
    {
        &mut *self.router
    }

    /// Advances time, sending the message of each timer that fires.
    /// * `elapsed` - ticks since the last processed call.
    /// * Returns `false` and does nothing if disabled.
    pub fn tick(&mut self, elapsed: K) -> bool
    {
        if !self.enabled {
            return false;
        }

        let MHMessageTimers { table, router, .. } = self;
        let mut count = elapsed;

        while let Some(id) = table.expire(&mut count) {
            if let Some(m) = table.action(id) {
                router.receive_to(m.destination, &m.msg);
            }
        }

        true
    }
}
