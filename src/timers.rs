use core::fmt;
use core::ops::{Deref, DerefMut};

use num_integer::Integer;

use crate::memory::MHAlloc;
use crate::timerlist::{MHTimerTable, MHTimerId};

//

/// Timer callback.
/// Receives the registry it is fired from, so it may start, stop or (un)register timers,
/// and the id of the fired timer.
pub type MHTimerCallback<'a, K> = &'a mut (dyn FnMut(&mut MHTimers<'a, K>, MHTimerId) + 'a);

/// Refused timer operation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MHTimerError
{
    /// Every slot is registered.
    NoFreeTimer,
    /// `MH_NO_TIMER` or beyond the capacity.
    InvalidId,
    /// The slot is free.
    NotRegistered,
    /// The timer is not in the running list.
    NotRunning,
    /// A zero period cannot be started.
    ZeroPeriod
}

impl fmt::Display for MHTimerError
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
    {
        let s = match self {
            MHTimerError::NoFreeTimer => "no free timer",
            MHTimerError::InvalidId => "invalid timer id",
            MHTimerError::NotRegistered => "timer not registered",
            MHTimerError::NotRunning => "timer not running",
            MHTimerError::ZeroPeriod => "zero timer period"
        };

        f.write_str(s)
    }
}

//

/// Callback timer registry driven by `tick`
pub struct MHTimers<'a, K = u32>
{
    table: MHTimerTable<'a, MHTimerCallback<'a, K>, K>,
    enabled: bool,
    process_semaphore: u32
}

impl<'a, K> MHTimers<'a, K>
where K: Integer + Copy
{
    /// Creates a registry.
    /// * `alloc` - memory block allocator the timer records are taken from.
    /// * `max_timers` - capacity; must be less than `MH_NO_TIMER`.
    /// * The registry starts disabled; see `enable`.
    pub fn new(alloc: &mut MHAlloc<'a>, max_timers: MHTimerId) -> MHTimers<'a, K>
    {
        MHTimers {
            table: MHTimerTable::new(alloc, max_timers),
            enabled: false,
            process_semaphore: 0
        }
    }

    /// Holds off `tick` until the returned guard is dropped.
    /// Guards nest.
    pub fn lock<'l>(&'l mut self) -> MHTimerLock<'l, 'a, K>
    {
        self.process_semaphore += 1;

        MHTimerLock {
            inner: self
        }
    }

    /// Registers a timer.
    /// * `callback` - called each time the timer fires.
    /// * `period` - ticks from start to firing, and between firings if `repeating`.
    /// * Returns the timer id, or `Err(NoFreeTimer)` at capacity.
    pub fn register(&mut self, callback: MHTimerCallback<'a, K>, period: K, repeating: bool) -> Result<MHTimerId, MHTimerError>
    {
        self.lock().table.register(callback, period, repeating)
    }

    /// Unregisters a timer, stopping it first if running.
    pub fn unregister(&mut self, id: MHTimerId) -> Result<(), MHTimerError>
    {
        self.lock().table.unregister(id)
    }

    /// Starts a timer, restarting it if already running.
    /// * `immediate` - fires on the next `tick` instead of after one period.
    pub fn start(&mut self, id: MHTimerId, immediate: bool) -> Result<(), MHTimerError>
    {
        self.lock().table.start(id, immediate)
    }

    /// Stops a running timer.
    pub fn stop(&mut self, id: MHTimerId) -> Result<(), MHTimerError>
    {
        self.lock().table.stop(id)
    }

    /// Changes a timer's period.
    /// * The timer is stopped; `start` it again to run with the new period.
    pub fn set_period(&mut self, id: MHTimerId, period: K) -> Result<(), MHTimerError>
    {
        self.lock().table.set_period(id, period)
    }

    /// Changes a timer between single-shot and repeating.
    /// * The timer is stopped; `start` it again to run in the new mode.
    pub fn set_mode(&mut self, id: MHTimerId, repeating: bool) -> Result<(), MHTimerError>
    {
        self.lock().table.set_mode(id, repeating)
    }

    /// Gets if a timer is in the running list.
    pub fn is_active(&self, id: MHTimerId) -> bool
    {
        self.table.is_active(id)
    }

    /// Stops and unregisters every timer.
    pub fn clear(&mut self)
    {
        self.lock().table.clear();
    }

    /// Enables or disables `tick`.
    pub fn enable(&mut self, state: bool)
    {
        self.enabled = state;
    }

    /// Gets if `tick` is enabled.
    pub fn is_running(&self) -> bool
    {
        self.enabled
    }

    /// Number of registered timers.
    pub fn registered(&self) -> u8
    {
        self.table.registered()
    }

    /// Capacity.
    pub fn max_timers(&self) -> u8
    {
        self.table.max_timers()
    }

    /// Ticks until the next timer fires.
    /// * Returns `None` if nothing is running.
    pub fn time_to_next(&self) -> Option<K>
    {
        self.table.time_to_next()
    }

    /// Advances time.
    /// * `elapsed` - ticks since the last processed call.
    /// * Returns `false` and does nothing if disabled or locked, which includes calls from inside a callback.
    pub fn tick(&mut self, elapsed: K) -> bool
    {
        if !self.enabled || self.process_semaphore > 0 {
            return false;
        }

        let mut t = self.lock();
        let mut count = elapsed;

        while let Some(id) = t.table.expire(&mut count) {
            // the callback is out of its slot while it runs
            if let Some(callback) = t.table.take_action(id) {
                (*callback)(&mut *t, id);
                t.table.restore_action(id, callback);
            }
        }

        true
    }
}

//

/// Scope wrapper holding off `tick` of a registry
pub struct MHTimerLock<'l, 'a, K>
{
    inner: &'l mut MHTimers<'a, K>
}

impl<'a, K> Deref for MHTimerLock<'_, 'a, K>
{
    type Target = MHTimers<'a, K>;

    fn deref(&self) -> &Self::Target
    {
        self.inner
    }
}

impl<'a, K> DerefMut for MHTimerLock<'_, 'a, K>
{
    fn deref_mut(&mut self) -> &mut Self::Target
    {
        self.inner
    }
}

impl<K> Drop for MHTimerLock<'_, '_, K>
{
    fn drop(&mut self)
    {
        self.inner.process_semaphore -= 1;
    }
}
