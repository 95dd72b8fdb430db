use num_integer::Integer;

use crate::bk_assert;
use crate::bkptpanic::BKUnwrap;
use crate::logging::{debug, warn};
use crate::memory::{MHAlloc, MHRawArray};
use crate::timers::MHTimerError;

//

/// Timer identifier. `MH_NO_TIMER` is never a valid one.
pub type MHTimerId = u8;

/// Reserved identifier meaning "no timer".
pub const MH_NO_TIMER: MHTimerId = MHTimerId::MAX;

//

// `P` is what the timer does when it fires: a callback or a message to send
pub(crate) struct MHTimer<P, K>
{
    pub(crate) action: Option<P>,
    pub(crate) period: K,
    // ticks after the previous list member; `None` while not in the list
    pub(crate) delta: Option<K>,
    pub(crate) registered: bool,
    pub(crate) repeating: bool,
    pub(crate) previous: Option<MHTimerId>,
    pub(crate) next: Option<MHTimerId>
}

impl<P, K> MHTimer<P, K>
where K: Integer + Copy
{
    pub(crate) fn unused() -> MHTimer<P, K>
    {
        MHTimer {
            action: None,
            period: K::zero(),
            delta: None,
            registered: false,
            repeating: false,
            previous: None,
            next: None
        }
    }

    pub(crate) fn is_active(&self) -> bool
    {
        self.delta.is_some()
    }
}

//

/// Running timers ordered by deadline, each one storing the delta to its predecessor.
pub(crate) struct MHDeltaList
{
    head: Option<MHTimerId>,
    tail: Option<MHTimerId>
}

impl MHDeltaList
{
    pub(crate) fn new() -> MHDeltaList
    {
        MHDeltaList {
            head: None,
            tail: None
        }
    }

    #[cfg(test)]
    pub(crate) fn empty(&self) -> bool
    {
        self.head.is_none()
    }

    pub(crate) fn front(&self) -> Option<MHTimerId>
    {
        self.head
    }

    /// Links timer `id` in; its `delta` holds the requested offset from now.
    pub(crate) fn insert<P, K>(&mut self, timers: &mut MHRawArray<MHTimer<P, K>>, id: MHTimerId)
    where K: Integer + Copy
    {
        let mut delta = timers.get(id).delta.bk_unwrap();

        let mut cursor = self.head;

        while let Some(test_id) = cursor {
            let test_delta = timers.get(test_id).delta.bk_unwrap();

            if delta <= test_delta {
                // insert before test_id, which now fires `test_delta - delta` after us
                let previous = timers.get(test_id).previous;

                let test = timers.get_mut(test_id);
                test.previous = Some(id);
                test.delta = Some(test_delta - delta);

                let timer = timers.get_mut(id);
                timer.previous = previous;
                timer.next = Some(test_id);
                timer.delta = Some(delta);

                match previous {
                    Some(p) => timers.get_mut(p).next = Some(id),
                    None => self.head = Some(id)
                }

                return;
            }

            delta = delta - test_delta;
            cursor = timers.get(test_id).next;
        }

        // tag on to the tail
        let timer = timers.get_mut(id);
        timer.previous = self.tail;
        timer.next = None;
        timer.delta = Some(delta);

        match self.tail {
            Some(t) => timers.get_mut(t).next = Some(id),
            None => self.head = Some(id)
        }

        self.tail = Some(id);
    }

    /// Unlinks timer `id`.
    /// A live timer (`has_expired == false`) hands its delta over to its successor.
    pub(crate) fn remove<P, K>(&mut self, timers: &mut MHRawArray<MHTimer<P, K>>, id: MHTimerId, has_expired: bool)
    where K: Integer + Copy
    {
        let (previous, next, delta) = {
            let timer = timers.get(id);
            bk_assert!(timer.is_active(), "timer {} is not in the list", id);

            (timer.previous, timer.next, timer.delta.bk_unwrap())
        };

        match previous {
            Some(p) => timers.get_mut(p).next = next,
            None => self.head = next
        }

        match next {
            Some(n) => timers.get_mut(n).previous = previous,
            None => self.tail = previous
        }

        if !has_expired {
            if let Some(n) = next {
                let succ = timers.get_mut(n);
                succ.delta = Some(succ.delta.bk_unwrap() + delta);
            }
        }

        let timer = timers.get_mut(id);
        timer.previous = None;
        timer.next = None;
        timer.delta = None;
    }

    /// Unlinks everything without compensation.
    pub(crate) fn clear<P, K>(&mut self, timers: &mut MHRawArray<MHTimer<P, K>>)
    where K: Integer + Copy
    {
        let mut cursor = self.head;

        while let Some(id) = cursor {
            let timer = timers.get_mut(id);
            cursor = timer.next;

            timer.previous = None;
            timer.next = None;
            timer.delta = None;
        }

        self.head = None;
        self.tail = None;
    }
}

//

/// Timer slots and the list of running ones, shared by the timer registries.
pub(crate) struct MHTimerTable<'a, P, K>
{
    timers: MHRawArray<'a, MHTimer<P, K>>,
    list: MHDeltaList,
    registered: u8
}

impl<'a, P, K> MHTimerTable<'a, P, K>
where K: Integer + Copy
{
    pub(crate) fn new(alloc: &mut MHAlloc<'a>, max_timers: MHTimerId) -> MHTimerTable<'a, P, K>
    {
        bk_assert!(max_timers < MH_NO_TIMER, "too many timers: {}", max_timers);

        MHTimerTable {
            timers: alloc.array(max_timers as usize, |_| MHTimer::unused()),
            list: MHDeltaList::new(),
            registered: 0
        }
    }

    fn check(&self, id: MHTimerId) -> Result<(), MHTimerError>
    {
        let result = if id == MH_NO_TIMER || (id as usize) >= self.timers.len() {
            Err(MHTimerError::InvalidId)
        }
        else if !self.timers.get(id).registered {
            Err(MHTimerError::NotRegistered)
        }
        else {
            Ok(())
        };

        if let Err(e) = result {
            warn!("timer {}: {}", id, e);
        }

        result
    }

    pub(crate) fn register(&mut self, action: P, period: K, repeating: bool) -> Result<MHTimerId, MHTimerError>
    {
        for i in 0..self.timers.len() {
            let timer = self.timers.get_mut(i);

            if !timer.registered {
                timer.action = Some(action);
                timer.period = period;
                timer.delta = None;
                timer.repeating = repeating;
                timer.registered = true;

                self.registered += 1;

                debug!("timer {} registered", i);
                return Ok(i as MHTimerId);
            }
        }

        warn!("timer registration: {}", MHTimerError::NoFreeTimer);
        Err(MHTimerError::NoFreeTimer)
    }

    pub(crate) fn unregister(&mut self, id: MHTimerId) -> Result<(), MHTimerError>
    {
        self.check(id)?;

        if self.timers.get(id).is_active() {
            self.list.remove(&mut self.timers, id, false);
        }

        self.timers.replace(id, MHTimer::unused());
        self.registered -= 1;

        debug!("timer {} unregistered", id);
        Ok(())
    }

    pub(crate) fn start(&mut self, id: MHTimerId, immediate: bool) -> Result<(), MHTimerError>
    {
        self.check(id)?;

        let period = self.timers.get(id).period;

        if period.is_zero() {
            warn!("timer {}: {}", id, MHTimerError::ZeroPeriod);
            return Err(MHTimerError::ZeroPeriod);
        }

        if self.timers.get(id).is_active() {
            self.list.remove(&mut self.timers, id, false);
        }

        self.timers.get_mut(id).delta = Some(if immediate {K::zero()} else {period});
        self.list.insert(&mut self.timers, id);

        Ok(())
    }

    pub(crate) fn stop(&mut self, id: MHTimerId) -> Result<(), MHTimerError>
    {
        self.check(id)?;

        if !self.timers.get(id).is_active() {
            return Err(MHTimerError::NotRunning);
        }

        self.list.remove(&mut self.timers, id, false);

        Ok(())
    }

    // stops a registered timer, running or not
    fn halt(&mut self, id: MHTimerId) -> Result<(), MHTimerError>
    {
        self.check(id)?;

        if self.timers.get(id).is_active() {
            self.list.remove(&mut self.timers, id, false);
        }

        Ok(())
    }

    pub(crate) fn set_period(&mut self, id: MHTimerId, period: K) -> Result<(), MHTimerError>
    {
        self.halt(id)?;
        self.timers.get_mut(id).period = period;

        Ok(())
    }

    pub(crate) fn set_mode(&mut self, id: MHTimerId, repeating: bool) -> Result<(), MHTimerError>
    {
        self.halt(id)?;
        self.timers.get_mut(id).repeating = repeating;

        Ok(())
    }

    pub(crate) fn is_active(&self, id: MHTimerId) -> bool
    {
        id != MH_NO_TIMER && (id as usize) < self.timers.len() && self.timers.get(id).is_active()
    }

    pub(crate) fn clear(&mut self)
    {
        self.list.clear(&mut self.timers);

        for i in 0..self.timers.len() {
            self.timers.replace(i, MHTimer::unused());
        }

        self.registered = 0;

        debug!("timers cleared");
    }

    pub(crate) fn registered(&self) -> u8
    {
        self.registered
    }

    pub(crate) fn max_timers(&self) -> u8
    {
        self.timers.len() as u8
    }

    pub(crate) fn time_to_next(&self) -> Option<K>
    {
        self.list.front().map(|id| self.timers.get(id).delta.bk_unwrap())
    }

    /// Takes the first timer due within `count` ticks off the list, re-linking it one period on if repeating.
    /// `count` loses the ticks up to that deadline.
    /// When nothing more is due, the rest of `count` is taken off the front timer and `None` is returned.
    pub(crate) fn expire(&mut self, count: &mut K) -> Option<MHTimerId>
    {
        let id = self.list.front()?;
        let delta = self.timers.get(id).delta.bk_unwrap();

        if *count < delta {
            // partial progress toward the next one
            self.timers.get_mut(id).delta = Some(delta - *count);
            *count = K::zero();
            return None;
        }

        *count = *count - delta;

        self.list.remove(&mut self.timers, id, true);

        let timer = self.timers.get_mut(id);
        if timer.repeating {
            timer.delta = Some(timer.period);
            self.list.insert(&mut self.timers, id);
        }

        Some(id)
    }

    pub(crate) fn action(&self, id: MHTimerId) -> Option<&P>
    {
        self.timers.get(id).action.as_ref()
    }

    pub(crate) fn take_action(&mut self, id: MHTimerId) -> Option<P>
    {
        self.timers.get_mut(id).action.take()
    }

    /// Puts an action back unless the slot was unregistered or registered anew meanwhile.
    pub(crate) fn restore_action(&mut self, id: MHTimerId, action: P)
    {
        let timer = self.timers.get_mut(id);

        if timer.registered && timer.action.is_none() {
            timer.action = Some(action);
        }
    }
}
