use crate::bk_assert;
use crate::bk_panic;
use crate::logging::{debug, trace};
use crate::message::{MHMessage, MHMessageId, MHRouter, MHRouterId};
use crate::state::{MHState, MHStateId, MHNext, MHFsmError, check_order};

//

/// Flat state machine
pub struct MHFsm<'a, C, M>
where M: MHMessage
{
    router_id: MHRouterId,
    states: &'a [&'a dyn MHState<C, M>],
    current: Option<MHStateId>,
    context: C
}

impl<'a, C, M> MHFsm<'a, C, M>
where M: MHMessage
{
    /// Creates a machine without states.
    /// * `router_id` - id on a message bus.
    /// * `context` - data shared by the states' hooks.
    pub fn new(router_id: MHRouterId, context: C) -> MHFsm<'a, C, M>
    {
        MHFsm {
            router_id,
            states: &[],
            current: None,
            context
        }
    }

    /// Sets the state table.
    /// * `states` - every state, the one at index `i` having id `i`. `states[0]` is the initial state.
    pub fn set_states(&mut self, states: &'a [&'a dyn MHState<C, M>]) -> Result<(), MHFsmError>
    {
        check_order(states)?;

        self.states = states;
        self.current = None;

        debug!("fsm {}: {} states", self.router_id, states.len());
        Ok(())
    }

    /// Enters the initial state.
    /// * `call_on_enter` - runs its enter hook.
    /// * Does nothing if already started.
    pub fn start(&mut self, call_on_enter: bool)
    {
        if self.current.is_some() {
            return;
        }

        bk_assert!(!self.states.is_empty(), "fsm {} has no states", self.router_id);

        self.current = Some(0);

        if call_on_enter {
            // redirects do not chain on a flat machine
            let _ = self.states[0].on_enter_state(&mut self.context);
        }

        debug!("fsm {} started", self.router_id);
    }

    /// Returns to not-started.
    /// * `call_on_exit` - runs the current state's exit hook.
    pub fn reset(&mut self, call_on_exit: bool)
    {
        if let Some(id) = self.current.take() {
            if call_on_exit {
                self.states[id as usize].on_exit_state(&mut self.context);
            }

            debug!("fsm {} reset", self.router_id);
        }
    }

    /// Handles a message in the current state.
    /// * Panics if not started.
    pub fn receive(&mut self, msg: &M)
    {
        let id = match self.current {
            Some(id) => id,
            None => bk_panic!("fsm {} not started", self.router_id)
        };

        let state = self.states[id as usize];

        let next = if state.accepts(msg.message_id()) {
            match state.on_event(&mut self.context, msg) {
                MHNext::PassToParent => state.on_event_unknown(&mut self.context, msg),
                next => next
            }
        }
        else {
            state.on_event_unknown(&mut self.context, msg)
        };

        if let MHNext::Goto(next_id) = next {
            if next_id != id {
                bk_assert!((next_id as usize) < self.states.len(), "state id {} out of range", next_id);

                trace!("fsm {}: {} -> {}", self.router_id, id, next_id);

                state.on_exit_state(&mut self.context);
                self.current = Some(next_id);
                let _ = self.states[next_id as usize].on_enter_state(&mut self.context);
            }
        }
    }

    pub fn is_started(&self) -> bool
    {
        self.current.is_some()
    }

    /// Current state id.
    /// * Panics if not started.
    pub fn state_id(&self) -> MHStateId
    {
        match self.current {
            Some(id) => id,
            None => bk_panic!("fsm {} not started", self.router_id)
        }
    }

    /// Current state.
    /// * Panics if not started.
    pub fn state(&self) -> &'a dyn MHState<C, M>
    {
        self.states[self.state_id() as usize]
    }

    /// Gets if any state of the table handles messages of this type.
    pub fn accepts(&self, id: MHMessageId) -> bool
    {
        self.states.iter().any(|s| s.accepts(id))
    }

    pub fn context(&self) -> &C
    {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut C
    {
        &mut self.context
    }
}

impl<C, M> MHRouter<M> for MHFsm<'_, C, M>
where M: MHMessage
{
    fn router_id(&self) -> MHRouterId
    {
        self.router_id
    }

    fn accepts(&self, id: MHMessageId) -> bool
    {
        MHFsm::accepts(self, id)
    }

    fn receive(&mut self, msg: &M)
    {
        MHFsm::receive(self, msg)
    }
}
