use core::ops::{Deref, DerefMut};

use crate::bk_assert;
use crate::bk_panic;
use crate::bkptpanic::BKUnwrap;
use crate::logging::{debug, trace};
use crate::message::{MHMessage, MHMessageId, MHRouter, MHRouterId, MHDeferred};
use crate::state::{MHState, MHStateId, MHStateLinks, MHNext, MHFsmError, MH_MAX_DEPTH};
use crate::state::{check_order, check_topology, parent_of};

//

// how an entry walk ended
enum MHEntry
{
    // on this leaf
    Settled(MHStateId),
    // `active` was entered and asked for `next`
    Redirect {
        next: MHStateId,
        active: MHStateId
    }
}

//

/// Hierarchical state machine
pub struct MHHfsm<'a, C, M>
where M: MHMessage
{
    router_id: MHRouterId,
    states: &'a [&'a dyn MHState<C, M>],
    current: Option<MHStateId>,
    context: C,
    is_processing_state_change: bool
}

impl<'a, C, M> MHHfsm<'a, C, M>
where M: MHMessage
{
    /// Creates a machine without states.
    /// * `router_id` - id on a message bus.
    /// * `context` - data shared by the states' hooks.
    pub fn new(router_id: MHRouterId, context: C) -> MHHfsm<'a, C, M>
    {
        MHHfsm {
            router_id,
            states: &[],
            current: None,
            context,
            is_processing_state_change: false
        }
    }

    /// Sets the state table.
    /// * `states` - every state, the one at index `i` having id `i`. `states[0]` is the initial state.
    /// * Parent and child links must already be set, see `add_child_state`.
    pub fn set_states(&mut self, states: &'a [&'a dyn MHState<C, M>]) -> Result<(), MHFsmError>
    {
        check_order(states)?;
        check_topology(states)?;

        self.states = states;
        self.current = None;

        debug!("hfsm {}: {} states", self.router_id, states.len());
        Ok(())
    }

    fn state(&self, id: MHStateId) -> &'a dyn MHState<C, M>
    {
        bk_assert!((id as usize) < self.states.len(), "state id {} out of range", id);

        self.states[id as usize]
    }

    fn links(&self, id: MHStateId) -> Option<&'a MHStateLinks>
    {
        self.state(id).links()
    }

    fn parent(&self, id: MHStateId) -> Option<MHStateId>
    {
        parent_of(self.states, id)
    }

    fn depth(&self, id: MHStateId) -> usize
    {
        let mut depth = 0;
        let mut cursor = self.parent(id);

        while let Some(p) = cursor {
            depth += 1;
            cursor = self.parent(p);
        }

        depth
    }

    /// Deepest state that is an ancestor of both, or `None` across top-level states.
    pub fn common_ancestor(&self, s1: MHStateId, s2: MHStateId) -> Option<MHStateId>
    {
        let mut d1 = self.depth(s1);
        let mut d2 = self.depth(s2);

        let mut s1 = Some(s1);
        let mut s2 = Some(s2);

        while d1 > d2 {
            s1 = s1.and_then(|s| self.parent(s));
            d1 -= 1;
        }

        while d2 > d1 {
            s2 = s2.and_then(|s| self.parent(s));
            d2 -= 1;
        }

        while s1 != s2 {
            s1 = s1.and_then(|s| self.parent(s));
            s2 = s2.and_then(|s| self.parent(s));
        }

        s1
    }

    // exits from the deepest active state below `origin` up to, not including, `root`
    fn do_exits(&mut self, root: Option<MHStateId>, origin: MHStateId)
    {
        let mut leaf = origin;

        while let Some(child) = self.links(leaf).and_then(|l| l.active_child()) {
            leaf = child;
        }

        let mut cursor = Some(leaf);

        while cursor != root {
            let id = cursor.bk_unwrap();

            trace!("hfsm {}: exit {}", self.router_id, id);

            self.state(id).on_exit_state(&mut self.context);

            if let Some(links) = self.links(id) {
                links.set_active_child(None);
            }

            cursor = self.parent(id);
        }
    }

    fn enter(&mut self, id: MHStateId) -> Option<MHStateId>
    {
        if let Some(p) = self.parent(id) {
            self.links(p).bk_unwrap().set_active_child(Some(id));
        }

        trace!("hfsm {}: enter {}", self.router_id, id);

        match self.state(id).on_enter_state(&mut self.context) {
            MHNext::Goto(next) if next != id => Some(next),
            _ => None
        }
    }

    // enters from below `root` down to `target`, then down the default children
    fn do_enters(&mut self, root: Option<MHStateId>, target: MHStateId, activate_default_children: bool) -> MHEntry
    {
        let mut path = [0; MH_MAX_DEPTH + 1];
        let mut len = 0;
        let mut cursor = Some(target);

        while cursor != root {
            let id = cursor.bk_unwrap();
            path[len] = id;
            len += 1;
            cursor = self.parent(id);
        }

        for &id in path[..len].iter().rev() {
            if let Some(next) = self.enter(id) {
                return MHEntry::Redirect { next, active: id };
            }
        }

        let mut leaf = target;

        if activate_default_children {
            while let Some(child) = self.links(leaf).and_then(|l| l.default_child()) {
                if let Some(next) = self.enter(child) {
                    return MHEntry::Redirect { next, active: child };
                }

                leaf = child;
            }
        }

        MHEntry::Settled(leaf)
    }

    // runs exits and entries until entry settles on a leaf
    fn settle(&mut self, origin: Option<MHStateId>, target: MHStateId)
    {
        let mut origin = origin;
        let mut target = target;

        loop {
            bk_assert!((target as usize) < self.states.len(), "state id {} out of range", target);

            let root = match origin {
                Some(o) => {
                    // a self transition exits and re-enters the state
                    let root = if target == o {
                        self.parent(target)
                    }
                    else {
                        self.common_ancestor(o, target)
                    };

                    self.do_exits(root, o);
                    root
                },
                None => None
            };

            match self.do_enters(root, target, true) {
                MHEntry::Settled(leaf) => {
                    self.current = Some(leaf);
                    break;
                },
                MHEntry::Redirect { next, active } => {
                    trace!("hfsm {}: {} redirects to {}", self.router_id, active, next);

                    self.current = Some(active);
                    origin = Some(active);
                    target = next;
                }
            }
        }
    }

    fn change_scope<'s>(&'s mut self) -> MHChangeScope<'s, 'a, C, M>
    {
        bk_assert!(!self.is_processing_state_change, "hfsm {}: nested state change", self.router_id);

        self.is_processing_state_change = true;

        MHChangeScope {
            hfsm: self
        }
    }

    fn process_state_change(&mut self, origin: MHStateId, next: MHStateId)
    {
        trace!("hfsm {}: {} -> {}", self.router_id, origin, next);

        self.change_scope().settle(Some(origin), next);
    }

    /// Enters the initial state.
    /// * `call_on_enter` - runs the enter hooks of the initial state, its ancestors and its default children,
    ///   following redirects.
    /// * Does nothing if already started.
    pub fn start(&mut self, call_on_enter: bool)
    {
        if self.current.is_some() {
            return;
        }

        bk_assert!(!self.states.is_empty(), "hfsm {} has no states", self.router_id);

        if call_on_enter {
            self.change_scope().settle(None, 0);
        }
        else {
            let mut cursor = 0;

            while let Some(p) = self.parent(cursor) {
                self.links(p).bk_unwrap().set_active_child(Some(cursor));
                cursor = p;
            }

            self.current = Some(0);
        }

        debug!("hfsm {} started in {}", self.router_id, self.state_id());
    }

    /// Returns to not-started.
    /// * `call_on_exit` - runs the exit hooks from the current state up to the top.
    pub fn reset(&mut self, call_on_exit: bool)
    {
        if let Some(id) = self.current {
            if call_on_exit {
                self.change_scope().do_exits(None, id);
            }

            for state in self.states {
                if let Some(links) = state.links() {
                    links.set_active_child(None);
                }
            }

            self.current = None;

            debug!("hfsm {} reset", self.router_id);
        }
    }

    /// Handles a message.
    /// * A state that does not accept the message, or returns `PassToParent`, hands it to its parent.
    ///   The top of the chain calls `on_event_unknown`.
    /// * Panics if not started.
    pub fn receive(&mut self, msg: &M)
    {
        let id = match self.current {
            Some(id) => id,
            None => bk_panic!("hfsm {} not started", self.router_id)
        };

        let msg_id = msg.message_id();
        let mut cursor = id;

        let next = loop {
            let state = self.state(cursor);

            let result = if state.accepts(msg_id) {
                state.on_event(&mut self.context, msg)
            }
            else {
                MHNext::PassToParent
            };

            match result {
                MHNext::PassToParent => {
                    match self.parent(cursor) {
                        Some(p) => cursor = p,
                        None => break state.on_event_unknown(&mut self.context, msg)
                    }
                },
                next => break next
            }
        };

        if let MHNext::Goto(next_id) = next {
            self.process_state_change(id, next_id);
        }
    }

    /// Handles a message, then every message the context deferred meanwhile, in order.
    pub fn receive_all(&mut self, msg: &M)
    where C: MHDeferred<M>
    {
        self.receive(msg);

        while let Some(deferred) = self.context.recall() {
            self.receive(&deferred);
        }
    }

    pub fn is_started(&self) -> bool
    {
        self.current.is_some()
    }

    pub fn is_processing_state_change(&self) -> bool
    {
        self.is_processing_state_change
    }

    /// Current (leaf) state id.
    /// * Panics if not started.
    pub fn state_id(&self) -> MHStateId
    {
        match self.current {
            Some(id) => id,
            None => bk_panic!("hfsm {} not started", self.router_id)
        }
    }

    /// Current (leaf) state.
    /// * Panics if not started.
    pub fn current_state(&self) -> &'a dyn MHState<C, M>
    {
        self.state(self.state_id())
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

impl<C, M> MHRouter<M> for MHHfsm<'_, C, M>
where M: MHMessage
{
    fn router_id(&self) -> MHRouterId
    {
        self.router_id
    }

    fn accepts(&self, id: MHMessageId) -> bool
    {
        MHHfsm::accepts(self, id)
    }

    fn receive(&mut self, msg: &M)
    {
        MHHfsm::receive(self, msg)
    }
}

//

// keeps `is_processing_state_change` up for one transition
struct MHChangeScope<'s, 'a, C, M>
where M: MHMessage
{
    hfsm: &'s mut MHHfsm<'a, C, M>
}

impl<'a, C, M> Deref for MHChangeScope<'_, 'a, C, M>
where M: MHMessage
{
    type Target = MHHfsm<'a, C, M>;

    fn deref(&self) -> &Self::Target
    {
        self.hfsm
    }
}

impl<'a, C, M> DerefMut for MHChangeScope<'_, 'a, C, M>
where M: MHMessage
{
    fn deref_mut(&mut self) -> &mut Self::Target
    {
        self.hfsm
    }
}

impl<C, M> Drop for MHChangeScope<'_, '_, C, M>
where M: MHMessage
{
    fn drop(&mut self)
    {
        self.hfsm.is_processing_state_change = false;
    }
}
