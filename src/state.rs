use core::cell::Cell;
use core::fmt;

use crate::bk_assert;
use crate::bkptpanic::BKUnwrap;
use crate::message::{MHMessage, MHMessageId};

//

/// State identifier; equals the state's index in the machine's state table
pub type MHStateId = u8;

/// Deepest parent chain a hierarchical machine accepts.
pub const MH_MAX_DEPTH: usize = 16;

/// What a handler or enter hook asks of the machine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MHNext
{
    /// No state change.
    Stay,
    /// Let the parent state handle the message.
    PassToParent,
    /// Transition to the state.
    Goto(MHStateId)
}

//

/// Setup error of a state table
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MHFsmError
{
    /// The table is empty.
    NoStates,
    /// The state at the index has a different id.
    StateListOrder(usize),
    /// The state's parent or default child links are broken.
    Topology(MHStateId)
}

impl fmt::Display for MHFsmError
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
    {
        match self {
            MHFsmError::NoStates => write!(f, "no states"),
            MHFsmError::StateListOrder(i) => write!(f, "state list order broken at index {}", i),
            MHFsmError::Topology(id) => write!(f, "state {} has a broken hierarchy", id)
        }
    }
}

//

/// Hierarchy links of a state.
/// Held by the state; the machine updates `active_child` while running.
pub struct MHStateLinks
{
    parent: Cell<Option<MHStateId>>,
    default_child: Cell<Option<MHStateId>>,
    active_child: Cell<Option<MHStateId>>
}

impl MHStateLinks
{
    pub const fn new() -> MHStateLinks
    {
        MHStateLinks {
            parent: Cell::new(None),
            default_child: Cell::new(None),
            active_child: Cell::new(None)
        }
    }

    pub fn parent(&self) -> Option<MHStateId>
    {
        self.parent.get()
    }

    pub fn default_child(&self) -> Option<MHStateId>
    {
        self.default_child.get()
    }

    /// Child entered most recently and not exited yet.
    pub fn active_child(&self) -> Option<MHStateId>
    {
        self.active_child.get()
    }

    pub(crate) fn set_active_child(&self, child: Option<MHStateId>)
    {
        self.active_child.set(child);
    }
}

impl Default for MHStateLinks
{
    fn default() -> Self
    {
        MHStateLinks::new()
    }
}

//

/// State of a machine with context `C` receiving messages `M`
pub trait MHState<C, M>
where M: MHMessage
{
    fn state_id(&self) -> MHStateId;

    /// Message ids handled by `on_event`.
    fn accepted(&self) -> &[MHMessageId];

    fn accepts(&self, id: MHMessageId) -> bool
    {
        self.accepted().contains(&id)
    }

    /// Handles a message of an accepted id.
    fn on_event(&self, context: &mut C, msg: &M) -> MHNext;

    /// Handles a message nobody in the chain accepts.
    fn on_event_unknown(&self, _context: &mut C, _msg: &M) -> MHNext
    {
        MHNext::Stay
    }

    /// Called on entry. `Goto` redirects the entry elsewhere.
    fn on_enter_state(&self, _context: &mut C) -> MHNext
    {
        MHNext::Stay
    }

    fn on_exit_state(&self, _context: &mut C)
    {
    }

    /// Hierarchy links; `None` for a state that never has a parent or children.
    fn links(&self) -> Option<&MHStateLinks>
    {
        None
    }
}

fn links_of<'s, C, M>(state: &'s dyn MHState<C, M>) -> &'s MHStateLinks
where M: MHMessage
{
    let links = state.links();
    bk_assert!(links.is_some(), "state {} has no links", state.state_id());

    links.bk_unwrap()
}

/// Makes `child` a child of `parent`.
/// * The first child added becomes the default child.
pub fn add_child_state<C, M>(parent: &dyn MHState<C, M>, child: &dyn MHState<C, M>)
where M: MHMessage
{
    let parent_links = links_of(parent);
    let child_links = links_of(child);

    child_links.parent.set(Some(parent.state_id()));

    if parent_links.default_child().is_none() {
        parent_links.default_child.set(Some(child.state_id()));
    }
}

/// Makes `children` the children of `parent`, the first one being the default.
/// * Children added earlier keep their link to `parent`; detach them with `clear_child_states` before
///   giving `parent` a different set.
pub fn set_child_states<C, M>(parent: &dyn MHState<C, M>, children: &[&dyn MHState<C, M>])
where M: MHMessage
{
    let parent_links = links_of(parent);
    parent_links.default_child.set(None);
    parent_links.active_child.set(None);

    for child in children {
        add_child_state(parent, *child);
    }
}

/// Detaches every state of `states` linked to `parent`, leaving it childless.
pub fn clear_child_states<C, M>(parent: &dyn MHState<C, M>, states: &[&dyn MHState<C, M>])
where M: MHMessage
{
    let parent_id = parent.state_id();
    let parent_links = links_of(parent);

    for state in states {
        if let Some(links) = state.links() {
            if links.parent() == Some(parent_id) {
                links.parent.set(None);
            }
        }
    }

    parent_links.default_child.set(None);
    parent_links.active_child.set(None);
}

/// Chooses which child is entered by default.
pub fn set_default_child<C, M>(parent: &dyn MHState<C, M>, child: &dyn MHState<C, M>)
where M: MHMessage
{
    let parent_links = links_of(parent);
    let child_links = links_of(child);

    bk_assert!(child_links.parent() == Some(parent.state_id()),
               "state {} is not a child of {}", child.state_id(), parent.state_id());

    parent_links.default_child.set(Some(child.state_id()));
}

//

pub(crate) fn parent_of<C, M>(states: &[&dyn MHState<C, M>], id: MHStateId) -> Option<MHStateId>
where M: MHMessage
{
    states[id as usize].links().and_then(|l| l.parent())
}

pub(crate) fn check_order<C, M>(states: &[&dyn MHState<C, M>]) -> Result<(), MHFsmError>
where M: MHMessage
{
    if states.is_empty() {
        return Err(MHFsmError::NoStates);
    }

    for (i, state) in states.iter().enumerate() {
        if state.state_id() as usize != i {
            return Err(MHFsmError::StateListOrder(i));
        }
    }

    Ok(())
}

pub(crate) fn check_topology<C, M>(states: &[&dyn MHState<C, M>]) -> Result<(), MHFsmError>
where M: MHMessage
{
    let n = states.len();

    for state in states {
        let id = state.state_id();

        let links = match state.links() {
            Some(l) => l,
            None => continue
        };

        if let Some(p) = links.parent() {
            if p as usize >= n || states[p as usize].links().is_none() {
                return Err(MHFsmError::Topology(id));
            }
        }

        if let Some(c) = links.default_child() {
            if c as usize >= n || parent_of(states, c) != Some(id) {
                return Err(MHFsmError::Topology(id));
            }
        }

        // acyclic and not too deep
        let mut depth = 0;
        let mut cursor = links.parent();

        while let Some(p) = cursor {
            depth += 1;
            if depth > MH_MAX_DEPTH {
                return Err(MHFsmError::Topology(id));
            }

            cursor = parent_of(states, p);
        }
    }

    Ok(())
}
