/*!
This crate for Rust provides hierarchical state machines and software timers for Cortex-M microcontrollers,
with no heap and no global state.

# Target

Any `no_std` target; the fatal-error path parks Cortex-M cores on a breakpoint in release builds.
Host builds run the whole test suite.

# Features

* State machines
  * `MHFsm` dispatches messages to a flat table of states.
  * `MHHfsm` adds parent/child composition.
    * Unhandled messages bubble up to parent states.
    * Transitions exit up to the common ancestor and enter down to the target, then its default children.
    * Enter hooks may redirect the transition.
    * Messages raised inside hooks are deferred and replayed by `receive_all`.
* Timers
  * `MHTimers` fires callbacks from a delta-ordered list, so a `tick` costs only the expired timers.
  * Single-shot and repeating timers, drift-free across any tick step.
  * Callbacks may start, stop, register and unregister timers.
  * `MHMessageTimers` sends a message to a router, or through a bus, instead of calling back.
* Message routing
  * `MHRouter` is implemented by both machines and by `MHMsgBus`, which broadcasts or addresses messages.
* Static memory allocation
  * Timers, queues and buses take their storage from a `MHMemBlk` reserved in advance.

# Examples
## Usage Outline

```no_run
// Build-only example

use minihsm_cortex_m::*;

const OPEN: MHMessageId = 0;
const CLOSE: MHMessageId = 1;

enum Door { Open, Close }

impl MHMessage for Door
{
    fn message_id(&self) -> MHMessageId
    {
        match self {
            Door::Open => OPEN,
            Door::Close => CLOSE
        }
    }
}

struct Closed;
struct Opened;

impl MHState<u32, Door> for Closed
{
    fn state_id(&self) -> MHStateId { 0 }
    fn accepted(&self) -> &[MHMessageId] { &[OPEN] }
    fn on_event(&self, opened: &mut u32, _: &Door) -> MHNext
    {
        *opened += 1;
        MHNext::Goto(1)
    }
}

impl MHState<u32, Door> for Opened
{
    fn state_id(&self) -> MHStateId { 1 }
    fn accepted(&self) -> &[MHMessageId] { &[CLOSE] }
    fn on_event(&self, _: &mut u32, _: &Door) -> MHNext { MHNext::Goto(0) }
}

fn main()
{
    let closed = Closed;
    let opened = Opened;
    let states: [&dyn MHState<u32, Door>; 2] = [&closed, &opened];

    let mut door = MHHfsm::new(0, 0);
    door.set_states(&states).unwrap();
    door.start(true);

    let mut mem = MHMemBlk::<[u8; 256]>::new();
    let mut alloc = MHAlloc::new(&mut mem);

    let mut blink = |_: &mut MHTimers, _: MHTimerId| {
        // other codes...
    };

    let mut timers: MHTimers = MHTimers::new(&mut alloc, 4);
    let id = timers.register(&mut blink, 1000, true).unwrap();
    timers.start(id, false).unwrap();
    timers.enable(true);

    loop {
        // on every SysTick...
        timers.tick(1);

        door.receive(&Door::Open);
        door.receive(&Door::Close);
    }
}
```

## Other Examples

`demos/motor_qemu.rs` runs a motor controller on QEMU ARM.
*/

#![no_std]

mod bkptpanic;
mod logging;

mod memory;
pub use crate::memory::{MHMemBlk, MHAlloc};

mod msgqueue;
pub use crate::msgqueue::MHMsgQueue;

mod message;
pub use crate::message::{MHMessage, MHMessageId, MHRouter, MHRouterId, MHDeferred};
pub use crate::message::{MH_ALL_ROUTERS, MH_MESSAGE_BUS, MH_MAX_ROUTER};

mod msgbus;
pub use crate::msgbus::{MHMsgBus, MHBusError, MHSubscriber};

mod state;
pub use crate::state::{MHState, MHStateId, MHStateLinks, MHNext, MHFsmError, MH_MAX_DEPTH};
pub use crate::state::{add_child_state, set_child_states, clear_child_states, set_default_child};

mod fsm;
pub use crate::fsm::MHFsm;

mod hfsm;
pub use crate::hfsm::MHHfsm;

mod timerlist;
pub use crate::timerlist::{MHTimerId, MH_NO_TIMER};

mod timers;
pub use crate::timers::{MHTimers, MHTimerLock, MHTimerError, MHTimerCallback};

mod msgtimers;
pub use crate::msgtimers::MHMessageTimers;
