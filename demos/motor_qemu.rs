// Runnable on QEMU ARM

#![no_main]
#![no_std]

use core::cell::{Cell, RefCell};

use cortex_m::Peripherals;
use cortex_m::peripheral::syst::SystClkSource;
use cortex_m_rt::entry;
use cortex_m_semihosting::debug;
use cortex_m_semihosting::hprintln;
use panic_semihosting as _;

use minihsm_cortex_m::*;

const START: MHMessageId = 0;
const STOP: MHMessageId = 1;
const TIMEOUT: MHMessageId = 2;
const STOPPED: MHMessageId = 3;

#[derive(Clone, Copy, Debug)]
enum MotorMsg
{
    Start,
    Stop,
    Timeout,
    Stopped
}

impl MHMessage for MotorMsg
{
    fn message_id(&self) -> MHMessageId
    {
        match self {
            MotorMsg::Start => START,
            MotorMsg::Stop => STOP,
            MotorMsg::Timeout => TIMEOUT,
            MotorMsg::Stopped => STOPPED
        }
    }
}

// what the operator timer sends, one per period
const SCRIPT: [MotorMsg; 2] = [MotorMsg::Start, MotorMsg::Stop];

//

const IDLE: MHStateId = 0;
const RUNNING: MHStateId = 1;
const WINDING_UP: MHStateId = 2;
const AT_SPEED: MHStateId = 3;
const WINDING_DOWN: MHStateId = 4;

#[derive(Clone, Copy)]
enum Spin
{
    Up,
    Down
}

#[derive(Default)]
struct Motor
{
    // timer the main loop should start
    arm: Option<Spin>
}

struct Idle;
struct Running(MHStateLinks);
struct WindingUp(MHStateLinks);
struct AtSpeed(MHStateLinks);
struct WindingDown(MHStateLinks);

impl MHState<Motor, MotorMsg> for Idle
{
    fn state_id(&self) -> MHStateId { IDLE }
    fn accepted(&self) -> &[MHMessageId] { &[START] }

    fn on_event(&self, _: &mut Motor, _: &MotorMsg) -> MHNext
    {
        MHNext::Goto(RUNNING)
    }

    fn on_enter_state(&self, _: &mut Motor) -> MHNext
    {
        hprintln!("  idle").unwrap();
        MHNext::Stay
    }
}

impl MHState<Motor, MotorMsg> for Running
{
    fn state_id(&self) -> MHStateId { RUNNING }
    fn accepted(&self) -> &[MHMessageId] { &[STOP] }
    fn links(&self) -> Option<&MHStateLinks> { Some(&self.0) }

    fn on_event(&self, _: &mut Motor, _: &MotorMsg) -> MHNext
    {
        MHNext::Goto(WINDING_DOWN)
    }
}

impl MHState<Motor, MotorMsg> for WindingUp
{
    fn state_id(&self) -> MHStateId { WINDING_UP }
    fn accepted(&self) -> &[MHMessageId] { &[TIMEOUT] }
    fn links(&self) -> Option<&MHStateLinks> { Some(&self.0) }

    fn on_event(&self, _: &mut Motor, _: &MotorMsg) -> MHNext
    {
        MHNext::Goto(AT_SPEED)
    }

    fn on_enter_state(&self, m: &mut Motor) -> MHNext
    {
        hprintln!("  winding up").unwrap();
        m.arm = Some(Spin::Up);
        MHNext::Stay
    }
}

impl MHState<Motor, MotorMsg> for AtSpeed
{
    fn state_id(&self) -> MHStateId { AT_SPEED }
    fn accepted(&self) -> &[MHMessageId] { &[] }
    fn links(&self) -> Option<&MHStateLinks> { Some(&self.0) }

    fn on_event(&self, _: &mut Motor, _: &MotorMsg) -> MHNext
    {
        MHNext::PassToParent
    }

    fn on_enter_state(&self, _: &mut Motor) -> MHNext
    {
        hprintln!("  at speed").unwrap();
        MHNext::Stay
    }
}

impl MHState<Motor, MotorMsg> for WindingDown
{
    fn state_id(&self) -> MHStateId { WINDING_DOWN }
    fn accepted(&self) -> &[MHMessageId] { &[STOP, STOPPED] }
    fn links(&self) -> Option<&MHStateLinks> { Some(&self.0) }

    fn on_event(&self, _: &mut Motor, msg: &MotorMsg) -> MHNext
    {
        match msg {
            MotorMsg::Stopped => MHNext::Goto(IDLE),
            _ => MHNext::Stay
        }
    }

    fn on_enter_state(&self, m: &mut Motor) -> MHNext
    {
        hprintln!("  winding down").unwrap();
        m.arm = Some(Spin::Down);
        MHNext::Stay
    }
}

//

#[entry]
fn main() -> !
{
    let idle = Idle;
    let running = Running(MHStateLinks::new());
    let winding_up = WindingUp(MHStateLinks::new());
    let at_speed = AtSpeed(MHStateLinks::new());
    let winding_down = WindingDown(MHStateLinks::new());

    let states: [&dyn MHState<Motor, MotorMsg>; 5] = [&idle, &running, &winding_up, &at_speed, &winding_down];
    set_child_states(states[RUNNING as usize], &[states[WINDING_UP as usize], states[AT_SPEED as usize], states[WINDING_DOWN as usize]]);

    let mut motor = MHHfsm::new(0/*router id*/, Motor::default());
    motor.set_states(&states).unwrap();

    let mut mem = MHMemBlk::<[u8; 1024]>::new();
    let mut alloc = MHAlloc::new(&mut mem);

    let events = RefCell::new(MHMsgQueue::new(&mut alloc, 4));
    let raise = |msg: MotorMsg| {
        if events.borrow_mut().push(msg).is_err() {
            hprintln!("event {:?} dropped", msg).unwrap();
        }
    };

    let step = Cell::new(0);
    let mut operator = |_: &mut MHTimers, _: MHTimerId| {
        if let Some(&msg) = SCRIPT.get(step.get()) {
            raise(msg);
            step.set(step.get() + 1);
        }
    };
    let mut wound_up = |_: &mut MHTimers, _: MHTimerId| raise(MotorMsg::Timeout);
    let mut wound_down = |_: &mut MHTimers, _: MHTimerId| raise(MotorMsg::Stopped);

    let mut timers: MHTimers = MHTimers::new(&mut alloc, 3);
    let operator_id = timers.register(&mut operator, 10, true).unwrap();
    let wind_up_id = timers.register(&mut wound_up, 3, false).unwrap();
    let wind_down_id = timers.register(&mut wound_down, 5, false).unwrap();

    motor.start(true);
    timers.start(operator_id, false).unwrap();
    timers.enable(true);

    // SysTick settings
    let cmperi = Peripherals::take().unwrap();
    let mut syst = cmperi.SYST;
    syst.set_clock_source(SystClkSource::Core);
    syst.set_reload(100_000);
    syst.clear_current();
    syst.enable_counter();

    hprintln!("motor run").unwrap();

    loop {
        if syst.has_wrapped() {
            timers.tick(1);
        }

        loop {
            let msg = events.borrow_mut().pop();

            let msg = match msg {
                Some(msg) => msg,
                None => break
            };

            hprintln!("{:?}", msg).unwrap();
            motor.receive(&msg);

            match motor.context_mut().arm.take() {
                Some(Spin::Up) => timers.start(wind_up_id, false).unwrap(),
                Some(Spin::Down) => timers.start(wind_down_id, false).unwrap(),
                None => {}
            }
        }

        if step.get() == SCRIPT.len() && motor.state_id() == IDLE {
            hprintln!("motor stopped").unwrap();
            debug::exit(debug::EXIT_SUCCESS);
        }
    }
}
