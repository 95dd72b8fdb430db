use std::cell::{Cell, RefCell};

use minihsm_cortex_m::*;

// simulated time and what each callback saw of it
struct Record
{
    now: Cell<u32>,
    fired: [RefCell<Vec<u32>>; 3]
}

impl Record
{
    fn new() -> Record
    {
        Record {
            now: Cell::new(0),
            fired: [RefCell::new(Vec::new()), RefCell::new(Vec::new()), RefCell::new(Vec::new())]
        }
    }

    fn note(&self, k: usize)
    {
        self.fired[k].borrow_mut().push(self.now.get());
    }

    fn fired(&self, k: usize) -> Vec<u32>
    {
        self.fired[k].borrow().clone()
    }

    fn step(&self, timers: &mut MHTimers<'_>, step: u32)
    {
        self.now.set(self.now.get() + step);
        timers.tick(step);
    }

    fn run_until(&self, timers: &mut MHTimers<'_>, step: u32, limit: u32)
    {
        while self.now.get() <= limit {
            self.step(timers, step);
        }
    }
}

fn three_timers(step: u32, repeating: bool) -> Record
{
    let rec = Record::new();

    let mut cb1 = |_: &mut MHTimers, _: MHTimerId| rec.note(0);
    let mut cb2 = |_: &mut MHTimers, _: MHTimerId| rec.note(1);
    let mut cb3 = |_: &mut MHTimers, _: MHTimerId| rec.note(2);

    let mut mem = MHMemBlk::<[u8; 512]>::new();
    let mut alloc = MHAlloc::new(&mut mem);
    let mut timers: MHTimers = MHTimers::new(&mut alloc, 3);

    let id1 = timers.register(&mut cb1, 37, repeating).unwrap();
    let id2 = timers.register(&mut cb2, 23, repeating).unwrap();
    let id3 = timers.register(&mut cb3, 11, repeating).unwrap();

    assert_eq!((id1, id2, id3), (0, 1, 2));

    timers.start(id1, false).unwrap();
    timers.start(id2, false).unwrap();
    timers.start(id3, false).unwrap();

    timers.enable(true);

    rec.run_until(&mut timers, step, 100);

    drop(timers);
    rec
}

#[test]
fn one_shot()
{
    let rec = three_timers(1, false);

    assert_eq!(rec.fired(0), [37]);
    assert_eq!(rec.fired(1), [23]);
    assert_eq!(rec.fired(2), [11]);
}

#[test]
fn repeating()
{
    let rec = three_timers(1, true);

    assert_eq!(rec.fired(0), [37, 74]);
    assert_eq!(rec.fired(1), [23, 46, 69, 92]);
    assert_eq!(rec.fired(2), [11, 22, 33, 44, 55, 66, 77, 88, 99]);
}

#[test]
fn repeating_bigger_step()
{
    let rec = three_timers(5, true);

    assert_eq!(rec.fired(0), [40, 75]);
    assert_eq!(rec.fired(1), [25, 50, 70, 95]);
    assert_eq!(rec.fired(2), [15, 25, 35, 45, 55, 70, 80, 90, 100]);
}

#[test]
fn repeating_stop_start()
{
    let rec = Record::new();

    let mut cb1 = |_: &mut MHTimers, _: MHTimerId| rec.note(0);
    let mut cb2 = |_: &mut MHTimers, _: MHTimerId| rec.note(1);
    let mut cb3 = |_: &mut MHTimers, _: MHTimerId| rec.note(2);

    let mut mem = MHMemBlk::<[u8; 512]>::new();
    let mut alloc = MHAlloc::new(&mut mem);
    let mut timers: MHTimers = MHTimers::new(&mut alloc, 3);

    let id1 = timers.register(&mut cb1, 37, true).unwrap();
    let id2 = timers.register(&mut cb2, 23, true).unwrap();
    let id3 = timers.register(&mut cb3, 11, true).unwrap();

    timers.start(id2, false).unwrap();
    timers.start(id3, false).unwrap();
    timers.enable(true);

    while rec.now.get() <= 100 {
        if rec.now.get() == 40 {
            timers.start(id1, false).unwrap();
            timers.stop(id2).unwrap();
        }

        if rec.now.get() == 80 {
            timers.stop(id1).unwrap();
            timers.start(id2, false).unwrap();
        }

        rec.step(&mut timers, 1);
    }

    drop(timers);

    assert_eq!(rec.fired(0), [77]);
    assert_eq!(rec.fired(1), [23]);
    assert_eq!(rec.fired(2), [11, 22, 33, 44, 55, 66, 77, 88, 99]);
}

fn timer_starts_timer(step: u32) -> Vec<u32>
{
    let rec = Record::new();

    let mut starter = |t: &mut MHTimers, _: MHTimerId| {
        rec.note(2);
        t.start(2, false).unwrap();
        t.start(1, false).unwrap();
    };
    let mut cb10 = |_: &mut MHTimers, _: MHTimerId| rec.note(2);
    let mut cb22 = |_: &mut MHTimers, _: MHTimerId| rec.note(2);

    let mut mem = MHMemBlk::<[u8; 512]>::new();
    let mut alloc = MHAlloc::new(&mut mem);
    let mut timers: MHTimers = MHTimers::new(&mut alloc, 3);

    let id1 = timers.register(&mut starter, 100, false).unwrap();
    timers.register(&mut cb10, 10, false).unwrap();
    timers.register(&mut cb22, 22, false).unwrap();

    timers.start(id1, false).unwrap();
    timers.enable(true);

    rec.run_until(&mut timers, step, 200);

    drop(timers);
    rec.fired(2)
}

#[test]
fn timer_starts_timer_small_step()
{
    assert_eq!(timer_starts_timer(1), [100, 110, 122]);
}

#[test]
fn timer_starts_timer_big_step()
{
    // the remainder of the firing tick counts toward the timers started by the callback
    assert_eq!(timer_starts_timer(3), [102, 111, 123]);
}

#[test]
fn repeating_register_unregister()
{
    let rec = Record::new();

    let mut cb1 = |_: &mut MHTimers, _: MHTimerId| rec.note(0);
    let mut cb2 = |_: &mut MHTimers, _: MHTimerId| rec.note(1);
    let mut cb3 = |_: &mut MHTimers, _: MHTimerId| rec.note(2);

    let mut mem = MHMemBlk::<[u8; 512]>::new();
    let mut alloc = MHAlloc::new(&mut mem);
    let mut timers: MHTimers = MHTimers::new(&mut alloc, 3);

    let id2 = timers.register(&mut cb2, 23, true).unwrap();
    let id3 = timers.register(&mut cb3, 11, true).unwrap();

    timers.start(id3, false).unwrap();
    timers.start(id2, false).unwrap();
    timers.enable(true);

    let mut cb1 = Some(&mut cb1);

    while rec.now.get() <= 100 {
        if rec.now.get() == 40 {
            timers.unregister(id2).unwrap();
            assert_eq!(timers.registered(), 1);

            let id1 = timers.register(cb1.take().unwrap(), 37, true).unwrap();
            assert_eq!(id1, id2);
            timers.start(id1, false).unwrap();
        }

        rec.step(&mut timers, 1);
    }

    drop(timers);

    assert_eq!(rec.fired(0), [77]);
    assert_eq!(rec.fired(1), [23]);
    assert_eq!(rec.fired(2), [11, 22, 33, 44, 55, 66, 77, 88, 99]);
}

#[test]
fn repeating_clear()
{
    let rec = Record::new();

    let mut cb1 = |_: &mut MHTimers, _: MHTimerId| rec.note(0);
    let mut cb2 = |_: &mut MHTimers, _: MHTimerId| rec.note(1);
    let mut cb3 = |_: &mut MHTimers, _: MHTimerId| rec.note(2);

    let mut mem = MHMemBlk::<[u8; 512]>::new();
    let mut alloc = MHAlloc::new(&mut mem);
    let mut timers: MHTimers = MHTimers::new(&mut alloc, 3);

    let id1 = timers.register(&mut cb1, 37, true).unwrap();
    let id2 = timers.register(&mut cb2, 23, true).unwrap();
    let id3 = timers.register(&mut cb3, 11, true).unwrap();

    timers.start(id1, false).unwrap();
    timers.start(id2, false).unwrap();
    timers.start(id3, false).unwrap();
    timers.enable(true);

    while rec.now.get() <= 100 {
        rec.now.set(rec.now.get() + 1);

        if rec.now.get() == 40 {
            timers.clear();
            assert_eq!(timers.registered(), 0);
            assert_eq!(timers.time_to_next(), None);
        }

        timers.tick(1);
    }

    drop(timers);

    assert_eq!(rec.fired(0), [37]);
    assert_eq!(rec.fired(1), [23]);
    assert_eq!(rec.fired(2), [11, 22, 33]);
}

#[test]
fn delayed_immediate()
{
    let rec = Record::new();

    let mut cb1 = |_: &mut MHTimers, _: MHTimerId| rec.note(0);
    let mut cb2 = |_: &mut MHTimers, _: MHTimerId| rec.note(1);
    let mut cb3 = |_: &mut MHTimers, _: MHTimerId| rec.note(2);

    let mut mem = MHMemBlk::<[u8; 512]>::new();
    let mut alloc = MHAlloc::new(&mut mem);
    let mut timers: MHTimers = MHTimers::new(&mut alloc, 3);

    let id1 = timers.register(&mut cb1, 37, true).unwrap();
    let id2 = timers.register(&mut cb2, 23, true).unwrap();
    let id3 = timers.register(&mut cb3, 11, true).unwrap();

    timers.enable(true);

    rec.now.set(5);
    assert!(timers.tick(5));

    timers.start(id1, true).unwrap();
    timers.start(id2, true).unwrap();
    timers.start(id3, false).unwrap();

    assert_eq!(timers.time_to_next(), Some(0));

    rec.run_until(&mut timers, 1, 100);

    drop(timers);

    assert_eq!(rec.fired(0), [6, 42, 79]);
    assert_eq!(rec.fired(1), [6, 28, 51, 74, 97]);
    assert_eq!(rec.fired(2), [16, 27, 38, 49, 60, 71, 82, 93]);
}

#[test]
fn one_shot_big_step_short_delay_insert()
{
    let rec = Record::new();

    let mut cb1 = |_: &mut MHTimers, _: MHTimerId| rec.note(0);
    let mut cb2 = |_: &mut MHTimers, _: MHTimerId| rec.note(1);

    let mut mem = MHMemBlk::<[u8; 512]>::new();
    let mut alloc = MHAlloc::new(&mut mem);
    let mut timers: MHTimers = MHTimers::new(&mut alloc, 3);

    let id1 = timers.register(&mut cb1, 15, false).unwrap();
    let id2 = timers.register(&mut cb2, 5, true).unwrap();

    timers.start(id1, false).unwrap();
    timers.start(id2, false).unwrap();
    timers.enable(true);

    rec.step(&mut timers, 11);
    rec.step(&mut timers, 11);

    drop(timers);

    assert_eq!(rec.fired(0), [22]);
    assert_eq!(rec.fired(1), [11, 11, 22, 22]);
}

#[test]
fn one_shot_empty_list_huge_tick_before_insert()
{
    let rec = Record::new();

    let mut cb1 = |_: &mut MHTimers, _: MHTimerId| rec.note(0);

    let mut mem = MHMemBlk::<[u8; 512]>::new();
    let mut alloc = MHAlloc::new(&mut mem);
    let mut timers: MHTimers = MHTimers::new(&mut alloc, 3);

    let id1 = timers.register(&mut cb1, 5, false).unwrap();

    timers.start(id1, false).unwrap();
    timers.enable(true);

    for _ in 0..5 {
        rec.step(&mut timers, 1);
    }

    // nothing running; must not wrap anything
    assert!(timers.tick(u32::MAX - 4));

    timers.start(id1, false).unwrap();

    for _ in 0..5 {
        rec.step(&mut timers, 1);
    }

    drop(timers);

    assert_eq!(rec.fired(0), [5, 10]);
}

#[test]
fn too_many_timers()
{
    let mut cb = |_: &mut MHTimers, _: MHTimerId| {};
    let mut cb4 = |_: &mut MHTimers, _: MHTimerId| {};

    let mut mem = MHMemBlk::<[u8; 512]>::new();
    let mut alloc = MHAlloc::new(&mut mem);
    let mut timers: MHTimers = MHTimers::new(&mut alloc, 1);

    assert_eq!(timers.max_timers(), 1);
    assert_eq!(timers.register(&mut cb, 37, false), Ok(0));
    assert_eq!(timers.register(&mut cb4, 11, false), Err(MHTimerError::NoFreeTimer));
}

#[test]
fn too_many_timers_then_clear()
{
    let mut cb1 = |_: &mut MHTimers, _: MHTimerId| {};
    let mut cb2 = |_: &mut MHTimers, _: MHTimerId| {};
    let mut cb3 = |_: &mut MHTimers, _: MHTimerId| {};
    let mut cb4 = |_: &mut MHTimers, _: MHTimerId| {};
    let mut cb5 = |_: &mut MHTimers, _: MHTimerId| {};

    let mut mem = MHMemBlk::<[u8; 512]>::new();
    let mut alloc = MHAlloc::new(&mut mem);
    let mut timers: MHTimers = MHTimers::new(&mut alloc, 3);

    timers.register(&mut cb1, 37, false).unwrap();
    timers.register(&mut cb2, 23, false).unwrap();
    timers.register(&mut cb3, 11, false).unwrap();

    assert_eq!(timers.register(&mut cb4, 11, false), Err(MHTimerError::NoFreeTimer));
    assert_eq!(timers.registered(), 3);

    timers.clear();

    assert_eq!(timers.registered(), 0);
    assert_eq!(timers.register(&mut cb5, 11, false), Ok(0));
}

#[test]
fn drift_free_across_uneven_steps()
{
    const PERIOD: u32 = 11;
    const STEPS: [u32; 5] = [1, 3, 7, 2, 13];

    let rec = Record::new();

    let mut cb = |_: &mut MHTimers, _: MHTimerId| rec.note(0);

    let mut mem = MHMemBlk::<[u8; 512]>::new();
    let mut alloc = MHAlloc::new(&mut mem);
    let mut timers: MHTimers = MHTimers::new(&mut alloc, 1);

    let id = timers.register(&mut cb, PERIOD, true).unwrap();
    timers.start(id, false).unwrap();
    timers.enable(true);

    let mut expected = Vec::new();
    let mut next_deadline = PERIOD;

    for i in 0..200 {
        rec.step(&mut timers, STEPS[i % STEPS.len()]);

        while next_deadline <= rec.now.get() {
            expected.push(rec.now.get());
            next_deadline += PERIOD;
        }

        assert_eq!(timers.time_to_next(), Some(next_deadline - rec.now.get()));
    }

    drop(timers);

    assert_eq!(rec.fired(0), expected);
    assert_eq!(expected.len() as u32, rec.now.get() / PERIOD);
}

#[test]
fn period_and_mode_changes_stop_the_timer()
{
    let rec = Record::new();

    let mut cb = |_: &mut MHTimers, _: MHTimerId| rec.note(0);

    let mut mem = MHMemBlk::<[u8; 512]>::new();
    let mut alloc = MHAlloc::new(&mut mem);
    let mut timers: MHTimers = MHTimers::new(&mut alloc, 1);

    let id = timers.register(&mut cb, 10, true).unwrap();

    // idle timers stay idle
    timers.set_period(id, 20).unwrap();
    timers.set_period(id, 10).unwrap();
    assert!(!timers.is_active(id));

    timers.start(id, false).unwrap();
    timers.enable(true);
    assert!(timers.is_running());

    while rec.now.get() <= 60 {
        if rec.now.get() == 25 {
            timers.set_period(id, 4).unwrap();
            assert!(!timers.is_active(id));
            assert_eq!(timers.time_to_next(), None);

            // an idle stretch before restarting
            rec.step(&mut timers, 1);
            timers.start(id, false).unwrap();
        }

        if rec.now.get() == 34 {
            timers.set_mode(id, false).unwrap();
            assert!(!timers.is_active(id));
            timers.start(id, false).unwrap();
        }

        rec.step(&mut timers, 1);
    }

    assert!(!timers.is_active(id));
    assert_eq!(timers.registered(), 1);
    drop(timers);

    assert_eq!(rec.fired(0), [10, 20, 30, 34, 38]);
}
