use std::{cell::RefCell, rc::Rc};

use dsim::{
    ConditionValue, Distributions, Event, ProcessHandle, SimulationBuilder, SimulationError,
    Store, Suspend, VirtualTime, now, random_time, timeout,
};

type Log<T> = Rc<RefCell<Vec<T>>>;

struct Sleeper {
    name: &'static str,
    delay: VirtualTime,
    started: bool,
    log: Log<(&'static str, VirtualTime)>,
}

impl ProcessHandle for Sleeper {
    fn resume(&mut self, _fired: &Event) -> Suspend {
        if !self.started {
            self.started = true;
            return Suspend::On(timeout(self.delay));
        }
        self.log.borrow_mut().push((self.name, now()));
        Suspend::Exit
    }
}

#[test]
fn timeouts_fire_in_time_order_with_fifo_ties() {
    let log: Log<(&'static str, VirtualTime)> = Rc::default();
    let mut sim = SimulationBuilder::default().build();
    for (name, delay) in [("a", 5.0), ("b", 2.0), ("c", 3.0), ("d", 3.0)] {
        sim.spawn(
            name,
            Sleeper {
                name,
                delay: VirtualTime(delay),
                started: false,
                log: log.clone(),
            },
        );
    }

    sim.run_until(VirtualTime(5.0)).unwrap();

    assert_eq!(
        *log.borrow(),
        vec![
            ("b", VirtualTime(2.0)),
            ("c", VirtualTime(3.0)),
            ("d", VirtualTime(3.0)),
            ("a", VirtualTime(5.0)),
        ]
    );
    assert_eq!(sim.now(), VirtualTime(5.0));
    assert_eq!(sim.process_count(), 4);
}

#[derive(Default)]
struct Racer {
    stage: usize,
    short: Option<Event>,
    long: Option<Event>,
    log: Log<(usize, VirtualTime)>,
}

impl ProcessHandle for Racer {
    fn resume(&mut self, fired: &Event) -> Suspend {
        self.log.borrow_mut().push((self.stage, now()));
        self.stage += 1;
        match self.stage {
            1 => {
                let short = timeout(VirtualTime(3.0));
                let long = timeout(VirtualTime(7.0));
                self.short = Some(short.clone());
                self.long = Some(long.clone());
                Suspend::On(Event::any_of(&[short, long]))
            }
            2 => {
                let (Some(short), Some(long)) = (&self.short, &self.long) else {
                    unreachable!()
                };
                let value = fired.value::<ConditionValue>().unwrap();
                assert!(value.contains(short));
                assert!(!value.contains(long));
                assert!(short.is_processed());
                assert!(!long.is_triggered());
                // Already processed: resumes again without advancing time.
                Suspend::On(short.clone())
            }
            // The losing branch is still pending and can be waited on again.
            3 => Suspend::On(self.long.clone().unwrap()),
            4 => Suspend::On(Event::all_of(&[
                timeout(VirtualTime(1.0)),
                timeout(VirtualTime(4.0)),
            ])),
            _ => Suspend::Exit,
        }
    }
}

#[test]
fn any_of_and_all_of_conditions() {
    let log: Log<(usize, VirtualTime)> = Rc::default();
    let mut sim = SimulationBuilder::default().build();
    sim.spawn(
        "racer",
        Racer {
            log: log.clone(),
            ..Default::default()
        },
    );

    sim.run_until(VirtualTime(11.0)).unwrap();

    assert_eq!(
        *log.borrow(),
        vec![
            (0, VirtualTime(0.0)),
            (1, VirtualTime(3.0)),
            (2, VirtualTime(3.0)),
            (3, VirtualTime(7.0)),
            (4, VirtualTime(11.0)),
        ]
    );
}

#[test]
fn unheld_condition_still_wakes_its_waiter() {
    let wakes: Log<(VirtualTime, usize)> = Rc::default();
    let mut sim = SimulationBuilder::default().build();
    {
        let wakes = wakes.clone();
        let mut waited = false;
        sim.spawn("racer", move |fired: &Event| {
            if waited {
                let fired = fired.value::<ConditionValue>().unwrap();
                wakes.borrow_mut().push((now(), fired.events().len()));
                return Suspend::Exit;
            }
            waited = true;
            Suspend::On(Event::any_of(&[
                timeout(VirtualTime(3.0)),
                timeout(VirtualTime(9.0)),
            ]))
        });
    }
    sim.spawn("ticker", |_: &Event| Suspend::On(timeout(VirtualTime(1.0))));

    sim.run_until(VirtualTime(20.0)).unwrap();

    assert_eq!(*wakes.borrow(), vec![(VirtualTime(3.0), 1)]);
}

#[test]
fn waiting_on_nothing_ends_prematurely() {
    let mut sim = SimulationBuilder::default().build();
    let never = Event::new();
    sim.spawn("stuck", move |_: &Event| Suspend::On(never.clone()));

    let err = sim.run_until(VirtualTime(10.0)).unwrap_err();
    assert_eq!(
        err,
        SimulationError::EndedPrematurely {
            now: VirtualTime::ZERO,
            horizon: VirtualTime(10.0),
        }
    );
}

#[test]
fn negative_delay_is_reported() {
    let mut sim = SimulationBuilder::default().build();
    let mut first = true;
    sim.spawn("time-traveller", move |_: &Event| {
        if first {
            first = false;
            Suspend::On(timeout(VirtualTime(5.0)))
        } else {
            Suspend::On(timeout(VirtualTime(-1.0)))
        }
    });

    let err = sim.run_until(VirtualTime(10.0)).unwrap_err();
    assert_eq!(
        err,
        SimulationError::TimeWentBackwards {
            present: VirtualTime(5.0),
            future: VirtualTime(4.0),
        }
    );
}

fn random_walkers(seed: u64) -> Vec<VirtualTime> {
    let log: Log<VirtualTime> = Rc::default();
    let mut sim = SimulationBuilder::default().seed(seed).build();
    for walker in 0..4 {
        let log = log.clone();
        sim.spawn(&format!("walker-{walker}"), move |_: &Event| {
            log.borrow_mut().push(now());
            Suspend::On(timeout(random_time(Distributions::Exponential(
                VirtualTime(50.0),
            ))))
        });
    }
    sim.run_until(VirtualTime(5_000.0)).unwrap();
    assert!(sim.processed_events() > 4);
    log.take()
}

#[test]
fn clock_never_goes_back_and_runs_repeat() {
    let first = random_walkers(1);
    assert!(first.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(first, random_walkers(1));
    assert_ne!(first, random_walkers(2));
}

#[test]
fn bounded_store_blocks_producer() {
    let puts: Log<VirtualTime> = Rc::default();
    let taken: Log<u32> = Rc::default();
    let store = Store::<u32>::bounded(1);
    let mut sim = SimulationBuilder::default().build();

    {
        let store = store.clone();
        let puts = puts.clone();
        let mut next = 0;
        sim.spawn("producer", move |_: &Event| {
            if next > 0 {
                puts.borrow_mut().push(now());
            }
            if next == 3 {
                return Suspend::Exit;
            }
            next += 1;
            Suspend::On(store.put(next - 1))
        });
    }
    {
        let store = store.clone();
        let taken = taken.clone();
        let mut started = false;
        sim.spawn("consumer", move |fired: &Event| {
            if !started {
                started = true;
                return Suspend::On(timeout(VirtualTime(10.0)));
            }
            if let Some(item) = fired.value::<u32>() {
                taken.borrow_mut().push(item);
            }
            if taken.borrow().len() == 3 {
                return Suspend::Exit;
            }
            Suspend::On(store.get())
        });
    }

    sim.run_until(VirtualTime(10.0)).unwrap();

    assert_eq!(
        *puts.borrow(),
        vec![VirtualTime(0.0), VirtualTime(10.0), VirtualTime(10.0)]
    );
    assert_eq!(*taken.borrow(), vec![0, 1, 2]);
    assert!(store.is_empty());
}
