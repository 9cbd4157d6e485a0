//! Delivery of emitted events to host subscriptions.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use portbridge::instance::{InitializationError, ModuleInit, ModuleInstance};
use portbridge::module::{Context, Module, SetupContext};
use portbridge::ports::{EventBuffer, Output};

/// Emits the values of each batch on port "tick", waiting for the gate to be
/// opened before each batch but the first.
struct Batches {
    tick: Output<u64>,
    batches: Vec<Vec<u64>>,
    gate: mpsc::Receiver<()>,
}

impl Batches {
    fn new(batches: Vec<Vec<u64>>) -> (Self, mpsc::Sender<()>) {
        let (gate_sender, gate) = mpsc::channel();
        let module = Self {
            tick: Output::new(),
            batches,
            gate,
        };

        (module, gate_sender)
    }
}

impl Module for Batches {
    fn setup(&mut self, setup: &mut SetupContext<'_>) -> Result<(), InitializationError> {
        setup.add_output(&self.tick, "tick")
    }

    fn run(&mut self, _: &Context) {
        for (idx, batch) in self.batches.iter().enumerate() {
            if idx != 0 && self.gate.recv().is_err() {
                return;
            }
            for &value in batch {
                self.tick.emit(value);
            }
        }
    }
}

fn build(batches: Vec<Vec<u64>>) -> (ModuleInstance, mpsc::Sender<()>) {
    let (module, gate) = Batches::new(batches);
    let instance = ModuleInit::new(module).build().unwrap();

    (instance, gate)
}

fn record(instance: &ModuleInstance, log: &Arc<Mutex<Vec<(usize, u64)>>>, tag: usize) {
    let log = log.clone();
    instance
        .subscribe("tick", move |value: u64| log.lock().unwrap().push((tag, value)))
        .unwrap();
}

#[test]
fn counter_scenario() {
    let (instance, _gate) = build(vec![vec![0, 1, 2]]);
    let log = Arc::new(Mutex::new(Vec::new()));
    record(&instance, &log, 0);

    instance.start().unwrap();
    instance.wait();

    assert_eq!(*log.lock().unwrap(), vec![(0, 0), (0, 1), (0, 2)]);
}

#[test]
fn registration_order() {
    let (instance, _gate) = build(vec![vec![5]]);
    let log = Arc::new(Mutex::new(Vec::new()));
    record(&instance, &log, 1);
    record(&instance, &log, 2);

    instance.start().unwrap();
    instance.wait();

    assert_eq!(*log.lock().unwrap(), vec![(1, 5), (2, 5)]);
}

#[test]
fn every_handler_sees_every_event_in_order() {
    const N_EVENTS: u64 = 200;
    const N_HANDLERS: usize = 7;

    let (instance, _gate) = build(vec![(0..N_EVENTS).collect()]);
    let logs: Vec<_> = (0..N_HANDLERS)
        .map(|tag| {
            let log = Arc::new(Mutex::new(Vec::new()));
            record(&instance, &log, tag);
            log
        })
        .collect();

    instance.start().unwrap();
    instance.wait();

    for (tag, log) in logs.iter().enumerate() {
        let expected: Vec<_> = (0..N_EVENTS).map(|value| (tag, value)).collect();
        assert_eq!(*log.lock().unwrap(), expected);
    }
}

#[test]
fn no_replay_for_late_subscriptions() {
    let (instance, gate) = build(vec![vec![0, 1, 2], vec![3, 4]]);
    let (seen_sender, seen) = mpsc::channel();
    instance
        .subscribe("tick", move |value: u64| {
            let _ = seen_sender.send(value);
        })
        .unwrap();

    instance.start().unwrap();
    for expected in 0..3 {
        assert_eq!(seen.recv().unwrap(), expected);
    }

    let late = EventBuffer::new();
    instance.port::<u64>("tick").unwrap().connect_sink(&late);
    gate.send(()).unwrap();
    instance.wait();

    assert_eq!(late.collect::<Vec<_>>(), vec![3, 4]);
    assert_eq!(seen.try_iter().collect::<Vec<_>>(), vec![3, 4]);
}

#[test]
fn zero_emissions() {
    let (instance, _gate) = build(Vec::new());
    let log = Arc::new(Mutex::new(Vec::new()));
    record(&instance, &log, 0);

    instance.start().unwrap();
    instance.wait();
    instance.dispose();

    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn stream_collects_until_dispose() {
    use futures_executor::block_on_stream;

    let (instance, _gate) = build(vec![vec![7, 8, 9]]);
    let stream = instance.port::<u64>("tick").unwrap().stream();

    instance.start().unwrap();
    instance.wait();
    instance.dispose();

    assert_eq!(block_on_stream(stream).collect::<Vec<_>>(), vec![7, 8, 9]);
}

#[test]
fn stream_consumed_on_another_thread() {
    use futures_util::StreamExt;

    let (instance, _gate) = build(vec![(0..50).collect()]);
    let stream = instance.port::<u64>("tick").unwrap().stream();

    let consumer = thread::spawn(move || {
        futures_executor::block_on(stream.take(50).collect::<Vec<_>>())
    });
    instance.start().unwrap();

    assert_eq!(consumer.join().unwrap(), (0..50).collect::<Vec<_>>());
}

#[test]
fn unsubscribe_from_host_while_emitting() {
    struct Endless {
        tick: Output<u64>,
    }

    impl Module for Endless {
        fn setup(&mut self, setup: &mut SetupContext<'_>) -> Result<(), InitializationError> {
            setup.add_output(&self.tick, "tick")
        }

        fn run(&mut self, context: &Context) {
            let mut value = 0;
            while context.sleep(Duration::from_micros(100)) {
                self.tick.emit(value);
                value += 1;
            }
        }
    }

    let instance = ModuleInit::new(Endless {
        tick: Output::new(),
    })
    .build()
    .unwrap();
    let port = instance.port::<u64>("tick").unwrap();

    let count = Arc::new(Mutex::new(0usize));
    let (first_sender, first) = mpsc::channel();
    let subscription = port.subscribe({
        let count = count.clone();
        move |_| {
            *count.lock().unwrap() += 1;
            let _ = first_sender.send(());
        }
    });

    instance.start().unwrap();
    first.recv().unwrap();
    assert!(subscription.unsubscribe());
    let frozen = *count.lock().unwrap();

    thread::sleep(Duration::from_millis(10));

    assert_eq!(*count.lock().unwrap(), frozen);
    assert_eq!(port.subscriber_count(), 0);
}

#[test]
fn subscribe_from_host_while_emitting() {
    const COUNT: u64 = 2000;

    struct Paced {
        tick: Output<u64>,
    }

    impl Module for Paced {
        fn setup(&mut self, setup: &mut SetupContext<'_>) -> Result<(), InitializationError> {
            setup.add_output(&self.tick, "tick")
        }

        fn run(&mut self, context: &Context) {
            for value in 0..COUNT {
                if !context.sleep(Duration::from_micros(50)) {
                    return;
                }
                self.tick.emit(value);
            }
        }
    }

    let instance = ModuleInit::new(Paced {
        tick: Output::new(),
    })
    .build()
    .unwrap();
    let port = instance.port::<u64>("tick").unwrap();

    let subscriber = {
        let port = port.clone();
        thread::spawn(move || {
            let mut logs = Vec::new();
            for _ in 0..200 {
                let log = Arc::new(Mutex::new(Vec::new()));
                port.subscribe({
                    let log = log.clone();
                    move |value| log.lock().unwrap().push(value)
                });
                logs.push(log);
                thread::sleep(Duration::from_micros(200));
            }

            logs
        })
    };

    instance.start().unwrap();
    let logs = subscriber.join().unwrap();
    instance.wait();

    assert_eq!(port.subscriber_count(), logs.len());
    for log in logs {
        let log = log.lock().unwrap();
        if let Some(&first) = log.first() {
            assert_eq!(*log, (first..COUNT).collect::<Vec<_>>());
        }
    }
}

#[test]
fn emissions_from_two_threads_never_overlap_a_subscription() {
    const COUNT: u64 = 1000;

    let output = Output::<u64>::new();
    let in_handler = Arc::new(AtomicBool::new(false));
    let overlaps = Arc::new(AtomicUsize::new(0));
    let received = Arc::new(Mutex::new(Vec::new()));

    output.handle().subscribe({
        let in_handler = in_handler.clone();
        let overlaps = overlaps.clone();
        let received = received.clone();
        move |value| {
            if in_handler.swap(true, Ordering::SeqCst) {
                overlaps.fetch_add(1, Ordering::SeqCst);
            }
            thread::yield_now();
            received.lock().unwrap().push(value);
            in_handler.store(false, Ordering::SeqCst);
        }
    });

    // Each emitter sends its own range of values.
    let emitters: Vec<_> = (0..2)
        .map(|idx| {
            let mut output = output.clone();
            thread::spawn(move || {
                for value in idx * COUNT..(idx + 1) * COUNT {
                    output.emit(value);
                }
            })
        })
        .collect();
    for emitter in emitters {
        emitter.join().unwrap();
    }

    assert_eq!(overlaps.load(Ordering::SeqCst), 0);
    let received = received.lock().unwrap();
    assert_eq!(received.len() as u64, 2 * COUNT);
    for idx in 0..2 {
        let range = idx * COUNT..(idx + 1) * COUNT;
        let from_emitter: Vec<_> = received
            .iter()
            .copied()
            .filter(|value| range.contains(value))
            .collect();
        assert_eq!(from_emitter, range.collect::<Vec<_>>());
    }
}
