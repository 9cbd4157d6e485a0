//! Module instance lifecycle.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use portbridge::instance::{InitializationError, ModuleInit, ModuleState, PortError};
use portbridge::module::{Context, Module, SetupContext};
use portbridge::ports::{EventBuffer, Output};

/// Emits an increasing counter on port "tick" until disposed, and records
/// whether it was run and whether it returned.
struct Pulse {
    tick: Output<u64>,
    period: Duration,
    has_run: Arc<AtomicBool>,
    has_returned: Arc<AtomicBool>,
}

impl Pulse {
    fn new(period: Duration) -> Self {
        Self {
            tick: Output::new(),
            period,
            has_run: Arc::new(AtomicBool::new(false)),
            has_returned: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Module for Pulse {
    fn setup(&mut self, setup: &mut SetupContext<'_>) -> Result<(), InitializationError> {
        setup.add_output(&self.tick, "tick")
    }

    fn run(&mut self, context: &Context) {
        self.has_run.store(true, Ordering::Relaxed);

        let mut count = 0;
        while context.sleep(self.period) {
            self.tick.emit(count);
            count += 1;
        }

        self.has_returned.store(true, Ordering::Relaxed);
    }
}

#[test]
fn states() {
    let instance = ModuleInit::new(Pulse::new(Duration::from_millis(1)))
        .build()
        .unwrap();
    assert_eq!(instance.state(), ModuleState::Initializing);
    assert_eq!(instance.name(), "module");

    instance.start().unwrap();
    assert_eq!(instance.state(), ModuleState::Running);

    let err = instance.start().unwrap_err();
    assert_eq!(err.expected(), ModuleState::Initializing);
    assert_eq!(err.found(), ModuleState::Running);

    instance.dispose();
    assert_eq!(instance.state(), ModuleState::Disposed);
    assert_eq!(instance.start().unwrap_err().found(), ModuleState::Disposed);
}

#[test]
fn dispose_stops_module_and_subscriptions() {
    let module = Pulse::new(Duration::from_millis(1));
    let has_returned = module.has_returned.clone();
    let instance = ModuleInit::new(module).init().unwrap();

    let (sender, receiver) = mpsc::channel();
    let port = instance.port::<u64>("tick").unwrap();
    port.subscribe(move |value| {
        let _ = sender.send(value);
    });
    receiver.recv().unwrap();

    instance.dispose();

    assert!(has_returned.load(Ordering::Relaxed));
    assert_eq!(port.subscriber_count(), 0);
    // The handler and its sender were released.
    while receiver.try_recv().is_ok() {}
    assert!(receiver.recv().is_err());
}

#[test]
fn dispose_is_idempotent() {
    let instance = ModuleInit::new(Pulse::new(Duration::from_secs(3600)))
        .init()
        .unwrap();

    instance.dispose();
    instance.dispose();

    assert_eq!(instance.state(), ModuleState::Disposed);
    assert_eq!(
        instance.subscribe("tick", |_: u64| {}).unwrap_err(),
        PortError::Disposed
    );
    assert!(matches!(
        instance.port::<u64>("tick"),
        Err(PortError::Disposed)
    ));
    assert_eq!(instance.ports().len(), 1);
}

#[test]
fn concurrent_dispose_waits_for_completion() {
    let instance = Arc::new(
        ModuleInit::new(Pulse::new(Duration::from_millis(1)))
            .init()
            .unwrap(),
    );

    let (entered_sender, entered) = mpsc::channel();
    let done = Arc::new(AtomicBool::new(false));
    let handler_done = done.clone();
    let mut first = true;
    instance
        .subscribe("tick", move |_: u64| {
            if first {
                first = false;
                let _ = entered_sender.send(());
                std::thread::sleep(Duration::from_millis(100));
                handler_done.store(true, Ordering::Relaxed);
            }
        })
        .unwrap();
    entered.recv().unwrap();

    let disposer = {
        let instance = instance.clone();
        std::thread::spawn(move || instance.dispose())
    };
    std::thread::sleep(Duration::from_millis(20));

    // The first disposal is still blocked on the running handler.
    instance.dispose();
    assert!(done.load(Ordering::Relaxed));
    assert_eq!(instance.state(), ModuleState::Disposed);

    disposer.join().unwrap();
}

#[test]
fn dispose_before_start() {
    let module = Pulse::new(Duration::from_millis(1));
    let has_run = module.has_run.clone();
    let instance = ModuleInit::new(module).build().unwrap();
    let mut buffer = EventBuffer::new();
    instance.port::<u64>("tick").unwrap().connect_sink(&buffer);

    instance.dispose();

    assert!(!has_run.load(Ordering::Relaxed));
    assert_eq!(buffer.next(), None);
}

#[test]
fn drop_disposes() {
    let module = Pulse::new(Duration::from_secs(3600));
    let has_returned = module.has_returned.clone();
    let instance = ModuleInit::new(module).init().unwrap();
    let port = instance.port::<u64>("tick").unwrap();
    port.subscribe(|_| {});

    drop(instance);

    assert!(has_returned.load(Ordering::Relaxed));
    assert_eq!(port.subscriber_count(), 0);
    assert!(!port.subscribe(|_| {}).unsubscribe());
}

#[test]
fn dispose_from_handler() {
    let instance = Arc::new(
        ModuleInit::new(Pulse::new(Duration::from_millis(1)))
            .build()
            .unwrap(),
    );
    let calls = Arc::new(AtomicUsize::new(0));
    let slot: Arc<Mutex<Option<Arc<_>>>> = Arc::new(Mutex::new(Some(instance.clone())));

    instance
        .subscribe("tick", {
            let calls = calls.clone();
            let slot = slot.clone();
            move |_: u64| {
                calls.fetch_add(1, Ordering::Relaxed);
                if let Some(instance) = slot.lock().unwrap().take() {
                    instance.dispose();
                }
            }
        })
        .unwrap();

    instance.start().unwrap();
    instance.wait();

    assert_eq!(instance.state(), ModuleState::Disposed);
    assert_eq!(calls.load(Ordering::Relaxed), 1);
}

#[test]
fn independent_instances() {
    let first = ModuleInit::new(Pulse::new(Duration::from_millis(1)))
        .with_name("first")
        .init()
        .unwrap();
    let second = ModuleInit::new(Pulse::new(Duration::from_millis(1)))
        .with_name("second")
        .init()
        .unwrap();

    first.dispose();

    assert_eq!(first.state(), ModuleState::Disposed);
    assert_eq!(second.state(), ModuleState::Running);
    assert!(second.port::<u64>("tick").is_ok());
}
