//! Isolation and reporting of host handler failures.

use std::fmt;
use std::sync::{Arc, Mutex};

use portbridge::instance::{InitializationError, ModuleInit};
use portbridge::module::{Context, Module, SetupContext};
use portbridge::ports::{EventBuffer, FailureKind, HandlerFailure, Output};

/// Emits `0..count` on port "value".
struct Sequence {
    value: Output<u32>,
    count: u32,
}

impl Sequence {
    fn new(count: u32) -> Self {
        Self {
            value: Output::new(),
            count,
        }
    }
}

impl Module for Sequence {
    fn setup(&mut self, setup: &mut SetupContext<'_>) -> Result<(), InitializationError> {
        setup.add_output(&self.value, "value")
    }

    fn run(&mut self, _: &Context) {
        for value in 0..self.count {
            self.value.emit(value);
        }
    }
}

#[derive(Debug)]
struct Rejected(u32);

impl fmt::Display for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "value {} rejected", self.0)
    }
}

impl std::error::Error for Rejected {}

#[test]
fn panicking_handler_is_isolated() {
    let failures = Arc::new(Mutex::new(Vec::new()));
    let instance = ModuleInit::new(Sequence::new(4))
        .with_name("sequence")
        .with_failure_handler({
            let failures = failures.clone();
            move |failure: HandlerFailure| failures.lock().unwrap().push(failure)
        })
        .build()
        .unwrap();

    let port = instance.port::<u32>("value").unwrap();
    let flaky_log = Arc::new(Mutex::new(Vec::new()));
    let flaky = port.subscribe({
        let flaky_log = flaky_log.clone();
        move |value| {
            if value == 1 {
                panic!("cannot handle {}", value);
            }
            flaky_log.lock().unwrap().push(value);
        }
    });
    let mut buffer = EventBuffer::new();
    port.connect_sink(&buffer);

    instance.start().unwrap();
    instance.wait();

    assert_eq!(buffer.by_ref().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    assert_eq!(*flaky_log.lock().unwrap(), vec![0, 2, 3]);

    let failures = failures.lock().unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].port(), "value");
    assert_eq!(failures[0].subscription(), flaky.id());
    match failures[0].kind() {
        FailureKind::Panic(payload) => {
            assert_eq!(
                payload.downcast_ref::<String>().map(String::as_str),
                Some("cannot handle 1")
            );
        }
        kind => panic!("unexpected failure kind: {:?}", kind),
    }
}

#[test]
fn fallible_handler_errors_are_reported() {
    let failures = Arc::new(Mutex::new(Vec::new()));
    let instance = ModuleInit::new(Sequence::new(5))
        .with_failure_handler({
            let failures = failures.clone();
            move |failure: HandlerFailure| failures.lock().unwrap().push(failure.to_string())
        })
        .build()
        .unwrap();

    let port = instance.port::<u32>("value").unwrap();
    let subscription = port.subscribe_fallible(|value| {
        if value % 2 == 1 {
            Err(Rejected(value))
        } else {
            Ok(())
        }
    });
    let mut buffer = EventBuffer::new();
    port.connect_sink(&buffer);

    instance.start().unwrap();
    instance.wait();

    assert_eq!(buffer.by_ref().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
    assert_eq!(
        *failures.lock().unwrap(),
        vec![
            format!(
                "handler {} of port 'value' failed: value 1 rejected",
                subscription.id()
            ),
            format!(
                "handler {} of port 'value' failed: value 3 rejected",
                subscription.id()
            ),
        ]
    );
}

#[test]
fn panicking_failure_handler_is_contained() {
    let instance = ModuleInit::new(Sequence::new(3))
        .with_failure_handler(|failure| panic!("failure handler gave up on {}", failure))
        .build()
        .unwrap();

    let port = instance.port::<u32>("value").unwrap();
    port.subscribe(|_| panic!("always"));
    let mut buffer = EventBuffer::new();
    port.connect_sink(&buffer);

    instance.start().unwrap();
    instance.wait();

    assert_eq!(buffer.by_ref().collect::<Vec<_>>(), vec![0, 1, 2]);
}

#[test]
fn module_panic_leaves_instance_usable() {
    struct Fragile {
        value: Output<u32>,
    }

    impl Module for Fragile {
        fn setup(&mut self, setup: &mut SetupContext<'_>) -> Result<(), InitializationError> {
            setup.add_output(&self.value, "value")
        }

        fn run(&mut self, _: &Context) {
            self.value.emit(1);
            panic!("internal module failure");
        }
    }

    let instance = ModuleInit::new(Fragile {
        value: Output::new(),
    })
    .build()
    .unwrap();
    let mut buffer = EventBuffer::new();
    instance
        .port::<u32>("value")
        .unwrap()
        .connect_sink(&buffer);

    instance.start().unwrap();
    instance.wait();

    assert_eq!(buffer.next(), Some(1));
    assert!(instance.subscribe("value", |_: u32| {}).is_ok());
    instance.dispose();
}
