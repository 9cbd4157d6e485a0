//! Port enumeration and typed lookup.

use portbridge::instance::{InitializationError, ModuleInit, ModuleInstance, PortError};
use portbridge::module::{Module, SetupContext};
use portbridge::ports::Output;

#[derive(Default)]
struct Sensor {
    temperature: Output<f64>,
    status: Output<String>,
    heartbeat: Output<()>,
}

impl Module for Sensor {
    fn setup(&mut self, setup: &mut SetupContext<'_>) -> Result<(), InitializationError> {
        setup.add_output(&self.temperature, "temperature")?;
        setup.add_output(&self.status, "status")?;
        setup.add_output(&self.heartbeat, "heartbeat")
    }
}

fn sensor() -> ModuleInstance {
    ModuleInit::new(Sensor::default()).init().unwrap()
}

#[test]
fn ports_in_declaration_order() {
    let instance = sensor();

    let ports: Vec<_> = instance
        .ports()
        .into_iter()
        .map(|port| (port.name().to_string(), port.event_type_name()))
        .collect();

    assert_eq!(
        ports,
        vec![
            ("temperature".to_string(), "f64"),
            ("status".to_string(), std::any::type_name::<String>()),
            ("heartbeat".to_string(), "()"),
        ]
    );
}

#[test]
fn unknown_port() {
    let instance = sensor();

    let err = instance.subscribe("pressure", |_: f64| {}).unwrap_err();

    assert_eq!(
        err,
        PortError::UnknownPort {
            name: "pressure".to_string()
        }
    );
    assert_eq!(err.to_string(), "no port named 'pressure'");
    assert_eq!(instance.ports().len(), 3);
    assert_eq!(
        instance
            .port::<f64>("temperature")
            .unwrap()
            .subscriber_count(),
        0
    );
    assert_eq!(
        instance
            .port::<String>("status")
            .unwrap()
            .subscriber_count(),
        0
    );
    assert_eq!(instance.port::<()>("heartbeat").unwrap().subscriber_count(), 0);
}

#[test]
fn type_mismatch_registers_nothing() {
    let instance = sensor();

    let err = instance.subscribe("temperature", |_: f32| {}).unwrap_err();

    assert_eq!(
        err,
        PortError::TypeMismatch {
            name: "temperature".to_string(),
            expected: "f32",
            found: "f64",
        }
    );
    assert_eq!(
        instance
            .port::<f64>("temperature")
            .unwrap()
            .subscriber_count(),
        0
    );
}

#[test]
fn handles_share_subscriptions() {
    let instance = sensor();

    let first = instance.port::<String>("status").unwrap();
    let second = instance.port::<String>("status").unwrap();
    let subscription = first.subscribe(|_| {});

    assert_eq!(first.name(), "status");
    assert_eq!(second.subscriber_count(), 1);
    assert!(subscription.unsubscribe());
    assert_eq!(second.subscriber_count(), 0);
}
