//! Example: host program of a headless counter.
//!
//! This example demonstrates in particular:
//!
//! * the initialization of a module instance,
//! * the subscription of a host handler to a port,
//! * structured logging of the module lifecycle.
//!
//! ```text
//!            ┌─────────┐
//!            │         │        ┌──────────────┐
//!            │ Counter ├───────►│ print(count) │
//!            │         │  tick  └──────────────┘
//!            └─────────┘
//! ```
//!
//! The counter prints one value per second until the process is interrupted.
//! Run with `RUST_LOG=debug` to see the lifecycle and subscription logs.

use std::error::Error;

use portbridge::instance::ModuleInit;
use portbridge_util::Counter;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let instance = ModuleInit::new(Counter::new())
        .with_name("counter")
        .with_failure_handler(|failure| warn!("{}", failure))
        .build()?;

    for port in instance.ports() {
        info!(port = port.name(), event_type = port.event_type_name(), "port available");
    }

    instance.subscribe(Counter::PORT, |value: u64| println!("{}", value))?;

    instance.start()?;
    instance.wait();

    Ok(())
}
