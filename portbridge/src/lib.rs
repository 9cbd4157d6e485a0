//! A bridge between headless modules and the host process that embeds them.
//!
//! A headless module is a long-lived computation with no user interface. It
//! runs on its own execution thread and periodically emits values on named
//! outbound ports. The host process subscribes to those ports and reacts to
//! every emitted value.
//!
//! Portbridge is concerned with how these values are produced, delivered and
//! consumed across the module/host boundary: ordering, delivery guarantees and
//! the lifecycle of module instances.
//!
//! # A practical overview
//!
//! Embedding a module typically involves three distinct activities:
//!
//! 1. the design of the module, which declares its ports and emits on them,
//! 2. the initialization of a module instance, which runs the setup of the
//!    module and spawns its execution thread,
//! 3. the subscription of host handlers to the ports of the instance.
//!
//! ## Authoring modules
//!
//! Modules contain _output ports_, which are instances of the
//! [`Output`](ports::Output) type and can be used to broadcast events to all
//! subscribed host handlers.
//!
//! Modules must implement the [`Module`](module::Module) trait, which
//! specifies
//! * a `setup()` method called once when the instance is built, where the
//!   module declares its output ports under unique names,
//! * a `run()` method called once on the execution thread of the instance,
//!   where the module performs its own activity and emits events.
//!
//! A module that emits an increasing counter every 10ms:
//!
//! ```
//! use std::time::Duration;
//!
//! use portbridge::instance::InitializationError;
//! use portbridge::module::{Context, Module, SetupContext};
//! use portbridge::ports::Output;
//!
//! #[derive(Default)]
//! pub struct Ticker {
//!     tick: Output<u64>,
//! }
//!
//! impl Module for Ticker {
//!     fn setup(&mut self, setup: &mut SetupContext<'_>) -> Result<(), InitializationError> {
//!         setup.add_output(&self.tick, "tick")
//!     }
//!
//!     fn run(&mut self, context: &Context) {
//!         let mut count = 0;
//!         while context.sleep(Duration::from_millis(10)) {
//!             self.tick.emit(count);
//!             count += 1;
//!         }
//!     }
//! }
//! ```
//!
//! ## Subscribing to ports
//!
//! A module instance is created with the [`ModuleInit`](instance::ModuleInit)
//! builder. Ports can then be looked up by name and event type, and host
//! handlers, event sinks or streams can be subscribed to them:
//!
//! ```
//! # use std::time::Duration;
//! # use portbridge::instance::InitializationError;
//! # use portbridge::module::{Context, Module, SetupContext};
//! # use portbridge::ports::Output;
//! # #[derive(Default)]
//! # pub struct Ticker {
//! #     tick: Output<u64>,
//! # }
//! # impl Module for Ticker {
//! #     fn setup(&mut self, setup: &mut SetupContext<'_>) -> Result<(), InitializationError> {
//! #         setup.add_output(&self.tick, "tick")
//! #     }
//! #     fn run(&mut self, context: &Context) {
//! #         let mut count = 0;
//! #         while context.sleep(Duration::from_millis(10)) {
//! #             self.tick.emit(count);
//! #             count += 1;
//! #         }
//! #     }
//! # }
//! use portbridge::instance::ModuleInit;
//! use portbridge::ports::EventBuffer;
//!
//! // Build the instance without starting it so that no event is missed.
//! let instance = ModuleInit::new(Ticker::default()).with_name("ticker").build()?;
//!
//! let tick = instance.port::<u64>("tick")?;
//! let buffer = EventBuffer::new();
//! tick.connect_sink(&buffer);
//! tick.subscribe(|count| println!("tick {}", count));
//!
//! instance.start()?;
//! std::thread::sleep(Duration::from_millis(50));
//! instance.dispose();
//!
//! // Events are delivered in emission order, starting from 0.
//! let received: Vec<u64> = buffer.collect();
//! assert!(received.iter().copied().eq(0..received.len() as u64));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Delivery guarantees
//!
//! Every event emitted on a port is delivered synchronously on the execution
//! thread of the module, before [`Output::emit()`](ports::Output::emit)
//! returns. The bridge provides the following guarantees:
//!
//! 1. *completeness*: every event reaches every subscription registered on
//!    the port at the time of the emission, exactly once,
//! 2. *per-port ordering*: successive events of a port are delivered in
//!    emission order, and an event reaches all its subscriptions before the
//!    next event of the same port is delivered,
//! 3. *registration order*: the subscriptions of a port are invoked one after
//!    the other, in the order in which they were registered,
//! 4. *no replay*: a subscription only receives the events emitted after its
//!    registration,
//! 5. *failure isolation*: a handler that panics or returns an error neither
//!    prevents other handlers from receiving the event nor itself from
//!    receiving subsequent events. The failure is reported to the failure
//!    handler of the instance.
//!
//! No ordering is guaranteed between events of different ports.
//!
//! Since handlers run on the thread of the module, a slow handler slows down
//! the module. Handlers that need to perform lengthy work should hand the
//! events over to another thread, for instance through a
//! [`stream`](ports::PortHandle::stream).
//!
//! # Modules documentation
//!
//! More information is available in the documentation of the different
//! modules:
//!
//! * the [`module`] module discusses the `Module` trait and the execution
//!   context of modules,
//! * the [`instance`] module describes the lifecycle of module instances and
//!   the associated errors,
//! * the [`ports`] module discusses output ports, host handles, event sinks
//!   and the semantics of subscription and unsubscription.
#![warn(missing_docs, missing_debug_implementations, unreachable_pub)]

pub mod instance;
mod loom_exports;
pub mod module;
pub mod ports;
mod registry;
pub(crate) mod util;
