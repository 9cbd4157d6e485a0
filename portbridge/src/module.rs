//! Module components.
//!
//! # Module trait
//!
//! Every headless module must implement the [`Module`] trait. The trait has
//! two methods, both with a default implementation:
//!
//! * [`Module::setup()`] is called exactly once when the module instance is
//!   built, before any subscription can be made. This is where the module
//!   declares its output ports with [`SetupContext::add_output()`].
//! * [`Module::run()`] is called exactly once on the dedicated execution
//!   thread of the instance, after the instance was started. Returning from
//!   `run` ends the execution of the module but leaves its ports open, so a
//!   module with no internal activity of its own may simply return.
//!
//! #### Examples
//!
//! A module that emits a greeting every 100ms until its instance is disposed:
//!
//! ```
//! use std::time::Duration;
//!
//! use portbridge::instance::InitializationError;
//! use portbridge::module::{Context, Module, SetupContext};
//! use portbridge::ports::Output;
//!
//! #[derive(Default)]
//! pub struct Greeter {
//!     greeting: Output<String>,
//! }
//!
//! impl Module for Greeter {
//!     fn setup(&mut self, setup: &mut SetupContext<'_>) -> Result<(), InitializationError> {
//!         setup.add_output(&self.greeting, "greeting")
//!     }
//!
//!     fn run(&mut self, context: &Context) {
//!         while context.sleep(Duration::from_millis(100)) {
//!             self.greeting.emit(format!("hello from {}", context.name()));
//!         }
//!     }
//! }
//! ```

use crate::instance::InitializationError;

pub use context::{Context, SetupContext};

mod context;

/// Trait to be implemented by all headless modules.
///
/// The module is moved to its execution thread when the instance starts and
/// dropped on that thread once `run` has returned.
pub trait Module: Send + 'static {
    /// Declares the output ports of the module.
    ///
    /// Any error returned aborts the initialization of the instance. Errors
    /// specific to the module should be wrapped in
    /// [`InitializationError::Setup`].
    ///
    /// The default implementation declares no port.
    fn setup(&mut self, setup: &mut SetupContext<'_>) -> Result<(), InitializationError> {
        let _ = setup;

        Ok(())
    }

    /// Performs the execution of the module.
    ///
    /// Long-running modules should regularly check [`Context::is_running()`]
    /// or wait with [`Context::sleep()`] so they return promptly once the
    /// instance is disposed.
    ///
    /// A panic raised in this method ends the execution and is logged, but
    /// has no other effect on the instance.
    fn run(&mut self, context: &Context) {
        let _ = context;
    }
}
