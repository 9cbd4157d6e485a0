//! Module instance management.
//!
//! This module contains the module instance builder [`ModuleInit`] and the
//! live module instance [`ModuleInstance`] it produces, together with the
//! associated error types.
//!
//! # Lifecycle
//!
//! A module instance goes through the following states:
//!
//! 1. `Initializing`: [`ModuleInit::build()`] has called
//!    [`Module::setup()`](crate::module::Module::setup) and the ports of the
//!    module exist, but its execution has not begun. Subscriptions made in this
//!    state are guaranteed to observe the very first emission.
//! 2. `Running`: [`ModuleInstance::start()`] has released the execution thread,
//!    which calls [`Module::run()`](crate::module::Module::run).
//! 3. `Disposed`: [`ModuleInstance::dispose()`] has been called, or the
//!    instance was dropped. All subscriptions have ended and no handler is
//!    invoked anymore.
//!
//! [`ModuleInit::init()`] combines the first two steps.
//!
//! # Example
//!
//! ```
//! use std::sync::mpsc;
//!
//! use portbridge::instance::{InitializationError, ModuleInit};
//! use portbridge::module::{Context, Module, SetupContext};
//! use portbridge::ports::Output;
//!
//! #[derive(Default)]
//! struct Countdown {
//!     remaining: Output<u8>,
//! }
//!
//! impl Module for Countdown {
//!     fn setup(&mut self, setup: &mut SetupContext<'_>) -> Result<(), InitializationError> {
//!         setup.add_output(&self.remaining, "remaining")
//!     }
//!
//!     fn run(&mut self, _: &Context) {
//!         for i in (0..3).rev() {
//!             self.remaining.emit(i);
//!         }
//!     }
//! }
//!
//! let instance = ModuleInit::new(Countdown::default())
//!     .with_name("countdown")
//!     .build()?;
//!
//! let (sender, receiver) = mpsc::channel();
//! instance.subscribe("remaining", move |value: u8| {
//!     let _ = sender.send(value);
//! })?;
//!
//! instance.start()?;
//! instance.wait();
//!
//! assert_eq!(receiver.try_iter().collect::<Vec<_>>(), vec![2, 1, 0]);
//!
//! instance.dispose();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod execution;
mod module_init;

use std::error::Error;
use std::fmt;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};

use tracing::{error, info};

use crate::ports::{PortHandle, PortInfo, SubscriptionHandle};
use crate::registry::PortRegistry;

pub(crate) use execution::Signal;
pub use module_init::ModuleInit;

/// The lifecycle state of a module instance.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ModuleState {
    /// The ports are declared but the module is not executing yet.
    Initializing,
    /// The module was started.
    Running,
    /// The instance was disposed.
    Disposed,
}

impl fmt::Display for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initializing => f.write_str("initializing"),
            Self::Running => f.write_str("running"),
            Self::Disposed => f.write_str("disposed"),
        }
    }
}

/// A live headless module.
///
/// The instance owns the execution thread of the module and the registry of
/// its ports. It is `Send` and `Sync`, so it can be shared between host
/// threads, for instance behind an `Arc`.
///
/// Dropping the instance disposes it.
pub struct ModuleInstance {
    name: String,
    state: Mutex<ModuleState>,
    registry: PortRegistry,
    signal: Arc<Signal>,
    thread: Mutex<Option<JoinHandle<()>>>,
    thread_id: ThreadId,
    /// Held by host threads for the whole duration of a disposal.
    disposal: Mutex<()>,
}

impl ModuleInstance {
    pub(crate) fn new(
        name: String,
        registry: PortRegistry,
        signal: Arc<Signal>,
        thread: JoinHandle<()>,
    ) -> Self {
        Self {
            name,
            state: Mutex::new(ModuleState::Initializing),
            registry,
            signal,
            thread_id: thread.thread().id(),
            thread: Mutex::new(Some(thread)),
            disposal: Mutex::new(()),
        }
    }

    /// Returns the name of the instance.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current lifecycle state of the instance.
    pub fn state(&self) -> ModuleState {
        *self.lock_state()
    }

    /// Starts the execution of the module.
    ///
    /// An error is returned if the instance is not in the `Initializing`
    /// state.
    pub fn start(&self) -> Result<(), LifecycleError> {
        let mut state = self.lock_state();
        if *state != ModuleState::Initializing {
            return Err(LifecycleError {
                expected: ModuleState::Initializing,
                found: *state,
            });
        }
        *state = ModuleState::Running;
        self.signal.start();

        info!(module = %self.name, "module started");

        Ok(())
    }

    /// Returns the description of all ports of the module, in declaration
    /// order.
    pub fn ports(&self) -> Vec<PortInfo> {
        self.registry.infos()
    }

    /// Returns a handle to the specified port.
    ///
    /// An error is returned if the instance was disposed, if no port has the
    /// specified name or if the port carries events of another type than `T`.
    pub fn port<T>(&self, name: &str) -> Result<PortHandle<T>, PortError>
    where
        T: Clone + Send + 'static,
    {
        if self.state() == ModuleState::Disposed {
            return Err(PortError::Disposed);
        }

        self.registry.get(name)
    }

    /// Registers a handler invoked with every subsequent event of the
    /// specified port.
    ///
    /// This is a shorthand for [`ModuleInstance::port()`] followed by
    /// [`PortHandle::subscribe()`]. No handler is registered if an error is
    /// returned.
    pub fn subscribe<T, F>(&self, name: &str, handler: F) -> Result<SubscriptionHandle, PortError>
    where
        T: Clone + Send + 'static,
        F: FnMut(T) + Send + 'static,
    {
        let subscription = self.port(name)?.subscribe(handler);

        // Ports are only closed by a disposal.
        if subscription.is_refused() {
            return Err(PortError::Disposed);
        }

        Ok(subscription)
    }

    /// Blocks until the module returns from
    /// [`Module::run()`](crate::module::Module::run).
    ///
    /// If the instance was not started yet, this method blocks until it is
    /// started and its execution completes, or until it is disposed. It
    /// returns immediately when called from the execution thread of the
    /// module itself.
    pub fn wait(&self) {
        self.join();
    }

    /// Ends the execution of the module and all subscriptions.
    ///
    /// Shutdown is requested from the module first, then all subscriptions on
    /// all ports are ended and finally the execution thread is joined, unless
    /// this method is called from that very thread (e.g. from a handler). Once
    /// this method returns, no handler of this instance is invoked anymore,
    /// except the one that called it if any.
    ///
    /// When called from a host thread while another disposal is in progress,
    /// this method waits until that disposal completes. Otherwise, calling it
    /// on a disposed instance has no effect.
    pub fn dispose(&self) {
        let on_module_thread = thread::current().id() == self.thread_id;
        let _disposal = if on_module_thread {
            None
        } else {
            Some(self.disposal.lock().unwrap_or_else(PoisonError::into_inner))
        };

        {
            let mut state = self.lock_state();
            if *state == ModuleState::Disposed {
                drop(state);
                // The disposal may have been started by the module thread.
                self.join();

                return;
            }
            *state = ModuleState::Disposed;
        }

        self.signal.stop();
        let subscriptions = self.registry.close_all();
        self.join();

        info!(module = %self.name, subscriptions, "module disposed");
    }

    fn join(&self) {
        if thread::current().id() == self.thread_id {
            return;
        }

        let mut thread = self.thread.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = thread.take() {
            if handle.join().is_err() {
                error!(module = %self.name, "module execution thread panicked");
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ModuleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ModuleInstance {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for ModuleInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleInstance")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("ports", &self.registry.len())
            .finish_non_exhaustive()
    }
}

/// Error returned when a module instance cannot be initialized.
#[derive(Debug)]
pub enum InitializationError {
    /// Two ports of the module were declared under the same name.
    DuplicatePort {
        /// Name of the port.
        name: String,
    },
    /// The output was already declared, possibly through a clone.
    PortAlreadyBound {
        /// Name under which the declaration was attempted.
        name: String,
    },
    /// The module reported an error during setup.
    Setup(Box<dyn Error + Send + Sync + 'static>),
    /// The execution thread could not be spawned.
    Spawn(io::Error),
}

impl fmt::Display for InitializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicatePort { name } => {
                write!(f, "port '{}' is declared more than once", name)
            }
            Self::PortAlreadyBound { name } => write!(
                f,
                "the output declared as '{}' is already bound to a port",
                name
            ),
            Self::Setup(err) => write!(f, "module setup failed: {}", err),
            Self::Spawn(err) => {
                write!(f, "could not spawn the module execution thread: {}", err)
            }
        }
    }
}

impl Error for InitializationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::DuplicatePort { .. } | Self::PortAlreadyBound { .. } => None,
            Self::Setup(err) => Some(err.as_ref()),
            Self::Spawn(err) => Some(err),
        }
    }
}

/// Error returned when a port cannot be accessed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortError {
    /// The module has no port with the specified name.
    UnknownPort {
        /// Requested name.
        name: String,
    },
    /// The port carries events of another type.
    TypeMismatch {
        /// Name of the port.
        name: String,
        /// Requested event type.
        expected: &'static str,
        /// Actual event type of the port.
        found: &'static str,
    },
    /// The module instance was disposed.
    Disposed,
}

impl fmt::Display for PortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownPort { name } => write!(f, "no port named '{}'", name),
            Self::TypeMismatch {
                name,
                expected,
                found,
            } => write!(
                f,
                "port '{}' carries events of type `{}`, not `{}`",
                name, found, expected
            ),
            Self::Disposed => write!(f, "the module instance was disposed"),
        }
    }
}

impl Error for PortError {}

/// Error returned when an operation is not allowed in the current lifecycle
/// state of a module instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleError {
    expected: ModuleState,
    found: ModuleState,
}

impl LifecycleError {
    /// The state required by the operation.
    pub fn expected(&self) -> ModuleState {
        self.expected
    }

    /// The state the instance was in.
    pub fn found(&self) -> ModuleState {
        self.found
    }
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "the module instance is {} but should be {}",
            self.found, self.expected
        )
    }
}

impl Error for LifecycleError {}
