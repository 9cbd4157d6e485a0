use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_utils::sync::{Parker, Unparker};
use tracing::{debug, error, info, info_span};

use crate::module::Context;
use crate::ports::panic_message;

const PENDING: u8 = 0;
const RUNNING: u8 = 1;
const STOPPED: u8 = 2;

/// The execution of a module, as seen from its dedicated thread.
pub(crate) type Task = Box<dyn FnOnce(&Context) + Send + 'static>;

/// Start and shutdown signal shared by an instance and its execution thread.
pub(crate) struct Signal {
    phase: AtomicU8,
    unparker: Unparker,
}

impl Signal {
    pub(crate) fn new(unparker: Unparker) -> Self {
        Self {
            phase: AtomicU8::new(PENDING),
            unparker,
        }
    }

    /// Lets a pending execution begin.
    ///
    /// Returns `false` if the execution was already started or stopped.
    pub(crate) fn start(&self) -> bool {
        let is_started = self
            .phase
            .compare_exchange(PENDING, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if is_started {
            self.unparker.unpark();
        }

        is_started
    }

    /// Requests the execution to stop and wakes the thread if it sleeps.
    pub(crate) fn stop(&self) {
        self.phase.store(STOPPED, Ordering::Release);
        self.unparker.unpark();
    }

    pub(crate) fn is_running(&self) -> bool {
        self.phase.load(Ordering::Acquire) == RUNNING
    }

    fn phase(&self) -> u8 {
        self.phase.load(Ordering::Acquire)
    }
}

/// Spawns the execution thread of a module.
///
/// The thread waits for the signal to be started before running the task,
/// and exits without running it if the signal is stopped first. The task runs
/// within a `module` span carrying the instance name.
pub(crate) fn spawn(
    name: &str,
    signal: Arc<Signal>,
    parker: Parker,
    task: Task,
) -> io::Result<JoinHandle<()>> {
    let name = name.to_string();

    thread::Builder::new()
        .name(name.clone())
        .spawn(move || {
            let span = info_span!("module", name = %name);
            let _enter = span.enter();

            loop {
                match signal.phase() {
                    PENDING => parker.park(),
                    RUNNING => break,
                    _ => {
                        debug!("module disposed before it was started");
                        return;
                    }
                }
            }

            let context = Context::new(name, signal, parker);
            match panic::catch_unwind(AssertUnwindSafe(|| task(&context))) {
                Ok(()) => info!("module execution finished"),
                Err(payload) => error!(
                    "module execution panicked: {}",
                    panic_message(payload.as_ref())
                ),
            }
        })
}
