//! A headless counter.

use std::time::Duration;

use portbridge::instance::InitializationError;
use portbridge::module::{Context, Module, SetupContext};
use tracing::debug;

use crate::observables::ObservableValue;

/// A module that counts on its own and emits every count.
///
/// The counter emits `start`, `start + 1`, `start + 2`, ... on its
/// [`Counter::PORT`] port, one value at the end of each period. It runs until
/// its instance is disposed, or until it has emitted `limit` values if a limit
/// was set.
///
/// ```text
/// ┌─────────┐
/// │         │
/// │ Counter ├───► tick
/// │         │
/// └─────────┘
/// ```
#[derive(Debug)]
pub struct Counter {
    count: ObservableValue<u64>,
    period: Duration,
    start: u64,
    limit: Option<u64>,
}

impl Counter {
    /// Name of the output port.
    pub const PORT: &'static str = "tick";

    /// Period used when none is specified.
    pub const DEFAULT_PERIOD: Duration = Duration::from_secs(1);

    /// Creates a counter that starts from 0, emits every second and never
    /// stops.
    pub fn new() -> Self {
        Self {
            count: ObservableValue::new(0),
            period: Self::DEFAULT_PERIOD,
            start: 0,
            limit: None,
        }
    }

    /// Sets the time between two emissions.
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;

        self
    }

    /// Sets the first value emitted.
    pub fn with_start(mut self, start: u64) -> Self {
        self.start = start;

        self
    }

    /// Sets the number of values emitted before the counter stops.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);

        self
    }
}

impl Default for Counter {
    fn default() -> Self {
        Self::new()
    }
}

impl Module for Counter {
    fn setup(&mut self, setup: &mut SetupContext<'_>) -> Result<(), InitializationError> {
        setup.add_output(self.count.output(), Self::PORT)
    }

    fn run(&mut self, context: &Context) {
        let mut emitted: u64 = 0;

        loop {
            if self.limit.is_some_and(|limit| emitted >= limit) {
                debug!(emitted, "counter reached its limit");
                return;
            }
            if emitted > 0 && *self.count == u64::MAX {
                debug!("counter reached its maximum value");
                return;
            }
            if !context.sleep(self.period) {
                return;
            }

            if emitted == 0 {
                self.count.set(self.start);
            } else {
                self.count.modify(|count| *count += 1);
            }
            emitted += 1;
        }
    }
}
