use std::any::Any;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use super::SubscriptionId;

/// Callback receiving the failures of host handlers.
pub(crate) type FailureReporter = Arc<dyn Fn(HandlerFailure) + Send + Sync>;

/// Returns the reporter used when none was configured.
pub(crate) fn default_reporter() -> FailureReporter {
    Arc::new(log_failure)
}

/// Logs a handler failure as an error.
pub(crate) fn log_failure(failure: HandlerFailure) {
    tracing::error!(
        port = failure.port(),
        subscription = %failure.subscription(),
        "{}",
        failure
    );
}

/// The way a host handler failed.
pub enum FailureKind {
    /// The handler panicked; the payload is the one passed to the panic.
    Panic(Box<dyn Any + Send + 'static>),
    /// The handler returned an error.
    Error(Box<dyn Error + Send + Sync + 'static>),
}

impl fmt::Debug for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Panic(payload) => f
                .debug_tuple("Panic")
                .field(&panic_message(payload.as_ref()))
                .finish(),
            Self::Error(err) => f.debug_tuple("Error").field(err).finish(),
        }
    }
}

/// Report of a host handler that failed while an event was delivered to it.
///
/// A failure is confined to the subscription that raised it: the remaining
/// subscriptions still receive the event and the failing subscription still
/// receives subsequent events.
#[derive(Debug)]
pub struct HandlerFailure {
    port: String,
    subscription: SubscriptionId,
    kind: FailureKind,
}

impl HandlerFailure {
    pub(crate) fn new(
        port: impl Into<String>,
        subscription: SubscriptionId,
        kind: FailureKind,
    ) -> Self {
        Self {
            port: port.into(),
            subscription,
            kind,
        }
    }

    /// Name of the port on which the event was emitted.
    ///
    /// This is the empty string for an output that was never declared to a
    /// module instance.
    pub fn port(&self) -> &str {
        &self.port
    }

    /// Identifier of the failing subscription.
    pub fn subscription(&self) -> SubscriptionId {
        self.subscription
    }

    /// The way the handler failed.
    pub fn kind(&self) -> &FailureKind {
        &self.kind
    }

    /// Consumes the report and returns the way the handler failed.
    pub fn into_kind(self) -> FailureKind {
        self.kind
    }
}

impl fmt::Display for HandlerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FailureKind::Panic(payload) => write!(
                f,
                "handler {} of port '{}' panicked: {}",
                self.subscription,
                self.port,
                panic_message(payload.as_ref())
            ),
            FailureKind::Error(err) => write!(
                f,
                "handler {} of port '{}' failed: {}",
                self.subscription, self.port, err
            ),
        }
    }
}

impl Error for HandlerFailure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            FailureKind::Panic(_) => None,
            FailureKind::Error(err) => Some(err.as_ref()),
        }
    }
}

/// Extracts the message of a panic payload, if it has one.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "<non-string panic payload>"
    }
}
