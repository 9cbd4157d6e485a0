//! Output ports and host subscriptions.
//!
//! Modules contain [`Output`] ports, which they declare to their instance
//! during setup and use to emit events while they run. The host obtains a
//! [`PortHandle`] for a declared port and registers handlers, event sinks or
//! streams on it.
//!
//! Every event is delivered synchronously on the thread of the emitting
//! module, to every subscription registered at the time of the emission and in
//! the order of registration. The next event of the same port is only
//! delivered once the previous one has reached all its subscriptions.
//!
//! `Output` ports are clonable. Their clones are shallow copies, meaning that
//! any subscription made through one clone is immediately visible to the
//! others.
//!
//! #### Example
//!
//! An output used directly, without a module instance.
//!
//! ```
//! use portbridge::ports::{EventBuffer, Output};
//!
//! let mut output = Output::new();
//! let mut buffer = EventBuffer::new();
//! output.handle().connect_sink(&buffer);
//!
//! output.emit(3u64);
//! output.emit(4);
//!
//! assert_eq!(buffer.next(), Some(3));
//! assert_eq!(buffer.next(), Some(4));
//! assert_eq!(buffer.next(), None);
//! ```

mod dispatch;
mod failure;
mod handle;
mod output;
mod sink;
mod subscription;

pub use failure::{FailureKind, HandlerFailure};
pub use handle::{EventStream, PortHandle, PortInfo};
pub use output::Output;
pub use sink::event_buffer::{EventBuffer, EventBufferWriter};
pub use sink::event_slot::{EventSlot, EventSlotWriter};
pub use sink::{EventSink, EventSinkStream, EventSinkWriter};
pub use subscription::{SubscriptionHandle, SubscriptionId};

pub(crate) use failure::{default_reporter, panic_message, FailureReporter};
pub(crate) use output::PortLink;
