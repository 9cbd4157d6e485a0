//! Reusable modules and helpers for [`portbridge`].

#![warn(missing_docs, missing_debug_implementations, unreachable_pub)]

pub mod counter;
pub mod observables;

pub use counter::Counter;
