//! # Order Lifecycle
//!
//! Owns the create → activate → poll-until-terminal sequence for a single
//! order. Waiting is done on tokio timers so a pending order never ties up a
//! worker thread, and every wait can be interrupted through a `CancelSignal`.
//!
//! ## Public API
//!
//! - `OrderController`: places, activates, polls and cancels orders.
//! - `PollSettings` / `PollOutcome`: poll loop cadence and result.
//! - `cancel_pair`, `CancelHandle`, `CancelSignal`: cooperative cancellation.
//! - `ExecutorError`: the errors returned from this crate.

pub mod cancel;
pub mod controller;
pub mod error;

pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use controller::{OrderController, PollOutcome, PollSettings};
pub use error::ExecutorError;
