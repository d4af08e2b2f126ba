//! Concurrency primitives used by the node: cancellable contexts,
//! structured task scopes and the bounded ring buffer backing the snapshot queue.
#![allow(unsafe_code)]

pub mod ctx;
pub mod error;
pub mod scope;
pub mod signal;
pub mod sync;
pub mod testonly;
pub mod time;
