// src/exec/mod.rs

//! Execution layer seam.
//!
//! - [`backend`] provides the `ExecutorBackend` trait and a channel-backed
//!   `ChannelExecutorBackend`; tests replace it with a fake implementation.

pub mod backend;

pub use backend::{ChannelExecutorBackend, ExecutorBackend};
pub use crate::dag::DispatchRequest;
