// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! Recipe actors hand eligible job and sub-recipe nodes to an
//! `ExecutorBackend`; how they actually run is outside this crate. Outcomes
//! come back through [`crate::engine::EngineHandle::report`].
//!
//! - `ChannelExecutorBackend` forwards requests over an mpsc channel to
//!   whatever consumes them (a cluster scheduler, a local runner).
//! - Tests provide their own backend that records requests and reports
//!   outcomes directly.

use std::future::Future;
use std::pin::Pin;

use anyhow::anyhow;
use tokio::sync::mpsc;

use crate::dag::DispatchRequest;
use crate::errors::Result;

/// Trait abstracting how eligible nodes are executed.
///
/// Shared by every recipe actor, hence `&self` and `Sync`.
pub trait ExecutorBackend: Send + Sync {
    /// Hand the given nodes over for execution.
    ///
    /// Returning `Ok` means the backend accepted them; the nodes are then
    /// marked running. Implementations must not wait for the nodes to
    /// finish.
    fn dispatch(
        &self,
        requests: Vec<DispatchRequest>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Backend that forwards every request over an mpsc channel.
#[derive(Debug, Clone)]
pub struct ChannelExecutorBackend {
    tx: mpsc::Sender<DispatchRequest>,
}

impl ChannelExecutorBackend {
    pub fn new(tx: mpsc::Sender<DispatchRequest>) -> Self {
        Self { tx }
    }

    /// Create a backend together with the receiving end of its channel.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<DispatchRequest>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

impl ExecutorBackend for ChannelExecutorBackend {
    fn dispatch(
        &self,
        requests: Vec<DispatchRequest>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        // Clone the sender so the future doesn't borrow `self` across `await`.
        let tx = self.tx.clone();

        Box::pin(async move {
            for request in requests {
                tx.send(request)
                    .await
                    .map_err(|e| anyhow!("executor channel closed; dropped {}", e.0.node))?;
            }
            Ok(())
        })
    }
}
