//! Background work that must outlive the response it belongs to.
//!
//! Cache writes that happen after a response has been handed back (the
//! stale-while-revalidate refresh, network-first write-through) are
//! registered here. The host keeps the worker alive until `settle()` returns;
//! dropping a `KeepAlive` aborts whatever has not finished, which is what an
//! idle-terminated worker would lose.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::task::JoinSet;
use tracing::warn;

#[derive(Default)]
pub struct KeepAlive {
    tasks: Mutex<JoinSet<()>>,
}

impl KeepAlive {
    pub fn new() -> Self {
        Self::default()
    }

    fn tasks(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start `work` now and keep the worker alive until it finishes.
    pub fn wait_until<F>(&self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks().spawn(work);
    }

    /// Tasks registered and not yet awaited by `settle`.
    pub fn pending(&self) -> usize {
        self.tasks().len()
    }

    /// Wait for every registered task, including ones registered meanwhile.
    /// Returns how many tasks settled.
    pub async fn settle(&self) -> usize {
        let mut settled = 0;
        loop {
            let mut batch = std::mem::take(&mut *self.tasks());
            if batch.is_empty() {
                return settled;
            }
            while let Some(result) = batch.join_next().await {
                settled += 1;
                if let Err(e) = result {
                    warn!(error = %e, "Background task did not complete");
                }
            }
        }
    }
}
