//! Background reconciliation job
//!
//! Runs one [`Reconciler::reconcile_all`] pass on the tokio runtime.
//! Completion is observable through [`ReconcileJob::wait`]; the pass can be
//! abandoned with [`ReconcileJob::cancel`].

use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::{Reconciler, ReconciliationReport};
use crate::config::TargetDefinition;

/// How a background pass ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobResult {
    /// The pass ran to completion
    Completed(ReconciliationReport),
    /// The pass was cancelled before completing
    Cancelled,
    /// The task ended without reporting (panicked or was aborted)
    Aborted,
}

/// Handle to a background reconciliation pass
#[derive(Debug)]
pub struct ReconcileJob {
    cancel_tx: Option<oneshot::Sender<()>>,
    result_rx: oneshot::Receiver<JobResult>,
    handle: JoinHandle<()>,
}

impl ReconcileJob {
    /// Spawn a pass over `targets`
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(reconciler: Arc<Reconciler>, targets: Vec<TargetDefinition>) -> Self {
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        let (result_tx, result_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            let result = tokio::select! {
                report = reconciler.reconcile_all(&targets) => JobResult::Completed(report),

                // A dropped sender disables this branch instead of cancelling
                Ok(()) = cancel_rx => {
                    info!("Reconciliation job cancelled");
                    JobResult::Cancelled
                }
            };

            if result_tx.send(result).is_err() {
                debug!("Reconciliation job result dropped, nobody is waiting");
            }
        });

        Self {
            cancel_tx: Some(cancel_tx),
            result_rx,
            handle,
        }
    }

    /// Request cancellation; takes effect at the pass's next await point
    pub fn cancel(&mut self) {
        if let Some(tx) = self.cancel_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Whether the background task has ended
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the pass to end
    ///
    /// Borrows the handle so the wait can be raced against a shutdown
    /// signal and followed by [`ReconcileJob::cancel`]. Must not be awaited
    /// again once it has returned.
    pub async fn wait(&mut self) -> JobResult {
        (&mut self.result_rx).await.unwrap_or(JobResult::Aborted)
    }
}
