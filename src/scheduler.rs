//! Periodic board refresh

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::publish::{PublishOutcome, Publisher};

/// Handle to a running refresh loop
pub struct Scheduler {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl Scheduler {
    /// Start refreshing every board each `period`; the first refresh runs immediately.
    pub fn spawn(publisher: Arc<Publisher>, period: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let task = tokio::spawn(async move {
            info!(interval_secs = period.as_secs(), "Board scheduler started");
            let mut tick = interval(period);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = tick.tick() => refresh_all(&publisher).await,
                    _ = shutdown_rx.recv() => {
                        info!("Board scheduler shutting down");
                        break;
                    }
                }
            }
        });

        Self { shutdown_tx, task }
    }

    /// Stop the loop and wait for an in-progress refresh to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            warn!(error = %e, "Board scheduler task ended abnormally");
        }
    }
}

/// One pass over every board. Failures are logged; the next tick retries.
pub async fn refresh_all(publisher: &Publisher) {
    let outcomes = publisher.refresh_all().await;
    let failed = outcomes
        .iter()
        .filter(|(_, outcome)| matches!(outcome, PublishOutcome::Failed(_)))
        .count();
    if failed > 0 {
        warn!(failed, "Scheduled refresh finished with failures");
    } else {
        debug!(boards = outcomes.len(), "Scheduled refresh finished");
    }
}
