use std::sync::Arc;

use log::{info, error, warn};
use parking_lot::Mutex;
use tokio::time::{Duration, interval};

use super::aggregator::{fetch_results, ResultsState};
use crate::auth::IdentityProvider;
use crate::store::QuizStore;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Repeatedly re-runs the results aggregation until the comparison is
/// revealed. The counterpart cannot un-submit, so the first Revealed
/// snapshot is final and the loop retires itself; `stop` cancels it
/// earlier (on navigation away). A stopped poller never applies a stale
/// fetch to the snapshot.
pub struct ResultsPoller {
    store: Arc<dyn QuizStore>,
    identity: Arc<dyn IdentityProvider>,
    poll_interval: Duration,
    is_running: Arc<Mutex<bool>>,
    snapshot: Arc<Mutex<Option<ResultsState>>>,
}

impl ResultsPoller {
    pub fn new(store: Arc<dyn QuizStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            store,
            identity,
            poll_interval: DEFAULT_POLL_INTERVAL,
            is_running: Arc::new(Mutex::new(false)),
            snapshot: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Latest aggregation result, if a tick has completed yet.
    pub fn snapshot(&self) -> Option<ResultsState> {
        self.snapshot.lock().clone()
    }

    pub fn is_running(&self) -> bool {
        *self.is_running.lock()
    }

    /// Spawns the poll loop. The first tick fires immediately.
    pub fn start(&self) {
        {
            let mut running = self.is_running.lock();
            if *running {
                warn!("Results poller is already running");
                return;
            }
            *running = true;
        }

        info!("Starting results poll every {:?}", self.poll_interval);

        let store = self.store.clone();
        let identity = self.identity.clone();
        let is_running = self.is_running.clone();
        let snapshot = self.snapshot.clone();
        let poll_interval = self.poll_interval;

        tokio::spawn(async move {
            let mut ticker = interval(poll_interval);

            loop {
                ticker.tick().await;

                if !*is_running.lock() {
                    info!("Results poll cancelled");
                    break;
                }

                let state = match fetch_results(store.as_ref(), identity.as_ref()).await {
                    Ok(state) => state,
                    Err(e) => {
                        error!("Results poll failed: {}", e);
                        continue;
                    }
                };

                let revealed = matches!(state, ResultsState::Revealed(_));

                {
                    // Teardown may have happened mid-fetch; never apply a
                    // stale result after cancellation.
                    let mut running = is_running.lock();
                    if !*running {
                        info!("Results poll cancelled");
                        break;
                    }
                    *snapshot.lock() = Some(state);
                    if revealed {
                        *running = false;
                    }
                }

                if revealed {
                    info!("Both participants complete; results poll finished");
                    break;
                }
            }
        });
    }

    /// Cancels the poll loop. Idempotent; the task observes the flag on
    /// its next tick and exits without touching the snapshot again.
    pub fn stop(&self) {
        let mut running = self.is_running.lock();
        if *running {
            *running = false;
            info!("Results poll stopped");
        }
    }
}

impl Drop for ResultsPoller {
    fn drop(&mut self) {
        self.stop();
    }
}
