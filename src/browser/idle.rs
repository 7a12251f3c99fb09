// Network-idle detection for rendered pages
// A page is idle once no request has been in flight for a full quiet window

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Count of requests the page has started but not yet finished or failed
#[derive(Debug, Default)]
pub struct InFlight(AtomicUsize);

impl InFlight {
    pub fn started(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    /// Saturates at zero: a request that began before tracking started can still finish
    pub fn settled(&self) {
        let _ = self
            .0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)));
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Resolve once `in_flight` has stayed at zero for `quiet_window`.
///
/// Never resolves while requests keep arriving; callers bound it with a timeout.
pub async fn wait_for_network_idle(in_flight: &InFlight, quiet_window: Duration) {
    let mut quiet_since: Option<Instant> = None;

    loop {
        if in_flight.count() == 0 {
            let start = *quiet_since.get_or_insert_with(Instant::now);
            if start.elapsed() >= quiet_window {
                return;
            }
        } else {
            quiet_since = None;
        }

        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
