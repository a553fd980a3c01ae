use std::{future::Future, sync::Arc, time::Duration};

use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::utils::{clock::Clock, time::until_next_day};

use super::LensProfile;

pub const REFRESH_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Handle to a spawned background task. Cancelling or dropping the handle stops the task.
pub struct ScheduledTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    pub fn spawn<F, Fut>(task: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let handle = tokio::spawn(task(token.clone()));
        Self { token, handle }
    }

    pub fn cancel(self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    #[cfg(test)]
    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Arms the date counter: at the next local midnight, and every 24 hours after it, the
/// profile's current date is set to the clock's date.
pub fn arm_daily_refresh(
    profile: Arc<watch::Sender<LensProfile>>,
    clock: Arc<dyn Clock>,
) -> ScheduledTask {
    ScheduledTask::spawn(move |shutdown| async move {
        let first = until_next_day(clock.now());
        debug!("Next date refresh in {first:?}");
        let mut refresh_point = clock.instant() + first;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Date refresh cancelled");
                    return
                }
                _ = clock.sleep_until(refresh_point) => ()
            }

            let today = clock.today();
            if profile.send_if_modified(|v| v.sync_current_date(today)) {
                info!("Current date moved to {today}");
            }
            refresh_point += REFRESH_INTERVAL;
        }
    })
}
