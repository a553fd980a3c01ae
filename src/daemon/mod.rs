//! The daemon delivers reminders scheduled by the CLI. Fired reminders land in the inbox, which
//! the CLI shows on its next run. The lens profile itself is never touched here.

use std::{io::IsTerminal, path::PathBuf, time::Duration};

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    reminder::{
        delivery::{InboxSink, ReminderDelivery, ReminderSink},
        queue::ReminderQueue,
    },
    utils::clock::{Clock, DefaultClock},
};

pub mod shutdown;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Represents the starting point for the daemon
pub async fn start_daemon(dir: PathBuf) -> Result<()> {
    let shutdown_token = CancellationToken::new();
    let reminder_dir = dir.join("reminders");

    let sink = InboxSink::new(
        ReminderQueue::inbox(reminder_dir.clone())?,
        std::io::stdout().is_terminal(),
    );
    let delivery = create_delivery(
        reminder_dir,
        sink,
        &shutdown_token,
        DEFAULT_POLL_INTERVAL,
        DefaultClock,
    )?;
    info!("Reminder daemon started in {dir:?}");

    let (_, delivery_result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token.clone()),
        delivery.run(),
    );

    if let Err(delivery_result) = delivery_result {
        error!("Delivery module got an error {:?}", delivery_result);
    }

    info!("Reminder daemon stopped");
    Ok(())
}

fn create_delivery<S: ReminderSink>(
    reminder_dir: PathBuf,
    sink: S,
    shutdown_token: &CancellationToken,
    poll_interval: Duration,
    clock: impl Clock,
) -> Result<ReminderDelivery<S>> {
    let queue = ReminderQueue::new(reminder_dir)?;
    Ok(ReminderDelivery::new(
        queue,
        sink,
        shutdown_token.clone(),
        poll_interval,
        Box::new(clock),
    ))
}

#[cfg(test)]
mod daemon_tests {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use anyhow::Result;
    use async_trait::async_trait;
    use tempfile::tempdir;
    use tokio_util::sync::CancellationToken;

    use crate::{
        daemon::create_delivery,
        lens::{
            tracker::{LensSettings, LensTracker},
            LensType,
        },
        reminder::{delivery::ReminderSink, queue::ReminderQueue, ReminderRequest},
        utils::{
            clock::test_clock::{at, day, TestClock},
            logging::TEST_LOGGING,
        },
    };

    #[derive(Clone, Default)]
    struct SharedSink(Arc<Mutex<Vec<ReminderRequest>>>);

    #[async_trait]
    impl ReminderSink for SharedSink {
        async fn deliver(&mut self, reminder: &ReminderRequest) -> Result<()> {
            self.0.lock().unwrap().push(reminder.clone());
            Ok(())
        }
    }

    /// Smoke test: settings applied through the tracker end up delivered by the daemon once
    /// their day comes.
    #[tokio::test]
    async fn smoke_test_daemon() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let reminder_dir = dir.path().join("reminders");

        let settings_clock = TestClock::starting_at(at(day(2025, 3, 1), 9, 0));
        let mut tracker = LensTracker::new(
            Arc::new(settings_clock),
            Arc::new(ReminderQueue::new(reminder_dir.clone())?),
        );
        tracker
            .apply_settings(LensSettings {
                lens_type: LensType::Monthly,
                last_replacement_date: day(2025, 3, 1),
                left_eye_power: None,
                right_eye_power: None,
                notifications_enabled: true,
            })
            .await;

        let sink = SharedSink::default();
        let shutdown_token = CancellationToken::new();
        let delivery = create_delivery(
            reminder_dir.clone(),
            sink.clone(),
            &shutdown_token,
            Duration::from_millis(10),
            TestClock::starting_at(at(day(2025, 3, 30), 9, 0)),
        )?;

        let (_, delivery_result) = tokio::join!(
            async {
                tokio::time::sleep(Duration::from_millis(100)).await;
                shutdown_token.cancel()
            },
            delivery.run(),
        );
        delivery_result?;

        let delivered = sink.0.lock().unwrap().clone();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].trigger.date(), Some(day(2025, 3, 30)));
        assert!(ReminderQueue::new(reminder_dir)?.pending().await?.is_empty());
        Ok(())
    }
}
