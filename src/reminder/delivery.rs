use std::{io::Write, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::utils::clock::Clock;

use super::{queue::ReminderQueue, ReminderRequest, ReminderSound};

/// Whatever finally shows a reminder to the user.
#[async_trait]
pub trait ReminderSink: Send {
    async fn deliver(&mut self, reminder: &ReminderRequest) -> Result<()>;
}

/// Writes a reminder the way the terminal shows it. The default sound is a terminal bell.
pub fn print_reminder(out: &mut impl Write, reminder: &ReminderRequest) -> std::io::Result<()> {
    if reminder.sound == ReminderSound::Default {
        write!(out, "\x07")?;
    }
    writeln!(out, "{}: {}", reminder.title, reminder.body)?;
    out.flush()
}

/// Moves fired reminders into the inbox, where the CLI picks them up the next time it runs. A
/// daemon started by `init` has no terminal, so the inbox is the only way for it to reach the
/// user. With `echo` the reminder is printed to stdout as well.
pub struct InboxSink {
    inbox: ReminderQueue,
    echo: bool,
}

impl InboxSink {
    pub fn new(inbox: ReminderQueue, echo: bool) -> Self {
        Self { inbox, echo }
    }
}

#[async_trait]
impl ReminderSink for InboxSink {
    async fn deliver(&mut self, reminder: &ReminderRequest) -> Result<()> {
        self.inbox.push(reminder).await?;
        if self.echo {
            print_reminder(&mut std::io::stdout().lock(), reminder)?;
        }
        Ok(())
    }
}

/// Delivers queued reminders once they are due. Delivered reminders are removed from the queue,
/// so each one fires at most once.
pub struct ReminderDelivery<S: ReminderSink> {
    queue: ReminderQueue,
    sink: S,
    shutdown: CancellationToken,
    poll_interval: Duration,
    time_provider: Box<dyn Clock>,
}

impl<S: ReminderSink> ReminderDelivery<S> {
    pub fn new(
        queue: ReminderQueue,
        sink: S,
        shutdown: CancellationToken,
        poll_interval: Duration,
        time_provider: Box<dyn Clock>,
    ) -> Self {
        Self {
            queue,
            sink,
            shutdown,
            poll_interval,
            time_provider,
        }
    }

    async fn deliver_due(&mut self) -> Result<usize> {
        let due = self.queue.take_due(self.time_provider.now()).await?;
        for reminder in &due {
            match self.sink.deliver(reminder).await {
                Ok(_) => info!("Delivered reminder {}", reminder.id),
                Err(e) => error!("Failed to deliver reminder {}: {e:?}", reminder.id),
            }
        }
        Ok(due.len())
    }

    /// Executes the delivery loop until shutdown.
    pub async fn run(mut self) -> Result<S> {
        let mut check_point = self.time_provider.instant();
        loop {
            check_point += self.poll_interval;

            match self.deliver_due().await {
                Ok(0) => (),
                Ok(count) => debug!("Delivered {count} reminders"),
                Err(e) => error!("Encountered an error during delivery {:?}", e),
            }

            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    return Ok(self.sink)
                }
                _ = self.time_provider.sleep_until(check_point) => ()
            }
        }
    }
}
