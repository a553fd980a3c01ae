use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt},
};
use tracing::{debug, info, warn};

use super::{AuthorizationOptions, Notifier, ReminderRequest};

const QUEUE_FILE: &str = "pending.jsonl";
const INBOX_FILE: &str = "delivered.jsonl";

/// Notification centre that keeps reminders in a json-lines file. Every reminder is a single
/// line, which lets the CLI append new ones while the daemon consumes due ones.
///
/// The same format backs the inbox: reminders the daemon fired that the user hasn't seen yet.
pub struct ReminderQueue {
    path: PathBuf,
}

impl ReminderQueue {
    /// Queue of reminders waiting for their trigger time.
    pub fn new(reminder_dir: PathBuf) -> Result<Self, std::io::Error> {
        Self::with_file(reminder_dir, QUEUE_FILE)
    }

    /// Reminders that were delivered but not shown to the user yet.
    pub fn inbox(reminder_dir: PathBuf) -> Result<Self, std::io::Error> {
        Self::with_file(reminder_dir, INBOX_FILE)
    }

    fn with_file(reminder_dir: PathBuf, file_name: &str) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&reminder_dir)?;

        Ok(Self {
            path: reminder_dir.join(file_name),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All reminders that haven't been delivered yet.
    pub async fn pending(&self) -> Result<Vec<ReminderRequest>> {
        let mut file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => Err(e)?,
        };
        file.lock_shared()?;
        let result = read_requests(&mut file, &self.path).await;
        file.unlock_async().await?;
        result
    }

    /// Removes reminders due at `now` from the queue and returns them.
    pub async fn take_due(&self, now: NaiveDateTime) -> Result<Vec<ReminderRequest>> {
        self.take_matching(|v| v.trigger.is_due(now)).await
    }

    /// Empties the queue, returning everything that was in it.
    pub async fn take_all(&self) -> Result<Vec<ReminderRequest>> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Ok(vec![]);
        }
        self.take_matching(|_| true).await
    }

    /// Appends a reminder to the end of the queue.
    pub async fn push(&self, request: &ReminderRequest) -> Result<()> {
        let mut line = serde_json::to_string(request)?;
        line.push('\n');

        let mut file = File::options()
            .append(true)
            .create(true)
            .open(&self.path)
            .await?;
        file.lock_exclusive()?;
        let result = file.write_all(line.as_bytes()).await;
        let flushed = file.flush().await;
        file.unlock_async().await?;
        result?;
        flushed?;
        Ok(())
    }

    async fn take_matching(
        &self,
        matches: impl Fn(&ReminderRequest) -> bool,
    ) -> Result<Vec<ReminderRequest>> {
        let mut file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .await?;

        // Semi-safe acquire-release for a file
        file.lock_exclusive()?;
        let result = Self::take_with_file(&mut file, &self.path, matches).await;
        file.unlock_async().await?;
        result
    }

    async fn take_with_file(
        file: &mut File,
        path: &Path,
        matches: impl Fn(&ReminderRequest) -> bool,
    ) -> Result<Vec<ReminderRequest>> {
        let requests = read_requests(file, path).await?;
        let (due, pending): (Vec<_>, Vec<_>) = requests.into_iter().partition(|v| matches(v));

        if due.is_empty() {
            return Ok(due);
        }

        let mut contents = String::new();
        for request in &pending {
            contents.push_str(&serde_json::to_string(request)?);
            contents.push('\n');
        }
        file.rewind().await?;
        file.set_len(0).await?;
        file.write_all(contents.as_bytes()).await?;
        file.flush().await?;
        debug!("Took {} reminders from {path:?}, {} left", due.len(), pending.len());
        Ok(due)
    }
}

async fn read_requests(file: &mut File, path: &Path) -> Result<Vec<ReminderRequest>> {
    let mut contents = String::new();
    file.read_to_string(&mut contents).await?;

    let mut requests = vec![];
    for line in contents.lines().filter(|v| !v.trim().is_empty()) {
        match serde_json::from_str::<ReminderRequest>(line) {
            Ok(v) => requests.push(v),
            Err(e) => {
                // ignore illegal values. Might happen after an interrupted write
                warn!("During parsing in path {path:?} found illegal json string {line}:  {e}")
            }
        }
    }
    Ok(requests)
}

#[async_trait]
impl Notifier for ReminderQueue {
    async fn request_authorization(&self, options: AuthorizationOptions) -> Result<bool> {
        debug!("Requested authorization for {options:?}");
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(options.alert || options.sound || options.badge)
    }

    async fn submit(&self, request: ReminderRequest) -> Result<()> {
        self.push(&request).await?;
        info!(
            "Scheduled reminder {} for {:?}",
            request.id, request.trigger
        );
        Ok(())
    }
}
