//! Reminders are one-shot notifications about an upcoming lens replacement.
//!
//! The model only builds a [ReminderRequest] and hands it to a [Notifier]. What happens to it
//! afterwards is up to the notifier: [queue::ReminderQueue] stores it on disk, and
//! [delivery::ReminderDelivery] fires it once its trigger time comes.

pub mod delivery;
pub mod queue;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::utils::time::add_days;

pub const REMINDER_TITLE: &str = "Reminder";
pub const REPLACEMENT_MESSAGE: &str = "Time to replace your lenses tomorrow!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderSound {
    Default,
    Silent,
}

/// Calendar point at which a reminder fires. Minute precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TriggerDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
}

impl TriggerDate {
    pub fn at(moment: NaiveDateTime) -> Self {
        Self {
            year: moment.year(),
            month: moment.month(),
            day: moment.day(),
            hour: moment.hour(),
            minute: moment.minute(),
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }

    pub fn to_datetime(&self) -> Option<NaiveDateTime> {
        let time = NaiveTime::from_hms_opt(self.hour, self.minute, 0)?;
        Some(self.date()?.and_time(time))
    }

    /// Whether the trigger is at or before `now`. Malformed triggers are considered due so that
    /// they get flushed out of the queue.
    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        self.to_datetime().map_or(true, |v| v <= now)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderRequest {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub sound: ReminderSound,
    pub trigger: TriggerDate,
    pub repeats: bool,
}

impl ReminderRequest {
    pub fn one_shot(body: impl Into<String>, moment: NaiveDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: REMINDER_TITLE.into(),
            body: body.into(),
            sound: ReminderSound::Default,
            trigger: TriggerDate::at(moment),
            repeats: false,
        }
    }

    /// Reminder for the day before a replacement is due, i.e.
    /// `last_replacement + cycle - 1`.
    pub fn replacement_due(
        last_replacement: NaiveDate,
        cycle_days: u32,
        time_of_day: NaiveTime,
    ) -> Option<Self> {
        let date = add_days(last_replacement, i64::from(cycle_days) - 1)?;
        Some(Self::one_shot(REPLACEMENT_MESSAGE, date.and_time(time_of_day)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorizationOptions {
    pub alert: bool,
    pub sound: bool,
    pub badge: bool,
}

impl AuthorizationOptions {
    pub const ALL: AuthorizationOptions = AuthorizationOptions {
        alert: true,
        sound: true,
        badge: true,
    };
}

/// Boundary to whatever is able to show a notification to the user.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Asks for permission to show notifications. `Ok(false)` means the user declined.
    async fn request_authorization(&self, options: AuthorizationOptions) -> Result<bool>;

    /// Schedules a reminder for one-shot delivery.
    async fn submit(&self, request: ReminderRequest) -> Result<()>;
}

/// Requests notification permissions. The outcome is only logged.
pub async fn request_notification_authorization(notifier: &dyn Notifier) {
    match notifier.request_authorization(AuthorizationOptions::ALL).await {
        Ok(true) => info!("Notifications granted"),
        Ok(false) => warn!("Notifications denied"),
        Err(e) => error!("Notification permission error {e:?}"),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use crate::{
        reminder::{ReminderRequest, ReminderSound, TriggerDate, REMINDER_TITLE},
        utils::clock::test_clock::{at, day},
    };

    #[test]
    fn replacement_reminder_fires_the_day_before() {
        let time = NaiveTime::from_hms_opt(9, 30, 0).unwrap();
        let request = ReminderRequest::replacement_due(day(2025, 3, 1), 30, time).unwrap();

        assert_eq!(request.trigger, TriggerDate::at(at(day(2025, 3, 30), 9, 30)));
        assert_eq!(request.title, REMINDER_TITLE);
        assert_eq!(request.sound, ReminderSound::Default);
        assert!(!request.repeats);
    }

    #[test]
    fn daily_lens_reminder_is_same_day() {
        let request =
            ReminderRequest::replacement_due(day(2025, 3, 1), 1, NaiveTime::MIN).unwrap();
        assert_eq!(request.trigger.date(), Some(day(2025, 3, 1)));
    }

    #[test]
    fn reminders_get_unique_ids() {
        let a = ReminderRequest::one_shot("a", at(day(2025, 3, 1), 8, 0));
        let b = ReminderRequest::one_shot("a", at(day(2025, 3, 1), 8, 0));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn trigger_due_check() {
        let trigger = TriggerDate::at(at(day(2025, 3, 1), 8, 0));
        assert!(!trigger.is_due(at(day(2025, 3, 1), 7, 59)));
        assert!(trigger.is_due(at(day(2025, 3, 1), 8, 0)));

        let broken = TriggerDate {
            month: 13,
            ..trigger
        };
        assert!(broken.is_due(at(day(2025, 3, 1), 0, 0)));
    }
}
