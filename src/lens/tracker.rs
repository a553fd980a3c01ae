use std::sync::Arc;

use chrono::{NaiveDate, Timelike};
use tokio::sync::watch;
use tracing::{debug, error, info, instrument};

use crate::{
    reminder::{Notifier, ReminderRequest},
    utils::clock::Clock,
};

use super::{
    refresh::{arm_daily_refresh, ScheduledTask},
    LensProfile, LensType,
};

/// Everything the settings form edits at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LensSettings {
    pub lens_type: LensType,
    pub last_replacement_date: NaiveDate,
    pub left_eye_power: Option<String>,
    pub right_eye_power: Option<String>,
    pub notifications_enabled: bool,
}

/// Owner of the application's lens profile. Consumers read through [LensTracker::snapshot] or
/// [LensTracker::subscribe]; all user actions go through this type.
///
/// Enabling the date counter spawns a tokio task, so it needs to run inside a runtime.
pub struct LensTracker {
    profile: Arc<watch::Sender<LensProfile>>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    date_counter: Option<ScheduledTask>,
}

impl LensTracker {
    pub fn new(clock: Arc<dyn Clock>, notifier: Arc<dyn Notifier>) -> Self {
        let profile = LensProfile::new(clock.today());
        Self::with_profile(profile, clock, notifier)
    }

    /// Takes over an existing profile. If its date counter is on, the current date is resynced
    /// and the refresh armed right away.
    pub fn with_profile(
        profile: LensProfile,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (sender, _) = watch::channel(profile);
        let mut tracker = Self {
            profile: Arc::new(sender),
            clock,
            notifier,
            date_counter: None,
        };
        tracker.start_date_counter_if_needed();
        tracker
    }

    pub fn snapshot(&self) -> LensProfile {
        self.profile.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LensProfile> {
        self.profile.subscribe()
    }

    pub fn days_left(&self) -> i64 {
        self.profile.borrow().days_left()
    }

    pub fn days_in_use(&self) -> i64 {
        self.profile.borrow().days_in_use()
    }

    pub fn next_replacement_date(&self) -> NaiveDate {
        self.profile.borrow().next_replacement_date()
    }

    pub fn is_date_counter_armed(&self) -> bool {
        self.date_counter
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Records that the lenses were worn today. Returns whether anything changed.
    pub fn log_usage_today(&mut self) -> bool {
        let today = self.clock.today();
        let logged = self.profile.send_if_modified(|v| v.record_usage(today));
        if logged {
            info!("Logged usage for {today}");
        } else {
            debug!("Usage for {today} not logged");
        }
        logged
    }

    /// Starts a new cycle today.
    pub fn reset_cycle(&mut self) {
        let today = self.clock.today();
        self.profile.send_modify(|v| v.restart_cycle(today, today));
        info!("Started a new cycle on {today}");
        self.start_date_counter_if_needed();
    }

    pub fn set_lens_type(&mut self, lens_type: LensType) {
        self.profile.send_modify(|v| v.set_lens_type(lens_type));
    }

    pub fn set_date_counter_enabled(&mut self, enabled: bool) {
        self.profile
            .send_modify(|v| v.set_date_counter_enabled(enabled));
        if enabled {
            self.start_date_counter_if_needed();
        } else if let Some(task) = self.date_counter.take() {
            task.cancel();
            info!("Date counter disabled");
        }
    }

    /// Applies the settings form. Saving settings starts a new cycle today, while the reminder,
    /// if enabled, is scheduled for the day before replacement counted from the chosen date.
    #[instrument(skip(self))]
    pub async fn apply_settings(&mut self, settings: LensSettings) {
        let LensSettings {
            lens_type,
            last_replacement_date,
            left_eye_power,
            right_eye_power,
            notifications_enabled,
        } = settings;
        let now = self.clock.now();
        let today = now.date();

        self.profile.send_modify(|v| {
            v.set_lens_type(lens_type);
            v.set_eye_powers(left_eye_power, right_eye_power);
            v.restart_cycle(today, today);
        });
        self.start_date_counter_if_needed();

        if notifications_enabled {
            let time_of_day = now.time().with_second(0).and_then(|v| v.with_nanosecond(0));
            let reminder = ReminderRequest::replacement_due(
                last_replacement_date,
                lens_type.replacement_days(),
                time_of_day.unwrap_or(now.time()),
            );
            match reminder {
                Some(reminder) => self.schedule_reminder(reminder).await,
                None => error!("Reminder date for {last_replacement_date} is out of range"),
            }
        }
    }

    async fn schedule_reminder(&self, reminder: ReminderRequest) {
        let id = reminder.id;
        if let Err(e) = self.notifier.submit(reminder).await {
            error!("Failed to schedule notification {id}: {e:?}");
        }
    }

    fn start_date_counter_if_needed(&mut self) {
        if !self.profile.borrow().date_counter_enabled() {
            return;
        }

        if let Some(task) = self.date_counter.take() {
            task.cancel();
        }

        let today = self.clock.today();
        self.profile.send_if_modified(|v| v.sync_current_date(today));

        self.date_counter = Some(arm_daily_refresh(
            self.profile.clone(),
            self.clock.clone(),
        ));
        debug!("Date counter armed");
    }
}
