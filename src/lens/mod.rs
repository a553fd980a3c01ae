//! Lens profile and everything derived from it.
//!
//! [LensProfile] is plain data with pure getters. [tracker::LensTracker] owns the single
//! profile of the application, applies user actions to it and keeps the daily date refresh
//! running.

pub mod refresh;
pub mod tracker;

use std::{fmt::Display, str::FromStr};

use anyhow::anyhow;
use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::utils::{
    percentage::{days_percentage, Percentage},
    time::{add_days, days_between, short_date},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum LensType {
    Daily,
    #[default]
    Monthly,
    Yearly,
}

impl LensType {
    pub const ALL: [LensType; 3] = [LensType::Daily, LensType::Monthly, LensType::Yearly];

    /// Length of the replacement cycle in days.
    pub fn replacement_days(&self) -> u32 {
        match self {
            LensType::Daily => 1,
            LensType::Monthly => 30,
            LensType::Yearly => 365,
        }
    }
}

impl Display for LensType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LensType::Daily => write!(f, "Daily"),
            LensType::Monthly => write!(f, "Monthly"),
            LensType::Yearly => write!(f, "Yearly"),
        }
    }
}

impl FromStr for LensType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LensType::ALL
            .into_iter()
            .find(|v| v.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| anyhow!("Unknown lens type {s}"))
    }
}

/// Color band of the remaining part of a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleBand {
    Green,
    Yellow,
    Red,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LensProfile {
    lens_type: LensType,
    last_replacement_date: NaiveDate,
    current_date: NaiveDate,
    #[serde(default)]
    usage_dates: Vec<NaiveDate>,
    #[serde(default)]
    left_eye_power: Option<String>,
    #[serde(default)]
    right_eye_power: Option<String>,
    #[serde(default)]
    date_counter_enabled: bool,
}

impl LensProfile {
    /// Fresh profile: monthly lenses replaced `today`, no usage yet.
    pub fn new(today: NaiveDate) -> Self {
        Self {
            lens_type: LensType::default(),
            last_replacement_date: today,
            current_date: today,
            usage_dates: vec![],
            left_eye_power: None,
            right_eye_power: None,
            date_counter_enabled: false,
        }
    }

    pub fn with_lens_type(mut self, lens_type: LensType) -> Self {
        self.lens_type = lens_type;
        self
    }

    pub fn with_last_replacement_date(mut self, date: NaiveDate) -> Self {
        self.last_replacement_date = date;
        self
    }

    pub fn with_current_date(mut self, date: NaiveDate) -> Self {
        self.current_date = date;
        self
    }

    pub fn lens_type(&self) -> LensType {
        self.lens_type
    }

    /// Always matches [LensType::replacement_days] of the current lens type.
    pub fn replacement_cycle_days(&self) -> u32 {
        self.lens_type.replacement_days()
    }

    pub fn last_replacement_date(&self) -> NaiveDate {
        self.last_replacement_date
    }

    pub fn current_date(&self) -> NaiveDate {
        self.current_date
    }

    pub fn usage_dates(&self) -> &[NaiveDate] {
        &self.usage_dates
    }

    pub fn left_eye_power(&self) -> Option<&str> {
        self.left_eye_power.as_deref()
    }

    pub fn right_eye_power(&self) -> Option<&str> {
        self.right_eye_power.as_deref()
    }

    pub fn date_counter_enabled(&self) -> bool {
        self.date_counter_enabled
    }

    pub fn days_in_use(&self) -> i64 {
        days_between(self.last_replacement_date, self.current_date)
    }

    pub fn days_left(&self) -> i64 {
        (i64::from(self.replacement_cycle_days()) - self.days_in_use()).max(0)
    }

    /// `last_replacement_date + cycle`, or the current date if that leaves the calendar.
    pub fn next_replacement_date(&self) -> NaiveDate {
        add_days(
            self.last_replacement_date,
            i64::from(self.replacement_cycle_days()),
        )
        .unwrap_or(self.current_date)
    }

    pub fn since_label(&self) -> String {
        short_date(self.last_replacement_date)
    }

    pub fn until_label(&self) -> String {
        short_date(self.next_replacement_date())
    }

    pub fn is_setup_complete(&self) -> bool {
        self.replacement_cycle_days() > 0
    }

    pub fn is_expired(&self) -> bool {
        self.days_left() == 0
    }

    pub fn remaining(&self) -> Percentage {
        days_percentage(self.days_left(), i64::from(self.replacement_cycle_days()))
    }

    pub fn band(&self) -> CycleBand {
        let ratio = self.remaining().as_ratio();
        if ratio > 0.66 {
            CycleBand::Green
        } else if ratio > 0.33 {
            CycleBand::Yellow
        } else {
            CycleBand::Red
        }
    }

    pub fn was_used_on(&self, date: NaiveDate) -> bool {
        self.usage_dates.contains(&date)
    }

    pub fn set_lens_type(&mut self, lens_type: LensType) {
        self.lens_type = lens_type;
    }

    pub fn set_eye_powers(&mut self, left: Option<String>, right: Option<String>) {
        self.left_eye_power = left.filter(|v| !v.is_empty());
        self.right_eye_power = right.filter(|v| !v.is_empty());
    }

    pub(crate) fn set_date_counter_enabled(&mut self, enabled: bool) {
        self.date_counter_enabled = enabled;
    }

    /// Records usage for `date`. Does nothing once the cycle is used up or when the day is
    /// already recorded. Returns whether the history changed.
    pub fn record_usage(&mut self, date: NaiveDate) -> bool {
        if self.days_left() > 0 && !self.was_used_on(date) {
            self.usage_dates.push(date);
            true
        } else {
            false
        }
    }

    /// Starts a new cycle at `start`, observed on `today`. Usage history belongs to a single
    /// cycle, so it is dropped.
    pub fn restart_cycle(&mut self, start: NaiveDate, today: NaiveDate) {
        self.last_replacement_date = start;
        self.current_date = today;
        self.usage_dates.clear();
    }

    /// Returns whether the date actually moved.
    pub fn sync_current_date(&mut self, today: NaiveDate) -> bool {
        if self.current_date == today {
            false
        } else {
            self.current_date = today;
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::utils::clock::test_clock::day;

    use super::{CycleBand, LensProfile, LensType};

    #[test]
    fn lens_types_map_to_cycles() {
        let mut profile = LensProfile::new(day(2025, 3, 1));
        assert_eq!(profile.replacement_cycle_days(), 30);

        for (lens_type, days) in [
            (LensType::Daily, 1),
            (LensType::Yearly, 365),
            (LensType::Monthly, 30),
        ] {
            profile.set_lens_type(lens_type);
            assert_eq!(profile.replacement_cycle_days(), days);
        }
    }

    #[test]
    fn days_left_mid_cycle() {
        let profile = LensProfile::new(day(2025, 3, 1)).with_current_date(day(2025, 3, 11));
        assert_eq!(profile.days_in_use(), 10);
        assert_eq!(profile.days_left(), 20);
        assert_eq!(profile.next_replacement_date(), day(2025, 3, 31));
    }

    #[test]
    fn days_left_is_clamped() {
        let profile = LensProfile::new(day(2025, 3, 1)).with_current_date(day(2025, 4, 5));
        assert_eq!(profile.days_in_use(), 35);
        assert_eq!(profile.days_left(), 0);
        assert!(profile.is_expired());
    }

    #[test]
    fn days_left_never_negative() {
        for lens_type in LensType::ALL {
            for elapsed in 0..400 {
                let start = day(2025, 1, 1);
                let profile = LensProfile::new(start)
                    .with_lens_type(lens_type)
                    .with_current_date(start + chrono::Days::new(elapsed));
                let expected = (i64::from(lens_type.replacement_days()) - elapsed as i64).max(0);
                assert_eq!(profile.days_left(), expected);
            }
        }
    }

    #[test]
    fn usage_is_recorded_once_per_day() {
        let mut profile = LensProfile::new(day(2025, 3, 1));
        assert!(profile.record_usage(day(2025, 3, 5)));
        assert!(!profile.record_usage(day(2025, 3, 5)));
        assert!(profile.record_usage(day(2025, 3, 6)));
        assert_eq!(profile.usage_dates(), &[day(2025, 3, 5), day(2025, 3, 6)]);
    }

    #[test]
    fn usage_is_ignored_after_cycle_ends() {
        let mut profile = LensProfile::new(day(2025, 3, 1))
            .with_lens_type(LensType::Daily)
            .with_current_date(day(2025, 3, 2));
        assert!(!profile.record_usage(day(2025, 3, 2)));
        assert!(profile.usage_dates().is_empty());
    }

    #[test]
    fn restart_clears_history() {
        let mut profile = LensProfile::new(day(2025, 3, 1)).with_current_date(day(2025, 3, 10));
        profile.record_usage(day(2025, 3, 9));
        profile.restart_cycle(day(2025, 3, 10), day(2025, 3, 10));
        assert!(profile.usage_dates().is_empty());
        assert_eq!(profile.days_left(), 30);
    }

    #[test]
    fn bands_follow_remaining_ratio() {
        let start = day(2025, 3, 1);
        let band = |elapsed| {
            LensProfile::new(start)
                .with_current_date(start + chrono::Days::new(elapsed))
                .band()
        };
        assert_eq!(band(0), CycleBand::Green);
        assert_eq!(band(15), CycleBand::Yellow);
        assert_eq!(band(25), CycleBand::Red);
        assert_eq!(band(40), CycleBand::Red);
    }

    #[test]
    fn labels_are_short_dates() {
        let profile = LensProfile::new(day(2025, 3, 1));
        assert_eq!(profile.since_label(), "3/1");
        assert_eq!(profile.until_label(), "3/31");
    }

    #[test]
    fn lens_type_from_str() {
        assert_eq!("monthly".parse::<LensType>().unwrap(), LensType::Monthly);
        assert_eq!(" Yearly ".parse::<LensType>().unwrap(), LensType::Yearly);
        assert!("weekly".parse::<LensType>().is_err());
    }

    #[test]
    fn profile_survives_serialization() {
        let mut profile = LensProfile::new(day(2025, 3, 1)).with_lens_type(LensType::Yearly);
        profile.record_usage(day(2025, 3, 1));
        profile.set_eye_powers(Some("-2.25".into()), None);

        let json = serde_json::to_string(&profile).unwrap();
        assert_eq!(serde_json::from_str::<LensProfile>(&json).unwrap(), profile);
    }
}
