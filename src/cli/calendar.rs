use std::fmt::Write;

use ansi_term::{Colour, Style};
use chrono::{Datelike, Months, NaiveDate};

use crate::lens::LensProfile;

const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Days of the month `date` belongs to.
pub fn month_days(date: NaiveDate) -> Vec<NaiveDate> {
    let Some(first) = date.with_day(1) else {
        return vec![];
    };
    let next = first.checked_add_months(Months::new(1));
    first
        .iter_days()
        .take_while(|v| next.map_or(true, |next| *v < next))
        .collect()
}

/// Month grid with the days the lenses were used marked. `selected` is highlighted over usage.
pub fn render_month(
    profile: &LensProfile,
    month: NaiveDate,
    selected: NaiveDate,
    colored: bool,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", month.format("%B %Y"));
    let _ = writeln!(out, "{}", WEEKDAYS.map(|v| format!("{v:>4}")).concat());

    let days = month_days(month);
    let offset = days
        .first()
        .map(|v| v.weekday().num_days_from_sunday() as usize)
        .unwrap_or(0);
    let mut line = "    ".repeat(offset);
    for (index, day) in days.iter().enumerate() {
        let used = profile.was_used_on(*day);
        let cell = format!("{:>3}{}", day.day(), if used { '*' } else { ' ' });
        let style = if *day == selected {
            Some(Style::new().on(Colour::Blue))
        } else if used {
            Some(Colour::Green.bold())
        } else {
            None
        };
        match style {
            Some(style) if colored => line.push_str(&style.paint(cell).to_string()),
            _ => line.push_str(&cell),
        }

        if (offset + index + 1) % 7 == 0 {
            let _ = writeln!(out, "{}", line.trim_end());
            line.clear();
        }
    }
    if !line.is_empty() {
        let _ = writeln!(out, "{}", line.trim_end());
    }

    let _ = writeln!(out, "\nTotal Days Used: {}", profile.usage_dates().len());
    out
}

#[cfg(test)]
mod tests {
    use crate::{lens::LensProfile, utils::clock::test_clock::day};

    use super::{month_days, render_month};

    #[test]
    fn month_lengths() {
        assert_eq!(month_days(day(2024, 2, 10)).len(), 29);
        assert_eq!(month_days(day(2025, 2, 28)).len(), 28);
        assert_eq!(month_days(day(2025, 12, 31)).len(), 31);
    }

    #[test]
    fn calendar_marks_usage() {
        let mut profile = LensProfile::new(day(2025, 3, 1)).with_current_date(day(2025, 3, 6));
        profile.record_usage(day(2025, 3, 5));
        profile.record_usage(day(2025, 3, 6));

        let rendered = render_month(&profile, day(2025, 3, 6), day(2025, 3, 6), false);
        let lines = rendered.lines().collect::<Vec<_>>();

        assert_eq!(lines[0], "March 2025");
        assert_eq!(lines[1], " Sun Mon Tue Wed Thu Fri Sat");
        // March 1st 2025 is a Saturday.
        assert_eq!(lines[2], "                          1");
        assert_eq!(lines[3], "  2   3   4   5*  6*  7   8");
        assert_eq!(lines.last(), Some(&"Total Days Used: 2"));
    }
}
