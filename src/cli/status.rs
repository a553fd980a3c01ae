use std::fmt::Write;

use ansi_term::{Colour, Style};

use crate::lens::{CycleBand, LensProfile};

const BAR_WIDTH: usize = 20;

fn band_style(band: CycleBand) -> Style {
    match band {
        CycleBand::Green => Colour::Green.bold(),
        CycleBand::Yellow => Colour::Yellow.bold(),
        CycleBand::Red => Colour::Red.bold(),
    }
}

fn paint(colored: bool, style: Style, text: &str) -> String {
    if colored {
        style.paint(text).to_string()
    } else {
        text.to_string()
    }
}

fn progress_bar(profile: &LensProfile) -> String {
    let ratio = profile.remaining().as_ratio().clamp(0., 1.);
    let filled = (ratio * BAR_WIDTH as f64).round() as usize;
    format!(
        "[{}{}]",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled)
    )
}

/// Home screen of the application.
pub fn render_status(profile: &LensProfile, colored: bool) -> String {
    let style = band_style(profile.band());
    let mut out = String::new();

    let days_left = profile.days_left();
    let unit = if days_left == 1 { "day" } else { "days" };
    let _ = writeln!(
        out,
        "{} {unit} left {} {}",
        paint(colored, style, &days_left.to_string()),
        paint(colored, style, &progress_bar(profile)),
        profile.remaining(),
    );
    let _ = writeln!(
        out,
        "In use for {} days, since {} until {}",
        profile.days_in_use(),
        profile.since_label(),
        profile.until_label(),
    );
    let _ = writeln!(
        out,
        "Lens type: {} ({} day cycle)",
        profile.lens_type(),
        profile.replacement_cycle_days()
    );
    if profile.left_eye_power().is_some() || profile.right_eye_power().is_some() {
        let _ = writeln!(
            out,
            "Power: left {}, right {}",
            profile.left_eye_power().unwrap_or("-"),
            profile.right_eye_power().unwrap_or("-"),
        );
    }
    let _ = writeln!(
        out,
        "Date counter: {}",
        if profile.date_counter_enabled() { "on" } else { "off" }
    );

    if profile.is_expired() {
        let _ = writeln!(
            out,
            "\n{}\nIt's time to replace your lenses.",
            paint(colored, Colour::Red.bold(), "Replace Your Lenses")
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use crate::{lens::LensProfile, utils::clock::test_clock::day};

    use super::render_status;

    #[test]
    fn status_mid_cycle() {
        let mut profile = LensProfile::new(day(2025, 3, 1)).with_current_date(day(2025, 3, 11));
        profile.set_eye_powers(Some("-2.25".into()), None);

        let status = render_status(&profile, false);

        assert!(status.starts_with("20 days left [#############-------] 67%\n"));
        assert!(status.contains("In use for 10 days, since 3/1 until 3/31"));
        assert!(status.contains("Lens type: Monthly (30 day cycle)"));
        assert!(status.contains("Power: left -2.25, right -"));
        assert!(status.contains("Date counter: off"));
        assert!(!status.contains("Replace Your Lenses"));
    }

    #[test]
    fn status_shows_alert_when_expired() {
        let profile = LensProfile::new(day(2025, 3, 1)).with_current_date(day(2025, 4, 5));

        let status = render_status(&profile, false);

        assert!(status.starts_with("0 days left [--------------------] 0%\n"));
        assert!(status.contains("Replace Your Lenses\nIt's time to replace your lenses."));
        assert!(!status.contains("Power:"));
    }
}
