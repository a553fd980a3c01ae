use std::{fmt::Display, ops::Deref};

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Percentage(f64);

impl Display for Percentage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0.round() as i64)
    }
}

impl Percentage {
    pub fn new_opt(value: f64) -> Option<Percentage> {
        if value < 0. || value.is_nan() {
            None
        } else {
            Some(Percentage(value))
        }
    }

    pub fn as_ratio(&self) -> f64 {
        self.0 / 100.
    }
}

impl Deref for Percentage {
    type Target = f64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Share of `whole` taken by `part`. An empty whole counts as nothing left.
pub fn days_percentage(part: i64, whole: i64) -> Percentage {
    if whole <= 0 {
        return Percentage(0.);
    }
    Percentage::new_opt(part.max(0) as f64 / whole as f64 * 100.).unwrap_or(Percentage(0.))
}

#[cfg(test)]
mod tests {
    use super::days_percentage;

    #[test]
    fn percentage_of_cycle() {
        assert_eq!(days_percentage(20, 30).to_string(), "67%");
        assert_eq!(days_percentage(0, 30).to_string(), "0%");
        assert_eq!(days_percentage(5, 0).to_string(), "0%");
        assert!((days_percentage(15, 30).as_ratio() - 0.5).abs() < f64::EPSILON);
    }
}
