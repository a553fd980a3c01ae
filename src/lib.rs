//! Small tracker for contact lens usage. Keeps count of days left before replacement, the days
//! the lenses were worn, and schedules a reminder for the day before replacement.
//!

pub mod cli;
pub mod daemon;
pub mod lens;
pub mod reminder;
pub mod storage;
pub mod utils;
