//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `checkmate_core` linkage without the Flutter host.
//! - Print the Monday-anchored week for today or a `YYYY-MM-DD` argument.

use checkmate_core::WeekWindow;
use chrono::NaiveDate;
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("checkmate_core ping={}", checkmate_core::ping());
    println!("checkmate_core version={}", checkmate_core::core_version());

    let anchor = match std::env::args().nth(1) {
        Some(raw) => match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
            Ok(date) => date,
            Err(err) => {
                eprintln!("invalid date `{raw}`: {err}");
                return ExitCode::FAILURE;
            }
        },
        None => chrono::Local::now().date_naive(),
    };

    let window = match WeekWindow::try_containing(anchor) {
        Ok(window) => window,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    println!("week monday={} sunday={}", window.monday, window.sunday);
    for day in window.days() {
        let marker = if day == anchor { "*" } else { " " };
        println!("{marker} {} {}", day.format("%a"), day);
    }
    ExitCode::SUCCESS
}
