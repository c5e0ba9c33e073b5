//! Terminal output utilities
//!
//! Provides consistent formatting for CLI output.

use droidplan_core::validation::{ValidationResult, Violation};
use owo_colors::OwoColorize;

/// Status message helpers
pub struct Status;

impl Status {
    /// Print a success message
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Print an error message
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Print a warning message
    pub fn warning(message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    /// Print an info message
    pub fn info(message: &str) {
        println!("{} {}", "ℹ".blue(), message);
    }

    /// Print a header
    pub fn header(message: &str) {
        println!();
        println!("{}", message.bold());
        println!("{}", "─".repeat(message.chars().count()));
    }
}

/// One line describing a violation, without color
pub fn format_violation(violation: &Violation) -> String {
    let mut line = format!(
        "{} {}: {}",
        violation.kind,
        violation.fields.join(", "),
        violation.message
    );
    if let (Some(expected), Some(actual)) = (&violation.expected, &violation.actual) {
        line.push_str(&format!(" (expected {}, got {})", expected, actual));
    }
    line
}

/// Print every error and warning of a validation result to stderr
pub fn report_violations(result: &ValidationResult) {
    for warning in result.warnings() {
        Status::warning(&format_violation(warning));
    }
    for error in result.errors() {
        Status::error(&format_violation(error));
    }
}

/// Format a duration for display
pub fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs_f32();
    if secs < 1.0 {
        format!("{:.0}ms", secs * 1000.0)
    } else if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        let mins = (secs / 60.0).floor();
        let remaining_secs = secs % 60.0;
        format!("{}m {:.0}s", mins, remaining_secs)
    }
}

/// Format a count with singular/plural
pub fn format_count(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}
