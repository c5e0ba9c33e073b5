//! Terminal output helpers for droidplan
//!
//! - Status lines
//! - Violation reports
//! - Human-friendly counts and durations

#![warn(missing_docs)]

pub mod output;
