//! Core utilities for droidplan
//!
//! This crate provides shared functionality used by the resolver and CLI:
//!
//! - **Error handling**: Errors with codes, context, and recovery suggestions
//! - **Validation**: Violation collection that reports every problem at once
//! - **Configuration**: TOML-based tool configuration
//! - **Process execution**: Hand-off to the external build engine
//!
//! # Example
//!
//! ```rust,no_run
//! use droidplan_core::config::Config;
//!
//! let config = Config::load(None).expect("invalid .droidplan.toml");
//! println!("descriptor: {}", config.schema.descriptor.path);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
#[allow(missing_docs)]
pub mod error;
pub mod process;
pub mod validation;

pub use error::{Error, ErrorCode, Result, ResultExt};
