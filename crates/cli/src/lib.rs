//! Terminal helpers for the pixmill command line
//!
//! - Colored status lines
//! - Human-readable sizes, durations and dimensions
//! - Progress bars for batch runs

#![warn(missing_docs)]

pub mod output;
pub mod progress;
