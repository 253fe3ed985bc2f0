//! Utility functions.

pub mod env;
pub mod format;
pub mod time;

pub use format::{format_absolute, format_amount, format_percent};
pub use time::{format_age, format_countdown};
