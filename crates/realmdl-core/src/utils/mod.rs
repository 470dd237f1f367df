//! Utility functions for string formatting and redaction.

pub mod format;

pub use format::{format_bytes, redact, shell_quote, shell_quote_path, truncate_string};
