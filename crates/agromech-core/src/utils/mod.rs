//! Utility functions for string normalization and display formatting.

pub mod format;

// Re-export commonly used functions at module level
pub use format::{format_amount, normalize_id};
