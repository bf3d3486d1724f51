//! Utility modules.

/// RFC 3339 parsing for date filters.
pub mod datetime;

/// Log sanitization utilities to prevent secret exposure.
pub mod log_sanitizer;

/// Phone number normalization.
pub mod phone;
