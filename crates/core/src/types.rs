//! Shared primitive type aliases.

/// Internal database row identifier.
pub type DbId = i64;

/// UTC timestamp used across the platform.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
