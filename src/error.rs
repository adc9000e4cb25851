// 🚫 Input Errors - Caller mistakes rejected at the boundary
// Storage and I/O failures travel as anyhow::Error; these are the ones a caller can fix.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// Month key not in YYYY-MM form (or month outside 01..12)
    #[error("invalid month key '{0}': expected YYYY-MM")]
    InvalidMonth(String),

    /// Range whose start month is after its end month
    #[error("start month {start} is after end month {end}")]
    ReversedRange { start: String, end: String },

    #[error("unknown filter type '{0}': expected all, role, group, privilege or member")]
    UnknownFilterType(String),

    #[error("filter type '{0}' requires a filter value")]
    MissingFilterValue(String),

    #[error("unknown role '{0}'")]
    UnknownRole(String),

    #[error("unknown gender '{0}'")]
    UnknownGender(String),

    #[error("invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),
}
