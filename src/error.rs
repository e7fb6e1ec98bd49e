use thiserror::Error;

/// Errors surfaced by the public [`crate::HopscotchMap`] API.
///
/// These are the four fail-fast kinds the container can report.
/// Anything else (a lookup finding a claimed neighbor bit pointing at
/// a free slot, mismatched data-vector lengths, an out-of-range
/// neighbor offset surfacing this far up the stack) is a broken
/// invariant, not a recoverable condition. Those panic via
/// `debug_assert!`/`expect` instead of reaching this enum.
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum HopscotchError {
    #[error("key not found")]
    MissingKey,

    #[error("pop_any called on an empty map")]
    Empty,

    #[error("{0}")]
    BadArgument(String),

    #[error("neighborhood width would exceed 64 bits")]
    CapacityExceeded,
}

/// Internal-only signal raised by `free_up` when no slot can be opened
/// within a bucket's neighborhood without breaking the displacement
/// invariant. Never escapes a public method: callers catch it and grow
/// the table before retrying, per the growth-and-retry rule in
/// `engine::resize`/`HopscotchMap::set`.
#[derive(Debug)]
pub(crate) struct NoSpace;
