//! Persistence interface used by the interpreter.

use std::fmt;

use crate::bot::member::{Member, Phone, Status};
use crate::bot::roster::RosterEntry;

/// Errors raised by a store backend.
#[derive(Debug)]
pub enum StoreError {
    /// The underlying SQLite call failed.
    Sqlite(rusqlite::Error),
    /// A previous holder of the connection panicked.
    Poisoned,
    /// An update addressed a phone that is not on the roster.
    UnknownMember(Phone),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite(e) => write!(f, "database error: {e}"),
            Self::Poisoned => write!(f, "database lock poisoned"),
            Self::UnknownMember(phone) => write!(f, "no member with phone {phone}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Sqlite(e) => Some(e),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Sqlite(e)
    }
}

/// Head count reported when everyone is accounted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub total: usize,
    pub absent: usize,
    pub riding: usize,
}

/// Member table plus the single trip-wide "fully accounted" flag.
///
/// Implementations must make `record_status`, `close_if_accounted`,
/// `reset_statuses` and `replace_roster` atomic with respect to each other.
pub trait Store: Send + Sync {
    fn member(&self, phone: &Phone) -> Result<Option<Member>, StoreError>;

    /// Members whose first name matches, ignoring case (full Unicode folding).
    fn members_by_first_name(&self, first_name: &str) -> Result<Vec<Member>, StoreError>;

    /// Members whose first and last names both match, ignoring case.
    fn members_by_full_name(&self, first_name: &str, last_name: &str) -> Result<Vec<Member>, StoreError>;

    fn members(&self) -> Result<Vec<Member>, StoreError>;

    fn members_with_status(&self, status: Status) -> Result<Vec<Member>, StoreError>;

    /// Members whose status is neither `In` nor `Absent`.
    fn missing_members(&self) -> Result<Vec<Member>, StoreError>;

    fn counters(&self) -> Result<Vec<Member>, StoreError>;

    /// Persist a member's new status.
    ///
    /// Returns the flag as it was before the write. When `clear_accounted`
    /// is set the flag is cleared in the same transaction.
    fn record_status(&self, phone: &Phone, status: Status, clear_accounted: bool) -> Result<bool, StoreError>;

    fn set_counter(&self, phone: &Phone, is_counter: bool) -> Result<(), StoreError>;

    /// Set every status back to `Unset` and clear the flag.
    fn reset_statuses(&self) -> Result<(), StoreError>;

    /// If nobody is missing and the flag is clear, set it and return the tally.
    /// Otherwise leave the flag alone and return `None`.
    fn close_if_accounted(&self) -> Result<Option<Tally>, StoreError>;

    /// Replace the whole roster. All statuses start `Unset`, nobody is a
    /// counter, and the flag is cleared.
    fn replace_roster(&self, entries: &[RosterEntry]) -> Result<(), StoreError>;
}
