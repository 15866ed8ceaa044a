//! Roster parsing for bulk import.
//!
//! A roster is plain text, one rider per line: `first,last,phone`.
//! The whole file is validated before anything is written.

use std::collections::HashSet;
use std::fmt;

use crate::bot::member::Phone;

/// One validated roster line.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterEntry {
    pub first_name: String,
    pub last_name: String,
    pub phone: Phone,
}

#[derive(Debug, PartialEq)]
pub enum RosterError {
    /// Line does not have exactly three comma-separated fields.
    Malformed { line: usize, content: String },
    /// A name field is empty.
    MissingName { line: usize },
    /// Phone does not normalize to a canonical number.
    InvalidPhone { line: usize, phone: String },
    /// Same phone appears twice.
    DuplicatePhone { line: usize, phone: Phone },
    Empty,
}

impl fmt::Display for RosterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed { line, content } => {
                write!(f, "line {line}: expected 'first,last,phone', got '{content}'")
            }
            Self::MissingName { line } => write!(f, "line {line}: first and last name are required"),
            Self::InvalidPhone { line, phone } => write!(f, "line {line}: phone number {phone} invalid"),
            Self::DuplicatePhone { line, phone } => write!(f, "line {line}: phone number {phone} listed twice"),
            Self::Empty => write!(f, "roster has no entries"),
        }
    }
}

impl std::error::Error for RosterError {}

/// Parse and validate a roster. Blank lines are skipped.
pub fn parse_roster(text: &str) -> Result<Vec<RosterEntry>, RosterError> {
    let mut entries = Vec::new();
    let mut seen = HashSet::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        if raw.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = raw.split(',').map(str::trim).collect();
        let [first_name, last_name, phone] = fields.as_slice() else {
            return Err(RosterError::Malformed { line, content: raw.to_string() });
        };
        if first_name.is_empty() || last_name.is_empty() {
            return Err(RosterError::MissingName { line });
        }

        let phone = Phone::parse(phone)
            .ok_or_else(|| RosterError::InvalidPhone { line, phone: phone.to_string() })?;
        if !seen.insert(phone.clone()) {
            return Err(RosterError::DuplicatePhone { line, phone });
        }

        entries.push(RosterEntry {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            phone,
        });
    }

    if entries.is_empty() {
        return Err(RosterError::Empty);
    }
    Ok(entries)
}
