//! Members, their phone keys and attendance statuses.

use std::fmt;

/// Country code prepended to ten-digit national numbers.
pub const COUNTRY_CODE: &str = "1";

/// Digits in a national number (without the country code).
const NATIONAL_DIGITS: usize = 10;

/// Canonical phone number, e.g. `+15551234567`.
///
/// This is the only unique key for a member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Phone(String);

impl Phone {
    /// Normalize free text into a canonical phone number.
    ///
    /// Punctuation and whitespace are ignored. What remains must be digits:
    /// either a ten-digit national number or the same number preceded by the
    /// country code.
    pub fn parse(text: &str) -> Option<Self> {
        let mut digits = String::with_capacity(text.len());
        for c in text.chars() {
            if c.is_ascii_punctuation() || c.is_whitespace() {
                continue;
            }
            if !c.is_ascii_digit() {
                return None;
            }
            digits.push(c);
        }

        let national = if digits.len() == NATIONAL_DIGITS {
            digits.as_str()
        } else if digits.len() == NATIONAL_DIGITS + COUNTRY_CODE.len() {
            digits.strip_prefix(COUNTRY_CODE)?
        } else {
            return None;
        };

        Some(Self(format!("+{COUNTRY_CODE}{national}")))
    }

    /// Wrap a value already stored in canonical form.
    pub(crate) fn from_canonical(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Attendance status of a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Unset,
    In,
    Out,
    Absent,
    Wait,
}

impl Status {
    /// Statuses a member may set for themselves or for someone else.
    pub const SETTABLE: [Status; 4] = [Status::In, Status::Out, Status::Absent, Status::Wait];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Unset => "UNSET",
            Status::In => "IN",
            Status::Out => "OUT",
            Status::Absent => "ABSENT",
            Status::Wait => "WAIT",
        }
    }

    /// Parse a stored column value. Unknown values read as `Unset`.
    pub(crate) fn from_column(s: &str) -> Self {
        match s {
            "IN" => Status::In,
            "OUT" => Status::Out,
            "ABSENT" => Status::Absent,
            "WAIT" => Status::Wait,
            _ => Status::Unset,
        }
    }

    /// Parse a status word typed by a user (case-insensitive).
    /// `UNSET` is not something anyone can mark.
    pub fn from_word(word: &str) -> Option<Self> {
        Self::SETTABLE
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(word.trim()))
    }

    /// Whether this member counts as accounted for.
    pub fn is_accounted(&self) -> bool {
        matches!(self, Status::In | Status::Absent)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rider on the roster.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub phone: Phone,
    pub first_name: String,
    pub last_name: String,
    pub status: Status,
    pub is_counter: bool,
}

impl Member {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
