//! Looking up members by phone or by (possibly ambiguous) name.

use crate::bot::member::{Member, Phone};
use crate::bot::store::{Store, StoreError};

/// Which name stage produced an ambiguous match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameMatch {
    FirstName,
    FullName,
}

/// Outcome of resolving a selector typed by a user.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(Member),
    Ambiguous { candidates: Vec<Member>, matched_on: NameMatch },
    NotFound,
}

impl Resolution {
    /// Text sent back to the user when resolution did not pick one member.
    pub fn failure_message(&self) -> Option<String> {
        match self {
            Resolution::Resolved(_) => None,
            Resolution::Ambiguous { candidates, matched_on: NameMatch::FirstName } => {
                let names: Vec<String> = candidates.iter().map(Member::full_name).collect();
                Some(format!("Person ambiguous; did you mean one of: {}", names.join(", ")))
            }
            Resolution::Ambiguous { matched_on: NameMatch::FullName, .. } => Some(
                "There appear to be two people by that name in the database. \
                 Please use the person's phone number."
                    .to_string(),
            ),
            Resolution::NotFound => Some(
                "Sorry, I couldn't work out who you meant. I understand 10-digit phone numbers, \
                 first names, and first&last names."
                    .to_string(),
            ),
        }
    }
}

/// Read-only view over the roster.
pub struct Directory<'a> {
    store: &'a dyn Store,
}

impl<'a> Directory<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    pub fn lookup_by_phone(&self, phone: &Phone) -> Result<Option<Member>, StoreError> {
        self.store.member(phone)
    }

    /// Resolve a phone number, first name, or first and last name.
    pub fn resolve_selector(&self, selector: &str) -> Result<Resolution, StoreError> {
        let selector = selector.trim();

        if let Some(phone) = Phone::parse(selector)
            && let Some(member) = self.store.member(&phone)?
        {
            return Ok(Resolution::Resolved(member));
        }

        let mut by_first = self.store.members_by_first_name(selector)?;
        match by_first.len() {
            0 => {}
            1 => return Ok(Resolution::Resolved(by_first.remove(0))),
            _ => {
                return Ok(Resolution::Ambiguous {
                    candidates: by_first,
                    matched_on: NameMatch::FirstName,
                });
            }
        }

        // Middle words may belong to either name ("Mary Kate Smith",
        // "Vincent van Gogh"), so try every split point.
        let words: Vec<&str> = selector.split_whitespace().collect();
        for split in 0..=words.len() {
            let first = words[..split].join(" ");
            let last = words[split..].join(" ");
            let mut found = self.store.members_by_full_name(&first, &last)?;
            match found.len() {
                0 => continue,
                1 => return Ok(Resolution::Resolved(found.remove(0))),
                _ => {
                    return Ok(Resolution::Ambiguous {
                        candidates: found,
                        matched_on: NameMatch::FullName,
                    });
                }
            }
        }

        Ok(Resolution::NotFound)
    }

    /// First name alone, or "first last" when someone else shares the first name.
    pub fn display_name(&self, member: &Member) -> Result<String, StoreError> {
        let namesakes = self.store.members_by_first_name(&member.first_name)?;
        if namesakes.len() > 1 {
            Ok(member.full_name())
        } else {
            Ok(member.first_name.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::database::Database;
    use crate::bot::member::Status;

    fn add(db: &Database, phone: &str, first: &str, last: &str) {
        db.insert_member(&Member {
            phone: Phone::parse(phone).unwrap(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            status: Status::Unset,
            is_counter: false,
        })
        .unwrap();
    }

    fn resolved_phone(resolution: Resolution) -> String {
        match resolution {
            Resolution::Resolved(m) => m.phone.to_string(),
            other => panic!("expected a match, got {other:?}"),
        }
    }

    #[test]
    fn test_phone_selector_with_punctuation() {
        let db = Database::new().unwrap();
        add(&db, "5551234567", "Pat", "Jones");
        let dir = Directory::new(&db);

        for selector in ["5551234567", "(555) 123-4567", "+1 555.123.4567", "15551234567"] {
            assert_eq!(resolved_phone(dir.resolve_selector(selector).unwrap()), "+15551234567");
        }
    }

    #[test]
    fn test_unknown_phone_falls_through_to_not_found() {
        let db = Database::new().unwrap();
        add(&db, "5551234567", "Pat", "Jones");
        let dir = Directory::new(&db);
        assert_eq!(dir.resolve_selector("5559999999").unwrap(), Resolution::NotFound);
    }

    #[test]
    fn test_unique_first_name() {
        let db = Database::new().unwrap();
        add(&db, "5550000001", "Pat", "Jones");
        add(&db, "5550000002", "Sam", "Lee");
        let dir = Directory::new(&db);
        assert_eq!(resolved_phone(dir.resolve_selector("pat").unwrap()), "+15550000001");
    }

    #[test]
    fn test_shared_first_name_is_ambiguous() {
        let db = Database::new().unwrap();
        add(&db, "5550000001", "Pat", "Jones");
        add(&db, "5550000002", "Pat", "Jones");
        let dir = Directory::new(&db);

        let resolution = dir.resolve_selector("pat").unwrap();
        let Resolution::Ambiguous { candidates, matched_on } = &resolution else {
            panic!("expected ambiguity, got {resolution:?}");
        };
        assert_eq!(candidates.len(), 2);
        assert_eq!(*matched_on, NameMatch::FirstName);
        assert_eq!(
            resolution.failure_message().unwrap(),
            "Person ambiguous; did you mean one of: Pat Jones, Pat Jones"
        );
    }

    #[test]
    fn test_first_name_ambiguity_does_not_try_full_name() {
        let db = Database::new().unwrap();
        add(&db, "5550000001", "Pat", "Jones");
        add(&db, "5550000002", "Pat", "Smith");
        let dir = Directory::new(&db);

        // "pat" alone is ambiguous even though "pat jones" would be unique.
        assert!(matches!(dir.resolve_selector("pat").unwrap(), Resolution::Ambiguous { .. }));
        assert_eq!(resolved_phone(dir.resolve_selector("pat jones").unwrap()), "+15550000001");
    }

    #[test]
    fn test_multi_word_names_split_anywhere() {
        let db = Database::new().unwrap();
        add(&db, "5550000001", "Mary Kate", "Smith");
        add(&db, "5550000002", "Vincent", "van Gogh");
        let dir = Directory::new(&db);

        assert_eq!(resolved_phone(dir.resolve_selector("mary kate smith").unwrap()), "+15550000001");
        assert_eq!(resolved_phone(dir.resolve_selector("Vincent Van Gogh").unwrap()), "+15550000002");
    }

    #[test]
    fn test_full_name_duplicates_are_ambiguous() {
        let db = Database::new().unwrap();
        add(&db, "5550000001", "Mary Kate", "Smith");
        add(&db, "5550000002", "Mary Kate", "Smith");
        let dir = Directory::new(&db);

        let resolution = dir.resolve_selector("mary kate smith").unwrap();
        assert!(matches!(
            resolution,
            Resolution::Ambiguous { matched_on: NameMatch::FullName, .. }
        ));
        assert!(resolution.failure_message().unwrap().contains("phone number"));
    }

    #[test]
    fn test_not_found_message_names_accepted_forms() {
        let db = Database::new().unwrap();
        add(&db, "5550000001", "Pat", "Jones");
        let dir = Directory::new(&db);

        let resolution = dir.resolve_selector("nobody here").unwrap();
        assert_eq!(resolution, Resolution::NotFound);
        let msg = resolution.failure_message().unwrap();
        assert!(msg.contains("phone numbers"));
        assert!(msg.contains("first names"));
        assert!(msg.contains("first&last names"));
    }

    #[test]
    fn test_display_name() {
        let db = Database::new().unwrap();
        add(&db, "5550000001", "Pat", "Jones");
        add(&db, "5550000002", "Sam", "Lee");
        let dir = Directory::new(&db);

        let pat = db.member(&Phone::parse("5550000001").unwrap()).unwrap().unwrap();
        assert_eq!(dir.display_name(&pat).unwrap(), "Pat");

        // Recomputed on every call.
        add(&db, "5550000003", "Pat", "Smith");
        assert_eq!(dir.display_name(&pat).unwrap(), "Pat Jones");
    }
}
