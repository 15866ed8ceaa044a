//! Turning notices into concrete outbound messages.
//!
//! Handlers never send directly. They queue notices on an [`Outbox`], which
//! expands audiences into phone numbers at queue time; the webhook delivers
//! the outbox once the command is done.

use tracing::debug;

use crate::bot::member::Phone;
use crate::bot::store::{Store, StoreError};

/// Who a notice is for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    Member(Phone),
    /// Every member with the counter flag.
    Counters,
    Everyone,
}

/// A message addressed to an audience rather than to phones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub audience: Audience,
    pub text: String,
}

impl Notice {
    pub fn counters(text: impl Into<String>) -> Self {
        Self { audience: Audience::Counters, text: text.into() }
    }

    pub fn everyone(text: impl Into<String>) -> Self {
        Self { audience: Audience::Everyone, text: text.into() }
    }

    pub fn member(phone: &Phone, text: impl Into<String>) -> Self {
        Self { audience: Audience::Member(phone.clone()), text: text.into() }
    }
}

/// One SMS to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub to: Phone,
    pub text: String,
}

/// Messages queued while handling one inbound delivery, in send order.
#[derive(Debug, Default)]
pub struct Outbox {
    messages: Vec<Outbound>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, to: &Phone, text: impl Into<String>) {
        self.messages.push(Outbound { to: to.clone(), text: text.into() });
    }

    /// Queue a notice for everyone in its audience.
    pub fn notify(&mut self, store: &dyn Store, notice: Notice) -> Result<(), StoreError> {
        let Notice { audience, text } = notice;
        let recipients = match audience {
            Audience::Member(phone) => vec![phone],
            Audience::Counters => store.counters()?.into_iter().map(|m| m.phone).collect(),
            Audience::Everyone => store.members()?.into_iter().map(|m| m.phone).collect(),
        };
        debug!("Fan-out to {} recipient(s): {}", recipients.len(), text);
        for phone in recipients {
            self.messages.push(Outbound { to: phone, text: text.clone() });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[Outbound] {
        &self.messages
    }

    /// Texts queued for one phone, in order.
    pub fn texts_for(&self, phone: &Phone) -> Vec<&str> {
        self.messages
            .iter()
            .filter(|m| &m.to == phone)
            .map(|m| m.text.as_str())
            .collect()
    }
}

impl IntoIterator for Outbox {
    type Item = Outbound;
    type IntoIter = std::vec::IntoIter<Outbound>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.into_iter()
    }
}
