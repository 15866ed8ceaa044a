//! Command interpreter - turns one inbound SMS into state changes and an outbox.

use std::sync::Arc;

use tracing::{error, info};

use crate::bot::attendance;
use crate::bot::commands::{self, Reply, Session, Settings};
use crate::bot::directory::Directory;
use crate::bot::fanout::Outbox;
use crate::bot::member::{Member, Phone};
use crate::bot::store::{Store, StoreError};

/// An SMS as delivered by the webhook.
#[derive(Debug, Clone)]
pub struct Inbound {
    pub from: String,
    pub body: String,
}

/// How the delivery should be acknowledged to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    /// Processed normally.
    Accepted,
    /// Sender is not on the roster; nothing was done.
    UnknownSender,
    /// Something broke; the sender and superuser have been told.
    Failed,
}

impl Ack {
    pub fn as_str(&self) -> &'static str {
        match self {
            Ack::Accepted => "success",
            Ack::UnknownSender => "phone not in our database",
            Ack::Failed => "error",
        }
    }
}

/// Result of handling one inbound message.
#[derive(Debug)]
pub struct Receipt {
    pub ack: Ack,
    pub outbox: Outbox,
}

/// The interpreter. Cheap to share; all state lives in the store.
pub struct Engine {
    store: Arc<dyn Store>,
    settings: Settings,
}

impl Engine {
    pub fn new(store: Arc<dyn Store>, settings: Settings) -> Self {
        Self { store, settings }
    }

    /// Handle an inbound message. Never fails: internal errors are turned
    /// into an apology for the sender and an alert for the superuser.
    pub fn handle(&self, msg: &Inbound) -> Receipt {
        info!("<~~ {} :: {}", msg.from, msg.body);

        let sender = match self.lookup_sender(&msg.from) {
            Ok(Some(member)) => member,
            Ok(None) => {
                info!("Phone number {} was not in database, message rejected.", msg.from);
                return Receipt { ack: Ack::UnknownSender, outbox: Outbox::new() };
            }
            Err(e) => return self.failure(&msg.from, &msg.body, e, Outbox::new()),
        };

        let mut outbox = Outbox::new();
        match self.process(&sender, msg.body.trim(), &mut outbox) {
            Ok(()) => Receipt { ack: Ack::Accepted, outbox },
            Err(e) => self.failure(&msg.from, &msg.body, e, outbox),
        }
    }

    fn lookup_sender(&self, from: &str) -> Result<Option<Member>, StoreError> {
        match Phone::parse(from) {
            Some(phone) => Directory::new(self.store.as_ref()).lookup_by_phone(&phone),
            None => Ok(None),
        }
    }

    fn process(&self, sender: &Member, body: &str, outbox: &mut Outbox) -> Result<(), StoreError> {
        let verb = body.split_whitespace().next().unwrap_or("").to_ascii_uppercase();
        let store = self.store.as_ref();

        let reply: Reply = {
            let mut session = Session { store, settings: &self.settings, outbox: &mut *outbox };
            match commands::find(&verb) {
                Some(command) => command.run(&mut session, sender, body)?,
                None => Some(commands::help(&self.settings, sender, true)),
            }
        };

        if let Some(text) = reply {
            outbox.push(&sender.phone, text);
        }

        attendance::recheck(store, outbox)?;
        Ok(())
    }

    fn failure(&self, from: &str, body: &str, err: StoreError, mut outbox: Outbox) -> Receipt {
        error!("Error handling message from {from} ({body:?}): {err}");

        // Store calls commit individually: whatever is queued already happened.
        outbox.push(&self.settings.superuser, format!("Error thrown in request from {from}."));
        if let Some(phone) = Phone::parse(from) {
            outbox.push(
                &phone,
                "Sorry, I goofed! Your request was not completed. This error has been logged.",
            );
        }
        Receipt { ack: Ack::Failed, outbox }
    }
}
