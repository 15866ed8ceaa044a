//! Command table and handlers.
//!
//! Every verb maps to one [`Command`]: who may run it and a handler tagged
//! by the arguments it needs. Handlers return an optional reply for the
//! sender; anything else they want said goes on the session's outbox.

use std::sync::LazyLock;

use regex::Regex;
use tracing::info;

use crate::bot::attendance;
use crate::bot::directory::{Directory, Resolution};
use crate::bot::fanout::{Notice, Outbox};
use crate::bot::member::{Member, Phone, Status};
use crate::bot::store::{Store, StoreError};

/// Reply text for the sender, if any.
pub type Reply = Option<String>;

type MemberFn = fn(&mut Session<'_>, &Member) -> Result<Reply, StoreError>;
type BodyFn = fn(&mut Session<'_>, &Member, &str) -> Result<Reply, StoreError>;

/// Interpreter-wide settings handlers can see.
#[derive(Debug, Clone)]
pub struct Settings {
    pub superuser: Phone,
    pub help_url: Option<String>,
    /// LIST names missing people only up to this many.
    pub list_limit: usize,
}

impl Settings {
    pub fn is_superuser(&self, member: &Member) -> bool {
        member.phone == self.superuser
    }

    /// The superuser can act as a counter without getting counter broadcasts.
    pub fn has_counter_privileges(&self, member: &Member) -> bool {
        member.is_counter || self.is_superuser(member)
    }
}

/// Everything a handler may touch while processing one message.
pub struct Session<'a> {
    pub store: &'a dyn Store,
    pub settings: &'a Settings,
    pub outbox: &'a mut Outbox,
}

impl<'a> Session<'a> {
    fn directory(&self) -> Directory<'a> {
        Directory::new(self.store)
    }

    fn notify(&mut self, notice: Notice) -> Result<(), StoreError> {
        self.outbox.notify(self.store, notice)
    }
}

/// Who may run a command. Refusals carry their reply text.
#[derive(Debug, Clone, Copy)]
pub enum Access {
    Anyone,
    Counter(&'static str),
    Superuser(&'static str),
}

/// Handler shapes.
#[derive(Clone, Copy)]
pub enum Handler {
    /// Needs only the acting member.
    Member(MemberFn),
    /// Also parses its own arguments from the raw message body.
    WithBody(BodyFn),
}

pub struct Command {
    pub verb: &'static str,
    pub access: Access,
    pub handler: Handler,
}

pub const COMMANDS: &[Command] = &[
    Command { verb: "COMMANDS", access: Access::Anyone, handler: Handler::Member(show_commands) },
    Command { verb: "IN", access: Access::Anyone, handler: Handler::Member(mark_in) },
    Command { verb: "OUT", access: Access::Anyone, handler: Handler::Member(mark_out) },
    Command { verb: "ABSENT", access: Access::Anyone, handler: Handler::Member(mark_absent) },
    Command { verb: "WAIT", access: Access::Anyone, handler: Handler::Member(mark_wait) },
    Command { verb: "STATUS", access: Access::Anyone, handler: Handler::Member(show_status) },
    Command { verb: "WHOAMI", access: Access::Anyone, handler: Handler::Member(whoami) },
    Command {
        verb: "RESET",
        access: Access::Counter("Only bus counters can reset the count."),
        handler: Handler::Member(soft_reset),
    },
    Command {
        verb: "HARDRESET",
        access: Access::Counter("Only bus counters can reset the count."),
        handler: Handler::Member(hard_reset),
    },
    Command {
        verb: "LIST",
        access: Access::Counter("Only bus counters can see who's missing."),
        handler: Handler::Member(list_missing),
    },
    Command {
        verb: "PING",
        access: Access::Counter("Only bus counters can ping missing people."),
        handler: Handler::Member(ping_missing),
    },
    Command {
        verb: "NOTRIDING",
        access: Access::Counter("Only bus counters can list absent people."),
        handler: Handler::Member(show_absent),
    },
    Command { verb: "MARK", access: Access::Anyone, handler: Handler::WithBody(mark_other) },
    Command { verb: "WHOIS", access: Access::Anyone, handler: Handler::WithBody(whois) },
    Command {
        verb: "WALL",
        access: Access::Superuser("Only the superuser may use WALL (send message to all users)."),
        handler: Handler::WithBody(wall),
    },
    Command {
        verb: "PROMOTE",
        access: Access::Superuser("Only the superuser may use PROMOTE."),
        handler: Handler::WithBody(promote),
    },
    Command {
        verb: "DEMOTE",
        access: Access::Superuser("Only the superuser may use DEMOTE."),
        handler: Handler::WithBody(demote),
    },
];

/// Find a command by its (already uppercased) verb.
pub fn find(verb: &str) -> Option<&'static Command> {
    COMMANDS.iter().find(|c| c.verb == verb)
}

impl Command {
    /// Check access, then run the handler.
    pub fn run(&self, session: &mut Session<'_>, member: &Member, body: &str) -> Result<Reply, StoreError> {
        let refusal = match self.access {
            Access::Anyone => None,
            Access::Counter(msg) if !session.settings.has_counter_privileges(member) => Some(msg),
            Access::Superuser(msg) if !session.settings.is_superuser(member) => Some(msg),
            Access::Counter(_) | Access::Superuser(_) => None,
        };
        if let Some(msg) = refusal {
            info!("Refused {} for {}", self.verb, member.phone);
            return Ok(Some(msg.to_string()));
        }

        match self.handler {
            Handler::Member(f) => f(session, member),
            Handler::WithBody(f) => f(session, member, body),
        }
    }
}

/// Text after the verb, trimmed.
fn argument(body: &str) -> &str {
    body.trim()
        .split_once(char::is_whitespace)
        .map(|(_, rest)| rest.trim())
        .unwrap_or("")
}

/// Help listing the commands `member` may use.
pub fn help(settings: &Settings, member: &Member, was_failure: bool) -> String {
    let mut text = String::new();
    if was_failure {
        text.push_str("***Invalid command.*** ");
    }
    text.push_str(
        "Mark status as: IN, OUT, WAIT, ABSENT; otherwise STATUS, WHOIS [user], WHOAMI, MARK [user] AS [status]. ",
    );
    if settings.has_counter_privileges(member) {
        text.push_str("Bus counters: LIST, PING, NOTRIDING, RESET, HARDRESET. ");
    }
    if settings.is_superuser(member) {
        text.push_str("Superuser: WALL, PROMOTE, DEMOTE. ");
    }
    if let Some(ref url) = settings.help_url {
        text.push_str(&format!("Full help: {url}"));
    }
    text.trim_end().to_string()
}

/// One-line profile used by WHOAMI and WHOIS.
pub fn profile(settings: &Settings, member: &Member) -> String {
    let mut text = format!(
        "FN {} - LN {} - PHONE {} - STATUS {}",
        member.first_name, member.last_name, member.phone, member.status
    );
    if member.is_counter {
        text.push_str(" - BUS COUNTER");
    }
    if settings.is_superuser(member) {
        text.push_str(" - SUPERUSER");
    }
    text
}

// ==================== EVERYONE ====================

fn show_commands(session: &mut Session<'_>, member: &Member) -> Result<Reply, StoreError> {
    Ok(Some(help(session.settings, member, false)))
}

fn set_own_status(session: &mut Session<'_>, member: &Member, to: Status) -> Result<Reply, StoreError> {
    attendance::apply(session.store, member, to, session.outbox)?;
    if to == Status::Out {
        return Ok(Some("You have been marked as OUT and may safely step off the bus.".to_string()));
    }
    Ok(None)
}

fn mark_in(session: &mut Session<'_>, member: &Member) -> Result<Reply, StoreError> {
    set_own_status(session, member, Status::In)
}

fn mark_out(session: &mut Session<'_>, member: &Member) -> Result<Reply, StoreError> {
    set_own_status(session, member, Status::Out)
}

fn mark_absent(session: &mut Session<'_>, member: &Member) -> Result<Reply, StoreError> {
    set_own_status(session, member, Status::Absent)
}

fn mark_wait(session: &mut Session<'_>, member: &Member) -> Result<Reply, StoreError> {
    set_own_status(session, member, Status::Wait)
}

fn show_status(_session: &mut Session<'_>, member: &Member) -> Result<Reply, StoreError> {
    let text = match member.status {
        Status::Unset => "You have not yet checked in. Reply IN, WAIT, or ABSENT to set your status.".to_string(),
        status => format!("You are currently marked as {status}. Reply IN, OUT, WAIT, or ABSENT to change."),
    };
    Ok(Some(text))
}

fn whoami(session: &mut Session<'_>, member: &Member) -> Result<Reply, StoreError> {
    Ok(Some(profile(session.settings, member)))
}

static MARK_ARGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)^(?P<who>.+?)\s+as\s+(?P<status>.+?)\s*$").unwrap());

const MARK_USAGE: &str = "Sorry, I'm not sure what you meant. Use MARK user AS status, \
                          where user is a phone, first name, or first&last name.";

fn mark_other(session: &mut Session<'_>, member: &Member, body: &str) -> Result<Reply, StoreError> {
    let Some(caps) = MARK_ARGS.captures(argument(body)) else {
        return Ok(Some(MARK_USAGE.to_string()));
    };
    let (who, word) = (&caps["who"], &caps["status"]);

    let target = match session.directory().resolve_selector(who)? {
        Resolution::Resolved(target) => target,
        unresolved => return Ok(unresolved.failure_message()),
    };
    let Some(status) = Status::from_word(word) else {
        return Ok(Some("You may only mark someone as IN, OUT, ABSENT, or WAIT.".to_string()));
    };

    attendance::apply(session.store, &target, status, session.outbox)?;

    let directory = session.directory();
    let setter = directory.display_name(member)?;
    let settee = directory.display_name(&target)?;
    info!("{} marked {} as {}", setter, settee, status);
    session.notify(Notice::member(&target.phone, format!("Notice: {setter} marked you as {status}.")))?;

    if status == Status::Out {
        return Ok(Some(format!("{settee} has been marked as OUT and may safely step off the bus.")));
    }
    Ok(None)
}

const SELECTOR_HELP: &str = "where user is a phone number, first name, or first&last name.";

fn whois(session: &mut Session<'_>, _member: &Member, body: &str) -> Result<Reply, StoreError> {
    let selector = argument(body);
    if selector.is_empty() {
        return Ok(Some(format!("Usage: WHOIS [user], {SELECTOR_HELP}")));
    }
    match session.directory().resolve_selector(selector)? {
        Resolution::Resolved(target) => Ok(Some(profile(session.settings, &target))),
        unresolved => Ok(unresolved.failure_message()),
    }
}

// ==================== COUNTERS ====================

fn soft_reset(session: &mut Session<'_>, _member: &Member) -> Result<Reply, StoreError> {
    attendance::reset(session.store)?;
    session.notify(Notice::counters("Bus counts have been reset."))?;
    Ok(None)
}

fn hard_reset(session: &mut Session<'_>, _member: &Member) -> Result<Reply, StoreError> {
    attendance::reset(session.store)?;
    session.notify(Notice::everyone(
        "Sorry, we got mixed up! If you checked in already, please do so again.",
    ))?;
    session.notify(Notice::counters("Bus counts have been hard-reset. Be more careful next time!"))?;
    Ok(None)
}

fn list_missing(session: &mut Session<'_>, _member: &Member) -> Result<Reply, StoreError> {
    let missing = attendance::missing(session.store)?;
    let limit = session.settings.list_limit;

    let text = if missing.is_empty() {
        "Everyone is marked as on the bus or not riding.".to_string()
    } else if missing.len() > limit {
        format!(
            "{} people are still missing. (When {limit} or fewer are missing, they will be listed by name.)",
            missing.len()
        )
    } else {
        missing
            .iter()
            .map(|(name, m)| format!("{name} - {}", m.status))
            .collect::<Vec<_>>()
            .join("; ")
    };
    Ok(Some(text))
}

const PING_TEXT: &str = "Hey, the bus counters are looking for you! Please reply IN (I'm on the bus and \
                         forgot to check in), WAIT (I'm on my way), or ABSENT (I'm not riding the bus).";

fn ping_missing(session: &mut Session<'_>, _member: &Member) -> Result<Reply, StoreError> {
    let missing = session.store.missing_members()?;
    if missing.is_empty() {
        return Ok(Some("Everybody is marked as on the bus or not riding!".to_string()));
    }

    session.notify(Notice::counters(format!("Ping sent to all {} missing people.", missing.len())))?;
    for m in &missing {
        session.outbox.push(&m.phone, PING_TEXT);
    }
    Ok(None)
}

fn show_absent(session: &mut Session<'_>, _member: &Member) -> Result<Reply, StoreError> {
    let directory = session.directory();
    let names = session
        .store
        .members_with_status(Status::Absent)?
        .iter()
        .map(|m| directory.display_name(m))
        .collect::<Result<Vec<_>, _>>()?;

    if names.is_empty() {
        Ok(Some("Nobody is currently marked as absent.".to_string()))
    } else {
        Ok(Some(format!("Absent: {}", names.join(", "))))
    }
}

// ==================== SUPERUSER ====================

fn wall(session: &mut Session<'_>, _member: &Member, body: &str) -> Result<Reply, StoreError> {
    let text = argument(body);
    if text.is_empty() {
        return Ok(Some("Usage: WALL [message]".to_string()));
    }
    session.notify(Notice::everyone(text))?;
    Ok(None)
}

fn promote(session: &mut Session<'_>, _member: &Member, body: &str) -> Result<Reply, StoreError> {
    set_counter_flag(session, body, true)
}

fn demote(session: &mut Session<'_>, _member: &Member, body: &str) -> Result<Reply, StoreError> {
    set_counter_flag(session, body, false)
}

fn set_counter_flag(session: &mut Session<'_>, body: &str, is_counter: bool) -> Result<Reply, StoreError> {
    let selector = argument(body);
    if selector.is_empty() {
        return Ok(Some(format!("Usage: PROMOTE/DEMOTE [user], {SELECTOR_HELP}")));
    }
    let target = match session.directory().resolve_selector(selector)? {
        Resolution::Resolved(target) => target,
        unresolved => return Ok(unresolved.failure_message()),
    };

    session.store.set_counter(&target.phone, is_counter)?;
    info!("Counter flag for {} set to {}", target.phone, is_counter);

    let text = if is_counter {
        "You are now a bus counter."
    } else {
        "You are no longer a bus counter."
    };
    session.notify(Notice::member(&target.phone, text))?;
    Ok(None)
}
