//! Attendance state machine.
//!
//! Any settable status may follow any other. What a transition *means* for
//! everyone else is decided by [`transition`], which is pure; [`apply`]
//! persists the status and queues the resulting notices.
//!
//! The trip-wide "fully accounted" flag is only ever set by [`recheck`], which
//! re-derives it from the roster inside a single store transaction.

use tracing::info;

use crate::bot::directory::Directory;
use crate::bot::fanout::{Notice, Outbox};
use crate::bot::member::{Member, Status};
use crate::bot::store::{Store, StoreError, Tally};

/// Whether moving to `to` clears the fully-accounted flag.
pub fn clears_accounted(to: Status) -> bool {
    matches!(to, Status::Out | Status::Wait)
}

/// Notices required when a member named `name` moves to `to`.
///
/// `was_accounted` is the flag as it stood just before the move.
pub fn transition(to: Status, was_accounted: bool, name: &str) -> Vec<Notice> {
    match to {
        Status::Out if was_accounted => vec![Notice::counters(format!(
            "WARNING: {name} marked themselves OUT. Don't leave yet!"
        ))],
        Status::Wait => vec![Notice::counters(format!("{name} is on their way, please hold the bus!"))],
        Status::Unset | Status::In | Status::Out | Status::Absent => Vec::new(),
    }
}

impl Tally {
    pub fn summary(&self) -> String {
        format!(
            "Everyone is now marked as IN or ABSENT. {} total people, {} NOTRIDING. Head count should be {}.",
            self.total, self.absent, self.riding
        )
    }
}

/// Move `member` to `to` and queue whatever the move requires.
pub fn apply(store: &dyn Store, member: &Member, to: Status, outbox: &mut Outbox) -> Result<(), StoreError> {
    let name = Directory::new(store).display_name(member)?;
    let was_accounted = store.record_status(&member.phone, to, clears_accounted(to))?;
    info!("Marked {} as {}", name, to);

    for notice in transition(to, was_accounted, &name) {
        outbox.notify(store, notice)?;
    }
    Ok(())
}

/// Set the flag and tell the counters if nobody is missing any more.
///
/// Safe to call after every command: once the flag is set it stays set
/// until a transition clears it, so the summary goes out once per cycle.
pub fn recheck(store: &dyn Store, outbox: &mut Outbox) -> Result<bool, StoreError> {
    match store.close_if_accounted()? {
        Some(tally) => {
            info!("Everyone accounted for: {:?}", tally);
            outbox.notify(store, Notice::counters(tally.summary()))?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Clear every status and the flag.
pub fn reset(store: &dyn Store) -> Result<(), StoreError> {
    store.reset_statuses()?;
    info!("Statuses reset");
    Ok(())
}

/// Missing members with their display names.
pub fn missing(store: &dyn Store) -> Result<Vec<(String, Member)>, StoreError> {
    let directory = Directory::new(store);
    store
        .missing_members()?
        .into_iter()
        .map(|m| -> Result<_, StoreError> { Ok((directory.display_name(&m)?, m)) })
        .collect()
}
