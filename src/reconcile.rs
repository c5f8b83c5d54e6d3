//! Optimistic mutations over an ordered collection
//!
//! A write goes through three steps:
//!
//! 1. `begin_*` changes the local collection right away (entity marked
//!    `loading`) and hands back a [`Ticket`] holding what is needed to undo it.
//! 2. The caller sends the request.
//! 3. [`commit`]/[`confirm`] adopt the server's answer, or [`rollback`] undoes
//!    the local change and tells the user.
//!
//! Only one mutation per entity may be in flight; `begin_edit` refuses an
//! entity that is still loading.

use rand::Rng;

use crate::api::ApiError;
use crate::debug::{self, cat};
use crate::notify::{Flavour, Notifier};

const TEMP_PREFIX: &str = "tmp-";

/// Anything the reconciler can track.
pub trait Entity: Clone {
    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
    fn is_loading(&self) -> bool;
    fn set_loading(&mut self, loading: bool);
}

/// Client-side placeholder id for an entity the server has not seen yet.
///
/// Server ids are uuids; the `tmp-` prefix keeps the two spaces apart.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TempId(String);

impl TempId {
    pub fn generate() -> Self {
        let n: u64 = rand::thread_rng().gen();
        TempId(format!("{TEMP_PREFIX}{n:016x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_temp(id: &str) -> bool {
        id.starts_with(TEMP_PREFIX)
    }
}

impl std::fmt::Display for TempId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// State needed to undo an optimistic change.
#[derive(Clone, Debug, PartialEq)]
pub enum Snapshot<E> {
    Edit { prior: E },
    Create { temp_id: TempId },
}

/// Handle for one in-flight mutation.
#[must_use = "a ticket must be committed, confirmed or rolled back"]
#[derive(Clone, Debug, PartialEq)]
pub struct Ticket<E> {
    key: String,
    snapshot: Snapshot<E>,
}

impl<E> Ticket<E> {
    /// Id the optimistic entity is currently stored under.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn snapshot(&self) -> &Snapshot<E> {
        &self.snapshot
    }

    pub fn is_create(&self) -> bool {
        matches!(self.snapshot, Snapshot::Create { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MutationError {
    #[error("{0} already has a change in flight")]
    Busy(String),
    #[error("{0} is not in the list")]
    NotFound(String),
    #[error("{0} has no content to restore")]
    NothingToRestore(String),
}

fn position<E: Entity>(items: &[E], id: &str) -> Option<usize> {
    items.iter().position(|e| e.id() == id)
}

/// Apply `change` to the entity with `id` and mark it loading.
pub fn begin_edit<E: Entity>(
    items: &mut [E],
    id: &str,
    change: impl FnOnce(&mut E),
) -> Result<Ticket<E>, MutationError> {
    let idx = position(items, id).ok_or_else(|| MutationError::NotFound(id.to_string()))?;
    let entity = &mut items[idx];
    if entity.is_loading() {
        return Err(MutationError::Busy(id.to_string()));
    }
    let prior = entity.clone();
    change(&mut *entity);
    entity.set_loading(true);
    debug::log(cat::SYNC, format!("begin edit {id}"));
    Ok(Ticket {
        key: id.to_string(),
        snapshot: Snapshot::Edit { prior },
    })
}

/// Append `draft` under a fresh temporary id, marked loading.
pub fn begin_create<E: Entity>(items: &mut Vec<E>, mut draft: E) -> Ticket<E> {
    let temp_id = TempId::generate();
    draft.set_id(temp_id.as_str().to_string());
    draft.set_loading(true);
    items.push(draft);
    debug::log(cat::SYNC, format!("begin create {temp_id}"));
    Ticket {
        key: temp_id.as_str().to_string(),
        snapshot: Snapshot::Create { temp_id },
    }
}

/// Replace the optimistic entity with the server's copy (re-keyed for creates).
pub fn commit<E: Entity>(items: &mut [E], ticket: Ticket<E>, mut server: E) -> Result<(), MutationError> {
    let idx = position(items, &ticket.key).ok_or_else(|| {
        log::warn!("[sync] commit for missing entity {}", ticket.key);
        MutationError::NotFound(ticket.key.clone())
    })?;
    server.set_loading(false);
    debug::log(cat::SYNC, format!("commit {} as {}", ticket.key, server.id()));
    items[idx] = server;
    Ok(())
}

/// Keep the optimistic values and clear `loading` (request had no body).
pub fn confirm<E: Entity>(items: &mut [E], ticket: Ticket<E>) -> Result<(), MutationError> {
    let idx = position(items, &ticket.key).ok_or_else(|| MutationError::NotFound(ticket.key.clone()))?;
    items[idx].set_loading(false);
    debug::log(cat::SYNC, format!("confirm {}", ticket.key));
    Ok(())
}

/// Undo the optimistic change and surface `message` to the user.
pub fn rollback<E: Entity>(
    items: &mut Vec<E>,
    ticket: Ticket<E>,
    notifier: &mut dyn Notifier,
    message: &str,
) {
    let idx = position(items, &ticket.key);
    match (ticket.snapshot, idx) {
        (Snapshot::Edit { mut prior }, Some(i)) => {
            prior.set_loading(false);
            items[i] = prior;
        }
        (Snapshot::Create { .. }, Some(i)) => {
            items.remove(i);
        }
        (_, None) => log::warn!("[sync] rollback for missing entity {}", ticket.key),
    }
    debug::log(cat::SYNC, format!("rollback {}", ticket.key));
    notifier.notify(message, Flavour::Error);
}

/// Finish a mutation from the request outcome.
///
/// `Ok(Some(_))` commits the server copy, `Ok(None)` confirms the optimistic
/// values when `body_optional` (deletes), and anything else rolls back.
pub fn settle<E: Entity>(
    items: &mut Vec<E>,
    ticket: Ticket<E>,
    outcome: Result<Option<E>, ApiError>,
    body_optional: bool,
    notifier: &mut dyn Notifier,
    message: &str,
) -> bool {
    match outcome {
        Ok(Some(server)) => commit(items, ticket, server).is_ok(),
        Ok(None) if body_optional => confirm(items, ticket).is_ok(),
        Ok(None) => {
            log::error!("[sync] {} succeeded without a body", ticket.key);
            rollback(items, ticket, notifier, message);
            false
        }
        Err(e) => {
            log::error!("[sync] {} failed: {e}", ticket.key);
            rollback(items, ticket, notifier, message);
            false
        }
    }
}
