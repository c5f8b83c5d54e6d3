//! Comments screen: models, composer reducer, and the optimistic comment/reply flows.
//!
//! Every write is split in three so UI code can release its borrow while the
//! request is in flight:
//!
//! ```text
//! let pending = screen.begin_edit_comment(uuid, text)?;   // local change, loading
//! let outcome = pending.send(&api).await;                 // network
//! screen.finish(pending, outcome);                        // commit or roll back
//! ```
//!
//! `finish` does nothing once the screen's [`Liveness`] has been torn down.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{ApiError, CommentsApi};
use crate::debug::{self, cat};
use crate::notify::{Flavour, InfoModal, Notifier};
use crate::reconcile::{self, Entity, MutationError, TempId, Ticket};
use crate::util::liveness::Liveness;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Commenter {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

/// One earlier revision of a comment or reply.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Edit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default = "Utc::now")]
    pub time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub uuid: String,
    #[serde(default, alias = "content", skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(alias = "created_at")]
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub edits: Vec<Edit>,
    #[serde(default)]
    pub by_commenter: bool,
    #[serde(default)]
    pub deleted: bool,
    #[serde(skip)]
    pub loading: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub uuid: String,
    #[serde(default, alias = "content", skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(alias = "created_at")]
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub commenter: Commenter,
    #[serde(default)]
    pub edits: Vec<Edit>,
    #[serde(default)]
    pub replies: Vec<Reply>,
    #[serde(default)]
    pub can_edit: bool,
    #[serde(default)]
    pub deleted: bool,
    #[serde(skip)]
    pub loading: bool,
}

impl Reply {
    pub fn draft(text: &str) -> Self {
        Self {
            uuid: String::new(),
            text: Some(text.to_string()),
            time: Utc::now(),
            edits: Vec::new(),
            by_commenter: false,
            deleted: false,
            loading: false,
        }
    }

    /// A server copy must carry a real id, and text unless it is deleted.
    pub fn is_well_formed(&self) -> bool {
        well_formed(&self.uuid, self.text.as_deref(), self.deleted)
    }
}

impl Comment {
    pub fn draft(text: &str, commenter: Commenter) -> Self {
        Self {
            uuid: String::new(),
            text: Some(text.to_string()),
            time: Utc::now(),
            commenter,
            edits: Vec::new(),
            replies: Vec::new(),
            can_edit: true,
            deleted: false,
            loading: false,
        }
    }

    pub fn reply(&self, uuid: &str) -> Option<&Reply> {
        self.replies.iter().find(|r| r.uuid == uuid)
    }

    pub fn is_well_formed(&self) -> bool {
        well_formed(&self.uuid, self.text.as_deref(), self.deleted)
            && self.replies.iter().all(Reply::is_well_formed)
    }
}

fn well_formed(uuid: &str, text: Option<&str>, deleted: bool) -> bool {
    !uuid.is_empty() && !TempId::is_temp(uuid) && (deleted || text.is_some())
}

macro_rules! uuid_entity {
    ($ty:ty) => {
        impl Entity for $ty {
            fn id(&self) -> &str {
                &self.uuid
            }
            fn set_id(&mut self, id: String) {
                self.uuid = id;
            }
            fn is_loading(&self) -> bool {
                self.loading
            }
            fn set_loading(&mut self, loading: bool) {
                self.loading = loading;
            }
        }
    };
}

uuid_entity!(Comment);
uuid_entity!(Reply);

// ---------------------------------------------------------------------------
// Composer reducer
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Editing {
    pub uuid: String,
    /// Parent comment when a reply is being edited.
    pub parent: Option<String>,
    pub original_text: String,
}

/// Text box + selection state at the bottom of the comments screen.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Composer {
    pub text: String,
    /// Comment that replies go to; empty when nothing is selected.
    pub active_comment: String,
    pub editing: Option<Editing>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    SetText(String),
    /// Select a comment, or deselect it if it is already active.
    SetActiveComment(String),
    EditComment { uuid: String, text: String },
    EditReply { uuid: String, parent: String, text: String },
    ClearAll,
    ClearEditing,
    ClearText,
}

impl Composer {
    pub fn apply(&mut self, action: Action) {
        match action {
            Action::SetText(text) => self.text = text,
            Action::SetActiveComment(uuid) => {
                self.text.clear();
                if self.active_comment == uuid {
                    self.active_comment.clear();
                } else {
                    self.active_comment = uuid;
                    self.editing = None;
                }
            }
            Action::EditComment { uuid, text } => {
                self.text = text.clone();
                self.active_comment = uuid.clone();
                self.editing = Some(Editing {
                    uuid,
                    parent: None,
                    original_text: text,
                });
            }
            Action::EditReply { uuid, parent, text } => {
                self.text = text.clone();
                self.active_comment = parent.clone();
                self.editing = Some(Editing {
                    uuid,
                    parent: Some(parent),
                    original_text: text,
                });
            }
            Action::ClearAll => *self = Composer::default(),
            Action::ClearEditing => {
                self.text.clear();
                self.editing = None;
            }
            Action::ClearText => self.text.clear(),
        }
    }

    #[inline]
    pub fn is_editing(&self) -> bool {
        self.editing.is_some()
    }

    pub fn button_text(&self) -> &'static str {
        if self.is_editing() {
            "Edit"
        } else {
            "Reply"
        }
    }

    pub fn placeholder(&self) -> &'static str {
        if self.active_comment.is_empty() {
            "Select a comment to reply"
        } else {
            "Reply"
        }
    }

    pub fn input_disabled(&self) -> bool {
        self.active_comment.is_empty()
    }

    /// Empty text, no target, or an edit that changes nothing.
    pub fn submit_disabled(&self) -> bool {
        if self.text.is_empty() {
            return true;
        }
        match &self.editing {
            Some(e) => self.text == e.original_text,
            None => self.active_comment.is_empty(),
        }
    }
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

/// How an entity type comes back after being deleted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UndeleteStrategy {
    /// Submit the remembered text again as a new entity (new uuid).
    Recreate,
    /// Ask the server to clear the flag (`PATCH /{kind}/{uuid}`).
    Endpoint,
}

impl std::str::FromStr for UndeleteStrategy {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "recreate" => Ok(UndeleteStrategy::Recreate),
            "endpoint" | "patch" => Ok(UndeleteStrategy::Endpoint),
            _ => Err(anyhow::anyhow!(
                "Invalid undelete strategy '{s}'. Valid options: recreate, endpoint"
            )),
        }
    }
}

impl std::fmt::Display for UndeleteStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UndeleteStrategy::Recreate => write!(f, "recreate"),
            UndeleteStrategy::Endpoint => write!(f, "endpoint"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndeletePolicy {
    pub comment: UndeleteStrategy,
    pub reply: UndeleteStrategy,
}

impl Default for UndeletePolicy {
    fn default() -> Self {
        Self {
            comment: UndeleteStrategy::Recreate,
            reply: UndeleteStrategy::Endpoint,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    Create,
    Edit,
    Remove,
    Undelete(UndeleteStrategy),
}

impl Op {
    /// Whether a 2xx without a body is an acceptable answer.
    fn body_optional(self) -> bool {
        !matches!(self, Op::Create | Op::Undelete(UndeleteStrategy::Recreate))
    }

    fn failure(self, what: &str) -> String {
        match self {
            Op::Create => format!("Couldn't post your {what}."),
            Op::Edit => format!("Couldn't save your {what}."),
            Op::Remove => format!("Couldn't delete that {what}."),
            Op::Undelete(_) => format!("Couldn't restore that {what}."),
        }
    }
}

/// A mutation that has been applied locally and awaits the server.
#[must_use = "send the request and pass the outcome to CommentsScreen::finish"]
#[derive(Clone, Debug, PartialEq)]
pub enum Pending {
    Comment {
        op: Op,
        post_uuid: String,
        text: Option<String>,
        ticket: Ticket<Comment>,
    },
    Reply {
        op: Op,
        parent: String,
        text: Option<String>,
        ticket: Ticket<Reply>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Comment(Result<Option<Comment>, ApiError>),
    Reply(Result<Option<Reply>, ApiError>),
}

impl Outcome {
    /// Turn a 2xx body that is not a usable entity into a failure.
    fn checked(self) -> Outcome {
        match self {
            Outcome::Comment(Ok(Some(c))) if !c.is_well_formed() => {
                log::error!("[comments] unusable comment body for {:?}", c.uuid);
                Outcome::Comment(Err(ApiError::Malformed("comment".into())))
            }
            Outcome::Reply(Ok(Some(r))) if !r.is_well_formed() => {
                log::error!("[comments] unusable reply body for {:?}", r.uuid);
                Outcome::Reply(Err(ApiError::Malformed("reply".into())))
            }
            other => other,
        }
    }
}

impl Pending {
    pub fn op(&self) -> Op {
        match self {
            Pending::Comment { op, .. } | Pending::Reply { op, .. } => *op,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Pending::Comment { ticket, .. } => ticket.key(),
            Pending::Reply { ticket, .. } => ticket.key(),
        }
    }

    pub async fn send<A: CommentsApi + ?Sized>(&self, api: &A) -> Outcome {
        match self {
            Pending::Comment {
                op,
                post_uuid,
                text,
                ticket,
            } => {
                let uuid = ticket.key();
                let text = text.as_deref().unwrap_or_default();
                let res = match op {
                    Op::Create | Op::Undelete(UndeleteStrategy::Recreate) => {
                        api.create_comment(post_uuid, text).await
                    }
                    Op::Edit => api.update_comment(uuid, text).await,
                    Op::Remove => api.remove_comment(uuid).await,
                    Op::Undelete(UndeleteStrategy::Endpoint) => api.undelete_comment(uuid).await,
                };
                Outcome::Comment(res.into_result())
            }
            Pending::Reply {
                op,
                parent,
                text,
                ticket,
            } => {
                let uuid = ticket.key();
                let text = text.as_deref().unwrap_or_default();
                let res = match op {
                    Op::Create | Op::Undelete(UndeleteStrategy::Recreate) => {
                        api.create_reply(parent, text).await
                    }
                    Op::Edit => api.update_reply(uuid, text).await,
                    Op::Remove => api.remove_reply(uuid).await,
                    Op::Undelete(UndeleteStrategy::Endpoint) => api.undelete_reply(uuid).await,
                };
                Outcome::Reply(res.into_result())
            }
        }
    }
}

fn revise(text: &mut Option<String>, time: &mut DateTime<Utc>, edits: &mut Vec<Edit>, new_text: &str) {
    edits.push(Edit {
        text: text.take(),
        time: *time,
        deleted: None,
    });
    *text = Some(new_text.to_string());
    *time = Utc::now();
}

fn mark_deleted(deleted: &mut bool, time: &mut DateTime<Utc>, edits: &mut Vec<Edit>) {
    edits.push(Edit {
        text: None,
        time: *time,
        deleted: Some(false),
    });
    *deleted = true;
    *time = Utc::now();
}

#[derive(Debug)]
pub struct CommentsScreen {
    post_uuid: String,
    comments: Vec<Comment>,
    composer: Composer,
    modal: InfoModal,
    policy: UndeletePolicy,
    alive: Liveness,
}

impl CommentsScreen {
    pub fn new(post_uuid: impl Into<String>) -> Self {
        Self {
            post_uuid: post_uuid.into(),
            comments: Vec::new(),
            composer: Composer::default(),
            modal: InfoModal::default(),
            policy: UndeletePolicy::default(),
            alive: Liveness::new(),
        }
    }

    pub fn with_policy(mut self, policy: UndeletePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_comments(mut self, comments: Vec<Comment>) -> Self {
        self.comments = comments;
        self
    }

    pub fn post_uuid(&self) -> &str {
        &self.post_uuid
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn comment(&self, uuid: &str) -> Option<&Comment> {
        self.comments.iter().find(|c| c.uuid == uuid)
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn modal(&self) -> &InfoModal {
        &self.modal
    }

    pub fn modal_mut(&mut self) -> &mut InfoModal {
        &mut self.modal
    }

    pub fn policy(&self) -> UndeletePolicy {
        self.policy
    }

    /// Handle for in-flight requests; see [`CommentsScreen::teardown`].
    pub fn liveness(&self) -> Liveness {
        self.alive.clone()
    }

    /// Screen is going away; late responses are ignored from now on.
    pub fn teardown(&self) {
        self.alive.teardown();
    }

    pub fn dispatch(&mut self, action: Action) {
        debug::log(cat::SYNC, format!("composer {action:?}"));
        self.composer.apply(action);
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.dispatch(Action::SetText(text.into()));
    }

    /// Fetch the post's comments. On failure the current list is kept.
    pub async fn load<A: CommentsApi + ?Sized>(&mut self, api: &A) -> bool {
        let res = api.post_comments(&self.post_uuid).await.into_result();
        self.apply_loaded(res)
    }

    /// Take a comment listing fetched elsewhere. A listing with any unusable
    /// entry is refused as a whole.
    pub fn apply_loaded(&mut self, res: Result<Option<Vec<Comment>>, ApiError>) -> bool {
        if !self.alive.is_alive() {
            return false;
        }
        let res = match res {
            Ok(Some(list)) if !list.iter().all(Comment::is_well_formed) => {
                Err(ApiError::Malformed("comment listing".into()))
            }
            other => other,
        };
        match res {
            Ok(Some(list)) => {
                debug::log(cat::SYNC, format!("loaded {} comments", list.len()));
                self.comments = list;
                true
            }
            Ok(None) => {
                self.comments.clear();
                true
            }
            Err(e) => {
                log::error!("[comments] load for post {} failed: {e}", self.post_uuid);
                self.modal.notify("Couldn't load comments.", Flavour::Error);
                false
            }
        }
    }

    // -- comments --------------------------------------------------------

    pub fn begin_create_comment(&mut self, text: &str, commenter: Commenter) -> Pending {
        let ticket = reconcile::begin_create(&mut self.comments, Comment::draft(text, commenter));
        Pending::Comment {
            op: Op::Create,
            post_uuid: self.post_uuid.clone(),
            text: Some(text.to_string()),
            ticket,
        }
    }

    pub fn begin_edit_comment(&mut self, uuid: &str, text: &str) -> Result<Pending, MutationError> {
        self.ensure_replies_settled(uuid)?;
        let ticket = reconcile::begin_edit(&mut self.comments, uuid, |c| {
            revise(&mut c.text, &mut c.time, &mut c.edits, text)
        })?;
        Ok(Pending::Comment {
            op: Op::Edit,
            post_uuid: self.post_uuid.clone(),
            text: Some(text.to_string()),
            ticket,
        })
    }

    pub fn begin_remove_comment(&mut self, uuid: &str) -> Result<Pending, MutationError> {
        self.ensure_replies_settled(uuid)?;
        let ticket = reconcile::begin_edit(&mut self.comments, uuid, |c| {
            mark_deleted(&mut c.deleted, &mut c.time, &mut c.edits)
        })?;
        if self.composer.active_comment == uuid {
            self.dispatch(Action::ClearAll);
        }
        Ok(Pending::Comment {
            op: Op::Remove,
            post_uuid: self.post_uuid.clone(),
            text: None,
            ticket,
        })
    }

    pub fn begin_undelete_comment(&mut self, uuid: &str) -> Result<Pending, MutationError> {
        let strategy = self.policy.comment;
        self.ensure_replies_settled(uuid)?;
        let existing = self
            .comment(uuid)
            .ok_or_else(|| MutationError::NotFound(uuid.to_string()))?;
        let text = existing.text.clone();
        if strategy == UndeleteStrategy::Recreate && text.as_deref().map_or(true, str::is_empty) {
            return Err(MutationError::NothingToRestore(uuid.to_string()));
        }
        let ticket = reconcile::begin_edit(&mut self.comments, uuid, |c| c.deleted = false)?;
        if self.composer.active_comment != uuid {
            self.dispatch(Action::SetActiveComment(uuid.to_string()));
        }
        Ok(Pending::Comment {
            op: Op::Undelete(strategy),
            post_uuid: self.post_uuid.clone(),
            text,
            ticket,
        })
    }

    // -- replies ---------------------------------------------------------

    /// Replies of `parent`, which must be a settled comment the server knows.
    fn replies_mut(&mut self, parent: &str) -> Result<&mut Vec<Reply>, MutationError> {
        let comment = self
            .comments
            .iter_mut()
            .find(|c| c.uuid == parent)
            .ok_or_else(|| MutationError::NotFound(parent.to_string()))?;
        if comment.loading || TempId::is_temp(parent) {
            return Err(MutationError::Busy(parent.to_string()));
        }
        Ok(&mut comment.replies)
    }

    /// A comment's rollback or commit replaces its replies, so it waits for them.
    fn ensure_replies_settled(&self, uuid: &str) -> Result<(), MutationError> {
        match self.comment(uuid) {
            Some(c) if c.replies.iter().any(|r| r.loading) => Err(MutationError::Busy(uuid.to_string())),
            _ => Ok(()),
        }
    }

    pub fn begin_create_reply(&mut self, parent: &str, text: &str) -> Result<Pending, MutationError> {
        let replies = self.replies_mut(parent)?;
        let ticket = reconcile::begin_create(replies, Reply::draft(text));
        Ok(Pending::Reply {
            op: Op::Create,
            parent: parent.to_string(),
            text: Some(text.to_string()),
            ticket,
        })
    }

    pub fn begin_edit_reply(&mut self, parent: &str, uuid: &str, text: &str) -> Result<Pending, MutationError> {
        let replies = self.replies_mut(parent)?;
        let ticket = reconcile::begin_edit(replies, uuid, |r| {
            revise(&mut r.text, &mut r.time, &mut r.edits, text)
        })?;
        Ok(Pending::Reply {
            op: Op::Edit,
            parent: parent.to_string(),
            text: Some(text.to_string()),
            ticket,
        })
    }

    pub fn begin_remove_reply(&mut self, parent: &str, uuid: &str) -> Result<Pending, MutationError> {
        let replies = self.replies_mut(parent)?;
        let ticket = reconcile::begin_edit(replies, uuid, |r| {
            mark_deleted(&mut r.deleted, &mut r.time, &mut r.edits)
        })?;
        if matches!(&self.composer.editing, Some(e) if e.uuid == uuid) {
            self.dispatch(Action::ClearEditing);
        }
        Ok(Pending::Reply {
            op: Op::Remove,
            parent: parent.to_string(),
            text: None,
            ticket,
        })
    }

    pub fn begin_undelete_reply(&mut self, parent: &str, uuid: &str) -> Result<Pending, MutationError> {
        let strategy = self.policy.reply;
        let replies = self.replies_mut(parent)?;
        let text = replies
            .iter()
            .find(|r| r.uuid == uuid)
            .ok_or_else(|| MutationError::NotFound(uuid.to_string()))?
            .text
            .clone();
        if strategy == UndeleteStrategy::Recreate && text.as_deref().map_or(true, str::is_empty) {
            return Err(MutationError::NothingToRestore(uuid.to_string()));
        }
        let ticket = reconcile::begin_edit(replies, uuid, |r| r.deleted = false)?;
        Ok(Pending::Reply {
            op: Op::Undelete(strategy),
            parent: parent.to_string(),
            text,
            ticket,
        })
    }

    // -- composer submit -------------------------------------------------

    /// Submit the composer: saves the edit in progress, or replies to the
    /// active comment. `Ok(None)` when there is nothing to submit.
    pub fn begin_submit(&mut self) -> Result<Option<Pending>, MutationError> {
        if self.composer.submit_disabled() {
            return Ok(None);
        }
        let text = self.composer.text.clone();
        if let Some(editing) = self.composer.editing.clone() {
            let pending = match editing.parent.as_deref() {
                Some(parent) => self.begin_edit_reply(parent, &editing.uuid, &text)?,
                None => self.begin_edit_comment(&editing.uuid, &text)?,
            };
            self.dispatch(Action::ClearEditing);
            return Ok(Some(pending));
        }
        let parent = self.composer.active_comment.clone();
        let pending = self.begin_create_reply(&parent, &text)?;
        self.dispatch(Action::ClearText);
        Ok(Some(pending))
    }

    // -- settle ----------------------------------------------------------

    /// Apply the server's answer. Returns `true` when the change stuck.
    pub fn finish(&mut self, pending: Pending, outcome: Outcome) -> bool {
        if !self.alive.is_alive() {
            debug::log(cat::SYNC, format!("screen gone; dropping result for {}", pending.key()));
            return false;
        }
        match (pending, outcome.checked()) {
            (Pending::Comment { op, ticket, .. }, Outcome::Comment(res)) => {
                let old = ticket.key().to_string();
                let idx = self.comments.iter().position(|c| c.uuid == old);
                let ok = reconcile::settle(
                    &mut self.comments,
                    ticket,
                    res,
                    op.body_optional(),
                    &mut self.modal,
                    &op.failure("comment"),
                );
                if ok && self.composer.active_comment == old {
                    if let Some(new) = idx.and_then(|i| self.comments.get(i)).map(|c| c.uuid.clone()) {
                        self.composer.active_comment = new;
                    }
                }
                ok
            }
            (Pending::Reply { op, parent, ticket, .. }, Outcome::Reply(res)) => {
                let message = op.failure("reply");
                let Some(comment) = self.comments.iter_mut().find(|c| c.uuid == parent) else {
                    log::warn!("[comments] parent {parent} vanished before reply {} settled", ticket.key());
                    self.modal.notify(&message, Flavour::Error);
                    return false;
                };
                reconcile::settle(
                    &mut comment.replies,
                    ticket,
                    res,
                    op.body_optional(),
                    &mut self.modal,
                    &message,
                )
            }
            (pending, _) => {
                log::error!("[comments] outcome kind does not match mutation {}", pending.key());
                self.abandon(pending);
                false
            }
        }
    }

    /// Roll a pending mutation back without asking the server.
    pub fn abandon(&mut self, pending: Pending) {
        match pending {
            Pending::Comment { op, ticket, .. } => {
                reconcile::rollback(&mut self.comments, ticket, &mut self.modal, &op.failure("comment"))
            }
            Pending::Reply {
                op, parent, ticket, ..
            } => {
                let message = op.failure("reply");
                match self.comments.iter_mut().find(|c| c.uuid == parent) {
                    Some(c) => reconcile::rollback(&mut c.replies, ticket, &mut self.modal, &message),
                    None => self.modal.notify(&message, Flavour::Error),
                }
            }
        }
    }

    /// Send `pending` and settle it in one step.
    pub async fn run<A: CommentsApi + ?Sized>(&mut self, api: &A, pending: Pending) -> bool {
        let outcome = pending.send(api).await;
        self.finish(pending, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(uuid: &str, text: &str) -> Comment {
        let mut c = Comment::draft(text, Commenter::default());
        c.uuid = uuid.into();
        c
    }

    #[test]
    fn set_active_toggles() {
        let mut c = Composer::default();
        c.apply(Action::SetText("hi".into()));
        c.apply(Action::SetActiveComment("a".into()));
        assert_eq!(c.active_comment, "a");
        assert_eq!(c.text, "");
        c.apply(Action::SetActiveComment("a".into()));
        assert_eq!(c.active_comment, "");
    }

    #[test]
    fn edit_reply_targets_parent() {
        let mut c = Composer::default();
        c.apply(Action::EditReply {
            uuid: "r".into(),
            parent: "p".into(),
            text: "old".into(),
        });
        assert_eq!(c.active_comment, "p");
        assert_eq!(c.button_text(), "Edit");
        // unchanged edit cannot be submitted
        assert!(c.submit_disabled());
        c.apply(Action::SetText("new".into()));
        assert!(!c.submit_disabled());
        c.apply(Action::ClearEditing);
        assert_eq!(c.button_text(), "Reply");
        assert_eq!(c.active_comment, "p");
    }

    #[test]
    fn submit_needs_target() {
        let mut c = Composer::default();
        c.apply(Action::SetText("x".into()));
        assert!(c.submit_disabled());
        assert!(c.input_disabled());
        c.active_comment = "a".into();
        assert!(!c.submit_disabled());
        c.apply(Action::ClearAll);
        assert_eq!(c, Composer::default());
    }

    #[test]
    fn comment_wire_shape() {
        let json = r#"{"uuid":"u1","text":"hey","time":"2024-01-01T00:00:00Z",
            "commenter":{"id":7,"name":"Mabel"},
            "replies":[{"uuid":"r1","text":"yo","time":"2024-01-01T00:00:00Z","byCommenter":true}]}"#;
        let c: Comment = serde_json::from_str(json).unwrap();
        assert_eq!(c.commenter.name, "Mabel");
        assert!(c.replies[0].by_commenter);
        assert!(!c.deleted && !c.loading);
    }

    #[test]
    fn removing_active_comment_clears_composer() {
        let mut s = CommentsScreen::new("p").with_comments(vec![comment("a", "one")]);
        s.dispatch(Action::SetActiveComment("a".into()));
        s.set_text("draft");
        let p = s.begin_remove_comment("a").unwrap();
        assert_eq!(s.composer(), &Composer::default());
        assert!(s.comment("a").unwrap().deleted);
        assert!(s.finish(p, Outcome::Comment(Ok(None))));
        assert!(!s.comment("a").unwrap().loading);
    }

    #[test]
    fn recreate_without_text_is_refused() {
        let mut gone = comment("a", "");
        gone.text = None;
        gone.deleted = true;
        let mut s = CommentsScreen::new("p").with_comments(vec![gone]);
        assert_eq!(
            s.begin_undelete_comment("a").unwrap_err(),
            MutationError::NothingToRestore("a".into())
        );
    }

    #[test]
    fn recreate_rekeys_active_comment() {
        let mut c = comment("a", "keep me");
        c.deleted = true;
        let mut s = CommentsScreen::new("p").with_comments(vec![c]);
        let p = s.begin_undelete_comment("a").unwrap();
        assert_eq!(s.composer().active_comment, "a");
        assert!(!s.comment("a").unwrap().deleted);
        assert!(s.finish(p, Outcome::Comment(Ok(Some(comment("b", "keep me"))))));
        assert_eq!(s.composer().active_comment, "b");
        assert_eq!(s.comments().len(), 1);
    }

    #[test]
    fn mismatched_outcome_rolls_back() {
        let mut s = CommentsScreen::new("p").with_comments(vec![comment("a", "old")]);
        let p = s.begin_edit_comment("a", "new").unwrap();
        assert!(!s.finish(p, Outcome::Reply(Ok(None))));
        assert_eq!(s.comment("a").unwrap().text.as_deref(), Some("old"));
        assert!(s.modal().is_open());
    }

    #[test]
    fn textless_server_copy_is_refused() {
        let mut s = CommentsScreen::new("p").with_comments(vec![comment("a", "old")]);
        let p = s.begin_edit_comment("a", "new").unwrap();
        let mut body = comment("a", "");
        body.text = None;
        assert!(!s.finish(p, Outcome::Comment(Ok(Some(body)))));
        assert_eq!(s.comment("a").unwrap().text.as_deref(), Some("old"));
        assert!(s.modal().is_open());

        let mut gone = comment("b", "");
        gone.text = None;
        gone.deleted = true;
        assert!(gone.is_well_formed());
        assert!(!comment("tmp-0000000000000001", "x").is_well_formed());
    }

    #[test]
    fn torn_down_screen_ignores_results() {
        let mut s = CommentsScreen::new("p").with_comments(vec![comment("a", "old")]);
        let p = s.begin_edit_comment("a", "new").unwrap();
        s.teardown();
        assert!(!s.finish(p, Outcome::Comment(Err(ApiError::Status(500)))));
        assert!(!s.modal().is_open());
    }
}
