//! Optimistic comment/reply flows against a scripted API

use std::cell::{Cell, RefCell};

use async_trait::async_trait;
use lobster::api::{ApiResponse, CommentsApi};
use lobster::comments::{
    Action, Comment, Commenter, CommentsScreen, Reply, UndeletePolicy, UndeleteStrategy,
};
use lobster::reconcile::{MutationError, TempId};

#[derive(Default)]
struct FakeApi {
    fail: Cell<bool>,
    /// Answer writes with 2xx bodies that are missing their text.
    hollow: Cell<bool>,
    next: Cell<u32>,
    calls: RefCell<Vec<String>>,
    listing: RefCell<Vec<Comment>>,
}

impl FakeApi {
    fn failing() -> Self {
        let api = Self::default();
        api.fail.set(true);
        api
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }

    fn id(&self) -> String {
        let n = self.next.get() + 1;
        self.next.set(n);
        format!("srv-{n}")
    }

    fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn respond<T>(&self, data: impl FnOnce() -> T) -> ApiResponse<T> {
        if self.fail.get() {
            ApiResponse::with_status(500)
        } else {
            ApiResponse::ok(data())
        }
    }

    fn respond_empty<T>(&self) -> ApiResponse<T> {
        if self.fail.get() {
            ApiResponse::failed()
        } else {
            ApiResponse::ok_empty()
        }
    }
}

fn comment(uuid: &str, text: &str) -> Comment {
    let mut c = Comment::draft(text, Commenter { id: 1, name: "Marcus".into() });
    c.uuid = uuid.into();
    c
}

fn reply(uuid: &str, text: &str) -> Reply {
    let mut r = Reply::draft(text);
    r.uuid = uuid.into();
    r
}

#[async_trait(?Send)]
impl CommentsApi for FakeApi {
    async fn post_comments(&self, post_uuid: &str) -> ApiResponse<Vec<Comment>> {
        self.record(format!("GET {post_uuid}"));
        self.respond(|| self.listing.borrow().clone())
    }

    async fn create_comment(&self, post_uuid: &str, text: &str) -> ApiResponse<Comment> {
        self.record(format!("POST comment {post_uuid} {text}"));
        self.respond(|| comment(&self.id(), text))
    }

    async fn update_comment(&self, uuid: &str, text: &str) -> ApiResponse<Comment> {
        self.record(format!("PUT comment {uuid}"));
        self.respond(|| {
            let mut c = comment(uuid, text);
            if self.hollow.get() {
                c.text = None;
            }
            c
        })
    }

    async fn remove_comment(&self, uuid: &str) -> ApiResponse<Comment> {
        self.record(format!("DELETE comment {uuid}"));
        self.respond_empty()
    }

    async fn undelete_comment(&self, uuid: &str) -> ApiResponse<Comment> {
        self.record(format!("PATCH comment {uuid}"));
        self.respond_empty()
    }

    async fn create_reply(&self, comment_uuid: &str, text: &str) -> ApiResponse<Reply> {
        self.record(format!("POST reply {comment_uuid} {text}"));
        self.respond(|| {
            let mut r = reply(&self.id(), text);
            if self.hollow.get() {
                r.text = None;
            }
            r
        })
    }

    async fn update_reply(&self, uuid: &str, text: &str) -> ApiResponse<Reply> {
        self.record(format!("PUT reply {uuid}"));
        self.respond(|| reply(uuid, text))
    }

    async fn remove_reply(&self, uuid: &str) -> ApiResponse<Reply> {
        self.record(format!("DELETE reply {uuid}"));
        self.respond_empty()
    }

    async fn undelete_reply(&self, uuid: &str) -> ApiResponse<Reply> {
        self.record(format!("PATCH reply {uuid}"));
        self.respond_empty()
    }
}

fn screen() -> CommentsScreen {
    let mut first = comment("c1", "Is this still available?");
    first.replies.push(reply("r1", "Yes it is!"));
    CommentsScreen::new("post-1").with_comments(vec![first, comment("c2", "Does it still work?")])
}

#[tokio::test]
async fn created_comment_is_visible_then_rekeyed() {
    let api = FakeApi::default();
    let mut s = screen();

    let pending = s.begin_create_comment("Can I pick it up Sunday?", Commenter::default());
    assert_eq!(s.comments().len(), 3);
    let optimistic = &s.comments()[2];
    assert!(optimistic.loading);
    assert!(TempId::is_temp(&optimistic.uuid));
    assert_eq!(optimistic.text.as_deref(), Some("Can I pick it up Sunday?"));

    assert!(s.run(&api, pending).await);
    assert_eq!(s.comments().len(), 3);
    let stored = &s.comments()[2];
    assert_eq!(stored.uuid, "srv-1");
    assert!(!stored.loading);
    assert_eq!(api.calls(), ["POST comment post-1 Can I pick it up Sunday?"]);
}

#[tokio::test]
async fn failed_create_removes_placeholder_and_notifies() {
    let api = FakeApi::failing();
    let mut s = screen();
    let pending = s.begin_create_comment("hello", Commenter::default());
    assert!(!s.run(&api, pending).await);
    assert_eq!(s.comments().len(), 2);
    assert!(s.comments().iter().all(|c| !TempId::is_temp(&c.uuid)));
    assert_eq!(
        s.modal().current().map(|i| i.text.as_str()),
        Some("Couldn't post your comment.")
    );
}

#[tokio::test]
async fn failed_edit_restores_exact_text() {
    let api = FakeApi::failing();
    let mut s = screen();
    let before = s.comment("c2").cloned().unwrap();

    let pending = s.begin_edit_comment("c2", "Does it still work? (asking again)").unwrap();
    let editing = s.comment("c2").unwrap();
    assert!(editing.loading);
    assert_eq!(editing.text.as_deref(), Some("Does it still work? (asking again)"));
    assert_eq!(editing.edits.len(), 1);

    // only one change per entity at a time
    assert_eq!(
        s.begin_edit_comment("c2", "again").unwrap_err(),
        MutationError::Busy("c2".into())
    );

    assert!(!s.run(&api, pending).await);
    assert_eq!(s.comment("c2"), Some(&before));
    assert!(s.modal().is_open());
}

#[tokio::test]
async fn delete_keeps_position_and_accepts_empty_body() {
    let api = FakeApi::default();
    let mut s = screen();
    s.dispatch(Action::SetActiveComment("c1".into()));

    let pending = s.begin_remove_comment("c1").unwrap();
    assert!(s.comments()[0].deleted);
    assert_eq!(s.composer().active_comment, "");

    assert!(s.run(&api, pending).await);
    assert_eq!(s.comments()[0].uuid, "c1");
    assert!(s.comments()[0].deleted && !s.comments()[0].loading);
}

#[tokio::test]
async fn comment_undelete_recreates_by_default() {
    let api = FakeApi::default();
    let mut gone = comment("c9", "Still want it");
    gone.deleted = true;
    let mut s = CommentsScreen::new("post-1").with_comments(vec![gone]);

    let pending = s.begin_undelete_comment("c9").unwrap();
    assert!(!s.comments()[0].deleted);
    assert!(s.run(&api, pending).await);
    assert_eq!(api.calls(), ["POST comment post-1 Still want it"]);
    assert_eq!(s.comments()[0].uuid, "srv-1");
    assert_eq!(s.composer().active_comment, "srv-1");
}

#[tokio::test]
async fn undelete_strategy_is_configurable() {
    let api = FakeApi::default();
    let mut gone = comment("c9", "x");
    gone.deleted = true;
    gone.replies.push({
        let mut r = reply("r9", "y");
        r.deleted = true;
        r
    });
    let policy = UndeletePolicy {
        comment: UndeleteStrategy::Endpoint,
        reply: UndeleteStrategy::Endpoint,
    };
    let mut s = CommentsScreen::new("post-1").with_policy(policy).with_comments(vec![gone]);

    let p = s.begin_undelete_comment("c9").unwrap();
    assert!(s.run(&api, p).await);
    let p = s.begin_undelete_reply("c9", "r9").unwrap();
    assert!(s.run(&api, p).await);

    assert_eq!(api.calls(), ["PATCH comment c9", "PATCH reply r9"]);
    let c = s.comment("c9").unwrap();
    assert_eq!(c.uuid, "c9");
    assert!(!c.deleted && !c.replies[0].deleted);
}

#[tokio::test]
async fn composer_submit_replies_to_active_comment() {
    let api = FakeApi::default();
    let mut s = screen();
    assert_eq!(s.begin_submit(), Ok(None));

    s.dispatch(Action::SetActiveComment("c2".into()));
    s.set_text("Yes it does!");
    assert!(!s.composer().submit_disabled());

    let pending = s.begin_submit().unwrap().unwrap();
    assert_eq!(s.composer().text, "");
    assert_eq!(s.composer().active_comment, "c2");
    assert!(s.comment("c2").unwrap().replies[0].loading);

    assert!(s.run(&api, pending).await);
    let r = &s.comment("c2").unwrap().replies[0];
    assert_eq!(r.uuid, "srv-1");
    assert_eq!(r.text.as_deref(), Some("Yes it does!"));
}

#[tokio::test]
async fn composer_submit_saves_reply_edit() {
    let api = FakeApi::default();
    let mut s = screen();
    s.dispatch(Action::EditReply {
        uuid: "r1".into(),
        parent: "c1".into(),
        text: "Yes it is!".into(),
    });
    assert_eq!(s.composer().button_text(), "Edit");
    s.set_text("Yes, if the post is still up.");

    let pending = s.begin_submit().unwrap().unwrap();
    assert!(!s.composer().is_editing());
    assert!(s.run(&api, pending).await);
    assert_eq!(api.calls(), ["PUT reply r1"]);
    assert_eq!(
        s.comment("c1").unwrap().reply("r1").unwrap().text.as_deref(),
        Some("Yes, if the post is still up.")
    );
}

#[tokio::test]
async fn removing_edited_reply_clears_editing() {
    let api = FakeApi::failing();
    let mut s = screen();
    s.dispatch(Action::EditReply {
        uuid: "r1".into(),
        parent: "c1".into(),
        text: "Yes it is!".into(),
    });
    let pending = s.begin_remove_reply("c1", "r1").unwrap();
    assert!(!s.composer().is_editing());
    assert!(s.comment("c1").unwrap().reply("r1").unwrap().deleted);

    assert!(!s.run(&api, pending).await);
    let r = s.comment("c1").unwrap().reply("r1").unwrap();
    assert!(!r.deleted && !r.loading);
    assert_eq!(
        s.modal().current().map(|i| i.text.as_str()),
        Some("Couldn't delete that reply.")
    );
}

#[tokio::test]
async fn late_response_after_teardown_is_ignored() {
    let api = FakeApi::default();
    let mut s = screen();
    let pending = s.begin_edit_comment("c1", "changed").unwrap();
    let outcome = pending.send(&api).await;
    s.teardown();
    assert!(!s.finish(pending, outcome));
    // left exactly as the optimistic projection
    assert!(s.comment("c1").unwrap().loading);
}

#[tokio::test]
async fn load_replaces_list_or_keeps_it_on_failure() {
    let api = FakeApi::default();
    api.listing.borrow_mut().push(comment("fresh", "new"));
    let mut s = screen();
    assert!(s.load(&api).await);
    assert_eq!(s.comments().len(), 1);

    api.fail.set(true);
    assert!(!s.load(&api).await);
    assert_eq!(s.comments()[0].uuid, "fresh");
    assert_eq!(s.modal().len(), 1);
}

#[tokio::test]
async fn replies_wait_for_parent_to_reach_server() {
    let api = FakeApi::default();
    let mut s = screen();

    let pending = s.begin_create_comment("hi", Commenter::default());
    let temp = pending.key().to_string();
    assert!(TempId::is_temp(&temp));
    assert_eq!(
        s.begin_create_reply(&temp, "reply").unwrap_err(),
        MutationError::Busy(temp.clone())
    );

    // composer path goes through the same check
    s.dispatch(Action::SetActiveComment(temp.clone()));
    s.set_text("reply");
    assert_eq!(s.begin_submit().unwrap_err(), MutationError::Busy(temp.clone()));

    assert!(s.run(&api, pending).await);
    let p = s.begin_create_reply("srv-1", "reply").unwrap();
    assert!(s.run(&api, p).await);

    let calls = api.calls();
    assert_eq!(calls, ["POST comment post-1 hi", "POST reply srv-1 reply"]);
    assert!(calls.iter().all(|c| !c.contains("tmp-")));
}

#[tokio::test]
async fn parent_and_replies_do_not_overlap() {
    let mut s = screen();
    let edit = s.begin_edit_comment("c1", "changed").unwrap();
    assert_eq!(
        s.begin_edit_reply("c1", "r1", "x").unwrap_err(),
        MutationError::Busy("c1".into())
    );
    assert_eq!(
        s.begin_remove_reply("c1", "r1").unwrap_err(),
        MutationError::Busy("c1".into())
    );
    s.abandon(edit);

    let remove = s.begin_remove_reply("c1", "r1").unwrap();
    assert_eq!(
        s.begin_edit_comment("c1", "changed").unwrap_err(),
        MutationError::Busy("c1".into())
    );
    s.abandon(remove);
    assert!(s.begin_remove_comment("c1").is_ok());
}

#[tokio::test]
async fn unusable_edit_body_rolls_back_and_notifies() {
    let api = FakeApi::default();
    api.hollow.set(true);
    let mut s = screen();
    let before = s.comment("c2").cloned().unwrap();

    let pending = s.begin_edit_comment("c2", "new words").unwrap();
    assert!(!s.run(&api, pending).await);
    assert_eq!(s.comment("c2"), Some(&before));
    assert_eq!(
        s.modal().current().map(|i| i.text.as_str()),
        Some("Couldn't save your comment.")
    );
}

#[tokio::test]
async fn unusable_reply_body_drops_placeholder() {
    let api = FakeApi::default();
    api.hollow.set(true);
    let mut s = screen();

    let pending = s.begin_create_reply("c2", "sure").unwrap();
    assert!(!s.run(&api, pending).await);
    assert!(s.comment("c2").unwrap().replies.is_empty());
    assert!(s.modal().is_open());
}

#[tokio::test]
async fn unusable_listing_keeps_current_list() {
    let api = FakeApi::default();
    let mut bad = comment("fresh", "new");
    bad.text = None;
    api.listing.borrow_mut().push(bad);
    let mut s = screen();
    assert!(!s.load(&api).await);
    assert_eq!(s.comments().len(), 2);
    assert_eq!(s.modal().len(), 1);
}
