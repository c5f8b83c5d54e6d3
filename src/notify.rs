//! Shared info modal
//!
//! Messages queue up; the modal shows the oldest one and stays open until the
//! last one is dismissed.

use std::collections::VecDeque;

use serde::Serialize;

use crate::debug::{self, cat};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Flavour {
    Info,
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Info {
    pub text: String,
    pub flavour: Flavour,
}

/// Where user-visible failures go.
pub trait Notifier {
    fn notify(&mut self, text: &str, flavour: Flavour);
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct InfoModal {
    queue: VecDeque<Info>,
}

impl InfoModal {
    pub fn open(&mut self, text: impl Into<String>, flavour: Flavour) {
        let text = text.into();
        debug::log(cat::NOTIFY, format!("open {flavour:?}: {text}"));
        self.queue.push_back(Info { text, flavour });
    }

    /// Dismiss the message on screen; returns it.
    pub fn close(&mut self) -> Option<Info> {
        self.queue.pop_front()
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        !self.queue.is_empty()
    }

    #[inline]
    pub fn current(&self) -> Option<&Info> {
        self.queue.front()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl Notifier for InfoModal {
    fn notify(&mut self, text: &str, flavour: Flavour) {
        self.open(text, flavour);
    }
}
