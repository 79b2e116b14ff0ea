//! Transient UI state: loading flags, keyed error messages and toasts.
//!
//! Never persisted.

use crate::model::now_epoch_ms;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use uuid::Uuid;

pub const DEFAULT_TOAST_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Toast {
    pub id: Uuid,
    pub kind: ToastKind,
    pub message: String,
    pub created_at: i64,
}

/// Notification registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiStore {
    loading: BTreeSet<String>,
    errors: BTreeMap<String, String>,
    toasts: VecDeque<Toast>,
    toast_limit: usize,
}

impl Default for UiStore {
    fn default() -> Self {
        Self::with_toast_limit(DEFAULT_TOAST_LIMIT)
    }
}

impl UiStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A limit of zero is treated as one.
    pub fn with_toast_limit(toast_limit: usize) -> Self {
        Self {
            loading: BTreeSet::new(),
            errors: BTreeMap::new(),
            toasts: VecDeque::new(),
            toast_limit: toast_limit.max(1),
        }
    }

    pub fn set_loading(&mut self, key: impl Into<String>, loading: bool) {
        let key = key.into();
        if loading {
            self.loading.insert(key);
        } else {
            self.loading.remove(&key);
        }
    }

    pub fn is_loading(&self, key: &str) -> bool {
        self.loading.contains(key)
    }

    pub fn any_loading(&self) -> bool {
        !self.loading.is_empty()
    }

    pub fn set_error(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.errors.insert(key.into(), message.into());
    }

    pub fn error(&self, key: &str) -> Option<&str> {
        self.errors.get(key).map(String::as_str)
    }

    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    pub fn clear_error(&mut self, key: &str) -> bool {
        self.errors.remove(key).is_some()
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    /// Queues a toast, dropping the oldest once the limit is reached.
    pub fn push_toast(&mut self, kind: ToastKind, message: impl Into<String>) -> Uuid {
        while self.toasts.len() >= self.toast_limit {
            self.toasts.pop_front();
        }
        let toast = Toast {
            id: Uuid::new_v4(),
            kind,
            message: message.into(),
            created_at: now_epoch_ms(),
        };
        let id = toast.id;
        self.toasts.push_back(toast);
        id
    }

    pub fn dismiss_toast(&mut self, id: Uuid) -> bool {
        let before = self.toasts.len();
        self.toasts.retain(|toast| toast.id != id);
        self.toasts.len() != before
    }

    /// Oldest first.
    pub fn toasts(&self) -> impl Iterator<Item = &Toast> {
        self.toasts.iter()
    }

    pub fn toast_count(&self) -> usize {
        self.toasts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::{ToastKind, UiStore};

    #[test]
    fn loading_flags_are_keyed() {
        let mut ui = UiStore::new();
        ui.set_loading("boards", true);
        assert!(ui.is_loading("boards"));
        assert!(!ui.is_loading("tasks"));
        ui.set_loading("boards", false);
        assert!(!ui.any_loading());
    }

    #[test]
    fn errors_are_keyed_and_clearable() {
        let mut ui = UiStore::new();
        ui.set_error("tasks", "task title must not be blank");
        assert_eq!(ui.error("tasks"), Some("task title must not be blank"));
        assert!(ui.clear_error("tasks"));
        assert!(!ui.clear_error("tasks"));
    }

    #[test]
    fn toast_queue_drops_oldest_past_limit() {
        let mut ui = UiStore::with_toast_limit(2);
        let first = ui.push_toast(ToastKind::Info, "one");
        ui.push_toast(ToastKind::Success, "two");
        ui.push_toast(ToastKind::Error, "three");

        let messages: Vec<&str> = ui.toasts().map(|toast| toast.message.as_str()).collect();
        assert_eq!(messages, vec!["two", "three"]);
        assert!(!ui.dismiss_toast(first));
    }
}
