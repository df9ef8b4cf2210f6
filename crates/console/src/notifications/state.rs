//! Pure notification state. Every transition is synchronous; the driver in
//! [`super::sync`] decides when they happen.

use chrono::{DateTime, Utc};
use crm_core::types::Notification;
use serde::Serialize;
use std::collections::HashSet;

/// What the notification menu draws: newest-first list, unread badge,
/// loading flag of the open-menu fetch, and whether the menu is open.
///
/// `unread_count` is the server's number, adjusted locally by pushes and
/// mark-all. It may drift from the unread entries in `items` until the next
/// poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationState {
    pub items: Vec<Notification>,
    pub unread_count: u64,
    pub loading: bool,
    pub menu_open: bool,
}

impl NotificationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_menu(&mut self) {
        self.menu_open = true;
    }

    pub fn close_menu(&mut self) {
        self.menu_open = false;
    }

    pub fn begin_fetch(&mut self) {
        self.loading = true;
    }

    /// Replace the list with a fetched page. Repeated ids in the page keep
    /// their first occurrence.
    pub fn fetch_succeeded(&mut self, items: Vec<Notification>) {
        let mut seen = HashSet::with_capacity(items.len());
        self.items = items.into_iter().filter(|n| seen.insert(n.id.clone())).collect();
        self.loading = false;
    }

    /// The prior list is left as it was.
    pub fn fetch_failed(&mut self) {
        self.loading = false;
    }

    pub fn set_unread_count(&mut self, count: u64) {
        self.unread_count = count;
    }

    /// Apply a pushed notification. It is prepended only when its id is not
    /// already listed; the unread count is bumped either way. Returns whether
    /// the list grew.
    pub fn receive_push(&mut self, notification: Notification) -> bool {
        self.unread_count = self.unread_count.saturating_add(1);
        if self.contains(&notification.id) {
            return false;
        }
        self.items.insert(0, notification);
        true
    }

    /// Stamp `read_at` on the matching entry if it has none. Returns whether
    /// anything changed.
    pub fn mark_read(&mut self, id: &str, at: DateTime<Utc>) -> bool {
        match self.items.iter_mut().find(|n| n.id == id) {
            Some(n) if n.read_at.is_none() => {
                n.read_at = Some(at);
                true
            }
            _ => false,
        }
    }

    pub fn mark_all_read(&mut self, at: DateTime<Utc>) {
        for n in self.items.iter_mut().filter(|n| n.read_at.is_none()) {
            n.read_at = Some(at);
        }
        self.unread_count = 0;
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.iter().any(|n| n.id == id)
    }

    /// Unread entries currently listed, as opposed to the server badge.
    pub fn unread_listed(&self) -> usize {
        self.items.iter().filter(|n| !n.is_read()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn notification(id: &str, minutes_ago: i64) -> Notification {
        Notification {
            id: id.into(),
            kind: "LeadAssigned".into(),
            message: format!("Lead {id} was assigned to you"),
            created_at: Utc::now() - Duration::minutes(minutes_ago),
            read_at: None,
        }
    }

    #[test]
    fn test_push_dedup_keeps_each_id_once() {
        let mut state = NotificationState::new();
        state.fetch_succeeded(vec![notification("a", 5), notification("b", 10)]);

        let sequence = ["c", "a", "c", "d", "d", "b"];
        for id in sequence {
            state.receive_push(notification(id, 0));
        }

        let mut ids: Vec<&str> = state.items.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["d", "c", "a", "b"]);
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), state.items.len());
        // Duplicates still bump the badge; the next poll corrects it.
        assert_eq!(state.unread_count, sequence.len() as u64);
    }

    #[test]
    fn test_fetch_replaces_and_collapses_repeats() {
        let mut state = NotificationState::new();
        state.receive_push(notification("old", 60));
        state.begin_fetch();
        assert!(state.loading);

        state.fetch_succeeded(vec![notification("x", 1), notification("x", 1), notification("y", 2)]);
        assert!(!state.loading);
        assert_eq!(state.items.len(), 2);
        assert!(!state.contains("old"));
    }

    #[test]
    fn test_failed_fetch_keeps_prior_list() {
        let mut state = NotificationState::new();
        state.fetch_succeeded(vec![notification("a", 1)]);
        state.begin_fetch();
        state.fetch_failed();
        assert!(!state.loading);
        assert_eq!(state.items.len(), 1);
    }

    #[test]
    fn test_mark_read_idempotent() {
        let mut state = NotificationState::new();
        state.fetch_succeeded(vec![notification("a", 1), notification("b", 2)]);
        let first = Utc::now();

        assert!(state.mark_read("a", first));
        let once = state.clone();
        assert!(!state.mark_read("a", first + Duration::seconds(5)));
        assert_eq!(state, once);
        assert_eq!(state.items[0].read_at, Some(first));
        assert!(!state.mark_read("missing", first));
        assert_eq!(state.unread_listed(), 1);
    }

    #[test]
    fn test_mark_all_read() {
        let mut state = NotificationState::new();
        let earlier = Utc::now() - Duration::hours(1);
        let mut already = notification("a", 90);
        already.read_at = Some(earlier);
        state.fetch_succeeded(vec![notification("b", 1), already, notification("c", 3)]);
        state.set_unread_count(7);

        state.mark_all_read(Utc::now());
        assert!(state.items.iter().all(Notification::is_read));
        assert_eq!(state.unread_count, 0);
        assert_eq!(state.items[1].read_at, Some(earlier));
    }
}
