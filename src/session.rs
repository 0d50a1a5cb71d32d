//! Session state: the single owner of everything the request builders and
//! renderers share.
//!
//! One logical action (a chat send, a plot request) takes a fresh token from
//! a process-wide counter when it starts and carries it into its completion
//! action. A completion whose token no longer matches the pending slot of
//! its channel is stale and must be discarded without touching UI state.
//!
//! Legal in-flight combinations: {}, {chat}, {plot}, {chat, plot}. Chat is a
//! hard singleton: a second send while one is pending is rejected, no queue.
//! A plot may start while a chat reply is pending (they target different
//! panes), and a plot started while a plot is pending supersedes it.

use serde::{Deserialize, Serialize};

use crate::api::ChartType;

/// Identity of one logical chat or plot action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestToken(pub u64);

/// Pending-request slot for one channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingSlot {
    current: Option<RequestToken>,
}

impl PendingSlot {
    pub fn is_pending(&self) -> bool {
        self.current.is_some()
    }

    fn start(&mut self, token: RequestToken) {
        self.current = Some(token);
    }

    /// Accept a completion. True iff the token is the live one; the slot
    /// clears only then, so a stale completion cannot release a newer
    /// request's slot.
    pub fn complete(&mut self, token: RequestToken) -> bool {
        if self.current == Some(token) {
            self.current = None;
            return true;
        }
        false
    }
}

/// Reference to the dataset the backend is currently serving charts for
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetRef {
    pub id: String,
    pub original_filename: Option<String>,
}

/// All process-wide UI state. Owned by the app, mutated only on the UI loop.
#[derive(Debug, Default)]
pub struct SessionState {
    pub dataset: Option<DatasetRef>,
    pub selected_col: Option<String>,
    pub grouped_cols: Vec<String>,
    pub last_chart_type: Option<ChartType>,
    /// Latest rendered chart as a data URI, attached to chat requests
    pub last_image: Option<String>,
    pub show_values: bool,
    pub auto_analyze: bool,
    next_token: u64,
    chat: PendingSlot,
    plot: PendingSlot,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dataset_id(&self) -> Option<&str> {
        self.dataset.as_ref().map(|d| d.id.as_str())
    }

    pub fn set_selected_col(&mut self, name: Option<String>) {
        self.selected_col = name.filter(|n| !n.is_empty());
    }

    /// Replace the dataset reference after a successful registration;
    /// clears the stale single selection
    pub fn replace_dataset(&mut self, id: String, original_filename: Option<String>) {
        self.dataset = Some(DatasetRef {
            id,
            original_filename,
        });
        self.selected_col = None;
        self.grouped_cols.clear();
    }

    fn take_token(&mut self) -> RequestToken {
        self.next_token += 1;
        RequestToken(self.next_token)
    }

    /// Claim the chat slot. None while a chat request is already pending:
    /// the caller must drop the send entirely.
    pub fn begin_chat(&mut self) -> Option<RequestToken> {
        if self.chat.is_pending() {
            return None;
        }
        let token = self.take_token();
        self.chat.start(token);
        Some(token)
    }

    /// Claim the plot slot. Always succeeds; an in-flight plot is
    /// superseded and its completion will be discarded by token.
    pub fn begin_plot(&mut self) -> RequestToken {
        let token = self.take_token();
        self.plot.start(token);
        token
    }

    pub fn chat_pending(&self) -> bool {
        self.chat.is_pending()
    }

    pub fn plot_pending(&self) -> bool {
        self.plot.is_pending()
    }

    /// True iff this completion belongs to the live chat request
    pub fn finish_chat(&mut self, token: RequestToken) -> bool {
        self.chat.complete(token)
    }

    /// True iff this completion belongs to the live plot request
    pub fn finish_plot(&mut self, token: RequestToken) -> bool {
        self.plot.complete(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_is_a_hard_singleton() {
        let mut session = SessionState::new();
        let first = session.begin_chat().expect("idle chat slot");
        assert_eq!(session.begin_chat(), None);
        assert!(session.finish_chat(first));
        assert!(session.begin_chat().is_some());
    }

    #[test]
    fn plot_may_start_while_chat_is_pending() {
        let mut session = SessionState::new();
        let _chat = session.begin_chat().unwrap();
        let plot = session.begin_plot();
        assert!(session.chat_pending());
        assert!(session.plot_pending());
        assert!(session.finish_plot(plot));
        assert!(session.chat_pending());
    }

    #[test]
    fn superseded_plot_completion_is_stale() {
        let mut session = SessionState::new();
        let old = session.begin_plot();
        let new = session.begin_plot();
        assert!(!session.finish_plot(old), "stale completion must be dropped");
        assert!(session.plot_pending(), "stale completion must not clear the slot");
        assert!(session.finish_plot(new));
        assert!(!session.plot_pending());
    }

    #[test]
    fn tokens_are_unique_across_channels() {
        let mut session = SessionState::new();
        let chat = session.begin_chat().unwrap();
        let plot = session.begin_plot();
        assert_ne!(chat, plot);
        // cross-channel completion never matches
        assert!(!session.finish_chat(plot));
        assert!(session.finish_chat(chat));
    }

    #[test]
    fn replace_dataset_clears_selection() {
        let mut session = SessionState::new();
        session.set_selected_col(Some("Age".into()));
        session.grouped_cols = vec!["Age".into(), "Wage".into()];
        session.replace_dataset("d1".into(), Some("t.csv".into()));
        assert_eq!(session.dataset_id(), Some("d1"));
        assert_eq!(session.selected_col, None);
        assert!(session.grouped_cols.is_empty());
    }

    #[test]
    fn empty_selection_is_none() {
        let mut session = SessionState::new();
        session.set_selected_col(Some(String::new()));
        assert_eq!(session.selected_col, None);
    }
}
