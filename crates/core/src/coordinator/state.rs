//! Observable list-screen state.

use serde::{Deserialize, Serialize};

use crate::movie::Movie;
use crate::resource::Resource;

/// What the coordinator is doing with the current query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatorPhase {
    /// Nothing started yet.
    #[default]
    Idle,
    /// Input received, waiting for it to settle.
    Debouncing,
    /// Showing (or loading) search results.
    Searching,
    /// Showing (or loading) the trending list.
    SettledTrending,
}

/// The kind of task whose emissions are being applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TaskKind {
    Trending { force_refresh: bool },
    Search { query: String },
}

impl TaskKind {
    pub(crate) fn label(&self) -> &'static str {
        match self {
            TaskKind::Trending { .. } => "trending",
            TaskKind::Search { .. } => "search",
        }
    }

    pub(crate) fn phase(&self) -> CoordinatorPhase {
        match self {
            TaskKind::Trending { .. } => CoordinatorPhase::SettledTrending,
            TaskKind::Search { .. } => CoordinatorPhase::Searching,
        }
    }
}

/// Everything a list screen renders.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListState {
    pub movies: Vec<Movie>,
    pub query: String,
    pub phase: CoordinatorPhase,
    /// First load with nothing to show.
    pub is_loading: bool,
    /// Forced refresh in progress.
    pub is_refreshing: bool,
    pub is_searching: bool,
    pub error: Option<String>,
    pub is_offline: bool,
    /// Recent searches, most recent first.
    pub history: Vec<String>,
    pub show_history: bool,
}

impl ListState {
    pub fn is_search_active(&self) -> bool {
        !self.query.is_empty()
    }

    /// An error with nothing else on screen.
    pub fn should_show_error(&self) -> bool {
        self.error.is_some() && self.movies.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty() && !self.is_loading && self.error.is_none()
    }

    /// Fold one emission of a `kind` task into the state.
    pub(crate) fn apply(&mut self, kind: &TaskKind, resource: Resource<Vec<Movie>>) {
        match resource {
            Resource::Loading => match kind {
                TaskKind::Trending { force_refresh } => {
                    self.is_loading = !force_refresh && self.movies.is_empty();
                    self.is_refreshing = *force_refresh;
                    self.error = None;
                }
                TaskKind::Search { .. } => {
                    self.is_searching = true;
                    self.error = None;
                }
            },
            Resource::Success { data } => {
                self.movies = data;
                self.clear_flags();
                self.error = None;
            }
            Resource::Error { message, .. } => {
                self.clear_flags();
                self.error = Some(message);
            }
        }
    }

    fn clear_flags(&mut self) {
        self.is_loading = false;
        self.is_refreshing = false;
        self.is_searching = false;
    }
}
