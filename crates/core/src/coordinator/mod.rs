//! Query coordination for a list screen.
//!
//! A [`QueryCoordinator`] turns raw query input into repository calls:
//! debounced while the user types, immediate on submit, and collect-latest
//! so that only the most recently started task reaches the published
//! [`ListState`].

mod debounce;
mod state;

pub use debounce::Debouncer;
pub use state::{CoordinatorPhase, ListState};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::connectivity::ConnectivityMonitor;
use crate::history::SearchHistory;
use crate::metrics;
use crate::movie::Movie;
use crate::repository::MovieRepository;
use crate::resource::Resource;
use state::TaskKind;

/// Default debounce window.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Coordinator settings.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// How long input must be stable before it is dispatched.
    pub debounce: Duration,
    /// How many recent searches the state carries.
    pub history_limit: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            history_limit: crate::history::DEFAULT_MAX_ITEMS,
        }
    }
}

/// Per-screen query coordinator.
///
/// Dropping the coordinator aborts its tasks.
pub struct QueryCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    repository: MovieRepository,
    history: SearchHistory,
    connectivity: Arc<dyn ConnectivityMonitor>,
    config: CoordinatorConfig,
    state: watch::Sender<ListState>,
    /// Generation of the task allowed to touch `state`.
    generation: AtomicU64,
    task: Mutex<Option<JoinHandle<()>>>,
    debouncer: Debouncer,
    /// Last query handed to a task by the debouncer or a submit.
    last_dispatched: Mutex<Option<String>>,
    observers: Mutex<Vec<JoinHandle<()>>>,
}

impl QueryCoordinator {
    pub fn new(
        repository: MovieRepository,
        history: SearchHistory,
        connectivity: Arc<dyn ConnectivityMonitor>,
        config: CoordinatorConfig,
    ) -> Self {
        let initial = ListState {
            is_offline: !connectivity.is_online(),
            ..Default::default()
        };
        let (state, _) = watch::channel(initial);

        Self {
            inner: Arc::new(Inner {
                repository,
                history,
                connectivity,
                debouncer: Debouncer::new(config.debounce),
                config,
                state,
                generation: AtomicU64::new(0),
                task: Mutex::new(None),
                last_dispatched: Mutex::new(None),
                observers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Load trending movies and start following connectivity and history.
    pub fn start(&self) {
        self.inner.observe_connectivity();
        self.inner.observe_history();
        *lock(&self.inner.last_dispatched) = Some(String::new());
        self.inner.start_task(TaskKind::Trending {
            force_refresh: false,
        });
    }

    /// Record new input and (re)arm the debounce timer.
    pub fn on_query_changed(&self, query: &str) {
        self.inner.state.send_modify(|state| {
            state.query = query.to_string();
            state.phase = CoordinatorPhase::Debouncing;
        });

        let inner = Arc::clone(&self.inner);
        let query = query.to_string();
        self.inner.debouncer.arm(async move {
            inner.dispatch_settled(query);
        });
    }

    /// Search `query` now, skipping the debounce, and save it in history.
    pub fn submit(&self, query: &str) {
        self.inner.debouncer.cancel();
        self.inner.state.send_modify(|state| {
            state.query = query.to_string();
            if !query.trim().is_empty() {
                state.show_history = false;
            }
        });

        if !query.trim().is_empty() {
            if let Err(e) = self.inner.history.save_search(query) {
                warn!(error = %e, query, "Failed to save search");
            }
        }

        *lock(&self.inner.last_dispatched) = Some(query.to_string());
        self.inner.start_task(kind_for(query, false));
    }

    /// Pull-to-refresh: search again, or force a trending refresh.
    pub fn refresh(&self) {
        let query = self.inner.state.borrow().query.clone();
        self.inner.debouncer.cancel();
        self.inner.start_task(kind_for(&query, true));
    }

    /// Clear the error and run the current query again.
    pub fn retry(&self) {
        self.inner.state.send_modify(|state| state.error = None);
        let query = self.inner.state.borrow().query.clone();
        self.inner.debouncer.cancel();
        self.inner.start_task(kind_for(&query, false));
    }

    /// Pick a query from the history list.
    pub fn select_history(&self, query: &str) {
        self.on_query_changed(query);
        self.submit(query);
    }

    pub fn delete_history(&self, query: &str) {
        if let Err(e) = self.inner.history.delete_search(query) {
            warn!(error = %e, query, "Failed to delete search");
        }
    }

    pub fn clear_history(&self) {
        if let Err(e) = self.inner.history.clear_history() {
            warn!(error = %e, "Failed to clear search history");
        }
    }

    /// The history list is shown while the search field has focus and is
    /// empty.
    pub fn set_search_focus(&self, focused: bool) {
        self.inner.state.send_modify(|state| {
            state.show_history = focused && state.query.is_empty();
        });
    }

    pub fn subscribe(&self) -> watch::Receiver<ListState> {
        self.inner.state.subscribe()
    }

    pub fn snapshot(&self) -> ListState {
        self.inner.state.borrow().clone()
    }

    /// Abort every task. Further emissions are discarded.
    pub fn shutdown(&self) {
        self.inner.shutdown();
    }
}

impl Drop for QueryCoordinator {
    fn drop(&mut self) {
        self.inner.shutdown();
    }
}

impl Inner {
    /// Debounce fired with a settled `query`.
    fn dispatch_settled(self: &Arc<Self>, query: String) {
        {
            let mut last = lock(&self.last_dispatched);
            if last.as_deref() == Some(query.as_str()) {
                debug!(query, "Query unchanged since last dispatch, skipping");
                drop(last);
                let kind = kind_for(&query, false);
                self.state.send_modify(|state| state.phase = kind.phase());
                return;
            }
            *last = Some(query.clone());
        }
        self.start_task(kind_for(&query, false));
    }

    /// Cancel the current task and start `kind` under a new generation.
    fn start_task(self: &Arc<Self>, kind: TaskKind) {
        // Held until the new handle is stored so generation order matches
        // slot order.
        let mut slot = lock(&self.task);

        let mut generation = 0;
        self.state.send_modify(|state| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            state.phase = kind.phase();
        });

        debug!(generation, kind = kind.label(), "Starting task");
        metrics::COORDINATOR_DISPATCHES
            .with_label_values(&[kind.label()])
            .inc();

        let mut stream = match &kind {
            TaskKind::Trending { force_refresh } => self.repository.fetch_trending(*force_refresh),
            TaskKind::Search { query } => self.repository.search(query),
        };

        let inner = Arc::clone(self);
        let handle = tokio::spawn(async move {
            while let Some(resource) = stream.next().await {
                if !inner.apply(generation, &kind, resource) {
                    debug!(generation, "Task superseded, dropping its output");
                    break;
                }
            }
        });

        if let Some(previous) = slot.replace(handle) {
            if !previous.is_finished() {
                metrics::COORDINATOR_CANCELLATIONS.inc();
            }
            previous.abort();
        }
    }

    /// Apply one emission if `generation` is still current. Returns whether
    /// it was.
    fn apply(&self, generation: u64, kind: &TaskKind, resource: Resource<Vec<Movie>>) -> bool {
        let mut current = false;
        self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            current = true;
            state.apply(kind, resource);
            true
        });
        current
    }

    fn observe_connectivity(self: &Arc<Self>) {
        let mut rx = self.connectivity.subscribe();
        let inner = Arc::clone(self);
        let handle = tokio::spawn(async move {
            loop {
                let offline = !*rx.borrow_and_update();
                inner.state.send_if_modified(|state| {
                    let changed = state.is_offline != offline;
                    state.is_offline = offline;
                    changed
                });
                if rx.changed().await.is_err() {
                    break;
                }
            }
        });
        lock(&self.observers).push(handle);
    }

    fn observe_history(self: &Arc<Self>) {
        let mut recent = self.history.observe_recent(self.config.history_limit);
        let inner = Arc::clone(self);
        let handle = tokio::spawn(async move {
            while let Some(queries) = recent.next().await {
                inner.state.send_modify(|state| state.history = queries);
            }
        });
        lock(&self.observers).push(handle);
    }

    fn shutdown(&self) {
        self.debouncer.cancel();
        let mut slot = lock(&self.task);
        // Invalidate whatever is still running.
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = slot.take() {
            task.abort();
        }
        drop(slot);
        for observer in lock(&self.observers).drain(..) {
            observer.abort();
        }
    }
}

fn kind_for(query: &str, force_refresh: bool) -> TaskKind {
    if query.trim().is_empty() {
        TaskKind::Trending { force_refresh }
    } else {
        TaskKind::Search {
            query: query.to_string(),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
