//! Matrix view model.
//!
//! # Responsibility
//! - Combine the four per-quadrant live queries with the search query and
//!   show-completed flag into one `MatrixViewState`.
//! - Forward user intents to the repository and surface failures as a
//!   one-shot error message.
//! - Share upstream live queries between subscribers and release them after
//!   an idle grace period.
//!
//! # Invariants
//! - State stays `is_loading = true` until all four quadrants reported once.
//! - Each failed intent writes `error` exactly once.
//! - Recomputation never clears `error`; only `clear_error` does.
//! - At most one pump task runs per view model.
//! - Buckets are published only when all four were read at one store
//!   revision, so a moved todo never shows in two buckets or in none.
//! - Dropping the view model closes every subscription.

use crate::model::error::{TodoError, TodoResult};
use crate::model::todo::{Priority, Quadrant, Todo, TodoId};
use crate::model::view_state::{MatrixViewState, QuadrantState};
use crate::repo::todo_repo::{NewTodo, TodoRepository};
use crate::store::{LiveQuery, Revisioned, TodoStore};
use futures::stream::{select_all, StreamExt};
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::runtime::{Handle, TryCurrentError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Idle time with zero subscribers before upstream queries are released.
pub const DEFAULT_IDLE_GRACE: Duration = Duration::from_secs(5);

/// Aggregates live todo reads into a presentation-ready matrix state.
pub struct MatrixViewModel<S: TodoStore> {
    inner: Arc<Inner<S>>,
}

struct Inner<S: TodoStore> {
    repo: Arc<TodoRepository<S>>,
    search_query: watch::Sender<String>,
    show_completed: watch::Sender<bool>,
    selected_due_date: watch::Sender<Option<i64>>,
    state: watch::Sender<MatrixViewState>,
    sharing: Mutex<Sharing>,
    idle_grace: Duration,
    runtime: Handle,
}

#[derive(Default)]
struct Sharing {
    subscribers: usize,
    pump: Option<JoinHandle<()>>,
    idle_timer: Option<JoinHandle<()>>,
    timer_generation: u64,
    /// Set once the owning view model is dropped.
    closed: bool,
}

impl<S: TodoStore> MatrixViewModel<S> {
    /// Creates an idle view model; the pump starts on first `subscribe`.
    ///
    /// # Errors
    /// Fails when called outside a Tokio runtime.
    pub fn new(
        repo: Arc<TodoRepository<S>>,
        idle_grace: Duration,
    ) -> Result<Self, TryCurrentError> {
        let runtime = Handle::try_current()?;
        let (search_query, _) = watch::channel(String::new());
        let (show_completed, _) = watch::channel(true);
        let (selected_due_date, _) = watch::channel(None);
        let (state, _) = watch::channel(MatrixViewState::loading());
        Ok(Self {
            inner: Arc::new(Inner {
                repo,
                search_query,
                show_completed,
                selected_due_date,
                state,
                sharing: Mutex::new(Sharing::default()),
                idle_grace,
                runtime,
            }),
        })
    }

    pub fn repository(&self) -> &Arc<TodoRepository<S>> {
        &self.inner.repo
    }

    /// Attaches a consumer, starting the pump if it is not running.
    pub fn subscribe(&self) -> ViewSubscription<S> {
        self.inner.acquire();
        ViewSubscription {
            rx: self.inner.state.subscribe(),
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Latest published state.
    pub fn state(&self) -> MatrixViewState {
        self.inner.state.borrow().clone()
    }

    /// Whether upstream live queries are currently attached.
    pub fn is_live(&self) -> bool {
        self.inner.lock_sharing().pump.is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock_sharing().subscribers
    }

    pub async fn add_task(&self, request: NewTodo) -> TodoResult<Todo> {
        let result = self.inner.repo.add_task(request).await;
        self.inner.report("add_task", result)
    }

    pub async fn update_task(&self, todo: Todo) -> TodoResult<Todo> {
        let result = self.inner.repo.update_task(todo).await;
        self.inner.report("update_task", result)
    }

    pub async fn toggle_completion(&self, id: TodoId) -> TodoResult<Todo> {
        let result = self.inner.repo.toggle_completion(id).await;
        self.inner.report("toggle_completion", result)
    }

    pub async fn move_to_quadrant(&self, id: TodoId, quadrant: Quadrant) -> TodoResult<Todo> {
        let result = self.inner.repo.move_to_quadrant(id, quadrant).await;
        self.inner.report("move_to_quadrant", result)
    }

    pub async fn set_due_date(&self, id: TodoId, due_date: Option<i64>) -> TodoResult<Todo> {
        let result = self.inner.repo.set_due_date(id, due_date).await;
        self.inner.report("set_due_date", result)
    }

    pub async fn set_priority(&self, id: TodoId, priority: Priority) -> TodoResult<Todo> {
        let result = self.inner.repo.set_priority(id, priority).await;
        self.inner.report("set_priority", result)
    }

    pub async fn delete_task(&self, id: TodoId) -> TodoResult<()> {
        let result = self.inner.repo.delete_task(id).await;
        self.inner.report("delete_task", result)
    }

    pub async fn clear_completed(&self) -> TodoResult<usize> {
        let result = self.inner.repo.clear_completed().await;
        self.inner.report("clear_completed", result)
    }

    pub fn set_search_query(&self, query: impl Into<String>) {
        self.inner.search_query.send_replace(query.into());
    }

    pub fn search_query(&self) -> String {
        self.inner.search_query.borrow().clone()
    }

    pub fn toggle_show_completed(&self) {
        self.inner.show_completed.send_modify(|show| *show = !*show);
    }

    pub fn show_completed(&self) -> bool {
        *self.inner.show_completed.borrow()
    }

    /// Stores the date picked in the UI; it does not filter buckets.
    pub fn set_selected_due_date(&self, due_date: Option<i64>) {
        self.inner.selected_due_date.send_replace(due_date);
    }

    pub fn selected_due_date(&self) -> Option<i64> {
        *self.inner.selected_due_date.borrow()
    }

    /// Dismisses the current error message.
    pub fn clear_error(&self) {
        self.inner.state.send_if_modified(|state| state.error.take().is_some());
    }

    /// Live search for the query active at call time.
    pub fn search_tasks(&self) -> LiveQuery<Vec<Todo>> {
        self.inner.repo.search_tasks(self.search_query())
    }

    pub fn upcoming(&self) -> LiveQuery<Vec<Todo>> {
        self.inner.repo.upcoming()
    }
}

impl<S: TodoStore> Drop for MatrixViewModel<S> {
    fn drop(&mut self) {
        // Subscriptions only hold weak references; once the pump task is
        // gone the state channel closes and waiting consumers see `None`.
        let mut sharing = self.inner.lock_sharing();
        sharing.closed = true;
        if let Some(timer) = sharing.idle_timer.take() {
            timer.abort();
        }
        if let Some(pump) = sharing.pump.take() {
            pump.abort();
            info!("event=view_pump module=view status=stop reason=owner_dropped");
        }
    }
}

impl<S: TodoStore> Inner<S> {
    fn lock_sharing(&self) -> MutexGuard<'_, Sharing> {
        self.sharing
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn acquire(self: &Arc<Self>) {
        let mut sharing = self.lock_sharing();
        sharing.subscribers += 1;
        if let Some(timer) = sharing.idle_timer.take() {
            timer.abort();
            sharing.timer_generation += 1;
        }
        if sharing.pump.is_none() {
            info!(
                "event=view_pump module=view status=start subscribers={}",
                sharing.subscribers
            );
            sharing.pump = Some(self.runtime.spawn(run_pump(Arc::clone(self))));
        }
    }

    fn release(self: &Arc<Self>) {
        let mut sharing = self.lock_sharing();
        sharing.subscribers = sharing.subscribers.saturating_sub(1);
        if sharing.closed || sharing.subscribers > 0 || sharing.pump.is_none() {
            return;
        }

        sharing.timer_generation += 1;
        let generation = sharing.timer_generation;
        let grace = self.idle_grace;
        let inner = Arc::clone(self);
        debug!(
            "event=view_idle module=view status=armed grace_ms={}",
            grace.as_millis()
        );
        sharing.idle_timer = Some(self.runtime.spawn(async move {
            tokio::time::sleep(grace).await;
            inner.stop_if_idle(generation);
        }));
    }

    fn stop_if_idle(&self, generation: u64) {
        let mut sharing = self.lock_sharing();
        if sharing.timer_generation != generation || sharing.subscribers > 0 {
            return;
        }
        sharing.idle_timer = None;
        if let Some(pump) = sharing.pump.take() {
            pump.abort();
            info!("event=view_pump module=view status=stop reason=idle");
        }
    }

    /// Records a failed intent in the state and hands the outcome back.
    fn report<T>(&self, action: &str, result: TodoResult<T>) -> TodoResult<T> {
        if let Err(err) = &result {
            warn!(
                "event=view_intent module=view status=error action={} error_code={}",
                action,
                err.code()
            );
            let message = err.user_message().to_string();
            self.state.send_modify(|state| state.error = Some(message));
        }
        result
    }

    /// Publishes a new state if every bucket was read at the same revision.
    fn recompute(&self, latest: &[Option<Snapshot>; 4]) {
        let Some(revision) = latest[0].as_ref().map(|snapshot| snapshot.revision) else {
            return;
        };
        let consistent = latest
            .iter()
            .all(|slot| slot.as_ref().is_some_and(|snapshot| snapshot.revision == revision));
        if !consistent {
            return;
        }

        let query = self.search_query.borrow().clone();
        let show_completed = *self.show_completed.borrow();
        let quadrants: Vec<QuadrantState> = Quadrant::ALL
            .into_iter()
            .zip(latest.iter().flatten())
            .map(|(quadrant, snapshot)| {
                QuadrantState::new(
                    quadrant,
                    derive_bucket(&snapshot.todos, &query, show_completed),
                )
            })
            .collect();

        self.state.send_if_modified(|state| {
            let mut next = state.clone();
            next.quadrants = quadrants;
            next.is_loading = false;
            next.search_query = query;
            next.show_completed = show_completed;
            if next == *state {
                return false;
            }
            *state = next;
            true
        });
    }
}

/// Bucket contents read at one stable store revision.
struct Snapshot {
    revision: u64,
    todos: Vec<Todo>,
}

async fn run_pump<S: TodoStore>(inner: Arc<Inner<S>>) {
    let mut quadrants = select_all(Quadrant::ALL.into_iter().map(|quadrant| {
        inner
            .repo
            .todos_in(quadrant)
            .into_revisioned_stream()
            .map(move |emission| (quadrant, emission))
            .boxed()
    }));
    let mut search_rx = inner.search_query.subscribe();
    let mut show_rx = inner.show_completed.subscribe();
    let mut latest: [Option<Snapshot>; 4] = Default::default();

    loop {
        tokio::select! {
            item = quadrants.next() => match item {
                Some((quadrant, Revisioned { revision, stable, value: Ok(todos) })) => {
                    // A torn read is dropped; its follow-up emission is pending.
                    latest[quadrant.index()] = stable.then_some(Snapshot { revision, todos });
                }
                Some((quadrant, Revisioned { value: Err(err), .. })) => {
                    warn!(
                        "event=view_pump module=view status=error quadrant={} error={}",
                        quadrant.as_name(),
                        err
                    );
                    let message = TodoError::from(err).user_message().to_string();
                    inner.state.send_modify(|state| state.error = Some(message));
                    continue;
                }
                None => break,
            },
            changed = search_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            changed = show_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
        inner.recompute(&latest);
    }
    debug!("event=view_pump module=view status=exit");
}

/// Applies search and completion filters, then orders by due date.
///
/// Undated todos sort last; ties keep the store order (newest first).
pub fn derive_bucket(todos: &[Todo], query: &str, show_completed: bool) -> Vec<Todo> {
    let mut bucket: Vec<Todo> = todos
        .iter()
        .filter(|todo| show_completed || !todo.is_completed)
        .filter(|todo| todo.matches_text(query))
        .cloned()
        .collect();
    bucket.sort_by_key(|todo| (todo.due_date.is_none(), todo.due_date));
    bucket
}

/// Handle held by one view consumer.
///
/// Dropping it detaches the consumer; the last detach arms the idle timer.
pub struct ViewSubscription<S: TodoStore> {
    rx: watch::Receiver<MatrixViewState>,
    inner: Weak<Inner<S>>,
}

impl<S: TodoStore> ViewSubscription<S> {
    pub fn current(&self) -> MatrixViewState {
        self.rx.borrow().clone()
    }

    /// Waits for the next published state.
    ///
    /// Returns `None` once the view model has been dropped.
    pub async fn changed(&mut self) -> Option<MatrixViewState> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Waits until the published state satisfies `predicate`.
    pub async fn wait_for<F>(&mut self, predicate: F) -> Option<MatrixViewState>
    where
        F: FnMut(&MatrixViewState) -> bool,
    {
        let state = self.rx.wait_for(predicate).await.ok()?;
        Some(state.clone())
    }
}

impl<S: TodoStore> Drop for ViewSubscription<S> {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.release();
        }
    }
}
