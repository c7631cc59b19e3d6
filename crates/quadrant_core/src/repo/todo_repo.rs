//! Todo repository.
//!
//! # Responsibility
//! - Provide the task-oriented API (add/update/toggle/move/delete/clear).
//! - Run blocking store calls off the async executor.
//! - Emit `todo_*` log events carrying ids only, never titles.
//!
//! # Invariants
//! - `add_task` trims title/description and rejects blank titles.
//! - `update_task` applies the same title rule and keeps `created_at`.
//! - Read-modify-write sequences run inside one blocking task.

use crate::model::error::{TodoError, TodoResult};
use crate::model::todo::{Priority, Quadrant, Todo, TodoId};
use crate::repo::clock::{Clock, SystemClock};
use crate::store::{
    live_all, live_by_quadrant, live_search, live_upcoming, LiveQuery, StoreError, TodoStore,
};
use log::{info, warn};
use std::sync::Arc;
use std::time::Instant;

/// Input for [`TodoRepository::add_task`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTodo {
    pub title: String,
    pub description: String,
    pub quadrant: Quadrant,
    /// Unix epoch milliseconds.
    pub due_date: Option<i64>,
    pub priority: Priority,
}

impl NewTodo {
    pub fn new(title: impl Into<String>, quadrant: Quadrant) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            quadrant,
            due_date: None,
            priority: Priority::default(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn due_date(mut self, due_date: Option<i64>) -> Self {
        self.due_date = due_date;
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

/// Repository over a shared todo store.
///
/// Construct once and share through `Arc`; it holds no mutable state.
pub struct TodoRepository<S: TodoStore> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S: TodoStore> TodoRepository<S> {
    /// Creates a repository using wall-clock time.
    pub fn new(store: S) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Arc::new(store),
            clock,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Creates and persists a new todo.
    ///
    /// # Errors
    /// - `EmptyTitle` when the trimmed title is empty; nothing is written.
    /// - `Store` on persistence failure.
    pub async fn add_task(&self, request: NewTodo) -> TodoResult<Todo> {
        let started_at = Instant::now();
        let now_ms = self.clock.now_ms();
        let result = self
            .run(move |store| {
                let mut todo = Todo::create(
                    &request.title,
                    &request.description,
                    request.quadrant,
                    now_ms,
                )?;
                todo.due_date = request.due_date;
                todo.priority = request.priority;
                store.insert_or_replace(&todo)?;
                Ok(todo)
            })
            .await;
        log_outcome("todo_add", started_at, &result, |todo| todo.id);
        result
    }

    /// Persists `todo` over the existing record with the same id.
    ///
    /// The title must still be non-blank; `created_at` of the stored record
    /// wins over the value passed in.
    pub async fn update_task(&self, todo: Todo) -> TodoResult<Todo> {
        let started_at = Instant::now();
        let result = self
            .mutate(todo.id, move |current| {
                todo.validate()?;
                let created_at = current.created_at;
                *current = todo;
                current.created_at = created_at;
                Ok(())
            })
            .await;
        log_outcome("todo_update", started_at, &result, |todo| todo.id);
        result
    }

    /// Flips `is_completed`.
    pub async fn toggle_completion(&self, id: TodoId) -> TodoResult<Todo> {
        let started_at = Instant::now();
        let result = self
            .mutate(id, |current| {
                current.is_completed = !current.is_completed;
                Ok(())
            })
            .await;
        log_outcome("todo_toggle", started_at, &result, |todo| todo.id);
        result
    }

    /// Files the todo under another quadrant.
    pub async fn move_to_quadrant(&self, id: TodoId, quadrant: Quadrant) -> TodoResult<Todo> {
        let started_at = Instant::now();
        let result = self
            .mutate(id, move |current| {
                current.quadrant = quadrant;
                Ok(())
            })
            .await;
        log_outcome("todo_move", started_at, &result, |todo| todo.id);
        result
    }

    /// Sets or clears the due date.
    pub async fn set_due_date(&self, id: TodoId, due_date: Option<i64>) -> TodoResult<Todo> {
        let started_at = Instant::now();
        let result = self
            .mutate(id, move |current| {
                current.due_date = due_date;
                Ok(())
            })
            .await;
        log_outcome("todo_due_date", started_at, &result, |todo| todo.id);
        result
    }

    pub async fn set_priority(&self, id: TodoId, priority: Priority) -> TodoResult<Todo> {
        let started_at = Instant::now();
        let result = self
            .mutate(id, move |current| {
                current.priority = priority;
                Ok(())
            })
            .await;
        log_outcome("todo_priority", started_at, &result, |todo| todo.id);
        result
    }

    /// Replaces title and description, trimmed like on creation.
    pub async fn edit_details(
        &self,
        id: TodoId,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> TodoResult<Todo> {
        let started_at = Instant::now();
        let title = title.into();
        let description = description.into();
        let result = self
            .mutate(id, move |current| {
                let title = title.trim();
                if title.is_empty() {
                    return Err(TodoError::EmptyTitle);
                }
                current.title = title.to_string();
                current.description = description.trim().to_string();
                Ok(())
            })
            .await;
        log_outcome("todo_edit", started_at, &result, |todo| todo.id);
        result
    }

    /// Removes one todo.
    pub async fn delete_task(&self, id: TodoId) -> TodoResult<()> {
        let started_at = Instant::now();
        let result = self
            .run(move |store| {
                let todo = store.get_by_id(id)?.ok_or(TodoError::TodoNotFound(id))?;
                store.delete(&todo)?;
                Ok(())
            })
            .await;
        log_outcome("todo_delete", started_at, &result, |_| id);
        result
    }

    /// Removes every completed todo; returns how many were removed.
    pub async fn clear_completed(&self) -> TodoResult<usize> {
        let started_at = Instant::now();
        let result = self
            .run(|store| Ok(store.delete_completed()?))
            .await;
        match &result {
            Ok(removed) => info!(
                "event=todo_clear_completed module=repo status=ok removed={} duration_ms={}",
                removed,
                started_at.elapsed().as_millis()
            ),
            Err(err) => warn!(
                "event=todo_clear_completed module=repo status=error error_code={} duration_ms={} error={}",
                err.code(),
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    /// Point lookup.
    pub async fn get_task(&self, id: TodoId) -> TodoResult<Option<Todo>> {
        self.run(move |store| Ok(store.get_by_id(id)?)).await
    }

    /// Live list of every todo, newest first.
    pub fn todos(&self) -> LiveQuery<Vec<Todo>> {
        live_all(&self.store)
    }

    /// Live list of one quadrant, newest first.
    pub fn todos_in(&self, quadrant: Quadrant) -> LiveQuery<Vec<Todo>> {
        live_by_quadrant(&self.store, quadrant)
    }

    /// Live case-sensitive search over title and description.
    pub fn search_tasks(&self, text: impl Into<String>) -> LiveQuery<Vec<Todo>> {
        live_search(&self.store, text)
    }

    /// Live list of todos due after "now", soonest first.
    ///
    /// "Now" is read from the clock on every re-emission.
    pub fn upcoming(&self) -> LiveQuery<Vec<Todo>> {
        let clock = Arc::clone(&self.clock);
        live_upcoming(&self.store, move || clock.now_ms())
    }

    async fn run<T, F>(&self, f: F) -> TodoResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&S) -> TodoResult<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|err| TodoError::Store(StoreError::Join(err.to_string())))?
    }

    /// Loads `id`, applies `change`, and writes the result back.
    async fn mutate<F>(&self, id: TodoId, change: F) -> TodoResult<Todo>
    where
        F: FnOnce(&mut Todo) -> TodoResult<()> + Send + 'static,
    {
        self.run(move |store| {
            let mut todo = store.get_by_id(id)?.ok_or(TodoError::TodoNotFound(id))?;
            change(&mut todo)?;
            store.update(&todo)?;
            Ok(todo)
        })
        .await
    }
}

fn log_outcome<T>(
    event: &str,
    started_at: Instant,
    result: &TodoResult<T>,
    id_of: impl FnOnce(&T) -> TodoId,
) {
    match result {
        Ok(value) => info!(
            "event={} module=repo status=ok todo_id={} duration_ms={}",
            event,
            id_of(value),
            started_at.elapsed().as_millis()
        ),
        Err(err) => warn!(
            "event={} module=repo status=error error_code={} duration_ms={} error={}",
            event,
            err.code(),
            started_at.elapsed().as_millis(),
            err
        ),
    }
}
