//! In-memory todo store.
//!
//! Follows the same ordering and notification rules as `SqliteTodoStore`;
//! used where a database file is unwanted, mainly tests. Writes notify
//! while still holding the row lock.

use super::{sort_newest_first, ChangeNotifier, StoreError, StoreResult, TodoStore};
use crate::model::todo::{Quadrant, Todo, TodoId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::watch;

#[derive(Debug, Default)]
pub struct MemoryTodoStore {
    rows: Mutex<HashMap<TodoId, Todo>>,
    changes: ChangeNotifier,
    fail_writes: AtomicBool,
}

impl MemoryTodoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail with `StoreError::Backend`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.rows().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn rows(&self) -> MutexGuard<'_, HashMap<TodoId, Todo>> {
        self.rows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("writes disabled".to_string()));
        }
        Ok(())
    }

    fn collect<F>(&self, keep: F) -> Vec<Todo>
    where
        F: Fn(&Todo) -> bool,
    {
        let mut todos: Vec<Todo> = self
            .rows()
            .values()
            .filter(|todo| keep(todo))
            .cloned()
            .collect();
        sort_newest_first(&mut todos);
        todos
    }
}

impl TodoStore for MemoryTodoStore {
    fn get_all(&self) -> StoreResult<Vec<Todo>> {
        Ok(self.collect(|_| true))
    }

    fn get_by_quadrant(&self, quadrant: Quadrant) -> StoreResult<Vec<Todo>> {
        Ok(self.collect(|todo| todo.quadrant == quadrant))
    }

    fn insert_or_replace(&self, todo: &Todo) -> StoreResult<()> {
        self.check_writable()?;
        let mut rows = self.rows();
        rows.insert(todo.id, todo.clone());
        self.changes.notify();
        Ok(())
    }

    fn update(&self, todo: &Todo) -> StoreResult<()> {
        self.check_writable()?;
        let mut rows = self.rows();
        let slot = rows.get_mut(&todo.id).ok_or(StoreError::NotFound(todo.id))?;
        // created_at is immutable, matching the SQL UPDATE column list.
        let created_at = slot.created_at;
        *slot = todo.clone();
        slot.created_at = created_at;
        self.changes.notify();
        Ok(())
    }

    fn delete(&self, todo: &Todo) -> StoreResult<()> {
        self.check_writable()?;
        let mut rows = self.rows();
        if rows.remove(&todo.id).is_none() {
            return Err(StoreError::NotFound(todo.id));
        }
        self.changes.notify();
        Ok(())
    }

    fn delete_completed(&self) -> StoreResult<usize> {
        self.check_writable()?;
        let mut rows = self.rows();
        let before = rows.len();
        rows.retain(|_, todo| !todo.is_completed);
        let removed = before - rows.len();
        if removed > 0 {
            self.changes.notify();
        }
        Ok(removed)
    }

    fn get_by_id(&self, id: TodoId) -> StoreResult<Option<Todo>> {
        Ok(self.rows().get(&id).cloned())
    }

    fn search(&self, text: &str) -> StoreResult<Vec<Todo>> {
        Ok(self.collect(|todo| todo.matches_text(text)))
    }

    fn get_upcoming(&self, now_ms: i64) -> StoreResult<Vec<Todo>> {
        let mut todos = self.collect(|todo| todo.due_date.is_some_and(|due| due > now_ms));
        // Stable sort keeps newest-created first among equal due dates.
        todos.sort_by_key(|todo| todo.due_date);
        Ok(todos)
    }

    fn subscribe_changes(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }
}
