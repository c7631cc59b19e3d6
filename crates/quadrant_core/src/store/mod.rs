//! Record store for todos.
//!
//! # Responsibility
//! - Define the `TodoStore` contract: keyed CRUD plus ordered read queries.
//! - Publish a revision counter after every effective write.
//! - Turn read queries into live sequences (`LiveQuery`).
//!
//! # Invariants
//! - `get_all`, `get_by_quadrant` and `search` order by `created_at DESC, id ASC`.
//! - `get_upcoming` orders by `due_date ASC`.
//! - The revision counter only moves when rows actually changed.
//! - Writers bump the revision before releasing their lock.

use crate::db::DbError;
use crate::model::todo::{Quadrant, Todo, TodoId};
use std::error::Error;
use std::fmt::{Display, Formatter};
use tokio::sync::watch;

mod live;
mod memory;
mod sqlite;

pub use live::{live_all, live_by_quadrant, live_search, live_upcoming, LiveQuery, Revisioned};
pub use memory::MemoryTodoStore;
pub use sqlite::SqliteTodoStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage-layer failure.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    /// Target row does not exist.
    NotFound(TodoId),
    /// Persisted row cannot be decoded into a valid `Todo`.
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Non-SQLite backend reported a failure.
    Backend(String),
    /// Blocking store task panicked or was cancelled.
    Join(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "todo record not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted todo data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "todo store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "todo store requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "todo store requires column `{column}` in table `{table}`"
            ),
            Self::Backend(message) => write!(f, "todo store backend failure: {message}"),
            Self::Join(message) => write!(f, "todo store task failed: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Keyed todo storage with change notification.
///
/// Calls are synchronous; async callers dispatch them to the blocking pool.
pub trait TodoStore: Send + Sync + 'static {
    /// All todos, newest-created first.
    fn get_all(&self) -> StoreResult<Vec<Todo>>;
    /// Todos filed under `quadrant`, newest-created first.
    fn get_by_quadrant(&self, quadrant: Quadrant) -> StoreResult<Vec<Todo>>;
    /// Upserts by id.
    fn insert_or_replace(&self, todo: &Todo) -> StoreResult<()>;
    /// Overwrites an existing row; `NotFound` when the id is unknown.
    fn update(&self, todo: &Todo) -> StoreResult<()>;
    /// Removes the row with `todo.id`; `NotFound` when the id is unknown.
    fn delete(&self, todo: &Todo) -> StoreResult<()>;
    /// Removes every completed todo and returns how many were removed.
    fn delete_completed(&self) -> StoreResult<usize>;
    fn get_by_id(&self, id: TodoId) -> StoreResult<Option<Todo>>;
    /// Case-sensitive substring match on title or description.
    fn search(&self, text: &str) -> StoreResult<Vec<Todo>>;
    /// Todos due strictly after `now_ms`, soonest first.
    fn get_upcoming(&self, now_ms: i64) -> StoreResult<Vec<Todo>>;
    /// Revision counter bumped after each effective write.
    fn subscribe_changes(&self) -> watch::Receiver<u64>;
}

/// Revision counter shared by store implementations.
#[derive(Debug)]
pub struct ChangeNotifier {
    tx: watch::Sender<u64>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx }
    }

    /// Bumps the revision, waking every live query.
    pub fn notify(&self) {
        self.tx.send_modify(|revision| *revision = revision.wrapping_add(1));
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.tx.borrow()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Newest-created first, id as tie breaker.
pub(crate) fn sort_newest_first(todos: &mut [Todo]) {
    todos.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::ChangeNotifier;

    #[test]
    fn notifier_bumps_revision_without_receivers() {
        let notifier = ChangeNotifier::new();
        assert_eq!(notifier.revision(), 0);
        notifier.notify();
        notifier.notify();
        assert_eq!(notifier.revision(), 2);
    }

    #[test]
    fn subscriber_sees_pending_change() {
        let notifier = ChangeNotifier::new();
        let mut rx = notifier.subscribe();
        assert!(!rx.has_changed().unwrap());
        notifier.notify();
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), 1);
    }
}
