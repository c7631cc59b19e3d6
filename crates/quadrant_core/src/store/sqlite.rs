//! SQLite-backed todo store.
//!
//! # Responsibility
//! - Map `Todo` records to the `todos` table and back.
//! - Serialize access to the single connection.
//!
//! # Invariants
//! - Read paths reject undecodable rows instead of masking them.
//! - Write paths notify subscribers only when at least one row changed.

use super::{ChangeNotifier, StoreError, StoreResult, TodoStore};
use crate::db::migrations::latest_version;
use crate::db::{open_db, open_db_in_memory};
use crate::model::todo::{Priority, Quadrant, Todo, TodoId};
use log::warn;
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use uuid::Uuid;

const TODO_SELECT_SQL: &str = "SELECT
    id,
    title,
    description,
    is_completed,
    quadrant,
    created_at,
    due_date,
    priority
FROM todos";

const TODO_COLUMNS: [&str; 8] = [
    "id",
    "title",
    "description",
    "is_completed",
    "quadrant",
    "created_at",
    "due_date",
    "priority",
];

/// Todo store over one migrated SQLite connection.
///
/// Cloning is cheap; clones share the connection and the revision counter.
#[derive(Clone)]
pub struct SqliteTodoStore {
    conn: Arc<Mutex<Connection>>,
    changes: Arc<ChangeNotifier>,
}

impl SqliteTodoStore {
    /// Wraps an already migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when `PRAGMA user_version` is behind.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` on schema drift.
    pub fn try_new(conn: Connection) -> StoreResult<Self> {
        ensure_todo_connection_ready(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            changes: Arc::new(ChangeNotifier::new()),
        })
    }

    /// Opens (and migrates) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::try_new(open_db(path)?)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::try_new(open_db_in_memory()?)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| {
            warn!("event=store_lock module=store status=recovered reason=poisoned");
            poisoned.into_inner()
        })
    }

    fn query_list(&self, sql: &str, params: impl rusqlite::Params) -> StoreResult<Vec<Todo>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut todos = Vec::new();
        while let Some(row) = rows.next()? {
            todos.push(parse_todo_row(row)?);
        }
        Ok(todos)
    }

    fn write(&self, sql: &str, params: impl rusqlite::Params) -> StoreResult<usize> {
        let conn = self.lock();
        let changed = conn.execute(sql, params)?;
        if changed > 0 {
            self.changes.notify();
        }
        Ok(changed)
    }
}

impl TodoStore for SqliteTodoStore {
    fn get_all(&self) -> StoreResult<Vec<Todo>> {
        self.query_list(
            &format!("{TODO_SELECT_SQL} ORDER BY created_at DESC, id ASC;"),
            [],
        )
    }

    fn get_by_quadrant(&self, quadrant: Quadrant) -> StoreResult<Vec<Todo>> {
        self.query_list(
            &format!("{TODO_SELECT_SQL} WHERE quadrant = ?1 ORDER BY created_at DESC, id ASC;"),
            [quadrant.as_name()],
        )
    }

    fn insert_or_replace(&self, todo: &Todo) -> StoreResult<()> {
        self.write(
            "INSERT OR REPLACE INTO todos (
                id,
                title,
                description,
                is_completed,
                quadrant,
                created_at,
                due_date,
                priority
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                todo.id.to_string(),
                todo.title.as_str(),
                todo.description.as_str(),
                bool_to_int(todo.is_completed),
                todo.quadrant.as_name(),
                todo.created_at,
                todo.due_date,
                i64::from(todo.priority.value()),
            ],
        )?;
        Ok(())
    }

    fn update(&self, todo: &Todo) -> StoreResult<()> {
        let changed = self.write(
            "UPDATE todos
             SET
                title = ?1,
                description = ?2,
                is_completed = ?3,
                quadrant = ?4,
                due_date = ?5,
                priority = ?6
             WHERE id = ?7;",
            params![
                todo.title.as_str(),
                todo.description.as_str(),
                bool_to_int(todo.is_completed),
                todo.quadrant.as_name(),
                todo.due_date,
                i64::from(todo.priority.value()),
                todo.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(StoreError::NotFound(todo.id));
        }
        Ok(())
    }

    fn delete(&self, todo: &Todo) -> StoreResult<()> {
        let changed = self.write("DELETE FROM todos WHERE id = ?1;", [todo.id.to_string()])?;
        if changed == 0 {
            return Err(StoreError::NotFound(todo.id));
        }
        Ok(())
    }

    fn delete_completed(&self) -> StoreResult<usize> {
        self.write("DELETE FROM todos WHERE is_completed = 1;", [])
    }

    fn get_by_id(&self, id: TodoId) -> StoreResult<Option<Todo>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!("{TODO_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_todo_row(row)?));
        }
        Ok(None)
    }

    fn search(&self, text: &str) -> StoreResult<Vec<Todo>> {
        // instr() is case-sensitive, unlike LIKE.
        self.query_list(
            &format!(
                "{TODO_SELECT_SQL}
                 WHERE ?1 = ''
                    OR instr(title, ?1) > 0
                    OR instr(description, ?1) > 0
                 ORDER BY created_at DESC, id ASC;"
            ),
            [text],
        )
    }

    fn get_upcoming(&self, now_ms: i64) -> StoreResult<Vec<Todo>> {
        self.query_list(
            &format!(
                "{TODO_SELECT_SQL}
                 WHERE due_date IS NOT NULL
                   AND due_date > ?1
                 ORDER BY due_date ASC, created_at DESC, id ASC;"
            ),
            [now_ms],
        )
    }

    fn subscribe_changes(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }
}

fn parse_todo_row(row: &Row<'_>) -> StoreResult<Todo> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        StoreError::InvalidData(format!("invalid uuid value `{id_text}` in todos.id"))
    })?;

    let quadrant_text: String = row.get("quadrant")?;
    let quadrant = Quadrant::from_name(&quadrant_text).ok_or_else(|| {
        StoreError::InvalidData(format!(
            "invalid quadrant `{quadrant_text}` in todos.quadrant"
        ))
    })?;

    let priority_value: i64 = row.get("priority")?;
    let priority = Priority::from_value(priority_value).ok_or_else(|| {
        StoreError::InvalidData(format!(
            "invalid priority `{priority_value}` in todos.priority"
        ))
    })?;

    let is_completed = match row.get::<_, i64>("is_completed")? {
        0 => false,
        1 => true,
        other => {
            return Err(StoreError::InvalidData(format!(
                "invalid is_completed value `{other}` in todos.is_completed"
            )));
        }
    };

    Ok(Todo {
        id,
        title: row.get("title")?,
        description: row.get("description")?,
        is_completed,
        quadrant,
        created_at: row.get("created_at")?,
        due_date: row.get("due_date")?,
        priority,
    })
}

fn ensure_todo_connection_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version < expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "todos")? {
        return Err(StoreError::MissingRequiredTable("todos"));
    }
    for column in TODO_COLUMNS {
        if !table_has_column(conn, "todos", column)? {
            return Err(StoreError::MissingRequiredColumn {
                table: "todos",
                column,
            });
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> StoreResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

fn bool_to_int(value: bool) -> i64 {
    i64::from(value)
}
