//! Core of the Quadrant Eisenhower-matrix todo list.
//!
//! Layers, leaf first: `db` (SQLite bootstrap) → `store` (record store with
//! live queries) → `repo` (domain rules and outcomes) → `view` (aggregated
//! matrix state for presentation consumers).

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod store;
pub mod view;

pub use config::{ConfigError, CoreConfig};
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LoggingError,
};
pub use model::error::{TodoError, TodoResult};
pub use model::todo::{Priority, Quadrant, Todo, TodoId};
pub use model::view_state::{MatrixViewState, QuadrantState};
pub use repo::clock::{Clock, ManualClock, SystemClock};
pub use repo::todo_repo::{NewTodo, TodoRepository};
pub use store::{
    LiveQuery, MemoryTodoStore, Revisioned, SqliteTodoStore, StoreError, StoreResult,
    TodoStore,
};
pub use view::matrix::{MatrixViewModel, ViewSubscription, DEFAULT_IDLE_GRACE};

/// Minimal health-check API for smoke checks.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
