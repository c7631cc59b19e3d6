use quadrant_core::db::migrations::latest_version;
use quadrant_core::{
    MemoryTodoStore, Priority, Quadrant, SqliteTodoStore, StoreError, Todo, TodoStore,
};
use rusqlite::Connection;
use std::collections::HashSet;
use uuid::Uuid;

fn todo_at(id: &str, title: &str, quadrant: Quadrant, created_at: i64) -> Todo {
    Todo::with_id(Uuid::parse_str(id).unwrap(), title, "", quadrant, created_at).unwrap()
}

fn stores() -> Vec<(&'static str, Box<dyn TodoStore>)> {
    vec![
        ("sqlite", Box::new(SqliteTodoStore::open_in_memory().unwrap())),
        ("memory", Box::new(MemoryTodoStore::new())),
    ]
}

#[test]
fn insert_and_get_by_id_roundtrip() {
    for (name, store) in stores() {
        let mut todo = Todo::create("Write report", "quarterly", Quadrant::UrgentImportant, 42)
            .unwrap();
        todo.due_date = Some(1_000);
        todo.priority = Priority::High;
        store.insert_or_replace(&todo).unwrap();

        let loaded = store.get_by_id(todo.id).unwrap().unwrap();
        assert_eq!(loaded, todo, "{name}");
        assert!(store.get_by_id(Uuid::new_v4()).unwrap().is_none(), "{name}");
    }
}

#[test]
fn get_all_orders_newest_first_with_id_tie_break() {
    for (name, store) in stores() {
        let a = todo_at("00000000-0000-4000-8000-000000000001", "a", Quadrant::UrgentImportant, 10);
        let b = todo_at("00000000-0000-4000-8000-000000000002", "b", Quadrant::UrgentImportant, 10);
        let c = todo_at("00000000-0000-4000-8000-000000000003", "c", Quadrant::NotUrgentImportant, 30);
        for todo in [&b, &c, &a] {
            store.insert_or_replace(todo).unwrap();
        }

        let titles: Vec<_> = store
            .get_all()
            .unwrap()
            .into_iter()
            .map(|todo| todo.title)
            .collect();
        assert_eq!(titles, ["c", "a", "b"], "{name}");
    }
}

#[test]
fn get_by_quadrant_equals_filtered_get_all() {
    for (name, store) in stores() {
        for (index, quadrant) in Quadrant::ALL.iter().cycle().take(10).enumerate() {
            let todo = Todo::create(&format!("task {index}"), "", *quadrant, index as i64).unwrap();
            store.insert_or_replace(&todo).unwrap();
        }

        let all = store.get_all().unwrap();
        for quadrant in Quadrant::ALL {
            let expected: Vec<Todo> = all
                .iter()
                .filter(|todo| todo.quadrant == quadrant)
                .cloned()
                .collect();
            assert_eq!(store.get_by_quadrant(quadrant).unwrap(), expected, "{name}");
        }
    }
}

#[test]
fn insert_or_replace_upserts_by_id() {
    for (name, store) in stores() {
        let mut todo = Todo::create("draft", "", Quadrant::UrgentImportant, 1).unwrap();
        store.insert_or_replace(&todo).unwrap();
        todo.title = "final".to_string();
        store.insert_or_replace(&todo).unwrap();

        let all = store.get_all().unwrap();
        assert_eq!(all.len(), 1, "{name}");
        assert_eq!(all[0].title, "final", "{name}");
    }
}

#[test]
fn update_and_delete_unknown_id_return_not_found() {
    for (name, store) in stores() {
        let ghost = Todo::create("ghost", "", Quadrant::UrgentImportant, 1).unwrap();
        assert!(
            matches!(store.update(&ghost), Err(StoreError::NotFound(id)) if id == ghost.id),
            "{name}"
        );
        assert!(
            matches!(store.delete(&ghost), Err(StoreError::NotFound(id)) if id == ghost.id),
            "{name}"
        );
        assert!(store.get_all().unwrap().is_empty(), "{name}");
    }
}

#[test]
fn update_keeps_created_at() {
    for (name, store) in stores() {
        let mut todo = Todo::create("keep", "", Quadrant::UrgentImportant, 5).unwrap();
        store.insert_or_replace(&todo).unwrap();

        todo.created_at = 999;
        todo.is_completed = true;
        store.update(&todo).unwrap();

        let loaded = store.get_by_id(todo.id).unwrap().unwrap();
        assert!(loaded.is_completed, "{name}");
        assert_eq!(loaded.created_at, 5, "{name}");
    }
}

#[test]
fn delete_completed_removes_only_completed_and_is_idempotent() {
    for (name, store) in stores() {
        let open = Todo::create("open", "", Quadrant::UrgentImportant, 1).unwrap();
        let mut done = Todo::create("done", "", Quadrant::UrgentNotImportant, 2).unwrap();
        done.is_completed = true;
        store.insert_or_replace(&open).unwrap();
        store.insert_or_replace(&done).unwrap();

        assert_eq!(store.delete_completed().unwrap(), 1, "{name}");
        let after_first = store.get_all().unwrap();
        assert_eq!(after_first, vec![open.clone()], "{name}");

        assert_eq!(store.delete_completed().unwrap(), 0, "{name}");
        assert_eq!(store.get_all().unwrap(), after_first, "{name}");
    }
}

#[test]
fn search_is_case_sensitive_over_title_and_description() {
    for (name, store) in stores() {
        let report = Todo::create("Write report", "for Alice", Quadrant::UrgentImportant, 1)
            .unwrap();
        let call = Todo::create("Call bob", "about the report", Quadrant::UrgentImportant, 2)
            .unwrap();
        let other = Todo::create("Water plants", "", Quadrant::NotUrgentNotImportant, 3).unwrap();
        for todo in [&report, &call, &other] {
            store.insert_or_replace(todo).unwrap();
        }

        let ids: HashSet<_> = store
            .search("report")
            .unwrap()
            .into_iter()
            .map(|todo| todo.id)
            .collect();
        assert_eq!(ids, HashSet::from([report.id, call.id]), "{name}");

        assert!(store.search("REPORT").unwrap().is_empty(), "{name}");
        assert_eq!(store.search("Alice").unwrap().len(), 1, "{name}");
        assert_eq!(store.search("").unwrap().len(), 3, "{name}");
    }
}

#[test]
fn upcoming_is_strictly_after_now_and_soonest_first() {
    for (name, store) in stores() {
        let mut past = Todo::create("past", "", Quadrant::UrgentImportant, 1).unwrap();
        past.due_date = Some(100);
        let mut exact = Todo::create("exact", "", Quadrant::UrgentImportant, 2).unwrap();
        exact.due_date = Some(500);
        let mut later = Todo::create("later", "", Quadrant::UrgentImportant, 3).unwrap();
        later.due_date = Some(2_000);
        let mut sooner = Todo::create("sooner", "", Quadrant::UrgentImportant, 4).unwrap();
        sooner.due_date = Some(900);
        let undated = Todo::create("undated", "", Quadrant::UrgentImportant, 5).unwrap();
        for todo in [&past, &exact, &later, &sooner, &undated] {
            store.insert_or_replace(todo).unwrap();
        }

        let titles: Vec<_> = store
            .get_upcoming(500)
            .unwrap()
            .into_iter()
            .map(|todo| todo.title)
            .collect();
        assert_eq!(titles, ["sooner", "later"], "{name}");
    }
}

#[test]
fn writes_bump_revision_only_when_rows_change() {
    for (name, store) in stores() {
        let mut changes = store.subscribe_changes();
        assert!(!changes.has_changed().unwrap(), "{name}");

        let todo = Todo::create("watch me", "", Quadrant::UrgentImportant, 1).unwrap();
        store.insert_or_replace(&todo).unwrap();
        assert!(changes.has_changed().unwrap(), "{name}");
        let _ = changes.borrow_and_update();

        assert_eq!(store.delete_completed().unwrap(), 0, "{name}");
        assert!(!changes.has_changed().unwrap(), "{name}");

        store.delete(&todo).unwrap();
        assert!(changes.has_changed().unwrap(), "{name}");
    }
}

#[test]
fn sqlite_store_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();

    match SqliteTodoStore::try_new(conn) {
        Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert_eq!(expected_version, latest_version()),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn sqlite_store_rejects_missing_table_and_column() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();
    assert!(matches!(
        SqliteTodoStore::try_new(conn),
        Err(StoreError::MissingRequiredTable("todos"))
    ));

    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE todos (
            id TEXT PRIMARY KEY NOT NULL,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            is_completed INTEGER NOT NULL,
            quadrant TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            due_date INTEGER
        );",
    )
    .unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();
    assert!(matches!(
        SqliteTodoStore::try_new(conn),
        Err(StoreError::MissingRequiredColumn {
            table: "todos",
            column: "priority"
        })
    ));
}

#[test]
fn sqlite_store_reports_undecodable_rows() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE todos (
            id TEXT PRIMARY KEY NOT NULL,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            is_completed INTEGER NOT NULL,
            quadrant TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            due_date INTEGER,
            priority INTEGER NOT NULL
        );
        INSERT INTO todos VALUES
            ('00000000-0000-4000-8000-000000000001', 't', '', 0, 'SOMEDAY', 1, NULL, 2);",
    )
    .unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let store = SqliteTodoStore::try_new(conn).unwrap();
    let err = store.get_all().unwrap_err();
    assert!(matches!(err, StoreError::InvalidData(message) if message.contains("SOMEDAY")));
}

#[test]
fn sqlite_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todos.sqlite3");

    let todo = Todo::create("durable", "", Quadrant::NotUrgentImportant, 7).unwrap();
    {
        let store = SqliteTodoStore::open(&path).unwrap();
        store.insert_or_replace(&todo).unwrap();
    }

    let reopened = SqliteTodoStore::open(&path).unwrap();
    assert_eq!(reopened.get_by_id(todo.id).unwrap(), Some(todo));
}
