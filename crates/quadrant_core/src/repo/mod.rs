//! Domain repository over the todo store.
//!
//! # Responsibility
//! - Enforce todo rules (title trimming/validation) before persistence.
//! - Translate storage faults into `TodoError` outcomes.
//! - Expose live reads (by quadrant, search text, upcoming).
//!
//! # Invariants
//! - Every mutation returns an explicit `TodoResult`; nothing panics.
//! - Mutations on unknown ids fail with `TodoNotFound` and write nothing.

pub mod clock;
pub mod todo_repo;
