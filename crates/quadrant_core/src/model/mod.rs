//! Domain model for the Eisenhower todo matrix.
//!
//! # Responsibility
//! - Define the persisted `Todo` record and its enumerations.
//! - Define derived view shapes (`QuadrantState`, `MatrixViewState`).
//! - Define the domain error taxonomy.
//!
//! # Invariants
//! - Derived view shapes are never persisted.

pub mod error;
pub mod todo;
pub mod view_state;
