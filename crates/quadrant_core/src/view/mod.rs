//! View-state aggregation for matrix consumers.
//!
//! # Responsibility
//! - Keep one `MatrixViewState` in sync with stored todos and view inputs.
//! - Translate repository outcomes into user-facing error messages.
//!
//! # See also
//! - `model::view_state` for the published shapes.

pub mod matrix;
