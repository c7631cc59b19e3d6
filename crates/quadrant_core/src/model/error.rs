//! Domain-level outcome errors.

use crate::model::todo::TodoId;
use crate::store::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type TodoResult<T> = Result<T, TodoError>;

/// Failure of a todo use-case.
#[derive(Debug)]
pub enum TodoError {
    /// Title is blank after trimming.
    EmptyTitle,
    /// Referenced todo does not exist at mutation time.
    TodoNotFound(TodoId),
    /// Quadrant name supplied by a caller is not one of the four.
    InvalidQuadrant(String),
    /// Any other persistence failure.
    Store(StoreError),
}

impl TodoError {
    /// Message shown to the user for this failure.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::EmptyTitle => "Title cannot be empty",
            Self::TodoNotFound(_) => "Todo not found",
            Self::InvalidQuadrant(_) => "Invalid quadrant",
            Self::Store(_) => "An unexpected error occurred",
        }
    }

    /// Stable code for log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyTitle => "empty_title",
            Self::TodoNotFound(_) => "todo_not_found",
            Self::InvalidQuadrant(_) => "invalid_quadrant",
            Self::Store(_) => "store_failed",
        }
    }
}

impl Display for TodoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "title cannot be empty"),
            Self::TodoNotFound(id) => write!(f, "todo not found: {id}"),
            Self::InvalidQuadrant(value) => write!(f, "invalid quadrant: `{value}`"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TodoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for TodoError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(id) => Self::TodoNotFound(id),
            other => Self::Store(other),
        }
    }
}
