//! Todo domain model.
//!
//! # Responsibility
//! - Define the persisted todo record and its enumerations.
//! - Own the title rule shared by create and update paths.
//!
//! # Invariants
//! - `id` is generated once and never reassigned.
//! - `title` is non-blank after trimming.
//! - `created_at` is fixed at construction.

use crate::model::error::TodoError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Stable identifier of a todo record.
pub type TodoId = Uuid;

/// Eisenhower matrix quadrant a todo is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Quadrant {
    /// Urgent and important: "Do First".
    UrgentImportant,
    /// Important but not urgent: "Schedule".
    NotUrgentImportant,
    /// Urgent but not important: "Delegate".
    UrgentNotImportant,
    /// Neither urgent nor important: "Eliminate".
    NotUrgentNotImportant,
}

impl Quadrant {
    /// All quadrants in matrix display order.
    pub const ALL: [Quadrant; 4] = [
        Quadrant::UrgentImportant,
        Quadrant::NotUrgentImportant,
        Quadrant::UrgentNotImportant,
        Quadrant::NotUrgentNotImportant,
    ];

    /// Fixed display label of the quadrant.
    pub fn label(self) -> &'static str {
        match self {
            Self::UrgentImportant => "Do First",
            Self::NotUrgentImportant => "Schedule",
            Self::UrgentNotImportant => "Delegate",
            Self::NotUrgentNotImportant => "Eliminate",
        }
    }

    /// Enumeration name used in storage.
    pub fn as_name(self) -> &'static str {
        match self {
            Self::UrgentImportant => "URGENT_IMPORTANT",
            Self::NotUrgentImportant => "NOT_URGENT_IMPORTANT",
            Self::UrgentNotImportant => "URGENT_NOT_IMPORTANT",
            Self::NotUrgentNotImportant => "NOT_URGENT_NOT_IMPORTANT",
        }
    }

    /// Strict lookup by stored enumeration name.
    pub fn from_name(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|quadrant| quadrant.as_name() == value)
    }

    /// Position inside [`Quadrant::ALL`].
    pub fn index(self) -> usize {
        match self {
            Self::UrgentImportant => 0,
            Self::NotUrgentImportant => 1,
            Self::UrgentNotImportant => 2,
            Self::NotUrgentNotImportant => 3,
        }
    }
}

impl Display for Quadrant {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Lenient parsing for user input.
///
/// Accepts the stored name in any case with `-` or `_` separators, or the
/// display label (`"do first"`). Anything else is `InvalidQuadrant`.
impl FromStr for Quadrant {
    type Err = TodoError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        if let Some(quadrant) = Self::from_name(&normalized) {
            return Ok(quadrant);
        }
        Self::ALL
            .into_iter()
            .find(|quadrant| quadrant.label().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| TodoError::InvalidQuadrant(value.to_string()))
    }
}

/// Todo priority, persisted as `1..=3`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn value(self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
        }
    }

    pub fn from_value(value: i64) -> Option<Self> {
        match value {
            1 => Some(Self::Low),
            2 => Some(Self::Medium),
            3 => Some(Self::High),
            _ => None,
        }
    }
}

/// One todo record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: TodoId,
    pub title: String,
    pub description: String,
    pub is_completed: bool,
    pub quadrant: Quadrant,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds.
    pub due_date: Option<i64>,
    pub priority: Priority,
}

impl Todo {
    /// Builds a new todo with a generated id.
    ///
    /// Title and description are trimmed; a blank title is rejected with
    /// `TodoError::EmptyTitle`.
    pub fn create(
        title: &str,
        description: &str,
        quadrant: Quadrant,
        created_at: i64,
    ) -> Result<Self, TodoError> {
        Self::with_id(Uuid::new_v4(), title, description, quadrant, created_at)
    }

    /// Same as [`Todo::create`] with a caller-provided id.
    pub fn with_id(
        id: TodoId,
        title: &str,
        description: &str,
        quadrant: Quadrant,
        created_at: i64,
    ) -> Result<Self, TodoError> {
        let todo = Self {
            id,
            title: title.trim().to_string(),
            description: description.trim().to_string(),
            is_completed: false,
            quadrant,
            created_at,
            due_date: None,
            priority: Priority::default(),
        };
        todo.validate()?;
        Ok(todo)
    }

    /// Checks the title rule.
    pub fn validate(&self) -> Result<(), TodoError> {
        if self.title.trim().is_empty() {
            return Err(TodoError::EmptyTitle);
        }
        Ok(())
    }

    /// Case-sensitive substring match on title or description.
    ///
    /// An empty needle matches everything.
    pub fn matches_text(&self, needle: &str) -> bool {
        self.title.contains(needle) || self.description.contains(needle)
    }
}
