//! Presentation-ready shapes derived from stored todos.

use crate::model::todo::{Quadrant, Todo, TodoId};
use serde::Serialize;

/// One quadrant bucket of the matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuadrantState {
    pub quadrant: Quadrant,
    /// Display label, e.g. `"Do First"`.
    pub title: &'static str,
    pub todos: Vec<Todo>,
}

impl QuadrantState {
    pub fn new(quadrant: Quadrant, todos: Vec<Todo>) -> Self {
        Self {
            quadrant,
            title: quadrant.label(),
            todos,
        }
    }

    pub fn empty(quadrant: Quadrant) -> Self {
        Self::new(quadrant, Vec::new())
    }

    pub fn contains(&self, id: TodoId) -> bool {
        self.todos.iter().any(|todo| todo.id == id)
    }
}

/// Aggregated matrix state published to view subscribers.
///
/// `quadrants` always holds four buckets in [`Quadrant::ALL`] order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatrixViewState {
    pub quadrants: Vec<QuadrantState>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub search_query: String,
    pub show_completed: bool,
}

impl MatrixViewState {
    /// State published before the first combination is available.
    pub fn loading() -> Self {
        Self {
            quadrants: Quadrant::ALL.into_iter().map(QuadrantState::empty).collect(),
            is_loading: true,
            error: None,
            search_query: String::new(),
            show_completed: true,
        }
    }

    /// Bucket for one quadrant.
    pub fn quadrant(&self, quadrant: Quadrant) -> &QuadrantState {
        &self.quadrants[quadrant.index()]
    }

    /// Total number of visible todos across all buckets.
    pub fn visible_count(&self) -> usize {
        self.quadrants.iter().map(|bucket| bucket.todos.len()).sum()
    }
}

impl Default for MatrixViewState {
    fn default() -> Self {
        Self::loading()
    }
}
