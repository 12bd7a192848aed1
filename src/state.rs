//! Iteration state threaded through successive events.

use crate::error::ExecutorError;
use serde::{Deserialize, Serialize};

/// The persistent state of one iteration.
///
/// The executor never mutates a state in place. Each handled event produces
/// a new value, so callers may keep the previous one for diffing or logging.
///
/// `items` starts unpopulated and is adopted exactly once. An empty sequence
/// still counts as populated, which is what lets a zero-length iteration
/// complete on its first continuation signal.
///
/// # Examples
///
/// ```
/// use iterflow::IterationState;
///
/// let state = IterationState::<String>::new();
/// assert!(!state.is_populated());
/// assert_eq!(state.current_index(), 0);
/// assert!(!state.is_complete());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationState<T> {
    items: Option<Vec<T>>,
    current_index: usize,
    is_complete: bool,
}

impl<T> Default for IterationState<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> IterationState<T> {
    /// Creates a fresh, unpopulated state.
    pub fn new() -> Self {
        Self {
            items: None,
            current_index: 0,
            is_complete: false,
        }
    }

    /// Returns the adopted items, or an empty slice before population.
    pub fn items(&self) -> &[T] {
        self.items.as_deref().unwrap_or(&[])
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn is_complete(&self) -> bool {
        self.is_complete
    }

    /// Returns `true` once an item sequence has been adopted.
    pub fn is_populated(&self) -> bool {
        self.items.is_some()
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    /// Number of items not yet emitted.
    pub fn remaining(&self) -> usize {
        self.len().saturating_sub(self.current_index)
    }

    /// Returns `true` when every adopted item has been emitted.
    pub fn is_exhausted(&self) -> bool {
        self.is_populated() && self.current_index >= self.len()
    }

    /// Returns the item under the cursor, if any.
    pub fn current_item(&self) -> Option<&T> {
        self.items().get(self.current_index)
    }

    /// Verifies the cursor bound and that completion agrees with the cursor.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::InvalidState`] describing the first violation.
    pub fn check_invariants(&self) -> Result<(), ExecutorError> {
        if self.current_index > self.len() {
            return Err(ExecutorError::InvalidState(format!(
                "current index {} exceeds item count {}",
                self.current_index,
                self.len()
            )));
        }
        if !self.is_populated() && self.current_index != 0 {
            return Err(ExecutorError::InvalidState(
                "cursor advanced before items were populated".to_string(),
            ));
        }
        // A freshly adopted empty sequence is exhausted but only completes
        // on the next event.
        let pending_empty = self.is_populated() && self.is_empty();
        if self.is_complete != self.is_exhausted() && !(pending_empty && !self.is_complete) {
            return Err(ExecutorError::InvalidState(format!(
                "completion flag {} disagrees with cursor {}/{}",
                self.is_complete,
                self.current_index,
                self.len()
            )));
        }
        Ok(())
    }

    pub(crate) fn populated(items: Vec<T>) -> Self {
        Self {
            items: Some(items),
            current_index: 0,
            is_complete: false,
        }
    }
}

impl<T: Clone> IterationState<T> {
    /// The terminal copy of this state.
    pub(crate) fn completed(&self) -> Self {
        Self {
            items: self.items.clone(),
            current_index: self.current_index,
            is_complete: true,
        }
    }

    /// The state after emitting the item under the cursor.
    pub(crate) fn advanced(&self) -> Self {
        let next = self.current_index + 1;
        Self {
            items: self.items.clone(),
            current_index: next,
            is_complete: next >= self.len(),
        }
    }
}
