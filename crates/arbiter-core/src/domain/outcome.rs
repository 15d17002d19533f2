//! Outcome model: the report of one dispatch pass.
//!
//! A pass either found a candidate that handled the item or it did not.
//! Faults from the winner's `post` are not an outcome; they are returned as
//! `Err`. Faults raised while releasing candidates after a successful `post`
//! ride along in `cleanup_faults` so they never override the result.

use serde::{Deserialize, Serialize};

use super::errors::DispatchError;

/// Whether some candidate handled the item.
///
/// Serialized as SCREAMING_SNAKE_CASE: HANDLED / UNHANDLED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeKind {
    Handled,
    Unhandled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub kind: OutcomeKind,

    /// `done` faults reported after the pass result was already decided.
    pub cleanup_faults: Vec<DispatchError>,
}

impl Outcome {
    pub fn handled() -> Self {
        Self {
            kind: OutcomeKind::Handled,
            cleanup_faults: Vec::new(),
        }
    }

    pub fn unhandled() -> Self {
        Self {
            kind: OutcomeKind::Unhandled,
            cleanup_faults: Vec::new(),
        }
    }

    pub fn is_handled(&self) -> bool {
        self.kind == OutcomeKind::Handled
    }

    pub fn with_cleanup_faults(mut self, faults: Vec<DispatchError>) -> Self {
        self.cleanup_faults.extend(faults);
        self
    }
}
