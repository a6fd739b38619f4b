//! Evaluation outcomes.

use crate::errors::RuntimeError;
use crate::value::Value;

/// Result of one top-level run.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// The pending-work stack emptied without error.
    Finished {
        value: Value,
        /// Human-facing rendering of the value (`str` semantics).
        rendered: String,
    },
    /// The step or wall-clock budget was exhausted. Not an error and not
    /// resumable; rerun with a larger budget.
    Suspended,
    /// An operation raised; the run aborted immediately.
    Failed(RuntimeError),
}

impl Outcome {
    /// The finished value, if the run completed.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Outcome::Finished { value, .. } => Some(value),
            _ => None,
        }
    }

    /// The rendered result, if the run completed.
    pub fn rendered(&self) -> Option<&str> {
        match self {
            Outcome::Finished { rendered, .. } => Some(rendered),
            _ => None,
        }
    }

    /// The failure, if the run aborted.
    pub fn error(&self) -> Option<&RuntimeError> {
        match self {
            Outcome::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_suspended(&self) -> bool {
        matches!(self, Outcome::Suspended)
    }
}
