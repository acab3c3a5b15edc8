//! The three coping actions available at every step.

use crate::error::CopingError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Let the emotion run its course.
    Inaction = 0,
    /// Turn attention away: short-lived relief, nothing is learned.
    Disengage = 1,
    /// Reappraise the trigger: relief now, and lasting adaptation when the
    /// trigger is resolvable.
    Engage = 2,
}

impl Action {
    pub const COUNT: usize = 3;
    pub const ALL: [Action; Action::COUNT] = [Action::Inaction, Action::Disengage, Action::Engage];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Action::Inaction => "inaction",
            Action::Disengage => "disengage",
            Action::Engage => "engage",
        }
    }
}

impl TryFrom<usize> for Action {
    type Error = CopingError;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        Action::ALL
            .get(index)
            .copied()
            .ok_or(CopingError::InvalidAction {
                index,
                n_actions: Action::COUNT,
            })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
