use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// One of the two options offered on the Decision page.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Choice {
    Cooperate,
    Defect,
}

impl Choice {
    pub fn from_cooperate(cooperate: bool) -> Self {
        if cooperate {
            Choice::Cooperate
        } else {
            Choice::Defect
        }
    }

    /// The value stored in the player's `cooperate` field.
    pub fn cooperate(self) -> bool {
        self == Choice::Cooperate
    }

    /// Display label shown on the Results page.
    pub fn label(self) -> &'static str {
        match self {
            Choice::Cooperate => "Cooperate",
            Choice::Defect => "Defect",
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What the Decision page produced once the player left it.
#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(tag = "outcome", content = "cooperate", rename_all = "snake_case")]
pub enum DecisionOutcome {
    AnsweredInTime(bool),
    TimedOut,
}

/// A scripted answer: the choice a participant submits and how long they take.
///
/// `choice == None` means the participant never submits the form.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct Response {
    pub choice: Option<Choice>,
    pub after: Duration,
}

impl Response {
    pub fn answer(choice: Choice) -> Self {
        Self {
            choice: Some(choice),
            after: Duration::ZERO,
        }
    }

    pub fn answer_after(choice: Choice, after: Duration) -> Self {
        Self {
            choice: Some(choice),
            after,
        }
    }

    pub fn silent() -> Self {
        Self::default()
    }
}
