//! Task lifecycle stages.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle stage of a tracked task.
///
/// Transitions:
/// - Waiting -> InProgress -> Done
///
/// Each stage owns one index list in the store; a task is listed in exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    /// Queued, not yet picked up by an executor.
    Waiting,

    /// Currently executing.
    InProgress,

    /// Finished (successfully or not).
    Done,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Waiting, Stage::InProgress, Stage::Done];

    /// Suffix of the stage's index list key.
    pub fn list_name(self) -> &'static str {
        match self {
            Stage::Waiting => "waiting",
            Stage::InProgress => "in_progress",
            Stage::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Waiting => "WAITING",
            Stage::InProgress => "IN_PROGRESS",
            Stage::Done => "DONE",
        };
        f.write_str(s)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown stage '{0}'")]
pub struct ParseStageError(String);

impl FromStr for Stage {
    type Err = ParseStageError;

    /// Accepts both the display form (`IN_PROGRESS`) and the list name (`in_progress`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "waiting" => Ok(Stage::Waiting),
            "in_progress" => Ok(Stage::InProgress),
            "done" => Ok(Stage::Done),
            _ => Err(ParseStageError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::waiting("WAITING", Stage::Waiting)]
    #[case::in_progress("in_progress", Stage::InProgress)]
    #[case::done("Done", Stage::Done)]
    fn parses_stage_names(#[case] input: &str, #[case] expected: Stage) {
        assert_eq!(input.parse::<Stage>().unwrap(), expected);
    }

    #[test]
    fn rejects_unknown_stage() {
        assert!("running".parse::<Stage>().is_err());
    }

    #[test]
    fn serializes_screaming_snake_case() {
        let json = serde_json::to_string(&Stage::InProgress).unwrap();
        assert_eq!(json, "\"IN_PROGRESS\"");
    }
}
