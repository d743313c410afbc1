//! Logging setup and stage occupancy counts.

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::domain::Stage;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCounts {
    pub waiting: usize,
    pub in_progress: usize,
    pub done: usize,
}

impl StageCounts {
    pub fn set(&mut self, stage: Stage, count: usize) {
        match stage {
            Stage::Waiting => self.waiting = count,
            Stage::InProgress => self.in_progress = count,
            Stage::Done => self.done = count,
        }
    }

    pub fn total(&self) -> usize {
        self.waiting + self.in_progress + self.done
    }
}

/// Install a global fmt subscriber filtered by `RUST_LOG` (fallback: `default_filter`).
///
/// Safe to call more than once; later calls keep the existing subscriber.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_err()
    {
        tracing::debug!("Global tracing subscriber already initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_by_stage() {
        let mut counts = StageCounts::default();
        counts.set(Stage::Waiting, 2);
        counts.set(Stage::Done, 5);

        assert_eq!(counts.waiting, 2);
        assert_eq!(counts.in_progress, 0);
        assert_eq!(counts.total(), 7);
    }

    #[test]
    fn init_tracing_twice_does_not_panic() {
        init_tracing("warn");
        init_tracing("debug");
    }
}
