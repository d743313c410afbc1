//! Staleness snapshot: the outdated-query manifest.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::QueryId;

/// Set of outdated query ids plus the time they were computed.
///
/// Always written and read as one document, so ids and timestamp move together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StalenessSnapshot {
    pub query_ids: BTreeSet<QueryId>,
    pub last_refresh_at: DateTime<Utc>,
}

impl StalenessSnapshot {
    pub fn new(
        query_ids: impl IntoIterator<Item = QueryId>,
        last_refresh_at: DateTime<Utc>,
    ) -> Self {
        Self {
            query_ids: query_ids.into_iter().collect(),
            last_refresh_at,
        }
    }

    pub fn len(&self) -> usize {
        self.query_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.query_ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn duplicate_ids_collapse() {
        let at = Utc.timestamp_opt(100, 0).unwrap();
        let snapshot = StalenessSnapshot::new(
            vec![QueryId::new("q1"), QueryId::new("q2"), QueryId::new("q1")],
            at,
        );
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.query_ids.contains(&QueryId::new("q2")));
    }
}
