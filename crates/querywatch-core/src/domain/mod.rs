//! Domain model (ids, stages, task records, snapshot, errors).

pub mod errors;
pub mod ids;
pub mod record;
pub mod snapshot;
pub mod stage;

pub use self::errors::{ErrorKind, StoreError, StoreResult, TrackerError, TrackerResult};
pub use self::ids::{QueryId, TaskId};
pub use self::record::TaskRecord;
pub use self::snapshot::StalenessSnapshot;
pub use self::stage::Stage;
