#![warn(clippy::uninlined_format_args)]

pub mod ledger;
pub mod observer;
pub mod snapshot;

pub use ledger::InMemoryLedger;
pub use observer::TracingAllocationObserver;
pub use snapshot::{LoadedSnapshot, SnapshotError, load_snapshot, load_snapshot_file};
