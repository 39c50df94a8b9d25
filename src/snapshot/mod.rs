pub mod store;

pub use store::{write_atomic, SnapshotStore, StoreError};
