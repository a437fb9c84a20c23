//! Persistence layer: entities, storage errors, and progress store backends.

pub mod models;
pub mod progress_store;
pub mod storage;
