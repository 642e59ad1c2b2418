//! User profile persistence
//!
//! The store is the only writer of the profile; storage is an injectable port
//! so the store can run against a file, memory, or any other blob backend.

pub mod storage;
pub mod store;

pub use storage::{FileStorage, MemoryStorage, ProfileStorage};
pub use store::{rebuild_interactions, ProfileStore};
