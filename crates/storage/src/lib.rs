#![forbid(unsafe_code)]

pub mod local;
pub mod repository;
pub mod sqlite;

pub use local::{CachedProgress, LearningEntry, LocalStore};
pub use repository::{InMemoryRepository, KeyValueStore, StorageError};
