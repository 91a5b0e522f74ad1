#![forbid(unsafe_code)]

pub mod catalog;
pub mod repository;
pub mod sqlite;

pub use catalog::StaticCatalog;
pub use repository::{InMemoryRepository, PreferenceRepository, StepSource, Storage, StorageError};
