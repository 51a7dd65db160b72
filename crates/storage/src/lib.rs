#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    InMemoryItemSource, ItemQuery, ItemRecord, ItemSource, Storage, StorageError, TopicCatalog,
};
