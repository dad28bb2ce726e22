//! Storage module for chain persistence

pub mod persistence;

pub use persistence::{
    load_from_file, Storage, StorageConfig, StorageError, StorageStats,
};
