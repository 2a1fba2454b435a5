//! Storage abstraction and implementations for EBS.
//!
//! This crate provides a trait-based storage interface for the task store
//! snapshot, with a JSON file implementation and an in-memory one.

#![warn(missing_docs)]

pub mod trait_;
pub mod json_storage;
pub mod memory;

pub use trait_::{Storage, StorageError, Result};
pub use json_storage::{JsonStorage, DEFAULT_DATA_FILE};
pub use memory::MemoryStorage;
