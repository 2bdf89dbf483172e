//! Storage layer: atomic files and key-value substrates.

mod atomic_file;
mod key_value;

pub use atomic_file::{AtomicFile, AtomicFileError};
pub use key_value::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
