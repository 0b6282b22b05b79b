//! Durable state for IntelliCore: workflow checkpoints and the knowledge base.
//!
//! Checkpoint stores implement `intellicore_core::CheckpointStore`; the
//! knowledge base is a [`FileVectorIndex`] fed by the loader and splitter.

pub mod in_memory;
pub mod file_store;
pub mod index;
pub mod loader;
pub mod splitter;
pub mod vector;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use in_memory::InMemoryCheckpointStore;
pub use file_store::FileCheckpointStore;
pub use index::FileVectorIndex;
pub use loader::{load_directory, load_path, load_text_document};
pub use splitter::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, split_text};
pub use vector::{cosine_similarity, rank_by_similarity};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteCheckpointStore;
