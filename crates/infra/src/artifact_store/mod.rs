//! `ArtifactStore` adapters: one blob slot per model type.

pub mod fs;
pub mod in_memory;

pub use fs::FsArtifactStore;
pub use in_memory::InMemoryArtifactStore;
