//! Catalog content sources.

mod directory;
mod memory;

pub use directory::DirectoryCatalogSource;
pub use memory::MemoryCatalogSource;
