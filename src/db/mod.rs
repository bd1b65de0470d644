//! Catalog persistence layer.
//!
//! Provides:
//! - The `books` relation models
//! - `CatalogRepository`, the data-access contract for the catalog
//! - A Postgres implementation and an in-process implementation

pub mod memory;
pub mod models;
mod repository;

pub use memory::MemoryCatalog;
pub use repository::{CatalogRepository, PostgresCatalog};
