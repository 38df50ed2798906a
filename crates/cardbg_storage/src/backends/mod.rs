pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::InMemoryProfileStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteProfileStore;
