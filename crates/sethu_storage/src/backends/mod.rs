pub mod journey;
pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use journey::{FileJourneyRepository, InMemoryJourneyRepository};
pub use memory::InMemoryStorage;

#[cfg(feature = "sqlite")]
pub use sqlite::SQLiteStorage;
