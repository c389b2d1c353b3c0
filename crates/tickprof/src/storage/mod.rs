mod schema;
pub mod writer;

pub use schema::SCHEMA_VERSION;
pub use writer::{SqliteSink, StoredEntry};
