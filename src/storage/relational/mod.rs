//! Relational family backends.
//!
//! The relational family maps metadata records onto typed columns (with a
//! JSON column for kind-specific fields) and writes each offloaded payload
//! whole into a single binary-large-object row; the column types involved
//! have no practical size ceiling, so no chunking layer is needed.
//!
//! Two renditions share the schema shape:
//! - [`SqliteStore`]: embedded, zero-configuration, the default engine
//! - [`PostgresStore`]: networked with a bounded connection pool, behind the
//!   `postgres` feature flag

mod connection;
mod postgresql;
mod sqlite;

pub use connection::{acquire_lock, configure_connection};
pub use postgresql::{PostgresBlobStore, PostgresMetadataStore, PostgresStore};
pub use sqlite::{SqliteBlobStore, SqliteMetadataStore, SqliteStore};
