//! Document family backends.
//!
//! The document family pairs flexible JSON records with a companion chunked
//! object store: large payloads are split into fixed-size chunk records under
//! one parent record, because the underlying stores cap single-value sizes.
//!
//! Two renditions share the layout:
//! - [`MemoryMetadataStore`] / [`MemoryChunkStore`]: in-process, for
//!   development and tests
//! - [`RedisMetadataStore`] / [`RedisChunkStore`]: Redis, behind the `redis`
//!   feature flag

mod memory;
mod redis;

pub use memory::{MemoryChunkStore, MemoryMetadataStore};
pub use redis::{RedisChunkStore, RedisMetadataStore};
