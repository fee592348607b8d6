//! Storage adapter traits.

mod blob;
mod metadata;

pub use blob::BlobStore;
pub use metadata::MetadataStore;
