//! Entity types and identifiers.
//!
//! The four entity kinds (dataset, workspace, training record, feedback
//! record) all lower to one adapter-level [`MetadataRecord`] so that both
//! backend families share a single CRUD surface. Payload placement is the
//! exhaustively matched [`Placement`] union; there is no stringly-typed
//! storage discriminator anywhere above the adapters.

mod dataset;
mod feedback;
mod placement;
mod record;
mod training;
mod workspace;

pub use dataset::{ColumnDef, Dataset, preview_lines};
pub use feedback::FeedbackRecord;
pub use placement::{BlobRef, Placement};
pub use record::{EntityId, EntityKind, MetadataRecord};
pub use training::TrainingRecord;
pub use workspace::{Workspace, WorkspaceSummary};
