//! Workspace entity: saved analysis state owned by a dataset.

use super::{EntityId, EntityKind, MetadataRecord, Placement};
use crate::Result;
use serde::{Deserialize, Serialize};

/// A saved analysis workspace.
///
/// Lifetime is bounded by the owning dataset: deleting the dataset cascades
/// over its workspaces. Saving again under the same `(dataset_id, name)` key
/// overwrites rather than duplicating.
#[derive(Debug, Clone, PartialEq)]
pub struct Workspace {
    /// Unique identifier.
    pub id: EntityId,
    /// Owning dataset (non-nullable; verified at creation time).
    pub dataset_id: EntityId,
    /// Workspace name; unique per dataset.
    pub name: String,
    /// Where the serialized workspace state lives.
    pub placement: Placement,
    /// Size of the serialized state before compression, in bytes.
    pub size_bytes: u64,
    /// Size after compression, when the stored bytes are compressed.
    pub compressed_size_bytes: Option<u64>,
    /// Creation timestamp (Unix epoch seconds).
    pub created_at: u64,
    /// Last overwrite timestamp (Unix epoch seconds).
    pub updated_at: u64,
}

/// Listing row for [`crate::ArtifactRepository::list_workspaces`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceSummary {
    /// Workspace id.
    pub id: EntityId,
    /// Workspace name.
    pub name: String,
    /// Creation timestamp (Unix epoch seconds).
    pub created_at: u64,
    /// Logical payload size in bytes.
    pub size_bytes: u64,
}

/// Kind-specific record body for workspaces.
#[derive(Debug, Serialize, Deserialize)]
struct WorkspaceBody {
    size_bytes: u64,
    compressed_size_bytes: Option<u64>,
}

impl Workspace {
    /// Lowers the workspace to its adapter-level record.
    #[must_use]
    pub fn to_record(&self) -> MetadataRecord {
        let body = WorkspaceBody {
            size_bytes: self.size_bytes,
            compressed_size_bytes: self.compressed_size_bytes,
        };
        MetadataRecord {
            id: self.id.clone(),
            kind: EntityKind::Workspace,
            parent_id: Some(self.dataset_id.clone()),
            name: Some(self.name.clone()),
            placement: Some(self.placement.clone()),
            body: serde_json::to_value(body).unwrap_or_default(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Rebuilds a workspace from its adapter-level record.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidInput`] if the record is not a
    /// well-formed workspace record.
    pub fn from_record(record: &MetadataRecord) -> Result<Self> {
        let body: WorkspaceBody = record.decode_body()?;
        let placement = record.placement.clone().ok_or_else(|| {
            crate::Error::InvalidInput(format!("workspace record '{}' has no placement", record.id))
        })?;
        let dataset_id = record.parent_id.clone().ok_or_else(|| {
            crate::Error::InvalidInput(format!("workspace record '{}' has no dataset id", record.id))
        })?;
        Ok(Self {
            id: record.id.clone(),
            dataset_id,
            name: record.name.clone().unwrap_or_default(),
            placement,
            size_bytes: body.size_bytes,
            compressed_size_bytes: body.compressed_size_bytes,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    /// Projects the listing row.
    #[must_use]
    pub fn summary(&self) -> WorkspaceSummary {
        WorkspaceSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            created_at: self.created_at,
            size_bytes: self.size_bytes,
        }
    }
}
