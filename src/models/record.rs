//! Adapter-level record lowering shared by every entity kind.

use super::Placement;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque unique identifier for any stored entity.
///
/// UUIDv7 text under the hood, so ids sort roughly by creation time in both
/// backend families.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Creates an id from an existing string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh time-ordered id.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The kind of a stored entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A raw ingested dataset; the root of the reference graph.
    Dataset,
    /// A saved analysis workspace, owned by a dataset.
    Workspace,
    /// Scalar metrics from a model training run, owned by a dataset.
    Training,
    /// User feedback on a prediction, owned by a dataset.
    Feedback,
}

impl EntityKind {
    /// Returns the canonical string form used in storage discriminators.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dataset => "dataset",
            Self::Workspace => "workspace",
            Self::Training => "training",
            Self::Feedback => "feedback",
        }
    }

    /// Parses a storage discriminator back into a kind.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "dataset" => Some(Self::Dataset),
            "workspace" => Some(Self::Workspace),
            "training" => Some(Self::Training),
            "feedback" => Some(Self::Feedback),
            _ => None,
        }
    }

    /// The child kinds swept by a dataset cascade, in deletion order.
    #[must_use]
    pub const fn cascade_children() -> [Self; 3] {
        [Self::Workspace, Self::Training, Self::Feedback]
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The storage-level shape every entity lowers to.
///
/// Metadata adapters persist exactly this: relational backends map the
/// discriminator and blob-ref fields onto typed nullable columns, document
/// backends store the whole record as one JSON document. Kind-specific
/// fields live in `body` as JSON either way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Entity id.
    pub id: EntityId,
    /// Entity kind discriminator.
    pub kind: EntityKind,
    /// Owning dataset id; `None` only for datasets themselves.
    pub parent_id: Option<EntityId>,
    /// Display name, where the entity kind has one.
    pub name: Option<String>,
    /// Payload placement; `None` for entities that carry no payload.
    pub placement: Option<Placement>,
    /// Kind-specific fields.
    pub body: serde_json::Value,
    /// Creation timestamp (Unix epoch seconds).
    pub created_at: u64,
    /// Last update timestamp (Unix epoch seconds).
    pub updated_at: u64,
}

impl MetadataRecord {
    /// Decodes the kind-specific body into a typed struct.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidInput`] naming the record id when the
    /// stored body does not decode; a record written by this crate always
    /// decodes.
    pub fn decode_body<T: serde::de::DeserializeOwned>(&self) -> crate::Result<T> {
        serde_json::from_value(self.body.clone()).map_err(|e| {
            crate::Error::InvalidInput(format!(
                "record '{}' has undecodable {} body: {e}",
                self.id, self.kind
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_generate_unique() {
        let a = EntityId::generate();
        let b = EntityId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn test_entity_kind_roundtrip() {
        for kind in [
            EntityKind::Dataset,
            EntityKind::Workspace,
            EntityKind::Training,
            EntityKind::Feedback,
        ] {
            assert_eq!(EntityKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(EntityKind::parse("chart"), None);
    }

    #[test]
    fn test_record_json_roundtrip() {
        let record = MetadataRecord {
            id: EntityId::new("r1"),
            kind: EntityKind::Workspace,
            parent_id: Some(EntityId::new("d1")),
            name: Some("analysis".to_string()),
            placement: Some(Placement::inline(b"abc".to_vec())),
            body: serde_json::json!({"size_bytes": 3}),
            created_at: 1_700_000_000,
            updated_at: 1_700_000_001,
        };

        let json = serde_json::to_string(&record).unwrap();
        let back: MetadataRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_decode_body_reports_record_id() {
        let record = MetadataRecord {
            id: EntityId::new("bad"),
            kind: EntityKind::Training,
            parent_id: None,
            name: None,
            placement: None,
            body: serde_json::json!("not an object"),
            created_at: 0,
            updated_at: 0,
        };

        #[derive(serde::Deserialize, Debug)]
        struct Body {
            #[allow(dead_code)]
            model_name: String,
        }

        let err = record.decode_body::<Body>().unwrap_err();
        assert!(err.to_string().contains("bad"));
    }
}
