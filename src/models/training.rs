//! Training metadata entity: scalar metrics from a model run.

use super::{EntityId, EntityKind, MetadataRecord};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Scalar metrics recorded after a model training run.
///
/// Never blob-eligible: the body is a handful of floats and always lands
/// inline in the metadata record. Immutable once written; destroyed only by
/// dataset cascade.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingRecord {
    /// Unique identifier.
    pub id: EntityId,
    /// Owning dataset.
    pub dataset_id: EntityId,
    /// Name of the trained model (e.g. "random_forest").
    pub model_name: String,
    /// Metric name to value (accuracy, f1, rmse, ...). Sorted so record
    /// serialization is deterministic.
    pub metrics: BTreeMap<String, f64>,
    /// Creation timestamp (Unix epoch seconds).
    pub created_at: u64,
}

/// Kind-specific record body for training records.
#[derive(Debug, Serialize, Deserialize)]
struct TrainingBody {
    model_name: String,
    metrics: BTreeMap<String, f64>,
}

impl TrainingRecord {
    /// Lowers the training record to its adapter-level record.
    #[must_use]
    pub fn to_record(&self) -> MetadataRecord {
        let body = TrainingBody {
            model_name: self.model_name.clone(),
            metrics: self.metrics.clone(),
        };
        MetadataRecord {
            id: self.id.clone(),
            kind: EntityKind::Training,
            parent_id: Some(self.dataset_id.clone()),
            name: Some(self.model_name.clone()),
            placement: None,
            body: serde_json::to_value(body).unwrap_or_default(),
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }

    /// Rebuilds a training record from its adapter-level record.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidInput`] if the record is not a
    /// well-formed training record.
    pub fn from_record(record: &MetadataRecord) -> Result<Self> {
        let body: TrainingBody = record.decode_body()?;
        let dataset_id = record.parent_id.clone().ok_or_else(|| {
            crate::Error::InvalidInput(format!("training record '{}' has no dataset id", record.id))
        })?;
        Ok(Self {
            id: record.id.clone(),
            dataset_id,
            model_name: body.model_name,
            metrics: body.metrics,
            created_at: record.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_roundtrip() {
        let record = TrainingRecord {
            id: EntityId::new("t1"),
            dataset_id: EntityId::new("d1"),
            model_name: "gradient_boost".to_string(),
            metrics: BTreeMap::from([
                ("accuracy".to_string(), 0.91),
                ("f1".to_string(), 0.88),
            ]),
            created_at: 1_700_000_000,
        };

        let lowered = record.to_record();
        assert_eq!(lowered.kind, EntityKind::Training);
        assert!(lowered.placement.is_none());

        let back = TrainingRecord::from_record(&lowered).unwrap();
        assert_eq!(back, record);
    }
}
