//! Feedback entity: user feedback on a single prediction.

use super::{EntityId, EntityKind, MetadataRecord};
use crate::Result;
use serde::{Deserialize, Serialize};

/// User feedback on a prediction made against a dataset.
///
/// `prediction_id` is unique per dataset. Always inline; destroyed by
/// dataset cascade or direct deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackRecord {
    /// Unique identifier.
    pub id: EntityId,
    /// Owning dataset.
    pub dataset_id: EntityId,
    /// The prediction this feedback refers to; unique within the dataset.
    pub prediction_id: String,
    /// User rating, -1 (wrong) to +1 (correct) in the common case.
    pub rating: i32,
    /// Free-form comment.
    pub comment: Option<String>,
    /// Creation timestamp (Unix epoch seconds).
    pub created_at: u64,
}

/// Kind-specific record body for feedback records.
#[derive(Debug, Serialize, Deserialize)]
struct FeedbackBody {
    prediction_id: String,
    rating: i32,
    comment: Option<String>,
}

impl FeedbackRecord {
    /// Lowers the feedback record to its adapter-level record.
    #[must_use]
    pub fn to_record(&self) -> MetadataRecord {
        let body = FeedbackBody {
            prediction_id: self.prediction_id.clone(),
            rating: self.rating,
            comment: self.comment.clone(),
        };
        MetadataRecord {
            id: self.id.clone(),
            kind: EntityKind::Feedback,
            parent_id: Some(self.dataset_id.clone()),
            name: None,
            placement: None,
            body: serde_json::to_value(body).unwrap_or_default(),
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }

    /// Rebuilds a feedback record from its adapter-level record.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidInput`] if the record is not a
    /// well-formed feedback record.
    pub fn from_record(record: &MetadataRecord) -> Result<Self> {
        let body: FeedbackBody = record.decode_body()?;
        let dataset_id = record.parent_id.clone().ok_or_else(|| {
            crate::Error::InvalidInput(format!("feedback record '{}' has no dataset id", record.id))
        })?;
        Ok(Self {
            id: record.id.clone(),
            dataset_id,
            prediction_id: body.prediction_id,
            rating: body.rating,
            comment: body.comment,
            created_at: record.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_roundtrip() {
        let record = FeedbackRecord {
            id: EntityId::new("f1"),
            dataset_id: EntityId::new("d1"),
            prediction_id: "pred-7".to_string(),
            rating: -1,
            comment: Some("mislabeled".to_string()),
            created_at: 1_700_000_000,
        };

        let lowered = record.to_record();
        assert_eq!(lowered.kind, EntityKind::Feedback);
        assert!(lowered.name.is_none());

        let back = FeedbackRecord::from_record(&lowered).unwrap();
        assert_eq!(back, record);
    }
}
