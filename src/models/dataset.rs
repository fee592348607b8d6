//! Dataset entity: the root of the reference graph.

use super::{EntityId, EntityKind, MetadataRecord, Placement};
use crate::Result;
use serde::{Deserialize, Serialize};

/// One column of a dataset's declared schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name.
    pub name: String,
    /// Declared type, as reported by the ingesting layer (e.g. "int64",
    /// "utf8"). Opaque to this crate.
    pub data_type: String,
}

impl ColumnDef {
    /// Creates a column definition.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// A raw ingested dataset.
///
/// Created on first payload ingestion (upload or query-result
/// materialization). Every workspace, training record and feedback record
/// holds a required reference to one dataset; deleting the dataset cascades
/// over all of them.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// Unique identifier.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Number of rows in the full payload.
    pub row_count: u64,
    /// Number of columns.
    pub column_count: u64,
    /// Ordered column schema.
    pub schema: Vec<ColumnDef>,
    /// Bounded row sample, always inlined regardless of where the full
    /// payload landed. Its size stays below the inline threshold by
    /// construction.
    pub preview: Vec<String>,
    /// Where the full payload lives.
    pub placement: Placement,
    /// Creation timestamp (Unix epoch seconds).
    pub created_at: u64,
}

/// Kind-specific record body for datasets.
#[derive(Debug, Serialize, Deserialize)]
struct DatasetBody {
    row_count: u64,
    column_count: u64,
    schema: Vec<ColumnDef>,
    preview: Vec<String>,
}

impl Dataset {
    /// Lowers the dataset to its adapter-level record.
    #[must_use]
    pub fn to_record(&self) -> MetadataRecord {
        let body = DatasetBody {
            row_count: self.row_count,
            column_count: self.column_count,
            schema: self.schema.clone(),
            preview: self.preview.clone(),
        };
        MetadataRecord {
            id: self.id.clone(),
            kind: EntityKind::Dataset,
            parent_id: None,
            name: Some(self.name.clone()),
            placement: Some(self.placement.clone()),
            // Serializing a struct of plain fields cannot fail.
            body: serde_json::to_value(body).unwrap_or_default(),
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }

    /// Rebuilds a dataset from its adapter-level record.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidInput`] if the record body or placement
    /// does not decode as a dataset.
    pub fn from_record(record: &MetadataRecord) -> Result<Self> {
        let body: DatasetBody = record.decode_body()?;
        let placement = record.placement.clone().ok_or_else(|| {
            crate::Error::InvalidInput(format!("dataset record '{}' has no placement", record.id))
        })?;
        Ok(Self {
            id: record.id.clone(),
            name: record.name.clone().unwrap_or_default(),
            row_count: body.row_count,
            column_count: body.column_count,
            schema: body.schema,
            preview: body.preview,
            placement,
            created_at: record.created_at,
        })
    }
}

/// Extracts a bounded row sample from a payload.
///
/// Treats the payload as newline-delimited text (CSV or JSON-lines, which is
/// what the ingestion layer produces) and takes up to `max_rows` lines,
/// stopping early once `max_bytes` of sample has accumulated. Non-UTF-8
/// payloads degrade to a lossy sample rather than failing; the preview is a
/// UI affordance, not part of the round-trip contract.
#[must_use]
pub fn preview_lines(payload: &[u8], max_rows: usize, max_bytes: usize) -> Vec<String> {
    let text = String::from_utf8_lossy(payload);
    let mut sample = Vec::new();
    let mut taken = 0usize;
    for line in text.lines().take(max_rows) {
        // A single pathological line gets truncated instead of blowing the bound.
        let line = if line.len() > max_bytes {
            let mut end = max_bytes;
            while !line.is_char_boundary(end) {
                end -= 1;
            }
            &line[..end]
        } else {
            line
        };
        taken += line.len();
        sample.push(line.to_string());
        if taken >= max_bytes {
            break;
        }
    }
    sample
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_dataset() -> Dataset {
        Dataset {
            id: EntityId::new("d1"),
            name: "trips".to_string(),
            row_count: 100,
            column_count: 2,
            schema: vec![
                ColumnDef::new("city", "utf8"),
                ColumnDef::new("count", "int64"),
            ],
            preview: vec!["city,count".to_string(), "berlin,7".to_string()],
            placement: Placement::inline(b"city,count\nberlin,7\n".to_vec()),
            created_at: 1_700_000_000,
        }
    }

    #[test]
    fn test_record_roundtrip() {
        let dataset = sample_dataset();
        let record = dataset.to_record();
        assert_eq!(record.kind, EntityKind::Dataset);
        assert_eq!(record.parent_id, None);

        let back = Dataset::from_record(&record).unwrap();
        assert_eq!(back, dataset);
    }

    #[test]
    fn test_from_record_without_placement_fails() {
        let mut record = sample_dataset().to_record();
        record.placement = None;
        assert!(Dataset::from_record(&record).is_err());
    }

    #[test]
    fn test_preview_respects_row_bound() {
        let payload = b"a\nb\nc\nd\ne\n";
        let preview = preview_lines(payload, 3, 1024);
        assert_eq!(preview, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_preview_respects_byte_bound() {
        let payload = vec![b'x'; 10_000];
        let preview = preview_lines(&payload, 50, 100);
        assert_eq!(preview.len(), 1);
        assert_eq!(preview[0].len(), 100);
    }

    #[test]
    fn test_preview_of_empty_payload() {
        assert!(preview_lines(b"", 10, 1024).is_empty());
    }
}
