//! End-to-end round-trip and placement properties over both backend
//! families.

use lodestore::storage::{Deadline, PlacementPolicy};
use lodestore::{
    ArtifactRepository, BackendFactory, BackendKind, ColumnDef, Placement, StoreConfig,
};
use std::collections::BTreeMap;
use std::sync::Arc;

const KIB: usize = 1024;
const MIB: usize = 1024 * 1024;

fn schema() -> Vec<ColumnDef> {
    vec![
        ColumnDef::new("city", "utf8"),
        ColumnDef::new("count", "int64"),
    ]
}

/// Repository over the embedded relational family in a temp directory.
fn relational_repo(dir: &tempfile::TempDir, placement: PlacementPolicy) -> ArtifactRepository {
    let mut config = StoreConfig::default();
    config.default_backend = BackendKind::Relational;
    config.relational.sqlite_path = dir.path().join("artifacts.db");
    config.placement = placement;
    config.preview_max_bytes = config.preview_max_bytes.min(placement.inline_threshold / 2);
    ArtifactRepository::new(Arc::new(BackendFactory::new(config).unwrap()))
}

/// Repository over the in-process document family.
fn document_repo(placement: PlacementPolicy, chunk_size: usize) -> ArtifactRepository {
    let mut config = StoreConfig::default();
    config.default_backend = BackendKind::Document;
    config.placement = placement;
    config.chunk_size = chunk_size;
    config.preview_max_bytes = config.preview_max_bytes.min(placement.inline_threshold / 2);
    ArtifactRepository::new(Arc::new(BackendFactory::new(config).unwrap()))
}

/// Compressible payload of exactly `len` bytes (repetitive JSON-ish text).
fn compressible_payload(len: usize) -> Vec<u8> {
    let unit = br#"{"city":"berlin","count":7,"flag":true}"#;
    let mut payload = Vec::with_capacity(len);
    while payload.len() < len {
        payload.extend_from_slice(unit);
    }
    payload.truncate(len);
    payload
}

/// Incompressible-ish payload (cycling bytes) of exactly `len` bytes.
fn cycling_payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[test]
fn roundtrip_inline_and_blob_both_families() {
    let policy = PlacementPolicy {
        inline_threshold: 4 * KIB,
        compress_threshold: 16 * KIB,
    };
    let dir = tempfile::TempDir::new().unwrap();
    let deadline = Deadline::none();

    for repo in [relational_repo(&dir, policy), document_repo(policy, KIB)] {
        for payload in [
            Vec::new(),
            b"city,count\nberlin,7\n".to_vec(),
            cycling_payload(8 * KIB),
            compressible_payload(64 * KIB),
        ] {
            let dataset = repo
                .save_dataset("roundtrip", schema(), &payload, &deadline)
                .unwrap();
            let (bytes, loaded_schema) = repo.load_dataset(&dataset.id, &deadline).unwrap();
            assert_eq!(bytes, payload);
            assert_eq!(loaded_schema, schema());
        }
    }
}

#[test]
fn threshold_boundary_is_exact() {
    let policy = PlacementPolicy {
        inline_threshold: 4 * KIB,
        compress_threshold: 64 * KIB,
    };
    let deadline = Deadline::none();
    let dir = tempfile::TempDir::new().unwrap();

    for repo in [relational_repo(&dir, policy), document_repo(policy, KIB)] {
        let below = repo
            .save_dataset("below", schema(), &cycling_payload(4 * KIB - 1), &deadline)
            .unwrap();
        assert!(below.placement.is_inline(), "threshold - 1 must be inline");

        let at = repo
            .save_dataset("at", schema(), &cycling_payload(4 * KIB), &deadline)
            .unwrap();
        assert!(!at.placement.is_inline(), "exactly threshold must be blob");
        let Placement::Blob { compressed, .. } = &at.placement else {
            panic!("expected blob placement");
        };
        assert!(!*compressed, "below compress threshold stays raw");
    }
}

#[test]
fn compression_reversibility_and_shrinkage() {
    let policy = PlacementPolicy {
        inline_threshold: 4 * KIB,
        compress_threshold: 8 * KIB,
    };
    let repo = document_repo(policy, KIB);
    let deadline = Deadline::none();
    let payload = compressible_payload(32 * KIB);

    let dataset = repo
        .save_dataset("compressed", schema(), &payload, &deadline)
        .unwrap();
    let Placement::Blob {
        blob_ref,
        original_size,
        compressed,
    } = &dataset.placement
    else {
        panic!("expected blob placement");
    };
    assert!(*compressed);
    assert_eq!(*original_size, payload.len() as u64);
    // Stored size is the compressed size, and repetitive JSON shrinks.
    assert!(blob_ref.byte_length < payload.len() as u64);

    let (bytes, _) = repo.load_dataset(&dataset.id, &deadline).unwrap();
    assert_eq!(bytes, payload);
}

#[test]
fn chunk_reconstruction_five_chunks() {
    // chunk size x 4 + 1 byte forces exactly five chunks.
    let chunk_size = 256;
    let policy = PlacementPolicy {
        inline_threshold: 64,
        compress_threshold: MIB,
    };
    let repo = document_repo(policy, chunk_size);
    let deadline = Deadline::none();
    let payload = cycling_payload(chunk_size * 4 + 1);

    let dataset = repo
        .save_dataset("chunked", schema(), &payload, &deadline)
        .unwrap();
    let Placement::Blob { blob_ref, .. } = &dataset.placement else {
        panic!("expected blob placement");
    };
    assert_eq!(blob_ref.chunk_count, 5);
    assert_eq!(blob_ref.byte_length, payload.len() as u64);

    let (bytes, _) = repo.load_dataset(&dataset.id, &deadline).unwrap();
    assert_eq!(bytes, payload);
}

#[test]
fn cascade_delete_three_workspaces_one_feedback() {
    let policy = PlacementPolicy {
        inline_threshold: KIB,
        compress_threshold: 16 * KIB,
    };
    let dir = tempfile::TempDir::new().unwrap();
    let deadline = Deadline::none();

    for repo in [relational_repo(&dir, policy), document_repo(policy, KIB)] {
        let dataset = repo
            .save_dataset("root", schema(), &cycling_payload(8 * KIB), &deadline)
            .unwrap();

        let mut workspace_ids = Vec::new();
        for i in 0..3 {
            let ws = repo
                .save_workspace(
                    &dataset.id,
                    &format!("ws-{i}"),
                    &cycling_payload(4 * KIB),
                    &deadline,
                )
                .unwrap();
            workspace_ids.push(ws.id);
        }
        repo.record_feedback(&dataset.id, "pred-1", 1, None, &deadline)
            .unwrap();

        repo.delete_dataset(&dataset.id, &deadline).unwrap();

        for id in &workspace_ids {
            assert!(matches!(
                repo.load_workspace(id, &deadline),
                Err(lodestore::Error::NotFound { .. })
            ));
        }
        // No blob objects created for them remain reachable.
        assert!(
            repo.factory()
                .current()
                .blobs()
                .list_keys(&deadline)
                .unwrap()
                .is_empty()
        );
    }
}

#[test]
fn concrete_scenario_small_json_dataset_inlines() {
    // 50-byte JSON dataset with a 1 MB inline threshold.
    let policy = PlacementPolicy {
        inline_threshold: MIB,
        compress_threshold: 2 * MIB,
    };
    let dir = tempfile::TempDir::new().unwrap();
    let repo = relational_repo(&dir, policy);
    let deadline = Deadline::none();

    let payload = br#"{"city":"berlin","count":7,"note":"fifty bytes!!"}"#;
    assert_eq!(payload.len(), 50);

    let dataset = repo
        .save_dataset("tiny-json", schema(), payload, &deadline)
        .unwrap();
    assert!(dataset.placement.is_inline());

    let (bytes, _) = repo.load_dataset(&dataset.id, &deadline).unwrap();
    assert_eq!(bytes, payload);
}

#[test]
fn concrete_scenario_12mb_workspace_compresses() {
    // 12 MB workspace with inline 10 MB / compress 2 MB: blob + compressed.
    let policy = PlacementPolicy {
        inline_threshold: 10 * MIB,
        compress_threshold: 2 * MIB,
    };
    let repo = document_repo(policy, 256 * KIB);
    let deadline = Deadline::none();

    let dataset = repo
        .save_dataset("parent", schema(), b"rows", &deadline)
        .unwrap();
    let payload = compressible_payload(12 * MIB);

    let workspace = repo
        .save_workspace(&dataset.id, "big-analysis", &payload, &deadline)
        .unwrap();
    assert_eq!(workspace.size_bytes, (12 * MIB) as u64);
    let Placement::Blob { compressed, .. } = &workspace.placement else {
        panic!("expected blob placement");
    };
    assert!(*compressed);
    assert!(workspace.compressed_size_bytes.unwrap() < (12 * MIB) as u64);

    let bytes = repo.load_workspace(&workspace.id, &deadline).unwrap();
    assert_eq!(bytes.len(), 12 * MIB);
    assert_eq!(bytes, payload);
}

#[test]
fn workspace_listing_reports_summaries() {
    let policy = PlacementPolicy {
        inline_threshold: KIB,
        compress_threshold: 16 * KIB,
    };
    let dir = tempfile::TempDir::new().unwrap();
    let repo = relational_repo(&dir, policy);
    let deadline = Deadline::none();

    let dataset = repo
        .save_dataset("d", schema(), b"rows", &deadline)
        .unwrap();
    repo.save_workspace(&dataset.id, "alpha", b"one", &deadline)
        .unwrap();
    repo.save_workspace(&dataset.id, "beta", &cycling_payload(2 * KIB), &deadline)
        .unwrap();

    let mut summaries = repo.list_workspaces(&dataset.id, &deadline).unwrap();
    summaries.sort_by(|a, b| a.name.cmp(&b.name));
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].name, "alpha");
    assert_eq!(summaries[0].size_bytes, 3);
    assert_eq!(summaries[1].name, "beta");
    assert_eq!(summaries[1].size_bytes, 2 * KIB as u64);
}

#[test]
fn training_and_feedback_survive_relational_reopen() {
    let policy = PlacementPolicy::default();
    let dir = tempfile::TempDir::new().unwrap();
    let deadline = Deadline::none();

    let dataset_id = {
        let repo = relational_repo(&dir, policy);
        let dataset = repo
            .save_dataset("persisted", schema(), b"rows", &deadline)
            .unwrap();
        repo.record_training(
            &dataset.id,
            "forest",
            BTreeMap::from([("accuracy".to_string(), 0.93), ("f1".to_string(), 0.88)]),
            &deadline,
        )
        .unwrap();
        repo.record_feedback(&dataset.id, "p1", 1, Some("spot on".to_string()), &deadline)
            .unwrap();
        dataset.id
    };

    // A fresh factory against the same file sees everything.
    let repo = relational_repo(&dir, policy);
    let training = repo.list_training(&dataset_id, &deadline).unwrap();
    assert_eq!(training.len(), 1);
    assert_eq!(training[0].model_name, "forest");
    assert!((training[0].metrics["accuracy"] - 0.93).abs() < f64::EPSILON);

    let feedback = repo.list_feedback(&dataset_id, &deadline).unwrap();
    assert_eq!(feedback.len(), 1);
    assert_eq!(feedback[0].prediction_id, "p1");
    assert_eq!(feedback[0].comment.as_deref(), Some("spot on"));
}

#[test]
fn preview_is_present_even_for_blob_datasets() {
    let policy = PlacementPolicy {
        inline_threshold: KIB,
        compress_threshold: 16 * KIB,
    };
    let repo = document_repo(policy, KIB);
    let deadline = Deadline::none();

    let mut payload = Vec::new();
    for i in 0..200 {
        payload.extend_from_slice(format!("row-{i},value-{i}\n").as_bytes());
    }
    let dataset = repo
        .save_dataset("previewed", schema(), &payload, &deadline)
        .unwrap();

    assert!(!dataset.placement.is_inline());
    assert!(!dataset.preview.is_empty());
    assert_eq!(dataset.preview[0], "row-0,value-0");
    // Preview stays under the configured bounds.
    assert!(dataset.preview.len() <= repo.factory().config().preview_rows);
}
