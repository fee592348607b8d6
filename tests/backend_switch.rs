//! Backend switching and isolation semantics.
//!
//! Switching never migrates data: artifacts written under one family are
//! invisible while a distinct physical store is active, and reachable again
//! after switching back to the original store.

use lodestore::storage::Deadline;
use lodestore::{ArtifactRepository, BackendFactory, BackendKind, ColumnDef, StoreConfig};
use std::sync::Arc;

fn schema() -> Vec<ColumnDef> {
    vec![ColumnDef::new("city", "utf8")]
}

fn repo_with_sqlite(dir: &tempfile::TempDir) -> ArtifactRepository {
    let mut config = StoreConfig::default();
    config.default_backend = BackendKind::Relational;
    config.relational.sqlite_path = dir.path().join("artifacts.db");
    ArtifactRepository::new(Arc::new(BackendFactory::new(config).unwrap()))
}

#[test]
fn current_backend_reports_active_family() {
    let dir = tempfile::TempDir::new().unwrap();
    let repo = repo_with_sqlite(&dir);
    assert_eq!(repo.current_backend(), BackendKind::Relational);

    repo.switch_backend(BackendKind::Document).unwrap();
    assert_eq!(repo.current_backend(), BackendKind::Document);
}

#[test]
fn data_is_isolated_per_physical_store() {
    let dir = tempfile::TempDir::new().unwrap();
    let repo = repo_with_sqlite(&dir);
    let deadline = Deadline::none();

    let dataset = repo
        .save_dataset("relational-only", schema(), b"rows", &deadline)
        .unwrap();

    // While the (distinct) document store is active the dataset is absent.
    repo.switch_backend(BackendKind::Document).unwrap();
    assert!(matches!(
        repo.load_dataset(&dataset.id, &deadline),
        Err(lodestore::Error::NotFound { .. })
    ));

    // Back on the same physical SQLite file it is retrievable again.
    repo.switch_backend(BackendKind::Relational).unwrap();
    let (bytes, _) = repo.load_dataset(&dataset.id, &deadline).unwrap();
    assert_eq!(bytes, b"rows");
}

#[test]
fn blob_tier_data_survives_switch_away_and_back() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut config = StoreConfig::default();
    config.default_backend = BackendKind::Relational;
    config.relational.sqlite_path = dir.path().join("artifacts.db");
    config.placement.inline_threshold = 64;
    config.placement.compress_threshold = 1024 * 1024;
    config.preview_max_bytes = 32;
    let repo = ArtifactRepository::new(Arc::new(BackendFactory::new(config).unwrap()));
    let deadline = Deadline::none();

    let payload: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
    let dataset = repo
        .save_dataset("blob-tier", schema(), &payload, &deadline)
        .unwrap();
    assert!(!dataset.placement.is_inline());

    repo.switch_backend(BackendKind::Document).unwrap();
    repo.switch_backend(BackendKind::Relational).unwrap();

    let (bytes, _) = repo.load_dataset(&dataset.id, &deadline).unwrap();
    assert_eq!(bytes, payload);
}

#[test]
fn writes_land_in_the_active_backend_only() {
    let dir = tempfile::TempDir::new().unwrap();
    let repo = repo_with_sqlite(&dir);
    let deadline = Deadline::none();

    let relational_ds = repo
        .save_dataset("in-relational", schema(), b"a", &deadline)
        .unwrap();

    repo.switch_backend(BackendKind::Document).unwrap();
    let document_ds = repo
        .save_dataset("in-document", schema(), b"b", &deadline)
        .unwrap();

    // Each dataset only exists in its own family.
    assert!(repo.load_dataset(&document_ds.id, &deadline).is_ok());
    assert!(repo.load_dataset(&relational_ds.id, &deadline).is_err());

    repo.switch_backend(BackendKind::Relational).unwrap();
    assert!(repo.load_dataset(&relational_ds.id, &deadline).is_ok());
    assert!(repo.load_dataset(&document_ds.id, &deadline).is_err());

    let datasets = repo.list_datasets(&deadline).unwrap();
    assert_eq!(datasets.len(), 1);
    assert_eq!(datasets[0].name, "in-relational");
}
