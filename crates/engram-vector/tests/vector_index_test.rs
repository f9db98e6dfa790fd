//! Integration tests: CRUD, filtered search, batch semantics, persistence.

use engram_core::EngramError;
use engram_vector::{SearchOptions, VectorDocument, VectorIndex, VectorIndexConfig};
use serde_json::{json, Map};

fn doc(id: &str, vector: Vec<f32>) -> VectorDocument {
    let mut metadata = Map::new();
    metadata.insert("id".to_string(), json!(id));
    VectorDocument::new(id, vector).with_metadata(metadata)
}

fn doc_in_workspace(id: &str, vector: Vec<f32>, workspace: &str) -> VectorDocument {
    let mut d = doc(id, vector);
    d.metadata.insert("workspace_id".to_string(), json!(workspace));
    d
}

#[test]
fn first_add_fixes_dimension() {
    let index = VectorIndex::new(VectorIndexConfig::default());
    assert_eq!(index.dimension(), None);

    index.add(doc("a", vec![1.0, 0.0, 0.0])).unwrap();
    assert_eq!(index.dimension(), Some(3));

    let err = index.add(doc("b", vec![1.0, 0.0])).unwrap_err();
    assert!(matches!(
        err,
        EngramError::DimensionMismatch {
            expected: 3,
            actual: 2
        }
    ));
}

#[test]
fn add_batch_is_atomic_by_default() {
    let index = VectorIndex::new(VectorIndexConfig::default());
    let err = index
        .add_batch(vec![
            doc("a", vec![1.0, 2.0]),
            doc("bad", vec![f32::NAN, 1.0]),
        ])
        .unwrap_err();
    assert!(matches!(err, EngramError::Validation { .. }));
    assert_eq!(index.len(), 0);
}

#[test]
fn partial_batch_commits_valid_entries() {
    let index = VectorIndex::new(VectorIndexConfig {
        allow_partial_batch: true,
        ..Default::default()
    });
    let result = index
        .add_batch(vec![
            doc("a", vec![1.0, 2.0]),
            doc("bad", vec![f32::NAN, 1.0]),
            doc("c", vec![3.0, 4.0]),
        ])
        .unwrap();

    assert_eq!(result.inserted, vec!["a".to_string(), "c".to_string()]);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].id, "bad");
    assert_eq!(index.len(), 2);
}

#[test]
fn upsert_partitions_by_preexistence() {
    let index = VectorIndex::new(VectorIndexConfig::default());
    index.add(doc("a", vec![1.0, 0.0])).unwrap();

    let result = index
        .upsert_batch(vec![doc("a", vec![0.5, 0.5]), doc("b", vec![0.0, 1.0])])
        .unwrap();
    assert_eq!(result.updated, vec!["a".to_string()]);
    assert_eq!(result.inserted, vec!["b".to_string()]);
    assert_eq!(index.get("a").unwrap().unwrap().vector, vec![0.5, 0.5]);
}

#[test]
fn search_orders_by_score_descending() {
    let index = VectorIndex::new(VectorIndexConfig::default());
    index.add(doc("exact", vec![1.0, 0.0])).unwrap();
    index.add(doc("close", vec![0.9, 0.1])).unwrap();
    index.add(doc("far", vec![0.0, 1.0])).unwrap();

    let hits = index
        .search(&[1.0, 0.0], &SearchOptions::default())
        .unwrap();
    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].id, "exact");
    assert_eq!(hits[1].id, "close");
    assert_eq!(hits[2].id, "far");
    assert!(hits[0].score > hits[1].score && hits[1].score > hits[2].score);
}

#[test]
fn search_respects_k_filter_and_threshold() {
    let index = VectorIndex::new(VectorIndexConfig::default());
    index
        .add(doc_in_workspace("a", vec![1.0, 0.0], "ws1"))
        .unwrap();
    index
        .add(doc_in_workspace("b", vec![0.95, 0.05], "ws1"))
        .unwrap();
    index
        .add(doc_in_workspace("c", vec![1.0, 0.0], "ws2"))
        .unwrap();

    let mut filter = Map::new();
    filter.insert("workspace_id".to_string(), json!("ws1"));

    let hits = index
        .search(
            &[1.0, 0.0],
            &SearchOptions {
                k: 1,
                filter: Some(filter.clone()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "a");

    let hits = index
        .search(
            &[1.0, 0.0],
            &SearchOptions {
                k: 10,
                filter: Some(filter),
                threshold: Some(0.999),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(hits.len(), 1, "threshold should prune 'b'");
}

#[test]
fn search_rejects_wrong_dimension_query() {
    let index = VectorIndex::new(VectorIndexConfig::default());
    index.add(doc("a", vec![1.0, 0.0, 0.0])).unwrap();
    let err = index.search(&[1.0], &SearchOptions::default()).unwrap_err();
    assert!(matches!(err, EngramError::DimensionMismatch { .. }));
}

#[test]
fn search_batch_returns_one_list_per_query() {
    let index = VectorIndex::new(VectorIndexConfig::default());
    index.add(doc("x", vec![1.0, 0.0])).unwrap();
    index.add(doc("y", vec![0.0, 1.0])).unwrap();

    let results = index
        .search_batch(&[
            (vec![1.0, 0.0], SearchOptions { k: 1, ..Default::default() }),
            (vec![0.0, 1.0], SearchOptions { k: 1, ..Default::default() }),
        ])
        .unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0][0].id, "x");
    assert_eq!(results[1][0].id, "y");
}

#[test]
fn get_batch_roundtrip() {
    let index = VectorIndex::new(VectorIndexConfig::default());
    let docs: Vec<VectorDocument> = (0..20)
        .map(|i| doc(&format!("doc-{i:02}"), vec![i as f32, 1.0]))
        .collect();
    index.add_batch(docs.clone()).unwrap();

    let ids: Vec<String> = docs.iter().map(|d| d.id.clone()).collect();
    let got = index.get_batch(&ids).unwrap();
    assert_eq!(got.len(), 20);
    for (original, loaded) in docs.iter().zip(&got) {
        assert_eq!(original.vector, loaded.vector);
    }
}

#[test]
fn get_by_filter_paginates() {
    let index = VectorIndex::new(VectorIndexConfig::default());
    for i in 0..10 {
        index
            .add(doc_in_workspace(&format!("d{i}"), vec![i as f32, 0.0], "ws"))
            .unwrap();
    }
    let mut filter = Map::new();
    filter.insert("workspace_id".to_string(), json!("ws"));

    let page = index.get_by_filter(&filter, 2, Some(3)).unwrap();
    assert_eq!(page.len(), 3);
    // Ordered by id: d0,d1,d2,... so offset 2 starts at d2.
    assert_eq!(page[0].id, "d2");
}

#[test]
fn delete_batch_reports_both_sides() {
    let index = VectorIndex::new(VectorIndexConfig::default());
    index.add(doc("keep", vec![1.0])).unwrap();
    index.add(doc("drop", vec![2.0])).unwrap();

    let result = index
        .delete_batch(&["drop".to_string(), "ghost".to_string()])
        .unwrap();
    assert_eq!(result.deleted, vec!["drop".to_string()]);
    assert_eq!(result.not_found, vec!["ghost".to_string()]);
    assert_eq!(index.len(), 1);
}

#[test]
fn delete_by_filter_counts() {
    let index = VectorIndex::new(VectorIndexConfig::default());
    index.add(doc_in_workspace("a", vec![1.0], "ws1")).unwrap();
    index.add(doc_in_workspace("b", vec![2.0], "ws1")).unwrap();
    index.add(doc_in_workspace("c", vec![3.0], "ws2")).unwrap();

    let mut filter = Map::new();
    filter.insert("workspace_id".to_string(), json!("ws1"));
    assert_eq!(index.delete_by_filter(&filter).unwrap(), 2);
    assert_eq!(index.len(), 1);
}

#[test]
fn persist_load_search_is_stable() {
    let dir = tempfile::tempdir().unwrap();
    let config = VectorIndexConfig {
        persist_dir: Some(dir.path().to_path_buf()),
        ..Default::default()
    };

    let index = VectorIndex::new(config.clone());
    index.add(doc("a", vec![1.0, 0.0, 0.0])).unwrap();
    index.add(doc("b", vec![0.7, 0.7, 0.0])).unwrap();
    index.add(doc("c", vec![0.0, 0.0, 1.0])).unwrap();

    let before = index.search(&[1.0, 0.0, 0.0], &SearchOptions::default()).unwrap();
    index.persist().unwrap();

    let reloaded = VectorIndex::new(config);
    reloaded.load().unwrap();
    assert_eq!(reloaded.dimension(), Some(3));
    let after = reloaded
        .search(&[1.0, 0.0, 0.0], &SearchOptions::default())
        .unwrap();

    assert_eq!(before.len(), after.len());
    for (x, y) in before.iter().zip(&after) {
        assert_eq!(x.id, y.id);
        assert!((x.score - y.score).abs() < 1e-12);
    }
}

#[test]
fn load_from_empty_dir_is_empty_index() {
    let dir = tempfile::tempdir().unwrap();
    let index = VectorIndex::new(VectorIndexConfig {
        persist_dir: Some(dir.path().to_path_buf()),
        ..Default::default()
    });
    index.load().unwrap();
    assert!(index.is_empty());
    assert_eq!(index.dimension(), None);
}

#[test]
fn closed_index_rejects_operations() {
    let index = VectorIndex::new(VectorIndexConfig::default());
    index.add(doc("a", vec![1.0])).unwrap();
    index.close();
    assert!(matches!(
        index.add(doc("b", vec![2.0])).unwrap_err(),
        EngramError::Closed
    ));
    assert!(matches!(
        index.search(&[1.0], &SearchOptions::default()).unwrap_err(),
        EngramError::Closed
    ));
    // Idempotent.
    index.close();
}
