use super::*;

fn unit(values: &[f32]) -> Vec<f32> {
    let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    values.iter().map(|v| v / norm).collect()
}

async fn seeded_store() -> MemoryVectorStore {
    let store = MemoryVectorStore::new(3);
    store
        .add(vec![
            VectorPoint::new("kusatsu_001", "kusatsu", unit(&[1.0, 0.0, 0.0])),
            VectorPoint::new("hakone_001", "hakone", unit(&[0.9, 0.1, 0.0])),
            VectorPoint::new("onsen_001", "onsen", unit(&[0.0, 1.0, 0.0])),
            VectorPoint::new("beppu_001", "beppu", unit(&[0.0, 0.0, 1.0])),
        ])
        .await
        .expect("add");
    store
}

#[test]
fn test_cosine_similarity() {
    assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
    assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
    assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
}

#[test]
fn test_partition_filter() {
    let filter = PartitionFilter::new(["kusatsu", "onsen"]);
    assert!(filter.contains("kusatsu"));
    assert!(!filter.contains("hakone"));
    assert_eq!(filter.iter().collect::<Vec<_>>(), vec!["kusatsu", "onsen"]);
}

#[test]
fn test_collection_name() {
    assert_eq!(
        collection_name("onsen_passages", "0123456789abcdef0123"),
        "onsen_passages_0123456789abcdef"
    );
}

#[tokio::test]
async fn test_memory_query_orders_by_similarity() {
    let store = seeded_store().await;

    let hits = store.query(&unit(&[1.0, 0.0, 0.0]), 2, None).await.expect("query");
    let ids: Vec<_> = hits.iter().map(|h| h.passage_id.as_str()).collect();
    assert_eq!(ids, vec!["kusatsu_001", "hakone_001"]);
    assert!(hits[0].score >= hits[1].score);
}

#[tokio::test]
async fn test_memory_query_with_partition_filter() {
    let store = seeded_store().await;
    let filter = PartitionFilter::new(["hakone", "onsen"]);

    let hits = store
        .query(&unit(&[1.0, 0.0, 0.0]), 10, Some(&filter))
        .await
        .expect("query");
    let ids: Vec<_> = hits.iter().map(|h| h.passage_id.as_str()).collect();
    assert_eq!(ids, vec!["hakone_001", "onsen_001"]);
}

#[tokio::test]
async fn test_memory_add_replaces_existing_id() {
    let store = seeded_store().await;
    store
        .add(vec![VectorPoint::new(
            "kusatsu_001",
            "kusatsu",
            unit(&[0.0, 0.0, 1.0]),
        )])
        .await
        .expect("add");

    assert_eq!(store.len(), 4);
    let hits = store.query(&unit(&[0.0, 0.0, 1.0]), 2, None).await.expect("query");
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().any(|h| h.passage_id == "kusatsu_001"));
}

#[tokio::test]
async fn test_memory_rejects_wrong_dimension() {
    let store = MemoryVectorStore::new(3);

    let add = store
        .add(vec![VectorPoint::new("a_1", "a", vec![1.0, 0.0])])
        .await;
    assert!(matches!(add, Err(VectorDbError::InvalidDimension { expected: 3, actual: 2 })));

    let query = store.query(&[1.0], 1, None).await;
    assert!(matches!(query, Err(VectorDbError::InvalidDimension { .. })));
}

#[tokio::test]
async fn test_memory_zero_k_and_empty_store() {
    let store = MemoryVectorStore::new(3);
    assert!(store.is_empty());
    assert!(store.query(&[1.0, 0.0, 0.0], 5, None).await.expect("query").is_empty());

    let store = seeded_store().await;
    assert!(store.query(&[1.0, 0.0, 0.0], 0, None).await.expect("query").is_empty());
}

#[tokio::test]
async fn test_memory_backend_opens_fresh_stores() {
    let backend = VectorBackend::default();
    let first = backend.open("abc", 3).await.expect("open");
    let second = backend.open("abc", 3).await.expect("open");

    first
        .add(vec![VectorPoint::new("a_1", "a", vec![1.0, 0.0, 0.0])])
        .await
        .expect("add");

    assert_eq!(first.backend_name(), "memory");
    assert!(second.query(&[1.0, 0.0, 0.0], 5, None).await.expect("query").is_empty());
}
