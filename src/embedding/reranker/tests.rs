use super::*;
use std::path::PathBuf;

#[test]
fn test_config_default() {
    let config = RerankerConfig::default();

    assert!(config.model_path.is_none());
    assert_eq!(config.max_seq_len, MAX_SEQ_LEN);
    assert_eq!(config.batch_size, DEFAULT_RERANK_BATCH);
}

#[test]
fn test_config_new() {
    let config = RerankerConfig::new("/models/ms-marco-minilm");

    assert_eq!(
        config.model_path,
        Some(PathBuf::from("/models/ms-marco-minilm"))
    );
}

#[test]
fn test_config_validate() {
    assert!(RerankerConfig::default().validate().is_ok());
    assert!(RerankerConfig::default().with_max_seq_len(0).validate().is_err());
    assert!(RerankerConfig::default().with_batch_size(0).validate().is_err());
    assert!(RerankerConfig::new("").validate().is_err());
}

#[test]
fn test_load_rejects_invalid_config() {
    let result = Reranker::load(RerankerConfig::default().with_batch_size(0));
    assert!(matches!(result, Err(RerankerError::InvalidConfig { .. })));
}

#[test]
fn test_stub_creation() {
    let reranker = Reranker::stub();
    assert!(!reranker.is_model_loaded());
}

#[test]
fn test_load_with_missing_model() {
    let result = Reranker::load(RerankerConfig::new("/nonexistent/path/cross-encoder"));

    assert!(matches!(
        result.unwrap_err(),
        RerankerError::ModelLoadFailed { .. }
    ));
}

#[test]
fn test_stub_scores_same_length_and_order() {
    let reranker = Reranker::stub();
    let candidates = ["草津温泉の泉質は酸性", "箱根の交通", "草津の湯畑"];

    let scores = reranker
        .score_batch("草津の泉質", &candidates)
        .expect("score");

    assert_eq!(scores.len(), candidates.len());
    assert!(scores[0] > scores[1]);
}

#[test]
fn test_stub_score_range() {
    let reranker = Reranker::stub();

    let exact = reranker
        .score_batch("hot spring", &["hot spring"])
        .expect("score")[0];
    let none = reranker
        .score_batch("hot spring", &["mountain trail"])
        .expect("score")[0];

    assert!((exact - 4.0).abs() < 1e-5);
    assert!((none + 4.0).abs() < 1e-5);
}

#[test]
fn test_stub_empty_query_scores_lowest() {
    let reranker = Reranker::stub();
    let scores = reranker.score_batch("？", &["anything"]).expect("score");
    assert_eq!(scores, vec![-4.0]);
}

#[test]
fn test_empty_candidates() {
    let reranker = Reranker::stub();
    assert!(reranker.score_batch("query", &[]).expect("score").is_empty());
}
