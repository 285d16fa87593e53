use super::*;
use crate::cache::ONSEN_CACHE_HEADER;
use crate::corpus::Passage;
use crate::embedding::QueryFailingEmbedder;
use crate::pipeline::RagService;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

fn corpus() -> Vec<Passage> {
    vec![
        Passage::new("kusatsu_001", "草津温泉は強酸性の泉質で、湯畑が有名です。"),
        Passage::new("kusatsu_002", "草津の湯もみは伝統的な湯温調整の方法です。"),
        Passage::new("hakone_001", "箱根温泉には多くの源泉と美術館があります。"),
        Passage::new("beppu_001", "別府の地獄めぐりは観光の定番です。"),
        Passage::new("onsen_knowledge_001", "温泉の泉質には酸性泉や硫黄泉などがあります。"),
    ]
}

fn router_in(dir: &TempDir) -> (Router, Arc<RagService>) {
    let service = Arc::new(
        RagService::builder()
            .index_dir(dir.path())
            .build()
            .expect("build service"),
    );
    let router = create_router(GatewayState::new(Arc::clone(&service)));
    (router, service)
}

async fn ready_router(dir: &TempDir) -> Router {
    let (router, service) = router_in(dir);
    service.load_corpus(corpus()).await.expect("load corpus");
    router
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn json_body(response: Response) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

fn header<'a>(response: &'a Response, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

#[tokio::test]
async fn test_healthz_is_always_ok() {
    let dir = TempDir::new().expect("tempdir");
    let (router, _) = router_in(&dir);

    let response = router
        .oneshot(Request::get("/healthz").body(Body::empty()).expect("request"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, ONSEN_STATUS_HEADER), Some(ONSEN_STATUS_HEALTHY));
}

#[tokio::test]
async fn test_status_reports_readiness() {
    let dir = TempDir::new().expect("tempdir");
    let (router, service) = router_in(&dir);

    let response = router
        .clone()
        .oneshot(Request::get("/api/health").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(response).await;
    assert_eq!(body["index_ready"], false);
    assert_eq!(body["passages"], 0);

    service.load_corpus(corpus()).await.expect("load corpus");

    let response = router
        .oneshot(Request::get("/api/health").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, ONSEN_STATUS_HEADER), Some(ONSEN_STATUS_READY));
    let body = json_body(response).await;
    assert_eq!(body["index_ready"], true);
    assert_eq!(body["passages"], 5);
    assert_eq!(
        body["partitions"],
        serde_json::json!(["beppu", "hakone", "kusatsu", "onsen"])
    );
}

#[tokio::test]
async fn test_ask_before_ready_is_unavailable() {
    let dir = TempDir::new().expect("tempdir");
    let (router, _) = router_in(&dir);

    let response = router
        .oneshot(post_json(
            "/api/ask",
            serde_json::json!({ "question": "草津の泉質は？" }),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(header(&response, ONSEN_STATUS_HEADER), Some(ONSEN_STATUS_NOT_READY));
    let body = json_body(response).await;
    assert_eq!(body["code"], 503);
}

#[tokio::test]
async fn test_ask_returns_sources_and_caches() {
    let dir = TempDir::new().expect("tempdir");
    let router = ready_router(&dir).await;
    let request = serde_json::json!({ "question": "草津の泉質は？" });

    let first = router
        .clone()
        .oneshot(post_json("/api/ask", request.clone()))
        .await
        .expect("response");
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(header(&first, ONSEN_CACHE_HEADER), Some("MISS"));
    assert_eq!(header(&first, "x-onsen-partition"), Some("kusatsu"));
    assert!(header(&first, "x-request-id").is_some());

    let body = json_body(first).await;
    assert_eq!(body["partition"], "kusatsu");
    let sources = body["answer_sources"].as_array().expect("sources array");
    assert!(sources.len() <= 5);
    for source in sources {
        let partition = source["passage"]["topic_partition"].as_str().expect("partition");
        assert!(partition == "kusatsu" || partition == "onsen");
    }

    let second = router
        .oneshot(post_json("/api/ask", request))
        .await
        .expect("response");
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(header(&second, ONSEN_CACHE_HEADER), Some("HIT"));
}

#[tokio::test]
async fn test_ask_accepts_history() {
    let dir = TempDir::new().expect("tempdir");
    let router = ready_router(&dir).await;

    let response = router
        .oneshot(post_json(
            "/api/ask",
            serde_json::json!({
                "question": "おすすめの宿は？",
                "history": [
                    { "role": "user", "content": "箱根に行きたい" },
                    { "role": "assistant", "content": "箱根は良いところです" }
                ]
            }),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["partition"], "hakone");
}

#[tokio::test]
async fn test_ask_rejects_blank_question() {
    let dir = TempDir::new().expect("tempdir");
    let router = ready_router(&dir).await;

    let response = router
        .oneshot(post_json("/api/ask", serde_json::json!({ "question": " \n " })))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["code"], 400);
}

#[tokio::test]
async fn test_ask_rejects_malformed_shape() {
    let dir = TempDir::new().expect("tempdir");
    let router = ready_router(&dir).await;

    for body in [
        serde_json::json!({ "query": "草津" }),
        serde_json::json!({ "question": 42 }),
        serde_json::json!({ "question": "草津", "extra": true }),
    ] {
        let response = router
            .clone()
            .oneshot(post_json("/api/ask", body))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert_eq!(json["error"], "invalid request: malformed request body");
        assert!(!json["error"].as_str().unwrap_or_default().contains("question"));
    }

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/ask")
                .header("content-type", "application/json")
                .body(Body::from("{\"question\": "))
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"], "invalid request: malformed request body");
}

#[tokio::test]
async fn test_retrieval_failure_is_internal_error() {
    let dir = TempDir::new().expect("tempdir");
    let service = Arc::new(
        RagService::builder()
            .index_dir(dir.path())
            .embedder(Arc::new(QueryFailingEmbedder::new("cuda device lost")))
            .build()
            .expect("build service"),
    );
    service.load_corpus(corpus()).await.expect("load corpus");
    let router = create_router(GatewayState::new(Arc::clone(&service)));

    let response = router
        .oneshot(post_json(
            "/api/ask",
            serde_json::json!({ "question": "草津の泉質" }),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = json_body(response).await;
    assert_eq!(json["error"], "internal error");
    assert_eq!(json["code"], 500);
    assert!(service.result_cache().is_empty());
    assert_eq!(service.conversation().snapshot().last_topic_partition, None);
}

#[tokio::test]
async fn test_search_limits_results_and_bypasses_cache() {
    let dir = TempDir::new().expect("tempdir");
    let router = ready_router(&dir).await;

    let response = router
        .clone()
        .oneshot(post_json(
            "/api/search",
            serde_json::json!({ "question": "泉質", "k": 2 }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, ONSEN_CACHE_HEADER), Some("BYPASS"));
    let body = json_body(response).await;
    assert!(body.as_array().expect("results array").len() <= 2);

    let response = router
        .oneshot(post_json(
            "/api/search",
            serde_json::json!({ "question": "泉質", "k": 0 }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
