//! Thin reqwest client for the gateway endpoints.

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde_json::Value;

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

pub struct TestClient {
    base_url: String,
    client: reqwest::Client,
}

impl TestClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("build client");
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    pub async fn get(&self, path: &str) -> anyhow::Result<TestResponse> {
        let response = self
            .client
            .get(format!("{}{path}", self.base_url))
            .send()
            .await?;
        Self::collect(response).await
    }

    pub async fn post(&self, path: &str, body: Value) -> anyhow::Result<TestResponse> {
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(&body)
            .send()
            .await?;
        Self::collect(response).await
    }

    pub async fn ask(&self, question: &str) -> anyhow::Result<TestResponse> {
        self.post("/api/ask", serde_json::json!({ "question": question }))
            .await
    }

    pub async fn search(&self, question: &str, k: usize) -> anyhow::Result<TestResponse> {
        self.post("/api/search", serde_json::json!({ "question": question, "k": k }))
            .await
    }

    async fn collect(response: reqwest::Response) -> anyhow::Result<TestResponse> {
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.bytes().await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok(TestResponse {
            status,
            headers,
            body,
        })
    }
}
