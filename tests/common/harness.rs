//! Spawns the gateway on an ephemeral port.

use std::net::SocketAddr;
use std::sync::Arc;

use onsen::gateway::{GatewayState, create_router};
use onsen::llm::LlmService;
use onsen::pipeline::{PipelineConfig, RagService};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use super::fixtures::write_corpus;

#[derive(Default)]
pub struct TestServerConfig {
    pub pipeline: Option<PipelineConfig>,
    pub llm: Option<Arc<dyn LlmService>>,
    /// Leave the corpus unloaded so readiness can be observed.
    pub skip_load: bool,
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub service: Arc<RagService>,
    pub data_dir: TempDir,
    pub index_dir: TempDir,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn spawn_test_server(config: TestServerConfig) -> anyhow::Result<TestServer> {
    let data_dir = TempDir::new()?;
    let index_dir = TempDir::new()?;
    write_corpus(data_dir.path());

    let mut builder = RagService::builder().index_dir(index_dir.path());
    if let Some(pipeline) = config.pipeline {
        builder = builder.config(pipeline);
    }
    if let Some(llm) = config.llm {
        builder = builder.llm(llm);
    }
    let service = Arc::new(builder.build()?);

    if !config.skip_load {
        service.load_corpus_dir(data_dir.path()).await?;
    }

    let app = create_router(GatewayState::new(Arc::clone(&service)));
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(TestServer {
        addr,
        service,
        data_dir,
        index_dir,
        handle,
    })
}
