//! Onsen HTTP server entrypoint.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tokio::signal;

use onsen::config::Config;
use onsen::embedding::{BertEmbedder, Reranker};
use onsen::gateway::{GatewayState, create_router};
use onsen::llm::{GenaiProvider, LlmService, ProviderChain};
use onsen::pipeline::{EvalSet, RagService};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::args().any(|arg| arg == "--health-check") {
        std::process::exit(run_health_check());
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    config.validate()?;
    let addr: SocketAddr = config.socket_addr().parse()?;

    tracing::info!(
        bind_addr = %config.bind_addr,
        port = config.port,
        data_dir = %config.data_dir.display(),
        "Onsen starting"
    );

    let service = Arc::new(build_service(&config)?);

    if let Some(path) = evaluate_arg() {
        return run_evaluation(&service, &config, &path).await;
    }

    let loader = Arc::clone(&service);
    let data_dir = config.data_dir.clone();
    tokio::spawn(async move {
        match loader.load_corpus_dir(&data_dir).await {
            Ok(summary) => tracing::info!(
                passages = summary.passages,
                partitions = ?summary.partitions,
                "Corpus loaded"
            ),
            Err(e) => tracing::warn!(error = %e, "Corpus load failed, queries will be rejected"),
        }
    });

    let app = create_router(GatewayState::new(service));

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Onsen shutdown complete");
    Ok(())
}

fn build_service(config: &Config) -> anyhow::Result<RagService> {
    let embedder = BertEmbedder::load(config.embedder_config())?;
    let reranker = Reranker::load(config.reranker_config())?;

    let mut builder = RagService::builder()
        .config(config.pipeline_config())
        .embedder(Arc::new(embedder))
        .relevance_model(Arc::new(reranker))
        .keywords(config.partition_keywords.clone())
        .index_dir(config.index_dir.clone())
        .vector_backend(config.vector_backend());

    if config.extraction_enabled() {
        let providers: Vec<Arc<dyn LlmService>> = config
            .llm_models
            .iter()
            .map(|model| Arc::new(GenaiProvider::new(model.clone())) as Arc<dyn LlmService>)
            .collect();
        tracing::info!(models = ?config.llm_models, "LLM extraction enabled");
        builder = builder.llm(Arc::new(ProviderChain::new(
            providers,
            config.retry_policy(),
        )));
    }

    Ok(builder.build()?)
}

fn evaluate_arg() -> Option<PathBuf> {
    let mut args = std::env::args().skip_while(|arg| arg != "--evaluate");
    args.next()?;
    args.next().map(PathBuf::from)
}

async fn run_evaluation(
    service: &RagService,
    config: &Config,
    path: &std::path::Path,
) -> anyhow::Result<()> {
    let set = EvalSet::from_path(path)?;
    service.load_corpus_dir(&config.data_dir).await?;

    let report = service.evaluate(&set).await?;
    tracing::info!(
        total = report.total(),
        ok = report.ok,
        warn = report.warn,
        bad = report.bad,
        "Evaluation finished"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_health_check() -> i32 {
    let port = std::env::var("ONSEN_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8000);

    let url = format!("http://127.0.0.1:{}/healthz", port);

    let Ok(rt) = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    else {
        return 1;
    };

    rt.block_on(async {
        let Ok(client) = reqwest::Client::builder()
            .timeout(Duration::from_secs(1))
            .build()
        else {
            return 1;
        };

        match client.get(&url).send().await {
            Ok(res) if res.status().is_success() => 0,
            _ => 1,
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
