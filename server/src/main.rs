//! `finrag` command-line entry point.
//!
//! ```bash
//! # Serve the chat API (reads OPENAI_API_KEY from the environment or .env)
//! finrag serve --model-dir ./models/all-MiniLM-L6-v2
//!
//! # Index only the curated facts
//! finrag serve --offline
//!
//! # Score a running service and write chatbot_eval_results.csv
//! finrag evaluate
//!
//! # Chat from the terminal
//! finrag chat
//! ```

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use finrag_openai::OpenAI;
use finrag_ort::OrtEmbedding;
use finrag_rag::{AnswerGenerator, CorpusBuilder, Retriever};
use finrag_server::config::ServeArgs;
use finrag_server::{ChatService, Cli, Command, chat, eval, router};
use finrag_sources::{curated_facts, edmonton_sources};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Serve(args) => serve(args).await,
        Command::Evaluate(args) => eval::run(args).await,
        Command::Chat(args) => chat::run(args).await,
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let started = Instant::now();
    let api_key = args.api_key()?.to_owned();

    let embedder = OrtEmbedding::from_directory(&args.model_dir)
        .with_context(|| format!("loading embedder from {}", args.model_dir.display()))?;
    tracing::info!(
        model_dir = %args.model_dir.display(),
        dimension = embedder.dimension(),
        "Embedder loaded"
    );

    let mut corpus = CorpusBuilder::new(curated_facts().iter().copied());
    if args.offline {
        tracing::info!("Offline mode, skipping open-data sources");
    } else {
        let open_data = args.open_data_config();
        corpus = corpus
            .sources(edmonton_sources(&open_data))
            .fetch_timeout(open_data.timeout);
    }
    let (corpus, reports) = corpus.build_with_report().await;
    tracing::info!(
        passages = corpus.len(),
        sources_included = reports.iter().filter(|r| r.is_included()).count(),
        sources_failed = reports.iter().filter(|r| !r.is_included()).count(),
        "Corpus assembled"
    );

    let retriever = Retriever::build(embedder, corpus)
        .await
        .context("building knowledge index")?;

    let model = OpenAI::builder(api_key)
        .base_url(&args.openai_base_url)
        .model(&args.chat_model)
        .timeout(args.completion_timeout())
        .max_retries(args.completion_retries)
        .build();
    let config = args.rag_config();
    let generator = AnswerGenerator::with_config(model, &config);
    let service = Arc::new(ChatService::new(
        retriever,
        generator,
        config.default_top_k,
    ));

    let listener = TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("binding {}", args.bind))?;
    tracing::info!(
        addr = %args.bind,
        passages = service.passages(),
        elapsed_ms = started.elapsed().as_millis(),
        "Serving chat API"
    );

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %error, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
