use std::sync::Arc;

use anyhow::Result;
use rmcp::{
    ServiceExt,
    transport::streamable_http_server::{StreamableHttpService, session::local::LocalSessionManager},
};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use image_gen_rmcp::{
    config::{AppConfig, Transport},
    mcp_server::ImageGenServer,
    openai::{ImageBackend, OpenAiImageBackend},
    tools::ImageToolDispatcher,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // stdout carries the stdio transport, so logs go to stderr
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let config = AppConfig::from_env();
    if config.openai.api_key.is_none() {
        warn!("OPENAI_API_KEY is not set, every generation will fail until it is provided");
    }

    let backend: Arc<dyn ImageBackend> = Arc::new(OpenAiImageBackend::new(config.openai.clone()));
    let dispatcher = ImageToolDispatcher::new(backend, config.profile.clone());
    info!(
        model = config.profile.model.id(),
        locale = ?config.profile.locale,
        transport = ?config.transport,
        "starting image-gen-rmcp"
    );

    match config.transport {
        Transport::Stdio => serve_stdio(dispatcher).await,
        Transport::Http => serve_http(&config, dispatcher).await,
    }
}

async fn serve_stdio(dispatcher: ImageToolDispatcher) -> Result<()> {
    let service = ImageGenServer::new(dispatcher)
        .serve(rmcp::transport::stdio())
        .await?;
    service.waiting().await?;
    Ok(())
}

async fn serve_http(config: &AppConfig, dispatcher: ImageToolDispatcher) -> Result<()> {
    let bind_address = config.bind_address();
    let mcp_path = config.mcp_path();

    let service = StreamableHttpService::new(
        move || Ok(ImageGenServer::new(dispatcher.clone())),
        LocalSessionManager::default().into(),
        Default::default(),
    );
    let router = axum::Router::new().nest_service(&mcp_path, service);
    let tcp_listener = tokio::net::TcpListener::bind(&bind_address).await?;

    info!("image-gen MCP HTTP server listening at http://{bind_address}{mcp_path}");

    axum::serve(tcp_listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
