#![allow(clippy::result_large_err)]

use dotenvy::dotenv;
use indicore::{
    api::{self, AppState},
    config::{database, settings},
    core::{
        registry::KpiRegistry,
        storage::DocumentBucket,
        summary::{ChatCompletionSummarizer, Summarizer},
    },
    errors::Result,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Load the application configuration (file plus env overrides)
    let config = settings::load_app_configuration()?;

    // 4. Connect to the database and make sure the schema exists
    let database_url = database::get_database_url(config.database.url.as_deref());
    let db = database::create_connection(&database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Collaborators. OPENAI_API_KEY is read here, directly before use
    let registry = KpiRegistry::standard();
    info!(
        indicators = registry.definitions().len(),
        areas = registry.areas().len(),
        "KPI catalog loaded"
    );
    let summarizer = ChatCompletionSummarizer::from_env(&config.summarizer)?
        .map(|s| Arc::new(s) as Arc<dyn Summarizer>);
    let bucket = DocumentBucket::new(config.storage.documents_dir.clone());
    let state = AppState::new(db, registry, bucket, summarizer);

    // 6. Serve
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .inspect_err(|e| error!("Failed to bind {}: {}", addr, e))?;
    info!(%addr, "Indicore listening");

    axum::serve(listener, api::router(state, &config.server)).await?;
    Ok(())
}
