use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use hemavision_core::{
    Backend, ChartRenderer, Mode, ModelSlot, Pipeline, Preprocessor, Simulator, Typeface,
};
use hemavision_server::{app, config::Config, upload::UploadStore, AppState};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(err) = dotenv::dotenv() {
        eprintln!("no .env loaded: {err}");
    }
    if let Err(err) = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init()
    {
        tracing::warn!("Logger already initialized: {err}");
    };

    let config = Config::parse();
    tracing::debug!(?config, "loaded configuration");

    let preprocessor = Preprocessor::default();
    let backend = match config.mode {
        Mode::Model => {
            let slot = ModelSlot::new(&config.model_path, preprocessor.feature_len());
            if let Err(err) = slot.warm() {
                tracing::warn!(%err, "starting without a model, predictions will fail");
            }
            Backend::Model(Arc::new(slot))
        }
        Mode::Demo => {
            tracing::warn!("demo mode: predictions are simulated and have no diagnostic value");
            Backend::Demo(Simulator)
        }
    };
    let pipeline = Pipeline::builder()
        .backend(backend)
        .preprocessor(preprocessor)
        .chart(
            ChartRenderer::builder()
                .typeface(Typeface::discover(config.chart_font.as_deref()))
                .build(),
        )
        .build();
    let uploads = UploadStore::builder()
        .dir(&config.upload_folder)
        .maybe_retention(config.retention())
        .build();
    std::fs::create_dir_all(uploads.dir())
        .with_context(|| format!("failed to create upload folder {}", uploads.dir().display()))?;

    let app = app(AppState { pipeline, uploads }, config.max_file_size);
    let listener = TcpListener::bind(config.addr())
        .await
        .with_context(|| format!("failed to bind {}", config.addr()))?;
    tracing::info!(mode = %config.mode, "Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
