use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use log::info;

use iris_serve::{create_router, AppState, IrisModel, RuntimeConfig};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the packaged model artifact
    #[arg(long, default_value = "modelfiles/iris_gbm.onnx")]
    model_path: String,

    /// Address to bind the HTTP listener on
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind the HTTP listener on
    #[arg(long, default_value_t = 8000)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    info!("=== Starting iris inference endpoint ===");

    // Runtime init and artifact load are expensive and happen exactly once,
    // before the listener opens. Every request reuses the same handle.
    iris_serve::runtime::ensure_initialized()?;

    let start_time = Instant::now();
    let model = IrisModel::load(&args.model_path, &RuntimeConfig::default())?;
    info!(
        "Model {} loaded in {:.2?}",
        model.model_path(),
        start_time.elapsed()
    );

    let state = AppState::new(Arc::new(model));
    let app = create_router(state);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
