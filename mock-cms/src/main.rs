use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,mock_cms=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let db_path = std::env::var("CMS_DB_PATH").unwrap_or_else(|_| "cms.db".to_string());
    let addr = format!("127.0.0.1:{port}");

    let db = mock_cms::open_db(&db_path)?;
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, db = %db_path, "mock CMS listening");
    mock_cms::run(listener, db).await?;
    Ok(())
}
