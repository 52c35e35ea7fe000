use books_api::config::{Config, load_dotenv};
use books_api::database::{SqliteBookRepository, establish_pool};
use books_api::http::{AppState, HttpServer, HttpServerConfig};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "books_api=info,tower_http=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let config = Config::from_env()?;

    let pool = establish_pool(config.database_url()).await?;
    tracing::info!(database_url = config.database_url(), "database ready");

    let state = AppState::new(SqliteBookRepository::new(pool.clone()));
    let server_config = HttpServerConfig::new(config.server_port());
    let http_server = HttpServer::new(state, server_config).await?;
    let result = http_server.run().await;

    pool.close().await;
    tracing::info!("database closed");
    result
}
