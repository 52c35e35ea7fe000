pub mod handler;

use crate::repositories::BookRepository;
use anyhow::Context;
use axum::Router;
use axum::routing::get;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

#[derive(Debug)]
pub struct AppState<BR: BookRepository> {
    pub book_repo: Arc<BR>,
}

impl<BR: BookRepository> AppState<BR> {
    pub fn new(book_repo: BR) -> Self {
        Self {
            book_repo: Arc::new(book_repo),
        }
    }
}

impl<BR: BookRepository> Clone for AppState<BR> {
    fn clone(&self) -> Self {
        Self {
            book_repo: Arc::clone(&self.book_repo),
        }
    }
}

#[derive(Debug)]
pub struct HttpServerConfig {
    port: u16,
}

impl HttpServerConfig {
    pub const fn new(port: u16) -> Self {
        Self { port }
    }
}

pub struct HttpServer {
    router: Router,
    listener: TcpListener,
}

impl HttpServer {
    pub async fn new<BR: BookRepository>(
        state: AppState<BR>,
        config: HttpServerConfig,
    ) -> anyhow::Result<Self> {
        let router = router(state);

        let listener = TcpListener::bind(format!("0.0.0.0:{}", config.port))
            .await
            .with_context(|| format!("Failed to bind to port {}", config.port))?;

        Ok(Self { router, listener })
    }

    /// Serves requests until Ctrl-C or SIGTERM, then lets in-flight requests finish.
    pub async fn run(self) -> anyhow::Result<()> {
        let addr = self
            .listener
            .local_addr()
            .context("Failed to read listener address")?;
        tracing::info!(%addr, "listening");

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("Received error from running server")?;
        Ok(())
    }
}

/// Builds the full application router with request tracing attached.
pub fn router<BR: BookRepository>(state: AppState<BR>) -> Router {
    Router::new()
        .merge(book_routes())
        .method_not_allowed_fallback(handler::method_not_allowed)
        .fallback(handler::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn book_routes<BR: BookRepository>() -> Router<AppState<BR>> {
    Router::new()
        .route(
            "/books",
            get(handler::list_books::<BR>).post(handler::create_book::<BR>),
        )
        .route(
            "/books/{isbn}",
            get(handler::find_book::<BR>)
                .put(handler::update_book::<BR>)
                .delete(handler::delete_book::<BR>),
        )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl-C, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
