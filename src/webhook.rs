use std::net::SocketAddr;

use axum::{Router, routing::post};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Stateless webhook acknowledgment stub: the messaging platform only needs a
/// 200 on delivery. `POST /webhook` answers `OK`; any other method on the
/// route gets a 405 from the router.
pub fn router() -> Router {
    Router::new()
        .route("/webhook", post(ack))
        .layer(TraceLayer::new_for_http())
}

async fn ack() -> &'static str {
    "OK"
}

pub async fn serve(bind: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind).await?;
    info!("webhook responder listening on {bind}");
    axum::serve(listener, router()).await?;
    Ok(())
}
