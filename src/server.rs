//! HTTP control surface over a running scan.

use std::io;
use std::net::SocketAddr;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use dupscan_core::{ScanMetrics, ScanStatus};
use dupscan_scan::{CancelOutcome, ScanControl};

/// Routes: `GET /status`, `GET /metrics`, `POST /cancel`.
pub fn router(control: ScanControl) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/metrics", get(metrics))
        .route("/cancel", post(cancel))
        .with_state(control)
}

/// Bind `addr` and serve until `shutdown` fires.
pub async fn spawn(
    addr: SocketAddr,
    control: ScanControl,
    shutdown: CancellationToken,
) -> io::Result<(SocketAddr, JoinHandle<io::Result<()>>)> {
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    info!("control server listening on http://{local_addr}");

    let app = router(control);
    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await
    });

    Ok((local_addr, handle))
}

async fn status(State(control): State<ScanControl>) -> Json<ScanStatus> {
    Json(control.status())
}

async fn metrics(State(control): State<ScanControl>) -> Json<ScanMetrics> {
    Json(control.metrics())
}

async fn cancel(State(control): State<ScanControl>) -> &'static str {
    match control.cancel() {
        CancelOutcome::Initiated => {
            info!("cancellation requested over HTTP");
            "Scan cancellation initiated\n"
        }
        CancelOutcome::AlreadyStopped => "Scan already stopped\n",
    }
}
