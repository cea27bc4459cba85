use std::error::Error;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use snake_relay::api::router::create_router;
use snake_relay::api::state::AppState;
use snake_relay::config::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::from_env();

    // `--health-check` exits non-zero unless the local server answers 200.
    if std::env::args().any(|a| a == "--health-check") {
        return check_health(config.port).await;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "snake_relay=info,tower_http=info".into()),
        )
        .init();

    let bind_addr = config.bind_addr();
    let app = create_router(AppState::new(config));
    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, version = env!("CARGO_PKG_VERSION"), "relay listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

async fn check_health(port: u16) -> Result<(), Box<dyn Error>> {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).await?;
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: 127.0.0.1\r\nConnection: close\r\n\r\n")
        .await?;
    let mut head = [0u8; 32];
    let n = stream.read(&mut head).await?;
    let status_line = String::from_utf8_lossy(&head[..n]);
    match status_line.split_whitespace().nth(1) {
        Some("200") => Ok(()),
        other => Err(format!("/health answered {}", other.unwrap_or("nothing")).into()),
    }
}
