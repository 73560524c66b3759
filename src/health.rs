//! Minimal HTTP liveness endpoint.

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, info};

/// Answer every request with a 200 so the platform keeps the process alive.
pub async fn serve(port: u16) -> Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .context("health bind")?;
    info!("Health endpoint listening on http://0.0.0.0:{}", port);

    loop {
        let (mut stream, peer) = listener.accept().await.context("health accept")?;
        tokio::spawn(async move {
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await;
            let body = "Bot is running";
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            if let Err(e) = stream.write_all(response.as_bytes()).await {
                debug!("health write failed for {}: {}", peer, e);
            }
        });
    }
}
