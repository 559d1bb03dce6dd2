// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Shared helpers for integration tests.

use docurift::analyzer::Analyzer;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Reserve a free local port by binding and immediately dropping it.
pub fn free_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    listener.local_addr().expect("local addr")
}

/// Poll until something accepts connections on `addr`.
pub async fn wait_until_accepting(addr: SocketAddr) -> anyhow::Result<()> {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if Instant::now() > deadline {
            anyhow::bail!("timeout waiting for server on {addr}");
        }
        if tokio::net::TcpStream::connect(addr).await.is_ok() {
            return Ok(());
        }
        sleep(Duration::from_millis(50)).await;
    }
}

/// Spawn the proxy against `backend_url` on a free port and wait for it.
pub async fn spawn_proxy(
    backend_url: String,
    analyzer: Arc<Analyzer>,
) -> anyhow::Result<SocketAddr> {
    let addr = free_addr();
    tokio::spawn(async move {
        let _ = docurift::proxy::run_proxy(addr, &backend_url, analyzer).await;
    });
    wait_until_accepting(addr).await?;
    Ok(addr)
}
