// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

use docurift::{analyzer::Analyzer, api, config, persist, proxy};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "docurift", version, about = "Automatic API documentation generator")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long)]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let cfg = config::Config::load_from_path(&args.config).await?;

    let mut analyzer = Analyzer::new();
    analyzer.set_max_examples(cfg.analyzer.max_examples);
    analyzer.set_redacted_fields(&cfg.analyzer.redacted_fields);

    let storage_dir = PathBuf::from(&cfg.storage.path);
    persist::load_state(&analyzer, &storage_dir).await;

    let analyzer = Arc::new(analyzer);

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let persistor = tokio::spawn(persist::run_persistor(
        analyzer.clone(),
        storage_dir,
        Duration::from_secs(cfg.storage.frequency),
        shutdown_rx,
    ));

    let api_addr: SocketAddr = ([0, 0, 0, 0], cfg.analyzer.port).into();
    let api_analyzer = analyzer.clone();
    let proxy_port = cfg.proxy.port;
    tokio::spawn(async move {
        if let Err(e) = api::run_api_server(api_addr, api_analyzer, proxy_port).await {
            error!(%e, "documentation server error");
        }
    });

    let proxy_addr: SocketAddr = ([0, 0, 0, 0], cfg.proxy.port).into();
    info!(backend = %cfg.proxy.backend_url, "starting DocuRift");

    tokio::select! {
        res = proxy::run_proxy(proxy_addr, &cfg.proxy.backend_url, analyzer.clone()) => {
            if let Err(e) = res {
                error!(%e, "proxy server error");
            }
        }
        _ = signal::ctrl_c() => {
            info!("shutting down");
        }
    }

    let _ = shutdown_tx.send(true);
    let _ = persistor.await;

    Ok(())
}
