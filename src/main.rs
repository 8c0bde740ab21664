// ===============================
// src/main.rs
// ===============================
/*
 # dry-run (default), target dari .env
 COPY_TARGET_ADDRESS=0x... cargo run --release

 # cek konfigurasi & aktivitas
curl -s localhost:9898/metrics | egrep '^config_(scaling_mode|dry_run|coin)'
curl -s localhost:9898/metrics | grep '^change_events_total'
curl -s localhost:9898/metrics | grep '^guard_decisions_total'

*/
/*
=============================================================================
Project : copy_bot_rust — Hyperliquid position copier in Rust
Module  : main.rs
Version : 0.1.0
Author  : copy_bot_rust contributors
License : MIT (see LICENSE)

Summary : Polls a target wallet's perp positions, classifies every change
          (open/close/increase/decrease/flip), rescales it to our account,
          applies risk guards, prices an IOC limit and submits it (or logs
          it in dry-run). Exposes Prometheus metrics and a JSONL journal.

=============================================================================
*/
mod domain;
mod config;
mod metrics;
mod recorder;
mod snapshot;
mod differ;
mod scaler;
mod risk;
mod pricer;
mod info;             // Hyperliquid info API (read-only)
mod gateway;          // trait + paper venue
mod gateway_relay;    // live venue lewat order relay (HMAC)
mod executor;
mod positions;
mod posttrade;
mod pipeline;

use clap::Parser;
use futures_util::StreamExt;
use tokio::{select, sync::mpsc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::VenueMode;
use crate::domain::TickReport;
use crate::gateway::{OrderGateway, PaperGateway};
use crate::info::InfoClient;

fn build_gateway(args: &config::Args) -> Result<Box<dyn OrderGateway>, String> {
    if args.dry_run {
        // tidak pernah dipanggil di dry-run, tapi Executor butuh venue
        return Ok(Box::new(PaperGateway));
    }
    match args.venue_mode {
        VenueMode::Paper => Ok(Box::new(PaperGateway)),
        VenueMode::Relay => {
            let (Some(url), Some(secret)) = (&args.relay_url, &args.relay_secret) else {
                return Err("COPY_RELAY_URL / COPY_RELAY_SECRET not set".to_string());
            };
            let gw = gateway_relay::RelayGateway::new(url, secret).map_err(|e| e.to_string())?;
            Ok(Box::new(gw))
        }
    }
}

fn forward(rec_tx: &Option<mpsc::Sender<TickReport>>, report: &TickReport) {
    posttrade::report(report);
    if let Some(tx) = rec_tx {
        if tx.try_send(report.clone()).is_err() {
            warn!("recorder: channel full, report dropped");
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = config::Cli::parse();

    // ---- Config dulu (level log ikut config), RUST_LOG tetap menang ----
    let loaded = config::load(&cli);
    let level = loaded.as_ref().map(|(a, _)| a.log_level.clone()).unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let (args, limits) = match loaded {
        Ok(v) => v,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            std::process::exit(2);
        }
    };

    // ---- Metrics ----
    metrics::init();
    metrics::serve_metrics(args.metrics_port);
    metrics::CONFIG_SCALING_MODE.with_label_values(&[args.scaling.label()]).set(1);
    metrics::CONFIG_DRY_RUN.set(args.dry_run as i64);
    for c in &args.coins {
        metrics::CONFIG_COIN.with_label_values(&[c.as_str()]).set(1);
    }

    info!(
        target_addr = %args.target_address,
        own = ?args.own_address,
        scaling = ?args.scaling,
        dry_run = args.dry_run,
        venue = args.venue_mode.label(),
        coins = ?args.coins,
        poll = ?args.poll_interval,
        slippage_bps = %args.slippage_bps,
        sync_on_startup = args.sync_on_startup,
        max_trade_usd = %limits.max_trade_usd,
        max_position_usd = %limits.max_position_usd,
        min_trade_usd = %limits.min_trade_usd,
        max_daily_trades = limits.max_daily_trades,
        "startup config"
    );
    if !args.dry_run {
        warn!(venue = args.venue_mode.label(), "LIVE MODE: orders will be sent");
    }

    // ---- Info API + aturan presisi ----
    let info_client = match InfoClient::new(&args.api_url) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "cannot build info client");
            std::process::exit(1);
        }
    };
    let rules = match info_client.fetch_asset_rules().await {
        Ok(r) => {
            info!(assets = r.len(), "asset rules loaded");
            r
        }
        Err(e) => {
            warn!(error = %e, "meta fetch failed, default precision rules");
            Default::default()
        }
    };

    // ---- Venue ----
    let gateway = match build_gateway(&args) {
        Ok(g) => g,
        Err(e) => {
            error!(error = %e, "cannot build order gateway");
            std::process::exit(2);
        }
    };

    // ---- Recorder (optional) ----
    let (rec_tx, rec_handle) = match args.record_file.clone() {
        Some(path) => {
            let (tx, rx) = mpsc::channel::<TickReport>(1024);
            (Some(tx), Some(tokio::spawn(recorder::run(rx, path))))
        }
        None => (None, None),
    };

    // ---- Copier ----
    let mut copier = pipeline::Copier::new(
        args.clone(),
        limits,
        Box::new(info_client),
        executor::Executor::new(gateway),
        rules,
    );

    let startup = copier.startup_sync().await;
    forward(&rec_tx, &startup);

    let ticks = copier.tick_stream(args.poll_interval);
    tokio::pin!(ticks);

    let mut tick_count: u64 = 0;
    let mut skipped: u64 = 0;
    let mut submitted: usize = startup.submitted();

    loop {
        select! {
            maybe = ticks.next() => {
                let Some(report) = maybe else { break };
                tick_count += 1;
                if matches!(report.outcome, domain::TickOutcome::Skipped { .. }) {
                    skipped += 1;
                }
                submitted += report.submitted();
                forward(&rec_tx, &report);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("ctrl-c received, shutting down");
                break;
            }
        }
    }

    // tutup channel -> recorder flush & selesai
    drop(rec_tx);
    if let Some(h) = rec_handle {
        let _ = h.await;
    }
    info!(ticks = tick_count, skipped, submitted, "stopped");
}
