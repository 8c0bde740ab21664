// ===============================
// src/metrics.rs
// ===============================
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, Gauge, GaugeVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;

// Single custom registry (we register everything here)
pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

// -------- Poll loop --------
pub static TICKS: Lazy<IntCounter> =
    Lazy::new(|| IntCounter::new("ticks_total", "poll ticks completed").unwrap());

pub static TICKS_SKIPPED: Lazy<IntCounter> =
    Lazy::new(|| IntCounter::new("ticks_skipped_total", "poll ticks skipped (fetch failed)").unwrap());

pub static POLL_ERRORS_CONSECUTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("poll_errors_consecutive", "consecutive target poll failures").unwrap()
});

// -------- Pipeline --------
pub static EVENTS_BY: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("change_events_total", "target position changes (labels: kind, coin)"),
        &["kind", "coin"],
    )
    .unwrap()
});

pub static DECISIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(Opts::new("guard_decisions_total", "risk guard decisions"), &["decision"]).unwrap()
});

pub static EXECS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("execution_results_total", "execution results"),
        &["result", "coin"],
    )
    .unwrap()
});

pub static DAILY_TRADES: Lazy<IntGauge> =
    Lazy::new(|| IntGauge::new("daily_trades", "trades attempted today (kill switch counter)").unwrap());

// -------- Akun --------
pub static TARGET_EQUITY: Lazy<Gauge> =
    Lazy::new(|| Gauge::new("target_equity_usd", "target account value (USD)").unwrap());

pub static OWN_EQUITY: Lazy<Gauge> =
    Lazy::new(|| Gauge::new("own_equity_usd", "own account value (USD)").unwrap());

pub static OWN_POSITION: Lazy<GaugeVec> = Lazy::new(|| {
    GaugeVec::new(Opts::new("own_position_size", "own signed position per coin"), &["coin"]).unwrap()
});

// ---- Config visibility ----
pub static CONFIG_SCALING_MODE: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("config_scaling_mode", "scaling mode (label: mode)"),
        &["mode"],
    )
    .unwrap()
});

pub static CONFIG_DRY_RUN: Lazy<IntGauge> =
    Lazy::new(|| IntGauge::new("config_dry_run", "1 if dry-run (no orders sent)").unwrap());

pub static CONFIG_COIN: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(Opts::new("config_coin", "configured coins (label: coin)"), &["coin"]).unwrap()
});

pub fn init() {
    // Register all metrics to the custom registry
    for m in [
        REGISTRY.register(Box::new(TICKS.clone())),
        REGISTRY.register(Box::new(TICKS_SKIPPED.clone())),
        REGISTRY.register(Box::new(POLL_ERRORS_CONSECUTIVE.clone())),
        REGISTRY.register(Box::new(EVENTS_BY.clone())),
        REGISTRY.register(Box::new(DECISIONS.clone())),
        REGISTRY.register(Box::new(EXECS.clone())),
        REGISTRY.register(Box::new(DAILY_TRADES.clone())),
        REGISTRY.register(Box::new(TARGET_EQUITY.clone())),
        REGISTRY.register(Box::new(OWN_EQUITY.clone())),
        REGISTRY.register(Box::new(OWN_POSITION.clone())),
        // Config visibility
        REGISTRY.register(Box::new(CONFIG_SCALING_MODE.clone())),
        REGISTRY.register(Box::new(CONFIG_DRY_RUN.clone())),
        REGISTRY.register(Box::new(CONFIG_COIN.clone())),
    ] {
        let _ = m;
    }
}

// Encode all metrics in Prometheus text format
fn encode_metrics() -> Vec<u8> {
    let encoder = TextEncoder::new();
    let families = REGISTRY.gather();
    let mut buf = Vec::new();
    if encoder.encode(&families, &mut buf).is_err() || buf.is_empty() {
        buf.extend_from_slice(b"# no metrics\n");
    }
    buf
}

// Serve one HTTP request (GET / or /metrics) — tiny HTTP 1.1 responder
fn handle_client(mut stream: TcpStream) {
    // Read a bit to consume headers (no full parse)
    let mut _req_buf = [0u8; 1024];
    let _ = stream.read(&mut _req_buf);

    let body = encode_metrics();
    let header = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain; version=0.0.4; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );

    let _ = stream.write_all(header.as_bytes());
    let _ = stream.write_all(&body);
    let _ = stream.flush();
}

// Metrics server di OS thread sendiri (runtime tokio tetap bersih)
pub fn serve_metrics(port: u16) {
    thread::spawn(move || {
        let addr = format!("0.0.0.0:{port}");
        let listener = match TcpListener::bind(&addr) {
            Ok(l) => l,
            Err(e) => {
                tracing::error!(%addr, ?e, "metrics bind failed, metrics disabled");
                return;
            }
        };
        tracing::info!("metrics listening on http://{addr}/ (and /metrics)");

        for conn in listener.incoming() {
            match conn {
                Ok(stream) => handle_client(stream),
                Err(e) => tracing::warn!(?e, "metrics accept error"),
            }
        }
    });
}
