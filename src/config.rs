// ===============================
// src/config.rs
// ===============================
/*
=============================================================================
Project : copy_bot_rust — Hyperliquid position copier in Rust
Module  : config.rs
Version : 0.1.0
Author  : copy_bot_rust contributors
License : MIT (see LICENSE)

Summary : Polls a target wallet's perp positions, classifies every change
          (open/close/increase/decrease/flip), rescales it to our account,
          applies risk guards, prices an IOC limit and submits it (or logs
          it in dry-run). Exposes Prometheus metrics and a JSONL journal.

=============================================================================
*/
use std::{env, str::FromStr, time::Duration};

use clap::Parser;
use dotenvy::dotenv;
use rust_decimal::Decimal;
use thiserror::Error;

/// Override dari command line (di atas ENV / .env)
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "copy_bot_rust", about = "Mirror a Hyperliquid wallet's perp positions")]
pub struct Cli {
    /// Kirim order sungguhan (COPY_DRY_RUN=false)
    #[arg(long, conflicts_with = "dry_run")]
    pub live: bool,
    /// Paksa dry-run walau ENV bilang live
    #[arg(long)]
    pub dry_run: bool,
    /// Jangan sync posisi target saat startup, cukup seed snapshot
    #[arg(long)]
    pub no_sync: bool,
    /// File .env alternatif
    #[arg(long)]
    pub env_file: Option<String>,
}

/// Mode sizing. Closed enum: tambah mode = tambah varian + match exhaustive.
#[derive(Clone, Debug, PartialEq)]
pub enum ScalingMode {
    FixedRatio { ratio: Decimal },
    Proportional,
    FixedSize { size: Decimal },
    FixedNotional { usd: Decimal },
}

impl ScalingMode {
    pub fn parse(name: &str, ratio: Decimal, size: Decimal, notional_usd: Decimal) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "fixed_ratio" | "ratio" => Some(ScalingMode::FixedRatio { ratio }),
            "proportional" | "equity" => Some(ScalingMode::Proportional),
            "fixed_size" | "size" => Some(ScalingMode::FixedSize { size }),
            "fixed_notional" | "notional" => Some(ScalingMode::FixedNotional { usd: notional_usd }),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScalingMode::FixedRatio { .. } => "fixed_ratio",
            ScalingMode::Proportional => "proportional",
            ScalingMode::FixedSize { .. } => "fixed_size",
            ScalingMode::FixedNotional { .. } => "fixed_notional",
        }
    }
}

/// Venue tujuan order (dry-run tidak menyentuh venue sama sekali)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VenueMode {
    Paper,
    Relay,
}

impl VenueMode {
    pub fn from_env(key: &str, default_mode: VenueMode) -> VenueMode {
        match env::var(key).unwrap_or_default().to_ascii_lowercase().as_str() {
            "paper" | "mock" => VenueMode::Paper,
            "relay" => VenueMode::Relay,
            _ => default_mode,
        }
    }

    pub fn label(&self) -> &'static str {
        match self { VenueMode::Paper => "paper", VenueMode::Relay => "relay" }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RiskLimits {
    /// 0 = nonaktif
    pub max_trade_usd: Decimal,
    /// <= 0 = nonaktif
    pub max_position_usd: Decimal,
    pub min_trade_usd: Decimal,
    pub max_daily_trades: u32,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_trade_usd: Decimal::ZERO,
            max_position_usd: Decimal::from(5000),
            min_trade_usd: Decimal::from(11),
            max_daily_trades: 200,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Args {
    // akun
    pub target_address: String,
    pub own_address: Option<String>,

    // sizing
    pub scaling: ScalingMode,
    pub paper_equity_usd: Decimal,

    // eksekusi
    pub slippage_bps: Decimal,
    pub dry_run: bool,
    pub venue_mode: VenueMode,
    pub api_url: String,
    pub relay_url: Option<String>,
    pub relay_secret: Option<String>,

    // coin & jadwal
    pub coins: Vec<String>,
    pub poll_interval: Duration,
    pub sync_on_startup: bool,

    // files/metrics/log
    pub record_file: Option<String>,
    pub metrics_port: u16,
    pub log_level: String,
}

impl Args {
    pub fn copies_all_coins(&self) -> bool { self.coins.iter().any(|c| c == "*") }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("COPY_TARGET_ADDRESS is required")]
    MissingTarget,
    #[error("invalid address {0}: expected 0x + 40 hex chars")]
    BadAddress(String),
    #[error("unknown COPY_SCALING_MODE {0}")]
    UnknownScalingMode(String),
    #[error("HL_ACCOUNT_ADDRESS is required for live trading")]
    MissingOwnAddress,
    #[error("COPY_RELAY_URL and COPY_RELAY_SECRET are required for relay venue")]
    MissingRelay,
    #[error("invalid url {0}")]
    BadUrl(String),
    #[error("{0} must be positive")]
    NotPositive(&'static str),
    #[error("COPY_COINS is empty")]
    NoCoins,
    #[error("COPY_SLIPPAGE_BPS {0} must be below 10000")]
    SlippageTooLarge(Decimal),
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|s| s.trim().parse().ok()).unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

fn parse_coins(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for c in raw.split(',').map(|x| x.trim()).filter(|x| !x.is_empty()) {
        let c = if c == "*" { c.to_string() } else { c.to_ascii_uppercase() };
        if !out.contains(&c) {
            out.push(c);
        }
    }
    out
}

pub fn load(cli: &Cli) -> Result<(Args, RiskLimits), ConfigError> {
    // .env dulu (kalau ada), ENV proses tetap menang
    match &cli.env_file {
        Some(path) => { let _ = dotenvy::from_filename(path); }
        None => { let _ = dotenv(); }
    }

    // ===== Akun =====
    let target_address = env::var("COPY_TARGET_ADDRESS").unwrap_or_default().trim().to_string();
    let own_address = env::var("HL_ACCOUNT_ADDRESS")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    // ===== Sizing =====
    let mode_name = env::var("COPY_SCALING_MODE").unwrap_or_else(|_| "fixed_ratio".to_string());
    let scaling = ScalingMode::parse(
        &mode_name,
        env_parse("COPY_FIXED_RATIO", Decimal::ONE),
        env_parse("COPY_FIXED_SIZE", Decimal::new(1, 3)),
        env_parse("COPY_FIXED_NOTIONAL_USD", Decimal::from(100)),
    )
    .ok_or_else(|| ConfigError::UnknownScalingMode(mode_name.clone()))?;

    // ===== Eksekusi =====
    let mut dry_run = env_bool("COPY_DRY_RUN", true);
    if cli.live { dry_run = false; }
    if cli.dry_run { dry_run = true; }

    let poll_secs: f64 = env_parse("COPY_POLL_INTERVAL", 3.0);
    if !(poll_secs.is_finite() && poll_secs > 0.0) {
        return Err(ConfigError::NotPositive("COPY_POLL_INTERVAL"));
    }

    let args = Args {
        target_address,
        own_address,
        scaling,
        paper_equity_usd: env_parse("COPY_PAPER_EQUITY_USD", Decimal::from(10_000)),
        slippage_bps: env_parse("COPY_SLIPPAGE_BPS", Decimal::from(10)),
        dry_run,
        venue_mode: VenueMode::from_env("COPY_VENUE_MODE", VenueMode::Paper),
        api_url: env::var("HL_API_URL").unwrap_or_else(|_| "https://api.hyperliquid.xyz".to_string()),
        relay_url: env::var("COPY_RELAY_URL").ok().filter(|s| !s.is_empty()),
        relay_secret: env::var("COPY_RELAY_SECRET").ok().filter(|s| !s.is_empty()),
        coins: parse_coins(&env::var("COPY_COINS").unwrap_or_else(|_| "BTC".to_string())),
        poll_interval: Duration::from_secs_f64(poll_secs),
        sync_on_startup: env_bool("COPY_SYNC_STARTUP", true) && !cli.no_sync,
        record_file: env::var("RECORD_FILE").ok().filter(|s| !s.is_empty()),
        metrics_port: env_parse("METRICS_PORT", 9898),
        log_level: env::var("COPY_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
    };

    // ===== Limits =====
    let d = RiskLimits::default();
    let limits = RiskLimits {
        max_trade_usd: env_parse("COPY_MAX_TRADE_USD", d.max_trade_usd),
        max_position_usd: env_parse("COPY_MAX_POSITION_USD", d.max_position_usd),
        min_trade_usd: env_parse("COPY_MIN_TRADE_USD", d.min_trade_usd),
        max_daily_trades: env_parse("COPY_MAX_DAILY_TRADES", d.max_daily_trades),
    };

    validate(&args, &limits)?;
    Ok((args, limits))
}

fn is_address(s: &str) -> bool {
    s.len() == 42 && s.starts_with("0x") && s[2..].chars().all(|c| c.is_ascii_hexdigit())
}

pub fn validate(args: &Args, limits: &RiskLimits) -> Result<(), ConfigError> {
    if args.target_address.is_empty() {
        return Err(ConfigError::MissingTarget);
    }
    if !is_address(&args.target_address) {
        return Err(ConfigError::BadAddress(args.target_address.clone()));
    }
    match &args.own_address {
        Some(a) if !is_address(a) => return Err(ConfigError::BadAddress(a.clone())),
        None if !args.dry_run => return Err(ConfigError::MissingOwnAddress),
        _ => {}
    }
    if args.coins.is_empty() {
        return Err(ConfigError::NoCoins);
    }
    url::Url::parse(&args.api_url).map_err(|_| ConfigError::BadUrl(args.api_url.clone()))?;
    if args.venue_mode == VenueMode::Relay && !args.dry_run {
        match (&args.relay_url, &args.relay_secret) {
            (Some(u), Some(_)) => {
                url::Url::parse(u).map_err(|_| ConfigError::BadUrl(u.clone()))?;
            }
            _ => return Err(ConfigError::MissingRelay),
        }
    }
    match &args.scaling {
        ScalingMode::FixedRatio { ratio } if *ratio <= Decimal::ZERO => {
            return Err(ConfigError::NotPositive("COPY_FIXED_RATIO"))
        }
        ScalingMode::FixedSize { size } if *size <= Decimal::ZERO => {
            return Err(ConfigError::NotPositive("COPY_FIXED_SIZE"))
        }
        ScalingMode::FixedNotional { usd } if *usd <= Decimal::ZERO => {
            return Err(ConfigError::NotPositive("COPY_FIXED_NOTIONAL_USD"))
        }
        _ => {}
    }
    if args.slippage_bps < Decimal::ZERO {
        return Err(ConfigError::NotPositive("COPY_SLIPPAGE_BPS"));
    }
    // >= 100% bikin harga SELL jadi <= 0
    if args.slippage_bps >= Decimal::from(10_000) {
        return Err(ConfigError::SlippageTooLarge(args.slippage_bps));
    }
    if limits.min_trade_usd < Decimal::ZERO || limits.max_trade_usd < Decimal::ZERO {
        return Err(ConfigError::NotPositive("COPY_MIN_TRADE_USD / COPY_MAX_TRADE_USD"));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn test_args() -> Args {
    Args {
        target_address: "0xe339f3a21ac5cb468f0949a1da2ceb029eb036cf".to_string(),
        own_address: None,
        scaling: ScalingMode::FixedRatio { ratio: Decimal::new(1, 1) },
        paper_equity_usd: Decimal::from(10_000),
        slippage_bps: Decimal::from(10),
        dry_run: true,
        venue_mode: VenueMode::Paper,
        api_url: "https://api.hyperliquid.xyz".to_string(),
        relay_url: None,
        relay_secret: None,
        coins: vec!["BTC".to_string()],
        poll_interval: Duration::from_secs(3),
        sync_on_startup: true,
        record_file: None,
        metrics_port: 9898,
        log_level: "info".to_string(),
    }
}
