// ===============================
// src/info.rs
// ===============================
//
// Adapter ke Hyperliquid public info API (read-only, tanpa auth):
// - clearinghouseState : equity + posisi perp sebuah address
// - l2Book             : best bid/ask satu coin
// - meta               : szDecimals per coin (aturan presisi)
//
// Semua angka dari API berupa string desimal -> di-parse ke Decimal.
// Respon yang tidak valid = InfoError::Malformed (tick / coin di-skip, state tidak disentuh).
//
use std::str::FromStr;

use ahash::AHashMap as HashMap;
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::domain::{AccountState, BookTop, PositionSnapshot, SIZE_EPSILON};
use crate::pricer::AssetRules;

#[derive(Debug, Error)]
pub enum InfoError {
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    #[error("status {code}: {body}")]
    Status { code: u16, body: String },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("empty book for {0}")]
    EmptyBook(String),
}

/// Kapabilitas baca yang dipakai pipeline (di test diganti fake in-memory).
#[async_trait]
pub trait MarketInfo: Send + Sync {
    async fn fetch_snapshot(&self, address: &str) -> Result<AccountState, InfoError>;
    async fn fetch_book(&self, coin: &str) -> Result<BookTop, InfoError>;
}

// ---- Model minimal respon API ----
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClearinghouseState {
    margin_summary: MarginSummary,
    #[serde(default)]
    asset_positions: Vec<AssetPosition>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MarginSummary {
    account_value: String,
}

#[derive(Debug, Deserialize)]
struct AssetPosition {
    position: RawPosition,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPosition {
    coin: String,
    szi: String,
    #[serde(default)]
    entry_px: Option<String>, // null kalau posisi baru saja ditutup
}

#[derive(Debug, Deserialize)]
struct L2Book {
    levels: Vec<Vec<L2Level>>,
}

#[derive(Debug, Deserialize)]
struct L2Level {
    px: String,
}

#[derive(Debug, Deserialize)]
struct Meta {
    universe: Vec<UniverseAsset>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UniverseAsset {
    name: String,
    sz_decimals: u32,
}

fn dec(field: &str, raw: &str) -> Result<Decimal, InfoError> {
    Decimal::from_str(raw.trim())
        .or_else(|_| Decimal::from_scientific(raw.trim()))
        .map_err(|_| InfoError::Malformed(format!("{field}={raw}")))
}

pub fn parse_clearinghouse(v: serde_json::Value) -> Result<AccountState, InfoError> {
    let raw: ClearinghouseState =
        serde_json::from_value(v).map_err(|e| InfoError::Malformed(e.to_string()))?;
    let equity_usd = dec("accountValue", &raw.margin_summary.account_value)?;
    let captured_at = Utc::now();

    let mut positions = HashMap::new();
    for ap in raw.asset_positions {
        let p = ap.position;
        let signed_size = dec("szi", &p.szi)?;
        if signed_size.abs() < SIZE_EPSILON {
            continue;
        }
        let entry_px = match p.entry_px.as_deref() {
            Some(s) => dec("entryPx", s)?,
            None => Decimal::ZERO,
        };
        positions.insert(
            p.coin.clone(),
            PositionSnapshot {
                coin: p.coin,
                signed_size,
                entry_notional_usd: entry_px * signed_size.abs(),
                equity_usd,
                captured_at,
            },
        );
    }
    Ok(AccountState { equity_usd, positions })
}

pub fn parse_l2_book(coin: &str, v: serde_json::Value) -> Result<BookTop, InfoError> {
    let raw: L2Book = serde_json::from_value(v).map_err(|e| InfoError::Malformed(e.to_string()))?;
    let best = |side: usize| raw.levels.get(side).and_then(|lv| lv.first());
    match (best(0), best(1)) {
        (Some(b), Some(a)) => Ok(BookTop { best_bid: dec("bid", &b.px)?, best_ask: dec("ask", &a.px)? }),
        _ => Err(InfoError::EmptyBook(coin.to_string())),
    }
}

pub fn parse_meta(v: serde_json::Value) -> Result<HashMap<String, AssetRules>, InfoError> {
    let raw: Meta = serde_json::from_value(v).map_err(|e| InfoError::Malformed(e.to_string()))?;
    Ok(raw
        .universe
        .into_iter()
        .map(|a| (a.name, AssetRules::perp(a.sz_decimals)))
        .collect())
}

/// Client REST `POST {base}/info`
pub struct InfoClient {
    http: reqwest::Client,
    url: String,
}

impl InfoClient {
    pub fn new(base_url: &str) -> Result<Self, InfoError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(Self { http, url: format!("{}/info", base_url.trim_end_matches('/')) })
    }

    async fn post(&self, body: serde_json::Value) -> Result<serde_json::Value, InfoError> {
        let rsp = self.http.post(&self.url).json(&body).send().await?;
        let code = rsp.status();
        if !code.is_success() {
            let body = rsp.text().await.unwrap_or_default();
            return Err(InfoError::Status { code: code.as_u16(), body });
        }
        Ok(rsp.json::<serde_json::Value>().await?)
    }

    /// Dipanggil sekali saat startup
    pub async fn fetch_asset_rules(&self) -> Result<HashMap<String, AssetRules>, InfoError> {
        parse_meta(self.post(json!({ "type": "meta" })).await?)
    }
}

#[async_trait]
impl MarketInfo for InfoClient {
    async fn fetch_snapshot(&self, address: &str) -> Result<AccountState, InfoError> {
        parse_clearinghouse(self.post(json!({ "type": "clearinghouseState", "user": address })).await?)
    }

    async fn fetch_book(&self, coin: &str) -> Result<BookTop, InfoError> {
        parse_l2_book(coin, self.post(json!({ "type": "l2Book", "coin": coin })).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_clearinghouse_state() {
        let v = json!({
            "marginSummary": { "accountValue": "152340.55", "totalNtlPos": "30000.0" },
            "assetPositions": [
                { "type": "oneWay", "position": {
                    "coin": "BTC", "szi": "0.5", "entryPx": "60000.0",
                    "leverage": { "type": "cross", "value": 20 } } },
                { "type": "oneWay", "position": { "coin": "ETH", "szi": "-2.25", "entryPx": "2400.0" } },
                { "type": "oneWay", "position": { "coin": "SOL", "szi": "0.0", "entryPx": null } }
            ]
        });
        let st = parse_clearinghouse(v).unwrap();
        assert_eq!(st.equity_usd, dec!(152340.55));
        assert_eq!(st.positions.len(), 2);
        let btc = &st.positions["BTC"];
        assert_eq!(btc.signed_size, dec!(0.5));
        assert_eq!(btc.entry_notional_usd, dec!(30000));
        assert_eq!(st.positions["ETH"].signed_size, dec!(-2.25));
        assert!(!st.positions.contains_key("SOL"));
    }

    #[test]
    fn malformed_size_is_a_data_error() {
        let v = json!({
            "marginSummary": { "accountValue": "1.0" },
            "assetPositions": [ { "position": { "coin": "BTC", "szi": "abc" } } ]
        });
        assert!(matches!(parse_clearinghouse(v), Err(InfoError::Malformed(_))));
        assert!(matches!(parse_clearinghouse(json!({ "oops": 1 })), Err(InfoError::Malformed(_))));
    }

    #[test]
    fn parses_best_bid_ask() {
        let v = json!({
            "coin": "BTC", "time": 1700000000000u64,
            "levels": [
                [ { "px": "60000.0", "sz": "1.2", "n": 3 }, { "px": "59999.0", "sz": "4", "n": 1 } ],
                [ { "px": "60001.0", "sz": "0.7", "n": 2 } ]
            ]
        });
        let b = parse_l2_book("BTC", v).unwrap();
        assert_eq!(b.best_bid, dec!(60000));
        assert_eq!(b.best_ask, dec!(60001));
        assert_eq!(b.mid(), dec!(60000.5));
    }

    #[test]
    fn one_sided_book_is_empty() {
        let v = json!({ "coin": "XYZ", "levels": [ [ { "px": "1.0", "sz": "1", "n": 1 } ], [] ] });
        assert!(matches!(parse_l2_book("XYZ", v), Err(InfoError::EmptyBook(c)) if c == "XYZ"));
    }

    #[test]
    fn parses_meta_into_rules() {
        let v = json!({ "universe": [
            { "name": "BTC", "szDecimals": 5, "maxLeverage": 40 },
            { "name": "DOGE", "szDecimals": 0, "maxLeverage": 10 }
        ] });
        let rules = parse_meta(v).unwrap();
        assert_eq!(rules["BTC"], AssetRules::perp(5));
        assert_eq!(rules["DOGE"].price_decimals, 6);
    }
}
