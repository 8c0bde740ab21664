// ===============================
// src/gateway_relay.rs
// ===============================
//
// Venue live lewat order relay: relay yang pegang private key & signing
// Hyperliquid, bot ini hanya kirim intent (IOC limit) yang ditandatangani
// HMAC-SHA256 dengan shared secret. Relay membalas dengan respon order
// exchange apa adanya: {"status":"ok","response":{"data":{"statuses":[...]}}}
//
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use tracing::{error, info, warn};

use crate::domain::{OrderIntent, Side};
use crate::gateway::{new_cloid, GatewayError, OrderGateway};

pub fn timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

pub fn sign_payload(secret: &str, ts: u64, body: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(ts.to_string().as_bytes());
    mac.update(body.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

pub fn order_body(intent: &OrderIntent, cloid: &str) -> Value {
    json!({
        "action": {
            "type": "order",
            "orders": [{
                "coin": intent.coin,
                "is_buy": intent.side == Side::Buy,
                "sz": intent.size.normalize().to_string(),
                "limit_px": intent.limit_price.normalize().to_string(),
                "order_type": { "limit": { "tif": "Ioc" } },
                "reduce_only": intent.reduce_only,
                "cloid": cloid,
            }],
            "grouping": "na",
        }
    })
}

/// Ambil order id dari statuses[0]; `error` = reject dari exchange.
pub fn parse_order_response(v: &Value) -> Result<String, GatewayError> {
    match v.get("status").and_then(Value::as_str) {
        Some("ok") => {}
        Some(_) => {
            let reason = v
                .get("response")
                .map(|r| r.as_str().map(str::to_string).unwrap_or_else(|| r.to_string()))
                .unwrap_or_else(|| v.to_string());
            return Err(GatewayError::Rejected(reason));
        }
        None => return Err(GatewayError::Unexpected(v.to_string())),
    }

    let first = v
        .pointer("/response/data/statuses/0")
        .ok_or_else(|| GatewayError::Unexpected(v.to_string()))?;

    if let Some(filled) = first.get("filled") {
        let oid = filled.get("oid").map(Value::to_string).unwrap_or_default();
        info!(%oid, total_sz = ?filled.get("totalSz"), avg_px = ?filled.get("avgPx"), "relay: FILLED");
        return Ok(oid);
    }
    if let Some(resting) = first.get("resting") {
        let oid = resting.get("oid").map(Value::to_string).unwrap_or_default();
        warn!(%oid, "relay: order resting (unexpected for IOC)");
        return Ok(oid);
    }
    if let Some(err) = first.get("error") {
        let reason = err.as_str().map(str::to_string).unwrap_or_else(|| err.to_string());
        return Err(GatewayError::Rejected(reason));
    }
    Err(GatewayError::Unexpected(first.to_string()))
}

pub struct RelayGateway {
    http: reqwest::Client,
    url: String,
    secret: String,
}

impl RelayGateway {
    pub fn new(relay_url: &str, secret: &str) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            url: format!("{}/order", relay_url.trim_end_matches('/')),
            secret: secret.to_string(),
        })
    }
}

#[async_trait]
impl OrderGateway for RelayGateway {
    async fn submit_order(&self, intent: &OrderIntent) -> Result<String, GatewayError> {
        let cloid = new_cloid();
        let body = order_body(intent, &cloid).to_string();
        let ts = timestamp_ms();
        let sig = sign_payload(&self.secret, ts, &body);

        let rsp = self
            .http
            .post(&self.url)
            .header("Content-Type", "application/json")
            .header("X-Relay-Timestamp", ts.to_string())
            .header("X-Relay-Signature", sig)
            .body(body)
            .send()
            .await?;

        let code = rsp.status();
        if !code.is_success() {
            let body = rsp.text().await.unwrap_or_default();
            error!(%code, %body, %cloid, "relay: order send failed");
            return Err(GatewayError::Status { code: code.as_u16(), body });
        }
        let v = rsp.json::<Value>().await?;
        parse_order_response(&v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn body_carries_ioc_and_reduce_only_verbatim() {
        let intent = OrderIntent {
            coin: "ETH".into(),
            side: Side::Sell,
            size: dec!(0.5000),
            limit_price: dec!(2343.30),
            reduce_only: true,
        };
        let v = order_body(&intent, "0xabc");
        let o = &v["action"]["orders"][0];
        assert_eq!(o["is_buy"], json!(false));
        assert_eq!(o["sz"], json!("0.5"));
        assert_eq!(o["limit_px"], json!("2343.3"));
        assert_eq!(o["order_type"]["limit"]["tif"], json!("Ioc"));
        assert_eq!(o["reduce_only"], json!(true));
        assert_eq!(o["cloid"], json!("0xabc"));
    }

    #[test]
    fn signature_is_deterministic_hex() {
        let a = sign_payload("secret", 1700000000000, "{}");
        let b = sign_payload("secret", 1700000000000, "{}");
        let c = sign_payload("other", 1700000000000, "{}");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn parses_filled_resting_and_error_statuses() {
        let filled = json!({"status":"ok","response":{"type":"order","data":{"statuses":[
            {"filled":{"totalSz":"0.02","avgPx":"60010.0","oid":77738308}}]}}});
        assert_eq!(parse_order_response(&filled).unwrap(), "77738308");

        let resting = json!({"status":"ok","response":{"type":"order","data":{"statuses":[
            {"resting":{"oid":42}}]}}});
        assert_eq!(parse_order_response(&resting).unwrap(), "42");

        let err = json!({"status":"ok","response":{"type":"order","data":{"statuses":[
            {"error":"Order could not immediately match against any resting orders."}]}}});
        assert!(matches!(parse_order_response(&err), Err(GatewayError::Rejected(r)) if r.contains("immediately match")));

        let top = json!({"status":"err","response":"User or API Wallet does not exist."});
        assert!(matches!(parse_order_response(&top), Err(GatewayError::Rejected(_))));

        assert!(matches!(parse_order_response(&json!({"foo":1})), Err(GatewayError::Unexpected(_))));
    }
}
