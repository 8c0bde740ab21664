// ===============================
// src/gateway.rs (order venue)
// ===============================
use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use thiserror::Error;
use tracing::info;

use crate::domain::OrderIntent;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    #[error("status {code}: {body}")]
    Status { code: u16, body: String },
    #[error("rejected: {0}")]
    Rejected(String),
    #[error("unexpected response: {0}")]
    Unexpected(String),
}

/// Kapabilitas submit order. Implementasi wajib meneruskan IOC + reduce_only apa adanya.
/// Return: order id dari venue.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    async fn submit_order(&self, intent: &OrderIntent) -> Result<String, GatewayError>;
}

/// Client order id 128-bit hex (format cloid Hyperliquid)
pub fn new_cloid() -> String {
    format!("0x{:032x}", rand::thread_rng().gen::<u128>())
}

/// Venue simulasi: setiap IOC langsung dianggap terisi penuh di harga limit.
#[derive(Debug, Default)]
pub struct PaperGateway;

#[async_trait]
impl OrderGateway for PaperGateway {
    async fn submit_order(&self, intent: &OrderIntent) -> Result<String, GatewayError> {
        let oid = format!("PAPER-{}-{}", Utc::now().timestamp_millis(), &new_cloid()[2..10]);
        info!(
            %oid,
            coin = %intent.coin,
            side = intent.side.as_str(),
            size = %intent.size,
            px = %intent.limit_price,
            reduce_only = intent.reduce_only,
            "paper fill"
        );
        Ok(oid)
    }
}
