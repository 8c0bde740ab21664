// ===============================
// src/domain.rs
// ===============================
use ahash::AHashMap as HashMap;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Selisih size di bawah ini dianggap noise dari exchange (tidak ada perubahan).
pub const SIZE_EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 10); // 1e-10

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side { Buy, Sell }
impl Side {
    pub fn sign(&self) -> Decimal { match self { Side::Buy => Decimal::ONE, Side::Sell => Decimal::NEGATIVE_ONE } }
    pub fn from_delta(delta: Decimal) -> Self { if delta.is_sign_negative() { Side::Sell } else { Side::Buy } }
    pub fn as_str(&self) -> &'static str { match self { Side::Buy => "BUY", Side::Sell => "SELL" } }
}

/// Posisi satu coin pada satu akun (target atau milik sendiri).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub coin: String,
    pub signed_size: Decimal,
    pub entry_notional_usd: Decimal,
    pub equity_usd: Decimal,
    pub captured_at: DateTime<Utc>,
}

impl PositionSnapshot {
    pub fn flat(coin: &str, equity_usd: Decimal, captured_at: DateTime<Utc>) -> Self {
        Self {
            coin: coin.to_string(),
            signed_size: Decimal::ZERO,
            entry_notional_usd: Decimal::ZERO,
            equity_usd,
            captured_at,
        }
    }
}

/// Hasil satu kali fetch `clearinghouseState`: equity + posisi per coin (hanya yang non-flat).
#[derive(Debug, Clone, Default)]
pub struct AccountState {
    pub equity_usd: Decimal,
    pub positions: HashMap<String, PositionSnapshot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind { Open, Close, Increase, Decrease, Flip }
impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Open => "OPEN",
            ChangeKind::Close => "CLOSE",
            ChangeKind::Increase => "INCREASE",
            ChangeKind::Decrease => "DECREASE",
            ChangeKind::Flip => "FLIP",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub coin: String,
    pub kind: ChangeKind,
    pub prev_size: Decimal,
    pub new_size: Decimal,
    pub target_equity_usd: Decimal,
}

impl ChangeEvent {
    /// new - prev. Untuk FLIP nilainya sudah mencakup |prev| + |new|.
    pub fn raw_delta(&self) -> Decimal { self.new_size - self.prev_size }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BookTop { pub best_bid: Decimal, pub best_ask: Decimal }
impl BookTop {
    pub fn mid(&self) -> Decimal { (self.best_bid + self.best_ask) / Decimal::TWO }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderIntent {
    pub coin: String,
    pub side: Side,
    pub size: Decimal,
    pub limit_price: Decimal,
    pub reduce_only: bool,
}

impl OrderIntent {
    pub fn signed_size(&self) -> Decimal { self.side.sign() * self.size }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ExecutionResult {
    Submitted(String),
    #[serde(rename = "dry_run")]
    DryRunLogged,
    Failed(String),
}
impl ExecutionResult {
    pub fn label(&self) -> &'static str {
        match self {
            ExecutionResult::Submitted(_) => "submitted",
            ExecutionResult::DryRunLogged => "dry_run",
            ExecutionResult::Failed(_) => "failed",
        }
    }
}

// Observability: satu record per coin per tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinRecord {
    pub coin: String,
    pub event_kind: Option<ChangeKind>,
    pub scaled_size: Option<Decimal>,
    pub decision: Option<String>,
    /// Size final (signed) setelah guard + pembulatan szDecimals
    pub order_size: Option<Decimal>,
    pub final_price: Option<Decimal>,
    pub execution: Option<ExecutionResult>,
    /// Catatan kalau coin di-skip karena data / pricing error.
    pub note: Option<String>,
}

impl CoinRecord {
    pub fn new(coin: &str) -> Self {
        Self {
            coin: coin.to_string(),
            event_kind: None,
            scaled_size: None,
            decision: None,
            order_size: None,
            final_price: None,
            execution: None,
            note: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TickOutcome {
    Completed { target_equity_usd: Decimal, records: Vec<CoinRecord> },
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    pub ts: DateTime<Utc>,
    pub startup: bool,
    #[serde(flatten)]
    pub outcome: TickOutcome,
}

impl TickReport {
    pub fn records(&self) -> &[CoinRecord] {
        match &self.outcome {
            TickOutcome::Completed { records, .. } => records,
            TickOutcome::Skipped { .. } => &[],
        }
    }

    pub fn submitted(&self) -> usize {
        self.records()
            .iter()
            .filter(|r| matches!(r.execution, Some(ExecutionResult::Submitted(_))))
            .count()
    }
}
