// ===============================
// src/executor.rs
// ===============================
use rust_decimal::Decimal;
use tracing::{error, info, warn};

use crate::domain::{ExecutionResult, OrderIntent, Side};
use crate::gateway::OrderGateway;
use crate::metrics::DAILY_TRADES;
use crate::risk::DailyTradeCounter;

/// true kalau order murni mengurangi exposure tanpa menyeberang nol.
pub fn is_reduce_only(current: Decimal, signed_delta: Decimal) -> bool {
    if current.is_zero() || signed_delta.is_zero() {
        return false;
    }
    let resulting = current + signed_delta;
    resulting.abs() < current.abs()
        && (resulting.is_zero() || resulting.is_sign_negative() == current.is_sign_negative())
}

/// Intent baru per attempt (tidak pernah di-retry sebagai objek yang sama).
pub fn build_intent(coin: &str, signed_size: Decimal, limit_price: Decimal, current: Decimal) -> OrderIntent {
    OrderIntent {
        coin: coin.to_string(),
        side: Side::from_delta(signed_size),
        size: signed_size.abs(),
        limit_price,
        reduce_only: is_reduce_only(current, signed_size),
    }
}

pub struct Executor {
    gateway: Box<dyn OrderGateway>,
}

impl Executor {
    pub fn new(gateway: Box<dyn OrderGateway>) -> Self { Self { gateway } }

    /// Dry-run: log saja, venue tidak dipanggil, counter tidak naik.
    /// Live: setiap attempt yang sampai ke venue menaikkan counter harian.
    /// Gagal kirim = FAILED (recoverable), bukan panic.
    pub async fn execute(&self, intent: &OrderIntent, dry_run: bool, counter: &mut DailyTradeCounter) -> ExecutionResult {
        if dry_run {
            info!(
                coin = %intent.coin,
                side = intent.side.as_str(),
                size = %intent.size,
                px = %intent.limit_price,
                reduce_only = intent.reduce_only,
                "[DRY RUN] order not sent"
            );
            return ExecutionResult::DryRunLogged;
        }

        warn!(
            coin = %intent.coin,
            side = intent.side.as_str(),
            size = %intent.size,
            px = %intent.limit_price,
            reduce_only = intent.reduce_only,
            "EXECUTING IOC"
        );
        counter.record_attempt();
        DAILY_TRADES.set(counter.count as i64);

        match self.gateway.submit_order(intent).await {
            Ok(oid) => ExecutionResult::Submitted(oid),
            Err(e) => {
                error!(coin = %intent.coin, error = %e, "order submission failed");
                ExecutionResult::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{GatewayError, PaperGateway};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    struct Rejecting;

    #[async_trait]
    impl OrderGateway for Rejecting {
        async fn submit_order(&self, _intent: &OrderIntent) -> Result<String, GatewayError> {
            Err(GatewayError::Rejected("insufficient margin".into()))
        }
    }

    fn counter() -> DailyTradeCounter { DailyTradeCounter::new(NaiveDate::from_ymd_opt(2025, 1, 2).unwrap()) }

    fn intent() -> OrderIntent { build_intent("BTC", dec!(-0.1), dec!(59940), dec!(0.1)) }

    #[test]
    fn reduce_only_detection() {
        assert!(is_reduce_only(dec!(0.1), dec!(-0.1)));
        assert!(is_reduce_only(dec!(-2), dec!(0.5)));
        assert!(!is_reduce_only(dec!(0.1), dec!(-0.3))); // nyebrang nol
        assert!(!is_reduce_only(dec!(0), dec!(-0.3)));
        assert!(!is_reduce_only(dec!(0.1), dec!(0.1)));
    }

    #[test]
    fn build_intent_sets_side_and_magnitude() {
        let i = intent();
        assert_eq!(i.side, Side::Sell);
        assert_eq!(i.size, dec!(0.1));
        assert!(i.reduce_only);
        assert_eq!(i.signed_size(), dec!(-0.1));
    }

    #[tokio::test]
    async fn dry_run_never_touches_counter() {
        let ex = Executor::new(Box::new(PaperGateway));
        let mut c = counter();
        assert_eq!(ex.execute(&intent(), true, &mut c).await, ExecutionResult::DryRunLogged);
        assert_eq!(c.count, 0);
    }

    #[tokio::test]
    async fn live_submission_counts_and_returns_order_id() {
        let ex = Executor::new(Box::new(PaperGateway));
        let mut c = counter();
        let r = ex.execute(&intent(), false, &mut c).await;
        assert!(matches!(r, ExecutionResult::Submitted(ref oid) if oid.starts_with("PAPER-")));
        assert_eq!(c.count, 1);
    }

    #[tokio::test]
    async fn venue_failure_is_recoverable() {
        let ex = Executor::new(Box::new(Rejecting));
        let mut c = counter();
        let r = ex.execute(&intent(), false, &mut c).await;
        assert_eq!(r, ExecutionResult::Failed("rejected: insufficient margin".into()));
        // attempt tetap dihitung untuk kill switch
        assert_eq!(c.count, 1);
    }
}
