// ===============================
// src/risk.rs
// ===============================
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::config::RiskLimits;

/// Counter trade harian (kill switch). Reset saat tanggal lokal berganti.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyTradeCounter {
    pub count: u32,
    pub day_key: NaiveDate,
}

impl DailyTradeCounter {
    pub fn new(today: NaiveDate) -> Self { Self { count: 0, day_key: today } }

    /// Panggil di awal tiap tick. Return true kalau terjadi rollover.
    pub fn roll(&mut self, today: NaiveDate) -> bool {
        if today != self.day_key {
            self.day_key = today;
            self.count = 0;
            return true;
        }
        false
    }

    pub fn record_attempt(&mut self) { self.count = self.count.saturating_add(1); }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("below_minimum")]
    BelowMinimum,
    #[error("position_cap")]
    PositionCap,
    #[error("size_rounds_to_zero")]
    SizeRoundsToZero,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BlockReason {
    #[error("daily_limit")]
    DailyLimit,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    Execute(Decimal),
    Skip(SkipReason),
    Block(BlockReason),
}

impl Decision {
    pub fn label(&self) -> String {
        match self {
            Decision::Execute(_) => "execute".to_string(),
            Decision::Skip(r) => format!("skip:{r}"),
            Decision::Block(r) => format!("block:{r}"),
        }
    }
}

fn with_sign_of(magnitude: Decimal, reference: Decimal) -> Decimal {
    if reference.is_sign_negative() { -magnitude } else { magnitude }
}

/// Pre-trade checks, urutan penting (check pertama yang gagal menang):
/// 1) daily count  2) per-trade cap (clamp)  3) resulting-position cap (clamp)  4) minimum notional.
/// Fungsi murni: counter hanya dibaca, increment dilakukan Executor.
pub fn check(
    own_delta_size: Decimal,
    current_own_position: Decimal,
    mid_price: Decimal,
    lim: &RiskLimits,
    counter: &DailyTradeCounter,
) -> Decision {
    // 1) Kill switch harian
    if counter.count >= lim.max_daily_trades {
        return Decision::Block(BlockReason::DailyLimit);
    }

    let mut delta = own_delta_size;

    // 2) Per-trade notional cap: clamp, bukan reject
    if lim.max_trade_usd > Decimal::ZERO && mid_price > Decimal::ZERO {
        let notional = delta.abs() * mid_price;
        if notional > lim.max_trade_usd {
            delta = with_sign_of(lim.max_trade_usd / mid_price, delta);
        }
    }

    // 3) Resulting position cap. Trade yang murni mengurangi exposure tidak disentuh.
    if lim.max_position_usd > Decimal::ZERO && mid_price > Decimal::ZERO {
        let resulting = current_own_position + delta;
        let reduces = resulting.abs() <= current_own_position.abs()
            && (resulting.is_zero() || resulting.is_sign_negative() == current_own_position.is_sign_negative());
        if !reduces && resulting.abs() * mid_price > lim.max_position_usd {
            let capped = with_sign_of(lim.max_position_usd / mid_price, resulting);
            let clamped = capped - current_own_position;
            // clamp tidak boleh membalik arah trade
            if clamped.is_zero() || clamped.is_sign_negative() != delta.is_sign_negative() {
                return Decision::Skip(SkipReason::PositionCap);
            }
            delta = clamped;
        }
    }

    // 4) Minimum notional (setelah clamp)
    if delta.abs() * mid_price < lim.min_trade_usd || delta.is_zero() {
        return Decision::Skip(SkipReason::BelowMinimum);
    }

    Decision::Execute(delta)
}
