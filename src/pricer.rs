// ===============================
// src/pricer.rs
// ===============================
//
// Harga limit IOC:
//   BUY  = best_ask * (1 + slippage_bps / 10_000)   -> dibulatkan ke atas
//   SELL = best_bid * (1 - slippage_bps / 10_000)   -> dibulatkan ke bawah
// Aturan harga perp Hyperliquid: maks 5 significant figures dan maks
// (6 - szDecimals) desimal; harga integer selalu valid.
// Tick size dulu, baru significant figure, keduanya ke arah yang lebih agresif
// supaya order tidak pernah jadi kurang fillable.
//
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

use crate::domain::{BookTop, Side};

const MAX_SIG_FIGS: i64 = 5;
const PERP_MAX_DECIMALS: u32 = 6;
const DEFAULT_SZ_DECIMALS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PricingError {
    #[error("invalid book: bid={bid} ask={ask}")]
    InvalidBook { bid: Decimal, ask: Decimal },
    #[error("non-positive limit price {0}")]
    NonPositivePrice(Decimal),
}

/// Aturan presisi per instrumen (dari `meta.universe[].szDecimals`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetRules {
    pub sz_decimals: u32,
    pub price_decimals: u32,
}

impl AssetRules {
    pub fn perp(sz_decimals: u32) -> Self {
        Self { sz_decimals, price_decimals: PERP_MAX_DECIMALS.saturating_sub(sz_decimals) }
    }

    /// Potong size ke arah nol supaya cap risk tidak terlampaui karena pembulatan.
    pub fn truncate_size(&self, size: Decimal) -> Decimal {
        size.round_dp_with_strategy(self.sz_decimals, RoundingStrategy::ToZero)
    }
}

impl Default for AssetRules {
    fn default() -> Self { Self::perp(DEFAULT_SZ_DECIMALS) }
}

fn strategy_for(side: Side) -> RoundingStrategy {
    match side {
        Side::Buy => RoundingStrategy::ToPositiveInfinity,
        Side::Sell => RoundingStrategy::ToNegativeInfinity,
    }
}

/// floor(log10(x)) untuk x > 0
fn magnitude(x: Decimal) -> i64 {
    let mut m = 0i64;
    let mut v = x;
    let ten = Decimal::TEN;
    while v >= ten {
        v /= ten;
        m += 1;
    }
    while v < Decimal::ONE {
        v *= ten;
        m -= 1;
    }
    m
}

/// Bulatkan harga ke aturan exchange, searah `side` (BUY naik, SELL turun).
pub fn round_price(px: Decimal, side: Side, rules: &AssetRules) -> Decimal {
    if px <= Decimal::ZERO {
        return px;
    }
    let strategy = strategy_for(side);
    // 1) tick size
    let ticked = px.round_dp_with_strategy(rules.price_decimals, strategy);
    if ticked <= Decimal::ZERO {
        return ticked;
    }
    // 2) significant figures (integer selalu valid, jadi desimal minimal 0)
    let sig_dp = (MAX_SIG_FIGS - 1 - magnitude(ticked)).max(0) as u32;
    ticked.round_dp_with_strategy(sig_dp.min(rules.price_decimals), strategy).normalize()
}

pub fn price(side: Side, book: &BookTop, slippage_bps: Decimal, rules: &AssetRules) -> Result<Decimal, PricingError> {
    let (bid, ask) = (book.best_bid, book.best_ask);
    if bid <= Decimal::ZERO || ask <= Decimal::ZERO || bid > ask {
        return Err(PricingError::InvalidBook { bid, ask });
    }
    let slip = slippage_bps / Decimal::from(10_000);
    let raw = match side {
        Side::Buy => ask * (Decimal::ONE + slip),
        Side::Sell => bid * (Decimal::ONE - slip),
    };
    let px = round_price(raw, side, rules);
    if px <= Decimal::ZERO {
        return Err(PricingError::NonPositivePrice(px));
    }
    Ok(px)
}
