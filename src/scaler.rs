// ===============================
// src/scaler.rs
// ===============================
//
// Ubah ChangeEvent target -> signed size delta untuk akun kita.
//   FIXED_RATIO    : (new - prev) * ratio
//   PROPORTIONAL   : (new - prev) * own_equity / target_equity
//   FIXED_SIZE     : sign(new - prev) * fixed_size
//   FIXED_NOTIONAL : sign(new - prev) * usd / mid
// Output 0 = tidak ada trade (pipeline berhenti sebelum RiskGuard).
//
use rust_decimal::Decimal;
use tracing::warn;

use crate::config::ScalingMode;
use crate::domain::{ChangeEvent, SIZE_EPSILON};

fn signum(x: Decimal) -> Decimal {
    if x.is_zero() { Decimal::ZERO } else if x.is_sign_negative() { Decimal::NEGATIVE_ONE } else { Decimal::ONE }
}

/// Skala sebuah besaran target (delta atau posisi absolut) ke akun kita.
fn scale_amount(
    coin: &str,
    raw: Decimal,
    own_equity_usd: Decimal,
    target_equity_usd: Decimal,
    mode: &ScalingMode,
    mid_price: Decimal,
) -> Decimal {
    if raw.abs() < SIZE_EPSILON {
        return Decimal::ZERO;
    }
    match mode {
        ScalingMode::FixedRatio { ratio } => raw * *ratio,
        ScalingMode::Proportional => {
            if target_equity_usd <= Decimal::ZERO {
                warn!(%coin, %target_equity_usd, "proportional scaling: target equity <= 0, no-op");
                return Decimal::ZERO;
            }
            raw * own_equity_usd / target_equity_usd
        }
        ScalingMode::FixedSize { size } => signum(raw) * *size,
        ScalingMode::FixedNotional { usd } => {
            if mid_price <= Decimal::ZERO {
                warn!(%coin, %mid_price, "fixed_notional scaling: no valid mid price, no-op");
                return Decimal::ZERO;
            }
            signum(raw) * *usd / mid_price
        }
    }
}

pub fn scale(event: &ChangeEvent, own_equity_usd: Decimal, mode: &ScalingMode, mid_price: Decimal) -> Decimal {
    scale_amount(&event.coin, event.raw_delta(), own_equity_usd, event.target_equity_usd, mode, mid_price)
}

/// Posisi absolut yang "seharusnya" kita pegang untuk posisi target `target_size`.
/// Dipakai untuk laporan heartbeat / sinkronisasi manual.
pub fn desired_position(
    coin: &str,
    target_size: Decimal,
    own_equity_usd: Decimal,
    target_equity_usd: Decimal,
    mode: &ScalingMode,
    mid_price: Decimal,
) -> Decimal {
    scale_amount(coin, target_size, own_equity_usd, target_equity_usd, mode, mid_price)
}
