// ===============================
// src/differ.rs
// ===============================
//
// Klasifikasi perubahan posisi target antara dua snapshot:
//   p = 0, n != 0          -> OPEN
//   p != 0, n = 0          -> CLOSE
//   tanda sama, |n| > |p|  -> INCREASE
//   tanda sama, |n| < |p|  -> DECREASE
//   tanda beda             -> FLIP (net change = |p| + |n|)
//   p == n                 -> tidak ada event
// Semua perbandingan toleran terhadap jitter < SIZE_EPSILON.
//
use rust_decimal::Decimal;
use crate::domain::{ChangeEvent, ChangeKind, PositionSnapshot, SIZE_EPSILON};

fn is_zero(x: Decimal) -> bool { x.abs() < SIZE_EPSILON }

pub fn classify(prev: Decimal, new: Decimal) -> Option<ChangeKind> {
    if (new - prev).abs() < SIZE_EPSILON {
        return None;
    }
    let kind = match (is_zero(prev), is_zero(new)) {
        (true, false) => ChangeKind::Open,
        (false, true) => ChangeKind::Close,
        // dua-duanya "nol" tapi selisih >= epsilon tidak mungkin terjadi; anggap tidak berubah
        (true, true) => return None,
        (false, false) => {
            if prev.is_sign_positive() != new.is_sign_positive() {
                ChangeKind::Flip
            } else if new.abs() > prev.abs() {
                ChangeKind::Increase
            } else {
                ChangeKind::Decrease
            }
        }
    };
    Some(kind)
}

/// Side-effect free: caller yang commit `new` ke SnapshotStore.
pub fn diff(coin: &str, prev: Option<&PositionSnapshot>, new: &PositionSnapshot) -> Option<ChangeEvent> {
    let p = prev.map(|s| s.signed_size).unwrap_or(Decimal::ZERO);
    let n = new.signed_size;
    let kind = classify(p, n)?;
    Some(ChangeEvent {
        coin: coin.to_string(),
        kind,
        prev_size: if is_zero(p) { Decimal::ZERO } else { p },
        new_size: if is_zero(n) { Decimal::ZERO } else { n },
        target_equity_usd: new.equity_usd,
    })
}
