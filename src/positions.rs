// ===============================
// src/positions.rs (posisi & equity akun sendiri)
// ===============================
use ahash::AHashMap as HashMap;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::domain::{AccountState, SIZE_EPSILON};
use crate::metrics::{OWN_EQUITY, OWN_POSITION};

/// Live: di-refresh dari clearinghouseState tiap tick.
/// Dry-run: posisi disimulasikan dari intent yang "seolah" dieksekusi.
#[derive(Debug, Clone)]
pub struct OwnAccount {
    pub equity_usd: Decimal,
    positions: HashMap<String, Decimal>,
    simulated: bool,
}

impl OwnAccount {
    pub fn live() -> Self {
        Self { equity_usd: Decimal::ZERO, positions: HashMap::new(), simulated: false }
    }

    pub fn simulated(equity_usd: Decimal) -> Self {
        Self { equity_usd, positions: HashMap::new(), simulated: true }
    }

    pub fn is_simulated(&self) -> bool { self.simulated }

    pub fn position(&self, coin: &str) -> Decimal {
        self.positions.get(coin).copied().unwrap_or(Decimal::ZERO)
    }

    /// Terima state dari exchange. Mode simulasi hanya ambil equity (posisi tetap punya kita).
    pub fn refresh(&mut self, state: &AccountState) {
        self.equity_usd = state.equity_usd;
        OWN_EQUITY.set(self.equity_usd.to_f64().unwrap_or(0.0));
        if self.simulated {
            return;
        }
        // coin yang sudah ditutup tidak boleh tertinggal di gauge
        OWN_POSITION.reset();
        self.positions = state
            .positions
            .iter()
            .map(|(coin, snap)| (coin.clone(), snap.signed_size))
            .collect();
        for (coin, qty) in self.positions.iter() {
            OWN_POSITION.with_label_values(&[coin.as_str()]).set(qty.to_f64().unwrap_or(0.0));
        }
    }

    /// Catat fill simulasi (dry-run). Di mode live no-op: posisi asli datang dari refresh().
    pub fn apply_simulated(&mut self, coin: &str, signed_delta: Decimal) {
        if !self.simulated {
            return;
        }
        let entry = self.positions.entry(coin.to_string()).or_insert(Decimal::ZERO);
        *entry += signed_delta;
        let qty = *entry;
        if qty.abs() < SIZE_EPSILON {
            self.positions.remove(coin);
        }
        OWN_POSITION.with_label_values(&[coin]).set(qty.to_f64().unwrap_or(0.0));
    }
}
