// ===============================
// src/snapshot.rs
// ===============================
use ahash::AHashMap as HashMap;
use crate::domain::PositionSnapshot;

/// Posisi terakhir target per coin. Murni in-memory, satu pemilik (satu target).
#[derive(Debug, Default)]
pub struct SnapshotStore {
    by_coin: HashMap<String, PositionSnapshot>,
}

impl SnapshotStore {
    pub fn new() -> Self { Self::default() }

    pub fn get(&self, coin: &str) -> Option<&PositionSnapshot> { self.by_coin.get(coin) }

    /// Ganti snapshot lama secara utuh (tidak pernah di-mutate in place).
    pub fn put(&mut self, coin: &str, snap: PositionSnapshot) {
        self.by_coin.insert(coin.to_string(), snap);
    }

    pub fn coins(&self) -> impl Iterator<Item = &String> { self.by_coin.keys() }

    pub fn len(&self) -> usize { self.by_coin.len() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[test]
    fn put_overwrites_previous_snapshot() {
        let mut store = SnapshotStore::new();
        assert!(store.get("BTC").is_none());

        let mut s = PositionSnapshot::flat("BTC", dec!(1000), Utc::now());
        s.signed_size = dec!(0.5);
        store.put("BTC", s);
        let mut s2 = PositionSnapshot::flat("BTC", dec!(1000), Utc::now());
        s2.signed_size = dec!(-0.2);
        store.put("BTC", s2);

        assert_eq!(store.get("BTC").map(|s| s.signed_size), Some(dec!(-0.2)));
        assert_eq!(store.len(), 1);
    }
}
