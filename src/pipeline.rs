// ===============================
// src/pipeline.rs (orchestrator)
// ===============================
//
// Satu tick = satu pass lengkap:
//   fetch target -> (refresh akun sendiri) -> per coin:
//   diff -> commit snapshot -> scale -> risk -> truncate size -> price -> execute
//
// Snapshot target di-commit SEBELUM eksekusi: hasil FAILED/SKIP/BLOCK tidak
// diulang di tick berikutnya (tidak ada retry storm ke venue).
// Fetch target gagal = tick di-skip utuh, SnapshotStore tidak disentuh.
//
use std::time::{Duration, Instant};

use ahash::AHashMap as HashMap;
use chrono::{Local, NaiveDate, Utc};
use futures_util::{stream, Stream};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tokio::time::{interval_at, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::{Args, RiskLimits, ScalingMode};
use crate::differ;
use crate::domain::{
    AccountState, ChangeEvent, CoinRecord, ExecutionResult, PositionSnapshot, Side, TickOutcome, TickReport,
    SIZE_EPSILON,
};
use crate::executor::{build_intent, Executor};
use crate::info::MarketInfo;
use crate::metrics::{
    DAILY_TRADES, DECISIONS, EVENTS_BY, EXECS, POLL_ERRORS_CONSECUTIVE, TARGET_EQUITY, TICKS, TICKS_SKIPPED,
};
use crate::positions::OwnAccount;
use crate::pricer::{self, AssetRules};
use crate::risk::{self, DailyTradeCounter, Decision, SkipReason};
use crate::scaler;
use crate::snapshot::SnapshotStore;

const HEARTBEAT_EVERY: Duration = Duration::from_secs(60);
const ALERT_AFTER_CONSECUTIVE_ERRORS: u32 = 5;

fn today() -> NaiveDate { Local::now().date_naive() }

pub struct Copier {
    args: Args,
    limits: RiskLimits,
    info: Box<dyn MarketInfo>,
    executor: Executor,
    rules: HashMap<String, AssetRules>,

    store: SnapshotStore,
    counter: DailyTradeCounter,
    own: OwnAccount,

    // startup tanpa sync: tick sukses pertama hanya jadi baseline
    seed_pending: bool,
    poll_errors: u32,
    last_mid: HashMap<String, Decimal>,
    last_target: AccountState,

    started: Instant,
    last_heartbeat: Instant,
    ticks: u64,
    trades: u64,
}

impl Copier {
    pub fn new(
        args: Args,
        limits: RiskLimits,
        info: Box<dyn MarketInfo>,
        executor: Executor,
        rules: HashMap<String, AssetRules>,
    ) -> Self {
        let own = if args.dry_run { OwnAccount::simulated(args.paper_equity_usd) } else { OwnAccount::live() };
        let now = Instant::now();
        Self {
            args,
            limits,
            info,
            executor,
            rules,
            store: SnapshotStore::new(),
            counter: DailyTradeCounter::new(today()),
            own,
            seed_pending: false,
            poll_errors: 0,
            last_mid: HashMap::new(),
            last_target: AccountState::default(),
            started: now,
            last_heartbeat: now,
            ticks: 0,
            trades: 0,
        }
    }

    #[cfg(test)]
    pub fn counter(&self) -> &DailyTradeCounter { &self.counter }
    #[cfg(test)]
    pub fn own(&self) -> &OwnAccount { &self.own }
    #[cfg(test)]
    pub fn store(&self) -> &SnapshotStore { &self.store }

    /// Startup:
    /// - sync aktif   : satu pass dengan baseline kosong, posisi target yang sudah ada = OPEN
    /// - sync nonaktif: snapshot pertama cuma jadi baseline, tidak ada order
    pub async fn startup_sync(&mut self) -> TickReport {
        if !self.args.sync_on_startup {
            self.seed_pending = true;
        }
        self.pass(true).await
    }

    pub async fn run_tick(&mut self) -> TickReport { self.pass(false).await }

    /// Tick stream lazy: satu TickReport per interval (tick pertama setelah `every`),
    /// berhenti kalau stream di-drop.
    pub fn tick_stream(self, every: Duration) -> impl Stream<Item = TickReport> {
        let mut iv = interval_at(tokio::time::Instant::now() + every, every);
        iv.set_missed_tick_behavior(MissedTickBehavior::Delay);
        stream::unfold((self, iv), |(mut copier, mut iv)| async move {
            iv.tick().await;
            let report = copier.run_tick().await;
            Some((report, (copier, iv)))
        })
    }

    fn skipped(&self, startup: bool, reason: String) -> TickReport {
        TICKS_SKIPPED.inc();
        TickReport { ts: Utc::now(), startup, outcome: TickOutcome::Skipped { reason } }
    }

    fn coins_for(&self, state: &AccountState) -> Vec<String> {
        if !self.args.copies_all_coins() {
            return self.args.coins.clone();
        }
        let mut all: Vec<String> = self.store.coins().cloned().chain(state.positions.keys().cloned()).collect();
        all.sort();
        all.dedup();
        all
    }

    async fn pass(&mut self, startup: bool) -> TickReport {
        if self.counter.roll(today()) {
            info!(day = %self.counter.day_key, "daily trade counter reset");
            DAILY_TRADES.set(0);
        }

        let target = match self.info.fetch_snapshot(&self.args.target_address).await {
            Ok(s) => s,
            Err(e) => {
                self.poll_errors += 1;
                POLL_ERRORS_CONSECUTIVE.set(self.poll_errors as i64);
                if self.poll_errors >= ALERT_AFTER_CONSECUTIVE_ERRORS {
                    error!(consecutive = self.poll_errors, error = %e, "target fetch keeps failing");
                } else {
                    warn!(consecutive = self.poll_errors, error = %e, "target fetch failed, tick skipped");
                }
                return self.skipped(startup, format!("target: {e}"));
            }
        };
        self.poll_errors = 0;
        POLL_ERRORS_CONSECUTIVE.set(0);
        TARGET_EQUITY.set(target.equity_usd.to_f64().unwrap_or(0.0));

        if let Some(own_addr) = self.args.own_address.clone() {
            match self.info.fetch_snapshot(&own_addr).await {
                Ok(st) => self.own.refresh(&st),
                // live: tanpa posisi sendiri yang segar, risk cap tidak bisa dihitung
                Err(e) if !self.own.is_simulated() => {
                    warn!(error = %e, "own account fetch failed, tick skipped");
                    return self.skipped(startup, format!("own account: {e}"));
                }
                Err(e) => warn!(error = %e, "own account fetch failed, keeping last equity"),
            }
        }

        let coins = self.coins_for(&target);
        let now = Utc::now();
        let mut records = Vec::with_capacity(coins.len());

        if self.seed_pending {
            for coin in &coins {
                let snap = target
                    .positions
                    .get(coin)
                    .cloned()
                    .unwrap_or_else(|| PositionSnapshot::flat(coin, target.equity_usd, now));
                self.store.put(coin, snap);
            }
            self.seed_pending = false;
            info!(coins = ?coins, tracked = self.store.len(), "baseline captured, existing target positions ignored");
        } else {
            for coin in &coins {
                let new = target
                    .positions
                    .get(coin)
                    .cloned()
                    .unwrap_or_else(|| PositionSnapshot::flat(coin, target.equity_usd, now));
                let event = differ::diff(coin, self.store.get(coin), &new);
                self.store.put(coin, new);

                let rec = match event {
                    Some(ev) => self.process(ev).await,
                    None => CoinRecord::new(coin),
                };
                records.push(rec);
            }
        }

        TICKS.inc();
        self.ticks += 1;
        self.last_target = target;
        self.maybe_heartbeat();

        TickReport {
            ts: Utc::now(),
            startup,
            outcome: TickOutcome::Completed { target_equity_usd: self.last_target.equity_usd, records },
        }
    }

    /// Jalur satu ChangeEvent sampai eksekusi. Semua error di sini hanya
    /// membatalkan coin ini, coin lain di tick yang sama tetap jalan.
    async fn process(&mut self, ev: ChangeEvent) -> CoinRecord {
        let coin = ev.coin.clone();
        let mut rec = CoinRecord::new(&coin);
        rec.event_kind = Some(ev.kind);
        EVENTS_BY.with_label_values(&[ev.kind.as_str(), coin.as_str()]).inc();
        info!(
            %coin,
            kind = ev.kind.as_str(),
            prev = %ev.prev_size,
            new = %ev.new_size,
            target_equity = %ev.target_equity_usd,
            "TARGET MOVED"
        );

        let book = match self.info.fetch_book(&coin).await {
            Ok(b) => b,
            Err(e) => {
                warn!(%coin, error = %e, "book unavailable, event dropped");
                rec.note = Some(format!("book: {e}"));
                return rec;
            }
        };
        let mid = book.mid();
        self.last_mid.insert(coin.clone(), mid);

        let delta = scaler::scale(&ev, self.own.equity_usd, &self.args.scaling, mid);
        rec.scaled_size = Some(delta);
        if delta.abs() < SIZE_EPSILON {
            debug!(%coin, "scaled delta is zero, nothing to do");
            rec.note = Some("scaled to zero".to_string());
            return rec;
        }

        let current = self.own.position(&coin);
        let decision = risk::check(delta, current, mid, &self.limits, &self.counter);
        let size = match decision {
            Decision::Execute(size) => size,
            other => return self.stop(rec, other),
        };

        let rules = self.rules.get(&coin).copied().unwrap_or_default();
        let magnitude = rules.truncate_size(size.abs());
        if magnitude.is_zero() {
            return self.stop(rec, Decision::Skip(SkipReason::SizeRoundsToZero));
        }
        // notional dicek ulang setelah pembulatan size
        if magnitude * mid < self.limits.min_trade_usd {
            return self.stop(rec, Decision::Skip(SkipReason::BelowMinimum));
        }
        let signed = if size.is_sign_negative() { -magnitude } else { magnitude };
        DECISIONS.with_label_values(&["execute"]).inc();
        rec.decision = Some(Decision::Execute(signed).label());
        rec.order_size = Some(signed);

        let px = match pricer::price(Side::from_delta(signed), &book, self.args.slippage_bps, &rules) {
            Ok(px) => px,
            Err(e) => {
                warn!(%coin, error = %e, "pricing failed, event dropped");
                rec.note = Some(e.to_string());
                return rec;
            }
        };
        rec.final_price = Some(px);

        let intent = build_intent(&coin, signed, px, current);
        let result = self.executor.execute(&intent, self.args.dry_run, &mut self.counter).await;
        EXECS.with_label_values(&[result.label(), coin.as_str()]).inc();
        match &result {
            ExecutionResult::DryRunLogged => {
                self.own.apply_simulated(&coin, signed);
                self.trades += 1;
            }
            ExecutionResult::Submitted(_) => self.trades += 1,
            ExecutionResult::Failed(_) => {}
        }
        rec.execution = Some(result);
        rec
    }

    fn stop(&self, mut rec: CoinRecord, decision: Decision) -> CoinRecord {
        let label = decision.label();
        match decision {
            Decision::Block(_) => warn!(coin = %rec.coin, decision = %label, count = self.counter.count, "BLOCKED"),
            _ => info!(coin = %rec.coin, decision = %label, "skipped by risk guard"),
        }
        DECISIONS.with_label_values(&[label.as_str()]).inc();
        rec.decision = Some(label);
        rec
    }

    fn maybe_heartbeat(&mut self) {
        if self.last_heartbeat.elapsed() < HEARTBEAT_EVERY {
            return;
        }
        self.last_heartbeat = Instant::now();
        info!(
            uptime_s = self.started.elapsed().as_secs(),
            ticks = self.ticks,
            trades = self.trades,
            daily = self.counter.count,
            max_daily = self.limits.max_daily_trades,
            target_equity = %self.last_target.equity_usd,
            own_equity = %self.own.equity_usd,
            "heartbeat"
        );
        for coin in self.coins_for(&self.last_target) {
            let target_size = self.last_target.positions.get(&coin).map(|p| p.signed_size).unwrap_or_default();
            let mid = self.last_mid.get(&coin).copied().unwrap_or_default();
            if mid.is_zero() && matches!(self.args.scaling, ScalingMode::FixedNotional { .. }) {
                debug!(%coin, "heartbeat: no mid yet, desired size unknown");
                continue;
            }
            let desired = scaler::desired_position(
                &coin,
                target_size,
                self.own.equity_usd,
                self.last_target.equity_usd,
                &self.args.scaling,
                mid,
            );
            info!(%coin, target = %target_size, desired = %desired, ours = %self.own.position(&coin), "heartbeat position");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{test_args, ScalingMode};
    use crate::domain::{BookTop, OrderIntent};
    use crate::gateway::{GatewayError, OrderGateway};
    use crate::info::InfoError;
    use async_trait::async_trait;
    use futures_util::StreamExt;
    use rust_decimal_macros::dec;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    const OWN: &str = "0x0000000000000000000000000000000000000001";

    /// Fake info: snapshot target diambil berurutan (None = fetch error),
    /// akun sendiri statis.
    struct FakeInfo {
        target: Mutex<VecDeque<Option<AccountState>>>,
        own: AccountState,
        books: HashMap<String, BookTop>,
    }

    impl FakeInfo {
        fn new(target: Vec<Option<AccountState>>, own: AccountState) -> Self {
            let mut books = HashMap::new();
            books.insert("BTC".to_string(), BookTop { best_bid: dec!(60000), best_ask: dec!(60000) });
            books.insert("ETH".to_string(), BookTop { best_bid: dec!(3000), best_ask: dec!(3000) });
            Self { target: Mutex::new(target.into()), own, books }
        }
    }

    #[async_trait]
    impl MarketInfo for FakeInfo {
        async fn fetch_snapshot(&self, address: &str) -> Result<AccountState, InfoError> {
            if address == OWN {
                return Ok(self.own.clone());
            }
            match self.target.lock().unwrap().pop_front() {
                Some(Some(s)) => Ok(s),
                _ => Err(InfoError::Malformed("timeout".into())),
            }
        }

        async fn fetch_book(&self, coin: &str) -> Result<BookTop, InfoError> {
            self.books.get(coin).copied().ok_or_else(|| InfoError::EmptyBook(coin.to_string()))
        }
    }

    #[derive(Clone, Default)]
    struct Recording {
        sent: Arc<Mutex<Vec<OrderIntent>>>,
        fail: bool,
    }

    #[async_trait]
    impl OrderGateway for Recording {
        async fn submit_order(&self, intent: &OrderIntent) -> Result<String, GatewayError> {
            self.sent.lock().unwrap().push(intent.clone());
            if self.fail {
                return Err(GatewayError::Rejected("insufficient margin".into()));
            }
            Ok("oid-1".to_string())
        }
    }

    fn account(equity: Decimal, positions: &[(&str, Decimal)]) -> AccountState {
        let mut s = AccountState { equity_usd: equity, ..Default::default() };
        for (coin, size) in positions {
            let mut p = PositionSnapshot::flat(coin, equity, Utc::now());
            p.signed_size = *size;
            s.positions.insert(coin.to_string(), p);
        }
        s
    }

    fn live_args() -> Args {
        let mut a = test_args();
        a.dry_run = false;
        a.own_address = Some(OWN.to_string());
        a
    }

    fn copier(args: Args, limits: RiskLimits, info: FakeInfo, gw: Recording) -> Copier {
        Copier::new(args, limits, Box::new(info), Executor::new(Box::new(gw)), HashMap::new())
    }

    fn only(report: &TickReport) -> &CoinRecord {
        assert_eq!(report.records().len(), 1, "{report:?}");
        &report.records()[0]
    }

    #[tokio::test]
    async fn open_is_clamped_by_position_cap_in_dry_run() {
        let info = FakeInfo::new(vec![Some(account(dec!(100000), &[("BTC", dec!(1.0))]))], AccountState::default());
        let gw = Recording::default();
        let mut c = copier(test_args(), RiskLimits::default(), info, gw.clone());

        let report = c.startup_sync().await;
        assert!(report.startup);
        let rec = only(&report);
        assert_eq!(rec.event_kind, Some(crate::domain::ChangeKind::Open));
        assert_eq!(rec.scaled_size, Some(dec!(0.1)));
        assert_eq!(rec.decision.as_deref(), Some("execute"));
        assert_eq!(rec.order_size, Some(dec!(0.08333)));
        assert_eq!(rec.execution, Some(ExecutionResult::DryRunLogged));
        // BUY: ask * 1.001 = 60060
        assert_eq!(rec.final_price, Some(dec!(60060)));

        assert!(gw.sent.lock().unwrap().is_empty());
        assert_eq!(c.counter().count, 0);
        assert_eq!(c.own().position("BTC"), dec!(0.08333));
    }

    #[tokio::test]
    async fn close_sells_at_bid_minus_slippage_reduce_only() {
        let info = FakeInfo::new(
            vec![Some(account(dec!(100000), &[("BTC", dec!(1.0))])), Some(account(dec!(100000), &[]))],
            account(dec!(10000), &[("BTC", dec!(0.1))]),
        );
        let gw = Recording::default();
        let mut args = live_args();
        args.sync_on_startup = false;
        let mut c = copier(args, RiskLimits::default(), info, gw.clone());

        let seeded = c.startup_sync().await;
        assert!(seeded.records().is_empty());
        assert_eq!(c.store().get("BTC").map(|s| s.signed_size), Some(dec!(1.0)));

        let report = c.run_tick().await;
        let rec = only(&report);
        assert_eq!(rec.event_kind, Some(crate::domain::ChangeKind::Close));
        assert_eq!(rec.execution, Some(ExecutionResult::Submitted("oid-1".into())));

        let sent = gw.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].side, Side::Sell);
        assert_eq!(sent[0].size, dec!(0.1));
        assert_eq!(sent[0].limit_price, dec!(59940));
        assert!(sent[0].reduce_only);
        assert_eq!(c.counter().count, 1);
    }

    #[tokio::test]
    async fn tiny_fixed_size_flip_is_below_minimum() {
        let info = FakeInfo::new(
            vec![Some(account(dec!(50000), &[("ETH", dec!(0.5))])), Some(account(dec!(50000), &[("ETH", dec!(-0.3))]))],
            AccountState::default(),
        );
        let gw = Recording::default();
        let mut args = test_args();
        args.coins = vec!["ETH".to_string()];
        args.sync_on_startup = false;
        args.scaling = ScalingMode::FixedSize { size: dec!(0.001) };
        let mut c = copier(args, RiskLimits::default(), info, gw.clone());

        c.startup_sync().await;
        let report = c.run_tick().await;
        let rec = only(&report);
        assert_eq!(rec.event_kind, Some(crate::domain::ChangeKind::Flip));
        assert_eq!(rec.scaled_size, Some(dec!(-0.001)));
        assert_eq!(rec.decision.as_deref(), Some("skip:below_minimum"));
        assert_eq!(rec.execution, None);
        assert_eq!(c.counter().count, 0);
        assert_eq!(c.own().position("ETH"), dec!(0));
    }

    #[tokio::test]
    async fn size_truncation_rechecks_minimum_notional() {
        // 0.000189 * 60000 = 11.34 lolos guard, setelah truncate 0.00018 * 60000 = 10.8 < 11
        let info = FakeInfo::new(vec![Some(account(dec!(100000), &[("BTC", dec!(0.5))]))], AccountState::default());
        let gw = Recording::default();
        let mut args = test_args();
        args.scaling = ScalingMode::FixedSize { size: dec!(0.000189) };
        let mut c = copier(args, RiskLimits::default(), info, gw.clone());

        let report = c.startup_sync().await;
        let rec = only(&report);
        assert_eq!(rec.scaled_size, Some(dec!(0.000189)));
        assert_eq!(rec.decision.as_deref(), Some("skip:below_minimum"));
        assert_eq!(rec.order_size, None);
        assert_eq!(rec.execution, None);
        assert_eq!(c.own().position("BTC"), dec!(0));
    }

    #[tokio::test]
    async fn heartbeat_skips_coins_without_mid_under_fixed_notional() {
        let info = FakeInfo::new(vec![Some(account(dec!(100000), &[]))], AccountState::default());
        let mut args = test_args();
        args.scaling = ScalingMode::FixedNotional { usd: dec!(100) };
        let mut c = copier(args, RiskLimits::default(), info, Recording::default());
        c.startup_sync().await;
        assert!(c.last_mid.is_empty());

        let Some(past) = Instant::now().checked_sub(HEARTBEAT_EVERY) else { return };
        c.last_heartbeat = past;
        c.maybe_heartbeat();
        assert!(c.last_heartbeat.elapsed() < HEARTBEAT_EVERY);
    }

    #[tokio::test]
    async fn daily_limit_blocks_second_trade() {
        let info = FakeInfo::new(
            vec![
                Some(account(dec!(100000), &[("BTC", dec!(0.01))])),
                Some(account(dec!(100000), &[("BTC", dec!(0.02))])),
            ],
            account(dec!(10000), &[]),
        );
        let gw = Recording::default();
        let limits = RiskLimits { max_daily_trades: 1, ..RiskLimits::default() };
        let mut args = live_args();
        args.scaling = ScalingMode::FixedRatio { ratio: dec!(1) };
        let mut c = copier(args, limits, info, gw.clone());

        let first = c.startup_sync().await;
        assert_eq!(first.submitted(), 1);
        let second = c.run_tick().await;
        let rec = only(&second);
        assert_eq!(rec.event_kind, Some(crate::domain::ChangeKind::Increase));
        assert_eq!(rec.decision.as_deref(), Some("block:daily_limit"));
        assert_eq!(gw.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_submission_is_not_retried() {
        let info = FakeInfo::new(
            vec![
                Some(account(dec!(100000), &[("BTC", dec!(0.01))])),
                Some(account(dec!(100000), &[("BTC", dec!(0.01))])),
            ],
            account(dec!(10000), &[]),
        );
        let gw = Recording { fail: true, ..Default::default() };
        let mut args = live_args();
        args.scaling = ScalingMode::FixedRatio { ratio: dec!(1) };
        let mut c = copier(args, RiskLimits::default(), info, gw.clone());

        let first = c.startup_sync().await;
        assert!(matches!(only(&first).execution, Some(ExecutionResult::Failed(ref r)) if r.contains("insufficient margin")));
        let second = c.run_tick().await;
        assert_eq!(only(&second).event_kind, None);
        assert_eq!(gw.sent.lock().unwrap().len(), 1);
        assert_eq!(c.counter().count, 1);
    }

    #[tokio::test]
    async fn fetch_error_skips_tick_without_touching_store() {
        let info = FakeInfo::new(
            vec![Some(account(dec!(100000), &[])), None, Some(account(dec!(100000), &[("BTC", dec!(1.0))]))],
            AccountState::default(),
        );
        let mut c = copier(test_args(), RiskLimits::default(), info, Recording::default());

        c.startup_sync().await;
        let skipped = c.run_tick().await;
        assert!(matches!(skipped.outcome, TickOutcome::Skipped { .. }));
        assert_eq!(c.store().get("BTC").map(|s| s.signed_size), Some(dec!(0)));

        let report = c.run_tick().await;
        assert_eq!(only(&report).event_kind, Some(crate::domain::ChangeKind::Open));
    }

    #[tokio::test]
    async fn missing_book_only_drops_that_coin() {
        let mut info = FakeInfo::new(
            vec![Some(account(dec!(100000), &[("BTC", dec!(0.5)), ("ETH", dec!(2))]))],
            AccountState::default(),
        );
        info.books.remove("ETH");
        let mut args = test_args();
        args.coins = vec!["BTC".to_string(), "ETH".to_string()];
        let mut c = copier(args, RiskLimits::default(), info, Recording::default());

        let report = c.startup_sync().await;
        let recs = report.records();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].coin, "BTC");
        assert_eq!(recs[0].execution, Some(ExecutionResult::DryRunLogged));
        assert_eq!(recs[1].coin, "ETH");
        assert!(recs[1].note.as_deref().unwrap_or_default().starts_with("book"));
        assert_eq!(recs[1].execution, None);
    }

    #[tokio::test]
    async fn wildcard_follows_every_target_coin_sorted() {
        let info = FakeInfo::new(
            vec![
                Some(account(dec!(100000), &[("ETH", dec!(2)), ("BTC", dec!(0.1))])),
                Some(account(dec!(100000), &[("ETH", dec!(2))])),
            ],
            AccountState::default(),
        );
        let mut args = test_args();
        args.coins = vec!["*".to_string()];
        args.sync_on_startup = false;
        let mut c = copier(args, RiskLimits::default(), info, Recording::default());

        c.startup_sync().await;
        let report = c.run_tick().await;
        let coins: Vec<&str> = report.records().iter().map(|r| r.coin.as_str()).collect();
        assert_eq!(coins, vec!["BTC", "ETH"]);
        assert_eq!(report.records()[0].event_kind, Some(crate::domain::ChangeKind::Close));
        assert_eq!(report.records()[1].event_kind, None);
    }

    #[tokio::test]
    async fn tick_stream_yields_one_report_per_tick() {
        let info = FakeInfo::new(
            vec![Some(account(dec!(100000), &[])), Some(account(dec!(100000), &[("BTC", dec!(0.5))]))],
            AccountState::default(),
        );
        let c = copier(test_args(), RiskLimits::default(), info, Recording::default());
        let reports: Vec<TickReport> = c.tick_stream(Duration::from_millis(1)).take(3).collect().await;
        assert_eq!(reports.len(), 3);
        assert!(reports.iter().all(|r| !r.startup));
        assert_eq!(reports[0].records()[0].event_kind, None);
        assert_eq!(reports[1].records()[0].event_kind, Some(crate::domain::ChangeKind::Open));
        assert!(matches!(reports[2].outcome, TickOutcome::Skipped { .. }));
    }
}
