// ===============================
// src/posttrade.rs
// ===============================
use tracing::{debug, info, warn};

use crate::domain::{CoinRecord, ExecutionResult, TickOutcome, TickReport};

/// Ringkasan satu tick ke log. Record tanpa event cukup di level debug.
pub fn report(tr: &TickReport) {
    let records = match &tr.outcome {
        TickOutcome::Skipped { reason } => {
            warn!(startup = tr.startup, %reason, "TICK SKIPPED");
            return;
        }
        TickOutcome::Completed { records, .. } => records,
    };
    for r in records {
        log_record(r);
    }
    let events = records.iter().filter(|r| r.event_kind.is_some()).count();
    if events > 0 || tr.startup {
        info!(startup = tr.startup, coins = records.len(), events, submitted = tr.submitted(), "tick done");
    }
}

fn log_record(r: &CoinRecord) {
    let Some(kind) = r.event_kind else {
        debug!(coin = %r.coin, "no change");
        return;
    };
    let decision = r.decision.as_deref().unwrap_or("-");
    match &r.execution {
        Some(ExecutionResult::Submitted(oid)) => info!(
            coin = %r.coin, kind = kind.as_str(), size = ?r.order_size, px = ?r.final_price, %oid, "SUBMITTED"
        ),
        Some(ExecutionResult::DryRunLogged) => info!(
            coin = %r.coin, kind = kind.as_str(), size = ?r.order_size, px = ?r.final_price, "DRY RUN"
        ),
        Some(ExecutionResult::Failed(reason)) => warn!(
            coin = %r.coin, kind = kind.as_str(), size = ?r.order_size, %reason, "FAILED"
        ),
        None if decision.starts_with("block") => warn!(coin = %r.coin, kind = kind.as_str(), %decision, "BLOCK"),
        None => info!(
            coin = %r.coin, kind = kind.as_str(), scaled = ?r.scaled_size, %decision, note = ?r.note, "no order"
        ),
    }
}
