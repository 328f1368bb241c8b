// ── In-memory stores ──

mod ledger;

pub use ledger::NotificationLedger;
