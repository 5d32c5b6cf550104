//!
//! ## Block Model
//!
//! Every chain adapter lifts its native JSON into the same `Block`:
//! - `number`: block height (`ledger_index` on XRP, `header.level` on Tezos)
//! - `transactions_count`: top-level transactions or operation groups
//! - `actions_count`: histogram of action kinds, see `ActionsCount`
//!

/// chain-independent parsed block
pub mod block;

/// histogram of action kinds with deterministic ordering
pub mod actions;
