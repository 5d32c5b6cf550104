use crate::parser::proto::actions::ActionsCount;
use serde::{Deserialize, Serialize};

///
/// Block in a chain-independent format.
///
/// Whether `actions_count().total()` equals `transactions_count()`
/// depends on the chain: one action per transaction on XRP, one action
/// per operation content on Tezos (so possibly more actions than groups).
///
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    number: u64,
    transactions_count: u64,
    actions_count: ActionsCount,
}

impl Block {
    pub fn new(number: u64, transactions_count: u64, actions_count: ActionsCount) -> Block {
        Block {
            number,
            transactions_count,
            actions_count,
        }
    }

    /// block height
    #[inline]
    pub fn number(&self) -> u64 {
        self.number
    }

    #[inline]
    pub fn transactions_count(&self) -> u64 {
        self.transactions_count
    }

    #[inline]
    pub fn actions_count(&self) -> &ActionsCount {
        &self.actions_count
    }

    /// take the histogram out of the block
    pub fn into_actions_count(self) -> ActionsCount {
        self.actions_count
    }
}
