//! Balance update ordering for transfers
//!
//! Two transfers between the same pair of accounts must touch the account
//! rows in the same order, whichever direction each one moves money in.
//! Otherwise A->B and B->A can each hold one row and wait for the other.
//! The rule is fixed: the account with the larger id is updated first.

use serde::{Deserialize, Serialize};

use super::TransferTxParams;

/// A signed change to apply to one account's balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceUpdate {
    pub account_id: i64,
    pub delta: i64,
}

/// Order the two balance updates of a transfer, larger account id first
pub fn lock_order(from_account_id: i64, to_account_id: i64, amount: i64) -> [BalanceUpdate; 2] {
    let debit = BalanceUpdate {
        account_id: from_account_id,
        delta: -amount,
    };
    let credit = BalanceUpdate {
        account_id: to_account_id,
        delta: amount,
    };

    if from_account_id > to_account_id {
        [debit, credit]
    } else {
        [credit, debit]
    }
}

impl TransferTxParams {
    /// Balance updates for this transfer in acquisition order
    pub fn balance_updates(&self) -> [BalanceUpdate; 2] {
        lock_order(self.from_account_id, self.to_account_id, self.amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_larger_source_goes_first() {
        let [first, second] = lock_order(9, 3, 25);
        assert_eq!(first, BalanceUpdate { account_id: 9, delta: -25 });
        assert_eq!(second, BalanceUpdate { account_id: 3, delta: 25 });
    }

    #[test]
    fn test_larger_destination_goes_first() {
        let [first, second] = lock_order(3, 9, 25);
        assert_eq!(first, BalanceUpdate { account_id: 9, delta: 25 });
        assert_eq!(second, BalanceUpdate { account_id: 3, delta: -25 });
    }

    #[test]
    fn test_both_directions_share_account_order() {
        for (a, b) in [(1, 2), (2, 1), (100, 7), (i64::MAX, 1)] {
            let forward = lock_order(a, b, 10);
            let backward = lock_order(b, a, 10);
            assert_eq!(forward[0].account_id, backward[0].account_id);
            assert_eq!(forward[1].account_id, backward[1].account_id);
            assert_eq!(forward[0].account_id, a.max(b));
        }
    }

    #[test]
    fn test_deltas_cancel_out() {
        let [first, second] = TransferTxParams::new(5, 6, 42).balance_updates();
        assert_eq!(first.delta + second.delta, 0);
    }
}
