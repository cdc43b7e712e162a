//! Token balance oracle and balance-change events.
//!
//! Vote weight is the voter's live token balance in raw minor units. The
//! engine never holds balances itself; it reads them through [`BalanceLookup`]
//! at action time and consumes pushed [`BalanceChange`] events from the token
//! contract between actions.

use dac_types::{MemberName, TokenAmount};
use std::collections::HashMap;

/// Read access to the community token's balances.
pub trait BalanceLookup {
    /// Current balance of an account, in raw minor units. Accounts with no
    /// balance row report zero.
    fn balance_of(&self, account: &MemberName) -> TokenAmount;

    /// Circulating supply of the community token, in raw minor units.
    fn total_supply(&self) -> TokenAmount;
}

/// One pushed balance movement, signed in raw minor units.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BalanceChange {
    pub account: MemberName,
    pub delta: i64,
}

impl BalanceChange {
    pub fn new(account: MemberName, delta: i64) -> Self {
        Self { account, delta }
    }
}

/// In-memory balance table for tests and local runs.
#[derive(Clone, Debug, Default)]
pub struct StaticBalances {
    balances: HashMap<MemberName, TokenAmount>,
    total_supply: TokenAmount,
}

impl StaticBalances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_supply(total_supply: TokenAmount) -> Self {
        Self {
            balances: HashMap::new(),
            total_supply,
        }
    }

    pub fn set_balance(&mut self, account: MemberName, amount: TokenAmount) {
        self.balances.insert(account, amount);
    }

    pub fn set_total_supply(&mut self, total_supply: TokenAmount) {
        self.total_supply = total_supply;
    }

    /// Apply a signed movement, keeping the table in step with the events
    /// the engine consumes. Saturates at zero rather than underflowing.
    pub fn apply(&mut self, change: &BalanceChange) {
        let current = self.balance_of(&change.account);
        let next = if change.delta >= 0 {
            current
                .checked_add(TokenAmount::new(change.delta as u64))
                .unwrap_or(current)
        } else {
            current.saturating_sub(TokenAmount::new(change.delta.unsigned_abs()))
        };
        self.balances.insert(change.account.clone(), next);
    }
}

impl BalanceLookup for StaticBalances {
    fn balance_of(&self, account: &MemberName) -> TokenAmount {
        self.balances.get(account).copied().unwrap_or(TokenAmount::ZERO)
    }

    fn total_supply(&self) -> TokenAmount {
        self.total_supply
    }
}
