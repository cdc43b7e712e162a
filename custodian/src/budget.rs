//! Periodic treasury budget allocation.
//!
//! Once per election period the community may split part of its treasury
//! between a proposal-funds account and a spending account. Like the payout
//! queue, this module only computes `Transfer` values; executing them is the
//! token ledger's job.

use crate::config::DacConfig;
use crate::error::CustodianError;
use crate::payout::Transfer;
use dac_types::{MemberName, Timestamp, TokenAmount};

/// The accounts a budget claim moves funds between.
#[derive(Clone, Copy, Debug)]
pub struct BudgetAccounts<'a> {
    pub treasury: &'a MemberName,
    pub proposal_funds: &'a MemberName,
    pub spending: &'a MemberName,
}

/// `value × percent / 10_000`, rounded half away from zero at the smallest
/// unit. Percentages are scaled by 100 (so 2.5% is 250).
pub(crate) fn percentage_of(value: TokenAmount, percent: u16) -> TokenAmount {
    let numerator = value.raw() as u128 * percent as u128;
    let quotient = numerator / 10_000;
    let remainder = numerator % 10_000;
    let rounded = if remainder * 2 >= 10_000 {
        quotient + 1
    } else {
        quotient
    };
    TokenAmount::new(rounded.min(u64::MAX as u128) as u64)
}

/// Claim the budget for the current period.
///
/// Allowed at most once per period: the previous claim must predate the
/// period start. Precedence of regimes:
/// 1. Both fixed amounts configured and their sum below the treasury
///    balance: transfer exactly the fixed amounts (ramp-down regime).
/// 2. Otherwise percentage regime: the proposal cut comes off the treasury
///    first, and the spending transfer is the remaining working balance
///    minus one minor unit so rounding residue never drains the treasury
///    to a negative.
/// A leg with no percentage or amount configured simply does not transfer.
pub fn claim_budget(
    config: &mut DacConfig,
    treasury_balance: TokenAmount,
    accounts: BudgetAccounts<'_>,
    now: Timestamp,
) -> Result<Vec<Transfer>, CustodianError> {
    if config.last_claim_budget_time >= config.last_period_time {
        return Err(CustodianError::BudgetAlreadyClaimed);
    }
    if config.prop_budget_percentage.is_none()
        && config.prop_budget_amount.is_none()
        && config.budget_percentage.is_none()
        && config.spendings_budget_amount.is_none()
    {
        return Err(CustodianError::BudgetNotConfigured);
    }

    let mut transfers = Vec::new();

    let fixed_pair = match (config.prop_budget_amount, config.spendings_budget_amount) {
        (Some(prop), Some(spend)) => prop
            .checked_add(spend)
            .filter(|sum| *sum < treasury_balance)
            .map(|_| (prop, spend)),
        _ => None,
    };

    if let Some((prop, spend)) = fixed_pair {
        if !prop.is_zero() {
            transfers.push(Transfer {
                from: accounts.treasury.clone(),
                to: accounts.proposal_funds.clone(),
                amount: prop,
                memo: "period proposal budget".to_string(),
            });
        }
        if !spend.is_zero() {
            transfers.push(Transfer {
                from: accounts.treasury.clone(),
                to: accounts.spending.clone(),
                amount: spend,
                memo: "period budget".to_string(),
            });
        }
    } else {
        let mut working = treasury_balance;

        let proposal_amount = match (config.prop_budget_percentage, config.prop_budget_amount) {
            (Some(percent), _) => Some(percentage_of(treasury_balance, percent)),
            (None, Some(amount)) => Some(amount),
            (None, None) => None,
        };
        if let Some(amount) = proposal_amount {
            let amount = amount.min(working);
            if !amount.is_zero() {
                transfers.push(Transfer {
                    from: accounts.treasury.clone(),
                    to: accounts.proposal_funds.clone(),
                    amount,
                    memo: "period proposal budget".to_string(),
                });
                working = working.saturating_sub(amount);
            }
        }

        if config.budget_percentage.is_some() {
            let amount = working.saturating_sub(TokenAmount::new(1));
            if !amount.is_zero() {
                transfers.push(Transfer {
                    from: accounts.treasury.clone(),
                    to: accounts.spending.clone(),
                    amount,
                    memo: "period budget".to_string(),
                });
            }
        }
    }

    config.last_claim_budget_time = now;
    tracing::info!(
        treasury = %treasury_balance,
        transfers = transfers.len(),
        "budget claimed"
    );
    Ok(transfers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(name: &str) -> MemberName {
        MemberName::new(name)
    }

    fn accounts<'a>(
        treasury: &'a MemberName,
        prop: &'a MemberName,
        spend: &'a MemberName,
    ) -> BudgetAccounts<'a> {
        BudgetAccounts {
            treasury,
            proposal_funds: prop,
            spending: spend,
        }
    }

    fn claimable_config() -> DacConfig {
        let mut config = DacConfig::default();
        config.last_period_time = Timestamp::new(1_000);
        config.last_claim_budget_time = Timestamp::new(500);
        config
    }

    #[test]
    fn test_percentage_rounds_half_away_from_zero() {
        // 1 raw unit at 50.00%: 0.5 rounds up to 1.
        assert_eq!(percentage_of(TokenAmount::new(1), 5_000), TokenAmount::new(1));
        // 1 raw unit at 49.99% rounds down to 0.
        assert_eq!(percentage_of(TokenAmount::new(1), 4_999), TokenAmount::ZERO);
        // 12.5% of 1000.0000.
        assert_eq!(
            percentage_of(TokenAmount::from_whole(1_000), 1_250),
            TokenAmount::new(1_250_000)
        );
    }

    #[test]
    fn test_claim_twice_in_same_period_fails() {
        let treasury = member("treasury");
        let prop = member("propfunds");
        let spend = member("spending");
        let mut config = claimable_config();
        config.budget_percentage = Some(1_000);

        claim_budget(
            &mut config,
            TokenAmount::from_whole(100),
            accounts(&treasury, &prop, &spend),
            Timestamp::new(1_100),
        )
        .unwrap();

        let err = claim_budget(
            &mut config,
            TokenAmount::from_whole(100),
            accounts(&treasury, &prop, &spend),
            Timestamp::new(1_200),
        )
        .unwrap_err();
        assert!(matches!(err, CustodianError::BudgetAlreadyClaimed));
    }

    #[test]
    fn test_claim_allowed_again_after_new_period() {
        let treasury = member("treasury");
        let prop = member("propfunds");
        let spend = member("spending");
        let mut config = claimable_config();
        config.budget_percentage = Some(1_000);

        claim_budget(
            &mut config,
            TokenAmount::from_whole(100),
            accounts(&treasury, &prop, &spend),
            Timestamp::new(1_100),
        )
        .unwrap();

        // Period advances: the window reopens.
        config.last_period_time = Timestamp::new(2_000);
        assert!(claim_budget(
            &mut config,
            TokenAmount::from_whole(100),
            accounts(&treasury, &prop, &spend),
            Timestamp::new(2_100),
        )
        .is_ok());
    }

    #[test]
    fn test_unconfigured_budget_is_an_error() {
        let treasury = member("treasury");
        let prop = member("propfunds");
        let spend = member("spending");
        let mut config = claimable_config();

        let err = claim_budget(
            &mut config,
            TokenAmount::from_whole(100),
            accounts(&treasury, &prop, &spend),
            Timestamp::new(1_100),
        )
        .unwrap_err();
        assert!(matches!(err, CustodianError::BudgetNotConfigured));
    }

    #[test]
    fn test_fixed_amounts_below_treasury_transfer_exactly() {
        let treasury = member("treasury");
        let prop = member("propfunds");
        let spend = member("spending");
        let mut config = claimable_config();
        config.prop_budget_amount = Some(TokenAmount::from_whole(10));
        config.spendings_budget_amount = Some(TokenAmount::from_whole(30));
        // Percentages present too: the fixed regime still wins.
        config.budget_percentage = Some(9_000);

        let transfers = claim_budget(
            &mut config,
            TokenAmount::from_whole(100),
            accounts(&treasury, &prop, &spend),
            Timestamp::new(1_100),
        )
        .unwrap();

        assert_eq!(transfers.len(), 2);
        assert_eq!(transfers[0].to, prop);
        assert_eq!(transfers[0].amount, TokenAmount::from_whole(10));
        assert_eq!(transfers[1].to, spend);
        assert_eq!(transfers[1].amount, TokenAmount::from_whole(30));
    }

    #[test]
    fn test_fixed_amounts_exceeding_treasury_fall_back_to_percentages() {
        let treasury = member("treasury");
        let prop = member("propfunds");
        let spend = member("spending");
        let mut config = claimable_config();
        config.prop_budget_amount = Some(TokenAmount::from_whole(80));
        config.spendings_budget_amount = Some(TokenAmount::from_whole(80));
        config.prop_budget_percentage = Some(1_000);
        config.budget_percentage = Some(5_000);

        let transfers = claim_budget(
            &mut config,
            TokenAmount::from_whole(100),
            accounts(&treasury, &prop, &spend),
            Timestamp::new(1_100),
        )
        .unwrap();

        // 10% of 100.0000 to proposals, then all but one raw unit of the
        // remaining 90.0000 to spending.
        assert_eq!(transfers.len(), 2);
        assert_eq!(transfers[0].amount, TokenAmount::from_whole(10));
        assert_eq!(transfers[1].amount, TokenAmount::new(899_999));
    }

    #[test]
    fn test_proposal_leg_alone_without_spending_percentage() {
        let treasury = member("treasury");
        let prop = member("propfunds");
        let spend = member("spending");
        let mut config = claimable_config();
        config.prop_budget_percentage = Some(2_500);

        let transfers = claim_budget(
            &mut config,
            TokenAmount::from_whole(40),
            accounts(&treasury, &prop, &spend),
            Timestamp::new(1_100),
        )
        .unwrap();

        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].to, prop);
        assert_eq!(transfers[0].amount, TokenAmount::from_whole(10));
        assert_eq!(config.last_claim_budget_time, Timestamp::new(1_100));
    }

    #[test]
    fn test_empty_treasury_claims_without_transfers() {
        let treasury = member("treasury");
        let prop = member("propfunds");
        let spend = member("spending");
        let mut config = claimable_config();
        config.budget_percentage = Some(5_000);

        let transfers = claim_budget(
            &mut config,
            TokenAmount::ZERO,
            accounts(&treasury, &prop, &spend),
            Timestamp::new(1_100),
        )
        .unwrap();
        assert!(transfers.is_empty());
        // The window still closes.
        assert_eq!(config.last_claim_budget_time, Timestamp::new(1_100));
    }
}
