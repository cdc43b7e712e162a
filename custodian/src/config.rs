//! Per-community configuration and running accumulators.
//!
//! The original contract kept this as a dynamic key/value singleton; here it
//! is a strongly-typed struct per community. Keys that can be unset
//! independently (the budget settings, the whitelist requirement) are
//! explicit `Option` fields. The running vote totals live alongside the
//! settings because every voting path mutates both.

use crate::error::CustodianError;
use dac_types::{Timestamp, TokenAmount};
use serde::{Deserialize, Serialize};

/// Hard cap on the custodian set size.
pub const MAX_NUM_ELECTED: u8 = 21;
/// Periods may not exceed three years.
pub const MAX_PERIOD_LENGTH_SECS: u32 = 3 * 365 * 24 * 60 * 60;
/// Minimum configurable token-supply threshold (1000 whole tokens, raw).
pub const MIN_SUPPLY_THRESHOLD: u64 = 1000 * TokenAmount::UNITS_PER_WHOLE;

/// Configuration and bookkeeping for one community.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DacConfig {
    // ── Settings ─────────────────────────────────────────────────────────
    /// Number of custodians elected each period.
    pub numelected: u8,
    /// Maximum candidates one ballot may list.
    pub maxvotes: u8,
    /// Custodian-count thresholds for the three permission tiers.
    pub auth_threshold_high: u8,
    pub auth_threshold_mid: u8,
    pub auth_threshold_low: u8,
    /// Length of one election period in seconds.
    pub period_length: u32,
    /// Delay between candidate selection and custodian installation.
    pub pending_period_delay: u32,
    /// Vote quorum (percent of supply) required for the first election.
    pub initial_vote_quorum_percent: u32,
    /// Vote quorum (percent of supply) for every later election.
    pub vote_quorum_percent: u32,
    /// Minimum token supply below which period advance is refused.
    pub token_supply_threshold: u64,
    /// Stake each candidate must lock to nominate (zero disables).
    pub lockup_amount: TokenAmount,
    /// Seconds before locked stake can be released.
    pub lockup_release_delay: u32,
    /// Ceiling on a candidate's requested pay.
    pub requested_pay_max: TokenAmount,
    /// Spending-budget percentage, scaled by 100 (250 = 2.5%).
    pub budget_percentage: Option<u16>,
    /// Proposal-budget percentage, scaled by 100.
    pub prop_budget_percentage: Option<u16>,
    /// Fixed proposal-budget amount (ramp-down regime).
    pub prop_budget_amount: Option<TokenAmount>,
    /// Fixed spending-budget amount (ramp-down regime).
    pub spendings_budget_amount: Option<TokenAmount>,
    /// Whether nomination requires a whitelist entry.
    pub requires_whitelist: Option<bool>,

    // ── Running accumulators ─────────────────────────────────────────────
    /// Total weight of all cast votes (for quorum checks).
    pub total_weight_of_votes: i64,
    /// Total weight currently applied to candidates.
    pub total_votes_on_candidates: i64,
    /// Count of active candidate rows.
    pub number_active_candidates: u32,
    /// Latched once the initial vote quorum has been met.
    pub met_initial_votes_threshold: bool,
    /// Start of the current period.
    pub last_period_time: Timestamp,
    /// When the pending-custodian set was selected.
    pub pending_period_time: Timestamp,
    /// Last successful budget claim.
    pub last_claim_budget_time: Timestamp,
}

impl Default for DacConfig {
    fn default() -> Self {
        Self {
            numelected: 3,
            maxvotes: 5,
            auth_threshold_high: 2,
            auth_threshold_mid: 2,
            auth_threshold_low: 1,
            period_length: 7 * 24 * 60 * 60,
            pending_period_delay: 5 * 60,
            initial_vote_quorum_percent: 0,
            vote_quorum_percent: 0,
            token_supply_threshold: MIN_SUPPLY_THRESHOLD,
            lockup_amount: TokenAmount::ZERO,
            lockup_release_delay: 0,
            requested_pay_max: TokenAmount::ZERO,
            budget_percentage: None,
            prop_budget_percentage: None,
            prop_budget_amount: None,
            spendings_budget_amount: None,
            requires_whitelist: None,
            total_weight_of_votes: 0,
            total_votes_on_candidates: 0,
            number_active_candidates: 0,
            met_initial_votes_threshold: false,
            last_period_time: Timestamp::EPOCH,
            pending_period_time: Timestamp::EPOCH,
            last_claim_budget_time: Timestamp::EPOCH,
        }
    }
}

/// The settable subset of [`DacConfig`], applied wholesale by
/// `update_config`. Accumulators are never touched by configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConfigUpdate {
    pub numelected: u8,
    pub maxvotes: u8,
    pub auth_threshold_high: u8,
    pub auth_threshold_mid: u8,
    pub auth_threshold_low: u8,
    pub period_length: u32,
    pub pending_period_delay: u32,
    pub initial_vote_quorum_percent: u32,
    pub vote_quorum_percent: u32,
    pub token_supply_threshold: u64,
    pub lockup_amount: TokenAmount,
    pub lockup_release_delay: u32,
    pub requested_pay_max: TokenAmount,
}

impl DacConfig {
    /// Apply a full configuration update after validating every constraint.
    pub fn apply_update(&mut self, update: &ConfigUpdate) -> Result<(), CustodianError> {
        validate_update(update)?;
        self.numelected = update.numelected;
        self.maxvotes = update.maxvotes;
        self.auth_threshold_high = update.auth_threshold_high;
        self.auth_threshold_mid = update.auth_threshold_mid;
        self.auth_threshold_low = update.auth_threshold_low;
        self.period_length = update.period_length;
        self.pending_period_delay = update.pending_period_delay;
        self.initial_vote_quorum_percent = update.initial_vote_quorum_percent;
        self.vote_quorum_percent = update.vote_quorum_percent;
        self.token_supply_threshold = update.token_supply_threshold;
        self.lockup_amount = update.lockup_amount;
        self.lockup_release_delay = update.lockup_release_delay;
        self.requested_pay_max = update.requested_pay_max;
        Ok(())
    }

    /// Set max votes, custodian count, and a single auth threshold applied
    /// to all three tiers.
    pub fn set_governance_params(
        &mut self,
        maxvotes: u8,
        numelected: u8,
        auth_threshold: u8,
    ) -> Result<(), CustodianError> {
        if numelected > MAX_NUM_ELECTED {
            return Err(CustodianError::InvalidNumElected {
                got: numelected,
                max: MAX_NUM_ELECTED,
            });
        }
        if maxvotes > numelected {
            return Err(CustodianError::InvalidMaxVotes {
                maxvotes,
                numelected,
            });
        }
        if auth_threshold > numelected {
            return Err(CustodianError::AuthThresholdTooHigh {
                threshold: auth_threshold,
                numelected,
            });
        }
        self.maxvotes = maxvotes;
        self.numelected = numelected;
        self.auth_threshold_high = auth_threshold;
        self.auth_threshold_mid = auth_threshold;
        self.auth_threshold_low = auth_threshold;
        Ok(())
    }

    pub fn set_period_length(&mut self, period_length: u32) -> Result<(), CustodianError> {
        if period_length > MAX_PERIOD_LENGTH_SECS {
            return Err(CustodianError::InvalidPeriodLength {
                got: period_length,
                max: MAX_PERIOD_LENGTH_SECS,
            });
        }
        if self.pending_period_delay > period_length {
            return Err(CustodianError::InvalidPendingDelay {
                delay: self.pending_period_delay,
                period: period_length,
            });
        }
        self.period_length = period_length;
        Ok(())
    }

    pub fn set_pending_period_delay(&mut self, delay: u32) -> Result<(), CustodianError> {
        if delay > self.period_length {
            return Err(CustodianError::InvalidPendingDelay {
                delay,
                period: self.period_length,
            });
        }
        self.pending_period_delay = delay;
        Ok(())
    }

    pub fn set_initial_vote_quorum(&mut self, percent: u32) -> Result<(), CustodianError> {
        if percent >= 100 {
            return Err(CustodianError::InvalidInitialQuorum(percent));
        }
        self.initial_vote_quorum_percent = percent;
        Ok(())
    }

    pub fn set_vote_quorum(&mut self, percent: u32) -> Result<(), CustodianError> {
        if percent >= 100 {
            return Err(CustodianError::InvalidVoteQuorum(percent));
        }
        self.vote_quorum_percent = percent;
        Ok(())
    }

    pub fn set_token_supply_threshold(&mut self, raw: u64) -> Result<(), CustodianError> {
        if raw < MIN_SUPPLY_THRESHOLD {
            return Err(CustodianError::InvalidSupplyThreshold {
                got: raw,
                min: MIN_SUPPLY_THRESHOLD,
            });
        }
        self.token_supply_threshold = raw;
        Ok(())
    }

    /// Whether nomination requires a whitelist entry.
    pub fn whitelist_required(&self) -> bool {
        self.requires_whitelist.unwrap_or(false)
    }
}

fn validate_update(update: &ConfigUpdate) -> Result<(), CustodianError> {
    if update.numelected > MAX_NUM_ELECTED {
        return Err(CustodianError::InvalidNumElected {
            got: update.numelected,
            max: MAX_NUM_ELECTED,
        });
    }
    if update.maxvotes > update.numelected {
        return Err(CustodianError::InvalidMaxVotes {
            maxvotes: update.maxvotes,
            numelected: update.numelected,
        });
    }
    if update.period_length > MAX_PERIOD_LENGTH_SECS {
        return Err(CustodianError::InvalidPeriodLength {
            got: update.period_length,
            max: MAX_PERIOD_LENGTH_SECS,
        });
    }
    if update.pending_period_delay > update.period_length {
        return Err(CustodianError::InvalidPendingDelay {
            delay: update.pending_period_delay,
            period: update.period_length,
        });
    }
    if update.initial_vote_quorum_percent >= 100 {
        return Err(CustodianError::InvalidInitialQuorum(
            update.initial_vote_quorum_percent,
        ));
    }
    if update.vote_quorum_percent >= 100 {
        return Err(CustodianError::InvalidVoteQuorum(update.vote_quorum_percent));
    }
    if update.token_supply_threshold < MIN_SUPPLY_THRESHOLD {
        return Err(CustodianError::InvalidSupplyThreshold {
            got: update.token_supply_threshold,
            min: MIN_SUPPLY_THRESHOLD,
        });
    }
    if update.auth_threshold_high > update.numelected {
        return Err(CustodianError::AuthThresholdTooHigh {
            threshold: update.auth_threshold_high,
            numelected: update.numelected,
        });
    }
    if update.auth_threshold_mid > update.auth_threshold_high {
        return Err(CustodianError::AuthMidAboveHigh {
            mid: update.auth_threshold_mid,
            high: update.auth_threshold_high,
        });
    }
    if update.auth_threshold_low > update.auth_threshold_mid {
        return Err(CustodianError::AuthLowAboveMid {
            low: update.auth_threshold_low,
            mid: update.auth_threshold_mid,
        });
    }
    Ok(())
}
