//! Periodic election state machine.
//!
//! A community cycles through Idle → ReadyToElect → Pending → Elected,
//! driven entirely by `advance_period`. The first call of a cycle selects
//! the top-ranked candidates into a pending set; a second call after the
//! pending delay pays the outgoing custodians, installs the pending set,
//! and emits the new authority structure. Anyone may call it; the time
//! window, quorum, and supply gates are the only admission control.

use crate::budget::{self, BudgetAccounts};
use crate::config::DacConfig;
use crate::error::CustodianError;
use crate::payout::{PayoutQueue, Transfer};
use crate::registry::CandidateRegistry;
use dac_types::{MemberName, Timestamp, TokenAmount};
use serde::{Deserialize, Serialize};

/// A serving (or pending) custodian, snapshotted from the candidate row at
/// selection time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Custodian {
    pub name: MemberName,
    pub requested_pay: TokenAmount,
    pub total_vote_power: u64,
    pub number_voters: u32,
    pub avg_vote_time_stamp: Timestamp,
    pub rank: u64,
}

/// Where a community currently sits in the election cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElectionState {
    Idle,
    ReadyToElect,
    Pending,
    Elected,
}

/// The permission structure the custodian-controlled account should carry
/// after an election: four nested tiers, each satisfied by `threshold`
/// custodian signatures.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityUpdate {
    pub account: MemberName,
    /// Sorted custodian accounts, weight 1 each.
    pub custodians: Vec<MemberName>,
    pub threshold_high: u8,
    pub threshold_mid: u8,
    pub threshold_low: u8,
    pub threshold_one: u8,
}

/// What one `advance_period` call did.
#[derive(Clone, Debug)]
pub enum PeriodOutcome {
    /// Phase one: candidates selected, waiting out the pending delay.
    CustodiansPrepared { pending: Vec<Custodian> },
    /// Phase two: pay distributed, custodian set installed.
    CustodiansInstalled {
        custodians: Vec<MemberName>,
        mean_pay: TokenAmount,
        authority: AuthorityUpdate,
        budget_transfers: Vec<Transfer>,
    },
}

/// Per-community election engine state.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ElectionScheduler {
    custodians: Vec<Custodian>,
    pending: Vec<Custodian>,
    /// Completed promotions. The first promotion after an administrative
    /// appointment keeps the appointed set in place.
    elections_completed: u64,
}

impl ElectionScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn custodians(&self) -> &[Custodian] {
        &self.custodians
    }

    pub fn pending_custodians(&self) -> &[Custodian] {
        &self.pending
    }

    pub fn is_custodian(&self, name: &MemberName) -> bool {
        self.custodians.iter().any(|c| &c.name == name)
    }

    pub fn state(&self, config: &DacConfig, now: Timestamp) -> ElectionState {
        if !self.pending.is_empty() {
            ElectionState::Pending
        } else if config.last_period_time.elapsed_since(now) >= config.period_length as u64 {
            ElectionState::ReadyToElect
        } else if self.custodians.is_empty() {
            ElectionState::Idle
        } else {
            ElectionState::Elected
        }
    }

    /// Drive the election cycle one step forward.
    ///
    /// With no pending set this runs selection (phase one); with a pending
    /// set it runs promotion (phase two). Both phases enforce the quorum
    /// and supply gates, so a community that loses engagement stalls in
    /// whatever state it is in.
    #[allow(clippy::too_many_arguments)]
    pub fn advance_period(
        &mut self,
        config: &mut DacConfig,
        registry: &CandidateRegistry,
        payouts: &mut PayoutQueue,
        authority_account: &MemberName,
        total_supply: TokenAmount,
        treasury_balance: TokenAmount,
        budget_accounts: BudgetAccounts<'_>,
        now: Timestamp,
    ) -> Result<PeriodOutcome, CustodianError> {
        Self::check_quorum(config, total_supply)?;
        Self::check_supply(config, total_supply)?;
        config.met_initial_votes_threshold = true;

        if self.pending.is_empty() {
            let elapsed = config.last_period_time.elapsed_since(now);
            if elapsed < config.period_length as u64 {
                return Err(CustodianError::PeriodTooEarly {
                    period_length: config.period_length,
                    elapsed,
                });
            }
            self.prepare_custodians(config, registry)?;
            config.pending_period_time = now;
            tracing::info!(
                pending = self.pending.len(),
                "custodians prepared, awaiting pending delay"
            );
            Ok(PeriodOutcome::CustodiansPrepared {
                pending: self.pending.clone(),
            })
        } else {
            let elapsed = config.pending_period_time.elapsed_since(now);
            if elapsed < config.pending_period_delay as u64 {
                return Err(CustodianError::PendingPeriodTooEarly {
                    delay: config.pending_period_delay,
                    elapsed,
                });
            }

            // Pay the outgoing custodians for the period that just passed,
            // before the new set takes their seats.
            let mean_pay = mean_requested_pay(&self.custodians, config.requested_pay_max);
            if !mean_pay.is_zero() {
                for cust in &self.custodians {
                    payouts.accumulate(&cust.name, mean_pay)?;
                }
            }

            if self.elections_completed == 0 && !self.custodians.is_empty() {
                // First elected set after an administrative appointment:
                // the appointed custodians serve out this period too.
                self.pending.clear();
            } else {
                self.custodians = std::mem::take(&mut self.pending);
            }
            self.elections_completed += 1;
            config.last_period_time = now;

            let authority = self.build_authority_update(config, authority_account);

            let budget_configured = config.budget_percentage.is_some()
                || config.prop_budget_percentage.is_some()
                || config.prop_budget_amount.is_some()
                || config.spendings_budget_amount.is_some();
            let budget_transfers = if budget_configured {
                match budget::claim_budget(config, treasury_balance, budget_accounts, now) {
                    Ok(transfers) => transfers,
                    Err(CustodianError::BudgetAlreadyClaimed) => Vec::new(),
                    Err(other) => return Err(other),
                }
            } else {
                Vec::new()
            };

            tracing::info!(
                custodians = self.custodians.len(),
                %mean_pay,
                elections = self.elections_completed,
                "custodians installed"
            );
            Ok(PeriodOutcome::CustodiansInstalled {
                custodians: self.custodians.iter().map(|c| c.name.clone()).collect(),
                mean_pay,
                authority,
                budget_transfers,
            })
        }
    }

    /// Seed the custodian set directly. Only allowed while no custodian is
    /// serving, so an election can never be overridden.
    pub fn appoint(
        &mut self,
        names: &[MemberName],
        registry: &CandidateRegistry,
    ) -> Result<(), CustodianError> {
        if !self.custodians.is_empty() {
            return Err(CustodianError::CustodiansNotEmpty);
        }
        let mut appointed = Vec::with_capacity(names.len());
        for name in names {
            let requested_pay = registry
                .get(name)
                .map(|cand| cand.requested_pay)
                .unwrap_or(TokenAmount::ZERO);
            appointed.push(Custodian {
                name: name.clone(),
                requested_pay,
                total_vote_power: 0,
                number_voters: 0,
                avg_vote_time_stamp: Timestamp::EPOCH,
                rank: 0,
            });
        }
        appointed.sort_by(|a, b| a.name.cmp(&b.name));
        self.custodians = appointed;
        tracing::info!(custodians = self.custodians.len(), "custodians appointed");
        Ok(())
    }

    /// Remove a serving custodian. The seat stays empty until the next
    /// promotion.
    pub fn resign(&mut self, custodian: &MemberName) -> Result<Custodian, CustodianError> {
        let idx = self
            .custodians
            .iter()
            .position(|c| &c.name == custodian)
            .ok_or_else(|| CustodianError::CustodianNotFound(custodian.clone()))?;
        let removed = self.custodians.remove(idx);
        tracing::info!(custodian = %removed.name, "custodian resigned");
        Ok(removed)
    }

    fn check_quorum(config: &DacConfig, total_supply: TokenAmount) -> Result<(), CustodianError> {
        let weight = config.total_weight_of_votes.max(0) as u128;
        let supply = total_supply.raw() as u128;
        if config.met_initial_votes_threshold {
            // engagement% > quorum%  ⇔  weight × 100 > supply × quorum
            if weight * 100 <= supply * config.vote_quorum_percent as u128 {
                return Err(CustodianError::EngagementTooLow {
                    required: config.vote_quorum_percent,
                });
            }
        } else if weight * 100 <= supply * config.initial_vote_quorum_percent as u128 {
            return Err(CustodianError::EngagementTooLowToActivate {
                required: config.initial_vote_quorum_percent,
            });
        }
        Ok(())
    }

    fn check_supply(config: &DacConfig, total_supply: TokenAmount) -> Result<(), CustodianError> {
        if total_supply.raw() < config.token_supply_threshold {
            return Err(CustodianError::SupplyTooLow {
                supply: total_supply.raw(),
                threshold: config.token_supply_threshold,
            });
        }
        Ok(())
    }

    fn prepare_custodians(
        &mut self,
        config: &DacConfig,
        registry: &CandidateRegistry,
    ) -> Result<(), CustodianError> {
        let ranked = registry.ranked_active();
        if ranked.len() < config.numelected as usize {
            return Err(CustodianError::NotEnoughCandidates {
                required: config.numelected,
            });
        }
        self.pending = ranked
            .into_iter()
            .take(config.numelected as usize)
            .map(|cand| Custodian {
                name: cand.name.clone(),
                requested_pay: cand.requested_pay,
                total_vote_power: cand.total_vote_power,
                number_voters: cand.number_voters,
                avg_vote_time_stamp: cand.avg_vote_time_stamp,
                rank: cand.rank,
            })
            .collect();
        Ok(())
    }

    fn build_authority_update(&self, config: &DacConfig, account: &MemberName) -> AuthorityUpdate {
        let mut custodians: Vec<MemberName> =
            self.custodians.iter().map(|c| c.name.clone()).collect();
        custodians.sort();
        // A threshold above the installed set's size could never be
        // satisfied and would lock the account, so each tier is capped at
        // the set size. Capping preserves high >= mid >= low.
        let cap = custodians.len().clamp(1, u8::MAX as usize) as u8;
        AuthorityUpdate {
            account: account.clone(),
            custodians,
            threshold_high: config.auth_threshold_high.clamp(1, cap),
            threshold_mid: config.auth_threshold_mid.clamp(1, cap),
            threshold_low: config.auth_threshold_low.clamp(1, cap),
            threshold_one: 1,
        }
    }
}

/// Mean requested pay across the custodians whose request does not exceed
/// the configured maximum; custodians above the limit are excluded from the
/// mean entirely. Rounded half away from zero at the smallest unit.
pub(crate) fn mean_requested_pay(custodians: &[Custodian], requested_pay_max: TokenAmount) -> TokenAmount {
    let mut total: u128 = 0;
    let mut count: u128 = 0;
    for cust in custodians {
        if cust.requested_pay <= requested_pay_max {
            total += cust.requested_pay.raw() as u128;
            count += 1;
        }
    }
    if count == 0 {
        return TokenAmount::ZERO;
    }
    let quotient = total / count;
    let remainder = total % count;
    let rounded = if remainder * 2 >= count {
        quotient + 1
    } else {
        quotient
    };
    TokenAmount::new(rounded.min(u64::MAX as u128) as u64)
}
