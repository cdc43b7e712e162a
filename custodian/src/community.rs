//! One community's complete governance state.
//!
//! A community bundles its config, candidate registry, vote ledger,
//! election scheduler, and payout queue, plus the accounts the engine
//! moves funds between. All methods here assume authorization has already
//! been checked by the engine facade.

use crate::budget::{self, BudgetAccounts};
use crate::config::{ConfigUpdate, DacConfig};
use crate::election::{ElectionScheduler, PeriodOutcome};
use crate::error::CustodianError;
use crate::ledger::VoteLedger;
use crate::payout::{PayoutQueue, PendingPayment, Transfer};
use crate::registry::CandidateRegistry;
use dac_types::{CommunityId, MemberName, Timestamp, TokenAmount};
use serde::{Deserialize, Serialize};

/// The accounts one community's funds move between.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityAccounts {
    pub treasury: MemberName,
    pub proposal_funds: MemberName,
    pub spending: MemberName,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Community {
    pub id: CommunityId,
    /// Administrative account of the community.
    pub owner: MemberName,
    /// Token contract allowed to push balance-change notifications.
    pub token_contract: MemberName,
    pub accounts: CommunityAccounts,
    pub config: DacConfig,
    pub registry: CandidateRegistry,
    pub ledger: VoteLedger,
    pub scheduler: ElectionScheduler,
    pub payouts: PayoutQueue,
}

impl Community {
    pub fn new(
        id: CommunityId,
        owner: MemberName,
        token_contract: MemberName,
        accounts: CommunityAccounts,
    ) -> Self {
        Self {
            id,
            owner,
            token_contract,
            accounts,
            config: DacConfig::default(),
            registry: CandidateRegistry::new(),
            ledger: VoteLedger::new(),
            scheduler: ElectionScheduler::new(),
            payouts: PayoutQueue::new(),
        }
    }

    pub fn update_config(&mut self, update: &ConfigUpdate) -> Result<(), CustodianError> {
        self.config.apply_update(update)
    }

    // ── Candidacy ────────────────────────────────────────────────────────

    pub fn nominate_candidate(
        &mut self,
        candidate: &MemberName,
        requested_pay: TokenAmount,
        now: Timestamp,
    ) -> Result<(), CustodianError> {
        if self.config.whitelist_required() && !self.registry.is_whitelisted(candidate) {
            return Err(CustodianError::NotInWhitelist(candidate.clone()));
        }
        let locked_until = now.plus_secs(self.config.lockup_release_delay as u64);
        self.registry.nominate(
            candidate,
            requested_pay,
            self.config.requested_pay_max,
            locked_until,
        )?;
        self.config.number_active_candidates += 1;
        tracing::info!(community = %self.id, %candidate, "candidate nominated");
        Ok(())
    }

    pub fn withdraw_candidacy(&mut self, candidate: &MemberName) -> Result<(), CustodianError> {
        if self.registry.deactivate(candidate)? {
            self.config.number_active_candidates =
                self.config.number_active_candidates.saturating_sub(1);
        }
        tracing::info!(community = %self.id, %candidate, "candidacy withdrawn");
        Ok(())
    }

    /// Administrative row deletion. Standing votes that still reference the
    /// name become stale and are skipped on later removal.
    pub fn remove_candidate(&mut self, candidate: &MemberName) -> Result<(), CustodianError> {
        let removed = self.registry.remove(candidate)?;
        if removed.is_active {
            self.config.number_active_candidates =
                self.config.number_active_candidates.saturating_sub(1);
        }
        tracing::info!(community = %self.id, %candidate, "candidate removed");
        Ok(())
    }

    pub fn update_requested_pay(
        &mut self,
        candidate: &MemberName,
        requested_pay: TokenAmount,
    ) -> Result<(), CustodianError> {
        self.registry
            .update_requested_pay(candidate, requested_pay, self.config.requested_pay_max)
    }

    // ── Voting ───────────────────────────────────────────────────────────

    pub fn cast_vote(
        &mut self,
        voter: &MemberName,
        candidates: &[MemberName],
        weight: i64,
        now: Timestamp,
    ) -> Result<(), CustodianError> {
        self.ledger
            .cast_vote(voter, candidates, weight, now, &mut self.registry, &mut self.config)
    }

    pub fn cast_proxy_vote(
        &mut self,
        voter: &MemberName,
        proxy: &MemberName,
        weight: i64,
        now: Timestamp,
    ) -> Result<(), CustodianError> {
        self.ledger
            .cast_proxy_vote(voter, proxy, weight, now, &mut self.registry, &mut self.config)
    }

    pub fn register_proxy(&mut self, proxy: &MemberName) -> Result<(), CustodianError> {
        self.ledger.register_proxy(proxy)
    }

    pub fn unregister_proxy(&mut self, proxy: &MemberName) -> Result<(), CustodianError> {
        self.ledger
            .unregister_proxy(proxy, &mut self.registry, &mut self.config)
    }

    pub fn balance_changed(&mut self, voter: &MemberName, delta: i64) -> Result<(), CustodianError> {
        self.ledger
            .apply_weight_delta(voter, delta, &mut self.registry, &mut self.config)
    }

    // ── Periods ──────────────────────────────────────────────────────────

    pub fn advance_period(
        &mut self,
        total_supply: TokenAmount,
        treasury_balance: TokenAmount,
        now: Timestamp,
    ) -> Result<PeriodOutcome, CustodianError> {
        let accounts = BudgetAccounts {
            treasury: &self.accounts.treasury,
            proposal_funds: &self.accounts.proposal_funds,
            spending: &self.accounts.spending,
        };
        self.scheduler.advance_period(
            &mut self.config,
            &self.registry,
            &mut self.payouts,
            &self.owner,
            total_supply,
            treasury_balance,
            accounts,
            now,
        )
    }

    pub fn appoint_custodians(&mut self, names: &[MemberName]) -> Result<(), CustodianError> {
        self.scheduler.appoint(names, &self.registry)
    }

    /// A custodian steps down; their candidacy is deactivated with them so
    /// they do not immediately win the seat back.
    pub fn resign_custodian(&mut self, custodian: &MemberName) -> Result<(), CustodianError> {
        self.scheduler.resign(custodian)?;
        if let Ok(was_active) = self.registry.deactivate(custodian) {
            if was_active {
                self.config.number_active_candidates =
                    self.config.number_active_candidates.saturating_sub(1);
            }
        }
        Ok(())
    }

    // ── Payments and budget ──────────────────────────────────────────────

    pub fn claim_pay(&mut self, id: u64, caller: &MemberName) -> Result<Transfer, CustodianError> {
        self.payouts.claim(id, caller, &self.accounts.treasury)
    }

    pub fn remove_payment(&mut self, id: u64) -> Result<PendingPayment, CustodianError> {
        self.payouts.remove(id)
    }

    pub fn reject_payment(
        &mut self,
        id: u64,
        caller: &MemberName,
    ) -> Result<PendingPayment, CustodianError> {
        self.payouts.reject(id, caller)
    }

    pub fn claim_budget(
        &mut self,
        treasury_balance: TokenAmount,
        now: Timestamp,
    ) -> Result<Vec<Transfer>, CustodianError> {
        let accounts = BudgetAccounts {
            treasury: &self.accounts.treasury,
            proposal_funds: &self.accounts.proposal_funds,
            spending: &self.accounts.spending,
        };
        budget::claim_budget(&mut self.config, treasury_balance, accounts, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(name: &str) -> MemberName {
        MemberName::new(name)
    }

    fn community() -> Community {
        Community::new(
            CommunityId::new("testdac"),
            member("owner"),
            member("token"),
            CommunityAccounts {
                treasury: member("treasury"),
                proposal_funds: member("propfunds"),
                spending: member("spending"),
            },
        )
    }

    #[test]
    fn test_nomination_tracks_active_count() {
        let mut dac = community();
        dac.nominate_candidate(&member("c1"), TokenAmount::ZERO, Timestamp::new(100))
            .unwrap();
        dac.nominate_candidate(&member("c2"), TokenAmount::ZERO, Timestamp::new(100))
            .unwrap();
        assert_eq!(dac.config.number_active_candidates, 2);

        dac.withdraw_candidacy(&member("c1")).unwrap();
        assert_eq!(dac.config.number_active_candidates, 1);

        dac.remove_candidate(&member("c2")).unwrap();
        assert_eq!(dac.config.number_active_candidates, 0);
    }

    #[test]
    fn test_whitelist_gate_on_nomination() {
        let mut dac = community();
        dac.config.requires_whitelist = Some(true);

        assert!(matches!(
            dac.nominate_candidate(&member("c1"), TokenAmount::ZERO, Timestamp::new(100)),
            Err(CustodianError::NotInWhitelist(_))
        ));

        dac.registry.add_to_whitelist(&member("c1"), 1).unwrap();
        dac.nominate_candidate(&member("c1"), TokenAmount::ZERO, Timestamp::new(100))
            .unwrap();
    }

    #[test]
    fn test_nomination_sets_lockup_release() {
        let mut dac = community();
        dac.config.lockup_release_delay = 1_000;
        dac.nominate_candidate(&member("c1"), TokenAmount::ZERO, Timestamp::new(500))
            .unwrap();
        assert_eq!(
            dac.registry.get(&member("c1")).unwrap().locked_until,
            Timestamp::new(1_500)
        );
    }

    #[test]
    fn test_resignation_deactivates_candidacy() {
        let mut dac = community();
        dac.nominate_candidate(&member("c1"), TokenAmount::ZERO, Timestamp::new(100))
            .unwrap();
        dac.appoint_custodians(&[member("c1")]).unwrap();

        dac.resign_custodian(&member("c1")).unwrap();
        assert!(!dac.scheduler.is_custodian(&member("c1")));
        assert!(!dac.registry.get(&member("c1")).unwrap().is_active);
        assert_eq!(dac.config.number_active_candidates, 0);
    }
}
