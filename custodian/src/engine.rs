//! Multi-community engine facade.
//!
//! The engine owns every community's state and fronts it with an action API
//! whose calls all carry the caller's account. Each action checks authority,
//! runs against a scratch clone of the community, and commits only on
//! success, so a rejected action leaves state exactly as it was.
//!
//! Authorization model:
//! - self-actions (voting, candidacy, claiming pay) require the subject
//!   account itself
//! - community administration requires the community owner or the engine
//!   admin
//! - balance-change notifications require the community's token contract

use crate::balance::{BalanceChange, BalanceLookup};
use crate::community::{Community, CommunityAccounts};
use crate::config::ConfigUpdate;
use crate::election::PeriodOutcome;
use crate::error::CustodianError;
use crate::payout::{PendingPayment, Transfer};
use dac_types::{CommunityId, MemberName, Timestamp, TokenAmount};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub struct CustodianEngine {
    admin: MemberName,
    communities: HashMap<CommunityId, Community>,
}

impl CustodianEngine {
    pub fn new(admin: MemberName) -> Self {
        Self {
            admin,
            communities: HashMap::new(),
        }
    }

    pub fn community(&self, id: &CommunityId) -> Option<&Community> {
        self.communities.get(id)
    }

    // ── Community lifecycle ──────────────────────────────────────────────

    pub fn create_community(
        &mut self,
        caller: &MemberName,
        id: CommunityId,
        owner: MemberName,
        token_contract: MemberName,
        accounts: CommunityAccounts,
    ) -> Result<(), CustodianError> {
        self.require(caller, &self.admin)?;
        if self.communities.contains_key(&id) {
            return Err(CustodianError::CommunityExists(id.to_string()));
        }
        tracing::info!(community = %id, %owner, "community created");
        self.communities
            .insert(id.clone(), Community::new(id, owner, token_contract, accounts));
        Ok(())
    }

    pub fn update_config(
        &mut self,
        caller: &MemberName,
        id: &CommunityId,
        update: ConfigUpdate,
    ) -> Result<(), CustodianError> {
        self.require_owner(caller, id)?;
        self.with_community(id, |dac| dac.update_config(&update))
    }

    pub fn set_governance_params(
        &mut self,
        caller: &MemberName,
        id: &CommunityId,
        maxvotes: u8,
        numelected: u8,
        auth_threshold: u8,
    ) -> Result<(), CustodianError> {
        self.require_owner(caller, id)?;
        self.with_community(id, |dac| {
            dac.config
                .set_governance_params(maxvotes, numelected, auth_threshold)
        })
    }

    // ── Budget settings ──────────────────────────────────────────────────

    pub fn set_budget_percentage(
        &mut self,
        caller: &MemberName,
        id: &CommunityId,
        percent: u16,
    ) -> Result<(), CustodianError> {
        self.require_owner(caller, id)?;
        self.with_community(id, |dac| {
            dac.config.budget_percentage = Some(percent);
            Ok(())
        })
    }

    pub fn unset_budget_percentage(
        &mut self,
        caller: &MemberName,
        id: &CommunityId,
    ) -> Result<(), CustodianError> {
        self.require_owner(caller, id)?;
        self.with_community(id, |dac| {
            dac.config.budget_percentage = None;
            Ok(())
        })
    }

    pub fn set_proposal_budget_percentage(
        &mut self,
        caller: &MemberName,
        id: &CommunityId,
        percent: u16,
    ) -> Result<(), CustodianError> {
        self.require_owner(caller, id)?;
        self.with_community(id, |dac| {
            dac.config.prop_budget_percentage = Some(percent);
            Ok(())
        })
    }

    pub fn set_proposal_budget_fixed(
        &mut self,
        caller: &MemberName,
        id: &CommunityId,
        amount: TokenAmount,
    ) -> Result<(), CustodianError> {
        self.require_owner(caller, id)?;
        self.with_community(id, |dac| {
            dac.config.prop_budget_amount = Some(amount);
            Ok(())
        })
    }

    pub fn set_spending_budget_fixed(
        &mut self,
        caller: &MemberName,
        id: &CommunityId,
        amount: TokenAmount,
    ) -> Result<(), CustodianError> {
        self.require_owner(caller, id)?;
        self.with_community(id, |dac| {
            dac.config.spendings_budget_amount = Some(amount);
            Ok(())
        })
    }

    pub fn set_requires_whitelist(
        &mut self,
        caller: &MemberName,
        id: &CommunityId,
        required: bool,
    ) -> Result<(), CustodianError> {
        self.require_owner(caller, id)?;
        self.with_community(id, |dac| {
            dac.config.requires_whitelist = Some(required);
            Ok(())
        })
    }

    // ── Candidacy ────────────────────────────────────────────────────────

    pub fn nominate_candidate(
        &mut self,
        caller: &MemberName,
        id: &CommunityId,
        candidate: &MemberName,
        requested_pay: TokenAmount,
        now: Timestamp,
    ) -> Result<(), CustodianError> {
        self.require(caller, candidate)?;
        self.with_community(id, |dac| dac.nominate_candidate(candidate, requested_pay, now))
    }

    pub fn withdraw_candidacy(
        &mut self,
        caller: &MemberName,
        id: &CommunityId,
        candidate: &MemberName,
    ) -> Result<(), CustodianError> {
        self.require(caller, candidate)?;
        self.with_community(id, |dac| dac.withdraw_candidacy(candidate))
    }

    pub fn remove_candidate(
        &mut self,
        caller: &MemberName,
        id: &CommunityId,
        candidate: &MemberName,
    ) -> Result<(), CustodianError> {
        self.require_owner(caller, id)?;
        self.with_community(id, |dac| dac.remove_candidate(candidate))
    }

    pub fn update_requested_pay(
        &mut self,
        caller: &MemberName,
        id: &CommunityId,
        candidate: &MemberName,
        requested_pay: TokenAmount,
    ) -> Result<(), CustodianError> {
        self.require(caller, candidate)?;
        self.with_community(id, |dac| dac.update_requested_pay(candidate, requested_pay))
    }

    // ── Whitelist ────────────────────────────────────────────────────────

    pub fn add_to_whitelist(
        &mut self,
        caller: &MemberName,
        id: &CommunityId,
        member: &MemberName,
        rating: u64,
    ) -> Result<(), CustodianError> {
        self.require_owner(caller, id)?;
        self.with_community(id, |dac| dac.registry.add_to_whitelist(member, rating))
    }

    pub fn update_whitelist(
        &mut self,
        caller: &MemberName,
        id: &CommunityId,
        member: &MemberName,
        rating: u64,
    ) -> Result<(), CustodianError> {
        self.require_owner(caller, id)?;
        self.with_community(id, |dac| dac.registry.update_whitelist(member, rating))
    }

    pub fn remove_from_whitelist(
        &mut self,
        caller: &MemberName,
        id: &CommunityId,
        member: &MemberName,
    ) -> Result<(), CustodianError> {
        self.require_owner(caller, id)?;
        self.with_community(id, |dac| dac.registry.remove_from_whitelist(member))
    }

    // ── Voting ───────────────────────────────────────────────────────────

    pub fn vote_custodians(
        &mut self,
        caller: &MemberName,
        id: &CommunityId,
        voter: &MemberName,
        candidates: &[MemberName],
        balances: &dyn BalanceLookup,
        now: Timestamp,
    ) -> Result<(), CustodianError> {
        self.require(caller, voter)?;
        let weight = balances.balance_of(voter).as_weight();
        self.with_community(id, |dac| dac.cast_vote(voter, candidates, weight, now))
    }

    pub fn vote_proxy(
        &mut self,
        caller: &MemberName,
        id: &CommunityId,
        voter: &MemberName,
        proxy: &MemberName,
        balances: &dyn BalanceLookup,
        now: Timestamp,
    ) -> Result<(), CustodianError> {
        self.require(caller, voter)?;
        let weight = balances.balance_of(voter).as_weight();
        self.with_community(id, |dac| dac.cast_proxy_vote(voter, proxy, weight, now))
    }

    pub fn register_proxy(
        &mut self,
        caller: &MemberName,
        id: &CommunityId,
        proxy: &MemberName,
    ) -> Result<(), CustodianError> {
        self.require(caller, proxy)?;
        self.with_community(id, |dac| dac.register_proxy(proxy))
    }

    pub fn unregister_proxy(
        &mut self,
        caller: &MemberName,
        id: &CommunityId,
        proxy: &MemberName,
    ) -> Result<(), CustodianError> {
        self.require(caller, proxy)?;
        self.with_community(id, |dac| dac.unregister_proxy(proxy))
    }

    /// Consume a balance movement pushed by the token contract.
    pub fn on_balance_changed(
        &mut self,
        caller: &MemberName,
        id: &CommunityId,
        change: &BalanceChange,
    ) -> Result<(), CustodianError> {
        let token_contract = self.community_ref(id)?.token_contract.clone();
        self.require(caller, &token_contract)?;
        self.with_community(id, |dac| dac.balance_changed(&change.account, change.delta))
    }

    // ── Periods ──────────────────────────────────────────────────────────

    /// Housekeeping action, callable by anyone; the time window and quorum
    /// gates decide whether it does anything.
    pub fn advance_period(
        &mut self,
        id: &CommunityId,
        balances: &dyn BalanceLookup,
        now: Timestamp,
    ) -> Result<PeriodOutcome, CustodianError> {
        let treasury = self.community_ref(id)?.accounts.treasury.clone();
        let total_supply = balances.total_supply();
        let treasury_balance = balances.balance_of(&treasury);
        self.with_community(id, |dac| {
            dac.advance_period(total_supply, treasury_balance, now)
        })
    }

    pub fn appoint_custodians(
        &mut self,
        caller: &MemberName,
        id: &CommunityId,
        names: &[MemberName],
    ) -> Result<(), CustodianError> {
        self.require_owner(caller, id)?;
        self.with_community(id, |dac| dac.appoint_custodians(names))
    }

    pub fn resign_custodian(
        &mut self,
        caller: &MemberName,
        id: &CommunityId,
        custodian: &MemberName,
    ) -> Result<(), CustodianError> {
        self.require(caller, custodian)?;
        self.with_community(id, |dac| dac.resign_custodian(custodian))
    }

    // ── Payments and budget ──────────────────────────────────────────────

    pub fn claim_pay(
        &mut self,
        caller: &MemberName,
        id: &CommunityId,
        payment_id: u64,
    ) -> Result<Transfer, CustodianError> {
        self.with_community(id, |dac| dac.claim_pay(payment_id, caller))
    }

    pub fn remove_payment(
        &mut self,
        caller: &MemberName,
        id: &CommunityId,
        payment_id: u64,
    ) -> Result<PendingPayment, CustodianError> {
        self.require_owner(caller, id)?;
        self.with_community(id, |dac| dac.remove_payment(payment_id))
    }

    pub fn reject_payment(
        &mut self,
        caller: &MemberName,
        id: &CommunityId,
        payment_id: u64,
    ) -> Result<PendingPayment, CustodianError> {
        self.with_community(id, |dac| dac.reject_payment(payment_id, caller))
    }

    pub fn claim_budget(
        &mut self,
        caller: &MemberName,
        id: &CommunityId,
        balances: &dyn BalanceLookup,
        now: Timestamp,
    ) -> Result<Vec<Transfer>, CustodianError> {
        self.require_owner(caller, id)?;
        let treasury = self.community_ref(id)?.accounts.treasury.clone();
        let treasury_balance = balances.balance_of(&treasury);
        self.with_community(id, |dac| dac.claim_budget(treasury_balance, now))
    }

    // ── Persistence ──────────────────────────────────────────────────────

    pub fn save_state(&self) -> Vec<u8> {
        let snapshot = EngineSnapshot {
            admin: self.admin.clone(),
            communities: self.communities.clone(),
        };
        bincode::serialize(&snapshot).unwrap_or_default()
    }

    pub fn load_state(data: &[u8], fallback_admin: MemberName) -> Self {
        match bincode::deserialize::<EngineSnapshot>(data) {
            Ok(snapshot) => Self {
                admin: snapshot.admin,
                communities: snapshot.communities,
            },
            Err(_) => Self::new(fallback_admin),
        }
    }

    // ── Internals ────────────────────────────────────────────────────────

    fn community_ref(&self, id: &CommunityId) -> Result<&Community, CustodianError> {
        self.communities
            .get(id)
            .ok_or_else(|| CustodianError::CommunityNotFound(id.to_string()))
    }

    /// Run an action against a scratch clone, committing only on success.
    fn with_community<T>(
        &mut self,
        id: &CommunityId,
        action: impl FnOnce(&mut Community) -> Result<T, CustodianError>,
    ) -> Result<T, CustodianError> {
        let mut scratch = self.community_ref(id)?.clone();
        let out = action(&mut scratch)?;
        self.communities.insert(id.clone(), scratch);
        Ok(out)
    }

    fn require(&self, caller: &MemberName, required: &MemberName) -> Result<(), CustodianError> {
        if caller == required {
            Ok(())
        } else {
            Err(CustodianError::MissingAuthority {
                required: required.clone(),
                caller: caller.clone(),
            })
        }
    }

    fn require_owner(&self, caller: &MemberName, id: &CommunityId) -> Result<(), CustodianError> {
        let owner = &self.community_ref(id)?.owner;
        if caller == owner || caller == &self.admin {
            Ok(())
        } else {
            Err(CustodianError::MissingAuthority {
                required: owner.clone(),
                caller: caller.clone(),
            })
        }
    }
}

/// Serializable snapshot of the whole engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct EngineSnapshot {
    admin: MemberName,
    communities: HashMap<CommunityId, Community>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::StaticBalances;

    fn member(name: &str) -> MemberName {
        MemberName::new(name)
    }

    fn dac_id() -> CommunityId {
        CommunityId::new("testdac")
    }

    fn engine_with_community() -> CustodianEngine {
        let mut engine = CustodianEngine::new(member("admin"));
        engine
            .create_community(
                &member("admin"),
                dac_id(),
                member("owner"),
                member("token"),
                CommunityAccounts {
                    treasury: member("treasury"),
                    proposal_funds: member("propfunds"),
                    spending: member("spending"),
                },
            )
            .unwrap();
        engine
    }

    #[test]
    fn test_create_requires_admin_and_unique_id() {
        let mut engine = engine_with_community();

        assert!(matches!(
            engine.create_community(
                &member("stranger"),
                CommunityId::new("other"),
                member("owner"),
                member("token"),
                CommunityAccounts {
                    treasury: member("t"),
                    proposal_funds: member("p"),
                    spending: member("s"),
                },
            ),
            Err(CustodianError::MissingAuthority { .. })
        ));

        assert!(matches!(
            engine.create_community(
                &member("admin"),
                dac_id(),
                member("owner"),
                member("token"),
                CommunityAccounts {
                    treasury: member("t"),
                    proposal_funds: member("p"),
                    spending: member("s"),
                },
            ),
            Err(CustodianError::CommunityExists(_))
        ));
    }

    #[test]
    fn test_self_actions_require_the_subject() {
        let mut engine = engine_with_community();
        let err = engine
            .nominate_candidate(
                &member("mallory"),
                &dac_id(),
                &member("alice"),
                TokenAmount::ZERO,
                Timestamp::new(100),
            )
            .unwrap_err();
        assert!(matches!(err, CustodianError::MissingAuthority { .. }));
    }

    #[test]
    fn test_balance_notification_requires_token_contract() {
        let mut engine = engine_with_community();
        let change = BalanceChange::new(member("alice"), -5_000);

        assert!(matches!(
            engine.on_balance_changed(&member("alice"), &dac_id(), &change),
            Err(CustodianError::MissingAuthority { .. })
        ));
        engine
            .on_balance_changed(&member("token"), &dac_id(), &change)
            .unwrap();
    }

    #[test]
    fn test_failed_action_leaves_state_untouched() {
        let mut engine = engine_with_community();
        let mut balances = StaticBalances::with_supply(TokenAmount::from_whole(100_000));
        balances.set_balance(member("alice"), TokenAmount::from_whole(1_000));

        engine
            .nominate_candidate(
                &member("cand"),
                &dac_id(),
                &member("cand"),
                TokenAmount::ZERO,
                Timestamp::new(100),
            )
            .unwrap();
        engine
            .vote_custodians(
                &member("alice"),
                &dac_id(),
                &member("alice"),
                &[member("cand")],
                &balances,
                Timestamp::new(100),
            )
            .unwrap();
        let before = engine.community(&dac_id()).unwrap().config.total_weight_of_votes;

        // A ballot with a duplicate entry is rejected after the previous
        // choices would already have been unwound in the scratch copy.
        let err = engine
            .vote_custodians(
                &member("alice"),
                &dac_id(),
                &member("alice"),
                &[member("cand"), member("cand")],
                &balances,
                Timestamp::new(200),
            )
            .unwrap_err();
        assert!(matches!(err, CustodianError::DuplicateBallotEntry(_)));

        let dac = engine.community(&dac_id()).unwrap();
        assert_eq!(dac.config.total_weight_of_votes, before);
        assert_eq!(
            dac.registry.get(&member("cand")).unwrap().total_vote_power,
            10_000_000
        );
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut engine = engine_with_community();
        engine
            .nominate_candidate(
                &member("cand"),
                &dac_id(),
                &member("cand"),
                TokenAmount::ZERO,
                Timestamp::new(100),
            )
            .unwrap();

        let bytes = engine.save_state();
        let restored = CustodianEngine::load_state(&bytes, member("admin"));
        let dac = restored.community(&dac_id()).unwrap();
        assert!(dac.registry.get(&member("cand")).unwrap().is_active);
        assert_eq!(dac.owner, member("owner"));
    }

    #[test]
    fn test_snapshot_survives_disk_round_trip() {
        let engine = engine_with_community();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custodian.state");

        std::fs::write(&path, engine.save_state()).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        let restored = CustodianEngine::load_state(&bytes, member("admin"));
        assert!(restored.community(&dac_id()).is_some());
    }

    #[test]
    fn test_corrupt_snapshot_falls_back_to_empty_engine() {
        let restored = CustodianEngine::load_state(b"not a snapshot", member("admin"));
        assert!(restored.community(&dac_id()).is_none());
    }
}
