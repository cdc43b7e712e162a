//! Vote ledger: per-voter ballots and proxy relationships.
//!
//! Every mutation here flows into the candidate registry and the community
//! running totals in the same step, so the three views (ballots, candidate
//! aggregates, community totals) can never drift apart.
//!
//! Each ballot choice carries the timestamp its contribution was applied
//! at. Removals subtract exactly the `weight × timestamp` term that was
//! added, and re-affirming an unchanged choice touches neither the
//! candidate's average timestamp nor its voter count.

use crate::config::DacConfig;
use crate::error::CustodianError;
use crate::registry::CandidateRegistry;
use dac_types::{MemberName, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One entry on a ballot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteChoice {
    pub candidate: MemberName,
    /// When this candidate's contribution was applied.
    pub voted_at: Timestamp,
}

/// One voter's ballot. A non-empty proxy target implies an empty choice
/// list and vice versa.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Vote {
    pub voter: MemberName,
    pub choices: Vec<VoteChoice>,
    pub proxy: Option<MemberName>,
    /// Last time this ballot was touched.
    pub vote_time_stamp: Timestamp,
    /// Running submission counter; wraps past 255.
    pub vote_count: u8,
}

/// A registered proxy and the delegations currently counted through it.
///
/// A ballot pointing at a proxy is only live while the voter is in this
/// record's delegator set. Unregistering drops the whole record, so after
/// a re-registration the old pointers are recognized as stale rather than
/// mistaken for counted weight.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProxyRecord {
    pub total_delegated: i64,
    delegators: HashSet<MemberName>,
}

impl ProxyRecord {
    /// Whether this voter's delegation is currently counted.
    pub fn has_delegator(&self, voter: &MemberName) -> bool {
        self.delegators.contains(voter)
    }
}

/// All ballots and proxy registrations of one community.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VoteLedger {
    votes: HashMap<MemberName, Vote>,
    proxies: HashMap<MemberName, ProxyRecord>,
}

impl VoteLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_vote(&self, voter: &MemberName) -> Option<&Vote> {
        self.votes.get(voter)
    }

    pub fn is_registered_proxy(&self, member: &MemberName) -> bool {
        self.proxies.contains_key(member)
    }

    /// Weight currently delegated to a proxy (zero if not registered).
    pub fn delegated_weight(&self, proxy: &MemberName) -> i64 {
        self.proxies.get(proxy).map(|p| p.total_delegated).unwrap_or(0)
    }

    /// Cast (or replace) a direct ballot.
    ///
    /// `weight` is the voter's own live balance weight. A registered proxy
    /// voting for themselves carries their delegated weight on top.
    /// An empty candidate list removes the ballot entirely.
    pub fn cast_vote(
        &mut self,
        voter: &MemberName,
        candidates: &[MemberName],
        weight: i64,
        now: Timestamp,
        registry: &mut CandidateRegistry,
        config: &mut DacConfig,
    ) -> Result<(), CustodianError> {
        if candidates.len() > config.maxvotes as usize {
            return Err(CustodianError::TooManyVotes {
                got: candidates.len(),
                max: config.maxvotes,
            });
        }
        for (i, cand) in candidates.iter().enumerate() {
            if candidates[..i].contains(cand) {
                return Err(CustodianError::DuplicateBallotEntry(cand.clone()));
            }
            let row = registry
                .get(cand)
                .ok_or_else(|| CustodianError::CandidateNotFound(cand.clone()))?;
            if !row.is_active {
                return Err(CustodianError::CandidateNotActive(cand.clone()));
            }
        }

        let effective = weight + self.delegated_weight(voter);
        let old = self.votes.get(voter).cloned();
        let mut applied_total: i64 = 0;

        // A direct ballot replaces any standing delegation.
        if let Some(prev) = &old {
            if let Some(old_proxy) = &prev.proxy {
                applied_total += self.retract_delegation(voter, old_proxy, weight, registry)?;
            }
        }

        let old_choices: Vec<VoteChoice> = old.as_ref().map(|v| v.choices.clone()).unwrap_or_default();

        // Remove candidates no longer on the ballot.
        for choice in &old_choices {
            if !candidates.contains(&choice.candidate) {
                applied_total += registry.adjust_vote_power(
                    &choice.candidate,
                    voter,
                    -effective,
                    choice.voted_at,
                )?;
                registry.end_contribution(&choice.candidate, voter);
            }
        }

        // Add newly named candidates; unchanged ones stay untouched.
        let mut new_choices = Vec::with_capacity(candidates.len());
        for cand in candidates {
            match old_choices.iter().find(|c| &c.candidate == cand) {
                Some(existing) => new_choices.push(existing.clone()),
                None => {
                    registry.begin_contribution(cand, voter);
                    applied_total +=
                        registry.adjust_vote_power(cand, voter, effective, now)?;
                    new_choices.push(VoteChoice {
                        candidate: cand.clone(),
                        voted_at: now,
                    });
                }
            }
        }

        config.total_votes_on_candidates += applied_total;

        if candidates.is_empty() {
            if old.is_some() {
                config.total_weight_of_votes -= weight;
                self.votes.remove(voter);
                tracing::debug!(%voter, "ballot removed");
            }
        } else {
            let vote_count = old.as_ref().map(|v| v.vote_count.wrapping_add(1)).unwrap_or(1);
            if old.is_none() {
                config.total_weight_of_votes += weight;
            }
            self.votes.insert(
                voter.clone(),
                Vote {
                    voter: voter.clone(),
                    choices: new_choices,
                    proxy: None,
                    vote_time_stamp: now,
                    vote_count,
                },
            );
            tracing::debug!(%voter, candidates = candidates.len(), weight, "ballot cast");
        }
        Ok(())
    }

    /// Delegate this voter's weight to a registered proxy. The proxy's
    /// already-chosen candidates receive the weight exactly as if the voter
    /// had voted for them directly.
    pub fn cast_proxy_vote(
        &mut self,
        voter: &MemberName,
        proxy: &MemberName,
        weight: i64,
        now: Timestamp,
        registry: &mut CandidateRegistry,
        config: &mut DacConfig,
    ) -> Result<(), CustodianError> {
        if voter == proxy {
            return Err(CustodianError::SelfProxy);
        }
        if !self.proxies.contains_key(proxy) {
            return Err(CustodianError::VoteProxyNotRegistered(proxy.clone()));
        }
        if self.proxies.contains_key(voter) {
            return Err(CustodianError::ProxyVotesProxy);
        }

        let old = self.votes.get(voter).cloned();
        let mut applied_total: i64 = 0;

        if let Some(prev) = &old {
            // Retract any direct choices.
            for choice in &prev.choices {
                applied_total +=
                    registry.adjust_vote_power(&choice.candidate, voter, -weight, choice.voted_at)?;
                registry.end_contribution(&choice.candidate, voter);
            }
            // Or move the delegation off the previous proxy.
            if let Some(old_proxy) = &prev.proxy {
                if old_proxy == proxy && self.delegation_is_live(voter, proxy) {
                    // Re-affirming a counted delegation is a no-op beyond
                    // the counter.
                    if let Some(entry) = self.votes.get_mut(voter) {
                        entry.vote_count = entry.vote_count.wrapping_add(1);
                        entry.vote_time_stamp = now;
                    }
                    return Ok(());
                }
                // A pointer at the same proxy that is not counted (the
                // proxy unregistered and came back) falls through and is
                // applied fresh below.
                applied_total += self.retract_delegation(voter, old_proxy, weight, registry)?;
            }
        }

        // Apply the voter's weight through the new proxy's ballot.
        let proxy_choices: Vec<VoteChoice> = self
            .votes
            .get(proxy)
            .map(|v| v.choices.clone())
            .unwrap_or_default();
        for choice in &proxy_choices {
            applied_total +=
                registry.adjust_vote_power(&choice.candidate, proxy, weight, choice.voted_at)?;
        }
        if let Some(record) = self.proxies.get_mut(proxy) {
            record.total_delegated += weight;
            record.delegators.insert(voter.clone());
        }

        config.total_votes_on_candidates += applied_total;
        if old.is_none() {
            config.total_weight_of_votes += weight;
        }
        let vote_count = old.map(|v| v.vote_count.wrapping_add(1)).unwrap_or(1);
        self.votes.insert(
            voter.clone(),
            Vote {
                voter: voter.clone(),
                choices: Vec::new(),
                proxy: Some(proxy.clone()),
                vote_time_stamp: now,
                vote_count,
            },
        );
        tracing::debug!(%voter, %proxy, weight, "delegation cast");
        Ok(())
    }

    /// Register a member as a proxy.
    pub fn register_proxy(&mut self, member: &MemberName) -> Result<(), CustodianError> {
        if self.proxies.contains_key(member) {
            return Err(CustodianError::ProxyAlreadyRegistered(member.clone()));
        }
        self.proxies.insert(member.clone(), ProxyRecord::default());
        tracing::debug!(proxy = %member, "proxy registered");
        Ok(())
    }

    /// Unregister a proxy, retracting all weight delegated through it.
    ///
    /// Ballots delegating to the proxy keep pointing at it but their weight
    /// no longer counts on any candidate.
    pub fn unregister_proxy(
        &mut self,
        member: &MemberName,
        registry: &mut CandidateRegistry,
        config: &mut DacConfig,
    ) -> Result<(), CustodianError> {
        let record = self
            .proxies
            .remove(member)
            .ok_or_else(|| CustodianError::ProxyNotRegistered(member.clone()))?;

        if record.total_delegated != 0 {
            let choices: Vec<VoteChoice> = self
                .votes
                .get(member)
                .map(|v| v.choices.clone())
                .unwrap_or_default();
            let mut applied_total = 0;
            for choice in &choices {
                applied_total += registry.adjust_vote_power(
                    &choice.candidate,
                    member,
                    -record.total_delegated,
                    choice.voted_at,
                )?;
            }
            config.total_votes_on_candidates += applied_total;
        }
        tracing::debug!(proxy = %member, delegated = record.total_delegated, "proxy unregistered");
        Ok(())
    }

    /// Route an external balance-change delta into every candidate the
    /// voter's weight currently rests on, without touching any recorded
    /// vote timestamp.
    pub fn apply_weight_delta(
        &mut self,
        voter: &MemberName,
        delta: i64,
        registry: &mut CandidateRegistry,
        config: &mut DacConfig,
    ) -> Result<(), CustodianError> {
        let Some(vote) = self.votes.get(voter).cloned() else {
            return Ok(());
        };

        let mut applied_total = 0;
        match &vote.proxy {
            Some(proxy) if self.delegation_is_live(voter, proxy) => {
                let proxy_choices: Vec<VoteChoice> = self
                    .votes
                    .get(proxy)
                    .map(|v| v.choices.clone())
                    .unwrap_or_default();
                for choice in &proxy_choices {
                    applied_total += registry.adjust_vote_power(
                        &choice.candidate,
                        proxy,
                        delta,
                        choice.voted_at,
                    )?;
                }
                if let Some(record) = self.proxies.get_mut(proxy) {
                    record.total_delegated += delta;
                }
            }
            Some(_) => {
                // The delegation is not counted (the proxy unregistered,
                // possibly re-registering since); the weight rests nowhere.
            }
            None => {
                for choice in &vote.choices {
                    applied_total += registry.adjust_vote_power(
                        &choice.candidate,
                        voter,
                        delta,
                        choice.voted_at,
                    )?;
                }
            }
        }

        config.total_weight_of_votes += delta;
        config.total_votes_on_candidates += applied_total;
        Ok(())
    }

    /// Whether a voter's delegation to a proxy is currently counted on the
    /// proxy's candidates.
    fn delegation_is_live(&self, voter: &MemberName, proxy: &MemberName) -> bool {
        self.proxies
            .get(proxy)
            .is_some_and(|record| record.has_delegator(voter))
    }

    /// Retract a voter's delegated weight from a proxy, if that delegation
    /// is currently counted. Returns the delta applied to candidates.
    fn retract_delegation(
        &mut self,
        voter: &MemberName,
        proxy: &MemberName,
        weight: i64,
        registry: &mut CandidateRegistry,
    ) -> Result<i64, CustodianError> {
        let Some(record) = self.proxies.get_mut(proxy) else {
            // Already retracted when the proxy unregistered.
            return Ok(0);
        };
        if !record.delegators.remove(voter) {
            // The proxy unregistered and re-registered since; this voter's
            // weight was never applied to the new record.
            return Ok(0);
        }
        record.total_delegated -= weight;
        let choices: Vec<VoteChoice> = self
            .votes
            .get(proxy)
            .map(|v| v.choices.clone())
            .unwrap_or_default();
        let mut applied = 0;
        for choice in &choices {
            applied +=
                registry.adjust_vote_power(&choice.candidate, proxy, -weight, choice.voted_at)?;
        }
        Ok(applied)
    }
}
