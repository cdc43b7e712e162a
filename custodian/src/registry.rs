//! Candidate registry: per-candidate aggregate vote state and rank.
//!
//! Three independent mutation paths feed the same accumulators: direct
//! voting, proxy (de)registration, and external balance-change
//! notifications. The registry keeps them consistent with two rules:
//!
//! - **Joint clamp**: whenever `total_vote_power` would drop to zero or
//!   below, both it and `running_weight_time` are reset in the same step.
//!   Resetting only one lets the average vote timestamp compute to a value
//!   in the future on the next positive vote.
//! - **Contribution tracking**: each row remembers which ballot owners'
//!   weight is currently applied to it. Subtracting a vote that was never
//!   counted against this row (the row was deleted and recreated in
//!   between) is skipped, never underflowed.

use crate::error::CustodianError;
use dac_types::{MemberName, Timestamp, TokenAmount};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Denominator for the recency term of the decay score. A candidate "earns"
/// one doubling of effective vote power per this many seconds of average
/// vote recency.
pub const SECONDS_TO_DOUBLE: u64 = 30 * 24 * 60 * 60;

/// Scaling factor applied before truncating the decay score to an integer.
const RANK_SCALING: f64 = 10_000.0;

/// One candidate row.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Candidate {
    pub name: MemberName,
    /// Pay the candidate requests per period, bounded by the configured max.
    pub requested_pay: TokenAmount,
    pub is_active: bool,
    /// Aggregate weight of all applied votes. Never negative.
    pub total_vote_power: u64,
    /// Number of distinct ballots currently naming this candidate.
    pub number_voters: u32,
    /// Running sum of `weight × timestamp` over all applied votes. Signed:
    /// it may go negative only as an intermediate inside the clamp step.
    pub running_weight_time: i128,
    /// `running_weight_time / total_vote_power`, or epoch when power is zero.
    pub avg_vote_time_stamp: Timestamp,
    /// Decayed priority score. Higher scores elect first.
    pub rank: u64,
    /// When the nomination stake can be released.
    pub locked_until: Timestamp,
    /// Ballot owners whose weight is currently applied to this row.
    contributors: HashSet<MemberName>,
}

impl Candidate {
    fn new(name: MemberName, requested_pay: TokenAmount, locked_until: Timestamp) -> Self {
        let mut cand = Self {
            name,
            requested_pay,
            is_active: true,
            total_vote_power: 0,
            number_voters: 0,
            running_weight_time: 0,
            avg_vote_time_stamp: Timestamp::EPOCH,
            rank: 0,
            locked_until,
            contributors: HashSet::new(),
        };
        cand.rank = decayed_score(cand.total_vote_power, cand.avg_vote_time_stamp);
        cand
    }

    /// Whether this ballot owner's weight is applied to the row.
    pub fn has_contribution(&self, voter: &MemberName) -> bool {
        self.contributors.contains(voter)
    }
}

/// Decay score: `(log2(power + 1) + avg_secs / SECONDS_TO_DOUBLE) × 10000`.
///
/// log2(0) is -infinity, so one is always added; this does not change the
/// ordering.
pub fn decayed_score(total_vote_power: u64, avg_vote_time_stamp: Timestamp) -> u64 {
    let log = ((total_vote_power as f64) + 1.0).log2();
    let recency = avg_vote_time_stamp.as_secs() as f64 / SECONDS_TO_DOUBLE as f64;
    ((log + recency) * RANK_SCALING) as u64
}

/// All candidate rows of one community, plus the nomination whitelist.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CandidateRegistry {
    candidates: HashMap<MemberName, Candidate>,
    whitelist: HashMap<MemberName, u64>,
}

impl CandidateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &MemberName) -> Option<&Candidate> {
        self.candidates.get(name)
    }

    pub fn contains(&self, name: &MemberName) -> bool {
        self.candidates.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.values()
    }

    /// Register (or reactivate) a candidate. Returns the row.
    ///
    /// A previously deactivated row keeps its vote accumulators, so a
    /// candidate who withdraws and returns retains their standing. An
    /// administratively removed row starts from zero.
    pub fn nominate(
        &mut self,
        name: &MemberName,
        requested_pay: TokenAmount,
        requested_pay_max: TokenAmount,
        locked_until: Timestamp,
    ) -> Result<&Candidate, CustodianError> {
        if requested_pay > requested_pay_max {
            return Err(CustodianError::RequestedPayTooHigh {
                requested: requested_pay,
                max: requested_pay_max,
            });
        }
        match self.candidates.get_mut(name) {
            Some(existing) => {
                if existing.is_active {
                    return Err(CustodianError::AlreadyNominated(name.clone()));
                }
                existing.is_active = true;
                existing.requested_pay = requested_pay;
                existing.locked_until = locked_until;
            }
            None => {
                self.candidates.insert(
                    name.clone(),
                    Candidate::new(name.clone(), requested_pay, locked_until),
                );
            }
        }
        Ok(&self.candidates[name])
    }

    /// Update a registered candidate's requested pay.
    pub fn update_requested_pay(
        &mut self,
        name: &MemberName,
        requested_pay: TokenAmount,
        requested_pay_max: TokenAmount,
    ) -> Result<(), CustodianError> {
        if requested_pay > requested_pay_max {
            return Err(CustodianError::RequestedPayTooHigh {
                requested: requested_pay,
                max: requested_pay_max,
            });
        }
        let cand = self
            .candidates
            .get_mut(name)
            .ok_or_else(|| CustodianError::CandidateNotFound(name.clone()))?;
        cand.requested_pay = requested_pay;
        Ok(())
    }

    /// Deactivate a candidate, retaining their vote accumulators.
    /// Returns true if the row was active (the caller adjusts the active
    /// count only in that case).
    pub fn deactivate(&mut self, name: &MemberName) -> Result<bool, CustodianError> {
        let cand = self
            .candidates
            .get_mut(name)
            .ok_or_else(|| CustodianError::CandidateNotFound(name.clone()))?;
        let was_active = cand.is_active;
        cand.is_active = false;
        Ok(was_active)
    }

    /// Administratively erase a candidate row. Votes still referencing the
    /// name become stale; a later re-nomination starts from a zeroed row
    /// and stale removals are skipped by the contribution check.
    pub fn remove(&mut self, name: &MemberName) -> Result<Candidate, CustodianError> {
        self.candidates
            .remove(name)
            .ok_or_else(|| CustodianError::CandidateNotFound(name.clone()))
    }

    /// Record that a ballot owner now names this candidate. Increments the
    /// voter count when this is a new contribution. No-op for missing rows.
    pub fn begin_contribution(&mut self, candidate: &MemberName, voter: &MemberName) {
        if let Some(cand) = self.candidates.get_mut(candidate) {
            if cand.contributors.insert(voter.clone()) {
                cand.number_voters += 1;
            }
        }
    }

    /// Record that a ballot owner no longer names this candidate. The voter
    /// count is only decremented when the contribution was actually applied
    /// to this row; a stale reference is ignored.
    pub fn end_contribution(&mut self, candidate: &MemberName, voter: &MemberName) {
        if let Some(cand) = self.candidates.get_mut(candidate) {
            if cand.contributors.remove(voter) {
                cand.number_voters = cand.number_voters.saturating_sub(1);
            }
        }
    }

    /// Apply a weight delta to a candidate's aggregates.
    ///
    /// Returns the delta actually applied, so the caller can keep the
    /// community totals in sync. The delta is zero when the row is missing
    /// or when a subtraction has no matching contribution (stale vote after
    /// delete/recreate).
    pub fn adjust_vote_power(
        &mut self,
        candidate: &MemberName,
        voter: &MemberName,
        delta: i64,
        timestamp: Timestamp,
    ) -> Result<i64, CustodianError> {
        let Some(cand) = self.candidates.get_mut(candidate) else {
            // Row was deleted; the update is dropped, not an error.
            tracing::debug!(%candidate, delta, "vote power update for missing candidate dropped");
            return Ok(0);
        };
        if !cand.has_contribution(voter) {
            // No matching addition was ever applied to this row.
            tracing::debug!(%candidate, %voter, delta, "skipping weight delta with no applied contribution");
            return Ok(0);
        }

        let new_total = (cand.total_vote_power as i128) + delta as i128;
        let term = (timestamp.as_secs() as i128)
            .checked_mul(delta as i128)
            .ok_or(CustodianError::Overflow("running_weight_time"))?;
        let new_running = cand
            .running_weight_time
            .checked_add(term)
            .ok_or(CustodianError::Overflow("running_weight_time"))?;

        let applied = if new_total <= 0 {
            // Joint clamp: both accumulators reset together, otherwise the
            // next positive vote computes a future-dated average.
            if new_total < 0 {
                tracing::warn!(
                    %candidate,
                    delta,
                    total = cand.total_vote_power,
                    "vote power clamped to zero"
                );
            }
            let applied = -(cand.total_vote_power as i64);
            cand.total_vote_power = 0;
            cand.running_weight_time = 0;
            cand.avg_vote_time_stamp = Timestamp::EPOCH;
            applied
        } else {
            cand.total_vote_power = new_total as u64;
            cand.running_weight_time = new_running.max(0);
            cand.avg_vote_time_stamp =
                Timestamp::new((cand.running_weight_time / new_total) as u64);
            delta
        };
        cand.rank = decayed_score(cand.total_vote_power, cand.avg_vote_time_stamp);
        Ok(applied)
    }

    /// Recompute a candidate's decayed priority score from its aggregates.
    pub fn rebuild_rank(&mut self, candidate: &MemberName) -> Result<u64, CustodianError> {
        let cand = self
            .candidates
            .get_mut(candidate)
            .ok_or_else(|| CustodianError::CandidateNotFound(candidate.clone()))?;
        cand.rank = decayed_score(cand.total_vote_power, cand.avg_vote_time_stamp);
        Ok(cand.rank)
    }

    /// Active candidates with nonzero vote power, best decayed score first,
    /// ties broken by name for determinism.
    pub fn ranked_active(&self) -> Vec<&Candidate> {
        let mut eligible: Vec<&Candidate> = self
            .candidates
            .values()
            .filter(|c| c.is_active && c.total_vote_power > 0)
            .collect();
        eligible.sort_by(|a, b| b.rank.cmp(&a.rank).then_with(|| a.name.cmp(&b.name)));
        eligible
    }

    // ── Whitelist ────────────────────────────────────────────────────────

    pub fn is_whitelisted(&self, name: &MemberName) -> bool {
        self.whitelist.contains_key(name)
    }

    pub fn add_to_whitelist(&mut self, name: &MemberName, rating: u64) -> Result<(), CustodianError> {
        if self.whitelist.contains_key(name) {
            return Err(CustodianError::AlreadyWhitelisted(name.clone()));
        }
        self.whitelist.insert(name.clone(), rating);
        Ok(())
    }

    pub fn update_whitelist(&mut self, name: &MemberName, rating: u64) -> Result<(), CustodianError> {
        let entry = self
            .whitelist
            .get_mut(name)
            .ok_or_else(|| CustodianError::WhitelistEntryNotFound(name.clone()))?;
        *entry = rating;
        Ok(())
    }

    /// Remove a whitelist entry. Refused while the member holds a candidate
    /// row; deregister first.
    pub fn remove_from_whitelist(&mut self, name: &MemberName) -> Result<(), CustodianError> {
        if self.candidates.contains_key(name) {
            return Err(CustodianError::StillRegisteredCandidate(name.clone()));
        }
        self.whitelist.remove(name);
        Ok(())
    }
}
