use proptest::prelude::*;

use dac_custodian::{CandidateRegistry, DacConfig, VoteLedger};
use dac_types::{MemberName, Timestamp, TokenAmount};

fn candidate() -> MemberName {
    MemberName::new("cand")
}

fn registry_with_candidate() -> CandidateRegistry {
    let mut registry = CandidateRegistry::new();
    registry
        .nominate(
            &candidate(),
            TokenAmount::ZERO,
            TokenAmount::from_whole(100),
            Timestamp::EPOCH,
        )
        .unwrap();
    registry
}

proptest! {
    /// Under arbitrary interleavings of votes, vote removals, and balance
    /// deltas, a candidate's aggregates stay consistent: the power is never
    /// negative (it clamps), the average timestamp never lands in the
    /// future, and zero power always means an epoch-zero average.
    #[test]
    fn vote_accounting_stays_consistent(
        ops in prop::collection::vec(
            (0usize..5, 0u8..3, 1i64..5_000_000),
            1..40,
        ),
    ) {
        let cand = candidate();
        let mut registry = registry_with_candidate();
        let mut ledger = VoteLedger::new();
        let mut config = DacConfig::default();
        let mut now = 100u64;

        for (v, action, amount) in ops {
            now += 10;
            let voter = MemberName::new(format!("voter{v}"));
            match action {
                // Cast (or re-cast) a ballot with an arbitrary weight.
                0 => ledger
                    .cast_vote(&voter, &[cand.clone()], amount, Timestamp::new(now), &mut registry, &mut config)
                    .unwrap(),
                // Clear the ballot, possibly with a weight that does not
                // match what was applied (exercises the clamp).
                1 => ledger
                    .cast_vote(&voter, &[], amount, Timestamp::new(now), &mut registry, &mut config)
                    .unwrap(),
                // Outgoing balance transfer.
                _ => ledger
                    .apply_weight_delta(&voter, -amount, &mut registry, &mut config)
                    .unwrap(),
            }

            let row = registry.get(&cand).unwrap();
            prop_assert!(
                row.avg_vote_time_stamp.as_secs() <= now,
                "future-dated average: {} > {}",
                row.avg_vote_time_stamp,
                now
            );
            if row.total_vote_power == 0 {
                prop_assert_eq!(row.avg_vote_time_stamp, Timestamp::EPOCH);
            }
        }
    }

    /// Any subtraction that pushes the total to or below zero resets both
    /// accumulators, so the very next vote sets the average to its own
    /// timestamp exactly.
    #[test]
    fn clamp_resets_both_accumulators(
        weight in 1i64..1_000_000_000,
        overshoot in 0i64..1_000_000,
        t1 in 1u64..1_000_000,
        gap in 1u64..1_000_000,
    ) {
        let cand = candidate();
        let voter = MemberName::new("voter");
        let mut registry = registry_with_candidate();

        registry.begin_contribution(&cand, &voter);
        registry.adjust_vote_power(&cand, &voter, weight, Timestamp::new(t1)).unwrap();
        registry
            .adjust_vote_power(&cand, &voter, -(weight + overshoot), Timestamp::new(t1 + gap))
            .unwrap();

        let row = registry.get(&cand).unwrap();
        prop_assert_eq!(row.total_vote_power, 0);
        prop_assert_eq!(row.avg_vote_time_stamp, Timestamp::EPOCH);

        let t2 = t1 + 2 * gap;
        registry.adjust_vote_power(&cand, &voter, weight, Timestamp::new(t2)).unwrap();
        let row = registry.get(&cand).unwrap();
        prop_assert_eq!(row.avg_vote_time_stamp, Timestamp::new(t2));
    }

    /// Re-affirming an identical ballot never moves the candidate's
    /// average timestamp or voter count, regardless of when it happens.
    #[test]
    fn revote_same_set_is_inert(
        weight in 1i64..1_000_000_000,
        t1 in 1u64..1_000_000,
        gap in 1u64..10_000_000,
    ) {
        let cand = candidate();
        let voter = MemberName::new("voter");
        let mut registry = registry_with_candidate();
        let mut ledger = VoteLedger::new();
        let mut config = DacConfig::default();

        ledger
            .cast_vote(&voter, &[cand.clone()], weight, Timestamp::new(t1), &mut registry, &mut config)
            .unwrap();
        let before = registry.get(&cand).unwrap().clone();

        ledger
            .cast_vote(&voter, &[cand.clone()], weight, Timestamp::new(t1 + gap), &mut registry, &mut config)
            .unwrap();
        let after = registry.get(&cand).unwrap();

        prop_assert_eq!(after.avg_vote_time_stamp, before.avg_vote_time_stamp);
        prop_assert_eq!(after.number_voters, before.number_voters);
        prop_assert_eq!(after.total_vote_power, before.total_vote_power);
    }

    /// A voter's weight lands in full on every candidate on the ballot, and
    /// a later balance delta moves every one of them by exactly that delta.
    #[test]
    fn weight_and_deltas_apply_uniformly(
        balance in 1u64..1_000_000,
        spend in 1u64..1_000_000,
        n_cands in 1usize..5,
    ) {
        prop_assume!(spend < balance);
        let voter = MemberName::new("voter");
        let mut registry = CandidateRegistry::new();
        let mut ledger = VoteLedger::new();
        let mut config = DacConfig::default();

        let cands: Vec<MemberName> = (0..n_cands)
            .map(|i| MemberName::new(format!("cand{i}")))
            .collect();
        for cand in &cands {
            registry
                .nominate(cand, TokenAmount::ZERO, TokenAmount::from_whole(100), Timestamp::EPOCH)
                .unwrap();
        }

        let weight = TokenAmount::from_whole(balance).as_weight();
        ledger
            .cast_vote(&voter, &cands, weight, Timestamp::new(100), &mut registry, &mut config)
            .unwrap();
        for cand in &cands {
            prop_assert_eq!(registry.get(cand).unwrap().total_vote_power, weight as u64);
        }

        let delta = -TokenAmount::from_whole(spend).as_weight();
        ledger.apply_weight_delta(&voter, delta, &mut registry, &mut config).unwrap();
        let expected = (weight + delta) as u64;
        for cand in &cands {
            prop_assert_eq!(registry.get(cand).unwrap().total_vote_power, expected);
        }
        prop_assert_eq!(config.total_weight_of_votes, weight + delta);
    }

    /// If an election clears the quorum at some engagement level, it also
    /// clears it at every higher level (same supply, same config).
    #[test]
    fn quorum_is_monotonic_in_engagement(
        quorum in 1u32..99,
        low_balance in 1u64..50_000,
        extra in 1u64..50_000,
    ) {
        let supply = TokenAmount::from_whole(100_000);
        let passes = |balance: u64| -> bool {
            let mut community = test_community();
            community.config.initial_vote_quorum_percent = quorum;
            let voter = MemberName::new("voter");
            let weight = TokenAmount::from_whole(balance).as_weight();
            let cands: Vec<MemberName> = (0..3).map(|i| MemberName::new(format!("cand{i}"))).collect();
            for cand in &cands {
                community
                    .nominate_candidate(cand, TokenAmount::ZERO, Timestamp::new(100))
                    .unwrap();
            }
            community
                .cast_vote(&voter, &cands, weight, Timestamp::new(200))
                .is_ok()
                && community
                    .advance_period(supply, TokenAmount::ZERO, Timestamp::new(700_000))
                    .is_ok()
        };

        if passes(low_balance) {
            prop_assert!(passes(low_balance + extra));
        }
    }
}

fn test_community() -> dac_custodian::Community {
    dac_custodian::Community::new(
        dac_types::CommunityId::new("testdac"),
        MemberName::new("owner"),
        MemberName::new("token"),
        dac_custodian::CommunityAccounts {
            treasury: MemberName::new("treasury"),
            proposal_funds: MemberName::new("propfunds"),
            spending: MemberName::new("spending"),
        },
    )
}
