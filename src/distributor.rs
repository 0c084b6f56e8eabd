// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Pure reward distribution: ranked submissions + prize pool in, payout
//! list out. No side effects; the scheduler's status transition enforces
//! at-most-once execution per contest.

use crate::types::{Payout, Submission};

/// Percentage of the prize pool awarded to ranks 1..5.
pub const PRIZE_SPLIT_PERCENT: [u64; 5] = [40, 25, 15, 10, 10];

/// Split `prize_pool` across the top five of `ranked`.
///
/// `ranked` must already be ordered (vote count descending, creation order
/// breaking ties); the caller owns ranking policy. Each payout is the
/// floored percentage share; rank 1 absorbs the full rounding remainder so
/// that the payouts sum to exactly `prize_pool` whenever at least one
/// eligible submission exists. Fewer than five submissions produce fewer
/// payouts with no carry-forward of unused percentages.
pub fn distribute(ranked: &[Submission], prize_pool: u64) -> Vec<Payout> {
    let mut payouts: Vec<Payout> = ranked
        .iter()
        .take(PRIZE_SPLIT_PERCENT.len())
        .enumerate()
        .map(|(i, submission)| Payout {
            rank: (i + 1) as u8,
            user_id: submission.user_id.clone(),
            submission_id: submission.id.clone(),
            amount: (prize_pool as u128 * PRIZE_SPLIT_PERCENT[i] as u128 / 100) as u64,
        })
        .collect();

    if !payouts.is_empty() {
        let allocated: u64 = payouts.iter().map(|p| p.amount).sum();
        // Floors only ever under-allocate, so this cannot underflow.
        payouts[0].amount += prize_pool - allocated;
    }
    payouts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::make_submission;

    fn subs(n: usize) -> Vec<Submission> {
        (0..n)
            .map(|i| {
                make_submission(
                    &format!("s{}", i + 1),
                    &format!("u{}", i + 1),
                    "c1",
                    (100 - i) as u64,
                    i as u64,
                )
            })
            .collect()
    }

    fn amounts(payouts: &[Payout]) -> Vec<u64> {
        payouts.iter().map(|p| p.amount).collect()
    }

    #[test]
    fn test_even_pool_no_remainder() {
        let payouts = distribute(&subs(5), 1000);
        assert_eq!(amounts(&payouts), vec![400, 250, 150, 100, 100]);
    }

    #[test]
    fn test_remainder_goes_to_rank_one() {
        let payouts = distribute(&subs(5), 1001);
        assert_eq!(amounts(&payouts), vec![401, 250, 150, 100, 100]);
        assert_eq!(payouts.iter().map(|p| p.amount).sum::<u64>(), 1001);
    }

    #[test]
    fn test_fewer_than_five_submissions() {
        let payouts = distribute(&subs(3), 1000);
        assert_eq!(amounts(&payouts), vec![600, 250, 150]);
        // Unused rank-4/5 percentages flow into the remainder, which rank 1
        // absorbs, so the pool is still fully distributed.
        assert_eq!(payouts.iter().map(|p| p.amount).sum::<u64>(), 1000);
    }

    #[test]
    fn test_single_submission_takes_whole_pool() {
        let payouts = distribute(&subs(1), 777);
        assert_eq!(amounts(&payouts), vec![777]);
    }

    #[test]
    fn test_no_submissions_no_payouts() {
        assert!(distribute(&[], 1000).is_empty());
    }

    #[test]
    fn test_zero_pool() {
        let payouts = distribute(&subs(5), 0);
        assert_eq!(amounts(&payouts), vec![0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_more_than_five_submissions_capped() {
        let payouts = distribute(&subs(9), 1000);
        assert_eq!(payouts.len(), 5);
        assert_eq!(payouts[0].submission_id, "s1");
        assert_eq!(payouts[4].submission_id, "s5");
    }

    #[test]
    fn test_ranks_and_owners_follow_input_order() {
        let payouts = distribute(&subs(5), 1000);
        for (i, payout) in payouts.iter().enumerate() {
            assert_eq!(payout.rank, (i + 1) as u8);
            assert_eq!(payout.user_id, format!("u{}", i + 1));
        }
    }

    #[test]
    fn test_sum_equals_pool_for_all_counts_and_pools() {
        for n in 1..=5 {
            let ranked = subs(n);
            for pool in 0..=1000u64 {
                let payouts = distribute(&ranked, pool);
                assert_eq!(
                    payouts.iter().map(|p| p.amount).sum::<u64>(),
                    pool,
                    "n={} pool={}",
                    n,
                    pool
                );
            }
        }
    }

    #[test]
    fn test_large_pool_no_overflow() {
        let pool = u64::MAX / 2;
        let payouts = distribute(&subs(5), pool);
        assert_eq!(payouts.iter().map(|p| p.amount).sum::<u64>(), pool);
        // Rank 1 is at least its floored share
        assert!(payouts[0].amount >= (pool as u128 * 40 / 100) as u64);
    }
}
