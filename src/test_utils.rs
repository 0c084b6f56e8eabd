// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Shared test fixtures.

use crate::types::{Contest, ContestStatus, Submission, SubmissionStatus};

pub fn make_contest(id: &str, status: ContestStatus, start_at_ms: u64, end_at_ms: u64) -> Contest {
    Contest {
        id: id.to_string(),
        slug: format!("{}-slug", id),
        start_at_ms,
        end_at_ms,
        status,
        prize_pool: 1000,
        config: serde_json::json!({}),
        created_at_ms: start_at_ms,
    }
}

pub fn make_submission(
    id: &str,
    user_id: &str,
    contest_id: &str,
    vote_count: u64,
    created_at_ms: u64,
) -> Submission {
    Submission {
        id: id.to_string(),
        user_id: user_id.to_string(),
        contest_id: contest_id.to_string(),
        vote_count,
        status: SubmissionStatus::Approved,
        created_at_ms,
    }
}
