// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Persistence seam for contests and submissions.
//!
//! The scheduler rederives its in-memory timer set from this store on
//! startup; `Contest.end_at_ms` and `Contest.status` are the only source
//! of truth for scheduling.

use crate::error::{ContestError, ContestResult};
use crate::types::{Contest, ContestStatus, Submission, SubmissionStatus};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[async_trait]
pub trait ContestStore: Send + Sync {
    async fn get_contest(&self, id: &str) -> ContestResult<Option<Contest>>;

    async fn load_active_contests(&self) -> ContestResult<Vec<Contest>>;

    async fn upsert_contest(&self, contest: Contest) -> ContestResult<()>;

    /// Compare-and-set status transition. Returns false if the contest was
    /// not in `from` (or does not exist); callers treat that as "someone
    /// else got there first", not an error.
    async fn transition_status(
        &self,
        id: &str,
        from: ContestStatus,
        to: ContestStatus,
    ) -> ContestResult<bool>;

    async fn set_end_at(&self, id: &str, end_at_ms: u64) -> ContestResult<bool>;

    async fn remove_contest(&self, id: &str) -> ContestResult<bool>;

    /// Approved submissions for a contest, ranked by vote count descending
    /// with creation order (earliest first) breaking ties. This ordering is
    /// the distribution ranking; the distributor itself never sorts.
    async fn ranked_approved_submissions(&self, contest_id: &str)
        -> ContestResult<Vec<Submission>>;

    async fn upsert_submission(&self, submission: Submission) -> ContestResult<()>;

    /// Increment a submission's vote count, returning the new count.
    async fn record_vote(&self, submission_id: &str) -> ContestResult<u64>;
}

pub struct InMemoryContestStore {
    contests: RwLock<HashMap<String, Contest>>,
    submissions: RwLock<HashMap<String, Submission>>,
}

impl InMemoryContestStore {
    pub fn new() -> Self {
        Self {
            contests: RwLock::new(HashMap::new()),
            submissions: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryContestStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContestStore for InMemoryContestStore {
    async fn get_contest(&self, id: &str) -> ContestResult<Option<Contest>> {
        Ok(self.contests.read().await.get(id).cloned())
    }

    async fn load_active_contests(&self) -> ContestResult<Vec<Contest>> {
        let contests = self.contests.read().await;
        let mut active: Vec<Contest> = contests
            .values()
            .filter(|c| c.status == ContestStatus::Active)
            .cloned()
            .collect();
        active.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(active)
    }

    async fn upsert_contest(&self, contest: Contest) -> ContestResult<()> {
        self.contests
            .write()
            .await
            .insert(contest.id.clone(), contest);
        Ok(())
    }

    async fn transition_status(
        &self,
        id: &str,
        from: ContestStatus,
        to: ContestStatus,
    ) -> ContestResult<bool> {
        let mut contests = self.contests.write().await;
        match contests.get_mut(id) {
            Some(contest) if contest.status == from => {
                contest.status = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_end_at(&self, id: &str, end_at_ms: u64) -> ContestResult<bool> {
        let mut contests = self.contests.write().await;
        match contests.get_mut(id) {
            Some(contest) => {
                contest.end_at_ms = end_at_ms;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove_contest(&self, id: &str) -> ContestResult<bool> {
        Ok(self.contests.write().await.remove(id).is_some())
    }

    async fn ranked_approved_submissions(
        &self,
        contest_id: &str,
    ) -> ContestResult<Vec<Submission>> {
        let submissions = self.submissions.read().await;
        let mut ranked: Vec<Submission> = submissions
            .values()
            .filter(|s| s.contest_id == contest_id && s.status == SubmissionStatus::Approved)
            .cloned()
            .collect();
        ranked.sort_by(|a, b| {
            b.vote_count
                .cmp(&a.vote_count)
                .then_with(|| a.created_at_ms.cmp(&b.created_at_ms))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(ranked)
    }

    async fn upsert_submission(&self, submission: Submission) -> ContestResult<()> {
        self.submissions
            .write()
            .await
            .insert(submission.id.clone(), submission);
        Ok(())
    }

    async fn record_vote(&self, submission_id: &str) -> ContestResult<u64> {
        let mut submissions = self.submissions.write().await;
        match submissions.get_mut(submission_id) {
            Some(submission) => {
                submission.vote_count += 1;
                Ok(submission.vote_count)
            }
            None => Err(ContestError::SubmissionNotFound(submission_id.to_string())),
        }
    }
}
