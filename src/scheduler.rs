// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Contest lifecycle scheduling.
//!
//! Each active contest owns at most one in-memory timer that fires at its
//! end time and runs reward distribution. Timers are not persisted; the
//! scheduler rebuilds them from the contest store on startup, so the
//! store's `end_at_ms` and `status` are the only durable state.
//!
//! A single sleep is capped at `MAX_TIMER_DELAY_MS`; longer delays are
//! chained, re-reading the wall clock on every wake so a multi-week wait
//! tracks the persisted `end_at_ms` even across clock adjustments or a
//! host suspend. Firing is serialized per contest through a lock
//! registry, and the status compare-and-set makes a late duplicate fire
//! a no-op.

use crate::contest_store::ContestStore;
use crate::distributor;
use crate::error::{ContestError, ContestResult};
use crate::ledger::LedgerStore;
use crate::metrics::ContestMetrics;
use crate::types::{Contest, ContestStatus, NewLedgerEntry};
use crate::utils::now_ms;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Upper bound on a single timer sleep. Delays beyond this are chained.
pub const MAX_TIMER_DELAY_MS: u64 = i32::MAX as u64;

/// A distribution is a ranked-submission read plus one ledger batch; if it
/// has not finished within this bound something is wedged and the contest
/// is better left active for a retry.
const DISTRIBUTION_TIMEOUT: Duration = Duration::from_secs(60);

/// Wall-clock source the scheduler consults at arm time and on every
/// timer wake. The store's `end_at_ms` is wall-clock time, so timers
/// must track the wall clock, not a monotonic instant fixed at arm time.
pub trait WallClock: Send + Sync {
    fn now_ms(&self) -> u64;
}

pub struct SystemClock;

impl WallClock for SystemClock {
    fn now_ms(&self) -> u64 {
        now_ms()
    }
}

struct ScheduledJob {
    handle: JoinHandle<()>,
    end_at_ms: u64,
    /// Distinguishes this job from any later re-arm of the same contest,
    /// so a finishing timer never evicts its replacement.
    generation: u64,
}

pub struct ContestScheduler {
    store: Arc<dyn ContestStore>,
    ledger: Arc<dyn LedgerStore>,
    /// Currency payouts are denominated in
    currency: String,
    metrics: Arc<ContestMetrics>,
    clock: Arc<dyn WallClock>,
    jobs: Mutex<HashMap<String, ScheduledJob>>,
    fire_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    next_generation: AtomicU64,
}

impl ContestScheduler {
    pub fn new(
        store: Arc<dyn ContestStore>,
        ledger: Arc<dyn LedgerStore>,
        currency: String,
        metrics: Arc<ContestMetrics>,
    ) -> Arc<Self> {
        Self::new_with_clock(store, ledger, currency, metrics, Arc::new(SystemClock))
    }

    pub fn new_with_clock(
        store: Arc<dyn ContestStore>,
        ledger: Arc<dyn LedgerStore>,
        currency: String,
        metrics: Arc<ContestMetrics>,
        clock: Arc<dyn WallClock>,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            ledger,
            currency,
            metrics,
            clock,
            jobs: Mutex::new(HashMap::new()),
            fire_locks: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(0),
        })
    }

    /// Rebuild timers for every active contest. Contests already past due
    /// fire before this returns.
    pub async fn initialize(self: &Arc<Self>) -> ContestResult<usize> {
        let active = self.store.load_active_contests().await?;
        let count = active.len();
        for contest in active {
            self.arm(&contest.id, contest.end_at_ms).await?;
        }
        info!("[Scheduler] Initialized with {} active contests", count);
        Ok(count)
    }

    /// Schedule (or reschedule) the end-time timer for a contest. An
    /// already-due end time fires synchronously instead of arming.
    pub async fn arm(self: &Arc<Self>, contest_id: &str, end_at_ms: u64) -> ContestResult<()> {
        self.cancel(contest_id);

        let now = self.clock.now_ms();
        if end_at_ms <= now {
            info!(
                "[Scheduler] Contest {} end time {} already passed, firing now",
                contest_id, end_at_ms
            );
            return self.fire(contest_id).await;
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let scheduler = self.clone();
        let id = contest_id.to_string();
        let handle = tokio::spawn(async move {
            loop {
                let remaining = end_at_ms.saturating_sub(scheduler.clock.now_ms());
                if remaining == 0 {
                    break;
                }
                let slice = Duration::from_millis(remaining.min(MAX_TIMER_DELAY_MS));
                scheduler.metrics.timer_slices_scheduled.inc();
                tokio::time::sleep(slice).await;
            }
            // The fire runs on its own task: a cancel aborting this one
            // must never be able to stop the distribution between the
            // payout write and the status transition.
            tokio::spawn(async move {
                if let Err(e) = scheduler.fire(&id).await {
                    error!("[Scheduler] Timer fire for contest {} failed: {:?}", id, e);
                }
                scheduler.finish_job(&id, generation);
            });
        });

        let mut jobs = self.jobs.lock().unwrap();
        jobs.insert(
            contest_id.to_string(),
            ScheduledJob {
                handle,
                end_at_ms,
                generation,
            },
        );
        self.metrics.contests_armed.set(jobs.len() as i64);
        debug!(
            "[Scheduler] Armed contest {} for end time {} ({} ms out)",
            contest_id,
            end_at_ms,
            end_at_ms - now
        );
        Ok(())
    }

    /// Drop the timer for a contest, if any. Returns whether one existed.
    /// A callback already dispatched past its last sleep is not stopped;
    /// the status guard in `fire` makes it harmless.
    pub fn cancel(&self, contest_id: &str) -> bool {
        let mut jobs = self.jobs.lock().unwrap();
        let cancelled = match jobs.remove(contest_id) {
            Some(job) => {
                job.handle.abort();
                debug!(
                    "[Scheduler] Cancelled timer for contest {} (end {})",
                    contest_id, job.end_at_ms
                );
                true
            }
            None => false,
        };
        self.metrics.contests_armed.set(jobs.len() as i64);
        cancelled
    }

    pub fn is_armed(&self, contest_id: &str) -> bool {
        self.jobs.lock().unwrap().contains_key(contest_id)
    }

    /// End a contest: distribute the prize pool over the current ranked
    /// approved submissions and transition Active -> Ended. No-ops for
    /// unknown or non-active contests, so duplicate fires (timer plus
    /// manual end, or a cancelled-too-late callback) are safe.
    pub async fn fire(&self, contest_id: &str) -> ContestResult<()> {
        let lock = self.fire_lock(contest_id);
        let _guard = lock.lock().await;

        let Some(contest) = self.store.get_contest(contest_id).await? else {
            debug!("[Scheduler] Fire for unknown contest {}, skipping", contest_id);
            return Ok(());
        };
        if contest.status != ContestStatus::Active {
            debug!(
                "[Scheduler] Contest {} is {:?}, nothing to fire",
                contest_id, contest.status
            );
            return Ok(());
        }

        match tokio::time::timeout(DISTRIBUTION_TIMEOUT, self.distribute_and_end(&contest)).await {
            Ok(Ok(payout_count)) => {
                self.metrics.distributions_fired.inc();
                info!(
                    "[Scheduler] Contest {} ended with {} payouts from pool {}",
                    contest_id, payout_count, contest.prize_pool
                );
                Ok(())
            }
            Ok(Err(e)) => {
                self.metrics.distribution_failures.inc();
                error!(
                    "[Scheduler] Distribution for contest {} failed, contest stays active: {:?}",
                    contest_id, e
                );
                Err(e)
            }
            Err(_) => {
                self.metrics.distribution_failures.inc();
                error!(
                    "[Scheduler] Distribution for contest {} timed out, contest stays active",
                    contest_id
                );
                Err(ContestError::InternalError(format!(
                    "distribution for contest {} timed out",
                    contest_id
                )))
            }
        }
    }

    async fn distribute_and_end(&self, contest: &Contest) -> ContestResult<usize> {
        let ranked = self.store.ranked_approved_submissions(&contest.id).await?;
        let payouts = distributor::distribute(&ranked, contest.prize_pool);

        if !payouts.is_empty() {
            let mut entries = Vec::with_capacity(payouts.len());
            for payout in &payouts {
                let delta = i64::try_from(payout.amount).map_err(|_| {
                    ContestError::InternalError(format!(
                        "payout amount {} overflows ledger delta",
                        payout.amount
                    ))
                })?;
                entries.push(NewLedgerEntry {
                    user_id: payout.user_id.clone(),
                    currency: self.currency.clone(),
                    delta,
                    reason: format!("contest prize rank {}", payout.rank),
                    external_tx_hash: None,
                    related_contest_id: Some(contest.id.clone()),
                    related_submission_id: Some(payout.submission_id.clone()),
                });
            }
            let written = self.ledger.append_batch(entries).await?;
            self.metrics
                .ledger_entries_written
                .inc_by(written.len() as u64);
        }

        let ended = self
            .store
            .transition_status(&contest.id, ContestStatus::Active, ContestStatus::Ended)
            .await?;
        if !ended {
            // Only reachable if something mutated status outside the fire
            // lock; the payouts above are already committed.
            warn!(
                "[Scheduler] Contest {} left Active during distribution",
                contest.id
            );
        }
        Ok(payouts.len())
    }

    /// Draft -> Active, then arm the end-time timer.
    pub async fn activate_contest(self: &Arc<Self>, contest_id: &str) -> ContestResult<()> {
        let Some(contest) = self.store.get_contest(contest_id).await? else {
            return Err(ContestError::ContestNotFound(contest_id.to_string()));
        };
        let activated = self
            .store
            .transition_status(contest_id, ContestStatus::Draft, ContestStatus::Active)
            .await?;
        if !activated {
            return Err(ContestError::InvalidStatusTransition {
                from: contest.status,
                to: ContestStatus::Active,
            });
        }
        info!(
            "[Scheduler] Contest {} activated, ends at {}",
            contest_id, contest.end_at_ms
        );
        self.arm(contest_id, contest.end_at_ms).await
    }

    /// Move a contest's end time. Active contests are rearmed (a
    /// now-past end time fires immediately); draft contests pick the new
    /// time up on activation; ended contests cannot be reopened.
    pub async fn update_contest_end_at(
        self: &Arc<Self>,
        contest_id: &str,
        end_at_ms: u64,
    ) -> ContestResult<()> {
        let Some(contest) = self.store.get_contest(contest_id).await? else {
            return Err(ContestError::ContestNotFound(contest_id.to_string()));
        };
        if contest.status == ContestStatus::Ended {
            return Err(ContestError::InvalidStatusTransition {
                from: ContestStatus::Ended,
                to: ContestStatus::Active,
            });
        }
        if end_at_ms <= contest.start_at_ms {
            return Err(ContestError::InvalidEndTime(format!(
                "end time {} is not after start time {}",
                end_at_ms, contest.start_at_ms
            )));
        }
        self.store.set_end_at(contest_id, end_at_ms).await?;
        info!(
            "[Scheduler] Contest {} end time moved to {}",
            contest_id, end_at_ms
        );
        if contest.status == ContestStatus::Active {
            self.arm(contest_id, end_at_ms).await?;
        }
        Ok(())
    }

    /// End a contest ahead of its timer. Idempotent: an already-ended
    /// contest is a no-op.
    pub async fn end_contest_now(&self, contest_id: &str) -> ContestResult<()> {
        if self.store.get_contest(contest_id).await?.is_none() {
            return Err(ContestError::ContestNotFound(contest_id.to_string()));
        }
        self.cancel(contest_id);
        self.fire(contest_id).await
    }

    /// Remove a contest and its timer. Ledger entries it produced stay.
    pub async fn delete_contest(&self, contest_id: &str) -> ContestResult<bool> {
        self.cancel(contest_id);
        self.fire_locks.lock().unwrap().remove(contest_id);
        let removed = self.store.remove_contest(contest_id).await?;
        if removed {
            info!("[Scheduler] Contest {} deleted", contest_id);
        }
        Ok(removed)
    }

    fn fire_lock(&self, contest_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.fire_locks
            .lock()
            .unwrap()
            .entry(contest_id.to_string())
            .or_default()
            .clone()
    }

    fn finish_job(&self, contest_id: &str, generation: u64) {
        let mut jobs = self.jobs.lock().unwrap();
        if jobs
            .get(contest_id)
            .map(|job| job.generation == generation)
            .unwrap_or(false)
        {
            jobs.remove(contest_id);
        }
        self.metrics.contests_armed.set(jobs.len() as i64);
    }
}
