//! Deadline sweep: the scheduled pass that advances jobs whose clocks
//! ran out.
//!
//! One run evaluates every due job once. Each job is advanced with a
//! versioned write, so concurrent runs (or a racing client action) leave
//! exactly one winner per job; the loser's conflict is counted and the
//! next run re-evaluates from the fresh state.

use super::{ServiceError, ServiceResult};
use crate::job::{
    domain::{
        CancellationOutcome, Contract, Job, JobStatus, LifecycleError, LifecyclePolicy, Money,
        NO_APPLICANTS_REASON, Proposal,
    },
    ports::{
        LifecycleEvent, LifecycleEventSink, MarketplaceRepository, RepositoryError,
        SelectionCommit, SweepCriteria,
    },
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::sync::Arc;
use tracing::{info, warn};

/// Tally of the transitions one sweep run applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Paused jobs returned to service.
    pub resumed: usize,
    /// Jobs whose earliest pending proposal was auto-selected.
    pub selected: usize,
    /// Jobs cancelled because no worker ever applied.
    pub cancelled: usize,
    /// Flexible-end jobs suspended pending a client-supplied end date.
    pub suspended: usize,
    /// Jobs another writer advanced first; re-evaluated on the next run.
    pub conflicts: usize,
}

/// What the sweep did with one due job.
enum SweepOutcome {
    Resumed,
    Selected,
    Cancelled,
    Suspended,
    Skipped,
}

/// Scheduled evaluator for deadline-triggered transitions.
///
/// Covers the three automatic exits from `open` at the selection
/// deadline (auto-select, auto-cancel, auto-suspend) and the automatic
/// resumption of jobs paused longer than the policy timeout.
pub struct DeadlineSweep<R, E, C> {
    repository: Arc<R>,
    events: Arc<E>,
    clock: Arc<C>,
    policy: LifecyclePolicy,
    commission: Money,
}

impl<R, E, C> DeadlineSweep<R, E, C>
where
    R: MarketplaceRepository,
    E: LifecycleEventSink,
    C: Clock + Send + Sync,
{
    /// Creates a sweep over the given repository and event sink.
    ///
    /// `commission` is applied to contracts the sweep creates; explicit
    /// selections carry a caller-supplied commission instead.
    #[must_use]
    pub const fn new(
        repository: Arc<R>,
        events: Arc<E>,
        clock: Arc<C>,
        policy: LifecyclePolicy,
        commission: Money,
    ) -> Self {
        Self {
            repository,
            events,
            clock,
            policy,
            commission,
        }
    }

    /// Evaluates every due job once and applies the transitions whose
    /// deadlines have passed.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] on persistence or event-delivery failure.
    /// Version conflicts are not errors: the racing writer won, and the
    /// job is re-evaluated on the next run.
    pub async fn run(&self) -> ServiceResult<SweepReport> {
        let now = self.clock.utc();
        let criteria = SweepCriteria {
            start_cutoff: now + self.policy.selection_lead(),
            paused_before: now - self.policy.pause_auto_resume(),
        };

        let due = self.repository.jobs_due_for_sweep(criteria).await?;
        let mut report = SweepReport::default();
        for job in due {
            let job_id = job.id();
            match self.advance(job, now, criteria).await {
                Ok(SweepOutcome::Resumed) => {
                    report.resumed = report.resumed.saturating_add(1);
                }
                Ok(SweepOutcome::Selected) => {
                    report.selected = report.selected.saturating_add(1);
                }
                Ok(SweepOutcome::Cancelled) => {
                    report.cancelled = report.cancelled.saturating_add(1);
                }
                Ok(SweepOutcome::Suspended) => {
                    report.suspended = report.suspended.saturating_add(1);
                }
                Ok(SweepOutcome::Skipped) => {}
                Err(ServiceError::Repository(
                    RepositoryError::JobVersionConflict(_)
                    | RepositoryError::ContractVersionConflict(_),
                )) => {
                    warn!(job_id = %job_id, "sweep lost a write race; deferring");
                    report.conflicts = report.conflicts.saturating_add(1);
                }
                Err(err) => return Err(err),
            }
        }

        info!(
            resumed = report.resumed,
            selected = report.selected,
            cancelled = report.cancelled,
            suspended = report.suspended,
            conflicts = report.conflicts,
            "deadline sweep finished"
        );
        Ok(report)
    }

    async fn advance(
        &self,
        job: Job,
        now: DateTime<Utc>,
        criteria: SweepCriteria,
    ) -> ServiceResult<SweepOutcome> {
        match job.status() {
            JobStatus::Paused => self.resume(job, now, criteria).await,
            JobStatus::Open => self.close_selection(job, now, criteria).await,
            JobStatus::Draft
            | JobStatus::PendingPayment
            | JobStatus::PendingApproval
            | JobStatus::InProgress
            | JobStatus::Completed
            | JobStatus::Cancelled
            | JobStatus::Suspended => Ok(SweepOutcome::Skipped),
        }
    }

    /// Returns a paused job to service once its pause timed out or its
    /// selection deadline arrived.
    ///
    /// A job paused for a pending budget supplement stays paused: only
    /// the completed payment releases it.
    async fn resume(
        &self,
        mut job: Job,
        now: DateTime<Utc>,
        criteria: SweepCriteria,
    ) -> ServiceResult<SweepOutcome> {
        let pause_expired = job
            .paused_at()
            .is_some_and(|paused| paused <= criteria.paused_before);
        let deadline_arrived = job
            .start_date()
            .is_some_and(|start| start <= criteria.start_cutoff);
        if job.pending_new_price().is_some() || !(pause_expired || deadline_arrived) {
            return Ok(SweepOutcome::Skipped);
        }

        let expected_version = job.version();
        let previous_status = job.status();
        job.resume(now)?;
        self.repository.update_job(&job, expected_version).await?;
        self.events
            .publish(LifecycleEvent::JobStatusChanged {
                job_id: job.id(),
                from: previous_status,
                to: job.status(),
            })
            .await?;
        info!(job_id = %job.id(), "paused job resumed");
        Ok(SweepOutcome::Resumed)
    }

    /// Applies the selection-deadline exit for an open job: cancel when
    /// nobody applied, suspend when the end date is still flexible,
    /// otherwise select the earliest pending proposal.
    async fn close_selection(
        &self,
        job: Job,
        now: DateTime<Utc>,
        criteria: SweepCriteria,
    ) -> ServiceResult<SweepOutcome> {
        let deadline_arrived = job
            .start_date()
            .is_some_and(|start| start <= criteria.start_cutoff);
        if !deadline_arrived {
            return Ok(SweepOutcome::Skipped);
        }

        let proposals = self.repository.proposals_by_job(job.id()).await?;
        if proposals.is_empty() && job.selected_workers().is_empty() {
            return self.cancel_unfilled(job, now).await;
        }
        if job.end_date().is_none() {
            return self.suspend(job, now).await;
        }

        let earliest_pending = proposals.iter().find(|proposal| proposal.is_pending());
        if job.selected_workers().is_empty()
            && let Some(proposal) = earliest_pending.cloned()
        {
            return self.auto_select(job, proposal, &proposals, now).await;
        }
        Ok(SweepOutcome::Skipped)
    }

    async fn cancel_unfilled(&self, mut job: Job, now: DateTime<Utc>) -> ServiceResult<SweepOutcome> {
        let expected_version = job.version();
        let previous_status = job.status();
        let outcome: CancellationOutcome = job.cancel_unfilled(now)?;
        self.repository.update_job(&job, expected_version).await?;
        self.events
            .publish(LifecycleEvent::JobStatusChanged {
                job_id: job.id(),
                from: previous_status,
                to: job.status(),
            })
            .await?;
        self.events
            .publish(LifecycleEvent::JobCancelled {
                job_id: job.id(),
                reason: NO_APPLICANTS_REASON.to_owned(),
                price_refunded: outcome.price_refunded,
                commission_forfeited: outcome.commission_forfeited,
            })
            .await?;
        info!(job_id = %job.id(), "job cancelled: no worker applied");
        Ok(SweepOutcome::Cancelled)
    }

    async fn suspend(&self, mut job: Job, now: DateTime<Utc>) -> ServiceResult<SweepOutcome> {
        let expected_version = job.version();
        let previous_status = job.status();
        job.suspend(now)?;
        self.repository.update_job(&job, expected_version).await?;
        self.events
            .publish(LifecycleEvent::JobStatusChanged {
                job_id: job.id(),
                from: previous_status,
                to: job.status(),
            })
            .await?;
        info!(job_id = %job.id(), "flexible-end job suspended at selection deadline");
        Ok(SweepOutcome::Suspended)
    }

    async fn auto_select(
        &self,
        job: Job,
        proposal: Proposal,
        peers: &[Proposal],
        now: DateTime<Utc>,
    ) -> ServiceResult<SweepOutcome> {
        let (commit, contract) =
            build_selection(&job, proposal, peers, self.commission, now, &self.policy)?;
        let events = selection_events(&commit);
        self.repository.commit_selection(commit).await?;
        for event in events {
            self.events.publish(event).await?;
        }
        info!(
            job_id = %job.id(),
            contract_id = %contract.id(),
            "earliest proposal auto-selected"
        );
        Ok(SweepOutcome::Selected)
    }
}

/// Assembles the atomic unit a worker selection commits: the job with
/// the worker added, the new contract, the approved proposal, and the
/// peers rejected because the team filled.
///
/// Shared by explicit client selection and deadline auto-selection so
/// both flow through the same versioned commit.
pub(super) fn build_selection(
    job: &Job,
    proposal: Proposal,
    peers: &[Proposal],
    commission: Money,
    now: DateTime<Utc>,
    policy: &LifecyclePolicy,
) -> Result<(SelectionCommit, Contract), LifecycleError> {
    let expected_version = job.version();
    let mut updated_job = job.clone();
    updated_job.select_worker(proposal.doer_id(), now)?;

    let contract = Contract::new(
        job.id(),
        job.client_id(),
        proposal.doer_id(),
        proposal.proposed_price(),
        commission,
        now,
        policy.pairing_ttl(),
    )?;

    let mut approved = proposal;
    approved.approve();

    // Pending peers survive while slots remain for them.
    let rejected: Vec<Proposal> = if updated_job.free_slots() == 0 {
        peers
            .iter()
            .filter(|peer| peer.is_pending() && peer.id() != approved.id())
            .cloned()
            .map(|mut peer| {
                peer.reject();
                peer
            })
            .collect()
    } else {
        Vec::new()
    };

    let commit = SelectionCommit {
        job: updated_job,
        job_expected_version: expected_version,
        contract: contract.clone(),
        approved,
        rejected,
    };
    Ok((commit, contract))
}

/// Events a committed selection publishes, in order: the approval, the
/// new contract, any rejections, and the job's move to `in_progress` on
/// the first filled slot.
pub(super) fn selection_events(commit: &SelectionCommit) -> Vec<LifecycleEvent> {
    let job_id = commit.job.id();
    let mut events = vec![
        LifecycleEvent::ProposalResolved {
            job_id,
            proposal_id: commit.approved.id(),
            approved: true,
        },
        LifecycleEvent::ContractCreated {
            job_id,
            contract_id: commit.contract.id(),
            doer_id: commit.contract.doer_id(),
        },
    ];
    for peer in &commit.rejected {
        events.push(LifecycleEvent::ProposalResolved {
            job_id,
            proposal_id: peer.id(),
            approved: false,
        });
    }
    if commit.job.selected_workers().len() == 1 {
        events.push(LifecycleEvent::JobStatusChanged {
            job_id,
            from: JobStatus::Open,
            to: JobStatus::InProgress,
        });
    }
    events
}
