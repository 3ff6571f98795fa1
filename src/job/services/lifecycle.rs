//! Client- and operator-facing job lifecycle operations.

use super::ServiceResult;
use crate::job::{
    domain::{
        BudgetChange, CancellationOutcome, ClientId, Contract, ContractStatus, DoerId, Job,
        JobAction, JobId, JobStatus, LifecycleError, LifecyclePolicy, Money, NewJobParams,
        Proposal, ProposalId, RedirectTarget, TeamSize,
    },
    ports::{LifecycleEvent, LifecycleEventSink, MarketplaceRepository, RepositoryError},
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::sync::Arc;
use tracing::info;

/// Request payload for posting a new job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostJobRequest {
    client_id: ClientId,
    price: Money,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    max_workers: u32,
}

impl PostJobRequest {
    /// Creates a request for a single-worker job with flexible dates.
    #[must_use]
    pub const fn new(client_id: ClientId, price: Money) -> Self {
        Self {
            client_id,
            price,
            start_date: None,
            end_date: None,
            max_workers: 1,
        }
    }

    /// Sets the scheduled start.
    #[must_use]
    pub const fn with_start_date(mut self, start_date: DateTime<Utc>) -> Self {
        self.start_date = Some(start_date);
        self
    }

    /// Sets the scheduled end.
    #[must_use]
    pub const fn with_end_date(mut self, end_date: DateTime<Utc>) -> Self {
        self.end_date = Some(end_date);
        self
    }

    /// Sets the team capacity.
    #[must_use]
    pub const fn with_max_workers(mut self, max_workers: u32) -> Self {
        self.max_workers = max_workers;
        self
    }
}

/// Request payload for a worker applying to a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitProposalRequest {
    job_id: JobId,
    doer_id: DoerId,
    proposed_price: Money,
    is_counter_offer: bool,
}

impl SubmitProposalRequest {
    /// Creates a request accepting the job's asking price.
    #[must_use]
    pub const fn new(job_id: JobId, doer_id: DoerId, proposed_price: Money) -> Self {
        Self {
            job_id,
            doer_id,
            proposed_price,
            is_counter_offer: false,
        }
    }

    /// Marks the proposal as a counter-offer.
    #[must_use]
    pub const fn as_counter_offer(mut self) -> Self {
        self.is_counter_offer = true;
        self
    }
}

/// Job lifecycle orchestration service.
#[derive(Clone)]
pub struct JobLifecycleService<R, E, C>
where
    R: MarketplaceRepository,
    E: LifecycleEventSink,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    events: Arc<E>,
    clock: Arc<C>,
    policy: LifecyclePolicy,
}

impl<R, E, C> JobLifecycleService<R, E, C>
where
    R: MarketplaceRepository,
    E: LifecycleEventSink,
    C: Clock + Send + Sync,
{
    /// Creates a new lifecycle service.
    #[must_use]
    pub const fn new(
        repository: Arc<R>,
        events: Arc<E>,
        clock: Arc<C>,
        policy: LifecyclePolicy,
    ) -> Self {
        Self {
            repository,
            events,
            clock,
            policy,
        }
    }

    /// Returns the timing policy in force.
    #[must_use]
    pub const fn policy(&self) -> &LifecyclePolicy {
        &self.policy
    }

    /// Creates a new job in `draft`.
    ///
    /// # Errors
    ///
    /// Returns [`super::ServiceError`] when validation fails or persistence
    /// rejects the write.
    pub async fn post_job(&self, request: PostJobRequest) -> ServiceResult<Job> {
        let max_workers = TeamSize::new(request.max_workers)?;
        let job = Job::post(
            NewJobParams {
                client_id: request.client_id,
                price: request.price,
                start_date: request.start_date,
                end_date: request.end_date,
                max_workers,
            },
            self.clock.utc(),
        )?;
        self.repository.store_job(&job).await?;
        info!(job_id = %job.id(), code = %job.id().share_code(), "job posted");
        Ok(job)
    }

    /// Finds a job by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`super::ServiceError::Repository`] when the lookup fails.
    pub async fn find_job(&self, job_id: JobId) -> ServiceResult<Option<Job>> {
        Ok(self.repository.find_job(job_id).await?)
    }

    /// Records the external publication payment.
    ///
    /// # Errors
    ///
    /// Returns [`super::ServiceError`] when the job is not awaiting payment or
    /// persistence fails.
    pub async fn confirm_payment(
        &self,
        job_id: JobId,
        publication_amount: Money,
    ) -> ServiceResult<Job> {
        self.mutate_job(job_id, |job, now| {
            job.confirm_payment(publication_amount, now)
        })
        .await
    }

    /// Approves a paid publication, opening the job to proposals.
    ///
    /// # Errors
    ///
    /// Returns [`super::ServiceError`] when the job is not awaiting approval or
    /// persistence fails.
    pub async fn approve_publication(&self, job_id: JobId) -> ServiceResult<Job> {
        self.mutate_job(job_id, |job, now| job.approve_publication(now))
            .await
    }

    /// Pauses an active job.
    ///
    /// # Errors
    ///
    /// Returns [`super::ServiceError`] when pausing is not permitted or
    /// persistence fails.
    pub async fn pause(&self, job_id: JobId) -> ServiceResult<Job> {
        let policy = self.policy;
        self.mutate_job(job_id, move |job, now| job.pause(now, &policy))
            .await
    }

    /// Resumes a paused job.
    ///
    /// # Errors
    ///
    /// Returns [`super::ServiceError`] when the job is not paused or persistence
    /// fails.
    pub async fn resume(&self, job_id: JobId) -> ServiceResult<Job> {
        self.mutate_job(job_id, |job, now| job.resume(now)).await
    }

    /// Cancels a job at the client's request.
    ///
    /// Live contracts under the job are cancelled with it, so no
    /// confirmation can complete against a cancelled job.
    ///
    /// # Errors
    ///
    /// Returns [`super::ServiceError`] when cancellation is not permitted, the
    /// job has a completed contract, or persistence fails.
    pub async fn cancel(
        &self,
        job_id: JobId,
        reason: impl Into<String> + Send,
    ) -> ServiceResult<(Job, CancellationOutcome)> {
        let mut job = self.load_job(job_id).await?;

        // A job with a confirmed contract can no longer be cancelled.
        let mut contracts = self.repository.contracts_by_job(job_id).await?;
        if contracts.iter().any(|c| c.status() == ContractStatus::Completed) {
            return Err(LifecycleError::InvalidTransition {
                job_id,
                status: job.status(),
                action: JobAction::Cancel,
            }
            .into());
        }

        let now = self.clock.utc();
        let expected_version = job.version();
        let previous_status = job.status();
        let outcome = job.cancel(reason, now, &self.policy)?;
        self.repository.update_job(&job, expected_version).await?;

        for contract in &mut contracts {
            if contract.status().is_terminal() {
                continue;
            }
            let contract_version = contract.version();
            contract.cancel(now)?;
            self.repository
                .update_contract(contract, contract_version)
                .await?;
        }

        self.publish_status_change(&job, previous_status).await?;
        self.events
            .publish(LifecycleEvent::JobCancelled {
                job_id,
                reason: job.cancellation_reason().unwrap_or_default().to_owned(),
                price_refunded: outcome.price_refunded,
                commission_forfeited: outcome.commission_forfeited,
            })
            .await?;
        info!(job_id = %job_id, "job cancelled");
        Ok((job, outcome))
    }

    /// Deletes an unpublished job.
    ///
    /// # Errors
    ///
    /// Returns [`super::ServiceError`] when the job was already published or
    /// persistence fails.
    pub async fn delete(&self, job_id: JobId) -> ServiceResult<()> {
        let job = self.load_job(job_id).await?;
        if !job.can_delete() {
            return Err(LifecycleError::InvalidTransition {
                job_id,
                status: job.status(),
                action: JobAction::Delete,
            }
            .into());
        }
        self.repository.delete_job(job_id).await?;
        Ok(())
    }

    /// Applies a budget change to an open job.
    ///
    /// With an active contract the change must go through a contract
    /// amendment instead; an increase pauses the job until the
    /// supplemental payment completes.
    ///
    /// # Errors
    ///
    /// Returns [`super::ServiceError::Domain`] carrying
    /// [`LifecycleError::RedirectRequired`] when a contract exists, or
    /// other lifecycle errors when the change is rejected.
    pub async fn change_budget(
        &self,
        job_id: JobId,
        new_price: Money,
    ) -> ServiceResult<BudgetChange> {
        let mut job = self.load_job(job_id).await?;

        let contracts = self.repository.contracts_by_job(job_id).await?;
        if let Some(active) = contracts.iter().find(|c| !c.status().is_terminal()) {
            return Err(LifecycleError::RedirectRequired {
                target: RedirectTarget::ContractAmendment {
                    contract_id: active.id(),
                },
            }
            .into());
        }

        let now = self.clock.utc();
        let expected_version = job.version();
        let previous_status = job.status();
        let change = job.change_budget(new_price, now)?;
        self.repository.update_job(&job, expected_version).await?;

        match change {
            BudgetChange::Applied => {
                self.events
                    .publish(LifecycleEvent::JobUpdated { job_id })
                    .await?;
            }
            BudgetChange::SupplementRequired(breakdown) => {
                self.publish_status_change(&job, previous_status).await?;
                self.events
                    .publish(LifecycleEvent::SupplementalPaymentRequested { job_id, breakdown })
                    .await?;
            }
        }
        Ok(change)
    }

    /// Applies a pending price increase after its supplement was paid.
    ///
    /// # Errors
    ///
    /// Returns [`super::ServiceError`] when no supplement is pending or
    /// persistence fails.
    pub async fn confirm_supplement(&self, job_id: JobId) -> ServiceResult<Job> {
        let job = self
            .mutate_job(job_id, |job, now| job.confirm_supplement(now))
            .await?;
        self.events
            .publish(LifecycleEvent::JobUpdated { job_id })
            .await?;
        Ok(job)
    }

    /// Supplies or replaces the job's end date, lifting a suspension.
    ///
    /// # Errors
    ///
    /// Returns [`super::ServiceError`] when the date is invalid for the job or
    /// persistence fails.
    pub async fn set_end_date(&self, job_id: JobId, end_date: DateTime<Utc>) -> ServiceResult<Job> {
        self.mutate_job(job_id, move |job, now| job.set_end_date(end_date, now))
            .await
    }

    /// Records a worker's application to an open job.
    ///
    /// # Errors
    ///
    /// Returns [`super::ServiceError`] when the job is not accepting proposals
    /// or persistence fails.
    pub async fn submit_proposal(&self, request: SubmitProposalRequest) -> ServiceResult<Proposal> {
        let job = self.load_job(request.job_id).await?;
        if job.status() != JobStatus::Open {
            return Err(LifecycleError::InvalidTransition {
                job_id: request.job_id,
                status: job.status(),
                action: JobAction::SubmitProposal,
            }
            .into());
        }
        let proposed_price = request.proposed_price.ensure_positive()?;

        let proposal = Proposal::new(
            request.job_id,
            request.doer_id,
            proposed_price,
            request.is_counter_offer,
            self.clock.utc(),
        );
        self.repository.store_proposal(&proposal).await?;
        self.events
            .publish(LifecycleEvent::ProposalSubmitted {
                job_id: request.job_id,
                proposal_id: proposal.id(),
                doer_id: request.doer_id,
            })
            .await?;
        Ok(proposal)
    }

    /// Approves a proposal at the client's request, creating its
    /// contract.
    ///
    /// The commission is supplied by the caller; computing it is a
    /// pricing concern outside this core.
    ///
    /// # Errors
    ///
    /// Returns [`super::ServiceError`] when the proposal is resolved, the team
    /// is full, or another writer filled the slot first.
    pub async fn select_worker(
        &self,
        proposal_id: ProposalId,
        commission: Money,
    ) -> ServiceResult<Contract> {
        let proposal = self
            .repository
            .find_proposal(proposal_id)
            .await?
            .ok_or(RepositoryError::ProposalNotFound(proposal_id))?;
        if !proposal.is_pending() {
            return Err(LifecycleError::ProposalAlreadyResolved {
                proposal_id,
                status: proposal.status(),
            }
            .into());
        }

        let job = self.load_job(proposal.job_id()).await?;
        let peers = self.repository.proposals_by_job(job.id()).await?;
        let now = self.clock.utc();

        let (commit, contract) =
            super::sweep::build_selection(&job, proposal, &peers, commission, now, &self.policy)?;
        let events = super::sweep::selection_events(&commit);
        self.repository.commit_selection(commit).await?;
        for event in events {
            self.events.publish(event).await?;
        }
        info!(contract_id = %contract.id(), "worker selected");
        Ok(contract)
    }

    async fn load_job(&self, job_id: JobId) -> ServiceResult<Job> {
        Ok(self
            .repository
            .find_job(job_id)
            .await?
            .ok_or(RepositoryError::JobNotFound(job_id))?)
    }

    async fn mutate_job<F>(&self, job_id: JobId, mutation: F) -> ServiceResult<Job>
    where
        F: FnOnce(&mut Job, DateTime<Utc>) -> Result<(), LifecycleError> + Send,
    {
        let mut job = self.load_job(job_id).await?;
        let now = self.clock.utc();
        let expected_version = job.version();
        let previous_status = job.status();
        mutation(&mut job, now)?;
        self.repository.update_job(&job, expected_version).await?;
        self.publish_status_change(&job, previous_status).await?;
        Ok(job)
    }

    async fn publish_status_change(
        &self,
        job: &Job,
        previous_status: JobStatus,
    ) -> ServiceResult<()> {
        if job.status() != previous_status {
            self.events
                .publish(LifecycleEvent::JobStatusChanged {
                    job_id: job.id(),
                    from: previous_status,
                    to: job.status(),
                })
                .await?;
        }
        Ok(())
    }
}
