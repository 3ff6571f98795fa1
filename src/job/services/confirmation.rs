//! Dual-confirmation tracking for contracts and team-job completion.

use super::ServiceResult;
use crate::job::{
    domain::{
        Contract, ContractId, ContractStatus, DoerId, Job, JobAction, JobId, JobStatus,
        LifecycleError, LifecyclePolicy, PartyRole,
    },
    ports::{LifecycleEvent, LifecycleEventSink, MarketplaceRepository, RepositoryError},
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::sync::Arc;
use tracing::info;

/// One contract's confirmation state, as shown to the client and to the
/// contract's own worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationRow {
    /// Contract the row describes.
    pub contract_id: ContractId,
    /// Worker under contract.
    pub doer_id: DoerId,
    /// Contract lifecycle status.
    pub status: ContractStatus,
    /// Whether the client has confirmed completion.
    pub client_confirmed: bool,
    /// Whether the worker has confirmed completion.
    pub doer_confirmed: bool,
}

/// Per-worker confirmation overview for a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationMatrix {
    /// Job the matrix describes.
    pub job_id: JobId,
    /// Job lifecycle status.
    pub job_status: JobStatus,
    /// One row per contract, in creation order.
    pub rows: Vec<ConfirmationRow>,
    /// Contracts confirmed by both parties.
    pub completed: usize,
    /// Contracts still awaiting at least one confirmation.
    pub outstanding: usize,
}

impl ConfirmationMatrix {
    /// Returns true when every contract of the job is confirmed complete.
    #[must_use]
    pub fn all_completed(&self) -> bool {
        self.outstanding == 0 && self.completed > 0
    }
}

/// Orchestrates contract progression and dual completion confirmation.
pub struct ConfirmationService<R, E, C> {
    repository: Arc<R>,
    events: Arc<E>,
    clock: Arc<C>,
    policy: LifecyclePolicy,
}

impl<R, E, C> ConfirmationService<R, E, C>
where
    R: MarketplaceRepository,
    E: LifecycleEventSink,
    C: Clock + Send + Sync,
{
    /// Creates a service over the given repository and event sink.
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

    /// Records the worker's acceptance of a pending contract.
    ///
    /// # Errors
    ///
    /// Returns [`super::ServiceError`] when the contract is not pending
    /// or persistence fails.
    pub async fn accept_contract(&self, contract_id: ContractId) -> ServiceResult<Contract> {
        self.mutate_contract(contract_id, Contract::accept).await
    }

    /// Records the start of work under an accepted contract.
    ///
    /// # Errors
    ///
    /// Returns [`super::ServiceError`] when the contract is not accepted
    /// or persistence fails.
    pub async fn start_work(&self, contract_id: ContractId) -> ServiceResult<Contract> {
        self.mutate_contract(contract_id, Contract::start_work).await
    }

    /// Checks a client-entered pairing code against the contract's
    /// issued code.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::PairingRejected`] when the code does
    /// not match or has expired.
    pub async fn verify_pairing(&self, contract_id: ContractId, code: &str) -> ServiceResult<()> {
        let contract = self.load_contract(contract_id).await?;
        let now = self.clock.utc();
        if !contract.pairing().matches(code, now) {
            return Err(LifecycleError::PairingRejected { contract_id }.into());
        }
        Ok(())
    }

    /// Returns the instant the confirmation window opens for the job, or
    /// `None` when the end date is flexible and the window opens with
    /// the work itself.
    #[must_use]
    pub fn confirmation_opens_at(&self, job: &Job) -> Option<DateTime<Utc>> {
        job.confirmation_opens_at(&self.policy)
    }

    /// Returns true when the given contract currently accepts a
    /// completion confirmation.
    #[must_use]
    pub fn can_confirm(&self, job: &Job, contract: &Contract, now: DateTime<Utc>) -> bool {
        contract.status().accepts_confirmation()
            && self
                .confirmation_opens_at(job)
                .is_none_or(|opens_at| now >= opens_at)
    }

    /// Records one party's completion confirmation.
    ///
    /// The second confirmation completes the contract and requests the
    /// escrow release; when it was the job's last outstanding contract,
    /// the job completes too.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] when the job has
    /// already reached a terminal status,
    /// [`LifecycleError::WindowNotOpen`] before the window opens,
    /// [`LifecycleError::AlreadyConfirmed`] on a repeat by the same
    /// party, and [`super::ServiceError`] when persistence or event
    /// delivery fails.
    pub async fn confirm(
        &self,
        contract_id: ContractId,
        actor: PartyRole,
    ) -> ServiceResult<Contract> {
        let mut contract = self.load_contract(contract_id).await?;
        let job = self.load_job(contract.job_id()).await?;
        let now = self.clock.utc();

        // No confirmation may land once the job itself is over.
        if job.status().is_terminal() {
            return Err(LifecycleError::InvalidTransition {
                job_id: job.id(),
                status: job.status(),
                action: JobAction::Confirm,
            }
            .into());
        }

        if let Some(opens_at) = self.confirmation_opens_at(&job)
            && now < opens_at
        {
            return Err(LifecycleError::WindowNotOpen {
                contract_id,
                opens_at,
            }
            .into());
        }

        let expected_version = contract.version();
        let outcome = contract.record_confirmation(actor, now)?;
        self.repository
            .update_contract(&contract, expected_version)
            .await?;
        info!(contract_id = %contract_id, actor = actor.as_str(), "completion confirmed");

        if outcome.contract_completed {
            self.events
                .publish(LifecycleEvent::EscrowReleaseRequested {
                    job_id: contract.job_id(),
                    contract_id,
                    amount: contract.price(),
                })
                .await?;
            self.complete_job_if_done(job, now).await?;
        }
        Ok(contract)
    }

    /// Returns the per-worker confirmation overview for a job.
    ///
    /// # Errors
    ///
    /// Returns [`super::ServiceError`] when the job is unknown or
    /// persistence fails.
    pub async fn confirmation_matrix(&self, job_id: JobId) -> ServiceResult<ConfirmationMatrix> {
        let job = self.load_job(job_id).await?;
        let contracts = self.repository.contracts_by_job(job_id).await?;

        let rows: Vec<ConfirmationRow> = contracts
            .iter()
            .map(|contract| ConfirmationRow {
                contract_id: contract.id(),
                doer_id: contract.doer_id(),
                status: contract.status(),
                client_confirmed: contract.client_confirmed(),
                doer_confirmed: contract.doer_confirmed(),
            })
            .collect();
        let completed = rows
            .iter()
            .filter(|row| row.status == ContractStatus::Completed)
            .count();
        let outstanding = rows
            .iter()
            .filter(|row| {
                !matches!(
                    row.status,
                    ContractStatus::Completed | ContractStatus::Cancelled
                )
            })
            .count();

        Ok(ConfirmationMatrix {
            job_id,
            job_status: job.status(),
            rows,
            completed,
            outstanding,
        })
    }

    /// Completes the job once every live contract is confirmed.
    async fn complete_job_if_done(&self, mut job: Job, now: DateTime<Utc>) -> ServiceResult<()> {
        let matrix = self.confirmation_matrix(job.id()).await?;
        if !matrix.all_completed() || job.status() != JobStatus::InProgress {
            return Ok(());
        }

        let expected_version = job.version();
        let previous_status = job.status();
        job.complete(now)?;
        self.repository.update_job(&job, expected_version).await?;
        self.events
            .publish(LifecycleEvent::JobStatusChanged {
                job_id: job.id(),
                from: previous_status,
                to: job.status(),
            })
            .await?;
        self.events
            .publish(LifecycleEvent::JobCompleted { job_id: job.id() })
            .await?;
        info!(job_id = %job.id(), "every contract confirmed; job completed");
        Ok(())
    }

    async fn load_contract(&self, contract_id: ContractId) -> ServiceResult<Contract> {
        Ok(self
            .repository
            .find_contract(contract_id)
            .await?
            .ok_or(RepositoryError::ContractNotFound(contract_id))?)
    }

    async fn load_job(&self, job_id: JobId) -> ServiceResult<Job> {
        Ok(self
            .repository
            .find_job(job_id)
            .await?
            .ok_or(RepositoryError::JobNotFound(job_id))?)
    }

    async fn mutate_contract<F>(&self, contract_id: ContractId, mutation: F) -> ServiceResult<Contract>
    where
        F: FnOnce(&mut Contract, DateTime<Utc>) -> Result<(), LifecycleError> + Send,
    {
        let mut contract = self.load_contract(contract_id).await?;
        let now = self.clock.utc();
        let expected_version = contract.version();
        mutation(&mut contract, now)?;
        self.repository
            .update_contract(&contract, expected_version)
            .await?;
        Ok(contract)
    }
}
