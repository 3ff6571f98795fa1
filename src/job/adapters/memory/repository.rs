//! In-memory repository for lifecycle tests and examples.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::job::{
    domain::{Contract, ContractId, Job, JobId, JobStatus, Proposal, ProposalId},
    ports::{
        MarketplaceRepository, RepositoryError, RepositoryResult, SelectionCommit, SweepCriteria,
    },
};

/// Thread-safe in-memory marketplace repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMarketplaceRepository {
    state: Arc<RwLock<InMemoryState>>,
}

#[derive(Debug, Default)]
struct InMemoryState {
    jobs: HashMap<JobId, Job>,
    proposals: HashMap<ProposalId, Proposal>,
    contracts: HashMap<ContractId, Contract>,
    job_proposals: HashMap<JobId, Vec<ProposalId>>,
    job_contracts: HashMap<JobId, Vec<ContractId>>,
}

impl InMemoryMarketplaceRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(message: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::persistence(std::io::Error::other(message.to_string()))
}

/// Applies a versioned job replacement, enforcing optimistic concurrency.
fn replace_job(state: &mut InMemoryState, job: &Job, expected_version: i64) -> RepositoryResult<()> {
    let stored = state
        .jobs
        .get(&job.id())
        .ok_or(RepositoryError::JobNotFound(job.id()))?;
    if stored.version() != expected_version {
        return Err(RepositoryError::JobVersionConflict(job.id()));
    }
    state.jobs.insert(job.id(), job.clone());
    Ok(())
}

fn insert_proposal(state: &mut InMemoryState, proposal: &Proposal) -> RepositoryResult<()> {
    if state.proposals.contains_key(&proposal.id()) {
        return Err(RepositoryError::DuplicateProposal(proposal.id()));
    }
    state
        .job_proposals
        .entry(proposal.job_id())
        .or_default()
        .push(proposal.id());
    state.proposals.insert(proposal.id(), proposal.clone());
    Ok(())
}

fn insert_contract(state: &mut InMemoryState, contract: &Contract) -> RepositoryResult<()> {
    if state.contracts.contains_key(&contract.id()) {
        return Err(RepositoryError::DuplicateContract(contract.id()));
    }
    state
        .job_contracts
        .entry(contract.job_id())
        .or_default()
        .push(contract.id());
    state.contracts.insert(contract.id(), contract.clone());
    Ok(())
}

fn replace_proposal(state: &mut InMemoryState, proposal: &Proposal) -> RepositoryResult<()> {
    if !state.proposals.contains_key(&proposal.id()) {
        return Err(RepositoryError::ProposalNotFound(proposal.id()));
    }
    state.proposals.insert(proposal.id(), proposal.clone());
    Ok(())
}

/// Returns true when the sweep should evaluate the job under the given
/// criteria.
fn is_due(job: &Job, criteria: SweepCriteria) -> bool {
    match job.status() {
        JobStatus::Open => job
            .start_date()
            .is_some_and(|start| start <= criteria.start_cutoff),
        JobStatus::Paused => {
            let resume_due = job
                .paused_at()
                .is_some_and(|paused| paused <= criteria.paused_before);
            let deadline_due = job
                .start_date()
                .is_some_and(|start| start <= criteria.start_cutoff);
            resume_due || deadline_due
        }
        JobStatus::Draft
        | JobStatus::PendingPayment
        | JobStatus::PendingApproval
        | JobStatus::InProgress
        | JobStatus::Completed
        | JobStatus::Cancelled
        | JobStatus::Suspended => false,
    }
}

#[async_trait]
impl MarketplaceRepository for InMemoryMarketplaceRepository {
    async fn store_job(&self, job: &Job) -> RepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        if state.jobs.contains_key(&job.id()) {
            return Err(RepositoryError::DuplicateJob(job.id()));
        }
        state.jobs.insert(job.id(), job.clone());
        Ok(())
    }

    async fn find_job(&self, id: JobId) -> RepositoryResult<Option<Job>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.jobs.get(&id).cloned())
    }

    async fn update_job(&self, job: &Job, expected_version: i64) -> RepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        replace_job(&mut state, job, expected_version)
    }

    async fn delete_job(&self, id: JobId) -> RepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        if state.jobs.remove(&id).is_none() {
            return Err(RepositoryError::JobNotFound(id));
        }
        if let Some(proposal_ids) = state.job_proposals.remove(&id) {
            for proposal_id in proposal_ids {
                state.proposals.remove(&proposal_id);
            }
        }
        Ok(())
    }

    async fn store_proposal(&self, proposal: &Proposal) -> RepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        insert_proposal(&mut state, proposal)
    }

    async fn find_proposal(&self, id: ProposalId) -> RepositoryResult<Option<Proposal>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.proposals.get(&id).cloned())
    }

    async fn proposals_by_job(&self, job_id: JobId) -> RepositoryResult<Vec<Proposal>> {
        let state = self.state.read().map_err(lock_error)?;
        let mut proposals: Vec<Proposal> = state
            .job_proposals
            .get(&job_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| state.proposals.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default();
        proposals.sort_by_key(Proposal::submitted_at);
        Ok(proposals)
    }

    async fn update_proposal(&self, proposal: &Proposal) -> RepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        replace_proposal(&mut state, proposal)
    }

    async fn find_contract(&self, id: ContractId) -> RepositoryResult<Option<Contract>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.contracts.get(&id).cloned())
    }

    async fn contracts_by_job(&self, job_id: JobId) -> RepositoryResult<Vec<Contract>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state
            .job_contracts
            .get(&job_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| state.contracts.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn update_contract(
        &self,
        contract: &Contract,
        expected_version: i64,
    ) -> RepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        let stored = state
            .contracts
            .get(&contract.id())
            .ok_or(RepositoryError::ContractNotFound(contract.id()))?;
        if stored.version() != expected_version {
            return Err(RepositoryError::ContractVersionConflict(contract.id()));
        }
        state.contracts.insert(contract.id(), contract.clone());
        Ok(())
    }

    async fn commit_selection(&self, commit: SelectionCommit) -> RepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;

        // Validate every piece before touching state so a rejected commit
        // leaves nothing partially applied.
        let stored = state
            .jobs
            .get(&commit.job.id())
            .ok_or(RepositoryError::JobNotFound(commit.job.id()))?;
        if stored.version() != commit.job_expected_version {
            return Err(RepositoryError::JobVersionConflict(commit.job.id()));
        }
        if state.contracts.contains_key(&commit.contract.id()) {
            return Err(RepositoryError::DuplicateContract(commit.contract.id()));
        }
        if !state.proposals.contains_key(&commit.approved.id()) {
            return Err(RepositoryError::ProposalNotFound(commit.approved.id()));
        }
        for proposal in &commit.rejected {
            if !state.proposals.contains_key(&proposal.id()) {
                return Err(RepositoryError::ProposalNotFound(proposal.id()));
            }
        }

        state.jobs.insert(commit.job.id(), commit.job.clone());
        insert_contract(&mut state, &commit.contract)?;
        replace_proposal(&mut state, &commit.approved)?;
        for proposal in &commit.rejected {
            replace_proposal(&mut state, proposal)?;
        }
        Ok(())
    }

    async fn jobs_due_for_sweep(&self, criteria: SweepCriteria) -> RepositoryResult<Vec<Job>> {
        let state = self.state.read().map_err(lock_error)?;
        let mut due: Vec<Job> = state
            .jobs
            .values()
            .filter(|job| is_due(job, criteria))
            .cloned()
            .collect();
        due.sort_by_key(Job::created_at);
        Ok(due)
    }
}
