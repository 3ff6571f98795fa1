//! `PostgreSQL` repository implementation for marketplace lifecycle
//! storage.
//!
//! Optimistic concurrency is enforced with `WHERE version = ?` guards on
//! every mutation, and a worker selection is applied inside a single
//! database transaction so the job, contract, and proposal rows can never
//! disagree about a filled slot.

use super::{
    models::{ContractChangeset, ContractRow, JobChangeset, JobRow, ProposalChangeset, ProposalRow},
    schema::{contracts, jobs, proposals},
};
use crate::job::{
    domain::{
        ClientId, Contract, ContractId, ContractStatus, DoerId, Job, JobId, JobStatus, Money,
        PairingCode, PersistedContractData, PersistedJobData, PersistedProposalData, Proposal,
        ProposalId, ProposalStatus, TeamSize,
    },
    ports::{
        MarketplaceRepository, RepositoryError, RepositoryResult, SelectionCommit, SweepCriteria,
    },
};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};

/// `PostgreSQL` connection pool type used by marketplace adapters.
pub type MarketplacePgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed marketplace repository.
#[derive(Debug, Clone)]
pub struct PostgresMarketplaceRepository {
    pool: MarketplacePgPool,
}

impl From<DieselError> for RepositoryError {
    fn from(err: DieselError) -> Self {
        Self::persistence(err)
    }
}

impl PostgresMarketplaceRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: MarketplacePgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> RepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(RepositoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(RepositoryError::persistence)?
    }
}

#[async_trait]
impl MarketplaceRepository for PostgresMarketplaceRepository {
    async fn store_job(&self, job: &Job) -> RepositoryResult<()> {
        let job_id = job.id();
        let changeset = job_to_changeset(job);

        self.run_blocking(move |connection| {
            diesel::insert_into(jobs::table)
                .values(&changeset)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        RepositoryError::DuplicateJob(job_id)
                    }
                    _ => RepositoryError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn find_job(&self, id: JobId) -> RepositoryResult<Option<Job>> {
        self.run_blocking(move |connection| {
            let row = jobs::table
                .filter(jobs::id.eq(id.into_inner()))
                .select(JobRow::as_select())
                .first::<JobRow>(connection)
                .optional()
                .map_err(RepositoryError::persistence)?;
            row.map(row_to_job).transpose()
        })
        .await
    }

    async fn update_job(&self, job: &Job, expected_version: i64) -> RepositoryResult<()> {
        let job_id = job.id();
        let changeset = job_to_changeset(job);

        self.run_blocking(move |connection| {
            apply_job_update(connection, job_id, &changeset, expected_version)
        })
        .await
    }

    async fn delete_job(&self, id: JobId) -> RepositoryResult<()> {
        self.run_blocking(move |connection| {
            connection.transaction(|connection| {
                diesel::delete(proposals::table.filter(proposals::job_id.eq(id.into_inner())))
                    .execute(connection)?;
                let removed =
                    diesel::delete(jobs::table.filter(jobs::id.eq(id.into_inner())))
                        .execute(connection)?;
                if removed == 0 {
                    return Err(RepositoryError::JobNotFound(id));
                }
                Ok(())
            })
        })
        .await
    }

    async fn store_proposal(&self, proposal: &Proposal) -> RepositoryResult<()> {
        let proposal_id = proposal.id();
        let changeset = proposal_to_changeset(proposal);

        self.run_blocking(move |connection| {
            diesel::insert_into(proposals::table)
                .values(&changeset)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        RepositoryError::DuplicateProposal(proposal_id)
                    }
                    _ => RepositoryError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn find_proposal(&self, id: ProposalId) -> RepositoryResult<Option<Proposal>> {
        self.run_blocking(move |connection| {
            let row = proposals::table
                .filter(proposals::id.eq(id.into_inner()))
                .select(ProposalRow::as_select())
                .first::<ProposalRow>(connection)
                .optional()
                .map_err(RepositoryError::persistence)?;
            row.map(row_to_proposal).transpose()
        })
        .await
    }

    async fn proposals_by_job(&self, job_id: JobId) -> RepositoryResult<Vec<Proposal>> {
        self.run_blocking(move |connection| {
            let rows = proposals::table
                .filter(proposals::job_id.eq(job_id.into_inner()))
                .order(proposals::submitted_at.asc())
                .select(ProposalRow::as_select())
                .load::<ProposalRow>(connection)
                .map_err(RepositoryError::persistence)?;
            rows.into_iter().map(row_to_proposal).collect()
        })
        .await
    }

    async fn update_proposal(&self, proposal: &Proposal) -> RepositoryResult<()> {
        let proposal_id = proposal.id();
        let changeset = proposal_to_changeset(proposal);

        self.run_blocking(move |connection| {
            apply_proposal_update(connection, proposal_id, &changeset)
        })
        .await
    }

    async fn find_contract(&self, id: ContractId) -> RepositoryResult<Option<Contract>> {
        self.run_blocking(move |connection| {
            let row = contracts::table
                .filter(contracts::id.eq(id.into_inner()))
                .select(ContractRow::as_select())
                .first::<ContractRow>(connection)
                .optional()
                .map_err(RepositoryError::persistence)?;
            row.map(row_to_contract).transpose()
        })
        .await
    }

    async fn contracts_by_job(&self, job_id: JobId) -> RepositoryResult<Vec<Contract>> {
        self.run_blocking(move |connection| {
            let rows = contracts::table
                .filter(contracts::job_id.eq(job_id.into_inner()))
                .order(contracts::created_at.asc())
                .select(ContractRow::as_select())
                .load::<ContractRow>(connection)
                .map_err(RepositoryError::persistence)?;
            rows.into_iter().map(row_to_contract).collect()
        })
        .await
    }

    async fn update_contract(
        &self,
        contract: &Contract,
        expected_version: i64,
    ) -> RepositoryResult<()> {
        let contract_id = contract.id();
        let changeset = contract_to_changeset(contract);

        self.run_blocking(move |connection| {
            let affected = diesel::update(
                contracts::table.filter(
                    contracts::id
                        .eq(contract_id.into_inner())
                        .and(contracts::version.eq(expected_version)),
                ),
            )
            .set(&changeset)
            .execute(connection)
            .map_err(RepositoryError::persistence)?;

            if affected == 0 {
                return Err(contract_update_failure(connection, contract_id));
            }
            Ok(())
        })
        .await
    }

    async fn commit_selection(&self, commit: SelectionCommit) -> RepositoryResult<()> {
        let job_id = commit.job.id();
        let expected_version = commit.job_expected_version;
        let job_changeset = job_to_changeset(&commit.job);
        let contract_changeset = contract_to_changeset(&commit.contract);
        let approved_id = commit.approved.id();
        let approved_changeset = proposal_to_changeset(&commit.approved);
        let rejected: Vec<(ProposalId, ProposalChangeset)> = commit
            .rejected
            .iter()
            .map(|proposal| (proposal.id(), proposal_to_changeset(proposal)))
            .collect();

        self.run_blocking(move |connection| {
            connection.transaction(|connection| {
                apply_job_update(connection, job_id, &job_changeset, expected_version)?;

                diesel::insert_into(contracts::table)
                    .values(&contract_changeset)
                    .execute(connection)?;

                apply_proposal_update(connection, approved_id, &approved_changeset)?;
                for (proposal_id, changeset) in &rejected {
                    apply_proposal_update(connection, *proposal_id, changeset)?;
                }
                Ok(())
            })
        })
        .await
    }

    async fn jobs_due_for_sweep(&self, criteria: SweepCriteria) -> RepositoryResult<Vec<Job>> {
        self.run_blocking(move |connection| {
            let open_due = jobs::status
                .eq(JobStatus::Open.as_str())
                .and(jobs::start_date.le(criteria.start_cutoff));
            let paused_due = jobs::status.eq(JobStatus::Paused.as_str()).and(
                jobs::paused_at
                    .le(criteria.paused_before)
                    .or(jobs::start_date.le(criteria.start_cutoff)),
            );

            let rows = jobs::table
                .filter(open_due.or(paused_due))
                .order(jobs::created_at.asc())
                .select(JobRow::as_select())
                .load::<JobRow>(connection)
                .map_err(RepositoryError::persistence)?;
            rows.into_iter().map(row_to_job).collect()
        })
        .await
    }
}

/// Runs a versioned job update, disambiguating "missing" from "stale".
fn apply_job_update(
    connection: &mut PgConnection,
    job_id: JobId,
    changeset: &JobChangeset,
    expected_version: i64,
) -> RepositoryResult<()> {
    let affected = diesel::update(
        jobs::table.filter(
            jobs::id
                .eq(job_id.into_inner())
                .and(jobs::version.eq(expected_version)),
        ),
    )
    .set(changeset)
    .execute(connection)?;

    if affected == 0 {
        let exists = jobs::table
            .filter(jobs::id.eq(job_id.into_inner()))
            .count()
            .get_result::<i64>(connection)?;
        if exists == 0 {
            return Err(RepositoryError::JobNotFound(job_id));
        }
        return Err(RepositoryError::JobVersionConflict(job_id));
    }
    Ok(())
}

fn apply_proposal_update(
    connection: &mut PgConnection,
    proposal_id: ProposalId,
    changeset: &ProposalChangeset,
) -> RepositoryResult<()> {
    let affected =
        diesel::update(proposals::table.filter(proposals::id.eq(proposal_id.into_inner())))
            .set(changeset)
            .execute(connection)?;
    if affected == 0 {
        return Err(RepositoryError::ProposalNotFound(proposal_id));
    }
    Ok(())
}

fn contract_update_failure(
    connection: &mut PgConnection,
    contract_id: ContractId,
) -> RepositoryError {
    let exists = contracts::table
        .filter(contracts::id.eq(contract_id.into_inner()))
        .count()
        .get_result::<i64>(connection);
    match exists {
        Ok(0) => RepositoryError::ContractNotFound(contract_id),
        Ok(_) => RepositoryError::ContractVersionConflict(contract_id),
        Err(err) => RepositoryError::persistence(err),
    }
}

fn job_to_changeset(job: &Job) -> JobChangeset {
    JobChangeset {
        id: job.id().into_inner(),
        client_id: job.client_id().into_inner(),
        status: job.status().as_str().to_owned(),
        price: job.price().minor_units(),
        publication_amount: job.publication_amount().map(Money::minor_units),
        start_date: job.start_date(),
        end_date: job.end_date(),
        max_workers: i32::try_from(job.max_workers().value()).unwrap_or(i32::MAX),
        selected_workers: job
            .selected_workers()
            .iter()
            .map(|doer| doer.into_inner())
            .collect(),
        cancellation_reason: job.cancellation_reason().map(str::to_owned),
        pending_new_price: job.pending_new_price().map(Money::minor_units),
        paused_at: job.paused_at(),
        created_at: job.created_at(),
        updated_at: job.updated_at(),
        version: job.version(),
    }
}

fn row_to_job(row: JobRow) -> RepositoryResult<Job> {
    let status = JobStatus::try_from(row.status.as_str()).map_err(RepositoryError::persistence)?;
    let max_workers = u32::try_from(row.max_workers)
        .map_err(RepositoryError::persistence)
        .and_then(|value| TeamSize::new(value).map_err(RepositoryError::persistence))?;

    let data = PersistedJobData {
        id: JobId::from_uuid(row.id),
        client_id: ClientId::from_uuid(row.client_id),
        status,
        price: Money::from_minor_units(row.price),
        publication_amount: row.publication_amount.map(Money::from_minor_units),
        start_date: row.start_date,
        end_date: row.end_date,
        max_workers,
        selected_workers: row
            .selected_workers
            .into_iter()
            .map(DoerId::from_uuid)
            .collect(),
        cancellation_reason: row.cancellation_reason,
        pending_new_price: row.pending_new_price.map(Money::from_minor_units),
        paused_at: row.paused_at,
        created_at: row.created_at,
        updated_at: row.updated_at,
        version: row.version,
    };
    Ok(Job::from_persisted(data))
}

fn proposal_to_changeset(proposal: &Proposal) -> ProposalChangeset {
    ProposalChangeset {
        id: proposal.id().into_inner(),
        job_id: proposal.job_id().into_inner(),
        doer_id: proposal.doer_id().into_inner(),
        proposed_price: proposal.proposed_price().minor_units(),
        is_counter_offer: proposal.is_counter_offer(),
        status: proposal.status().as_str().to_owned(),
        submitted_at: proposal.submitted_at(),
    }
}

fn row_to_proposal(row: ProposalRow) -> RepositoryResult<Proposal> {
    let status =
        ProposalStatus::try_from(row.status.as_str()).map_err(RepositoryError::persistence)?;

    let data = PersistedProposalData {
        id: ProposalId::from_uuid(row.id),
        job_id: JobId::from_uuid(row.job_id),
        doer_id: DoerId::from_uuid(row.doer_id),
        proposed_price: Money::from_minor_units(row.proposed_price),
        is_counter_offer: row.is_counter_offer,
        status,
        submitted_at: row.submitted_at,
    };
    Ok(Proposal::from_persisted(data))
}

fn contract_to_changeset(contract: &Contract) -> ContractChangeset {
    ContractChangeset {
        id: contract.id().into_inner(),
        job_id: contract.job_id().into_inner(),
        client_id: contract.client_id().into_inner(),
        doer_id: contract.doer_id().into_inner(),
        price: contract.price().minor_units(),
        commission: contract.commission().minor_units(),
        total_price: contract.total_price().minor_units(),
        status: contract.status().as_str().to_owned(),
        client_confirmed: contract.client_confirmed(),
        doer_confirmed: contract.doer_confirmed(),
        pairing_code: contract.pairing().code().to_owned(),
        pairing_issued_at: contract.pairing().issued_at(),
        pairing_expires_at: contract.pairing().expires_at(),
        created_at: contract.created_at(),
        updated_at: contract.updated_at(),
        version: contract.version(),
    }
}

fn row_to_contract(row: ContractRow) -> RepositoryResult<Contract> {
    let status =
        ContractStatus::try_from(row.status.as_str()).map_err(RepositoryError::persistence)?;
    let pairing = PairingCode::from_persisted(
        row.pairing_code,
        row.pairing_issued_at,
        row.pairing_expires_at,
    );

    let data = PersistedContractData {
        id: ContractId::from_uuid(row.id),
        job_id: JobId::from_uuid(row.job_id),
        client_id: ClientId::from_uuid(row.client_id),
        doer_id: DoerId::from_uuid(row.doer_id),
        price: Money::from_minor_units(row.price),
        commission: Money::from_minor_units(row.commission),
        total_price: Money::from_minor_units(row.total_price),
        status,
        client_confirmed: row.client_confirmed,
        doer_confirmed: row.doer_confirmed,
        pairing,
        created_at: row.created_at,
        updated_at: row.updated_at,
        version: row.version,
    };
    Ok(Contract::from_persisted(data))
}
