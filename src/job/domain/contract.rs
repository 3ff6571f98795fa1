//! Contract aggregate: the agreement between a client and one worker.
//!
//! A contract tracks dual confirmation of completion. Each party flips its
//! own flag exactly once; the contract reaches `completed` only when both
//! flags are set, and only through `awaiting_confirmation`, so an escrow
//! release can never be requested twice for the same contract.

use super::{
    ClientId, ContractId, ContractStatus, DoerId, JobAction, JobId, LifecycleError, Money,
    PairingCode, PartyRole,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Contract aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    id: ContractId,
    job_id: JobId,
    client_id: ClientId,
    doer_id: DoerId,
    price: Money,
    commission: Money,
    total_price: Money,
    status: ContractStatus,
    client_confirmed: bool,
    doer_confirmed: bool,
    pairing: PairingCode,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

/// Parameter object for reconstructing a persisted contract aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedContractData {
    /// Persisted contract identifier.
    pub id: ContractId,
    /// Job the contract belongs to.
    pub job_id: JobId,
    /// Client side of the agreement.
    pub client_id: ClientId,
    /// Worker side of the agreement.
    pub doer_id: DoerId,
    /// Agreed price for the work.
    pub price: Money,
    /// Platform commission on top of the price.
    pub commission: Money,
    /// Persisted total (price plus commission).
    pub total_price: Money,
    /// Persisted lifecycle status.
    pub status: ContractStatus,
    /// Whether the client has confirmed completion.
    pub client_confirmed: bool,
    /// Whether the doer has confirmed completion.
    pub doer_confirmed: bool,
    /// Persisted pairing code.
    pub pairing: PairingCode,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency counter.
    pub version: i64,
}

/// Result of recording one party's completion confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationOutcome {
    /// True when this confirmation was the second of the pair and the
    /// contract transitioned to `completed`.
    pub contract_completed: bool,
}

impl Contract {
    /// Creates a new pending contract from an approved proposal, issuing a
    /// pairing code valid for `pairing_ttl` from `now`.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::AmountOverflow`] when price plus
    /// commission overflows.
    pub fn new(
        job_id: JobId,
        client_id: ClientId,
        doer_id: DoerId,
        price: Money,
        commission: Money,
        now: DateTime<Utc>,
        pairing_ttl: Duration,
    ) -> Result<Self, LifecycleError> {
        let total_price = price
            .checked_add(commission)
            .ok_or(LifecycleError::AmountOverflow)?;
        let id = ContractId::new();

        Ok(Self {
            id,
            job_id,
            client_id,
            doer_id,
            price,
            commission,
            total_price,
            status: ContractStatus::Pending,
            client_confirmed: false,
            doer_confirmed: false,
            pairing: PairingCode::issue(id, now, pairing_ttl),
            created_at: now,
            updated_at: now,
            version: 0,
        })
    }

    /// Reconstructs a contract from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedContractData) -> Self {
        Self {
            id: data.id,
            job_id: data.job_id,
            client_id: data.client_id,
            doer_id: data.doer_id,
            price: data.price,
            commission: data.commission,
            total_price: data.total_price,
            status: data.status,
            client_confirmed: data.client_confirmed,
            doer_confirmed: data.doer_confirmed,
            pairing: data.pairing,
            created_at: data.created_at,
            updated_at: data.updated_at,
            version: data.version,
        }
    }

    /// Returns the contract identifier.
    #[must_use]
    pub const fn id(&self) -> ContractId {
        self.id
    }

    /// Returns the job the contract belongs to.
    #[must_use]
    pub const fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Returns the client side of the agreement.
    #[must_use]
    pub const fn client_id(&self) -> ClientId {
        self.client_id
    }

    /// Returns the worker side of the agreement.
    #[must_use]
    pub const fn doer_id(&self) -> DoerId {
        self.doer_id
    }

    /// Returns the agreed price.
    #[must_use]
    pub const fn price(&self) -> Money {
        self.price
    }

    /// Returns the platform commission.
    #[must_use]
    pub const fn commission(&self) -> Money {
        self.commission
    }

    /// Returns the total the client pays (price plus commission).
    #[must_use]
    pub const fn total_price(&self) -> Money {
        self.total_price
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> ContractStatus {
        self.status
    }

    /// Returns true when the client has confirmed completion.
    #[must_use]
    pub const fn client_confirmed(&self) -> bool {
        self.client_confirmed
    }

    /// Returns true when the doer has confirmed completion.
    #[must_use]
    pub const fn doer_confirmed(&self) -> bool {
        self.doer_confirmed
    }

    /// Returns true when the given party has confirmed completion.
    #[must_use]
    pub const fn is_confirmed_by(&self, actor: PartyRole) -> bool {
        match actor {
            PartyRole::Client => self.client_confirmed,
            PartyRole::Doer => self.doer_confirmed,
        }
    }

    /// Returns the pairing code issued with this contract.
    #[must_use]
    pub const fn pairing(&self) -> &PairingCode {
        &self.pairing
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last mutation timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the optimistic concurrency counter.
    #[must_use]
    pub const fn version(&self) -> i64 {
        self.version
    }

    /// Records the doer's acceptance of the contract.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidContractState`] unless the contract
    /// is `pending`.
    pub fn accept(&mut self, now: DateTime<Utc>) -> Result<(), LifecycleError> {
        self.transition_to(ContractStatus::Accepted, JobAction::AcceptContract, now)
    }

    /// Records the start of work under the contract.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidContractState`] unless the contract
    /// is `accepted`.
    pub fn start_work(&mut self, now: DateTime<Utc>) -> Result<(), LifecycleError> {
        self.transition_to(ContractStatus::InProgress, JobAction::StartWork, now)
    }

    /// Cancels the contract.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidContractState`] when the contract
    /// has already reached a terminal status.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), LifecycleError> {
        self.transition_to(ContractStatus::Cancelled, JobAction::Cancel, now)
    }

    /// Records one party's completion confirmation.
    ///
    /// The first confirmation moves the contract to
    /// `awaiting_confirmation`; the second completes it. Repeating a
    /// confirmation is rejected rather than silently ignored.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::AlreadyConfirmed`] when the party has
    /// already confirmed, or [`LifecycleError::InvalidContractState`] when
    /// the contract does not accept confirmations.
    pub fn record_confirmation(
        &mut self,
        actor: PartyRole,
        now: DateTime<Utc>,
    ) -> Result<ConfirmationOutcome, LifecycleError> {
        if !self.status.accepts_confirmation() {
            return Err(LifecycleError::InvalidContractState {
                contract_id: self.id,
                status: self.status,
                action: JobAction::Confirm,
            });
        }
        if self.is_confirmed_by(actor) {
            return Err(LifecycleError::AlreadyConfirmed {
                contract_id: self.id,
                actor,
            });
        }

        match actor {
            PartyRole::Client => self.client_confirmed = true,
            PartyRole::Doer => self.doer_confirmed = true,
        }

        let both_confirmed = self.client_confirmed && self.doer_confirmed;
        self.status = if both_confirmed {
            ContractStatus::Completed
        } else {
            ContractStatus::AwaitingConfirmation
        };
        self.touch(now);

        Ok(ConfirmationOutcome {
            contract_completed: both_confirmed,
        })
    }

    fn transition_to(
        &mut self,
        next: ContractStatus,
        action: JobAction,
        now: DateTime<Utc>,
    ) -> Result<(), LifecycleError> {
        if !self.status.can_transition_to(next) {
            return Err(LifecycleError::InvalidContractState {
                contract_id: self.id,
                status: self.status,
                action,
            });
        }
        self.status = next;
        self.touch(now);
        Ok(())
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
        self.version = self.version.saturating_add(1);
    }
}
