//! Domain model for the job/contract lifecycle.
//!
//! The domain holds every status transition, deadline predicate, and
//! confirmation rule as pure logic over the aggregates and an explicit
//! `now`, keeping all infrastructure concerns outside of the boundary.

mod contract;
mod error;
mod ids;
mod job;
mod money;
mod pairing;
mod policy;
mod proposal;
mod status;

pub use contract::{ConfirmationOutcome, Contract, PersistedContractData};
pub use error::{
    JobAction, LifecycleError, ParseContractStatusError, ParseJobStatusError, ParsePartyRoleError,
    ParseProposalStatusError, PaymentBreakdown, RedirectTarget,
};
pub use ids::{ClientId, ContractId, DoerId, JobId, ProposalId, TeamSize};
pub use job::{
    BudgetChange, CancellationOutcome, Job, NO_APPLICANTS_REASON, NewJobParams, PersistedJobData,
};
pub use money::Money;
pub use pairing::PairingCode;
pub use policy::LifecyclePolicy;
pub use proposal::{PersistedProposalData, Proposal};
pub use status::{ContractStatus, JobStatus, PartyRole, ProposalStatus};
