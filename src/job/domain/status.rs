//! Status enums and transition tables for jobs, contracts, and proposals.
//!
//! The transition tables are the single authority on which lifecycle moves
//! are legal. Services consult them instead of re-deriving status checks
//! at each call site.

use super::{
    ParseContractStatusError, ParseJobStatusError, ParsePartyRoleError, ParseProposalStatusError,
};
use serde::{Deserialize, Serialize};

/// Job lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Created by the client but not yet paid for.
    Draft,
    /// Awaiting the publication payment.
    PendingPayment,
    /// Paid; awaiting operator approval before going live.
    PendingApproval,
    /// Live and accepting proposals.
    Open,
    /// At least one worker selected; contracts exist.
    InProgress,
    /// All contracts confirmed complete by both parties.
    Completed,
    /// Temporarily paused by the client.
    Paused,
    /// Cancelled by the client or by the deadline sweep.
    Cancelled,
    /// Suspended pending a client edit that supplies an end date.
    Suspended,
}

impl JobStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingPayment => "pending_payment",
            Self::PendingApproval => "pending_approval",
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Paused => "paused",
            Self::Cancelled => "cancelled",
            Self::Suspended => "suspended",
        }
    }

    /// Returns true when no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Returns true when the given transition is legal.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Draft, Self::PendingPayment | Self::PendingApproval)
                | (Self::PendingPayment, Self::PendingApproval | Self::Cancelled)
                | (Self::PendingApproval, Self::Open | Self::Cancelled)
                | (
                    Self::Open,
                    Self::InProgress | Self::Paused | Self::Cancelled | Self::Suspended
                )
                | (
                    Self::InProgress,
                    Self::Completed | Self::Paused | Self::Cancelled | Self::Suspended
                )
                | (Self::Paused, Self::Open | Self::InProgress | Self::Cancelled)
                | (Self::Suspended, Self::Open | Self::InProgress | Self::Cancelled)
        )
    }
}

impl TryFrom<&str> for JobStatus {
    type Error = ParseJobStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "draft" => Ok(Self::Draft),
            "pending_payment" => Ok(Self::PendingPayment),
            "pending_approval" => Ok(Self::PendingApproval),
            "open" => Ok(Self::Open),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "paused" => Ok(Self::Paused),
            "cancelled" => Ok(Self::Cancelled),
            "suspended" => Ok(Self::Suspended),
            _ => Err(ParseJobStatusError(value.to_owned())),
        }
    }
}

/// Contract lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    /// Created on worker selection; awaiting the doer's acceptance.
    Pending,
    /// Accepted by the doer; work not yet begun.
    Accepted,
    /// Work underway.
    InProgress,
    /// One party has confirmed completion; waiting for the other.
    AwaitingConfirmation,
    /// Both parties confirmed; escrow release requested.
    Completed,
    /// Terminated before completion.
    Cancelled,
}

impl ContractStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::InProgress => "in_progress",
            Self::AwaitingConfirmation => "awaiting_confirmation",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns true when no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Returns true when the given transition is legal.
    ///
    /// `Completed` is reachable only from `AwaitingConfirmation`, which
    /// guarantees both confirmation flags were observed in order.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Accepted | Self::Cancelled)
                | (Self::Accepted, Self::InProgress | Self::Cancelled)
                | (
                    Self::InProgress,
                    Self::AwaitingConfirmation | Self::Cancelled
                )
                | (Self::AwaitingConfirmation, Self::Completed | Self::Cancelled)
        )
    }

    /// Returns true when a completion confirmation may be recorded.
    #[must_use]
    pub const fn accepts_confirmation(self) -> bool {
        matches!(self, Self::InProgress | Self::AwaitingConfirmation)
    }
}

impl TryFrom<&str> for ContractStatus {
    type Error = ParseContractStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "in_progress" => Ok(Self::InProgress),
            "awaiting_confirmation" => Ok(Self::AwaitingConfirmation),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(ParseContractStatusError(value.to_owned())),
        }
    }
}

/// Proposal resolution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    /// Submitted; awaiting selection or the deadline sweep.
    Pending,
    /// Approved; a contract was created from it.
    Approved,
    /// Rejected explicitly or because the team filled.
    Rejected,
}

impl ProposalStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl TryFrom<&str> for ProposalStatus {
    type Error = ParseProposalStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(ParseProposalStatusError(value.to_owned())),
        }
    }
}

/// Side of a contract performing an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyRole {
    /// The client who posted the job.
    Client,
    /// The worker performing the job.
    Doer,
}

impl PartyRole {
    /// Returns the canonical wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Doer => "doer",
        }
    }
}

impl TryFrom<&str> for PartyRole {
    type Error = ParsePartyRoleError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "client" => Ok(Self::Client),
            "doer" => Ok(Self::Doer),
            _ => Err(ParsePartyRoleError(value.to_owned())),
        }
    }
}
