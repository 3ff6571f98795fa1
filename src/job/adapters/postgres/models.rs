//! Diesel row models for marketplace persistence.

use super::schema::{contracts, jobs, proposals};
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Query result row for job records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = jobs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct JobRow {
    /// Job identifier.
    pub id: uuid::Uuid,
    /// Owning client.
    pub client_id: uuid::Uuid,
    /// Lifecycle status.
    pub status: String,
    /// Asking price in minor units.
    pub price: i64,
    /// Publication commission paid, in minor units.
    pub publication_amount: Option<i64>,
    /// Scheduled start.
    pub start_date: Option<DateTime<Utc>>,
    /// Scheduled end.
    pub end_date: Option<DateTime<Utc>>,
    /// Team capacity.
    pub max_workers: i32,
    /// Workers selected so far.
    pub selected_workers: Vec<uuid::Uuid>,
    /// Reason recorded at cancellation.
    pub cancellation_reason: Option<String>,
    /// Price increase awaiting supplemental payment.
    pub pending_new_price: Option<i64>,
    /// Instant the job was paused, while paused.
    pub paused_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency counter.
    pub version: i64,
}

/// Insert and update model for job records.
///
/// `treat_none_as_null` keeps cleared optional fields (a paid supplement,
/// a lifted pause) cleared in storage instead of silently skipped.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = jobs)]
#[diesel(treat_none_as_null = true)]
pub struct JobChangeset {
    /// Job identifier.
    pub id: uuid::Uuid,
    /// Owning client.
    pub client_id: uuid::Uuid,
    /// Lifecycle status.
    pub status: String,
    /// Asking price in minor units.
    pub price: i64,
    /// Publication commission paid, in minor units.
    pub publication_amount: Option<i64>,
    /// Scheduled start.
    pub start_date: Option<DateTime<Utc>>,
    /// Scheduled end.
    pub end_date: Option<DateTime<Utc>>,
    /// Team capacity.
    pub max_workers: i32,
    /// Workers selected so far.
    pub selected_workers: Vec<uuid::Uuid>,
    /// Reason recorded at cancellation.
    pub cancellation_reason: Option<String>,
    /// Price increase awaiting supplemental payment.
    pub pending_new_price: Option<i64>,
    /// Instant the job was paused, while paused.
    pub paused_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency counter.
    pub version: i64,
}

/// Query result row for proposal records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = proposals)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProposalRow {
    /// Proposal identifier.
    pub id: uuid::Uuid,
    /// Job the proposal targets.
    pub job_id: uuid::Uuid,
    /// Worker who applied.
    pub doer_id: uuid::Uuid,
    /// Proposed price in minor units.
    pub proposed_price: i64,
    /// Whether the price differs from the asking price.
    pub is_counter_offer: bool,
    /// Resolution status.
    pub status: String,
    /// Submission timestamp.
    pub submitted_at: DateTime<Utc>,
}

/// Insert and update model for proposal records.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = proposals)]
#[diesel(treat_none_as_null = true)]
pub struct ProposalChangeset {
    /// Proposal identifier.
    pub id: uuid::Uuid,
    /// Job the proposal targets.
    pub job_id: uuid::Uuid,
    /// Worker who applied.
    pub doer_id: uuid::Uuid,
    /// Proposed price in minor units.
    pub proposed_price: i64,
    /// Whether the price differs from the asking price.
    pub is_counter_offer: bool,
    /// Resolution status.
    pub status: String,
    /// Submission timestamp.
    pub submitted_at: DateTime<Utc>,
}

/// Query result row for contract records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = contracts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ContractRow {
    /// Contract identifier.
    pub id: uuid::Uuid,
    /// Job the contract belongs to.
    pub job_id: uuid::Uuid,
    /// Client side of the agreement.
    pub client_id: uuid::Uuid,
    /// Worker side of the agreement.
    pub doer_id: uuid::Uuid,
    /// Agreed price in minor units.
    pub price: i64,
    /// Platform commission in minor units.
    pub commission: i64,
    /// Price plus commission in minor units.
    pub total_price: i64,
    /// Lifecycle status.
    pub status: String,
    /// Whether the client confirmed completion.
    pub client_confirmed: bool,
    /// Whether the doer confirmed completion.
    pub doer_confirmed: bool,
    /// Spoken pairing code.
    pub pairing_code: String,
    /// Pairing code issuance instant.
    pub pairing_issued_at: DateTime<Utc>,
    /// Pairing code expiry instant.
    pub pairing_expires_at: DateTime<Utc>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency counter.
    pub version: i64,
}

/// Insert and update model for contract records.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = contracts)]
#[diesel(treat_none_as_null = true)]
pub struct ContractChangeset {
    /// Contract identifier.
    pub id: uuid::Uuid,
    /// Job the contract belongs to.
    pub job_id: uuid::Uuid,
    /// Client side of the agreement.
    pub client_id: uuid::Uuid,
    /// Worker side of the agreement.
    pub doer_id: uuid::Uuid,
    /// Agreed price in minor units.
    pub price: i64,
    /// Platform commission in minor units.
    pub commission: i64,
    /// Price plus commission in minor units.
    pub total_price: i64,
    /// Lifecycle status.
    pub status: String,
    /// Whether the client confirmed completion.
    pub client_confirmed: bool,
    /// Whether the doer confirmed completion.
    pub doer_confirmed: bool,
    /// Spoken pairing code.
    pub pairing_code: String,
    /// Pairing code issuance instant.
    pub pairing_issued_at: DateTime<Utc>,
    /// Pairing code expiry instant.
    pub pairing_expires_at: DateTime<Utc>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency counter.
    pub version: i64,
}
