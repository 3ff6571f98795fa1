//! Job aggregate root and lifecycle decision logic.
//!
//! Every status/deadline decision the platform makes about a job lives
//! here as a pure function of the aggregate, the current time, and the
//! timing policy. Callers never re-derive date math at the call site.
//!
//! A rejected mutation returns an error and leaves the aggregate
//! untouched; accepted mutations bump the optimistic concurrency counter
//! so racing writers are serialized by the repository.

use super::{
    ClientId, DoerId, JobAction, JobId, JobStatus, LifecycleError, LifecyclePolicy, Money,
    PaymentBreakdown, TeamSize,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cancellation reason recorded when the deadline sweep closes a job that
/// never received a proposal.
pub const NO_APPLICANTS_REASON: &str = "no worker applied";

/// Job aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    id: JobId,
    client_id: ClientId,
    status: JobStatus,
    price: Money,
    publication_amount: Option<Money>,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    max_workers: TeamSize,
    selected_workers: Vec<DoerId>,
    cancellation_reason: Option<String>,
    pending_new_price: Option<Money>,
    paused_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

/// Parameter object for posting a new job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewJobParams {
    /// Client posting the job.
    pub client_id: ClientId,
    /// Asking price for the work.
    pub price: Money,
    /// Scheduled start, `None` when flexible.
    pub start_date: Option<DateTime<Utc>>,
    /// Scheduled end, `None` when flexible.
    pub end_date: Option<DateTime<Utc>>,
    /// Team capacity.
    pub max_workers: TeamSize,
}

/// Parameter object for reconstructing a persisted job aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedJobData {
    /// Persisted job identifier.
    pub id: JobId,
    /// Owning client.
    pub client_id: ClientId,
    /// Persisted lifecycle status.
    pub status: JobStatus,
    /// Asking price.
    pub price: Money,
    /// Commission paid at publication, if any.
    pub publication_amount: Option<Money>,
    /// Scheduled start.
    pub start_date: Option<DateTime<Utc>>,
    /// Scheduled end.
    pub end_date: Option<DateTime<Utc>>,
    /// Team capacity.
    pub max_workers: TeamSize,
    /// Workers selected so far.
    pub selected_workers: Vec<DoerId>,
    /// Recorded cancellation reason, if any.
    pub cancellation_reason: Option<String>,
    /// Price increase awaiting supplemental payment, if any.
    pub pending_new_price: Option<Money>,
    /// Instant the job was paused, if currently paused.
    pub paused_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency counter.
    pub version: i64,
}

/// Result of applying a budget change to an open job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetChange {
    /// The new price applied immediately.
    Applied,
    /// The job paused; the increase applies once the supplement is paid.
    SupplementRequired(PaymentBreakdown),
}

/// Refund consequences of a cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancellationOutcome {
    /// Whether the held price is refunded in full.
    pub price_refunded: bool,
    /// Publication commission forfeited by the client, if any was paid.
    pub commission_forfeited: Option<Money>,
}

impl Job {
    /// Creates a new job in `draft`.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NonPositivePrice`] for a non-positive
    /// price and [`LifecycleError::DatesOutOfOrder`] when the end date
    /// precedes the start date.
    pub fn post(params: NewJobParams, now: DateTime<Utc>) -> Result<Self, LifecycleError> {
        let price = params.price.ensure_positive()?;
        validate_dates(params.start_date, params.end_date)?;

        Ok(Self {
            id: JobId::new(),
            client_id: params.client_id,
            status: JobStatus::Draft,
            price,
            publication_amount: None,
            start_date: params.start_date,
            end_date: params.end_date,
            max_workers: params.max_workers,
            selected_workers: Vec::new(),
            cancellation_reason: None,
            pending_new_price: None,
            paused_at: None,
            created_at: now,
            updated_at: now,
            version: 0,
        })
    }

    /// Reconstructs a job from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedJobData) -> Self {
        Self {
            id: data.id,
            client_id: data.client_id,
            status: data.status,
            price: data.price,
            publication_amount: data.publication_amount,
            start_date: data.start_date,
            end_date: data.end_date,
            max_workers: data.max_workers,
            selected_workers: data.selected_workers,
            cancellation_reason: data.cancellation_reason,
            pending_new_price: data.pending_new_price,
            paused_at: data.paused_at,
            created_at: data.created_at,
            updated_at: data.updated_at,
            version: data.version,
        }
    }

    /// Returns the job identifier.
    #[must_use]
    pub const fn id(&self) -> JobId {
        self.id
    }

    /// Returns the owning client.
    #[must_use]
    pub const fn client_id(&self) -> ClientId {
        self.client_id
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> JobStatus {
        self.status
    }

    /// Returns the asking price.
    #[must_use]
    pub const fn price(&self) -> Money {
        self.price
    }

    /// Returns the commission paid at publication, if any.
    #[must_use]
    pub const fn publication_amount(&self) -> Option<Money> {
        self.publication_amount
    }

    /// Returns the scheduled start, `None` when flexible.
    #[must_use]
    pub const fn start_date(&self) -> Option<DateTime<Utc>> {
        self.start_date
    }

    /// Returns the scheduled end, `None` when flexible.
    #[must_use]
    pub const fn end_date(&self) -> Option<DateTime<Utc>> {
        self.end_date
    }

    /// Returns the team capacity.
    #[must_use]
    pub const fn max_workers(&self) -> TeamSize {
        self.max_workers
    }

    /// Returns the workers selected so far.
    #[must_use]
    pub fn selected_workers(&self) -> &[DoerId] {
        &self.selected_workers
    }

    /// Returns the first selected worker: the canonical single-worker
    /// convenience reference.
    #[must_use]
    pub fn primary_doer(&self) -> Option<DoerId> {
        self.selected_workers.first().copied()
    }

    /// Returns the recorded cancellation reason, if any.
    #[must_use]
    pub fn cancellation_reason(&self) -> Option<&str> {
        self.cancellation_reason.as_deref()
    }

    /// Returns the price increase awaiting supplemental payment, if any.
    #[must_use]
    pub const fn pending_new_price(&self) -> Option<Money> {
        self.pending_new_price
    }

    /// Returns when the job was paused, if currently paused.
    #[must_use]
    pub const fn paused_at(&self) -> Option<DateTime<Utc>> {
        self.paused_at
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

    /// Returns the number of unfilled worker slots.
    #[must_use]
    pub fn free_slots(&self) -> usize {
        self.max_workers
            .as_len()
            .saturating_sub(self.selected_workers.len())
    }

    /// Returns the instant auto-selection fires and client-initiated
    /// cancellation/pausing close, `None` for flexible-start jobs.
    #[must_use]
    pub fn selection_deadline(&self, policy: &LifecyclePolicy) -> Option<DateTime<Utc>> {
        self.start_date.map(|start| start - policy.selection_lead())
    }

    /// Returns true when the client may cancel the job at `now`.
    ///
    /// Cancellation is unconditionally available while awaiting
    /// publication approval; otherwise it closes once the start is within
    /// the selection lead. Flexible-start jobs have no boundary.
    #[must_use]
    pub fn can_cancel(&self, now: DateTime<Utc>, policy: &LifecyclePolicy) -> bool {
        match self.status {
            JobStatus::PendingApproval => true,
            JobStatus::PendingPayment
            | JobStatus::Open
            | JobStatus::InProgress
            | JobStatus::Paused
            | JobStatus::Suspended => self.outside_selection_lead(now, policy),
            JobStatus::Draft | JobStatus::Completed | JobStatus::Cancelled => false,
        }
    }

    /// Returns true when the client may pause the job at `now`.
    #[must_use]
    pub fn can_pause(&self, now: DateTime<Utc>, policy: &LifecyclePolicy) -> bool {
        matches!(self.status, JobStatus::Open | JobStatus::InProgress)
            && self.outside_selection_lead(now, policy)
    }

    /// Returns true when the client may delete the job: only before
    /// publication.
    #[must_use]
    pub const fn can_delete(&self) -> bool {
        matches!(self.status, JobStatus::Draft | JobStatus::PendingPayment)
    }

    /// Returns the instant the completion confirmation window opens,
    /// `None` for flexible-end jobs (whose window opens with the work).
    #[must_use]
    pub fn confirmation_opens_at(&self, policy: &LifecyclePolicy) -> Option<DateTime<Utc>> {
        self.end_date.map(|end| end - policy.confirmation_lead())
    }

    /// Records the external publication payment, moving the job to
    /// `pending_approval`.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] unless the job is in
    /// `draft` or `pending_payment`.
    pub fn confirm_payment(
        &mut self,
        publication_amount: Money,
        now: DateTime<Utc>,
    ) -> Result<(), LifecycleError> {
        self.transition_to(JobStatus::PendingApproval, JobAction::ConfirmPayment, now)?;
        self.publication_amount = Some(publication_amount);
        Ok(())
    }

    /// Approves the publication, opening the job to proposals.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] unless the job is in
    /// `pending_approval`.
    pub fn approve_publication(&mut self, now: DateTime<Utc>) -> Result<(), LifecycleError> {
        self.transition_to(JobStatus::Open, JobAction::ApprovePublication, now)
    }

    /// Pauses the job, keeping the selected team intact.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] when pausing is not
    /// permitted at `now`.
    pub fn pause(
        &mut self,
        now: DateTime<Utc>,
        policy: &LifecyclePolicy,
    ) -> Result<(), LifecycleError> {
        if !self.can_pause(now, policy) {
            return Err(self.invalid(JobAction::Pause));
        }
        self.transition_to(JobStatus::Paused, JobAction::Pause, now)?;
        self.paused_at = Some(now);
        Ok(())
    }

    /// Resumes a paused job to `open`, or to `in_progress` when workers
    /// are already selected.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] unless the job is
    /// paused, or [`LifecycleError::PaymentRequired`] while a budget
    /// increase still awaits its supplemental payment.
    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<(), LifecycleError> {
        if self.status != JobStatus::Paused {
            return Err(self.invalid(JobAction::Resume));
        }
        if let Some(new_price) = self.pending_new_price {
            let supplement = new_price
                .checked_sub(self.price)
                .ok_or(LifecycleError::AmountOverflow)?;
            return Err(LifecycleError::PaymentRequired {
                breakdown: PaymentBreakdown {
                    current_price: self.price,
                    new_price,
                    supplement,
                },
            });
        }
        let next = if self.selected_workers.is_empty() {
            JobStatus::Open
        } else {
            JobStatus::InProgress
        };
        self.transition_to(next, JobAction::Resume, now)?;
        self.paused_at = None;
        Ok(())
    }

    /// Cancels the job at the client's request.
    ///
    /// A paid publication commission is forfeited; the held price is
    /// refunded only while the job is still awaiting publication approval.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] when cancellation is
    /// not permitted at `now`.
    pub fn cancel(
        &mut self,
        reason: impl Into<String>,
        now: DateTime<Utc>,
        policy: &LifecyclePolicy,
    ) -> Result<CancellationOutcome, LifecycleError> {
        if !self.can_cancel(now, policy) {
            return Err(self.invalid(JobAction::Cancel));
        }
        let price_refunded = self.status == JobStatus::PendingApproval;
        self.transition_to(JobStatus::Cancelled, JobAction::Cancel, now)?;
        self.cancellation_reason = Some(reason.into());

        Ok(CancellationOutcome {
            price_refunded,
            commission_forfeited: self.publication_amount,
        })
    }

    /// Cancels an open job that never received a proposal. Used by the
    /// deadline sweep once the selection deadline has passed; the client
    /// is refunded in full.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] unless the job is
    /// `open`.
    pub fn cancel_unfilled(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<CancellationOutcome, LifecycleError> {
        if self.status != JobStatus::Open {
            return Err(self.invalid(JobAction::Cancel));
        }
        self.transition_to(JobStatus::Cancelled, JobAction::Cancel, now)?;
        self.cancellation_reason = Some(NO_APPLICANTS_REASON.to_owned());

        Ok(CancellationOutcome {
            price_refunded: true,
            commission_forfeited: None,
        })
    }

    /// Suspends a flexible-end job whose selection deadline has arrived.
    /// Only a client edit supplying an end date lifts the suspension.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] unless the job is
    /// `open` or `in_progress`.
    pub fn suspend(&mut self, now: DateTime<Utc>) -> Result<(), LifecycleError> {
        self.transition_to(JobStatus::Suspended, JobAction::Suspend, now)
    }

    /// Supplies or replaces the end date. Lifts a suspension, returning
    /// the job to `open` (or `in_progress` when workers are selected).
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::DatesOutOfOrder`] when the end date
    /// precedes the start date, or [`LifecycleError::InvalidTransition`]
    /// when the job's status does not permit the edit.
    pub fn set_end_date(
        &mut self,
        end_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), LifecycleError> {
        validate_dates(self.start_date, Some(end_date))?;
        match self.status {
            JobStatus::Suspended => {
                let next = if self.selected_workers.is_empty() {
                    JobStatus::Open
                } else {
                    JobStatus::InProgress
                };
                self.transition_to(next, JobAction::SetEndDate, now)?;
                self.end_date = Some(end_date);
                Ok(())
            }
            JobStatus::Draft | JobStatus::Open | JobStatus::Paused => {
                self.end_date = Some(end_date);
                self.touch(now);
                Ok(())
            }
            JobStatus::PendingPayment
            | JobStatus::PendingApproval
            | JobStatus::InProgress
            | JobStatus::Completed
            | JobStatus::Cancelled => Err(self.invalid(JobAction::SetEndDate)),
        }
    }

    /// Adds a worker to the selected team, moving the job to
    /// `in_progress` on the first selection.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::CapacityExceeded`] when every slot is
    /// filled, [`LifecycleError::WorkerAlreadySelected`] on a duplicate
    /// selection, or [`LifecycleError::InvalidTransition`] when the job
    /// is not accepting selections.
    pub fn select_worker(
        &mut self,
        doer_id: DoerId,
        now: DateTime<Utc>,
    ) -> Result<(), LifecycleError> {
        if !matches!(self.status, JobStatus::Open | JobStatus::InProgress) {
            return Err(self.invalid(JobAction::SelectWorker));
        }
        if self.selected_workers.contains(&doer_id) {
            return Err(LifecycleError::WorkerAlreadySelected {
                job_id: self.id,
                doer_id,
            });
        }
        if self.free_slots() == 0 {
            return Err(LifecycleError::CapacityExceeded {
                job_id: self.id,
                max_workers: self.max_workers,
            });
        }

        if self.status == JobStatus::Open {
            self.transition_to(JobStatus::InProgress, JobAction::SelectWorker, now)?;
        } else {
            self.touch(now);
        }
        self.selected_workers.push(doer_id);
        Ok(())
    }

    /// Applies a budget change to an open job.
    ///
    /// A decrease applies immediately. An increase pauses the job and
    /// records the pending price until the supplement is paid.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NonPositivePrice`] for a non-positive
    /// price, [`LifecycleError::AmountOverflow`] when the supplement
    /// overflows, or [`LifecycleError::InvalidTransition`] unless the job
    /// is `open`.
    pub fn change_budget(
        &mut self,
        new_price: Money,
        now: DateTime<Utc>,
    ) -> Result<BudgetChange, LifecycleError> {
        let new_price = new_price.ensure_positive()?;
        if self.status != JobStatus::Open {
            return Err(self.invalid(JobAction::ChangeBudget));
        }

        if new_price <= self.price {
            self.price = new_price;
            self.touch(now);
            return Ok(BudgetChange::Applied);
        }

        let supplement = new_price
            .checked_sub(self.price)
            .ok_or(LifecycleError::AmountOverflow)?;
        let breakdown = PaymentBreakdown {
            current_price: self.price,
            new_price,
            supplement,
        };
        self.transition_to(JobStatus::Paused, JobAction::ChangeBudget, now)?;
        self.paused_at = Some(now);
        self.pending_new_price = Some(new_price);
        Ok(BudgetChange::SupplementRequired(breakdown))
    }

    /// Applies a pending price increase after the supplemental payment
    /// completed, returning the job to `open`.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] unless a supplement
    /// is pending on a paused job.
    pub fn confirm_supplement(&mut self, now: DateTime<Utc>) -> Result<(), LifecycleError> {
        let Some(new_price) = self.pending_new_price else {
            return Err(self.invalid(JobAction::ConfirmSupplement));
        };
        if self.status != JobStatus::Paused {
            return Err(self.invalid(JobAction::ConfirmSupplement));
        }
        self.pending_new_price = None;
        self.resume(now)?;
        self.price = new_price;
        Ok(())
    }

    /// Marks the job completed once every contract is confirmed.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] unless the job is
    /// `in_progress`.
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<(), LifecycleError> {
        self.transition_to(JobStatus::Completed, JobAction::Confirm, now)
    }

    fn outside_selection_lead(&self, now: DateTime<Utc>, policy: &LifecyclePolicy) -> bool {
        self.selection_deadline(policy)
            .is_none_or(|deadline| now < deadline)
    }

    fn transition_to(
        &mut self,
        next: JobStatus,
        action: JobAction,
        now: DateTime<Utc>,
    ) -> Result<(), LifecycleError> {
        if !self.status.can_transition_to(next) {
            return Err(LifecycleError::InvalidTransition {
                job_id: self.id,
                status: self.status,
                action,
            });
        }
        self.status = next;
        self.touch(now);
        Ok(())
    }

    const fn invalid(&self, action: JobAction) -> LifecycleError {
        LifecycleError::InvalidTransition {
            job_id: self.id,
            status: self.status,
            action,
        }
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
        self.version = self.version.saturating_add(1);
    }
}

/// Validates the ordering of the optional schedule dates.
fn validate_dates(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<(), LifecycleError> {
    if let (Some(start_date), Some(end_date)) = (start, end)
        && end_date < start_date
    {
        return Err(LifecycleError::DatesOutOfOrder {
            start: start_date,
            end: end_date,
        });
    }
    Ok(())
}
