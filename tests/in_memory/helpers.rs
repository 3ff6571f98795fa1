//! Shared test helpers for in-memory integration tests.

use std::sync::Arc;

use changa::job::{
    adapters::memory::{InMemoryMarketplaceRepository, RecordingEventSink},
    domain::{ClientId, Job, LifecyclePolicy, Money},
    services::{ConfirmationService, DeadlineSweep, JobLifecycleService, PostJobRequest},
};
use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;

/// Commission charged at publication in these tests.
pub const PUBLICATION_FEE: Money = Money::from_minor_units(5_000);

/// Commission applied to contracts in these tests.
pub const CONTRACT_COMMISSION: Money = Money::from_minor_units(2_500);

/// Asking price used throughout.
pub const ASKING_PRICE: Money = Money::from_minor_units(50_000);

/// Clock frozen at a fixed instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.0.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Reference instant every scenario counts from.
///
/// # Panics
///
/// Panics if the hard-coded fixture timestamp is invalid.
#[must_use]
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0)
        .single()
        .expect("valid fixture timestamp")
}

pub type TestLifecycle =
    JobLifecycleService<InMemoryMarketplaceRepository, RecordingEventSink, FixedClock>;
pub type TestConfirmation =
    ConfirmationService<InMemoryMarketplaceRepository, RecordingEventSink, FixedClock>;
pub type TestSweep = DeadlineSweep<InMemoryMarketplaceRepository, RecordingEventSink, FixedClock>;

/// In-memory service wiring shared by a scenario's actors.
pub struct MarketHarness {
    /// Shared repository state.
    pub repository: Arc<InMemoryMarketplaceRepository>,
    /// Shared recording event sink.
    pub events: Arc<RecordingEventSink>,
    /// Timing policy in force.
    pub policy: LifecyclePolicy,
    /// Scenario start instant.
    pub now: DateTime<Utc>,
}

impl MarketHarness {
    /// Wires the in-memory adapters with the default policy, frozen at
    /// `now`.
    #[must_use]
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            repository: Arc::new(InMemoryMarketplaceRepository::new()),
            events: Arc::new(RecordingEventSink::new()),
            policy: LifecyclePolicy::default(),
            now,
        }
    }

    /// Lifecycle service whose clock reads the scenario start.
    #[must_use]
    pub fn lifecycle(&self) -> TestLifecycle {
        self.lifecycle_at(self.now)
    }

    /// Lifecycle service whose clock reads `now`, over the shared state.
    #[must_use]
    pub fn lifecycle_at(&self, now: DateTime<Utc>) -> TestLifecycle {
        JobLifecycleService::new(
            Arc::clone(&self.repository),
            Arc::clone(&self.events),
            Arc::new(FixedClock(now)),
            self.policy,
        )
    }

    /// Confirmation service whose clock reads the scenario start.
    #[must_use]
    pub fn confirmation(&self) -> TestConfirmation {
        self.confirmation_at(self.now)
    }

    /// Confirmation service whose clock reads `now`.
    #[must_use]
    pub fn confirmation_at(&self, now: DateTime<Utc>) -> TestConfirmation {
        ConfirmationService::new(
            Arc::clone(&self.repository),
            Arc::clone(&self.events),
            Arc::new(FixedClock(now)),
            self.policy,
        )
    }

    /// Deadline sweep whose clock reads `now`.
    #[must_use]
    pub fn sweep_at(&self, now: DateTime<Utc>) -> TestSweep {
        DeadlineSweep::new(
            Arc::clone(&self.repository),
            Arc::clone(&self.events),
            Arc::new(FixedClock(now)),
            self.policy,
            CONTRACT_COMMISSION,
        )
    }

    /// Posts, pays, and approves a job so it is open for proposals.
    ///
    /// # Panics
    ///
    /// Panics if any of the three lifecycle steps fails.
    pub async fn open_job(&self, request: PostJobRequest) -> Job {
        let lifecycle = self.lifecycle();
        let job = lifecycle.post_job(request).await.expect("job posts");
        lifecycle
            .confirm_payment(job.id(), PUBLICATION_FEE)
            .await
            .expect("payment confirms");
        lifecycle
            .approve_publication(job.id())
            .await
            .expect("publication approves")
    }
}

/// A post request for a solo job priced at the fixture asking price.
#[must_use]
pub fn post_request() -> PostJobRequest {
    PostJobRequest::new(ClientId::new(), ASKING_PRICE)
}
