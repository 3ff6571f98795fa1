//! Shared fixtures for the job module's unit tests.

use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;

use crate::job::{
    adapters::memory::{InMemoryMarketplaceRepository, RecordingEventSink},
    domain::{ClientId, Job, LifecyclePolicy, Money},
    services::{ConfirmationService, DeadlineSweep, JobLifecycleService, PostJobRequest},
};

/// Commission charged at publication in the fixtures.
pub const PUBLICATION_FEE: Money = Money::from_minor_units(5_000);

/// Commission applied to contracts in the fixtures.
pub const CONTRACT_COMMISSION: Money = Money::from_minor_units(2_500);

/// Asking price used by the fixtures.
pub const ASKING_PRICE: Money = Money::from_minor_units(50_000);

/// Clock frozen at a fixed instant, advanced explicitly per test.
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

/// Reference instant every fixture counts from.
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

/// In-memory service wiring shared by the service-level tests.
pub struct Harness {
    pub repository: Arc<InMemoryMarketplaceRepository>,
    pub events: Arc<RecordingEventSink>,
    pub policy: LifecyclePolicy,
    pub now: DateTime<Utc>,
}

impl Harness {
    /// Wires the in-memory adapters with the default policy, frozen at
    /// `now`.
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            repository: Arc::new(InMemoryMarketplaceRepository::new()),
            events: Arc::new(RecordingEventSink::new()),
            policy: LifecyclePolicy::default(),
            now,
        }
    }

    pub fn lifecycle(&self) -> TestLifecycle {
        self.lifecycle_at(self.now)
    }

    /// Lifecycle service whose clock reads `now`, over the shared state.
    pub fn lifecycle_at(&self, now: DateTime<Utc>) -> TestLifecycle {
        JobLifecycleService::new(
            Arc::clone(&self.repository),
            Arc::clone(&self.events),
            Arc::new(FixedClock(now)),
            self.policy,
        )
    }

    pub fn confirmation(&self) -> TestConfirmation {
        self.confirmation_at(self.now)
    }

    pub fn confirmation_at(&self, now: DateTime<Utc>) -> TestConfirmation {
        ConfirmationService::new(
            Arc::clone(&self.repository),
            Arc::clone(&self.events),
            Arc::new(FixedClock(now)),
            self.policy,
        )
    }

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
pub fn post_request() -> PostJobRequest {
    PostJobRequest::new(ClientId::new(), ASKING_PRICE)
}
