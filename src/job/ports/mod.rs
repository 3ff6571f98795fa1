//! Port contracts for persistence and outbound events.

pub mod events;
pub mod repository;

pub use events::{EventResult, EventSinkError, LifecycleEvent, LifecycleEventSink};
pub use repository::{
    MarketplaceRepository, RepositoryError, RepositoryResult, SelectionCommit, SweepCriteria,
};
