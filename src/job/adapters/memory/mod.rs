//! In-memory adapter implementations.

mod events;
mod repository;

pub use events::RecordingEventSink;
pub use repository::InMemoryMarketplaceRepository;
