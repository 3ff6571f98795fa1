//! In-memory event sink that records published events.
//!
//! Used by tests to assert on emitted events and as a stand-in sink when
//! no external collaborators are wired up.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use crate::job::ports::{EventResult, EventSinkError, LifecycleEvent, LifecycleEventSink};

/// Thread-safe recording event sink.
#[derive(Debug, Clone, Default)]
pub struct RecordingEventSink {
    events: Arc<RwLock<Vec<LifecycleEvent>>>,
}

impl RecordingEventSink {
    /// Creates an empty recording sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of every event published so far, in order.
    ///
    /// # Errors
    ///
    /// Returns [`EventSinkError::Delivery`] when the record lock is
    /// poisoned.
    pub fn recorded(&self) -> EventResult<Vec<LifecycleEvent>> {
        let events = self
            .events
            .read()
            .map_err(|err| EventSinkError::delivery(std::io::Error::other(err.to_string())))?;
        Ok(events.clone())
    }
}

#[async_trait]
impl LifecycleEventSink for RecordingEventSink {
    async fn publish(&self, event: LifecycleEvent) -> EventResult<()> {
        let mut events = self
            .events
            .write()
            .map_err(|err| EventSinkError::delivery(std::io::Error::other(err.to_string())))?;
        events.push(event);
        Ok(())
    }
}
