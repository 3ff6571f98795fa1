//! Timing policy for deadline-driven lifecycle decisions.
//!
//! Every wall-clock threshold the engine compares against lives here as
//! data, so tests can tighten or relax windows without touching decision
//! logic and deployments can tune them without a rebuild.

use chrono::Duration;

/// Configurable lead times and TTLs for lifecycle decisions.
///
/// # Examples
///
/// ```
/// use changa::job::domain::LifecyclePolicy;
/// use chrono::Duration;
///
/// let policy = LifecyclePolicy::default().with_selection_lead(Duration::hours(12));
/// assert_eq!(policy.selection_lead(), Duration::hours(12));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecyclePolicy {
    selection_lead: Duration,
    confirmation_lead: Duration,
    pairing_ttl: Duration,
    pause_auto_resume: Duration,
}

impl LifecyclePolicy {
    /// Returns how long before the start date the auto-selection deadline
    /// fires and cancellation/pausing close.
    #[must_use]
    pub const fn selection_lead(&self) -> Duration {
        self.selection_lead
    }

    /// Returns how long before the scheduled end the confirmation window
    /// opens.
    #[must_use]
    pub const fn confirmation_lead(&self) -> Duration {
        self.confirmation_lead
    }

    /// Returns how long a pairing code stays valid after issuance.
    #[must_use]
    pub const fn pairing_ttl(&self) -> Duration {
        self.pairing_ttl
    }

    /// Returns how long a paused job stays paused before the sweep resumes
    /// it.
    #[must_use]
    pub const fn pause_auto_resume(&self) -> Duration {
        self.pause_auto_resume
    }

    /// Overrides the auto-selection lead time.
    #[must_use]
    pub const fn with_selection_lead(mut self, lead: Duration) -> Self {
        self.selection_lead = lead;
        self
    }

    /// Overrides the confirmation window lead time.
    #[must_use]
    pub const fn with_confirmation_lead(mut self, lead: Duration) -> Self {
        self.confirmation_lead = lead;
        self
    }

    /// Overrides the pairing code TTL.
    #[must_use]
    pub const fn with_pairing_ttl(mut self, ttl: Duration) -> Self {
        self.pairing_ttl = ttl;
        self
    }

    /// Overrides the pause auto-resume timeout.
    #[must_use]
    pub const fn with_pause_auto_resume(mut self, timeout: Duration) -> Self {
        self.pause_auto_resume = timeout;
        self
    }
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self {
            selection_lead: Duration::hours(24),
            confirmation_lead: Duration::minutes(5),
            pairing_ttl: Duration::hours(48),
            pause_auto_resume: Duration::hours(72),
        }
    }
}
