//! Short-lived pairing codes for in-person presence verification.
//!
//! A code is issued with each contract, shown to the worker, and spoken to
//! the client on arrival. It carries no cryptographic binding; it is an
//! opaque token with a TTL, derived deterministically from the contract
//! identity and issuance instant so reissuing never silently changes it.

use super::ContractId;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Number of digest bytes rendered into the spoken code (two hex
/// characters each).
const CODE_BYTES: usize = 3;

/// A short verification code with an expiry instant.
///
/// # Examples
///
/// ```
/// use changa::job::domain::{ContractId, PairingCode};
/// use chrono::{Duration, Utc};
///
/// let issued = Utc::now();
/// let code = PairingCode::issue(ContractId::new(), issued, Duration::hours(48));
/// assert_eq!(code.code().len(), 6);
/// assert!(code.is_valid(issued));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingCode {
    code: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl PairingCode {
    /// Issues a code for the given contract, valid for `ttl` from
    /// `issued_at`.
    #[must_use]
    pub fn issue(contract_id: ContractId, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(contract_id.into_inner().as_bytes());
        hasher.update(issued_at.to_rfc3339().as_bytes());
        let digest = hasher.finalize();
        let code: String = digest
            .iter()
            .take(CODE_BYTES)
            .map(|byte| format!("{byte:02X}"))
            .collect();

        Self {
            code,
            issued_at,
            expires_at: issued_at + ttl,
        }
    }

    /// Reconstructs a code from persisted storage.
    #[must_use]
    pub const fn from_persisted(
        code: String,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            code,
            issued_at,
            expires_at,
        }
    }

    /// Returns the spoken code text.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Returns the issuance instant.
    #[must_use]
    pub const fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// Returns the expiry instant.
    #[must_use]
    pub const fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns true while the code has not expired.
    #[must_use]
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Returns true when `candidate` matches the code and it is still
    /// valid. Comparison is case-insensitive; codes are spoken aloud.
    #[must_use]
    pub fn matches(&self, candidate: &str, now: DateTime<Utc>) -> bool {
        self.is_valid(now) && self.code.eq_ignore_ascii_case(candidate.trim())
    }
}

impl fmt::Display for PairingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)
    }
}
