use std::fmt;

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};

use crate::engine::lifecycle::Phase;
use crate::error::AppError;
use crate::models::job::{Job, JobStatus};

pub const SECRET_CODE_LEN: usize = 6;

/// Shared proof-of-delivery code. Generated once at job creation and only
/// ever compared; `Debug` never prints it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretCode(String);

impl SecretCode {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let code = rng
            .sample_iter(&Alphanumeric)
            .take(SECRET_CODE_LEN)
            .map(char::from)
            .collect();
        Self(code)
    }

    /// Exact, case-sensitive comparison that looks at every byte.
    pub fn matches(&self, supplied: &str) -> bool {
        constant_time_eq(self.0.as_bytes(), supplied.as_bytes())
    }

    /// Only for owner/admin views.
    pub(crate) fn reveal(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretCode(******)")
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Checks the receiver's code and, on a match, completes the job. A mismatch
/// leaves the job untouched.
pub fn validate(job: &mut Job, supplied_code: &str, at: DateTime<Utc>) -> Result<(), AppError> {
    job.lifecycle.ensure_mutable()?;

    if job.status() != JobStatus::PickedUp {
        return Err(AppError::IllegalTransition {
            from: job.lifecycle.pair(),
            to: Phase::Delivered.pair(),
        });
    }

    if !job.secret_code.matches(supplied_code) {
        return Err(AppError::InvalidSecretCode);
    }

    job.lifecycle.deliver()?;
    job.delivered_at = Some(at);
    Ok(())
}
