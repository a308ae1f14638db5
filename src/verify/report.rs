use std::fmt;

use super::errors::VerificationFailure;

/// Failures gathered while verifying one or more functions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationReport {
    pub failures: Vec<VerificationFailure>,
}

impl VerificationReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn has_fatal(&self) -> bool {
        self.failures.iter().any(VerificationFailure::is_fatal)
    }

    /// Records a failure unless `limit` (0 = unlimited) is already reached.
    /// Returns whether the failure was kept.
    pub fn push(&mut self, failure: VerificationFailure, limit: usize) -> bool {
        if self.is_full(limit) {
            return false;
        }
        self.failures.push(failure);
        true
    }

    pub fn is_full(&self, limit: usize) -> bool {
        limit != 0 && self.failures.len() >= limit
    }

    pub fn extend_with_limit(&mut self, other: VerificationReport, limit: usize) {
        for failure in other.failures {
            if !self.push(failure, limit) {
                break;
            }
        }
    }

    /// The first failure, if any.
    pub fn into_result(self) -> Result<(), VerificationFailure> {
        match self.failures.into_iter().next() {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            return write!(f, "verification passed");
        }
        writeln!(
            f,
            "verification failed with {} error(s):",
            self.failures.len()
        )?;
        for failure in &self.failures {
            writeln!(f, "  {failure}")?;
        }
        Ok(())
    }
}
