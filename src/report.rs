// MIT License
// Copyright (c) 2024 Graham King

use crate::error::Result;

/// What to do when one step of a multi-step workflow fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Return the first error, skip the remaining steps
    FailFast,
    /// Log a warning and carry on with the next step
    BestEffort,
}

/// Outcome of a workflow made of named steps
#[derive(Debug, Default)]
pub struct Report {
    pub succeeded: Vec<String>,
    /// (step, engine diagnostic)
    pub warnings: Vec<(String, String)>,
}

impl Report {
    /// Record the result of `step` following `policy`.
    /// Under `FailFast` the error is handed back to the caller.
    pub fn record<T>(
        &mut self,
        policy: FailurePolicy,
        step: &str,
        res: Result<T>,
    ) -> Result<Option<T>> {
        match res {
            Ok(v) => {
                self.succeeded.push(step.to_string());
                Ok(Some(v))
            }
            Err(err) if policy == FailurePolicy::FailFast => Err(err),
            Err(err) => {
                let diagnostic = err.diagnostic();
                tracing::warn!(step, %diagnostic, "step failed, continuing");
                self.warnings.push((step.to_string(), diagnostic));
                Ok(None)
            }
        }
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}
