//! Batch driver
//!
//! Runs every spec of a catalog through an [`Ensure`] implementation, in
//! order, one request at a time. A failure never stops the batch.

use super::{Ensure, OperationOutcome, ResourceSpec, Throttle};
use std::fmt;

/// Outcome counts for one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub created: usize,
    pub already_exists: usize,
    pub failed: usize,
    pub total: usize,
}

impl Summary {
    pub fn record(&mut self, outcome: &OperationOutcome) {
        match outcome {
            OperationOutcome::Created(_) => self.created += 1,
            OperationOutcome::AlreadyExists => self.already_exists += 1,
            OperationOutcome::Failed(_) => self.failed += 1,
        }
        self.total += 1;
    }

    /// True when nothing failed
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Created={}, AlreadyExists={}, Failed={}, Total={}",
            self.created, self.already_exists, self.failed, self.total
        )
    }
}

/// Per-resource outcomes in catalog order, plus their tally
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub results: Vec<(ResourceSpec, OperationOutcome)>,
    pub summary: Summary,
}

impl BatchReport {
    pub fn outcomes(&self) -> impl Iterator<Item = &OperationOutcome> {
        self.results.iter().map(|(_, outcome)| outcome)
    }
}

/// Ensure every spec in order
///
/// `on_outcome` is called as soon as each attempt finishes, so status can be
/// reported while the batch is still running.
pub async fn run_batch<E, F>(
    ensurer: &E,
    specs: &[ResourceSpec],
    throttle: &mut Throttle,
    mut on_outcome: F,
) -> BatchReport
where
    E: Ensure,
    F: FnMut(&ResourceSpec, &OperationOutcome),
{
    let mut report = BatchReport::default();

    for (index, spec) in specs.iter().enumerate() {
        throttle.acquire().await;

        tracing::debug!("[{}/{}] {}", index + 1, specs.len(), spec.handle);
        let attempt = ensurer.attempt(spec).await;
        throttle.observe(&attempt.feedback);

        on_outcome(spec, &attempt.outcome);
        report.summary.record(&attempt.outcome);
        report.results.push((spec.clone(), attempt.outcome));
    }

    tracing::info!("Batch finished: {}", report.summary);
    report
}
