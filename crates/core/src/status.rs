//! Per-job run bookkeeping for the periodic analyzers. Each job carries an
//! in-flight flag that prevents overlapping runs of the same job (the timer
//! keeps ticking; the tick body is skipped) and a last-completed timestamp
//! read by the health check.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

/// Run state of a single periodic job.
#[derive(Default)]
pub struct JobStatus {
    in_flight: AtomicBool,
    last_completed: RwLock<Option<DateTime<Utc>>>,
}

impl JobStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the job for a run. Returns false when a run is already live,
    /// in which case the caller must skip this tick.
    pub fn begin(&self) -> bool {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Marks the current run finished successfully.
    pub fn complete(&self) {
        *self.last_completed.write() = Some(Utc::now());
        self.in_flight.store(false, Ordering::Release);
    }

    /// Releases the in-flight flag without recording a completion — the
    /// failed cycle's output stays whatever the previous cycle left.
    pub fn abort(&self) {
        self.in_flight.store(false, Ordering::Release);
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn last_completed(&self) -> Option<DateTime<Utc>> {
        *self.last_completed.read()
    }
}

/// One status cell per periodic analyzer job.
#[derive(Default)]
pub struct AnalysisStatus {
    pub dropoff: JobStatus,
    pub conversion_paths: JobStatus,
    pub optimizations: JobStatus,
}

impl AnalysisStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn any_in_flight(&self) -> bool {
        self.dropoff.is_in_flight()
            || self.conversion_paths.is_in_flight()
            || self.optimizations.is_in_flight()
    }

    /// Most recent completion across all jobs, if any job has completed.
    pub fn latest_completion(&self) -> Option<DateTime<Utc>> {
        [
            self.dropoff.last_completed(),
            self.conversion_paths.last_completed(),
            self.optimizations.last_completed(),
        ]
        .into_iter()
        .flatten()
        .max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_is_exclusive() {
        let status = JobStatus::new();
        assert!(status.begin());
        assert!(!status.begin());
        assert!(status.is_in_flight());

        status.complete();
        assert!(!status.is_in_flight());
        assert!(status.last_completed().is_some());
        assert!(status.begin());
    }

    #[test]
    fn test_abort_keeps_prior_completion() {
        let status = JobStatus::new();
        assert!(status.begin());
        status.complete();
        let first = status.last_completed().unwrap();

        assert!(status.begin());
        status.abort();
        assert!(!status.is_in_flight());
        assert_eq!(status.last_completed(), Some(first));
    }

    #[test]
    fn test_latest_completion_across_jobs() {
        let status = AnalysisStatus::new();
        assert!(status.latest_completion().is_none());
        assert!(!status.any_in_flight());

        status.dropoff.begin();
        assert!(status.any_in_flight());
        status.dropoff.complete();

        status.conversion_paths.begin();
        status.conversion_paths.complete();

        assert_eq!(
            status.latest_completion(),
            status.conversion_paths.last_completed()
        );
    }
}
