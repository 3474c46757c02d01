// src/pipeline.rs
//! Stage traits shared by the sync jobs.
//!
//! Every job runs the same three stages: fetch a snapshot from the vendor,
//! compose it into an [`OutputPlan`], then deliver the plan and record the
//! run in the sync state. [`run_job`] drives them in that order.

use crate::error::AppError;
use crate::output::{deliver, DataLayout, OutputPlan};
use crate::state::SyncState;
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use std::fmt;

/// Shared run context: where files go and the sync state they update.
///
/// The state sits behind a mutex so jobs running side by side under
/// `all` never lose each other's updates.
#[derive(Debug)]
pub struct SyncContext {
    layout: DataLayout,
    state: Mutex<SyncState>,
}

impl SyncContext {
    /// Loads the sync state from the layout's state file.
    pub fn load(layout: DataLayout) -> Result<Self, AppError> {
        let state = SyncState::load(&layout.state_file())?;
        Ok(Self::new(layout, state))
    }

    pub fn new(layout: DataLayout, state: SyncState) -> Self {
        Self {
            layout,
            state: Mutex::new(state),
        }
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    /// A copy of the current state.
    pub fn state(&self) -> SyncState {
        self.state.lock().clone()
    }

    /// Applies `update` and saves the state file while holding the lock.
    pub fn update_state<F>(&self, update: F) -> Result<(), AppError>
    where
        F: FnOnce(&mut SyncState),
    {
        let mut state = self.state.lock();
        update(&mut state);
        state.save(&self.layout.state_file())
    }
}

/// Fetches a vendor snapshot and turns it into files and state updates.
pub trait SnapshotJob {
    type Snapshot;

    fn name(&self) -> &'static str;

    /// Calls the vendor API. Per-item failures are kept in the snapshot;
    /// only errors that make the whole run meaningless are returned.
    fn fetch(&self, ctx: &SyncContext) -> Result<Self::Snapshot, AppError>;

    /// Describes the files to write for `snapshot`.
    fn compose(&self, snapshot: &Self::Snapshot, ctx: &SyncContext) -> Result<OutputPlan, AppError>;

    /// Records the run in the sync state.
    fn record(&self, snapshot: &Self::Snapshot, state: &mut SyncState);

    fn report(&self, snapshot: &Self::Snapshot) -> JobReport;
}

/// Runs the fetch, compose and deliver stages, then records the run.
pub fn run_job<J: SnapshotJob>(job: &J, ctx: &SyncContext) -> Result<JobReport, AppError> {
    log::info!("{} sync started", job.name());

    let snapshot = job.fetch(ctx)?;
    let plan = job.compose(&snapshot, ctx)?;
    let report = deliver(plan).into_result()?;
    log::debug!(
        "{}: wrote {} files ({} bytes)",
        job.name(),
        report.stats.operations_completed,
        report.stats.bytes_written
    );

    ctx.update_state(|state| job.record(&snapshot, state))?;

    let job_report = job.report(&snapshot);
    log::info!("{} sync complete: {}", job.name(), job_report);
    Ok(job_report)
}

/// Outcome of one job, shown to the user at the end of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobReport {
    pub job: &'static str,
    /// Number of items written (issues, pull requests, messages, articles).
    pub items: usize,
    pub details: Vec<String>,
    /// Items that could not be synced; the job still wrote the rest.
    pub failures: Vec<String>,
}

impl JobReport {
    pub fn new(job: &'static str, items: usize) -> Self {
        Self {
            job,
            items,
            ..Default::default()
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.details.push(detail.into());
        self
    }

    pub fn with_failures(mut self, failures: impl IntoIterator<Item = String>) -> Self {
        self.failures.extend(failures);
        self
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for JobReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} items", self.items)?;
        if !self.failures.is_empty() {
            write!(f, ", {} failed", self.failures.len())?;
        }
        Ok(())
    }
}

/// `YYYY-MM-DDTHH:MM:SSZ`, the timestamp format of every snapshot file.
pub fn iso_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn iso_now() -> String {
    iso_timestamp(&Utc::now())
}
