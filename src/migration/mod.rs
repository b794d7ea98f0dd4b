//! One-shot migration from a legacy backend.
//!
//! The runner moves data from a legacy backend into a target backend,
//! step by step, and then writes a durable marker (`hasMigrated`). Once the
//! marker is `true` every later run is a no-op.
//!
//! # States
//!
//! ```text
//! NotMigrated ──run()──► steps ──► write marker ──► Migrated (terminal)
//!      ▲                                 │
//!      └──── marker write failed ────────┘
//! ```
//!
//! A run interrupted before the marker is written leaves the state at
//! `NotMigrated`, and the next launch repeats it from the start. Steps are
//! idempotent, so repeating never duplicates records.
//!
//! # Skipped steps
//!
//! A step whose legacy data cannot be decoded or written is skipped and its
//! legacy key is kept, so nothing is lost. The marker is still written:
//! undecodable legacy data will not become decodable by retrying.

mod step;

pub use step::{CollectionStep, MigrationStep, ValueStep};

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::codec;
use crate::error::Result;
use crate::storage::{StorageBackend, MIGRATION_MARKER_KEY};
use crate::store::Layout;

/// Whether the one-shot migration has completed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MigrationState {
    /// Marker missing, `false`, or unreadable.
    NotMigrated,
    /// Marker is `true`. Terminal.
    Migrated,
}

impl MigrationState {
    /// Reads the marker from `backend`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the backend read itself fails. A marker
    /// that does not decode as a boolean counts as `NotMigrated`.
    pub fn read(backend: &dyn StorageBackend) -> Result<Self> {
        let Some(bytes) = backend.get(MIGRATION_MARKER_KEY)? else {
            return Ok(Self::NotMigrated);
        };
        match codec::decode::<bool>(&bytes) {
            Ok(true) => Ok(Self::Migrated),
            Ok(false) => Ok(Self::NotMigrated),
            Err(e) => {
                warn!(error = %e, "Migration marker undecodable, treating as not migrated");
                Ok(Self::NotMigrated)
            }
        }
    }

    /// Returns true for [`MigrationState::Migrated`].
    pub fn is_migrated(&self) -> bool {
        matches!(self, Self::Migrated)
    }
}

/// Result of one step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// The legacy key did not exist.
    Absent,
    /// The step failed; the legacy key was kept.
    Skipped {
        /// Why the step failed.
        reason: String,
    },
    /// Data was written to the target and the legacy key removed.
    Migrated {
        /// Number of values written.
        count: usize,
    },
}

/// Per-step entry of a [`MigrationReport`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepReport {
    /// Step name.
    pub name: String,
    /// What happened.
    pub outcome: StepOutcome,
}

/// Summary of a [`MigrationRunner::run`] call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// The marker was already set; no step ran.
    pub already_migrated: bool,
    /// One entry per step, in run order.
    pub steps: Vec<StepReport>,
}

impl MigrationReport {
    /// Number of steps that moved data.
    pub fn migrated_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s.outcome, StepOutcome::Migrated { .. }))
            .count()
    }

    /// Number of steps that were skipped.
    pub fn skipped_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s.outcome, StepOutcome::Skipped { .. }))
            .count()
    }
}

/// Runs migration steps from a legacy backend into a target backend.
///
/// Steps write into `target` unless a blob target is set with
/// [`with_blob_target`](Self::with_blob_target); then steps whose
/// [`MigrationStep::target_layout`] is [`Layout::Blob`] write there instead.
pub struct MigrationRunner {
    legacy: Arc<dyn StorageBackend>,
    target: Arc<dyn StorageBackend>,
    blob_target: Option<Arc<dyn StorageBackend>>,
    marker: Arc<dyn StorageBackend>,
}

impl MigrationRunner {
    /// Creates a runner.
    ///
    /// `marker` holds the `hasMigrated` flag; it is normally the key-value
    /// backend and may be the same as `legacy`.
    pub fn new(
        legacy: Arc<dyn StorageBackend>,
        target: Arc<dyn StorageBackend>,
        marker: Arc<dyn StorageBackend>,
    ) -> Self {
        Self {
            legacy,
            target,
            blob_target: None,
            marker,
        }
    }

    /// Sends steps targeting a [`Layout::Blob`] collection to `backend`.
    pub fn with_blob_target(mut self, backend: Arc<dyn StorageBackend>) -> Self {
        self.blob_target = Some(backend);
        self
    }

    /// Backend `step` writes into.
    fn target_for(&self, step: &dyn MigrationStep) -> &dyn StorageBackend {
        match (step.target_layout(), &self.blob_target) {
            (Some(Layout::Blob { .. }), Some(blob)) => blob.as_ref(),
            _ => self.target.as_ref(),
        }
    }

    /// Current marker state.
    pub fn state(&self) -> Result<MigrationState> {
        MigrationState::read(self.marker.as_ref())
    }

    /// Runs every step once, then writes the marker.
    ///
    /// # Errors
    ///
    /// Returns an error if the marker cannot be read or written. Step
    /// failures are reported in the [`MigrationReport`], not as errors.
    #[instrument(skip(self, steps), fields(legacy = self.legacy.name(), target = self.target.name(), steps = steps.len()))]
    pub fn run(&self, steps: &[&dyn MigrationStep]) -> Result<MigrationReport> {
        if self.state()?.is_migrated() {
            debug!("Already migrated, skipping");
            return Ok(MigrationReport {
                already_migrated: true,
                steps: Vec::new(),
            });
        }

        info!("Starting migration");

        let mut report = MigrationReport::default();
        for step in steps {
            let outcome = self.run_step(*step);
            report.steps.push(StepReport {
                name: step.name().to_string(),
                outcome,
            });
        }

        self.marker
            .put(MIGRATION_MARKER_KEY, &codec::encode(&true)?)
            .inspect_err(|e| {
                warn!(error = %e, "Migration marker not written, will retry on next launch");
            })?;

        info!(
            migrated = report.migrated_count(),
            skipped = report.skipped_count(),
            "Migration complete"
        );
        Ok(report)
    }

    fn run_step(&self, step: &dyn MigrationStep) -> StepOutcome {
        let key = step.legacy_key();

        let bytes = match self.legacy.get(key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!(step = step.name(), "Legacy key absent");
                return StepOutcome::Absent;
            }
            Err(e) => return self.skip(step, e.to_string()),
        };

        let count = match step.transfer(&bytes, self.target_for(step)) {
            Ok(count) => count,
            Err(e) => return self.skip(step, e.to_string()),
        };

        if let Err(e) = self.legacy.delete(key) {
            // Data is already in the target; a leftover legacy key is harmless
            warn!(step = step.name(), error = %e, "Legacy key not removed");
        }

        info!(step = step.name(), count = count, "Step migrated");
        StepOutcome::Migrated { count }
    }

    fn skip(&self, step: &dyn MigrationStep, reason: String) -> StepOutcome {
        warn!(step = step.name(), reason = %reason, "Step skipped, legacy data kept");
        StepOutcome::Skipped { reason }
    }
}

impl fmt::Debug for MigrationRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationRunner")
            .field("legacy", &self.legacy.name())
            .field("target", &self.target.name())
            .field("blob_target", &self.blob_target.as_ref().map(|b| b.name()))
            .field("marker", &self.marker.name())
            .finish()
    }
}
