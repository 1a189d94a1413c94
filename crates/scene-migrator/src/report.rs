//! Run report and progress output
//!
//! The migrator emits a [`MigrationEvent`] for every step. The console
//! reporter renders them as the human-readable progress text printed by the
//! `scene-migrate` binary.

use scene_api::{Position, RequestError, ResourceId, Scene, SceneObject};
use std::io::{self, Write};

const BANNER_WIDTH: usize = 60;

/// Outcome of one migration run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationReport {
    /// Scenes whose objects were listed
    pub scenes_processed: usize,
    /// Objects run through the update predicate
    pub objects_inspected: usize,
    /// Successful update calls
    pub updated: usize,
    /// Objects that already had a position
    pub skipped: usize,
    /// Objects that qualified during a dry run
    pub pending: usize,
    /// Update calls that failed
    pub failed: Vec<FailedUpdate>,
}

impl MigrationReport {
    /// Objects that qualified for the fallback, whatever happened to them
    #[inline]
    #[must_use]
    pub fn qualifying(&self) -> usize {
        self.updated + self.pending + self.failed.len()
    }

    /// Check if every attempted update succeeded
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// An update that was attempted and failed
#[derive(Debug, Clone, PartialEq)]
pub struct FailedUpdate {
    pub object_id: ResourceId,
    pub object_name: String,
    pub message: String,
}

/// Progress of a run, in emission order
#[derive(Debug)]
pub enum MigrationEvent<'a> {
    Started { dry_run: bool },
    FetchingScenes,
    ScenesListed { count: usize },
    SceneStarted { scene: &'a Scene },
    ObjectsListed { scene: &'a Scene, count: usize },
    /// Object qualified; an update follows unless this is a dry run
    UpdatingObject {
        object: &'a SceneObject,
        new_position: Position,
    },
    ObjectUpdated { object: &'a SceneObject },
    UpdateFailed {
        object: &'a SceneObject,
        error: &'a RequestError,
    },
    UpdateDeferred { object: &'a SceneObject },
    ObjectSkipped { object: &'a SceneObject },
    Finished { report: &'a MigrationReport },
}

/// Sink for progress events
pub trait ProgressReporter: Send {
    fn on_event(&mut self, event: &MigrationEvent<'_>);
}

/// Discards all events
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn on_event(&mut self, _event: &MigrationEvent<'_>) {}
}

/// Renders events as progress text
#[derive(Debug)]
pub struct ConsoleReporter<W> {
    out: W,
}

impl ConsoleReporter<io::Stdout> {
    /// Report to standard output
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleReporter<W> {
    #[must_use]
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Recover the writer, e.g. a `Vec<u8>` in tests
    pub fn into_inner(self) -> W {
        self.out
    }

    fn render(&mut self, event: &MigrationEvent<'_>) -> io::Result<()> {
        let banner = "=".repeat(BANNER_WIDTH);
        let out = &mut self.out;

        match event {
            MigrationEvent::Started { dry_run } => {
                writeln!(out, "{banner}")?;
                if *dry_run {
                    writeln!(out, "Scene object position migration (dry run)")?;
                } else {
                    writeln!(out, "Scene object position migration")?;
                }
                writeln!(out, "{banner}")?;
            }
            MigrationEvent::FetchingScenes => {
                writeln!(out, "\nFetching scene list...")?;
            }
            MigrationEvent::ScenesListed { count } => {
                writeln!(out, "Found {count} scenes")?;
            }
            MigrationEvent::SceneStarted { scene } => {
                writeln!(out, "\nProcessing scene: {} ({})", scene.name, scene.id)?;
            }
            MigrationEvent::ObjectsListed { count, .. } => {
                writeln!(out, "  - Found {count} scene objects")?;
            }
            MigrationEvent::UpdatingObject {
                object,
                new_position,
            } => {
                writeln!(out, "  - Updating object: {}", object.name)?;
                writeln!(out, "    Current position: {}", describe(object.position))?;
                writeln!(out, "    New position: {new_position}")?;
            }
            MigrationEvent::ObjectUpdated { .. } => {
                writeln!(out, "    ✓ Update succeeded")?;
            }
            MigrationEvent::UpdateFailed { error, .. } => {
                writeln!(out, "    ✗ Update failed: {error}")?;
            }
            MigrationEvent::UpdateDeferred { .. } => {
                writeln!(out, "    ~ Dry run, not updated")?;
            }
            MigrationEvent::ObjectSkipped { object } => {
                writeln!(
                    out,
                    "  - Skipping object: {} (position already set: {})",
                    object.name,
                    describe(object.position)
                )?;
            }
            MigrationEvent::Finished { report } => {
                writeln!(out, "\n{banner}")?;
                writeln!(out, "Migration complete! Updated {} objects", report.updated)?;
                if !report.failed.is_empty() {
                    writeln!(out, "Failed updates: {}", report.failed.len())?;
                }
                if report.pending > 0 {
                    writeln!(out, "Would update {} objects", report.pending)?;
                }
                writeln!(out, "{banner}")?;
            }
        }

        out.flush()
    }
}

impl<W: Write + Send> ProgressReporter for ConsoleReporter<W> {
    fn on_event(&mut self, event: &MigrationEvent<'_>) {
        if let Err(e) = self.render(event) {
            tracing::warn!(error = %e, "failed to write progress output");
        }
    }
}

fn describe(position: Option<Position>) -> String {
    position.map_or_else(|| "unset".to_string(), |p| p.to_string())
}
