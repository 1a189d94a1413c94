//! Scene Migrator - fixes scene objects left at the origin
//!
//! Walks every scene exposed by the scene-management service and rewrites
//! the position of each object whose position is unset (missing, or exactly
//! `[0, 0, 0]`) to a configured fallback coordinate.
//!
//! The traversal is strictly sequential: one request in flight at a time.
//! A failed update is reported and skipped; a failed listing ends the run.
//!
//! # Example
//!
//! ```rust,ignore
//! use scene_migrator::{ConsoleReporter, Migrator, MigratorConfig};
//! use scene_api::Credential;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = MigratorConfig::new("http://localhost:5000/api", Credential::new("token"));
//! let migrator = Migrator::connect(config)?;
//!
//! let report = migrator.run(&mut ConsoleReporter::stdout()).await?;
//! println!("updated {} objects", report.updated);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod migrator;
pub mod report;

pub use config::{ConfigLayer, MigratorConfig, DEFAULT_BASE_URL, DEFAULT_FALLBACK_POSITION};
pub use error::{ConfigError, MigrateError};
pub use migrator::{needs_fallback, Migrator};
pub use report::{
    ConsoleReporter, FailedUpdate, MigrationEvent, MigrationReport, NullReporter, ProgressReporter,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
