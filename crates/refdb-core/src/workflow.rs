//! One scheduled update: build into scratch, publish, and record the outcome.
//!
//! ```text
//! Init -> Building -> Publishing -> Done
//!            \            \
//!             +------------+--> Reporting -> Done
//! ```
//!
//! Build and publish failures never fail the run. They are turned into an
//! [`ErrorRecord`], sent through the [`Notifier`] if the ledger has not seen
//! them yet, and saved to the ledger.

use crate::builder::{self, BuildRequest};
use crate::config::UpdateConfig;
use crate::database::UpdateStats;
use crate::error::{Result, UpdateError};
use crate::io;
use crate::ledger::ErrorLedger;
use crate::lock::RunLock;
use crate::notify::Notifier;
use crate::publish::Publisher;
use crate::record::ErrorRecord;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The new database is live and the ledger is cleared.
    Published(UpdateStats),
    /// Build or publish failed; the failure was recorded.
    Failed {
        record: ErrorRecord,
        /// The ledger had not seen this failure, so the notifier was invoked.
        notified: bool,
    },
    /// Another run holds the lock; nothing was touched.
    Skipped,
}

pub struct Updater<'a> {
    config: UpdateConfig,
    notifier: &'a dyn Notifier,
}

impl<'a> Updater<'a> {
    pub fn new(config: UpdateConfig, notifier: &'a dyn Notifier) -> Self {
        Self { config, notifier }
    }

    /// Errors returned here are bookkeeping failures (config, lock, ledger).
    pub fn run(&self) -> Result<Outcome> {
        self.config.validate()?;
        io::ensure_dir(&self.config.state_dir)?;

        let Some(_lock) = RunLock::try_acquire(&self.config.lock_path())? else {
            warn!(
                lock = %self.config.lock_path().display(),
                "another update is running, skipping"
            );
            return Ok(Outcome::Skipped);
        };

        let ledger = ErrorLedger::new(self.config.ledger_path());
        match self.update() {
            Ok(stats) => {
                if ledger.clear()? {
                    info!("previous failure resolved, ledger cleared");
                }
                Ok(Outcome::Published(stats))
            }
            Err(err) => self.report(&ledger, &err),
        }
    }

    fn update(&self) -> std::result::Result<UpdateStats, UpdateError> {
        let request = BuildRequest::from_config(&self.config);
        let publisher = Publisher::new(self.config.live_dir(), self.config.scratch_dir());
        publisher.recover()?;

        let _cleanup = publisher.prepare()?;
        info!(
            work = %request.work_directory.display(),
            source = %request.source_tree.display(),
            version = %request.version,
            "building database"
        );
        let stats = builder::build(&publisher.staging_path(), &request)?;
        publisher.publish()?;
        Ok(stats)
    }

    fn report(&self, ledger: &ErrorLedger, err: &UpdateError) -> Result<Outcome> {
        let record = ErrorRecord::from_update_error(err);
        error!(kind = %record.kind, "update failed: {}", record.message);

        let notified = ledger.is_new(&record);
        if notified {
            // The ledger is saved even if the report cannot be delivered.
            if let Err(e) = self.notifier.report_error(&record) {
                error!(error = %e, "failed to send failure report");
            }
        } else {
            info!("failure already reported, not notifying again");
        }
        ledger.save(&record)?;
        Ok(Outcome::Failed { record, notified })
    }
}
