use anyhow::Context;
use clap::Parser;
use refdb_core::config::{MailConfig, UpdateConfig, DEFAULT_ENCODING, DEFAULT_VERSION};
use refdb_core::notify;
use refdb_core::workflow::{Outcome, Updater};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "refdb-update",
    about = "Rebuild the reference documentation database and publish it atomically",
    long_about = "Rebuilds <WORK_ROOT>/var/<VERSION> from <WORK_ROOT>/src. Build and publish \
                  failures are reported by mail once per distinct error and do not change the \
                  exit status.",
    version
)]
struct Cli {
    /// Working directory root containing src/ and var/
    work_root: PathBuf,

    /// Sender address for failure reports
    #[arg(long, value_name = "ADDR", env = "REFDB_FROM")]
    from: Option<String>,

    /// Recipient address for failure reports
    #[arg(long, value_name = "ADDR", env = "REFDB_TO")]
    to: Option<String>,

    /// SMTP relay host (reports are only logged when unset)
    #[arg(long = "smtp-host", value_name = "NAME", env = "REFDB_SMTP_HOST")]
    smtp_host: Option<String>,

    /// SMTP relay port [default: 25]
    #[arg(long = "smtp-port", value_name = "NUM", env = "REFDB_SMTP_PORT")]
    smtp_port: Option<u16>,

    /// Database version; the live artifact is var/<VERSION>
    #[arg(long = "db-version", value_name = "VERSION", default_value = DEFAULT_VERSION)]
    db_version: String,

    /// Value stored in the database's `encoding` property
    #[arg(long, value_name = "NAME", default_value = DEFAULT_ENCODING)]
    encoding: String,

    /// Directory holding the scratch area, lasterror.log and the run lock.
    /// Must be on the same filesystem as WORK_ROOT, since publishing renames
    /// the scratch area into var/
    #[arg(long = "state-dir", value_name = "DIR", default_value = ".")]
    state_dir: PathBuf,

    /// YAML file with smtp_host, smtp_port, from and to; flags take precedence
    #[arg(long, value_name = "FILE", env = "REFDB_CONFIG")]
    config: Option<PathBuf>,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version are not errors.
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing::Level::INFO.into())
                .from_env_lossy(),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mail = match &cli.config {
        Some(path) => MailConfig::load(path).context("failed to load mail config")?,
        None => MailConfig::default(),
    }
    .override_with(cli.smtp_host, cli.smtp_port, cli.from, cli.to);
    let notifier = notify::from_config(&mail)?;

    let config = UpdateConfig::new(cli.work_root)
        .with_version(cli.db_version)
        .with_encoding(cli.encoding)
        .with_state_dir(cli.state_dir);

    let outcome = Updater::new(config, notifier.as_ref())
        .run()
        .context("update bookkeeping failed")?;

    match outcome {
        Outcome::Published(stats) => tracing::info!(
            libraries = stats.libraries,
            entries = stats.entries,
            "update complete"
        ),
        Outcome::Failed { record, notified } => tracing::warn!(
            kind = %record.kind,
            notified,
            "update failed, recorded in ledger"
        ),
        Outcome::Skipped => {}
    }
    Ok(())
}
