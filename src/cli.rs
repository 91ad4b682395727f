use std::path::{Path, PathBuf};

mod check;
mod init;
mod lock;
mod status;
mod terminal;

use anyhow::Context;
use check::Check;
use clap::ArgAction;
use init::Init;
use lock::Lock;
use reqlock::{
    Config, RequirementGraph, Snapshot,
    storage::{documents, lockfile},
};
use status::Status;
use tracing::debug;

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// The root of the documentation tree
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        self.command
            .unwrap_or_else(|| Command::Status(Status::default()))
            .run(&self.root)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Show completion status (default)
    Status(Status),

    /// Create the configuration and the first lock file
    Init(Init),

    /// Record the current requirements in the lock file
    Lock(Lock),

    /// Compare the documents with the lock file
    ///
    /// Exits with code 2 if they differ.
    Check(Check),
}

impl Command {
    fn run(self, root: &Path) -> anyhow::Result<()> {
        match self {
            Self::Status(command) => command.run(root),
            Self::Init(command) => command.run(root),
            Self::Lock(command) => command.run(root),
            Self::Check(command) => command.run(root),
        }
    }
}

/// A documentation root and its configuration.
struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    fn open(root: &Path) -> anyhow::Result<Self> {
        let config = Config::load_or_default(root)
            .with_context(|| format!("failed to load configuration in {}", root.display()))?;
        Ok(Self {
            root: root.to_path_buf(),
            config,
        })
    }

    fn lockfile(&self) -> PathBuf {
        self.root.join(self.config.lockfile())
    }

    /// Parses and validates every document under the root.
    fn load(&self) -> anyhow::Result<RequirementGraph> {
        let documents = documents::read_all(&self.root, &self.config)?;
        debug!(count = documents.len(), "read documents");
        reqlock::load(&documents).context("requirements are invalid")
    }

    fn read_lock(&self) -> anyhow::Result<Option<Snapshot>> {
        Ok(lockfile::read(&self.lockfile())?)
    }

    fn write_lock(&self, snapshot: &Snapshot) -> anyhow::Result<()> {
        Ok(lockfile::write(&self.lockfile(), snapshot)?)
    }
}
