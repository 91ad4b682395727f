use std::path::Path;

use anyhow::Context;
use reqlock::{CONFIG_FILE, Config, Snapshot};
use tracing::instrument;

use super::{Project, terminal::Highlight};

#[derive(Debug, Default, clap::Parser)]
pub struct Init {
    /// Overwrite an existing lock file
    #[arg(long)]
    force: bool,
}

impl Init {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: &Path) -> anyhow::Result<()> {
        let project = Project::open(root)?;
        let lockfile = project.lockfile();
        if lockfile.exists() && !self.force {
            anyhow::bail!(
                "{} already exists (use --force to overwrite it)",
                lockfile.display()
            );
        }
        let graph = project.load()?;

        let config_path = root.join(CONFIG_FILE);
        if config_path.exists() {
            println!("Using existing {CONFIG_FILE}");
        } else {
            Config::default()
                .save(&config_path)
                .with_context(|| format!("failed to create {}", config_path.display()))?;
            println!("  Created: {CONFIG_FILE}");
        }

        project.write_lock(&Snapshot::from_graph(&graph))?;

        println!("  Created: {}", project.config.lockfile());
        println!();
        println!(
            "Locked {} requirements.",
            graph.len().to_string().done()
        );
        println!(
            "{}",
            "Run 'reqlock check' to compare documents with the lock.".muted()
        );

        Ok(())
    }
}
