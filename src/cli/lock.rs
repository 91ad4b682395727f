use std::path::Path;

use reqlock::Snapshot;
use tracing::{info, instrument};

use super::{Project, terminal::Highlight};

#[derive(Debug, Default, clap::Parser)]
pub struct Lock {}

impl Lock {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: &Path) -> anyhow::Result<()> {
        let project = Project::open(root)?;
        let graph = project.load()?;

        let unchanged = project
            .read_lock()?
            .is_some_and(|previous| previous.is_up_to_date(&graph));

        if unchanged {
            info!("lock file is unchanged");
            println!("{}", "Lock file is up to date.".done());
            return Ok(());
        }

        project.write_lock(&Snapshot::from_graph(&graph))?;
        println!(
            "Locked {} requirements in {}.",
            graph.len().to_string().done(),
            project.config.lockfile()
        );

        Ok(())
    }
}
