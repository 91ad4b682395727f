use std::{collections::BTreeMap, path::Path, process};

use reqlock::{
    DiffResult, RequirementGraph, RequirementId, Snapshot, diff, storage::LockedRequirement,
};
use tracing::instrument;

use super::{
    Project,
    terminal::{Highlight, Marker, label},
};

/// Exit code when the documents differ from the lock file.
const EXIT_DIFFERENT: i32 = 2;

#[derive(Debug, Default, clap::Parser)]
pub struct Check {}

impl Check {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: &Path) -> anyhow::Result<()> {
        let project = Project::open(root)?;
        let Some(snapshot) = project.read_lock()? else {
            anyhow::bail!(
                "no lock file at {} (run 'reqlock init' to create one)",
                project.lockfile().display()
            );
        };
        let graph = project.load()?;

        let result = diff(&snapshot, &graph);
        if result.is_empty() {
            println!(
                "{} ({} requirements)",
                "Lock file is up to date.".done(),
                graph.len()
            );
            return Ok(());
        }

        Report::new(&snapshot, &graph).print(&result);
        println!();
        println!(
            "{} {}",
            format!("{} requirements differ from the lock file.", result.len()).pending(),
            "Run 'reqlock lock' to accept the changes.".muted()
        );

        process::exit(EXIT_DIFFERENT);
    }
}

/// Looks up the `critical` flag on either side of a diff.
struct Report<'a> {
    locked: BTreeMap<&'a RequirementId, &'a LockedRequirement>,
    graph: &'a RequirementGraph,
}

impl<'a> Report<'a> {
    fn new(snapshot: &'a Snapshot, graph: &'a RequirementGraph) -> Self {
        let locked = snapshot
            .requirements()
            .iter()
            .map(|requirement| (&requirement.id, requirement))
            .collect();
        Self { locked, graph }
    }

    fn print(&self, result: &DiffResult) {
        if !result.added.is_empty() {
            println!("Added ({})", result.added.len());
            for id in &result.added {
                let critical = self.graph.get(id).is_some_and(|r| r.is_critical());
                let description = self.graph.get(id).map_or("", |r| r.description());
                println!("  {} {} {}", Marker::Added, label(id, critical), description.muted());
            }
        }

        if !result.removed.is_empty() {
            println!("Removed ({})", result.removed.len());
            for id in &result.removed {
                let critical = self.locked.get(id).is_some_and(|r| r.critical);
                println!("  {} {}", Marker::Removed, label(id, critical));
            }
        }

        if !result.changed.is_empty() {
            println!("Changed ({})", result.changed.len());
            for change in &result.changed {
                let critical = self.graph.get(&change.id).is_some_and(|r| r.is_critical())
                    || self.locked.get(&change.id).is_some_and(|r| r.critical);
                println!("  {} {}", Marker::Changed, label(&change.id, critical));
                for field in &change.fields {
                    println!("      {}", field.to_string().muted());
                }
            }
        }
    }
}
