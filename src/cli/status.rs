use std::path::Path;

use clap::Parser;
use reqlock::{Requirement, RequirementGraph, Summary};
use serde::Serialize;
use tracing::instrument;

use super::{
    Project,
    terminal::{Highlight, completion_mark, heading, is_narrow, label},
};

#[derive(Debug, Parser, Default)]
#[command(about = "Show completion counts per document and the requirement hierarchy")]
pub struct Status {
    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, Serialize)]
struct DocumentStatus<'a> {
    document: &'a str,
    #[serde(flatten)]
    summary: Summary,
}

#[derive(Debug, Serialize)]
struct StatusReport<'a> {
    #[serde(flatten)]
    summary: Summary,
    documents: Vec<DocumentStatus<'a>>,
}

impl Status {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: &Path) -> anyhow::Result<()> {
        let project = Project::open(root)?;
        let graph = project.load()?;

        let by_document = graph.by_document();
        let report = StatusReport {
            summary: graph.summary(),
            documents: by_document
                .iter()
                .map(|(document, requirements)| DocumentStatus {
                    document,
                    summary: Summary::of(requirements.iter().copied()),
                })
                .collect(),
        };

        match self.output {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            OutputFormat::Table => {
                if graph.is_empty() {
                    println!("No requirements found yet. Declare one in a blockquote:");
                    println!("{}", "  > REQ-1\n  > Describe the requirement".muted());
                    return Ok(());
                }
                output_table(&report, &graph);
            }
        }

        Ok(())
    }
}

fn output_table(report: &StatusReport<'_>, graph: &RequirementGraph) {
    let narrow = is_narrow();
    let summary = &report.summary;

    heading("Requirements");
    println!(
        "Completed: {}",
        ratio(summary.completed, summary.total)
    );
    println!(
        "Critical:  {}",
        ratio(summary.critical_completed, summary.critical)
    );
    println!();

    heading("By document");
    if narrow {
        for document in &report.documents {
            println!("{}", document.document);
            println!(
                "  {}",
                ratio(document.summary.completed, document.summary.total)
            );
        }
    } else {
        let width = report
            .documents
            .iter()
            .map(|document| document.document.len())
            .max()
            .unwrap_or_default()
            .max("Document".len());
        println!("{:<width$}  Completed", "Document");
        for document in &report.documents {
            println!(
                "{:<width$}  {}",
                document.document,
                ratio(document.summary.completed, document.summary.total)
            );
        }
    }
    println!();

    heading("Hierarchy");
    for (depth, requirement) in hierarchy(graph) {
        println!("{}{}", "  ".repeat(depth), node(requirement, narrow));
    }
}

fn ratio(done: usize, total: usize) -> String {
    if total == 0 {
        return "–".muted();
    }
    let text = format!("{done}/{total} ({}%)", done * 100 / total);
    if done == total {
        text.done()
    } else {
        text.pending()
    }
}

fn node(requirement: &Requirement, narrow: bool) -> String {
    let mark = completion_mark(requirement.is_completed());
    let id = label(requirement.id(), requirement.is_critical());
    if narrow {
        format!("{mark} {id}")
    } else {
        format!("{mark} {id} {}", requirement.description().muted())
    }
}

/// Depth-first walk from each root down through its children.
///
/// A requirement with several parents appears under each of them.
fn hierarchy(graph: &RequirementGraph) -> Vec<(usize, &Requirement)> {
    let mut out = Vec::new();
    let mut stack: Vec<(usize, &Requirement)> =
        graph.roots().map(|root| (0, root)).collect();
    stack.reverse();

    while let Some((depth, requirement)) = stack.pop() {
        out.push((depth, requirement));
        let children: Vec<_> = graph.children(requirement.id()).collect();
        stack.extend(children.into_iter().rev().map(|child| (depth + 1, child)));
    }

    out
}
