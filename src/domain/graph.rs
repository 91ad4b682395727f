//! The validated requirement hierarchy.
//!
//! A [`RequirementGraph`] is built once per pass from every requirement found
//! in every document. Construction runs four validation stages in order and
//! stops at the first stage that fails, reporting every violation found in
//! that stage:
//!
//! 1. identifiers are unique
//! 2. every parent reference resolves
//! 3. the parent relation is acyclic
//! 4. completed requirements only have completed children
//!
//! Requirements are stored in an arena sorted by identifier. Node `i` of the
//! dependency graph is `requirements[i]`; edges point from child to parent.

use std::{collections::BTreeMap, fmt, iter};

use nonempty::NonEmpty;
use petgraph::{
    Direction,
    graph::{DiGraph, Neighbors, NodeIndex},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::domain::{Requirement, RequirementId, Source};

/// A validated set of requirements and their parent links.
#[derive(Debug, Clone, Default)]
pub struct RequirementGraph {
    /// Arena of requirements, sorted by identifier.
    requirements: Vec<Requirement>,

    /// Lookup from identifier to arena index.
    index: BTreeMap<RequirementId, NodeIndex>,

    /// Dependency graph over arena indices. Edges point from child to parent.
    graph: DiGraph<(), ()>,
}

/// A requirement identifier declared more than once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Duplicate {
    /// The duplicated identifier.
    pub id: RequirementId,
    /// Every place the identifier is declared, in input order.
    pub locations: Vec<Source>,
}

/// A `child-of` link whose target does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingParent {
    /// The requirement declaring the link.
    pub child: RequirementId,
    /// The missing parent.
    pub parent: RequirementId,
    /// Where the child is declared.
    pub location: Source,
}

/// A cycle in the parent relation.
///
/// The path starts and ends with the same identifier, e.g. `[A, B, A]`. A
/// requirement listing itself as parent yields `[A, A]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle {
    /// The identifiers along the cycle, following child → parent links.
    pub path: Vec<RequirementId>,
}

/// A completed requirement with a child that is not completed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct IncompleteChild {
    /// The completed requirement.
    pub parent: RequirementId,
    /// The child that is not completed.
    pub child: RequirementId,
}

/// Errors raised while building a [`RequirementGraph`].
///
/// Each variant corresponds to one validation stage and lists every violation
/// found in that stage.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The same identifier is declared more than once.
    #[error("duplicate requirement ids: {}", join(.0))]
    DuplicateId(NonEmpty<Duplicate>),

    /// A requirement links to a parent that does not exist.
    #[error("unknown parent requirements: {}", join(.0))]
    DanglingParentReference(NonEmpty<DanglingParent>),

    /// The parent relation contains a cycle.
    #[error("circular dependencies: {}", join(.0))]
    CyclicDependency(NonEmpty<Cycle>),

    /// A completed requirement has children that are not completed.
    #[error("completed requirements with incomplete children: {}", join(.0))]
    IncompleteChildOfCompleted(NonEmpty<IncompleteChild>),
}

fn join<T: fmt::Display>(items: &NonEmpty<T>) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl fmt::Display for Duplicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (", self.id)?;
        for (i, location) in self.locations.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{location}")?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for DanglingParent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} is a child of missing {} ({})",
            self.child, self.parent, self.location
        )
    }
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, id) in self.path.iter().enumerate() {
            if i > 0 {
                write!(f, " -> ")?;
            }
            write!(f, "{id}")?;
        }
        Ok(())
    }
}

impl fmt::Display for IncompleteChild {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} is completed but its child {} is not",
            self.parent, self.child
        )
    }
}

/// Completion counts over a set of requirements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Number of requirements.
    pub total: usize,
    /// Number of completed requirements.
    pub completed: usize,
    /// Number of critical requirements.
    pub critical: usize,
    /// Number of requirements that are both critical and completed.
    pub critical_completed: usize,
}

impl Summary {
    /// Tallies the given requirements.
    pub fn of<'a>(requirements: impl IntoIterator<Item = &'a Requirement>) -> Self {
        requirements
            .into_iter()
            .fold(Self::default(), |mut summary, requirement| {
                summary.total += 1;
                if requirement.is_completed() {
                    summary.completed += 1;
                }
                if requirement.is_critical() {
                    summary.critical += 1;
                    if requirement.is_completed() {
                        summary.critical_completed += 1;
                    }
                }
                summary
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

impl RequirementGraph {
    /// Builds and validates a graph from the requirements of every document.
    ///
    /// # Errors
    ///
    /// Returns the [`ValidationError`] of the first failing stage, carrying
    /// every violation found in that stage.
    #[instrument(skip_all)]
    pub fn build(records: impl IntoIterator<Item = Requirement>) -> Result<Self, ValidationError> {
        let mut requirements: Vec<Requirement> = records.into_iter().collect();
        debug!(count = requirements.len(), "validating requirements");

        check_unique(&requirements)?;

        requirements.sort_by(|a, b| a.id().cmp(b.id()));
        let index: BTreeMap<RequirementId, NodeIndex> = requirements
            .iter()
            .enumerate()
            .map(|(i, requirement)| (requirement.id().clone(), NodeIndex::new(i)))
            .collect();

        check_references(&requirements, &index)?;

        let edge_count = requirements.iter().map(|r| r.parents().len()).sum();
        let mut graph = DiGraph::with_capacity(requirements.len(), edge_count);
        for _ in &requirements {
            graph.add_node(());
        }
        for (i, requirement) in requirements.iter().enumerate() {
            for parent in requirement.parents() {
                graph.add_edge(NodeIndex::new(i), index[parent], ());
            }
        }

        let this = Self {
            requirements,
            index,
            graph,
        };

        this.check_acyclic()?;
        this.check_completion()?;

        debug!(count = this.len(), "requirement graph is valid");
        Ok(this)
    }

    /// Number of requirements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.requirements.len()
    }

    /// Whether the graph holds no requirements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    /// Iterates over all requirements, sorted by identifier.
    pub fn iter(&self) -> impl Iterator<Item = &Requirement> + '_ {
        self.requirements.iter()
    }

    /// Looks up a requirement by identifier.
    #[must_use]
    pub fn get(&self, id: &RequirementId) -> Option<&Requirement> {
        self.index
            .get(id)
            .map(|node| &self.requirements[node.index()])
    }

    /// Whether a requirement with this identifier exists.
    #[must_use]
    pub fn contains(&self, id: &RequirementId) -> bool {
        self.index.contains_key(id)
    }

    /// The parents of a requirement, in declaration order.
    pub fn parents(&self, id: &RequirementId) -> impl Iterator<Item = &Requirement> + '_ {
        self.get(id)
            .into_iter()
            .flat_map(|requirement| requirement.parents().iter())
            .filter_map(|parent| self.get(parent))
    }

    /// The children of a requirement, sorted by identifier.
    pub fn children(&self, id: &RequirementId) -> impl Iterator<Item = &Requirement> + '_ {
        let mut nodes: Vec<NodeIndex> = self
            .index
            .get(id)
            .map(|node| {
                self.graph
                    .neighbors_directed(*node, Direction::Incoming)
                    .collect()
            })
            .unwrap_or_default();
        nodes.sort_unstable();
        nodes.dedup();
        nodes
            .into_iter()
            .map(|node| &self.requirements[node.index()])
    }

    /// Requirements without parents, sorted by identifier.
    pub fn roots(&self) -> impl Iterator<Item = &Requirement> + '_ {
        self.requirements
            .iter()
            .filter(|requirement| requirement.parents().is_empty())
    }

    /// Requirements grouped by source document, each group in line order.
    #[must_use]
    pub fn by_document(&self) -> BTreeMap<&str, Vec<&Requirement>> {
        let mut groups: BTreeMap<&str, Vec<&Requirement>> = BTreeMap::new();
        for requirement in &self.requirements {
            groups
                .entry(requirement.source().document.as_str())
                .or_default()
                .push(requirement);
        }
        for group in groups.values_mut() {
            group.sort_by_key(|requirement| requirement.source().start_line);
        }
        groups
    }

    /// Completion counts over the whole graph.
    #[must_use]
    pub fn summary(&self) -> Summary {
        Summary::of(&self.requirements)
    }

    /// Consumes the graph, returning the requirements sorted by identifier.
    #[must_use]
    pub fn into_requirements(self) -> Vec<Requirement> {
        self.requirements
    }

    fn id(&self, node: NodeIndex) -> &RequirementId {
        self.requirements[node.index()].id()
    }

    /// Three-colour depth-first search over child → parent edges.
    ///
    /// Every back edge to an in-progress node closes a cycle; all of them are
    /// collected before failing.
    fn check_acyclic(&self) -> Result<(), ValidationError> {
        let mut marks = vec![Mark::Unvisited; self.requirements.len()];
        let mut stack: Vec<(NodeIndex, Neighbors<'_, ()>)> = Vec::new();
        let mut cycles = Vec::new();

        for start in self.graph.node_indices() {
            if marks[start.index()] != Mark::Unvisited {
                continue;
            }
            marks[start.index()] = Mark::InProgress;
            stack.push((start, self.graph.neighbors(start)));

            while let Some((node, neighbors)) = stack.last_mut() {
                let node = *node;
                let Some(next) = neighbors.next() else {
                    marks[node.index()] = Mark::Done;
                    stack.pop();
                    continue;
                };

                match marks[next.index()] {
                    Mark::Unvisited => {
                        marks[next.index()] = Mark::InProgress;
                        stack.push((next, self.graph.neighbors(next)));
                    }
                    Mark::InProgress => {
                        let from = stack
                            .iter()
                            .position(|(n, _)| *n == next)
                            .unwrap_or_default();
                        let path = stack[from..]
                            .iter()
                            .map(|(n, _)| self.id(*n).clone())
                            .chain(iter::once(self.id(next).clone()))
                            .collect();
                        cycles.push(Cycle { path });
                    }
                    Mark::Done => {}
                }
            }
        }

        match NonEmpty::from_vec(cycles) {
            Some(cycles) => Err(ValidationError::CyclicDependency(cycles)),
            None => Ok(()),
        }
    }

    /// Every child of a completed requirement must itself be completed.
    ///
    /// Checking each edge once is enough for the whole subtree: an incomplete
    /// grandchild is reported against its own (incomplete or completed)
    /// parent.
    fn check_completion(&self) -> Result<(), ValidationError> {
        let mut violations: Vec<IncompleteChild> = self
            .graph
            .node_indices()
            .filter(|node| self.requirements[node.index()].is_completed())
            .flat_map(|parent| {
                self.graph
                    .neighbors_directed(parent, Direction::Incoming)
                    .filter(|child| !self.requirements[child.index()].is_completed())
                    .map(move |child| (parent, child))
            })
            .map(|(parent, child)| IncompleteChild {
                parent: self.id(parent).clone(),
                child: self.id(child).clone(),
            })
            .collect();
        violations.sort();
        violations.dedup();

        match NonEmpty::from_vec(violations) {
            Some(violations) => Err(ValidationError::IncompleteChildOfCompleted(violations)),
            None => Ok(()),
        }
    }
}

fn check_unique(requirements: &[Requirement]) -> Result<(), ValidationError> {
    let mut seen: BTreeMap<&RequirementId, Vec<Source>> = BTreeMap::new();
    for requirement in requirements {
        seen.entry(requirement.id())
            .or_default()
            .push(requirement.source().clone());
    }

    let duplicates: Vec<Duplicate> = seen
        .into_iter()
        .filter(|(_, locations)| locations.len() > 1)
        .map(|(id, locations)| Duplicate {
            id: id.clone(),
            locations,
        })
        .collect();

    match NonEmpty::from_vec(duplicates) {
        Some(duplicates) => Err(ValidationError::DuplicateId(duplicates)),
        None => Ok(()),
    }
}

fn check_references(
    requirements: &[Requirement],
    index: &BTreeMap<RequirementId, NodeIndex>,
) -> Result<(), ValidationError> {
    let dangling: Vec<DanglingParent> = requirements
        .iter()
        .flat_map(|requirement| {
            requirement
                .parents()
                .iter()
                .filter(|parent| !index.contains_key(*parent))
                .map(move |parent| DanglingParent {
                    child: requirement.id().clone(),
                    parent: parent.clone(),
                    location: requirement.source().clone(),
                })
        })
        .collect();

    match NonEmpty::from_vec(dangling) {
        Some(dangling) => Err(ValidationError::DanglingParentReference(dangling)),
        None => Ok(()),
    }
}
