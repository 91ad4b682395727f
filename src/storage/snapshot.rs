//! The lock model.
//!
//! A [`Snapshot`] is a versioned copy of a [`RequirementGraph`] at a point in
//! time. It is the only persisted artifact; [`diff`] compares it with the
//! graph built from the current documents.
//!
//! The serialized form is pretty-printed JSON:
//!
//! ```json
//! {
//!   "lock_format_version": 1,
//!   "generator_version": "0.1.0",
//!   "requirements": [
//!     {
//!       "id": "REQ-1",
//!       "description": "Do the thing",
//!       "critical": true,
//!       "completed": false,
//!       "parents": ["REQ-0"]
//!     }
//!   ]
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::domain::{
    Change, DiffResult, FieldChange, Requirement, RequirementGraph, RequirementId, Source,
    ValidationError,
};

/// The snapshot format version written by this crate.
pub const LOCK_FORMAT_VERSION: u32 = 1;

/// Document name used for requirements rebuilt from a snapshot.
const SNAPSHOT_DOCUMENT: &str = "<snapshot>";

/// A versioned, sorted copy of a requirement graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    lock_format_version: u32,
    generator_version: String,
    requirements: Vec<LockedRequirement>,
}

/// One requirement as recorded in a snapshot.
///
/// The source location is not recorded: moving a requirement between
/// documents or lines does not change the lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedRequirement {
    /// The requirement's identifier.
    pub id: RequirementId,
    /// The description line.
    pub description: String,
    /// Whether the requirement is marked `critical`.
    pub critical: bool,
    /// Whether the requirement is marked `completed`.
    pub completed: bool,
    /// Parent identifiers, sorted.
    pub parents: BTreeSet<RequirementId>,
}

impl From<&Requirement> for LockedRequirement {
    fn from(requirement: &Requirement) -> Self {
        Self {
            id: requirement.id().clone(),
            description: requirement.description().to_string(),
            critical: requirement.is_critical(),
            completed: requirement.is_completed(),
            parents: requirement.parents().iter().cloned().collect(),
        }
    }
}

/// Errors raised while reading or writing snapshot bytes.
#[derive(Debug, Error)]
pub enum SnapshotFormatError {
    /// The bytes are not a well-formed snapshot.
    #[error("malformed snapshot: {0}")]
    Json(#[from] serde_json::Error),

    /// The snapshot declares a format version this crate cannot read.
    #[error("unsupported lock format version {0} (expected {LOCK_FORMAT_VERSION})")]
    UnsupportedVersion(u32),

    /// The snapshot lists the same requirement more than once.
    #[error("requirement {0} appears more than once in the snapshot")]
    DuplicateId(RequirementId),
}

/// The part of a snapshot that every format version shares.
#[derive(Deserialize)]
struct Header {
    lock_format_version: u32,
}

impl Snapshot {
    /// Captures the current state of a graph.
    #[must_use]
    pub fn from_graph(graph: &RequirementGraph) -> Self {
        Self {
            lock_format_version: LOCK_FORMAT_VERSION,
            generator_version: env!("CARGO_PKG_VERSION").to_string(),
            requirements: graph.iter().map(LockedRequirement::from).collect(),
        }
    }

    /// The format version the snapshot was written with.
    #[must_use]
    pub const fn lock_format_version(&self) -> u32 {
        self.lock_format_version
    }

    /// The version of the tool that wrote the snapshot.
    #[must_use]
    pub fn generator_version(&self) -> &str {
        &self.generator_version
    }

    /// The recorded requirements, in serialized order.
    #[must_use]
    pub fn requirements(&self) -> &[LockedRequirement] {
        &self.requirements
    }

    /// Serializes the snapshot.
    ///
    /// The output is deterministic for a given graph: requirements are sorted
    /// by identifier and parents within each requirement are sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotFormatError> {
        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// Deserializes a snapshot.
    ///
    /// The version header is checked before the body is read, so snapshots
    /// from a newer format are rejected rather than misread.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not valid JSON, the format version is
    /// unsupported, an identifier is malformed, or an identifier is listed
    /// twice.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, SnapshotFormatError> {
        let header: Header = serde_json::from_slice(bytes)?;
        let snapshot: Self = match header.lock_format_version {
            LOCK_FORMAT_VERSION => serde_json::from_slice(bytes)?,
            other => return Err(SnapshotFormatError::UnsupportedVersion(other)),
        };

        let mut seen = BTreeSet::new();
        for requirement in &snapshot.requirements {
            if !seen.insert(&requirement.id) {
                return Err(SnapshotFormatError::DuplicateId(requirement.id.clone()));
            }
        }

        Ok(snapshot)
    }

    /// Rebuilds a validated graph from the snapshot.
    ///
    /// Each requirement's source points at its 1-based position in the
    /// snapshot.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the recorded requirements do not form
    /// a valid graph, for example because the file was edited by hand.
    pub fn into_graph(self) -> Result<RequirementGraph, ValidationError> {
        let requirements = self
            .requirements
            .into_iter()
            .enumerate()
            .map(|(i, locked)| {
                let mut requirement = Requirement::new(
                    locked.id,
                    locked.description,
                    Source::line(SNAPSHOT_DOCUMENT, i + 1),
                );
                requirement.set_critical(locked.critical);
                requirement.set_completed(locked.completed);
                for parent in locked.parents {
                    requirement.add_parent(parent);
                }
                requirement
            });
        RequirementGraph::build(requirements)
    }

    /// Whether the graph matches the snapshot exactly.
    #[must_use]
    pub fn is_up_to_date(&self, graph: &RequirementGraph) -> bool {
        diff(self, graph).is_empty()
    }
}

/// Compares a previous snapshot with the current graph.
///
/// Only the identifier, description, flags and parent set are compared;
/// source locations are ignored.
#[instrument(skip_all)]
#[must_use]
pub fn diff(previous: &Snapshot, current: &RequirementGraph) -> DiffResult {
    let locked: BTreeMap<&RequirementId, &LockedRequirement> = previous
        .requirements
        .iter()
        .map(|requirement| (&requirement.id, requirement))
        .collect();

    let mut result = DiffResult::default();

    for requirement in current.iter() {
        match locked.get(requirement.id()) {
            None => result.added.push(requirement.id().clone()),
            Some(old) => {
                let fields = compare(old, requirement);
                if !fields.is_empty() {
                    result.changed.push(Change {
                        id: requirement.id().clone(),
                        fields,
                    });
                }
            }
        }
    }

    result.removed = locked
        .into_keys()
        .filter(|id| !current.contains(id))
        .cloned()
        .collect();

    debug!(
        added = result.added.len(),
        removed = result.removed.len(),
        changed = result.changed.len(),
        "computed diff"
    );
    result
}

fn compare(old: &LockedRequirement, new: &Requirement) -> Vec<FieldChange> {
    let mut fields = Vec::new();

    if old.description != new.description() {
        fields.push(FieldChange::Description {
            old: old.description.clone(),
            new: new.description().to_string(),
        });
    }
    if old.critical != new.is_critical() {
        fields.push(FieldChange::Critical {
            old: old.critical,
            new: new.is_critical(),
        });
    }
    if old.completed != new.is_completed() {
        fields.push(FieldChange::Completed {
            old: old.completed,
            new: new.is_completed(),
        });
    }

    let parents: BTreeSet<&RequirementId> = new.parents().iter().collect();
    let old_parents: BTreeSet<&RequirementId> = old.parents.iter().collect();
    if parents != old_parents {
        fields.push(FieldChange::Parents {
            added: parents.difference(&old_parents).map(|&id| id.clone()).collect(),
            removed: old_parents.difference(&parents).map(|&id| id.clone()).collect(),
        });
    }

    fields
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::storage::markdown::{Document, load};

    fn id(s: &str) -> RequirementId {
        s.parse().unwrap()
    }

    fn graph(text: &str) -> RequirementGraph {
        load(&[Document::new("doc.md", text)]).unwrap()
    }

    const BASE: &str = "> REQ-0\n> The base\n\n> REQ-1\n> Do the thing\n> critical\n> child-of: REQ-0\n";

    #[test]
    fn serialized_form() {
        let snapshot = Snapshot::from_graph(&graph(BASE));
        let text = String::from_utf8(snapshot.to_bytes().unwrap()).unwrap();

        let expected = format!(
            r#"{{
  "lock_format_version": 1,
  "generator_version": "{}",
  "requirements": [
    {{
      "id": "REQ-0",
      "description": "The base",
      "critical": false,
      "completed": false,
      "parents": []
    }},
    {{
      "id": "REQ-1",
      "description": "Do the thing",
      "critical": true,
      "completed": false,
      "parents": [
        "REQ-0"
      ]
    }}
  ]
}}
"#,
            env!("CARGO_PKG_VERSION")
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn parents_are_sorted() {
        let graph = graph(
            "> REQ-1\n> a\n\n> REQ-2\n> b\n\n> REQ-3\n> c\n> child-of: REQ-2\n> child-of: REQ-1\n",
        );
        let snapshot = Snapshot::from_graph(&graph);
        let parents: Vec<&str> = snapshot.requirements()[2]
            .parents
            .iter()
            .map(RequirementId::as_str)
            .collect();
        assert_eq!(parents, ["REQ-1", "REQ-2"]);
    }

    #[test]
    fn round_trip_is_byte_identical() {
        let snapshot = Snapshot::from_graph(&graph(BASE));
        let bytes = snapshot.to_bytes().unwrap();

        let restored = Snapshot::from_slice(&bytes).unwrap();
        assert_eq!(restored, snapshot);

        let rebuilt = Snapshot::from_graph(&restored.into_graph().unwrap());
        assert_eq!(rebuilt.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn snapshot_graph_keeps_requirements() {
        let original = graph(BASE);
        let restored = Snapshot::from_graph(&original).into_graph().unwrap();

        assert_eq!(restored.len(), original.len());
        let requirement = restored.get(&id("REQ-1")).unwrap();
        assert!(requirement.is_critical());
        assert_eq!(requirement.parents(), &[id("REQ-0")]);
        assert_eq!(requirement.source(), &Source::line("<snapshot>", 2));
    }

    #[test]
    fn diff_against_self_is_empty() {
        let graph = graph(BASE);
        let snapshot = Snapshot::from_graph(&graph);
        assert!(diff(&snapshot, &graph).is_empty());
        assert!(snapshot.is_up_to_date(&graph));
    }

    #[test]
    fn empty_graph_round_trips() {
        let graph = RequirementGraph::default();
        let bytes = Snapshot::from_graph(&graph).to_bytes().unwrap();
        let snapshot = Snapshot::from_slice(&bytes).unwrap();
        assert!(snapshot.requirements().is_empty());
        assert!(snapshot.is_up_to_date(&graph));
    }

    #[test]
    fn added_removed_and_changed() {
        let before = graph("> REQ-0\n> base\n\n> REQ-1\n> one\n\n> REQ-2\n> two\n");
        let after = graph(
            "> REQ-0\n> base\n\n> REQ-1\n> one, reworded\n> critical\n> child-of: REQ-0\n\n> REQ-3\n> three\n",
        );

        let result = diff(&Snapshot::from_graph(&before), &after);

        assert_eq!(result.added, [id("REQ-3")]);
        assert_eq!(result.removed, [id("REQ-2")]);
        assert_eq!(
            result.changed,
            [Change {
                id: id("REQ-1"),
                fields: vec![
                    FieldChange::Description {
                        old: "one".to_string(),
                        new: "one, reworded".to_string(),
                    },
                    FieldChange::Critical {
                        old: false,
                        new: true
                    },
                    FieldChange::Parents {
                        added: vec![id("REQ-0")],
                        removed: vec![],
                    },
                ],
            }]
        );
        assert_eq!(result.len(), 3);
    }

    #[test]
    fn completion_is_a_change() {
        let before = graph("> REQ-1\n> one\n");
        let after = graph("> REQ-1\n> one\n> completed\n");
        let result = diff(&Snapshot::from_graph(&before), &after);
        assert_eq!(
            result.changed[0].fields,
            [FieldChange::Completed {
                old: false,
                new: true
            }]
        );
    }

    #[test]
    fn moving_a_requirement_is_not_a_change() {
        let before = load(&[Document::new("a.md", "> REQ-1\n> one\n")]).unwrap();
        let after = load(&[Document::new(
            "b.md",
            "# Moved\n\nSome intro.\n\n> REQ-1\n> one\n",
        )])
        .unwrap();
        assert!(diff(&Snapshot::from_graph(&before), &after).is_empty());
    }

    #[test]
    fn parent_order_is_not_a_change() {
        let base = "> REQ-1\n> a\n\n> REQ-2\n> b\n\n";
        let before = graph(&format!("{base}> REQ-3\n> c\n> child-of: REQ-1\n> child-of: REQ-2\n"));
        let after = graph(&format!("{base}> REQ-3\n> c\n> child-of: REQ-2\n> child-of: REQ-1\n"));
        assert!(diff(&Snapshot::from_graph(&before), &after).is_empty());
    }

    #[test_case(0; "zero")]
    #[test_case(2; "next")]
    #[test_case(99; "far future")]
    fn unsupported_version_is_rejected(version: u32) {
        let bytes = format!(
            r#"{{"lock_format_version": {version}, "something_else": [1, 2, 3]}}"#
        );
        let error = Snapshot::from_slice(bytes.as_bytes()).unwrap_err();
        assert!(matches!(error, SnapshotFormatError::UnsupportedVersion(v) if v == version));
    }

    #[test_case(b""; "empty")]
    #[test_case(b"not json"; "not json")]
    #[test_case(b"{}"; "missing version")]
    #[test_case(br#"{"lock_format_version": "1"}"#; "string version")]
    #[test_case(br#"{"lock_format_version": 1}"#; "missing body")]
    #[test_case(
        br#"{"lock_format_version": 1, "generator_version": "0.1.0", "requirements": [{"id": "REQ", "description": "", "critical": false, "completed": false, "parents": []}]}"#;
        "invalid id"
    )]
    fn malformed_snapshot_is_rejected(bytes: &[u8]) {
        assert!(matches!(
            Snapshot::from_slice(bytes),
            Err(SnapshotFormatError::Json(_))
        ));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let entry = r#"{"id": "REQ-1", "description": "x", "critical": false, "completed": false, "parents": []}"#;
        let bytes = format!(
            r#"{{"lock_format_version": 1, "generator_version": "0.1.0", "requirements": [{entry}, {entry}]}}"#
        );
        let error = Snapshot::from_slice(bytes.as_bytes()).unwrap_err();
        assert!(matches!(error, SnapshotFormatError::DuplicateId(dup) if dup == id("REQ-1")));
    }

    #[test]
    fn hand_edited_snapshot_with_dangling_parent_fails_validation() {
        let bytes = br#"{"lock_format_version": 1, "generator_version": "0.1.0", "requirements": [{"id": "REQ-1", "description": "x", "critical": false, "completed": false, "parents": ["REQ-7"]}]}"#;
        let snapshot = Snapshot::from_slice(bytes).unwrap();
        assert!(matches!(
            snapshot.into_graph(),
            Err(ValidationError::DanglingParentReference(_))
        ));
    }
}
