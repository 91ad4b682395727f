//! Requirements tracked in Markdown blockquotes.
//!
//! A requirement is declared in any Markdown document as a blockquote whose
//! first line is its identifier:
//!
//! ```markdown
//! > REQ-2
//! > Export reports as CSV
//! > critical
//! > child-of: REQ-1
//! ```
//!
//! Documents are parsed into [`Requirement`]s, validated as a
//! [`RequirementGraph`], and locked as a [`Snapshot`] that later runs are
//! diffed against.
//!
//! ```
//! use reqlock::{Document, Snapshot};
//!
//! let documents = [Document::new(
//!     "README.md",
//!     "> REQ-1\n> Parse documents\n\n> REQ-2\n> Lock them\n> child-of: REQ-1\n",
//! )];
//! let graph = reqlock::load(&documents).unwrap();
//! assert_eq!(graph.len(), 2);
//!
//! let snapshot = Snapshot::from_graph(&graph);
//! assert!(snapshot.is_up_to_date(&graph));
//! ```

pub mod domain;
pub use domain::{
    CONFIG_FILE, Change, Config, DiffResult, FieldChange, Requirement, RequirementGraph,
    RequirementId, Source, Summary, ValidationError,
};

pub mod storage;
pub use storage::{Document, LoadError, ParseError, Snapshot, SnapshotFormatError, diff, load};
