use std::fmt;

use crate::domain::RequirementId;

/// A requirement declared in a document.
///
/// Identity is the [`RequirementId`]; every other field is payload that may
/// change between snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    id: RequirementId,
    description: String,
    critical: bool,
    completed: bool,
    /// Parent links in declaration order. Never contains duplicates.
    parents: Vec<RequirementId>,
    source: Source,
}

impl Requirement {
    /// Creates a requirement with no flags and no parents.
    #[must_use]
    pub fn new(id: RequirementId, description: impl Into<String>, source: Source) -> Self {
        Self {
            id,
            description: description.into(),
            critical: false,
            completed: false,
            parents: Vec::new(),
            source,
        }
    }

    /// Returns the requirement's identifier.
    #[must_use]
    pub const fn id(&self) -> &RequirementId {
        &self.id
    }

    /// Returns the description (the first line after the identifier).
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Whether the requirement is marked `critical`.
    #[must_use]
    pub const fn is_critical(&self) -> bool {
        self.critical
    }

    /// Whether the requirement is marked `completed`.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.completed
    }

    /// Returns the parent identifiers in declaration order.
    #[must_use]
    pub fn parents(&self) -> &[RequirementId] {
        &self.parents
    }

    /// Returns where the requirement was declared.
    #[must_use]
    pub const fn source(&self) -> &Source {
        &self.source
    }

    /// Sets the `critical` flag.
    pub const fn set_critical(&mut self, critical: bool) {
        self.critical = critical;
    }

    /// Sets the `completed` flag.
    pub const fn set_completed(&mut self, completed: bool) {
        self.completed = completed;
    }

    /// Adds a parent link.
    ///
    /// Returns `false`, leaving the requirement unchanged, if the parent is
    /// already linked.
    pub fn add_parent(&mut self, parent: RequirementId) -> bool {
        if self.parents.contains(&parent) {
            return false;
        }
        self.parents.push(parent);
        true
    }

    /// Renders the requirement in the blockquote grammar it is parsed from.
    ///
    /// ```
    /// use reqlock::{Requirement, RequirementId, Source};
    ///
    /// let id: RequirementId = "REQ-2".parse().unwrap();
    /// let mut requirement = Requirement::new(id, "Do it", Source::new("doc.md", 1, 3));
    /// requirement.set_critical(true);
    /// requirement.add_parent("REQ-1".parse().unwrap());
    ///
    /// assert_eq!(
    ///     requirement.to_blockquote(),
    ///     "> REQ-2\n> Do it\n> critical\n> child-of: REQ-1\n"
    /// );
    /// ```
    #[must_use]
    pub fn to_blockquote(&self) -> String {
        use std::fmt::Write;

        let mut out = format!("> {}\n> {}\n", self.id, self.description);
        if self.critical {
            out.push_str("> critical\n");
        }
        if self.completed {
            out.push_str("> completed\n");
        }
        for parent in &self.parents {
            // writing to a String cannot fail
            let _ = writeln!(out, "> child-of: {parent}");
        }
        out
    }
}

/// Where a requirement (or one of its lines) was declared.
///
/// Used for diagnostics only; never part of a requirement's identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Source {
    /// The identifier of the originating document.
    pub document: String,
    /// First line (1-based, inclusive).
    pub start_line: usize,
    /// Last line (1-based, inclusive).
    pub end_line: usize,
}

impl Source {
    /// Creates a source location spanning the given lines.
    #[must_use]
    pub fn new(document: impl Into<String>, start_line: usize, end_line: usize) -> Self {
        Self {
            document: document.into(),
            start_line,
            end_line,
        }
    }

    /// Creates a source location for a single line.
    #[must_use]
    pub fn line(document: impl Into<String>, line: usize) -> Self {
        Self::new(document, line, line)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.start_line == self.end_line {
            write!(f, "{}:{}", self.document, self.start_line)
        } else {
            write!(f, "{}:{}-{}", self.document, self.start_line, self.end_line)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> RequirementId {
        s.parse().unwrap()
    }

    #[test]
    fn defaults() {
        let requirement = Requirement::new(id("REQ-1"), "desc", Source::new("a.md", 1, 2));
        assert!(!requirement.is_critical());
        assert!(!requirement.is_completed());
        assert!(requirement.parents().is_empty());
        assert_eq!(requirement.description(), "desc");
    }

    #[test]
    fn add_parent_rejects_duplicates() {
        let mut requirement = Requirement::new(id("REQ-1"), "desc", Source::line("a.md", 1));
        assert!(requirement.add_parent(id("REQ-0")));
        assert!(requirement.add_parent(id("req-0")));
        assert!(!requirement.add_parent(id("REQ-0")));
        assert_eq!(requirement.parents(), &[id("REQ-0"), id("req-0")]);
    }

    #[test]
    fn blockquote_includes_every_attribute() {
        let mut requirement = Requirement::new(id("REQ-3"), "Ship **it**", Source::line("a.md", 1));
        requirement.set_completed(true);
        requirement.add_parent(id("REQ-1"));
        requirement.add_parent(id("REQ-2"));

        assert_eq!(
            requirement.to_blockquote(),
            "> REQ-3\n> Ship **it**\n> completed\n> child-of: REQ-1\n> child-of: REQ-2\n"
        );
    }

    #[test]
    fn source_display() {
        assert_eq!(Source::new("docs/a.md", 3, 6).to_string(), "docs/a.md:3-6");
        assert_eq!(Source::line("docs/a.md", 4).to_string(), "docs/a.md:4");
    }
}
