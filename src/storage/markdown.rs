use nonempty::NonEmpty;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use thiserror::Error;
use tracing::{debug, instrument, trace};

use crate::{
    domain::{Requirement, RequirementGraph, RequirementId, Source, ValidationError},
    storage::extract::{self, Block},
};

/// A document to scan for requirements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Stable identifier of the document, used in diagnostics.
    pub id: String,
    /// The full text of the document.
    pub text: String,
}

impl Document {
    /// Creates a document.
    #[must_use]
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// An attribute line of a requirement block.
///
/// Keywords are matched case-insensitively; values keep their case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute<'a> {
    /// `critical`
    Critical,
    /// `completed`
    Completed,
    /// `child-of <ID>`, `child-of: <ID>`, `child <ID>` or `child: <ID>`.
    ///
    /// Holds the raw value, which may be empty or malformed.
    ChildOf(&'a str),
    /// Anything else.
    Unrecognized(&'a str),
}

impl<'a> Attribute<'a> {
    /// Classifies an attribute line.
    ///
    /// ```
    /// use reqlock::storage::markdown::Attribute;
    ///
    /// assert_eq!(Attribute::classify("  Critical "), Attribute::Critical);
    /// assert_eq!(Attribute::classify("CHILD-OF: REQ-1"), Attribute::ChildOf("REQ-1"));
    /// assert_eq!(Attribute::classify("child REQ-1"), Attribute::ChildOf("REQ-1"));
    /// assert_eq!(Attribute::classify("urgent"), Attribute::Unrecognized("urgent"));
    /// ```
    #[must_use]
    pub fn classify(line: &'a str) -> Self {
        let line = line.trim();
        match line.to_ascii_lowercase().as_str() {
            "critical" => Self::Critical,
            "completed" => Self::Completed,
            _ => strip_keyword(line, "child-of")
                .or_else(|| strip_keyword(line, "child"))
                .map_or(Self::Unrecognized(line), Self::ChildOf),
        }
    }
}

/// Strips a case-insensitive keyword followed by end of line, a colon or
/// whitespace, returning the trimmed value.
fn strip_keyword<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let head = line.get(..keyword.len())?;
    if !head.eq_ignore_ascii_case(keyword) {
        return None;
    }

    let rest = &line[keyword.len()..];
    let value = if let Some(value) = rest.trim_start().strip_prefix(':') {
        value
    } else if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        rest
    } else {
        return None;
    };
    Some(value.trim())
}

/// Errors in the attribute lines of a requirement block.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// An attribute line matches no known keyword.
    #[error("unknown attribute '{line}' in requirement {requirement} ({location})")]
    UnknownAttribute {
        /// The requirement owning the line.
        requirement: RequirementId,
        /// The offending line, trimmed.
        line: String,
        /// Where the line is.
        location: Source,
    },

    /// The same parent is linked more than once.
    #[error("duplicate parent {parent} in requirement {requirement} ({location})")]
    DuplicateParentReference {
        /// The requirement owning the line.
        requirement: RequirementId,
        /// The repeated parent.
        parent: RequirementId,
        /// Where the repeated line is.
        location: Source,
    },

    /// A `child-of` line does not name exactly one valid identifier.
    #[error("malformed parent '{value}' in requirement {requirement} ({location})")]
    MalformedParentId {
        /// The requirement owning the line.
        requirement: RequirementId,
        /// The value following the keyword.
        value: String,
        /// Where the line is.
        location: Source,
    },
}

/// Errors raised while turning documents into a validated graph.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// One or more blocks have invalid attribute lines.
    #[error("failed to parse requirements: {}", join(.0))]
    Parse(NonEmpty<ParseError>),

    /// The requirements parsed but violate a graph invariant.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

fn join(errors: &NonEmpty<ParseError>) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Converts one block into a requirement.
///
/// Returns `Ok(None)` if the first line is not a valid identifier: such a
/// block is an ordinary quote, not a requirement. Every attribute error in
/// the block is reported.
///
/// # Errors
///
/// Returns the [`ParseError`]s of the block's attribute lines.
pub fn build_requirement(
    document: &str,
    block: &Block<'_>,
) -> Result<Option<Requirement>, NonEmpty<ParseError>> {
    let [id_line, description, attributes @ ..] = block.lines() else {
        return Ok(None);
    };

    let id = match RequirementId::try_from(id_line.text.trim()) {
        Ok(id) => id,
        Err(e) => {
            debug!(
                "skipping blockquote at {}:{}: {e}",
                document,
                block.start_line()
            );
            return Ok(None);
        }
    };

    let source = Source::new(document, block.start_line(), block.end_line());
    let mut requirement = Requirement::new(id, description.text.trim(), source);
    let mut errors = Vec::new();

    for line in attributes {
        let location = || Source::line(document, line.number);
        match Attribute::classify(&line.text) {
            Attribute::Critical => requirement.set_critical(true),
            Attribute::Completed => requirement.set_completed(true),
            Attribute::ChildOf(value) => match RequirementId::try_from(value) {
                Ok(parent) => {
                    if !requirement.add_parent(parent.clone()) {
                        errors.push(ParseError::DuplicateParentReference {
                            requirement: requirement.id().clone(),
                            parent,
                            location: location(),
                        });
                    }
                }
                Err(_) => errors.push(ParseError::MalformedParentId {
                    requirement: requirement.id().clone(),
                    value: value.to_string(),
                    location: location(),
                }),
            },
            Attribute::Unrecognized(other) => errors.push(ParseError::UnknownAttribute {
                requirement: requirement.id().clone(),
                line: other.to_string(),
                location: location(),
            }),
        }
    }

    match NonEmpty::from_vec(errors) {
        Some(errors) => Err(errors),
        None => {
            trace!(id = %requirement.id(), "parsed requirement");
            Ok(Some(requirement))
        }
    }
}

/// Extracts every requirement declared in one document.
///
/// # Errors
///
/// Returns every [`ParseError`] found in the document.
#[instrument(skip(document), fields(document = %document.id))]
pub fn parse_document(document: &Document) -> Result<Vec<Requirement>, NonEmpty<ParseError>> {
    let mut requirements = Vec::new();
    let mut errors = Vec::new();

    for block in extract::blocks(&document.text) {
        match build_requirement(&document.id, &block) {
            Ok(Some(requirement)) => requirements.push(requirement),
            Ok(None) => {}
            Err(block_errors) => errors.extend(block_errors),
        }
    }

    debug!(count = requirements.len(), "parsed document");
    NonEmpty::from_vec(errors).map_or(Ok(requirements), Err)
}

/// Extracts the requirements of every document.
///
/// Documents are parsed in parallel; the result preserves input order.
///
/// # Errors
///
/// Returns every [`ParseError`] found in any document.
#[instrument(skip_all, fields(documents = documents.len()))]
pub fn parse_documents(documents: &[Document]) -> Result<Vec<Requirement>, NonEmpty<ParseError>> {
    let results: Vec<_> = documents.par_iter().map(parse_document).collect();

    let mut requirements = Vec::new();
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(parsed) => requirements.extend(parsed),
            Err(parse_errors) => errors.extend(parse_errors),
        }
    }

    NonEmpty::from_vec(errors).map_or(Ok(requirements), Err)
}

/// Parses and validates a set of documents.
///
/// # Errors
///
/// Returns [`LoadError::Parse`] with every attribute error if any block is
/// malformed, otherwise [`LoadError::Validation`] if the requirements violate
/// a graph invariant.
pub fn load(documents: &[Document]) -> Result<RequirementGraph, LoadError> {
    let requirements = parse_documents(documents).map_err(LoadError::Parse)?;
    Ok(RequirementGraph::build(requirements)?)
}
