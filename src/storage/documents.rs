//! Discovery of the documents under a documentation root.

use std::{
    io,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{debug, trace};
use walkdir::{DirEntry, WalkDir};

use crate::{domain::Config, storage::markdown::Document};

const BOM: char = '\u{feff}';

/// Errors raised while discovering or reading documents.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The directory tree could not be walked.
    #[error("failed to walk {}: {source}", root.display())]
    Walk {
        /// The documentation root.
        root: PathBuf,
        /// The underlying error.
        source: walkdir::Error,
    },

    /// A document could not be read as UTF-8 text.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// The document path.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },
}

/// Finds the document files under `root`, sorted by path.
///
/// Hidden files and directories are skipped, as are paths under one of the
/// configured exclusions and files whose extension is not a document
/// extension.
///
/// # Errors
///
/// Returns an error if a directory cannot be read.
pub fn discover(root: &Path, config: &Config) -> Result<Vec<PathBuf>, DiscoveryError> {
    let mut paths = Vec::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry: &DirEntry| {
            entry.depth() == 0
                || (!is_hidden(entry) && !config.is_excluded(relative(root, entry.path())))
        });

    for entry in walker {
        let entry = entry.map_err(|source| DiscoveryError::Walk {
            root: root.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file() && config.is_document(entry.path()) {
            trace!("found document {}", entry.path().display());
            paths.push(entry.into_path());
        }
    }

    debug!(count = paths.len(), "discovered documents");
    Ok(paths)
}

/// Discovers and reads every document under `root`.
///
/// Document ids are paths relative to `root`, with `/` separators. A leading
/// byte order mark is dropped.
///
/// # Errors
///
/// Returns an error if discovery fails or a document cannot be read.
pub fn read_all(root: &Path, config: &Config) -> Result<Vec<Document>, DiscoveryError> {
    discover(root, config)?
        .into_iter()
        .map(|path| {
            let mut text =
                std::fs::read_to_string(&path).map_err(|source| DiscoveryError::Read {
                    path: path.clone(),
                    source,
                })?;
            if text.starts_with(BOM) {
                text.drain(..BOM.len_utf8());
            }
            Ok(Document::new(document_id(root, &path), text))
        })
        .collect()
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

fn relative<'a>(root: &Path, path: &'a Path) -> &'a Path {
    path.strip_prefix(root).unwrap_or(path)
}

fn document_id(root: &Path, path: &Path) -> String {
    relative(root, path)
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn write(root: &Path, path: &str, content: &str) {
        let path = root.join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn ids(root: &Path, config: &Config) -> Vec<String> {
        read_all(root, config)
            .unwrap()
            .into_iter()
            .map(|document| document.id)
            .collect()
    }

    #[test]
    fn finds_documents_recursively_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "b.md", "");
        write(tmp.path(), "a.md", "");
        write(tmp.path(), "docs/nested/c.md", "");
        write(tmp.path(), "notes.txt", "");

        assert_eq!(
            ids(tmp.path(), &Config::default()),
            ["a.md", "b.md", "docs/nested/c.md"]
        );
    }

    #[test]
    fn skips_hidden_paths() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), ".git/HEAD.md", "");
        write(tmp.path(), ".hidden.md", "");
        write(tmp.path(), "shown.md", "");

        assert_eq!(ids(tmp.path(), &Config::default()), ["shown.md"]);
    }

    #[test]
    fn skips_excluded_prefixes() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "drafts/a.md", "");
        write(tmp.path(), "drafts.md", "");
        write(tmp.path(), "docs/drafts/b.md", "");

        let mut config = Config::default();
        config.add_exclude("drafts".to_string());

        assert_eq!(ids(tmp.path(), &config), ["docs/drafts/b.md", "drafts.md"]);
    }

    #[test]
    fn reads_content() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "a.md", "> REQ-1\n> one\n");

        let documents = read_all(tmp.path(), &Config::default()).unwrap();
        assert_eq!(documents, [Document::new("a.md", "> REQ-1\n> one\n")]);
    }

    #[test]
    fn invalid_utf8_is_a_read_error() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("bad.md"), [0xff, 0xfe, 0x00]).unwrap();

        let error = read_all(tmp.path(), &Config::default()).unwrap_err();
        assert!(matches!(error, DiscoveryError::Read { .. }));
    }

    #[test]
    fn missing_root_is_a_walk_error() {
        let tmp = tempfile::tempdir().unwrap();
        let error = discover(&tmp.path().join("missing"), &Config::default()).unwrap_err();
        assert!(matches!(error, DiscoveryError::Walk { .. }));
    }

    #[test]
    fn byte_order_mark_is_dropped() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "bom.md", "\u{feff}> REQ-1\n> First\n");

        let documents = read_all(tmp.path(), &Config::default()).unwrap();
        assert_eq!(documents[0].text, "> REQ-1\n> First\n");

        let graph = crate::storage::markdown::load(&documents).unwrap();
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn hidden_and_excluded_filters_apply_together() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), ".cache/a.md", "");
        write(tmp.path(), "drafts/b.md", "");
        write(tmp.path(), "docs/.old/c.md", "");
        write(tmp.path(), "docs/d.md", "");

        let mut config = Config::default();
        config.add_exclude("drafts".to_string());

        assert_eq!(ids(tmp.path(), &config), ["docs/d.md"]);
    }
}
