//! Text and file formats.
//!
//! Everything that reads or writes bytes lives here: the blockquote
//! extractor and record builder, the snapshot codec, the lock file and
//! document discovery.

pub mod extract;

/// Turning blockquotes into requirements.
pub mod markdown;
pub use markdown::{Document, LoadError, ParseError, load, parse_document, parse_documents};

pub mod snapshot;
pub use snapshot::{LOCK_FORMAT_VERSION, LockedRequirement, Snapshot, SnapshotFormatError, diff};

pub mod lockfile;
pub use lockfile::LockfileError;

pub mod documents;
pub use documents::DiscoveryError;
