use std::fmt;

use crate::domain::RequirementId;

/// The differences between a locked snapshot and the current requirements.
///
/// Every list is sorted by requirement identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffResult {
    /// Requirements present now but absent from the snapshot.
    pub added: Vec<RequirementId>,
    /// Requirements present in the snapshot but absent now.
    pub removed: Vec<RequirementId>,
    /// Requirements present in both whose tracked fields differ.
    pub changed: Vec<Change>,
}

impl DiffResult {
    /// Whether the snapshot and the current requirements agree.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }

    /// Total number of added, removed and changed requirements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len() + self.changed.len()
    }
}

/// The field-level differences of one requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    /// The changed requirement.
    pub id: RequirementId,
    /// Each tracked field that differs, in the order description, critical,
    /// completed, parents. Never empty.
    pub fields: Vec<FieldChange>,
}

/// A difference in one tracked field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldChange {
    /// The description text differs.
    Description {
        /// Locked value.
        old: String,
        /// Current value.
        new: String,
    },
    /// The `critical` flag flipped.
    Critical {
        /// Locked value.
        old: bool,
        /// Current value.
        new: bool,
    },
    /// The `completed` flag flipped.
    Completed {
        /// Locked value.
        old: bool,
        /// Current value.
        new: bool,
    },
    /// The parent set differs.
    Parents {
        /// Parents linked now but not in the snapshot, sorted.
        added: Vec<RequirementId>,
        /// Parents linked in the snapshot but not now, sorted.
        removed: Vec<RequirementId>,
    },
}

impl fmt::Display for FieldChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Description { old, new } => write!(f, "description: {old:?} -> {new:?}"),
            Self::Critical { old, new } => write!(f, "critical: {old} -> {new}"),
            Self::Completed { old, new } => write!(f, "completed: {old} -> {new}"),
            Self::Parents { added, removed } => {
                write!(f, "parents:")?;
                for id in added {
                    write!(f, " +{id}")?;
                }
                for id in removed {
                    write!(f, " -{id}")?;
                }
                Ok(())
            }
        }
    }
}
